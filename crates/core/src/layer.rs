//! Three-layer option resolution.
//!
//! Every recognized option is looked up in strict priority order:
//! explicit invocation argument, then the build configuration file, then
//! a hardcoded default. The first layer that holds a non-empty value wins.

use std::fmt;

/// The configuration layer that supplied a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Explicit,
    ConfigFile,
    Default,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Explicit => write!(f, "explicit"),
            Layer::ConfigFile => write!(f, "config-file"),
            Layer::Default => write!(f, "default"),
        }
    }
}

/// Whether a value counts as "supplied" for layering purposes.
///
/// Empty strings and empty lists are treated as absent so that an
/// orchestrator passing `""` does not shadow a configured value.
pub trait Presence {
    fn is_present(&self) -> bool;
}

impl Presence for String {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl Presence for bool {
    fn is_present(&self) -> bool {
        true
    }
}

impl<T> Presence for Vec<T> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

/// A value together with the layer it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub layer: Layer,
}

/// Pick the first present value from `explicit`, `file`, `default`.
///
/// Returns `None` when no layer supplies a present value; the option is
/// then left unset and its consumer applies its own default.
pub fn resolve<T: Presence>(
    explicit: Option<T>,
    file: Option<T>,
    default: Option<T>,
) -> Option<Resolved<T>> {
    [
        (explicit, Layer::Explicit),
        (file, Layer::ConfigFile),
        (default, Layer::Default),
    ]
    .into_iter()
    .find_map(|(value, layer)| {
        value
            .filter(Presence::is_present)
            .map(|value| Resolved { value, layer })
    })
}

/// [`resolve`] plus a diagnostic event naming the winning layer.
pub fn resolve_key<T: Presence + fmt::Debug>(
    section: &str,
    key: &str,
    explicit: Option<T>,
    file: Option<T>,
    default: Option<T>,
) -> Option<T> {
    match resolve(explicit, file, default) {
        Some(Resolved { value, layer }) => {
            tracing::debug!(section, key, %layer, value = ?value, "resolved option");
            Some(value)
        }
        None => {
            tracing::trace!(section, key, "option left unset");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn explicit_wins_over_file_and_default() {
        let r = resolve(s("feature"), s("develop"), s("main")).unwrap();
        assert_eq!(r.value, "feature");
        assert_eq!(r.layer, Layer::Explicit);
    }

    #[test]
    fn file_wins_over_default() {
        let r = resolve(None, s("develop"), s("main")).unwrap();
        assert_eq!(r.value, "develop");
        assert_eq!(r.layer, Layer::ConfigFile);
    }

    #[test]
    fn default_used_last() {
        let r = resolve(None, None, s("main")).unwrap();
        assert_eq!(r.value, "main");
        assert_eq!(r.layer, Layer::Default);
    }

    #[test]
    fn empty_explicit_string_falls_through() {
        let r = resolve(s(""), s("develop"), None).unwrap();
        assert_eq!(r.value, "develop");
        assert_eq!(r.layer, Layer::ConfigFile);
    }

    #[test]
    fn empty_list_falls_through_to_default() {
        let r = resolve(Some(Vec::<String>::new()), None, Some(vec!["x".to_string()])).unwrap();
        assert_eq!(r.value, vec!["x".to_string()]);
        assert_eq!(r.layer, Layer::Default);
    }

    #[test]
    fn explicit_false_is_present() {
        let r = resolve(Some(false), Some(true), None).unwrap();
        assert!(!r.value);
        assert_eq!(r.layer, Layer::Explicit);
    }

    #[test]
    fn nothing_supplied_stays_unset() {
        assert_eq!(resolve::<String>(None, s(""), None), None);
    }

    #[test]
    fn layer_display_names() {
        assert_eq!(Layer::Explicit.to_string(), "explicit");
        assert_eq!(Layer::ConfigFile.to_string(), "config-file");
        assert_eq!(Layer::Default.to_string(), "default");
    }
}
