//! Environment merge, log masking and working-directory resolution.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Placeholder written to logs instead of sensitive values.
pub const MASKED_VALUE: &str = "***";

/// Name fragments that mark a variable as sensitive.
const SENSITIVE_MARKERS: &[&str] = &["API_KEY", "APIKEY", "SECRET", "TOKEN", "PASSWORD"];

/// Ordered environment overrides.
///
/// `Some(value)` sets a variable; `None` removes it from the child's
/// environment entirely, which is not the same as setting it to `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides(Vec<(String, Option<String>)>);

impl EnvOverrides {
    /// Creates an empty override list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Sets `key` to `value`.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), Some(value.into())));
        self
    }

    /// Removes `key`.
    #[must_use]
    pub fn unset(mut self, key: impl Into<String>) -> Self {
        self.0.push((key.into(), None));
        self
    }

    /// Appends all overrides from `other`; later entries win.
    pub fn extend(&mut self, other: &Self) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Iterates overrides in application order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Whether no overrides are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, Option<V>)> for EnvOverrides {
    fn from_iter<T: IntoIterator<Item = (K, Option<V>)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.map(Into::into)))
                .collect(),
        )
    }
}

/// Applies `overrides` on top of `base`.
pub fn merge_environment<I, K, V>(base: I, overrides: &EnvOverrides) -> BTreeMap<OsString, OsString>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<OsString>,
    V: Into<OsString>,
{
    let mut env: BTreeMap<OsString, OsString> = base
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();

    for (key, value) in overrides.iter() {
        match value {
            Some(value) => {
                env.insert(key.into(), value.into());
            }
            None => {
                env.remove(&OsString::from(key));
            }
        }
    }

    env
}

/// Whether a variable name denotes a key, token or other secret.
#[must_use]
pub fn is_sensitive_key(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    SENSITIVE_MARKERS.iter().any(|marker| upper.contains(marker))
}

/// Renders an environment for logging with sensitive values masked.
pub fn masked_snapshot<'a, I, K, V>(env: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (&'a K, &'a V)>,
    K: AsRef<std::ffi::OsStr> + ?Sized + 'a,
    V: AsRef<std::ffi::OsStr> + ?Sized + 'a,
{
    env.into_iter()
        .map(|(k, v)| {
            let key = k.as_ref().to_string_lossy().into_owned();
            let value = if is_sensitive_key(&key) {
                MASKED_VALUE.to_string()
            } else {
                v.as_ref().to_string_lossy().into_owned()
            };
            (key, value)
        })
        .collect()
}

/// Renders overrides for logging with sensitive values masked.
pub fn masked_overrides(overrides: &EnvOverrides) -> Vec<(String, Option<String>)> {
    overrides
        .iter()
        .map(|(k, v)| {
            let value = v.map(|v| {
                if is_sensitive_key(k) {
                    MASKED_VALUE.to_string()
                } else {
                    v.to_string()
                }
            });
            (k.to_string(), value)
        })
        .collect()
}

/// Picks the directory a call runs in.
///
/// Order: per-request directory, then the configured default, then the
/// current directory of this process.
pub fn resolve_working_directory(
    explicit: Option<&Path>,
    configured_default: Option<&Path>,
) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = configured_default {
        if !dir.is_dir() {
            return Err(ConfigError::MissingDirectory {
                path: dir.to_path_buf(),
            });
        }
        return Ok(dir.to_path_buf());
    }
    std::env::current_dir().map_err(ConfigError::CurrentDir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn env_of(pairs: &[(&str, &str)]) -> BTreeMap<OsString, OsString> {
        pairs
            .iter()
            .map(|(k, v)| (OsString::from(k), OsString::from(v)))
            .collect()
    }

    #[test]
    fn test_unset_removes_and_set_adds() {
        let overrides = EnvOverrides::new().unset("A").set("C", "3");
        let merged = merge_environment([("A", "1"), ("B", "2")], &overrides);
        assert_eq!(merged, env_of(&[("B", "2"), ("C", "3")]));
    }

    #[test]
    fn test_empty_value_is_kept_present() {
        let overrides = EnvOverrides::new().set("A", "");
        let merged = merge_environment([("A", "1")], &overrides);
        assert_eq!(merged, env_of(&[("A", "")]));
    }

    #[test]
    fn test_later_override_wins() {
        let mut overrides = EnvOverrides::new().unset("KEY");
        overrides.extend(&EnvOverrides::new().set("KEY", "caller"));
        let merged = merge_environment([("KEY", "inherited")], &overrides);
        assert_eq!(merged, env_of(&[("KEY", "caller")]));
    }

    #[test_case("GEMINI_API_KEY", true)]
    #[test_case("openai_api_key", true)]
    #[test_case("GOOGLE_APIKEY", true)]
    #[test_case("CLIENT_SECRET", true)]
    #[test_case("GITHUB_TOKEN", true)]
    #[test_case("DB_PASSWORD", true)]
    #[test_case("PATH", false)]
    #[test_case("HOME", false)]
    fn test_sensitive_names(name: &str, expected: bool) {
        assert_eq!(is_sensitive_key(name), expected);
    }

    #[test]
    fn test_masked_snapshot_hides_secret() {
        let env = env_of(&[("GEMINI_API_KEY", "secret123"), ("LANG", "C")]);
        let snapshot = masked_snapshot(&env);
        assert_eq!(snapshot["GEMINI_API_KEY"], MASKED_VALUE);
        assert_eq!(snapshot["LANG"], "C");
        assert!(!format!("{snapshot:?}").contains("secret123"));
        // the real value is untouched
        assert_eq!(env[&OsString::from("GEMINI_API_KEY")], "secret123");
    }

    #[test]
    fn test_masked_overrides() {
        let overrides = EnvOverrides::new().set("GEMINI_API_KEY", "secret123").unset("TERM_PROGRAM");
        let masked = masked_overrides(&overrides);
        assert_eq!(
            masked,
            vec![
                ("GEMINI_API_KEY".to_string(), Some(MASKED_VALUE.to_string())),
                ("TERM_PROGRAM".to_string(), None),
            ]
        );
    }

    #[test]
    fn test_working_directory_precedence() {
        let explicit = tempfile::tempdir().unwrap();
        let default = tempfile::tempdir().unwrap();

        let dir = resolve_working_directory(Some(explicit.path()), Some(default.path())).unwrap();
        assert_eq!(dir, explicit.path());

        let dir = resolve_working_directory(None, Some(default.path())).unwrap();
        assert_eq!(dir, default.path());

        let dir = resolve_working_directory(None, None).unwrap();
        assert_eq!(dir, std::env::current_dir().unwrap());
    }

    #[test]
    fn test_missing_default_directory() {
        let result = resolve_working_directory(None, Some(Path::new("/definitely/not/here")));
        assert!(matches!(result, Err(ConfigError::MissingDirectory { .. })));
    }
}
