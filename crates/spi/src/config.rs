//! Runtime configuration.
//!
//! [`Config`] is a flat map of dotted keys (`web.http.management.port`) to
//! string values. Sources are merged by the bootstrapper before any extension
//! initializes; extensions only read.

use std::collections::BTreeMap;

use crate::ConfigError;

/// An immutable set of settings keyed by dotted path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    entries: BTreeMap<String, String>,
}

impl Config {
    /// An empty configuration.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a configuration from key/value pairs. Later pairs win.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Maps environment variables to settings.
    ///
    /// `EDC_API_AUTH_KEY=x` becomes `edc.api.auth.key = x`. Variables whose
    /// names contain anything other than ASCII letters, digits and `_` are
    /// ignored.
    pub fn from_env_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        Self::from_pairs(vars.into_iter().filter_map(|(name, value)| {
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return None;
            }
            Some((name.to_ascii_lowercase().replace('_', "."), value))
        }))
    }

    /// Returns a new configuration where `other`'s entries override ours.
    #[must_use]
    pub fn merge(mut self, other: Config) -> Self {
        self.entries.extend(other.entries);
        self
    }

    /// Returns `true` if `key` is set.
    pub fn has_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns `true` if no setting is present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the raw value of a setting.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns a required string setting.
    pub fn string(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key).map(str::to_owned).ok_or_else(|| ConfigError::Missing {
            key: key.to_owned(),
        })
    }

    /// Returns a string setting or `default` when absent.
    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_owned()
    }

    /// Returns a required integer setting.
    pub fn integer(&self, key: &str) -> Result<i64, ConfigError> {
        let raw = self.get(key).ok_or_else(|| ConfigError::Missing {
            key: key.to_owned(),
        })?;
        parse_integer(key, raw)
    }

    /// Returns an integer setting or `default` when absent. A present but
    /// unparsable value is still an error.
    pub fn integer_or(&self, key: &str, default: i64) -> Result<i64, ConfigError> {
        match self.get(key) {
            Some(raw) => parse_integer(key, raw),
            None => Ok(default),
        }
    }

    /// Returns a boolean setting or `default` when absent.
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key).map(str::trim) {
            None => Ok(default),
            Some(raw) if raw.eq_ignore_ascii_case("true") => Ok(true),
            Some(raw) if raw.eq_ignore_ascii_case("false") => Ok(false),
            Some(raw) => Err(ConfigError::Invalid {
                key: key.to_owned(),
                value: raw.to_owned(),
                expected: "a boolean",
            }),
        }
    }

    /// Returns the settings under `prefix`, with the prefix (and its trailing
    /// dot) stripped from the keys.
    ///
    /// `sub_config("web.http")` on `web.http.port = 8181` yields `port = 8181`.
    pub fn sub_config(&self, prefix: &str) -> Config {
        let dotted = format!("{prefix}.");
        Config {
            entries: self
                .entries
                .iter()
                .filter_map(|(k, v)| {
                    k.strip_prefix(&dotted)
                        .map(|rest| (rest.to_owned(), v.clone()))
                })
                .collect(),
        }
    }

    /// Groups settings by their first key segment.
    ///
    /// Keys without a dot are grouped under the empty name, so
    /// `{port, path, management.port}` partitions into `"" → {port, path}`
    /// and `"management" → {port}`.
    pub fn partition(&self) -> BTreeMap<String, Config> {
        let mut groups: BTreeMap<String, Config> = BTreeMap::new();
        for (key, value) in &self.entries {
            let (group, rest) = match key.split_once('.') {
                Some((group, rest)) => (group.to_owned(), rest.to_owned()),
                None => (String::new(), key.clone()),
            };
            groups
                .entry(group)
                .or_default()
                .entries
                .insert(rest, value.clone());
        }
        groups
    }
}

fn parse_integer(key: &str, raw: &str) -> Result<i64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_owned(),
        value: raw.to_owned(),
        expected: "an integer",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_vars_become_dotted_lowercase_keys() {
        let config = Config::from_env_vars([
            ("EDC_API_AUTH_KEY".to_owned(), "secret".to_owned()),
            ("WEB_HTTP_PORT".to_owned(), "9000".to_owned()),
            ("weird-name".to_owned(), "ignored".to_owned()),
        ]);
        assert_eq!(config.get("edc.api.auth.key"), Some("secret"));
        assert_eq!(config.integer("web.http.port"), Ok(9000));
        assert!(!config.has_key("weird-name"));
    }

    #[test]
    fn merge_prefers_the_argument() {
        let base = Config::from_pairs([("a", "1"), ("b", "1")]);
        let merged = base.merge(Config::from_pairs([("b", "2")]));
        assert_eq!(merged.get("a"), Some("1"));
        assert_eq!(merged.get("b"), Some("2"));
    }

    #[test]
    fn typed_getters_report_missing_and_invalid_values() {
        let config = Config::from_pairs([("port", "eighty"), ("flag", "TRUE")]);
        assert_eq!(
            config.integer("missing"),
            Err(ConfigError::Missing {
                key: "missing".into()
            })
        );
        assert!(matches!(
            config.integer_or("port", 80),
            Err(ConfigError::Invalid { .. })
        ));
        assert_eq!(config.integer_or("other", 80), Ok(80));
        assert_eq!(config.bool_or("flag", false), Ok(true));
        assert_eq!(config.string_or("nope", "fallback"), "fallback");
    }

    #[test]
    fn sub_config_strips_the_prefix_only_on_segment_boundaries() {
        let config = Config::from_pairs([
            ("web.http.port", "8181"),
            ("web.http.management.path", "/mgmt"),
            ("web.httpx.port", "1"),
        ]);
        let http = config.sub_config("web.http");
        assert_eq!(http.get("port"), Some("8181"));
        assert_eq!(http.get("management.path"), Some("/mgmt"));
        assert!(!http.has_key("x.port"));
        assert_eq!(http.entries().count(), 2);
    }

    #[test]
    fn partition_groups_by_first_segment() {
        let config = Config::from_pairs([
            ("port", "8181"),
            ("path", "/api"),
            ("management.port", "8182"),
            ("management.path", "/management"),
        ]);
        let groups = config.partition();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[""].get("port"), Some("8181"));
        assert_eq!(groups["management"].get("path"), Some("/management"));
    }
}
