//! TOML file configuration source.
//!
//! Reads the file named by `edc.fs.config` (environment variable
//! `EDC_FS_CONFIG`, default `connector-configuration.toml` in the working
//! directory). Nested tables flatten to dotted keys, so
//!
//! ```toml
//! [web.http]
//! port = 8181
//! ```
//!
//! yields `web.http.port = "8181"`. A missing file yields no settings; a file
//! that cannot be read or parsed fails the boot.

use std::path::{Path, PathBuf};

use spi::{Config, ConfigError, ConfigurationExtension};
use toml::{Table, Value};
use tracing::{debug, info};

/// Setting naming the configuration file.
pub const CONFIG_LOCATION_SETTING: &str = "edc.fs.config";

/// File read when [`CONFIG_LOCATION_SETTING`] is not set.
pub const DEFAULT_CONFIG_LOCATION: &str = "connector-configuration.toml";

#[derive(Debug, Clone, Default)]
pub struct FsConfigurationExtension {
    path: Option<PathBuf>,
}

impl FsConfigurationExtension {
    pub const NAME: &'static str = "configuration-filesystem";

    /// Reads `path` regardless of [`CONFIG_LOCATION_SETTING`].
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    fn location(&self, bootstrap: &Config) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            PathBuf::from(bootstrap.string_or(CONFIG_LOCATION_SETTING, DEFAULT_CONFIG_LOCATION))
        })
    }
}

impl ConfigurationExtension for FsConfigurationExtension {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn load(&self, bootstrap: &Config) -> Result<Config, ConfigError> {
        let path = self.location(bootstrap);
        if !path.exists() {
            info!(path = %path.display(), "Configuration file not found, no settings loaded");
            return Ok(Config::empty());
        }
        let config = read(&path)?;
        debug!(
            path = %path.display(),
            settings = config.entries().count(),
            "Configuration file loaded"
        );
        Ok(config)
    }
}

fn read(path: &Path) -> Result<Config, ConfigError> {
    let source_error = |message: String| ConfigError::Source {
        source_name: format!("{} ({})", FsConfigurationExtension::NAME, path.display()),
        message,
    };
    let text = std::fs::read_to_string(path).map_err(|e| source_error(e.to_string()))?;
    let table: Table =
        toml::from_str(&text).map_err(|e: toml::de::Error| source_error(e.to_string()))?;

    let mut pairs = Vec::new();
    flatten("", &table, &mut pairs);
    Ok(Config::from_pairs(pairs))
}

fn flatten(prefix: &str, table: &Table, out: &mut Vec<(String, String)>) {
    for (key, value) in table {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Table(nested) => flatten(&key, nested, out),
            other => out.push((key, scalar(other))),
        }
    }
}

/// Strings are taken verbatim; arrays become comma-separated lists.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn nested_tables_flatten_to_dotted_keys() {
        let file = write_config(
            r#"
[edc.connector]
name = "provider"

[web.http]
port = 8181
path = "/api"

[web.http.management]
port = 8182

[edc]
flags = ["a", "b"]
secure = false
"#,
        );
        let config = FsConfigurationExtension::at(file.path())
            .load(&Config::empty())
            .unwrap();

        assert_eq!(config.get("edc.connector.name"), Some("provider"));
        assert_eq!(config.get("web.http.port"), Some("8181"));
        assert_eq!(config.get("web.http.path"), Some("/api"));
        assert_eq!(config.get("web.http.management.port"), Some("8182"));
        assert_eq!(config.get("edc.flags"), Some("a,b"));
        assert_eq!(config.get("edc.secure"), Some("false"));
    }

    #[test]
    fn location_comes_from_the_bootstrap_config() {
        let file = write_config("answer = 42\n");
        let bootstrap = Config::from_pairs([(
            CONFIG_LOCATION_SETTING.to_owned(),
            file.path().display().to_string(),
        )]);
        let config = FsConfigurationExtension::default().load(&bootstrap).unwrap();
        assert_eq!(config.integer("answer").unwrap(), 42);
    }

    #[test]
    fn missing_file_yields_no_settings() {
        let dir = tempfile::tempdir().unwrap();
        let config = FsConfigurationExtension::at(dir.path().join("absent.toml"))
            .load(&Config::empty())
            .unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let file = write_config("[web.http\nport = ");
        let err = FsConfigurationExtension::at(file.path())
            .load(&Config::empty())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Source { .. }));
    }
}
