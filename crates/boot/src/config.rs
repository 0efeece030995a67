//! Configuration assembly.
//!
//! Precedence, lowest first: configuration extensions (in the order given),
//! environment variables, explicit overrides.

use spi::{Config, ConfigError, ConfigurationExtension};
use tracing::debug;

/// Merges all configuration sources into the runtime configuration.
pub fn assemble(
    sources: &[Box<dyn ConfigurationExtension>],
    environment: Config,
    overrides: Config,
) -> Result<Config, ConfigError> {
    let bootstrap = environment.clone().merge(overrides.clone());

    let mut config = Config::empty();
    for source in sources {
        let loaded = source.load(&bootstrap)?;
        debug!(
            source = source.name(),
            settings = loaded.entries().count(),
            "Configuration source loaded"
        );
        config = config.merge(loaded);
    }

    Ok(config.merge(environment).merge(overrides))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, Config);

    impl ConfigurationExtension for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn load(&self, _bootstrap: &Config) -> Result<Config, ConfigError> {
            Ok(self.1.clone())
        }
    }

    struct PathAware;

    impl ConfigurationExtension for PathAware {
        fn name(&self) -> &str {
            "path-aware"
        }

        fn load(&self, bootstrap: &Config) -> Result<Config, ConfigError> {
            Ok(Config::from_pairs([("seen", bootstrap.string_or("file", "none"))]))
        }
    }

    #[test]
    fn later_sources_override_earlier_ones() {
        let sources: Vec<Box<dyn ConfigurationExtension>> = vec![
            Box::new(Fixed("first", Config::from_pairs([("a", "1"), ("b", "1"), ("c", "1")]))),
            Box::new(Fixed("second", Config::from_pairs([("b", "2"), ("c", "2")]))),
        ];
        let config = assemble(
            &sources,
            Config::from_pairs([("c", "env")]),
            Config::empty(),
        )
        .unwrap();

        assert_eq!(config.get("a"), Some("1"));
        assert_eq!(config.get("b"), Some("2"));
        assert_eq!(config.get("c"), Some("env"));
    }

    #[test]
    fn overrides_win_and_are_visible_to_sources() {
        let sources: Vec<Box<dyn ConfigurationExtension>> = vec![Box::new(PathAware)];
        let config = assemble(
            &sources,
            Config::from_pairs([("file", "env.toml")]),
            Config::from_pairs([("file", "override.toml")]),
        )
        .unwrap();

        assert_eq!(config.get("seen"), Some("override.toml"));
        assert_eq!(config.get("file"), Some("override.toml"));
    }
}
