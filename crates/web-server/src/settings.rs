//! Web context settings.
//!
//! ```text
//! web.http.port = 8181              # default context
//! web.http.path = /api
//! web.http.management.port = 8182   # named context "management"
//! web.http.management.path = /management
//! ```
//!
//! The default context always exists. A named context needs a port; its path
//! defaults to `/<name>` and its host to the default context's host.

use std::collections::BTreeMap;

use spi::{Config, ConfigError};

use crate::WebServerError;

pub const SETTINGS_PREFIX: &str = "web.http";
pub const DEFAULT_CONTEXT: &str = "default";
pub const DEFAULT_PORT: u16 = 8181;
pub const DEFAULT_PATH: &str = "/api";
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// One listener: a port, a host to bind, and the path routes are nested under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebContext {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub path: String,
}

/// Reads every configured context, default first.
///
/// Port `0` binds an ephemeral port and never conflicts.
pub fn contexts_from(config: &Config) -> Result<Vec<WebContext>, WebServerError> {
    let mut groups = config.sub_config(SETTINGS_PREFIX).partition();
    let defaults = groups.remove("").unwrap_or_default();

    let host = defaults.string_or("host", DEFAULT_HOST);
    let mut contexts = vec![WebContext {
        name: DEFAULT_CONTEXT.to_owned(),
        host: host.clone(),
        port: port(&defaults, DEFAULT_CONTEXT, Some(DEFAULT_PORT))?,
        path: normalize_path(&defaults.string_or("path", DEFAULT_PATH)),
    }];

    for (name, settings) in groups {
        contexts.push(WebContext {
            port: port(&settings, &name, None)?,
            path: normalize_path(&settings.string_or("path", &format!("/{name}"))),
            host: settings.string_or("host", &host),
            name,
        });
    }

    let mut ports: BTreeMap<u16, &str> = BTreeMap::new();
    for context in &contexts {
        if context.port == 0 {
            continue;
        }
        if let Some(first) = ports.insert(context.port, &context.name) {
            return Err(WebServerError::PortConflict {
                port: context.port,
                first: first.to_owned(),
                second: context.name.clone(),
            });
        }
    }
    Ok(contexts)
}

fn port(settings: &Config, context: &str, default: Option<u16>) -> Result<u16, ConfigError> {
    let key = if context == DEFAULT_CONTEXT {
        format!("{SETTINGS_PREFIX}.port")
    } else {
        format!("{SETTINGS_PREFIX}.{context}.port")
    };
    let raw = match (settings.get("port"), default) {
        (Some(raw), _) => raw,
        (None, Some(port)) => return Ok(port),
        (None, None) => return Err(ConfigError::Missing { key }),
    };
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_owned(),
        expected: "a port number",
    })
}

/// `/api/` and `api` both become `/api`; an empty path becomes `/`.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    format!("/{trimmed}")
}
