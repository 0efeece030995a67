//! Error types shared by the runtime and every extension.
//!
//! [`BootError`] covers conditions that stop the runtime from assembling
//! itself: provider conflicts, unresolved or cyclic dependencies, and
//! extensions whose lifecycle hooks fail. These are always fatal at startup;
//! the runtime never begins serving with a partially wired registry.
//!
//! [`ExtensionError`] is what an extension reports from its own lifecycle
//! hooks. It carries a [`Severity`] so the bootstrapper can decide between
//! aborting and logging-then-continuing.
//!
//! The remaining enums are component-level: configuration lookups, store
//! operations, control-plane services, and identity checks.

use thiserror::Error;

use crate::{ExtensionName, ServiceName};

// ---------------------------------------------------------------------------
// Composition errors
// ---------------------------------------------------------------------------

/// Errors that prevent the runtime from being assembled or started.
#[derive(Debug, Error)]
pub enum BootError {
    /// Two extensions with the same name were registered.
    #[error("Extension '{extension}' is registered more than once")]
    DuplicateExtension {
        /// The name that was registered twice.
        extension: ExtensionName,
    },

    /// Two extensions claim the same exclusive service.
    ///
    /// The pair is reported in registration order so the message is stable,
    /// but the failure itself does not depend on which one came first.
    #[error("Service '{service}' is provided by both '{existing}' and '{duplicate}'")]
    DuplicateProvider {
        /// The contested service.
        service: ServiceName,
        /// The provider that was registered first.
        existing: ExtensionName,
        /// The provider whose registration triggered the conflict.
        duplicate: ExtensionName,
    },

    /// No extension provides a service that is required.
    #[error("No provider for service '{service}'{}", required_by_suffix(.required_by))]
    UnresolvedDependency {
        /// The service that could not be resolved.
        service: ServiceName,
        /// The extension that declared the requirement, when known.
        required_by: Option<ExtensionName>,
    },

    /// The "requires" graph contains a cycle, so no initialization order exists.
    #[error("Cyclic dependency between extensions: {}", display_cycle(.cycle))]
    CyclicDependency {
        /// The closed path, first element repeated at the end (`a -> b -> a`).
        cycle: Vec<ExtensionName>,
    },

    /// An extension touched a service it did not declare in its descriptor.
    #[error("Extension '{extension}' did not declare service '{service}'")]
    UndeclaredService {
        /// The offending extension.
        extension: ExtensionName,
        /// The service it tried to register or read.
        service: ServiceName,
    },

    /// A service was registered under a name but holds a different type.
    #[error("Service '{service}' is registered with an incompatible type")]
    ServiceTypeMismatch {
        /// The service whose stored value could not be downcast.
        service: ServiceName,
    },

    /// An extension's `initialize` hook reported a fatal error, or it failed to
    /// register a service it is the selected provider for.
    #[error("Extension '{extension}' failed to initialize: {source}")]
    ExtensionInitializationFailure {
        /// The failing extension.
        extension: ExtensionName,
        /// The underlying cause.
        #[source]
        source: ExtensionError,
    },

    /// An extension's `start` hook failed.
    #[error("Extension '{extension}' failed to start: {source}")]
    ExtensionStartFailure {
        /// The failing extension.
        extension: ExtensionName,
        /// The underlying cause.
        #[source]
        source: ExtensionError,
    },

    /// A manifest names an extension the catalog does not know.
    #[error("Unknown extension '{extension}'")]
    UnknownExtension {
        /// The unknown identifier as written in the manifest.
        extension: String,
    },

    /// The runtime configuration could not be assembled.
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

fn required_by_suffix(required_by: &Option<ExtensionName>) -> String {
    match required_by {
        Some(extension) => format!(" (required by '{extension}')"),
        None => String::new(),
    }
}

fn display_cycle(cycle: &[ExtensionName]) -> String {
    cycle
        .iter()
        .map(ExtensionName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

// ---------------------------------------------------------------------------
// Extension lifecycle errors
// ---------------------------------------------------------------------------

/// How the bootstrapper should react to an [`ExtensionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Log and continue. The extension is skipped for the remaining lifecycle
    /// phases and its services stay unregistered.
    Recoverable,
    /// Abort the boot.
    Fatal,
}

/// Error reported by an extension's lifecycle hook.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExtensionError {
    severity: Severity,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ExtensionError {
    /// An error that must stop the runtime.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            message: message.into(),
            source: None,
        }
    }

    /// An error the runtime may survive.
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Recoverable,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the severity chosen by the extension.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Returns `true` if this error must stop the runtime.
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl From<BootError> for ExtensionError {
    fn from(err: BootError) -> Self {
        ExtensionError::fatal(err.to_string()).with_source(err)
    }
}

impl From<ConfigError> for ExtensionError {
    fn from(err: ConfigError) -> Self {
        ExtensionError::fatal(err.to_string()).with_source(err)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors raised while reading or assembling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("Missing required setting '{key}'")]
    Missing {
        /// The dotted key that was looked up.
        key: String,
    },

    /// A setting is present but cannot be parsed as the requested type.
    #[error("Setting '{key}' has value '{value}', expected {expected}")]
    Invalid {
        /// The dotted key.
        key: String,
        /// The raw value found.
        value: String,
        /// Human-readable description of the expected type.
        expected: &'static str,
    },

    /// A configuration source failed to load.
    #[error("Configuration source '{source_name}' failed: {message}")]
    Source {
        /// Name of the source (usually the configuration extension's name).
        source_name: String,
        /// Description of the failure.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Store and service errors
// ---------------------------------------------------------------------------

/// Result of a store mutation.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced by persistence SPIs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No entity with the given id exists.
    #[error("Object with ID {id} does not exist")]
    NotFound {
        /// The missing id.
        id: String,
    },

    /// An entity with the given id already exists.
    #[error("Object with ID {id} already exists")]
    AlreadyExists {
        /// The duplicate id.
        id: String,
    },

    /// A [`crate::Mutation`] refused to change the entity.
    #[error("{reason}")]
    Rejected {
        /// The entity's id.
        id: String,
        /// Why the change was refused.
        reason: String,
    },
}

/// Result of a control-plane service call.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors produced by control-plane services.
///
/// The variants mirror how a caller should react, which is also how the
/// management API maps them onto HTTP status codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The request conflicts with the current state.
    #[error("{0}")]
    Conflict(String),
    /// The request itself is invalid.
    #[error("{0}")]
    BadRequest(String),
    /// Anything else.
    #[error("{0}")]
    Unexpected(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ServiceError::NotFound(err.to_string()),
            StoreError::AlreadyExists { .. } | StoreError::Rejected { .. } => {
                ServiceError::Conflict(err.to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Identity errors
// ---------------------------------------------------------------------------

/// Errors produced by an [`crate::IdentityService`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The token is well-formed but not acceptable (wrong audience, expired…).
    #[error("Token rejected: {0}")]
    Rejected(String),
    /// The token could not be decoded.
    #[error("Malformed token: {0}")]
    Malformed(String),
    /// Credentials could not be obtained.
    #[error("Credentials unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(value: &str) -> ExtensionName {
        ExtensionName::new(value).unwrap()
    }

    #[test]
    fn cycle_is_rendered_as_a_path() {
        let err = BootError::CyclicDependency {
            cycle: vec![name("a"), name("b"), name("a")],
        };
        assert_eq!(err.to_string(), "Cyclic dependency between extensions: a -> b -> a");
    }

    #[test]
    fn unresolved_dependency_names_the_requirer_when_known() {
        let service = ServiceName::new("web-server").unwrap();
        let with = BootError::UnresolvedDependency {
            service: service.clone(),
            required_by: Some(name("management-api")),
        };
        let without = BootError::UnresolvedDependency {
            service,
            required_by: None,
        };
        assert_eq!(
            with.to_string(),
            "No provider for service 'web-server' (required by 'management-api')"
        );
        assert_eq!(without.to_string(), "No provider for service 'web-server'");
    }

    #[test]
    fn boot_errors_raised_inside_extensions_are_fatal() {
        let err: ExtensionError = BootError::UnknownExtension {
            extension: "x".into(),
        }
        .into();
        assert!(err.is_fatal());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn store_errors_map_to_service_errors() {
        let missing: ServiceError = StoreError::NotFound { id: "1".into() }.into();
        let dup: ServiceError = StoreError::AlreadyExists { id: "1".into() }.into();
        assert!(matches!(missing, ServiceError::NotFound(_)));
        assert!(matches!(dup, ServiceError::Conflict(_)));

        let rejected: ServiceError = StoreError::Rejected {
            id: "1".into(),
            reason: "already final".into(),
        }
        .into();
        assert_eq!(rejected, ServiceError::Conflict("already final".into()));
    }
}
