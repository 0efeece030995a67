//! The bootstrapper: turns a set of extensions into a running [`Runtime`].
//!
//! Boot is strictly sequential. Every check that can be made from descriptors
//! alone (duplicates, unresolved requirements, cycles) happens before the first
//! `initialize` call, so a bad composition never partially initializes.

use std::future::Future;
use std::sync::Arc;

use spi::{
    BootError, Config, ConfigurationExtension, ExtensionDescriptor, ExtensionError, ExtensionName,
    ServiceExtension, ServiceExtensionContext, ServiceRegistry, CONNECTOR_NAME_SETTING,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::registry::ExtensionRegistry;

/// Builder collecting configuration sources, overrides and extensions.
pub struct Bootstrapper {
    configuration: Vec<Box<dyn ConfigurationExtension>>,
    environment: Config,
    overrides: Config,
    extensions: Vec<Box<dyn ServiceExtension>>,
}

impl Default for Bootstrapper {
    fn default() -> Self {
        Self::new()
    }
}

impl Bootstrapper {
    /// A bootstrapper reading settings from the process environment.
    pub fn new() -> Self {
        Self {
            configuration: Vec::new(),
            environment: Config::from_env_vars(std::env::vars()),
            overrides: Config::empty(),
            extensions: Vec::new(),
        }
    }

    /// Ignores the process environment (used by tests for reproducibility).
    #[must_use]
    pub fn without_environment(mut self) -> Self {
        self.environment = Config::empty();
        self
    }

    /// Adds a configuration source.
    #[must_use]
    pub fn configuration(self, source: impl ConfigurationExtension + 'static) -> Self {
        self.configuration_boxed(Box::new(source))
    }

    /// Adds a boxed configuration source.
    #[must_use]
    pub fn configuration_boxed(mut self, source: Box<dyn ConfigurationExtension>) -> Self {
        self.configuration.push(source);
        self
    }

    /// Sets a setting that overrides every other source.
    #[must_use]
    pub fn setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides = self.overrides.merge(Config::from_pairs([(key.into(), value.into())]));
        self
    }

    /// Adds an extension.
    #[must_use]
    pub fn extension(self, extension: impl ServiceExtension + 'static) -> Self {
        self.extension_boxed(Box::new(extension))
    }

    /// Adds a boxed extension.
    #[must_use]
    pub fn extension_boxed(mut self, extension: Box<dyn ServiceExtension>) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Boots the runtime, then runs `entry_point` and shuts down once it
    /// returns.
    pub async fn run<F, Fut>(self, entry_point: F) -> Result<Fut::Output, BootError>
    where
        F: FnOnce(RuntimeHandle) -> Fut,
        Fut: Future,
    {
        let runtime = self.boot().await?;
        Ok(runtime.run(entry_point).await)
    }

    /// Wires, initializes, prepares and starts every extension.
    pub async fn boot(self) -> Result<Runtime, BootError> {
        let config =
            crate::config::assemble(&self.configuration, self.environment, self.overrides)?;
        let connector_name =
            config.string_or(CONNECTOR_NAME_SETTING, &format!("edc-{}", Uuid::new_v4()));
        info!(connector = %connector_name, "Booting runtime");

        let mut registry = ExtensionRegistry::new();
        let mut pending: Vec<(ExtensionDescriptor, Box<dyn ServiceExtension>)> =
            Vec::with_capacity(self.extensions.len());
        for extension in self.extensions {
            let descriptor = extension.descriptor();
            registry.register(descriptor.clone())?;
            pending.push((descriptor, extension));
        }

        let plan = registry.plan()?;
        pending.sort_by_key(|(descriptor, _)| {
            plan.position(descriptor.name()).unwrap_or(usize::MAX)
        });
        debug!(
            order = ?plan.order().iter().map(ExtensionName::as_str).collect::<Vec<_>>(),
            "Load plan computed"
        );

        let mut services = ServiceRegistry::new();
        let mut initialized: Vec<(ExtensionDescriptor, Box<dyn ServiceExtension>)> = Vec::new();
        for (descriptor, mut extension) in pending {
            let name = descriptor.name().clone();
            let selected = plan.selected_services(&name);

            // A provider that failed recoverably leaves its services unregistered.
            // Requirements the extension provides itself are registered during
            // its own initialization.
            for requirement in descriptor
                .requires_list()
                .iter()
                .filter(|r| !r.optional && !selected.contains(&r.service))
            {
                if !services.contains(&requirement.service) {
                    return Err(BootError::UnresolvedDependency {
                        service: requirement.service.clone(),
                        required_by: Some(name),
                    });
                }
            }

            let result = {
                let mut context = ServiceExtensionContext::new(
                    &descriptor,
                    &config,
                    &connector_name,
                    &mut services,
                    selected.clone(),
                );
                extension.initialize(&mut context)
            };

            match result {
                Ok(()) => {
                    if let Some(missing) = selected
                        .iter()
                        .find(|service| !services.providers_of(service).contains(&&name))
                    {
                        return Err(BootError::ExtensionInitializationFailure {
                            extension: name,
                            source: ExtensionError::fatal(format!(
                                "declared service '{missing}' was not registered"
                            )),
                        });
                    }
                    info!(extension = %name, "Initialized");
                    initialized.push((descriptor, extension));
                }
                Err(err) if err.is_fatal() => {
                    return Err(BootError::ExtensionInitializationFailure {
                        extension: name,
                        source: err,
                    });
                }
                Err(err) => {
                    warn!(
                        extension = %name,
                        error = %err,
                        "Initialization failed, extension skipped"
                    );
                    services.remove_provider(&name);
                }
            }
        }

        for (descriptor, extension) in &mut initialized {
            match extension.prepare() {
                Ok(()) => {}
                Err(err) if err.is_fatal() => {
                    return Err(BootError::ExtensionInitializationFailure {
                        extension: descriptor.name().clone(),
                        source: err,
                    });
                }
                Err(err) => warn!(extension = %descriptor.name(), error = %err, "Prepare failed"),
            }
        }

        let mut runtime = Runtime {
            connector_name,
            config,
            services: Arc::new(services),
            started: Vec::with_capacity(initialized.len()),
        };

        for (descriptor, mut extension) in initialized {
            let name = descriptor.name().clone();
            match extension.start().await {
                Ok(()) => {
                    debug!(extension = %name, "Started");
                    runtime.started.push((name, extension));
                }
                Err(err) if err.is_fatal() => {
                    runtime.shutdown().await;
                    return Err(BootError::ExtensionStartFailure {
                        extension: name,
                        source: err,
                    });
                }
                Err(err) => {
                    warn!(extension = %name, error = %err, "Start failed, extension skipped");
                }
            }
        }

        info!(
            connector = %runtime.connector_name,
            extensions = runtime.started.len(),
            "Runtime ready"
        );
        Ok(runtime)
    }
}

// ---------------------------------------------------------------------------
// Running runtime
// ---------------------------------------------------------------------------

/// What the entry point sees of a running runtime.
#[derive(Clone)]
pub struct RuntimeHandle {
    connector_name: Arc<str>,
    config: Arc<Config>,
    services: Arc<ServiceRegistry>,
}

impl RuntimeHandle {
    /// The connector's name.
    pub fn connector_name(&self) -> &str {
        &self.connector_name
    }

    /// The assembled configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The resolved services.
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }
}

/// A booted runtime. Dropping it without [`Runtime::shutdown`] skips the
/// extensions' shutdown hooks.
pub struct Runtime {
    connector_name: String,
    config: Config,
    services: Arc<ServiceRegistry>,
    started: Vec<(ExtensionName, Box<dyn ServiceExtension>)>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("connector_name", &self.connector_name)
            .field("started", &self.started_extensions())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// The connector's name.
    pub fn connector_name(&self) -> &str {
        &self.connector_name
    }

    /// Names of the started extensions, in start order.
    pub fn started_extensions(&self) -> Vec<&ExtensionName> {
        self.started.iter().map(|(name, _)| name).collect()
    }

    /// A handle for entry points.
    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            connector_name: Arc::from(self.connector_name.as_str()),
            config: Arc::new(self.config.clone()),
            services: Arc::clone(&self.services),
        }
    }

    /// Runs `entry_point`, then shuts down.
    pub async fn run<F, Fut>(mut self, entry_point: F) -> Fut::Output
    where
        F: FnOnce(RuntimeHandle) -> Fut,
        Fut: Future,
    {
        let output = entry_point(self.handle()).await;
        self.shutdown().await;
        output
    }

    /// Shuts extensions down in reverse start order. Errors are logged; every
    /// extension gets its shutdown call. Calling this twice is a no-op.
    pub async fn shutdown(&mut self) {
        while let Some((name, mut extension)) = self.started.pop() {
            match extension.shutdown().await {
                Ok(()) => debug!(extension = %name, "Shut down"),
                Err(err) => warn!(extension = %name, error = %err, "Shutdown failed"),
            }
        }
        info!(connector = %self.connector_name, "Runtime stopped");
    }
}
