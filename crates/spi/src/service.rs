//! Typed service registration and lookup.
//!
//! Services are stored as `Arc<dyn Trait>` behind their [`ServiceName`]. The
//! [`ServiceRegistry`] is owned by the bootstrapper; extensions reach it only
//! through a [`ServiceExtensionContext`], which enforces that every read and
//! write matches the extension's descriptor.

use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::{BootError, Config, ExtensionDescriptor, ExtensionName, ServiceName};

/// Associates an SPI trait object type with its service name.
///
/// Implemented for `dyn Trait` types, e.g.
/// `impl ServiceType for dyn AssetIndex { const NAME: &'static str = "asset-index"; }`.
pub trait ServiceType: Send + Sync + 'static {
    /// The unique service name.
    const NAME: &'static str;

    /// Returns [`Self::NAME`] as a [`ServiceName`].
    fn service_name() -> ServiceName {
        ServiceName::from_static(Self::NAME)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct Registration {
    provider: ExtensionName,
    value: Box<dyn Any + Send + Sync>,
}

/// Resolved services, keyed by service name, in registration order.
#[derive(Default)]
pub struct ServiceRegistry {
    entries: HashMap<ServiceName, Vec<Registration>>,
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (service, registrations) in &self.entries {
            let providers: Vec<&str> = registrations.iter().map(|r| r.provider.as_str()).collect();
            map.entry(&service.as_str(), &providers);
        }
        map.finish()
    }
}

impl ServiceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service instance provided by `provider`.
    pub fn insert<T: ServiceType + ?Sized>(&mut self, provider: ExtensionName, service: Arc<T>) {
        self.entries
            .entry(T::service_name())
            .or_default()
            .push(Registration {
                provider,
                value: Box::new(service),
            });
    }

    /// Drops every registration made by `provider`.
    pub fn remove_provider(&mut self, provider: &ExtensionName) {
        for registrations in self.entries.values_mut() {
            registrations.retain(|r| &r.provider != provider);
        }
        self.entries.retain(|_, registrations| !registrations.is_empty());
    }

    /// Returns `true` if at least one instance of `service` is registered.
    pub fn contains(&self, service: &ServiceName) -> bool {
        self.entries.get(service).is_some_and(|r| !r.is_empty())
    }

    /// Returns the extensions that registered `service`, in order.
    pub fn providers_of(&self, service: &ServiceName) -> Vec<&ExtensionName> {
        self.entries
            .get(service)
            .map(|r| r.iter().map(|r| &r.provider).collect())
            .unwrap_or_default()
    }

    /// Returns the first registered instance of `T`.
    pub fn get<T: ServiceType + ?Sized>(&self) -> Result<Arc<T>, BootError> {
        self.find::<T>()?.ok_or_else(|| BootError::UnresolvedDependency {
            service: T::service_name(),
            required_by: None,
        })
    }

    /// Returns the first registered instance of `T`, or `None`.
    pub fn find<T: ServiceType + ?Sized>(&self) -> Result<Option<Arc<T>>, BootError> {
        match self.entries.get(&T::service_name()).and_then(|r| r.first()) {
            Some(registration) => downcast::<T>(registration).map(Some),
            None => Ok(None),
        }
    }

    /// Returns every registered instance of `T`, in registration order.
    pub fn all<T: ServiceType + ?Sized>(&self) -> Result<Vec<Arc<T>>, BootError> {
        self.entries
            .get(&T::service_name())
            .map(|registrations| registrations.iter().map(downcast::<T>).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn downcast<T: ServiceType + ?Sized>(registration: &Registration) -> Result<Arc<T>, BootError> {
    registration
        .value
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| BootError::ServiceTypeMismatch {
            service: T::service_name(),
        })
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// The view of the runtime handed to one extension's `initialize` hook.
///
/// Every operation is checked against the extension's descriptor:
/// registering a service it does not provide, or reading one it does not
/// require, fails with [`BootError::UndeclaredService`]. When the extension is
/// a [`crate::ProviderKind::Default`] provider that lost to an override, its
/// registration for that service is silently dropped.
pub struct ServiceExtensionContext<'a> {
    descriptor: &'a ExtensionDescriptor,
    config: &'a Config,
    connector_name: &'a str,
    registry: &'a mut ServiceRegistry,
    selected: BTreeSet<ServiceName>,
}

impl<'a> ServiceExtensionContext<'a> {
    /// Creates a context for the extension described by `descriptor`.
    ///
    /// `selected` lists the services for which this extension was chosen as
    /// (one of) the active providers.
    pub fn new(
        descriptor: &'a ExtensionDescriptor,
        config: &'a Config,
        connector_name: &'a str,
        registry: &'a mut ServiceRegistry,
        selected: BTreeSet<ServiceName>,
    ) -> Self {
        Self {
            descriptor,
            config,
            connector_name,
            registry,
            selected,
        }
    }

    /// The extension this context belongs to.
    pub fn extension_name(&self) -> &ExtensionName {
        self.descriptor.name()
    }

    /// The runtime configuration.
    pub fn config(&self) -> &Config {
        self.config
    }

    /// The connector's name (`edc.connector.name`).
    pub fn connector_name(&self) -> &str {
        self.connector_name
    }

    /// Reads a setting, falling back to `default`.
    pub fn setting(&self, key: &str, default: &str) -> String {
        self.config.string_or(key, default)
    }

    /// Registers an implementation of `T`.
    pub fn register<T: ServiceType + ?Sized>(&mut self, service: Arc<T>) -> Result<(), BootError> {
        let name = T::service_name();
        if self.descriptor.provision(&name).is_none() {
            return Err(self.undeclared(name));
        }
        if !self.selected.contains(&name) {
            debug!(
                extension = %self.descriptor.name(),
                service = %name,
                "Default provider overridden, registration discarded"
            );
            return Ok(());
        }
        self.registry.insert::<T>(self.descriptor.name().clone(), service);
        Ok(())
    }

    /// Returns the required service `T`.
    pub fn service<T: ServiceType + ?Sized>(&self) -> Result<Arc<T>, BootError> {
        self.optional_service::<T>()?
            .ok_or_else(|| BootError::UnresolvedDependency {
                service: T::service_name(),
                required_by: Some(self.descriptor.name().clone()),
            })
    }

    /// Returns the service `T` if a provider registered it.
    pub fn optional_service<T: ServiceType + ?Sized>(&self) -> Result<Option<Arc<T>>, BootError> {
        self.check_required(&T::service_name())?;
        self.registry.find::<T>()
    }

    /// Returns every registered instance of `T` (shared services).
    pub fn services<T: ServiceType + ?Sized>(&self) -> Result<Vec<Arc<T>>, BootError> {
        self.check_required(&T::service_name())?;
        self.registry.all::<T>()
    }

    fn check_required(&self, name: &ServiceName) -> Result<(), BootError> {
        if self.descriptor.requirement(name).is_some() {
            Ok(())
        } else {
            Err(self.undeclared(name.clone()))
        }
    }

    fn undeclared(&self, service: ServiceName) -> BootError {
        BootError::UndeclaredService {
            extension: self.descriptor.name().clone(),
            service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    impl ServiceType for dyn Greeter {
        const NAME: &'static str = "greeter";
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    fn selected(names: &[&'static str]) -> BTreeSet<ServiceName> {
        names.iter().map(|n| ServiceName::from_static(n)).collect()
    }

    #[test]
    fn registered_service_is_visible_to_dependents() {
        let config = Config::empty();
        let mut registry = ServiceRegistry::new();

        let provider = ExtensionDescriptor::named("provider").provides::<dyn Greeter>();
        let mut ctx = ServiceExtensionContext::new(
            &provider,
            &config,
            "c",
            &mut registry,
            selected(&["greeter"]),
        );
        ctx.register::<dyn Greeter>(Arc::new(English)).unwrap();

        let consumer = ExtensionDescriptor::named("consumer").requires::<dyn Greeter>();
        let ctx =
            ServiceExtensionContext::new(&consumer, &config, "c", &mut registry, BTreeSet::new());
        assert_eq!(ctx.service::<dyn Greeter>().unwrap().greet(), "hello");
    }

    #[test]
    fn undeclared_access_is_rejected() {
        let config = Config::empty();
        let mut registry = ServiceRegistry::new();
        let bare = ExtensionDescriptor::named("bare");
        let mut ctx =
            ServiceExtensionContext::new(&bare, &config, "c", &mut registry, BTreeSet::new());

        assert!(matches!(
            ctx.register::<dyn Greeter>(Arc::new(English)),
            Err(BootError::UndeclaredService { .. })
        ));
        assert!(matches!(
            ctx.service::<dyn Greeter>(),
            Err(BootError::UndeclaredService { .. })
        ));
    }

    #[test]
    fn overridden_default_registration_is_dropped() {
        let config = Config::empty();
        let mut registry = ServiceRegistry::new();
        let fallback = ExtensionDescriptor::named("fallback").provides_default::<dyn Greeter>();
        let mut ctx =
            ServiceExtensionContext::new(&fallback, &config, "c", &mut registry, BTreeSet::new());

        ctx.register::<dyn Greeter>(Arc::new(English)).unwrap();
        assert!(!registry.contains(&<dyn Greeter as ServiceType>::service_name()));
    }

    #[test]
    fn missing_required_service_names_the_requirer() {
        let config = Config::empty();
        let mut registry = ServiceRegistry::new();
        let consumer = ExtensionDescriptor::named("consumer").requires::<dyn Greeter>();
        let ctx =
            ServiceExtensionContext::new(&consumer, &config, "c", &mut registry, BTreeSet::new());

        match ctx.service::<dyn Greeter>() {
            Err(BootError::UnresolvedDependency { service, required_by }) => {
                assert_eq!(service.as_str(), "greeter");
                assert_eq!(required_by.unwrap().as_str(), "consumer");
            }
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }
}
