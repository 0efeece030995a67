//! Extension descriptors and lifecycle traits.
//!
//! An extension is a unit of composition: it declares which services it
//! provides and which it requires, and the bootstrapper wires it accordingly.
//! Nothing is discovered implicitly; a runtime is exactly the set of extensions
//! its composition root hands to the bootstrapper.
//!
//! ## Lifecycle
//!
//! | Phase | Hook | Order |
//! |-------|------|-------|
//! | wire | [`ServiceExtension::initialize`] | dependency order, sequential |
//! | prepare | [`ServiceExtension::prepare`] | dependency order |
//! | start | [`ServiceExtension::start`] | dependency order |
//! | shutdown | [`ServiceExtension::shutdown`] | reverse dependency order |

use async_trait::async_trait;

use crate::{
    Config, ConfigError, ExtensionError, ExtensionName, ServiceExtensionContext, ServiceName,
    ServiceType,
};

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// How a provider claims a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// The only provider. Conflicts with any other exclusive or shared claim.
    Exclusive,
    /// A fallback, discarded when any non-default provider is present.
    Default,
    /// One of many. All shared providers are resolved, in load order.
    Shared,
}

/// A service an extension provides.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProvidedService {
    /// The service provided.
    pub service: ServiceName,
    /// How the service is claimed.
    pub kind: ProviderKind,
}

/// A service an extension requires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequiredService {
    /// The service required.
    pub service: ServiceName,
    /// Optional requirements do not fail resolution when no provider exists.
    pub optional: bool,
}

/// Static description of an extension: its name and its service edges.
///
/// Built with the typed builder methods so service names always come from
/// [`ServiceType::NAME`]:
///
/// ```
/// # use spi::{AssetIndex, EventRouter, ExtensionDescriptor, IdentityService};
/// let descriptor = ExtensionDescriptor::named("example")
///     .provides_default::<dyn AssetIndex>()
///     .requires::<dyn EventRouter>()
///     .requires_optional::<dyn IdentityService>();
/// assert_eq!(descriptor.name().as_str(), "example");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionDescriptor {
    name: ExtensionName,
    provides: Vec<ProvidedService>,
    requires: Vec<RequiredService>,
}

impl ExtensionDescriptor {
    /// Creates a descriptor with no service edges.
    pub fn new(name: ExtensionName) -> Self {
        Self {
            name,
            provides: Vec::new(),
            requires: Vec::new(),
        }
    }

    /// Creates a descriptor from a constant name.
    pub fn named(name: &'static str) -> Self {
        Self::new(ExtensionName::from_static(name))
    }

    /// Declares an exclusive provision of `T`.
    #[must_use]
    pub fn provides<T: ServiceType + ?Sized>(self) -> Self {
        self.provides_service(T::service_name(), ProviderKind::Exclusive)
    }

    /// Declares a default (fallback) provision of `T`.
    #[must_use]
    pub fn provides_default<T: ServiceType + ?Sized>(self) -> Self {
        self.provides_service(T::service_name(), ProviderKind::Default)
    }

    /// Declares a shared provision of `T`.
    #[must_use]
    pub fn provides_shared<T: ServiceType + ?Sized>(self) -> Self {
        self.provides_service(T::service_name(), ProviderKind::Shared)
    }

    /// Declares a hard requirement on `T`.
    #[must_use]
    pub fn requires<T: ServiceType + ?Sized>(self) -> Self {
        self.requires_service(T::service_name(), false)
    }

    /// Declares an optional requirement on `T`.
    #[must_use]
    pub fn requires_optional<T: ServiceType + ?Sized>(self) -> Self {
        self.requires_service(T::service_name(), true)
    }

    /// Declares a provision by name. Re-declaring a service replaces the
    /// earlier claim.
    #[must_use]
    pub fn provides_service(mut self, service: ServiceName, kind: ProviderKind) -> Self {
        self.provides.retain(|p| p.service != service);
        self.provides.push(ProvidedService { service, kind });
        self
    }

    /// Declares a requirement by name. Re-declaring a service replaces the
    /// earlier requirement.
    #[must_use]
    pub fn requires_service(mut self, service: ServiceName, optional: bool) -> Self {
        self.requires.retain(|r| r.service != service);
        self.requires.push(RequiredService { service, optional });
        self
    }

    /// The extension's name.
    pub fn name(&self) -> &ExtensionName {
        &self.name
    }

    /// Services provided, in declaration order.
    pub fn provides_list(&self) -> &[ProvidedService] {
        &self.provides
    }

    /// Services required, in declaration order.
    pub fn requires_list(&self) -> &[RequiredService] {
        &self.requires
    }

    /// Returns the provision of `service`, if declared.
    pub fn provision(&self, service: &ServiceName) -> Option<&ProvidedService> {
        self.provides.iter().find(|p| &p.service == service)
    }

    /// Returns the requirement on `service`, if declared.
    pub fn requirement(&self, service: &ServiceName) -> Option<&RequiredService> {
        self.requires.iter().find(|r| &r.service == service)
    }
}

// ---------------------------------------------------------------------------
// Lifecycle traits
// ---------------------------------------------------------------------------

/// A unit of functionality wired into the runtime.
///
/// `initialize` receives a context scoped to this extension: it may register
/// only the services its descriptor provides and read only the services its
/// descriptor requires. Dependencies are pulled from the context and kept in
/// the extension's own fields; there is no global lookup.
#[async_trait]
pub trait ServiceExtension: Send + Sync {
    /// Describes the extension's name and service edges.
    fn descriptor(&self) -> ExtensionDescriptor;

    /// Resolves dependencies and registers provided services.
    fn initialize(
        &mut self,
        context: &mut ServiceExtensionContext<'_>,
    ) -> Result<(), ExtensionError>;

    /// Called once every extension has initialized.
    fn prepare(&mut self) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Begins serving. Called in dependency order.
    async fn start(&mut self) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Releases resources. Called in reverse dependency order.
    async fn shutdown(&mut self) -> Result<(), ExtensionError> {
        Ok(())
    }
}

/// A source of settings, loaded before any [`ServiceExtension`] initializes.
pub trait ConfigurationExtension: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Loads settings. `bootstrap` holds the settings known before any
    /// configuration extension ran (environment and explicit overrides), so a
    /// source can locate itself (e.g. a file path setting).
    fn load(&self, bootstrap: &Config) -> Result<Config, ConfigError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssetIndex, EventRouter};

    #[test]
    fn redeclaring_a_service_replaces_the_claim() {
        let descriptor = ExtensionDescriptor::named("stores")
            .provides::<dyn AssetIndex>()
            .provides_default::<dyn AssetIndex>();
        assert_eq!(descriptor.provides_list().len(), 1);
        assert_eq!(descriptor.provides_list()[0].kind, ProviderKind::Default);
    }

    #[test]
    fn requirements_keep_their_optionality() {
        let descriptor =
            ExtensionDescriptor::named("listener").requires_optional::<dyn EventRouter>();
        let requirement = descriptor
            .requirement(&<dyn EventRouter as ServiceType>::service_name())
            .unwrap();
        assert!(requirement.optional);
    }
}
