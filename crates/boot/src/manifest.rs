//! Static extension selection.
//!
//! The composition root lists every extension linked into the binary in an
//! [`ExtensionCatalog`]; a [`RuntimeManifest`] then names the subset (and the
//! configuration sources) a particular runtime uses. Extensions are
//! instantiated by their catalog factory; nothing is discovered at runtime.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use spi::{BootError, ConfigurationExtension, ServiceExtension};
use thiserror::Error;

use crate::Bootstrapper;

/// Creates a fresh extension instance.
pub type ExtensionFactory = fn() -> Box<dyn ServiceExtension>;

/// Creates a fresh configuration source.
pub type ConfigurationFactory = fn() -> Box<dyn ConfigurationExtension>;

fn instantiate<E: ServiceExtension + Default + 'static>() -> Box<dyn ServiceExtension> {
    Box::new(E::default())
}

fn instantiate_configuration<C>() -> Box<dyn ConfigurationExtension>
where
    C: ConfigurationExtension + Default + 'static,
{
    Box::new(C::default())
}

/// Every extension a binary can load, keyed by manifest identifier.
#[derive(Debug, Clone, Default)]
pub struct ExtensionCatalog {
    extensions: IndexMap<String, ExtensionFactory>,
    configuration: IndexMap<String, ConfigurationFactory>,
}

impl ExtensionCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a default-constructible extension under `id`.
    #[must_use]
    pub fn with_extension<E: ServiceExtension + Default + 'static>(self, id: &str) -> Self {
        self.with_factory(id, instantiate::<E>)
    }

    /// Adds an extension factory under `id`. A repeated id replaces the
    /// earlier factory.
    #[must_use]
    pub fn with_factory(mut self, id: &str, factory: ExtensionFactory) -> Self {
        self.extensions.insert(id.to_owned(), factory);
        self
    }

    /// Adds a default-constructible configuration source under `id`.
    #[must_use]
    pub fn with_configuration<C>(mut self, id: &str) -> Self
    where
        C: ConfigurationExtension + Default + 'static,
    {
        self.configuration
            .insert(id.to_owned(), instantiate_configuration::<C>);
        self
    }

    /// Extension identifiers, in catalog order.
    pub fn extension_ids(&self) -> impl Iterator<Item = &str> {
        self.extensions.keys().map(String::as_str)
    }

    /// Configuration source identifiers, in catalog order.
    pub fn configuration_ids(&self) -> impl Iterator<Item = &str> {
        self.configuration.keys().map(String::as_str)
    }

    /// A manifest loading everything in the catalog.
    pub fn full_manifest(&self, name: &str) -> RuntimeManifest {
        RuntimeManifest {
            name: Some(name.to_owned()),
            configuration: self.configuration_ids().map(str::to_owned).collect(),
            extensions: self.extension_ids().map(str::to_owned).collect(),
            settings: BTreeMap::new(),
        }
    }

    /// Instantiates the manifest's configuration sources and extensions, in
    /// manifest order, into a [`Bootstrapper`].
    pub fn bootstrapper(&self, manifest: &RuntimeManifest) -> Result<Bootstrapper, BootError> {
        self.bootstrapper_from(Bootstrapper::new(), manifest)
    }

    /// Like [`Self::bootstrapper`] but starting from a preconfigured builder.
    pub fn bootstrapper_from(
        &self,
        mut bootstrapper: Bootstrapper,
        manifest: &RuntimeManifest,
    ) -> Result<Bootstrapper, BootError> {
        for id in &manifest.configuration {
            let factory = self
                .configuration
                .get(id)
                .ok_or_else(|| BootError::UnknownExtension { extension: id.clone() })?;
            bootstrapper = bootstrapper.configuration_boxed(factory());
        }
        for (key, value) in &manifest.settings {
            bootstrapper = bootstrapper.setting(key.clone(), value.clone());
        }
        for id in &manifest.extensions {
            let factory = self
                .extensions
                .get(id)
                .ok_or_else(|| BootError::UnknownExtension { extension: id.clone() })?;
            bootstrapper = bootstrapper.extension_boxed(factory());
        }
        Ok(bootstrapper)
    }
}

/// Which configuration sources and extensions a runtime loads.
///
/// ```toml
/// name = "consumer"
/// configuration = ["configuration-filesystem"]
/// extensions = ["control-plane-core", "web-server", "management-api"]
///
/// [settings]
/// "web.http.port" = "9191"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuntimeManifest {
    /// Runtime name, used in logs.
    #[serde(default)]
    pub name: Option<String>,
    /// Configuration source identifiers, lowest precedence first.
    #[serde(default)]
    pub configuration: Vec<String>,
    /// Extension identifiers.
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Settings applied as overrides.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

/// Errors reading a manifest file.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The file could not be read.
    #[error("Could not read manifest {}: {source}", path.display())]
    Read {
        /// The manifest path.
        path: PathBuf,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid manifest.
    #[error("Invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),
}

impl RuntimeManifest {
    /// Parses a manifest from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ManifestError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
