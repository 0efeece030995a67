//! Shared value types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An in-place change applied by a store while it holds the entity
/// exclusively. Returning `Err(reason)` leaves the entity untouched and makes
/// the store report [`crate::StoreError::Rejected`].
pub type Mutation<'a, T> = Box<dyn FnOnce(&mut T) -> Result<(), String> + Send + 'a>;

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so extensions never depend on `chrono` types
/// directly. Serialises as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Data addresses
// ---------------------------------------------------------------------------

/// Where data lives or should be delivered: a typed bag of properties.
///
/// The `type` property selects the transfer technology (e.g. `"HttpData"`,
/// `"AmazonS3"`); all other keys are interpreted by that technology.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAddress {
    /// Free-form properties, including `type`.
    #[serde(default)]
    pub properties: std::collections::BTreeMap<String, String>,
}

impl DataAddress {
    /// Property key naming the transfer technology.
    pub const TYPE: &'static str = "type";

    /// Creates an address of the given type.
    pub fn of_type(kind: impl Into<String>) -> Self {
        let mut properties = std::collections::BTreeMap::new();
        properties.insert(Self::TYPE.to_owned(), kind.into());
        Self { properties }
    }

    /// Adds a property, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns the `type` property, if set.
    pub fn kind(&self) -> Option<&str> {
        self.properties.get(Self::TYPE).map(String::as_str)
    }

    /// Returns a property by key.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}
