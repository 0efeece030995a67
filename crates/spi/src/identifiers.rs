//! Newtype identifiers for the composition model.
//!
//! Extension names and service names are both strings under the hood, but they
//! key different maps in the registry. Keeping them as distinct types prevents
//! looking up a provider by an extension name or vice versa.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, from_static(), as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty
            /// or only whitespace.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.trim().is_empty() { None } else { Some(Self(v)) }
            }

            /// Creates an identifier from a compile-time constant.
            ///
            /// An empty literal is a programming error: debug builds panic,
            /// release builds fall back to `"unnamed"`.
            pub fn from_static(value: &'static str) -> Self {
                debug_assert!(
                    !value.trim().is_empty(),
                    concat!(stringify!($name), " literal must not be blank")
                );
                Self::new(value).unwrap_or_else(|| Self("unnamed".to_owned()))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value).ok_or_else(|| format!("{} must not be empty", stringify!($name)))
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

string_id! {
    /// Identifies an extension within one runtime, e.g. `"web-server"`.
    ///
    /// Extension names are the keys of the runtime manifest and must be unique
    /// per runtime.
    ExtensionName
}

string_id! {
    /// Identifies a service provider interface, e.g. `"asset-index"`.
    ///
    /// Every SPI trait object type carries one through
    /// [`crate::ServiceType::NAME`].
    ServiceName
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected() {
        assert!(ExtensionName::new("").is_none());
        assert!(ExtensionName::new("   ").is_none());
        assert!(ServiceName::new("\t").is_none());
    }

    #[test]
    fn static_names_keep_their_literal() {
        assert_eq!(ExtensionName::from_static("web-server").as_str(), "web-server");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "ServiceName literal must not be blank")]
    fn blank_static_name_panics_in_debug_builds() {
        let _ = ServiceName::from_static("");
    }

    #[test]
    fn names_round_trip_through_json() {
        let name = ServiceName::new("asset-index").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"asset-index\"");

        let parsed: ServiceName = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn empty_name_fails_to_deserialize() {
        let parsed: Result<ExtensionName, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());
    }
}
