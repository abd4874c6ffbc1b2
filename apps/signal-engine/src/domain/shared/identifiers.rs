//! Strongly-typed identifiers.
//!
//! Broker order ids and store position ids are both strings on the wire;
//! separate types keep them from being swapped.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a new unique identifier using UUID v4.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(PositionId, "Store identifier for a single-leg or paired position.");
define_id!(BrokerOrderId, "Broker's unique identifier for an order.");
define_id!(ClientOrderId, "Client-assigned order identifier sent with each submission.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(PositionId::generate(), PositionId::generate());
    }

    #[test]
    fn display_matches_inner() {
        let id = BrokerOrderId::new("61e69015-8549-4bfd-b9c3-01e75843f47d");
        assert_eq!(id.to_string(), id.as_str());
    }
}
