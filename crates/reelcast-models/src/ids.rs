//! Entity identifiers.
//!
//! Each entity gets its own UUID-backed string newtype so that ids for
//! different entities cannot be mixed up at compile time.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a new random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Create from an existing string.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Get the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Unique identifier for a reel post.
    PostId
);
string_id!(
    /// Unique identifier for a capture template.
    TemplateId
);
string_id!(
    /// Unique identifier for a capture queue item.
    QueueItemId
);
string_id!(
    /// Unique identifier for a publish target.
    TargetId
);
string_id!(
    /// Unique identifier for an export record.
    ExportId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(PostId::new(), PostId::new());
    }

    #[test]
    fn test_id_roundtrip() {
        let id = TemplateId::from_string("tpl-1");
        assert_eq!(id.as_str(), "tpl-1");
        assert_eq!(id.to_string(), "tpl-1");
    }
}
