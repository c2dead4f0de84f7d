//! Strongly-typed identifiers for remote resources.
//!
//! Every identifier handed out by the control plane is an opaque string that
//! parses as a UUID. Wrapping each kind in its own type keeps a workspace id
//! from being passed where an item id is expected:
//!
//! ```rust
//! use fabdeploy_core::id::{ItemId, WorkspaceId};
//!
//! let workspace = WorkspaceId::generate();
//! let item = ItemId::generate();
//!
//! // Different types - this won't compile:
//! // let wrong: WorkspaceId = item;
//! # let _ = (workspace, item);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps a raw UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Returns true for the all-zero placeholder id.
            #[must_use]
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|e| Error::InvalidId {
                        message: format!("invalid {} '{s}': {e}", $label),
                    })
            }
        }
    };
}

uuid_id!(
    /// Identifier of a workspace, the container that scopes items and connections.
    WorkspaceId,
    "workspace ID"
);

uuid_id!(
    /// Identifier of an item (lakehouse, notebook, semantic model, report, ...).
    ItemId,
    "item ID"
);

uuid_id!(
    /// Identifier of a capacity backing a workspace.
    CapacityId,
    "capacity ID"
);

uuid_id!(
    /// Identifier of a connection.
    ConnectionId,
    "connection ID"
);

uuid_id!(
    /// Identifier of an asynchronous job instance.
    JobId,
    "job ID"
);

uuid_id!(
    /// Object id of a user or service principal in the directory.
    PrincipalId,
    "principal ID"
);

uuid_id!(
    /// Identifier of a service principal profile.
    ProfileId,
    "profile ID"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_id_roundtrip() {
        let id = WorkspaceId::generate();
        let parsed: WorkspaceId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_trims_whitespace() {
        let id: ItemId = " 6f1c2a4e-0c3b-4f55-9f7e-2d9a1b0c3d4e\n".parse().unwrap();
        assert_eq!(id.to_string(), "6f1c2a4e-0c3b-4f55-9f7e-2d9a1b0c3d4e");
    }

    #[test]
    fn nil_id_is_detected() {
        let id: CapacityId = "00000000-0000-0000-0000-000000000000".parse().unwrap();
        assert!(id.is_nil());
    }

    #[test]
    fn invalid_id_names_the_kind() {
        let err = "not-a-uuid".parse::<ConnectionId>().unwrap_err();
        assert!(err.to_string().contains("connection ID"));
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = JobId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
