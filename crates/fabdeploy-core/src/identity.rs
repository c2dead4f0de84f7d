//! Execution identities.
//!
//! A deployment acts under more than one identity: resources are provisioned
//! by a service principal (or the signed-in user), trial capacities only accept
//! assignment from the user, and embed tokens must be minted under the
//! profile that will serve end users. The active identity is always passed
//! explicitly; nothing in the process holds a mutable "current identity".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::id::PrincipalId;

/// The identity a single control-plane call is made under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionIdentity {
    /// The application's service principal.
    ServicePrincipal,
    /// The interactive (delegated) user.
    DelegatedUser,
    /// A service principal profile used for multi-tenant embedding.
    ServicePrincipalProfile,
}

impl ExecutionIdentity {
    /// All identities, in priming order.
    pub const ALL: [Self; 3] = [
        Self::ServicePrincipal,
        Self::DelegatedUser,
        Self::ServicePrincipalProfile,
    ];

    /// Returns the identity as a stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ServicePrincipal => "service_principal",
            Self::DelegatedUser => "delegated_user",
            Self::ServicePrincipalProfile => "service_principal_profile",
        }
    }
}

impl fmt::Display for ExecutionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the tool authenticates for provisioning work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationMode {
    /// Provision as the application's service principal.
    #[default]
    ServicePrincipal,
    /// Provision as the signed-in user.
    User,
}

impl AuthenticationMode {
    /// Returns the identity used for workspace and item provisioning.
    #[must_use]
    pub const fn provisioning_identity(self) -> ExecutionIdentity {
        match self {
            Self::ServicePrincipal => ExecutionIdentity::ServicePrincipal,
            Self::User => ExecutionIdentity::DelegatedUser,
        }
    }

    /// Returns true when provisioning runs as a service principal.
    #[must_use]
    pub const fn is_service_principal(self) -> bool {
        matches!(self, Self::ServicePrincipal)
    }
}

impl FromStr for AuthenticationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "service_principal" | "service-principal" | "spn" => Ok(Self::ServicePrincipal),
            "user" | "delegated_user" => Ok(Self::User),
            other => Err(Error::configuration(format!(
                "unknown authentication mode '{other}' (expected service_principal or user)"
            ))),
        }
    }
}

/// Kind of directory principal receiving a role assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrincipalType {
    /// A user account.
    User,
    /// A service principal.
    ServicePrincipal,
}

/// A directory principal that can be granted workspace or connection roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Object id of the principal.
    pub id: PrincipalId,
    /// Principal kind.
    #[serde(rename = "type")]
    pub principal_type: PrincipalType,
}

impl Principal {
    /// A user principal.
    #[must_use]
    pub const fn user(id: PrincipalId) -> Self {
        Self {
            id,
            principal_type: PrincipalType::User,
        }
    }

    /// A service principal.
    #[must_use]
    pub const fn service_principal(id: PrincipalId) -> Self {
        Self {
            id,
            principal_type: PrincipalType::ServicePrincipal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisioning_identity_follows_mode() {
        assert_eq!(
            AuthenticationMode::User.provisioning_identity(),
            ExecutionIdentity::DelegatedUser
        );
        assert_eq!(
            AuthenticationMode::ServicePrincipal.provisioning_identity(),
            ExecutionIdentity::ServicePrincipal
        );
    }

    #[test]
    fn auth_mode_parses_aliases() {
        assert_eq!(
            "Service-Principal".parse::<AuthenticationMode>().unwrap(),
            AuthenticationMode::ServicePrincipal
        );
        assert_eq!(
            "user".parse::<AuthenticationMode>().unwrap(),
            AuthenticationMode::User
        );
        assert!("kerberos".parse::<AuthenticationMode>().is_err());
    }

    #[test]
    fn principal_serializes_with_vendor_type_field() {
        let principal = Principal::service_principal(PrincipalId::generate());
        let value = serde_json::to_value(principal).unwrap();
        assert_eq!(value["type"], "ServicePrincipal");
    }
}
