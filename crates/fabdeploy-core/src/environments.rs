//! Named deployment targets.
//!
//! An environments file maps a short name to the workspace a deployment
//! targets, and optionally the flow to run there:
//!
//! ```yaml
//! dev:
//!   workspace: Contoso Dev
//! prod:
//!   workspace: Contoso
//!   flow: hybrid
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which orchestration flow a deployment runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentFlow {
    /// Lakehouse, notebook, DirectLake model on OneLake, report. Reuses an
    /// existing workspace of the same name.
    #[default]
    Hybrid,
    /// Fresh workspace, lakehouse, notebook, DirectLake model over the SQL
    /// endpoint, report. Renames on workspace collision.
    Fabric,
    /// PBIX import into a workspace, then credential patching and refresh.
    PowerBi,
}

impl DeploymentFlow {
    /// Stable kebab-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hybrid => "hybrid",
            Self::Fabric => "fabric",
            Self::PowerBi => "power-bi",
        }
    }
}

impl fmt::Display for DeploymentFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentFlow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hybrid" => Ok(Self::Hybrid),
            "fabric" => Ok(Self::Fabric),
            "power-bi" | "powerbi" | "power_bi" => Ok(Self::PowerBi),
            other => Err(Error::configuration(format!(
                "unknown deployment flow '{other}' (expected hybrid, fabric or power-bi)"
            ))),
        }
    }
}

/// One named target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentTarget {
    /// Workspace display name.
    pub workspace: String,
    /// Flow override for this environment.
    #[serde(default)]
    pub flow: Option<DeploymentFlow>,
}

/// Environment name to target mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentMap(BTreeMap<String, EnvironmentTarget>);

impl EnvironmentMap {
    /// Parses a mapping from YAML.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the document is malformed.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::configuration(format!("invalid environments file: {e}")))
    }

    /// Reads a mapping file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;
        Self::from_yaml_str(&content)
    }

    /// Looks up an environment by name.
    ///
    /// # Errors
    ///
    /// Returns a configuration error listing the known names when `name` is
    /// not defined.
    pub fn resolve(&self, name: &str) -> Result<&EnvironmentTarget> {
        self.0.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.0.keys().map(String::as_str).collect();
            Error::configuration(format!(
                "unknown environment '{name}' (known: {})",
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            ))
        })
    }

    /// Environment names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "dev:\n  workspace: Contoso Dev\nprod:\n  workspace: Contoso\n  flow: power-bi\n";

    #[test]
    fn resolves_named_environment() {
        let map = EnvironmentMap::from_yaml_str(SAMPLE).unwrap();
        let prod = map.resolve("prod").unwrap();
        assert_eq!(prod.workspace, "Contoso");
        assert_eq!(prod.flow, Some(DeploymentFlow::PowerBi));
        assert_eq!(map.resolve("dev").unwrap().flow, None);
    }

    #[test]
    fn unknown_environment_lists_known_names() {
        let map = EnvironmentMap::from_yaml_str(SAMPLE).unwrap();
        let err = map.resolve("staging").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("dev, prod"));
    }

    #[test]
    fn flow_parses_aliases() {
        assert_eq!("PowerBI".parse::<DeploymentFlow>().unwrap(), DeploymentFlow::PowerBi);
        assert_eq!("fabric".parse::<DeploymentFlow>().unwrap(), DeploymentFlow::Fabric);
        assert!("lakehouse".parse::<DeploymentFlow>().is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("environments.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        let map = EnvironmentMap::load(&path).unwrap();
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["dev", "prod"]);
    }
}
