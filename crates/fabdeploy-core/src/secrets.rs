//! File-backed secret store.
//!
//! Secrets live one per file in a directory (the layout produced by mounted
//! secret volumes): the file name is the key, the trimmed content the value.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::observability::Redacted;

/// Secret keys read by [`crate::config::Settings`].
pub mod keys {
    /// Client secret of the service principal application.
    pub const CLIENT_SECRET: &str = "client-secret";
    /// Pre-acquired bearer token for the service principal.
    pub const SERVICE_PRINCIPAL_TOKEN: &str = "service-principal-token";
    /// Pre-acquired bearer token for the delegated user.
    pub const USER_TOKEN: &str = "user-token";
    /// Pre-acquired bearer token for the service principal profile.
    pub const PROFILE_TOKEN: &str = "profile-token";
}

/// A directory of one-file-per-secret entries.
#[derive(Debug, Clone)]
pub struct DirectorySecretStore {
    root: PathBuf,
}

impl DirectorySecretStore {
    /// Opens a secret directory.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the path is not a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::configuration(format!(
                "secret store {} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Returns the store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads a secret. Missing or blank entries yield `None`.
    ///
    /// # Errors
    ///
    /// Returns an io error if the entry exists but cannot be read.
    pub fn get(&self, key: &str) -> Result<Option<Redacted<String>>> {
        let path = self.root.join(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::io(format!("failed to read secret {}", path.display()), e))?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        Ok(Some(Redacted::new(trimmed.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_trimmed_secret() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(keys::CLIENT_SECRET), "s3cret\n").unwrap();

        let store = DirectorySecretStore::open(dir.path()).unwrap();
        let secret = store.get(keys::CLIENT_SECRET).unwrap().unwrap();
        assert_eq!(secret.expose(), "s3cret");
    }

    #[test]
    fn missing_and_blank_entries_are_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(keys::USER_TOKEN), "   \n").unwrap();

        let store = DirectorySecretStore::open(dir.path()).unwrap();
        assert!(store.get(keys::USER_TOKEN).unwrap().is_none());
        assert!(store.get(keys::SERVICE_PRINCIPAL_TOKEN).unwrap().is_none());
    }

    #[test]
    fn non_directory_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(
            DirectorySecretStore::open(&file),
            Err(Error::Configuration { .. })
        ));
    }
}
