//! Configuration for license issuance.
//!
//! Loaded from TOML. Every section is optional:
//!
//! ```toml
//! [authority]
//! cert = "ca.pem"
//! key = "ca-key.pem"
//!
//! [defaults]
//! max_nodes = 3
//! valid_for_days = 365
//! product_name = "gravity"
//! ```

use crate::authority::AuthorityKeyPair;
use crate::error::{LicenseError, LicenseResult};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Common name of the authority created by [`crate::new_test_license`].
pub const DEFAULT_TEST_AUTHORITY_NAME: &str = "license-signing-key";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LicensorConfig {
    #[serde(default)]
    pub authority: Option<AuthorityPaths>,
    #[serde(default)]
    pub defaults: LicenseDefaults,
}

/// Where the authority certificate and key live on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorityPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl AuthorityPaths {
    /// Reads the authority from disk.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if either file cannot be read.
    pub fn load(&self) -> LicenseResult<AuthorityKeyPair> {
        AuthorityKeyPair::from_files(&self.cert, &self.key)
    }
}

/// Default values for fields not given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LicenseDefaults {
    pub max_nodes: Option<u32>,
    pub valid_for_days: Option<u32>,
    pub product_name: Option<String>,
    pub product_version: Option<String>,
    #[serde(default)]
    pub stop_app_on_expiry: bool,
}

impl LicenseDefaults {
    /// Default validity as a duration.
    #[must_use]
    pub fn valid_for(&self) -> Option<Duration> {
        self.valid_for_days.map(|days| Duration::days(i64::from(days)))
    }
}

impl LicensorConfig {
    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] on malformed TOML or invalid values.
    pub fn from_toml_str(contents: &str) -> LicenseResult<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| LicenseError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Relative authority paths are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or
    /// [`LicenseError::Config`] if it is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> LicenseResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;
        if let (Some(authority), Some(base)) = (config.authority.as_mut(), path.parent()) {
            authority.cert = base.join(&authority.cert);
            authority.key = base.join(&authority.key);
        }
        Ok(config)
    }

    fn validate(&self) -> LicenseResult<()> {
        if self.defaults.max_nodes == Some(0) {
            return Err(LicenseError::Config(
                "defaults.max_nodes must be 1 or more".to_string(),
            ));
        }
        if self.defaults.valid_for_days == Some(0) {
            return Err(LicenseError::Config(
                "defaults.valid_for_days must be 1 or more".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters of [`crate::new_test_license`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestLicenseConfig {
    /// Common name of the throwaway authority.
    pub authority_common_name: String,
    pub max_nodes: u32,
    pub valid_for: Duration,
}

impl Default for TestLicenseConfig {
    fn default() -> Self {
        Self {
            authority_common_name: DEFAULT_TEST_AUTHORITY_NAME.to_string(),
            max_nodes: 3,
            valid_for: Duration::hours(1),
        }
    }
}
