//! License requests and their precondition checks.

use crate::authority::AuthorityKeyPair;
use crate::error::{LicenseError, LicenseResult};
use chrono::{DateTime, Duration, Utc};

/// Last instant an X.509 certificate can express: 9999-12-31T23:59:59Z.
const LATEST_CERTIFICATE_TIMESTAMP: i64 = 253_402_300_799;

/// Everything needed to issue one license.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseRequest {
    /// Maximum number of nodes the license allows.
    pub max_nodes: u32,
    /// Validity period, counted from issuance.
    pub valid_for: Duration,
    /// Whether the application should stop once the license expires.
    pub stop_app_on_expiry: bool,
    /// Name of the customer the license is issued to.
    pub customer_name: String,
    /// Email of the customer the license is issued to.
    pub customer_email: String,
    /// Arbitrary customer metadata.
    pub customer_metadata: String,
    /// Product the license is for.
    pub product_name: String,
    /// Product version the license is for.
    pub product_version: String,
    /// Account the license is for.
    pub account_id: String,
    /// Passphrase for decoding encrypted packages.
    pub encryption_key: Option<Vec<u8>>,
    /// Certificate authority to sign the license with.
    pub authority: AuthorityKeyPair,
}

impl Default for LicenseRequest {
    fn default() -> Self {
        Self {
            max_nodes: 0,
            valid_for: Duration::zero(),
            stop_app_on_expiry: false,
            customer_name: String::new(),
            customer_email: String::new(),
            customer_metadata: String::new(),
            product_name: String::new(),
            product_version: String::new(),
            account_id: String::new(),
            encryption_key: None,
            authority: AuthorityKeyPair::default(),
        }
    }
}

impl LicenseRequest {
    /// Creates a request with the mandatory fields set and everything else empty.
    pub fn new(authority: AuthorityKeyPair, max_nodes: u32, valid_for: Duration) -> Self {
        Self {
            max_nodes,
            valid_for,
            authority,
            ..Self::default()
        }
    }

    /// Checks the request against the current time.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidParameter`] on the first violated precondition.
    pub fn check(&self) -> LicenseResult<()> {
        self.check_at(Utc::now())
    }

    /// Checks the request against a pinned clock sample.
    ///
    /// The same `now` is used to compute the expiry and to compare against it,
    /// so a zero or negative `valid_for` is always rejected.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidParameter`] on the first violated precondition.
    pub fn check_at(&self, now: DateTime<Utc>) -> LicenseResult<()> {
        if self.max_nodes < 1 {
            return Err(LicenseError::InvalidParameter(
                "maximum number of servers must be 1 or more".to_string(),
            ));
        }
        self.expires_at(now)?;
        if !self.authority.has_certificate() {
            return Err(LicenseError::InvalidParameter(
                "certificate authority must be provided".to_string(),
            ));
        }
        Ok(())
    }

    /// Computes the expiry for a license issued at `now`.
    ///
    /// # Errors
    ///
    /// Fails if the expiry is not strictly after `now`, or falls beyond
    /// the last date a certificate can carry.
    pub(crate) fn expires_at(&self, now: DateTime<Utc>) -> LicenseResult<DateTime<Utc>> {
        let out_of_range =
            || LicenseError::InvalidParameter("validity period is out of range".to_string());
        let latest =
            DateTime::from_timestamp(LATEST_CERTIFICATE_TIMESTAMP, 0).ok_or_else(out_of_range)?;
        let expires_at = now
            .checked_add_signed(self.valid_for)
            .filter(|expires_at| *expires_at <= latest)
            .ok_or_else(out_of_range)?;
        if expires_at <= now {
            return Err(LicenseError::InvalidParameter(
                "expiration date can't be in the past".to_string(),
            ));
        }
        Ok(expires_at)
    }
}
