//! Decoded view of a license certificate.

use crate::error::{LicenseError, LicenseResult};
use crate::payload::LicensePayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a license stands relative to its validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    /// Inside the validity window.
    Active,
    /// The validity window has not started yet.
    NotYetValid,
    /// The validity window is over.
    Expired,
}

impl LicenseStatus {
    /// Returns true if the licensed application may run.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A parsed license: claims plus the certificate fields that bound them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub(crate) payload: LicensePayload,
    pub(crate) issued_at: DateTime<Utc>,
    pub(crate) expires_at: DateTime<Utc>,
    pub(crate) issuer: String,
    pub(crate) serial: String,
    pub(crate) fingerprint: String,
    #[serde(skip)]
    pub(crate) cert_pem: String,
    #[serde(skip)]
    pub(crate) key_pem: Option<String>,
}

impl License {
    /// Assembles a license from claims and a validity window.
    ///
    /// Used by [`crate::LicenseParser`] implementations outside this crate;
    /// certificate-specific fields stay empty.
    pub fn new(
        payload: LicensePayload,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            payload,
            issued_at,
            expires_at,
            issuer: issuer.into(),
            serial: String::new(),
            fingerprint: String::new(),
            cert_pem: String::new(),
            key_pem: None,
        }
    }

    /// Returns the license id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.payload.id
    }

    /// Returns the embedded claims.
    #[must_use]
    pub fn payload(&self) -> &LicensePayload {
        &self.payload
    }

    #[must_use]
    pub fn max_nodes(&self) -> u32 {
        self.payload.max_nodes
    }

    #[must_use]
    pub fn should_stop_app(&self) -> bool {
        self.payload.stop_app_on_expiry
    }

    /// Certificate `notBefore`.
    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Certificate `notAfter`.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Distinguished name of the signing authority.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Certificate serial number, colon separated hex.
    #[must_use]
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Base64url SHA-256 of the certificate DER.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// PEM of the license certificate alone.
    #[must_use]
    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    /// PEM of the license's own private key, if the artifact carried one.
    #[must_use]
    pub fn key_pem(&self) -> Option<&str> {
        self.key_pem.as_deref()
    }

    /// Returns the status of the license at `now`.
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> LicenseStatus {
        if now < self.issued_at {
            LicenseStatus::NotYetValid
        } else if now > self.expires_at {
            LicenseStatus::Expired
        } else {
            LicenseStatus::Active
        }
    }

    /// Returns the status of the license right now.
    #[must_use]
    pub fn status(&self) -> LicenseStatus {
        self.status_at(Utc::now())
    }

    /// Checks that `now` falls inside the validity window.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Expired`] or [`LicenseError::NotYetValid`].
    pub fn verify_at(&self, now: DateTime<Utc>) -> LicenseResult<()> {
        match self.status_at(now) {
            LicenseStatus::Active => Ok(()),
            LicenseStatus::NotYetValid => {
                Err(LicenseError::NotYetValid(self.issued_at.to_rfc3339()))
            }
            LicenseStatus::Expired => Err(LicenseError::Expired(self.expires_at.to_rfc3339())),
        }
    }
}
