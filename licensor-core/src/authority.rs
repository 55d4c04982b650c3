//! Certificate authority material used to sign licenses.
//!
//! The authority is a CA certificate plus its private key, both PEM encoded.
//! Only the certificate's issuer identity ends up in issued licenses; the
//! private key never leaves the signer.

use crate::error::{LicenseError, LicenseResult};
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, DnValue, IsCa, KeyPair,
    KeyUsagePurpose,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Validity of a generated authority certificate, in days (10 years).
pub const AUTHORITY_VALIDITY_DAYS: i64 = 10 * 365;

/// A certificate authority: PEM certificate plus PEM private key.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityKeyPair {
    /// PEM-encoded authority certificate.
    pub cert_pem: String,
    /// PEM-encoded authority private key.
    pub key_pem: String,
}

impl AuthorityKeyPair {
    /// Creates an authority from PEM strings.
    pub fn new(cert_pem: impl Into<String>, key_pem: impl Into<String>) -> Self {
        Self {
            cert_pem: cert_pem.into(),
            key_pem: key_pem.into(),
        }
    }

    /// Loads an authority from a certificate file and a key file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if either file cannot be read.
    pub fn from_files(
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
    ) -> LicenseResult<Self> {
        let cert_pem = std::fs::read_to_string(cert_path)?;
        let key_pem = std::fs::read_to_string(key_path)?;
        Ok(Self { cert_pem, key_pem })
    }

    /// Returns true if certificate material is present.
    #[must_use]
    pub fn has_certificate(&self) -> bool {
        !self.cert_pem.trim().is_empty()
    }
}

impl fmt::Debug for AuthorityKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorityKeyPair")
            .field("cert_pem", &self.cert_pem)
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

/// Produces a root key pair and a self-signed root certificate.
pub trait AuthorityGenerator {
    /// Generates a new authority identified by `common_name`.
    fn generate(&self, common_name: &str) -> LicenseResult<AuthorityKeyPair>;
}

/// Generates ECDSA P-256 self-signed CA certificates.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfSignedAuthority;

impl AuthorityGenerator for SelfSignedAuthority {
    fn generate(&self, common_name: &str) -> LicenseResult<AuthorityKeyPair> {
        let mut params = CertificateParams::default();

        let mut dn = DistinguishedName::new();
        dn.push(
            DnType::CommonName,
            DnValue::Utf8String(common_name.to_string()),
        );
        params.distinguished_name = dn;

        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];

        let now = time::OffsetDateTime::now_utc();
        params.not_before = now;
        params.not_after = now + time::Duration::days(AUTHORITY_VALIDITY_DAYS);

        let key_pair = KeyPair::generate()
            .map_err(|e| LicenseError::authority("failed to generate authority key", e))?;
        let cert = params
            .self_signed(&key_pair)
            .map_err(|e| LicenseError::authority("failed to self-sign authority certificate", e))?;

        debug!(common_name, "generated self-signed license authority");

        Ok(AuthorityKeyPair {
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
        })
    }
}
