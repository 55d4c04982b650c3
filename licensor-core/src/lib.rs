//! Software licenses encoded as signed X.509 certificates.
//!
//! A license is an ordinary certificate issued by a license authority:
//! - Claims (node ceiling, customer, product, account) travel as JSON in a
//!   custom extension
//! - The validity window is the certificate's `notBefore`/`notAfter`
//! - Tamper evidence and trust come from the authority's signature
//!
//! Licenses verify offline against the authority certificate; no network
//! call is involved.
//!
//! # Flow
//!
//! - [`LicenseRequest::check`] rejects malformed requests before any
//!   cryptographic work
//! - [`generate_license`] (or [`LicenseGenerator`] with a custom
//!   [`LicenseSigner`]) returns the PEM artifact
//! - [`parse_license`] (or any [`LicenseParser`]) turns an artifact back into
//!   a [`License`]

mod authority;
mod codec;
mod config;
mod error;
mod license;
mod payload;
mod request;
mod x509;

pub use authority::{
    AUTHORITY_VALIDITY_DAYS, AuthorityGenerator, AuthorityKeyPair, SelfSignedAuthority,
};
pub use codec::{LicenseGenerator, generate_license, new_test_license};
pub use config::{
    AuthorityPaths, DEFAULT_TEST_AUTHORITY_NAME, LicenseDefaults, LicensorConfig, TestLicenseConfig,
};
pub use error::{BoxError, LicenseError, LicenseResult};
pub use license::{License, LicenseStatus};
pub use payload::{LICENSE_EXTENSION_OID, LicensePayload, license_extension_oid_string};
pub use request::LicenseRequest;
pub use x509::{LicenseParser, LicenseSigner, Validity, X509Parser, X509Signer, parse_license};
