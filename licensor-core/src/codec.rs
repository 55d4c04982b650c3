//! License generation and the round-trip test helper.

use crate::authority::{AuthorityGenerator, SelfSignedAuthority};
use crate::config::TestLicenseConfig;
use crate::error::LicenseResult;
use crate::license::License;
use crate::payload::LicensePayload;
use crate::request::LicenseRequest;
use crate::x509::{LicenseParser, LicenseSigner, Validity, X509Parser, X509Signer};
use chrono::Utc;
use tracing::{debug, info};

/// Turns checked license requests into signed artifacts.
#[derive(Debug, Clone, Default)]
pub struct LicenseGenerator<S = X509Signer> {
    signer: S,
}

impl<S: LicenseSigner> LicenseGenerator<S> {
    /// Creates a generator backed by `signer`.
    pub fn new(signer: S) -> Self {
        Self { signer }
    }

    /// Generates a license artifact for `request`.
    ///
    /// The clock is sampled once; that sample drives both the request check
    /// and the issuance time written into the certificate.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LicenseError::InvalidParameter`] if the request fails
    /// its checks, or the signer's error otherwise.
    pub fn generate(&self, request: &LicenseRequest) -> LicenseResult<String> {
        let now = Utc::now();
        request.check_at(now)?;
        let expires_at = request.expires_at(now)?;

        let payload = LicensePayload::from_request(request);
        let validity = Validity::new(now, expires_at);
        debug!(license_id = %payload.id, max_nodes = payload.max_nodes, "issuing license");

        let artifact = self.signer.sign(&payload, validity, &request.authority)?;

        info!(
            license_id = %payload.id,
            expires_at = %validity.not_after,
            "license issued"
        );
        Ok(artifact)
    }
}

/// Generates a license artifact with the default X.509 signer.
///
/// # Errors
///
/// See [`LicenseGenerator::generate`].
pub fn generate_license(request: &LicenseRequest) -> LicenseResult<String> {
    LicenseGenerator::new(X509Signer).generate(request)
}

/// Issues and parses back a license signed by a throwaway authority.
///
/// Meant for test suites of components that consume licenses.
///
/// # Errors
///
/// Fails if the authority cannot be generated, or signing or parsing fails.
pub fn new_test_license(config: &TestLicenseConfig) -> LicenseResult<License> {
    let authority = SelfSignedAuthority.generate(&config.authority_common_name)?;
    let request = LicenseRequest::new(authority, config.max_nodes, config.valid_for);
    let artifact = generate_license(&request)?;
    X509Parser::trusting(request.authority.cert_pem).parse(&artifact)
}
