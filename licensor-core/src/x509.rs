//! X.509 signing and parsing of license certificates.
//!
//! A license artifact is PEM text: the license certificate, signed by the
//! authority, followed by the license's own private key. Claims travel as
//! JSON in a custom extension (see [`crate::payload`]).
//!
//! The signer and parser sit behind [`LicenseSigner`] and [`LicenseParser`]
//! so the codec can be driven by fakes in tests.

use crate::authority::AuthorityKeyPair;
use crate::error::{LicenseError, LicenseResult};
use crate::license::License;
use crate::payload::{LICENSE_EXTENSION_OID, LicensePayload, license_extension_oid_string};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rcgen::{
    CertificateParams, CustomExtension, DistinguishedName, DnType, DnValue,
    ExtendedKeyUsagePurpose, IsCa, KeyPair, KeyUsagePurpose, SerialNumber,
};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;
use x509_parser::time::ASN1Time;

const CERTIFICATE_TAG: &str = "CERTIFICATE";
const PRIVATE_KEY_TAG: &str = "PRIVATE KEY";

/// Certificate validity window, at the one-second precision X.509 keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl Validity {
    /// Builds a window from exact instants.
    ///
    /// `not_before` is truncated and `not_after` rounded up to whole seconds,
    /// so a window that is non-empty stays non-empty.
    #[must_use]
    pub fn new(issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        let floor = DateTime::from_timestamp(issued_at.timestamp(), 0).unwrap_or(issued_at);
        let ceil_secs = if expires_at.timestamp_subsec_nanos() > 0 {
            expires_at.timestamp() + 1
        } else {
            expires_at.timestamp()
        };
        let ceil = DateTime::from_timestamp(ceil_secs, 0).unwrap_or(expires_at);
        Self {
            not_before: floor,
            not_after: ceil,
        }
    }
}

/// Signs a subject payload into a license artifact.
pub trait LicenseSigner {
    /// Produces the PEM artifact for `payload`, valid for `validity`,
    /// signed by `authority`.
    fn sign(
        &self,
        payload: &LicensePayload,
        validity: Validity,
        authority: &AuthorityKeyPair,
    ) -> LicenseResult<String>;
}

/// Decodes a license artifact into structured claims.
pub trait LicenseParser {
    fn parse(&self, artifact: &str) -> LicenseResult<License>;
}

impl<T: LicenseSigner + ?Sized> LicenseSigner for &T {
    fn sign(
        &self,
        payload: &LicensePayload,
        validity: Validity,
        authority: &AuthorityKeyPair,
    ) -> LicenseResult<String> {
        (**self).sign(payload, validity, authority)
    }
}

impl<T: LicenseParser + ?Sized> LicenseParser for &T {
    fn parse(&self, artifact: &str) -> LicenseResult<License> {
        (**self).parse(artifact)
    }
}

/// Default signer: ECDSA P-256 leaf certificates issued by the authority.
#[derive(Debug, Clone, Copy, Default)]
pub struct X509Signer;

impl LicenseSigner for X509Signer {
    fn sign(
        &self,
        payload: &LicensePayload,
        validity: Validity,
        authority: &AuthorityKeyPair,
    ) -> LicenseResult<String> {
        let authority_der = certificate_der(&authority.cert_pem)
            .map_err(|e| LicenseError::signing("failed to read authority certificate", e))?;
        let (_, authority_cert) = X509Certificate::from_der(&authority_der)
            .map_err(|e| LicenseError::signing("failed to parse authority certificate", e))?;
        if !authority_cert.is_ca() {
            return Err(LicenseError::signing(
                "authority certificate cannot sign licenses",
                "basic constraints do not mark it as a CA",
            ));
        }

        let ca_key = KeyPair::from_pem(&authority.key_pem)
            .map_err(|e| LicenseError::signing("failed to parse authority key", e))?;
        let ca_params = CertificateParams::from_ca_cert_pem(&authority.cert_pem)
            .map_err(|e| LicenseError::signing("failed to load authority certificate", e))?;
        let ca_cert = ca_params
            .self_signed(&ca_key)
            .map_err(|e| LicenseError::signing("failed to load authority", e))?;

        // Licenses name the rebuilt certificate as issuer, so it must carry
        // the authority's subject byte for byte.
        let (_, rebuilt) = X509Certificate::from_der(ca_cert.der())
            .map_err(|e| LicenseError::signing("failed to load authority", e))?;
        if rebuilt.subject().as_raw() != authority_cert.subject().as_raw() {
            return Err(LicenseError::signing(
                format!(
                    "authority subject \"{}\" cannot be used as an issuer name",
                    authority_cert.subject()
                ),
                "repeated or multi-valued name attributes are not supported",
            ));
        }

        let mut params = CertificateParams::default();
        params.distinguished_name = subject_name(payload);
        params.serial_number = Some(SerialNumber::from_slice(payload.id.as_bytes()));
        params.not_before = offset_date_time(validity.not_before)?;
        params.not_after = offset_date_time(validity.not_after)?;
        params.is_ca = IsCa::NoCa;
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsagePurpose::ClientAuth,
        ];

        let claims = payload
            .to_bytes()
            .map_err(|e| LicenseError::signing("failed to encode license claims", e))?;
        params.custom_extensions = vec![CustomExtension::from_oid_content(
            LICENSE_EXTENSION_OID,
            claims,
        )];

        let license_key = KeyPair::generate()
            .map_err(|e| LicenseError::signing("failed to generate license key", e))?;
        let cert = params
            .signed_by(&license_key, &ca_cert, &ca_key)
            .map_err(|e| LicenseError::signing("failed to sign license certificate", e))?;
        let cert_pem = cert.pem();

        // A key that does not belong to the authority certificate still signs;
        // only verification against the certificate catches it.
        X509Parser::trusting(authority.cert_pem.clone())
            .parse(&cert_pem)
            .map_err(|e| {
                LicenseError::signing("issued certificate does not verify against the authority", e)
            })?;

        debug!(license_id = %payload.id, "signed license certificate");

        Ok(format!("{cert_pem}{}", license_key.serialize_pem()))
    }
}

/// Default parser over PEM artifacts.
///
/// With [`X509Parser::trusting`] the certificate must be issued and signed by
/// the given authority; [`X509Parser::unverified`] only decodes.
#[derive(Debug, Clone, Default)]
pub struct X509Parser {
    authority_cert_pem: Option<String>,
}

impl X509Parser {
    /// Parser that verifies licenses against `authority_cert_pem`.
    pub fn trusting(authority_cert_pem: impl Into<String>) -> Self {
        Self {
            authority_cert_pem: Some(authority_cert_pem.into()),
        }
    }

    /// Parser that decodes without checking the signature.
    #[must_use]
    pub fn unverified() -> Self {
        Self::default()
    }

    fn verify_issued_by(&self, cert: &X509Certificate<'_>) -> LicenseResult<()> {
        let Some(authority_pem) = &self.authority_cert_pem else {
            return Ok(());
        };
        let authority_der = certificate_der(authority_pem)
            .map_err(|e| LicenseError::decode("failed to read authority certificate", e))?;
        let (_, authority) = X509Certificate::from_der(&authority_der)
            .map_err(|e| LicenseError::decode("failed to parse authority certificate", e))?;

        if cert.issuer() != authority.subject() {
            warn!(issuer = %cert.issuer(), "license issued by unexpected authority");
            return Err(LicenseError::UntrustedIssuer(cert.issuer().to_string()));
        }
        cert.verify_signature(Some(authority.public_key()))
            .map_err(|_| {
                warn!(issuer = %cert.issuer(), "license signature does not verify");
                LicenseError::InvalidSignature
            })
    }
}

impl LicenseParser for X509Parser {
    fn parse(&self, artifact: &str) -> LicenseResult<License> {
        let der = certificate_der(artifact)
            .map_err(|e| LicenseError::decode("failed to read license certificate", e))?;
        let (_, cert) = X509Certificate::from_der(&der)
            .map_err(|e| LicenseError::decode("failed to parse license certificate", e))?;

        self.verify_issued_by(&cert)?;

        let oid = license_extension_oid_string();
        let extension = cert
            .extensions()
            .iter()
            .find(|ext| ext.oid.to_id_string() == oid)
            .ok_or_else(|| {
                LicenseError::InvalidPayload("certificate carries no license claims".to_string())
            })?;
        let payload = LicensePayload::from_bytes(extension.value)
            .map_err(|e| LicenseError::decode("failed to decode license claims", e))?;
        if payload.max_nodes < 1 {
            return Err(LicenseError::InvalidPayload(
                "maximum number of servers must be 1 or more".to_string(),
            ));
        }

        let issued_at = asn1_time(cert.validity().not_before)?;
        let expires_at = asn1_time(cert.validity().not_after)?;
        if expires_at <= issued_at {
            return Err(LicenseError::InvalidPayload(
                "expiration date is not after issuance".to_string(),
            ));
        }

        let cert_pem = pem_section(artifact, CERTIFICATE_TAG)
            .unwrap_or_default()
            .to_string();
        let key_pem = pem_section(artifact, PRIVATE_KEY_TAG).map(str::to_string);

        Ok(License {
            payload,
            issued_at,
            expires_at,
            issuer: cert.issuer().to_string(),
            serial: cert.raw_serial_as_string(),
            fingerprint: URL_SAFE_NO_PAD.encode(Sha256::digest(&der)),
            cert_pem,
            key_pem,
        })
    }
}

/// Parses and verifies `artifact` against the authority certificate.
///
/// # Errors
///
/// Returns a decode, signature, issuer or payload error.
pub fn parse_license(artifact: &str, authority_cert_pem: &str) -> LicenseResult<License> {
    X509Parser::trusting(authority_cert_pem).parse(artifact)
}

fn subject_name(payload: &LicensePayload) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    let common_name = if payload.customer_name.is_empty() {
        "license".to_string()
    } else {
        payload.customer_name.clone()
    };
    dn.push(DnType::CommonName, DnValue::Utf8String(common_name));
    if !payload.product_name.is_empty() {
        dn.push(
            DnType::OrganizationName,
            DnValue::Utf8String(payload.product_name.clone()),
        );
    }
    dn
}

fn offset_date_time(at: DateTime<Utc>) -> LicenseResult<::time::OffsetDateTime> {
    ::time::OffsetDateTime::from_unix_timestamp(at.timestamp())
        .map_err(|e| LicenseError::signing(format!("validity bound {at} is out of range"), e))
}

fn asn1_time(at: ASN1Time) -> LicenseResult<DateTime<Utc>> {
    DateTime::from_timestamp(at.timestamp(), 0).ok_or_else(|| {
        LicenseError::InvalidPayload(format!("certificate time {at} is out of range"))
    })
}

/// DER of the first CERTIFICATE block in `text`.
fn certificate_der(text: &str) -> Result<Vec<u8>, crate::error::BoxError> {
    let blocks = pem::parse_many(text.trim())?;
    blocks
        .into_iter()
        .find(|block| block.tag() == CERTIFICATE_TAG)
        .map(|block| block.contents().to_vec())
        .ok_or_else(|| "no CERTIFICATE block found".into())
}

/// Verbatim text of the first PEM block labelled `tag`, markers included.
fn pem_section<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let begin = format!("-----BEGIN {tag}-----");
    let end = format!("-----END {tag}-----");
    let start = text.find(&begin)?;
    let stop = start + text[start..].find(&end)? + end.len();
    let stop = if text[stop..].starts_with('\n') { stop + 1 } else { stop };
    Some(&text[start..stop])
}
