//! Error types for license issuance and parsing.

use thiserror::Error;

/// Boxed error from a signing, parsing or authority collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The license request violates a precondition.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The signer rejected the subject payload or the authority material.
    #[error("license signing failed: {context}")]
    Signing {
        context: String,
        #[source]
        source: BoxError,
    },

    /// The authority could not be generated.
    #[error("authority generation failed: {context}")]
    AuthorityGeneration {
        context: String,
        #[source]
        source: BoxError,
    },

    /// The artifact could not be decoded.
    #[error("license decode failed: {context}")]
    Decode {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Certificate signature does not verify against the authority.
    #[error("license signature invalid")]
    InvalidSignature,

    /// Certificate was issued by someone other than the trusted authority.
    #[error("license issued by untrusted authority: {0}")]
    UntrustedIssuer(String),

    /// Certificate does not carry usable license claims.
    #[error("invalid license payload: {0}")]
    InvalidPayload(String),

    /// License has expired.
    #[error("license expired on {0}")]
    Expired(String),

    /// License validity window has not started yet.
    #[error("license not valid before {0}")]
    NotYetValid(String),

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LicenseError {
    pub(crate) fn signing(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Signing {
            context: context.into(),
            source: source.into(),
        }
    }

    pub(crate) fn authority(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::AuthorityGeneration {
            context: context.into(),
            source: source.into(),
        }
    }

    pub(crate) fn decode(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Decode {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Returns true if caller-supplied data violated a precondition.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter(_))
    }

    /// Returns true if a signing, decoding or authority collaborator failed.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Signing { .. } | Self::AuthorityGeneration { .. } | Self::Decode { .. }
        )
    }

    /// Nothing in this crate is worth retrying without changing the input.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
