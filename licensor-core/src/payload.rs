//! License claims embedded in the certificate.
//!
//! The payload is JSON stored as the value of a non-critical X.509 extension
//! under [`LICENSE_EXTENSION_OID`]. Issuance and expiry are not part of the
//! payload; they live in the certificate's own validity fields.

use crate::request::LicenseRequest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Private-enterprise OID of the license claims extension.
pub const LICENSE_EXTENSION_OID: &[u64] = &[1, 3, 6, 1, 4, 1, 27624, 1, 1];

/// Dotted form of [`LICENSE_EXTENSION_OID`].
#[must_use]
pub fn license_extension_oid_string() -> String {
    LICENSE_EXTENSION_OID
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// The claims carried by a license certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensePayload {
    /// Unique license id, also used as the certificate serial number.
    pub id: Uuid,
    /// Maximum number of nodes the license allows.
    pub max_nodes: u32,
    /// Whether the application should stop once the license expires.
    #[serde(default)]
    pub stop_app_on_expiry: bool,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_metadata: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_version: String,
    #[serde(default)]
    pub account_id: String,
    /// Passphrase for decoding encrypted packages, base64 in JSON.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_bytes")]
    pub encryption_key: Option<Vec<u8>>,
}

impl LicensePayload {
    /// Builds the payload for a request, assigning a fresh license id.
    #[must_use]
    pub fn from_request(request: &LicenseRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            max_nodes: request.max_nodes,
            stop_app_on_expiry: request.stop_app_on_expiry,
            customer_name: request.customer_name.clone(),
            customer_email: request.customer_email.clone(),
            customer_metadata: request.customer_metadata.clone(),
            product_name: request.product_name.clone(),
            product_version: request.product_version.clone(),
            account_id: request.account_id.clone(),
            encryption_key: request.encryption_key.clone(),
        }
    }

    /// Serializes the payload into extension bytes.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parses extension bytes back into a payload.
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
