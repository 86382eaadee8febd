/// Master-key authorization tokens for the document-store REST API
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::NodeError;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_PREFIX: &str = "type=master&ver=1.0&sig=";

/// Signed authorization for exactly one request
///
/// The token remembers the date it was signed with, so the date header sent
/// alongside it cannot drift from the signed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    value: String,
    date: String,
}

impl AuthToken {
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn date(&self) -> &str {
        &self.date
    }
}

/// Holds the decoded shared secret
pub struct RequestSigner {
    key: Vec<u8>,
}

impl RequestSigner {
    /// Decode the base64 transport encoding of the key
    ///
    /// An undecodable or empty key is fatal: without it no request can be
    /// authenticated.
    pub fn from_base64(key_b64: &str) -> Result<Self, NodeError> {
        let key = STANDARD
            .decode(key_b64.trim())
            .map_err(|e| NodeError::InvalidKey(e.to_string()))?;

        if key.is_empty() {
            return Err(NodeError::InvalidKey("key is empty".into()));
        }

        Ok(RequestSigner { key })
    }

    /// Sign one (verb, resource type, resource id, date) tuple
    pub fn sign(
        &self,
        verb: &str,
        resource_type: &str,
        resource_id: &str,
        date: &str,
    ) -> Result<AuthToken, NodeError> {
        let payload = canonical_payload(verb, resource_type, resource_id, date);

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| NodeError::InvalidKey(e.to_string()))?;
        mac.update(payload.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        Ok(AuthToken {
            value: format!("{}{}", TOKEN_PREFIX, signature.trim_end()),
            date: date.to_string(),
        })
    }
}

/// The exact byte sequence covered by the signature
///
/// Resource id keeps its case; everything else is lowercased. The two
/// trailing newlines stand for the empty trailing fields of the format.
fn canonical_payload(verb: &str, resource_type: &str, resource_id: &str, date: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}\n\n",
        verb.to_lowercase(),
        resource_type.to_lowercase(),
        resource_id,
        date.to_lowercase()
    )
}
