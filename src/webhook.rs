//! Webhook trust gate for inbound status callbacks.
//!
//! Callbacks are authenticated with HMAC-SHA256 over the exact request body,
//! carried as `sha256=<hex>` in a signature header. Verification must run on
//! the raw bytes as received: decoding and re-encoding the JSON changes the
//! digest.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::error::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Prefix every signature header value must carry.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Header name used when signing outbound notifications.
pub const SIGNATURE_HEADER: &str = "X-Signature-256";

/// Status update body posted by the automation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub job_id: String,
    pub status: String,
    #[serde(default)]
    pub pr_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Decides whether an inbound callback really comes from the pipeline.
#[derive(Clone, Default)]
pub struct WebhookGate {
    secret: Option<String>,
    allow_insecure: bool,
}

impl std::fmt::Debug for WebhookGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookGate")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("allow_insecure", &self.allow_insecure)
            .finish()
    }
}

impl WebhookGate {
    /// Builds a gate. An empty secret counts as no secret.
    pub fn new(secret: Option<String>, allow_insecure: bool) -> Self {
        let secret = secret.filter(|s| !s.is_empty());
        if secret.is_none() && allow_insecure {
            warn!("webhook signature verification is disabled (insecure mode)");
        }
        Self {
            secret,
            allow_insecure,
        }
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Checks `signature_header` against the HMAC of `payload`.
    ///
    /// Without a secret this fails closed unless insecure mode was enabled
    /// explicitly.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> bool {
        let Some(secret) = &self.secret else {
            if !self.allow_insecure {
                warn!("rejecting webhook: no secret configured");
            }
            return self.allow_insecure;
        };

        let Some(hex_digest) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
            debug!("signature header lacks the sha256= prefix");
            return false;
        };
        let Ok(claimed) = hex::decode(hex_digest) else {
            debug!("signature header is not valid hex");
            return false;
        };

        let expected = digest(secret.as_bytes(), payload);
        let matches: bool = expected.as_slice().ct_eq(claimed.as_slice()).into();
        if !matches {
            debug!(payload_len = payload.len(), "webhook signature mismatch");
        }
        matches
    }

    /// Verifies the raw body, then decodes it.
    pub fn accept(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<CallbackPayload, WebhookError> {
        if !self.verify(payload, signature_header) {
            return Err(WebhookError::InvalidSignature);
        }
        serde_json::from_slice(payload).map_err(WebhookError::MalformedPayload)
    }

    /// Signs `payload` with the configured secret, if any.
    pub fn sign(&self, payload: &[u8]) -> Option<String> {
        self.secret.as_deref().map(|secret| sign(secret, payload))
    }
}

/// Produces the `sha256=<hex>` header value for `payload`.
pub fn sign(secret: &str, payload: &[u8]) -> String {
    format!("{SIGNATURE_PREFIX}{}", hex::encode(digest(secret.as_bytes(), payload)))
}

fn digest(key: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}
