//! # Task Signer
//!
//! Tamper-evident signatures for queue entries. The queue backend stores a
//! hook name and opaque args, and anything with queue access could enqueue a
//! forged entry under a known hook name; the signature lets the delivery
//! side reject payloads it did not itself produce, independent of the
//! backend's access control.
//!
//! The MAC is HMAC-SHA256 over a length-prefixed message:
//! `len(task_type) || task_type || canonical_json(payload)`. The length
//! prefix keeps distinct `(task_type, payload)` pairs from ever producing
//! the same message bytes. serde_json renders object keys in sorted order,
//! which makes the payload serialization canonical.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use std::sync::Arc;
use tracing::debug;

use crate::auth::SecretProvider;
use crate::error::{RelayError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Produces and verifies signatures binding a task type to its payload
pub struct TaskSigner {
    secrets: Arc<dyn SecretProvider>,
}

impl TaskSigner {
    pub fn new(secrets: Arc<dyn SecretProvider>) -> Self {
        Self { secrets }
    }

    /// Sign `(task_type, payload)` with the current secret, returning the
    /// hex-encoded MAC
    pub fn sign(&self, task_type: &str, payload: &Value) -> Result<String> {
        let mac = self.compute(task_type, payload)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Verify a received signature in constant time. Undecodable hex is a
    /// mismatch, not an error; only secret-resolution failures are errors.
    pub fn verify(&self, task_type: &str, payload: &Value, signature: &str) -> Result<bool> {
        let Ok(signature_bytes) = hex::decode(signature) else {
            debug!(task_type = %task_type, "Signature is not valid hex");
            return Ok(false);
        };

        let mac = self.compute(task_type, payload)?;
        Ok(mac.verify_slice(&signature_bytes).is_ok())
    }

    fn compute(&self, task_type: &str, payload: &Value) -> Result<HmacSha256> {
        let secret = self.secrets.get_secret()?;
        let canonical_payload = serde_json::to_string(payload)
            .map_err(|e| RelayError::dispatch_failed(format!("payload serialization failed: {e}")))?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| RelayError::secret(format!("secret cannot key an HMAC: {e}")))?;
        mac.update(&(task_type.len() as u64).to_be_bytes());
        mac.update(task_type.as_bytes());
        mac.update(canonical_payload.as_bytes());
        Ok(mac)
    }
}
