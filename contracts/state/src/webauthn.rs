//! WebAuthn challenge binding.
//!
//! A passkey signs `authenticator_data ++ SHA-256(client_data_json)`. The
//! client data carries the challenge (base64url, no padding) the relying
//! party asked for, which here is the digest of the canonical message.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;

use crate::{error::KeystoreError, sha256};

pub const AUTHENTICATOR_DATA_MIN_LEN: usize = 37;
pub const AUTHENTICATOR_DATA_MAX_LEN: usize = 196;

/// `type` member of an assertion's client data
pub const WEBAUTHN_GET: &str = "webauthn.get";

#[derive(Deserialize)]
struct ClientData {
    #[serde(rename = "type")]
    kind: String,
    challenge: String,
}

/// Challenge string as it appears in client data.
pub fn encode_challenge(challenge: &[u8; 32]) -> String {
    URL_SAFE_NO_PAD.encode(challenge)
}

/// Checks that `client_data_json` is an assertion over `expected`.
pub fn verify_client_data_challenge(
    client_data_json: &[u8],
    expected: &[u8; 32],
) -> Result<(), KeystoreError> {
    let client_data: ClientData =
        serde_json::from_slice(client_data_json).map_err(|_| KeystoreError::InvalidWebAuthnData)?;
    if client_data.kind != WEBAUTHN_GET {
        return Err(KeystoreError::InvalidWebAuthnData);
    }
    let challenge = URL_SAFE_NO_PAD
        .decode(client_data.challenge.trim_end_matches('='))
        .map_err(|_| KeystoreError::InvalidWebAuthnData)?;
    if challenge.as_slice() != expected {
        return Err(KeystoreError::InvalidWebAuthnData);
    }
    Ok(())
}

/// Bytes the authenticator signed.
pub fn signed_payload(
    authenticator_data: &[u8],
    client_data_json: &[u8],
) -> Result<Vec<u8>, KeystoreError> {
    if !(AUTHENTICATOR_DATA_MIN_LEN..=AUTHENTICATOR_DATA_MAX_LEN).contains(&authenticator_data.len()) {
        return Err(KeystoreError::InvalidWebAuthnData);
    }
    let mut payload = Vec::with_capacity(authenticator_data.len() + 32);
    payload.extend_from_slice(authenticator_data);
    payload.extend_from_slice(&sha256(&[client_data_json]));
    Ok(payload)
}
