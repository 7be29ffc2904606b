//! Assertion Adapter.
//!
//! Turns what an authenticator returns (DER signature, authenticator data,
//! client data JSON) into the raw, low-S signature and signed payload the
//! secp256r1 precompile verifies.

use keystore_state::{sha256, webauthn};
use p256::ecdsa::Signature;

use crate::error::{KeystoreSdkError, Result};

/// Output of the signing oracle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasskeyAssertion {
    /// ASN.1 DER `SEQUENCE { INTEGER r, INTEGER s }`
    pub signature_der: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub client_data_json: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptedAssertion {
    /// r ‖ s, 32 bytes each, s normalized to the lower half
    pub raw_signature: [u8; 64],
    /// authenticator_data ‖ sha256(client_data_json)
    pub signed_payload: Vec<u8>,
}

pub fn adapt_assertion(assertion: &PasskeyAssertion) -> Result<AdaptedAssertion> {
    let signed_payload = webauthn::signed_payload(
        &assertion.authenticator_data,
        &assertion.client_data_json,
    )
    .map_err(|_| {
        KeystoreSdkError::InvalidInputLength(format!(
            "authenticator data is {} bytes, expected {}..={}",
            assertion.authenticator_data.len(),
            webauthn::AUTHENTICATOR_DATA_MIN_LEN,
            webauthn::AUTHENTICATOR_DATA_MAX_LEN
        ))
    })?;
    let raw_signature = normalize_low_s(&der_to_raw(&assertion.signature_der)?)?;

    Ok(AdaptedAssertion {
        raw_signature,
        signed_payload,
    })
}

/// Digest of the client data, as appended to the signed payload.
pub fn client_data_hash(client_data_json: &[u8]) -> [u8; 32] {
    sha256(&[client_data_json])
}

/// Converts a DER signature to raw `r ‖ s`, each left-padded to 32 bytes.
pub fn der_to_raw(der: &[u8]) -> Result<[u8; 64]> {
    let signature = Signature::from_der(der)
        .map_err(|e| KeystoreSdkError::MalformedSignature(e.to_string()))?;
    Ok(to_raw(&signature))
}

/// Replaces `s` with `n - s` when `s > n/2`.
pub fn normalize_low_s(raw: &[u8; 64]) -> Result<[u8; 64]> {
    let signature = Signature::from_slice(raw)
        .map_err(|e| KeystoreSdkError::MalformedSignature(e.to_string()))?;
    Ok(to_raw(&signature.normalize_s().unwrap_or(signature)))
}

pub fn is_low_s(raw: &[u8; 64]) -> bool {
    Signature::from_slice(raw)
        .map(|signature| signature.normalize_s().is_none())
        .unwrap_or(false)
}

fn to_raw(signature: &Signature) -> [u8; 64] {
    let mut raw = [0u8; 64];
    raw.copy_from_slice(&signature.to_bytes());
    raw
}
