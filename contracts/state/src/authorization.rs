//! Threshold authorization of an action.
//!
//! An action is authorized when enough distinct registered keys produced a
//! valid secp256r1 signature over the canonical message for the identity's
//! current nonce. Signature checking itself is delegated to the caller (the
//! program checks precompile instructions, tests check signatures directly).

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    error::KeystoreError,
    identity::IdentityAccount,
    message::{encode_message, Action},
    sha256, webauthn,
};

/// Raw signature over the canonical message by one registered key.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct SignatureAttestation {
    pub key_index: u8,
    /// r ‖ s
    pub signature: [u8; 64],
    /// Not interpreted by secp256r1 verification
    pub recovery_id: u8,
}

/// WebAuthn assertion whose client data binds the message digest.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct WebAuthnAttestation {
    pub key_index: u8,
    pub signature: [u8; 64],
    pub authenticator_data: Vec<u8>,
    pub client_data_json: Vec<u8>,
}

pub trait Attestation {
    fn key_index(&self) -> u8;

    fn signature(&self) -> &[u8; 64];

    /// Bytes the precompile must have verified for this attestation, given
    /// the canonical message.
    fn signed_message(&self, message: &[u8]) -> Result<Vec<u8>, KeystoreError>;
}

impl Attestation for SignatureAttestation {
    fn key_index(&self) -> u8 {
        self.key_index
    }

    fn signature(&self) -> &[u8; 64] {
        &self.signature
    }

    fn signed_message(&self, message: &[u8]) -> Result<Vec<u8>, KeystoreError> {
        Ok(message.to_vec())
    }
}

impl Attestation for WebAuthnAttestation {
    fn key_index(&self) -> u8 {
        self.key_index
    }

    fn signature(&self) -> &[u8; 64] {
        &self.signature
    }

    fn signed_message(&self, message: &[u8]) -> Result<Vec<u8>, KeystoreError> {
        webauthn::verify_client_data_challenge(&self.client_data_json, &sha256(&[message]))?;
        webauthn::signed_payload(&self.authenticator_data, &self.client_data_json)
    }
}

/// Rejects out-of-range and repeated key indices.
pub fn check_attestation_set<A: Attestation>(
    identity: &IdentityAccount,
    attestations: &[A],
) -> Result<(), KeystoreError> {
    let mut seen = [false; crate::MAX_KEYS];
    for attestation in attestations {
        let index = attestation.key_index() as usize;
        if index >= identity.keys().len() {
            return Err(KeystoreError::InvalidKeyIndex);
        }
        if seen[index] {
            return Err(KeystoreError::DuplicateKeyInAttestationSet);
        }
        seen[index] = true;
    }
    Ok(())
}

/// Authorizes `action` at `nonce`, returning the number of valid approvals.
///
/// `verify(position, public_key, signature, signed_message)` reports whether
/// the attestation at `position` is backed by a valid signature. Checks run
/// in order: action arguments, nonce, attestation set, signatures. Nothing
/// is mutated; the caller applies the action on success.
pub fn authorize<A, F>(
    identity: &IdentityAccount,
    action: &Action,
    nonce: u64,
    attestations: &[A],
    mut verify: F,
) -> Result<u8, KeystoreError>
where
    A: Attestation,
    F: FnMut(usize, &[u8; 33], &[u8; 64], &[u8]) -> Result<bool, KeystoreError>,
{
    identity.validate_action(action)?;
    identity.check_nonce(nonce)?;
    check_attestation_set(identity, attestations)?;

    let message = encode_message(action, nonce);
    let mut approvals: u8 = 0;
    for (position, attestation) in attestations.iter().enumerate() {
        let key = identity.key(attestation.key_index())?;
        let Ok(signed) = attestation.signed_message(&message) else {
            continue;
        };
        if verify(position, &key.public_key, attestation.signature(), &signed)? {
            approvals += 1;
        }
    }

    if approvals < identity.threshold() {
        return Err(KeystoreError::ThresholdNotMet);
    }
    Ok(approvals)
}
