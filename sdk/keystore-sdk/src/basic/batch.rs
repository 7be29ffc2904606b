//! Batch assembly: one precompile instruction per attestation, followed by
//! exactly one execute instruction.

use keystore_state::{
    encode_message, sha256, webauthn::verify_client_data_challenge, Action, SignatureAttestation,
    WebAuthnAttestation, MAX_KEYS,
};
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::advanced::instructions;
use crate::assertion::{adapt_assertion, PasskeyAssertion};
use crate::error::{KeystoreSdkError, Result};
use crate::types::IdentityInfo;

/// Raw signature over the canonical message
#[derive(Debug, Clone)]
pub struct Approval {
    pub key_index: u8,
    pub signature: [u8; 64],
}

/// Authenticator assertion over the message challenge
#[derive(Debug, Clone)]
pub struct WebAuthnApproval {
    pub key_index: u8,
    pub assertion: PasskeyAssertion,
}

/// Instructions for one atomic transaction
#[derive(Debug, Clone)]
pub struct InstructionBatch {
    /// Verifications first, execute last
    pub instructions: Vec<Instruction>,
    pub identity: Pubkey,
    /// Nonce the batch consumes
    pub nonce: u64,
    /// Canonical message the attestations sign
    pub message: Vec<u8>,
}

impl InstructionBatch {
    pub fn verification_count(&self) -> usize {
        self.instructions.len().saturating_sub(1)
    }
}

/// Canonical message for `action` at the identity's current nonce.
pub fn build_authorization(action: &Action, current_nonce: u64) -> Vec<u8> {
    encode_message(action, current_nonce)
}

/// The checks the program runs before looking at signatures.
fn precheck(identity: &IdentityInfo, action: &Action, key_indices: &[u8]) -> Result<()> {
    identity
        .account
        .validate_action(action)
        .map_err(KeystoreSdkError::InvalidActionArguments)?;

    let key_count = identity.key_count();
    let mut seen = [false; MAX_KEYS];
    for &index in key_indices {
        if index as usize >= key_count {
            return Err(KeystoreSdkError::InvalidKeyIndex { index, key_count });
        }
        if seen[index as usize] {
            return Err(KeystoreSdkError::DuplicateKeyInAttestationSet(index));
        }
        seen[index as usize] = true;
    }

    if key_indices.len() < identity.threshold() as usize {
        return Err(KeystoreSdkError::ThresholdNotMet {
            required: identity.threshold(),
            provided: key_indices.len(),
            available: key_count,
        });
    }
    Ok(())
}

fn registered_key(identity: &IdentityInfo, key_index: u8) -> Result<[u8; 33]> {
    identity
        .account
        .key(key_index)
        .map(|key| key.public_key)
        .map_err(|_| KeystoreSdkError::InvalidKeyIndex {
            index: key_index,
            key_count: identity.key_count(),
        })
}

/// Batch authorized by raw signatures over the canonical message.
pub fn assemble_batch(
    program_id: &Pubkey,
    identity: &IdentityInfo,
    action: &Action,
    approvals: &[Approval],
) -> Result<InstructionBatch> {
    let key_indices: Vec<u8> = approvals.iter().map(|a| a.key_index).collect();
    precheck(identity, action, &key_indices)?;

    let nonce = identity.nonce();
    let message = build_authorization(action, nonce);
    let mut instructions = Vec::with_capacity(approvals.len() + 1);
    let mut attestations = Vec::with_capacity(approvals.len());
    for approval in approvals {
        let public_key = registered_key(identity, approval.key_index)?;
        instructions.push(instructions::secp256r1_verify_instruction(
            &public_key,
            &approval.signature,
            &message,
        )?);
        attestations.push(SignatureAttestation {
            key_index: approval.key_index,
            signature: approval.signature,
            recovery_id: 0,
        });
    }
    instructions.push(instructions::execute(
        program_id,
        &identity.address,
        action.clone(),
        nonce,
        attestations,
    )?);

    debug!(
        "assembled batch for {} at nonce {nonce} with {} approvals",
        identity.address,
        approvals.len()
    );
    Ok(InstructionBatch {
        instructions,
        identity: identity.address,
        nonce,
        message,
    })
}

/// Batch authorized by WebAuthn assertions over the message challenge.
pub fn assemble_webauthn_batch(
    program_id: &Pubkey,
    identity: &IdentityInfo,
    action: &Action,
    approvals: &[WebAuthnApproval],
) -> Result<InstructionBatch> {
    let key_indices: Vec<u8> = approvals.iter().map(|a| a.key_index).collect();
    precheck(identity, action, &key_indices)?;

    let nonce = identity.nonce();
    let message = build_authorization(action, nonce);
    let challenge = sha256(&[&message]);
    let mut instructions = Vec::with_capacity(approvals.len() + 1);
    let mut attestations = Vec::with_capacity(approvals.len());
    for approval in approvals {
        let public_key = registered_key(identity, approval.key_index)?;
        let assertion = &approval.assertion;
        verify_client_data_challenge(&assertion.client_data_json, &challenge).map_err(|_| {
            KeystoreSdkError::InvalidWebAuthnData(format!(
                "assertion for key {} does not carry the batch challenge",
                approval.key_index
            ))
        })?;
        let adapted = adapt_assertion(assertion)?;

        instructions.push(instructions::secp256r1_verify_instruction(
            &public_key,
            &adapted.raw_signature,
            &adapted.signed_payload,
        )?);
        attestations.push(WebAuthnAttestation {
            key_index: approval.key_index,
            signature: adapted.raw_signature,
            authenticator_data: assertion.authenticator_data.clone(),
            client_data_json: assertion.client_data_json.clone(),
        });
    }
    instructions.push(instructions::execute_webauthn(
        program_id,
        &identity.address,
        action.clone(),
        nonce,
        attestations,
    )?);

    debug!(
        "assembled webauthn batch for {} at nonce {nonce} with {} approvals",
        identity.address,
        approvals.len()
    );
    Ok(InstructionBatch {
        instructions,
        identity: identity.address,
        nonce,
        message,
    })
}
