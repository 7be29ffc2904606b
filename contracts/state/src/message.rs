//! Canonical message encoding.
//!
//! The signed message binds an action to the identity nonce it consumes:
//! `variant_tag(1) ++ variant_payload ++ nonce(8, LE)`. The action part is
//! the Borsh encoding of [`Action`].

use borsh::{BorshDeserialize, BorshSerialize};
use pinocchio::pubkey::Pubkey;

use crate::{error::KeystoreError, sha256};

/// Length of the trailing nonce
pub const NONCE_LEN: usize = 8;

/// Operation an identity can authorize.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Move lamports from the vault to `recipient`
    Send { recipient: Pubkey, amount: u64 },
    /// Change the number of approvals required
    SetThreshold { threshold: u8 },
    /// Register another passkey on the identity
    AddKey { public_key: [u8; 33], label: String },
}

impl Action {
    pub const SEND_TAG: u8 = 0;
    pub const SET_THRESHOLD_TAG: u8 = 1;
    pub const ADD_KEY_TAG: u8 = 2;

    pub fn tag(&self) -> u8 {
        match self {
            Action::Send { .. } => Self::SEND_TAG,
            Action::SetThreshold { .. } => Self::SET_THRESHOLD_TAG,
            Action::AddKey { .. } => Self::ADD_KEY_TAG,
        }
    }

    fn encoded_len(&self) -> usize {
        1 + match self {
            Action::Send { .. } => 32 + 8,
            Action::SetThreshold { .. } => 1,
            Action::AddKey { label, .. } => 33 + 4 + label.len(),
        }
    }
}

/// Encodes `action` followed by `nonce`.
pub fn encode_message(action: &Action, nonce: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(action.encoded_len() + NONCE_LEN);
    out.push(action.tag());
    match action {
        Action::Send { recipient, amount } => {
            out.extend_from_slice(recipient.as_ref());
            out.extend_from_slice(&amount.to_le_bytes());
        },
        Action::SetThreshold { threshold } => out.push(*threshold),
        Action::AddKey { public_key, label } => {
            out.extend_from_slice(public_key);
            out.extend_from_slice(&(label.len() as u32).to_le_bytes());
            out.extend_from_slice(label.as_bytes());
        },
    }
    out.extend_from_slice(&nonce.to_le_bytes());
    out
}

/// Inverse of [`encode_message`]. Truncated input and trailing bytes are
/// rejected.
pub fn decode_message(bytes: &[u8]) -> Result<(Action, u64), KeystoreError> {
    let split = bytes
        .len()
        .checked_sub(NONCE_LEN)
        .ok_or(KeystoreError::InvalidActionArguments)?;
    let (action_bytes, nonce_bytes) = bytes.split_at(split);
    let action = Action::try_from_slice(action_bytes)
        .map_err(|_| KeystoreError::InvalidActionArguments)?;
    let nonce = u64::from_le_bytes(
        nonce_bytes
            .try_into()
            .map_err(|_| KeystoreError::InvalidActionArguments)?,
    );
    Ok((action, nonce))
}

/// Digest handed to the signing oracle as the WebAuthn challenge.
pub fn message_challenge(action: &Action, nonce: u64) -> [u8; 32] {
    sha256(&[&encode_message(action, nonce)])
}
