//! Keystore Instruction Definitions

use alloc::{string::String, vec::Vec};
use borsh::{BorshDeserialize, BorshSerialize};
use keystore_state::{Action, SignatureAttestation, WebAuthnAttestation};
use pinocchio::program_error::ProgramError;

/// Instruction discriminators (first byte of instruction data)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InstructionDiscriminator {
    CreateIdentity = 0,
    Execute = 1,
    ExecuteWebAuthn = 2,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum KeystoreInstruction {
    /// Create an Identity and its Vault. Succeeds without change when the
    /// Identity already exists.
    ///
    /// Accounts:
    /// 0. `[writable]` Identity (PDA: ["identity", public_key[0..1], public_key[1..33]])
    /// 1. `[writable]` Vault (PDA: ["vault", identity])
    /// 2. `[writable, signer]` Payer
    /// 3. `[]` System program
    CreateIdentity {
        /// Compressed P-256 key of the first passkey
        public_key: [u8; 33],
        /// Label of the first passkey (1..=32 bytes)
        label: String,
        identity_bump: u8,
        vault_bump: u8,
    },

    /// Execute an action authorized by raw secp256r1 signatures over the
    /// canonical message. Attestation `i` of `n` is checked against the
    /// precompile instruction at `current_index - n + i`.
    ///
    /// Accounts:
    /// 0. `[writable]` Identity
    /// 1. `[writable]` Vault
    /// 2. `[]` Instructions sysvar
    /// 3. `[]` System program
    /// 4. `[writable]` Recipient (Send only)
    Execute {
        action: Action,
        /// Must equal the Identity's current nonce
        nonce: u64,
        attestations: Vec<SignatureAttestation>,
    },

    /// Same as `Execute`, with WebAuthn assertions. Each precompile
    /// instruction verifies `authenticator_data ++ sha256(client_data_json)`
    /// and the client data challenge must be the message digest.
    ///
    /// Accounts: as `Execute`.
    ExecuteWebAuthn {
        action: Action,
        nonce: u64,
        attestations: Vec<WebAuthnAttestation>,
    },
}

impl KeystoreInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| ProgramError::InvalidInstructionData)
    }

    pub fn discriminator(&self) -> InstructionDiscriminator {
        match self {
            KeystoreInstruction::CreateIdentity { .. } => InstructionDiscriminator::CreateIdentity,
            KeystoreInstruction::Execute { .. } => InstructionDiscriminator::Execute,
            KeystoreInstruction::ExecuteWebAuthn { .. } => InstructionDiscriminator::ExecuteWebAuthn,
        }
    }
}
