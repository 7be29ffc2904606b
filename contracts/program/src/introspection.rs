//! Instructions sysvar introspection.
//!
//! The execute instruction is preceded by one secp256r1 precompile
//! instruction per attestation. The runtime has already verified those
//! signatures when the execute instruction runs; what remains is checking
//! that each one verified the expected key, signature and message.

use keystore_state::{
    secp256r1::{matches_verification, SECP256R1_PROGRAM_ID},
    KeystoreError,
};
use pinocchio::{
    account_info::AccountInfo,
    msg,
    sysvars::instructions::{Instructions, INSTRUCTIONS_ID},
};

/// Precompile instructions positioned before the current instruction.
pub struct VerificationWindow<'a> {
    instructions: Instructions<&'a [u8]>,
    first_index: usize,
}

impl<'a> VerificationWindow<'a> {
    /// Window over the `count` instructions directly preceding the current
    /// one.
    pub fn new(sysvar: &'a AccountInfo, count: usize) -> Result<Self, KeystoreError> {
        if sysvar.key() != &INSTRUCTIONS_ID {
            msg!("Instructions sysvar expected, got {:?}", sysvar.key());
            return Err(KeystoreError::InvalidSecp256r1Instruction);
        }
        let data = unsafe { sysvar.borrow_data_unchecked() };
        let instructions = unsafe { Instructions::new_unchecked(data) };
        let current_index = instructions.load_current_index() as usize;
        let first_index = current_index
            .checked_sub(count)
            .ok_or(KeystoreError::InvalidSecp256r1Instruction)?;

        Ok(Self {
            instructions,
            first_index,
        })
    }

    /// Whether the verification at `position` checked `signature` by
    /// `public_key` over `message`.
    pub fn verifies(
        &self,
        position: usize,
        public_key: &[u8; 33],
        signature: &[u8; 64],
        message: &[u8],
    ) -> bool {
        let index = self.first_index + position;
        let instruction = unsafe { self.instructions.deserialize_instruction_unchecked(index) };

        if instruction.get_program_id() != &SECP256R1_PROGRAM_ID {
            msg!("Instruction {} is not a secp256r1 verification", index);
            return false;
        }
        match matches_verification(instruction.get_instruction_data(), public_key, signature, message) {
            Ok(true) => true,
            Ok(false) => {
                msg!("Verification {} does not match attestation {}", index, position);
                false
            },
            Err(e) => {
                msg!("Verification {} is malformed: {:?}", index, e);
                false
            },
        }
    }
}
