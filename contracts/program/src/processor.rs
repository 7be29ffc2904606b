//! Instruction Processor
//!
//! Thin dispatcher that routes instructions to individual handlers.

use pinocchio::{account_info::AccountInfo, msg, pubkey::Pubkey, ProgramResult};

use crate::actions;
use crate::instruction::KeystoreInstruction;

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    let instruction = KeystoreInstruction::unpack(instruction_data).map_err(|e| {
        msg!(
            "Failed to unpack instruction ({} bytes, discriminator {:?}): {:?}",
            instruction_data.len(),
            instruction_data.first(),
            e
        );
        e
    })?;
    msg!("Instruction: {:?}", instruction.discriminator());

    match instruction {
        KeystoreInstruction::CreateIdentity {
            public_key,
            label,
            identity_bump,
            vault_bump,
        } => actions::process_create_identity(
            program_id,
            accounts,
            public_key,
            &label,
            identity_bump,
            vault_bump,
        ),

        KeystoreInstruction::Execute {
            action,
            nonce,
            attestations,
        } => actions::process_execute(program_id, accounts, &action, nonce, &attestations),

        KeystoreInstruction::ExecuteWebAuthn {
            action,
            nonce,
            attestations,
        } => actions::process_execute(program_id, accounts, &action, nonce, &attestations),
    }
}
