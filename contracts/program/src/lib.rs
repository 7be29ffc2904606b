//! Keystore Program - Main Entry Point
//!
//! Passkey-controlled vaults: an Identity holds up to five secp256r1 keys and
//! a threshold, and its Vault only pays out on a threshold of precompile
//! verified signatures over the canonical action message.

extern crate alloc;

pub mod actions;
pub mod instruction;
pub mod introspection;
pub mod processor;

use pinocchio::{account_info::AccountInfo, pubkey::Pubkey, ProgramResult};
use pinocchio_pubkey::declare_id;

declare_id!("Keystore11111111111111111111111111111111111");

#[cfg(not(feature = "no-entrypoint"))]
pinocchio::entrypoint!(process_instruction);

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::process_instruction(program_id, accounts, instruction_data)
}
