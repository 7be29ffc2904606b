pub mod create_identity;
pub mod execute;

pub use create_identity::*;
pub use execute::*;

use keystore_state::KeystoreError;
use pinocchio::{
    account_info::AccountInfo,
    msg,
    pubkey::{create_program_address, Pubkey},
};

/// Checks `account` is the PDA of `seeds` (bump included) under `program_id`.
pub fn verify_pda(
    account: &AccountInfo,
    seeds: &[&[u8]],
    program_id: &Pubkey,
    name: &str,
) -> Result<(), KeystoreError> {
    let expected = create_program_address(seeds, program_id).map_err(|_| {
        msg!("{}: seeds do not derive a valid address", name);
        KeystoreError::InvalidPda
    })?;
    if account.key() != &expected {
        msg!("{}: expected {:?}, got {:?}", name, expected, account.key());
        return Err(KeystoreError::InvalidPda);
    }
    Ok(())
}
