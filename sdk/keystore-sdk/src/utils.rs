use crate::core::connection::LedgerConnection;
use crate::error::{KeystoreSdkError, Result};
use crate::types::IdentityInfo;
use keystore_state::{IdentityAccount, IDENTITY_SEED, VAULT_SEED};
use solana_sdk::pubkey::Pubkey;

//=============================================================================
// PDA Derivation Helpers
//=============================================================================

/// Derive the Identity PDA from the program ID and the first registered key
pub fn derive_identity_pda(program_id: &Pubkey, public_key: &[u8; 33]) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[IDENTITY_SEED, &public_key[..1], &public_key[1..]],
        program_id,
    )
}

/// Derive the Vault PDA from the program ID and the Identity PDA
pub fn derive_vault_pda(program_id: &Pubkey, identity: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED, identity.as_ref()], program_id)
}

//=============================================================================
// Account Fetching & Parsing
//=============================================================================

/// Parse an Identity account
pub fn parse_identity(program_id: &Pubkey, address: &Pubkey, data: &[u8]) -> Result<IdentityInfo> {
    let account = IdentityAccount::from_account_data(data).map_err(|e| {
        KeystoreSdkError::InvalidAccountData(format!("{address} is not an identity: {e}"))
    })?;
    let (vault, _) = derive_vault_pda(program_id, address);

    Ok(IdentityInfo {
        address: *address,
        vault,
        account: *account,
    })
}

/// Fetch and parse an Identity account from the ledger
pub async fn fetch_identity(
    connection: &impl LedgerConnection,
    program_id: &Pubkey,
    address: &Pubkey,
) -> Result<IdentityInfo> {
    let account = connection
        .get_account(address)
        .await
        .map_err(|e| KeystoreSdkError::Connection(e.to_string()))?
        .ok_or(KeystoreSdkError::AccountNotFound(*address))?;

    if &account.owner != program_id {
        return Err(KeystoreSdkError::InvalidAccountData(format!(
            "{address} is owned by {}, not {program_id}",
            account.owner
        )));
    }
    parse_identity(program_id, address, &account.data)
}
