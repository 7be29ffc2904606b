//! CreateIdentity instruction handler

use keystore_state::{
    identity_seeds_with_bump, vault_seeds_with_bump, IdentityAccount, IntoBytes, RegisteredKey,
    Transmutable,
};
use pinocchio::{
    account_info::AccountInfo,
    instruction::{Seed, Signer},
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
    sysvars::{clock::Clock, rent::Rent, Sysvar},
    ProgramResult,
};
use pinocchio_system::instructions::{Allocate, Assign, CreateAccount, Transfer};

use super::verify_pda;

pub fn process_create_identity(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    public_key: [u8; 33],
    label: &str,
    identity_bump: u8,
    vault_bump: u8,
) -> ProgramResult {
    let mut account_info_iter = accounts.iter();
    let identity_account = account_info_iter
        .next()
        .ok_or(ProgramError::NotEnoughAccountKeys)?;
    let vault_account = account_info_iter
        .next()
        .ok_or(ProgramError::NotEnoughAccountKeys)?;
    let payer_account = account_info_iter
        .next()
        .ok_or(ProgramError::NotEnoughAccountKeys)?;
    let _system_program = account_info_iter
        .next()
        .ok_or(ProgramError::NotEnoughAccountKeys)?;

    if !payer_account.is_signer() {
        return Err(ProgramError::MissingRequiredSignature);
    }

    let identity_bump_arr = [identity_bump];
    let identity_seeds = identity_seeds_with_bump(&public_key, &identity_bump_arr);
    verify_pda(identity_account, &identity_seeds, program_id, "Identity")?;

    let vault_bump_arr = [vault_bump];
    let vault_seeds = vault_seeds_with_bump(identity_account.key(), &vault_bump_arr);
    verify_pda(vault_account, &vault_seeds, program_id, "Vault")?;

    if identity_account.is_owned_by(program_id) {
        let data = identity_account.try_borrow_data()?;
        if IdentityAccount::from_account_data(&data).is_ok() {
            msg!("Identity {:?} already exists", identity_account.key());
            return Ok(());
        }
    }

    let clock = Clock::get()?;
    let first_key = RegisteredKey::new(public_key, label, clock.unix_timestamp).map_err(|e| {
        msg!("CreateIdentity: rejected first key: {:?}", e);
        e
    })?;

    let rent = Rent::get()?;
    let space = IdentityAccount::LEN;
    let identity_signer_seeds = [
        Seed::from(identity_seeds[0]),
        Seed::from(identity_seeds[1]),
        Seed::from(identity_seeds[2]),
        Seed::from(identity_seeds[3]),
    ];

    if identity_account.lamports() == 0 {
        CreateAccount {
            from: payer_account,
            to: identity_account,
            lamports: rent.minimum_balance(space),
            space: space as u64,
            owner: program_id,
        }
        .invoke_signed(&[Signer::from(&identity_signer_seeds)])?;
    } else if identity_account.is_owned_by(&pinocchio_system::ID) {
        // Pre-funded address: CreateAccount would fail, so build it in steps.
        let required = rent
            .minimum_balance(space)
            .saturating_sub(identity_account.lamports());
        if required > 0 {
            Transfer {
                from: payer_account,
                to: identity_account,
                lamports: required,
            }
            .invoke()?;
        }
        Allocate {
            account: identity_account,
            space: space as u64,
        }
        .invoke_signed(&[Signer::from(&identity_signer_seeds)])?;
        Assign {
            account: identity_account,
            owner: program_id,
        }
        .invoke_signed(&[Signer::from(&identity_signer_seeds)])?;
    } else if !identity_account.is_owned_by(program_id) || identity_account.data_len() != space {
        msg!("Identity {:?} is held by another program", identity_account.key());
        return Err(ProgramError::IllegalOwner);
    }

    // The vault stays system-owned with no data; funding the address creates it.
    let vault_minimum = rent.minimum_balance(0);
    let vault_top_up = vault_minimum.saturating_sub(vault_account.lamports());
    if vault_top_up > 0 {
        Transfer {
            from: payer_account,
            to: vault_account,
            lamports: vault_top_up,
        }
        .invoke()?;
    }

    let identity = IdentityAccount::new(identity_bump, vault_bump, first_key);
    let mut data = identity_account.try_borrow_mut_data()?;
    data.get_mut(..IdentityAccount::LEN)
        .ok_or(ProgramError::AccountDataTooSmall)?
        .copy_from_slice(identity.into_bytes());

    msg!("Identity created:");
    msg!("  Identity: {:?}", identity_account.key());
    msg!("  Vault: {:?}", vault_account.key());
    msg!("  Key label: {}", label);

    Ok(())
}
