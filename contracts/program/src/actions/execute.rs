//! Execute / ExecuteWebAuthn instruction handler

use keystore_state::{
    authorize, identity::vault_balance_after, vault_seeds_with_bump, Action, Attestation, Effect,
    IdentityAccount, KeystoreError,
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
use pinocchio_system::instructions::Transfer;

use super::verify_pda;
use crate::introspection::VerificationWindow;

pub fn process_execute<A: Attestation>(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    action: &Action,
    nonce: u64,
    attestations: &[A],
) -> ProgramResult {
    let mut account_info_iter = accounts.iter();
    let identity_account = account_info_iter
        .next()
        .ok_or(ProgramError::NotEnoughAccountKeys)?;
    let vault_account = account_info_iter
        .next()
        .ok_or(ProgramError::NotEnoughAccountKeys)?;
    let instructions_sysvar = account_info_iter
        .next()
        .ok_or(ProgramError::NotEnoughAccountKeys)?;
    let _system_program = account_info_iter
        .next()
        .ok_or(ProgramError::NotEnoughAccountKeys)?;
    let recipient_account = account_info_iter.next();

    if !identity_account.is_owned_by(program_id) {
        msg!("Execute: {:?} is not an identity", identity_account.key());
        return Err(KeystoreError::IdentityNotFound.into());
    }

    let now = Clock::get()?.unix_timestamp;

    // --- Phase 1: authorize and consume the nonce ---
    let (effect, vault_bump) = {
        let mut identity_data = identity_account.try_borrow_mut_data()?;
        let identity = IdentityAccount::from_account_data_mut(&mut identity_data)?;

        let vault_bump_arr = [identity.vault_bump()];
        let vault_seeds = vault_seeds_with_bump(identity_account.key(), &vault_bump_arr);
        verify_pda(vault_account, &vault_seeds, program_id, "Vault")?;

        // Sysvar errors surface only once a signature is checked.
        let window = VerificationWindow::new(instructions_sysvar, attestations.len());
        let approvals = authorize(
            identity,
            action,
            nonce,
            attestations,
            |position, public_key, signature, message| {
                let window = window.as_ref().map_err(|e| *e)?;
                Ok(window.verifies(position, public_key, signature, message))
            },
        )
        .map_err(|e| {
            msg!(
                "Execute rejected: {:?} (nonce {}, stored {}, {} attestations, threshold {})",
                e,
                nonce,
                identity.nonce(),
                attestations.len(),
                identity.threshold()
            );
            e
        })?;

        let effect = identity.apply(action, now)?;
        msg!(
            "Execute authorized by {} keys, nonce now {}",
            approvals,
            identity.nonce()
        );
        (effect, identity.vault_bump())
    };

    // --- Phase 2: effects outside the identity account ---
    match effect {
        Effect::Transfer { recipient, amount } => {
            let recipient_account = recipient_account.ok_or(KeystoreError::InvalidAccountData)?;
            if recipient_account.key() != &recipient {
                msg!(
                    "Send: recipient account {:?} does not match {:?}",
                    recipient_account.key(),
                    recipient
                );
                return Err(KeystoreError::InvalidAccountData.into());
            }

            let rent_minimum = Rent::get()?.minimum_balance(0);
            vault_balance_after(vault_account.lamports(), amount, rent_minimum).map_err(|e| {
                msg!(
                    "Send: vault holds {} lamports, cannot send {}",
                    vault_account.lamports(),
                    amount
                );
                e
            })?;

            let vault_bump_arr = [vault_bump];
            let vault_seeds = vault_seeds_with_bump(identity_account.key(), &vault_bump_arr);
            let vault_signer_seeds = [
                Seed::from(vault_seeds[0]),
                Seed::from(vault_seeds[1]),
                Seed::from(vault_seeds[2]),
            ];
            Transfer {
                from: vault_account,
                to: recipient_account,
                lamports: amount,
            }
            .invoke_signed(&[Signer::from(&vault_signer_seeds)])?;
            msg!("Sent {} lamports to {:?}", amount, recipient);
        },
        Effect::ThresholdChanged { threshold } => msg!("Threshold set to {}", threshold),
        Effect::KeyAdded { key_index } => msg!("Key registered in slot {}", key_index),
    }

    Ok(())
}
