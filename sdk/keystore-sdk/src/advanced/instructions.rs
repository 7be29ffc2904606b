use keystore_program::instruction::KeystoreInstruction;
use keystore_state::{
    secp256r1::{encode_verification, encode_verification_batch, VerificationEntry},
    Action, SignatureAttestation, WebAuthnAttestation,
};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;
use solana_sdk::sysvar;

use crate::core::constants::SECP256R1_PROGRAM_ID;
use crate::error::{KeystoreSdkError, Result};
use crate::utils::{derive_identity_pda, derive_vault_pda};

fn invalid_length(e: keystore_state::KeystoreError) -> KeystoreSdkError {
    KeystoreSdkError::InvalidInputLength(e.to_string())
}

/// Precompile instruction verifying one signature. It takes no accounts.
pub fn secp256r1_verify_instruction(
    public_key: &[u8],
    signature: &[u8],
    message: &[u8],
) -> Result<Instruction> {
    Ok(Instruction {
        program_id: SECP256R1_PROGRAM_ID,
        accounts: vec![],
        data: encode_verification(public_key, signature, message).map_err(invalid_length)?,
    })
}

/// Precompile instruction verifying several signatures at once.
pub fn secp256r1_verify_batch_instruction(entries: &[VerificationEntry]) -> Result<Instruction> {
    Ok(Instruction {
        program_id: SECP256R1_PROGRAM_ID,
        accounts: vec![],
        data: encode_verification_batch(entries).map_err(invalid_length)?,
    })
}

pub fn create_identity(
    program_id: &Pubkey,
    payer: &Pubkey,
    public_key: [u8; 33],
    label: &str,
) -> Result<Instruction> {
    let (identity_pda, identity_bump) = derive_identity_pda(program_id, &public_key);
    let (vault_pda, vault_bump) = derive_vault_pda(program_id, &identity_pda);

    let instruction = KeystoreInstruction::CreateIdentity {
        public_key,
        label: label.to_string(),
        identity_bump,
        vault_bump,
    };

    let accounts = vec![
        AccountMeta::new(identity_pda, false),
        AccountMeta::new(vault_pda, false),
        AccountMeta::new(*payer, true),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: borsh::to_vec(&instruction)?,
    })
}

fn execute_accounts(program_id: &Pubkey, identity: &Pubkey, action: &Action) -> Vec<AccountMeta> {
    let (vault_pda, _) = derive_vault_pda(program_id, identity);
    let mut accounts = vec![
        AccountMeta::new(*identity, false),
        AccountMeta::new(vault_pda, false),
        AccountMeta::new_readonly(sysvar::instructions::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    if let Action::Send { recipient, .. } = action {
        accounts.push(AccountMeta::new(Pubkey::new_from_array(*recipient), false));
    }
    accounts
}

pub fn execute(
    program_id: &Pubkey,
    identity: &Pubkey,
    action: Action,
    nonce: u64,
    attestations: Vec<SignatureAttestation>,
) -> Result<Instruction> {
    let accounts = execute_accounts(program_id, identity, &action);
    let instruction = KeystoreInstruction::Execute {
        action,
        nonce,
        attestations,
    };

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: borsh::to_vec(&instruction)?,
    })
}

pub fn execute_webauthn(
    program_id: &Pubkey,
    identity: &Pubkey,
    action: Action,
    nonce: u64,
    attestations: Vec<WebAuthnAttestation>,
) -> Result<Instruction> {
    let accounts = execute_accounts(program_id, identity, &action);
    let instruction = KeystoreInstruction::ExecuteWebAuthn {
        action,
        nonce,
        attestations,
    };

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: borsh::to_vec(&instruction)?,
    })
}
