#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use borsh::BorshDeserialize;
use keystore_program::instruction::KeystoreInstruction;
use keystore_sdk::core::constants::{DEFAULT_PROGRAM_ID, SECP256R1_PROGRAM_ID};
use keystore_sdk::{
    derive_identity_pda, derive_vault_pda, Approval, LedgerConnection, LedgerError,
    PasskeyAssertion, PasskeySigner, SignerError,
};
use keystore_state::{
    authorize, identity::vault_balance_after, secp256r1::matches_verification,
    secp256r1::parse_verification, sha256, webauthn, Action, Attestation, Effect, IdentityAccount,
    IntoBytes, KeystoreError, RegisteredKey, Transmutable, IDENTITY_SEED, VAULT_SEED,
};
use p256::ecdsa::{signature::Signer as _, signature::Verifier as _, Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use solana_sdk::account::Account;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::InstructionError;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::rent::Rent;
use solana_sdk::signature::{Keypair, Signature as TxSignature, Signer as _};
use solana_sdk::system_program;
use solana_sdk::transaction::{Transaction, TransactionError};
use tokio::sync::Mutex;

/// Clock value the mock program stamps on new keys
pub const NOW: i64 = 1_700_000_000;

/// Blocks a blockhash stays valid for
pub const BLOCKHASH_LIFETIME: u64 = 150;

/// Fee charged to the payer per signature
pub const SIGNATURE_FEE: u64 = 5_000;

/// What happens to a transaction after it is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    /// Executed on send, status visible on the first poll
    Immediate,
    /// Executed on send, status visible after this many empty polls
    Delayed(u32),
    /// Never lands; the chain keeps its height
    Dropped,
    /// Never lands; the chain moves past the blockhash lifetime
    Expired,
    /// Executed on send, but the status shows up only after this many empty
    /// polls while the chain moves past the blockhash lifetime
    DelayedPastExpiry(u32),
}

struct Pending {
    polls_left: u32,
    result: Result<(), TransactionError>,
}

pub struct LedgerState {
    pub accounts: HashMap<Pubkey, Account>,
    statuses: HashMap<TxSignature, Result<(), TransactionError>>,
    pending: HashMap<TxSignature, Pending>,
    pub block_height: u64,
    pub sent: usize,
    pub landing: Landing,
    /// Reject failing transactions at send time, like RPC preflight
    pub preflight: bool,
    /// Status polls left to answer with a transport error
    pub failing_status_polls: u32,
    /// Block height polls left to answer with a transport error
    pub failing_height_polls: u32,
}

/// In-memory ledger running the keystore program and the secp256r1 precompile.
pub struct MockLedger {
    program_id: Pubkey,
    state: Mutex<LedgerState>,
}

impl MockLedger {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            state: Mutex::new(LedgerState {
                accounts: HashMap::new(),
                statuses: HashMap::new(),
                pending: HashMap::new(),
                block_height: 1,
                sent: 0,
                landing: Landing::Immediate,
                preflight: false,
                failing_status_polls: 0,
                failing_height_polls: 0,
            }),
        }
    }

    pub async fn set_landing(&self, landing: Landing) {
        self.state.lock().await.landing = landing;
    }

    pub async fn set_preflight(&self, preflight: bool) {
        self.state.lock().await.preflight = preflight;
    }

    /// The next `status` signature status polls and `height` block height
    /// polls fail in transport.
    pub async fn fail_polls(&self, status: u32, height: u32) {
        let mut state = self.state.lock().await;
        state.failing_status_polls = status;
        state.failing_height_polls = height;
    }

    pub async fn sent(&self) -> usize {
        self.state.lock().await.sent
    }

    pub async fn airdrop(&self, address: &Pubkey, lamports: u64) {
        let mut state = self.state.lock().await;
        let account = state
            .accounts
            .entry(*address)
            .or_insert_with(|| Account::new(0, 0, &system_program::id()));
        account.lamports += lamports;
    }

    pub async fn lamports(&self, address: &Pubkey) -> u64 {
        self.state
            .lock()
            .await
            .accounts
            .get(address)
            .map(|a| a.lamports)
            .unwrap_or(0)
    }

    pub async fn identity(&self, address: &Pubkey) -> IdentityAccount {
        let state = self.state.lock().await;
        let account = state.accounts.get(address).expect("identity account");
        *IdentityAccount::from_account_data(&account.data).expect("identity data")
    }

    /// Writes an identity with the given keys, threshold and nonce, and a
    /// vault holding `vault_lamports`. Returns the identity address.
    pub async fn seed_identity(
        &self,
        keys: &[[u8; 33]],
        threshold: u8,
        nonce: u64,
        vault_lamports: u64,
    ) -> Pubkey {
        let (identity, bump) = derive_identity_pda(&self.program_id, &keys[0]);
        let (vault, vault_bump) = derive_vault_pda(&self.program_id, &identity);

        let first = RegisteredKey::new(keys[0], "K1", NOW).expect("first key");
        let mut account = IdentityAccount::new(bump, vault_bump, first);
        for (i, key) in keys.iter().enumerate().skip(1) {
            let action = Action::AddKey {
                public_key: *key,
                label: format!("K{}", i + 1),
            };
            account.apply(&action, NOW).expect("seed key");
        }
        account.header.threshold = threshold;
        account.header.set_nonce(nonce);

        let data = account.into_bytes().to_vec();
        let rent = Rent::default().minimum_balance(data.len());
        let mut state = self.state.lock().await;
        state.accounts.insert(
            identity,
            Account {
                lamports: rent,
                data,
                owner: self.program_id,
                executable: false,
                rent_epoch: 0,
            },
        );
        state
            .accounts
            .insert(vault, Account::new(vault_lamports, 0, &system_program::id()));
        identity
    }
}

fn custom(error: KeystoreError) -> InstructionError {
    InstructionError::Custom(error.code())
}

struct Inner<'a> {
    program_id: Pubkey,
    accounts: &'a mut HashMap<Pubkey, Account>,
}

impl Inner<'_> {
    fn lamports(&self, address: &Pubkey) -> u64 {
        self.accounts.get(address).map(|a| a.lamports).unwrap_or(0)
    }

    fn debit(&mut self, address: &Pubkey, amount: u64) -> Result<(), InstructionError> {
        let account = self
            .accounts
            .get_mut(address)
            .ok_or(InstructionError::InsufficientFunds)?;
        account.lamports = account
            .lamports
            .checked_sub(amount)
            .ok_or(InstructionError::InsufficientFunds)?;
        Ok(())
    }

    fn credit(&mut self, address: &Pubkey, amount: u64) {
        self.accounts
            .entry(*address)
            .or_insert_with(|| Account::new(0, 0, &system_program::id()))
            .lamports += amount;
    }

    fn create_identity(
        &mut self,
        keys: &[Pubkey],
        public_key: [u8; 33],
        label: &str,
        identity_bump: u8,
        vault_bump: u8,
    ) -> Result<(), InstructionError> {
        let [identity, vault, payer, ..] = keys else {
            return Err(InstructionError::NotEnoughAccountKeys);
        };

        let expected_identity = Pubkey::create_program_address(
            &[IDENTITY_SEED, &public_key[..1], &public_key[1..], &[identity_bump]],
            &self.program_id,
        )
        .map_err(|_| custom(KeystoreError::InvalidPda))?;
        let expected_vault = Pubkey::create_program_address(
            &[VAULT_SEED, identity.as_ref(), &[vault_bump]],
            &self.program_id,
        )
        .map_err(|_| custom(KeystoreError::InvalidPda))?;
        if &expected_identity != identity || &expected_vault != vault {
            return Err(custom(KeystoreError::InvalidPda));
        }

        if let Some(existing) = self.accounts.get(identity) {
            if existing.owner == self.program_id
                && IdentityAccount::from_account_data(&existing.data).is_ok()
            {
                return Ok(());
            }
            if existing.owner != system_program::id() {
                return Err(InstructionError::IllegalOwner);
            }
        }

        let first_key = RegisteredKey::new(public_key, label, NOW).map_err(custom)?;

        let rent = Rent::default();
        let identity_rent = rent.minimum_balance(IdentityAccount::LEN);
        let top_up = identity_rent.saturating_sub(self.lamports(identity));
        self.debit(payer, top_up)?;
        self.credit(identity, top_up);
        let account = IdentityAccount::new(identity_bump, vault_bump, first_key);
        if let Some(stored) = self.accounts.get_mut(identity) {
            stored.owner = self.program_id;
            stored.data = account.into_bytes().to_vec();
        }

        let vault_top_up = rent.minimum_balance(0).saturating_sub(self.lamports(vault));
        self.debit(payer, vault_top_up)?;
        self.credit(vault, vault_top_up);
        Ok(())
    }

    fn execute<A: Attestation>(
        &mut self,
        keys: &[Pubkey],
        instructions: &[(Pubkey, Vec<u8>)],
        current: usize,
        action: &Action,
        nonce: u64,
        attestations: &[A],
    ) -> Result<(), InstructionError> {
        let [identity, vault, _sysvar, _system, rest @ ..] = keys else {
            return Err(InstructionError::NotEnoughAccountKeys);
        };
        let stored = self
            .accounts
            .get(identity)
            .filter(|a| a.owner == self.program_id)
            .ok_or(custom(KeystoreError::IdentityNotFound))?;
        let mut account = *IdentityAccount::from_account_data(&stored.data).map_err(custom)?;

        let expected_vault = Pubkey::create_program_address(
            &[VAULT_SEED, identity.as_ref(), &[account.vault_bump()]],
            &self.program_id,
        )
        .map_err(|_| custom(KeystoreError::InvalidPda))?;
        if &expected_vault != vault {
            return Err(custom(KeystoreError::InvalidPda));
        }

        let first = current.checked_sub(attestations.len());
        authorize(&account, action, nonce, attestations, |position, public_key, signature, message| {
            let first = first.ok_or(KeystoreError::InvalidSecp256r1Instruction)?;
            let (program_id, data) = &instructions[first + position];
            if program_id != &SECP256R1_PROGRAM_ID {
                return Ok(false);
            }
            Ok(matches_verification(data, public_key, signature, message).unwrap_or(false))
        })
        .map_err(custom)?;

        match account.apply(action, NOW).map_err(custom)? {
            Effect::Transfer { recipient, amount } => {
                let recipient = Pubkey::new_from_array(recipient);
                if rest.first() != Some(&recipient) {
                    return Err(custom(KeystoreError::InvalidAccountData));
                }
                vault_balance_after(
                    self.lamports(vault),
                    amount,
                    Rent::default().minimum_balance(0),
                )
                .map_err(custom)?;
                self.debit(vault, amount)?;
                self.credit(&recipient, amount);
            },
            Effect::ThresholdChanged { .. } | Effect::KeyAdded { .. } => {},
        }

        if let Some(stored) = self.accounts.get_mut(identity) {
            stored.data = account.into_bytes().to_vec();
        }
        Ok(())
    }
}

fn precompile(data: &[u8]) -> Result<(), InstructionError> {
    // Codes follow the precompile's own error numbering.
    let views = parse_verification(data).map_err(|_| InstructionError::Custom(3))?;
    for view in views {
        let key = VerifyingKey::from_sec1_bytes(view.public_key)
            .map_err(|_| InstructionError::Custom(0))?;
        let signature =
            Signature::from_slice(view.signature).map_err(|_| InstructionError::Custom(2))?;
        if signature.normalize_s().is_some() {
            return Err(InstructionError::Custom(2));
        }
        key.verify(view.message, &signature)
            .map_err(|_| InstructionError::Custom(2))?;
    }
    Ok(())
}

impl LedgerState {
    fn execute(&mut self, program_id: &Pubkey, tx: &Transaction) -> Result<(), TransactionError> {
        let message = &tx.message;
        let resolved: Vec<(Pubkey, Vec<Pubkey>, Vec<u8>)> = message
            .instructions
            .iter()
            .map(|ix| {
                (
                    message.account_keys[ix.program_id_index as usize],
                    ix.accounts
                        .iter()
                        .map(|&i| message.account_keys[i as usize])
                        .collect(),
                    ix.data.clone(),
                )
            })
            .collect();
        let introspection: Vec<(Pubkey, Vec<u8>)> = resolved
            .iter()
            .map(|(program, _, data)| (*program, data.clone()))
            .collect();

        let mut accounts = self.accounts.clone();
        let payer = message.account_keys[0];
        let fee = SIGNATURE_FEE * tx.signatures.len() as u64;
        match accounts.get_mut(&payer) {
            Some(account) if account.lamports >= fee => account.lamports -= fee,
            _ => return Err(TransactionError::InsufficientFundsForFee),
        }

        let mut inner = Inner {
            program_id: *program_id,
            accounts: &mut accounts,
        };
        for (index, (program, keys, data)) in resolved.iter().enumerate() {
            let fail = |e: InstructionError| TransactionError::InstructionError(index as u8, e);
            if program == &SECP256R1_PROGRAM_ID {
                precompile(data).map_err(fail)?;
            } else if program == program_id {
                let instruction = KeystoreInstruction::try_from_slice(data)
                    .map_err(|_| fail(InstructionError::InvalidInstructionData))?;
                let result = match instruction {
                    KeystoreInstruction::CreateIdentity {
                        public_key,
                        label,
                        identity_bump,
                        vault_bump,
                    } => inner.create_identity(keys, public_key, &label, identity_bump, vault_bump),
                    KeystoreInstruction::Execute {
                        action,
                        nonce,
                        attestations,
                    } => inner.execute(keys, &introspection, index, &action, nonce, attestations.as_slice()),
                    KeystoreInstruction::ExecuteWebAuthn {
                        action,
                        nonce,
                        attestations,
                    } => inner.execute(keys, &introspection, index, &action, nonce, attestations.as_slice()),
                };
                result.map_err(fail)?;
            } else {
                return Err(fail(InstructionError::UnsupportedProgramId));
            }
        }

        self.accounts = accounts;
        Ok(())
    }
}

#[async_trait]
impl LedgerConnection for MockLedger {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, LedgerError> {
        Ok(self.state.lock().await.accounts.get(pubkey).cloned())
    }

    async fn get_latest_blockhash(&self) -> Result<(Hash, u64), LedgerError> {
        let state = self.state.lock().await;
        Ok((Hash::new_unique(), state.block_height + BLOCKHASH_LIFETIME))
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<TxSignature, LedgerError> {
        let mut state = self.state.lock().await;
        let signature = tx.signatures[0];
        if state.statuses.contains_key(&signature) || state.pending.contains_key(&signature) {
            return Err(LedgerError::Rejected(TransactionError::AlreadyProcessed));
        }
        state.sent += 1;

        match state.landing {
            Landing::Dropped | Landing::Expired => return Ok(signature),
            Landing::Immediate | Landing::Delayed(_) | Landing::DelayedPastExpiry(_) => {},
        }

        let result = state.execute(&self.program_id, tx);
        if state.preflight {
            if let Err(error) = result {
                return Err(LedgerError::Rejected(error));
            }
        }
        state.block_height += 1;
        match state.landing {
            Landing::Delayed(polls) | Landing::DelayedPastExpiry(polls) => {
                state.pending.insert(
                    signature,
                    Pending {
                        polls_left: polls,
                        result,
                    },
                );
            },
            _ => {
                state.statuses.insert(signature, result);
            },
        }
        Ok(signature)
    }

    async fn get_signature_status(
        &self,
        signature: &TxSignature,
    ) -> Result<Option<Result<(), TransactionError>>, LedgerError> {
        let mut state = self.state.lock().await;
        if state.failing_status_polls > 0 {
            state.failing_status_polls -= 1;
            return Err(LedgerError::Transport("connection reset by peer".to_string()));
        }
        if let Some(pending) = state.pending.get_mut(signature) {
            if pending.polls_left > 0 {
                pending.polls_left -= 1;
                return Ok(None);
            }
            if let Some(pending) = state.pending.remove(signature) {
                state.statuses.insert(*signature, pending.result);
            }
        }
        Ok(state.statuses.get(signature).cloned())
    }

    async fn get_block_height(&self) -> Result<u64, LedgerError> {
        let mut state = self.state.lock().await;
        if state.failing_height_polls > 0 {
            state.failing_height_polls -= 1;
            return Err(LedgerError::Transport("request timed out".to_string()));
        }
        if matches!(state.landing, Landing::Expired | Landing::DelayedPastExpiry(_)) {
            state.block_height += BLOCKHASH_LIFETIME;
        }
        Ok(state.block_height)
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, LedgerError> {
        Ok(Rent::default().minimum_balance(data_len))
    }
}

//=============================================================================
// Test passkeys
//=============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Approve,
    Cancel,
    /// Never answers
    Hang,
    /// Signs a different challenge than the one asked for
    WrongChallenge,
}

pub struct TestPasskey {
    key: SigningKey,
    pub behavior: Behavior,
}

impl TestPasskey {
    pub fn new() -> Self {
        Self::with_behavior(Behavior::Approve)
    }

    pub fn with_behavior(behavior: Behavior) -> Self {
        Self {
            key: SigningKey::random(&mut OsRng),
            behavior,
        }
    }

    pub fn compressed(&self) -> [u8; 33] {
        self.key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .try_into()
            .expect("compressed point")
    }

    /// Low-S raw signature over `message`
    pub fn sign_raw(&self, message: &[u8]) -> [u8; 64] {
        let signature: Signature = self.key.sign(message);
        let signature = signature.normalize_s().unwrap_or(signature);
        let mut raw = [0u8; 64];
        raw.copy_from_slice(&signature.to_bytes());
        raw
    }

    pub fn approve(&self, key_index: u8, message: &[u8]) -> Approval {
        Approval {
            key_index,
            signature: self.sign_raw(message),
        }
    }

    /// Assertion as an authenticator returns it: a DER signature, possibly
    /// high-S, over `authenticator_data ++ sha256(client_data_json)`.
    pub fn assert(&self, challenge: [u8; 32]) -> PasskeyAssertion {
        let mut authenticator_data = sha256(&[b"keystore.example"]).to_vec();
        authenticator_data.push(0x05);
        authenticator_data.extend_from_slice(&7u32.to_be_bytes());

        let client_data_json = format!(
            r#"{{"type":"webauthn.get","challenge":"{}","origin":"https://keystore.example","crossOrigin":false}}"#,
            webauthn::encode_challenge(&challenge)
        )
        .into_bytes();

        let payload =
            webauthn::signed_payload(&authenticator_data, &client_data_json).expect("payload");
        let signature: Signature = self.key.sign(&payload);
        PasskeyAssertion {
            signature_der: signature.to_der().as_bytes().to_vec(),
            authenticator_data,
            client_data_json,
        }
    }
}

#[async_trait]
impl PasskeySigner for TestPasskey {
    fn public_key(&self) -> [u8; 33] {
        self.compressed()
    }

    async fn sign(&self, challenge: [u8; 32]) -> Result<PasskeyAssertion, SignerError> {
        match self.behavior {
            Behavior::Approve => Ok(self.assert(challenge)),
            Behavior::Cancel => Err(SignerError::Cancelled),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                Err(SignerError::Failed("unreachable".to_string()))
            },
            Behavior::WrongChallenge => Ok(self.assert(sha256(&[&challenge]))),
        }
    }
}

pub struct Harness {
    pub ledger: MockLedger,
    pub payer: Keypair,
    pub program_id: Pubkey,
}

pub async fn setup() -> Harness {
    let program_id = DEFAULT_PROGRAM_ID;
    let ledger = MockLedger::new(program_id);
    let payer = Keypair::new();
    ledger.airdrop(&payer.pubkey(), 10_000_000_000).await;
    Harness {
        ledger,
        payer,
        program_id,
    }
}
