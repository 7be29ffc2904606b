use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use tracing::{debug, info};

use crate::advanced::instructions;
use crate::basic::batch::{assemble_webauthn_batch, InstructionBatch, WebAuthnApproval};
use crate::basic::orchestrator::Orchestrator;
use crate::core::config::{ConfirmationConfig, SdkConfig};
use crate::core::connection::{LedgerConnection, RpcLedger};
use crate::core::signer::{PasskeySigner, SignerError};
use crate::error::{KeystoreSdkError, Result};
use crate::types::IdentityInfo;
use crate::utils::{self, derive_identity_pda, derive_vault_pda};
use keystore_state::{message_challenge, Action};

const DEFAULT_SIGNING_TIMEOUT: std::time::Duration =
    std::time::Duration::from_millis(crate::core::constants::DEFAULT_SIGNING_TIMEOUT_MS);

/// A passkey-controlled identity and its vault.
pub struct PasskeyWallet<C: LedgerConnection> {
    connection: C,

    /// Program ID of the keystore contract
    pub program_id: Pubkey,

    /// Identity PDA - holds threshold, nonce and registered keys
    pub identity: Pubkey,

    /// Vault PDA - the address that holds funds
    pub vault: Pubkey,

    /// Public key the identity was created with
    pub first_public_key: [u8; 33],

    signing_timeout: std::time::Duration,
    confirmation: ConfirmationConfig,
}

impl PasskeyWallet<RpcLedger> {
    /// Wallet over a JSON-RPC node described by `config`
    pub fn from_config(config: &SdkConfig, first_public_key: [u8; 33]) -> Result<Self> {
        let connection = RpcLedger::new(config.rpc_url.clone(), config.commitment()?);
        Ok(Self::new(connection, config.program_id()?, first_public_key)
            .with_signing_timeout(config.signing_timeout())
            .with_confirmation(config.confirmation.clone()))
    }
}

impl<C: LedgerConnection> PasskeyWallet<C> {
    pub fn new(connection: C, program_id: Pubkey, first_public_key: [u8; 33]) -> Self {
        let (identity, _) = derive_identity_pda(&program_id, &first_public_key);
        let (vault, _) = derive_vault_pda(&program_id, &identity);
        Self {
            connection,
            program_id,
            identity,
            vault,
            first_public_key,
            signing_timeout: DEFAULT_SIGNING_TIMEOUT,
            confirmation: ConfirmationConfig::default(),
        }
    }

    pub fn with_signing_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.signing_timeout = timeout;
        self
    }

    pub fn with_confirmation(mut self, confirmation: ConfirmationConfig) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    fn orchestrator(&self) -> Orchestrator<'_, C> {
        Orchestrator::new(&self.connection, self.confirmation.clone())
    }

    /// Fetch the current identity state
    pub async fn fetch_identity(&self) -> Result<IdentityInfo> {
        utils::fetch_identity(&self.connection, &self.program_id, &self.identity).await
    }

    /// Vault balance in lamports; zero while the vault is unfunded
    pub async fn vault_balance(&self) -> Result<u64> {
        let account = self
            .connection
            .get_account(&self.vault)
            .await
            .map_err(|e| KeystoreSdkError::Connection(e.to_string()))?;
        Ok(account.map(|a| a.lamports).unwrap_or(0))
    }

    /// Create the identity with its first key (threshold 1, nonce 0).
    ///
    /// Creating an identity that already exists succeeds without changes.
    pub async fn create_identity(&self, payer: &Keypair, label: &str) -> Result<Signature> {
        let instruction = instructions::create_identity(
            &self.program_id,
            &payer.pubkey(),
            self.first_public_key,
            label,
        )?;
        let batch = InstructionBatch {
            instructions: vec![instruction],
            identity: self.identity,
            nonce: 0,
            message: Vec::new(),
        };
        let signature = self.orchestrator().submit_and_confirm(&batch, payer).await?;
        info!("identity {} ready", self.identity);
        Ok(signature)
    }

    /// Collect one assertion per signer over the current challenge.
    async fn collect_approvals(
        &self,
        identity: &IdentityInfo,
        challenge: [u8; 32],
        signers: &[&dyn PasskeySigner],
    ) -> Result<Vec<WebAuthnApproval>> {
        let mut approvals = Vec::with_capacity(signers.len());
        for signer in signers {
            let public_key = signer.public_key();
            let key_index = identity
                .key_index_of(&public_key)
                .ok_or(KeystoreSdkError::UnregisteredKey(public_key))?;

            debug!("requesting assertion from key {key_index}");
            let assertion = tokio::time::timeout(self.signing_timeout, signer.sign(challenge))
                .await
                .map_err(|_| {
                    KeystoreSdkError::SigningTimedOut(self.signing_timeout.as_millis() as u64)
                })?
                .map_err(|e| match e {
                    SignerError::Cancelled => KeystoreSdkError::SigningCancelled,
                    SignerError::Failed(message) => KeystoreSdkError::Signer(message),
                })?;
            approvals.push(WebAuthnApproval {
                key_index,
                assertion,
            });
        }
        Ok(approvals)
    }

    /// Build the batch for `action` at the current nonce, signing with each
    /// of `signers` in turn.
    pub async fn prepare(
        &self,
        action: &Action,
        signers: &[&dyn PasskeySigner],
    ) -> Result<InstructionBatch> {
        let identity = self.fetch_identity().await?;
        identity
            .account
            .validate_action(action)
            .map_err(KeystoreSdkError::InvalidActionArguments)?;

        let challenge = message_challenge(action, identity.nonce());
        let approvals = self.collect_approvals(&identity, challenge, signers).await?;
        assemble_webauthn_batch(&self.program_id, &identity, action, &approvals)
    }

    /// Authorize and execute `action`, returning the confirmed signature.
    pub async fn authorize(
        &self,
        action: &Action,
        signers: &[&dyn PasskeySigner],
        payer: &Keypair,
    ) -> Result<Signature> {
        let batch = self.prepare(action, signers).await?;
        let signature = self.orchestrator().submit_and_confirm(&batch, payer).await?;
        info!(
            "action confirmed for {} at nonce {}: {signature}",
            self.identity, batch.nonce
        );
        Ok(signature)
    }

    /// Transfer `amount` lamports from the vault to `recipient`.
    pub async fn send(
        &self,
        recipient: &Pubkey,
        amount: u64,
        signers: &[&dyn PasskeySigner],
        payer: &Keypair,
    ) -> Result<Signature> {
        let action = Action::Send {
            recipient: recipient.to_bytes(),
            amount,
        };
        self.authorize(&action, signers, payer).await
    }

    pub async fn set_threshold(
        &self,
        threshold: u8,
        signers: &[&dyn PasskeySigner],
        payer: &Keypair,
    ) -> Result<Signature> {
        self.authorize(&Action::SetThreshold { threshold }, signers, payer)
            .await
    }

    pub async fn add_key(
        &self,
        public_key: [u8; 33],
        label: &str,
        signers: &[&dyn PasskeySigner],
        payer: &Keypair,
    ) -> Result<Signature> {
        let action = Action::AddKey {
            public_key,
            label: label.to_string(),
        };
        self.authorize(&action, signers, payer).await
    }
}
