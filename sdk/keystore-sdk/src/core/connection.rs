use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::account::Account;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{Transaction, TransactionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger refused the transaction (e.g. preflight simulation failed)
    #[error("transaction rejected: {0}")]
    Rejected(TransactionError),

    #[error("{0}")]
    Transport(String),
}

#[async_trait]
pub trait LedgerConnection: Send + Sync {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, LedgerError>;

    /// Latest blockhash and the last block height at which a transaction
    /// using it can land.
    async fn get_latest_blockhash(&self) -> Result<(Hash, u64), LedgerError>;

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, LedgerError>;

    /// `None` while the ledger has no status for `signature`.
    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<Result<(), TransactionError>>, LedgerError>;

    async fn get_block_height(&self) -> Result<u64, LedgerError>;

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, LedgerError>;
}

/// [`LedgerConnection`] over a JSON-RPC node
pub struct RpcLedger {
    client: RpcClient,
    commitment: CommitmentConfig,
}

impl RpcLedger {
    pub fn new(rpc_url: impl Into<String>, commitment: CommitmentConfig) -> Self {
        Self {
            client: RpcClient::new_with_commitment(rpc_url.into(), commitment),
            commitment,
        }
    }
}

fn transport(error: solana_client::client_error::ClientError) -> LedgerError {
    match error.get_transaction_error() {
        Some(tx_error) => LedgerError::Rejected(tx_error),
        None => LedgerError::Transport(error.to_string()),
    }
}

#[async_trait]
impl LedgerConnection for RpcLedger {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, LedgerError> {
        self.client
            .get_account_with_commitment(pubkey, self.commitment)
            .await
            .map(|response| response.value)
            .map_err(transport)
    }

    async fn get_latest_blockhash(&self) -> Result<(Hash, u64), LedgerError> {
        self.client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await
            .map_err(transport)
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, LedgerError> {
        self.client.send_transaction(tx).await.map_err(transport)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<Result<(), TransactionError>>, LedgerError> {
        self.client
            .get_signature_status_with_commitment(signature, self.commitment)
            .await
            .map_err(transport)
    }

    async fn get_block_height(&self) -> Result<u64, LedgerError> {
        self.client
            .get_block_height_with_commitment(self.commitment)
            .await
            .map_err(transport)
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, LedgerError> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(transport)
    }
}
