//! Submission of one batch and bounded confirmation polling.

use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use tracing::{debug, info, warn};

use crate::basic::batch::InstructionBatch;
use crate::core::config::ConfirmationConfig;
use crate::core::connection::{LedgerConnection, LedgerError};
use crate::error::{KeystoreSdkError, Result};

/// Submits batches and waits for a terminal outcome.
///
/// A batch is sent exactly once; the orchestrator never resubmits. Outcomes:
/// confirmed (`Ok`), a terminal program failure, [`KeystoreSdkError::BatchExpired`]
/// once the blockhash can no longer land, or
/// [`KeystoreSdkError::ConfirmationTimeout`] when polling runs out first.
/// Transport failures while polling are retried like an empty poll.
pub struct Orchestrator<'a, C: LedgerConnection> {
    connection: &'a C,
    confirmation: ConfirmationConfig,
}

impl<'a, C: LedgerConnection> Orchestrator<'a, C> {
    pub fn new(connection: &'a C, confirmation: ConfirmationConfig) -> Self {
        Self {
            connection,
            confirmation,
        }
    }

    fn connection_error(error: LedgerError) -> KeystoreSdkError {
        match error {
            LedgerError::Rejected(tx_error) => KeystoreSdkError::from_transaction_error(tx_error),
            LedgerError::Transport(message) => KeystoreSdkError::Connection(message),
        }
    }

    /// Whether the ledger reports `signature` as executed. A poll the
    /// transport fails to answer counts as no status yet.
    async fn is_confirmed(&self, signature: &Signature) -> Result<bool> {
        match self.connection.get_signature_status(signature).await {
            Ok(Some(Ok(()))) => Ok(true),
            Ok(Some(Err(tx_error))) => {
                warn!("batch {signature} failed: {tx_error}");
                Err(KeystoreSdkError::from_transaction_error(tx_error))
            },
            Ok(None) => Ok(false),
            Err(LedgerError::Rejected(tx_error)) => {
                warn!("batch {signature} rejected: {tx_error}");
                Err(KeystoreSdkError::from_transaction_error(tx_error))
            },
            Err(LedgerError::Transport(message)) => {
                warn!("status poll for {signature} failed: {message}");
                Ok(false)
            },
        }
    }

    pub async fn submit_and_confirm(
        &self,
        batch: &InstructionBatch,
        payer: &Keypair,
    ) -> Result<Signature> {
        let (blockhash, last_valid_block_height) = self
            .connection
            .get_latest_blockhash()
            .await
            .map_err(Self::connection_error)?;

        let tx = Transaction::new_signed_with_payer(
            &batch.instructions,
            Some(&payer.pubkey()),
            &[payer],
            blockhash,
        );

        let signature = self
            .connection
            .send_transaction(&tx)
            .await
            .map_err(Self::connection_error)?;
        debug!(
            "sent batch {signature} for {} at nonce {}, valid through block {last_valid_block_height}",
            batch.identity, batch.nonce
        );

        for attempt in 0..self.confirmation.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.confirmation.poll_interval()).await;
            }

            if self.is_confirmed(&signature).await? {
                info!("batch {signature} confirmed after {} polls", attempt + 1);
                return Ok(signature);
            }

            match self.connection.get_block_height().await {
                Ok(height) if height > last_valid_block_height => {
                    // The batch may have landed in the last valid block.
                    if self.is_confirmed(&signature).await? {
                        info!("batch {signature} confirmed at expiry");
                        return Ok(signature);
                    }
                    warn!("batch {signature} expired at block height {height}");
                    return Err(KeystoreSdkError::BatchExpired {
                        signature,
                        last_valid_block_height,
                    });
                },
                Ok(_) => {},
                Err(e) => warn!("block height poll for {signature} failed: {e}"),
            }
        }

        warn!(
            "batch {signature} unconfirmed after {} polls",
            self.confirmation.max_retries
        );
        Err(KeystoreSdkError::ConfirmationTimeout { signature })
    }
}
