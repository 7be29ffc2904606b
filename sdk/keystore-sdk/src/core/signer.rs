use async_trait::async_trait;
use thiserror::Error;

use crate::assertion::PasskeyAssertion;

#[derive(Debug, Error)]
pub enum SignerError {
    /// The user dismissed the prompt
    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(String),
}

/// Signing oracle for one passkey.
///
/// `sign` is the biometric prompt: it suspends until the authenticator
/// returns an assertion over `challenge` or the user cancels.
#[async_trait]
pub trait PasskeySigner: Send + Sync {
    /// Compressed P-256 public key of the credential
    fn public_key(&self) -> [u8; 33];

    async fn sign(&self, challenge: [u8; 32]) -> Result<PasskeyAssertion, SignerError>;
}
