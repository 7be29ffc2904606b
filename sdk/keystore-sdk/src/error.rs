use keystore_state::KeystoreError;
use solana_sdk::instruction::InstructionError;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::TransactionError;
use thiserror::Error;

/// How a caller should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rejected before submission; fix the input
    Validation,
    /// The program rejected the batch; not retried
    Protocol,
    /// The batch may or may not have landed; re-read the identity first
    Ambiguous,
    /// The batch can no longer land; rebuild and retry
    Expired,
    /// The signing oracle did not produce an assertion
    Signing,
}

/// SDK-specific error types for keystore operations
#[derive(Debug, Error)]
pub enum KeystoreSdkError {
    #[error("Invalid input length: {0}")]
    InvalidInputLength(String),

    #[error("Malformed DER signature: {0}")]
    MalformedSignature(String),

    #[error("Threshold not met: need {required} of {available}, got {provided}")]
    ThresholdNotMet {
        required: u8,
        provided: usize,
        available: usize,
    },

    #[error("Key index {index} out of range ({key_count} keys registered)")]
    InvalidKeyIndex { index: u8, key_count: usize },

    #[error("Key index {0} used twice in one batch")]
    DuplicateKeyInAttestationSet(u8),

    #[error("Invalid action arguments: {0}")]
    InvalidActionArguments(KeystoreError),

    #[error("Passkey is not registered on this identity")]
    UnregisteredKey([u8; 33]),

    #[error("Invalid WebAuthn assertion: {0}")]
    InvalidWebAuthnData(String),

    /// Custom program error decoded from a failed transaction
    #[error("Program error in instruction {instruction_index}: {error}")]
    Program {
        instruction_index: u8,
        error: KeystoreError,
    },

    /// Any other terminal transaction failure
    #[error("Transaction failed: {0}")]
    TransactionFailed(TransactionError),

    #[error("Confirmation timed out for {signature}")]
    ConfirmationTimeout { signature: Signature },

    #[error("Batch {signature} expired after block height {last_valid_block_height}")]
    BatchExpired {
        signature: Signature,
        last_valid_block_height: u64,
    },

    #[error("Signing cancelled")]
    SigningCancelled,

    #[error("Signing timed out after {0} ms")]
    SigningTimedOut(u64),

    #[error("Signer error: {0}")]
    Signer(String),

    /// Connection or RPC error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Account not found on-chain
    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    /// Invalid account data or deserialization error
    #[error("Invalid account data: {0}")]
    InvalidAccountData(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Borsh serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] std::io::Error),
}

impl KeystoreSdkError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidInputLength(_)
            | Self::MalformedSignature(_)
            | Self::ThresholdNotMet { .. }
            | Self::InvalidKeyIndex { .. }
            | Self::DuplicateKeyInAttestationSet(_)
            | Self::InvalidActionArguments(_)
            | Self::UnregisteredKey(_)
            | Self::InvalidWebAuthnData(_)
            | Self::AccountNotFound(_)
            | Self::InvalidAccountData(_)
            | Self::Config(_)
            | Self::SerializationError(_) => ErrorClass::Validation,
            Self::Program { .. } | Self::TransactionFailed(_) => ErrorClass::Protocol,
            Self::ConfirmationTimeout { .. } | Self::Connection(_) => ErrorClass::Ambiguous,
            Self::BatchExpired { .. } => ErrorClass::Expired,
            Self::SigningCancelled | Self::SigningTimedOut(_) | Self::Signer(_) => {
                ErrorClass::Signing
            },
        }
    }

    /// Text suitable for showing to the person holding the passkey.
    pub fn user_message(&self) -> String {
        match self {
            Self::ThresholdNotMet {
                required,
                provided,
                available,
            } => format!("need {required} of {available} approvals, got {provided}"),
            Self::Program {
                error: KeystoreError::StaleNonce,
                ..
            } => "another approval already used this request; review and try again".to_string(),
            Self::Program {
                error: KeystoreError::ThresholdNotMet,
                ..
            } => "not enough valid approvals were accepted".to_string(),
            Self::Program {
                error: KeystoreError::InsufficientFunds,
                ..
            } => "the vault does not hold enough to send that amount".to_string(),
            Self::ConfirmationTimeout { .. } | Self::Connection(_) => {
                "outcome unknown, check the identity before retrying".to_string()
            },
            Self::BatchExpired { .. } => "the request expired before it landed; try again".to_string(),
            Self::SigningCancelled => "signing was cancelled".to_string(),
            Self::SigningTimedOut(_) => "no passkey response in time".to_string(),
            Self::UnregisteredKey(_) => "this passkey is not registered on the identity".to_string(),
            other => other.to_string(),
        }
    }

    /// Decodes a failed transaction status.
    pub fn from_transaction_error(error: TransactionError) -> Self {
        if let TransactionError::InstructionError(index, InstructionError::Custom(code)) = &error {
            if let Some(decoded) = KeystoreError::from_code(*code) {
                return Self::Program {
                    instruction_index: *index,
                    error: decoded,
                };
            }
        }
        Self::TransactionFailed(error)
    }
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, KeystoreSdkError>;
