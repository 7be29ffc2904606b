use pinocchio::program_error::ProgramError;
use thiserror::Error;

/// Errors returned by the keystore program.
///
/// Codes are `6000 + ordinal` and stable across releases; clients decode them
/// with [`KeystoreError::from_code`].
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum KeystoreError {
    /// Identity account is missing, not owned by the program, or uninitialized
    #[error("identity account not found")]
    IdentityNotFound = 6000,
    /// Fewer distinct valid approvals than the identity threshold
    #[error("approval threshold not met")]
    ThresholdNotMet,
    /// Attestation references a key slot that is not registered
    #[error("attestation key index out of range")]
    InvalidKeyIndex,
    /// The same key index appears twice in one attestation set
    #[error("key index reused within attestation set")]
    DuplicateKeyInAttestationSet,
    /// Nonce is behind the identity's stored nonce
    #[error("nonce already consumed")]
    StaleNonce,
    /// Action arguments (or a future nonce) are not acceptable
    #[error("invalid action arguments")]
    InvalidActionArguments,
    /// All key slots are in use
    #[error("maximum number of keys reached")]
    MaxKeysReached,
    /// Public key is already registered on this identity
    #[error("public key already registered")]
    DuplicateKey,
    /// Public key is not a compressed P-256 point encoding
    #[error("invalid compressed public key")]
    InvalidPublicKey,
    /// Label is empty or longer than 32 bytes
    #[error("invalid key label")]
    InvalidLabel,
    /// Precompile instruction is missing, misplaced or malformed
    #[error("invalid secp256r1 verification instruction")]
    InvalidSecp256r1Instruction,
    /// Authenticator data or client data JSON is malformed
    #[error("invalid webauthn data")]
    InvalidWebAuthnData,
    /// Vault cannot cover the transfer while staying rent exempt
    #[error("insufficient vault funds")]
    InsufficientFunds,
    /// Account does not match what the instruction requires
    #[error("invalid account data")]
    InvalidAccountData,
    /// Account address does not match the derived PDA
    #[error("invalid program derived address")]
    InvalidPda,
    /// Public key, signature or message length out of range
    #[error("invalid input length")]
    InvalidInputLength,
}

impl KeystoreError {
    pub const ALL: [KeystoreError; 16] = [
        KeystoreError::IdentityNotFound,
        KeystoreError::ThresholdNotMet,
        KeystoreError::InvalidKeyIndex,
        KeystoreError::DuplicateKeyInAttestationSet,
        KeystoreError::StaleNonce,
        KeystoreError::InvalidActionArguments,
        KeystoreError::MaxKeysReached,
        KeystoreError::DuplicateKey,
        KeystoreError::InvalidPublicKey,
        KeystoreError::InvalidLabel,
        KeystoreError::InvalidSecp256r1Instruction,
        KeystoreError::InvalidWebAuthnData,
        KeystoreError::InsufficientFunds,
        KeystoreError::InvalidAccountData,
        KeystoreError::InvalidPda,
        KeystoreError::InvalidInputLength,
    ];

    pub fn code(self) -> u32 {
        self as u32
    }

    /// Maps a `ProgramError::Custom` code back to its error.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.code() == code)
    }
}

impl From<KeystoreError> for ProgramError {
    fn from(e: KeystoreError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
