//! Keystore State Module
//!
//! Shared data shapes for the keystore program and its clients: the canonical
//! action message, the secp256r1 precompile instruction layout, the
//! Identity/Vault account model and the threshold authorization rules.

pub mod authorization;
pub mod error;
pub mod identity;
pub mod message;
pub mod secp256r1;
pub mod transmute;
pub mod webauthn;

use pinocchio::pubkey::Pubkey;

pub use authorization::{authorize, Attestation, SignatureAttestation, WebAuthnAttestation};
pub use error::KeystoreError;
pub use identity::{Effect, IdentityAccount, IdentityHeader, RegisteredKey, MAX_KEYS, MAX_LABEL_LEN};
pub use message::{decode_message, encode_message, message_challenge, Action};
pub use transmute::{IntoBytes, Transmutable, TransmutableMut};

/// Seed prefix of the Identity PDA
pub const IDENTITY_SEED: &[u8] = b"identity";

/// Seed prefix of the Vault PDA
pub const VAULT_SEED: &[u8] = b"vault";

/// Represents the type discriminator for different account types in the system.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Discriminator {
    /// Identity account (threshold, nonce, registered keys)
    Identity = 1,
}

impl TryFrom<u8> for Discriminator {
    type Error = KeystoreError;

    fn try_from(discriminator: u8) -> Result<Self, Self::Error> {
        match discriminator {
            1 => Ok(Discriminator::Identity),
            _ => Err(KeystoreError::IdentityNotFound),
        }
    }
}

/// Generate PDA seeds for an Identity.
///
/// The 33-byte compressed key exceeds the 32-byte seed limit, so it is split
/// into its prefix byte and the x coordinate.
pub fn identity_seeds(public_key: &[u8; 33]) -> [&[u8]; 3] {
    [IDENTITY_SEED, &public_key[..1], &public_key[1..]]
}

/// Generate Identity PDA seeds with bump
pub fn identity_seeds_with_bump<'a>(public_key: &'a [u8; 33], bump: &'a [u8]) -> [&'a [u8]; 4] {
    [IDENTITY_SEED, &public_key[..1], &public_key[1..], bump]
}

/// Generate PDA seeds for the Vault owned by an Identity
pub fn vault_seeds(identity: &Pubkey) -> [&[u8]; 2] {
    [VAULT_SEED, identity.as_ref()]
}

/// Generate vault PDA seeds with bump
pub fn vault_seeds_with_bump<'a>(identity: &'a Pubkey, bump: &'a [u8]) -> [&'a [u8]; 3] {
    [VAULT_SEED, identity.as_ref(), bump]
}

/// SHA-256 over the concatenation of `parts`.
#[cfg(target_os = "solana")]
pub fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hash = [0u8; 32];
    unsafe {
        pinocchio::syscalls::sol_sha256(
            parts.as_ptr() as *const u8,
            parts.len() as u64,
            hash.as_mut_ptr(),
        );
    }
    hash
}

/// SHA-256 over the concatenation of `parts`.
#[cfg(not(target_os = "solana"))]
pub fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}
