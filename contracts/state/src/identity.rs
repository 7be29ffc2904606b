//! Identity account model.
//!
//! An Identity is a fixed 416-byte account: a 16-byte [`IdentityHeader`]
//! followed by [`MAX_KEYS`] [`RegisteredKey`] slots, of which the first
//! `key_count` are in use. Every field is a byte or byte array, so the
//! layout has alignment 1 and can be viewed in place over account data.

use bytemuck::{Pod, Zeroable};
use pinocchio::pubkey::Pubkey;

use crate::{
    error::KeystoreError,
    message::Action,
    transmute::{Transmutable, TransmutableMut},
    Discriminator,
};

/// Maximum number of keys an identity can register
pub const MAX_KEYS: usize = 5;

/// Maximum label length in bytes
pub const MAX_LABEL_LEN: usize = 32;

/// Identity account header (16 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct IdentityHeader {
    /// Account type discriminator (= 1)
    pub discriminator: u8,
    /// Identity PDA bump seed
    pub bump: u8,
    /// Vault PDA bump seed
    pub vault_bump: u8,
    /// Approvals required per action
    pub threshold: u8,
    /// Number of used key slots
    pub key_count: u8,
    pub reserved: [u8; 3],
    nonce: [u8; 8],
}

impl IdentityHeader {
    pub const LEN: usize = 16;

    pub fn nonce(&self) -> u64 {
        u64::from_le_bytes(self.nonce)
    }

    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce.to_le_bytes();
    }

    pub fn is_initialized(&self) -> bool {
        self.discriminator == Discriminator::Identity as u8
    }
}

/// A registered passkey (80 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct RegisteredKey {
    /// Compressed P-256 public key
    pub public_key: [u8; 33],
    label_len: u8,
    label: [u8; MAX_LABEL_LEN],
    registered_at: [u8; 8],
    pub reserved: [u8; 6],
}

impl RegisteredKey {
    pub const LEN: usize = 80;

    pub fn new(
        public_key: [u8; 33],
        label: &str,
        registered_at: i64,
    ) -> Result<Self, KeystoreError> {
        validate_public_key(&public_key)?;
        validate_label(label)?;

        let mut key = Self::zeroed();
        key.public_key = public_key;
        key.label_len = label.len() as u8;
        key.label[..label.len()].copy_from_slice(label.as_bytes());
        key.registered_at = registered_at.to_le_bytes();
        Ok(key)
    }

    pub fn label(&self) -> &str {
        let len = (self.label_len as usize).min(MAX_LABEL_LEN);
        core::str::from_utf8(&self.label[..len]).unwrap_or_default()
    }

    pub fn registered_at(&self) -> i64 {
        i64::from_le_bytes(self.registered_at)
    }
}

/// Compressed SEC1 encoding: 33 bytes with an 0x02 or 0x03 prefix.
pub fn validate_public_key(public_key: &[u8; 33]) -> Result<(), KeystoreError> {
    match public_key[0] {
        0x02 | 0x03 => Ok(()),
        _ => Err(KeystoreError::InvalidPublicKey),
    }
}

pub fn validate_label(label: &str) -> Result<(), KeystoreError> {
    if label.is_empty() || label.len() > MAX_LABEL_LEN {
        return Err(KeystoreError::InvalidLabel);
    }
    Ok(())
}

/// Result of applying an authorized action to the identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Lamports still have to be moved out of the vault
    Transfer { recipient: Pubkey, amount: u64 },
    ThresholdChanged { threshold: u8 },
    KeyAdded { key_index: u8 },
}

/// The whole Identity account.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Pod, Zeroable)]
pub struct IdentityAccount {
    pub header: IdentityHeader,
    key_slots: [RegisteredKey; MAX_KEYS],
}

impl Transmutable for IdentityAccount {
    const LEN: usize = core::mem::size_of::<IdentityAccount>();
}

impl TransmutableMut for IdentityAccount {}

impl IdentityAccount {
    /// Creates a fresh identity: one key, threshold 1, nonce 0.
    pub fn new(bump: u8, vault_bump: u8, first_key: RegisteredKey) -> Self {
        let mut account = Self::zeroed();
        account.header.discriminator = Discriminator::Identity as u8;
        account.header.bump = bump;
        account.header.vault_bump = vault_bump;
        account.header.threshold = 1;
        account.header.key_count = 1;
        account.key_slots[0] = first_key;
        account
    }

    /// Views initialized identity data, or `IdentityNotFound`.
    pub fn from_account_data(data: &[u8]) -> Result<&Self, KeystoreError> {
        let account = Self::load(data).map_err(|_| KeystoreError::IdentityNotFound)?;
        account.check_initialized()?;
        Ok(account)
    }

    pub fn from_account_data_mut(data: &mut [u8]) -> Result<&mut Self, KeystoreError> {
        let account = Self::load_mut(data).map_err(|_| KeystoreError::IdentityNotFound)?;
        account.check_initialized()?;
        Ok(account)
    }

    fn check_initialized(&self) -> Result<(), KeystoreError> {
        let count = self.header.key_count as usize;
        let threshold = self.header.threshold as usize;
        if !self.header.is_initialized() || count == 0 || count > MAX_KEYS {
            return Err(KeystoreError::IdentityNotFound);
        }
        if threshold == 0 || threshold > count {
            return Err(KeystoreError::InvalidAccountData);
        }
        Ok(())
    }

    pub fn threshold(&self) -> u8 {
        self.header.threshold
    }

    pub fn nonce(&self) -> u64 {
        self.header.nonce()
    }

    pub fn vault_bump(&self) -> u8 {
        self.header.vault_bump
    }

    /// Registered keys, in slot order.
    pub fn keys(&self) -> &[RegisteredKey] {
        let count = (self.header.key_count as usize).min(MAX_KEYS);
        &self.key_slots[..count]
    }

    pub fn key(&self, index: u8) -> Result<&RegisteredKey, KeystoreError> {
        self.keys()
            .get(index as usize)
            .ok_or(KeystoreError::InvalidKeyIndex)
    }

    pub fn position_of(&self, public_key: &[u8; 33]) -> Option<usize> {
        self.keys().iter().position(|k| &k.public_key == public_key)
    }

    /// Checks action arguments against the current state.
    pub fn validate_action(&self, action: &Action) -> Result<(), KeystoreError> {
        match action {
            Action::Send { amount, .. } => {
                if *amount == 0 {
                    return Err(KeystoreError::InvalidActionArguments);
                }
            },
            Action::SetThreshold { threshold } => {
                if *threshold == 0 || *threshold as usize > self.keys().len() {
                    return Err(KeystoreError::InvalidActionArguments);
                }
            },
            Action::AddKey { public_key, label } => {
                if self.keys().len() >= MAX_KEYS {
                    return Err(KeystoreError::MaxKeysReached);
                }
                validate_public_key(public_key)?;
                if self.position_of(public_key).is_some() {
                    return Err(KeystoreError::DuplicateKey);
                }
                validate_label(label)?;
            },
        }
        Ok(())
    }

    /// Only the current nonce is accepted.
    pub fn check_nonce(&self, nonce: u64) -> Result<(), KeystoreError> {
        let stored = self.nonce();
        if nonce < stored {
            return Err(KeystoreError::StaleNonce);
        }
        if nonce > stored {
            return Err(KeystoreError::InvalidActionArguments);
        }
        Ok(())
    }

    /// Consumes the nonce and applies the action's state change.
    ///
    /// Must only be called after the action has been authorized.
    pub fn apply(&mut self, action: &Action, now: i64) -> Result<Effect, KeystoreError> {
        self.validate_action(action)?;
        let next = self
            .nonce()
            .checked_add(1)
            .ok_or(KeystoreError::InvalidActionArguments)?;

        let effect = match action {
            Action::Send { recipient, amount } => Effect::Transfer {
                recipient: *recipient,
                amount: *amount,
            },
            Action::SetThreshold { threshold } => {
                self.header.threshold = *threshold;
                Effect::ThresholdChanged {
                    threshold: *threshold,
                }
            },
            Action::AddKey { public_key, label } => {
                let key_index = self.header.key_count;
                self.key_slots[key_index as usize] = RegisteredKey::new(*public_key, label, now)?;
                self.header.key_count += 1;
                Effect::KeyAdded { key_index }
            },
        };
        self.header.set_nonce(next);
        Ok(effect)
    }
}

/// Lamports left in the vault after sending `amount`.
///
/// The vault must either stay rent exempt or be drained completely.
pub fn vault_balance_after(
    vault_lamports: u64,
    amount: u64,
    rent_exempt_minimum: u64,
) -> Result<u64, KeystoreError> {
    let remaining = vault_lamports
        .checked_sub(amount)
        .ok_or(KeystoreError::InsufficientFunds)?;
    if remaining != 0 && remaining < rent_exempt_minimum {
        return Err(KeystoreError::InsufficientFunds);
    }
    Ok(remaining)
}
