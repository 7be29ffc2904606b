use keystore_state::IdentityAccount;
use solana_sdk::pubkey::Pubkey;

/// A registered passkey as seen by clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Slot index, used as `key_index` in attestations
    pub index: u8,

    /// Compressed P-256 public key
    pub public_key: [u8; 33],

    pub label: String,

    /// Unix timestamp of registration
    pub registered_at: i64,
}

/// Snapshot of an Identity account
#[derive(Debug, Clone)]
pub struct IdentityInfo {
    /// Identity PDA
    pub address: Pubkey,

    /// Vault PDA holding the identity's lamports
    pub vault: Pubkey,

    /// Raw account state, as the program sees it
    pub account: IdentityAccount,
}

impl IdentityInfo {
    pub fn threshold(&self) -> u8 {
        self.account.threshold()
    }

    pub fn nonce(&self) -> u64 {
        self.account.nonce()
    }

    pub fn keys(&self) -> Vec<KeyInfo> {
        self.account
            .keys()
            .iter()
            .enumerate()
            .map(|(index, key)| KeyInfo {
                index: index as u8,
                public_key: key.public_key,
                label: key.label().to_string(),
                registered_at: key.registered_at(),
            })
            .collect()
    }

    pub fn key_count(&self) -> usize {
        self.account.keys().len()
    }

    /// Slot index of `public_key`, if registered
    pub fn key_index_of(&self, public_key: &[u8; 33]) -> Option<u8> {
        self.account.position_of(public_key).map(|i| i as u8)
    }
}
