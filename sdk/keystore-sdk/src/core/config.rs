use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;

use crate::core::constants::{
    DEFAULT_MAX_RETRIES, DEFAULT_POLL_INTERVAL_MS, DEFAULT_PROGRAM_ID, DEFAULT_RPC_URL,
    DEFAULT_SIGNING_TIMEOUT_MS,
};
use crate::error::{KeystoreSdkError, Result};

/// Confirmation polling bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub poll_interval_ms: u64,
    pub max_retries: u32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ConfirmationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// SDK configuration.
///
/// Missing JSON fields fall back to defaults. Environment variables
/// `KEYSTORE_RPC_URL`, `KEYSTORE_PROGRAM_ID`, `KEYSTORE_COMMITMENT`,
/// `KEYSTORE_POLL_INTERVAL_MS`, `KEYSTORE_MAX_RETRIES` and
/// `KEYSTORE_SIGNING_TIMEOUT_MS` override individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    pub rpc_url: String,
    /// Base58 program address
    pub program_id: String,
    /// `processed`, `confirmed` or `finalized`
    pub commitment: String,
    pub signing_timeout_ms: u64,
    pub confirmation: ConfirmationConfig,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            program_id: DEFAULT_PROGRAM_ID.to_string(),
            commitment: "confirmed".to_string(),
            signing_timeout_ms: DEFAULT_SIGNING_TIMEOUT_MS,
            confirmation: ConfirmationConfig::default(),
        }
    }
}

impl SdkConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| KeystoreSdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            KeystoreSdkError::Config(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Defaults overridden by `KEYSTORE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides looked up by variable name.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup("KEYSTORE_RPC_URL") {
            self.rpc_url = url;
        }
        if let Some(program_id) = lookup("KEYSTORE_PROGRAM_ID") {
            self.program_id = program_id;
        }
        if let Some(commitment) = lookup("KEYSTORE_COMMITMENT") {
            self.commitment = commitment;
        }
        if let Some(value) = lookup("KEYSTORE_POLL_INTERVAL_MS") {
            self.confirmation.poll_interval_ms = parse_number("KEYSTORE_POLL_INTERVAL_MS", &value)?;
        }
        if let Some(value) = lookup("KEYSTORE_MAX_RETRIES") {
            self.confirmation.max_retries = parse_number("KEYSTORE_MAX_RETRIES", &value)?;
        }
        if let Some(value) = lookup("KEYSTORE_SIGNING_TIMEOUT_MS") {
            self.signing_timeout_ms = parse_number("KEYSTORE_SIGNING_TIMEOUT_MS", &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.program_id()?;
        self.commitment()?;
        if self.confirmation.max_retries == 0 {
            return Err(KeystoreSdkError::Config(
                "confirmation.max_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn program_id(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.program_id)
            .map_err(|e| KeystoreSdkError::Config(format!("program_id {}: {e}", self.program_id)))
    }

    pub fn commitment(&self) -> Result<CommitmentConfig> {
        match self.commitment.as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            other => Err(KeystoreSdkError::Config(format!("unknown commitment {other}"))),
        }
    }

    pub fn signing_timeout(&self) -> Duration {
        Duration::from_millis(self.signing_timeout_ms)
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| KeystoreSdkError::Config(format!("{name}={value}: {e}")))
}
