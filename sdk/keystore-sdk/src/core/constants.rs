use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;

// Default Program ID for Devnet/Testnet
pub const DEFAULT_PROGRAM_ID: Pubkey = pubkey!("Keystore11111111111111111111111111111111111");

/// Secp256r1 signature verification precompile
pub const SECP256R1_PROGRAM_ID: Pubkey = pubkey!("Secp256r1SigVerify1111111111111111111111111");

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8899";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_MAX_RETRIES: u32 = 60;
pub const DEFAULT_SIGNING_TIMEOUT_MS: u64 = 60_000;
