pub mod advanced;
pub mod assertion;
pub mod basic;
pub mod core;
pub mod error;
pub mod types;
pub mod utils;

pub use crate::assertion::{adapt_assertion, AdaptedAssertion, PasskeyAssertion};
pub use crate::basic::batch::{
    assemble_batch, assemble_webauthn_batch, build_authorization, Approval, InstructionBatch,
    WebAuthnApproval,
};
pub use crate::basic::orchestrator::Orchestrator;
pub use crate::basic::wallet::PasskeyWallet;
pub use crate::core::config::{ConfirmationConfig, SdkConfig};
pub use crate::core::connection::{LedgerConnection, LedgerError, RpcLedger};
pub use crate::core::signer::{PasskeySigner, SignerError};
pub use crate::error::{ErrorClass, KeystoreSdkError, Result};
pub use crate::types::{IdentityInfo, KeyInfo};
pub use crate::utils::{derive_identity_pda, derive_vault_pda, fetch_identity, parse_identity};

pub mod state {
    pub use keystore_state::{
        decode_message, encode_message, message_challenge, Action, IdentityAccount, KeystoreError,
        RegisteredKey, SignatureAttestation, WebAuthnAttestation,
    };
}
