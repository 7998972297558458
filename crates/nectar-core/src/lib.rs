//! ============================================================================
//! NECTAR-CORE: Token-gated storage SDK
//! ============================================================================
//! This crate handles all backend logic for the Nectar SDK:
//! - Whitelist decision engine: signature recovery + nested token policy
//!   evaluation against an injected balance oracle
//! - Content-addressed gateway client with an optional AES-256-GCM envelope
//! - Wallet key pair generation
//! ============================================================================

pub mod access;
pub mod storage;
pub mod types;
pub mod wallet;

// Re-export main types for convenience
pub use access::{AlchemyOracle, BalanceOracle, Network, PolicyRequirement, WhitelistGate};
pub use storage::StorageClient;
pub use types::*;
