//! ============================================================================
//! Access Module - Token-gated whitelist decisions
//! ============================================================================
//! Decides whether the signer of a message is authorized under a nested
//! token-holding policy:
//!
//! 1. Recover the signer address from a personal-sign signature
//! 2. Check the explicit allow-list, if one was supplied
//! 3. Fetch balances per token-type bucket through the balance oracle
//! 4. Evaluate per-contract conditions and per-bucket conjunctions
//!
//! ## Usage
//! ```rust,ignore
//! use nectar_core::access::{AlchemyOracle, WhitelistGate};
//!
//! let gate = WhitelistGate::new(Arc::new(AlchemyOracle::new(api_key)));
//! let signer = gate.evaluate(message, &signature, &policy, 1, None).await?;
//! ```
//! ============================================================================

mod evaluator;
mod gate;
mod oracle;
mod policy;
mod recover;

// Re-export public types
pub use evaluator::{evaluate_policy, evaluate_token, BucketVerdict};
pub use gate::WhitelistGate;
pub use oracle::{AlchemyOracle, BalanceOracle, Network};
pub use policy::{
    BucketKind, Comparator, Condition, Conjunction, ContractRequirement, PolicyRequirement,
    TokenBucket, TokenRequirement,
};
pub use recover::{personal_sign_digest, recover_signer};

pub(crate) use recover::address_of;
