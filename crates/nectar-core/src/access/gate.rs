//! ============================================================================
//! Whitelist Gate - the access decision engine
//! ============================================================================
//! Orchestrates one decision call: recover the signer, check the explicit
//! allow-list, resolve the chain, fetch balances for every bucket, then
//! evaluate the policy. Balance fetches for different buckets run
//! concurrently; their results are joined before evaluation so the
//! order-dependent short-circuit semantics stay strictly sequential.
//! ============================================================================

use futures::future::try_join_all;
use num_bigint::BigUint;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::evaluator::evaluate_policy;
use super::oracle::{BalanceOracle, Network};
use super::policy::PolicyRequirement;
use super::recover::recover_signer;
use crate::types::{Address, GateError, Signature};

/// Access decision engine over an injected balance oracle.
///
/// Holds no mutable state; one instance serves any number of concurrent
/// decision calls.
pub struct WhitelistGate {
    oracle: Arc<dyn BalanceOracle>,
}

impl WhitelistGate {
    pub fn new(oracle: Arc<dyn BalanceOracle>) -> Self {
        Self { oracle }
    }

    /// Decide whether the signer of `sign_message` is authorized under
    /// `policy` on the given chain. Returns the recovered signer address
    /// on admission; every denial is a `GateError`, never a partial
    /// result.
    ///
    /// A non-empty `allow_list` must contain the recovered address
    /// (case-insensitively) or the call stops with `AccessDenied` before
    /// any balance lookup. An absent or empty list skips that check.
    pub async fn evaluate(
        &self,
        sign_message: &str,
        signature: &Signature,
        policy: &PolicyRequirement,
        chain_id: u64,
        allow_list: Option<&[Address]>,
    ) -> Result<Address, GateError> {
        let signer = recover_signer(sign_message, signature)?;

        if let Some(list) = allow_list {
            if !list.is_empty() && !list.contains(&signer) {
                warn!("Signer {} not on the explicit allow-list", signer);
                return Err(GateError::AccessDenied { address: signer });
            }
        }

        let network =
            Network::from_chain_id(chain_id).ok_or(GateError::UnsupportedChain(chain_id))?;

        // One fetch per bucket, dispatched concurrently; try_join_all
        // returns results in bucket order, which evaluation depends on.
        let signer_ref = &signer;
        let fetches = policy.buckets.iter().map(|bucket| {
            let contracts: Vec<Address> = bucket
                .requirement()
                .contracts
                .iter()
                .map(|c| c.address.clone())
                .collect();
            async move {
                self.oracle
                    .get_balances(network, signer_ref, &contracts)
                    .await
            }
        });
        let balances: Vec<HashMap<Address, BigUint>> = try_join_all(fetches).await?;

        evaluate_policy(policy, &balances)?;

        info!("Signer {} admitted on {}", signer, network);
        Ok(signer)
    }
}
