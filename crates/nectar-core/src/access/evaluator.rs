//! ============================================================================
//! Policy Evaluator - nested conjunction evaluation with short-circuits
//! ============================================================================
//! Two-level evaluation of a token-holding policy against pre-fetched
//! balances. Each bucket steps through
//!
//!   Evaluating -> ShortCircuitFail | BucketRecorded
//!
//! and the recorded bucket verdicts then pass through
//!
//!   Aggregate -> Admit | Deny
//!
//! `ShortCircuitFail` is an `Err` return: it aborts the entire decision,
//! skipping every remaining contract and bucket. `BucketRecorded` is an
//! `Ok(BucketVerdict)`.
//!
//! The short-circuit rules are asymmetric on purpose:
//! - A failing condition in a single-contract requirement short-circuits
//!   regardless of the declared conjunction.
//! - A failing condition under a bucket-level AND short-circuits the whole
//!   decision, even when the top-level conjunction is OR.
//! - A bucket left unsatisfied (multi-contract OR, all false) only becomes
//!   fatal mid-loop when the policy has several buckets combined with a
//!   top-level AND; otherwise it is recorded and evaluation continues.
//! ============================================================================

use num_bigint::BigUint;
use std::collections::HashMap;
use tracing::debug;

use crate::access::policy::{BucketKind, Conjunction, PolicyRequirement, TokenRequirement};
use crate::types::{Address, GateError};

/// Recorded outcome of one token bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketVerdict {
    Satisfied,
    Unsatisfied,
}

/// Evaluate one token requirement against the balances fetched for its
/// contracts.
///
/// Contracts are checked strictly in declared order. A balance entry
/// missing for any contract is a data-integrity error
/// (`InvalidContractAddress`), not a silent "unsatisfied" - but a
/// short-circuit earlier in the loop still wins, so contracts after an
/// aborting failure are never looked up.
pub fn evaluate_token(
    kind: BucketKind,
    requirement: &TokenRequirement,
    balances: &HashMap<Address, BigUint>,
) -> Result<BucketVerdict, GateError> {
    let single = requirement.contracts.len() < 2;
    let conjunction = requirement.conjunction.unwrap_or_default();
    let mut satisfied = 0usize;

    for contract in &requirement.contracts {
        let balance = balances.get(&contract.address).ok_or_else(|| {
            GateError::InvalidContractAddress {
                bucket: kind,
                contract: contract.address.clone(),
            }
        })?;

        let pass = contract.conditions.holds(balance);
        debug!(
            "{} contract {}: balance {} {:?} {} -> {}",
            kind, contract.address, balance, contract.conditions.comparator,
            contract.conditions.value, pass
        );

        if !pass && (single || conjunction == Conjunction::And) {
            return Err(GateError::PolicyMismatch(format!(
                "{} contract {} does not meet its condition",
                kind, contract.address
            )));
        }
        if pass {
            satisfied += 1;
        }
    }

    Ok(if satisfied > 0 {
        BucketVerdict::Satisfied
    } else {
        BucketVerdict::Unsatisfied
    })
}

/// Evaluate the whole policy. `balances` carries one pre-fetched balance
/// map per bucket, in the policy's declared bucket order.
///
/// Top-level AND semantics: a multi-bucket policy under AND admits only
/// when every bucket is satisfied, and an unsatisfied bucket aborts
/// immediately. (The behavior this replaces rejected such policies even
/// when every bucket passed; the fix is pinned by
/// `test_top_and_all_satisfied_admits`.)
pub fn evaluate_policy(
    policy: &PolicyRequirement,
    balances: &[HashMap<Address, BigUint>],
) -> Result<(), GateError> {
    let single_type = policy.buckets.len() < 2;
    let top = policy.conjunction.unwrap_or_default();
    let mut satisfied = 0usize;

    for (bucket, bucket_balances) in policy.buckets.iter().zip(balances) {
        match evaluate_token(bucket.kind(), bucket.requirement(), bucket_balances)? {
            BucketVerdict::Satisfied => satisfied += 1,
            BucketVerdict::Unsatisfied => {
                if !single_type && top == Conjunction::And {
                    return Err(GateError::PolicyMismatch(format!(
                        "{} requirement not satisfied",
                        bucket.kind()
                    )));
                }
                debug!("{} requirement not satisfied, continuing", bucket.kind());
            }
        }
    }

    if satisfied == 0 {
        return Err(GateError::PolicyMismatch(
            "no token requirement satisfied".into(),
        ));
    }
    if !single_type && top == Conjunction::And && satisfied < policy.buckets.len() {
        return Err(GateError::PolicyMismatch(
            "not all token requirements satisfied".into(),
        ));
    }

    Ok(())
}
