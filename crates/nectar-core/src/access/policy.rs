//! ============================================================================
//! Policy Model - Nested token-holding requirements
//! ============================================================================
//! Defines the requirement tree the decision engine evaluates: per-contract
//! conditions, per-bucket token requirements, and the top-level policy.
//! Bucket kinds are a closed enum so evaluators are exhaustive and cannot
//! silently skip an unrecognized kind.
//! ============================================================================

use num_bigint::{BigUint, ParseBigIntError};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Address;

/// Comparison operator applied to one balance/threshold pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    Gt,
    Lt,
    Eq,
    Gte,
    Lte,
}

/// AND/OR combinator for one aggregation level. Defaults to OR when a
/// requirement leaves it unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Conjunction {
    #[serde(rename = "&&")]
    And,
    #[default]
    #[serde(rename = "||")]
    Or,
}

/// One comparator plus its threshold. The threshold arrives as decimal
/// text and is parsed into a big integer up front; on-chain balances
/// routinely exceed 64 bits, so comparisons are never truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub comparator: Comparator,
    #[serde(with = "decimal")]
    pub value: BigUint,
}

impl Condition {
    /// Build a condition from decimal threshold text. Malformed text is a
    /// construction-time error, never an evaluation-time one.
    pub fn new(comparator: Comparator, value: &str) -> Result<Self, ParseBigIntError> {
        Ok(Self {
            comparator,
            value: value.parse()?,
        })
    }

    /// Exact arbitrary-precision comparison of one balance against the
    /// threshold. Pure; no failure modes.
    pub fn holds(&self, balance: &BigUint) -> bool {
        match self.comparator {
            Comparator::Gt => balance > &self.value,
            Comparator::Lt => balance < &self.value,
            Comparator::Eq => balance == &self.value,
            Comparator::Gte => balance >= &self.value,
            Comparator::Lte => balance <= &self.value,
        }
    }
}

/// A contract address with exactly one condition on the signer's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRequirement {
    pub address: Address,
    pub conditions: Condition,
}

/// Ordered contract requirements for one token bucket, with an optional
/// conjunction (OR when unspecified).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequirement {
    pub contracts: Vec<ContractRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conjunction: Option<Conjunction>,
}

/// Discriminant for a token-type bucket, used in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketKind {
    Erc20,
    Erc721,
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKind::Erc20 => f.write_str("erc20"),
            BucketKind::Erc721 => f.write_str("erc721"),
        }
    }
}

/// A token-type bucket carrying its requirement. Closed set of kinds:
/// fungible (ERC-20) and non-fungible (ERC-721).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBucket {
    Erc20(TokenRequirement),
    Erc721(TokenRequirement),
}

impl TokenBucket {
    pub fn kind(&self) -> BucketKind {
        match self {
            TokenBucket::Erc20(_) => BucketKind::Erc20,
            TokenBucket::Erc721(_) => BucketKind::Erc721,
        }
    }

    pub fn requirement(&self) -> &TokenRequirement {
        match self {
            TokenBucket::Erc20(req) | TokenBucket::Erc721(req) => req,
        }
    }
}

/// The full policy: ordered token-type buckets plus an optional top-level
/// conjunction (OR when unspecified). Declared order is evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRequirement {
    pub buckets: Vec<TokenBucket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conjunction: Option<Conjunction>,
}

/// Serde helper: big integers as decimal strings on the wire.
mod decimal {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse()
            .map_err(|_| de::Error::custom(format!("invalid decimal threshold: {text}")))
    }
}
