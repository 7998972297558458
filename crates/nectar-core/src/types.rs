//! ============================================================================
//! Core Types for Nectar
//! ============================================================================
//! Defines the shared value types (addresses, signatures, wallets) and the
//! error taxonomy for the whitelist decision engine. All values are immutable
//! and request-scoped; nothing here holds state between calls.
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::access::BucketKind;

/// A 20-byte account or contract address in canonical lowercase hex form.
///
/// Parsing accepts any mix of upper/lower hex and normalizes to lowercase,
/// so `Eq` and `Hash` give case-insensitive comparison everywhere an
/// address is used as a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse a `0x`-prefixed 40-hex-digit address, normalizing case.
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .ok_or_else(|| AddressError(text.to_string()))?;

        if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AddressError(text.to_string()));
        }

        Ok(Address(format!("0x{}", digits.to_ascii_lowercase())))
    }

    /// Build an address from raw bytes (e.g. the tail of a Keccak digest).
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Address(format!("0x{}", hex::encode(bytes)))
    }

    /// Canonical lowercase hex form, `0x`-prefixed.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> String {
        address.0
    }
}

/// Malformed address text.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid address: {0}")]
pub struct AddressError(String);

/// A recoverable ECDSA signature: recovery-id byte plus the r/s scalar pair.
/// Opaque outside the signature recoverer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub v: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl Signature {
    /// Parse the 65-byte RPC encoding: `0x` + r (32) + s (32) + v (1).
    pub fn from_rpc_hex(text: &str) -> Result<Self, GateError> {
        let digits = text.strip_prefix("0x").unwrap_or(text);
        let bytes = hex::decode(digits)
            .map_err(|e| GateError::Signature(format!("malformed signature hex: {e}")))?;

        if bytes.len() != 65 {
            return Err(GateError::Signature(format!(
                "expected 65 signature bytes, got {}",
                bytes.len()
            )));
        }

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);

        Ok(Signature { v: bytes[64], r, s })
    }

    /// Normalized recovery id: accepts 27/28 (RPC convention) or 0/1.
    pub(crate) fn recovery_id(&self) -> Result<u8, GateError> {
        match self.v {
            0 | 1 => Ok(self.v),
            27 | 28 => Ok(self.v - 27),
            other => Err(GateError::Signature(format!("invalid recovery id: {other}"))),
        }
    }
}

/// A freshly generated key pair with its derived address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub address: Address,
    pub private_key: String,
}

/// Error taxonomy for the whitelist decision engine.
///
/// Every variant is terminal for the current call; nothing is retried
/// internally. Retry policy, if any, belongs to the caller or to the
/// oracle's own transport.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum GateError {
    #[error("signature recovery failed: {0}")]
    Signature(String),

    #[error("address {address} is not whitelisted")]
    AccessDenied { address: Address },

    #[error("unsupported chain id: {0}")]
    UnsupportedChain(u64),

    #[error("oracle returned no balance for contract {contract} in {bucket} requirement")]
    InvalidContractAddress { bucket: BucketKind, contract: Address },

    #[error("conditions not met: {0}")]
    PolicyMismatch(String),

    #[error("balance oracle unavailable: {0}")]
    OracleUnavailable(String),
}
