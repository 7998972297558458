//! ============================================================================
//! Balance Oracle - on-chain balance retrieval capability
//! ============================================================================
//! The decision engine consumes balances through the `BalanceOracle` trait
//! so it can be driven by deterministic stubs in tests. The production
//! implementation speaks JSON-RPC to an Alchemy-style endpoint.
//! ============================================================================

use async_trait::async_trait;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::types::{Address, GateError};

/// Networks the chain registry knows how to resolve. An unrecognized
/// chain id is rejected before any oracle call is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    EthMainnet,
    EthSepolia,
    PolygonMainnet,
    PolygonAmoy,
    ArbMainnet,
    OptMainnet,
    BaseMainnet,
}

impl Network {
    /// Resolve a numeric chain id to a known network.
    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            1 => Some(Network::EthMainnet),
            11155111 => Some(Network::EthSepolia),
            137 => Some(Network::PolygonMainnet),
            80002 => Some(Network::PolygonAmoy),
            42161 => Some(Network::ArbMainnet),
            10 => Some(Network::OptMainnet),
            8453 => Some(Network::BaseMainnet),
            _ => None,
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::EthMainnet => 1,
            Network::EthSepolia => 11155111,
            Network::PolygonMainnet => 137,
            Network::PolygonAmoy => 80002,
            Network::ArbMainnet => 42161,
            Network::OptMainnet => 10,
            Network::BaseMainnet => 8453,
        }
    }

    /// Endpoint subdomain for the hosted JSON-RPC gateway.
    pub fn subdomain(&self) -> &'static str {
        match self {
            Network::EthMainnet => "eth-mainnet",
            Network::EthSepolia => "eth-sepolia",
            Network::PolygonMainnet => "polygon-mainnet",
            Network::PolygonAmoy => "polygon-amoy",
            Network::ArbMainnet => "arb-mainnet",
            Network::OptMainnet => "opt-mainnet",
            Network::BaseMainnet => "base-mainnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subdomain())
    }
}

/// Read-only capability supplying current token balances for one owner.
///
/// Calls for different buckets are independent and may run concurrently;
/// transport failures surface as `OracleUnavailable` and fail the whole
/// decision. Timeout/retry policy lives in the implementation, not here.
#[async_trait]
pub trait BalanceOracle: Send + Sync {
    async fn get_balances(
        &self,
        network: Network,
        owner: &Address,
        contracts: &[Address],
    ) -> Result<HashMap<Address, BigUint>, GateError>;
}

/// Balance oracle backed by Alchemy's `alchemy_getTokenBalances` endpoint.
pub struct AlchemyOracle {
    client: reqwest::Client,
    api_key: String,
}

impl AlchemyOracle {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u32,
    method: &'static str,
    params: (&'a str, Vec<&'a str>),
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<TokenBalancesResult>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct TokenBalancesResult {
    #[serde(rename = "tokenBalances")]
    token_balances: Vec<TokenBalanceEntry>,
}

#[derive(Deserialize)]
struct TokenBalanceEntry {
    #[serde(rename = "contractAddress")]
    contract_address: String,
    #[serde(rename = "tokenBalance")]
    token_balance: Option<String>,
}

#[async_trait]
impl BalanceOracle for AlchemyOracle {
    async fn get_balances(
        &self,
        network: Network,
        owner: &Address,
        contracts: &[Address],
    ) -> Result<HashMap<Address, BigUint>, GateError> {
        let url = format!("https://{}.g.alchemy.com/v2/{}", network.subdomain(), self.api_key);
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "alchemy_getTokenBalances",
            params: (
                owner.as_str(),
                contracts.iter().map(Address::as_str).collect(),
            ),
        };

        debug!(
            "Fetching balances for {} across {} contracts on {}",
            owner,
            contracts.len(),
            network
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GateError::OracleUnavailable(format!("balance request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(GateError::OracleUnavailable(format!(
                "balance endpoint returned {}",
                response.status()
            )));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| GateError::OracleUnavailable(format!("malformed balance response: {e}")))?;

        if let Some(error) = body.error {
            return Err(GateError::OracleUnavailable(error.message));
        }
        let result = body
            .result
            .ok_or_else(|| GateError::OracleUnavailable("empty balance response".into()))?;

        let mut balances = HashMap::with_capacity(result.token_balances.len());
        for entry in result.token_balances {
            let contract = Address::parse(&entry.contract_address).map_err(|e| {
                GateError::OracleUnavailable(format!("malformed contract address from oracle: {e}"))
            })?;
            balances.insert(contract, parse_hex_word(entry.token_balance.as_deref())?);
        }

        Ok(balances)
    }
}

/// Parse a hex balance word into a big integer. A missing or empty word
/// means the owner never held the token and counts as zero. Parsing goes
/// straight to `BigUint` - 256-bit balance words do not fit any float or
/// fixed-width path.
fn parse_hex_word(word: Option<&str>) -> Result<BigUint, GateError> {
    let Some(word) = word else {
        return Ok(BigUint::from(0u8));
    };
    let digits = word.strip_prefix("0x").unwrap_or(word);
    if digits.is_empty() {
        return Ok(BigUint::from(0u8));
    }
    BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| GateError::OracleUnavailable(format!("malformed balance word: {word}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_resolution() {
        assert_eq!(Network::from_chain_id(1), Some(Network::EthMainnet));
        assert_eq!(Network::from_chain_id(137), Some(Network::PolygonMainnet));
        assert_eq!(Network::from_chain_id(8453), Some(Network::BaseMainnet));
        assert_eq!(Network::from_chain_id(999_999), None);
    }

    #[test]
    fn test_chain_id_round_trip() {
        for chain_id in [1u64, 11155111, 137, 80002, 42161, 10, 8453] {
            let network = Network::from_chain_id(chain_id).unwrap();
            assert_eq!(network.chain_id(), chain_id);
        }
    }

    #[test]
    fn test_parse_hex_word_zero_and_missing() {
        assert_eq!(parse_hex_word(None).unwrap(), BigUint::from(0u8));
        assert_eq!(parse_hex_word(Some("0x")).unwrap(), BigUint::from(0u8));
        assert_eq!(parse_hex_word(Some("0x0")).unwrap(), BigUint::from(0u8));
    }

    #[test]
    fn test_parse_hex_word_full_256_bit_word() {
        // 32-byte word as returned by the RPC; exceeds u64 by far
        let word = "0x0000000000000000000000000000000100000000000000000000000000000000";
        let expected: BigUint = "340282366920938463463374607431768211456".parse().unwrap();
        assert_eq!(parse_hex_word(Some(word)).unwrap(), expected);
    }

    #[test]
    fn test_parse_hex_word_rejects_garbage() {
        assert!(matches!(
            parse_hex_word(Some("0xnothex")),
            Err(GateError::OracleUnavailable(_))
        ));
    }

    #[test]
    fn test_rpc_request_shape() {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "alchemy_getTokenBalances",
            params: ("0xowner", vec!["0xa", "0xb"]),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["method"], "alchemy_getTokenBalances");
        assert_eq!(json["params"][0], "0xowner");
        assert_eq!(json["params"][1][1], "0xb");
    }
}
