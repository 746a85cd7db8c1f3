//! Inbound swap event payload.

use serde::{Deserialize, Serialize};

/// A swap notification as delivered by the upstream webhook provider.
///
/// Only `walletAddress` is required for routing; everything else is carried
/// through to subscribers largely unmodified.  Provider payloads drift over
/// time, so unknown fields are collected into `extra` instead of being
/// rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapEvent {
    /// The wallet that performed the swap (raw provider form; normalize
    /// with [`Address::parse`](super::Address::parse) before routing).
    pub wallet_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_in_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_in: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_out: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Fields the current schema does not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerates_unknown_fields() {
        let json = r#"{
            "walletAddress": "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA1",
            "txHash": "0xdeadbeef",
            "amountInUsd": 5000.0,
            "tokenIn": "USDC",
            "tokenOut": "WETH",
            "slippageBps": 30,
            "dex": "uniswap-v3"
        }"#;
        let event: SwapEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.amount_in_usd, Some(5000.0));
        assert_eq!(event.extra.get("dex").and_then(|v| v.as_str()), Some("uniswap-v3"));

        // Unknown fields survive re-serialization.
        let out = serde_json::to_value(&event).unwrap();
        assert_eq!(out["slippageBps"], 30);
    }

    #[test]
    fn missing_wallet_address_is_an_error() {
        let json = r#"{"txHash": "0xdeadbeef"}"#;
        assert!(serde_json::from_str::<SwapEvent>(json).is_err());
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let json = r#"{"walletAddress": "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA1"}"#;
        let event: SwapEvent = serde_json::from_str(json).unwrap();
        assert!(event.tx_hash.is_none());
        assert!(event.amount_in_usd.is_none());
    }
}
