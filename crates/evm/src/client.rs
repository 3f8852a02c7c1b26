//! HTTP JSON-RPC client for an EVM node.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Value, json};
use tracing::{debug, instrument, trace};

use custodia_core::error::{ChainError, ChainResult};
use custodia_core::models::{Address, TxHash};

/// Configuration for the RPC client.
#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    /// HTTP URL (e.g., "http://localhost:8545").
    pub http_url: String,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            http_url: "http://127.0.0.1:8545".to_string(),
        }
    }
}

/// Outcome of an `eth_call`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The call returned data (possibly empty).
    Data(Vec<u8>),
    /// The call reverted on-chain.
    Reverted,
}

/// A raw log entry as returned by `eth_getLogs`.
#[derive(Debug, Clone)]
pub struct RawLog {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics; `topics[0]` is the event signature hash.
    pub topics: Vec<[u8; 32]>,
    /// Unindexed payload.
    pub data: Vec<u8>,
    pub block_number: u64,
    pub tx_hash: TxHash,
    pub log_index: u32,
}

/// JSON-RPC client over HTTP.
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a client for the given node.
    pub fn new(config: RpcClientConfig) -> ChainResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ChainError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            http,
            url: config.http_url,
            next_id: AtomicU64::new(1),
        })
    }

    /// Issue one JSON-RPC request and return the raw `result` value.
    async fn request(&self, method: &str, params: Value) -> ChainResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        trace!(method, id, "RPC request");
        let response: Value = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::ConnectionFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| ChainError::RpcError(e.to_string()))?;

        if let Some(error) = response.get("error") {
            return Err(ChainError::RpcError(format!("{method}: {error}")));
        }
        response
            .get("result")
            .cloned()
            .ok_or_else(|| ChainError::RpcError(format!("{method}: missing result")))
    }

    /// Current head block number.
    pub async fn block_number(&self) -> ChainResult<u64> {
        let result = self.request("eth_blockNumber", json!([])).await?;
        parse_quantity(&result, "eth_blockNumber")
    }

    /// Read-only contract call against the latest block.
    ///
    /// An on-chain revert is a normal outcome and maps to
    /// [`CallOutcome::Reverted`]; only transport faults are errors.
    #[instrument(skip(self, data), fields(to = %to))]
    pub async fn call(&self, to: &Address, data: &[u8]) -> ChainResult<CallOutcome> {
        let params = json!([
            { "to": to.to_hex(), "data": format!("0x{}", hex::encode(data)) },
            "latest",
        ]);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "eth_call",
            "params": params,
        });

        let response: Value = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::ConnectionFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| ChainError::RpcError(e.to_string()))?;

        if let Some(error) = response.get("error") {
            if is_revert(error) {
                debug!(to = %to, "eth_call reverted");
                return Ok(CallOutcome::Reverted);
            }
            return Err(ChainError::RpcError(format!("eth_call: {error}")));
        }

        let result = response
            .get("result")
            .and_then(Value::as_str)
            .ok_or_else(|| ChainError::RpcError("eth_call: missing result".to_string()))?;
        let bytes = hex::decode(result.strip_prefix("0x").unwrap_or(result))
            .map_err(|e| ChainError::RpcError(format!("eth_call: bad hex: {e}")))?;
        Ok(CallOutcome::Data(bytes))
    }

    /// Fetch logs matching any of the given topic-0 hashes in an
    /// inclusive block range.
    pub async fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
        topic0: &[[u8; 32]],
    ) -> ChainResult<Vec<RawLog>> {
        let topics: Vec<String> = topic0
            .iter()
            .map(|t| format!("0x{}", hex::encode(t)))
            .collect();
        let params = json!([{
            "fromBlock": format!("{from_block:#x}"),
            "toBlock": format!("{to_block:#x}"),
            "topics": [topics],
        }]);

        let result = self.request("eth_getLogs", params).await?;
        let entries = result
            .as_array()
            .ok_or_else(|| ChainError::RpcError("eth_getLogs: result not an array".to_string()))?;

        entries.iter().map(parse_log).collect()
    }
}

/// Whether a JSON-RPC error object represents an on-chain revert.
///
/// Geth reports reverts with code 3; other nodes only put "revert" in
/// the message.
fn is_revert(error: &Value) -> bool {
    if error.get("code").and_then(Value::as_i64) == Some(3) {
        return true;
    }
    error
        .get("message")
        .and_then(Value::as_str)
        .is_some_and(|m| m.to_ascii_lowercase().contains("revert"))
}

/// Parse a 0x-prefixed quantity into a u64.
fn parse_quantity(value: &Value, context: &str) -> ChainResult<u64> {
    let s = value
        .as_str()
        .ok_or_else(|| ChainError::RpcError(format!("{context}: quantity not a string")))?;
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16)
        .map_err(|e| ChainError::RpcError(format!("{context}: bad quantity: {e}")))
}

/// Parse one log entry from an `eth_getLogs` response.
fn parse_log(entry: &Value) -> ChainResult<RawLog> {
    let address = entry
        .get("address")
        .and_then(Value::as_str)
        .and_then(|s| Address::from_hex(s).ok())
        .ok_or_else(|| ChainError::LogDecodeError("log without address".to_string()))?;

    let topics = entry
        .get("topics")
        .and_then(Value::as_array)
        .ok_or_else(|| ChainError::LogDecodeError("log without topics".to_string()))?
        .iter()
        .map(|t| {
            t.as_str()
                .and_then(|s| TxHash::from_hex(s).ok())
                .map(|h| h.0)
                .ok_or_else(|| ChainError::LogDecodeError("malformed topic".to_string()))
        })
        .collect::<ChainResult<Vec<[u8; 32]>>>()?;

    let data = entry
        .get("data")
        .and_then(Value::as_str)
        .map(|s| hex::decode(s.strip_prefix("0x").unwrap_or(s)))
        .transpose()
        .map_err(|e| ChainError::LogDecodeError(format!("bad log data: {e}")))?
        .unwrap_or_default();

    let block_number = parse_quantity(
        entry
            .get("blockNumber")
            .unwrap_or(&Value::Null),
        "log.blockNumber",
    )?;
    let log_index = parse_quantity(entry.get("logIndex").unwrap_or(&Value::Null), "log.logIndex")?
        as u32;

    let tx_hash = entry
        .get("transactionHash")
        .and_then(Value::as_str)
        .and_then(|s| TxHash::from_hex(s).ok())
        .ok_or_else(|| ChainError::LogDecodeError("log without transaction hash".to_string()))?;

    Ok(RawLog {
        address,
        topics,
        data,
        block_number,
        tx_hash,
        log_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn revert_detection_by_code_and_message() {
        assert!(is_revert(&json!({"code": 3, "message": "execution reverted"})));
        assert!(is_revert(&json!({"code": -32000, "message": "execution reverted: x"})));
        assert!(!is_revert(&json!({"code": -32601, "message": "method not found"})));
    }

    #[test]
    fn quantity_parsing() {
        assert_eq!(parse_quantity(&json!("0x10"), "t").unwrap(), 16);
        assert_eq!(parse_quantity(&json!("0x0"), "t").unwrap(), 0);
        assert!(parse_quantity(&json!(16), "t").is_err());
    }

    #[test]
    fn log_parsing_extracts_all_fields() {
        let entry = json!({
            "address": format!("0x{}", "aa".repeat(20)),
            "topics": [format!("0x{}", "11".repeat(32))],
            "data": "0x00ff",
            "blockNumber": "0x64",
            "logIndex": "0x2",
            "transactionHash": format!("0x{}", "22".repeat(32)),
        });

        let log = parse_log(&entry).unwrap();
        assert_eq!(log.address, Address([0xaa; 20]));
        assert_eq!(log.topics.len(), 1);
        assert_eq!(log.data, vec![0x00, 0xff]);
        assert_eq!(log.block_number, 100);
        assert_eq!(log.log_index, 2);
    }

    // Test critique: un log sans hash de transaction est rejeté, pas paniqué
    #[test]
    fn log_parsing_rejects_malformed_entry() {
        let entry = json!({
            "address": format!("0x{}", "aa".repeat(20)),
            "topics": [],
            "data": "0x",
            "blockNumber": "0x64",
            "logIndex": "0x0",
        });
        assert!(parse_log(&entry).is_err());
    }
}
