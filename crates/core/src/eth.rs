//! Typed wrappers over the Ethereum JSON-RPC methods the client uses.

use crate::constants::{DEFAULT_RECEIPT_POLL_ATTEMPTS, DEFAULT_RECEIPT_POLL_MS};
use crate::error::{DappError, DappResult};
use crate::transport::Transport;
use healthchain_types::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How long to wait for a submitted transaction to be mined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReceiptPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ReceiptPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_RECEIPT_POLL_MS),
            max_attempts: DEFAULT_RECEIPT_POLL_ATTEMPTS,
        }
    }
}

/// A 32-byte transaction hash in `0x` hex form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TxHash(String);

impl TxHash {
    pub fn parse(input: &str) -> DappResult<Self> {
        let digits = input
            .strip_prefix("0x")
            .ok_or_else(|| DappError::InvalidResponse(format!("bad tx hash: {input}")))?;
        if digits.len() != 64 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DappError::InvalidResponse(format!("bad tx hash: {input}")));
        }
        Ok(Self(input.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transaction object for `eth_call` and `eth_sendTransaction`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    to: String,
    data: String,
}

impl CallRequest {
    pub fn new(from: Option<Address>, to: Address, data: &[u8]) -> Self {
        Self {
            from: from.map(|a| a.to_lower_hex()),
            to: to.to_lower_hex(),
            data: format!("0x{}", hex::encode(data)),
        }
    }
}

/// The fields of a transaction receipt the client inspects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub gas_used: Option<String>,
}

impl TransactionReceipt {
    /// Pre-Byzantium receipts carry no status and count as successful.
    pub fn succeeded(&self) -> bool {
        match self.status.as_deref() {
            Some(status) => U256::from_hex_str(status).map(|s| !s.is_zero()).unwrap_or(false),
            None => true,
        }
    }

    pub fn block_number(&self) -> Option<U256> {
        self.block_number
            .as_deref()
            .and_then(|n| U256::from_hex_str(n).ok())
    }
}

/// Ethereum JSON-RPC client over a [`Transport`].
#[derive(Clone)]
pub struct EthClient {
    transport: Arc<dyn Transport>,
}

impl EthClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// `eth_requestAccounts`: asks the wallet to expose its accounts, prompting the user if needed.
    pub async fn request_accounts(&self) -> DappResult<Vec<Address>> {
        let value = self.transport.request("eth_requestAccounts", json!([])).await?;
        parse_accounts(value)
    }

    /// `eth_accounts`: accounts the provider already exposes, without prompting.
    pub async fn accounts(&self) -> DappResult<Vec<Address>> {
        let value = self.transport.request("eth_accounts", json!([])).await?;
        parse_accounts(value)
    }

    /// `eth_call` against the latest block, returning raw return data.
    pub async fn call(&self, request: &CallRequest) -> DappResult<Vec<u8>> {
        let value = self
            .transport
            .request("eth_call", json!([request, "latest"]))
            .await?;
        let text = value
            .as_str()
            .ok_or_else(|| DappError::InvalidResponse(format!("eth_call returned {value}")))?;
        decode_hex_data(text)
    }

    /// `eth_sendTransaction`: the wallet signs and broadcasts, returning the hash.
    pub async fn send_transaction(&self, request: &CallRequest) -> DappResult<TxHash> {
        let value = self
            .transport
            .request("eth_sendTransaction", json!([request]))
            .await?;
        let text = value.as_str().ok_or_else(|| {
            DappError::InvalidResponse(format!("eth_sendTransaction returned {value}"))
        })?;
        TxHash::parse(text)
    }

    /// `eth_getTransactionReceipt`; `None` while the transaction is pending.
    pub async fn transaction_receipt(&self, hash: &TxHash) -> DappResult<Option<TransactionReceipt>> {
        let value = self
            .transport
            .request("eth_getTransactionReceipt", json!([hash.as_str()]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| DappError::InvalidResponse(format!("bad receipt: {e}")))
    }

    /// Polls for the receipt of `hash` until it is mined or `policy` runs out.
    ///
    /// # Errors
    ///
    /// - [`DappError::TransactionFailed`] if the receipt reports a failed status
    /// - [`DappError::ReceiptTimeout`] if no receipt appeared within the policy's attempts
    pub async fn wait_for_receipt(
        &self,
        hash: &TxHash,
        policy: ReceiptPolicy,
    ) -> DappResult<TransactionReceipt> {
        for attempt in 1..=policy.max_attempts {
            if let Some(receipt) = self.transaction_receipt(hash).await? {
                if !receipt.succeeded() {
                    return Err(DappError::TransactionFailed(hash.to_string()));
                }
                tracing::debug!(%hash, attempt, "transaction mined");
                return Ok(receipt);
            }
            if attempt < policy.max_attempts {
                tokio::time::sleep(policy.interval).await;
            }
        }

        Err(DappError::ReceiptTimeout {
            tx_hash: hash.to_string(),
            attempts: policy.max_attempts,
        })
    }
}

fn parse_accounts(value: Value) -> DappResult<Vec<Address>> {
    let items: Vec<String> = serde_json::from_value(value)
        .map_err(|e| DappError::InvalidResponse(format!("bad account list: {e}")))?;
    items
        .iter()
        .map(|s| Address::parse(s).map_err(DappError::from))
        .collect()
}

fn decode_hex_data(text: &str) -> DappResult<Vec<u8>> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|e| DappError::InvalidResponse(format!("bad hex data: {e}")))
}
