//! Constants used throughout the HealthChain core crate.
//!
//! Environment variable names and defaults live here so the binaries and the config parser agree.

/// Wallet / JSON-RPC endpoint. Unset or empty means no wallet provider is available.
pub const RPC_URL_ENV: &str = "HEALTHCHAIN_RPC_URL";

/// Address of the deployed `HealthcareRecords` contract.
pub const CONTRACT_ADDRESS_ENV: &str = "HEALTHCHAIN_CONTRACT_ADDRESS";

/// Milliseconds between `eth_getTransactionReceipt` polls.
pub const RECEIPT_POLL_MS_ENV: &str = "HEALTHCHAIN_RECEIPT_POLL_MS";

/// Number of receipt polls before giving up on a submitted transaction.
pub const RECEIPT_POLL_ATTEMPTS_ENV: &str = "HEALTHCHAIN_RECEIPT_POLL_ATTEMPTS";

/// Bind address of the REST server.
pub const REST_ADDR_ENV: &str = "HEALTHCHAIN_REST_ADDR";

pub const DEFAULT_REST_ADDR: &str = "127.0.0.1:3000";

pub const DEFAULT_RECEIPT_POLL_MS: u64 = 1_000;

/// 750 one-second polls, the same window web3 clients wait for a receipt.
pub const DEFAULT_RECEIPT_POLL_ATTEMPTS: u32 = 750;

/// Maximum number of notices the dashboard keeps; older ones are dropped.
pub const MAX_NOTICES: usize = 20;

/// EIP-1193 "user rejected the request".
pub const USER_REJECTED_CODE: i64 = 4001;

/// JSON-RPC "method not found".
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;

/// Geth-style "execution reverted".
pub const EXECUTION_REVERTED_CODE: i64 = 3;
