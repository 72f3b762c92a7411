//! # HealthChain ABI
//!
//! Contract interface handling for the HealthChain client:
//! - [`document`]: the JSON ABI description and resolved [`Function`] entries
//! - [`codec`]: Solidity ABI encoding and decoding of call data and return data
//! - [`healthcare`]: the embedded `HealthcareRecords` ABI and its function names
//!
//! Only the types the `HealthcareRecords` contract uses are supported: `uint256`, `address`,
//! `string`, tuples and dynamic arrays of those.

pub mod codec;
pub mod document;
pub mod healthcare;

pub use codec::{decode, encode, ParamType, Token};
pub use document::{Abi, AbiEntry, EntryKind, Function, Param, StateMutability};
pub use healthcare::{healthcare_records_abi, HEALTHCARE_RECORDS_ABI};

/// Errors raised while reading an ABI document or encoding/decoding ABI data.
#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    #[error("failed to parse ABI JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported ABI type: {0}")]
    UnsupportedType(String),
    #[error("function not found in ABI: {0}")]
    UnknownFunction(String),
    #[error("function {function} has signature {found}, expected {expected}")]
    SignatureMismatch {
        function: String,
        expected: String,
        found: String,
    },
    #[error("function {function} expects {expected} arguments, got {got}")]
    ArgumentCount {
        function: String,
        expected: usize,
        got: usize,
    },
    #[error("argument {index} of {function} does not match type {expected}")]
    ArgumentType {
        function: String,
        index: usize,
        expected: String,
    },
    #[error("ABI data too short: need {needed} bytes at offset {offset}, have {len}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        len: usize,
    },
    #[error("ABI offset or length does not fit in memory")]
    OffsetOverflow,
    #[error("ABI string is not valid UTF-8")]
    InvalidUtf8,
    #[error("ABI address word has non-zero padding")]
    InvalidAddressPadding,
}

pub type AbiResult<T> = std::result::Result<T, AbiError>;
