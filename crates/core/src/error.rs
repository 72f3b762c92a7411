use healthchain_abi::AbiError;
use healthchain_types::{AddressError, TextError, UintError};

#[derive(Debug, thiserror::Error)]
pub enum DappError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),
    #[error("invalid number: {0}")]
    InvalidNumber(#[from] UintError),
    #[error("invalid text: {0}")]
    InvalidText(#[from] TextError),

    #[error("no wallet provider available; install or configure one via HEALTHCHAIN_RPC_URL")]
    NoWalletProvider,
    #[error("wallet access request was rejected by the user")]
    UserRejected,
    #[error("wallet returned no accounts")]
    NoAccounts,
    #[error("not connected to a wallet")]
    NotConnected,
    #[error("only the contract owner can call this function")]
    NotOwner,

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("failed to reach JSON-RPC endpoint: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid JSON-RPC response: {0}")]
    InvalidResponse(String),
    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),

    #[error("transaction reverted: {0}")]
    Reverted(String),
    #[error("transaction {0} failed on-chain")]
    TransactionFailed(String),
    #[error("no receipt for transaction {tx_hash} after {attempts} polls")]
    ReceiptTimeout { tx_hash: String, attempts: u32 },
}

impl DappError {
    /// True for errors caused by what the user typed rather than by the wallet or the chain.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            DappError::InvalidInput(_)
                | DappError::InvalidAddress(_)
                | DappError::InvalidNumber(_)
                | DappError::InvalidText(_)
        )
    }
}

pub type DappResult<T> = std::result::Result<T, DappError>;
