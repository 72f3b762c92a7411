//! # HealthChain Core
//!
//! Client for the `HealthcareRecords` smart contract.
//!
//! This crate holds everything between the user and the chain:
//! - [`wallet`]: connecting to a JSON-RPC wallet provider and selecting the sender account
//! - [`contract`]: a typed binding for `getOwner`, `getPatientRecords`, `addRecord` and
//!   `authorizeProvider`
//! - [`session`]: the start-up connection task and the advisory owner flag
//! - [`dashboard`]: form state, record list, action progress and notices
//! - [`render`]: plain-text presentation of a dashboard
//!
//! **Authorization lives on chain.** The owner flag in [`Session`] only decides what the client
//! shows and whether it bothers submitting `authorizeProvider`. The contract checks every
//! state-changing call itself.
//!
//! **No API concerns**: HTTP servers and the CLI belong in `api-rest` and `cli`.

pub mod config;
pub mod constants;
pub mod contract;
pub mod dashboard;
pub mod error;
pub mod eth;
pub mod record;
pub mod render;
pub mod session;
pub mod transport;
pub mod wallet;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::CoreConfig;
pub use contract::{HealthcareContract, HealthcareFunctions};
pub use dashboard::{
    Action, ActionState, ConnectionState, Dashboard, FormField, FormState, Notice, NoticeLevel,
};
pub use error::{DappError, DappResult};
pub use eth::{EthClient, ReceiptPolicy, TransactionReceipt, TxHash};
pub use record::{parse_patient_id, NewRecord, Record};
pub use session::{Connection, Session};
pub use transport::{HttpTransport, Transport};
pub use wallet::{Wallet, WalletConnector};

pub use healthchain_types::{Address, U256};
