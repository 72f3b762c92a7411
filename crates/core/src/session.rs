//! Wallet session and the start-up connection task.
//!
//! ## Security note
//!
//! [`Session::is_owner`] is a UI hint only. It lets the client skip a provider authorization that
//! the contract would reject anyway, and show an owner badge. The contract re-checks ownership and
//! provider authorization on every state-changing call, and nothing in this crate relies on the
//! flag to protect data.

use crate::config::CoreConfig;
use crate::contract::HealthcareContract;
use crate::error::DappResult;
use crate::wallet::WalletConnector;
use healthchain_types::Address;
use serde::Serialize;
use std::sync::Arc;

/// The connected account and whether it owns the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    account: Address,
    is_owner: bool,
}

impl Session {
    /// Derives the session from the connected account and the on-chain owner.
    ///
    /// Addresses compare by bytes, so checksum casing does not matter.
    pub fn derive(account: Address, owner: Address) -> Self {
        Self {
            account,
            is_owner: account == owner,
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    /// Advisory only; see the module-level security note.
    pub fn is_owner(&self) -> bool {
        self.is_owner
    }
}

/// A live wallet connection with its contract binding.
#[derive(Clone)]
pub struct Connection {
    pub session: Session,
    pub contract: Arc<HealthcareContract>,
}

/// Connects the wallet, binds the contract and derives the session.
///
/// This is the one-time initialisation task run on start-up (and on explicit reconnect).
pub async fn connect(cfg: &CoreConfig, connector: &WalletConnector) -> DappResult<Connection> {
    let wallet = connector.connect().await?;
    let contract = HealthcareContract::new(&wallet, cfg.contract_address(), cfg.receipt_policy())?;
    let owner = contract.get_owner().await?;
    let session = Session::derive(wallet.account(), owner);

    tracing::info!(
        "session ready for {} (owner: {})",
        session.account(),
        session.is_owner()
    );

    Ok(Connection {
        session,
        contract: Arc::new(contract),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DappError;
    use crate::eth::ReceiptPolicy;
    use crate::testing::MockChain;

    fn account(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn cfg() -> CoreConfig {
        CoreConfig::new(None, MockChain::CONTRACT, ReceiptPolicy::default()).unwrap()
    }

    #[test]
    fn test_is_owner_ignores_address_case() {
        let lower = Address::parse("0x7ba96be1f97ea44d368fbd09469963d8badbb60a").unwrap();
        let checksummed = Address::parse("0x7Ba96bE1f97ea44d368FBd09469963D8bAdBb60a").unwrap();

        assert!(Session::derive(lower, checksummed).is_owner());
        assert!(!Session::derive(lower, account(1)).is_owner());
    }

    #[tokio::test]
    async fn test_connect_as_owner() {
        let chain = Arc::new(MockChain::new(account(1), vec![account(1)]));
        let connection = connect(&cfg(), &chain.connector()).await.unwrap();

        assert_eq!(connection.session.account(), account(1));
        assert!(connection.session.is_owner());
        assert_eq!(connection.contract.address(), MockChain::CONTRACT);
    }

    #[tokio::test]
    async fn test_connect_as_non_owner() {
        let chain = Arc::new(MockChain::new(account(1), vec![account(5)]));
        let connection = connect(&cfg(), &chain.connector()).await.unwrap();
        assert!(!connection.session.is_owner());
    }

    #[tokio::test]
    async fn test_connect_propagates_wallet_failure() {
        let result = connect(&cfg(), &WalletConnector::new(None)).await;
        assert!(matches!(result, Err(DappError::NoWalletProvider)));
    }
}
