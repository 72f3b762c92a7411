//! Wallet connection.
//!
//! Connecting asks the provider for account access and takes the first account it exposes. That
//! account is the sender of every later transaction.

use crate::config::CoreConfig;
use crate::constants::METHOD_NOT_FOUND_CODE;
use crate::error::{DappError, DappResult};
use crate::eth::EthClient;
use crate::transport::{HttpTransport, Transport};
use healthchain_types::Address;
use std::sync::Arc;

/// Requests account access from a wallet provider, if one is available.
#[derive(Clone)]
pub struct WalletConnector {
    transport: Option<Arc<dyn Transport>>,
}

impl WalletConnector {
    /// `None` models a missing wallet provider; [`connect`](Self::connect) then fails.
    pub fn new(transport: Option<Arc<dyn Transport>>) -> Self {
        Self { transport }
    }

    /// Builds an HTTP connector for the configured RPC URL, if any.
    pub fn from_config(cfg: &CoreConfig) -> Self {
        let transport = cfg
            .rpc_url()
            .map(|url| Arc::new(HttpTransport::new(url)) as Arc<dyn Transport>);
        Self::new(transport)
    }

    pub fn has_provider(&self) -> bool {
        self.transport.is_some()
    }

    /// Requests account access and returns the connected wallet.
    ///
    /// Providers that do not implement `eth_requestAccounts` (development nodes) are asked for
    /// `eth_accounts` instead.
    ///
    /// # Errors
    ///
    /// - [`DappError::NoWalletProvider`] if no provider is configured
    /// - [`DappError::UserRejected`] if the user declines the request
    /// - [`DappError::NoAccounts`] if the provider exposes no account
    pub async fn connect(&self) -> DappResult<Wallet> {
        let transport = self
            .transport
            .clone()
            .ok_or(DappError::NoWalletProvider)?;
        let eth = EthClient::new(transport);

        let accounts = match eth.request_accounts().await {
            Err(DappError::Rpc { code, .. }) if code == METHOD_NOT_FOUND_CODE => {
                tracing::debug!("eth_requestAccounts unsupported, falling back to eth_accounts");
                eth.accounts().await?
            }
            other => other?,
        };

        let account = accounts.first().copied().ok_or(DappError::NoAccounts)?;
        tracing::info!("connected wallet account {}", account);

        Ok(Wallet { eth, account })
    }
}

/// A wallet with an authorized account.
#[derive(Clone)]
pub struct Wallet {
    eth: EthClient,
    account: Address,
}

impl Wallet {
    pub fn account(&self) -> Address {
        self.account
    }

    pub fn eth(&self) -> &EthClient {
        &self.eth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;

    fn account(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[tokio::test]
    async fn test_connect_returns_first_account() {
        let chain = Arc::new(MockChain::new(account(1), vec![account(2), account(1)]));
        let wallet = chain.connector().connect().await.unwrap();
        assert_eq!(wallet.account(), account(2));
    }

    #[tokio::test]
    async fn test_connect_without_provider_fails() {
        let connector = WalletConnector::new(None);
        assert!(!connector.has_provider());
        assert!(matches!(
            connector.connect().await,
            Err(DappError::NoWalletProvider)
        ));
    }

    #[tokio::test]
    async fn test_connect_reports_user_rejection() {
        let chain = Arc::new(MockChain::new(account(1), vec![account(1)]));
        chain.reject_account_requests();
        let result = chain.connector().connect().await;
        assert!(matches!(result, Err(DappError::UserRejected)));
    }

    #[tokio::test]
    async fn test_connect_falls_back_to_eth_accounts() {
        let chain = Arc::new(MockChain::new(account(1), vec![account(1)]));
        chain.disable_request_accounts();
        let wallet = chain.connector().connect().await.unwrap();

        assert_eq!(wallet.account(), account(1));
        assert_eq!(
            chain.method_calls(),
            vec!["eth_requestAccounts", "eth_accounts"]
        );
    }

    #[tokio::test]
    async fn test_connect_with_no_accounts_fails() {
        let chain = Arc::new(MockChain::new(account(1), vec![]));
        let result = chain.connector().connect().await;
        assert!(matches!(result, Err(DappError::NoAccounts)));
    }
}
