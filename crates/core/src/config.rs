//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the wallet connector
//! and contract binding. Request handling never reads environment variables.

use crate::constants::{
    CONTRACT_ADDRESS_ENV, RECEIPT_POLL_ATTEMPTS_ENV, RECEIPT_POLL_MS_ENV, RPC_URL_ENV,
};
use crate::error::{DappError, DappResult};
use crate::eth::ReceiptPolicy;
use healthchain_types::Address;
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    rpc_url: Option<String>,
    contract_address: Address,
    receipt_policy: ReceiptPolicy,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// An empty or whitespace RPC URL is treated as "no wallet provider".
    pub fn new(
        rpc_url: Option<String>,
        contract_address: Address,
        receipt_policy: ReceiptPolicy,
    ) -> DappResult<Self> {
        let rpc_url = rpc_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        if let Some(url) = &rpc_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(DappError::InvalidInput(format!(
                    "{RPC_URL_ENV} must be an http(s) URL, got '{url}'"
                )));
            }
        }

        if receipt_policy.max_attempts == 0 {
            return Err(DappError::InvalidInput(format!(
                "{RECEIPT_POLL_ATTEMPTS_ENV} must be at least 1"
            )));
        }

        Ok(Self {
            rpc_url,
            contract_address,
            receipt_policy,
        })
    }

    /// Reads the process environment. Call once, after `.env` has been loaded.
    pub fn from_env() -> DappResult<Self> {
        let contract_address =
            contract_address_from_env_value(std::env::var(CONTRACT_ADDRESS_ENV).ok())?;
        let receipt_policy = receipt_policy_from_env_values(
            std::env::var(RECEIPT_POLL_MS_ENV).ok(),
            std::env::var(RECEIPT_POLL_ATTEMPTS_ENV).ok(),
        )?;

        Self::new(
            std::env::var(RPC_URL_ENV).ok(),
            contract_address,
            receipt_policy,
        )
    }

    pub fn rpc_url(&self) -> Option<&str> {
        self.rpc_url.as_deref()
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    pub fn receipt_policy(&self) -> ReceiptPolicy {
        self.receipt_policy
    }
}

/// Parse the contract address from an optional environment value.
///
/// The deployment address is environment-specific, so there is no default.
pub fn contract_address_from_env_value(value: Option<String>) -> DappResult<Address> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DappError::InvalidInput(format!("{CONTRACT_ADDRESS_ENV} must be set")))?;

    Ok(Address::parse(&value)?)
}

/// Parse the receipt polling policy, falling back to defaults for unset values.
pub fn receipt_policy_from_env_values(
    interval_ms: Option<String>,
    attempts: Option<String>,
) -> DappResult<ReceiptPolicy> {
    fn parse<T: std::str::FromStr>(name: &str, value: Option<String>) -> DappResult<Option<T>> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.parse::<T>().map_err(|_| {
                    DappError::InvalidInput(format!("{name} must be a non-negative integer"))
                })
            })
            .transpose()
    }

    let defaults = ReceiptPolicy::default();
    Ok(ReceiptPolicy {
        interval: parse::<u64>(RECEIPT_POLL_MS_ENV, interval_ms)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.interval),
        max_attempts: parse::<u32>(RECEIPT_POLL_ATTEMPTS_ENV, attempts)?
            .unwrap_or(defaults.max_attempts),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_RECEIPT_POLL_ATTEMPTS, DEFAULT_RECEIPT_POLL_MS};

    const CONTRACT: &str = "0x7Ba96bE1f97ea44d368FBd09469963D8bAdBb60a";

    #[test]
    fn test_contract_address_is_required() {
        assert!(matches!(
            contract_address_from_env_value(None),
            Err(DappError::InvalidInput(_))
        ));
        assert!(matches!(
            contract_address_from_env_value(Some("   ".into())),
            Err(DappError::InvalidInput(_))
        ));
        assert!(matches!(
            contract_address_from_env_value(Some("0x12".into())),
            Err(DappError::InvalidAddress(_))
        ));

        let address = contract_address_from_env_value(Some(CONTRACT.into())).unwrap();
        assert_eq!(address.to_string(), CONTRACT);
    }

    #[test]
    fn test_receipt_policy_defaults_and_overrides() {
        let defaults = receipt_policy_from_env_values(None, Some("".into())).unwrap();
        assert_eq!(defaults.interval, Duration::from_millis(DEFAULT_RECEIPT_POLL_MS));
        assert_eq!(defaults.max_attempts, DEFAULT_RECEIPT_POLL_ATTEMPTS);

        let custom = receipt_policy_from_env_values(Some("250".into()), Some("8".into())).unwrap();
        assert_eq!(custom.interval, Duration::from_millis(250));
        assert_eq!(custom.max_attempts, 8);

        assert!(receipt_policy_from_env_values(Some("-1".into()), None).is_err());
    }

    #[test]
    fn test_empty_rpc_url_means_no_provider() {
        let address = Address::parse(CONTRACT).unwrap();
        let cfg = CoreConfig::new(Some("  ".into()), address, ReceiptPolicy::default()).unwrap();
        assert_eq!(cfg.rpc_url(), None);

        let cfg = CoreConfig::new(
            Some("http://127.0.0.1:8545".into()),
            address,
            ReceiptPolicy::default(),
        )
        .unwrap();
        assert_eq!(cfg.rpc_url(), Some("http://127.0.0.1:8545"));
    }

    #[test]
    fn test_rejects_bad_rpc_url_and_zero_attempts() {
        let address = Address::parse(CONTRACT).unwrap();
        assert!(CoreConfig::new(Some("ws://node".into()), address, ReceiptPolicy::default())
            .is_err());

        let policy = ReceiptPolicy {
            interval: Duration::from_millis(1),
            max_attempts: 0,
        };
        assert!(CoreConfig::new(None, address, policy).is_err());
    }
}
