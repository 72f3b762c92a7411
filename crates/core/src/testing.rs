//! In-memory `HealthcareRecords` chain for tests.
//!
//! [`MockChain`] answers the JSON-RPC methods the client uses and enforces the same rules the
//! deployed contract does: only authorized providers add records, only the owner authorizes
//! providers. It can be used directly as a [`Transport`] or served over HTTP.

use crate::constants::{EXECUTION_REVERTED_CODE, METHOD_NOT_FOUND_CODE, USER_REJECTED_CODE};
use crate::contract::HealthcareFunctions;
use crate::error::DappResult;
use crate::record::Record;
use crate::transport::{RpcErrorObject, Transport};
use crate::wallet::WalletConnector;
use async_trait::async_trait;
use healthchain_abi::{encode, Token};
use healthchain_types::{keccak256, Address, U256};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// EIP-1193 "unauthorized": the requested account is not managed by the wallet.
const UNAUTHORIZED_ACCOUNT_CODE: i64 = 4100;

struct PendingReceipt {
    receipt: Value,
    polls_left: u32,
}

#[derive(Default)]
struct ChainState {
    owner: Address,
    accounts: Vec<Address>,
    authorized: HashSet<Address>,
    records: HashMap<U256, Vec<Record>>,
    next_record_id: u64,
    tx_count: u64,
    block: u64,
    receipts: HashMap<String, PendingReceipt>,
    receipt_delay: u32,
    receipt_polls: u32,
    reject_accounts: bool,
    request_accounts_disabled: bool,
    fail_on_chain: bool,
    calls: Vec<String>,
}

/// A single-contract development chain held in memory.
pub struct MockChain {
    state: Mutex<ChainState>,
    functions: HealthcareFunctions,
}

impl MockChain {
    /// Where the contract is deployed.
    pub const CONTRACT: Address = Address::from_bytes([0xc0; 20]);

    /// Deploys the contract with `owner`, who starts out as an authorized provider.
    pub fn new(owner: Address, accounts: Vec<Address>) -> Self {
        let functions = match HealthcareFunctions::embedded() {
            Ok(functions) => functions,
            Err(e) => panic!("embedded HealthcareRecords ABI is invalid: {e}"),
        };
        Self {
            state: Mutex::new(ChainState {
                owner,
                accounts,
                authorized: HashSet::from([owner]),
                next_record_id: 1,
                ..ChainState::default()
            }),
            functions,
        }
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Connector whose wallet exposes this chain's accounts.
    pub fn connector(self: &Arc<Self>) -> WalletConnector {
        WalletConnector::new(Some(self.transport()))
    }

    /// Connector whose wallet exposes only `account`.
    pub fn connector_for(self: &Arc<Self>, account: Address) -> WalletConnector {
        WalletConnector::new(Some(Arc::new(SingleAccount {
            chain: Arc::clone(self),
            account,
        })))
    }

    pub fn transport(self: &Arc<Self>) -> Arc<dyn Transport> {
        Arc::clone(self) as Arc<dyn Transport>
    }

    /// The wallet answers account requests with code 4001.
    pub fn reject_account_requests(&self) {
        self.state().reject_accounts = true;
    }

    /// Behave like a node without `eth_requestAccounts`.
    pub fn disable_request_accounts(&self) {
        self.state().request_accounts_disabled = true;
    }

    /// Replaces the accounts the wallet exposes, as when the user switches account.
    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.state().accounts = accounts;
    }

    /// Each new transaction reports no receipt for the first `polls` receipt requests.
    pub fn set_receipt_delay(&self, polls: u32) {
        self.state().receipt_delay = polls;
    }

    /// Transactions are mined with status `0x0` and change nothing.
    pub fn fail_transactions_on_chain(&self) {
        self.state().fail_on_chain = true;
    }

    pub fn receipt_polls(&self) -> u32 {
        self.state().receipt_polls
    }

    /// JSON-RPC methods received so far, in order.
    pub fn method_calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn records_for(&self, patient_id: U256) -> Vec<Record> {
        self.state()
            .records
            .get(&patient_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_authorized(&self, provider: Address) -> bool {
        self.state().authorized.contains(&provider)
    }

    /// Stores a record directly, bypassing authorization.
    pub fn seed_record(
        &self,
        patient_id: U256,
        patient_name: &str,
        diagnosis: &str,
        treatment: &str,
        timestamp: u64,
    ) -> U256 {
        let mut state = self.state();
        let record_id = U256::from(state.next_record_id);
        state.next_record_id += 1;
        state.records.entry(patient_id).or_default().push(Record {
            record_id,
            patient_name: patient_name.to_string(),
            diagnosis: diagnosis.to_string(),
            treatment: treatment.to_string(),
            timestamp,
        });
        record_id
    }

    /// Call data for `authorizeProvider(provider)`.
    pub fn authorize_provider_call_data(&self, provider: Address) -> Vec<u8> {
        let mut data = self.functions.authorize_provider.selector().to_vec();
        data.extend(encode(&[Token::Address(provider)]));
        data
    }

    /// Handles one JSON-RPC request.
    pub fn handle(&self, method: &str, params: Value) -> Result<Value, RpcErrorObject> {
        let mut state = self.state();
        state.calls.push(method.to_string());

        match method {
            "eth_requestAccounts" if state.request_accounts_disabled => Err(method_not_found(method)),
            "eth_requestAccounts" | "eth_accounts" => {
                if state.reject_accounts {
                    return Err(RpcErrorObject::new(
                        USER_REJECTED_CODE,
                        "User rejected the request.",
                    ));
                }
                Ok(json!(state
                    .accounts
                    .iter()
                    .map(Address::to_lower_hex)
                    .collect::<Vec<_>>()))
            }
            "eth_call" => {
                let (_, to, data) = transaction_fields(&params)?;
                if to != Self::CONTRACT {
                    return Ok(json!("0x"));
                }
                let output = self.call(&state, &data)?;
                Ok(json!(format!("0x{}", hex::encode(output))))
            }
            "eth_sendTransaction" => {
                let (from, to, data) = transaction_fields(&params)?;
                let from = from.ok_or_else(|| invalid_params("missing from"))?;
                if !state.accounts.contains(&from) {
                    return Err(RpcErrorObject::new(
                        UNAUTHORIZED_ACCOUNT_CODE,
                        format!("account {from} is not managed by this wallet"),
                    ));
                }
                if to == Self::CONTRACT {
                    self.transact(&mut state, from, &data)?;
                }
                Ok(json!(Self::mine(&mut state)))
            }
            "eth_getTransactionReceipt" => {
                let hash = params
                    .get(0)
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid_params("missing transaction hash"))?
                    .to_ascii_lowercase();
                state.receipt_polls += 1;
                match state.receipts.get_mut(&hash) {
                    Some(pending) if pending.polls_left == 0 => Ok(pending.receipt.clone()),
                    Some(pending) => {
                        pending.polls_left -= 1;
                        Ok(Value::Null)
                    }
                    None => Ok(Value::Null),
                }
            }
            _ => Err(method_not_found(method)),
        }
    }

    fn call(&self, state: &ChainState, data: &[u8]) -> Result<Vec<u8>, RpcErrorObject> {
        if let Some(args) = self.functions.get_owner.decode_input(data) {
            args.map_err(abi_error)?;
            return Ok(encode(&[Token::Address(state.owner)]));
        }
        if let Some(args) = self.functions.get_patient_records.decode_input(data) {
            let patient_id = args
                .map_err(abi_error)?
                .pop()
                .and_then(Token::into_uint)
                .ok_or_else(|| invalid_params("missing patient ID"))?;
            let records = state
                .records
                .get(&patient_id)
                .map(|records| records.iter().map(Record::to_token).collect())
                .unwrap_or_default();
            return Ok(encode(&[Token::Array(records)]));
        }
        Err(reverted("unknown function selector"))
    }

    fn transact(
        &self,
        state: &mut ChainState,
        from: Address,
        data: &[u8],
    ) -> Result<(), RpcErrorObject> {
        if let Some(args) = self.functions.add_record.decode_input(data) {
            if !state.authorized.contains(&from) {
                return Err(reverted("Not authorized"));
            }
            let [patient_id, patient_name, diagnosis, treatment]: [Token; 4] = args
                .map_err(abi_error)?
                .try_into()
                .map_err(|_| invalid_params("addRecord takes four arguments"))?;
            if state.fail_on_chain {
                return Ok(());
            }

            let patient_id = patient_id
                .into_uint()
                .ok_or_else(|| invalid_params("patient ID must be uint256"))?;
            let record_id = U256::from(state.next_record_id);
            state.next_record_id += 1;
            state.records.entry(patient_id).or_default().push(Record {
                record_id,
                patient_name: patient_name.into_string().unwrap_or_default(),
                diagnosis: diagnosis.into_string().unwrap_or_default(),
                treatment: treatment.into_string().unwrap_or_default(),
                timestamp: chrono::Utc::now().timestamp().max(0) as u64,
            });
            return Ok(());
        }

        if let Some(args) = self.functions.authorize_provider.decode_input(data) {
            if from != state.owner {
                return Err(reverted("Only owner can call this function"));
            }
            let provider = args
                .map_err(abi_error)?
                .pop()
                .and_then(Token::into_address)
                .ok_or_else(|| invalid_params("provider must be an address"))?;
            if !state.fail_on_chain {
                state.authorized.insert(provider);
            }
            return Ok(());
        }

        Err(reverted("unknown function selector"))
    }

    /// Records a receipt for the next transaction and returns its hash.
    fn mine(state: &mut ChainState) -> String {
        state.tx_count += 1;
        state.block += 1;
        let hash = format!("0x{}", hex::encode(keccak256(state.tx_count.to_be_bytes())));
        let status = if state.fail_on_chain { "0x0" } else { "0x1" };
        let receipt = json!({
            "transactionHash": hash,
            "status": status,
            "blockNumber": U256::from(state.block).to_quantity(),
        });
        let polls_left = state.receipt_delay;
        state.receipts.insert(
            hash.clone(),
            PendingReceipt {
                receipt,
                polls_left,
            },
        );
        hash
    }
}

#[async_trait]
impl Transport for MockChain {
    async fn request(&self, method: &str, params: Value) -> DappResult<Value> {
        self.handle(method, params).map_err(RpcErrorObject::into_error)
    }
}

/// A wallet that exposes one account of a shared chain.
struct SingleAccount {
    chain: Arc<MockChain>,
    account: Address,
}

#[async_trait]
impl Transport for SingleAccount {
    async fn request(&self, method: &str, params: Value) -> DappResult<Value> {
        match method {
            "eth_requestAccounts" | "eth_accounts" => Ok(json!([self.account.to_lower_hex()])),
            _ => self.chain.request(method, params).await,
        }
    }
}

/// Extracts `from`, `to` and `data` from the first transaction-object parameter.
fn transaction_fields(params: &Value) -> Result<(Option<Address>, Address, Vec<u8>), RpcErrorObject> {
    let tx = params
        .get(0)
        .ok_or_else(|| invalid_params("missing transaction object"))?;
    let address = |field: &str| -> Result<Option<Address>, RpcErrorObject> {
        tx.get(field)
            .and_then(Value::as_str)
            .map(|s| Address::parse(s).map_err(|e| invalid_params(&format!("{field}: {e}"))))
            .transpose()
    };

    let from = address("from")?;
    let to = address("to")?.ok_or_else(|| invalid_params("missing to"))?;
    let data = tx.get("data").and_then(Value::as_str).unwrap_or("0x");
    let data = hex::decode(data.strip_prefix("0x").unwrap_or(data))
        .map_err(|e| invalid_params(&format!("data: {e}")))?;
    Ok((from, to, data))
}

fn method_not_found(method: &str) -> RpcErrorObject {
    RpcErrorObject::new(
        METHOD_NOT_FOUND_CODE,
        format!("the method {method} does not exist/is not available"),
    )
}

fn invalid_params(message: &str) -> RpcErrorObject {
    RpcErrorObject::new(-32602, format!("invalid params: {message}"))
}

fn abi_error(e: healthchain_abi::AbiError) -> RpcErrorObject {
    invalid_params(&e.to_string())
}

fn reverted(reason: &str) -> RpcErrorObject {
    RpcErrorObject::new(
        EXECUTION_REVERTED_CODE,
        format!("execution reverted: {reason}"),
    )
}
