//! Binding for the deployed `HealthcareRecords` contract.
//!
//! Each method mirrors one ABI entry. Reads go through `eth_call`; writes go through
//! `eth_sendTransaction` signed by the connected account and resolve once the receipt is mined.
//!
//! The binding performs no authorization checks of its own. Whether the sender may add records
//! or authorize providers is decided by the contract on every call.

use crate::error::{DappError, DappResult};
use crate::eth::{CallRequest, EthClient, ReceiptPolicy, TransactionReceipt};
use crate::record::{NewRecord, Record};
use crate::wallet::Wallet;
use healthchain_abi::healthcare::{
    ADD_RECORD, ADD_RECORD_SIGNATURE, AUTHORIZE_PROVIDER, AUTHORIZE_PROVIDER_SIGNATURE, GET_OWNER,
    GET_OWNER_SIGNATURE, GET_PATIENT_RECORDS, GET_PATIENT_RECORDS_SIGNATURE,
};
use healthchain_abi::{healthcare_records_abi, Abi, Function, Token};
use healthchain_types::{Address, U256};

/// Resolved `HealthcareRecords` functions.
#[derive(Clone, Debug)]
pub struct HealthcareFunctions {
    pub get_owner: Function,
    pub get_patient_records: Function,
    pub add_record: Function,
    pub authorize_provider: Function,
}

impl HealthcareFunctions {
    /// Resolves the four functions from `abi`, checking each canonical signature.
    pub fn resolve(abi: &Abi) -> DappResult<Self> {
        Ok(Self {
            get_owner: abi
                .function(GET_OWNER)?
                .expect_signature(GET_OWNER_SIGNATURE)?,
            get_patient_records: abi
                .function(GET_PATIENT_RECORDS)?
                .expect_signature(GET_PATIENT_RECORDS_SIGNATURE)?,
            add_record: abi
                .function(ADD_RECORD)?
                .expect_signature(ADD_RECORD_SIGNATURE)?,
            authorize_provider: abi
                .function(AUTHORIZE_PROVIDER)?
                .expect_signature(AUTHORIZE_PROVIDER_SIGNATURE)?,
        })
    }

    /// Resolves from the embedded contract ABI.
    pub fn embedded() -> DappResult<Self> {
        Self::resolve(&healthcare_records_abi()?)
    }
}

/// Typed access to one deployed `HealthcareRecords` contract.
#[derive(Clone)]
pub struct HealthcareContract {
    eth: EthClient,
    address: Address,
    sender: Address,
    functions: HealthcareFunctions,
    receipts: ReceiptPolicy,
}

impl HealthcareContract {
    /// Binds the contract at `address`, sending from the wallet's account.
    pub fn new(wallet: &Wallet, address: Address, receipts: ReceiptPolicy) -> DappResult<Self> {
        Ok(Self {
            eth: wallet.eth().clone(),
            address,
            sender: wallet.account(),
            functions: HealthcareFunctions::embedded()?,
            receipts,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    /// `getOwner()`
    pub async fn get_owner(&self) -> DappResult<Address> {
        let mut out = self.call(&self.functions.get_owner, &[]).await?;
        out.pop()
            .and_then(Token::into_address)
            .ok_or_else(|| DappError::InvalidResponse("getOwner returned no address".into()))
    }

    /// `getPatientRecords(patientID)`, in contract order. Unknown IDs yield an empty list.
    pub async fn get_patient_records(&self, patient_id: U256) -> DappResult<Vec<Record>> {
        let mut out = self
            .call(&self.functions.get_patient_records, &[Token::Uint(patient_id)])
            .await?;
        let items = out
            .pop()
            .and_then(Token::into_array)
            .ok_or_else(|| DappError::InvalidResponse("getPatientRecords returned no array".into()))?;

        items.into_iter().map(Record::from_token).collect()
    }

    /// `addRecord(patientID, patientName, diagnosis, treatment)`
    ///
    /// The new record only becomes visible through a later [`get_patient_records`] call.
    ///
    /// [`get_patient_records`]: Self::get_patient_records
    pub async fn add_record(&self, record: &NewRecord) -> DappResult<TransactionReceipt> {
        self.send(&self.functions.add_record, &record.to_tokens())
            .await
    }

    /// `authorizeProvider(provider)`
    ///
    /// Submitted unconditionally; the contract rejects senders other than its owner.
    pub async fn authorize_provider(&self, provider: Address) -> DappResult<TransactionReceipt> {
        self.send(&self.functions.authorize_provider, &[Token::Address(provider)])
            .await
    }

    async fn call(&self, function: &Function, args: &[Token]) -> DappResult<Vec<Token>> {
        let data = function.encode_input(args)?;
        let request = CallRequest::new(Some(self.sender), self.address, &data);
        let output = self.eth.call(&request).await?;
        Ok(function.decode_output(&output)?)
    }

    async fn send(&self, function: &Function, args: &[Token]) -> DappResult<TransactionReceipt> {
        let data = function.encode_input(args)?;
        let request = CallRequest::new(Some(self.sender), self.address, &data);
        let hash = self.eth.send_transaction(&request).await?;
        tracing::info!("{} submitted as {}", function.name, hash);
        self.eth.wait_for_receipt(&hash, self.receipts).await
    }
}
