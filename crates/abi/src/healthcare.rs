//! The `HealthcareRecords` contract interface.
//!
//! The JSON below is the ABI of the deployed contract, kept byte-for-byte so the binding stays
//! compatible with it. Function names and canonical signatures are pinned as constants; the
//! binding checks the parsed ABI against them at start-up.

use crate::{Abi, AbiResult, ParamType};

/// ABI of the deployed `HealthcareRecords` contract.
pub const HEALTHCARE_RECORDS_ABI: &str = include_str!("../abi/HealthcareRecords.json");

pub const GET_OWNER: &str = "getOwner";
pub const GET_PATIENT_RECORDS: &str = "getPatientRecords";
pub const ADD_RECORD: &str = "addRecord";
pub const AUTHORIZE_PROVIDER: &str = "authorizeProvider";

pub const GET_OWNER_SIGNATURE: &str = "getOwner()";
pub const GET_PATIENT_RECORDS_SIGNATURE: &str = "getPatientRecords(uint256)";
pub const ADD_RECORD_SIGNATURE: &str = "addRecord(uint256,string,string,string)";
pub const AUTHORIZE_PROVIDER_SIGNATURE: &str = "authorizeProvider(address)";

/// Parses the embedded `HealthcareRecords` ABI.
pub fn healthcare_records_abi() -> AbiResult<Abi> {
    Abi::parse(HEALTHCARE_RECORDS_ABI)
}

/// `(uint256 recordID, string patientName, string diagnosis, string treatment, uint256 timestamp)`
pub fn record_type() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Uint256,
        ParamType::String,
        ParamType::String,
        ParamType::String,
        ParamType::Uint256,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntryKind, StateMutability};

    fn selector_hex(name: &str) -> String {
        let function = healthcare_records_abi().unwrap().function(name).unwrap();
        hex::encode(function.selector())
    }

    #[test]
    fn test_embedded_abi_lists_all_entries() {
        let abi = healthcare_records_abi().unwrap();
        assert_eq!(abi.entries().len(), 5);
        assert_eq!(abi.entries()[0].kind, EntryKind::Constructor);
        assert_eq!(
            abi.function_names(),
            vec![ADD_RECORD, AUTHORIZE_PROVIDER, GET_OWNER, GET_PATIENT_RECORDS]
        );
    }

    #[test]
    fn test_signatures_match_deployed_contract() {
        let abi = healthcare_records_abi().unwrap();
        for (name, signature) in [
            (GET_OWNER, GET_OWNER_SIGNATURE),
            (GET_PATIENT_RECORDS, GET_PATIENT_RECORDS_SIGNATURE),
            (ADD_RECORD, ADD_RECORD_SIGNATURE),
            (AUTHORIZE_PROVIDER, AUTHORIZE_PROVIDER_SIGNATURE),
        ] {
            let function = abi.function(name).unwrap();
            assert_eq!(function.signature(), signature);
        }
    }

    #[test]
    fn test_selectors() {
        assert_eq!(selector_hex(GET_OWNER), "893d20e8");
        assert_eq!(selector_hex(GET_PATIENT_RECORDS), "dce7e843");
        assert_eq!(selector_hex(ADD_RECORD), "1a08a348");
        assert_eq!(selector_hex(AUTHORIZE_PROVIDER), "112ea262");
    }

    #[test]
    fn test_read_and_write_functions() {
        let abi = healthcare_records_abi().unwrap();
        assert!(abi.function(GET_OWNER).unwrap().is_read_only());
        assert!(abi.function(GET_PATIENT_RECORDS).unwrap().is_read_only());

        let add = abi.function(ADD_RECORD).unwrap();
        assert!(!add.is_read_only());
        assert_eq!(add.state_mutability, StateMutability::Nonpayable);
    }

    #[test]
    fn test_get_patient_records_returns_record_array() {
        let function = healthcare_records_abi()
            .unwrap()
            .function(GET_PATIENT_RECORDS)
            .unwrap();
        assert_eq!(
            function.outputs,
            vec![ParamType::Array(Box::new(record_type()))]
        );
    }
}
