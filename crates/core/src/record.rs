//! Patient records as stored by the contract.

use crate::error::{DappError, DappResult};
use chrono::{DateTime, TimeZone, Utc};
use healthchain_abi::Token;
use healthchain_types::{NonEmptyText, U256};
use serde::{Deserialize, Serialize};

/// A record returned by `getPatientRecords`.
///
/// Records are created and timestamped by the contract; the client only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(rename = "recordID")]
    pub record_id: U256,
    pub patient_name: String,
    pub diagnosis: String,
    pub treatment: String,
    /// Block timestamp in unix seconds.
    pub timestamp: u64,
}

impl Record {
    /// Builds a record from a decoded `(uint256,string,string,string,uint256)` tuple.
    pub fn from_token(token: Token) -> DappResult<Self> {
        let malformed = || DappError::InvalidResponse("malformed record tuple".into());

        let fields = token.into_tuple().ok_or_else(malformed)?;
        let [record_id, patient_name, diagnosis, treatment, timestamp]: [Token; 5] =
            fields.try_into().map_err(|_| malformed())?;

        let timestamp = timestamp.into_uint().ok_or_else(malformed)?;
        Ok(Self {
            record_id: record_id.into_uint().ok_or_else(malformed)?,
            patient_name: patient_name.into_string().ok_or_else(malformed)?,
            diagnosis: diagnosis.into_string().ok_or_else(malformed)?,
            treatment: treatment.into_string().ok_or_else(malformed)?,
            timestamp: timestamp.as_u64().ok_or_else(|| {
                DappError::InvalidResponse(format!("record timestamp {timestamp} out of range"))
            })?,
        })
    }

    pub fn to_token(&self) -> Token {
        Token::Tuple(vec![
            Token::Uint(self.record_id),
            Token::String(self.patient_name.clone()),
            Token::String(self.diagnosis.clone()),
            Token::String(self.treatment.clone()),
            Token::Uint(U256::from(self.timestamp)),
        ])
    }

    /// The timestamp as a UTC instant, if chrono can represent it.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        let seconds = i64::try_from(self.timestamp).ok()?;
        Utc.timestamp_opt(seconds, 0).single()
    }
}

/// Arguments of an `addRecord` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub patient_id: U256,
    pub patient_name: NonEmptyText,
    pub diagnosis: NonEmptyText,
    pub treatment: NonEmptyText,
}

impl NewRecord {
    /// Validates raw form values.
    ///
    /// # Errors
    ///
    /// Fails if the patient ID is not a non-negative decimal integer or any text field is blank.
    pub fn from_form(
        patient_id: &str,
        patient_name: &str,
        diagnosis: &str,
        treatment: &str,
    ) -> DappResult<Self> {
        Ok(Self {
            patient_id: parse_patient_id(patient_id)?,
            patient_name: NonEmptyText::new(patient_name)
                .map_err(|_| DappError::InvalidInput("patient name is required".into()))?,
            diagnosis: NonEmptyText::new(diagnosis)
                .map_err(|_| DappError::InvalidInput("diagnosis is required".into()))?,
            treatment: NonEmptyText::new(treatment)
                .map_err(|_| DappError::InvalidInput("treatment is required".into()))?,
        })
    }

    pub fn to_tokens(&self) -> Vec<Token> {
        vec![
            Token::Uint(self.patient_id),
            Token::String(self.patient_name.to_string()),
            Token::String(self.diagnosis.to_string()),
            Token::String(self.treatment.to_string()),
        ]
    }
}

/// Parses a patient ID typed into a form.
pub fn parse_patient_id(input: &str) -> DappResult<U256> {
    if input.trim().is_empty() {
        return Err(DappError::InvalidInput("patient ID is required".into()));
    }
    Ok(U256::from_dec_str(input)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record {
            record_id: U256::from(3u64),
            patient_name: "Alice".into(),
            diagnosis: "Flu".into(),
            treatment: "Rest".into(),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_from_token_reads_all_fields() {
        let record = sample();
        assert_eq!(Record::from_token(record.to_token()).unwrap(), record);
    }

    #[test]
    fn test_from_token_rejects_wrong_shape() {
        let token = Token::Tuple(vec![Token::Uint(U256::from(1u64))]);
        assert!(matches!(
            Record::from_token(token),
            Err(DappError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_from_token_rejects_huge_timestamp() {
        let mut fields = sample().to_token().into_tuple().unwrap();
        fields[4] = Token::Uint(U256::MAX);
        assert!(Record::from_token(Token::Tuple(fields)).is_err());
    }

    #[test]
    fn test_recorded_at() {
        let at = sample().recorded_at().unwrap();
        assert_eq!(at.to_rfc3339(), "2023-11-14T22:13:20+00:00");
    }

    #[test]
    fn test_serializes_with_contract_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["recordID"], "3");
        assert_eq!(json["patientName"], "Alice");
        assert_eq!(json["timestamp"], 1_700_000_000u64);
    }

    #[test]
    fn test_new_record_from_form_validates() {
        let record = NewRecord::from_form(" 42 ", "Bob", "Cough", "Syrup").unwrap();
        assert_eq!(record.patient_id, U256::from(42u64));
        assert_eq!(record.to_tokens().len(), 4);

        assert!(matches!(
            NewRecord::from_form("", "Bob", "Cough", "Syrup"),
            Err(DappError::InvalidInput(_))
        ));
        assert!(matches!(
            NewRecord::from_form("-3", "Bob", "Cough", "Syrup"),
            Err(DappError::InvalidNumber(_))
        ));
        assert!(matches!(
            NewRecord::from_form("1", "  ", "Cough", "Syrup"),
            Err(DappError::InvalidInput(m)) if m.contains("patient name")
        ));
    }
}
