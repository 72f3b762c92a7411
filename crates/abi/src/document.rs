//! JSON ABI documents.
//!
//! A deployed contract is described by the JSON array solc emits. This module deserializes that
//! array and resolves function entries into [`Function`] values carrying their parameter types,
//! canonical signature and 4-byte selector.

use crate::codec::{self, ParamType, Token};
use crate::{AbiError, AbiResult};
use healthchain_types::keccak256;
use serde::{Deserialize, Serialize};

/// Kind of an ABI entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Constructor,
    Function,
    Event,
    Error,
    Fallback,
    Receive,
}

/// Declared state mutability of a function or constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Pure,
    View,
    Nonpayable,
    Payable,
}

/// One parameter of an ABI entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Param {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Param>,
}

impl Param {
    /// Resolves the declared type string (plus tuple components) into a [`ParamType`].
    pub fn param_type(&self) -> AbiResult<ParamType> {
        resolve_type(&self.kind, &self.components)
    }
}

fn resolve_type(kind: &str, components: &[Param]) -> AbiResult<ParamType> {
    if let Some(inner) = kind.strip_suffix("[]") {
        return Ok(ParamType::Array(Box::new(resolve_type(inner, components)?)));
    }

    match kind {
        "uint256" | "uint" => Ok(ParamType::Uint256),
        "address" => Ok(ParamType::Address),
        "string" => Ok(ParamType::String),
        "tuple" => components
            .iter()
            .map(Param::param_type)
            .collect::<AbiResult<Vec<_>>>()
            .map(ParamType::Tuple),
        other => Err(AbiError::UnsupportedType(other.to_string())),
    }
}

/// One entry of a JSON ABI array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Vec<Param>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_mutability: Option<StateMutability>,
}

/// A parsed ABI document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abi {
    entries: Vec<AbiEntry>,
}

impl Abi {
    /// Parses a JSON ABI array.
    pub fn parse(json: &str) -> AbiResult<Self> {
        let entries: Vec<AbiEntry> = serde_json::from_str(json)?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[AbiEntry] {
        &self.entries
    }

    /// Looks up a function entry by name and resolves its parameter types.
    ///
    /// # Errors
    ///
    /// Returns [`AbiError::UnknownFunction`] if no function has that name, or
    /// [`AbiError::UnsupportedType`] if one of its parameters uses a type outside the codec.
    pub fn function(&self, name: &str) -> AbiResult<Function> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.kind == EntryKind::Function && e.name.as_deref() == Some(name))
            .ok_or_else(|| AbiError::UnknownFunction(name.to_string()))?;

        let inputs = entry
            .inputs
            .iter()
            .map(Param::param_type)
            .collect::<AbiResult<Vec<_>>>()?;
        let outputs = entry
            .outputs
            .iter()
            .map(Param::param_type)
            .collect::<AbiResult<Vec<_>>>()?;

        Ok(Function {
            name: name.to_string(),
            inputs,
            outputs,
            state_mutability: entry
                .state_mutability
                .unwrap_or(StateMutability::Nonpayable),
        })
    }

    /// Names of all function entries, in declaration order.
    pub fn function_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::Function)
            .filter_map(|e| e.name.as_deref())
            .collect()
    }
}

/// A resolved contract function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<ParamType>,
    pub outputs: Vec<ParamType>,
    pub state_mutability: StateMutability,
}

impl Function {
    /// Canonical signature, e.g. `addRecord(uint256,string,string,string)`.
    pub fn signature(&self) -> String {
        let args: Vec<String> = self.inputs.iter().map(ToString::to_string).collect();
        format!("{}({})", self.name, args.join(","))
    }

    /// First four bytes of the keccak-256 hash of the signature.
    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature().as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    pub fn is_read_only(&self) -> bool {
        matches!(
            self.state_mutability,
            StateMutability::View | StateMutability::Pure
        )
    }

    /// Fails unless the resolved signature equals `expected`.
    pub fn expect_signature(self, expected: &str) -> AbiResult<Self> {
        let found = self.signature();
        if found != expected {
            return Err(AbiError::SignatureMismatch {
                function: self.name,
                expected: expected.to_string(),
                found,
            });
        }
        Ok(self)
    }

    /// Builds call data: selector followed by the encoded arguments.
    pub fn encode_input(&self, args: &[Token]) -> AbiResult<Vec<u8>> {
        if args.len() != self.inputs.len() {
            return Err(AbiError::ArgumentCount {
                function: self.name.clone(),
                expected: self.inputs.len(),
                got: args.len(),
            });
        }
        if let Some((index, ty)) = args
            .iter()
            .zip(&self.inputs)
            .enumerate()
            .find_map(|(i, (arg, ty))| (!arg.matches(ty)).then_some((i, ty)))
        {
            return Err(AbiError::ArgumentType {
                function: self.name.clone(),
                index,
                expected: ty.to_string(),
            });
        }

        let mut data = self.selector().to_vec();
        data.extend(codec::encode(args));
        Ok(data)
    }

    /// Decodes return data according to the declared outputs.
    pub fn decode_output(&self, data: &[u8]) -> AbiResult<Vec<Token>> {
        codec::decode(&self.outputs, data)
    }

    /// Decodes call data (selector plus arguments) for this function.
    ///
    /// Returns `None` if the selector does not belong to this function.
    pub fn decode_input(&self, call_data: &[u8]) -> Option<AbiResult<Vec<Token>>> {
        if call_data.len() < 4 {
            return None;
        }
        let (selector, args) = call_data.split_at(4);
        if selector != self.selector() {
            return None;
        }
        Some(codec::decode(&self.inputs, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healthchain_types::U256;

    const SAMPLE: &str = r#"[
        {"inputs": [], "stateMutability": "nonpayable", "type": "constructor"},
        {
            "inputs": [{"internalType": "uint256", "name": "id", "type": "uint256"}],
            "name": "lookup",
            "outputs": [{"internalType": "string[]", "name": "", "type": "string[]"}],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "anonymous": false,
            "inputs": [],
            "name": "Touched",
            "type": "event"
        }
    ]"#;

    #[test]
    fn test_parse_resolves_function_types() {
        let abi = Abi::parse(SAMPLE).unwrap();
        let lookup = abi.function("lookup").unwrap();

        assert_eq!(lookup.inputs, vec![ParamType::Uint256]);
        assert_eq!(
            lookup.outputs,
            vec![ParamType::Array(Box::new(ParamType::String))]
        );
        assert!(lookup.is_read_only());
        assert_eq!(lookup.signature(), "lookup(uint256)");
        assert_eq!(abi.function_names(), vec!["lookup"]);
    }

    #[test]
    fn test_unknown_function_is_an_error() {
        let abi = Abi::parse(SAMPLE).unwrap();
        assert!(matches!(
            abi.function("Touched"),
            Err(AbiError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_encode_input_checks_arguments() {
        let abi = Abi::parse(SAMPLE).unwrap();
        let lookup = abi.function("lookup").unwrap();

        assert!(matches!(
            lookup.encode_input(&[]),
            Err(AbiError::ArgumentCount { expected: 1, got: 0, .. })
        ));
        assert!(matches!(
            lookup.encode_input(&[Token::String("1".into())]),
            Err(AbiError::ArgumentType { index: 0, .. })
        ));

        let data = lookup.encode_input(&[Token::Uint(U256::from(5u64))]).unwrap();
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[..4], &lookup.selector());

        let args = lookup.decode_input(&data).unwrap().unwrap();
        assert_eq!(args, vec![Token::Uint(U256::from(5u64))]);
    }

    #[test]
    fn test_expect_signature_detects_drift() {
        let abi = Abi::parse(SAMPLE).unwrap();
        let err = abi
            .function("lookup")
            .unwrap()
            .expect_signature("lookup(address)")
            .unwrap_err();
        assert!(matches!(err, AbiError::SignatureMismatch { .. }));
    }

    #[test]
    fn test_unsupported_types_are_reported() {
        let json = r#"[{"inputs":[{"name":"b","type":"bytes32"}],"name":"f","outputs":[],"stateMutability":"nonpayable","type":"function"}]"#;
        let abi = Abi::parse(json).unwrap();
        assert!(matches!(
            abi.function("f"),
            Err(AbiError::UnsupportedType(t)) if t == "bytes32"
        ));
    }
}
