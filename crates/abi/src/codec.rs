//! Solidity ABI encoding.
//!
//! Values are laid out as a head of 32-byte words followed by a tail holding dynamic data. A
//! dynamic value (string, array, tuple containing either) puts an offset in the head that points
//! into the tail, measured from the start of the enclosing tuple.

use crate::{AbiError, AbiResult};
use healthchain_types::{Address, U256};
use std::fmt;

const WORD: usize = 32;

/// The ABI type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Uint256,
    Address,
    String,
    Tuple(Vec<ParamType>),
    Array(Box<ParamType>),
}

impl ParamType {
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::String | ParamType::Array(_) => true,
            ParamType::Tuple(items) => items.iter().any(ParamType::is_dynamic),
            ParamType::Uint256 | ParamType::Address => false,
        }
    }

    fn head_size(&self) -> usize {
        match self {
            ParamType::Tuple(items) if !self.is_dynamic() => {
                items.iter().map(ParamType::head_size).sum()
            }
            _ => WORD,
        }
    }
}

/// Canonical type string used in function signatures, e.g. `(uint256,string)[]`.
impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Uint256 => f.write_str("uint256"),
            ParamType::Address => f.write_str("address"),
            ParamType::String => f.write_str("string"),
            ParamType::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
            ParamType::Array(inner) => write!(f, "{}[]", inner),
        }
    }
}

/// A decoded or to-be-encoded ABI value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Uint(U256),
    Address(Address),
    String(String),
    Tuple(Vec<Token>),
    Array(Vec<Token>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        match self {
            Token::String(_) | Token::Array(_) => true,
            Token::Tuple(items) => items.iter().any(Token::is_dynamic),
            Token::Uint(_) | Token::Address(_) => false,
        }
    }

    /// Returns true if this token can be encoded as `ty`.
    pub fn matches(&self, ty: &ParamType) -> bool {
        match (self, ty) {
            (Token::Uint(_), ParamType::Uint256)
            | (Token::Address(_), ParamType::Address)
            | (Token::String(_), ParamType::String) => true,
            (Token::Tuple(items), ParamType::Tuple(types)) => {
                items.len() == types.len()
                    && items.iter().zip(types).all(|(item, ty)| item.matches(ty))
            }
            (Token::Array(items), ParamType::Array(inner)) => {
                items.iter().all(|item| item.matches(inner))
            }
            _ => false,
        }
    }

    pub fn into_uint(self) -> Option<U256> {
        match self {
            Token::Uint(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_address(self) -> Option<Address> {
        match self {
            Token::Address(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Token::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_tuple(self) -> Option<Vec<Token>> {
        match self {
            Token::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<Token>> {
        match self {
            Token::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// Encodes `tokens` as an ABI tuple (the layout of function arguments and return values).
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    encode_tuple(tokens)
}

fn encode_tuple(tokens: &[Token]) -> Vec<u8> {
    let heads_len: usize = tokens
        .iter()
        .map(|t| if t.is_dynamic() { WORD } else { static_size(t) })
        .sum();

    let mut head = Vec::with_capacity(heads_len);
    let mut tail = Vec::new();
    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&usize_word(heads_len + tail.len()));
            tail.extend(encode_token(token));
        } else {
            head.extend(encode_token(token));
        }
    }
    head.extend(tail);
    head
}

fn static_size(token: &Token) -> usize {
    match token {
        Token::Tuple(items) => items.iter().map(static_size).sum(),
        _ => WORD,
    }
}

fn encode_token(token: &Token) -> Vec<u8> {
    match token {
        Token::Uint(value) => value.to_be_bytes().to_vec(),
        Token::Address(address) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(address.as_bytes());
            word.to_vec()
        }
        Token::String(text) => {
            let bytes = text.as_bytes();
            let mut out = usize_word(bytes.len()).to_vec();
            out.extend_from_slice(bytes);
            out.resize(WORD + padded_len(bytes.len()), 0);
            out
        }
        Token::Array(items) => {
            let mut out = usize_word(items.len()).to_vec();
            out.extend(encode_tuple(items));
            out
        }
        Token::Tuple(items) => encode_tuple(items),
    }
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

fn usize_word(value: usize) -> [u8; WORD] {
    U256::from(value as u64).to_be_bytes()
}

/// Decodes ABI data laid out as a tuple of `types`.
///
/// # Errors
///
/// Fails if the data is truncated, an offset points outside the data, a string is not UTF-8, or
/// an address word carries non-zero padding.
pub fn decode(types: &[ParamType], data: &[u8]) -> AbiResult<Vec<Token>> {
    decode_tuple(types, data, 0)
}

fn decode_tuple(types: &[ParamType], data: &[u8], base: usize) -> AbiResult<Vec<Token>> {
    let mut tokens = Vec::with_capacity(types.len());
    let mut cursor = base;
    for ty in types {
        if ty.is_dynamic() {
            let offset = read_usize(data, cursor)?;
            let at = base.checked_add(offset).ok_or(AbiError::OffsetOverflow)?;
            tokens.push(decode_value(ty, data, at)?);
            cursor += WORD;
        } else {
            tokens.push(decode_value(ty, data, cursor)?);
            cursor += ty.head_size();
        }
    }
    Ok(tokens)
}

fn decode_value(ty: &ParamType, data: &[u8], at: usize) -> AbiResult<Token> {
    match ty {
        ParamType::Uint256 => Ok(Token::Uint(U256::from_be_bytes(read_word(data, at)?))),
        ParamType::Address => {
            let word = read_word(data, at)?;
            if word[..12].iter().any(|&b| b != 0) {
                return Err(AbiError::InvalidAddressPadding);
            }
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(&word[12..]);
            Ok(Token::Address(Address::from_bytes(bytes)))
        }
        ParamType::String => {
            let len = read_usize(data, at)?;
            let bytes = read_slice(data, at + WORD, len)?;
            let text = std::str::from_utf8(bytes).map_err(|_| AbiError::InvalidUtf8)?;
            Ok(Token::String(text.to_owned()))
        }
        ParamType::Array(inner) => {
            let len = read_usize(data, at)?;
            let items_base = at + WORD;
            // Each element takes at least one word, so a longer claim is corrupt.
            let remaining = data.len().saturating_sub(items_base);
            if len > remaining / WORD {
                return Err(AbiError::OutOfBounds {
                    offset: items_base,
                    needed: len.saturating_mul(WORD),
                    len: data.len(),
                });
            }
            let types = vec![(**inner).clone(); len];
            Ok(Token::Array(decode_tuple(&types, data, items_base)?))
        }
        ParamType::Tuple(items) => Ok(Token::Tuple(decode_tuple(items, data, at)?)),
    }
}

fn read_slice(data: &[u8], offset: usize, needed: usize) -> AbiResult<&[u8]> {
    let end = offset.checked_add(needed).ok_or(AbiError::OffsetOverflow)?;
    data.get(offset..end).ok_or(AbiError::OutOfBounds {
        offset,
        needed,
        len: data.len(),
    })
}

fn read_word(data: &[u8], offset: usize) -> AbiResult<[u8; WORD]> {
    let mut word = [0u8; WORD];
    word.copy_from_slice(read_slice(data, offset, WORD)?);
    Ok(word)
}

fn read_usize(data: &[u8], offset: usize) -> AbiResult<usize> {
    let value = U256::from_be_bytes(read_word(data, offset)?);
    value
        .as_u64()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or(AbiError::OffsetOverflow)
}
