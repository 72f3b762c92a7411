//! 256-bit unsigned integers.
//!
//! Record IDs, patient IDs and timestamps are Solidity `uint256` values. Form input arrives as
//! decimal text and JSON-RPC quantities arrive as `0x` hex, so both are parsed here.

use std::{cmp::Ordering, fmt, str::FromStr};

/// Errors raised while parsing a [`U256`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UintError {
    #[error("number cannot be empty")]
    Empty,
    #[error("invalid digit {0:?}")]
    InvalidDigit(char),
    #[error("number does not fit in 256 bits")]
    Overflow,
}

/// A 256-bit unsigned integer stored as four little-endian `u64` limbs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct U256([u64; 4]);

impl U256 {
    pub const ZERO: U256 = U256([0; 4]);
    pub const MAX: U256 = U256([u64::MAX; 4]);

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let start = 32 - (i + 1) * 8;
            let mut word = [0u8; 8];
            word.copy_from_slice(&bytes[start..start + 8]);
            *limb = u64::from_be_bytes(word);
        }
        Self(limbs)
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, limb) in self.0.iter().enumerate() {
            let start = 32 - (i + 1) * 8;
            out[start..start + 8].copy_from_slice(&limb.to_be_bytes());
        }
        out
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&limb| limb == 0)
    }

    /// Returns the value as `u64` if it fits.
    pub fn as_u64(&self) -> Option<u64> {
        if self.0[1..].iter().all(|&limb| limb == 0) {
            Some(self.0[0])
        } else {
            None
        }
    }

    /// Parses a base-10 string such as a patient ID typed into a form.
    pub fn from_dec_str(input: &str) -> Result<Self, UintError> {
        Self::parse_radix(input, 10)
    }

    /// Parses a `0x`-prefixed hex quantity as returned by JSON-RPC.
    pub fn from_hex_str(input: &str) -> Result<Self, UintError> {
        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);
        Self::parse_radix(digits, 16)
    }

    /// Minimal `0x` hex form (`0x0` for zero), the JSON-RPC quantity encoding.
    pub fn to_quantity(&self) -> String {
        let hex: String = self
            .to_be_bytes()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        let trimmed = hex.trim_start_matches('0');
        if trimmed.is_empty() {
            "0x0".to_string()
        } else {
            format!("0x{}", trimmed)
        }
    }

    fn parse_radix(input: &str, radix: u32) -> Result<Self, UintError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(UintError::Empty);
        }

        let mut value = U256::ZERO;
        for c in input.chars() {
            let digit = c.to_digit(radix).ok_or(UintError::InvalidDigit(c))?;
            let carry = value.mul_add_small(u64::from(radix), u64::from(digit));
            if carry != 0 {
                return Err(UintError::Overflow);
            }
        }
        Ok(value)
    }

    /// `self = self * mul + add`, returning the carry out of the top limb.
    fn mul_add_small(&mut self, mul: u64, add: u64) -> u64 {
        let mut carry = u128::from(add);
        for limb in self.0.iter_mut() {
            let wide = u128::from(*limb) * u128::from(mul) + carry;
            *limb = wide as u64;
            carry = wide >> 64;
        }
        carry as u64
    }

    /// `self = self / div`, returning the remainder.
    fn div_rem_small(&mut self, div: u64) -> u64 {
        let mut rem = 0u128;
        for limb in self.0.iter_mut().rev() {
            let wide = (rem << 64) | u128::from(*limb);
            *limb = (wide / u128::from(div)) as u64;
            rem = wide % u128::from(div);
        }
        rem as u64
    }

    /// Returns `self + 1`, or `None` on overflow.
    pub fn checked_inc(&self) -> Option<Self> {
        let mut out = *self;
        for limb in out.0.iter_mut() {
            let (next, overflow) = limb.overflowing_add(1);
            *limb = next;
            if !overflow {
                return Some(out);
            }
        }
        None
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<u64> for U256 {
    fn from(value: u64) -> Self {
        Self([value, 0, 0, 0])
    }
}

impl From<u128> for U256 {
    fn from(value: u128) -> Self {
        Self([value as u64, (value >> 64) as u64, 0, 0])
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }

        let mut value = *self;
        let mut digits = Vec::with_capacity(78);
        while !value.is_zero() {
            let rem = value.div_rem_small(10);
            digits.push(b'0' + rem as u8);
        }
        digits.reverse();
        // Digits are ASCII by construction.
        f.write_str(&String::from_utf8_lossy(&digits))
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U256({})", self)
    }
}

impl FromStr for U256 {
    type Err = UintError;

    /// Accepts decimal, or hex when prefixed with `0x`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("0x") || s.starts_with("0X") {
            U256::from_hex_str(s)
        } else {
            U256::from_dec_str(s)
        }
    }
}

impl serde::Serialize for U256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for U256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(U256::from(n)),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
