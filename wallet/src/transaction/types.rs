//! Core value types for wallet transactions.
//!
//! [`Amount`] wraps an arbitrary-precision decimal that can never be
//! negative, and [`TransactionHash`] is the 32-byte content identifier
//! assigned at signing time.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::MAX_AMOUNT_SCALE;

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// Errors raised while parsing or constructing an [`Amount`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,

    #[error("amount '{input}' is not a decimal number")]
    NotANumber { input: String },

    #[error("amount must not be negative, got {0}")]
    Negative(Decimal),

    #[error("amount has {scale} fractional digits, at most {max} allowed")]
    TooPrecise { scale: u32, max: u32 },
}

/// A non-negative transfer amount.
///
/// Serialized as a decimal string (`"10.5"`) in every format, so no
/// precision is lost and the scale survives a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wraps a decimal, rejecting negative values and excess precision.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::Negative(value));
        }
        if value.scale() > MAX_AMOUNT_SCALE {
            return Err(AmountError::TooPrecise {
                scale: value.scale(),
                max: MAX_AMOUNT_SCALE,
            });
        }
        // "-0" compares equal to zero but keeps its sign bit.
        Ok(Self(value.abs()))
    }

    pub const fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_amount(&s).map_err(serde::de::Error::custom)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_amount(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses the inbound amount string of a transfer request.
///
/// Accepts plain decimal notation (`"10"`, `"10.5"`, `"0.000001"`). Rejects
/// empty input, anything `Decimal` cannot parse (including `NaN` and
/// `inf`), negative values, and more than 18 fractional digits.
pub fn parse_amount(input: &str) -> Result<Amount, AmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    if let Some((_, fraction)) = trimmed.split_once('.') {
        let digits = fraction.chars().filter(|c| c.is_ascii_digit()).count() as u32;
        if digits > MAX_AMOUNT_SCALE {
            return Err(AmountError::TooPrecise {
                scale: digits,
                max: MAX_AMOUNT_SCALE,
            });
        }
    }

    let value = Decimal::from_str(trimmed).map_err(|_| AmountError::NotANumber {
        input: trimmed.to_string(),
    })?;
    Amount::new(value)
}

// ---------------------------------------------------------------------------
// TransactionHash
// ---------------------------------------------------------------------------

/// Errors raised while parsing a transaction hash from hex.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashParseError {
    #[error("transaction hash is not valid hex")]
    InvalidHex,

    #[error("transaction hash must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Content identifier of a signed transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionHash([u8; 32]);

impl TransactionHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for TransactionHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(s.trim()).map_err(|_| HashParseError::InvalidHex)?;
        let bytes: [u8; 32] = raw
            .as_slice()
            .try_into()
            .map_err(|_| HashParseError::InvalidLength(raw.len()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionHash({})", self.to_hex())
    }
}

impl Serialize for TransactionHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for TransactionHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            <[u8; 32]>::deserialize(deserializer).map(Self)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
