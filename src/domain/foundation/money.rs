//! Money value objects: integer minor-unit amounts and supported currencies.
//!
//! Amounts are always carried in the currency's smallest unit (cents,
//! fils, piastres) so no floating point ever touches money.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Charge amount in the currency's smallest unit. Strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// Creates an amount, rejecting zero and negative values.
    pub fn new(minor_units: i64) -> Result<Self, ValidationError> {
        if minor_units <= 0 {
            return Err(ValidationError::not_positive("amount_minor", minor_units));
        }
        Ok(Self(minor_units))
    }

    /// Returns the amount in minor units.
    pub fn minor_units(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supported settlement currencies.
///
/// A closed set: checkout creation rejects anything else up front, so
/// every stored row carries a currency the gateways can actually charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Aed,
    Sar,
    Jod,
    Kwd,
    Bhd,
}

impl Currency {
    /// ISO 4217 alphabetic code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Aed => "AED",
            Currency::Sar => "SAR",
            Currency::Jod => "JOD",
            Currency::Kwd => "KWD",
            Currency::Bhd => "BHD",
        }
    }

    /// Number of minor-unit digits per ISO 4217.
    ///
    /// JOD, KWD, and BHD subdivide into 1000 fils.
    pub fn minor_digits(&self) -> u32 {
        match self {
            Currency::Jod | Currency::Kwd | Currency::Bhd => 3,
            _ => 2,
        }
    }

    /// Case-insensitive match against a reported currency code.
    pub fn matches_code(&self, code: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(code.trim())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "AED" => Ok(Currency::Aed),
            "SAR" => Ok(Currency::Sar),
            "JOD" => Ok(Currency::Jod),
            "KWD" => Ok(Currency::Kwd),
            "BHD" => Ok(Currency::Bhd),
            other => Err(ValidationError::invalid_format(
                "currency",
                format!("Unsupported ISO code: {}", other),
            )),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
