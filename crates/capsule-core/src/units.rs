//! Fixed-point conversion between decimal BTC strings and smallest-unit values
//!
//! The deployed contract scales by 18 decimals, the precision of the chain's
//! native unit, which may not match the precision of the bridged asset. The
//! scale is therefore a parameter validated at configuration time.

use alloy_primitives::U256;

use crate::types::constants::MAX_DECIMALS;
use crate::{Error, ProtocolError};

/// Decimal scaling factor between display units and smallest units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitScale {
    decimals: u8,
}

impl UnitScale {
    pub fn new(decimals: u8) -> Result<Self, Error> {
        if decimals > MAX_DECIMALS {
            return Err(Error::Config(format!(
                "unit scale of {} decimals exceeds the supported maximum of {}",
                decimals, MAX_DECIMALS
            )));
        }
        Ok(Self { decimals })
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Smallest units per display unit (10^decimals)
    pub fn one(&self) -> U256 {
        let ten = U256::from(10u8);
        (0..self.decimals).fold(U256::from(1u8), |acc, _| acc * ten)
    }

    /// Convert a decimal string (e.g. "0.001") into smallest units.
    ///
    /// Fractional digits beyond the scale are accepted only if they are zeros.
    pub fn parse_amount(&self, input: &str) -> Result<U256, ProtocolError> {
        let (int_part, frac_part) = split_decimal(input)?;

        let frac_digits = frac_part.trim_end_matches('0');
        if frac_digits.len() > self.decimals as usize {
            return Err(ProtocolError::InvalidAmount {
                message: format!(
                    "{} has more than {} decimal places",
                    input.trim(),
                    self.decimals
                ),
            });
        }

        let whole = parse_digits(int_part, input)?;
        let padded = format!("{:0<width$}", frac_digits, width = self.decimals as usize);
        let fraction = parse_digits(&padded, input)?;

        whole
            .checked_mul(self.one())
            .and_then(|v| v.checked_add(fraction))
            .ok_or_else(|| ProtocolError::InvalidAmount {
                message: format!("{} is too large", input.trim()),
            })
    }

    /// Convert smallest units back into a display decimal string.
    ///
    /// Trailing fractional zeros are dropped; whole values carry no decimal point.
    pub fn format_amount(&self, value: U256) -> String {
        if self.decimals == 0 {
            return value.to_string();
        }
        let one = self.one();
        let whole = value / one;
        let fraction = value % one;
        if fraction.is_zero() {
            return whole.to_string();
        }
        let frac_str = format!(
            "{:0>width$}",
            fraction.to_string(),
            width = self.decimals as usize
        );
        format!("{}.{}", whole, frac_str.trim_end_matches('0'))
    }
}

impl Default for UnitScale {
    fn default() -> Self {
        Self {
            decimals: crate::types::constants::DEFAULT_DECIMALS,
        }
    }
}

/// Canonical form of a decimal string: no leading integer zeros, no trailing
/// fractional zeros, no dangling point.
pub fn normalize_decimal(input: &str) -> Result<String, ProtocolError> {
    let (int_part, frac_part) = split_decimal(input)?;
    let int_trimmed = int_part.trim_start_matches('0');
    let int_norm = if int_trimmed.is_empty() { "0" } else { int_trimmed };
    let frac_norm = frac_part.trim_end_matches('0');
    if frac_norm.is_empty() {
        Ok(int_norm.to_string())
    } else {
        Ok(format!("{}.{}", int_norm, frac_norm))
    }
}

/// Amount validation applied to the creation form
#[derive(Debug, Clone)]
pub struct AmountRules {
    pub scale: UnitScale,
    /// Maximum fractional digits accepted from the user
    pub max_fraction_digits: u8,
    /// Inclusive lower bound in smallest units; `None` means strictly positive
    pub minimum: Option<U256>,
}

impl AmountRules {
    /// Validate and convert a user-entered amount
    pub fn validate(&self, input: &str) -> Result<U256, ProtocolError> {
        let (_, frac_part) = split_decimal(input)?;
        if frac_part.trim_end_matches('0').len() > self.max_fraction_digits as usize {
            return Err(ProtocolError::InvalidAmount {
                message: format!(
                    "at most {} decimal places are accepted",
                    self.max_fraction_digits
                ),
            });
        }

        let value = self.scale.parse_amount(input)?;
        if value.is_zero() {
            return Err(ProtocolError::InvalidAmount {
                message: "amount must be greater than zero".to_string(),
            });
        }
        if let Some(minimum) = self.minimum {
            if value < minimum {
                return Err(ProtocolError::InvalidAmount {
                    message: format!(
                        "amount must be at least {}",
                        self.scale.format_amount(minimum)
                    ),
                });
            }
        }
        Ok(value)
    }
}

/// Split a plain decimal string into integer and fractional digit runs
fn split_decimal(input: &str) -> Result<(&str, &str), ProtocolError> {
    let trimmed = input.trim();
    let invalid = || ProtocolError::InvalidAmount {
        message: format!("'{}' is not a decimal number", trimmed),
    };

    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (i, f),
        None => (trimmed, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    Ok((int_part, frac_part))
}

fn parse_digits(digits: &str, input: &str) -> Result<U256, ProtocolError> {
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    digits
        .parse::<U256>()
        .map_err(|_| ProtocolError::InvalidAmount {
            message: format!("{} is too large", input.trim()),
        })
}
