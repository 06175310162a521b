//! Guard conditions parsed from config strings.
//!
//! Two kinds of textual guard are attached to a strategy run:
//!
//! - stop condition `"asset;comparison;value"`: compared against the live
//!   tradable balance of the asset; when it holds, the run stops.
//! - trigger condition `"exchange;pair;direction;value"`: compared against
//!   a reference book price on the named venue; orders are sent only while
//!   it holds.
//!
//! Blank input disables a condition. Malformed non-blank input is rejected
//! at parse time and surfaces as a configuration error.

use crate::decimal::Price;
use crate::error::{CoreError, CoreResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Standard ordering operator used by the condition grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

impl Comparison {
    pub fn compare(&self, lhs: Decimal, rhs: Decimal) -> bool {
        match self {
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Eq => lhs == rhs,
        }
    }
}

impl FromStr for Comparison {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gt" => Ok(Self::Gt),
            "ge" => Ok(Self::Ge),
            "lt" => Ok(Self::Lt),
            "le" => Ok(Self::Le),
            "eq" => Ok(Self::Eq),
            other => Err(CoreError::InvalidCondition {
                input: other.to_string(),
                reason: "unknown comparison (expected gt/ge/lt/le/eq)".to_string(),
            }),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Eq => "eq",
        };
        write!(f, "{s}")
    }
}

/// Balance-based stop: `"asset;comparison;value"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopCondition {
    pub asset: String,
    pub comparison: Comparison,
    pub value: Decimal,
}

impl StopCondition {
    /// Parse the stop grammar. Blank input means the check is disabled.
    pub fn parse(input: &str) -> CoreResult<Option<Self>> {
        if input.trim().is_empty() {
            return Ok(None);
        }
        let parts: Vec<&str> = input.split(';').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(CoreError::InvalidCondition {
                input: input.to_string(),
                reason: format!("expected 3 ';'-separated parts, got {}", parts.len()),
            });
        }
        let comparison = parts[1].parse()?;
        let value = parts[2]
            .parse::<Decimal>()
            .map_err(|e| CoreError::InvalidCondition {
                input: input.to_string(),
                reason: format!("bad value: {e}"),
            })?;
        Ok(Some(Self {
            asset: parts[0].to_string(),
            comparison,
            value,
        }))
    }

    /// True when the stop holds against the asset's tradable balance.
    pub fn is_met(&self, tradable_balance: Decimal) -> bool {
        self.comparison.compare(tradable_balance, self.value)
    }
}

impl fmt::Display for StopCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};{}", self.asset, self.comparison, self.value)
    }
}

/// Reference-price trigger: `"exchange;pair;direction;value"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerCondition {
    pub venue: String,
    pub pair: String,
    pub direction: Comparison,
    pub value: Decimal,
}

impl TriggerCondition {
    /// Parse the trigger grammar. Blank input means the check is disabled.
    pub fn parse(input: &str) -> CoreResult<Option<Self>> {
        if input.trim().is_empty() {
            return Ok(None);
        }
        let parts: Vec<&str> = input.split(';').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(CoreError::InvalidCondition {
                input: input.to_string(),
                reason: format!("expected 4 ';'-separated parts, got {}", parts.len()),
            });
        }
        let direction = parts[2].parse()?;
        let value = parts[3]
            .parse::<Decimal>()
            .map_err(|e| CoreError::InvalidCondition {
                input: input.to_string(),
                reason: format!("bad value: {e}"),
            })?;
        Ok(Some(Self {
            venue: parts[0].to_string(),
            pair: parts[1].to_string(),
            direction,
            value,
        }))
    }

    /// True when the reference price satisfies the trigger.
    pub fn is_satisfied(&self, reference_price: Price) -> bool {
        self.direction.compare(reference_price.inner(), self.value)
    }
}

impl fmt::Display for TriggerCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{}",
            self.venue, self.pair, self.direction, self.value
        )
    }
}
