//! Account model: identity, margining mode, balance snapshots.

use crate::decimal::Size;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque account identifier, used as a cache and persistence key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How opposing positions are held on a derivatives account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PositionMode {
    /// One net position per instrument; an opposing order reduces first.
    #[default]
    Net,
    /// Long and short held and margined independently.
    Hedge,
}

/// Account type, driving the affordability formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Spot,
    Margin(PositionMode),
    Futures(PositionMode),
}

impl AccountKind {
    pub fn is_spot(&self) -> bool {
        matches!(self, Self::Spot)
    }

    /// Position mode for leveraged accounts, `None` for spot.
    pub fn position_mode(&self) -> Option<PositionMode> {
        match self {
            Self::Spot => None,
            Self::Margin(m) | Self::Futures(m) => Some(*m),
        }
    }
}

/// One asset's balance on the account.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct AssetBalance {
    /// Tradable (free) amount.
    pub free: Decimal,
    /// Locked in open orders.
    pub locked: Decimal,
}

/// Point-in-time account balance view supplied by the venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BalanceSnapshot {
    /// Per-asset balances, keyed by asset symbol.
    pub assets: HashMap<String, AssetBalance>,
    /// Free collateral for leveraged accounts (quote units).
    pub buying_power: Decimal,
    /// Account leverage multiple (>= 1 on leveraged accounts).
    pub leverage: Decimal,
    /// Existing long position quantity in the traded instrument.
    pub long_qty: Size,
    /// Existing short position quantity in the traded instrument.
    pub short_qty: Size,
    /// When the venue produced this view (Unix ms).
    pub fetched_at_ms: u64,
}

impl BalanceSnapshot {
    /// Tradable balance of one asset; zero when the asset is absent.
    pub fn free(&self, asset: &str) -> Decimal {
        self.assets.get(asset).map(|b| b.free).unwrap_or_default()
    }
}
