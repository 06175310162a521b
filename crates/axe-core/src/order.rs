//! Order vocabulary: side, identifiers, child-order lifecycle.

use crate::decimal::{Price, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns 1 for buy, -1 for sell (for position calculations).
    pub fn sign(&self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            other => Err(crate::error::CoreError::InvalidConfig(format!(
                "unknown side '{other}'"
            ))),
        }
    }
}

/// Child-order identifier.
///
/// Every submission carries a unique id so retries can never be mistaken
/// for new orders by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Create a new unique order id.
    ///
    /// Format: `axe_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = chrono::Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("axe_{ts}_{uuid_short}"))
    }

    /// Create from an existing string (venue-assigned ids, snapshots).
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Child-order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Submitted, acceptance not yet confirmed.
    Sending,
    /// Resting on the book (possibly partially filled).
    Open,
    /// Fully filled.
    Completed,
    /// Cancelled with a possible partial fill.
    Canceled,
    /// Rejected or errored at the venue.
    Failed,
}

impl OrderStatus {
    /// Terminal statuses will never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Failed)
    }

    /// Still live at the venue.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Sending | Self::Open)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sending => "SENDING",
            Self::Open => "OPEN",
            Self::Completed => "COMPLETED",
            Self::Canceled => "CANCELED",
            Self::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

/// One slice of the parent order.
///
/// Owned by the order-state tracker; the scheduler keeps only the id and
/// requested quantity of its most recent submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildOrder {
    pub id: OrderId,
    pub side: Side,
    /// Requested limit price.
    pub price: Price,
    /// Requested quantity.
    pub size: Size,
    /// Cumulative filled quantity.
    pub dealt: Size,
    /// Cumulative filled notional in quote units, as reported by the venue.
    #[serde(default)]
    pub dealt_notional: rust_decimal::Decimal,
    pub status: OrderStatus,
    pub created_at_ms: u64,
    /// Opaque annotation forwarded from the strategy config.
    pub remark: String,
}

impl ChildOrder {
    pub fn new(
        id: OrderId,
        side: Side,
        price: Price,
        size: Size,
        created_at_ms: u64,
        remark: String,
    ) -> Self {
        Self {
            id,
            side,
            price,
            size,
            dealt: Size::ZERO,
            dealt_notional: rust_decimal::Decimal::ZERO,
            status: OrderStatus::Sending,
            created_at_ms,
            remark,
        }
    }

    /// Unfilled remainder of the requested quantity.
    pub fn outstanding(&self) -> Size {
        self.size.saturating_sub(self.dealt)
    }
}
