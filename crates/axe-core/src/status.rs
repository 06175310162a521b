//! Execution state machine statuses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one scheduler tick, also the scheduler's resting state.
///
/// `StrategyCompleted` is the only fully terminal status: every other value
/// is re-evaluated on the next tick. `Error` is sticky in practice because
/// it clears only when a replacement config validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulerStatus {
    Waiting,
    OrderSubmitted,
    OrderCancelled,
    StrategyCompleted,
    Error,
    NotEnoughBalance,
    OrderFailed,
    ThresholdPriceBreach,
    MaxOrderSizeBreach,
    TriggerConditionBreach,
    StopConditionMet,
}

impl SchedulerStatus {
    /// No further submissions will ever happen.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::StrategyCompleted)
    }

    /// A risk-limit verdict: reported, never retried within the tick.
    pub fn is_breach(&self) -> bool {
        matches!(
            self,
            Self::ThresholdPriceBreach
                | Self::MaxOrderSizeBreach
                | Self::TriggerConditionBreach
                | Self::StopConditionMet
        )
    }

    /// Transient statuses the driver should simply keep ticking through.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Waiting | Self::OrderSubmitted | Self::OrderCancelled | Self::NotEnoughBalance
        )
    }
}

impl Default for SchedulerStatus {
    fn default() -> Self {
        Self::Waiting
    }
}

impl fmt::Display for SchedulerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Waiting => "WAITING",
            Self::OrderSubmitted => "ORDER_SUBMITTED",
            Self::OrderCancelled => "ORDER_CANCELLED",
            Self::StrategyCompleted => "STRATEGY_COMPLETED",
            Self::Error => "ERROR",
            Self::NotEnoughBalance => "NOT_ENOUGH_BALANCE",
            Self::OrderFailed => "ORDER_FAILED",
            Self::ThresholdPriceBreach => "THRESHOLD_PRICE_BREACH",
            Self::MaxOrderSizeBreach => "MAX_ORDER_SIZE_BREACH",
            Self::TriggerConditionBreach => "TRIGGER_CONDITION_BREACH",
            Self::StopConditionMet => "STOP_CONDITION_MET",
        };
        write!(f, "{s}")
    }
}
