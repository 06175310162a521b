//! Strategy configuration: raw wire form and validated form.
//!
//! `RawStrategyConfig` is what arrives from files or operators, with every
//! field defaulted. `StrategyConfig` is the only form the engine accepts
//! and is produced exclusively by [`StrategyConfig::validate`]; a raw
//! config that fails validation never half-applies.

use crate::condition::{StopCondition, TriggerCondition};
use crate::decimal::{Price, Size};
use crate::error::{CoreError, CoreResult};
use crate::order::Side;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Which pacing regime drives the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyMode {
    /// Fixed quantity over a fixed duration.
    #[default]
    Twap,
    /// Quantity re-targeted each burst from observed volume.
    Pov,
}

/// Default post frequency when the config leaves it unset, per mode.
pub const DEFAULT_POST_FREQUENCY_TWAP_SECS: u64 = 10;
pub const DEFAULT_POST_FREQUENCY_POV_SECS: u64 = 5;

fn default_threshold_price() -> Decimal {
    dec!(-1)
}

fn default_max_slice_multiplier() -> Decimal {
    dec!(5)
}

fn default_condition() -> String {
    " ".to_string()
}

fn default_percentage_of_volume() -> Decimal {
    dec!(7.0)
}

fn default_kline_data_duration() -> u64 {
    1
}

/// Operator-supplied strategy parameters, unvalidated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStrategyConfig {
    /// "BUY" or "SELL".
    pub side: String,
    /// Parent order quantity in base units.
    pub quantity: Decimal,
    /// Run duration in seconds (TWAP only).
    #[serde(default)]
    pub duration: u64,
    /// Price limit; negative disables.
    #[serde(default = "default_threshold_price")]
    pub threshold_price: Decimal,
    /// Pacing floor in seconds; unset resolves to 10s (TWAP) / 5s (POV).
    #[serde(default)]
    pub default_post_frequency: Option<u64>,
    /// Opaque annotation forwarded on every child order.
    #[serde(default)]
    pub remark: String,
    /// Hard cap on one slice relative to the planned slice size.
    #[serde(default = "default_max_slice_multiplier")]
    pub max_slice_size_multiplier: Decimal,
    /// "exchange;pair;direction;value", blank disables.
    #[serde(default = "default_condition")]
    pub trigger_condition: String,
    /// "asset;comparison;value", blank disables.
    #[serde(default = "default_condition")]
    pub stop_condition: String,
    /// Participation percentage (POV only).
    #[serde(default = "default_percentage_of_volume")]
    pub percentage_of_volume: Decimal,
    /// Volume-candle interval in minutes (POV only).
    #[serde(default = "default_kline_data_duration")]
    pub kline_data_duration: u64,
}

impl Default for RawStrategyConfig {
    fn default() -> Self {
        Self {
            side: "BUY".to_string(),
            quantity: Decimal::ZERO,
            duration: 0,
            threshold_price: default_threshold_price(),
            default_post_frequency: None,
            remark: String::new(),
            max_slice_size_multiplier: default_max_slice_multiplier(),
            trigger_condition: default_condition(),
            stop_condition: default_condition(),
            percentage_of_volume: default_percentage_of_volume(),
            kline_data_duration: default_kline_data_duration(),
        }
    }
}

/// Validated, immutable-per-run strategy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub side: Side,
    pub total_quantity: Size,
    /// Run duration in milliseconds.
    pub total_duration_ms: u64,
    /// BUY ceiling / SELL floor; `None` when disabled.
    pub threshold_price: Option<Price>,
    /// Pacing floor in milliseconds.
    pub default_post_frequency_ms: u64,
    pub remark: String,
    pub max_slice_size_multiplier: Decimal,
    pub trigger_condition: Option<TriggerCondition>,
    pub stop_condition: Option<StopCondition>,
    pub percentage_of_volume: Decimal,
    pub kline_interval_ms: u64,
}

impl StrategyConfig {
    /// Validate a raw config for the given mode.
    ///
    /// All checks run against the input alone; quantity-versus-instrument
    /// minimums are live data and stay with the scheduler tick.
    pub fn validate(raw: &RawStrategyConfig, mode: StrategyMode) -> CoreResult<Self> {
        let side: Side = raw.side.parse()?;

        if raw.quantity <= Decimal::ZERO {
            return Err(CoreError::InvalidConfig(format!(
                "quantity must be positive, got {}",
                raw.quantity
            )));
        }

        if mode == StrategyMode::Twap && raw.duration == 0 {
            return Err(CoreError::InvalidConfig(
                "duration must be positive for a time-paced run".to_string(),
            ));
        }

        if raw.max_slice_size_multiplier < Decimal::ONE {
            return Err(CoreError::InvalidConfig(format!(
                "max_slice_size_multiplier must be >= 1, got {}",
                raw.max_slice_size_multiplier
            )));
        }

        if mode == StrategyMode::Pov {
            if raw.percentage_of_volume <= Decimal::ZERO
                || raw.percentage_of_volume > Decimal::ONE_HUNDRED
            {
                return Err(CoreError::InvalidConfig(format!(
                    "percentage_of_volume must be in (0, 100], got {}",
                    raw.percentage_of_volume
                )));
            }
            if raw.kline_data_duration == 0 {
                return Err(CoreError::InvalidConfig(
                    "kline_data_duration must be at least 1 minute".to_string(),
                ));
            }
        }

        let default_post_frequency = match raw.default_post_frequency {
            Some(0) => {
                return Err(CoreError::InvalidConfig(
                    "default_post_frequency must be positive".to_string(),
                ))
            }
            Some(secs) => secs,
            None => match mode {
                StrategyMode::Twap => DEFAULT_POST_FREQUENCY_TWAP_SECS,
                StrategyMode::Pov => DEFAULT_POST_FREQUENCY_POV_SECS,
            },
        };

        let threshold_price = if raw.threshold_price.is_sign_negative()
            || raw.threshold_price.is_zero()
        {
            None
        } else {
            Some(Price::new(raw.threshold_price))
        };

        // Malformed non-blank conditions are config errors, never silently
        // disabled checks.
        let trigger_condition = TriggerCondition::parse(&raw.trigger_condition)?;
        let stop_condition = StopCondition::parse(&raw.stop_condition)?;

        Ok(Self {
            side,
            total_quantity: Size::new(raw.quantity),
            total_duration_ms: raw.duration * 1_000,
            threshold_price,
            default_post_frequency_ms: default_post_frequency * 1_000,
            remark: raw.remark.clone(),
            max_slice_size_multiplier: raw.max_slice_size_multiplier,
            trigger_condition,
            stop_condition,
            percentage_of_volume: raw.percentage_of_volume,
            kline_interval_ms: raw.kline_data_duration * 60_000,
        })
    }

    /// Derive the config for one participation burst: same guards and
    /// annotations, burst-specific quantity and duration.
    pub fn for_burst(&self, target_quantity: Size, target_duration_ms: u64) -> Self {
        Self {
            total_quantity: target_quantity,
            total_duration_ms: target_duration_ms,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Comparison;

    fn raw() -> RawStrategyConfig {
        RawStrategyConfig {
            side: "BUY".to_string(),
            quantity: dec!(100),
            duration: 100,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_defaults() {
        let cfg = StrategyConfig::validate(&raw(), StrategyMode::Twap).unwrap();
        assert_eq!(cfg.side, Side::Buy);
        assert_eq!(cfg.total_quantity, Size::new(dec!(100)));
        assert_eq!(cfg.total_duration_ms, 100_000);
        assert_eq!(cfg.threshold_price, None);
        assert_eq!(cfg.default_post_frequency_ms, 10_000);
        assert_eq!(cfg.max_slice_size_multiplier, dec!(5));
        assert!(cfg.trigger_condition.is_none());
        assert!(cfg.stop_condition.is_none());
    }

    #[test]
    fn test_pov_frequency_default() {
        let mut r = raw();
        r.duration = 0;
        let cfg = StrategyConfig::validate(&r, StrategyMode::Pov).unwrap();
        assert_eq!(cfg.default_post_frequency_ms, 5_000);
        assert_eq!(cfg.kline_interval_ms, 60_000);
    }

    #[test]
    fn test_zero_duration_rejected_for_twap() {
        let mut r = raw();
        r.duration = 0;
        assert!(StrategyConfig::validate(&r, StrategyMode::Twap).is_err());
    }

    #[test]
    fn test_nonpositive_quantity_rejected() {
        let mut r = raw();
        r.quantity = dec!(0);
        assert!(StrategyConfig::validate(&r, StrategyMode::Twap).is_err());
        r.quantity = dec!(-5);
        assert!(StrategyConfig::validate(&r, StrategyMode::Twap).is_err());
    }

    #[test]
    fn test_threshold_negative_disables() {
        let mut r = raw();
        r.threshold_price = dec!(-1);
        let cfg = StrategyConfig::validate(&r, StrategyMode::Twap).unwrap();
        assert_eq!(cfg.threshold_price, None);

        r.threshold_price = dec!(30500.5);
        let cfg = StrategyConfig::validate(&r, StrategyMode::Twap).unwrap();
        assert_eq!(cfg.threshold_price, Some(Price::new(dec!(30500.5))));
    }

    #[test]
    fn test_conditions_parsed() {
        let mut r = raw();
        r.trigger_condition = "Binance;BTCUSDT;gt;30000".to_string();
        r.stop_condition = "USDT;lt;500".to_string();
        let cfg = StrategyConfig::validate(&r, StrategyMode::Twap).unwrap();

        let trigger = cfg.trigger_condition.unwrap();
        assert_eq!(trigger.venue, "Binance");
        assert_eq!(trigger.direction, Comparison::Gt);
        let stop = cfg.stop_condition.unwrap();
        assert_eq!(stop.asset, "USDT");
    }

    #[test]
    fn test_malformed_condition_fails_closed() {
        let mut r = raw();
        r.trigger_condition = "Binance;BTCUSDT;gt".to_string();
        assert!(StrategyConfig::validate(&r, StrategyMode::Twap).is_err());

        let mut r = raw();
        r.stop_condition = "USDT;!!;500".to_string();
        assert!(StrategyConfig::validate(&r, StrategyMode::Twap).is_err());
    }

    #[test]
    fn test_pov_percentage_bounds() {
        let mut r = raw();
        r.duration = 0;
        r.percentage_of_volume = dec!(0);
        assert!(StrategyConfig::validate(&r, StrategyMode::Pov).is_err());
        r.percentage_of_volume = dec!(101);
        assert!(StrategyConfig::validate(&r, StrategyMode::Pov).is_err());
        r.percentage_of_volume = dec!(7);
        assert!(StrategyConfig::validate(&r, StrategyMode::Pov).is_ok());
    }

    #[test]
    fn test_for_burst_keeps_guards() {
        let mut r = raw();
        r.threshold_price = dec!(31000);
        r.trigger_condition = "Binance;BTCUSDT;gt;30000".to_string();
        let parent = StrategyConfig::validate(&r, StrategyMode::Pov).unwrap();

        let burst = parent.for_burst(Size::new(dec!(12.5)), 42_000);
        assert_eq!(burst.total_quantity, Size::new(dec!(12.5)));
        assert_eq!(burst.total_duration_ms, 42_000);
        assert_eq!(burst.threshold_price, parent.threshold_price);
        assert_eq!(burst.trigger_condition, parent.trigger_condition);
        assert_eq!(burst.remark, parent.remark);
    }

    #[test]
    fn test_raw_config_toml_defaults() {
        // Only the required fields supplied; everything else defaults.
        let raw: RawStrategyConfig =
            toml::from_str("side = \"SELL\"\nquantity = \"25\"\nduration = 600\n").unwrap();
        assert_eq!(raw.threshold_price, dec!(-1));
        assert_eq!(raw.max_slice_size_multiplier, dec!(5));
        assert_eq!(raw.trigger_condition, " ");
        assert_eq!(raw.stop_condition, " ");
        assert_eq!(raw.percentage_of_volume, dec!(7.0));
        assert_eq!(raw.kline_data_duration, 1);
        assert!(raw.default_post_frequency.is_none());
    }
}
