//! Application configuration.
//!
//! One TOML file describes a whole run: the strategy parameters, the
//! account, the engine cadences, persistence, and the seed data for the
//! in-process paper venue. Every field has a serde default so a minimal
//! file (side + quantity) is enough for a dry run.

use crate::error::{AppError, AppResult};
use axe_core::{
    AccountKind, InstrumentLimits, PositionMode, Price, RawStrategyConfig, Size, StrategyMode,
};
use axe_engine::SchedulerSettings;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Account the strategy trades on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSection {
    /// Account identifier used for balance lookups and snapshots.
    #[serde(default = "default_account_id")]
    pub id: String,
    /// "spot", "margin" or "futures".
    #[serde(default = "default_account_kind")]
    pub kind: String,
    /// "net" or "hedge"; ignored for spot accounts.
    #[serde(default)]
    pub position_mode: PositionMode,
}

fn default_account_id() -> String {
    "paper-account".to_string()
}

fn default_account_kind() -> String {
    "spot".to_string()
}

impl Default for AccountSection {
    fn default() -> Self {
        Self {
            id: default_account_id(),
            kind: default_account_kind(),
            position_mode: PositionMode::default(),
        }
    }
}

impl AccountSection {
    /// Resolve the configured kind string into the domain type.
    pub fn account_kind(&self) -> AppResult<AccountKind> {
        match self.kind.to_ascii_lowercase().as_str() {
            "spot" => Ok(AccountKind::Spot),
            "margin" => Ok(AccountKind::Margin(self.position_mode)),
            "futures" => Ok(AccountKind::Futures(self.position_mode)),
            other => Err(AppError::Config(format!(
                "Unknown account kind {other:?}, expected spot, margin or futures"
            ))),
        }
    }
}

/// Snapshot store and dead-man-switch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceSection {
    /// Root directory for the file store.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Namespace (subdirectory) holding this run's keys.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Heartbeat timeout (ms). A reader treats a missed deadline as hung.
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_namespace() -> String {
    "axe-run".to_string()
}

fn default_heartbeat_timeout_ms() -> u64 {
    30_000
}

impl Default for PersistenceSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            namespace: default_namespace(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
        }
    }
}

/// Venue constraints for the traded instrument.
///
/// Mirrors `InstrumentLimits` with per-field defaults so partial TOML
/// sections stay valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentSection {
    #[serde(default = "default_base")]
    pub base: String,
    #[serde(default = "default_quote")]
    pub quote: String,
    #[serde(default = "default_price_tick")]
    pub price_tick: Decimal,
    #[serde(default = "default_size_step")]
    pub size_step: Decimal,
    #[serde(default = "default_min_order_size")]
    pub min_order_size: Decimal,
    #[serde(default)]
    pub min_notional: Decimal,
}

fn default_base() -> String {
    "BTC".to_string()
}

fn default_quote() -> String {
    "USDT".to_string()
}

fn default_price_tick() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_size_step() -> Decimal {
    Decimal::new(1, 3) // 0.001
}

fn default_min_order_size() -> Decimal {
    Decimal::new(1, 3) // 0.001
}

impl Default for InstrumentSection {
    fn default() -> Self {
        Self {
            base: default_base(),
            quote: default_quote(),
            price_tick: default_price_tick(),
            size_step: default_size_step(),
            min_order_size: default_min_order_size(),
            min_notional: Decimal::ZERO,
        }
    }
}

impl InstrumentSection {
    /// Build the venue limits record for `symbol`.
    pub fn to_limits(&self, symbol: &str) -> InstrumentLimits {
        InstrumentLimits {
            symbol: symbol.to_string(),
            base: self.base.clone(),
            quote: self.quote.clone(),
            price_tick: Price::new(self.price_tick),
            size_step: Size::new(self.size_step),
            min_order_size: Size::new(self.min_order_size),
            min_notional: self.min_notional,
        }
    }
}

/// Seed data for the in-process paper venue.
///
/// The supervisor re-stamps the book at the current time each loop
/// iteration, standing in for a live feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperSection {
    /// Venue label reported by the paper exchange.
    #[serde(default = "default_venue")]
    pub venue: String,
    #[serde(default = "default_bid_price")]
    pub bid_price: Decimal,
    #[serde(default = "default_ask_price")]
    pub ask_price: Decimal,
    /// Resting size on each side of the book.
    #[serde(default = "default_depth")]
    pub depth: Decimal,
    /// Free quote-asset balance seeded on the account.
    #[serde(default = "default_quote_balance")]
    pub quote_balance: Decimal,
    /// Free base-asset balance seeded on the account (for SELL runs).
    #[serde(default)]
    pub base_balance: Decimal,
    /// Free collateral for margin/futures accounts.
    #[serde(default)]
    pub buying_power: Decimal,
    #[serde(default = "default_leverage")]
    pub leverage: Decimal,
    /// Fraction of each placed order filled immediately; 0 disables.
    #[serde(default)]
    pub auto_fill: Decimal,
    /// Base volume per candle reported to POV retargeting.
    #[serde(default = "default_kline_volume")]
    pub kline_volume: Decimal,
}

fn default_venue() -> String {
    "PAPER".to_string()
}

fn default_bid_price() -> Decimal {
    Decimal::new(100, 0)
}

fn default_ask_price() -> Decimal {
    Decimal::new(10001, 2) // 100.01
}

fn default_depth() -> Decimal {
    Decimal::new(1_000, 0)
}

fn default_quote_balance() -> Decimal {
    Decimal::new(1_000_000, 0)
}

fn default_leverage() -> Decimal {
    Decimal::ONE
}

fn default_kline_volume() -> Decimal {
    Decimal::new(500, 0)
}

impl Default for PaperSection {
    fn default() -> Self {
        Self {
            venue: default_venue(),
            bid_price: default_bid_price(),
            ask_price: default_ask_price(),
            depth: default_depth(),
            quote_balance: default_quote_balance(),
            base_balance: Decimal::ZERO,
            buying_power: Decimal::ZERO,
            leverage: default_leverage(),
            auto_fill: Decimal::ZERO,
            kline_volume: default_kline_volume(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pacing regime: "twap" or "pov".
    #[serde(default)]
    pub mode: StrategyMode,
    /// Traded pair symbol.
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default)]
    pub account: AccountSection,
    /// Parent-order parameters, validated at startup.
    #[serde(default)]
    pub strategy: RawStrategyConfig,
    /// Engine cadences and freshness windows.
    #[serde(default)]
    pub engine: SchedulerSettings,
    #[serde(default)]
    pub persistence: PersistenceSection,
    #[serde(default)]
    pub instrument: InstrumentSection,
    #[serde(default)]
    pub paper: PaperSection,
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: StrategyMode::default(),
            symbol: default_symbol(),
            account: AccountSection::default(),
            strategy: RawStrategyConfig::default(),
            engine: SchedulerSettings::default(),
            persistence: PersistenceSection::default(),
            instrument: InstrumentSection::default(),
            paper: PaperSection::default(),
        }
    }
}

impl AppConfig {
    /// Load from `AXE_CONFIG` or the default path, falling back to
    /// defaults when no file exists.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var("AXE_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minimal_config_parses_with_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [strategy]
            side = "BUY"
            quantity = "10"
            duration = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, StrategyMode::Twap);
        assert_eq!(config.symbol, "BTCUSDT");
        assert_eq!(config.strategy.quantity, dec!(10));
        assert_eq!(config.account.id, "paper-account");
        assert_eq!(config.persistence.namespace, "axe-run");
        assert_eq!(config.paper.bid_price, dec!(100));
        assert_eq!(config.instrument.size_step, dec!(0.001));
    }

    #[test]
    fn test_full_config_overrides_every_section() {
        let config: AppConfig = toml::from_str(
            r#"
            mode = "pov"
            symbol = "ETHUSDT"

            [account]
            id = "desk-7"
            kind = "futures"
            position_mode = "hedge"

            [strategy]
            side = "SELL"
            quantity = "250"
            percentage_of_volume = "12"
            kline_data_duration = 5

            [engine]
            limits_refresh_interval_ms = 15000

            [persistence]
            data_dir = "/var/lib/axe"
            namespace = "eth-sell"
            heartbeat_timeout_ms = 10000

            [instrument]
            base = "ETH"
            quote = "USDT"
            price_tick = "0.01"
            size_step = "0.0001"
            min_order_size = "0.01"

            [paper]
            bid_price = "2000"
            ask_price = "2000.5"
            base_balance = "300"
            auto_fill = "0.5"
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, StrategyMode::Pov);
        assert_eq!(
            config.account.account_kind().unwrap(),
            AccountKind::Futures(PositionMode::Hedge)
        );
        assert_eq!(config.strategy.percentage_of_volume, dec!(12));
        assert_eq!(config.engine.limits_refresh_interval_ms, 15_000);
        assert_eq!(config.persistence.heartbeat_timeout_ms, 10_000);
        assert_eq!(config.paper.auto_fill, dec!(0.5));

        let limits = config.instrument.to_limits(&config.symbol);
        assert_eq!(limits.symbol, "ETHUSDT");
        assert_eq!(limits.size_step, Size::new(dec!(0.0001)));
    }

    #[test]
    fn test_unknown_account_kind_is_rejected() {
        let section = AccountSection {
            kind: "options".to_string(),
            ..AccountSection::default()
        };
        let err = section.account_kind().unwrap_err();
        assert!(err.to_string().contains("options"));
    }

    #[test]
    fn test_account_kind_is_case_insensitive() {
        let section = AccountSection {
            kind: "MARGIN".to_string(),
            ..AccountSection::default()
        };
        assert_eq!(
            section.account_kind().unwrap(),
            AccountKind::Margin(PositionMode::Net)
        );
    }

    #[test]
    fn test_from_file_reports_missing_path() {
        let err = AppConfig::from_file("/nonexistent/axe.toml").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
