//! Run-loop supervisor.
//!
//! Wires the paper venue, the snapshot store and the execution core for
//! the configured mode, then drives it at roughly one tick per second
//! until the parent order completes or a shutdown is requested. Each
//! iteration also refreshes the dead-man heartbeat and writes the
//! progress snapshots.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axe_core::{
    AccountId, AssetBalance, BalanceSnapshot, BookTop, Kline, Price, SchedulerStatus, Size,
    StrategyConfig, StrategyMode,
};
use axe_engine::{ExecutionScheduler, InMemoryOrderTracker, LimitsCache, ParticipationController};
use axe_exchange::{DynExchangeClient, PaperExchange};
use axe_persistence::{read_heartbeat, FileStore, Heartbeat, ProgressSnapshot, SnapshotStore};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::flags::RunFlags;

/// Supervisor cadence.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// The mode-selected execution core.
enum Runner {
    Twap(ExecutionScheduler),
    Pov(ParticipationController),
}

impl Runner {
    async fn open(&mut self, now_ms: u64) -> AppResult<()> {
        match self {
            Self::Twap(scheduler) => scheduler.open(now_ms).await?,
            Self::Pov(controller) => controller.open(now_ms).await?,
        }
        Ok(())
    }

    async fn step(&mut self, now_ms: u64) -> SchedulerStatus {
        match self {
            Self::Twap(scheduler) => scheduler.tick(now_ms).await,
            Self::Pov(controller) => controller.poll(now_ms).await,
        }
    }

    async fn close(&mut self, now_ms: u64) {
        match self {
            Self::Twap(scheduler) => scheduler.close(now_ms).await,
            Self::Pov(controller) => controller.close(now_ms).await,
        }
    }

    fn is_complete(&self) -> bool {
        match self {
            Self::Twap(scheduler) => scheduler.status().is_completed(),
            Self::Pov(controller) => controller.is_complete(),
        }
    }

    fn dealt_total(&self) -> Size {
        match self {
            Self::Twap(scheduler) => scheduler.dealt_total(),
            Self::Pov(controller) => controller.dealt_total(),
        }
    }

    fn progress(&self, now_ms: u64) -> ProgressSnapshot {
        match self {
            Self::Twap(scheduler) => scheduler.progress_snapshot(now_ms),
            Self::Pov(controller) => controller.progress_snapshot(now_ms),
        }
    }

    fn write_snapshots(&self, now_ms: u64) {
        match self {
            Self::Twap(scheduler) => scheduler.write_snapshots(now_ms),
            Self::Pov(controller) => controller.write_snapshots(now_ms),
        }
    }
}

pub struct Application {
    config: AppConfig,
    strategy: StrategyConfig,
    venue: Arc<PaperExchange>,
    store: Arc<dyn SnapshotStore>,
    heartbeat: Heartbeat,
    flags: Arc<RunFlags>,
    runner: Runner,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        // Validation first: a bad strategy section never opens a run.
        let strategy = StrategyConfig::validate(&config.strategy, config.mode)?;
        let account_kind = config.account.account_kind()?;
        let account = AccountId::new(config.account.id.clone());

        let venue = Arc::new(PaperExchange::new(&config.paper.venue));
        venue.set_instrument(config.instrument.to_limits(&config.symbol));
        venue.set_balance(account.clone(), Self::seed_balance(&config));
        if config.paper.auto_fill > Decimal::ZERO {
            venue.set_auto_fill(config.paper.auto_fill);
        }

        let store: Arc<dyn SnapshotStore> = Arc::new(FileStore::new(&config.persistence.data_dir));
        let heartbeat = Heartbeat::new(
            store.clone(),
            &config.persistence.namespace,
            config.persistence.heartbeat_timeout_ms,
        );

        let client: DynExchangeClient = venue.clone();
        let tracker = Arc::new(InMemoryOrderTracker::new());
        let limits = Arc::new(LimitsCache::new(config.engine.limits_ttl_ms));

        let mut runner = match config.mode {
            StrategyMode::Twap => Runner::Twap(ExecutionScheduler::new(
                client,
                tracker,
                limits,
                account,
                account_kind,
                config.symbol.clone(),
                strategy.clone(),
                config.engine,
            )),
            StrategyMode::Pov => Runner::Pov(ParticipationController::new(
                client,
                tracker,
                limits,
                account,
                account_kind,
                config.symbol.clone(),
                strategy.clone(),
                config.engine,
            )),
        };
        match &mut runner {
            Runner::Twap(scheduler) => {
                scheduler.set_store(store.clone(), &config.persistence.namespace)
            }
            Runner::Pov(controller) => {
                controller.set_store(store.clone(), &config.persistence.namespace)
            }
        }

        Ok(Self {
            config,
            strategy,
            venue,
            store,
            heartbeat,
            flags: RunFlags::new(),
            runner,
        })
    }

    /// Shared pause/stop handle for embedders and signal tasks.
    pub fn flags(&self) -> Arc<RunFlags> {
        self.flags.clone()
    }

    /// Run until completion, a stop request, or ctrl-c.
    pub async fn run(mut self) -> AppResult<()> {
        let now = Self::now_ms();

        // One live run per namespace. An expired heartbeat is a crashed
        // run whose state the hydration path recovers.
        let namespace = &self.config.persistence.namespace;
        if let Some(held) = read_heartbeat(self.store.as_ref(), namespace)? {
            if !held.is_expired(now) {
                return Err(AppError::NamespaceHeld(namespace.clone()));
            }
            warn!(
                namespace = %namespace,
                deadline_ms = held.deadline_ms,
                "Taking over an expired heartbeat"
            );
        }

        self.stamp_market(now);
        self.runner.open(now).await?;
        self.heartbeat.refresh(now)?;

        info!(
            mode = ?self.config.mode,
            symbol = %self.config.symbol,
            side = %self.strategy.side,
            quantity = %self.strategy.total_quantity,
            "Run opened"
        );

        let mut run_error: Option<AppError> = None;
        let mut interval = tokio::time::interval(TICK_INTERVAL);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if self.flags.stop_requested() {
                        info!("Stop requested");
                        break;
                    }

                    let now = Self::now_ms();
                    self.stamp_market(now);

                    if self.flags.is_paused() {
                        // Paused is alive: keep the dead-man switch fed.
                        if let Err(e) = self.heartbeat.refresh(now) {
                            warn!(error = %e, "Heartbeat refresh failed");
                        }
                        continue;
                    }

                    let status = self.runner.step(now).await;

                    if let Err(e) = self.heartbeat.refresh(now) {
                        warn!(error = %e, "Heartbeat refresh failed");
                    }
                    self.runner.write_snapshots(now);

                    if self.runner.is_complete() {
                        info!("Parent order completed");
                        break;
                    }
                    if status == SchedulerStatus::Error {
                        let reason = self.runner.progress(now).status_reason;
                        error!(reason = %reason, "Run entered error state");
                        run_error = Some(AppError::Config(reason));
                        break;
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        // Cleanup: release working orders, persist, drop the heartbeat.
        let now = Self::now_ms();
        self.runner.close(now).await;
        if let Err(e) = self.heartbeat.clear() {
            warn!(error = %e, "Heartbeat clear failed");
        }

        info!(
            dealt = %self.runner.dealt_total(),
            status = %self.runner.progress(now).status,
            "Shutting down"
        );

        match run_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Re-stamp the paper book (and, for POV, the volume candles) at the
    /// current time, standing in for a live feed.
    fn stamp_market(&self, now_ms: u64) {
        let paper = &self.config.paper;
        self.venue.set_book(
            &self.config.symbol,
            BookTop::new(
                Price::new(paper.bid_price),
                Size::new(paper.depth),
                Price::new(paper.ask_price),
                Size::new(paper.depth),
                now_ms,
            ),
        );

        if self.config.mode == StrategyMode::Pov {
            let interval = self.strategy.kline_interval_ms.max(1);
            let open = now_ms - (now_ms % interval);
            let volume = Size::new(paper.kline_volume);
            self.venue.set_klines(
                &self.config.symbol,
                vec![
                    Kline {
                        open_time_ms: open.saturating_sub(interval),
                        close_time_ms: open,
                        volume,
                    },
                    Kline {
                        open_time_ms: open,
                        close_time_ms: open + interval,
                        volume,
                    },
                ],
            );
        }
    }

    fn seed_balance(config: &AppConfig) -> BalanceSnapshot {
        let paper = &config.paper;
        let mut assets = HashMap::new();
        assets.insert(
            config.instrument.quote.clone(),
            AssetBalance {
                free: paper.quote_balance,
                locked: Decimal::ZERO,
            },
        );
        assets.insert(
            config.instrument.base.clone(),
            AssetBalance {
                free: paper.base_balance,
                locked: Decimal::ZERO,
            },
        );
        BalanceSnapshot {
            assets,
            buying_power: paper.buying_power,
            leverage: paper.leverage,
            long_qty: Size::ZERO,
            short_qty: Size::ZERO,
            fetched_at_ms: 0,
        }
    }

    fn now_ms() -> u64 {
        chrono::Utc::now().timestamp_millis() as u64
    }
}
