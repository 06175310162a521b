//! Volume-participation wrapper around the scheduler.
//!
//! A POV run has no fixed end time: the controller watches recent traded
//! volume and repeatedly hands the scheduler a small burst sized as a
//! percentage of that volume. Each burst is an ordinary paced run; at its
//! boundary the fills are folded into the run totals and the next burst is
//! targeted from fresh volume data.

use std::sync::Arc;

use axe_core::{AccountId, AccountKind, Kline, SchedulerStatus, Size, StrategyConfig};
use axe_exchange::DynExchangeClient;
use axe_persistence::{ProgressSnapshot, SnapshotStore};
use axe_telemetry::Metrics;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::EngineResult;
use crate::limits::LimitsCache;
use crate::scheduler::{ExecutionScheduler, SchedulerSettings};
use crate::tracker::OrderTracker;

/// Burst targets are randomized by up to this many basis points either
/// way, so repeated runs do not telegraph the participation rate.
const TARGET_JITTER_BPS: i64 = 500;

#[derive(Debug, Clone, Copy)]
struct Burst {
    target: Size,
    duration_ms: u64,
    started_at_ms: u64,
}

pub struct ParticipationController {
    scheduler: ExecutionScheduler,
    client: DynExchangeClient,
    limits: Arc<LimitsCache>,
    store: Option<Arc<dyn SnapshotStore>>,
    namespace: String,
    symbol: String,
    config: StrategyConfig,
    committed_dealt: Size,
    committed_notional: Decimal,
    burst: Option<Burst>,
    completed: bool,
    /// Why the last retarget produced no burst, for status reporting.
    last_error: Option<String>,
}

impl ParticipationController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: DynExchangeClient,
        tracker: Arc<dyn OrderTracker>,
        limits: Arc<LimitsCache>,
        account: AccountId,
        account_kind: AccountKind,
        symbol: impl Into<String>,
        config: StrategyConfig,
        settings: SchedulerSettings,
    ) -> Self {
        let symbol = symbol.into();
        let scheduler = ExecutionScheduler::new(
            client.clone(),
            tracker,
            limits.clone(),
            account,
            account_kind,
            symbol.clone(),
            config.clone(),
            settings,
        );
        Self {
            scheduler,
            client,
            limits,
            store: None,
            namespace: String::new(),
            symbol,
            config,
            committed_dealt: Size::ZERO,
            committed_notional: Decimal::ZERO,
            burst: None,
            completed: false,
            last_error: None,
        }
    }

    pub fn set_store(&mut self, store: Arc<dyn SnapshotStore>, namespace: impl Into<String>) {
        let namespace = namespace.into();
        self.store = Some(store.clone());
        self.namespace = namespace.clone();
        self.scheduler.set_store(store, namespace);
    }

    /// Run-level status. Between bursts the scheduler still carries the
    /// folded burst's terminal status, which is not the run's.
    pub fn status(&self) -> SchedulerStatus {
        if self.completed {
            SchedulerStatus::StrategyCompleted
        } else if self.burst.is_none() {
            SchedulerStatus::Waiting
        } else {
            self.scheduler.status()
        }
    }

    /// Whole-run completion. The scheduler reports `STRATEGY_COMPLETED`
    /// at every burst boundary; this is true only when the parent order
    /// is done.
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Run-level filled quantity across all bursts.
    pub fn dealt_total(&self) -> Size {
        self.committed_dealt + self.scheduler.dealt_total()
    }

    /// Run-level filled notional across all bursts.
    pub fn dealt_notional_total(&self) -> Decimal {
        self.committed_notional + self.scheduler.dealt_notional_total()
    }

    pub fn burst_target(&self) -> Option<Size> {
        self.burst.map(|b| b.target)
    }

    pub fn burst_duration_ms(&self) -> Option<u64> {
        self.burst.map(|b| b.duration_ms)
    }

    pub async fn open(&mut self, now_ms: u64) -> EngineResult<()> {
        self.scheduler.open(now_ms).await?;
        self.hydrate_committed();
        Ok(())
    }

    pub async fn close(&mut self, now_ms: u64) {
        self.scheduler.close(now_ms).await;
        // The scheduler wrote burst-level progress; overwrite it with the
        // run-level row.
        self.scheduler
            .write_snapshots_with(self.progress_snapshot(now_ms));
    }

    /// Drive the run: tick the live burst, or retarget at a boundary.
    pub async fn poll(&mut self, now_ms: u64) -> SchedulerStatus {
        if self.completed {
            return SchedulerStatus::StrategyCompleted;
        }
        if let Some(burst) = self.burst {
            let running = !self.scheduler.status().is_completed()
                && now_ms < burst.started_at_ms + burst.duration_ms;
            if running {
                return self.scheduler.tick(now_ms).await;
            }
        }
        self.roll_burst(now_ms).await
    }

    /// Close out the finished burst (if any) and target the next one from
    /// the latest traded volume.
    async fn roll_burst(&mut self, now_ms: u64) -> SchedulerStatus {
        if let Some(burst) = self.burst.take() {
            self.scheduler.release_open_orders().await;
            let (dealt, notional) = self.scheduler.drain_fills();
            self.committed_dealt = self.committed_dealt + dealt;
            self.committed_notional += notional;
            info!(
                symbol = %self.symbol,
                target = %burst.target,
                dealt = %dealt,
                total = %self.committed_dealt,
                "Participation burst finished"
            );
        }

        let remaining = self
            .config
            .total_quantity
            .saturating_sub(self.committed_dealt);
        if !remaining.is_positive() || remaining < self.scheduler.min_order_qty() {
            self.completed = true;
            info!(
                symbol = %self.symbol,
                dealt = %self.committed_dealt,
                "Participation run complete"
            );
            return SchedulerStatus::StrategyCompleted;
        }

        let klines = match self
            .client
            .recent_klines(&self.symbol, self.config.kline_interval_ms, 2)
            .await
        {
            Ok(klines) => klines,
            Err(e) => {
                warn!(symbol = %self.symbol, error = %e, "Kline fetch failed");
                self.last_error = Some(format!("kline fetch failed: {e}"));
                return SchedulerStatus::Waiting;
            }
        };
        let window = window_volume(&klines, now_ms);
        let step = self
            .limits
            .peek(&self.symbol)
            .map(|l| l.size_step)
            .unwrap_or(Size::ONE);
        let mut target = (window * (self.config.percentage_of_volume / Decimal::ONE_HUNDRED)
            * jitter())
        .round_to_step(step);
        if !target.is_positive() {
            debug!(symbol = %self.symbol, window = %window, "No tradable volume, holding");
            self.last_error = Some("no tradable volume in the kline window".to_string());
            return SchedulerStatus::Waiting;
        }
        // A target the venue would reject as too small never becomes a
        // burst; the run holds until the window carries more volume.
        let min_qty = self.scheduler.min_order_qty();
        if target < min_qty {
            debug!(
                symbol = %self.symbol,
                target = %target,
                "Burst target below the venue minimum, holding"
            );
            self.last_error = Some(format!(
                "burst target {target} below the instrument minimum {min_qty}"
            ));
            return SchedulerStatus::Waiting;
        }

        // Burst horizon: the rest of the current candle interval.
        let mut duration_ms = klines
            .last()
            .map(|k| k.close_time_ms.saturating_sub(now_ms))
            .filter(|d| *d > 0)
            .unwrap_or(self.config.kline_interval_ms);
        if target > remaining {
            // Less to do than the market would bear: keep the pace by
            // shortening the burst in the same proportion.
            let scale = remaining.inner() / target.inner();
            duration_ms = (Decimal::from(duration_ms) * scale)
                .floor()
                .to_u64()
                .unwrap_or(duration_ms);
            target = remaining;
        }
        duration_ms = duration_ms.max(self.config.default_post_frequency_ms);

        let burst_config = self.config.for_burst(target, duration_ms);
        self.scheduler.restart_with(burst_config, now_ms);
        self.burst = Some(Burst {
            target,
            duration_ms,
            started_at_ms: now_ms,
        });
        self.last_error = None;
        Metrics::participation_target(&self.symbol, target.inner().to_f64().unwrap_or(0.0));
        info!(
            symbol = %self.symbol,
            target = %target,
            duration_ms,
            window_volume = %window,
            "New participation burst"
        );
        SchedulerStatus::Waiting
    }

    /// The scheduler's row describes the live burst; lift it to run level
    /// before it is persisted or reported.
    pub fn progress_snapshot(&self, now_ms: u64) -> ProgressSnapshot {
        let mut progress = self.scheduler.progress_snapshot(now_ms);
        let dealt = self.dealt_total();
        let notional = self.dealt_notional_total();
        progress.dealt_qty = dealt.inner();
        progress.remaining_qty = self.config.total_quantity.saturating_sub(dealt).inner();
        progress.deal_price = if dealt.is_positive() {
            notional / dealt.inner()
        } else {
            Decimal::ZERO
        };
        if self.completed {
            progress.status = SchedulerStatus::StrategyCompleted;
            progress.status_reason = "participation run complete".to_string();
        } else if self.burst.is_none() {
            progress.status = SchedulerStatus::Waiting;
            progress.status_reason = self
                .last_error
                .clone()
                .unwrap_or_else(|| "awaiting the next burst".to_string());
        }
        progress
    }

    pub fn write_snapshots(&self, now_ms: u64) {
        self.scheduler
            .write_snapshots_with(self.progress_snapshot(now_ms));
    }

    /// Recover run totals written by a previous process. The scheduler has
    /// already restored the last burst's orders, so only the difference
    /// belongs to the committed tally.
    fn hydrate_committed(&mut self) {
        let Some(store) = &self.store else { return };
        match ProgressSnapshot::load(store.as_ref(), &self.namespace) {
            Ok(Some(progress)) if progress.instrument == self.symbol => {
                let run_dealt = Size::new(progress.dealt_qty);
                let run_notional = progress.deal_price * progress.dealt_qty;
                self.committed_dealt = run_dealt.saturating_sub(self.scheduler.dealt_total());
                self.committed_notional =
                    (run_notional - self.scheduler.dealt_notional_total()).max(Decimal::ZERO);
                if self.committed_dealt.is_positive() {
                    info!(
                        symbol = %self.symbol,
                        committed = %self.committed_dealt,
                        "Recovered participation totals"
                    );
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(symbol = %self.symbol, error = %e, "Participation hydration failed")
            }
        }
    }
}

/// Traded volume over a sliding one-interval window: the full partial
/// candle plus the older candle weighted by the unelapsed fraction.
fn window_volume(klines: &[Kline], now_ms: u64) -> Size {
    match klines {
        [] => Size::ZERO,
        [current] => current.volume,
        [.., older, current] => {
            let unelapsed = Decimal::ONE - current.elapsed_fraction(now_ms);
            older.volume * unelapsed + current.volume
        }
    }
}

fn jitter() -> Decimal {
    let bps = rand::thread_rng().gen_range(-TARGET_JITTER_BPS..=TARGET_JITTER_BPS);
    Decimal::ONE + Decimal::new(bps, 4)
}
