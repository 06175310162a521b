//! Time-sliced execution scheduler.
//!
//! One scheduler drives one parent order: it breaks the configured
//! quantity into evenly paced child orders, prices each one off the live
//! book, and walks a fixed sequence of guards before every submission.
//! `tick` is cheap and infallible; every failure mode maps to a
//! [`SchedulerStatus`] plus a reason string, and is re-evaluated on the
//! next call rather than retried inline. The one exception is the bounded
//! cancel loop, which may block for a few short sleeps.

use std::sync::Arc;
use std::time::Duration;

use axe_core::{
    AccountId, AccountKind, ChildOrder, OrderId, OrderStatus, Price, RawStrategyConfig,
    SchedulerStatus, Side, Size, StrategyConfig, StrategyMode,
};
use axe_exchange::{DynExchangeClient, ExchangeError, PlaceOrderRequest};
use axe_persistence::{save_ui_orders, OrderBookOfRecord, ProgressSnapshot, SnapshotStore};
use axe_telemetry::Metrics;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::balance::{BalanceCheck, BalanceGuard, DEFAULT_BALANCE_TTL_MS};
use crate::error::EngineResult;
use crate::gate::{MarketDataGate, DEFAULT_LAG_TTL_MS, DEFAULT_MAX_BOOK_AGE_MS};
use crate::limits::LimitsCache;
use crate::planner::{self, SlicePlan};
use crate::tracker::OrderTracker;

const FAIL_COOLDOWN_BASE_MS: u64 = 2_000;
const FAIL_COOLDOWN_CAP_MS: u64 = 30_000;
const CANCEL_MAX_ATTEMPTS: u32 = 5;
const CANCEL_RETRY_SLEEP_MS: u64 = 500;

pub const DEFAULT_LIMITS_REFRESH_INTERVAL_MS: u64 = 60_000;

/// Engine tunables that are not part of the strategy itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub limits_refresh_interval_ms: u64,
    pub limits_ttl_ms: u64,
    pub max_book_age_ms: u64,
    pub lag_ttl_ms: u64,
    pub balance_ttl_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            limits_refresh_interval_ms: DEFAULT_LIMITS_REFRESH_INTERVAL_MS,
            limits_ttl_ms: DEFAULT_LIMITS_REFRESH_INTERVAL_MS,
            max_book_age_ms: DEFAULT_MAX_BOOK_AGE_MS,
            lag_ttl_ms: DEFAULT_LAG_TTL_MS,
            balance_ttl_ms: DEFAULT_BALANCE_TTL_MS,
        }
    }
}

enum CancelOutcome {
    /// The venue closed the order; `unfilled` is the released remainder.
    Completed { unfilled: Size },
    /// The order would not die within the retry bound.
    Abandoned,
}

pub struct ExecutionScheduler {
    client: DynExchangeClient,
    tracker: Arc<dyn OrderTracker>,
    limits: Arc<LimitsCache>,
    gate: MarketDataGate,
    guard: BalanceGuard,
    store: Option<Arc<dyn SnapshotStore>>,
    namespace: String,

    account: AccountId,
    symbol: String,
    config: StrategyConfig,
    config_error: Option<String>,
    settings: SchedulerSettings,

    status: SchedulerStatus,
    status_reason: String,
    is_open: bool,
    started_at_ms: u64,

    slice_size: Size,
    post_frequency_ms: u64,
    total_no_of_posts: u32,
    posts_completed: u32,
    last_min_order_qty: Size,
    last_limits_refresh_ms: u64,

    last_order: Option<(OrderId, Size)>,
    last_post_at_ms: Option<u64>,
    carry: Size,
    consecutive_failures: u32,
    last_failure_at_ms: Option<u64>,
    last_fill_at_ms: Option<u64>,
    prev_dealt_total: Size,

    /// Fills of orders we dropped from the tracker (failure drops,
    /// abandoned cancels). They stay in the dealt and committed totals.
    reclaimed_dealt: Size,
    reclaimed_notional: Decimal,
}

impl ExecutionScheduler {
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
        Self {
            client,
            tracker,
            limits,
            gate: MarketDataGate::new(settings.max_book_age_ms, settings.lag_ttl_ms),
            guard: BalanceGuard::new(account_kind, settings.balance_ttl_ms),
            store: None,
            namespace: String::new(),
            account,
            symbol: symbol.into(),
            config,
            config_error: None,
            settings,
            status: SchedulerStatus::Waiting,
            status_reason: String::new(),
            is_open: false,
            started_at_ms: 0,
            slice_size: Size::ZERO,
            post_frequency_ms: 0,
            total_no_of_posts: 0,
            posts_completed: 0,
            last_min_order_qty: Size::ZERO,
            last_limits_refresh_ms: 0,
            last_order: None,
            last_post_at_ms: None,
            carry: Size::ZERO,
            consecutive_failures: 0,
            last_failure_at_ms: None,
            last_fill_at_ms: None,
            prev_dealt_total: Size::ZERO,
            reclaimed_dealt: Size::ZERO,
            reclaimed_notional: Decimal::ZERO,
        }
    }

    /// Bind a snapshot store. Progress is then persisted under `namespace`
    /// and hydrated from it on `open`.
    pub fn set_store(&mut self, store: Arc<dyn SnapshotStore>, namespace: impl Into<String>) {
        self.store = Some(store);
        self.namespace = namespace.into();
    }

    pub fn status(&self) -> SchedulerStatus {
        self.status
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Cumulative filled quantity, including fills of dropped orders.
    pub fn dealt_total(&self) -> Size {
        self.tracker.dealt_total() + self.reclaimed_dealt
    }

    /// Cumulative filled notional, including fills of dropped orders.
    pub fn dealt_notional_total(&self) -> Decimal {
        self.tracker.dealt_notional_total() + self.reclaimed_notional
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Bind the run: resolve instrument limits, hydrate persisted progress
    /// when a store is attached, and derive the initial slice plan.
    pub async fn open(&mut self, now_ms: u64) -> EngineResult<()> {
        self.started_at_ms = now_ms;
        self.last_limits_refresh_ms = now_ms;

        let mut hydrated = false;
        if let Some(store) = self.store.clone() {
            hydrated = self.hydrate(store.as_ref(), now_ms);
        }

        let limits = self
            .limits
            .get(self.client.as_ref(), &self.symbol, now_ms)
            .await?;

        if hydrated && self.slice_size.is_positive() {
            info!(
                symbol = %self.symbol,
                posts_completed = self.posts_completed,
                "Resuming run from persisted progress"
            );
        } else {
            let book = self.client.book_top(&self.symbol).await.ok().flatten();
            let price = book.and_then(|b| b.mid_price()).unwrap_or(Price::ZERO);
            let min_order_qty = limits.min_order_qty(price);
            let remaining = self.config.total_quantity.saturating_sub(self.dealt_total());
            self.last_min_order_qty = min_order_qty;
            let plan = planner::plan(
                remaining,
                self.remaining_duration_ms(now_ms),
                min_order_qty,
                self.config.default_post_frequency_ms,
                limits.size_step,
                self.posts_completed,
            );
            self.apply_plan(plan);
        }

        self.is_open = true;
        info!(
            symbol = %self.symbol,
            side = %self.config.side,
            quantity = %self.config.total_quantity,
            duration_ms = self.config.total_duration_ms,
            "Scheduler opened"
        );
        Ok(())
    }

    /// Release the run: best-effort cancel of anything still resting, one
    /// final snapshot write. Safe to call more than once.
    pub async fn close(&mut self, now_ms: u64) {
        if !self.is_open {
            return;
        }
        self.release_open_orders().await;
        self.write_snapshots(now_ms);
        self.is_open = false;
        info!(symbol = %self.symbol, dealt = %self.dealt_total(), "Scheduler closed");
    }

    /// Replace the strategy config from raw input. A validation failure is
    /// sticky: the scheduler reports ERROR until a replacement validates.
    pub fn reconfigure(&mut self, raw: &RawStrategyConfig, mode: StrategyMode, now_ms: u64) {
        match StrategyConfig::validate(raw, mode) {
            Ok(config) => {
                self.config_error = None;
                self.restart_with(config, now_ms);
                info!(symbol = %self.symbol, "Strategy configuration replaced");
            }
            Err(e) => {
                warn!(symbol = %self.symbol, error = %e, "Replacement configuration rejected");
                self.config_error = Some(e.to_string());
                self.set_status(SchedulerStatus::Error, format!("invalid configuration: {e}"));
            }
        }
    }

    /// Swap in a new parent order and start from a clean slate. The caller
    /// owns the tracker and clears it when that is intended.
    pub(crate) fn restart_with(&mut self, config: StrategyConfig, now_ms: u64) {
        self.config = config;
        self.posts_completed = 0;
        self.carry = Size::ZERO;
        self.last_order = None;
        self.last_post_at_ms = None;
        self.last_failure_at_ms = None;
        self.started_at_ms = now_ms;
        self.prev_dealt_total = Size::ZERO;
        self.reclaimed_dealt = Size::ZERO;
        self.reclaimed_notional = Decimal::ZERO;

        let (min_order_qty, size_step) = match self.limits.peek(&self.symbol) {
            Some(limits) if self.last_min_order_qty.is_positive() => {
                (self.last_min_order_qty, limits.size_step)
            }
            Some(limits) => (limits.min_order_size, limits.size_step),
            None => (self.last_min_order_qty.max(Size::ONE), Size::ONE),
        };
        self.last_min_order_qty = min_order_qty;
        let plan = planner::plan(
            self.config.total_quantity,
            self.config.total_duration_ms,
            min_order_qty,
            self.config.default_post_frequency_ms,
            size_step,
            0,
        );
        self.apply_plan(plan);
        self.set_status(SchedulerStatus::Waiting, "restarted with a new parent order");
    }

    // ========================================================================
    // Tick
    // ========================================================================

    pub async fn tick(&mut self, now_ms: u64) -> SchedulerStatus {
        let started = std::time::Instant::now();
        let status = self.tick_inner(now_ms).await;
        Metrics::tick_duration(&self.symbol, started.elapsed().as_secs_f64() * 1_000.0);
        status
    }

    async fn tick_inner(&mut self, now_ms: u64) -> SchedulerStatus {
        // 1. A completed run stays completed.
        if self.status.is_completed() {
            return self.status;
        }

        // 2. A sticky config error blocks everything until replaced.
        if let Some(reason) = self.config_error.clone() {
            return self.set_status(SchedulerStatus::Error, reason);
        }

        if !self.is_open {
            return self.set_status(SchedulerStatus::Error, "scheduler is not open");
        }

        // Venue order state first; all quantity math below reads it.
        if let Err(e) = self.tracker.sync(self.client.as_ref(), &self.symbol).await {
            return self.set_status(SchedulerStatus::Waiting, format!("order sync failed: {e}"));
        }
        let dealt = self.dealt_total();
        if dealt > self.prev_dealt_total {
            debug!(symbol = %self.symbol, dealt = %dealt, "Fill progress observed");
            self.last_fill_at_ms = Some(now_ms);
            self.prev_dealt_total = dealt;
        }
        let book = match self.client.book_top(&self.symbol).await {
            Ok(book) => book,
            Err(e) => {
                debug!(symbol = %self.symbol, error = %e, "Book fetch failed");
                None
            }
        };

        // 3. Done when the remainder is gone or no longer postable. With
        // nothing dealt the same condition means the configured quantity
        // itself is below the venue minimum, which is a config error, not
        // a completion.
        let remaining = self.config.total_quantity.saturating_sub(dealt);
        Metrics::progress(
            &self.symbol,
            dealt.inner().to_f64().unwrap_or(0.0),
            remaining.inner().to_f64().unwrap_or(0.0),
        );
        if !remaining.is_positive() || remaining < self.last_min_order_qty {
            if !dealt.is_positive() {
                return self.set_status(
                    SchedulerStatus::Error,
                    format!(
                        "total quantity {remaining} is below the instrument minimum {}",
                        self.last_min_order_qty
                    ),
                );
            }
            self.release_open_orders().await;
            self.last_order = None;
            return self.set_status(
                SchedulerStatus::StrategyCompleted,
                format!("remaining {remaining} below the instrument minimum"),
            );
        }

        // 4. Periodic limits refresh; a grown minimum forces a re-plan.
        if now_ms.saturating_sub(self.last_limits_refresh_ms)
            >= self.settings.limits_refresh_interval_ms
        {
            self.last_limits_refresh_ms = now_ms;
            match self.limits.get(self.client.as_ref(), &self.symbol, now_ms).await {
                Ok(limits) => {
                    let price = book.and_then(|b| b.mid_price()).unwrap_or(Price::ZERO);
                    let min_order_qty = limits.min_order_qty(price);
                    if min_order_qty > self.last_min_order_qty {
                        info!(
                            symbol = %self.symbol,
                            old = %self.last_min_order_qty,
                            new = %min_order_qty,
                            "Minimum order quantity grew, re-planning"
                        );
                        self.last_min_order_qty = min_order_qty;
                        let plan = planner::plan(
                            remaining,
                            self.remaining_duration_ms(now_ms),
                            min_order_qty,
                            self.config.default_post_frequency_ms,
                            limits.size_step,
                            self.posts_completed,
                        );
                        self.apply_plan(plan);
                    }
                }
                Err(e) => debug!(symbol = %self.symbol, error = %e, "Limits refresh failed"),
            }
        }

        // 5. Failed-order cooldown, proportional to the failure streak.
        if let Some((id, _)) = self.last_order.clone() {
            if self.tracker.is_failed(&id) && self.last_failure_at_ms.is_none() {
                warn!(symbol = %self.symbol, order_id = %id, "Venue-side order failure observed");
                self.consecutive_failures += 1;
                self.last_failure_at_ms = Some(now_ms);
                Metrics::order_failed(&self.symbol);
            }
        }
        if let Some(failed_at) = self.last_failure_at_ms {
            let cooldown_ms = fail_cooldown_ms(self.consecutive_failures);
            let elapsed_ms = now_ms.saturating_sub(failed_at);
            if elapsed_ms < cooldown_ms {
                return self.set_status(
                    SchedulerStatus::OrderFailed,
                    format!("failure cooldown, {}ms left", cooldown_ms - elapsed_ms),
                );
            }
            if let Some((id, _)) = self.last_order.clone() {
                if self.tracker.is_failed(&id) {
                    self.reclaim(&id);
                    self.last_order = None;
                }
            }
            self.last_failure_at_ms = None;
        }

        // 6. Pacing: at most one post per frequency window.
        if let Some(last_post) = self.last_post_at_ms {
            if now_ms < last_post + self.post_frequency_ms {
                return self
                    .set_status(SchedulerStatus::Waiting, "waiting for the next post window");
            }
        }

        // 7. All planned posts made: wind down.
        if self.total_no_of_posts > 0 && self.posts_completed >= self.total_no_of_posts {
            self.release_open_orders().await;
            self.last_order = None;
            return self.set_status(SchedulerStatus::StrategyCompleted, "all planned posts issued");
        }

        // 8. Clear the previous child order before posting a new one. The
        //    released remainder of a confirmed cancel rides on the next
        //    slice; an abandoned one is written off loudly.
        if let Some((id, _)) = self.last_order.clone() {
            if self.tracker.is_terminal(&id) {
                if self.tracker.status(&id) == Some(OrderStatus::Canceled) {
                    let unfilled = self.tracker.outstanding(&id);
                    if unfilled.is_positive() {
                        self.carry = self.carry + unfilled;
                    }
                }
                self.last_order = None;
            } else {
                match self.cancel_with_retry(&id).await {
                    CancelOutcome::Completed { unfilled } => {
                        Metrics::order_cancelled(&self.symbol);
                        if unfilled.is_positive() {
                            self.carry = self.carry + unfilled;
                        }
                        self.last_order = None;
                        self.set_status(
                            SchedulerStatus::OrderCancelled,
                            format!("cancelled previous order, carrying {unfilled}"),
                        );
                    }
                    CancelOutcome::Abandoned => {
                        Metrics::cancel_abandoned(&self.symbol);
                        error!(
                            symbol = %self.symbol,
                            order_id = %id,
                            unfilled = %self.tracker.outstanding(&id),
                            attempts = CANCEL_MAX_ATTEMPTS,
                            "Cancel abandoned, reconcile the position"
                        );
                        self.reclaim(&id);
                        self.last_order = None;
                    }
                }
            }
        }

        // 9. Market-data gate: no pricing off a missing, stale or lagging
        //    book.
        let freshness = self
            .gate
            .assess(self.client.as_ref(), book.as_ref(), self.last_fill_at_ms, now_ms)
            .await;
        if !freshness.is_tradable() {
            Metrics::gate_blocked(&freshness.summary(), &self.symbol);
            return self.set_status(
                SchedulerStatus::Waiting,
                format!("market data not trustworthy: {}", freshness.summary()),
            );
        }
        let book = match book {
            Some(book) if !book.is_empty() => book,
            // The gate raises book_missing for this; unreachable here.
            _ => return self.set_status(SchedulerStatus::Waiting, "book unavailable"),
        };
        let Some(limits) = self.limits.peek(&self.symbol) else {
            return self.set_status(SchedulerStatus::Waiting, "instrument limits unavailable");
        };
        let side = self.config.side;

        // 10. Price: take the opposite touch when catching up on carry,
        //     otherwise improve our own touch by one tick.
        let raw_price = if self.carry.is_positive() {
            match side {
                Side::Buy => book.ask_price,
                Side::Sell => book.bid_price,
            }
        } else {
            match side {
                Side::Buy => book.bid_price + limits.price_tick,
                Side::Sell => book.ask_price - limits.price_tick,
            }
        };
        let price = limits.round_price(raw_price);
        if !price.is_positive() {
            return self.set_status(SchedulerStatus::Waiting, "no usable candidate price");
        }

        // 11. Threshold price is a hard ceiling for buys, floor for sells.
        if let Some(threshold) = self.config.threshold_price {
            let breached = match side {
                Side::Buy => price > threshold,
                Side::Sell => price < threshold,
            };
            if breached {
                return self.set_status(
                    SchedulerStatus::ThresholdPriceBreach,
                    format!("candidate {price} breaches threshold {threshold}"),
                );
            }
        }

        // 12. Child order size: slice plus carry, never past the remainder.
        let mut order_size = (self.slice_size + self.carry)
            .min(remaining)
            .round_to_step(limits.size_step);
        if !order_size.is_positive() {
            return self.set_status(SchedulerStatus::Waiting, "rounded order size is zero");
        }

        // 13. Runaway-carry stop.
        if order_size >= self.slice_size * self.config.max_slice_size_multiplier {
            return self.set_status(
                SchedulerStatus::MaxOrderSizeBreach,
                format!(
                    "order {order_size} reached {} x slice {}",
                    self.config.max_slice_size_multiplier, self.slice_size
                ),
            );
        }

        // 14. Guard conditions.
        if let Some(stop) = self.config.stop_condition.clone() {
            match self
                .guard
                .cache()
                .get(self.client.as_ref(), &self.account, now_ms, false)
                .await
            {
                Ok(snapshot) => {
                    let free = snapshot.free(&stop.asset);
                    if stop.is_met(free) {
                        Metrics::condition_blocked("stop");
                        return self.set_status(
                            SchedulerStatus::StopConditionMet,
                            format!("stop [{stop}] holds with tradable balance {free}"),
                        );
                    }
                }
                // The affordability check below owns balance failures.
                Err(e) => {
                    debug!(symbol = %self.symbol, error = %e, "Stop-condition balance read failed")
                }
            }
        }
        if let Some(trigger) = self.config.trigger_condition.clone() {
            let reference = match self
                .client
                .reference_book_top(&trigger.venue, &trigger.pair)
                .await
            {
                Ok(Some(book)) if !book.is_empty() => Some(match side {
                    Side::Buy => book.ask_price,
                    Side::Sell => book.bid_price,
                }),
                Ok(_) => None,
                Err(e) => {
                    debug!(symbol = %self.symbol, error = %e, "Reference book fetch failed");
                    None
                }
            };
            let satisfied = reference.map(|p| trigger.is_satisfied(p)).unwrap_or(false);
            if !satisfied {
                Metrics::condition_blocked("trigger");
                let detail = match reference {
                    Some(p) => format!("reference {p}"),
                    None => "reference price unavailable".to_string(),
                };
                return self.set_status(
                    SchedulerStatus::TriggerConditionBreach,
                    format!("trigger [{trigger}] unmet, {detail}"),
                );
            }
        }

        // 15. Affordability.
        match self
            .guard
            .check(
                self.client.as_ref(),
                &self.account,
                &limits,
                side,
                price,
                order_size,
                now_ms,
            )
            .await
        {
            BalanceCheck::Approved { .. } => {}
            BalanceCheck::Denied { reason } => {
                return self.set_status(SchedulerStatus::NotEnoughBalance, reason)
            }
        }

        // 16. Overshoot guard: everything ever handed to the venue must
        //     stay inside the parent quantity.
        let committed = self.tracker.committed_size_total() + self.reclaimed_dealt;
        let room = self.config.total_quantity.saturating_sub(committed);
        if order_size > room {
            let shrunk = room.round_to_step(limits.size_step);
            if !shrunk.is_positive() || shrunk < self.last_min_order_qty {
                return self.set_status(
                    SchedulerStatus::Waiting,
                    format!("no room under the parent quantity, committed {committed}"),
                );
            }
            debug!(
                symbol = %self.symbol,
                from = %order_size,
                to = %shrunk,
                "Shrinking order to stay inside the parent quantity"
            );
            order_size = shrunk;
        }

        // 17. Submit and advance the cadence.
        let order_id = OrderId::new();
        let request = PlaceOrderRequest {
            account: self.account.clone(),
            symbol: self.symbol.clone(),
            side,
            price,
            size: order_size,
            client_order_id: order_id.clone(),
            remark: self.config.remark.clone(),
        };
        match self.client.place_limit_order(&request).await {
            Ok(_ack) => {
                let mut order = ChildOrder::new(
                    order_id.clone(),
                    side,
                    price,
                    order_size,
                    now_ms,
                    self.config.remark.clone(),
                );
                order.status = OrderStatus::Open;
                self.tracker.register(order);
                self.last_order = Some((order_id.clone(), order_size));
                self.carry = Size::ZERO;
                self.posts_completed += 1;
                self.consecutive_failures = 0;
                // Next-slot pacing keeps the cadence even unless the
                // driver stalled for more than a full window.
                self.last_post_at_ms = Some(match self.last_post_at_ms {
                    Some(prev) if now_ms.saturating_sub(prev) < 2 * self.post_frequency_ms => {
                        prev + self.post_frequency_ms
                    }
                    _ => now_ms,
                });
                Metrics::order_submitted(
                    &self.symbol,
                    &side.to_string(),
                    order_size.inner().to_f64().unwrap_or(0.0),
                );
                info!(
                    symbol = %self.symbol,
                    order_id = %order_id,
                    size = %order_size,
                    price = %price,
                    post = self.posts_completed,
                    of = self.total_no_of_posts,
                    "Child order submitted"
                );
                self.set_status(
                    SchedulerStatus::OrderSubmitted,
                    format!("posted {order_size} @ {price}"),
                )
            }
            Err(e) => {
                self.consecutive_failures += 1;
                self.last_failure_at_ms = Some(now_ms);
                Metrics::order_failed(&self.symbol);
                warn!(
                    symbol = %self.symbol,
                    error = %e,
                    failures = self.consecutive_failures,
                    "Child order submission failed"
                );
                self.set_status(SchedulerStatus::OrderFailed, format!("submission failed: {e}"))
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Bounded cancel: re-request and re-check until the venue confirms a
    /// terminal state, with short sleeps between attempts.
    async fn cancel_with_retry(&self, id: &OrderId) -> CancelOutcome {
        for attempt in 1..=CANCEL_MAX_ATTEMPTS {
            match self.client.cancel_order(&self.symbol, id).await {
                Ok(()) => {}
                // The venue no longer knows it; the sync below settles it.
                Err(ExchangeError::UnknownOrder(_)) => {}
                Err(e) => {
                    warn!(
                        symbol = %self.symbol,
                        order_id = %id,
                        attempt,
                        error = %e,
                        "Cancel request failed"
                    )
                }
            }
            if let Err(e) = self.tracker.sync(self.client.as_ref(), &self.symbol).await {
                warn!(symbol = %self.symbol, error = %e, "Order sync failed during cancel");
            }
            if self.tracker.is_terminal(id) {
                return CancelOutcome::Completed {
                    unfilled: self.tracker.outstanding(id),
                };
            }
            if attempt < CANCEL_MAX_ATTEMPTS {
                tokio::time::sleep(Duration::from_millis(CANCEL_RETRY_SLEEP_MS)).await;
            }
        }
        CancelOutcome::Abandoned
    }

    /// Single-shot cancel of everything still resting, then a final sync
    /// so the tracker records the outcome. Used on wind-down paths.
    pub(crate) async fn release_open_orders(&self) {
        let open = self.tracker.open_orders();
        if open.is_empty() {
            return;
        }
        for order in open {
            match self.client.cancel_order(&self.symbol, &order.id).await {
                Ok(()) | Err(ExchangeError::UnknownOrder(_)) => {}
                Err(e) => {
                    warn!(
                        symbol = %self.symbol,
                        order_id = %order.id,
                        error = %e,
                        "Cancel on wind-down failed"
                    )
                }
            }
        }
        if let Err(e) = self.tracker.sync(self.client.as_ref(), &self.symbol).await {
            warn!(symbol = %self.symbol, error = %e, "Final order sync failed");
        }
    }

    /// Stop tracking an order but keep its fills in the run totals.
    fn reclaim(&mut self, id: &OrderId) {
        if let Some(order) = self.tracker.remove(id) {
            self.reclaimed_dealt = self.reclaimed_dealt + order.dealt;
            self.reclaimed_notional += order.dealt_notional;
        }
    }

    /// Hand the accumulated fills to the caller and forget them, clearing
    /// the tracker. The participation controller folds bursts with this.
    pub(crate) fn drain_fills(&mut self) -> (Size, Decimal) {
        let dealt = self.dealt_total();
        let notional = self.dealt_notional_total();
        self.tracker.clear();
        self.reclaimed_dealt = Size::ZERO;
        self.reclaimed_notional = Decimal::ZERO;
        self.prev_dealt_total = Size::ZERO;
        self.last_order = None;
        (dealt, notional)
    }

    pub(crate) fn min_order_qty(&self) -> Size {
        self.last_min_order_qty
    }

    fn remaining_duration_ms(&self, now_ms: u64) -> u64 {
        self.config
            .total_duration_ms
            .saturating_sub(now_ms.saturating_sub(self.started_at_ms))
    }

    fn apply_plan(&mut self, plan: SlicePlan) {
        self.slice_size = plan.slice_size;
        self.post_frequency_ms = plan.post_frequency_ms;
        self.total_no_of_posts = plan.total_no_of_posts;
        Metrics::slice_plan(
            &self.symbol,
            plan.slice_size.inner().to_f64().unwrap_or(0.0),
            plan.post_frequency_ms as f64,
        );
        info!(
            symbol = %self.symbol,
            slice = %plan.slice_size,
            frequency_ms = plan.post_frequency_ms,
            posts = plan.total_no_of_posts,
            "Slice plan updated"
        );
    }

    fn set_status(
        &mut self,
        status: SchedulerStatus,
        reason: impl Into<String>,
    ) -> SchedulerStatus {
        let reason = reason.into();
        if status != self.status {
            info!(
                symbol = %self.symbol,
                from = %self.status,
                to = %status,
                reason = %reason,
                "Status change"
            );
        }
        Metrics::scheduler_status(&self.symbol, &status.to_string());
        self.status = status;
        self.status_reason = reason;
        status
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn progress_snapshot(&self, now_ms: u64) -> ProgressSnapshot {
        let dealt = self.dealt_total();
        let remaining = self.config.total_quantity.saturating_sub(dealt);
        let notional = self.dealt_notional_total();
        let deal_price = if dealt.is_positive() {
            notional / dealt.inner()
        } else {
            Decimal::ZERO
        };
        ProgressSnapshot {
            account: self.account.to_string(),
            instrument: self.symbol.clone(),
            side: self.config.side.to_string(),
            status: self.status,
            status_reason: self.status_reason.clone(),
            slice_size: self.slice_size.inner(),
            post_frequency_ms: self.post_frequency_ms,
            total_no_of_posts: self.total_no_of_posts,
            posts_completed: self.posts_completed,
            progress_duration_ms: now_ms.saturating_sub(self.started_at_ms),
            last_min_order_qty: self.last_min_order_qty.inner(),
            last_order_id: self.last_order.as_ref().map(|(id, _)| id.as_str().to_string()),
            last_order_qty: self
                .last_order
                .as_ref()
                .map(|(_, qty)| qty.inner())
                .unwrap_or(Decimal::ZERO),
            dealt_qty: dealt.inner(),
            remaining_qty: remaining.inner(),
            deal_price,
            updated_at_ms: now_ms,
            ..ProgressSnapshot::default()
        }
    }

    /// Persist progress, the order book of record, and the UI rows.
    /// Failures are logged, never escalated.
    pub fn write_snapshots(&self, now_ms: u64) {
        self.write_snapshots_with(self.progress_snapshot(now_ms));
    }

    /// Snapshot write with a caller-supplied progress row; the
    /// participation controller substitutes run-level totals.
    pub(crate) fn write_snapshots_with(&self, progress: ProgressSnapshot) {
        let Some(store) = &self.store else { return };
        if let Err(e) = progress.save(store.as_ref(), &self.namespace) {
            warn!(symbol = %self.symbol, error = %e, "Progress snapshot write failed");
        }
        let record =
            OrderBookOfRecord::new(self.tracker.open_orders(), self.tracker.terminal_orders());
        if let Err(e) = record.save(store.as_ref(), &self.namespace) {
            warn!(symbol = %self.symbol, error = %e, "Order record write failed");
        }
        let mut all = record.open;
        all.extend(record.completed);
        if let Err(e) = save_ui_orders(store.as_ref(), &self.namespace, &all) {
            warn!(symbol = %self.symbol, error = %e, "UI order write failed");
        }
    }

    /// Restore progress and tracked orders from the store. Any mismatch or
    /// read failure starts fresh instead.
    fn hydrate(&mut self, store: &dyn SnapshotStore, now_ms: u64) -> bool {
        let progress = match ProgressSnapshot::load(store, &self.namespace) {
            Ok(Some(p)) => p,
            Ok(None) => return false,
            Err(e) => {
                warn!(
                    symbol = %self.symbol,
                    error = %e,
                    "Progress hydration failed, starting fresh"
                );
                return false;
            }
        };
        if progress.instrument != self.symbol || progress.account != self.account.to_string() {
            warn!(
                symbol = %self.symbol,
                found = %progress.instrument,
                "Persisted progress belongs to a different run, starting fresh"
            );
            return false;
        }

        self.posts_completed = progress.posts_completed;
        self.started_at_ms = now_ms.saturating_sub(progress.progress_duration_ms);
        self.slice_size = Size::new(progress.slice_size);
        self.post_frequency_ms = progress.post_frequency_ms;
        self.total_no_of_posts = progress.total_no_of_posts;
        self.last_min_order_qty = Size::new(progress.last_min_order_qty);
        if let Some(id) = progress.last_order_id {
            self.last_order = Some((OrderId::from_string(id), Size::new(progress.last_order_qty)));
        }

        match OrderBookOfRecord::load(store, &self.namespace) {
            Ok(Some(record)) => {
                self.tracker.restore(record.open);
                self.tracker.restore(record.completed);
                self.prev_dealt_total = self.dealt_total();
            }
            Ok(None) => {}
            Err(e) => warn!(symbol = %self.symbol, error = %e, "Order record hydration failed"),
        }
        true
    }
}

fn fail_cooldown_ms(consecutive_failures: u32) -> u64 {
    (FAIL_COOLDOWN_BASE_MS * u64::from(consecutive_failures.max(1))).min(FAIL_COOLDOWN_CAP_MS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::InMemoryOrderTracker;
    use axe_core::{AssetBalance, BalanceSnapshot, BookTop, InstrumentLimits};
    use axe_exchange::{ExchangeClient, PaperExchange};
    use axe_persistence::MemoryStore;
    use rust_decimal_macros::dec;

    const SYMBOL: &str = "BTCUSDT";

    fn sample_limits() -> InstrumentLimits {
        InstrumentLimits {
            symbol: SYMBOL.to_string(),
            base: "BTC".to_string(),
            quote: "USDT".to_string(),
            price_tick: Price::new(dec!(0.1)),
            size_step: Size::new(dec!(0.1)),
            min_order_size: Size::new(dec!(1)),
            min_notional: dec!(0),
        }
    }

    fn balance_with_quote(quote_free: Decimal) -> BalanceSnapshot {
        let mut snapshot = BalanceSnapshot::default();
        snapshot.assets.insert(
            "USDT".to_string(),
            AssetBalance {
                free: quote_free,
                locked: Decimal::ZERO,
            },
        );
        snapshot.assets.insert(
            "BTC".to_string(),
            AssetBalance {
                free: dec!(1000),
                locked: Decimal::ZERO,
            },
        );
        snapshot
    }

    fn sample_book(ts_ms: u64) -> BookTop {
        BookTop::new(
            Price::new(dec!(100)),
            Size::new(dec!(50)),
            Price::new(dec!(100.5)),
            Size::new(dec!(50)),
            ts_ms,
        )
    }

    fn sample_raw(quantity: Decimal, duration_secs: u64) -> RawStrategyConfig {
        RawStrategyConfig {
            side: "BUY".to_string(),
            quantity,
            duration: duration_secs,
            ..RawStrategyConfig::default()
        }
    }

    struct Rig {
        venue: Arc<PaperExchange>,
        tracker: Arc<InMemoryOrderTracker>,
        scheduler: ExecutionScheduler,
    }

    async fn rig_with(raw: RawStrategyConfig) -> Rig {
        let venue = Arc::new(PaperExchange::default());
        venue.set_instrument(sample_limits());
        venue.set_book(SYMBOL, sample_book(0));
        venue.set_balance(AccountId::new("acct-1"), balance_with_quote(dec!(1000000)));

        let tracker = Arc::new(InMemoryOrderTracker::new());
        let limits = Arc::new(LimitsCache::new(60_000));
        let config = StrategyConfig::validate(&raw, StrategyMode::Twap).unwrap();
        let mut scheduler = ExecutionScheduler::new(
            venue.clone(),
            tracker.clone(),
            limits,
            AccountId::new("acct-1"),
            AccountKind::Spot,
            SYMBOL,
            config,
            SchedulerSettings::default(),
        );
        scheduler.open(0).await.unwrap();
        Rig {
            venue,
            tracker,
            scheduler,
        }
    }

    // Default rig: qty 10, 100s, min 1 => slice 2, one post every 20s,
    // 5 posts in total.
    async fn rig() -> Rig {
        rig_with(sample_raw(dec!(10), 100)).await
    }

    #[tokio::test]
    async fn test_first_tick_posts_a_passive_slice() {
        let mut rig = rig().await;

        let status = rig.scheduler.tick(0).await;
        assert_eq!(status, SchedulerStatus::OrderSubmitted);

        let placements = rig.venue.placements();
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].size, Size::new(dec!(2)));
        // Passive improve: bid 100 plus one 0.1 tick.
        assert_eq!(placements[0].price, Price::new(dec!(100.1)));

        // Within the window nothing else goes out.
        let status = rig.scheduler.tick(1_000).await;
        assert_eq!(status, SchedulerStatus::Waiting);
        assert_eq!(rig.venue.placements().len(), 1);
    }

    #[tokio::test]
    async fn test_completed_run_is_idempotent() {
        let mut rig = rig_with(sample_raw(dec!(2), 100)).await;

        rig.scheduler.tick(0).await;
        let order_id = rig.venue.placements()[0].client_order_id.clone();
        rig.venue.fill(&order_id, Size::new(dec!(2))).unwrap();

        let status = rig.scheduler.tick(1_000).await;
        assert_eq!(status, SchedulerStatus::StrategyCompleted);

        // Further ticks are no-ops: no venue traffic, same status.
        let placements_before = rig.venue.placements().len();
        let status = rig.scheduler.tick(2_000).await;
        assert_eq!(status, SchedulerStatus::StrategyCompleted);
        assert_eq!(rig.venue.placements().len(), placements_before);
    }

    #[tokio::test]
    async fn test_quantity_below_venue_minimum_is_an_error_not_a_completion() {
        // 0.5 passes static validation but sits under the venue minimum
        // of 1. Nothing was dealt, so this is a broken config, not a
        // finished run.
        let mut rig = rig_with(sample_raw(dec!(0.5), 100)).await;

        let status = rig.scheduler.tick(0).await;
        assert_eq!(status, SchedulerStatus::Error);
        assert!(rig.venue.placements().is_empty());

        let status = rig.scheduler.tick(1_000).await;
        assert_eq!(status, SchedulerStatus::Error);
        assert!(rig.venue.placements().is_empty());
    }

    #[tokio::test]
    async fn test_threshold_price_blocks_expensive_buy() {
        let mut raw = sample_raw(dec!(10), 100);
        raw.threshold_price = dec!(100);
        let mut rig = rig_with(raw).await;

        // Candidate bid+tick = 100.1 sits above the 100 ceiling.
        let status = rig.scheduler.tick(0).await;
        assert_eq!(status, SchedulerStatus::ThresholdPriceBreach);
        assert!(rig.venue.placements().is_empty());
    }

    #[tokio::test]
    async fn test_trigger_condition_blocks_until_reference_price_met() {
        let mut raw = sample_raw(dec!(10), 100);
        raw.trigger_condition = "Binance;BTCUSDT;gt;30000".to_string();
        let mut rig = rig_with(raw).await;
        rig.venue.set_reference_book(
            "Binance",
            "BTCUSDT",
            BookTop::new(
                Price::new(dec!(28999)),
                Size::new(dec!(1)),
                Price::new(dec!(29000)),
                Size::new(dec!(1)),
                0,
            ),
        );

        let status = rig.scheduler.tick(0).await;
        assert_eq!(status, SchedulerStatus::TriggerConditionBreach);
        assert!(rig.venue.placements().is_empty());

        // Reference catches up; the next tick trades.
        rig.venue.set_reference_book(
            "Binance",
            "BTCUSDT",
            BookTop::new(
                Price::new(dec!(30009)),
                Size::new(dec!(1)),
                Price::new(dec!(30010)),
                Size::new(dec!(1)),
                1_000,
            ),
        );
        let status = rig.scheduler.tick(1_000).await;
        assert_eq!(status, SchedulerStatus::OrderSubmitted);
    }

    #[tokio::test]
    async fn test_missing_reference_book_blocks_the_trigger() {
        let mut raw = sample_raw(dec!(10), 100);
        raw.trigger_condition = "Binance;BTCUSDT;lt;30000".to_string();
        let mut rig = rig_with(raw).await;

        // No reference book scripted: even an "lt" trigger must not pass.
        let status = rig.scheduler.tick(0).await;
        assert_eq!(status, SchedulerStatus::TriggerConditionBreach);
        assert!(rig.venue.placements().is_empty());
    }

    #[tokio::test]
    async fn test_stop_condition_halts_the_run() {
        let mut raw = sample_raw(dec!(10), 100);
        raw.stop_condition = "USDT;lt;500".to_string();
        let mut rig = rig_with(raw).await;
        rig.venue
            .set_balance(AccountId::new("acct-1"), balance_with_quote(dec!(400)));

        let status = rig.scheduler.tick(0).await;
        assert_eq!(status, SchedulerStatus::StopConditionMet);
        assert!(rig.venue.placements().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_carries_unfilled_remainder_at_taking_price() {
        let mut rig = rig().await;

        rig.scheduler.tick(0).await;
        assert_eq!(rig.venue.placements().len(), 1);

        // Next window: the untouched order is cancelled and its quantity
        // rides on the new slice, priced at the opposite touch.
        rig.venue.set_book(SYMBOL, sample_book(20_000));
        let status = rig.scheduler.tick(20_000).await;
        assert_eq!(status, SchedulerStatus::OrderSubmitted);

        assert_eq!(rig.venue.cancel_requests().len(), 1);
        let placements = rig.venue.placements();
        assert_eq!(placements.len(), 2);
        assert_eq!(placements[1].size, Size::new(dec!(4)));
        assert_eq!(placements[1].price, Price::new(dec!(100.5)));
    }

    #[tokio::test]
    async fn test_abandoned_cancel_drops_remainder_but_keeps_fills() {
        let mut rig = rig().await;

        rig.scheduler.tick(0).await;
        let order_id = rig.venue.placements()[0].client_order_id.clone();
        rig.venue.fill(&order_id, Size::new(dec!(0.5))).unwrap();
        rig.venue.swallow_cancels(10);

        rig.venue.set_book(SYMBOL, sample_book(20_000));
        rig.scheduler.tick(20_000).await;

        // Five attempts, then the order is written off; its fill stays in
        // the totals, its remainder does not ride on the next slice.
        assert_eq!(rig.venue.cancel_requests().len(), CANCEL_MAX_ATTEMPTS as usize);
        assert!(rig.tracker.get(&order_id).is_none());
        assert_eq!(rig.scheduler.dealt_total(), Size::new(dec!(0.5)));

        // A book newer than the fill clears the gate; the next slice is
        // the plain 2, not 2 plus the written-off remainder.
        rig.venue.set_book(SYMBOL, sample_book(21_000));
        let status = rig.scheduler.tick(21_000).await;
        assert_eq!(status, SchedulerStatus::OrderSubmitted);
        let placements = rig.venue.placements();
        assert_eq!(placements[1].size, Size::new(dec!(2)));
    }

    #[tokio::test]
    async fn test_submission_failure_backs_off_then_recovers() {
        let mut rig = rig().await;
        rig.venue
            .fail_next_place(ExchangeError::ConnectionError("socket reset".to_string()));

        let status = rig.scheduler.tick(0).await;
        assert_eq!(status, SchedulerStatus::OrderFailed);
        assert!(rig.venue.placements().is_empty());

        // Inside the 2s cooldown nothing is retried.
        let status = rig.scheduler.tick(1_000).await;
        assert_eq!(status, SchedulerStatus::OrderFailed);
        assert!(rig.venue.placements().is_empty());

        let status = rig.scheduler.tick(2_500).await;
        assert_eq!(status, SchedulerStatus::OrderSubmitted);
        assert_eq!(rig.venue.placements().len(), 1);
    }

    #[tokio::test]
    async fn test_recovered_orphan_shrinks_the_next_order() {
        let rig_data = rig().await;
        let Rig {
            venue,
            tracker,
            mut scheduler,
        } = rig_data;

        // An order recovered from a previous run occupies 9 of the 10
        // parent quantity but is not the scheduler's own last order.
        let orphan = ChildOrder::new(
            OrderId::new(),
            Side::Buy,
            Price::new(dec!(99)),
            Size::new(dec!(9)),
            0,
            String::new(),
        );
        let request = PlaceOrderRequest {
            account: AccountId::new("acct-1"),
            symbol: SYMBOL.to_string(),
            side: orphan.side,
            price: orphan.price,
            size: orphan.size,
            client_order_id: orphan.id.clone(),
            remark: String::new(),
        };
        venue.place_limit_order(&request).await.unwrap();
        tracker.register(orphan);

        let status = scheduler.tick(0).await;
        assert_eq!(status, SchedulerStatus::OrderSubmitted);
        let placements = venue.placements();
        assert_eq!(placements.last().unwrap().size, Size::new(dec!(1)));
    }

    #[tokio::test]
    async fn test_no_overshoot_room_skips_the_tick() {
        let Rig {
            venue,
            tracker,
            mut scheduler,
        } = rig().await;

        let orphan = ChildOrder::new(
            OrderId::new(),
            Side::Buy,
            Price::new(dec!(99)),
            Size::new(dec!(10)),
            0,
            String::new(),
        );
        let request = PlaceOrderRequest {
            account: AccountId::new("acct-1"),
            symbol: SYMBOL.to_string(),
            side: orphan.side,
            price: orphan.price,
            size: orphan.size,
            client_order_id: orphan.id.clone(),
            remark: String::new(),
        };
        venue.place_limit_order(&request).await.unwrap();
        tracker.register(orphan);

        let status = scheduler.tick(0).await;
        assert_eq!(status, SchedulerStatus::Waiting);
        assert_eq!(venue.placements().len(), 1);
    }

    #[tokio::test]
    async fn test_carry_growth_stops_at_the_size_multiplier() {
        let mut raw = sample_raw(dec!(10), 100);
        raw.max_slice_size_multiplier = dec!(2);
        let mut rig = rig_with(raw).await;

        rig.scheduler.tick(0).await;
        rig.venue.set_book(SYMBOL, sample_book(20_000));

        // Carry 2 lifts the next order to 4 = 2 x slice: hard stop.
        let status = rig.scheduler.tick(20_000).await;
        assert_eq!(status, SchedulerStatus::MaxOrderSizeBreach);
        assert_eq!(rig.venue.placements().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_book_holds_submissions() {
        let mut rig = rig().await;

        // Book stamped at 0, tick at 15s with a 10s max age.
        let status = rig.scheduler.tick(15_000).await;
        assert_eq!(status, SchedulerStatus::Waiting);
        assert!(rig.venue.placements().is_empty());

        rig.venue.set_book(SYMBOL, sample_book(15_500));
        let status = rig.scheduler.tick(16_000).await;
        assert_eq!(status, SchedulerStatus::OrderSubmitted);
    }

    #[tokio::test]
    async fn test_insufficient_balance_maps_to_status() {
        let mut rig = rig().await;
        rig.venue
            .set_balance(AccountId::new("acct-1"), balance_with_quote(dec!(50)));

        let status = rig.scheduler.tick(0).await;
        assert_eq!(status, SchedulerStatus::NotEnoughBalance);
        assert!(rig.venue.placements().is_empty());
    }

    #[tokio::test]
    async fn test_bad_reconfigure_is_sticky_until_replaced() {
        let mut rig = rig().await;

        let mut bad = sample_raw(dec!(10), 100);
        bad.side = "SIDEWAYS".to_string();
        rig.scheduler.reconfigure(&bad, StrategyMode::Twap, 0);
        assert_eq!(rig.scheduler.tick(0).await, SchedulerStatus::Error);
        assert_eq!(rig.scheduler.tick(1_000).await, SchedulerStatus::Error);
        assert!(rig.venue.placements().is_empty());

        rig.venue.set_book(SYMBOL, sample_book(2_000));
        rig.scheduler
            .reconfigure(&sample_raw(dec!(10), 100), StrategyMode::Twap, 2_000);
        assert_eq!(
            rig.scheduler.tick(2_000).await,
            SchedulerStatus::OrderSubmitted
        );
    }

    #[tokio::test]
    async fn test_all_posts_issued_winds_down() {
        // qty 4, 40s, min 1 => slice 2, freq 20s, 2 posts.
        let mut rig = rig_with(sample_raw(dec!(4), 40)).await;

        rig.scheduler.tick(0).await;
        rig.venue.set_book(SYMBOL, sample_book(20_000));
        rig.scheduler.tick(20_000).await;
        assert_eq!(rig.venue.placements().len(), 2);

        rig.venue.set_book(SYMBOL, sample_book(40_000));
        let status = rig.scheduler.tick(40_000).await;
        assert_eq!(status, SchedulerStatus::StrategyCompleted);
        // The wind-down cancelled the still-open second order.
        assert!(rig.venue.open_order_count() == 0);
        assert_eq!(rig.venue.placements().len(), 2);
    }

    #[tokio::test]
    async fn test_close_persists_and_open_resumes() {
        let store: Arc<dyn SnapshotStore> = Arc::new(MemoryStore::new());

        let venue = Arc::new(PaperExchange::default());
        venue.set_instrument(sample_limits());
        venue.set_book(SYMBOL, sample_book(0));
        venue.set_balance(AccountId::new("acct-1"), balance_with_quote(dec!(1000000)));

        let tracker = Arc::new(InMemoryOrderTracker::new());
        let limits = Arc::new(LimitsCache::new(60_000));
        let config =
            StrategyConfig::validate(&sample_raw(dec!(10), 100), StrategyMode::Twap).unwrap();
        let mut scheduler = ExecutionScheduler::new(
            venue.clone(),
            tracker.clone(),
            limits,
            AccountId::new("acct-1"),
            AccountKind::Spot,
            SYMBOL,
            config.clone(),
            SchedulerSettings::default(),
        );
        scheduler.set_store(store.clone(), "run-1");
        scheduler.open(0).await.unwrap();

        scheduler.tick(0).await;
        let order_id = venue.placements()[0].client_order_id.clone();
        venue.fill(&order_id, Size::new(dec!(1))).unwrap();
        scheduler.tick(1_000).await;
        scheduler.close(2_000).await;

        let progress = ProgressSnapshot::load(store.as_ref(), "run-1")
            .unwrap()
            .unwrap();
        assert_eq!(progress.posts_completed, 1);
        assert_eq!(progress.dealt_qty, dec!(1));
        assert_eq!(progress.deal_price, dec!(100.1));
        // close() pulled the resting order down.
        assert_eq!(venue.open_order_count(), 0);

        // A new scheduler over the same store resumes instead of starting
        // over.
        let tracker2 = Arc::new(InMemoryOrderTracker::new());
        let limits2 = Arc::new(LimitsCache::new(60_000));
        let mut resumed = ExecutionScheduler::new(
            venue.clone(),
            tracker2.clone(),
            limits2,
            AccountId::new("acct-1"),
            AccountKind::Spot,
            SYMBOL,
            config,
            SchedulerSettings::default(),
        );
        resumed.set_store(store.clone(), "run-1");
        resumed.open(10_000).await.unwrap();

        let snapshot = resumed.progress_snapshot(10_000);
        assert_eq!(snapshot.posts_completed, 1);
        assert_eq!(snapshot.dealt_qty, dec!(1));
    }

    #[test]
    fn test_fail_cooldown_scales_with_streak() {
        assert_eq!(fail_cooldown_ms(1), 2_000);
        assert_eq!(fail_cooldown_ms(3), 6_000);
        assert_eq!(fail_cooldown_ms(15), 30_000);
        assert_eq!(fail_cooldown_ms(0), 2_000);
    }
}
