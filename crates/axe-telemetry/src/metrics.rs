//! Prometheus metrics for the axe execution engine.
//!
//! Covers the operational surface of a strategy run:
//! - Child-order submissions, cancellations, failures, abandons
//! - Gate blocks, balance denials, condition blocks
//! - Scheduler status and progress gauges
//! - Tick duration and order size distributions
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, GaugeVec,
    HistogramVec,
};

/// Total child orders submitted.
pub static ORDERS_SUBMITTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "axe_orders_submitted_total",
        "Total child orders submitted",
        &["instrument", "side"]
    )
    .unwrap()
});

/// Total child orders cancelled.
pub static ORDERS_CANCELLED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "axe_orders_cancelled_total",
        "Total child orders cancelled",
        &["instrument"]
    )
    .unwrap()
});

/// Total order submission failures.
pub static ORDER_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "axe_order_failures_total",
        "Total child order submission failures",
        &["instrument"]
    )
    .unwrap()
});

/// Total orders abandoned after the cancel retry bound.
pub static CANCELS_ABANDONED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "axe_cancels_abandoned_total",
        "Total orders abandoned after repeated cancel attempts",
        &["instrument"]
    )
    .unwrap()
});

/// Market-data gate block count.
/// Labels: reason (book_missing/book_stale/venue_behind)
pub static GATE_BLOCKED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "axe_gate_blocked_total",
        "Total ticks blocked by the market-data gate",
        &["reason", "instrument"]
    )
    .unwrap()
});

/// Total balance-guard denials.
pub static BALANCE_DENIED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "axe_balance_denied_total",
        "Total submissions denied by the balance guard",
        &["account"]
    )
    .unwrap()
});

/// Total ticks blocked by a trigger/stop condition.
/// Labels: kind (trigger/stop)
pub static CONDITION_BLOCKED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "axe_condition_blocked_total",
        "Total ticks blocked by a configured condition",
        &["kind"]
    )
    .unwrap()
});

/// Scheduler status (1 = active status, 0 = inactive).
pub static SCHEDULER_STATUS: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "axe_scheduler_status",
        "Current scheduler status (1=active, 0=inactive)",
        &["instrument", "status"]
    )
    .unwrap()
});

/// Remaining parent-order quantity.
pub static REMAINING_QTY: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "axe_remaining_qty",
        "Remaining parent-order quantity in base units",
        &["instrument"]
    )
    .unwrap()
});

/// Cumulative dealt quantity.
pub static DEALT_QTY: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "axe_dealt_qty",
        "Cumulative dealt quantity in base units",
        &["instrument"]
    )
    .unwrap()
});

/// Planned slice size.
pub static SLICE_SIZE: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "axe_slice_size",
        "Planned slice size in base units",
        &["instrument"]
    )
    .unwrap()
});

/// Planned post frequency in milliseconds.
pub static POST_FREQUENCY_MS: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "axe_post_frequency_ms",
        "Planned post frequency in milliseconds",
        &["instrument"]
    )
    .unwrap()
});

/// Participation burst target quantity.
pub static PARTICIPATION_TARGET_QTY: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "axe_participation_target_qty",
        "Current participation burst target quantity",
        &["instrument"]
    )
    .unwrap()
});

/// Tick duration in milliseconds.
pub static TICK_DURATION_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "axe_tick_duration_ms",
        "Scheduler tick duration in milliseconds",
        &["instrument"],
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 500.0, 1000.0, 5000.0]
    )
    .unwrap()
});

/// Submitted child-order size distribution.
pub static CHILD_ORDER_SIZE: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "axe_child_order_size",
        "Submitted child-order size in base units",
        &["instrument"],
        vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 50.0, 100.0, 500.0]
    )
    .unwrap()
});

/// All scheduler statuses, for the reset-then-set gauge pattern.
const SCHEDULER_STATUSES: &[&str] = &[
    "WAITING",
    "ORDER_SUBMITTED",
    "ORDER_CANCELLED",
    "STRATEGY_COMPLETED",
    "ERROR",
    "NOT_ENOUGH_BALANCE",
    "ORDER_FAILED",
    "THRESHOLD_PRICE_BREACH",
    "MAX_ORDER_SIZE_BREACH",
    "TRIGGER_CONDITION_BREACH",
    "STOP_CONDITION_MET",
];

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a child-order submission.
    pub fn order_submitted(instrument: &str, side: &str, size: f64) {
        ORDERS_SUBMITTED_TOTAL
            .with_label_values(&[instrument, side])
            .inc();
        CHILD_ORDER_SIZE
            .with_label_values(&[instrument])
            .observe(size);
    }

    /// Record a completed cancellation.
    pub fn order_cancelled(instrument: &str) {
        ORDERS_CANCELLED_TOTAL.with_label_values(&[instrument]).inc();
    }

    /// Record a submission failure.
    pub fn order_failed(instrument: &str) {
        ORDER_FAILURES_TOTAL.with_label_values(&[instrument]).inc();
    }

    /// Record an order abandoned after the cancel retry bound.
    pub fn cancel_abandoned(instrument: &str) {
        CANCELS_ABANDONED_TOTAL
            .with_label_values(&[instrument])
            .inc();
    }

    /// Record a market-data gate block.
    pub fn gate_blocked(reason: &str, instrument: &str) {
        GATE_BLOCKED_TOTAL
            .with_label_values(&[reason, instrument])
            .inc();
    }

    /// Record a balance-guard denial.
    pub fn balance_denied(account: &str) {
        BALANCE_DENIED_TOTAL.with_label_values(&[account]).inc();
    }

    /// Record a condition block.
    pub fn condition_blocked(kind: &str) {
        CONDITION_BLOCKED_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Set the scheduler status gauge.
    /// Only the active status is set to 1, all others to 0.
    pub fn scheduler_status(instrument: &str, status: &str) {
        for s in SCHEDULER_STATUSES {
            SCHEDULER_STATUS
                .with_label_values(&[instrument, s])
                .set(0.0);
        }
        SCHEDULER_STATUS
            .with_label_values(&[instrument, status])
            .set(1.0);
    }

    /// Record progress quantities.
    pub fn progress(instrument: &str, dealt: f64, remaining: f64) {
        DEALT_QTY.with_label_values(&[instrument]).set(dealt);
        REMAINING_QTY.with_label_values(&[instrument]).set(remaining);
    }

    /// Record the current slice plan.
    pub fn slice_plan(instrument: &str, slice_size: f64, post_frequency_ms: f64) {
        SLICE_SIZE.with_label_values(&[instrument]).set(slice_size);
        POST_FREQUENCY_MS
            .with_label_values(&[instrument])
            .set(post_frequency_ms);
    }

    /// Record the participation burst target.
    pub fn participation_target(instrument: &str, target_qty: f64) {
        PARTICIPATION_TARGET_QTY
            .with_label_values(&[instrument])
            .set(target_qty);
    }

    /// Record one tick's duration.
    pub fn tick_duration(instrument: &str, duration_ms: f64) {
        TICK_DURATION_MS
            .with_label_values(&[instrument])
            .observe(duration_ms);
    }
}
