//! Slice planning.
//!
//! Pure arithmetic over the remaining order: no clocks, no IO. The
//! scheduler re-plans whenever a refreshed instrument minimum exceeds the
//! one the current plan was built from.

use axe_core::Size;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// One pacing plan for the remainder of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlicePlan {
    /// Target quantity per child order.
    pub slice_size: Size,
    /// Minimum spacing between posts.
    pub post_frequency_ms: u64,
    /// Planned posts over the whole run, incl. the ones already issued.
    pub total_no_of_posts: u32,
}

/// Derive slice size and pacing from the remaining quantity and time.
///
/// Starts from a slice of twice the instrument minimum and the frequency
/// that spreads it evenly over the remaining duration. When that frequency
/// falls under the configured default, the default wins and the slice is
/// scaled up instead (rounded up to the size step, floored at the
/// instrument minimum), so pacing never goes faster than the default.
pub fn plan(
    remaining: Size,
    remaining_duration_ms: u64,
    min_order_qty: Size,
    default_frequency_ms: u64,
    size_step: Size,
    posts_completed: u32,
) -> SlicePlan {
    if !remaining.is_positive() {
        return SlicePlan {
            slice_size: Size::ZERO,
            post_frequency_ms: default_frequency_ms,
            total_no_of_posts: posts_completed,
        };
    }

    // Out of time: deliver the remainder at the default pace.
    if remaining_duration_ms == 0 {
        return SlicePlan {
            slice_size: remaining,
            post_frequency_ms: default_frequency_ms,
            total_no_of_posts: posts_completed.saturating_add(1),
        };
    }

    let duration = Decimal::from(remaining_duration_ms);
    let default_frequency = Decimal::from(default_frequency_ms);

    let mut slice = min_order_qty * Decimal::TWO;
    let mut frequency = duration * slice.inner() / remaining.inner();

    if frequency < default_frequency {
        frequency = default_frequency;
        slice = Size::new(remaining.inner() * default_frequency / duration)
            .round_up_to_step(size_step)
            .max(min_order_qty);
    }

    let frequency_ms = frequency
        .floor()
        .to_u64()
        .unwrap_or(remaining_duration_ms)
        .max(1);
    // The sub-2x-minimum tail still needs one post.
    let planned = (remaining_duration_ms / frequency_ms).max(1);
    let total_no_of_posts =
        u32::try_from(planned).unwrap_or(u32::MAX).saturating_add(posts_completed);

    SlicePlan {
        slice_size: slice,
        post_frequency_ms: frequency_ms,
        total_no_of_posts,
    }
}
