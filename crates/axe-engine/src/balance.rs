//! Balance affordability checks with denial backoff.
//!
//! The guard answers one question per tick: can the account pay for the
//! candidate child order at the candidate price. Normal reads come from a
//! TTL cache; after a denial the next evaluation bypasses the cache, and
//! repeated denials back off exponentially so a drained account does not
//! hammer the balance endpoint once per second.

use axe_core::{
    AccountId, AccountKind, BalanceSnapshot, InstrumentLimits, PositionMode, Price, Side, Size,
};
use axe_exchange::{ExchangeClient, ExchangeResult};
use axe_telemetry::Metrics;
use dashmap::DashMap;
use tracing::warn;

pub const DEFAULT_BALANCE_TTL_MS: u64 = 5_000;

const BACKOFF_BASE_MS: u64 = 1_000;
const BACKOFF_FACTOR: f64 = 1.5;
const BACKOFF_CAP_MS: u64 = 11_000;

struct BalanceEntry {
    snapshot: BalanceSnapshot,
    fetched_at_ms: u64,
}

/// Read-through TTL cache of balance snapshots, keyed by account.
pub struct BalanceCache {
    entries: DashMap<AccountId, BalanceEntry>,
    ttl_ms: u64,
}

impl BalanceCache {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_ms,
        }
    }

    /// Cached snapshot while fresh; otherwise (or when `force_fresh`)
    /// refetched from the venue. Fetch errors propagate, the caller
    /// decides whether they block.
    pub async fn get(
        &self,
        client: &dyn ExchangeClient,
        account: &AccountId,
        now_ms: u64,
        force_fresh: bool,
    ) -> ExchangeResult<BalanceSnapshot> {
        if !force_fresh {
            if let Some(entry) = self.entries.get(account) {
                if now_ms.saturating_sub(entry.fetched_at_ms) < self.ttl_ms {
                    return Ok(entry.snapshot.clone());
                }
            }
        }

        let snapshot = client.balance_snapshot(account).await?;
        self.entries.insert(
            account.clone(),
            BalanceEntry {
                snapshot: snapshot.clone(),
                fetched_at_ms: now_ms,
            },
        );
        Ok(snapshot)
    }
}

/// Verdict of one affordability evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceCheck {
    Approved { affordable: Size },
    Denied { reason: String },
}

impl BalanceCheck {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }
}

pub struct BalanceGuard {
    kind: AccountKind,
    cache: BalanceCache,
    denial_streak: u32,
    last_denied_at_ms: Option<u64>,
}

impl BalanceGuard {
    pub fn new(kind: AccountKind, ttl_ms: u64) -> Self {
        Self {
            kind,
            cache: BalanceCache::new(ttl_ms),
            denial_streak: 0,
            last_denied_at_ms: None,
        }
    }

    /// Shared snapshot access for callers that only need a balance read
    /// (stop-condition evaluation).
    pub fn cache(&self) -> &BalanceCache {
        &self.cache
    }

    pub fn denial_streak(&self) -> u32 {
        self.denial_streak
    }

    /// Whether `quantity` at `price` is payable from the account right now.
    ///
    /// Inside the post-denial backoff window this answers without touching
    /// the venue; immediately after the window it refetches instead of
    /// trusting the cache. A fetch error is a denial. Approval resets the
    /// streak.
    pub async fn check(
        &mut self,
        client: &dyn ExchangeClient,
        account: &AccountId,
        limits: &InstrumentLimits,
        side: Side,
        price: Price,
        quantity: Size,
        now_ms: u64,
    ) -> BalanceCheck {
        if let Some(denied_at) = self.last_denied_at_ms {
            let window_ms = backoff_ms(self.denial_streak);
            let elapsed_ms = now_ms.saturating_sub(denied_at);
            if elapsed_ms < window_ms {
                return BalanceCheck::Denied {
                    reason: format!(
                        "in denial backoff for another {}ms",
                        window_ms - elapsed_ms
                    ),
                };
            }
        }

        if !price.is_positive() {
            return BalanceCheck::Denied {
                reason: "no usable price for affordability".to_string(),
            };
        }

        let force_fresh = self.denial_streak > 0;
        let snapshot = match self.cache.get(client, account, now_ms, force_fresh).await {
            Ok(snapshot) => snapshot,
            Err(e) => return self.deny(account, now_ms, format!("balance fetch failed: {e}")),
        };

        let affordable = affordable_quantity(self.kind, &snapshot, limits, side, price);
        if affordable < quantity {
            return self.deny(
                account,
                now_ms,
                format!("affordable {affordable} below requested {quantity}"),
            );
        }

        self.denial_streak = 0;
        self.last_denied_at_ms = None;
        BalanceCheck::Approved { affordable }
    }

    fn deny(&mut self, account: &AccountId, now_ms: u64, reason: String) -> BalanceCheck {
        self.denial_streak += 1;
        self.last_denied_at_ms = Some(now_ms);
        Metrics::balance_denied(account.as_str());
        warn!(
            account = %account,
            streak = self.denial_streak,
            reason = %reason,
            "Balance check denied"
        );
        BalanceCheck::Denied { reason }
    }
}

/// Base quantity the account can pay for at `price`.
fn affordable_quantity(
    kind: AccountKind,
    snapshot: &BalanceSnapshot,
    limits: &InstrumentLimits,
    side: Side,
    price: Price,
) -> Size {
    match kind {
        AccountKind::Spot => match side {
            Side::Buy => Size::new(snapshot.free(&limits.quote) / price.inner()),
            Side::Sell => Size::new(snapshot.free(&limits.base)),
        },
        AccountKind::Margin(mode) | AccountKind::Futures(mode) => {
            let leveraged = Size::new(snapshot.buying_power * snapshot.leverage / price.inner());
            match mode {
                // An opposing position is reduced before new margin is
                // consumed.
                PositionMode::Net => {
                    let opposing = match side {
                        Side::Buy => snapshot.short_qty,
                        Side::Sell => snapshot.long_qty,
                    };
                    leveraged + opposing
                }
                PositionMode::Hedge => leveraged,
            }
        }
    }
}

fn backoff_ms(streak: u32) -> u64 {
    let factor = BACKOFF_FACTOR.powi(streak.saturating_sub(1).min(32) as i32);
    ((BACKOFF_BASE_MS as f64) * factor).min(BACKOFF_CAP_MS as f64) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use axe_core::AssetBalance;
    use axe_exchange::PaperExchange;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn sample_limits() -> InstrumentLimits {
        InstrumentLimits {
            symbol: "BTCUSDT".to_string(),
            base: "BTC".to_string(),
            quote: "USDT".to_string(),
            ..InstrumentLimits::default()
        }
    }

    fn spot_snapshot(base_free: Decimal, quote_free: Decimal) -> BalanceSnapshot {
        let mut snapshot = BalanceSnapshot::default();
        snapshot.assets.insert(
            "BTC".to_string(),
            AssetBalance {
                free: base_free,
                locked: Decimal::ZERO,
            },
        );
        snapshot.assets.insert(
            "USDT".to_string(),
            AssetBalance {
                free: quote_free,
                locked: Decimal::ZERO,
            },
        );
        snapshot
    }

    fn leveraged_snapshot(
        buying_power: Decimal,
        leverage: Decimal,
        long_qty: Decimal,
        short_qty: Decimal,
    ) -> BalanceSnapshot {
        BalanceSnapshot {
            buying_power,
            leverage,
            long_qty: Size::new(long_qty),
            short_qty: Size::new(short_qty),
            ..BalanceSnapshot::default()
        }
    }

    #[test]
    fn test_spot_affordability_formulas() {
        let limits = sample_limits();
        let snapshot = spot_snapshot(dec!(3), dec!(1000));
        let price = Price::new(dec!(100));

        assert_eq!(
            affordable_quantity(AccountKind::Spot, &snapshot, &limits, Side::Buy, price),
            Size::new(dec!(10))
        );
        assert_eq!(
            affordable_quantity(AccountKind::Spot, &snapshot, &limits, Side::Sell, price),
            Size::new(dec!(3))
        );
    }

    #[test]
    fn test_net_mode_adds_opposing_position() {
        let limits = sample_limits();
        let snapshot = leveraged_snapshot(dec!(1000), dec!(2), dec!(4), dec!(5));
        let price = Price::new(dec!(100));
        let kind = AccountKind::Futures(PositionMode::Net);

        // 1000 * 2 / 100 = 20, plus the short being reduced on a buy.
        assert_eq!(
            affordable_quantity(kind, &snapshot, &limits, Side::Buy, price),
            Size::new(dec!(25))
        );
        assert_eq!(
            affordable_quantity(kind, &snapshot, &limits, Side::Sell, price),
            Size::new(dec!(24))
        );
    }

    #[test]
    fn test_hedge_mode_ignores_positions() {
        let limits = sample_limits();
        let snapshot = leveraged_snapshot(dec!(1000), dec!(2), dec!(4), dec!(5));
        let price = Price::new(dec!(100));
        let kind = AccountKind::Margin(PositionMode::Hedge);

        for side in [Side::Buy, Side::Sell] {
            assert_eq!(
                affordable_quantity(kind, &snapshot, &limits, side, price),
                Size::new(dec!(20))
            );
        }
    }

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff_ms(1), 1_000);
        assert_eq!(backoff_ms(2), 1_500);
        assert_eq!(backoff_ms(3), 2_250);
        assert_eq!(backoff_ms(10), 11_000);
        assert_eq!(backoff_ms(100), 11_000);
    }

    #[tokio::test]
    async fn test_denial_backs_off_then_forces_refresh() {
        let venue = PaperExchange::default();
        let account = AccountId::new("acct-1");
        let limits = sample_limits();
        venue.set_balance(account.clone(), spot_snapshot(dec!(0), dec!(100)));

        let mut guard = BalanceGuard::new(AccountKind::Spot, 60_000);
        let price = Price::new(dec!(100));
        let quantity = Size::new(dec!(5));

        let verdict = guard
            .check(&venue, &account, &limits, Side::Buy, price, quantity, 0)
            .await;
        assert!(!verdict.is_approved());
        assert_eq!(guard.denial_streak(), 1);

        // Funds arrive, but inside the window the guard answers from the
        // denial alone.
        venue.set_balance(account.clone(), spot_snapshot(dec!(0), dec!(1000)));
        let verdict = guard
            .check(&venue, &account, &limits, Side::Buy, price, quantity, 500)
            .await;
        assert!(!verdict.is_approved());
        assert_eq!(guard.denial_streak(), 1);

        // Past the window the fetch is forced fresh and approves.
        let verdict = guard
            .check(&venue, &account, &limits, Side::Buy, price, quantity, 1_100)
            .await;
        assert_eq!(
            verdict,
            BalanceCheck::Approved {
                affordable: Size::new(dec!(10))
            }
        );
        assert_eq!(guard.denial_streak(), 0);
    }

    #[tokio::test]
    async fn test_consecutive_denials_widen_the_window() {
        let venue = PaperExchange::default();
        let account = AccountId::new("acct-1");
        let limits = sample_limits();
        venue.set_balance(account.clone(), spot_snapshot(dec!(0), dec!(100)));

        let mut guard = BalanceGuard::new(AccountKind::Spot, 60_000);
        let price = Price::new(dec!(100));
        let quantity = Size::new(dec!(5));

        guard
            .check(&venue, &account, &limits, Side::Buy, price, quantity, 0)
            .await;
        // Second fresh denial at t=1200: streak 2, window 1500ms.
        guard
            .check(&venue, &account, &limits, Side::Buy, price, quantity, 1_200)
            .await;
        assert_eq!(guard.denial_streak(), 2);

        venue.set_balance(account.clone(), spot_snapshot(dec!(0), dec!(1000)));
        let verdict = guard
            .check(&venue, &account, &limits, Side::Buy, price, quantity, 2_000)
            .await;
        assert!(!verdict.is_approved());

        let verdict = guard
            .check(&venue, &account, &limits, Side::Buy, price, quantity, 2_800)
            .await;
        assert!(verdict.is_approved());
    }

    #[tokio::test]
    async fn test_fetch_error_counts_as_denial() {
        let venue = PaperExchange::default();
        let account = AccountId::new("acct-1");
        let limits = sample_limits();

        let mut guard = BalanceGuard::new(AccountKind::Spot, 60_000);
        let price = Price::new(dec!(100));
        let quantity = Size::new(dec!(1));

        let verdict = guard
            .check(&venue, &account, &limits, Side::Buy, price, quantity, 0)
            .await;
        match verdict {
            BalanceCheck::Denied { reason } => assert!(reason.contains("fetch failed")),
            other => panic!("expected denial, got {other:?}"),
        }
        assert_eq!(guard.denial_streak(), 1);

        venue.set_balance(account.clone(), spot_snapshot(dec!(0), dec!(1000)));
        let verdict = guard
            .check(&venue, &account, &limits, Side::Buy, price, quantity, 1_100)
            .await;
        assert!(verdict.is_approved());
    }
}
