//! Market-data freshness gate.
//!
//! One named flag per reason the book cannot be trusted for pricing. The
//! scheduler refuses to send while any flag is raised and re-assesses on
//! the next tick; none of the flags is sticky.

use axe_core::BookTop;
use axe_exchange::ExchangeClient;
use parking_lot::Mutex;
use tracing::warn;

pub const DEFAULT_MAX_BOOK_AGE_MS: u64 = 10_000;
pub const DEFAULT_LAG_TTL_MS: u64 = 60_000;

/// Snapshot verdict. Tradable only when every flag is clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Freshness {
    /// No top-of-book at all, or a one-sided/zero book.
    pub book_missing: bool,
    /// Book timestamp older than the configured maximum age.
    pub book_stale: bool,
    /// Book timestamp not yet past our last fill plus the venue's
    /// replication delay; quoting off it would reuse pre-fill liquidity.
    pub venue_behind: bool,
}

impl Freshness {
    pub fn is_tradable(&self) -> bool {
        !(self.book_missing || self.book_stale || self.venue_behind)
    }

    /// Raised flags by name, for logs and the block-reason metric.
    pub fn summary(&self) -> String {
        let mut reasons = Vec::new();
        if self.book_missing {
            reasons.push("book_missing");
        }
        if self.book_stale {
            reasons.push("book_stale");
        }
        if self.venue_behind {
            reasons.push("venue_behind");
        }
        if reasons.is_empty() {
            "ok".to_string()
        } else {
            reasons.join(",")
        }
    }
}

struct LagEntry {
    lag_ms: u64,
    fetched_at_ms: u64,
}

/// Assesses book snapshots against wall-clock staleness and the venue's
/// replication delay. The delay is refetched at most once per TTL.
pub struct MarketDataGate {
    max_book_age_ms: u64,
    lag_ttl_ms: u64,
    lag: Mutex<Option<LagEntry>>,
}

impl MarketDataGate {
    pub fn new(max_book_age_ms: u64, lag_ttl_ms: u64) -> Self {
        Self {
            max_book_age_ms,
            lag_ttl_ms,
            lag: Mutex::new(None),
        }
    }

    pub async fn assess(
        &self,
        client: &dyn ExchangeClient,
        book: Option<&BookTop>,
        last_fill_at_ms: Option<u64>,
        now_ms: u64,
    ) -> Freshness {
        let mut freshness = Freshness::default();

        let book = match book {
            Some(b) if !b.is_empty() => b,
            _ => {
                freshness.book_missing = true;
                return freshness;
            }
        };

        if now_ms.saturating_sub(book.ts_ms) > self.max_book_age_ms {
            freshness.book_stale = true;
        }

        if let Some(fill_ms) = last_fill_at_ms {
            let lag_ms = self.replication_lag_ms(client, now_ms).await;
            if book.ts_ms <= fill_ms + lag_ms {
                freshness.venue_behind = true;
            }
        }

        freshness
    }

    async fn replication_lag_ms(&self, client: &dyn ExchangeClient, now_ms: u64) -> u64 {
        {
            let cell = self.lag.lock();
            if let Some(entry) = cell.as_ref() {
                if now_ms.saturating_sub(entry.fetched_at_ms) < self.lag_ttl_ms {
                    return entry.lag_ms;
                }
            }
        }

        let lag_ms = match client.replication_lag_ms(client.venue()).await {
            Ok(lag_ms) => lag_ms,
            Err(e) => {
                let fallback = self.lag.lock().as_ref().map(|c| c.lag_ms).unwrap_or(0);
                warn!(
                    venue = client.venue(),
                    error = %e,
                    "Replication lag lookup failed, using last known value"
                );
                fallback
            }
        };
        *self.lag.lock() = Some(LagEntry {
            lag_ms,
            fetched_at_ms: now_ms,
        });
        lag_ms
    }
}
