//! Instrument limits cache.
//!
//! Read-through cache over [`ExchangeClient::instrument_limits`] with an
//! explicit TTL, keyed by symbol. The scheduler reads through it on its
//! refresh interval; a version counter lets callers detect changes without
//! comparing whole structs.

use axe_core::InstrumentLimits;
use axe_exchange::ExchangeClient;
use dashmap::DashMap;
use tracing::warn;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone)]
struct LimitsEntry {
    limits: InstrumentLimits,
    fetched_at_ms: u64,
    version: u64,
}

/// TTL read-through cache for instrument limits.
pub struct LimitsCache {
    entries: DashMap<String, LimitsEntry>,
    ttl_ms: u64,
}

impl LimitsCache {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_ms,
        }
    }

    /// Cached value regardless of age, no fetch.
    pub fn peek(&self, symbol: &str) -> Option<InstrumentLimits> {
        self.entries.get(symbol).map(|e| e.limits.clone())
    }

    /// Version of the cached entry, bumped on every refetch that changes
    /// the limits.
    pub fn version(&self, symbol: &str) -> u64 {
        self.entries.get(symbol).map(|e| e.version).unwrap_or(0)
    }

    /// Read through the cache: fresh entries are served as-is, stale or
    /// missing ones are fetched from the venue.
    ///
    /// A fetch failure with a stale entry in place serves the stale value;
    /// instrument limits move rarely and a transient venue error should
    /// not stall the tick.
    pub async fn get(
        &self,
        client: &dyn ExchangeClient,
        symbol: &str,
        now_ms: u64,
    ) -> EngineResult<InstrumentLimits> {
        if let Some(entry) = self.entries.get(symbol) {
            if now_ms.saturating_sub(entry.fetched_at_ms) < self.ttl_ms {
                return Ok(entry.limits.clone());
            }
        }

        match client.instrument_limits(symbol).await {
            Ok(limits) => {
                let version = self
                    .entries
                    .get(symbol)
                    .map(|e| {
                        if e.limits == limits {
                            e.version
                        } else {
                            e.version + 1
                        }
                    })
                    .unwrap_or(1);
                self.entries.insert(
                    symbol.to_string(),
                    LimitsEntry {
                        limits: limits.clone(),
                        fetched_at_ms: now_ms,
                        version,
                    },
                );
                Ok(limits)
            }
            Err(e) => {
                if let Some(mut entry) = self.entries.get_mut(symbol) {
                    warn!(symbol, error = %e, "Limits refresh failed, serving stale entry");
                    entry.fetched_at_ms = now_ms;
                    return Ok(entry.limits.clone());
                }
                Err(EngineError::InstrumentUnavailable(format!("{symbol}: {e}")))
            }
        }
    }
}
