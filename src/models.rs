/// Domain types shared between the API clients, the cache and the service
/// layer. All of them serialize cleanly because they are what the cache
/// persists.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One point of a price chart series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// Social links for a tracked token. Empty string means absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLinks {
    pub twitter: String,
    pub telegram: String,
    pub discord: String,
    pub reddit: String,
    pub facebook: String,
    pub bitcointalk: String,
    pub github: String,
    pub medium: String,
    pub youtube: String,
}

/// Market state of one tracked token, combined from the DEX terminal's
/// token info and its most liquid pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSnapshot {
    pub price_usd: f64,
    pub price_change_24h: f64,
    pub price_change_7d: f64,
    pub volume_24h: f64,
    pub liquidity_usd: f64,
    pub holders: u64,
    pub description: String,
    pub website: String,
    pub logo: String,
    pub socials: SocialLinks,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Outcome counts of a whole-watchlist refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub updated: usize,
    pub stale: usize,
    pub pending: usize,
    pub failed: usize,
}

impl RefreshSummary {
    pub fn total(&self) -> usize {
        self.updated + self.stale + self.pending + self.failed
    }
}
