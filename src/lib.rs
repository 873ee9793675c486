//! coindash - market-data backbone for a cryptocurrency dashboard
//!
//! Tracks a watchlist of tokens and retrieves their market data from the
//! GeckoTerminal and CoinGecko public APIs through a rate-limited,
//! cache-backed, retry-resilient fetch pipeline. The UI layer (tables,
//! charts, forms) consumes [`market::MarketDataService`] and
//! [`watchlist::Watchlist`] in-process and renders whatever outcome it is
//! handed: a fresh value, a stale fallback, or a "retrying" placeholder.

pub mod apis;
pub mod cache;
pub mod config;
pub mod errors;
pub mod fetcher;
pub mod logger;
pub mod market;
pub mod models;
pub mod networks;
pub mod retry;
pub mod scheduler;
pub mod watchlist;

pub use config::Config;
pub use errors::{FetchError, WatchlistError};
pub use fetcher::{FetchFn, Fetched, ResourceFetcher, ResourceKey};
pub use market::MarketDataService;
pub use models::{PricePoint, RefreshSummary, SocialLinks, TokenSnapshot};
pub use watchlist::{TrackedCoin, Watchlist};
