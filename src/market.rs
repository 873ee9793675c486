//! Consumer-facing market data service
//!
//! Owns the injected core (cache, one scheduler per upstream, the retry
//! scheduler) plus the two API clients, and exposes the dashboard's named
//! operations. Every operation returns a [`Fetched`] outcome; the only
//! `Err` a caller can see is the fail-fast configuration class
//! (unsupported network).

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::apis::coingecko::{CoinDetails, CoinGeckoClient, MarketCoin};
use crate::apis::geckoterminal::{GeckoTerminalClient, PoolData, TokenInfoAttributes};
use crate::cache::{CacheStorage, CacheStore, SqliteStorage};
use crate::config::Config;
use crate::errors::FetchError;
use crate::fetcher::{FetchFn, Fetched, ResourceFetcher, ResourceKey};
use crate::logger::{self, LogTag};
use crate::models::{PricePoint, RefreshSummary, SocialLinks, TokenSnapshot};
use crate::networks::Network;
use crate::retry::RetryScheduler;
use crate::scheduler::RequestScheduler;
use crate::watchlist::{TrackedCoin, Watchlist};

// Resource kinds, used as the first segment of every cache key and for
// per-kind TTL overrides.
pub const KIND_MARKETS: &str = "markets";
pub const KIND_COIN: &str = "coin";
pub const KIND_CHART: &str = "chart";
pub const KIND_TOKEN: &str = "token";
pub const KIND_HISTORY: &str = "history";

/// Daily candles requested for a token's price history chart.
const HISTORY_DEFAULT_DAYS: u32 = 30;

pub struct MarketDataService {
    config: Config,
    cache: Arc<CacheStore>,
    gecko_fetcher: ResourceFetcher,
    coingecko_fetcher: ResourceFetcher,
    geckoterminal: Arc<GeckoTerminalClient>,
    coingecko: Arc<CoinGeckoClient>,
}

impl MarketDataService {
    /// Build the full pipeline with the SQLite cache at the configured path.
    pub fn new(config: Config) -> Result<Self> {
        let storage = SqliteStorage::open(&config.cache.database_path)
            .map_err(|e| anyhow::anyhow!(e))
            .with_context(|| {
                format!("failed to open cache at {}", config.cache.database_path)
            })?;
        Self::with_storage(config, Arc::new(storage))
    }

    /// Build the pipeline over a caller-supplied storage medium.
    pub fn with_storage(config: Config, storage: Arc<dyn CacheStorage>) -> Result<Self> {
        let cache = Arc::new(CacheStore::new(storage));
        let retries = Arc::new(RetryScheduler::new());
        let retry_delay = Duration::from_millis(config.retry.backoff_ms);

        let gecko_scheduler = Arc::new(RequestScheduler::new(Duration::from_millis(
            config.geckoterminal.request_interval_ms,
        )));
        let coingecko_scheduler = Arc::new(RequestScheduler::new(Duration::from_millis(
            config.coingecko.request_interval_ms,
        )));

        let geckoterminal = Arc::new(
            GeckoTerminalClient::new(
                config.geckoterminal.base_url.clone(),
                config.geckoterminal.timeout_secs,
            )
            .map_err(|e| anyhow::anyhow!(e))?,
        );
        let coingecko = Arc::new(
            CoinGeckoClient::new(
                config.coingecko.base_url.clone(),
                config.coingecko.timeout_secs,
            )
            .map_err(|e| anyhow::anyhow!(e))?,
        );

        logger::info(LogTag::Market, "market data service initialized");

        Ok(Self {
            gecko_fetcher: ResourceFetcher::new(
                Arc::clone(&cache),
                gecko_scheduler,
                Arc::clone(&retries),
                retry_delay,
            ),
            coingecko_fetcher: ResourceFetcher::new(
                Arc::clone(&cache),
                coingecko_scheduler,
                retries,
                retry_delay,
            ),
            cache,
            geckoterminal,
            coingecko,
            config,
        })
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    fn ttl(&self, kind: &str) -> Duration {
        self.config.cache.ttl_for(kind)
    }

    fn max_retries(&self) -> u32 {
        self.config.retry.max_retries
    }

    // ------------------------------------------------------------------
    // CoinGecko-backed operations
    // ------------------------------------------------------------------

    /// Top coins ranked by market cap (one page).
    pub async fn top_markets(&self, page: u32) -> Fetched<Vec<MarketCoin>> {
        let key = self.markets_key(page);
        self.coingecko_fetcher
            .fetch(
                &key,
                self.ttl(KIND_MARKETS),
                self.max_retries(),
                self.markets_fetch_fn(page),
            )
            .await
    }

    /// Explicit user refresh of the top markets view.
    pub async fn refresh_top_markets(&self, page: u32) -> Fetched<Vec<MarketCoin>> {
        let key = self.markets_key(page);
        self.coingecko_fetcher
            .refresh(
                &key,
                self.ttl(KIND_MARKETS),
                self.max_retries(),
                self.markets_fetch_fn(page),
            )
            .await
    }

    pub async fn coin_details(&self, id: &str) -> Fetched<CoinDetails> {
        let key = ResourceKey::new(KIND_COIN, id);
        let client = Arc::clone(&self.coingecko);
        let id = id.to_string();
        let fetch_fn: FetchFn<CoinDetails> = Arc::new(move || {
            let client = Arc::clone(&client);
            let id = id.clone();
            Box::pin(async move { client.coin_details(&id).await })
        });
        self.coingecko_fetcher
            .fetch(&key, self.ttl(KIND_COIN), self.max_retries(), fetch_fn)
            .await
    }

    /// Chart series for a listed coin over `days` ("1", "7", "30", "max").
    pub async fn market_chart(&self, id: &str, days: &str) -> Fetched<Vec<PricePoint>> {
        let key = ResourceKey::with_param(KIND_CHART, id, days);
        let client = Arc::clone(&self.coingecko);
        let vs = self.config.coingecko.vs_currency.clone();
        let id = id.to_string();
        let days = days.to_string();
        let fetch_fn: FetchFn<Vec<PricePoint>> = Arc::new(move || {
            let client = Arc::clone(&client);
            let vs = vs.clone();
            let id = id.clone();
            let days = days.clone();
            Box::pin(async move { client.market_chart(&id, &vs, &days).await })
        });
        self.coingecko_fetcher
            .fetch(&key, self.ttl(KIND_CHART), self.max_retries(), fetch_fn)
            .await
    }

    fn markets_key(&self, page: u32) -> ResourceKey {
        ResourceKey::with_param(
            KIND_MARKETS,
            self.config.coingecko.vs_currency.clone(),
            page.to_string(),
        )
    }

    fn markets_fetch_fn(&self, page: u32) -> FetchFn<Vec<MarketCoin>> {
        let client = Arc::clone(&self.coingecko);
        let vs = self.config.coingecko.vs_currency.clone();
        let per_page = self.config.coingecko.per_page;
        Arc::new(move || {
            let client = Arc::clone(&client);
            let vs = vs.clone();
            Box::pin(async move { client.markets(&vs, per_page, page).await })
        })
    }

    // ------------------------------------------------------------------
    // GeckoTerminal-backed operations
    // ------------------------------------------------------------------

    /// Current market state of one tracked token: info endpoint for
    /// holders/description/links, pools endpoint for price, volume and
    /// liquidity. Both calls run inside one scheduler slot, as one logical
    /// operation against the upstream.
    pub async fn token_snapshot(
        &self,
        coin: &TrackedCoin,
    ) -> Result<Fetched<TokenSnapshot>, FetchError> {
        let network = self.resolve_network(coin)?;
        let key = token_key(KIND_TOKEN, network, coin);
        let fetch_fn = self.snapshot_fetch_fn(network, coin);
        Ok(self
            .gecko_fetcher
            .fetch(&key, self.ttl(KIND_TOKEN), self.max_retries(), fetch_fn)
            .await)
    }

    /// Explicit user refresh of one token, honored immediately: cancels any
    /// armed retry and bypasses the freshness check.
    pub async fn refresh_token(
        &self,
        coin: &TrackedCoin,
    ) -> Result<Fetched<TokenSnapshot>, FetchError> {
        let network = self.resolve_network(coin)?;
        let key = token_key(KIND_TOKEN, network, coin);
        let fetch_fn = self.snapshot_fetch_fn(network, coin);
        Ok(self
            .gecko_fetcher
            .refresh(&key, self.ttl(KIND_TOKEN), self.max_retries(), fetch_fn)
            .await)
    }

    /// Daily close prices for a token's most relevant pool. An existing
    /// token with no pool yields an empty series, not an error.
    pub async fn token_price_history(
        &self,
        coin: &TrackedCoin,
    ) -> Result<Fetched<Vec<PricePoint>>, FetchError> {
        let network = self.resolve_network(coin)?;
        let key = ResourceKey::with_param(
            KIND_HISTORY,
            format!("{}:{}", network.id, coin.contract),
            format!("{}d", HISTORY_DEFAULT_DAYS),
        );

        let client = Arc::clone(&self.geckoterminal);
        let api_path = network.api_path;
        let contract = coin.contract.clone();
        let fetch_fn: FetchFn<Vec<PricePoint>> = Arc::new(move || {
            let client = Arc::clone(&client);
            let contract = contract.clone();
            Box::pin(async move {
                let pools = client.token_pools(api_path, &contract).await?;
                let Some(pool_address) = pools.first().and_then(|p| p.pool_address()) else {
                    logger::warning(
                        LogTag::Market,
                        &format!("no pool found for {}, empty history", contract),
                    );
                    return Ok(Vec::new());
                };
                client
                    .pool_ohlcv_daily(api_path, pool_address, HISTORY_DEFAULT_DAYS)
                    .await
            })
        });

        Ok(self
            .gecko_fetcher
            .fetch(&key, self.ttl(KIND_HISTORY), self.max_retries(), fetch_fn)
            .await)
    }

    /// Refresh every tracked coin, stalest first, merging results back into
    /// the watchlist entries.
    pub async fn refresh_all(&self, watchlist: &mut Watchlist) -> RefreshSummary {
        let mut summary = RefreshSummary::default();

        for id in watchlist.ids_stalest_first() {
            let Some(coin) = watchlist.get(id).cloned() else {
                continue;
            };
            match self.token_snapshot(&coin).await {
                Ok(Fetched::Updated(snapshot)) | Ok(Fetched::Fresh(snapshot)) => {
                    if let Some(entry) = watchlist.get_mut(id) {
                        entry.last_updated = snapshot.last_updated.or(Some(Utc::now()));
                        entry.market = snapshot;
                    }
                    summary.updated += 1;
                }
                Ok(Fetched::Stale(snapshot)) => {
                    // Usable but old; last_updated stays put
                    if let Some(entry) = watchlist.get_mut(id) {
                        entry.market = snapshot;
                    }
                    summary.stale += 1;
                }
                Ok(Fetched::Pending) => {
                    summary.pending += 1;
                }
                Err(err) => {
                    logger::warning(
                        LogTag::Market,
                        &format!("skipping {}: {}", coin.symbol, err),
                    );
                    summary.failed += 1;
                }
            }
        }

        logger::info(
            LogTag::Market,
            &format!(
                "refresh pass: {} updated, {} stale, {} pending, {} failed",
                summary.updated, summary.stale, summary.pending, summary.failed
            ),
        );
        summary
    }

    fn resolve_network(&self, coin: &TrackedCoin) -> Result<&'static Network, FetchError> {
        Network::find(&coin.network)
            .ok_or_else(|| FetchError::UnsupportedNetwork(coin.network.clone()))
    }

    fn snapshot_fetch_fn(
        &self,
        network: &'static Network,
        coin: &TrackedCoin,
    ) -> FetchFn<TokenSnapshot> {
        let client = Arc::clone(&self.geckoterminal);
        let api_path = network.api_path;
        let contract = coin.contract.clone();
        Arc::new(move || {
            let client = Arc::clone(&client);
            let contract = contract.clone();
            Box::pin(async move {
                let info = client.token_info(api_path, &contract).await?;
                let pools = client.token_pools(api_path, &contract).await?;
                if pools.is_empty() {
                    logger::warning(
                        LogTag::Market,
                        &format!("no pool found for {}, price data unavailable", contract),
                    );
                }
                Ok(build_snapshot(&info, &pools))
            })
        })
    }
}

fn token_key(kind: &'static str, network: &Network, coin: &TrackedCoin) -> ResourceKey {
    ResourceKey::new(kind, format!("{}:{}", network.id, coin.contract))
}

/// Combine the info and pools payloads into one snapshot. Price fields come
/// from the first (most relevant) pool; a token without pools keeps zeros.
fn build_snapshot(info: &TokenInfoAttributes, pools: &[PoolData]) -> TokenSnapshot {
    let mut snapshot = TokenSnapshot {
        holders: info.holders.as_ref().and_then(|h| h.count).unwrap_or(0),
        description: info.description.clone().unwrap_or_default(),
        website: info.websites.first().cloned().unwrap_or_default(),
        logo: info.image_url.clone().unwrap_or_default(),
        socials: SocialLinks {
            twitter: info
                .twitter_handle
                .as_ref()
                .map(|h| format!("https://twitter.com/{}", h))
                .unwrap_or_default(),
            telegram: info
                .telegram_handle
                .as_ref()
                .map(|h| format!("https://t.me/{}", h))
                .unwrap_or_default(),
            discord: info.discord_url.clone().unwrap_or_default(),
            reddit: info.reddit_url.clone().unwrap_or_default(),
            github: info.github_url.clone().unwrap_or_default(),
            medium: info.medium_url.clone().unwrap_or_default(),
            youtube: info.youtube_url.clone().unwrap_or_default(),
            ..SocialLinks::default()
        },
        last_updated: Some(Utc::now()),
        ..TokenSnapshot::default()
    };

    if let Some(pool) = pools.first() {
        snapshot.price_usd = pool.attributes.price_usd();
        snapshot.price_change_24h = pool.attributes.change_24h();
        snapshot.price_change_7d = pool.attributes.change_7d();
        snapshot.volume_24h = pool.attributes.volume_24h();
        snapshot.liquidity_usd = pool.attributes.liquidity_usd();
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::geckoterminal::PoolsResponse;

    fn info_fixture() -> TokenInfoAttributes {
        let raw = r#"{
            "holders": { "count": 5000 },
            "description": "Test token",
            "websites": ["https://token.example"],
            "image_url": "https://token.example/logo.png",
            "twitter_handle": "token",
            "telegram_handle": "token_chat",
            "discord_url": "https://discord.gg/token"
        }"#;
        serde_json::from_str(raw).unwrap()
    }

    fn pools_fixture() -> Vec<PoolData> {
        let raw = r#"{
            "data": [
                {
                    "id": "eth_0xpool1",
                    "attributes": {
                        "base_token_price_usd": "2.5",
                        "price_change_percentage": { "h24": "1.5", "d7": "-3.0" },
                        "volume_usd": { "h24": "10000" },
                        "reserve_in_usd": "50000"
                    }
                },
                {
                    "id": "eth_0xpool2",
                    "attributes": { "base_token_price_usd": "99.0" }
                }
            ]
        }"#;
        serde_json::from_str::<PoolsResponse>(raw).unwrap().data
    }

    #[test]
    fn snapshot_combines_info_and_first_pool() {
        let snapshot = build_snapshot(&info_fixture(), &pools_fixture());

        assert_eq!(snapshot.holders, 5000);
        assert_eq!(snapshot.description, "Test token");
        assert_eq!(snapshot.website, "https://token.example");
        assert_eq!(snapshot.socials.twitter, "https://twitter.com/token");
        assert_eq!(snapshot.socials.telegram, "https://t.me/token_chat");

        // First pool wins, not the second
        assert_eq!(snapshot.price_usd, 2.5);
        assert_eq!(snapshot.price_change_24h, 1.5);
        assert_eq!(snapshot.price_change_7d, -3.0);
        assert_eq!(snapshot.volume_24h, 10000.0);
        assert_eq!(snapshot.liquidity_usd, 50000.0);
        assert!(snapshot.last_updated.is_some());
    }

    #[test]
    fn snapshot_without_pools_keeps_zero_prices() {
        let snapshot = build_snapshot(&info_fixture(), &[]);
        assert_eq!(snapshot.price_usd, 0.0);
        assert_eq!(snapshot.volume_24h, 0.0);
        // Metadata still populated
        assert_eq!(snapshot.holders, 5000);
    }

    #[test]
    fn token_keys_separate_networks() {
        let eth = Network::find("eth").unwrap();
        let bsc = Network::find("bsc").unwrap();
        let coin = TrackedCoin {
            id: 1,
            name: "T".into(),
            symbol: "T".into(),
            contract: "0xabc".into(),
            network: "eth".into(),
            website: String::new(),
            logo: String::new(),
            description: String::new(),
            socials: SocialLinks::default(),
            date_added: Utc::now(),
            last_updated: None,
            market: TokenSnapshot::default(),
        };

        assert_ne!(
            token_key(KIND_TOKEN, eth, &coin).to_string(),
            token_key(KIND_TOKEN, bsc, &coin).to_string()
        );
        assert_eq!(
            token_key(KIND_TOKEN, eth, &coin).to_string(),
            "token:eth:0xabc"
        );
    }
}
