/// CoinGecko API client
///
/// API Documentation: https://docs.coingecko.com/reference/introduction
///
/// Endpoints implemented:
/// 1. /coins/markets - Top coins ranked by market cap
/// 2. /coins/{id} - Coin details (market data, description, links)
/// 3. /coins/{id}/market_chart - Price series for charts
pub mod types;

pub use self::types::{CoinDetails, CoinLinks, CoinMarketData, MarketChart, MarketCoin};

use chrono::{TimeZone, Utc};

use crate::apis::client::HttpClient;
use crate::errors::FetchError;
use crate::logger::{self, LogTag};
use crate::models::PricePoint;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Request timeout - CoinGecko can be slow with large datasets.
pub const TIMEOUT_SECS: u64 = 20;

pub struct CoinGeckoClient {
    http: HttpClient,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, FetchError> {
        Ok(Self {
            http: HttpClient::new(timeout_secs)?,
            base_url: base_url.into(),
        })
    }

    /// Top coins ordered by market cap, with 24h change.
    pub async fn markets(
        &self,
        vs_currency: &str,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<MarketCoin>, FetchError> {
        let endpoint = "coins/markets";
        let url = format!("{}/{}", self.base_url, endpoint);

        logger::debug(
            LogTag::Api,
            &format!(
                "[COINGECKO] fetching markets: vs={}, per_page={}, page={}",
                vs_currency, per_page, page
            ),
        );

        let builder = self.http.client().get(&url).query(&[
            ("vs_currency", vs_currency),
            ("order", "market_cap_desc"),
            ("per_page", &per_page.to_string()),
            ("page", &page.to_string()),
            ("sparkline", "false"),
            ("price_change_percentage", "24h"),
        ]);

        self.http.get_json(endpoint, builder).await
    }

    /// Full coin page payload, with the heavyweight sections disabled.
    pub async fn coin_details(&self, id: &str) -> Result<CoinDetails, FetchError> {
        let endpoint = format!("coins/{}", id);
        let url = format!("{}/{}", self.base_url, endpoint);

        logger::debug(LogTag::Api, &format!("[COINGECKO] fetching coin: {}", id));

        let builder = self.http.client().get(&url).query(&[
            ("localization", "true"),
            ("tickers", "false"),
            ("market_data", "true"),
            ("community_data", "false"),
            ("developer_data", "false"),
            ("sparkline", "false"),
        ]);

        self.http.get_json(&endpoint, builder).await
    }

    /// Price series over `days` ("1", "7", "30", "365" or "max").
    pub async fn market_chart(
        &self,
        id: &str,
        vs_currency: &str,
        days: &str,
    ) -> Result<Vec<PricePoint>, FetchError> {
        let endpoint = format!("coins/{}/market_chart", id);
        let url = format!("{}/{}", self.base_url, endpoint);

        logger::debug(
            LogTag::Api,
            &format!("[COINGECKO] fetching chart: id={}, days={}", id, days),
        );

        let builder = self
            .http
            .client()
            .get(&url)
            .query(&[("vs_currency", vs_currency), ("days", days)]);

        let chart: MarketChart = self.http.get_json(&endpoint, builder).await?;

        Ok(chart
            .prices
            .into_iter()
            .filter_map(|(millis, price)| {
                let timestamp = Utc.timestamp_millis_opt(millis).single()?;
                price.is_finite().then_some(PricePoint { timestamp, price })
            })
            .collect())
    }
}
