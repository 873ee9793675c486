/// CoinGecko API response types
///
/// These derive Serialize as well: markets rows, coin details and chart
/// series are exactly what the cache persists.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of /coins/markets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketCoin {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
}

/// Subset of /coins/{id} the dashboard renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinDetails {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: ImageSet,
    /// Localized descriptions keyed by language code ("en", "pt", ...).
    pub description: HashMap<String, String>,
    pub links: CoinLinks,
    pub market_data: CoinMarketData,
}

impl CoinDetails {
    /// Description in the requested language, falling back to English.
    pub fn description_in(&self, language: &str) -> &str {
        self.description
            .get(language)
            .filter(|text| !text.is_empty())
            .or_else(|| self.description.get("en"))
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSet {
    pub thumb: Option<String>,
    pub small: Option<String>,
    pub large: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinLinks {
    pub homepage: Vec<String>,
    pub twitter_screen_name: Option<String>,
    pub subreddit_url: Option<String>,
    pub telegram_channel_identifier: Option<String>,
    pub repos_url: ReposUrl,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReposUrl {
    pub github: Vec<String>,
}

/// Per-currency quote maps, keyed by vs_currency ("usd", "brl", ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinMarketData {
    pub current_price: HashMap<String, f64>,
    pub market_cap: HashMap<String, f64>,
    pub total_volume: HashMap<String, f64>,
    pub market_cap_rank: Option<u32>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_24h_in_currency: HashMap<String, f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub ath: HashMap<String, f64>,
    pub ath_change_percentage: HashMap<String, f64>,
}

impl CoinMarketData {
    /// 24h change quoted in `currency` when the API provides it, otherwise
    /// the global percentage.
    pub fn change_24h_in(&self, currency: &str) -> Option<f64> {
        self.price_change_percentage_24h_in_currency
            .get(currency)
            .copied()
            .or(self.price_change_percentage_24h)
    }
}

/// /coins/{id}/market_chart body; prices are `[unix_millis, price]` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketChart {
    pub prices: Vec<(i64, f64)>,
}
