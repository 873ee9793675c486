/// GeckoTerminal API client
///
/// API Documentation: https://www.geckoterminal.com/dex-api
///
/// Endpoints implemented:
/// 1. /networks/{network}/tokens/{address}/info - Holders, description, links
/// 2. /networks/{network}/tokens/{address}/pools - Pools with price/volume/liquidity
/// 3. /networks/{network}/pools/{pool}/ohlcv/day - Daily candles for charts
pub mod types;

pub use self::types::{
    OhlcvResponse, PoolAttributes, PoolData, PoolsResponse, TokenInfoAttributes,
    TokenInfoResponse,
};

use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::apis::client::HttpClient;
use crate::errors::FetchError;
use crate::logger::{self, LogTag};
use crate::models::PricePoint;

pub const DEFAULT_BASE_URL: &str = "https://api.geckoterminal.com/api/v2";

/// Request timeout in seconds - GeckoTerminal can have latency spikes.
pub const TIMEOUT_SECS: u64 = 10;

pub struct GeckoTerminalClient {
    http: HttpClient,
    base_url: String,
}

impl GeckoTerminalClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, FetchError> {
        Ok(Self {
            http: HttpClient::new(timeout_secs)?,
            base_url: base_url.into(),
        })
    }

    /// Token metadata: holders count, description, website and social links.
    pub async fn token_info(
        &self,
        network_path: &str,
        contract: &str,
    ) -> Result<TokenInfoAttributes, FetchError> {
        let endpoint = format!("networks/{}/tokens/{}/info", network_path, contract);
        let url = format!("{}/{}", self.base_url, endpoint);

        logger::debug(
            LogTag::Api,
            &format!(
                "[GECKOTERMINAL] fetching token info: contract={}, network={}",
                contract, network_path
            ),
        );

        let response: TokenInfoResponse = self
            .http
            .get_json(&endpoint, self.http.client().get(&url))
            .await?;

        Ok(response.data.map(|d| d.attributes).unwrap_or_default())
    }

    /// All pools for a token; the first one is the most relevant for
    /// price/volume/liquidity.
    pub async fn token_pools(
        &self,
        network_path: &str,
        contract: &str,
    ) -> Result<Vec<PoolData>, FetchError> {
        let endpoint = format!("networks/{}/tokens/{}/pools", network_path, contract);
        let url = format!("{}/{}", self.base_url, endpoint);

        logger::debug(
            LogTag::Api,
            &format!(
                "[GECKOTERMINAL] fetching pools: contract={}, network={}",
                contract, network_path
            ),
        );

        let response: PoolsResponse = self
            .http
            .get_json(&endpoint, self.http.client().get(&url))
            .await?;

        Ok(response.data)
    }

    /// Daily close prices for a pool, newest candles last. Rows the API
    /// returns malformed are skipped rather than failing the whole series.
    pub async fn pool_ohlcv_daily(
        &self,
        network_path: &str,
        pool_address: &str,
        limit: u32,
    ) -> Result<Vec<PricePoint>, FetchError> {
        let endpoint = format!("networks/{}/pools/{}/ohlcv/day", network_path, pool_address);
        let url = format!("{}/{}", self.base_url, endpoint);

        logger::debug(
            LogTag::Api,
            &format!(
                "[GECKOTERMINAL] fetching ohlcv: pool={}, network={}, limit={}",
                pool_address, network_path, limit
            ),
        );

        let builder = self
            .http
            .client()
            .get(&url)
            .query(&[("aggregate", "1"), ("limit", &limit.to_string())]);

        let response: OhlcvResponse = self.http.get_json(&endpoint, builder).await?;

        let rows = response
            .data
            .map(|d| d.attributes.ohlcv)
            .unwrap_or_default();

        let mut points: Vec<PricePoint> = rows.iter().filter_map(|row| price_point(row)).collect();
        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }
}

/// One OHLCV row to a chart point: timestamp at index 0 (unix seconds),
/// close at index 4.
fn price_point(row: &[Value]) -> Option<PricePoint> {
    let ts = value_f64(row.first()?)? as i64;
    let close = value_f64(row.get(4)?)?;
    if !close.is_finite() {
        return None;
    }
    let timestamp = Utc.timestamp_opt(ts, 0).single()?;
    Some(PricePoint {
        timestamp,
        price: close,
    })
}

fn value_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ohlcv_rows_convert_to_price_points() {
        let row: Vec<Value> = serde_json::from_str("[1700000000, 1.0, 2.0, 0.5, 1.75, 100]").unwrap();
        let point = price_point(&row).unwrap();
        assert_eq!(point.price, 1.75);
        assert_eq!(point.timestamp.timestamp(), 1700000000);
    }

    #[test]
    fn malformed_ohlcv_rows_are_skipped() {
        let short: Vec<Value> = serde_json::from_str("[1700000000]").unwrap();
        assert!(price_point(&short).is_none());

        let bad_close: Vec<Value> =
            serde_json::from_str(r#"[1700000000, 1, 2, 0.5, "not-a-number", 100]"#).unwrap();
        assert!(price_point(&bad_close).is_none());
    }
}
