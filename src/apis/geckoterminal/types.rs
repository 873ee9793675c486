/// GeckoTerminal API response types
///
/// The API wraps everything in a JSON:API-style `data.attributes` envelope
/// and encodes most numbers as strings; the deserializers here accept both
/// strings and numbers and shrug off anything else.
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize a numeric field that may arrive as a string, a number, or
/// null.
pub(crate) fn de_flexible_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s.parse().ok(),
        Some(Value::Number(n)) => n.as_f64(),
        _ => None,
    })
}

// ============================================================================
// /networks/{network}/tokens/{address}/info
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfoResponse {
    #[serde(default)]
    pub data: Option<TokenInfoData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfoData {
    #[serde(default)]
    pub attributes: TokenInfoAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TokenInfoAttributes {
    pub holders: Option<HoldersInfo>,
    pub description: Option<String>,
    pub websites: Vec<String>,
    pub image_url: Option<String>,
    pub twitter_handle: Option<String>,
    pub telegram_handle: Option<String>,
    pub discord_url: Option<String>,
    pub reddit_url: Option<String>,
    pub github_url: Option<String>,
    pub medium_url: Option<String>,
    pub youtube_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HoldersInfo {
    pub count: Option<u64>,
}

// ============================================================================
// /networks/{network}/tokens/{address}/pools
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PoolsResponse {
    #[serde(default)]
    pub data: Vec<PoolData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: PoolAttributes,
}

impl PoolData {
    /// Pool ids arrive as `{network}_{address}`; the OHLCV endpoint wants
    /// the bare address.
    pub fn pool_address(&self) -> Option<&str> {
        self.id.as_deref()?.splitn(2, '_').nth(1)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PoolAttributes {
    #[serde(deserialize_with = "de_flexible_f64")]
    pub base_token_price_usd: Option<f64>,
    pub price_change_percentage: PriceChangeWindows,
    pub volume_usd: VolumeWindows,
    #[serde(deserialize_with = "de_flexible_f64")]
    pub reserve_in_usd: Option<f64>,
    #[serde(deserialize_with = "de_flexible_f64")]
    pub total_reserve_in_usd: Option<f64>,
}

impl PoolAttributes {
    pub fn price_usd(&self) -> f64 {
        self.base_token_price_usd.unwrap_or(0.0)
    }

    pub fn change_24h(&self) -> f64 {
        self.price_change_percentage.h24.unwrap_or(0.0)
    }

    /// 7-day change; the API has answered under both `d7` and `h7`.
    pub fn change_7d(&self) -> f64 {
        self.price_change_percentage
            .d7
            .or(self.price_change_percentage.h7)
            .unwrap_or(0.0)
    }

    pub fn volume_24h(&self) -> f64 {
        self.volume_usd.h24.unwrap_or(0.0)
    }

    pub fn liquidity_usd(&self) -> f64 {
        self.reserve_in_usd.or(self.total_reserve_in_usd).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PriceChangeWindows {
    #[serde(deserialize_with = "de_flexible_f64")]
    pub h24: Option<f64>,
    #[serde(deserialize_with = "de_flexible_f64")]
    pub d7: Option<f64>,
    #[serde(deserialize_with = "de_flexible_f64")]
    pub h7: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VolumeWindows {
    #[serde(deserialize_with = "de_flexible_f64")]
    pub h24: Option<f64>,
}

// ============================================================================
// /networks/{network}/pools/{pool}/ohlcv/{timeframe}
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct OhlcvResponse {
    #[serde(default)]
    pub data: Option<OhlcvData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OhlcvData {
    #[serde(default)]
    pub attributes: OhlcvAttributes,
}

/// Rows are `[timestamp, open, high, low, close, volume]`, with values that
/// may be numbers or strings; the client picks out timestamp and close and
/// skips rows that fail to parse.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OhlcvAttributes {
    #[serde(alias = "ohlcv_list")]
    pub ohlcv: Vec<Vec<Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pools_payload_with_string_numbers() {
        let raw = r#"{
            "data": [{
                "id": "eth_0xpool1",
                "attributes": {
                    "base_token_price_usd": "1.2345",
                    "price_change_percentage": { "h24": "-2.5", "d7": "10.1" },
                    "volume_usd": { "h24": "98765.43" },
                    "reserve_in_usd": "500000"
                }
            }]
        }"#;

        let response: PoolsResponse = serde_json::from_str(raw).unwrap();
        let pool = &response.data[0];
        assert_eq!(pool.pool_address(), Some("0xpool1"));
        assert_eq!(pool.attributes.price_usd(), 1.2345);
        assert_eq!(pool.attributes.change_24h(), -2.5);
        assert_eq!(pool.attributes.change_7d(), 10.1);
        assert_eq!(pool.attributes.volume_24h(), 98765.43);
        assert_eq!(pool.attributes.liquidity_usd(), 500000.0);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let raw = r#"{ "data": [{ "id": "solana_ABC", "attributes": {} }] }"#;
        let response: PoolsResponse = serde_json::from_str(raw).unwrap();
        let pool = &response.data[0];
        assert_eq!(pool.attributes.price_usd(), 0.0);
        assert_eq!(pool.attributes.liquidity_usd(), 0.0);
    }

    #[test]
    fn falls_back_to_h7_and_total_reserve() {
        let raw = r#"{
            "data": [{
                "attributes": {
                    "price_change_percentage": { "h7": 3.0 },
                    "total_reserve_in_usd": 1000.0
                }
            }]
        }"#;
        let response: PoolsResponse = serde_json::from_str(raw).unwrap();
        let pool = &response.data[0];
        assert_eq!(pool.attributes.change_7d(), 3.0);
        assert_eq!(pool.attributes.liquidity_usd(), 1000.0);
    }

    #[test]
    fn parses_token_info_payload() {
        let raw = r#"{
            "data": {
                "attributes": {
                    "holders": { "count": 12345 },
                    "description": "A token",
                    "websites": ["https://example.org"],
                    "image_url": "https://example.org/logo.png",
                    "twitter_handle": "example",
                    "telegram_handle": "example_chat"
                }
            }
        }"#;

        let response: TokenInfoResponse = serde_json::from_str(raw).unwrap();
        let attrs = response.data.unwrap().attributes;
        assert_eq!(attrs.holders.unwrap().count, Some(12345));
        assert_eq!(attrs.websites[0], "https://example.org");
        assert_eq!(attrs.twitter_handle.as_deref(), Some("example"));
    }

    #[test]
    fn parses_ohlcv_under_both_field_names() {
        let with_list = r#"{
            "data": { "attributes": { "ohlcv_list": [[1700000000, 1, 2, 0.5, "1.5", 100]] } }
        }"#;
        let response: OhlcvResponse = serde_json::from_str(with_list).unwrap();
        assert_eq!(response.data.unwrap().attributes.ohlcv.len(), 1);

        let with_ohlcv = r#"{
            "data": { "attributes": { "ohlcv": [[1700000000, 1, 2, 0.5, 1.5, 100]] } }
        }"#;
        let response: OhlcvResponse = serde_json::from_str(with_ohlcv).unwrap();
        assert_eq!(response.data.unwrap().attributes.ohlcv.len(), 1);
    }
}
