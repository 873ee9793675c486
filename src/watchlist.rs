//! User-tracked tokens
//!
//! The watchlist is the `coins.json` document the dashboard maintains:
//! tokens identified by contract address and network, with whatever metadata
//! the user supplied plus the latest market snapshot. Adding a coin
//! validates the contract shape for its network and rejects duplicates;
//! search is a plain case-insensitive filter over name, symbol and contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

use crate::errors::WatchlistError;
use crate::logger::{self, LogTag};
use crate::models::{SocialLinks, TokenSnapshot};
use crate::networks::Network;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedCoin {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    pub symbol: String,
    pub contract: String,
    pub network: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub socials: SocialLinks,
    #[serde(default = "Utc::now")]
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// Latest market data, merged in by refresh passes.
    #[serde(default)]
    pub market: TokenSnapshot,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WatchlistFile {
    coins: Vec<TrackedCoin>,
}

#[derive(Debug, Default)]
pub struct Watchlist {
    coins: Vec<TrackedCoin>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a `{"coins": [...]}` JSON file. EVM contract addresses are
    /// normalized to lowercase; ids are (re)assigned where missing or
    /// colliding.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WatchlistError> {
        let raw = fs::read_to_string(path.as_ref())?;
        let file: WatchlistFile = serde_json::from_str(&raw)?;

        let mut list = Self { coins: file.coins };
        let mut next_id = list.next_id();
        for coin in &mut list.coins {
            normalize_contract(coin);
            if coin.id == 0 {
                coin.id = next_id;
                next_id += 1;
            }
        }

        logger::info(
            LogTag::Watchlist,
            &format!("loaded {} tracked coins", list.coins.len()),
        );
        Ok(list)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), WatchlistError> {
        let file = WatchlistFile {
            coins: self.coins.clone(),
        };
        let raw = serde_json::to_string_pretty(&file)?;
        fs::write(path.as_ref(), raw)?;
        Ok(())
    }

    pub fn coins(&self) -> &[TrackedCoin] {
        &self.coins
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&TrackedCoin> {
        self.coins.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut TrackedCoin> {
        self.coins.iter_mut().find(|c| c.id == id)
    }

    pub fn find_by_contract(&self, network: &str, contract: &str) -> Option<&TrackedCoin> {
        self.coins
            .iter()
            .find(|c| c.network == network && c.contract.eq_ignore_ascii_case(contract))
    }

    /// Add a coin to the front of the list after validating its network,
    /// contract shape, URLs and uniqueness. Returns the assigned id.
    pub fn add(&mut self, mut coin: TrackedCoin) -> Result<u64, WatchlistError> {
        let network = Network::find(&coin.network)
            .ok_or_else(|| WatchlistError::UnsupportedNetwork(coin.network.clone()))?;

        normalize_contract(&mut coin);
        if !network.validate_contract(&coin.contract) {
            return Err(WatchlistError::InvalidContract {
                network: coin.network.clone(),
                contract: coin.contract.clone(),
            });
        }
        if self.find_by_contract(&coin.network, &coin.contract).is_some() {
            return Err(WatchlistError::Duplicate(coin.symbol.clone()));
        }
        validate_urls(&coin)?;

        coin.id = self.next_id();
        let id = coin.id;
        // Newest first, like the new-listings view expects
        self.coins.insert(0, coin);
        Ok(id)
    }

    pub fn remove(&mut self, id: u64) -> Option<TrackedCoin> {
        let index = self.coins.iter().position(|c| c.id == id)?;
        Some(self.coins.remove(index))
    }

    /// Case-insensitive filter over name, symbol and contract. An empty
    /// query matches everything.
    pub fn search(&self, query: &str) -> Vec<&TrackedCoin> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.coins.iter().collect();
        }
        self.coins
            .iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle)
                    || c.symbol.to_lowercase().contains(&needle)
                    || c.contract.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Ids ordered for a refresh pass: never-updated coins first, then by
    /// oldest `last_updated`.
    pub fn ids_stalest_first(&self) -> Vec<u64> {
        let mut ids: Vec<(Option<DateTime<Utc>>, u64)> = self
            .coins
            .iter()
            .map(|c| (c.last_updated, c.id))
            .collect();
        ids.sort_by_key(|(updated, _)| *updated);
        ids.into_iter().map(|(_, id)| id).collect()
    }

    fn next_id(&self) -> u64 {
        self.coins.iter().map(|c| c.id).max().unwrap_or(0) + 1
    }
}

/// EVM addresses are case-insensitive and stored lowercase; base58 addresses
/// are case-sensitive and left alone.
fn normalize_contract(coin: &mut TrackedCoin) {
    if coin.contract.starts_with("0x") || coin.contract.starts_with("0X") {
        coin.contract = coin.contract.to_lowercase();
    }
}

fn validate_urls(coin: &TrackedCoin) -> Result<(), WatchlistError> {
    let fields = [
        ("website", &coin.website),
        ("twitter", &coin.socials.twitter),
        ("telegram", &coin.socials.telegram),
        ("discord", &coin.socials.discord),
        ("reddit", &coin.socials.reddit),
        ("facebook", &coin.socials.facebook),
        ("bitcointalk", &coin.socials.bitcointalk),
        ("github", &coin.socials.github),
        ("medium", &coin.socials.medium),
        ("youtube", &coin.socials.youtube),
    ];
    for (field, value) in fields {
        if !value.is_empty() && Url::parse(value).is_err() {
            return Err(WatchlistError::InvalidUrl {
                field: field.to_string(),
                value: value.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const USDT: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";
    const USDC_SOL: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn coin(name: &str, symbol: &str, contract: &str, network: &str) -> TrackedCoin {
        TrackedCoin {
            id: 0,
            name: name.to_string(),
            symbol: symbol.to_string(),
            contract: contract.to_string(),
            network: network.to_string(),
            website: String::new(),
            logo: String::new(),
            description: String::new(),
            socials: SocialLinks::default(),
            date_added: Utc::now(),
            last_updated: None,
            market: TokenSnapshot::default(),
        }
    }

    #[test]
    fn add_normalizes_evm_contract_case() {
        let mut list = Watchlist::new();
        let id = list.add(coin("Tether", "USDT", USDT, "eth")).unwrap();
        assert_eq!(
            list.get(id).unwrap().contract,
            USDT.to_lowercase()
        );
    }

    #[test]
    fn add_keeps_solana_contract_case() {
        let mut list = Watchlist::new();
        let id = list.add(coin("USD Coin", "USDC", USDC_SOL, "solana")).unwrap();
        assert_eq!(list.get(id).unwrap().contract, USDC_SOL);
    }

    #[test]
    fn duplicate_contract_on_same_network_is_rejected() {
        let mut list = Watchlist::new();
        list.add(coin("Tether", "USDT", USDT, "eth")).unwrap();

        let err = list
            .add(coin("Tether Again", "USDT2", &USDT.to_lowercase(), "eth"))
            .unwrap_err();
        assert!(matches!(err, WatchlistError::Duplicate(_)));

        // Same contract on another network is a different asset
        assert!(list.add(coin("Tether BSC", "USDT", USDT, "bsc")).is_ok());
    }

    #[test]
    fn invalid_contract_is_rejected() {
        let mut list = Watchlist::new();
        let err = list.add(coin("Bad", "BAD", "0x1234", "eth")).unwrap_err();
        assert!(matches!(err, WatchlistError::InvalidContract { .. }));
    }

    #[test]
    fn unknown_network_is_rejected() {
        let mut list = Watchlist::new();
        let err = list.add(coin("Bad", "BAD", USDT, "dogechain")).unwrap_err();
        assert!(matches!(err, WatchlistError::UnsupportedNetwork(_)));
    }

    #[test]
    fn invalid_social_url_is_rejected() {
        let mut list = Watchlist::new();
        let mut c = coin("Tether", "USDT", USDT, "eth");
        c.socials.twitter = "not a url".to_string();
        let err = list.add(c).unwrap_err();
        assert!(matches!(err, WatchlistError::InvalidUrl { .. }));
    }

    #[test]
    fn search_matches_name_symbol_and_contract() {
        let mut list = Watchlist::new();
        list.add(coin("Tether", "USDT", USDT, "eth")).unwrap();
        list.add(coin("USD Coin", "USDC", USDC_SOL, "solana")).unwrap();

        assert_eq!(list.search("tether").len(), 1);
        assert_eq!(list.search("usd").len(), 2);
        assert_eq!(list.search("0xdac17f").len(), 1);
        assert_eq!(list.search("").len(), 2);
        assert!(list.search("nothing").is_empty());
    }

    #[test]
    fn remove_by_id() {
        let mut list = Watchlist::new();
        let id = list.add(coin("Tether", "USDT", USDT, "eth")).unwrap();
        assert_eq!(list.remove(id).unwrap().symbol, "USDT");
        assert!(list.is_empty());
        assert!(list.remove(id).is_none());
    }

    #[test]
    fn stalest_first_ordering() {
        let mut list = Watchlist::new();
        let a = list.add(coin("A", "A", USDT, "eth")).unwrap();
        let b = list.add(coin("B", "B", USDT, "bsc")).unwrap();
        let c = list.add(coin("C", "C", USDT, "polygon")).unwrap();

        list.get_mut(a).unwrap().last_updated = Some(Utc::now());
        list.get_mut(c).unwrap().last_updated =
            Some(Utc::now() - chrono::Duration::minutes(10));

        // Never-updated first, then oldest timestamp
        assert_eq!(list.ids_stalest_first(), vec![b, c, a]);
    }

    #[test]
    fn json_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coins.json");

        let mut list = Watchlist::new();
        list.add(coin("Tether", "USDT", USDT, "eth")).unwrap();
        list.save(&path).unwrap();

        let loaded = Watchlist::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.coins()[0].symbol, "USDT");
        assert_eq!(loaded.coins()[0].contract, USDT.to_lowercase());
    }

    #[test]
    fn load_assigns_missing_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coins.json");
        fs::write(
            &path,
            format!(
                r#"{{ "coins": [
                    {{ "name": "Tether", "symbol": "USDT", "contract": "{}", "network": "eth" }},
                    {{ "name": "USD Coin", "symbol": "USDC", "contract": "{}", "network": "solana" }}
                ] }}"#,
                USDT, USDC_SOL
            ),
        )
        .unwrap();

        let loaded = Watchlist::load(&path).unwrap();
        let ids: Vec<u64> = loaded.coins().iter().map(|c| c.id).collect();
        assert!(ids[0] != ids[1]);
        assert!(ids.iter().all(|id| *id != 0));
    }
}
