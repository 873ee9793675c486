/// Supported blockchain networks and their contract-address shapes.
///
/// The registry id is what the watchlist stores; `api_path` is the segment
/// the DEX terminal API expects in URLs (they differ for Avalanche).
/// An id missing from the registry is a configuration error and fails fast
/// as `FetchError::UnsupportedNetwork` in the service layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Network {
    pub id: &'static str,
    pub name: &'static str,
    pub api_path: &'static str,
    pub contract_prefix: &'static str,
    pub contract_length: usize,
}

pub const NETWORKS: &[Network] = &[
    Network {
        id: "eth",
        name: "Ethereum",
        api_path: "eth",
        contract_prefix: "0x",
        contract_length: 42,
    },
    Network {
        id: "bsc",
        name: "Binance Smart Chain",
        api_path: "bsc",
        contract_prefix: "0x",
        contract_length: 42,
    },
    Network {
        id: "polygon",
        name: "Polygon",
        api_path: "polygon",
        contract_prefix: "0x",
        contract_length: 42,
    },
    Network {
        id: "avax",
        name: "Avalanche",
        api_path: "avalanche",
        contract_prefix: "0x",
        contract_length: 42,
    },
    Network {
        id: "arbitrum",
        name: "Arbitrum",
        api_path: "arbitrum",
        contract_prefix: "0x",
        contract_length: 42,
    },
    Network {
        id: "optimism",
        name: "Optimism",
        api_path: "optimism",
        contract_prefix: "0x",
        contract_length: 42,
    },
    Network {
        id: "solana",
        name: "Solana",
        api_path: "solana",
        contract_prefix: "",
        contract_length: 44,
    },
];

impl Network {
    /// Look up a network by registry id.
    pub fn find(id: &str) -> Option<&'static Network> {
        NETWORKS.iter().find(|n| n.id == id)
    }

    /// Check that a contract address has the shape this network expects:
    /// prefix, length, and character class (hex for 0x chains, base58 for
    /// Solana).
    pub fn validate_contract(&self, contract: &str) -> bool {
        if !self.contract_prefix.is_empty() && !contract.starts_with(self.contract_prefix) {
            return false;
        }

        if self.contract_prefix == "0x" {
            return contract.len() == self.contract_length
                && contract[2..].chars().all(|c| c.is_ascii_hexdigit());
        }

        if self.id == "solana" {
            // Base58 addresses are 32-44 chars; 0, O, I and l are excluded.
            return (32..=44).contains(&contract.len())
                && contract.chars().all(is_base58_char);
        }

        contract.len() == self.contract_length
    }
}

fn is_base58_char(c: char) -> bool {
    c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
}
