//! Known EVM networks and the order in which they are searched for smart
//! contract accounts.

use {
    model::ChainId,
    serde::Serialize,
    std::collections::HashSet,
    url::Url,
};

pub mod networks {
    use model::ChainId;

    pub const MAINNET: ChainId = 1;
    pub const OPTIMISM: ChainId = 10;
    pub const BNB: ChainId = 56;
    pub const POLYGON: ChainId = 137;
    pub const BASE: ChainId = 8453;
    pub const ARBITRUM_ONE: ChainId = 42161;
}

/// Chains that are always searched, in this order, after the connected and
/// preferred chains. Smart wallets are most commonly deployed there.
pub const FALLBACK_CHAINS: [ChainId; 5] = [
    networks::MAINNET,
    networks::POLYGON,
    networks::OPTIMISM,
    networks::ARBITRUM_ONE,
    networks::BASE,
];

/// Last resort endpoints for [`FALLBACK_CHAINS`] when the registry doesn't
/// know them.
fn fallback_endpoint(chain_id: ChainId) -> Option<Url> {
    let url = match chain_id {
        networks::MAINNET => "https://eth.llamarpc.com",
        networks::POLYGON => "https://polygon.llamarpc.com",
        networks::OPTIMISM => "https://optimism.llamarpc.com",
        networks::ARBITRUM_ONE => "https://arbitrum.llamarpc.com",
        networks::BASE => "https://base.llamarpc.com",
        _ => return None,
    };
    Some(builtin_url(url))
}

fn builtin_url(url: &'static str) -> Url {
    url.parse().expect("builtin URLs are valid")
}

/// A network the toolbox can talk to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub name: String,
    pub chain_id: ChainId,
    pub rpc_url: Url,
    pub symbol: String,
    pub explorer_url: Option<Url>,
    pub is_testnet: bool,
}

impl Network {
    fn builtin(
        name: &str,
        chain_id: ChainId,
        rpc_url: &'static str,
        symbol: &str,
        explorer_url: &'static str,
    ) -> Self {
        Self {
            name: name.to_owned(),
            chain_id,
            rpc_url: builtin_url(rpc_url),
            symbol: symbol.to_owned(),
            explorer_url: Some(builtin_url(explorer_url)),
            is_testnet: false,
        }
    }

    /// Link to an address on the block explorer.
    pub fn address_url(&self, address: &str) -> Option<Url> {
        self.explorer_link("address", address)
    }

    /// Link to a transaction on the block explorer.
    pub fn transaction_url(&self, hash: &str) -> Option<Url> {
        self.explorer_link("tx", hash)
    }

    /// Link to a block on the block explorer.
    pub fn block_url(&self, block: u64) -> Option<Url> {
        self.explorer_link("block", &block.to_string())
    }

    fn explorer_link(&self, kind: &str, item: &str) -> Option<Url> {
        if item.is_empty() {
            return None;
        }
        let mut url = self.explorer_url.clone()?;
        url.path_segments_mut().ok()?.pop_if_empty().push(kind).push(item);
        Some(url)
    }

    pub fn candidate(&self) -> CandidateChain {
        CandidateChain {
            chain_id: self.chain_id,
            rpc_endpoint: self.rpc_url.clone(),
        }
    }
}

/// A chain on which a signer contract might live.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateChain {
    pub chain_id: ChainId,
    pub rpc_endpoint: Url,
}

/// Ordered list of known networks.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    networks: Vec<Network>,
}

impl Registry {
    pub fn new(networks: Vec<Network>) -> Self {
        Self { networks }
    }

    /// The networks the toolbox ships with.
    pub fn builtin() -> Self {
        Self::new(vec![
            Network::builtin(
                "Ethereum",
                networks::MAINNET,
                "https://1rpc.io/eth",
                "ETH",
                "https://etherscan.io",
            ),
            Network::builtin(
                "Base Mainnet",
                networks::BASE,
                "https://mainnet.base.org",
                "ETH",
                "https://basescan.org",
            ),
            Network::builtin(
                "BNB Chain",
                networks::BNB,
                "https://bsc-dataseed4.bnbchain.org",
                "BNB",
                "https://bscscan.com",
            ),
            Network::builtin(
                "OP Mainnet",
                networks::OPTIMISM,
                "https://optimism.llamarpc.com",
                "ETH",
                "https://optimistic.etherscan.io",
            ),
            Network::builtin(
                "Polygon",
                networks::POLYGON,
                "https://polygon-rpc.com",
                "POL",
                "https://polygonscan.com",
            ),
            Network::builtin(
                "Arbitrum One",
                networks::ARBITRUM_ONE,
                "https://arb1.arbitrum.io/rpc",
                "ETH",
                "https://arbiscan.io",
            ),
        ])
    }

    /// Replaces the RPC endpoint of known networks and adds unknown ones.
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = (ChainId, Url)>) -> Self {
        for (chain_id, url) in overrides {
            match self.networks.iter_mut().find(|n| n.chain_id == chain_id) {
                Some(network) => network.rpc_url = url,
                None => self.networks.push(Network {
                    name: format!("Chain {chain_id}"),
                    chain_id,
                    rpc_url: url,
                    symbol: "ETH".to_owned(),
                    explorer_url: None,
                    is_testnet: false,
                }),
            }
        }
        self
    }

    pub fn get(&self, chain_id: ChainId) -> Option<&Network> {
        self.networks.iter().find(|n| n.chain_id == chain_id)
    }

    pub fn networks(&self) -> &[Network] {
        &self.networks
    }

    /// Endpoint for a chain, falling back to the hardcoded endpoints of
    /// [`FALLBACK_CHAINS`].
    pub fn candidate(&self, chain_id: ChainId) -> Option<CandidateChain> {
        self.get(chain_id)
            .map(Network::candidate)
            .or_else(|| {
                fallback_endpoint(chain_id).map(|rpc_endpoint| CandidateChain {
                    chain_id,
                    rpc_endpoint,
                })
            })
    }

    /// The ordered, deduplicated list of chains to search for a signer
    /// contract: the connected chain, then the preferred chain, then
    /// [`FALLBACK_CHAINS`].
    pub fn candidates(
        &self,
        connected: Option<CandidateChain>,
        preferred: Option<ChainId>,
    ) -> Vec<CandidateChain> {
        let preferred = preferred.and_then(|chain_id| {
            let candidate = match &connected {
                Some(connected) if connected.chain_id == chain_id => Some(connected.clone()),
                _ => self.candidate(chain_id),
            };
            if candidate.is_none() {
                tracing::debug!(chain_id, "preferred chain is unknown, not searching it");
            }
            candidate
        });
        let fallbacks = FALLBACK_CHAINS
            .iter()
            .filter_map(|chain_id| self.candidate(*chain_id));

        let mut seen = HashSet::new();
        connected
            .into_iter()
            .chain(preferred)
            .chain(fallbacks)
            .filter(|candidate| seen.insert(candidate.chain_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, maplit::hashmap};

    fn ids(candidates: &[CandidateChain]) -> Vec<ChainId> {
        candidates.iter().map(|c| c.chain_id).collect()
    }

    #[test]
    fn fallback_order_without_connection() {
        let registry = Registry::builtin();
        assert_eq!(
            ids(&registry.candidates(None, None)),
            vec![1, 137, 10, 42161, 8453]
        );
    }

    #[test]
    fn connected_then_preferred_then_fallbacks_deduplicated() {
        let registry = Registry::builtin();
        let connected = registry.candidate(networks::BASE);
        assert_eq!(
            ids(&registry.candidates(connected.clone(), Some(networks::BNB))),
            vec![8453, 56, 1, 137, 10, 42161]
        );
        assert_eq!(
            ids(&registry.candidates(connected, Some(networks::BASE))),
            vec![8453, 1, 137, 10, 42161]
        );
    }

    #[test]
    fn unknown_preferred_chain_is_skipped() {
        let registry = Registry::builtin();
        assert_eq!(
            ids(&registry.candidates(None, Some(424242))),
            vec![1, 137, 10, 42161, 8453]
        );
    }

    #[test]
    fn empty_registry_still_searches_fallbacks() {
        let registry = Registry::default();
        let candidates = registry.candidates(None, Some(networks::OPTIMISM));
        assert_eq!(ids(&candidates), vec![10, 1, 137, 42161, 8453]);
        assert_eq!(
            candidates[0].rpc_endpoint.as_str(),
            "https://optimism.llamarpc.com/"
        );
    }

    #[test]
    fn overrides_replace_and_extend() {
        let registry = Registry::builtin().with_overrides(hashmap! {
            networks::MAINNET => "http://localhost:8545".parse().unwrap(),
            31337 => "http://localhost:8546".parse().unwrap(),
        });
        assert_eq!(
            registry.get(networks::MAINNET).unwrap().rpc_url.as_str(),
            "http://localhost:8545/"
        );
        assert_eq!(registry.get(31337).unwrap().name, "Chain 31337");
        assert_eq!(
            ids(&registry.candidates(None, Some(31337))),
            vec![31337, 1, 137, 10, 42161, 8453]
        );
    }

    #[test]
    fn explorer_links() {
        let registry = Registry::builtin();
        let mainnet = registry.get(networks::MAINNET).unwrap();
        assert_eq!(
            mainnet.address_url("0xabc").unwrap().as_str(),
            "https://etherscan.io/address/0xabc"
        );
        assert_eq!(
            mainnet.block_url(17).unwrap().as_str(),
            "https://etherscan.io/block/17"
        );
        assert_eq!(mainnet.transaction_url(""), None);

        let local = Registry::default()
            .with_overrides([(31337, "http://localhost:8545".parse().unwrap())]);
        assert_eq!(local.get(31337).unwrap().transaction_url("0x01"), None);
    }
}
