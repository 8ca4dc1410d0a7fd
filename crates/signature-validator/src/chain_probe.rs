//! Locates the chains on which an address has deployed code.

use {
    crate::{account::AccountKind, timeouts::Timeouts},
    alloy::primitives::Address,
    chain::CandidateChain,
    ethrpc::{ChainClient, Connector, RpcError},
    futures::{Stream, StreamExt, stream},
    model::ChainId,
    std::{
        collections::{HashMap, HashSet},
        num::NonZeroUsize,
        sync::Arc,
    },
};

/// Result of looking for code on one candidate chain.
pub enum Probe {
    Deployed {
        chain_id: ChainId,
        client: Arc<dyn ChainClient>,
    },
    NoCode(ChainId),
    Unavailable(ChainId, RpcError),
}

impl Probe {
    pub fn chain_id(&self) -> ChainId {
        match self {
            Self::Deployed { chain_id, .. }
            | Self::NoCode(chain_id)
            | Self::Unavailable(chain_id, _) => *chain_id,
        }
    }
}

/// Probes candidate chains in priority order. Built per verification, so
/// each chain is queried at most once per verification.
pub struct ChainProbe {
    connector: Arc<dyn Connector>,
    connected: Option<(ChainId, Arc<dyn ChainClient>)>,
    known: HashMap<ChainId, Result<AccountKind, RpcError>>,
    timeouts: Timeouts,
    concurrency: NonZeroUsize,
}

impl ChainProbe {
    pub(crate) fn new(
        connector: Arc<dyn Connector>,
        timeouts: Timeouts,
        concurrency: NonZeroUsize,
    ) -> Self {
        Self {
            connector,
            connected: None,
            known: HashMap::new(),
            timeouts,
            concurrency,
        }
    }

    /// Queries for the connected chain go through the wallet's own client.
    pub(crate) fn with_connected(
        mut self,
        chain_id: ChainId,
        client: Arc<dyn ChainClient>,
    ) -> Self {
        self.connected = Some((chain_id, client));
        self
    }

    fn client(&self, chain: &CandidateChain) -> Arc<dyn ChainClient> {
        match &self.connected {
            Some((chain_id, client)) if *chain_id == chain.chain_id => client.clone(),
            _ => self.connector.connect(chain.chain_id, &chain.rpc_endpoint),
        }
    }

    /// Classifies `address` on a single chain. The result is reused by later
    /// probes of the same chain.
    pub(crate) async fn classify(
        &mut self,
        address: Address,
        chain: &CandidateChain,
    ) -> Result<AccountKind, RpcError> {
        if let Some(known) = self.known.get(&chain.chain_id) {
            return known.clone();
        }
        let client = self.client(chain);
        let result = crate::account::resolve(client.as_ref(), address, &self.timeouts).await;
        self.known.insert(chain.chain_id, result.clone());
        result
    }

    /// Lazily probes every candidate once, in order. Probes run ahead of the
    /// consumer by at most the configured concurrency, results are always
    /// yielded in candidate order.
    pub fn probe(
        &self,
        address: Address,
        candidates: Vec<CandidateChain>,
    ) -> impl Stream<Item = Probe> + Send + '_ {
        let mut seen = HashSet::new();
        let candidates: Vec<_> = candidates
            .into_iter()
            .filter(|candidate| seen.insert(candidate.chain_id))
            .collect();

        stream::iter(candidates)
            .map(move |candidate| async move {
                let chain_id = candidate.chain_id;
                if self.timeouts.expired() {
                    return Probe::Unavailable(chain_id, RpcError::Timeout(Default::default()));
                }
                let client = self.client(&candidate);
                let kind = match self.known.get(&chain_id) {
                    Some(known) => known.clone(),
                    None => crate::account::resolve(client.as_ref(), address, &self.timeouts).await,
                };
                match kind {
                    Ok(AccountKind::Contract) => {
                        tracing::debug!(chain_id, %address, "found contract code");
                        Probe::Deployed { chain_id, client }
                    }
                    Ok(AccountKind::Eoa) => {
                        tracing::debug!(chain_id, %address, "no contract code");
                        Probe::NoCode(chain_id)
                    }
                    Err(err) => {
                        tracing::warn!(
                            chain_id,
                            endpoint = %candidate.rpc_endpoint,
                            ?err,
                            "chain unavailable, skipping"
                        );
                        Probe::Unavailable(chain_id, err)
                    }
                }
            })
            .buffered(self.concurrency.get())
    }

    /// The chains, in priority order, on which `address` has deployed code.
    pub fn find_deployed_on(
        &self,
        address: Address,
        candidates: Vec<CandidateChain>,
    ) -> impl Stream<Item = ChainId> + Send + '_ {
        self.probe(address, candidates).filter_map(|probe| async move {
            match probe {
                Probe::Deployed { chain_id, .. } => Some(chain_id),
                _ => None,
            }
        })
    }
}
