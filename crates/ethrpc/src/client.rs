//! The narrow set of chain queries signature verification needs, so that
//! verification can be tested against mocked chains.

use {
    crate::{
        AlloyProvider,
        alloy::{errors::TransportErrorExt, provider},
    },
    alloy::{
        primitives::{Address, Bytes},
        providers::Provider,
        rpc::types::TransactionRequest,
        transports::TransportError,
    },
    model::ChainId,
    std::{
        collections::HashMap,
        sync::{Arc, Mutex, PoisonError},
        time::Duration,
    },
    thiserror::Error,
    url::Url,
};

/// A chain could not be queried.
#[derive(Clone, Debug, Error)]
pub enum RpcError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("node error: {0}")]
    Node(String),
}

impl From<TransportError> for RpcError {
    fn from(err: TransportError) -> Self {
        Self::Node(err.to_string())
    }
}

/// Outcome of a failed `eth_call`.
#[derive(Clone, Debug, Error)]
pub enum CallError {
    /// The called code reverted. The node itself is fine.
    #[error("execution reverted with {0}")]
    Reverted(Bytes),
    #[error(transparent)]
    Unavailable(#[from] RpcError),
}

impl From<TransportError> for CallError {
    fn from(err: TransportError) -> Self {
        match err.revert_data() {
            Some(data) => Self::Reverted(data),
            None => Self::Unavailable(err.into()),
        }
    }
}

/// Read-only queries against a single chain.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<ChainId, RpcError>;

    /// Deployed bytecode at the latest block.
    async fn code(&self, address: Address) -> Result<Bytes, RpcError>;

    /// Executes a view call against the latest block.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, CallError>;
}

/// [`ChainClient`] backed by an alloy provider.
#[derive(Clone, Debug)]
pub struct AlloyChainClient {
    provider: AlloyProvider,
}

impl AlloyChainClient {
    pub fn new(provider: AlloyProvider) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl ChainClient for AlloyChainClient {
    async fn chain_id(&self) -> Result<ChainId, RpcError> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn code(&self, address: Address) -> Result<Bytes, RpcError> {
        Ok(self.provider.get_code_at(address).await?)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, CallError> {
        let tx = TransactionRequest::default().to(to).input(data.into());
        Ok(self.provider.call(tx).await?)
    }
}

/// Hands out clients for RPC endpoints.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
pub trait Connector: Send + Sync {
    fn connect(&self, chain_id: ChainId, endpoint: &Url) -> Arc<dyn ChainClient>;
}

/// Connects over HTTP and reuses clients per endpoint.
#[derive(Default)]
pub struct HttpConnector {
    clients: Mutex<HashMap<Url, Arc<AlloyChainClient>>>,
}

impl Connector for HttpConnector {
    fn connect(&self, chain_id: ChainId, endpoint: &Url) -> Arc<dyn ChainClient> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let client = clients.entry(endpoint.clone()).or_insert_with(|| {
            tracing::debug!(chain_id, %endpoint, "connecting to chain");
            Arc::new(AlloyChainClient::new(provider(
                endpoint,
                &format!("chain_{chain_id}"),
            )))
        });
        client.clone()
    }
}
