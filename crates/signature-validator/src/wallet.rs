use {
    crate::signing::WalletSigner,
    chain::CandidateChain,
    ethrpc::{ChainClient, RpcError},
    serde::Serialize,
    std::sync::Arc,
    url::Url,
};

/// The wallet backend a connection was made through.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum WalletKind {
    /// A browser extension or other injected provider.
    #[default]
    Injected,
    WalletConnect,
    /// A smart contract wallet such as a passkey backed account.
    SmartWallet,
}

/// An established wallet connection.
#[derive(Clone)]
pub struct Connection {
    pub kind: WalletKind,
    pub chain: CandidateChain,
    pub client: Arc<dyn ChainClient>,
    pub signer: Option<Arc<dyn WalletSigner>>,
}

impl Connection {
    /// Connects to the node at `endpoint` and asks it for its chain id.
    pub async fn establish(
        kind: WalletKind,
        endpoint: Url,
        client: Arc<dyn ChainClient>,
    ) -> Result<Self, RpcError> {
        let chain_id = client.chain_id().await?;
        tracing::debug!(?kind, chain_id, %endpoint, "wallet connected");
        Ok(Self {
            kind,
            chain: CandidateChain {
                chain_id,
                rpc_endpoint: endpoint,
            },
            client,
            signer: None,
        })
    }

    pub fn with_signer(mut self, signer: Arc<dyn WalletSigner>) -> Self {
        self.signer = Some(signer);
        self
    }
}

/// The wallet state a signing or verification call runs against. Passed
/// explicitly into every call.
#[derive(Clone, Default)]
pub struct WalletContext {
    connection: Option<Connection>,
}

impl WalletContext {
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn connected(connection: Connection) -> Self {
        Self {
            connection: Some(connection),
        }
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    pub fn signer(&self) -> Option<&Arc<dyn WalletSigner>> {
        self.connection.as_ref()?.signer.as_ref()
    }
}
