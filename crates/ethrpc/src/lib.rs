pub mod alloy;
mod client;

pub use client::{AlloyChainClient, CallError, ChainClient, Connector, HttpConnector, RpcError};
#[cfg(any(test, feature = "test-util"))]
pub use client::{MockChainClient, MockConnector};

pub type AlloyProvider = ::alloy::providers::DynProvider;
