pub mod errors;
mod instrumentation;

use {
    crate::AlloyProvider,
    alloy::{
        providers::{Provider, ProviderBuilder},
        rpc::client::ClientBuilder,
    },
    instrumentation::RpcMetricsLayer,
    url::Url,
};

/// Creates an HTTP provider whose requests are logged and measured under the
/// given component name.
pub fn provider(url: &Url, component: &str) -> AlloyProvider {
    let rpc = ClientBuilder::default()
        .layer(RpcMetricsLayer::new(component))
        .http(url.clone());
    ProviderBuilder::new().connect_client(rpc).erased()
}

/// Provider answering requests from a queue of canned responses.
#[cfg(any(test, feature = "test-util"))]
pub fn mocked_provider(asserter: alloy::providers::mock::Asserter) -> AlloyProvider {
    ProviderBuilder::new()
        .disable_recommended_fillers()
        .connect_mocked_client(asserter)
        .erased()
}
