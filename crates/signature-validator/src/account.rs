use {
    crate::timeouts::Timeouts,
    alloy::primitives::Address,
    ethrpc::{ChainClient, RpcError},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AccountKind {
    /// Externally owned account, controlled by a private key.
    Eoa,
    /// Smart contract account.
    Contract,
}

impl AccountKind {
    pub fn from_code(code: &[u8]) -> Self {
        if is_contract_code(code) {
            Self::Contract
        } else {
            Self::Eoa
        }
    }
}

/// Whether bytecode belongs to a deployed contract. Some nodes answer a
/// single zero byte instead of empty code for accounts without code.
pub fn is_contract_code(code: &[u8]) -> bool {
    !matches!(code, [] | [0])
}

/// Classifies `address` on the chain `client` talks to.
///
/// A failing node is reported as an error, never as an EOA: callers treat it
/// as unknown.
pub(crate) async fn resolve(
    client: &dyn ChainClient,
    address: Address,
    timeouts: &Timeouts,
) -> Result<AccountKind, RpcError> {
    let code = timeouts.bounded(client.code(address)).await?;
    Ok(AccountKind::from_code(&code))
}
