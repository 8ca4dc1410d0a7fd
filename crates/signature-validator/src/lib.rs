//! Signing payloads through a connected wallet and verifying signatures of
//! externally owned accounts and ERC-1271 smart contract accounts.

pub mod account;
pub mod arguments;
pub mod chain_probe;
pub mod digest;
pub mod erc1271;
pub mod signing;
mod timeouts;
pub mod verifier;
pub mod wallet;

#[cfg(any(test, feature = "test-util"))]
pub use signing::MockWalletSigner;
pub use {
    account::{AccountKind, is_contract_code},
    arguments::Arguments,
    model::MalformedInput,
    signing::{LocalWallet, SigningError, WalletError, WalletSigner, sign},
    verifier::{Config, SignatureVerifier, VerifyError},
    wallet::{Connection, WalletContext, WalletKind},
};
