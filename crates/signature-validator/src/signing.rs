//! Producing signatures through the connected wallet.

use {
    crate::{digest, wallet::WalletContext},
    alloy::{
        primitives::{Address, Bytes},
        signers::{Signer, local::PrivateKeySigner},
    },
    chrono::Utc,
    model::{
        MalformedInput,
        payload::{SignaturePayload, TypedDataDocument},
        signature::SignatureRecord,
    },
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("request rejected by the user")]
    Rejected,
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("no wallet connected")]
    WalletNotConnected,
    #[error("signature request rejected by the user")]
    UserRejected,
    #[error(transparent)]
    Malformed(#[from] MalformedInput),
    #[error("wallet failed to sign: {0}")]
    Wallet(String),
}

impl From<WalletError> for SigningError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Rejected => Self::UserRejected,
            WalletError::Failed(reason) => Self::Wallet(reason),
        }
    }
}

/// Signing methods of a wallet backend.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> Address;

    /// `personal_sign` of a UTF-8 message.
    async fn sign_message(&self, text: &str) -> Result<Bytes, WalletError>;

    /// `eth_signTypedData_v4`.
    async fn sign_typed_data(&self, document: &TypedDataDocument) -> Result<Bytes, WalletError>;

    /// `personal_sign` of raw bytes.
    async fn sign_raw(&self, data: &[u8]) -> Result<Bytes, WalletError>;
}

/// A wallet holding its private key in memory.
pub struct LocalWallet(PrivateKeySigner);

impl LocalWallet {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self(signer)
    }
}

fn failed(err: alloy::signers::Error) -> WalletError {
    WalletError::Failed(err.to_string())
}

#[async_trait::async_trait]
impl WalletSigner for LocalWallet {
    fn address(&self) -> Address {
        self.0.address()
    }

    async fn sign_message(&self, text: &str) -> Result<Bytes, WalletError> {
        self.sign_raw(text.as_bytes()).await
    }

    async fn sign_typed_data(&self, document: &TypedDataDocument) -> Result<Bytes, WalletError> {
        let typed_data = document
            .to_alloy()
            .map_err(|err| WalletError::Failed(err.to_string()))?;
        let signature = self
            .0
            .sign_dynamic_typed_data(&typed_data)
            .await
            .map_err(failed)?;
        Ok(signature.as_bytes().into())
    }

    async fn sign_raw(&self, data: &[u8]) -> Result<Bytes, WalletError> {
        let signature = self.0.sign_message(data).await.map_err(failed)?;
        Ok(signature.as_bytes().into())
    }
}

/// Asks the connected wallet to sign `payload`.
///
/// The digest is computed before the wallet is involved, so malformed
/// payloads never reach the user.
#[tracing::instrument(skip_all, fields(kind = %payload.kind()))]
pub async fn sign(
    wallet: &WalletContext,
    payload: SignaturePayload,
) -> Result<SignatureRecord, SigningError> {
    let signer = wallet.signer().ok_or(SigningError::WalletNotConnected)?;
    let digest = digest::digest_for(&payload)?;

    let signature = match &payload {
        SignaturePayload::Message { text } => signer.sign_message(text).await?,
        SignaturePayload::Raw { data } => signer.sign_raw(data).await?,
        SignaturePayload::TypedData(document) => signer.sign_typed_data(document).await?,
        SignaturePayload::UserOperation { hash } => signer.sign_raw(hash.as_slice()).await?,
    };
    tracing::debug!(
        signer = %signer.address(),
        %digest,
        preview = payload.preview(),
        "signed payload"
    );

    Ok(SignatureRecord {
        signature,
        digest,
        signer: signer.address(),
        payload,
        produced_at: Utc::now(),
    })
}
