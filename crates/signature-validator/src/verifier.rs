//! Signature verification for EOAs and smart contract accounts.

use {
    crate::{
        account::AccountKind,
        chain_probe::ChainProbe,
        digest,
        erc1271,
        timeouts::Timeouts,
        wallet::WalletContext,
    },
    alloy::primitives::{Address, B256},
    chain::{CandidateChain, Registry},
    ethrpc::{Connector, RpcError},
    model::{
        MalformedInput,
        signature::{self, RecoveryError},
        verification::{VerificationMethod, VerificationOutcome, VerificationRequest},
    },
    std::{num::NonZeroUsize, sync::Arc, time::Duration},
    thiserror::Error,
};

#[derive(Clone, Debug)]
pub struct Config {
    /// Upper bound for every single RPC request.
    pub rpc_timeout: Duration,
    /// Upper bound for a whole verification. Chains not reached before it
    /// passes count as unavailable.
    pub search_deadline: Option<Duration>,
    /// How many chains may be probed for code ahead of the ERC-1271 search.
    pub probe_concurrency: NonZeroUsize,
    /// Attempt ECDSA recovery even for signers known to be contracts.
    pub always_try_eoa_first: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_secs(10),
            search_deadline: None,
            probe_concurrency: NonZeroUsize::MIN,
            always_try_eoa_first: false,
        }
    }
}

impl Config {
    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    pub fn with_search_deadline(mut self, deadline: Duration) -> Self {
        self.search_deadline = Some(deadline);
        self
    }

    pub fn with_probe_concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.probe_concurrency = concurrency;
        self
    }

    pub fn with_always_try_eoa_first(mut self, enabled: bool) -> Self {
        self.always_try_eoa_first = enabled;
        self
    }
}

/// Verification only fails for requests that can't be checked at all.
/// Signatures that don't verify produce an invalid outcome instead.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Malformed(#[from] MalformedInput),
}

/// What is known about the signer before any signature check ran.
struct Classification {
    kind: Option<AccountKind>,
    /// Why `kind` is unknown, if a chain failed to answer.
    note: Option<String>,
}

pub struct SignatureVerifier {
    registry: Registry,
    connector: Arc<dyn Connector>,
    config: Config,
}

impl SignatureVerifier {
    pub fn new(registry: Registry, connector: Arc<dyn Connector>) -> Self {
        Self::with_config(registry, connector, Config::default())
    }

    pub fn with_config(registry: Registry, connector: Arc<dyn Connector>, config: Config) -> Self {
        Self {
            registry,
            connector,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Checks that `request.signer` signed `request.payload`.
    ///
    /// EOAs are checked by ECDSA recovery without touching the network. For
    /// contract accounts, and EOA checks that fail, every candidate chain the
    /// signer is deployed on is asked through ERC-1271 with every digest
    /// encoding the payload may have been signed under. The first acceptance
    /// wins.
    #[tracing::instrument(
        skip_all,
        fields(signer = %request.signer, kind = %request.payload.kind())
    )]
    pub async fn verify(
        &self,
        wallet: &WalletContext,
        request: &VerificationRequest,
    ) -> Result<VerificationOutcome, VerifyError> {
        request.validate()?;
        let primary = digest::digest_for(&request.payload)?;

        let timeouts = self.timeouts();
        let connected = wallet.connection();
        let mut probe = self.chain_probe_with(timeouts);
        if let Some(connection) = connected {
            probe = probe.with_connected(connection.chain.chain_id, connection.client.clone());
        }

        let connected_chain = connected.map(|connection| connection.chain.clone());
        let classification = self
            .classify(&mut probe, request, connected_chain.clone())
            .await;
        let known_contract = classification.kind == Some(AccountKind::Contract);

        let mut eoa_failure = None;
        if !known_contract || self.config.always_try_eoa_first {
            let digests = digest::eoa_digests(&request.payload, primary);
            match recover_signer(&request.signature, &digests, request.signer) {
                Ok(digest) => {
                    tracing::debug!(%digest, "ECDSA recovery matched signer");
                    return Ok(VerificationOutcome {
                        signer_is_contract: known_contract,
                        ..VerificationOutcome::valid_eoa()
                    });
                }
                Err(reason) => {
                    tracing::debug!(%reason, "ECDSA recovery did not match signer");
                    eoa_failure = Some(reason);
                }
            }
        }

        let candidates = self
            .registry
            .candidates(connected_chain, request.preferred_chain_id);
        let digests = digest::alternative_digests(&request.payload, primary);
        let report = erc1271::search(
            &probe,
            &timeouts,
            request.signer,
            &request.signature,
            candidates,
            &digests,
        )
        .await;

        if let Some(chain_id) = report.verified_on {
            return Ok(VerificationOutcome::valid_contract(chain_id));
        }

        let signer_is_contract = known_contract || report.contract_found();
        let method = if signer_is_contract {
            VerificationMethod::Erc1271
        } else if classification.kind.is_none() && !report.any_chain_reachable() {
            VerificationMethod::FormatCheckOnly
        } else {
            VerificationMethod::Eoa
        };
        let outcome = VerificationOutcome::invalid(method, signer_is_contract, report.to_string())
            .with_note(eoa_failure)
            .with_note(classification.note);
        tracing::debug!(?method, detail = ?outcome.error_detail, "signature invalid");
        Ok(outcome)
    }

    /// Whether `address` has deployed code on `chain`. A failing node is an
    /// error, never `false`.
    pub async fn is_contract(
        &self,
        address: Address,
        chain: &CandidateChain,
    ) -> Result<bool, RpcError> {
        let kind = self.chain_probe().classify(address, chain).await?;
        Ok(kind == AccountKind::Contract)
    }

    /// A probe using this verifier's connector and time limits.
    pub fn chain_probe(&self) -> ChainProbe {
        self.chain_probe_with(self.timeouts())
    }

    fn chain_probe_with(&self, timeouts: Timeouts) -> ChainProbe {
        ChainProbe::new(
            self.connector.clone(),
            timeouts,
            self.config.probe_concurrency,
        )
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::new(self.config.rpc_timeout, self.config.search_deadline)
    }

    /// Like [`Self::verify`] but malformed requests are simply invalid.
    pub async fn is_valid(&self, wallet: &WalletContext, request: &VerificationRequest) -> bool {
        match self.verify(wallet, request).await {
            Ok(outcome) => outcome.is_valid,
            Err(err) => {
                tracing::debug!(?err, "malformed verification request");
                false
            }
        }
    }

    /// Asks the preferred chain, then the connected one, whether the signer
    /// has code. The first chain that answers decides.
    async fn classify(
        &self,
        probe: &mut ChainProbe,
        request: &VerificationRequest,
        connected: Option<CandidateChain>,
    ) -> Classification {
        let preferred = request
            .preferred_chain_id
            .and_then(|chain_id| match &connected {
                Some(chain) if chain.chain_id == chain_id => Some(chain.clone()),
                _ => self.registry.candidate(chain_id),
            });

        let mut failures = Vec::new();
        for chain in preferred.into_iter().chain(connected) {
            if failures.iter().any(|(chain_id, _)| *chain_id == chain.chain_id) {
                continue;
            }
            match probe.classify(request.signer, &chain).await {
                Ok(kind) => {
                    tracing::debug!(chain_id = chain.chain_id, ?kind, "classified signer");
                    return Classification {
                        kind: Some(kind),
                        note: None,
                    };
                }
                Err(err) => {
                    tracing::warn!(chain_id = chain.chain_id, ?err, "failed to classify signer");
                    failures.push((chain.chain_id, err));
                }
            }
        }

        let note = (!failures.is_empty()).then(|| {
            let reasons = failures
                .iter()
                .map(|(chain_id, err)| format!("chain {chain_id}: {err}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("could not classify signer ({reasons})")
        });
        Classification { kind: None, note }
    }
}

/// Recovers the signature against each digest in turn and returns the one
/// that yields `expected`.
fn recover_signer(signature: &[u8], digests: &[B256], expected: Address) -> Result<B256, String> {
    let mut mismatch = None;
    for digest in digests {
        match signature::recover(signature, digest) {
            Ok(recovered) if recovered == expected => return Ok(*digest),
            Ok(recovered) => mismatch = Some(format!("ECDSA recovery yielded {recovered}")),
            Err(err @ (RecoveryError::Length(_) | RecoveryError::RecoveryId(_))) => {
                return Err(err.to_string());
            }
            Err(err) => mismatch = Some(format!("ECDSA recovery failed: {err}")),
        }
    }
    Err(mismatch.unwrap_or_else(|| "no digest to recover from".to_owned()))
}
