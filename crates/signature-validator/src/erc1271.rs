//! ERC-1271 verification across candidate chains and digests.
//!
//! <https://eips.ethereum.org/EIPS/eip-1271>

use {
    crate::{
        chain_probe::{ChainProbe, Probe},
        timeouts::Timeouts,
    },
    alloy::{
        primitives::{Address, B256, Bytes},
        sol,
        sol_types::SolCall,
    },
    chain::CandidateChain,
    ethrpc::{CallError, ChainClient},
    futures::StreamExt,
    hex_literal::hex,
    model::{ChainId, signature::SignatureShape},
    std::fmt::{self, Display, Formatter},
};

sol! {
    interface IERC1271 {
        function isValidSignature(bytes32 hash, bytes signature) external view returns (bytes4 magicValue);
    }
}

/// The value `isValidSignature` returns for valid signatures.
pub const MAGIC_VALUE: [u8; 4] = hex!("1626ba7e");

/// Outcome of a single `isValidSignature` call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Attempt {
    /// The contract returned the magic value.
    Accepted,
    /// The contract answered with something other than the magic value.
    Rejected,
    /// The call reverted. Compliant contracts don't revert on bad signatures,
    /// so this is inconclusive.
    Reverted,
    /// The node could not execute the call.
    Unavailable,
    /// The parameters can't be encoded into a call.
    Skipped,
}

fn is_magic_value(result: &[u8]) -> bool {
    // bytes4 is left aligned in its 32 byte ABI word
    result.len() >= 4 && result[..4] == MAGIC_VALUE
}

/// Calls `isValidSignature(digest, signature)` on `signer`.
pub(crate) async fn check(
    client: &dyn ChainClient,
    signer: Address,
    digest: B256,
    signature: &Bytes,
    timeouts: &Timeouts,
) -> Attempt {
    if signature.is_empty() {
        return Attempt::Skipped;
    }
    let calldata = IERC1271::isValidSignatureCall {
        hash: digest,
        signature: signature.clone(),
    }
    .abi_encode();

    match timeouts.bounded(client.call(signer, calldata.into())).await {
        Ok(result) if is_magic_value(&result) => Attempt::Accepted,
        Ok(result) => {
            tracing::debug!(%digest, %result, "isValidSignature returned a non-magic value");
            Attempt::Rejected
        }
        Err(CallError::Reverted(data)) => {
            tracing::warn!(%digest, revert_data = %data, "unexpected revert in isValidSignature");
            Attempt::Reverted
        }
        Err(CallError::Unavailable(err)) => {
            tracing::warn!(%digest, ?err, "isValidSignature call failed");
            Attempt::Unavailable
        }
    }
}

/// Everything one search tried. Used to explain failures.
#[derive(Clone, Debug, Default)]
pub struct SearchReport {
    pub verified_on: Option<ChainId>,
    /// Chains queried for code, in order.
    pub probed: Vec<ChainId>,
    /// Chains on which the signer has code.
    pub deployed_on: Vec<ChainId>,
    pub unavailable: Vec<ChainId>,
    pub digests: usize,
    pub rejected: usize,
    pub reverted: usize,
    pub failed_calls: usize,
    pub deadline_exceeded: bool,
}

impl SearchReport {
    pub fn contract_found(&self) -> bool {
        !self.deployed_on.is_empty()
    }

    /// Whether at least one chain answered.
    pub fn any_chain_reachable(&self) -> bool {
        self.probed.len() > self.unavailable.len()
    }
}

fn chain_list(chains: &[ChainId]) -> String {
    chains
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Display for SearchReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(chain_id) = self.verified_on {
            return write!(f, "signature accepted by contract on chain {chain_id}");
        }
        if self.deployed_on.is_empty() {
            write!(
                f,
                "no contract code for signer on probed chains [{}]",
                chain_list(&self.probed)
            )?;
        } else {
            write!(
                f,
                "no contract accepted the signature: contract on chains [{}], {} digest(s) \
                 tried, {} non-magic result(s), {} revert(s), {} failed call(s)",
                chain_list(&self.deployed_on),
                self.digests,
                self.rejected,
                self.reverted,
                self.failed_calls,
            )?;
            if self.rejected == 0 && self.reverted + self.failed_calls > 0 {
                write!(f, "; all attempts were inconclusive")?;
            }
        }
        if !self.unavailable.is_empty() {
            write!(f, "; unavailable chains [{}]", chain_list(&self.unavailable))?;
        }
        if self.deadline_exceeded {
            write!(f, "; search deadline exceeded")?;
        }
        Ok(())
    }
}

/// Searches `candidates` × `digests` in order and stops at the first
/// contract that returns the magic value.
///
/// Chains without code or with an unreachable node are skipped, reverts move
/// on to the next digest. Every chain is probed at most once and every digest
/// is tried at most once per chain.
pub(crate) async fn search(
    probe: &ChainProbe,
    timeouts: &Timeouts,
    signer: Address,
    signature: &Bytes,
    candidates: Vec<CandidateChain>,
    digests: &[B256],
) -> SearchReport {
    let mut report = SearchReport {
        digests: digests.len(),
        ..Default::default()
    };
    let shape = SignatureShape::classify(signature);
    tracing::debug!(
        ?shape,
        len = signature.len(),
        signature = %truncated(signature),
        digests = digests.len(),
        chains = candidates.len(),
        "starting ERC-1271 search"
    );

    let mut probes = Box::pin(probe.probe(signer, candidates));
    while let Some(outcome) = probes.next().await {
        report.probed.push(outcome.chain_id());
        let (chain_id, client) = match outcome {
            Probe::Deployed { chain_id, client } => (chain_id, client),
            Probe::NoCode(_) => continue,
            Probe::Unavailable(chain_id, _) => {
                report.unavailable.push(chain_id);
                continue;
            }
        };
        report.deployed_on.push(chain_id);

        for digest in digests {
            if timeouts.expired() {
                report.deadline_exceeded = true;
                return report;
            }
            match check(client.as_ref(), signer, *digest, signature, timeouts).await {
                Attempt::Accepted => {
                    tracing::debug!(chain_id, %digest, "signature accepted by contract");
                    report.verified_on = Some(chain_id);
                    return report;
                }
                Attempt::Rejected => report.rejected += 1,
                Attempt::Reverted => report.reverted += 1,
                Attempt::Unavailable => report.failed_calls += 1,
                Attempt::Skipped => (),
            }
        }
    }
    report.deadline_exceeded = timeouts.expired();
    report
}

/// Long smart wallet signatures are shortened in logs.
fn truncated(signature: &Bytes) -> String {
    const MAX_BYTES: usize = 48;
    if signature.len() <= MAX_BYTES {
        return signature.to_string();
    }
    format!(
        "{}...({} bytes)",
        Bytes::copy_from_slice(&signature[..MAX_BYTES]),
        signature.len()
    )
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::primitives::keccak256,
        ethrpc::{MockChainClient, RpcError},
        mockall::predicate::{always, eq},
        std::time::Duration,
    };

    fn calldata(digest: B256, signature: &Bytes) -> Bytes {
        IERC1271::isValidSignatureCall {
            hash: digest,
            signature: signature.clone(),
        }
        .abi_encode()
        .into()
    }

    fn magic() -> Bytes {
        let mut word = [0; 32];
        word[..4].copy_from_slice(&MAGIC_VALUE);
        Bytes::copy_from_slice(&word)
    }

    fn timeouts() -> Timeouts {
        Timeouts::new(Duration::from_secs(1), None)
    }

    #[test]
    fn encodes_is_valid_signature_selector() {
        let data = calldata(B256::ZERO, &Bytes::from_static(&[1]));
        assert_eq!(data[..4], hex!("1626ba7e"));
        assert_eq!(IERC1271::isValidSignatureCall::SELECTOR, MAGIC_VALUE);
    }

    #[tokio::test]
    async fn classifies_call_results() {
        let signer = Address::repeat_byte(0x11);
        let signature = Bytes::from_static(&[0xaa; 65]);
        let accepted = keccak256("accepted");
        let rejected = keccak256("rejected");
        let reverted = keccak256("reverted");
        let failed = keccak256("failed");

        let mut client = MockChainClient::new();
        client
            .expect_call()
            .with(eq(signer), eq(calldata(accepted, &signature)))
            .returning(|_, _| Ok(magic()));
        client
            .expect_call()
            .with(eq(signer), eq(calldata(rejected, &signature)))
            .returning(|_, _| Ok(Bytes::from_static(&[0; 32])));
        client
            .expect_call()
            .with(eq(signer), eq(calldata(reverted, &signature)))
            .returning(|_, _| Err(CallError::Reverted(Bytes::new())));
        client
            .expect_call()
            .with(always(), eq(calldata(failed, &signature)))
            .returning(|_, _| Err(RpcError::Node("down".into()).into()));

        let timeouts = timeouts();
        let attempt = |digest| check(&client, signer, digest, &signature, &timeouts);
        assert_eq!(attempt(accepted).await, Attempt::Accepted);
        assert_eq!(attempt(rejected).await, Attempt::Rejected);
        assert_eq!(attempt(reverted).await, Attempt::Reverted);
        assert_eq!(attempt(failed).await, Attempt::Unavailable);
        assert_eq!(
            check(&client, signer, accepted, &Bytes::new(), &timeouts).await,
            Attempt::Skipped
        );
    }

    #[test]
    fn short_results_are_not_magic() {
        assert!(!is_magic_value(&MAGIC_VALUE[..3]));
        assert!(is_magic_value(&MAGIC_VALUE));
        assert!(is_magic_value(&magic()));
    }

    #[test]
    fn report_explains_failures() {
        let report = SearchReport {
            probed: vec![1, 137, 10],
            deployed_on: vec![137],
            unavailable: vec![10],
            digests: 2,
            reverted: 2,
            ..Default::default()
        };
        assert_eq!(
            report.to_string(),
            "no contract accepted the signature: contract on chains [137], 2 digest(s) tried, 0 \
             non-magic result(s), 2 revert(s), 0 failed call(s); all attempts were \
             inconclusive; unavailable chains [10]"
        );

        let report = SearchReport {
            probed: vec![1, 137],
            ..Default::default()
        };
        assert_eq!(
            report.to_string(),
            "no contract code for signer on probed chains [1, 137]"
        );
        assert!(report.any_chain_reachable());
        assert!(!report.contract_found());
    }

    #[test]
    fn truncates_long_signatures() {
        assert_eq!(truncated(&Bytes::from_static(&[0xab; 2])), "0xabab");
        let long = Bytes::from(vec![0xab; 500]);
        assert!(truncated(&long).ends_with("...(500 bytes)"));
    }
}
