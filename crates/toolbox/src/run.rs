use {
    crate::{
        arguments::{Arguments, Command, HexDirection},
        hex,
    },
    anyhow::{Context, Result},
    chain::{Registry, networks},
    clap::Parser,
    ethrpc::{AlloyChainClient, Connector, HttpConnector},
    model::{
        payload::{SignaturePayload, TypedDataDocument},
        verification::VerificationRequest,
    },
    serde_json::{Value, json},
    signature_validator::{
        Connection,
        LocalWallet,
        SignatureVerifier,
        WalletContext,
        digest,
        sign,
    },
    std::sync::Arc,
};

pub async fn start(args: impl Iterator<Item = String>) -> Result<()> {
    let args = Arguments::parse_from(args);
    let obs_config = observe::Config::new(
        args.logging.log_filter.as_str(),
        args.logging.log_stderr_threshold,
        args.logging.use_json_logs,
    );
    observe::tracing::initialize(&obs_config);
    tracing::info!("running toolbox with validated arguments:\n{}", args);
    observe::metrics::setup_registry(Some("toolbox".into()), None)?;

    let output = run(args).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Executes the command and returns its JSON output.
pub async fn run(args: Arguments) -> Result<Value> {
    let registry = args.verification.registry();
    let connector: Arc<dyn Connector> = Arc::new(HttpConnector::default());

    Ok(match &args.command {
        Command::Hash(payload) => digests(&payload.load()?)?,
        Command::Sign(payload) => {
            let wallet = signing_wallet(&args, &registry, connector.as_ref()).await?;
            let record = sign(&wallet, payload.load()?).await?;
            serde_json::to_value(record)?
        }
        Command::Verify {
            payload,
            signature,
            signer,
            chain_id,
        } => {
            let request =
                VerificationRequest::parse(signature, payload.load()?, signer, *chain_id)?;
            let wallet = match connection(&args).await? {
                Some(connection) => WalletContext::connected(connection),
                None => WalletContext::disconnected(),
            };
            let verifier =
                SignatureVerifier::with_config(registry, connector, args.verification.config());
            let outcome = verifier.verify(&wallet, &request).await?;
            serde_json::to_value(outcome)?
        }
        Command::Example => json!({
            "typedData": TypedDataDocument::example(),
            "raw": SignaturePayload::example_raw(),
        }),
        Command::Networks => serde_json::to_value(registry.networks())?,
        Command::Hex { direction } => match direction {
            HexDirection::Encode { text } => json!(hex::encode(text)),
            HexDirection::Decode { hex } => json!(hex::decode(hex)),
        },
    })
}

fn digests(payload: &SignaturePayload) -> Result<Value> {
    let primary = digest::digest_for(payload)?;
    Ok(json!({
        "kind": payload.kind().to_string(),
        "digest": primary,
        "alternativeDigests": digest::alternative_digests(payload, primary),
        "eoaDigests": digest::eoa_digests(payload, primary),
    }))
}

/// Connects to `--node-url`, if given.
async fn connection(args: &Arguments) -> Result<Option<Connection>> {
    let Some(url) = &args.node_url else {
        return Ok(None);
    };
    let client = AlloyChainClient::new(ethrpc::alloy::provider(url, "wallet"));
    let connection = Connection::establish(args.wallet_kind, url.clone(), Arc::new(client))
        .await
        .with_context(|| format!("failed to connect to {url}"))?;
    Ok(Some(connection))
}

/// A wallet backed by `--private-key`. Signing happens locally, so without a
/// node the wallet is considered connected to mainnet.
async fn signing_wallet(
    args: &Arguments,
    registry: &Registry,
    connector: &dyn Connector,
) -> Result<WalletContext> {
    let key = args
        .private_key
        .clone()
        .context("signing requires --private-key")?;
    let connection = match connection(args).await? {
        Some(connection) => connection,
        None => {
            let chain = registry
                .candidate(networks::MAINNET)
                .context("mainnet missing from network registry")?;
            Connection {
                kind: args.wallet_kind,
                client: connector.connect(chain.chain_id, &chain.rpc_endpoint),
                chain,
                signer: None,
            }
        }
    };
    Ok(WalletContext::connected(
        connection.with_signer(Arc::new(LocalWallet::new(key))),
    ))
}

#[cfg(test)]
mod tests {
    use {super::*, alloy::primitives::b256};

    fn arguments(args: &[&str]) -> Arguments {
        Arguments::parse_from(std::iter::once("toolbox").chain(args.iter().copied()))
    }

    #[tokio::test]
    async fn hashes_example_raw_message() {
        let output = run(arguments(&["hash", "--kind", "raw", "0x48656c6c6f20576f726c64"]))
            .await
            .unwrap();
        let eip191 = b256!("a1de988600a42c4b4ab089b619297c17d53cffae5d5120d82d8a92d0bb3b78f2");
        assert_eq!(output["kind"], "raw");
        assert_eq!(output["eoaDigests"][0], json!(eip191));
    }

    #[tokio::test]
    async fn signs_and_verifies_offline() {
        let key = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
        let record = run(arguments(&["--private-key", key, "sign", "gm"]))
            .await
            .unwrap();
        let signature = record["signature"].as_str().unwrap();
        let signer = record["signer"].as_str().unwrap();

        let outcome = run(arguments(&[
            "verify",
            "--signature",
            signature,
            "--signer",
            signer,
            "gm",
        ]))
        .await
        .unwrap();
        assert_eq!(outcome["isValid"], true);
        assert_eq!(outcome["method"], "eoa");
    }

    #[tokio::test]
    async fn signing_requires_a_key() {
        let result = run(arguments(&["sign", "gm"])).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn converts_hex() {
        let output = run(arguments(&["hex", "encode", "Hello World"]))
            .await
            .unwrap();
        assert_eq!(output, json!("0x48656c6c6f20576f726c64"));
        let output = run(arguments(&["hex", "decode", "zz"])).await.unwrap();
        assert_eq!(output, json!("zz"));
    }
}
