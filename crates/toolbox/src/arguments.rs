use {
    alloy::signers::local::PrivateKeySigner,
    anyhow::{Context, Result},
    model::{ChainId, payload::SignaturePayload},
    signature_validator::WalletKind,
    std::fmt::{self, Display, Formatter},
    tracing::level_filters::LevelFilter,
    url::Url,
};

#[derive(clap::Parser)]
pub struct LoggingArguments {
    #[clap(
        long,
        env,
        default_value = "warn,toolbox=debug,signature_validator=debug,ethrpc=info"
    )]
    pub log_filter: String,

    /// Events at or above this level are written to stderr, the rest to
    /// stdout. Defaults to sending everything to stderr so that stdout only
    /// carries command output.
    #[clap(long, env, default_value = "trace")]
    pub log_stderr_threshold: LevelFilter,

    #[clap(long, env)]
    pub use_json_logs: bool,
}

impl Display for LoggingArguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            log_filter,
            log_stderr_threshold,
            use_json_logs,
        } = self;

        writeln!(f, "log_filter: {log_filter}")?;
        writeln!(f, "log_stderr_threshold: {log_stderr_threshold}")?;
        writeln!(f, "use_json_logs: {use_json_logs}")?;
        Ok(())
    }
}

#[derive(clap::Parser)]
#[clap(name = "toolbox", about = "Sign and verify EVM signatures")]
pub struct Arguments {
    #[clap(flatten)]
    pub logging: LoggingArguments,

    #[clap(flatten)]
    pub verification: signature_validator::Arguments,

    /// RPC endpoint of the chain the wallet is connected to. Without it
    /// signing uses mainnet and verification runs without a connected chain.
    #[clap(long, env)]
    pub node_url: Option<Url>,

    #[clap(long, env, value_enum, default_value = "injected")]
    pub wallet_kind: WalletKind,

    /// Private key of the local wallet used for signing.
    #[clap(long, env, hide_env_values = true)]
    pub private_key: Option<PrivateKeySigner>,

    #[clap(subcommand)]
    pub command: Command,
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            logging,
            verification,
            node_url,
            wallet_kind,
            private_key,
            command: _,
        } = self;

        write!(f, "{logging}")?;
        write!(f, "{verification}")?;
        match node_url {
            Some(url) => writeln!(f, "node_url: {url}")?,
            None => writeln!(f, "node_url: None")?,
        }
        writeln!(f, "wallet_kind: {wallet_kind:?}")?;
        let private_key = match private_key {
            Some(_) => "SECRET",
            None => "None",
        };
        writeln!(f, "private_key: {private_key}")?;
        Ok(())
    }
}

#[derive(clap::Subcommand)]
pub enum Command {
    /// Prints the digests a payload may be signed under.
    Hash(PayloadArguments),

    /// Signs a payload with the local wallet.
    Sign(PayloadArguments),

    /// Verifies that a signer produced a signature, for EOAs and ERC-1271
    /// smart contract accounts alike.
    Verify {
        #[clap(flatten)]
        payload: PayloadArguments,

        /// The `0x` prefixed signature.
        #[clap(long)]
        signature: String,

        /// Address of the account that supposedly signed the payload.
        #[clap(long)]
        signer: String,

        /// Chain the signature was produced on. Searched right after the
        /// connected chain.
        #[clap(long)]
        chain_id: Option<ChainId>,
    },

    /// Prints example payloads.
    Example,

    /// Lists the built-in networks.
    Networks,

    /// Converts between UTF-8 text and hex.
    Hex {
        #[clap(subcommand)]
        direction: HexDirection,
    },
}

#[derive(clap::Subcommand)]
pub enum HexDirection {
    Encode { text: String },
    Decode { hex: String },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum PayloadKind {
    /// UTF-8 text signed with `personal_sign`.
    Message,
    /// `0x` prefixed bytes.
    Raw,
    /// EIP-712 typed data JSON.
    TypedData,
    /// ERC-4337 user operation hash.
    UserOperation,
}

#[derive(clap::Args)]
pub struct PayloadArguments {
    #[clap(long, value_enum, default_value = "message")]
    pub kind: PayloadKind,

    /// The message text, hex data, typed data JSON or user operation hash.
    /// A value starting with `@` is read from the named file.
    pub payload: String,
}

impl PayloadArguments {
    pub fn load(&self) -> Result<SignaturePayload> {
        let input = match self.payload.strip_prefix('@') {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read payload from {path}"))?,
            None => self.payload.clone(),
        };
        let payload = match self.kind {
            PayloadKind::Message => SignaturePayload::message(input),
            PayloadKind::Raw => SignaturePayload::raw_from_hex(input.trim())?,
            PayloadKind::TypedData => SignaturePayload::typed_data_from_json(&input)?,
            PayloadKind::UserOperation => {
                SignaturePayload::user_operation_from_hex(input.trim())?
            }
        };
        Ok(payload)
    }
}
