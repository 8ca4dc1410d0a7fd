use {
    crate::verifier::Config,
    anyhow::{Context, Result},
    chain::Registry,
    model::ChainId,
    std::{
        fmt::{self, Display, Formatter},
        num::NonZeroUsize,
        str::FromStr,
        time::Duration,
    },
    url::Url,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcOverride {
    pub chain_id: ChainId,
    pub url: Url,
}

impl FromStr for RpcOverride {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let (chain_id, url) = value
            .split_once('|')
            .context("rpc override must have the form <CHAIN_ID>|<URL>")?;
        Ok(Self {
            chain_id: chain_id.parse().context("invalid chain id")?,
            url: url.parse()?,
        })
    }
}

impl Display for RpcOverride {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.chain_id, self.url)
    }
}

#[derive(clap::Parser)]
#[group(skip)]
pub struct Arguments {
    /// Maximum time a single RPC request may take before the chain is
    /// treated as unavailable.
    #[clap(
        long,
        env,
        default_value = "10s",
        value_parser = humantime::parse_duration,
    )]
    pub rpc_timeout: Duration,

    /// Maximum time a whole verification may spend searching chains.
    #[clap(long, env, value_parser = humantime::parse_duration)]
    pub search_deadline: Option<Duration>,

    /// How many candidate chains are probed for contract code concurrently.
    /// Results are always consumed in priority order.
    #[clap(long, env, default_value = "1")]
    pub probe_concurrency: NonZeroUsize,

    /// Attempt ECDSA recovery even when the signer is known to be a
    /// contract.
    #[clap(long, env)]
    pub always_try_eoa_first: bool,

    /// RPC endpoints replacing the built-in ones in the following format:
    /// `<CHAIN_ID>|<URL>,<CHAIN_ID>|<URL>`
    #[clap(long, env, use_value_delimiter = true)]
    pub rpc_overrides: Vec<RpcOverride>,
}

impl Arguments {
    pub fn config(&self) -> Config {
        let config = Config::default()
            .with_rpc_timeout(self.rpc_timeout)
            .with_probe_concurrency(self.probe_concurrency)
            .with_always_try_eoa_first(self.always_try_eoa_first);
        match self.search_deadline {
            Some(deadline) => config.with_search_deadline(deadline),
            None => config,
        }
    }

    pub fn registry(&self) -> Registry {
        Registry::builtin().with_overrides(
            self.rpc_overrides
                .iter()
                .map(|rpc| (rpc.chain_id, rpc.url.clone())),
        )
    }
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            rpc_timeout,
            search_deadline,
            probe_concurrency,
            always_try_eoa_first,
            rpc_overrides,
        } = self;

        writeln!(f, "rpc_timeout: {rpc_timeout:?}")?;
        writeln!(f, "search_deadline: {search_deadline:?}")?;
        writeln!(f, "probe_concurrency: {probe_concurrency}")?;
        writeln!(f, "always_try_eoa_first: {always_try_eoa_first}")?;
        write!(f, "rpc_overrides: [")?;
        for (i, rpc) in rpc_overrides.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{rpc}")?;
        }
        writeln!(f, "]")?;
        Ok(())
    }
}
