use clap::Parser;
use eyre::Result;
use trontrust_config::{ChainVariant, Config};
use trontrust_wallets::{ChainDescriptor, ChainPolicy};
use yansi::Paint;

/// CLI arguments for `trontrust chains`.
#[derive(Clone, Debug, Parser)]
pub struct ChainsArgs {
    /// The variant to list. Defaults to the configured one.
    #[arg(long, value_name = "VARIANT")]
    pub variant: Option<ChainVariant>,

    /// Print the chains as JSON.
    #[arg(long, short)]
    pub json: bool,
}

impl ChainsArgs {
    pub fn run(self) -> Result<()> {
        let policy = match self.variant {
            Some(variant) => ChainPolicy::for_variant(variant),
            None => ChainPolicy::from_config(&Config::try_from(Config::figment())?)?,
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(policy.chains())?);
            return Ok(());
        }

        println!("{} chains ({} variant)", policy.family(), policy.variant().bold());
        for chain in policy.chains() {
            println!("{}", format_chain(chain));
        }
        Ok(())
    }
}

fn format_chain(chain: &ChainDescriptor) -> String {
    let testnet = if chain.is_testnet { " [testnet]" } else { "" };
    format!(
        "{:>12}  {:<20} {} ({} decimals){}",
        chain.id,
        chain.label,
        chain.symbol,
        chain.decimals,
        testnet.yellow()
    )
}
