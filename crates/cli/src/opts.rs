use crate::cmd::{chains::ChainsArgs, serve::ServeArgs};
use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;

const VERSION_MESSAGE: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARGO_PKG_NAME"), ")");

/// Wallet connect bridge for TronTrust.
#[derive(Debug, Parser)]
#[command(name = "trontrust", version = VERSION_MESSAGE, next_display_order = None)]
pub struct Trontrust {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: TrontrustSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum TrontrustSubcommand {
    /// Serve the connect page and coordinate wallet connections.
    #[command(visible_alias = "s")]
    Serve(ServeArgs),

    /// List the chains a variant accepts.
    Chains(ChainsArgs),

    /// Generate shell completions script.
    #[command(visible_alias = "com")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options shared by every subcommand.
#[derive(Clone, Copy, Debug, Default, Parser)]
pub struct GlobalArgs {
    /// Verbosity level of the log messages.
    ///
    /// Pass multiple times to increase the verbosity (e.g. -v, -vv).
    ///
    /// Overridden by `RUST_LOG`.
    #[arg(long, short, global = true, action = ArgAction::Count, help_heading = "Display options")]
    pub verbosity: u8,

    /// Do not print log messages.
    #[arg(long, short, global = true, conflicts_with = "verbosity", help_heading = "Display options")]
    pub quiet: bool,

    /// Disable colored output.
    #[arg(long, global = true, help_heading = "Display options")]
    pub no_color: bool,
}

impl GlobalArgs {
    /// Applies the display options and installs the log subscriber.
    pub fn init(&self) -> eyre::Result<()> {
        if self.no_color {
            yansi::disable();
        }
        crate::utils::subscriber(self.default_directive(), !self.no_color)
    }

    /// The log filter used when `RUST_LOG` is unset.
    pub fn default_directive(&self) -> &'static str {
        match (self.quiet, self.verbosity) {
            (true, _) => "off",
            (false, 0) => "info",
            (false, 1) => "trontrust=debug,info",
            (false, _) => "trontrust=trace,info",
        }
    }
}
