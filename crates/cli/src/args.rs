use crate::{
    opts::{Trontrust, TrontrustSubcommand},
    utils,
};
use clap::{CommandFactory, Parser};
use eyre::Result;

/// Run the `trontrust` command line interface.
pub fn run() -> Result<()> {
    setup();

    let args = Trontrust::parse();
    args.global.init()?;

    run_command(args)
}

/// Setup the exception handler and other utilities.
pub fn setup() {
    utils::common_setup();
}

/// Run the subcommand.
pub fn run_command(args: Trontrust) -> Result<()> {
    match args.cmd {
        TrontrustSubcommand::Serve(cmd) => utils::tokio_runtime()?.block_on(cmd.run()),
        TrontrustSubcommand::Chains(cmd) => cmd.run(),
        TrontrustSubcommand::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Trontrust::command(),
                "trontrust",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trontrust_config::ChainVariant;

    #[test]
    fn verify_cli() {
        Trontrust::command().debug_assert();
    }

    #[test]
    fn can_parse_version() {
        let err = Trontrust::try_parse_from(["trontrust", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn can_parse_completions() {
        let args = Trontrust::parse_from(["trontrust", "completions", "bash"]);
        assert!(matches!(
            args.cmd,
            TrontrustSubcommand::Completions { shell: clap_complete::Shell::Bash }
        ));
    }

    #[test]
    fn can_parse_serve() {
        let args = Trontrust::parse_from([
            "trontrust",
            "-vv",
            "serve",
            "--variant",
            "evm",
            "--port",
            "0",
            "--no-browser",
        ]);
        assert_eq!(args.global.verbosity, 2);
        let TrontrustSubcommand::Serve(serve) = args.cmd else { panic!("expected serve") };
        assert_eq!(serve.variant, Some(ChainVariant::Evm));
        assert_eq!(serve.port, Some(0));
        assert!(serve.no_browser);
    }

    #[test]
    fn quiet_conflicts_with_verbosity() {
        assert!(Trontrust::try_parse_from(["trontrust", "-q", "-v", "chains"]).is_err());
        let args = Trontrust::parse_from(["trontrust", "chains", "--quiet"]);
        assert_eq!(args.global.default_directive(), "off");
    }
}
