use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pact",
    about = "Pact: write-once agreement ledger",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Journal file holding ledger state (overrides the config file)
    #[arg(long, global = true)]
    pub journal: Option<PathBuf>,

    /// Host configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store an agreement under a key that has none yet
    Mint(MintArgs),
    /// Read the agreement stored under a key
    Fetch(FetchArgs),
    /// Invoke a contract function by name
    Invoke(InvokeArgs),
    /// List the contract's functions
    Functions,
}

#[derive(Args)]
pub struct MintArgs {
    pub key: String,
    pub value: String,
}

#[derive(Args)]
pub struct FetchArgs {
    pub key: String,
}

#[derive(Args)]
pub struct InvokeArgs {
    pub function: String,
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mint() {
        let cli = Cli::try_parse_from(["pact", "mint", "contract-42", "terms:v1"]).unwrap();
        if let Command::Mint(args) = cli.command {
            assert_eq!(args.key, "contract-42");
            assert_eq!(args.value, "terms:v1");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_mint_empty_value() {
        let cli = Cli::try_parse_from(["pact", "mint", "k", ""]).unwrap();
        if let Command::Mint(args) = cli.command {
            assert_eq!(args.value, "");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn mint_requires_value() {
        assert!(Cli::try_parse_from(["pact", "mint", "k"]).is_err());
    }

    #[test]
    fn parse_fetch_with_journal() {
        let cli = Cli::try_parse_from(["pact", "fetch", "k", "--journal", "/tmp/x.journal"]).unwrap();
        assert_eq!(cli.journal, Some(PathBuf::from("/tmp/x.journal")));
        assert!(matches!(cli.command, Command::Fetch(_)));
    }

    #[test]
    fn parse_invoke() {
        let cli = Cli::try_parse_from(["pact", "invoke", "mint", "a", "b"]).unwrap();
        if let Command::Invoke(args) = cli.command {
            assert_eq!(args.function, "mint");
            assert_eq!(args.args, vec!["a", "b"]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_functions() {
        let cli = Cli::try_parse_from(["pact", "functions"]).unwrap();
        assert!(matches!(cli.command, Command::Functions));
    }

    #[test]
    fn parse_json_verbose() {
        let cli = Cli::try_parse_from(["pact", "-v", "--format", "json", "functions"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
