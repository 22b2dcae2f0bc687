use anyhow::Context;
use colored::Colorize;
use pact_host::{ContractHost, HostConfig, HostError, InvocationOutcome};
use pact_ledger::{AgreementContract, Contract};
use pact_store::JournalStateStore;
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Mint(args) => {
            run_invocation(&cli, "mint", &[args.key.clone(), args.value.clone()])
        }
        Command::Fetch(args) => run_invocation(&cli, "fetch", &[args.key.clone()]),
        Command::Invoke(args) => run_invocation(&cli, &args.function, &args.args),
        Command::Functions => cmd_functions(&cli.format),
    }
}

fn run_invocation(cli: &Cli, function: &str, args: &[String]) -> anyhow::Result<()> {
    let host = open_host(cli)?;
    match host.invoke(function, args) {
        Ok(out) => {
            print_outcome(&cli.format, function, &out);
            Ok(())
        }
        Err(e) => {
            if let OutputFormat::Json = cli.format {
                println!("{}", failure_json(function, &e));
            }
            Err(e.into())
        }
    }
}

fn failure_json(function: &str, err: &HostError) -> serde_json::Value {
    json!({
        "function": function,
        "error": err.to_string(),
        "key": err.key(),
    })
}

pub fn load_config(cli: &Cli) -> anyhow::Result<HostConfig> {
    let mut config = match &cli.config {
        Some(path) => HostConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => HostConfig::default(),
    };
    if let Some(journal) = &cli.journal {
        config.journal_path = journal.clone();
    }
    Ok(config)
}

fn open_host(cli: &Cli) -> anyhow::Result<ContractHost<JournalStateStore>> {
    let config = load_config(cli)?;
    ContractHost::open(&config)
        .with_context(|| format!("opening journal {}", config.journal_path.display()))
}

fn print_outcome(format: &OutputFormat, function: &str, out: &InvocationOutcome) {
    match format {
        OutputFormat::Json => {
            let doc = json!({
                "function": function,
                "payload": out.payload,
                "tx_id": out.receipt.tx_id.to_string(),
                "height": out.receipt.height,
                "attempts": out.attempts,
            });
            println!("{doc}");
        }
        OutputFormat::Text => {
            if out.receipt.keys_written > 0 {
                println!("{} {}", "✓".green().bold(), out.payload);
                println!("  Tx: {}", out.receipt.tx_id.to_string().dimmed());
                println!("  Height: {}", out.receipt.height.to_string().yellow());
            } else {
                println!("{}", out.payload);
            }
        }
    }
}

fn cmd_functions(format: &OutputFormat) -> anyhow::Result<()> {
    let contract = AgreementContract::new();
    match format {
        OutputFormat::Json => {
            let doc = json!({
                "contract": contract.name(),
                "functions": contract.functions(),
            });
            println!("{doc}");
        }
        OutputFormat::Text => {
            println!("{}", contract.name().bold());
            for f in contract.functions() {
                println!("  {}({})", f.name.cyan(), f.params.join(", "));
            }
        }
    }
    Ok(())
}
