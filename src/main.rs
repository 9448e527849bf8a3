// ABOUTME: CLI entry point for shareledger-migrator
// ABOUTME: Parses endpoint flags and runs the interactive migration

use clap::Parser;
use shareledger_migrator::commands;
use shareledger_migrator::config::{NetworkConfig, DEFAULT_EXPLORER_URL, DEFAULT_NODE_URL};
use shareledger_migrator::interactive::TerminalPrompter;
use shareledger_migrator::ledger::RestConnector;
use shareledger_migrator::migration::SUPPORT_MESSAGE;
use shareledger_migrator::utils::validate_endpoint_url;

#[derive(Parser)]
#[command(name = "shareledger-migrator")]
#[command(
    about = "Move funds from an OLD ShareLedger address to the NEW address of the same passphrase",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// REST endpoint of the ShareLedger node
    #[arg(long, default_value = DEFAULT_NODE_URL, value_parser = parse_endpoint)]
    node_url: String,
    /// Block explorer used for transaction links
    #[arg(long, default_value = DEFAULT_EXPLORER_URL, value_parser = parse_endpoint)]
    explorer_url: String,
}

fn parse_endpoint(url: &str) -> Result<String, String> {
    validate_endpoint_url(url).map_err(|e| format!("{:#}", e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = NetworkConfig::default()
        .with_node_url(cli.node_url)
        .with_explorer_url(cli.explorer_url);
    let connector = RestConnector::new(config.clone());
    let mut prompter = TerminalPrompter::new();

    match commands::migrate(&mut prompter, &connector, &config).await {
        Ok(outcome) => {
            tracing::debug!("Migration finished: {:?}", outcome);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", SUPPORT_MESSAGE);
            Err(e)
        }
    }
}
