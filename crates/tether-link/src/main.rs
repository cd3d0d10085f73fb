// ABOUTME: Entry point for tether-link device linking tool
// ABOUTME: Links this printer to a cloud account via discovery or a verification code

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use tether_link::{
    messages, CodeSource, FileConfigStore, HttpVerificationClient, LinkOptions, LinkOrchestrator,
    LinkOutcome, ServerDiscovery, TerminalConsole,
};

#[derive(Parser)]
#[command(name = "tether-link", about = "Link this printer to your cloud account")]
struct Cli {
    /// Path to the printer's config file (TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// Print debugging info and keep asking for codes after a rejection
    #[arg(short, long)]
    debug: bool,

    /// Read the verification code from this file instead of prompting
    #[arg(long, env = "TETHER_CODE_FILE")]
    code_file: Option<PathBuf>,

    /// Seconds to wait for the app to link automatically
    #[arg(long, default_value_t = 300)]
    budget: u64,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.debug {
        tether_log::init_verbose();
    } else {
        tether_log::init();
    }

    let interrupt = CancellationToken::new();
    tokio::spawn({
        let interrupt = interrupt.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        }
    });

    let store = FileConfigStore::new(&cli.config);
    let config = store
        .load()
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    let verifier = Arc::new(
        HttpVerificationClient::new(&config, store.clone())
            .context("Failed to set up verification client")?,
    );
    let discovery = Arc::new(
        ServerDiscovery::new(&config, verifier.clone()).context("Failed to set up discovery")?,
    );

    let options = LinkOptions {
        debug: cli.debug,
        discovery_budget: Duration::from_secs(cli.budget),
        rerun_command: messages::rerun_command(std::env::args_os()),
        code_source: cli.code_file.map_or(CodeSource::Prompt, CodeSource::File),
    };

    let outcome = LinkOrchestrator::new(
        Arc::new(store),
        discovery,
        verifier,
        Box::new(TerminalConsole::new()),
        options,
    )
    .with_interrupt(interrupt)
    .run()
    .await
    .context("Linking failed")?;

    if outcome == LinkOutcome::Interrupted {
        println!();
    }

    Ok(ExitCode::from(outcome.exit_code()))
}
