use std::io;

use anyhow::{Context, Result};
use log::info;
use shindan::config::AppConfig;

fn main() -> Result<()> {
    // Initialize logging. Control verbosity with RUST_LOG env var:
    //   RUST_LOG=info   cargo run               # sessions + transitions
    //   RUST_LOG=debug  cargo run               # + tree stats, image lookups
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = AppConfig::from_env(&args).context(
        "Usage: shindan [tree.json]\n\
         \n\
         Environment:\n  SHINDAN_SINK=sheets|file|memory  SHINDAN_RESULTS=results.jsonl\n  \
         SHINDAN_SECRETS=secrets.json  SHINDAN_ASSETS=assets  SHINDAN_TIMEOUT_SECS=10",
    )?;

    let tree = config.load_tree()?;
    let sink = config.build_sink().context("failed to set up result sink")?;

    let stdin = io::stdin();
    let summary = shindan::play::run(
        &tree,
        sink.as_ref(),
        &config.assets_dir,
        stdin.lock(),
        io::stdout(),
    )?;
    info!(
        "Done: {} results, {} submitted, {} failed submissions",
        summary.results.len(),
        summary.submitted,
        summary.failed_submissions
    );
    Ok(())
}
