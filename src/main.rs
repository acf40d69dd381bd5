use anyhow::Context;
use cemscale::cli::Args;
use cemscale::processor::ReconciliationProcessor;
use clap::Parser;
use std::process;
use tracing::debug;

fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cemscale={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .init();

    debug!("Logging initialized at level: {}", log_level);
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.to_config().context("Invalid arguments")?;
    let processor = ReconciliationProcessor::new(config)?;
    processor
        .process()
        .await
        .context("Reconciliation failed")?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    setup_logging(&args);

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    if let Err(error) = runtime.block_on(run(args)) {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}
