//! churnwatch: serves the churn-risk page, or prints it once with `--report`

use anyhow::Context;
use clap::Parser;
use churnwatch::{report, server, Args, ChurnPipeline};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> churnwatch::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = args.pipeline_config();

    if args.report {
        let pipeline = ChurnPipeline::new(config)?;
        let report = pipeline
            .run()
            .with_context(|| format!("churn analysis over {}", args.data_dir.display()))?;
        report::print_report(&report);
        return Ok(());
    }

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime
        .block_on(server::serve(config, args.bind))
        .with_context(|| format!("serving on {}", args.bind))
}

/// Log filter comes from `CHURNWATCH_LOG`, falling back to info (debug with `--verbose`)
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("CHURNWATCH_LOG").unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
