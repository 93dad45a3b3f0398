// clutchcast entry point.
//
// 1. Initialize tracing to logs/clutchcast.log (stdout carries results)
// 2. Load config, copying defaults on first run
// 3. Run the requested command

use clutchcast_app::cli::{self, Cli};
use clutchcast_app::config;
use clutchcast_app::pipeline::Pipeline;

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable holding a tracing filter directive.
const LOG_FILTER_ENV: &str = "CLUTCHCAST_LOG";
const DEFAULT_LOG_FILTER: &str = "clutchcast=info,warn";

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let cwd = std::env::current_dir().context("failed to resolve the working directory")?;
    let log_path = init_tracing(&cwd.join("logs"))?;
    info!("clutchcast starting: {:?} (log {})", args.command, log_path.display());

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: raw={}, processed={}, clutch margin {}",
        config.data.raw_dir.display(),
        config.data.processed_dir.display(),
        config.classifier.clutch_margin
    );

    let mut pipeline = Pipeline::new(config);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    cli::run(args.command, &mut pipeline, &mut out)?;

    info!("clutchcast finished");
    Ok(())
}

/// Send tracing output to `<log_dir>/clutchcast.log`, truncated per run, and
/// return that path. `CLUTCHCAST_LOG` overrides the filter.
fn init_tracing(log_dir: &Path) -> anyhow::Result<PathBuf> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join("clutchcast.log");
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("tracing was already initialized")?;

    Ok(log_path)
}
