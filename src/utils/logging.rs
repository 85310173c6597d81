use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::fmt::{format::FmtSpan, writer::MakeWriterExt};

const LOG_FILE_PREFIX: &str = "tmt";

/// Keeps about a working week of history.
const MAX_LOG_FILES: usize = 7;

/// Filter for this crate's events. `--log` wins over `RUST_LOG`, and a plain run logs at `info`.
fn filter_directive(verbose: bool, rust_log: Option<String>) -> String {
    let level = if verbose {
        LevelFilter::TRACE.to_string()
    } else {
        rust_log.unwrap_or_else(|| LevelFilter::INFO.to_string())
    };
    format!("{}={level}", env!("CARGO_PKG_NAME").replace("-", "_"))
}

/// Sets up logging into daily rotated files under `<app_dir>/logs`. With `verbose` everything is
/// also mirrored to stderr, which keeps stdout clean for reports piped as JSON.
pub fn enable_logging(app_dir: &Path, verbose: bool) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(app_dir.join("logs"))?;

    let stderr = std::io::stderr.with_filter(move |_| verbose);

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter_directive(
            verbose,
            std::env::var("RUST_LOG").ok(),
        )))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stderr.and(appender))
        .pretty()
        .init();
    Ok(())
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .init()
});
