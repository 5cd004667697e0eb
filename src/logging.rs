use color_eyre::Result;
use eyre::Context as _;
use std::{
    fs::File,
    path::Path,
    sync::Mutex,
};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

lazy_static::lazy_static! {
    static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

/// Logs to stderr and to `<data_dir>/cluster-report.log`.
///
/// `RUST_LOG` overrides the stderr level, which is `info` by default and `debug` with
/// `--verbose`. The log file always records debug output without colors.
pub fn init_logging(verbose: bool, data_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(data_dir).wrap_err_with(|| format!("Failed to create {:?}", data_dir))?;
    let log_path = data_dir.join(LOG_FILE.as_str());
    let log_file = File::create(&log_path).wrap_err_with(|| format!("Failed to create {:?}", log_path))?;

    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let stderr_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(stderr_filter),
        )
        .with(
            fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .with_filter(LevelFilter::DEBUG),
        )
        .with(tracing_error::ErrorLayer::default())
        .try_init()
        .wrap_err("Failed to initialize tracing subscriber")?;

    debug!(?log_path, "logging initialized");
    Ok(())
}
