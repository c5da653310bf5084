use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use log::SetLoggerError;

/// Install `env_logger` (filter from `RUST_LOG`, default `info`) behind a
/// bridge that keeps log lines from tearing progress bars drawn on the
/// returned `MultiProgress`.
pub fn init() -> Result<MultiProgress, SetLoggerError> {
    let env = env_logger::Env::default().filter_or("RUST_LOG", "info");
    let logger = env_logger::Builder::from_env(env).build();
    let level = logger.filter();

    let multi_progress = MultiProgress::new();
    LogWrapper::new(multi_progress.clone(), logger).try_init()?;
    log::set_max_level(level);

    Ok(multi_progress)
}
