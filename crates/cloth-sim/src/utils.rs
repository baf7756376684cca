//! Logging setup.

use std::path::{Path, PathBuf};

use ftlog::{
    appender::{FileAppender, Period},
    LevelFilter, LoggerGuard,
};

/// Configures the logger.
///
/// Logs go to `<logs_dir>/<file_name>`, rotated daily; warnings from the
/// appender itself go to a sibling `.err.log`. The returned guard must be
/// kept alive for the run or buffered records are lost.
///
/// # Errors
///
/// - If the logs directory could not be created.
/// - If the logger could not be initialized.
pub fn configure_logger<P: AsRef<Path>>(
    file_name: &str,
    logs_dir: &P,
    verbose: bool,
) -> Result<(LoggerGuard, PathBuf), String> {
    let logs_dir = logs_dir.as_ref();
    if !logs_dir.exists() {
        std::fs::create_dir_all(logs_dir).map_err(|e| e.to_string())?;
    }
    let log_path = logs_dir.join(file_name);
    let writer = FileAppender::builder().path(&log_path).rotate(Period::Day).build();
    let err_path = log_path.with_extension("err.log");

    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let guard = ftlog::Builder::new()
        // global max log level
        .max_log_level(level)
        .root(writer)
        .filter("ftlog::appender", "ftlog-appender", LevelFilter::Warn)
        .appender("ftlog-appender", FileAppender::new(err_path))
        .try_init()
        .map_err(|e| e.to_string())?;

    Ok((guard, log_path))
}
