//! Utilities for benchmarks.

use dual_tree::PointSet;
use ftlog::{
    appender::{FileAppender, Period},
    LevelFilter, LoggerGuard,
};
use rand::prelude::*;

/// Configures the logger to write to `logs/<file_name>.log`.
///
/// # Errors
///
/// - If a logs directory could not be located/created.
/// - If the logger could not be initialized.
pub fn configure_logger(file_name: &str) -> Result<(LoggerGuard, std::path::PathBuf), String> {
    let root_dir = std::path::PathBuf::from(".")
        .canonicalize()
        .map_err(|e| e.to_string())?;
    let logs_dir = root_dir.join("logs");
    if !logs_dir.exists() {
        std::fs::create_dir(&logs_dir).map_err(|e| e.to_string())?;
    }
    let log_path = logs_dir.join(format!("{file_name}.log"));

    let writer = FileAppender::builder().path(&log_path).rotate(Period::Day).build();

    let err_path = log_path.with_extension("err.log");

    let guard = ftlog::Builder::new()
        .max_log_level(LevelFilter::Debug)
        .root(writer)
        .filter("ftlog::appender", "ftlog-appender", LevelFilter::Debug)
        .appender("ftlog-appender", FileAppender::new(err_path))
        .try_init()
        .map_err(|e| e.to_string())?;

    Ok((guard, log_path))
}

/// `car` points uniformly distributed in `[-1, 1)^dim`.
pub fn random_points(car: usize, dim: usize, seed: u64) -> PointSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let coords = (0..car * dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
    PointSet::new(dim, coords).unwrap_or_else(|e| unreachable!("{e}"))
}
