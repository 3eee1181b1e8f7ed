//! Utility functions and types

pub mod data_loader;

pub use data_loader::{describe, ColumnSummary, CsvOptions, DataLoader, DataSaver, DatasetSummary};

use std::time::{Duration, Instant};

/// Run `f` and return its result together with the elapsed wall time
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let out = f();
    (out, start.elapsed())
}
