//! File logging for embedding applications
//!
//! The core only emits `tracing` events. A front-end that wants them on disk
//! calls [`init`] once at start-up and keeps the guard alive.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing_appender::non_blocking::WorkerGuard;

use crate::constants::LOG_FILE;

/// Install a global subscriber writing to `<dir>/freeman.log`.
///
/// Dropping the returned guard flushes and stops the writer thread.
pub fn init(dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating log dir {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::never(dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("installing tracing subscriber: {}", e))?;

    Ok(guard)
}
