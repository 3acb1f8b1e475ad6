// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tracing initialization driven by [`crate::cfg::config::Logging`].
//!
//! Logging is an external collaborator as far as the core's line budget
//! goes (spec.md §1 non-goals), but the core is still instrumented with
//! `tracing` throughout; this module is the thin, ambient glue that
//! turns `Logging` knobs into an installed subscriber.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cfg::config::Logging;

/// Installs a global tracing subscriber for the process.
///
/// Returns a [`WorkerGuard`] that must be kept alive for the duration of
/// the program when logging to a file; dropping it flushes and stops the
/// background writer thread.
pub fn init(cfg: &Logging) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(&cfg.log_level)
        .with_context(|| format!("invalid log_level {:?}", cfg.log_level))?;

    match &cfg.log_file {
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
            Ok(None)
        },
        Some(path) => {
            let path = std::path::Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let file_name = path.file_name().context("log_file has no file name")?;
            let appender = if let Some(dir) = dir {
                tracing_appender::rolling::never(dir, file_name)
            } else {
                tracing_appender::rolling::never(".", file_name)
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Ok(Some(guard))
        },
    }
}
