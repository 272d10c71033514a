//! Tracing setup: stdout, plus a dated log file when a log directory is configured.
//!
//! `RUST_LOG` takes precedence over the configured level. Call after
//! `dotenvy::dotenv()` so a `.env` value is picked up.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing_subscriber::{
    fmt::writer::{BoxMakeWriter, MakeWriterExt},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::LogSettings;

pub fn init_tracing(settings: &LogSettings) -> anyhow::Result<Option<PathBuf>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let log_dir = settings
        .dir
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let (writer, log_file) = match log_dir {
        Some(dir) => {
            let path = dated_log_path(Path::new(dir));
            fs::create_dir_all(dir)?;
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            (
                BoxMakeWriter::new(io::stdout.and(Arc::new(file))),
                Some(path),
            )
        }
        None => (BoxMakeWriter::new(io::stdout), None),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false)
        .with_level(true);

    Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set global subscriber: {}", e))?;

    Ok(log_file)
}

fn dated_log_path(dir: &Path) -> PathBuf {
    dir.join(format!("bot_{}.log", chrono::Local::now().format("%Y%m%d")))
}
