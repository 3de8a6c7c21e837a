//! Tracing setup
//!
//! The TUI owns the terminal, so in that mode logs go to a file.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directives are read from this variable
pub const LOG_ENV: &str = "RAFIKI_LOG";

pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// `<cache_dir>/rafiki/rafiki.log`, or the temp dir if there is no cache dir
pub fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("rafiki")
        .join("rafiki.log")
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("rafiki=info"))
}

pub fn init(target: LogTarget) -> Result<()> {
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
                .with(filter())
                .try_init()?;
        }
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .with(filter())
                .try_init()?;
        }
    }
    Ok(())
}
