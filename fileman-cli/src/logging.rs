// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{Config, LoggingLevel};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_PREFIX: &str = "fileman.log";
const LOG_DIR_ENV: &str = "FILEMAN_LOG_DIR";
const KEEP_DAYS: u64 = 7;
const CRATES: [&str; 4] = ["fileman", "fileman_exec", "fileman_sys", "fileman_types"];

fn default_filter(level: LoggingLevel) -> EnvFilter {
    let mut directives: Vec<String> = CRATES
        .iter()
        .map(|name| format!("{name}={}", level.as_directive()))
        .collect();
    directives.push("warn".to_string());
    EnvFilter::new(directives.join(","))
}

/// Logs go to stderr so command output on stdout stays machine-readable.
pub(crate) fn init(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(config.log_level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let log_dir = std::env::var_os(LOG_DIR_ENV)
        .map(PathBuf::from)
        .or_else(|| config.log_dir.clone());
    let to_disk = config.log_to_disk || log_dir.is_some();

    if !to_disk {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
        return;
    }

    let dir = log_dir.unwrap_or_else(default_log_dir);
    match file_writer(&dir) {
        Ok((writer, guard)) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .with_timer(tracing_subscriber::fmt::time::SystemTime)
                .with_filter(default_filter(config.log_level));

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .init();

            // The worker flushes until the process exits.
            let _ = LOG_GUARD.set(guard);
        }
        Err(e) => {
            eprintln!("fileman: failed to initialize file logging: {e:#}");
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .init();
        }
    }
}

fn file_writer(
    dir: &Path,
) -> anyhow::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if let Err(e) = fs::create_dir_all(dir) {
        return Err(anyhow::anyhow!(
            "create log directory failed: {} ({})",
            dir.display(),
            e
        ));
    }

    cleanup_old_logs(dir);

    let appender = tracing_appender::rolling::daily(dir, LOG_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}

fn default_log_dir() -> PathBuf {
    if let Some(xdg_state) = std::env::var_os("XDG_STATE_HOME") {
        return PathBuf::from(xdg_state).join("fileman").join("logs");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("state")
            .join("fileman")
            .join("logs");
    }

    PathBuf::from("/tmp").join("fileman").join("logs")
}

fn cleanup_old_logs(dir: &Path) {
    let cutoff = SystemTime::now().checked_sub(Duration::from_secs(KEEP_DAYS * 24 * 60 * 60));
    let Some(cutoff) = cutoff else { return };

    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        // Only files written by the rolling appender.
        if !file_type.is_file() || !entry.file_name().to_string_lossy().starts_with(LOG_PREFIX) {
            continue;
        }

        let Ok(modified) = entry.metadata().and_then(|metadata| metadata.modified()) else {
            continue;
        };
        if modified < cutoff {
            let _ = fs::remove_file(entry.path());
        }
    }
}
