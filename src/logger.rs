use crate::config::LoggingConfig;
use crate::constants::LOG_BUFFER_CAPACITY;
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Shared logger that can be used across the console.
///
/// Entries are always kept in memory for an embedded log view, oldest dropped
/// first once the buffer is full. When logging is enabled in the configuration,
/// the `log` facade is also routed to a file.
#[derive(Clone)]
pub struct Logger {
    logs: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
    enabled: bool,
}

impl Logger {
    pub fn new() -> Self {
        Self::with_capacity(LOG_BUFFER_CAPACITY)
    }

    /// Logger keeping at most `capacity` entries in memory
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            logs: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
            enabled: false,
        }
    }

    /// Create a logger, installing the file dispatcher when logging is enabled
    pub fn from_config(config: &LoggingConfig) -> Result<Self> {
        if config.enabled {
            let path = Self::get_log_file_path()?;
            install_file_dispatcher(&path, config.level_filter()?)?;
        }

        Ok(Self {
            enabled: config.enabled,
            ..Self::new()
        })
    }

    /// Whether log lines also go to the log file
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Add a log entry
    pub fn log(&self, message: String) {
        log::debug!("{}", message);

        let timestamp = Utc::now().format("%H:%M:%S%.3f").to_string();
        let formatted_message = format!("[{}] {}", timestamp, message);

        if let Ok(mut logs) = self.logs.lock() {
            if logs.len() >= self.capacity {
                logs.pop_front();
            }
            logs.push_back(formatted_message);
        }
    }

    /// Get all logs sorted by date (newest first)
    pub fn get_logs(&self) -> Vec<String> {
        if let Ok(logs) = self.logs.lock() {
            logs.iter().rev().cloned().collect()
        } else {
            Vec::new()
        }
    }

    /// Clear all logs
    pub fn clear(&self) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.clear();
        }
    }

    /// Location of the log file
    pub fn get_log_file_path() -> Result<PathBuf> {
        dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine cache directory"))
            .map(|dir| dir.join("typeconsole").join("typeconsole.log"))
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

fn install_file_dispatcher(path: &PathBuf, level: log::LevelFilter) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }

    let file = fern::log_file(path).with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let installed = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(file)
        .apply();

    // A global logger can only be installed once per process.
    if installed.is_err() {
        log::warn!("Logger already installed, keeping the existing dispatcher");
    }

    Ok(())
}
