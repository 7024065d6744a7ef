//! Configuration management for the console
//!
//! This module handles loading, parsing, and validation of configuration files,
//! plus the typed per-form configuration the components are constructed with.

use crate::constants::{CONFIG_GENERATED, DEFAULT_BASE_URL, DEFAULT_LOCALE, DEFAULT_LOOKUP_PAGE_SIZE};
use crate::components::editor::EditorMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub console: ConsoleConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
    pub strings: StringsConfig,
}

/// Server connection and page settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Base URL of the data-management server
    pub base_url: String,
    /// Locale used for number formatting (e.g. "en", "es", "de-CH")
    pub locale: String,
}

/// Live lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of suggestions requested per lookup
    pub page_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write log lines to the log file
    pub enabled: bool,
    /// Minimum level: "error", "warn", "info", "debug" or "trace"
    pub level: String,
}

/// Localized labels shared by every dialog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StringsConfig {
    pub accept: String,
    pub cancel: String,
    /// Prompt shown when leaving a page with unsaved edits
    pub unsaved_changes: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_LOOKUP_PAGE_SIZE,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".to_string(),
        }
    }
}

impl Default for StringsConfig {
    fn default() -> Self {
        Self {
            accept: "Accept".to_string(),
            cancel: "Cancel".to_string(),
            unsaved_changes: "There are unsaved changes. Leave this page?".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Parse the configured level into a log filter
    pub fn level_filter(&self) -> Result<log::LevelFilter> {
        self.level
            .parse::<log::LevelFilter>()
            .map_err(|_| anyhow::anyhow!("Invalid logging level '{}'", self.level))
    }
}

impl Config {
    /// Load configuration from file or return defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::find_config_file()?;

        if let Some(path) = config_path {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in order of precedence
    fn find_config_file() -> Result<Option<PathBuf>> {
        // 1. Check current directory
        let current_dir_config = PathBuf::from("typeconsole.toml");
        if current_dir_config.exists() {
            return Ok(Some(current_dir_config));
        }

        // 2. Check XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("typeconsole").join("config.toml");
            if xdg_config.exists() {
                return Ok(Some(xdg_config));
            }
        }

        Ok(None)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;

        if self.console.locale.trim().is_empty() {
            anyhow::bail!("locale cannot be empty");
        }

        if self.search.page_size == 0 {
            anyhow::bail!("search.page_size must be at least 1");
        }

        self.logging.level_filter()?;

        Ok(())
    }

    /// The server base URL, parsed
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.console.base_url)
            .with_context(|| format!("Invalid base_url '{}'", self.console.base_url))
    }

    /// Generate default configuration file
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Self::default();
        let toml_content = toml::to_string_pretty(&config).context("Failed to serialize default config")?;

        let header = format!(
            "# typeconsole Configuration File\n# Generated on {}\n\n",
            chrono::Local::now().format("%Y-%m-%d")
        );

        let full_content = header + &toml_content;

        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(&path, full_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        println!("{}: {}", CONFIG_GENERATED, path.as_ref().display());
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn get_xdg_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
            .map(|dir| dir.join("typeconsole"))
    }
}

/// Per-form settings that the server used to declare on the form markup.
///
/// A form is constructed with one of these instead of reading attributes at
/// event time, so every component sees the same typed values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    /// Submission endpoint
    pub target_url: Url,
    /// Listing address the form was rendered for, used for fragment refreshes
    pub data_url: Option<Url>,
    /// Fragment id of the listing this form belongs to
    pub component_id: Option<String>,
    /// Monitor submissions with an upload progress dialog
    #[serde(default)]
    pub large_payload: bool,
    /// Block navigation while the form has unsaved edits
    #[serde(default)]
    pub unload_guard: bool,
    #[serde(default)]
    pub confirmations: ConfirmationTexts,
    #[serde(default)]
    pub labels: FormLabels,
    /// Editor mode per textarea field name
    #[serde(default)]
    pub editors: HashMap<String, EditorMode>,
}

/// Confirmation prompt per destructive action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationTexts {
    pub delete: String,
    pub drop: String,
}

impl Default for ConfirmationTexts {
    fn default() -> Self {
        Self {
            delete: "Delete the selected objects?".to_string(),
            drop: "Drop the selected items?".to_string(),
        }
    }
}

/// Titles of the widgets created for new rows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormLabels {
    pub type_label: String,
    pub name: String,
    pub parameters: String,
    pub not_null: String,
    pub mode: String,
    pub fields: String,
    pub drop_field: String,
    pub drop_index: String,
}

impl Default for FormLabels {
    fn default() -> Self {
        Self {
            type_label: "Type".to_string(),
            name: "Name".to_string(),
            parameters: "Parameters".to_string(),
            not_null: "Not null".to_string(),
            mode: "Mode".to_string(),
            fields: "Fields".to_string(),
            drop_field: "Drop field".to_string(),
            drop_index: "Drop index".to_string(),
        }
    }
}

impl FormConfig {
    /// A form posting to `target_url` with every flag off and default labels
    pub fn new(target_url: Url) -> Self {
        Self {
            target_url,
            data_url: None,
            component_id: None,
            large_payload: false,
            unload_guard: false,
            confirmations: ConfirmationTexts::default(),
            labels: FormLabels::default(),
            editors: HashMap::new(),
        }
    }

    pub fn with_listing(mut self, data_url: Url, component_id: impl Into<String>) -> Self {
        self.data_url = Some(data_url);
        self.component_id = Some(component_id.into());
        self
    }

    pub fn with_large_payload(mut self, large_payload: bool) -> Self {
        self.large_payload = large_payload;
        self
    }

    pub fn with_unload_guard(mut self, unload_guard: bool) -> Self {
        self.unload_guard = unload_guard;
        self
    }

    pub fn with_editor(mut self, field: impl Into<String>, mode: EditorMode) -> Self {
        self.editors.insert(field.into(), mode);
        self
    }
}
