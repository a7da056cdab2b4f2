// Local configuration for the suggestion engine.
//
// Global config: `~/.redline/config.toml`

use redline_common::crdt::origin::{AuthorType, MAX_AUTHOR_ID_LEN};
use redline_common::types::AuthorMeta;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::document::layout::GridLayout;
use crate::hover::HoverConfig;
use crate::suggest::anchor::{AnchorResolver, DEFAULT_MAX_MATCHES};
use crate::suggest::transaction::TransactionBuilder;
use crate::suggest::SuggestionApplier;

/// Root directory for redline global state: `~/.redline/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".redline"))
}

/// Path to the global config file: `~/.redline/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

// ── Engine config ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub ai: AiConfig,
    pub author: AuthorConfig,
    pub anchor: AnchorConfig,
    pub hover: HoverSettings,
    pub layout: LayoutConfig,
}

impl EngineConfig {
    /// Load from `~/.redline/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to `~/.redline/config.toml`.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = global_config_path().ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine home directory",
            ))
        })?;
        self.save_to(&path)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = url::Url::parse(&self.ai.endpoint)
            .map_err(|error| ConfigError::Invalid(format!("ai.endpoint: {error}")))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "ai.endpoint: unsupported scheme `{}`",
                endpoint.scheme()
            )));
        }
        if self.author.id.is_empty() || self.author.id.len() > MAX_AUTHOR_ID_LEN {
            return Err(ConfigError::Invalid(format!(
                "author.id must be 1..={MAX_AUTHOR_ID_LEN} bytes"
            )));
        }
        if self.anchor.max_matches == 0 {
            return Err(ConfigError::Invalid("anchor.max_matches must be positive".into()));
        }
        if self.layout.line_height <= 0.0 || self.layout.char_width <= 0.0 {
            return Err(ConfigError::Invalid("layout dimensions must be positive".into()));
        }
        Ok(())
    }

    pub fn applier(&self) -> SuggestionApplier {
        SuggestionApplier::new(
            AnchorResolver::new(self.anchor.max_matches),
            TransactionBuilder::new(self.author.meta()),
        )
    }
}

/// AI service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AiConfig {
    /// Streaming suggestion endpoint.
    pub endpoint: String,
    /// Model to request; the service default when unset.
    pub model: Option<String>,
    /// Environment variable holding the API key. Keys are never stored in
    /// config files.
    pub api_key_env: String,
    /// Tool names whose calls carry suggestions; empty accepts any.
    pub tool_names: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8787/v1/suggest".into(),
            model: None,
            api_key_env: "REDLINE_API_KEY".into(),
            tool_names: vec!["suggest_diff".into()],
            request_timeout_secs: 120,
        }
    }
}

impl AiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|key| !key.trim().is_empty())
    }
}

/// Identity stamped on suggestions and resolutions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthorConfig {
    pub id: String,
    pub author_type: AuthorType,
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self { id: "redline-agent".into(), author_type: AuthorType::Agent }
    }
}

impl AuthorConfig {
    pub fn meta(&self) -> AuthorMeta {
        AuthorMeta { author_id: self.id.clone(), author_type: self.author_type }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnchorConfig {
    /// Cap on anchor occurrences collected per search.
    pub max_matches: usize,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self { max_matches: DEFAULT_MAX_MATCHES }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HoverSettings {
    /// Debounced hide delay in milliseconds (clamped to 50–1000).
    pub hide_delay_ms: u64,
    pub popup_offset_y: f32,
    pub popup_width: f32,
    pub popup_height: f32,
}

impl Default for HoverSettings {
    fn default() -> Self {
        let defaults = HoverConfig::default();
        Self {
            hide_delay_ms: defaults.hide_delay.as_millis() as u64,
            popup_offset_y: defaults.popup_offset_y,
            popup_width: defaults.popup_width,
            popup_height: defaults.popup_height,
        }
    }
}

impl HoverSettings {
    pub fn to_config(&self) -> HoverConfig {
        HoverConfig {
            popup_offset_y: self.popup_offset_y,
            popup_width: self.popup_width,
            popup_height: self.popup_height,
            ..HoverConfig::with_hide_delay_millis(self.hide_delay_ms)
        }
    }
}

/// Grid geometry for headless hosts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    pub line_height: f32,
    pub char_width: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let grid = GridLayout::default();
        Self { line_height: grid.line_height, char_width: grid.char_width }
    }
}

impl LayoutConfig {
    pub fn grid(&self) -> GridLayout {
        GridLayout::new(self.line_height, self.char_width)
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Serialize(e) => write!(f, "config serialize error: {e}"),
            Self::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}
