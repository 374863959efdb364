//! Configuration loading.
//!
//! Loads `config.toml` (or `$TARPIT_CONFIG_PATH`). A missing file yields
//! defaults. Environment variables override file values; file values override
//! defaults. Secrets are not configured here, see [`crate::credentials`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Generative backend.
    pub models: ModelsConfig,
    /// Prompt history.
    pub conversation: ConversationConfig,
    /// Filesystem locations.
    pub storage: StorageConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_owned(),
        }
    }
}

/// Generative backend settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Model spec, `<provider>/<model>` (e.g. "groq/llama-3.1-8b-instant").
    pub default: String,
    /// Sampling temperature, clamped to `[0, 1]`.
    pub temperature: f32,
    /// Maximum reply tokens.
    pub max_tokens: u32,
    /// Deadline for one backend call, in seconds.
    pub timeout_secs: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default: "groq/llama-3.1-8b-instant".to_owned(),
            temperature: 0.7,
            max_tokens: 200,
            timeout_secs: 20,
        }
    }
}

impl ModelsConfig {
    /// Backend call deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Temperature clamped into the supported range.
    pub fn clamped_temperature(&self) -> f32 {
        if self.temperature.is_nan() {
            return ModelsConfig::default().temperature;
        }
        self.temperature.clamp(0.0, 1.0)
    }
}

/// Prompt history settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Most recent turns included in the prompt. `0` means no limit.
    pub history_turns: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self { history_turns: 20 }
    }
}

impl ConversationConfig {
    /// History limit passed to the store.
    pub fn history_limit(&self) -> Option<usize> {
        (self.history_turns > 0).then_some(self.history_turns)
    }
}

/// Filesystem locations. Unset paths resolve under `data_dir`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root for state files; defaults to `~/.tarpit`.
    pub data_dir: Option<PathBuf>,
    /// SQLite database of turns.
    pub database: Option<PathBuf>,
    /// Evidence CSV.
    pub evidence_csv: Option<PathBuf>,
    /// JSON log directory.
    pub logs_dir: Option<PathBuf>,
    /// Optional `.env` file with secrets.
    pub env_file: Option<PathBuf>,
}

/// Fully resolved filesystem paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    /// State root.
    pub data_dir: PathBuf,
    /// SQLite database of turns.
    pub database: PathBuf,
    /// Evidence CSV.
    pub evidence_csv: PathBuf,
    /// JSON log directory.
    pub logs_dir: PathBuf,
    /// `.env` secrets file.
    pub env_file: PathBuf,
}

impl StorageConfig {
    /// Resolve every path, defaulting relative to `data_dir` (or `default_root`).
    pub fn resolve(&self, default_root: &Path) -> RuntimePaths {
        let root = self
            .data_dir
            .clone()
            .unwrap_or_else(|| default_root.to_path_buf());
        RuntimePaths {
            database: self
                .database
                .clone()
                .unwrap_or_else(|| root.join("honeypot.db")),
            evidence_csv: self
                .evidence_csv
                .clone()
                .unwrap_or_else(|| root.join("evidence").join("scam_evidence.csv")),
            logs_dir: self.logs_dir.clone().unwrap_or_else(|| root.join("logs")),
            env_file: self.env_file.clone().unwrap_or_else(|| root.join(".env")),
            data_dir: root,
        }
    }
}

impl Config {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// [`Config::load`] with a custom env resolver (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let path = env("TARPIT_CONFIG_PATH").map_or_else(|| PathBuf::from("config.toml"), PathBuf::from);
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(env);
        Ok(config)
    }

    /// Load from a TOML file only, no env overrides. Missing file → defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                toml::from_str(&contents)
                    .with_context(|| format!("failed to parse config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config at {}: {e}",
                path.display()
            )),
        }
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability (avoids `set_var` in tests).
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(port) = env("PORT") {
            self.server.bind = format!("0.0.0.0:{port}");
        }
        if let Some(v) = env("TARPIT_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = env("TARPIT_MODEL") {
            self.models.default = v;
        }
        if let Some(v) = env("TARPIT_MODEL_TIMEOUT_SECS") {
            match v.parse() {
                Ok(n) => self.models.timeout_secs = n,
                Err(_) => tracing::warn!(
                    var = "TARPIT_MODEL_TIMEOUT_SECS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("TARPIT_HISTORY_TURNS") {
            match v.parse() {
                Ok(n) => self.conversation.history_turns = n,
                Err(_) => tracing::warn!(
                    var = "TARPIT_HISTORY_TURNS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("TARPIT_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = env("TARPIT_DATABASE") {
            self.storage.database = Some(PathBuf::from(v));
        }
        if let Some(v) = env("TARPIT_EVIDENCE") {
            self.storage.evidence_csv = Some(PathBuf::from(v));
        }
    }

    /// Resolve storage paths, defaulting to `~/.tarpit`.
    ///
    /// # Errors
    ///
    /// Returns an error if no data dir is configured and the home directory
    /// cannot be determined.
    pub fn paths(&self) -> anyhow::Result<RuntimePaths> {
        let root = match &self.storage.data_dir {
            Some(dir) => dir.clone(),
            None => config_dir()?,
        };
        Ok(self.storage.resolve(&root))
    }
}

/// Resolve the default state directory (`~/.tarpit/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".tarpit"))
}
