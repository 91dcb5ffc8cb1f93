//! TOML-based configuration for the agent.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Glint\config.toml`
//! - Linux:    `~/.config/glint/config.toml`
//! - macOS:    `~/Library/Application Support/Glint/config.toml`
//!
//! # Example file
//!
//! ```toml
//! [agent]
//! log_level = "debug"
//! system_prompt_path = "C:\\Users\\me\\glint\\system.txt"
//! replay_trigger_vk = 0xC0
//! typing_wpm = 150.0
//!
//! [inference]
//! model = "gemini-flash-latest"
//! api_keys = ["key-one", "key-two"]
//! ```
//!
//! Every field has a serde default, so a missing file, a missing section or
//! a missing key all fall back to the values in this module.
//!
//! # Credentials
//!
//! `GEMINI_API_KEY` (comma-separated) takes precedence over
//! `inference.api_keys`, so keys can be kept out of the file entirely.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::rotate_credentials::Credential;
use crate::infrastructure::inference::gemini::GeminiConfig;

/// Environment variable holding comma-separated API keys.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Accepted range for `agent.typing_wpm`.
pub const TYPING_WPM_RANGE: std::ops::RangeInclusive<f64> = 1.0..=10_000.0;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed but is outside its accepted range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// Neither the environment nor the file supplied an API key.
    #[error("no API keys configured: set {API_KEY_ENV} or inference.api_keys")]
    MissingCredentials,

    /// The system prompt file could not be read.
    #[error("failed to read system prompt from {path}: {source}")]
    SystemPrompt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
}

/// Local behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// File whose contents open every model request.  Relative paths are
    /// resolved against the working directory.
    #[serde(default = "default_system_prompt_path")]
    pub system_prompt_path: PathBuf,
    /// Virtual-key code of the replay key (default `VK_OEM_3`, backtick).
    #[serde(default = "default_replay_trigger_vk")]
    pub replay_trigger_vk: u32,
    /// Centre of the typing speed distribution.
    #[serde(default = "default_typing_wpm")]
    pub typing_wpm: f64,
}

/// Model endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Tried in order; ignored when `GEMINI_API_KEY` is set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_keys: Vec<String>,
}

impl AppConfig {
    /// Checks values serde accepts but the agent cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let wpm = self.agent.typing_wpm;
        if !TYPING_WPM_RANGE.contains(&wpm) {
            return Err(ConfigError::Invalid {
                field: "agent.typing_wpm",
                reason: format!(
                    "{wpm} is outside {}..={}",
                    TYPING_WPM_RANGE.start(),
                    TYPING_WPM_RANGE.end()
                ),
            });
        }
        Ok(())
    }
}

impl InferenceConfig {
    pub fn gemini(&self) -> GeminiConfig {
        GeminiConfig {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
        }
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_system_prompt_path() -> PathBuf {
    PathBuf::from("system.txt")
}
fn default_replay_trigger_vk() -> u32 {
    glint_core::keymap::windows_vk::VK_OEM_3
}
fn default_typing_wpm() -> f64 {
    glint_core::typing::BASE_WPM
}
fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}
fn default_model() -> String {
    "gemini-flash-latest".to_string()
}
fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            system_prompt_path: default_system_prompt_path(),
            replay_trigger_vk: default_replay_trigger_vk(),
            typing_wpm: default_typing_wpm(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            request_timeout_secs: default_request_timeout_secs(),
            api_keys: Vec::new(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file, returning
/// `AppConfig::default()` if the file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from an explicit path.
///
/// # Errors
///
/// As [`load_config`], plus [`ConfigError::Invalid`] for out-of-range
/// values.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let config: AppConfig = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to the platform config file.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_file_path()?)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the API keys: `GEMINI_API_KEY` if set and non-empty, otherwise
/// `inference.api_keys`.
///
/// # Errors
///
/// Returns [`ConfigError::MissingCredentials`] when neither source yields a
/// key.
pub fn resolve_credentials(config: &AppConfig) -> Result<Vec<Credential>, ConfigError> {
    let from_env = std::env::var(API_KEY_ENV).ok();
    credentials_from(from_env.as_deref(), &config.inference.api_keys)
}

fn credentials_from(env: Option<&str>, file: &[String]) -> Result<Vec<Credential>, ConfigError> {
    let env_keys = env.map(split_keys).unwrap_or_default();
    let keys = if env_keys.is_empty() {
        file.iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        env_keys
    };
    if keys.is_empty() {
        return Err(ConfigError::MissingCredentials);
    }
    Ok(keys.into_iter().map(Credential::new).collect())
}

fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads the system prompt file named in the config.
pub fn load_system_prompt(config: &AppConfig) -> Result<String, ConfigError> {
    let path = &config.agent.system_prompt_path;
    std::fs::read_to_string(path).map_err(|source| ConfigError::SystemPrompt {
        path: path.clone(),
        source,
    })
}

/// Resolves the platform config base directory including the `Glint` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Glint"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("glint"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Glint")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("glint_test_{}", Uuid::new_v4()))
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_app_config_default_values() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.agent.log_level, "info");
        assert_eq!(cfg.agent.system_prompt_path, PathBuf::from("system.txt"));
        assert_eq!(cfg.agent.replay_trigger_vk, 0xC0);
        assert_eq!(cfg.agent.typing_wpm, 170.0);
        assert_eq!(cfg.inference.model, "gemini-flash-latest");
        assert_eq!(cfg.inference.request_timeout_secs, 60);
        assert!(cfg.inference.api_keys.is_empty());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_partial_section_overrides_only_given_fields() {
        // Arrange
        let toml_str = r#"
[agent]
typing_wpm = 90.0
[inference]
api_keys = ["one"]
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.agent.typing_wpm, 90.0);
        assert_eq!(cfg.agent.log_level, "info");
        assert_eq!(cfg.inference.api_keys, vec!["one".to_string()]);
        assert_eq!(cfg.inference.request_timeout_secs, 60);
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_non_finite_typing_wpm_is_rejected() {
        for value in ["inf", "-inf", "nan"] {
            // Arrange
            let dir = temp_dir();
            std::fs::create_dir_all(&dir).unwrap();
            let path = dir.join("config.toml");
            std::fs::write(&path, format!("[agent]\ntyping_wpm = {value}\n")).unwrap();

            // Act
            let result = load_config_from(&path);

            // Assert
            assert!(
                matches!(
                    result,
                    Err(ConfigError::Invalid {
                        field: "agent.typing_wpm",
                        ..
                    })
                ),
                "typing_wpm = {value} was accepted"
            );
            std::fs::remove_dir_all(&dir).ok();
        }
    }

    #[test]
    fn test_non_positive_typing_wpm_is_rejected() {
        let mut cfg = AppConfig::default();

        cfg.agent.typing_wpm = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { .. })));
        cfg.agent.typing_wpm = -40.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    // ── Load / save ───────────────────────────────────────────────────────────

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        let path = temp_dir().join("config.toml");

        let cfg = load_config_from(&path).expect("absent file is not an error");

        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip_creates_directory() {
        // Arrange
        let dir = temp_dir();
        let path = dir.join("nested").join("config.toml");
        let mut cfg = AppConfig::default();
        cfg.agent.log_level = "debug".to_string();
        cfg.inference.api_keys = vec!["k1".to_string(), "k2".to_string()];

        // Act
        save_config_to(&cfg, &path).expect("save");
        let loaded = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_api_keys_are_omitted_from_toml() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).unwrap();
        assert!(!toml_str.contains("api_keys"));
    }

    // ── Credentials ───────────────────────────────────────────────────────────

    #[test]
    fn test_env_keys_are_split_and_trimmed() {
        let keys = credentials_from(Some(" a , ,b,c "), &[]).unwrap();

        let exposed: Vec<&str> = keys.iter().map(Credential::expose).collect();
        assert_eq!(exposed, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_env_keys_override_file_keys() {
        let keys = credentials_from(Some("env"), &["file".to_string()]).unwrap();

        assert_eq!(keys, vec![Credential::new("env")]);
    }

    #[test]
    fn test_blank_env_falls_back_to_file_keys() {
        let keys = credentials_from(Some(" , "), &["file".to_string()]).unwrap();

        assert_eq!(keys, vec![Credential::new("file")]);
    }

    #[test]
    fn test_no_keys_anywhere_is_an_error() {
        let result = credentials_from(None, &["  ".to_string()]);

        assert!(matches!(result, Err(ConfigError::MissingCredentials)));
    }

    // ── System prompt ─────────────────────────────────────────────────────────

    #[test]
    fn test_load_system_prompt_reads_file() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("system.txt");
        std::fs::write(&path, "You answer survey questions.").unwrap();
        let mut cfg = AppConfig::default();
        cfg.agent.system_prompt_path = path;

        let prompt = load_system_prompt(&cfg).unwrap();

        assert_eq!(prompt, "You answer survey questions.");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_system_prompt_is_an_error() {
        let mut cfg = AppConfig::default();
        cfg.agent.system_prompt_path = temp_dir().join("missing.txt");

        assert!(matches!(
            load_system_prompt(&cfg),
            Err(ConfigError::SystemPrompt { .. })
        ));
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(path.ends_with("config.toml"), "got {path:?}");
        }
    }

    #[test]
    fn test_gemini_config_clamps_zero_timeout() {
        let mut cfg = InferenceConfig::default();
        cfg.request_timeout_secs = 0;

        assert_eq!(cfg.gemini().request_timeout, Duration::from_secs(1));
    }
}
