//! Configuration loading, validation, and management for Reverie.
//!
//! Loads configuration from `~/.reverie/config.toml` with environment
//! variable overrides. Validates all settings at startup.
//!
//! Every threshold the engine uses lives here as a named value. The defaults
//! were chosen empirically; override them rather than editing the engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.reverie/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generation backend settings
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Focus selection thresholds
    #[serde(default)]
    pub focus: FocusConfig,

    /// Mood update and decay parameters
    #[serde(default)]
    pub mood: MoodConfig,

    /// Memory bounds and persistence
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Self-reflection scheduling
    #[serde(default)]
    pub reflection: ReflectionConfig,

    /// Repetition detection
    #[serde(default)]
    pub repetition: RepetitionConfig,

    /// Self-model extraction
    #[serde(default)]
    pub self_model: SelfModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Base URL of an Ollama-compatible server
    #[serde(default = "default_generator_url")]
    pub url: String,

    /// Model used for per-cycle responses and reflection
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used when a frame is attached (falls back to `model`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision_model: Option<String>,

    /// Per-call timeout; an expired call means "no response this cycle"
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_generator_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "smollm2:1.7b".into()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_temperature() -> f32 {
    0.8
}
fn default_max_tokens() -> u32 {
    120
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            url: default_generator_url(),
            model: default_model(),
            vision_model: None,
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Thresholds for the five-mode focus state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Novelty above which VISUAL captures attention
    pub novelty_threshold: f64,
    /// Mood volatility above which EMOTIONAL takes over
    pub volatility_threshold: f64,
    /// Novelty needed to re-confirm VISUAL during the settle period
    pub continued_novelty_threshold: f64,
    /// Familiarity above which MEMORY wins over EMOTIONAL
    pub familiarity_threshold: f64,
    /// Static seconds before attention starts to wander
    pub settle_secs: f64,
    /// Static seconds before boredom leads to introspection
    pub boredom_secs: f64,
    /// Static seconds before temporal contemplation
    pub introspection_secs: f64,
    /// Seconds in one mode that count as full attention fatigue
    pub fatigue_secs: f64,
    /// Capacity of the focus history ring buffer
    pub history_capacity: usize,
    /// Trailing window inspected by forced rotation
    pub rotation_window: usize,
    /// VISUAL selections within the window that force a rotation
    pub rotation_limit: usize,
    /// Trailing selections a rotated-to mode must be absent from
    pub rotation_recent: usize,
    /// Mood samples used for the volatility estimate
    pub mood_samples: usize,
    /// Keyword occurrences that count as fully familiar
    pub familiarity_saturation: f64,
    /// Distinct familiarity keywords tracked before one-offs are dropped
    pub max_keywords: usize,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            novelty_threshold: 0.6,
            volatility_threshold: 0.6,
            continued_novelty_threshold: 0.15,
            familiarity_threshold: 0.6,
            settle_secs: 30.0,
            boredom_secs: 45.0,
            introspection_secs: 120.0,
            fatigue_secs: 180.0,
            history_capacity: 20,
            rotation_window: 6,
            rotation_limit: 4,
            rotation_recent: 4,
            mood_samples: 6,
            familiarity_saturation: 5.0,
            max_keywords: 200,
        }
    }
}

/// Lexicon steps and per-update decay toward the neutral baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodConfig {
    pub valence_step: f64,
    /// Arousal gain on net positive text
    pub arousal_step: f64,
    /// Arousal gain on net negative text
    pub distress_arousal_step: f64,
    pub clarity_gain: f64,
    pub clarity_loss: f64,
    /// Minimum length for text to count as coherent
    pub coherent_min_chars: usize,
    pub valence_decay: f64,
    pub arousal_decay: f64,
    pub clarity_decay: f64,
    /// Neutral clarity the vector drifts toward
    pub clarity_baseline: f64,
    /// Weight of an external reflection rating on valence
    pub reflection_blend: f64,
    /// Arousal/clarity change per net reflection keyword
    pub reflection_nudge: f64,
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            valence_step: 0.05,
            arousal_step: 0.02,
            distress_arousal_step: 0.03,
            clarity_gain: 0.02,
            clarity_loss: 0.01,
            coherent_min_chars: 20,
            valence_decay: 0.98,
            arousal_decay: 0.95,
            clarity_decay: 0.99,
            clarity_baseline: 0.5,
            reflection_blend: 0.25,
            reflection_nudge: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Observations retained before the oldest is evicted
    pub observation_capacity: usize,
    /// Upper bound on tracked beliefs
    pub max_beliefs: usize,
    /// Strength at which a belief counts as strong
    pub belief_threshold: f64,
    /// Observations written to the state file
    pub persisted_observations: usize,
    /// Motif counts written to the state file
    pub persisted_motifs: usize,
    /// Distinct motifs counted in memory before one-offs are dropped
    pub max_motifs: usize,
    /// State file location; defaults to `~/.reverie/state.json`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            observation_capacity: 100,
            max_beliefs: 50,
            belief_threshold: 0.7,
            persisted_observations: 20,
            persisted_motifs: 50,
            max_motifs: 500,
            state_file: None,
        }
    }
}

impl MemoryConfig {
    /// The configured state file, or the default under the config dir.
    pub fn state_path(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("state.json"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_reflection_interval")]
    pub interval_secs: u64,

    /// Responses quoted in the reflection request
    #[serde(default = "default_reflection_context")]
    pub context_responses: usize,

    /// Confidence attached to the stored reflection text
    #[serde(default = "default_reflection_weight")]
    pub observation_weight: f64,
}

fn default_true() -> bool {
    true
}
fn default_reflection_interval() -> u64 {
    420
}
fn default_reflection_context() -> usize {
    3
}
fn default_reflection_weight() -> f64 {
    0.3
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_reflection_interval(),
            context_responses: default_reflection_context(),
            observation_weight: default_reflection_weight(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepetitionConfig {
    /// Prior responses compared against
    pub prior_window: usize,
    /// Leading characters whose word sets are compared
    pub prefix_chars: usize,
    /// Leading characters that must match exactly to count double
    pub identical_prefix_chars: usize,
    /// Word overlap above which two openings count as similar
    pub overlap_threshold: f64,
}

impl Default for RepetitionConfig {
    fn default() -> Self {
        Self {
            prior_window: 4,
            prefix_chars: 80,
            identical_prefix_chars: 30,
            overlap_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfModelConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Committed cycles between extractions
    #[serde(default = "default_self_model_every")]
    pub every_cycles: u64,

    /// Observations the extraction needs before it runs
    #[serde(default = "default_self_model_min")]
    pub min_observations: usize,
}

fn default_self_model_every() -> u64 {
    10
}
fn default_self_model_min() -> usize {
    5
}

impl Default for SelfModelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            every_cycles: default_self_model_every(),
            min_observations: default_self_model_min(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.reverie/config.toml).
    ///
    /// Environment overrides:
    /// - `REVERIE_GENERATOR_URL`
    /// - `REVERIE_MODEL`
    /// - `REVERIE_STATE_FILE`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(url) = std::env::var("REVERIE_GENERATOR_URL") {
            config.generator.url = url;
        }

        if let Ok(model) = std::env::var("REVERIE_MODEL") {
            config.generator.model = model;
        }

        if let Ok(path) = std::env::var("REVERIE_STATE_FILE") {
            config.memory.state_file = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".reverie")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.focus;
        if !(f.settle_secs < f.boredom_secs && f.boredom_secs < f.introspection_secs) {
            return Err(ConfigError::ValidationError(
                "focus thresholds must satisfy settle_secs < boredom_secs < introspection_secs"
                    .into(),
            ));
        }

        if f.rotation_limit == 0 || f.rotation_limit > f.rotation_window {
            return Err(ConfigError::ValidationError(
                "focus.rotation_limit must be between 1 and rotation_window".into(),
            ));
        }

        if f.history_capacity < f.rotation_window {
            return Err(ConfigError::ValidationError(
                "focus.history_capacity must hold at least rotation_window selections".into(),
            ));
        }

        let m = &self.mood;
        for (name, factor) in [
            ("valence_decay", m.valence_decay),
            ("arousal_decay", m.arousal_decay),
            ("clarity_decay", m.clarity_decay),
        ] {
            if !(factor > 0.0 && factor <= 1.0) {
                return Err(ConfigError::ValidationError(format!(
                    "mood.{name} must be in (0, 1]"
                )));
            }
        }

        if self.reflection.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "reflection.interval_secs must be > 0".into(),
            ));
        }

        if self.memory.observation_capacity == 0 || self.memory.max_beliefs == 0 {
            return Err(ConfigError::ValidationError(
                "memory capacities must be > 0".into(),
            ));
        }

        if self.memory.max_motifs < self.memory.persisted_motifs.max(1) {
            return Err(ConfigError::ValidationError(
                "memory.max_motifs must be at least persisted_motifs and > 0".into(),
            ));
        }

        if f.max_keywords == 0 {
            return Err(ConfigError::ValidationError(
                "focus.max_keywords must be > 0".into(),
            ));
        }

        if self.generator.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "generator.timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reflection.interval_secs, 420);
        assert_eq!(config.focus.boredom_secs, 45.0);
        assert_eq!(config.focus.introspection_secs, 120.0);
        assert_eq!(config.memory.observation_capacity, 100);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.generator.model, config.generator.model);
        assert_eq!(parsed.focus.rotation_limit, config.focus.rotation_limit);
        assert_eq!(parsed.mood.arousal_decay, config.mood.arousal_decay);
    }

    #[test]
    fn inverted_temporal_thresholds_rejected() {
        let mut config = AppConfig::default();
        config.focus.boredom_secs = 200.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rotation_limit_larger_than_window_rejected() {
        let mut config = AppConfig::default();
        config.focus.rotation_limit = 7;
        assert!(config.validate().is_err());
    }

    #[test]
    fn decay_out_of_range_rejected() {
        let mut config = AppConfig::default();
        config.mood.arousal_decay = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("arousal_decay"));
    }

    #[test]
    fn motif_cap_below_persisted_count_rejected() {
        let mut config = AppConfig::default();
        config.memory.max_motifs = 10;
        assert!(config.validate().is_err());

        config.memory.max_motifs = 500;
        config.focus.max_keywords = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.generator.url, "http://localhost:11434");
    }

    #[test]
    fn partial_sections_fill_from_defaults() {
        let toml_str = r#"
[focus]
boredom_secs = 60.0

[reflection]
interval_secs = 90
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.focus.boredom_secs, 60.0);
        assert_eq!(config.focus.introspection_secs, 120.0);
        assert_eq!(config.reflection.interval_secs, 90);
        assert!(config.reflection.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_from_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[reflection]\ninterval_secs = 0\n").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[focus\nnot toml").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("[focus]"));
        assert!(toml_str.contains("interval_secs = 420"));
    }

    #[test]
    fn explicit_state_file_wins() {
        let mut config = AppConfig::default();
        config.memory.state_file = Some(PathBuf::from("/var/lib/reverie/state.json"));
        assert_eq!(
            config.memory.state_path(),
            PathBuf::from("/var/lib/reverie/state.json")
        );
    }
}
