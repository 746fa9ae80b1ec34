use std::path::{Path, PathBuf};
use std::time::Duration;

use cheddar_stream::filler::{DEFAULT_KEYWORDS, DEFAULT_MAX_CHARS};
use cheddar_stream::FillerPolicy;
use serde::Deserialize;
use thiserror::Error;

pub const REDUCE_MOTION_ENV: &str = "CHEDDAR_REDUCE_MOTION";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub logging: LoggingConfig,
    pub reveal: RevealConfig,
    pub filler: FillerConfig,
    pub session: SessionDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealConfig {
    pub stagger_ms: u64,
    pub reduced_motion: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillerConfig {
    pub max_chars: usize,
    pub keywords: Vec<String>,
}

/// Selections used when a session starts without explicit ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDefaults {
    pub profile: String,
    pub language: String,
    pub screenshot_interval: String,
    pub image_quality: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "console".to_string(),
            },
            reveal: RevealConfig {
                stagger_ms: 70,
                reduced_motion: false,
            },
            filler: FillerConfig {
                max_chars: DEFAULT_MAX_CHARS,
                keywords: DEFAULT_KEYWORDS.iter().map(|k| (*k).to_string()).collect(),
            },
            session: SessionDefaults {
                profile: "interview".to_string(),
                language: "en-US".to_string(),
                screenshot_interval: "5".to_string(),
                image_quality: "medium".to_string(),
            },
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied.
    pub fn default_from_env() -> Self {
        let mut cfg = Self::default();
        apply_env(&mut cfg, |key| std::env::var(key).ok());
        cfg
    }

    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.reveal.stagger_ms)
    }

    pub fn filler_policy(&self) -> FillerPolicy {
        FillerPolicy::new(self.filler.max_chars, &self.filler.keywords)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.logging.level.trim().to_lowercase();
        if !matches!(
            level.as_str(),
            "trace" | "debug" | "info" | "warn" | "warning" | "error"
        ) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of trace, debug, info, warn, error (got {:?})",
                self.logging.level
            )));
        }
        let format = self.logging.format.trim().to_lowercase();
        if format != "console" && format != "json" {
            return Err(ConfigError::Invalid(format!(
                "logging.format must be console or json (got {:?})",
                self.logging.format
            )));
        }
        if self.reveal.stagger_ms == 0 {
            return Err(ConfigError::Invalid(
                "reveal.stagger_ms must be > 0".to_string(),
            ));
        }
        if self.filler.max_chars == 0 {
            return Err(ConfigError::Invalid(
                "filler.max_chars must be > 0".to_string(),
            ));
        }
        if self.filler.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "filler.keywords must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    #[serde(default)]
    logging: PartialLoggingConfig,
    #[serde(default)]
    reveal: PartialRevealConfig,
    #[serde(default)]
    filler: PartialFillerConfig,
    #[serde(default)]
    session: PartialSessionDefaults,
}

#[derive(Debug, Default, Deserialize)]
struct PartialLoggingConfig {
    #[serde(default)]
    level: String,
    #[serde(default)]
    format: String,
}

#[derive(Debug, Default, Deserialize)]
struct PartialRevealConfig {
    stagger_ms: Option<u64>,
    reduced_motion: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialFillerConfig {
    max_chars: Option<usize>,
    keywords: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialSessionDefaults {
    #[serde(default)]
    profile: String,
    #[serde(default)]
    language: String,
    #[serde(default)]
    screenshot_interval: String,
    #[serde(default)]
    image_quality: String,
}

/// Load config: defaults < config file < environment.
///
/// An explicit `config_file` that cannot be read is an error; a missing
/// default file is not.
pub fn load_config(config_file: Option<&str>) -> Result<(Config, Option<PathBuf>), ConfigError> {
    let explicit = config_file
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);

    let (path_to_try, used) = match explicit {
        Some(path) => (Some(path), true),
        None => (default_config_path(), false),
    };

    let mut cfg = Config::default();
    let mut loaded = None;
    if let Some(path) = path_to_try {
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                apply_partial(&mut cfg, parse_partial(&text)?);
                loaded = Some(path);
            }
            Err(source) if used => return Err(ConfigError::Read { path, source }),
            Err(_) => {}
        }
    }
    apply_env(&mut cfg, |key| std::env::var(key).ok());
    Ok((cfg, loaded))
}

/// Parse YAML text over the defaults, without touching the filesystem or
/// the environment.
pub fn config_from_yaml(text: &str) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();
    apply_partial(&mut cfg, parse_partial(text)?);
    Ok(cfg)
}

fn parse_partial(text: &str) -> Result<PartialConfig, ConfigError> {
    if text.trim().is_empty() {
        return Ok(PartialConfig::default());
    }
    serde_yaml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
}

fn default_config_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.trim().is_empty() {
            return Some(PathBuf::from(xdg).join("cheddar").join("config.yaml"));
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        if !home.trim().is_empty() {
            return Some(
                Path::new(&home)
                    .join(".config")
                    .join("cheddar")
                    .join("config.yaml"),
            );
        }
    }
    None
}

fn apply_partial(cfg: &mut Config, partial: PartialConfig) {
    if !partial.logging.level.trim().is_empty() {
        cfg.logging.level = partial.logging.level.trim().to_string();
    }
    if !partial.logging.format.trim().is_empty() {
        cfg.logging.format = partial.logging.format.trim().to_string();
    }
    if let Some(stagger_ms) = partial.reveal.stagger_ms {
        cfg.reveal.stagger_ms = stagger_ms;
    }
    if let Some(reduced) = partial.reveal.reduced_motion {
        cfg.reveal.reduced_motion = reduced;
    }
    if let Some(max_chars) = partial.filler.max_chars {
        cfg.filler.max_chars = max_chars;
    }
    if let Some(keywords) = partial.filler.keywords {
        cfg.filler.keywords = keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
    }
    let session = &mut cfg.session;
    for (target, value) in [
        (&mut session.profile, partial.session.profile),
        (&mut session.language, partial.session.language),
        (&mut session.screenshot_interval, partial.session.screenshot_interval),
        (&mut session.image_quality, partial.session.image_quality),
    ] {
        if !value.trim().is_empty() {
            *target = value.trim().to_string();
        }
    }
}

fn apply_env<F>(cfg: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(REDUCE_MOTION_ENV) {
        if let Some(enabled) = parse_flag(&raw) {
            cfg.reveal.reduced_motion = enabled;
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
