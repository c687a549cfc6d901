//! Configuration — YAML config file, written with defaults on first run.
//!
//! Loading is lenient: a malformed field falls back to its own default and a
//! broken file falls back to [`PokeConfig::fallback`]. Nothing here returns an
//! error to the host.

use anyhow::{Context, Result};
use serde::{Serialize, Serializer};
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::prompts::{DEFAULT_POKE_REPLY, DEFAULT_POKE_RESPONSES, DEFAULT_PROMPT_TEMPLATE};

/// Plugin directory under `<data_dir>/plugins/`, shared with existing installs
pub const PLUGIN_DIR: &str = "astrbot_plugin_pock";

const CONFIG_FILENAME: &str = "config.yml";

/// Directories left behind by older releases, relative to the data dir.
const LEGACY_DIRS: &[&str] = &["plugins/poke_monitor", "plugins/plugins/poke_monitor"];

/// Upper bound for the reset interval so it always fits a chrono duration.
const MAX_RESET_INTERVAL_SECS: f64 = u32::MAX as f64;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSwitches {
    /// Reply to pokes (LLM request, canned reply on failure)
    pub poke_response_enabled: bool,

    /// Randomly poke the sender back
    pub poke_back_enabled: bool,
}

impl Default for FeatureSwitches {
    fn default() -> Self {
        Self {
            poke_response_enabled: true,
            poke_back_enabled: true,
        }
    }
}

/// Only serialized (for the default file); reading goes through the lenient
/// field-by-field parser in [`PokeConfig::from_yaml_str`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PokeConfig {
    /// Canned replies, picked by `count - 1` when the LLM path fails
    pub poke_responses: Vec<String>,

    pub feature_switches: FeatureSwitches,

    /// Chance in [0, 1] of poking back at all
    pub poke_back_probability: f64,

    /// Chance in [0, 1] that a poke-back escalates to a super poke
    pub super_poke_probability: f64,

    /// Seconds of silence after which a user's count starts over. Fractions
    /// are kept.
    #[serde(serialize_with = "serialize_seconds")]
    pub reset_interval_seconds: f64,

    /// Prompt with `{username}`, `{chat_type}` and `{count}` placeholders
    pub llm_prompt_template: String,
}

fn default_reset_interval() -> f64 {
    60.0
}
fn default_prompt_template() -> String {
    DEFAULT_PROMPT_TEMPLATE.into()
}

/// Whole seconds are written as integers (`60`, not `60.0`).
fn serialize_seconds<S: Serializer>(secs: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if secs.fract() == 0.0 && *secs >= 0.0 && *secs <= MAX_RESET_INTERVAL_SECS {
        serializer.serialize_u64(*secs as u64)
    } else {
        serializer.serialize_f64(*secs)
    }
}

impl Default for PokeConfig {
    /// The record written to disk when no config file exists yet.
    fn default() -> Self {
        Self {
            poke_responses: DEFAULT_POKE_RESPONSES.iter().map(|s| s.to_string()).collect(),
            feature_switches: FeatureSwitches::default(),
            poke_back_probability: 0.3,
            super_poke_probability: 0.1,
            reset_interval_seconds: default_reset_interval(),
            llm_prompt_template: default_prompt_template(),
        }
    }
}

impl PokeConfig {
    /// Values used when the file cannot be read or parsed, and per field when
    /// a key is missing or malformed.
    pub fn fallback() -> Self {
        Self {
            poke_responses: Vec::new(),
            feature_switches: FeatureSwitches::default(),
            poke_back_probability: 0.0,
            super_poke_probability: 0.0,
            reset_interval_seconds: default_reset_interval(),
            llm_prompt_template: default_prompt_template(),
        }
    }

    /// `<data_dir>/plugins/astrbot_plugin_pock/config.yml`
    pub fn config_path(data_dir: &Path) -> PathBuf {
        data_dir.join("plugins").join(PLUGIN_DIR).join(CONFIG_FILENAME)
    }

    /// Write the default config if `path` is missing, then load it.
    /// Errors are logged and [`PokeConfig::fallback`] is returned instead.
    pub fn load_or_init(path: &Path) -> Self {
        if !path.exists() {
            match Self::write_default(path) {
                Ok(()) => info!("Wrote default config to {}", path.display()),
                Err(e) => error!("Failed to write default config: {:#}", e),
            }
        }

        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config, using defaults: {:#}", e);
                Self::fallback()
            }
        }
    }

    /// Read and leniently parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_yaml_str(&content)
    }

    /// Parse YAML text. Only a document that is not YAML at all, or not a
    /// mapping, is an error; bad fields degrade individually.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let doc: Value = serde_yaml::from_str(content).context("Failed to parse config.yml")?;
        match doc {
            // empty file
            Value::Null => Ok(Self::fallback()),
            Value::Mapping(_) => Ok(Self::from_value(&doc)),
            _ => anyhow::bail!("config.yml must be a mapping at the top level"),
        }
    }

    fn from_value(doc: &Value) -> Self {
        let fallback = Self::fallback();

        let poke_responses = match doc.get("poke_responses") {
            None | Some(Value::Null) => fallback.poke_responses,
            Some(Value::Sequence(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    // keep the slot so later entries stay at `count - 1`
                    scalar_to_string(item).unwrap_or_else(|| {
                        warn!("poke_responses[{}] is not text ({:?}); using default reply", i, item);
                        DEFAULT_POKE_REPLY.to_string()
                    })
                })
                .collect(),
            Some(other) => {
                warn!("poke_responses should be a list, got {:?}; ignoring", other);
                fallback.poke_responses
            }
        };

        let switches = doc.get("feature_switches");
        let feature_switches = FeatureSwitches {
            poke_response_enabled: read_switch(switches, "poke_response_enabled"),
            poke_back_enabled: read_switch(switches, "poke_back_enabled"),
        };

        let llm_prompt_template = match doc.get("llm_prompt_template") {
            Some(Value::String(s)) => s.clone(),
            None | Some(Value::Null) => fallback.llm_prompt_template,
            Some(other) => {
                warn!("llm_prompt_template should be a string, got {:?}", other);
                fallback.llm_prompt_template
            }
        };

        Self {
            poke_responses,
            feature_switches,
            poke_back_probability: read_probability(doc, "poke_back_probability"),
            super_poke_probability: read_probability(doc, "super_poke_probability"),
            reset_interval_seconds: read_reset_interval(doc),
            llm_prompt_template,
        }
    }

    fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let yaml = serde_yaml::to_string(&Self::default()).context("Failed to serialize config")?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }
}

/// Remove plugin directories left by older releases. Failures are warnings.
pub fn clean_legacy_dirs(data_dir: &Path) {
    for dir in LEGACY_DIRS {
        let path = data_dir.join(dir);
        if !path.exists() {
            continue;
        }
        let removed = std::fs::remove_dir_all(&path)
            .with_context(|| format!("Failed to remove {}", path.display()));
        match removed {
            Ok(()) => info!("Removed legacy directory {}", path.display()),
            Err(e) => warn!("Legacy cleanup of {} failed: {:#}", dir, e),
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numbers and numeric strings are accepted.
fn read_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn read_probability(doc: &Value, key: &str) -> f64 {
    match doc.get(key) {
        None | Some(Value::Null) => 0.0,
        Some(value) => match read_number(value) {
            Some(p) => p.clamp(0.0, 1.0),
            None => {
                warn!("{} is not a number ({:?}); using 0.0", key, value);
                0.0
            }
        },
    }
}

fn read_reset_interval(doc: &Value) -> f64 {
    let default = default_reset_interval();
    match doc.get("reset_interval_seconds") {
        None | Some(Value::Null) => default,
        Some(value) => match read_number(value) {
            Some(secs) => secs.clamp(0.0, MAX_RESET_INTERVAL_SECS),
            None => {
                warn!("reset_interval_seconds is not a number ({:?}); using {}", value, default);
                default
            }
        },
    }
}

/// Missing switches are on. Present values follow truthiness: `false`, `0`,
/// `""`, `~` and empty collections turn the feature off.
fn read_switch(switches: Option<&Value>, key: &str) -> bool {
    let Some(value) = switches.and_then(|s| s.get(key)) else {
        return true;
    };
    let enabled = match value {
        Value::Bool(b) => return *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(items) => !items.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Tagged(tagged) => !tagged.value.is_null(),
    };
    warn!(
        "feature_switches.{} should be a boolean, got {:?}; treating as {}",
        key, value, enabled
    );
    enabled
}
