//! Run configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::ConfigError;
use crate::record::Action;
use crate::rules::PrioritizationRule;

/// Configuration for a deduplication run.
///
/// Read-only for the duration of a run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct DedupConfig {
    /// Root directories to analyze and deduplicate.
    pub roots: Vec<PathBuf>,

    /// Descend into subdirectories.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Match duplicates across different roots instead of within one root.
    #[builder(default = "false")]
    #[serde(default)]
    pub search_across_roots: bool,

    /// File extensions to consider, compared case-insensitively.
    #[builder(default = "default_extensions()")]
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Regular expressions matched against absolute paths to skip.
    #[builder(default)]
    #[serde(default)]
    pub exclusions: Vec<String>,

    /// Analysis worker count (0 = number of cores).
    #[builder(default = "0")]
    #[serde(default)]
    pub threads: usize,

    /// Maximum modification time difference for two files to count as the
    /// same picture.
    #[builder(default)]
    #[serde(default, with = "duration_str::option")]
    pub max_mod_time_delta: Option<Duration>,

    /// Ordered ranking rules.
    #[builder(default = "PrioritizationRule::defaults()")]
    #[serde(default = "PrioritizationRule::defaults")]
    pub prioritization_rules: Vec<PrioritizationRule>,

    /// Simulate every filesystem mutation.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub dry_run: bool,

    /// Remove folders that became empty during the run.
    #[builder(default = "false")]
    #[serde(default)]
    pub remove_empty_folders: bool,

    /// Move duplicates here instead of deleting them.
    #[builder(default)]
    #[serde(default)]
    pub duplicates_target: Option<PathBuf>,

    /// Maximum signature distance for two files to be similar.
    #[builder(default = "0.10")]
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,

    /// Where the reference store keeps its snapshot.
    #[builder(default)]
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Daemon mode settings.
    #[builder(default)]
    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// Daemon mode settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Idle time after the last filesystem event before the queue drains.
    #[serde(default = "default_quiescence", with = "duration_str")]
    pub quiescence: Duration,

    /// Which filesystem observer to use.
    #[serde(default)]
    pub observer: ObserverKind,

    /// Poll interval for the polling observer.
    #[serde(default = "default_poll_interval", with = "duration_str")]
    pub poll_interval: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            quiescence: default_quiescence(),
            observer: ObserverKind::default(),
            poll_interval: default_poll_interval(),
        }
    }
}

/// Filesystem observer backend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ObserverKind {
    /// Platform notifications (inotify, FSEvents, ...).
    Native,
    /// Periodic directory polling; works on network shares.
    #[default]
    Polling,
}

fn default_true() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    vec![".png".to_string(), ".jpg".to_string(), ".jpeg".to_string()]
}

fn default_max_distance() -> f64 {
    0.10
}

fn default_quiescence() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

impl DedupConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.roots {
            Some(ref roots) if !roots.is_empty() => {
                if let Some(Some(ref target)) = self.duplicates_target {
                    check_target(roots, target).map_err(|e| e.to_string())?;
                }
            }
            _ => return Err("At least one root directory is required".to_string()),
        }
        if let Some(ref patterns) = self.exclusions {
            check_exclusions(patterns).map_err(|e| e.to_string())?;
        }
        if let Some(distance) = self.max_distance {
            check_distance(distance).map_err(|e| e.to_string())?;
        }
        if let Some(ref daemon) = self.daemon {
            check_daemon(daemon).map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

impl DedupConfig {
    /// Create a new config builder.
    pub fn builder() -> DedupConfigBuilder {
        DedupConfigBuilder::default()
    }

    /// Create a config with defaults for the given roots.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            recursive: true,
            search_across_roots: false,
            extensions: default_extensions(),
            exclusions: Vec::new(),
            threads: 0,
            max_mod_time_delta: None,
            prioritization_rules: PrioritizationRule::defaults(),
            dry_run: true,
            remove_empty_folders: false,
            duplicates_target: None,
            max_distance: default_max_distance(),
            store_path: None,
            daemon: DaemonConfig::default(),
        }
    }

    /// Load and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every semantic constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.roots.is_empty() {
            return Err(ConfigError::invalid("At least one root directory is required"));
        }
        check_exclusions(&self.exclusions)?;
        check_distance(self.max_distance)?;
        check_daemon(&self.daemon)?;
        if let Some(ref target) = self.duplicates_target {
            check_target(&self.roots, target)?;
        }
        Ok(())
    }

    /// Worker count for the analysis phase.
    pub fn resolved_threads(&self) -> usize {
        match self.threads {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }

    /// The action given to files that lose their duplicate group.
    pub fn removal_action(&self) -> Action {
        if self.duplicates_target.is_some() {
            Action::Move
        } else {
            Action::Delete
        }
    }
}

/// Drop roots nested inside other roots, keeping first-seen order.
pub fn non_overlapping_roots(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for root in roots {
        if result.iter().any(|kept| root.starts_with(kept)) {
            continue;
        }
        result.retain(|kept| !kept.starts_with(root));
        result.push(root.clone());
    }

    result
}

/// Parse a duration string such as `"30s"`, `"5m"`, `"2h"`, `"1d"` or `"1w"`.
///
/// A bare number is read as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim().to_lowercase();
    let invalid = || ConfigError::InvalidDuration { value: s.clone() };

    let (num, multiplier) = if let Some(num) = s.strip_suffix("ms") {
        (num, 0.001)
    } else if let Some(num) = s.strip_suffix('w') {
        (num, 7.0 * 24.0 * 60.0 * 60.0)
    } else if let Some(num) = s.strip_suffix('d') {
        (num, 24.0 * 60.0 * 60.0)
    } else if let Some(num) = s.strip_suffix('h') {
        (num, 60.0 * 60.0)
    } else if let Some(num) = s.strip_suffix('m') {
        (num, 60.0)
    } else if let Some(num) = s.strip_suffix('s') {
        (num, 1.0)
    } else {
        (s.as_str(), 1.0)
    };

    let num: f64 = num.trim().parse().map_err(|_| invalid())?;
    if num < 0.0 {
        return Err(invalid());
    }
    Duration::try_from_secs_f64(num * multiplier).map_err(|_| invalid())
}

fn check_exclusions(patterns: &[String]) -> Result<(), ConfigError> {
    for pattern in patterns {
        regex::Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
    }
    Ok(())
}

fn check_distance(distance: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&distance) {
        return Err(ConfigError::invalid(format!(
            "max_distance must be within [0, 1], got {distance}"
        )));
    }
    Ok(())
}

fn check_daemon(daemon: &DaemonConfig) -> Result<(), ConfigError> {
    if daemon.quiescence.is_zero() {
        return Err(ConfigError::invalid("daemon quiescence must be positive"));
    }
    if daemon.poll_interval.is_zero() {
        return Err(ConfigError::invalid("daemon poll_interval must be positive"));
    }
    Ok(())
}

fn check_target(roots: &[PathBuf], target: &Path) -> Result<(), ConfigError> {
    if let Some(root) = roots.iter().find(|root| target.starts_with(root)) {
        return Err(ConfigError::invalid(format!(
            "duplicates target {} lies inside root {}",
            target.display(),
            root.display()
        )));
    }
    Ok(())
}

/// Serde adapter writing durations as human strings.
mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}s", value.as_secs_f64()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use std::time::Duration;

        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|s| crate::config::parse_duration(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
