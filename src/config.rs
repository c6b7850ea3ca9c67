//! Persisted configuration: profiles, thresholds, scan interval and macros.
//!
//! The on-disk format is a single JSON document. Every key is optional and
//! falls back to its default, so a partial or hand-written file loads fine.

use crate::error::{SetupError, SetupResult};
use crate::macros::MacroEvent;
use crate::matching::{SelectionMask, StrategyKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name, relative to the working directory.
pub const CONFIG_FILENAME: &str = ".config";

/// Matching mode. `Accuracy` histogram-matches the screen to the template
/// before correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Performance,
    Accuracy,
}

/// Per-strategy acceptance thresholds.
///
/// Correlation strategies read these as a confidence in [0, 1]; feature
/// strategies read them as a minimum number of good matches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyThresholds {
    #[serde(rename = "direct-locate", alias = "pyautogui", default = "default_direct_locate")]
    pub direct_locate: f64,
    #[serde(
        rename = "template-correlation",
        alias = "template",
        default = "default_template_correlation"
    )]
    pub template_correlation: f64,
    #[serde(rename = "orb-features", alias = "orb", default = "default_orb_features")]
    pub orb_features: f64,
    #[serde(rename = "sift-features", alias = "sift", default = "default_sift_features")]
    pub sift_features: f64,
    #[serde(rename = "akaze-features", alias = "akaze", default = "default_akaze_features")]
    pub akaze_features: f64,
}

fn default_direct_locate() -> f64 {
    0.8
}
fn default_template_correlation() -> f64 {
    0.95
}
fn default_orb_features() -> f64 {
    60.0
}
fn default_sift_features() -> f64 {
    80.0
}
fn default_akaze_features() -> f64 {
    10.0
}

impl Default for AccuracyThresholds {
    fn default() -> Self {
        Self {
            direct_locate: default_direct_locate(),
            template_correlation: default_template_correlation(),
            orb_features: default_orb_features(),
            sift_features: default_sift_features(),
            akaze_features: default_akaze_features(),
        }
    }
}

impl AccuracyThresholds {
    pub fn for_strategy(&self, kind: StrategyKind) -> f64 {
        match kind {
            StrategyKind::DirectLocate => self.direct_locate,
            StrategyKind::TemplateCorrelation => self.template_correlation,
            StrategyKind::OrbFeatures => self.orb_features,
            StrategyKind::SiftFeatures => self.sift_features,
            StrategyKind::AkazeFeatures => self.akaze_features,
        }
    }

    pub fn set(&mut self, kind: StrategyKind, value: f64) {
        match kind {
            StrategyKind::DirectLocate => self.direct_locate = value,
            StrategyKind::TemplateCorrelation => self.template_correlation = value,
            StrategyKind::OrbFeatures => self.orb_features = value,
            StrategyKind::SiftFeatures => self.sift_features = value,
            StrategyKind::AkazeFeatures => self.akaze_features = value,
        }
    }
}

/// A named set of templates plus the macro recorded for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Base directory for `image_files`; "." means the working directory.
    #[serde(default = "default_profile_path")]
    pub path: String,
    #[serde(default)]
    pub image_files: Vec<String>,
    #[serde(default)]
    pub key_recording: Vec<MacroEvent>,
}

fn default_profile_path() -> String {
    ".".to_string()
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            path: default_profile_path(),
            image_files: Vec::new(),
            key_recording: Vec::new(),
        }
    }
}

impl Profile {
    pub fn base_dir(&self) -> PathBuf {
        if self.path == "." {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        } else {
            PathBuf::from(&self.path)
        }
    }

    /// Template paths in configured order.
    pub fn template_paths(&self) -> Vec<PathBuf> {
        let base = self.base_dir();
        self.image_files.iter().map(|f| base.join(f)).collect()
    }

    /// Template paths that exist on disk, in configured order.
    pub fn valid_template_paths(&self) -> Vec<PathBuf> {
        self.template_paths()
            .into_iter()
            .filter(|p| p.is_file())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_stop_key")]
    pub stop_key: String,
    /// Strategy selection in registration order.
    #[serde(default = "default_matching_pattern")]
    pub matching_pattern: Vec<bool>,
    #[serde(default)]
    pub mode: MatchMode,
    #[serde(default)]
    pub accuracy_thresholds: AccuracyThresholds,
    /// Seconds to sleep between templates and between scan passes.
    #[serde(default = "default_scan_duration")]
    pub scan_duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macro_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

fn default_stop_key() -> String {
    "esc".to_string()
}

fn default_matching_pattern() -> Vec<bool> {
    vec![false; StrategyKind::ALL.len()]
}

fn default_scan_duration() -> f64 {
    0.5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stop_key: default_stop_key(),
            matching_pattern: default_matching_pattern(),
            mode: MatchMode::default(),
            accuracy_thresholds: AccuracyThresholds::default(),
            scan_duration: default_scan_duration(),
            default_profile: None,
            macro_profile: None,
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load from `path`. A missing file yields the default config; an
    /// unreadable or malformed file is an error.
    pub fn load(path: &Path) -> SetupResult<Self> {
        if !path.exists() {
            log::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| SetupError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| SetupError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> SetupResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| SetupError::ConfigWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge another config file into this one. The file must carry a
    /// `profiles` section; its top-level keys replace ours.
    pub fn import_from(&mut self, path: &Path) -> SetupResult<()> {
        let text = std::fs::read_to_string(path).map_err(|source| SetupError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|source| SetupError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        let Some(incoming) = value.as_object() else {
            return Err(SetupError::InvalidImport {
                path: path.to_path_buf(),
            });
        };
        if !incoming.contains_key("profiles") {
            return Err(SetupError::InvalidImport {
                path: path.to_path_buf(),
            });
        }

        let mut merged = serde_json::to_value(&*self)?;
        if let Some(current) = merged.as_object_mut() {
            for (key, value) in incoming {
                current.insert(key.clone(), value.clone());
            }
        }
        *self = serde_json::from_value(merged).map_err(|source| SetupError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("✅ Configuration imported from {:?}", path);
        Ok(())
    }

    /// Pick the first profile as default when none is set. Returns the
    /// newly chosen name, if any.
    pub fn ensure_default_profile(&mut self) -> Option<String> {
        let missing = self
            .default_profile
            .as_ref()
            .is_none_or(|name| name.is_empty());
        if !missing {
            return None;
        }
        let first = self.profiles.keys().next().cloned()?;
        log::info!("No default profile found. Auto-setting default profile to '{first}'");
        self.default_profile = Some(first.clone());
        Some(first)
    }

    pub fn active_profile(&self) -> SetupResult<(&str, &Profile)> {
        let name = self.default_profile.as_deref();
        name.and_then(|n| self.profiles.get_key_value(n))
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| SetupError::ProfileNotFound {
                name: name.map(str::to_string),
            })
    }

    /// Profile whose macro is played and recorded: `macro_profile` when set,
    /// otherwise the default profile.
    pub fn macro_profile_name(&self) -> Option<&str> {
        self.macro_profile
            .as_deref()
            .or(self.default_profile.as_deref())
            .filter(|name| self.profiles.contains_key(*name))
    }

    /// Recording to replay, if a valid macro profile exists.
    pub fn macro_recording(&self) -> Option<&[MacroEvent]> {
        self.macro_profile_name()
            .and_then(|name| self.profiles.get(name))
            .map(|p| p.key_recording.as_slice())
    }

    pub fn set_macro_profile(&mut self, name: &str) -> SetupResult<()> {
        if !self.profiles.contains_key(name) {
            return Err(SetupError::ProfileNotFound {
                name: Some(name.to_string()),
            });
        }
        self.macro_profile = Some(name.to_string());
        Ok(())
    }

    pub fn store_macro(&mut self, profile: &str, events: Vec<MacroEvent>) -> SetupResult<()> {
        let entry = self
            .profiles
            .get_mut(profile)
            .ok_or_else(|| SetupError::ProfileNotFound {
                name: Some(profile.to_string()),
            })?;
        entry.key_recording = events;
        Ok(())
    }

    pub fn clear_macro(&mut self, profile: &str) -> SetupResult<()> {
        self.store_macro(profile, Vec::new())
    }

    pub fn selection_mask(&self) -> SelectionMask {
        SelectionMask::new(self.matching_pattern.clone())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.scan_duration.max(0.0)).unwrap_or(Duration::ZERO)
    }
}
