//! Node Configuration - decision thresholds, camera intrinsics and the static
//! traffic light map as operator-tunable TOML values
//!
//! Each struct implements `Default` with values taken from the `defaults`
//! constants, ensuring zero-change behavior when no config file is present.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;
use crate::types::{Point3, TrafficLight};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "TL_DETECTOR_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "tl_detector.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a detection node deployment.
///
/// Load with `NodeConfig::load()` which searches:
/// 1. `$TL_DETECTOR_CONFIG` env var
/// 2. `./tl_detector.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node identification
    #[serde(default)]
    pub node: NodeInfo,

    /// Debounce and lookahead tuning
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Classifier selection and warm-up
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Camera intrinsics for light projection
    #[serde(default)]
    pub camera: CameraConfig,

    /// Route topology
    #[serde(default)]
    pub route: RouteConfig,

    /// Static traffic light positions
    #[serde(default)]
    pub map: MapConfig,
}

impl NodeConfig {
    /// Load configuration using the standard search order:
    /// 1. `$TL_DETECTOR_CONFIG` environment variable
    /// 2. `./tl_detector.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), node = %config.node.name, "Loaded node config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(node = %config.node.name, "Loaded node config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found — using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from an explicit path (e.g. `--config`), falling back to the
    /// standard search order when no path is given.
    pub fn load_or_search(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                let config = Self::load_from_file(p)?;
                info!(path = %p.display(), node = %config.node.name, "Loaded node config from --config");
                Ok(config)
            }
            None => Ok(Self::load()),
        }
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are reported as warnings only.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all values for internal consistency.
    ///
    /// Rules:
    /// - Commit threshold and lookahead must be >= 1
    /// - Camera intrinsics and crop sizes must be positive
    /// - Classifier warm-up and pixel thresholds must be finite and in range
    /// - Map light positions must be finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = super::validation::validate_ranges(self);

        let d = &self.detector;
        if d.state_count_threshold == 0 {
            errors.push("detector.state_count_threshold must be >= 1".to_string());
        }
        if d.lookahead_waypoints == 0 {
            errors.push("detector.lookahead_waypoints must be >= 1".to_string());
        }

        let c = &self.camera;
        if c.image_width == 0 || c.image_height == 0 {
            errors.push(format!(
                "camera image size must be non-zero (got {}x{})",
                c.image_width, c.image_height
            ));
        }
        if c.crop_width == 0 || c.crop_height == 0 {
            errors.push(format!(
                "camera crop size must be non-zero (got {}x{})",
                c.crop_width, c.crop_height
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Node Info
// ============================================================================

/// Identification metadata. Appears in logs only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    #[serde(default = "default_node_name")]
    pub name: String,
}

fn default_node_name() -> String {
    "tl_detector".to_string()
}

impl Default for NodeInfo {
    fn default() -> Self {
        Self { name: default_node_name() }
    }
}

// ============================================================================
// Detector
// ============================================================================

/// What to do with a frame when the light cannot be projected into the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformFallback {
    /// Classify the whole frame instead of a crop.
    #[default]
    WholeFrame,
    /// Skip classification and keep the last committed decision.
    SkipFrame,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Consecutive identical classifications required to commit a state
    #[serde(default = "default_state_count_threshold")]
    pub state_count_threshold: u32,

    /// Lights further ahead than this many waypoints are not classified
    #[serde(default = "default_lookahead_waypoints")]
    pub lookahead_waypoints: usize,

    #[serde(default)]
    pub transform_fallback: TransformFallback,

    /// Frames between info-level reminders while inputs are missing
    #[serde(default = "default_missing_input_log_interval")]
    pub missing_input_log_interval: u64,
}

fn default_state_count_threshold() -> u32 { defaults::STATE_COUNT_THRESHOLD }
fn default_lookahead_waypoints() -> usize { defaults::LOOKAHEAD_WAYPOINTS }
fn default_missing_input_log_interval() -> u64 { defaults::MISSING_INPUT_LOG_INTERVAL }

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            state_count_threshold: default_state_count_threshold(),
            lookahead_waypoints: default_lookahead_waypoints(),
            transform_fallback: TransformFallback::default(),
            missing_input_log_interval: default_missing_input_log_interval(),
        }
    }
}

// ============================================================================
// Classifier
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// HSV lamp-color vote over the light crop
    #[default]
    Color,
    /// Simulator ground-truth state of the nearest light (debug only)
    GroundTruth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub kind: ClassifierKind,

    /// Minimum time before the classifier reports ready (seconds)
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: f64,

    /// Share of sampled pixels that must vote for a color
    #[serde(default = "default_min_pixel_fraction")]
    pub min_pixel_fraction: f64,

    /// HSV value threshold for a lit pixel (0-255)
    #[serde(default = "default_min_value")]
    pub min_value: f64,
}

fn default_warmup_secs() -> f64 { defaults::CLASSIFIER_WARMUP_SECS }
fn default_min_pixel_fraction() -> f64 { defaults::CLASSIFIER_MIN_PIXEL_FRACTION }
fn default_min_value() -> f64 { defaults::CLASSIFIER_MIN_VALUE }

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::default(),
            warmup_secs: default_warmup_secs(),
            min_pixel_fraction: default_min_pixel_fraction(),
            min_value: default_min_value(),
        }
    }
}

// ============================================================================
// Camera
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_focal_length_x")]
    pub focal_length_x: f64,
    #[serde(default = "default_focal_length_y")]
    pub focal_length_y: f64,
    #[serde(default = "default_image_width")]
    pub image_width: u32,
    #[serde(default = "default_image_height")]
    pub image_height: u32,
    /// Camera height above the pose position (m)
    #[serde(default = "default_mounting_height")]
    pub mounting_height_m: f64,
    #[serde(default = "default_crop_width")]
    pub crop_width: u32,
    #[serde(default = "default_crop_height")]
    pub crop_height: u32,
}

fn default_focal_length_x() -> f64 { defaults::CAMERA_FOCAL_LENGTH_X }
fn default_focal_length_y() -> f64 { defaults::CAMERA_FOCAL_LENGTH_Y }
fn default_image_width() -> u32 { defaults::CAMERA_IMAGE_WIDTH }
fn default_image_height() -> u32 { defaults::CAMERA_IMAGE_HEIGHT }
fn default_mounting_height() -> f64 { defaults::CAMERA_MOUNTING_HEIGHT_M }
fn default_crop_width() -> u32 { defaults::CROP_WIDTH }
fn default_crop_height() -> u32 { defaults::CROP_HEIGHT }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            focal_length_x: default_focal_length_x(),
            focal_length_y: default_focal_length_y(),
            image_width: default_image_width(),
            image_height: default_image_height(),
            mounting_height_m: default_mounting_height(),
            crop_width: default_crop_width(),
            crop_height: default_crop_height(),
        }
    }
}

// ============================================================================
// Route
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Treat incoming waypoint paths as closed loops (track driving)
    #[serde(default)]
    pub closed_loop: bool,
}

// ============================================================================
// Map
// ============================================================================

/// One `[[map.lights]]` entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LightPosition {
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_light_z")]
    pub z: f64,
}

fn default_light_z() -> f64 { defaults::LIGHT_HEAD_HEIGHT_M }

impl LightPosition {
    pub fn to_light(self) -> TrafficLight {
        TrafficLight::at(Point3::new(self.x, self.y, self.z))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default)]
    pub lights: Vec<LightPosition>,
}
