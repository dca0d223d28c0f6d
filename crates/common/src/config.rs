//! Application configuration.
//!
//! Every value here is something the operator can change from the control
//! panel at runtime; the file only supplies the starting point.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PeekabooError, PeekabooResult};

/// Valid range for calibration center percentages.
pub const CENTER_RANGE: (f64, f64) = (0.0, 100.0);

/// Valid range for calibration sensitivity multipliers.
pub const MULTIPLIER_RANGE: (f64, f64) = (0.5, 2.5);

/// Global application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Frame loop settings.
    pub tracking: TrackingConfig,

    /// Mapping from sensor space to control space.
    pub calibration: CalibrationConfig,

    /// Timed and proximity triggers.
    pub triggers: TriggerConfig,

    /// Full-screen presentation behaviour.
    pub presentation: PresentationConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Frame loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Render-clock rate the frame loop runs at (Hz).
    pub frame_rate_hz: u32,

    /// Whether the character follows the viewer (runs the calibration mapper).
    pub follow_enabled: bool,
}

/// Calibration parameters for the control-coordinate mapper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Horizontal center, percent of image width.
    pub center_x: f64,
    /// Vertical center, percent of image height.
    pub center_y: f64,
    /// Horizontal sensitivity.
    pub multiplier_x: f64,
    /// Vertical sensitivity.
    pub multiplier_y: f64,
}

/// Trigger settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Timed trigger cadence.
    pub interval: TriggerInterval,

    /// Whether proximity triggers are armed.
    pub proximity_enabled: bool,

    /// Depth magnitude above which the viewer counts as close, in (0, 1].
    pub proximity_threshold: f64,
}

/// Presentation mode settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    /// Start in full-screen presentation mode.
    pub start_in_presentation: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "peekaboo=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

/// Timed trigger cadence.
///
/// Serialized as the integer the control panel uses: `0` is off, a
/// positive value is a fixed period in seconds, `-1` picks a fresh
/// random period every cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum TriggerInterval {
    #[default]
    Disabled,
    Fixed { secs: u32 },
    Random,
}

impl TryFrom<i64> for TriggerInterval {
    type Error = PeekabooError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TriggerInterval::Disabled),
            -1 => Ok(TriggerInterval::Random),
            secs if secs > 0 => u32::try_from(secs)
                .map(|secs| TriggerInterval::Fixed { secs })
                .map_err(|_| PeekabooError::config(format!("interval {secs}s is too large"))),
            other => Err(PeekabooError::config(format!(
                "interval must be 0, -1 or a positive number of seconds, got {other}"
            ))),
        }
    }
}

impl From<TriggerInterval> for i64 {
    fn from(value: TriggerInterval) -> Self {
        match value {
            TriggerInterval::Disabled => 0,
            TriggerInterval::Fixed { secs } => secs as i64,
            TriggerInterval::Random => -1,
        }
    }
}

impl std::fmt::Display for TriggerInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerInterval::Disabled => write!(f, "off"),
            TriggerInterval::Fixed { secs } => write!(f, "every {secs}s"),
            TriggerInterval::Random => write!(f, "random (30s - 2m)"),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: 60,
            follow_enabled: true,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            center_x: 50.0,
            center_y: 50.0,
            multiplier_x: 1.0,
            multiplier_y: 1.0,
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            interval: TriggerInterval::Disabled,
            proximity_enabled: false,
            proximity_threshold: 0.5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl CalibrationConfig {
    /// Reject values the calibration panel cannot produce.
    pub fn validate(&self) -> PeekabooResult<()> {
        check_range("calibration.center_x", self.center_x, CENTER_RANGE)?;
        check_range("calibration.center_y", self.center_y, CENTER_RANGE)?;
        check_range("calibration.multiplier_x", self.multiplier_x, MULTIPLIER_RANGE)?;
        check_range("calibration.multiplier_y", self.multiplier_y, MULTIPLIER_RANGE)?;
        Ok(())
    }
}

impl TriggerConfig {
    pub fn validate(&self) -> PeekabooResult<()> {
        validate_threshold(self.proximity_threshold)
    }
}

/// Proximity thresholds live in (0, 1].
pub fn validate_threshold(threshold: f64) -> PeekabooResult<()> {
    if threshold.is_finite() && threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(PeekabooError::config(format!(
            "triggers.proximity_threshold must be in (0, 1], got {threshold}"
        )))
    }
}

fn check_range(name: &str, value: f64, (min, max): (f64, f64)) -> PeekabooResult<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(PeekabooError::config(format!(
            "{name} must be in [{min}, {max}], got {value}"
        )))
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: &Path) -> PeekabooResult<Self> {
        if !path.exists() {
            return Err(PeekabooError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> PeekabooResult<()> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> PeekabooResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check every section for out-of-range values.
    pub fn validate(&self) -> PeekabooResult<()> {
        if self.tracking.frame_rate_hz == 0 {
            return Err(PeekabooError::config(
                "tracking.frame_rate_hz must be positive",
            ));
        }
        self.calibration.validate()?;
        self.triggers.validate()?;
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("peekaboo").join("config.json")
}
