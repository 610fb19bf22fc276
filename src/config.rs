//! Configuration for waybar-eyes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Nerd Font "eye" glyph.
pub const DEFAULT_GLYPH: &str = "\u{f06e}";

/// File name of the published payload inside the cache directory.
pub const OUTPUT_FILE_NAME: &str = "waybar-eyes.json";

/// File name of the PID file inside the cache directory.
pub const PID_FILE_NAME: &str = "waybar-eyes.pid";

/// Main configuration for the indicator daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound of the eye counter
    pub max_count: u32,

    /// Cool-down that presence must outlast before another eye is added
    #[serde(with = "duration_secs")]
    pub min_increment_interval: Duration,

    /// Delay between polls in steady state
    #[serde(with = "duration_secs")]
    pub sleep_on_presence: Duration,

    /// Delay between polls while the counter is decaying
    #[serde(with = "duration_secs")]
    pub sleep_on_absence: Duration,

    /// Detector attempts per poll
    pub debounce_retries: u32,

    /// Pause between detector attempts
    #[serde(with = "duration_millis")]
    pub debounce_delay: Duration,

    /// Pause after handling a reset or termination trigger
    #[serde(with = "duration_millis")]
    pub reset_pause: Duration,

    /// Whether a reset also restarts the growth cool-down
    pub reset_policy: ResetPolicy,

    /// Glyph repeated once per eye
    pub glyph: String,

    /// Where the rendered payload is written
    pub output_path: PathBuf,

    /// Where the running daemon records its PID
    pub pid_path: PathBuf,

    /// Skip the warm-up sleep before the first poll
    pub fast_start: bool,

    /// Print every rendered payload to stdout
    pub debug: bool,

    /// External presence detector
    pub detector: DetectorConfig,
}

impl Default for Config {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            max_count: 5,
            min_increment_interval: Duration::from_secs(15 * 60),
            sleep_on_presence: Duration::from_secs(30),
            sleep_on_absence: Duration::from_secs(15),
            debounce_retries: 5,
            debounce_delay: Duration::from_millis(500),
            reset_pause: Duration::from_secs(1),
            reset_policy: ResetPolicy::default(),
            glyph: DEFAULT_GLYPH.to_string(),
            output_path: cache_dir.join(OUTPUT_FILE_NAME),
            pid_path: cache_dir.join(PID_FILE_NAME),
            fast_start: false,
            debug: false,
            detector: DetectorConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// Save configuration to `path` as pretty JSON.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("waybar-eyes")
            .join("config.json")
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_count == 0 {
            return Err(ConfigError::Invalid("max_count must be at least 1".into()));
        }
        if self.debounce_retries == 0 {
            return Err(ConfigError::Invalid(
                "debounce_retries must be at least 1".into(),
            ));
        }
        if self.sleep_on_presence.is_zero() || self.sleep_on_absence.is_zero() {
            return Err(ConfigError::Invalid(
                "poll intervals must be greater than zero".into(),
            ));
        }
        if self.detector.program.trim().is_empty() {
            return Err(ConfigError::Invalid("detector program is empty".into()));
        }
        Ok(())
    }
}

/// What a reset does to the growth cool-down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Only the counter is zeroed; the cool-down keeps running from the last increment.
    #[default]
    KeepCooldown,
    /// The cool-down window restarts at the moment of the reset.
    RestartCooldown,
}

/// How to invoke the external face detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Detector executable, looked up in `PATH` unless absolute
    pub program: String,

    /// Arguments; `{device}` and `{classifier}` are substituted
    pub args: Vec<String>,

    /// Camera device index
    pub device: u32,

    /// Cascade classifier file handed to the detector
    pub classifier: PathBuf,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            program: "facedetect".to_string(),
            args: vec!["{device}".to_string(), "{classifier}".to_string()],
            // Built-in infrared webcam on the machines this was written for.
            device: 2,
            classifier: PathBuf::from("haarcascade_frontalface_default.xml"),
        }
    }
}

/// Parse a boolean environment flag such as `DEBUG=1` or `DEBUG=true`.
pub fn parse_bool_flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "t" | "T" | "true" | "TRUE" | "True")
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration as whole seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Serde support for Duration as milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
