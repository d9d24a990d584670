//! Configuration file handling

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use buzz_core::ButtonKind;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub timing: TimingConfig,
    pub round: RoundConfig,
}

impl Config {
    /// Get the config file path for this platform
    pub fn path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "buzz-quiz").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load config from the platform path, or create default if it doesn't exist
    pub fn load_or_create() -> Result<Self, Box<dyn Error>> {
        let path = Self::path().ok_or("could not determine config directory")?;

        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = Config::default();
            config.save_to(&path)?;
            println!("created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn Error>> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config with header comments
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let header = r#"# buzz-quiz configuration file
# durations accept humantime values such as "10ms", "1s" or "1m 30s"

"#;
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, format!("{header}{contents}"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// HID path of the controller to use. Empty picks the first one found
    pub path: String,
}

impl DeviceConfig {
    pub fn path(&self) -> Option<&str> {
        let path = self.path.trim();
        (!path.is_empty()).then_some(path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Delay between polls while waiting for a press
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Length of each blink phase
    #[serde(with = "humantime_serde")]
    pub blink_interval: Duration,
    /// How long one wait for a buzz lasts before checking for shutdown
    #[serde(with = "humantime_serde")]
    pub press_timeout: Duration,
    /// Time the buzzing player gets to answer
    #[serde(with = "humantime_serde")]
    pub answer_window: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval: buzz_controller::consts::DEFAULT_POLL_INTERVAL,
            blink_interval: buzz_controller::consts::DEFAULT_BLINK_INTERVAL,
            press_timeout: Duration::from_secs(1),
            answer_window: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// Button used to buzz in
    pub buzz_button: ButtonKind,
    /// Answer button counted as correct
    pub correct_button: ButtonKind,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            buzz_button: ButtonKind::Red,
            correct_button: ButtonKind::Blue,
        }
    }
}
