//! Encoding option set and user defaults file handling

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading or writing a config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
    /// TOML serialization error
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Serialize(e) => write!(f, "Failed to serialize config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(e: toml::ser::Error) -> Self {
        ConfigError::Serialize(e)
    }
}

/// The recognized encoding options, each one optional.
///
/// The same record is used for every configuration layer: CLI arguments,
/// per-job overrides in the job file, job-file global settings, and the
/// per-user defaults file. A `None` field means the layer does not set
/// that option and resolution falls through to the next layer.
///
/// Unrecognized keys in persisted documents are rejected at parse time
/// rather than silently dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Options {
    /// Selectively deinterlace frames where combing is detected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decomb: Option<bool>,
    /// Prevent the host from sleeping while encoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_sleep: Option<bool>,
    /// Don't automatically burn the first forced subtitle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_auto_burn: Option<bool>,
    /// Burn the subtitle track with this number instead of scanning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burn_subtitle_num: Option<u32>,
    /// Add the subtitle track selected by language code (e.g. "eng")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_subtitle: Option<String>,
    /// Explicit crop geometry passed to the transcoder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_params: Option<String>,
    /// Quality label appended to movie output names (e.g. "1080p")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    /// Treat the output as a movie (title subdirectory, quality suffix)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie: Option<bool>,
    /// Produce .m4v output instead of .mkv
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m4v: Option<bool>,
    /// Chapter specification passed to the transcoder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapters: Option<String>,
    /// Archive the source file after a successful encode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<bool>,
}

impl Options {
    /// True when no option is set at this layer.
    pub fn is_empty(&self) -> bool {
        *self == Options::default()
    }

    /// Parse an options document from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let options: Options = toml::from_str(content)?;
        Ok(options)
    }

    /// Load an options layer from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Load the user defaults layer.
    ///
    /// A missing file is an empty layer, not an error; a malformed file
    /// is fatal.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Write this options layer to a TOML file, creating parent
    /// directories as needed.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Fixed per-user location of the defaults file:
/// `~/.config/batchencode/defaults.toml`.
///
/// Returns `None` when the home directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    let home = env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("batchencode")
            .join("defaults.toml"),
    )
}
