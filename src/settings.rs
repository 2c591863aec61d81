use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::clients::errors::{Error, Result};

const CONFIG_FILE_NAME: &str = "search_api.json";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Settings for the music search API, read from a JSON file such as
/// `{"url": "http://api.example.com/song"}`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    /// Base endpoint used for both search (`?word=`) and resolve (`?id=`) requests
    pub url: String,
    /// Timeout for search and resolve requests. Downloads are not bounded by it.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ApiSettings {
    pub fn new(url: impl Into<String>) -> Self {
        ApiSettings {
            url: url.into(),
            timeout_secs: None,
        }
    }

    /// Load settings from `path`. A missing file, malformed JSON or an absent/empty `url`
    /// are all configuration errors.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigurationError(format!(
                "cannot read config file {}: {e}",
                path.display()
            ))
        })?;
        let settings = Self::from_json(&contents)?;
        debug!("Loaded API settings from {path:?}");
        Ok(settings)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let settings: ApiSettings = serde_json::from_str(contents)
            .map_err(|e| Error::ConfigurationError(format!("malformed config: {e}")))?;
        if settings.url.trim().is_empty() {
            return Err(Error::ConfigurationError(
                "config field `url` must not be empty".into(),
            ));
        }
        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    // Used when neither `--config` nor TUNEFETCH_CONFIG is given
    pub fn default_path() -> PathBuf {
        match dirs::config_dir() {
            Some(dir) => dir.join("tunefetch").join(CONFIG_FILE_NAME),
            None => PathBuf::from(CONFIG_FILE_NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_url_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"url": "http://api.example.com/song"}}"#).unwrap();

        let settings = ApiSettings::load(file.path()).unwrap();
        assert_eq!(settings.url, "http://api.example.com/song");
        assert_eq!(settings.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn custom_timeout() {
        let settings =
            ApiSettings::from_json(r#"{"url": "http://x", "timeout_secs": 3}"#).unwrap();
        assert_eq!(settings.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ApiSettings::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }

    #[test]
    fn malformed_json_is_configuration_error() {
        let err = ApiSettings::from_json("{ url: ").unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }

    #[test]
    fn missing_or_empty_url_is_configuration_error() {
        assert!(matches!(
            ApiSettings::from_json(r#"{"timeout_secs": 5}"#),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            ApiSettings::from_json(r#"{"url": "  "}"#),
            Err(Error::ConfigurationError(_))
        ));
    }
}
