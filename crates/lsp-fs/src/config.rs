//! Settings file loading

use crate::{Error, Result, io};
use serde::de::DeserializeOwned;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
}

impl Format {
    fn detect(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match extension.as_str() {
            "json" | "sublime-settings" => Ok(Self::Json),
            _ => Err(Error::UnsupportedFormat { extension }),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Json => "JSON",
        }
    }
}

/// Read-only configuration store.
///
/// Detects the format from the file extension. Editor settings files
/// (`.sublime-settings`) are JSON.
#[derive(Debug, Default)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a file.
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let format = Format::detect(path)?;
        let content = io::read_text(path)?;
        let parse_error = |message: String| Error::ConfigParse {
            path: path.to_path_buf(),
            format: format.name().into(),
            message,
        };

        match format {
            Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
        }
    }

    /// Load configuration, falling back to `T::default()` when the file is absent.
    pub fn load_or_default<T: DeserializeOwned + Default>(&self, path: &Path) -> Result<T> {
        if !path.is_file() {
            tracing::debug!(?path, "No settings file, using defaults");
            return Ok(T::default());
        }
        self.load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Sample {
        #[serde(default)]
        nodejs_runtime: Vec<String>,
    }

    #[test]
    fn test_sublime_settings_parsed_as_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lsp_utils.sublime-settings");
        std::fs::write(&path, r#"{"nodejs_runtime": ["local"]}"#).unwrap();

        let sample: Sample = ConfigStore::new().load(&path).unwrap();
        assert_eq!(sample.nodejs_runtime, vec!["local".to_string()]);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.ini");
        std::fs::write(&path, "x=1").unwrap();

        let result: Result<Sample> = ConfigStore::new().load(&path);
        assert!(matches!(result, Err(Error::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let temp = TempDir::new().unwrap();
        let sample: Sample = ConfigStore::new()
            .load_or_default(&temp.path().join("absent.json"))
            .unwrap();
        assert_eq!(sample, Sample::default());
    }

    #[test]
    fn test_toml_is_not_a_settings_format() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.toml");
        std::fs::write(&path, "nodejs_runtime = []").unwrap();

        let result: Result<Sample> = ConfigStore::new().load(&path);
        assert!(matches!(result, Err(Error::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lsp_utils.sublime-settings");
        std::fs::write(&path, "{\"nodejs_runtime\": [").unwrap();

        let result: Result<Sample> = ConfigStore::new().load(&path);
        assert!(matches!(result, Err(Error::ConfigParse { .. })));
    }
}
