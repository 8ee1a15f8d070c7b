use serde::{Deserialize, Serialize};

/// Conversion limits, shared by both directions.
///
/// Usually embedded in an application's own configuration:
///
/// ```toml
/// max_errors = 10
/// lowercase_fallback = false
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Stop after this many errors. `0` collects every error.
    pub max_errors: usize,

    /// When decoding a field without an explicit name, retry the lookup with
    /// the lowercased field name.
    pub lowercase_fallback: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            max_errors: 0,
            lowercase_fallback: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConvertConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
