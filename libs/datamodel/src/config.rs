use serde::Deserialize;

use crate::encoder::EncoderStyle;
use crate::error::DatamodelError;

/// Context settings, parsed from TOML.
///
/// ```toml
/// [encoder]
/// style = "compact"
///
/// [extensions]
/// frozen_by_default = true
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatamodelConfig {
    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub extensions: ExtensionsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncoderConfig {
    #[serde(default)]
    pub style: EncoderStyle,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionsConfig {
    /// Register `extension::frozen_by_default`.
    #[serde(default)]
    pub frozen_by_default: bool,
}

impl DatamodelConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, DatamodelError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DatamodelError::Config(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, DatamodelError> {
        toml::from_str(toml_str).map_err(|e| DatamodelError::Config(e.to_string()))
    }
}
