use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::{Error, Result};

/// One catalog entry. Unknown fields are rejected when loading a catalog.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub name: String,
    pub input_size: usize,
    pub description: String,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>, input_size: usize, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_size,
            description: description.into(),
        }
    }
}

/// Ordered, read-only catalog of model configurations.
#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    configs: Vec<ModelConfig>,
}

impl ModelRegistry {
    /// The decision models shipped with the agent SDK.
    pub fn builtin() -> Self {
        Self {
            configs: vec![
                // price, volume, RSI, MACD, ...
                ModelConfig::new("trading-signal", 10, "Trading signal classifier (buy/sell/hold)"),
                // TVL, APY, liquidity, age, ...
                ModelConfig::new("opportunity-detector", 8, "DeFi opportunity scorer"),
                // contract age, holders, audit, ...
                ModelConfig::new("risk-scorer", 6, "Protocol/token risk assessment"),
                // text embedding
                ModelConfig::new("sentiment-classifier", 128, "Text sentiment analyzer"),
                ModelConfig::new("threshold-checker", 4, "General threshold checker"),
                // time series features
                ModelConfig::new("anomaly-detector", 16, "Anomaly/outlier detection"),
            ],
        }
    }

    pub fn from_configs(configs: Vec<ModelConfig>) -> Result<Self> {
        let mut seen = HashSet::new();
        for config in &configs {
            check_model_name(&config.name)?;
            if !seen.insert(config.name.as_str()) {
                return Err(Error::Catalog(format!(
                    "model `{}` is listed more than once",
                    config.name
                )));
            }
        }
        Ok(Self { configs })
    }

    /// Parses a JSON array of `{name, input_size, description}` objects.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let configs: Vec<ModelConfig> =
            serde_json::from_str(raw).map_err(|e| Error::Catalog(e.to_string()))?;
        Self::from_configs(configs)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json_str(&raw)
    }

    pub fn list(&self) -> &[ModelConfig] {
        &self.configs
    }

    pub fn get(&self, name: &str) -> Result<&ModelConfig> {
        self.configs
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::ConfigNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

/// Names become `<name>.onnx` inside the output directory, so they are limited
/// to ASCII letters, digits, `-`, `_` and `.`, and may not start with `.`.
pub fn check_model_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Catalog("model name must not be empty".to_string()));
    }
    let valid = !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(Error::Catalog(format!(
            "model name `{name}` is not a plain file name"
        )));
    }
    Ok(())
}
