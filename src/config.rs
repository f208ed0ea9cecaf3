//! Engine configuration.
//!
//! The defaults reproduce the reference behavior; a TOML file can override them:
//!
//! ```toml
//! virtual_evidence = "renormalize"
//! cpt_tolerance = 1e-4
//! ```

use crate::error::PptcError;
use serde::{Deserialize, Serialize};
use std::{fs::read_to_string, path::Path};

/// How likelihoods of `EvidenceType::Virtual` evidence are brought into range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VirtualEvidenceMode {
    /// Each likelihood is clamped to `[0, 1]` independently.
    #[default]
    Clamp,
    /// Negative likelihoods become 0, then the vector is scaled so its maximum is 1. An
    /// all-zero vector carries no information and becomes all ones.
    Renormalize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub virtual_evidence: VirtualEvidenceMode,
    /// Allowed deviation from 1.0 of a CPT row sum before a warning is logged.
    pub cpt_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            virtual_evidence: VirtualEvidenceMode::Clamp,
            cpt_tolerance: 1e-6,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, PptcError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads the configuration at `path`. A missing file yields the default configuration.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PptcError> {
        tracing::debug!("Attempting to read engine config from: {:?}", path.as_ref());
        if !path.as_ref().exists() {
            tracing::debug!("Config file not found, using default engine config.");
            return Ok(EngineConfig::default());
        }
        let content = read_to_string(path)?;
        EngineConfig::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, PptcError> {
        Ok(toml::to_string(self)?)
    }
}
