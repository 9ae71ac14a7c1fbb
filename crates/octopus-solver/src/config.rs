use octopus_types::{QpError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for classification and routing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Reproduce the historical option handling where an explicit
    /// `nonnegative` option overrides the linear/quadratic flag and the
    /// nonnegative flag is always auto-detected.
    pub legacy_nonnegative_option: bool,

    /// Route used by front-ends that pick a backend themselves
    pub backend: BackendKind,

    /// Settings for the Clarabel backend
    pub clarabel: ClarabelSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Classified route through the four-entry-point capability
    Clarabel,
    /// Folded-bounds route through a dense solver
    Dense,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClarabelSettings {
    pub verbose: bool,
    pub max_iter: u32,
    pub tol_gap_abs: f64,
    pub tol_gap_rel: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            legacy_nonnegative_option: false,
            backend: BackendKind::Clarabel,
            clarabel: ClarabelSettings::default(),
        }
    }
}

impl Default for ClarabelSettings {
    fn default() -> Self {
        Self {
            verbose: false,
            max_iter: 10000,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
        }
    }
}

impl RouterConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RouterConfig =
            serde_json::from_str(json).map_err(|e| QpError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| QpError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.clarabel;
        if c.max_iter == 0 {
            return Err(QpError::Config("clarabel.max_iter must be positive".to_string()));
        }
        if !(c.tol_gap_abs > 0.0 && c.tol_gap_rel > 0.0) {
            return Err(QpError::Config("clarabel tolerances must be positive".to_string()));
        }
        Ok(())
    }
}
