//! Scripting-host stand-in: reads positional `quadprog` arguments from JSON,
//! routes them through the normalizer and router, and renders the
//! `[x, fval, info]` triple back as JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::info;

use octopus_problem::parse_quadprog_args;
use octopus_solver::{BackendKind, ClarabelBackend, QpRouter, RouterConfig, SolveResult};
use octopus_types::{ArgValue, QpError, Result};

/// Problem file layout: `{"args": [H, f, Aineq, bineq, ...]}`
#[derive(Debug, Clone, Deserialize)]
pub struct ProblemFile {
    pub args: Vec<JsonValue>,
}

impl ProblemFile {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| QpError::Serialization(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| QpError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&contents)
    }

    pub fn to_args(&self) -> Result<Vec<ArgValue>> {
        self.args.iter().map(ArgValue::from_json).collect()
    }
}

/// `info` struct returned next to `x` and `fval`
#[derive(Debug, Clone, Serialize)]
pub struct SolveInfo {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
    pub route: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolveOutput {
    pub x: Vec<JsonValue>,
    pub fval: JsonValue,
    pub info: SolveInfo,
}

/// Solve `args` with the Clarabel backend on the route picked by `config`
pub fn run(args: &[ArgValue], config: &RouterConfig) -> Result<SolveResult> {
    let problem = parse_quadprog_args(args)?;
    let backend = ClarabelBackend::with_settings(config.clarabel.clone());
    let router = QpRouter::new(config.clone());

    info!(backend = ?config.backend, "solving problem");

    match config.backend {
        BackendKind::Clarabel => router.solve(problem, &backend),
        BackendKind::Dense => router.solve_dense(problem, &backend),
    }
}

pub fn render(result: &SolveResult) -> SolveOutput {
    SolveOutput {
        x: result.x().iter().map(|&v| encode_f64(v)).collect(),
        fval: encode_f64(result.objective_value()),
        info: SolveInfo {
            status: result.status().as_str().to_string(),
            iterations: result.iterations(),
            route: result
                .kind()
                .map(|k| k.as_str())
                .unwrap_or("dense")
                .to_string(),
        },
    }
}

/// JSON has no non-finite numbers; write them as strings the reader understands
pub fn encode_f64(v: f64) -> JsonValue {
    if v.is_nan() {
        JsonValue::String("nan".to_string())
    } else if v == f64::INFINITY {
        JsonValue::String("inf".to_string())
    } else if v == f64::NEG_INFINITY {
        JsonValue::String("-inf".to_string())
    } else {
        serde_json::json!(v)
    }
}
