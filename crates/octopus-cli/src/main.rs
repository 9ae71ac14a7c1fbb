use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use octopus_cli::{render, run, ProblemFile};
use octopus_problem::QPROG_USAGE;
use octopus_solver::{BackendKind, RouterConfig};
use octopus_types::Result;

/// Solve a quadratic program given as JSON-encoded quadprog arguments
#[derive(Debug, Parser)]
#[command(name = "octopus-qp", version)]
struct Args {
    /// Problem file: {"args": [H, f, Aineq, bineq, Aeq, beq, lb, ub, x0, options]}
    problem: PathBuf,

    /// Router/backend configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the dense folded-bounds route regardless of the configuration
    #[arg(long)]
    dense: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match solve(&args) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) if e.is_usage() => {
            eprintln!("usage: {}", QPROG_USAGE);
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn solve(args: &Args) -> Result<String> {
    let mut config = match &args.config {
        Some(path) => RouterConfig::from_json_file(path)?,
        None => RouterConfig::default(),
    };
    if args.dense {
        config.backend = BackendKind::Dense;
    }

    let problem = ProblemFile::from_json_file(&args.problem)?.to_args()?;
    let result = run(&problem, &config)?;

    serde_json::to_string_pretty(&render(&result))
        .map_err(|e| octopus_types::QpError::Serialization(e.to_string()))
}
