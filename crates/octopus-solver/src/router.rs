use nalgebra::DMatrix;
use octopus_problem::{parse_quadprog_args, QpProblem};
use octopus_types::{ArgValue, QpError, Result, OPT_LINEAR, OPT_NONNEGATIVE};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{DenseQpSolver, Solution, SolveStatus, SolverCapability};
use crate::config::RouterConfig;
use crate::constraints::{FoldedConstraints, JoinedConstraints, VariableBounds};

/// Problem subtype selecting one of the four capability entry points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProblemKind {
    LinearNonnegative,
    LinearGeneral,
    QuadraticNonnegative,
    QuadraticGeneral,
}

impl ProblemKind {
    pub fn from_flags(is_linear: bool, is_nonnegative: bool) -> Self {
        match (is_linear, is_nonnegative) {
            (true, true) => ProblemKind::LinearNonnegative,
            (true, false) => ProblemKind::LinearGeneral,
            (false, true) => ProblemKind::QuadraticNonnegative,
            (false, false) => ProblemKind::QuadraticGeneral,
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, ProblemKind::LinearNonnegative | ProblemKind::LinearGeneral)
    }

    pub fn is_nonnegative(&self) -> bool {
        matches!(self, ProblemKind::LinearNonnegative | ProblemKind::QuadraticNonnegative)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemKind::LinearNonnegative => "linear-nonnegative",
            ProblemKind::LinearGeneral => "linear-general",
            ProblemKind::QuadraticNonnegative => "quadratic-nonnegative",
            ProblemKind::QuadraticGeneral => "quadratic-general",
        }
    }
}

/// True iff every entry of `h` is exactly `0.0`.
///
/// No tolerance is applied: an `H` carrying rounding noise is treated as
/// quadratic. Pass the `linear` option to override.
pub fn is_zero_quadratic(h: &DMatrix<f64>) -> bool {
    h.iter().all(|&v| v == 0.0)
}

/// Result of a routed solve. Immutable once built.
///
/// For non-optimal outcomes the objective is not a value of the problem:
/// `-inf` when unbounded, NaN when infeasible or numerically failed. Use
/// [`SolveResult::optimum`] to get a point only when one was found.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    x: Vec<f64>,
    objective_value: f64,
    status: SolveStatus,
    iterations: Option<usize>,
    kind: Option<ProblemKind>,
}

impl SolveResult {
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    pub fn iterations(&self) -> Option<usize> {
        self.iterations
    }

    /// Route taken; `None` for the dense route, which is not classified
    pub fn kind(&self) -> Option<ProblemKind> {
        self.kind
    }

    pub fn optimum(&self) -> Option<(&[f64], f64)> {
        self.status
            .is_optimal()
            .then_some((self.x.as_slice(), self.objective_value))
    }

    pub fn into_parts(self) -> (Vec<f64>, f64, SolveStatus) {
        (self.x, self.objective_value, self.status)
    }
}

/// Classifies normalized problems and dispatches them to a solver
#[derive(Debug, Clone, Default)]
pub struct QpRouter {
    config: RouterConfig,
}

impl QpRouter {
    pub fn new(config: RouterConfig) -> Self {
        QpRouter { config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Decide the problem subtype.
    ///
    /// `linear` and `nonnegative` options win over auto-detection. Otherwise
    /// the problem is linear iff `H` is exactly zero, and nonnegative iff every
    /// variable has `lb = 0` and no upper bound.
    pub fn classify(&self, problem: &QpProblem) -> Result<ProblemKind> {
        let bounds = VariableBounds::from_problem(problem);
        self.classify_with(problem, &bounds)
    }

    fn classify_with(&self, problem: &QpProblem, bounds: &VariableBounds) -> Result<ProblemKind> {
        let linear_opt = problem.options.get_bool(OPT_LINEAR)?;
        let nonnegative_opt = problem.options.get_bool(OPT_NONNEGATIVE)?;

        let mut is_linear = match linear_opt {
            Some(v) => v,
            None => is_zero_quadratic(&problem.h),
        };

        let is_nonnegative = if self.config.legacy_nonnegative_option {
            if let Some(v) = nonnegative_opt {
                if v != is_linear {
                    warn!(
                        nonnegative = v,
                        "legacy option handling: 'nonnegative' overrides the linear flag"
                    );
                }
                is_linear = v;
            }
            bounds.is_nonnegative_orthant()
        } else {
            match nonnegative_opt {
                Some(v) => v,
                None => bounds.is_nonnegative_orthant(),
            }
        };

        debug!(
            is_linear,
            is_nonnegative,
            linear_forced = linear_opt.is_some(),
            nonnegative_forced = nonnegative_opt.is_some(),
            "classified problem"
        );

        Ok(ProblemKind::from_flags(is_linear, is_nonnegative))
    }

    /// Classify `problem` and solve it with the matching capability entry point
    pub fn solve(&self, problem: QpProblem, solver: &dyn SolverCapability) -> Result<SolveResult> {
        problem.validate()?;

        let bounds = VariableBounds::from_problem(&problem);
        let kind = self.classify_with(&problem, &bounds)?;
        let joined = JoinedConstraints::join(&problem);
        let system = joined.as_system();

        info!(
            route = kind.as_str(),
            n_vars = problem.n_vars,
            n_constraints = system.num_constraints(),
            "dispatching QP"
        );

        let solution = match kind {
            ProblemKind::LinearNonnegative => solver.solve_linear_nonnegative(system, &problem.f),
            ProblemKind::LinearGeneral => {
                solver.solve_linear(system, bounds.as_bounds(), &problem.f)
            }
            ProblemKind::QuadraticNonnegative => {
                solver.solve_quadratic_nonnegative(system, &problem.h, &problem.f)
            }
            ProblemKind::QuadraticGeneral => {
                solver.solve_quadratic(system, bounds.as_bounds(), &problem.h, &problem.f)
            }
        }?;

        finish(problem.n_vars, solution, Some(kind))
    }

    /// Solve `problem` with a dense solver, bounds folded into the constraint rows
    pub fn solve_dense(
        &self,
        problem: QpProblem,
        solver: &dyn DenseQpSolver,
    ) -> Result<SolveResult> {
        problem.validate()?;

        let folded = FoldedConstraints::fold(&problem);

        info!(
            route = "dense",
            n_vars = problem.n_vars,
            n_eq = folded.n_eq,
            n_constraints = folded.num_constraints(),
            "dispatching QP"
        );

        let solution = solver.solve_dense(&problem.h, &problem.f, &folded)?;
        finish(problem.n_vars, solution, None)
    }
}

/// Normalize a backend solution into a [`SolveResult`]
fn finish(n_vars: usize, solution: Solution, kind: Option<ProblemKind>) -> Result<SolveResult> {
    let Solution {
        x,
        objective,
        status,
        iterations,
    } = solution;

    let x = if x.len() == n_vars {
        x
    } else if status.is_optimal() {
        return Err(QpError::Backend(format!(
            "solver returned {} primal values for {} variables",
            x.len(),
            n_vars
        )));
    } else {
        vec![f64::NAN; n_vars]
    };

    let objective_value = match status {
        SolveStatus::Optimal => objective,
        SolveStatus::Unbounded => f64::NEG_INFINITY,
        SolveStatus::Infeasible | SolveStatus::NumericalFailure => f64::NAN,
    };

    if status.is_optimal() {
        info!(objective = objective_value, iterations = ?iterations, "QP solved");
    } else {
        warn!(status = status.as_str(), iterations = ?iterations, "QP not solved to optimality");
    }

    Ok(SolveResult {
        x,
        objective_value,
        status,
        iterations,
        kind,
    })
}

/// Normalize `args` and solve through the classified capability route
pub fn solve_qp(args: &[ArgValue], solver: &dyn SolverCapability) -> Result<SolveResult> {
    let problem = parse_quadprog_args(args)?;
    QpRouter::default().solve(problem, solver)
}

/// Normalize `args` and solve through the dense folded-bounds route
pub fn solve_qp_dense(args: &[ArgValue], solver: &dyn DenseQpSolver) -> Result<SolveResult> {
    let problem = parse_quadprog_args(args)?;
    QpRouter::default().solve_dense(problem, solver)
}
