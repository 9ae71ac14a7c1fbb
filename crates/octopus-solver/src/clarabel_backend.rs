use clarabel::algebra::CscMatrix;
use clarabel::solver::{DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};
use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};
use octopus_types::{QpError, Result};
use tracing::{debug, warn};

use crate::backend::{
    BoundsRef, ConstraintSystem, DenseQpSolver, Solution, SolveStatus, SolverCapability,
};
use crate::config::ClarabelSettings;
use crate::constraints::{FoldedConstraints, Relation};

/// Relative tolerance on the smallest eigenvalue of `H`
const PSD_TOLERANCE: f64 = 1e-9;

/// Clarabel-based solver capability (interior point, pure Rust).
///
/// Serves both the classified four-entry-point route and the dense
/// folded-bounds route. Clarabel only handles convex objectives, so a
/// quadratic term that is not positive semidefinite (positive definite on
/// the dense route) is reported as `NumericalFailure` without solving.
#[derive(Debug, Clone, Default)]
pub struct ClarabelBackend {
    settings: ClarabelSettings,
}

impl ClarabelBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: ClarabelSettings) -> Self {
        ClarabelBackend { settings }
    }

    pub fn settings(&self) -> &ClarabelSettings {
        &self.settings
    }

    /// `p` must already be symmetric
    fn run(&self, p: Option<&DMatrix<f64>>, f: &DVector<f64>, rows: ConeRows) -> Result<Solution> {
        let n = f.len();
        if rows.n != n {
            return Err(QpError::Dimension(format!(
                "constraint rows have {} columns, objective has {} variables",
                rows.n, n
            )));
        }

        let p_csc = match p {
            Some(p) => to_clarabel_csc(p, true),
            None => to_clarabel_csc(&DMatrix::zeros(n, n), true),
        };
        let (a_csc, b, cones) = rows.into_clarabel();

        let mut settings = DefaultSettings::default();
        settings.verbose = self.settings.verbose;
        settings.max_iter = self.settings.max_iter;
        settings.tol_gap_abs = self.settings.tol_gap_abs;
        settings.tol_gap_rel = self.settings.tol_gap_rel;

        debug!(n_vars = n, n_rows = b.len(), quadratic = p.is_some(), "calling clarabel");

        let mut solver = DefaultSolver::new(&p_csc, f.as_slice(), &a_csc, &b, &cones, settings);
        solver.solve();

        let status = map_status(&solver.solution.status);

        Ok(Solution {
            x: solver.solution.x.clone(),
            objective: solver.solution.obj_val,
            status,
            iterations: Some(solver.info.iterations as usize),
        })
    }

    fn run_quadratic(
        &self,
        h: &DMatrix<f64>,
        f: &DVector<f64>,
        rows: ConeRows,
    ) -> Result<Solution> {
        let p = symmetrize(h);
        if !is_positive_semidefinite(&p) {
            warn!(n_vars = f.len(), "quadratic term is not positive semidefinite");
            return Ok(non_decomposable(f.len()));
        }
        self.run(Some(&p), f, rows)
    }
}

impl SolverCapability for ClarabelBackend {
    fn solve_linear(
        &self,
        system: ConstraintSystem<'_>,
        bounds: BoundsRef<'_>,
        f: &DVector<f64>,
    ) -> Result<Solution> {
        let mut rows = ConeRows::from_system(system);
        rows.push_bounds(bounds);
        self.run(None, f, rows)
    }

    fn solve_linear_nonnegative(
        &self,
        system: ConstraintSystem<'_>,
        f: &DVector<f64>,
    ) -> Result<Solution> {
        let mut rows = ConeRows::from_system(system);
        rows.push_nonnegative();
        self.run(None, f, rows)
    }

    fn solve_quadratic(
        &self,
        system: ConstraintSystem<'_>,
        bounds: BoundsRef<'_>,
        h: &DMatrix<f64>,
        f: &DVector<f64>,
    ) -> Result<Solution> {
        let mut rows = ConeRows::from_system(system);
        rows.push_bounds(bounds);
        self.run_quadratic(h, f, rows)
    }

    fn solve_quadratic_nonnegative(
        &self,
        system: ConstraintSystem<'_>,
        h: &DMatrix<f64>,
        f: &DVector<f64>,
    ) -> Result<Solution> {
        let mut rows = ConeRows::from_system(system);
        rows.push_nonnegative();
        self.run_quadratic(h, f, rows)
    }
}

impl DenseQpSolver for ClarabelBackend {
    fn solve_dense(
        &self,
        h: &DMatrix<f64>,
        f: &DVector<f64>,
        constraints: &FoldedConstraints,
    ) -> Result<Solution> {
        // Dense solvers factor H up front and give up when it is not positive definite
        let p = symmetrize(h);
        if Cholesky::new(p.clone()).is_none() {
            warn!(n_vars = f.len(), "quadratic term is not positive definite");
            return Ok(non_decomposable(f.len()));
        }

        // Bounds are already folded into the rows
        let rows = ConeRows::from_system(constraints.as_system());
        self.run(Some(&p), f, rows)
    }
}

fn map_status(status: &SolverStatus) -> SolveStatus {
    match status {
        SolverStatus::Solved | SolverStatus::AlmostSolved => SolveStatus::Optimal,
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
            SolveStatus::Infeasible
        }
        SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
            SolveStatus::Unbounded
        }
        _ => SolveStatus::NumericalFailure,
    }
}

/// Outcome for a quadratic term the backend cannot handle
fn non_decomposable(n: usize) -> Solution {
    Solution {
        x: vec![f64::NAN; n],
        objective: f64::NAN,
        status: SolveStatus::NumericalFailure,
        iterations: None,
    }
}

/// Smallest eigenvalue of the symmetric `p` is non-negative up to a
/// tolerance relative to its largest magnitude
fn is_positive_semidefinite(p: &DMatrix<f64>) -> bool {
    if p.iter().any(|v| !v.is_finite()) {
        return false;
    }
    let eigenvalues = SymmetricEigen::new(p.clone()).eigenvalues;
    let scale = eigenvalues.amax().max(1.0);
    eigenvalues.min() >= -PSD_TOLERANCE * scale
}
/// Constraint rows in Clarabel form: `A x + s = b`, one cone per row
struct ConeRows {
    n: usize,
    /// Row-major coefficients
    coeffs: Vec<f64>,
    b: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
}

impl ConeRows {
    fn new(n: usize) -> Self {
        ConeRows {
            n,
            coeffs: Vec::new(),
            b: Vec::new(),
            cones: Vec::new(),
        }
    }

    fn from_system(system: ConstraintSystem<'_>) -> Self {
        let mut rows = ConeRows::new(system.num_vars());
        for (i, relation) in system.relations.iter().enumerate() {
            let row: Vec<f64> = system.a.row(i).iter().copied().collect();
            rows.push(&row, system.b[i], *relation);
        }
        rows
    }

    fn push(&mut self, row: &[f64], rhs: f64, relation: Relation) {
        match relation {
            // A_i x + s = b_i, s = 0
            Relation::Equal => {
                self.coeffs.extend_from_slice(row);
                self.b.push(rhs);
                self.cones.push(SupportedConeT::ZeroConeT(1));
            }
            // A_i x + s = b_i, s >= 0
            Relation::LessEqual => {
                self.coeffs.extend_from_slice(row);
                self.b.push(rhs);
                self.cones.push(SupportedConeT::NonnegativeConeT(1));
            }
            // -A_i x + s = -b_i, s >= 0
            Relation::GreaterEqual => {
                self.coeffs.extend(row.iter().map(|v| -v));
                self.b.push(-rhs);
                self.cones.push(SupportedConeT::NonnegativeConeT(1));
            }
        }
    }

    fn push_unit(&mut self, var: usize, rhs: f64, relation: Relation) {
        let mut row = vec![0.0; self.n];
        row[var] = 1.0;
        self.push(&row, rhs, relation);
    }

    /// Finite bounds as single-variable rows
    fn push_bounds(&mut self, bounds: BoundsRef<'_>) {
        for var in 0..self.n {
            if let Some(lo) = bounds.lower[var].finite_value() {
                self.push_unit(var, lo, Relation::GreaterEqual);
            }
            if let Some(up) = bounds.upper[var].finite_value() {
                self.push_unit(var, up, Relation::LessEqual);
            }
        }
    }

    fn push_nonnegative(&mut self) {
        for var in 0..self.n {
            self.push_unit(var, 0.0, Relation::GreaterEqual);
        }
    }

    fn num_rows(&self) -> usize {
        self.b.len()
    }

    fn into_clarabel(mut self) -> (CscMatrix<f64>, Vec<f64>, Vec<SupportedConeT<f64>>) {
        // Clarabel wants at least one cone; 0 <= 1 is always satisfied
        if self.num_rows() == 0 {
            let zeros = vec![0.0; self.n];
            self.push(&zeros, 1.0, Relation::LessEqual);
        }

        let a = DMatrix::from_row_slice(self.num_rows(), self.n, &self.coeffs);
        (to_clarabel_csc(&a, false), self.b, self.cones)
    }
}

/// Clarabel assumes a symmetric P and reads only its upper triangle
fn symmetrize(h: &DMatrix<f64>) -> DMatrix<f64> {
    (h + h.transpose()) * 0.5
}

/// Convert DMatrix to Clarabel CSC format, keeping only the upper
/// triangle when `upper_only` is set (Clarabel's layout for P)
fn to_clarabel_csc(mat: &DMatrix<f64>, upper_only: bool) -> CscMatrix<f64> {
    let mut colptr = vec![0];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for col in 0..mat.ncols() {
        let last_row = if upper_only { col + 1 } else { mat.nrows() };
        for (row, &val) in mat.column(col).iter().enumerate().take(last_row) {
            if val != 0.0 {
                rowval.push(row);
                nzval.push(val);
            }
        }
        colptr.push(nzval.len());
    }

    CscMatrix {
        m: mat.nrows(),
        n: mat.ncols(),
        colptr,
        rowval,
        nzval,
    }
}
