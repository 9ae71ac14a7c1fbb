use nalgebra::{DMatrix, DVector};
use octopus_types::Result;
use serde::{Deserialize, Serialize};

use crate::constraints::{DecomposedBound, FoldedConstraints, Relation};

/// Outcome of a solve, as reported by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    /// The backend could not factor or converge (non-decomposable H, stalled iterations, ...)
    NumericalFailure,
}

impl SolveStatus {
    /// Status string reported back to the scripting host
    pub fn as_str(&self) -> &'static str {
        match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::NumericalFailure => "numerical-failure",
        }
    }

    pub fn is_optimal(&self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }
}

/// Raw solution from a solver backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Primal point in original variable order
    pub x: Vec<f64>,
    pub objective: f64,
    pub status: SolveStatus,
    pub iterations: Option<usize>,
}

/// Constraint rows `A x (rel) b`, one relation per row
#[derive(Debug, Clone, Copy)]
pub struct ConstraintSystem<'a> {
    pub a: &'a DMatrix<f64>,
    pub b: &'a DVector<f64>,
    pub relations: &'a [Relation],
}

impl ConstraintSystem<'_> {
    pub fn num_vars(&self) -> usize {
        self.a.ncols()
    }

    pub fn num_constraints(&self) -> usize {
        self.a.nrows()
    }
}

/// Per-variable bounds for the general-bounds entry points
#[derive(Debug, Clone, Copy)]
pub struct BoundsRef<'a> {
    pub lower: &'a [DecomposedBound],
    pub upper: &'a [DecomposedBound],
}

/// Solver capability with one entry point per problem subtype.
///
/// All entry points minimize `0.5 * x^T H x + f^T x` (with `H = 0` for the
/// linear ones) over the given constraint rows. The nonnegative variants
/// additionally imply `x >= 0` and no other bounds. Infeasible, unbounded and
/// numerically failed outcomes are reported through [`Solution::status`];
/// `Err` is reserved for the backend itself failing.
pub trait SolverCapability {
    fn solve_linear(
        &self,
        system: ConstraintSystem<'_>,
        bounds: BoundsRef<'_>,
        f: &DVector<f64>,
    ) -> Result<Solution>;

    fn solve_linear_nonnegative(
        &self,
        system: ConstraintSystem<'_>,
        f: &DVector<f64>,
    ) -> Result<Solution>;

    fn solve_quadratic(
        &self,
        system: ConstraintSystem<'_>,
        bounds: BoundsRef<'_>,
        h: &DMatrix<f64>,
        f: &DVector<f64>,
    ) -> Result<Solution>;

    fn solve_quadratic_nonnegative(
        &self,
        system: ConstraintSystem<'_>,
        h: &DMatrix<f64>,
        f: &DVector<f64>,
    ) -> Result<Solution>;
}

/// Dense QP solver taking bounds folded into the constraint rows
/// (Goldfarb-Idnani style): equality rows first, then inequalities, then
/// bound rows, as laid out by [`FoldedConstraints`].
///
/// `H` must be positive definite; anything else is reported as
/// [`SolveStatus::NumericalFailure`].
pub trait DenseQpSolver {
    fn solve_dense(
        &self,
        h: &DMatrix<f64>,
        f: &DVector<f64>,
        constraints: &FoldedConstraints,
    ) -> Result<Solution>;
}
