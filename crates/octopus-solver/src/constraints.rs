use nalgebra::{DMatrix, DVector};
use octopus_problem::QpProblem;
use serde::{Deserialize, Serialize};

use crate::backend::{BoundsRef, ConstraintSystem};

/// Relation of a constraint row to its right-hand side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    LessEqual,
    Equal,
    GreaterEqual,
}

/// A bound split into a finiteness flag and a value.
///
/// `value` is only meaningful when `is_finite` is set. NaN counts as not finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecomposedBound {
    pub is_finite: bool,
    pub value: f64,
}

impl DecomposedBound {
    pub fn finite_value(&self) -> Option<f64> {
        self.is_finite.then_some(self.value)
    }
}

/// Decompose a bound vector entry by entry
pub fn decompose_bound(v: &DVector<f64>) -> Vec<DecomposedBound> {
    v.iter()
        .map(|&value| DecomposedBound {
            is_finite: value.is_finite(),
            value,
        })
        .collect()
}

/// Decomposed lower and upper bounds of every variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableBounds {
    pub lower: Vec<DecomposedBound>,
    pub upper: Vec<DecomposedBound>,
}

impl VariableBounds {
    pub fn from_problem(problem: &QpProblem) -> Self {
        VariableBounds {
            lower: decompose_bound(&problem.lb),
            upper: decompose_bound(&problem.ub),
        }
    }

    /// True iff every variable is exactly `0 <= x_i` with no upper bound
    pub fn is_nonnegative_orthant(&self) -> bool {
        self.lower
            .iter()
            .zip(&self.upper)
            .all(|(lo, up)| lo.is_finite && lo.value == 0.0 && !up.is_finite)
    }

    pub fn as_bounds(&self) -> BoundsRef<'_> {
        BoundsRef {
            lower: &self.lower,
            upper: &self.upper,
        }
    }
}

/// Inequality rows (`<=`) stacked above equality rows (`=`)
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedConstraints {
    pub a: DMatrix<f64>,
    pub b: DVector<f64>,
    pub relations: Vec<Relation>,
}

impl JoinedConstraints {
    pub fn join(problem: &QpProblem) -> Self {
        let n_ineq = problem.n_ineq;
        let m = problem.num_constraints();

        let mut a = DMatrix::zeros(m, problem.n_vars);
        a.rows_mut(0, n_ineq).copy_from(&problem.a_ineq);
        a.rows_mut(n_ineq, problem.n_eq).copy_from(&problem.a_eq);

        let mut b = DVector::zeros(m);
        b.rows_mut(0, n_ineq).copy_from(&problem.b_ineq);
        b.rows_mut(n_ineq, problem.n_eq).copy_from(&problem.b_eq);

        let mut relations = vec![Relation::LessEqual; n_ineq];
        relations.resize(m, Relation::Equal);

        JoinedConstraints { a, b, relations }
    }

    pub fn as_system(&self) -> ConstraintSystem<'_> {
        ConstraintSystem {
            a: &self.a,
            b: &self.b,
            relations: &self.relations,
        }
    }
}

/// Constraint rows with finite bounds folded in.
///
/// Row order is fixed since dual values and active sets are reported by
/// position: equality rows, original inequality rows, then per variable its
/// lower-bound row (if finite) followed by its upper-bound row (if finite).
#[derive(Debug, Clone, PartialEq)]
pub struct FoldedConstraints {
    pub a: DMatrix<f64>,
    pub b: DVector<f64>,
    pub relations: Vec<Relation>,
    /// Number of leading equality rows
    pub n_eq: usize,
    /// Number of original inequality rows following the equalities
    pub n_ineq: usize,
}

impl FoldedConstraints {
    pub fn fold(problem: &QpProblem) -> Self {
        let n = problem.n_vars;
        let bounds = VariableBounds::from_problem(problem);

        let n_bound_rows = bounds
            .lower
            .iter()
            .chain(&bounds.upper)
            .filter(|bound| bound.is_finite)
            .count();
        let m = problem.n_eq + problem.n_ineq + n_bound_rows;

        let mut a = DMatrix::zeros(m, n);
        let mut b = DVector::zeros(m);
        let mut relations = Vec::with_capacity(m);

        a.rows_mut(0, problem.n_eq).copy_from(&problem.a_eq);
        b.rows_mut(0, problem.n_eq).copy_from(&problem.b_eq);
        relations.resize(problem.n_eq, Relation::Equal);

        a.rows_mut(problem.n_eq, problem.n_ineq).copy_from(&problem.a_ineq);
        b.rows_mut(problem.n_eq, problem.n_ineq).copy_from(&problem.b_ineq);
        relations.resize(problem.n_eq + problem.n_ineq, Relation::LessEqual);

        let mut row = problem.n_eq + problem.n_ineq;
        for i in 0..n {
            if let Some(lo) = bounds.lower[i].finite_value() {
                a[(row, i)] = 1.0;
                b[row] = lo;
                relations.push(Relation::GreaterEqual);
                row += 1;
            }
            if let Some(up) = bounds.upper[i].finite_value() {
                a[(row, i)] = 1.0;
                b[row] = up;
                relations.push(Relation::LessEqual);
                row += 1;
            }
        }

        FoldedConstraints {
            a,
            b,
            relations,
            n_eq: problem.n_eq,
            n_ineq: problem.n_ineq,
        }
    }

    pub fn num_constraints(&self) -> usize {
        self.a.nrows()
    }

    /// Bound rows appended after the original constraints
    pub fn num_bound_rows(&self) -> usize {
        self.num_constraints() - self.n_eq - self.n_ineq
    }

    pub fn as_system(&self) -> ConstraintSystem<'_> {
        ConstraintSystem {
            a: &self.a,
            b: &self.b,
            relations: &self.relations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded_problem() -> QpProblem {
        let mut p = QpProblem::unconstrained(DMatrix::identity(3, 3), DVector::zeros(3));
        p.lb = DVector::from_vec(vec![0.0, f64::NEG_INFINITY, 5.0]);
        p.ub = DVector::from_vec(vec![f64::INFINITY, 10.0, 5.0]);
        p
    }

    #[test]
    fn test_decompose_bounds() {
        let bounds = VariableBounds::from_problem(&bounded_problem());

        let view = bounds.as_bounds();
        let lower: Vec<Option<f64>> =
            view.lower.iter().map(DecomposedBound::finite_value).collect();
        let upper: Vec<Option<f64>> =
            view.upper.iter().map(DecomposedBound::finite_value).collect();

        assert_eq!(lower, vec![Some(0.0), None, Some(5.0)]);
        assert_eq!(upper, vec![None, Some(10.0), Some(5.0)]);
        assert!(!bounds.is_nonnegative_orthant());
    }

    #[test]
    fn test_nan_bound_is_not_finite() {
        let decomposed = decompose_bound(&DVector::from_vec(vec![f64::NAN]));
        assert!(!decomposed[0].is_finite);
    }

    #[test]
    fn test_nonnegative_orthant() {
        let mut p = QpProblem::unconstrained(DMatrix::identity(2, 2), DVector::zeros(2));
        p.lb = DVector::zeros(2);
        assert!(VariableBounds::from_problem(&p).is_nonnegative_orthant());

        p.ub[1] = 3.0;
        assert!(!VariableBounds::from_problem(&p).is_nonnegative_orthant());

        p.ub[1] = f64::INFINITY;
        p.lb[0] = -0.0;
        assert!(VariableBounds::from_problem(&p).is_nonnegative_orthant());

        p.lb[0] = 1e-12;
        assert!(!VariableBounds::from_problem(&p).is_nonnegative_orthant());
    }

    #[test]
    fn test_fold_bound_rows_in_fixed_order() {
        let folded = FoldedConstraints::fold(&bounded_problem());

        assert_eq!(folded.num_constraints(), 4);
        assert_eq!(folded.num_bound_rows(), 4);

        // x0 >= 0, x1 <= 10, x2 >= 5, x2 <= 5
        let expected = [
            (0, Relation::GreaterEqual, 0.0),
            (1, Relation::LessEqual, 10.0),
            (2, Relation::GreaterEqual, 5.0),
            (2, Relation::LessEqual, 5.0),
        ];
        for (row, (var, rel, rhs)) in expected.iter().enumerate() {
            let mut unit = DVector::zeros(3);
            unit[*var] = 1.0;
            assert_eq!(folded.a.row(row).transpose(), unit, "row {}", row);
            assert_eq!(folded.relations[row], *rel, "row {}", row);
            assert_eq!(folded.b[row], *rhs, "row {}", row);
        }
    }

    #[test]
    fn test_fold_puts_equalities_first() {
        let mut p = bounded_problem();
        p.n_ineq = 1;
        p.a_ineq = DMatrix::from_row_slice(1, 3, &[1.0, 1.0, 1.0]);
        p.b_ineq = DVector::from_vec(vec![7.0]);
        p.n_eq = 1;
        p.a_eq = DMatrix::from_row_slice(1, 3, &[1.0, -1.0, 0.0]);
        p.b_eq = DVector::from_vec(vec![2.0]);

        let folded = FoldedConstraints::fold(&p);
        assert_eq!(folded.num_constraints(), 6);
        assert_eq!(folded.relations[0], Relation::Equal);
        assert_eq!(folded.b[0], 2.0);
        assert_eq!(folded.relations[1], Relation::LessEqual);
        assert_eq!(folded.b[1], 7.0);
        assert_eq!(folded.a[(1, 2)], 1.0);
        assert_eq!(folded.relations[2], Relation::GreaterEqual);
    }

    #[test]
    fn test_join_puts_inequalities_first() {
        let mut p = QpProblem::unconstrained(DMatrix::identity(2, 2), DVector::zeros(2));
        p.n_ineq = 2;
        p.a_ineq = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        p.b_ineq = DVector::from_vec(vec![1.0, 2.0]);
        p.n_eq = 1;
        p.a_eq = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        p.b_eq = DVector::from_vec(vec![3.0]);

        let joined = JoinedConstraints::join(&p);
        assert_eq!(joined.a.shape(), (3, 2));
        assert_eq!(joined.b, DVector::from_vec(vec![1.0, 2.0, 3.0]));
        assert_eq!(
            joined.relations,
            vec![Relation::LessEqual, Relation::LessEqual, Relation::Equal]
        );
        assert_eq!(joined.a.row(2)[0], 1.0);
        assert_eq!(joined.a.row(2)[1], 1.0);
    }

    #[test]
    fn test_join_empty_blocks() {
        let p = QpProblem::unconstrained(DMatrix::identity(2, 2), DVector::zeros(2));
        let joined = JoinedConstraints::join(&p);
        assert_eq!(joined.a.shape(), (0, 2));
        assert!(joined.relations.is_empty());
    }
}
