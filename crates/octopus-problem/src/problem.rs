use nalgebra::{DMatrix, DVector};

use octopus_types::{QpError, QpOptions, Result};

/// Fully dimensioned QP problem:
///
/// ```text
/// minimize    0.5 * x^T H x + f^T x
/// subject to  Aineq x <= bineq
///             Aeq x    = beq
///             lb <= x <= ub
/// ```
///
/// Built by [`crate::parse_quadprog_args`], which guarantees the dimensions
/// are mutually consistent. Empty constraint blocks are stored as
/// `0 x n_vars` matrices with length-0 right-hand sides.
#[derive(Debug, Clone, PartialEq)]
pub struct QpProblem {
    pub n_vars: usize,
    pub n_ineq: usize,
    pub n_eq: usize,
    /// Quadratic term H (n_vars x n_vars, assumed symmetric)
    pub h: DMatrix<f64>,
    /// Linear term f
    pub f: DVector<f64>,
    pub a_ineq: DMatrix<f64>,
    pub b_ineq: DVector<f64>,
    pub a_eq: DMatrix<f64>,
    pub b_eq: DVector<f64>,
    /// Lower bounds, `-inf` where unbounded
    pub lb: DVector<f64>,
    /// Upper bounds, `+inf` where unbounded
    pub ub: DVector<f64>,
    /// Starting point for solvers that iterate from a seed
    pub x0: DVector<f64>,
    pub options: QpOptions,
}

impl QpProblem {
    /// Unconstrained problem with default bounds and starting point
    pub fn unconstrained(h: DMatrix<f64>, f: DVector<f64>) -> Self {
        let n = f.len();
        QpProblem {
            n_vars: n,
            n_ineq: 0,
            n_eq: 0,
            h,
            f,
            a_ineq: DMatrix::zeros(0, n),
            b_ineq: DVector::zeros(0),
            a_eq: DMatrix::zeros(0, n),
            b_eq: DVector::zeros(0),
            lb: DVector::from_element(n, f64::NEG_INFINITY),
            ub: DVector::from_element(n, f64::INFINITY),
            x0: DVector::zeros(n),
            options: QpOptions::new(),
        }
    }

    /// Total rows of the joined inequality + equality system
    pub fn num_constraints(&self) -> usize {
        self.n_ineq + self.n_eq
    }

    /// Validate problem dimensions
    pub fn validate(&self) -> Result<()> {
        let n = self.n_vars;

        if n == 0 {
            return Err(QpError::Dimension("problem has no variables".to_string()));
        }

        if self.h.nrows() != n || self.h.ncols() != n {
            return Err(QpError::Dimension(format!(
                "H must be {}x{}, got {}x{}",
                n,
                n,
                self.h.nrows(),
                self.h.ncols()
            )));
        }

        check_vector("f", &self.f, n)?;
        check_block("Aineq", "bineq", &self.a_ineq, &self.b_ineq, self.n_ineq, n)?;
        check_block("Aeq", "beq", &self.a_eq, &self.b_eq, self.n_eq, n)?;
        check_vector("lb", &self.lb, n)?;
        check_vector("ub", &self.ub, n)?;
        check_vector("x0", &self.x0, n)?;

        Ok(())
    }
}

fn check_vector(name: &str, v: &DVector<f64>, n: usize) -> Result<()> {
    if v.len() != n {
        return Err(QpError::Dimension(format!(
            "{} must have length {}, got {}",
            name,
            n,
            v.len()
        )));
    }
    Ok(())
}

fn check_block(
    a_name: &str,
    b_name: &str,
    a: &DMatrix<f64>,
    b: &DVector<f64>,
    rows: usize,
    n: usize,
) -> Result<()> {
    if a.nrows() != rows || a.ncols() != n {
        return Err(QpError::Dimension(format!(
            "{} must be {}x{}, got {}x{}",
            a_name,
            rows,
            n,
            a.nrows(),
            a.ncols()
        )));
    }
    check_vector(b_name, b, rows)
}
