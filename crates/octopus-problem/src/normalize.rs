use nalgebra::{DMatrix, DVector};
use tracing::debug;

use octopus_types::{ArgValue, QpError, QpOptions, Result};

use crate::problem::QpProblem;

/// Fewest positional arguments accepted (H, f, Aineq, bineq)
pub const MIN_ARGS: usize = 4;
/// Most positional arguments accepted (..., Aeq, beq, lb, ub, x0, opts)
pub const MAX_ARGS: usize = 10;

/// Usage text shown when the call has the wrong arity
pub const QPROG_USAGE: &str =
    "[x, fval, info] = quadprog(H, f, Aineq, bineq, Aeq, beq, lb, ub, x0, options)";

const SQUARE: &str = "a square matrix";
const ROWS_OF_H: &str = "a column vector with the same rows as H";
const COLUMNS_OF_H: &str = "a matrix with the same columns as H";

/// Normalize a positional `quadprog` argument list into a [`QpProblem`].
///
/// Arguments, in order: `H, f, Aineq, bineq[, Aeq, beq, lb, ub, x0, opts]`.
/// Optional arguments that are missing or `[]` take their defaults: no
/// equality rows, `lb = -inf`, `ub = +inf`, `x0 = 0`, no options. Scalars are
/// accepted wherever the target dimension is exactly one.
///
/// Fails with [`QpError::Usage`] when the arity is outside `[4, 10]` and with
/// [`QpError::InvalidArgument`] naming the first offending argument otherwise.
pub fn parse_quadprog_args(args: &[ArgValue]) -> Result<QpProblem> {
    if args.len() < MIN_ARGS || args.len() > MAX_ARGS {
        return Err(QpError::Usage);
    }

    let h = parse_h(&args[0])?;
    let n_vars = h.nrows();

    let f = parse_f(&args[1], n_vars)?;

    // Inequalities
    let a_ineq = constraint_matrix(Some(&args[2]), n_vars, "Aineq")?;
    let n_ineq = a_ineq.nrows();
    let b_ineq = rhs_vector(Some(&args[3]), n_ineq, "bineq", "Aineq")?;

    // Equalities
    let a_eq = constraint_matrix(args.get(4), n_vars, "Aeq")?;
    let n_eq = a_eq.nrows();
    let b_eq = rhs_vector(args.get(5), n_eq, "beq", "Aeq")?;

    // Bounds and starting point
    let lb = variable_vector(args.get(6), n_vars, "lb", f64::NEG_INFINITY)?;
    let ub = variable_vector(args.get(7), n_vars, "ub", f64::INFINITY)?;
    let x0 = variable_vector(args.get(8), n_vars, "x0", 0.0)?;

    let options = match args.get(9) {
        None => QpOptions::new(),
        Some(ArgValue::Map(map)) => QpOptions::from_map(map.clone()),
        Some(_) => return Err(QpError::invalid_argument("opts", "a struct")),
    };

    debug!(n_vars, n_ineq, n_eq, n_options = options.len(), "normalized quadprog arguments");

    Ok(QpProblem {
        n_vars,
        n_ineq,
        n_eq,
        h,
        f,
        a_ineq,
        b_ineq,
        a_eq,
        b_eq,
        lb,
        ub,
        x0,
        options,
    })
}

fn parse_h(value: &ArgValue) -> Result<DMatrix<f64>> {
    if let Some(v) = value.as_real_scalar() {
        return Ok(DMatrix::from_element(1, 1, v));
    }

    match value.as_real_matrix() {
        Some(m) if m.nrows() == m.ncols() && m.nrows() > 0 => Ok(m.clone()),
        _ => Err(QpError::invalid_argument("H", SQUARE)),
    }
}

fn parse_f(value: &ArgValue, n_vars: usize) -> Result<DVector<f64>> {
    if let Some(v) = value.as_real_scalar() {
        if n_vars != 1 {
            return Err(QpError::invalid_argument("f", ROWS_OF_H));
        }
        return Ok(DVector::from_element(1, v));
    }

    match value.as_column_vector() {
        Some(v) if v.len() == n_vars => Ok(v),
        _ => Err(QpError::invalid_argument("f", ROWS_OF_H)),
    }
}

/// Constraint block with `n_vars` columns; absent or `[]` means no rows
fn constraint_matrix(value: Option<&ArgValue>, n_vars: usize, name: &str) -> Result<DMatrix<f64>> {
    let value = match value {
        Some(v) if !v.is_zero_by_zero() => v,
        _ => return Ok(DMatrix::zeros(0, n_vars)),
    };

    if let Some(v) = value.as_real_scalar() {
        if n_vars != 1 {
            return Err(QpError::invalid_argument(name, COLUMNS_OF_H));
        }
        return Ok(DMatrix::from_element(1, 1, v));
    }

    match value.as_real_matrix() {
        Some(m) if m.ncols() == n_vars => Ok(m.clone()),
        _ => Err(QpError::invalid_argument(name, COLUMNS_OF_H)),
    }
}

/// Right-hand side matching a constraint block of `rows` rows
fn rhs_vector(
    value: Option<&ArgValue>,
    rows: usize,
    name: &str,
    block: &str,
) -> Result<DVector<f64>> {
    let expected = || {
        QpError::invalid_argument(name, format!("a column vector with the same rows as {}", block))
    };

    let value = match value {
        Some(v) if !v.is_zero_by_zero() => v,
        _ if rows == 0 => return Ok(DVector::zeros(0)),
        _ => return Err(expected()),
    };

    if let Some(v) = value.as_real_scalar() {
        if rows != 1 {
            return Err(expected());
        }
        return Ok(DVector::from_element(1, v));
    }

    match value.as_column_vector() {
        Some(v) if v.len() == rows => Ok(v),
        _ => Err(expected()),
    }
}

/// Per-variable vector (bounds, starting point), filled with `default` when absent
fn variable_vector(
    value: Option<&ArgValue>,
    n_vars: usize,
    name: &str,
    default: f64,
) -> Result<DVector<f64>> {
    let value = match value {
        Some(v) if !v.is_zero_by_zero() => v,
        _ => return Ok(DVector::from_element(n_vars, default)),
    };

    if let Some(v) = value.as_real_scalar() {
        if n_vars != 1 {
            return Err(QpError::invalid_argument(name, ROWS_OF_H));
        }
        return Ok(DVector::from_element(1, v));
    }

    match value.as_column_vector() {
        Some(v) if v.len() == n_vars => Ok(v),
        _ => Err(QpError::invalid_argument(name, ROWS_OF_H)),
    }
}
