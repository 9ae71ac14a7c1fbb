use nalgebra::{DMatrix, DVector};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::error::{QpError, Result};

/// A loosely-typed value as handed over by the scripting host
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// The 0x0 matrix `[]`
    Empty,
    Scalar(f64),
    Matrix(DMatrix<f64>),
    Bool(bool),
    Str(String),
    Map(BTreeMap<String, ArgValue>),
}

impl ArgValue {
    /// Build a column vector value
    pub fn column(values: &[f64]) -> Self {
        ArgValue::Matrix(DMatrix::from_column_slice(values.len(), 1, values))
    }

    /// Build a matrix value from row-major data
    pub fn matrix(rows: usize, cols: usize, row_major: &[f64]) -> Self {
        ArgValue::Matrix(DMatrix::from_row_slice(rows, cols, row_major))
    }

    pub fn is_zero_by_zero(&self) -> bool {
        match self {
            ArgValue::Empty => true,
            ArgValue::Matrix(m) => m.nrows() == 0 && m.ncols() == 0,
            _ => false,
        }
    }

    /// The host keeps 1x1 numeric values as scalars, so a 1x1 matrix counts as one
    pub fn as_real_scalar(&self) -> Option<f64> {
        match self {
            ArgValue::Scalar(v) => Some(*v),
            ArgValue::Matrix(m) if m.nrows() == 1 && m.ncols() == 1 => Some(m[(0, 0)]),
            _ => None,
        }
    }

    pub fn as_real_matrix(&self) -> Option<&DMatrix<f64>> {
        match self {
            ArgValue::Matrix(m) => Some(m),
            _ => None,
        }
    }

    /// Column vector view of an n x 1 matrix
    pub fn as_column_vector(&self) -> Option<DVector<f64>> {
        match self {
            ArgValue::Matrix(m) if m.ncols() == 1 => Some(m.column(0).into_owned()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ArgValue>> {
        match self {
            ArgValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn rows(&self) -> usize {
        match self {
            ArgValue::Empty => 0,
            ArgValue::Matrix(m) => m.nrows(),
            _ => 1,
        }
    }

    pub fn columns(&self) -> usize {
        match self {
            ArgValue::Empty => 0,
            ArgValue::Matrix(m) => m.ncols(),
            _ => 1,
        }
    }

    /// Name of the value's type, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Empty => "empty matrix",
            ArgValue::Scalar(_) => "scalar",
            ArgValue::Matrix(_) => "matrix",
            ArgValue::Bool(_) => "bool",
            ArgValue::Str(_) => "string",
            ArgValue::Map(_) => "struct",
        }
    }

    /// Decode a JSON-encoded host value.
    ///
    /// `null` and `[]` are the empty matrix, a flat numeric array is a column
    /// vector, an array of equal-length arrays is a matrix given row by row and
    /// an object is a struct. Non-finite numbers are written as the strings
    /// `"inf"`, `"-inf"` and `"nan"`.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        match value {
            JsonValue::Null => Ok(ArgValue::Empty),
            JsonValue::Bool(b) => Ok(ArgValue::Bool(*b)),
            JsonValue::Number(_) => Ok(ArgValue::Scalar(json_number(value)?)),
            JsonValue::String(s) => Ok(match parse_non_finite(s) {
                Some(v) => ArgValue::Scalar(v),
                None => ArgValue::Str(s.clone()),
            }),
            JsonValue::Array(items) => matrix_from_json(items),
            JsonValue::Object(fields) => {
                let mut map = BTreeMap::new();
                for (key, field) in fields {
                    map.insert(key.clone(), ArgValue::from_json(field)?);
                }
                Ok(ArgValue::Map(map))
            }
        }
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Scalar(v)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        ArgValue::Bool(b)
    }
}

impl From<DMatrix<f64>> for ArgValue {
    fn from(m: DMatrix<f64>) -> Self {
        ArgValue::Matrix(m)
    }
}

impl From<DVector<f64>> for ArgValue {
    fn from(v: DVector<f64>) -> Self {
        let n = v.len();
        ArgValue::Matrix(DMatrix::from_column_slice(n, 1, v.as_slice()))
    }
}

fn parse_non_finite(s: &str) -> Option<f64> {
    match s.to_ascii_lowercase().as_str() {
        "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    }
}

fn json_number(value: &JsonValue) -> Result<f64> {
    match value {
        JsonValue::Number(n) => n
            .as_f64()
            .ok_or_else(|| QpError::Serialization(format!("number {} is not representable", n))),
        JsonValue::String(s) => parse_non_finite(s).ok_or_else(|| {
            QpError::invalid_argument("matrix entry", format!("numeric, got \"{}\"", s))
        }),
        other => Err(QpError::invalid_argument("matrix entry", format!("numeric, got {}", other))),
    }
}

fn matrix_from_json(items: &[JsonValue]) -> Result<ArgValue> {
    if items.is_empty() {
        return Ok(ArgValue::Empty);
    }

    // Column vector
    if !items.iter().any(JsonValue::is_array) {
        let values = items.iter().map(json_number).collect::<Result<Vec<_>>>()?;
        return Ok(ArgValue::column(&values));
    }

    let mut data = Vec::new();
    let mut cols = None;
    for row in items {
        let row = row
            .as_array()
            .ok_or_else(|| QpError::invalid_argument("matrix", "an array of rows"))?;
        match cols {
            None => cols = Some(row.len()),
            Some(c) if c != row.len() => {
                return Err(QpError::invalid_argument("matrix", "rows of equal length"));
            }
            Some(_) => {}
        }
        for entry in row {
            data.push(json_number(entry)?);
        }
    }

    let cols = cols.unwrap_or(0);
    Ok(ArgValue::matrix(items.len(), cols, &data))
}
