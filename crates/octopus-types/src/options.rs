use std::collections::BTreeMap;

use crate::error::{QpError, Result};
use crate::value::ArgValue;

/// Option key forcing the linear/quadratic classification
pub const OPT_LINEAR: &str = "linear";
/// Option key forcing the nonnegative/general-bounds classification
pub const OPT_NONNEGATIVE: &str = "nonnegative";

/// Open-ended key/value options passed with a QP call.
///
/// Keys are interpreted by whoever reads them; unknown keys are kept but ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QpOptions {
    entries: BTreeMap<String, ArgValue>,
}

impl QpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(entries: BTreeMap<String, ArgValue>) -> Self {
        QpOptions { entries }
    }

    pub fn with(mut self, key: &str, value: impl Into<ArgValue>) -> Self {
        self.entries.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<ArgValue>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Read a boolean option. Real scalars follow the host rule: non-zero is true.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        let Some(value) = self.entries.get(key) else {
            return Ok(None);
        };

        if let ArgValue::Bool(b) = value {
            return Ok(Some(*b));
        }

        match value.as_real_scalar() {
            Some(v) if v.is_nan() => Err(QpError::invalid_argument(
                format!("opts.{}", key),
                "a logical scalar, not NaN",
            )),
            Some(v) => Ok(Some(v != 0.0)),
            None => Err(QpError::invalid_argument(
                format!("opts.{}", key),
                format!("a logical scalar, got {}", value.type_name()),
            )),
        }
    }
}
