mod error;
mod options;
mod value;

pub use error::{QpError, Result};
pub use options::{QpOptions, OPT_LINEAR, OPT_NONNEGATIVE};
pub use value::ArgValue;
