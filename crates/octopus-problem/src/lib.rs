mod normalize;
mod problem;

pub use normalize::{parse_quadprog_args, MAX_ARGS, MIN_ARGS, QPROG_USAGE};
pub use problem::QpProblem;
