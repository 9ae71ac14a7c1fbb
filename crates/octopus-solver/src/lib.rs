mod backend;
mod clarabel_backend;
mod config;
mod constraints;
mod router;

pub use backend::{
    BoundsRef, ConstraintSystem, DenseQpSolver, Solution, SolveStatus, SolverCapability,
};
pub use clarabel_backend::ClarabelBackend;
pub use config::{BackendKind, ClarabelSettings, RouterConfig};
pub use constraints::{
    decompose_bound, DecomposedBound, FoldedConstraints, JoinedConstraints, Relation,
    VariableBounds,
};
pub use router::{is_zero_quadratic, solve_qp, solve_qp_dense, ProblemKind, QpRouter, SolveResult};
