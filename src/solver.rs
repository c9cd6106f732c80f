mod algorithm;
mod cbs;
mod comm;

pub use cbs::CBS;
pub use comm::{
    detect_conflicts, Conflict, ConflictKind, ConstraintSet, EdgeConstraint, VertexConstraint,
};

use std::time::Duration;

use crate::common::{Agent, Solution, SolverError};
use crate::map::Map;

pub trait Solver {
    fn solve(&mut self) -> Result<Solution, SolverError>;
}

/// Plans every agent on the map, minimizing the sum of path lengths. Pure
/// function of its inputs: identical calls return identical plans.
pub fn solve(map: &Map, agents: Vec<Agent>) -> Result<Solution, SolverError> {
    CBS::new(agents, map).solve()
}

/// Same as [`solve`] with a wall-clock budget; expiry reports
/// [`SolverError::Timeout`].
pub fn solve_with_time_limit(
    map: &Map,
    agents: Vec<Agent>,
    limit: Duration,
) -> Result<Solution, SolverError> {
    CBS::new(agents, map).with_time_limit(limit).solve()
}
