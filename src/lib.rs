pub mod common;
pub mod config;
pub mod map;
pub mod scenario;
pub mod solver;
mod stat;

pub use common::{Agent, Path, Solution, SolverError};
pub use map::{Map, MovementType};
pub use solver::{solve, solve_with_time_limit, Solver, CBS};
pub use stat::Stats;
