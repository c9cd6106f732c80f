mod astar;

pub(crate) use astar::a_star_search;

use crate::common::Path;
use crate::solver::comm::LowLevelNode;

/// Walks parent indices back to the search root. Parents are always
/// allocated before their children, so a plain index chase suffices.
pub(crate) fn construct_path(arena: &[LowLevelNode], goal_index: usize) -> Path {
    let mut path = Vec::new();
    let mut current = Some(goal_index);
    while let Some(index) = current {
        path.push(arena[index].position);
        current = arena[index].parent;
    }
    path.reverse();
    path
}
