use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::Instant;

use tracing::{debug, instrument, trace};

use super::construct_path;
use crate::common::{Agent, Path, SolverError};
use crate::map::Map;
use crate::solver::comm::{ConstraintSet, LowLevelNode, LowLevelOpenEntry};
use crate::stat::Stats;

/// Steps searched past the point where the last constraint stops binding.
const HORIZON_SLACK: usize = 2;

/// Time-expanded A* over `(row, col, t)` states. Returns the shortest
/// time-indexed path from the agent's start at `start_time` to its goal
/// under the given constraints, or `None` when the open list drains or the
/// horizon is exceeded. Search state lives in a per-call arena and is
/// dropped on return.
#[instrument(skip_all, name = "a_star", fields(agent = agent.id, start = ?agent.start, goal = ?agent.goal), level = "debug")]
pub(crate) fn a_star_search(
    map: &Map,
    agent: &Agent,
    start_time: usize,
    constraints: &ConstraintSet,
    deadline: Option<Instant>,
    stats: &mut Stats,
) -> Result<Option<Path>, SolverError> {
    debug!("searching under {} constraints", constraints.len());

    if !map.is_passable(agent.start.0, agent.start.1)
        || !map.is_passable(agent.goal.0, agent.goal.1)
    {
        return Ok(None);
    }
    if constraints.has_vertex(agent.id, agent.start, start_time) {
        return Ok(None);
    }

    // Waiting out constraints never pays past the newest one by more than a
    // full sweep of the grid; anything beyond that is no-path.
    let horizon = map.height * map.width + constraints.max_time_for(agent.id) + HORIZON_SLACK;
    // Goal-camping rule: the path may not end while the goal cell is still
    // forbidden at some later time.
    let latest_goal_constraint = constraints.latest_vertex_time_at(agent.id, agent.goal);

    let mut arena: Vec<LowLevelNode> = Vec::new();
    let mut open_list = BinaryHeap::new();
    let mut closed_list: HashSet<((usize, usize), usize)> = HashSet::new();
    let mut best_g: HashMap<((usize, usize), usize), f64> = HashMap::new();

    let start_h = map.heuristic(agent.start.0, agent.start.1, agent.goal.0, agent.goal.1);
    arena.push(LowLevelNode {
        position: agent.start,
        time_step: start_time,
        g_cost: 0.0,
        parent: None,
    });
    best_g.insert((agent.start, start_time), 0.0);
    open_list.push(LowLevelOpenEntry {
        index: 0,
        f_cost: start_h,
        g_cost: 0.0,
    });

    while let Some(entry) = open_list.pop() {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(SolverError::Timeout);
        }

        let current = arena[entry.index].clone();
        let state = (current.position, current.time_step);

        // A state closes once, with its final g; later heap entries for the
        // same state are stale.
        if !closed_list.insert(state) {
            continue;
        }

        stats.low_level_expand_nodes += 1;
        trace!("expand {state:?} g={}", current.g_cost);

        if current.position == agent.goal
            && latest_goal_constraint.is_none_or(|t| current.time_step > t)
        {
            return Ok(Some(construct_path(&arena, entry.index)));
        }

        let next_time = current.time_step + 1;
        if next_time > horizon {
            continue;
        }

        // Wait is a self-successor costed 1; edge constraints never forbid
        // waiting.
        let mut successors = vec![(current.position, 1.0)];
        for &neighbor in map.get_neighbors(current.position.0, current.position.1) {
            successors.push((
                neighbor,
                map.move_cost(
                    current.position.0,
                    current.position.1,
                    neighbor.0,
                    neighbor.1,
                ),
            ));
        }

        for (next_position, step_cost) in successors {
            if closed_list.contains(&(next_position, next_time)) {
                continue;
            }
            if constraints.has_vertex(agent.id, next_position, next_time) {
                continue;
            }
            if next_position != current.position
                && constraints.has_edge(
                    agent.id,
                    current.position,
                    next_position,
                    current.time_step,
                )
            {
                continue;
            }

            let tentative_g = current.g_cost + step_cost;
            let known_g = best_g
                .get(&(next_position, next_time))
                .copied()
                .unwrap_or(f64::INFINITY);
            if tentative_g >= known_g {
                continue;
            }

            best_g.insert((next_position, next_time), tentative_g);
            let h_cost = map.heuristic(
                next_position.0,
                next_position.1,
                agent.goal.0,
                agent.goal.1,
            );
            arena.push(LowLevelNode {
                position: next_position,
                time_step: next_time,
                g_cost: tentative_g,
                parent: Some(entry.index),
            });
            open_list.push(LowLevelOpenEntry {
                index: arena.len() - 1,
                f_cost: tentative_g + h_cost,
                g_cost: tentative_g,
            });
        }
    }

    debug!("no path within horizon {horizon}");
    Ok(None)
}
