use std::collections::{BTreeSet, HashSet};
use std::time::{Duration, Instant};

use tracing::debug;

use super::comm::HighLevelOpenNode;
use super::Solver;
use crate::common::{Agent, Solution, SolverError};
use crate::map::Map;
use crate::stat::Stats;

/// Conflict-Based Search: best-first search over the constraint tree,
/// optimal for sum-of-costs. Children are dropped only when their agent has
/// no path under the child's constraints; there is no other pruning, so the
/// search stays complete. Unsolvable-by-deadlock instances (a pure swap in
/// a corridor) never exhaust the tree and are cut off by the deadline.
pub struct CBS {
    agents: Vec<Agent>,
    map: Map,
    time_limit: Option<Duration>,
    stats: Stats,
}

impl CBS {
    pub fn new(agents: Vec<Agent>, map: &Map) -> Self {
        CBS {
            agents,
            map: map.clone(),
            time_limit: None,
            stats: Stats::default(),
        }
    }

    /// Wall-clock budget, checked between high-level expansions and between
    /// low-level expansions.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    fn validate(&self) -> Result<(), SolverError> {
        for (index, agent) in self.agents.iter().enumerate() {
            if agent.id != index {
                return Err(SolverError::InvalidInput(format!(
                    "agent ids must be dense and in order, found id {} at index {index}",
                    agent.id
                )));
            }
            if !self.map.is_passable(agent.start.0, agent.start.1) {
                return Err(SolverError::InvalidInput(format!(
                    "agent {} start {:?} is blocked or out of bounds",
                    agent.id, agent.start
                )));
            }
            if !self.map.is_passable(agent.goal.0, agent.goal.1) {
                return Err(SolverError::InvalidInput(format!(
                    "agent {} goal {:?} is blocked or out of bounds",
                    agent.id, agent.goal
                )));
            }
        }

        let mut starts = HashSet::new();
        let mut goals = HashSet::new();
        for agent in &self.agents {
            if !starts.insert(agent.start) {
                return Err(SolverError::InvalidInput(format!(
                    "agents share start cell {:?}",
                    agent.start
                )));
            }
            if !goals.insert(agent.goal) {
                return Err(SolverError::InvalidInput(format!(
                    "agents share goal cell {:?}",
                    agent.goal
                )));
            }
        }
        Ok(())
    }
}

impl Solver for CBS {
    fn solve(&mut self) -> Result<Solution, SolverError> {
        let solve_start = Instant::now();
        self.validate()?;
        let deadline = self.time_limit.map(|limit| solve_start + limit);

        let mut open = BTreeSet::new();
        let mut next_node_id: u64 = 1;

        let root = HighLevelOpenNode::new(&self.agents, &self.map, deadline, &mut self.stats)?
            .ok_or(SolverError::Unsolvable)?;
        open.insert(root);

        while let Some(current_node) = open.pop_first() {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(SolverError::Timeout);
            }

            if let Some(conflict) = current_node.conflicts.first() {
                debug!(
                    "expand node {}: cost {}, resolving {conflict:?}",
                    current_node.node_id, current_node.cost
                );

                for resolve_first in [true, false] {
                    if let Some(child) = current_node.update_constraint(
                        conflict,
                        resolve_first,
                        &self.agents,
                        &self.map,
                        next_node_id,
                        deadline,
                        &mut self.stats,
                    )? {
                        next_node_id += 1;
                        self.stats.high_level_expand_nodes += 1;
                        open.insert(child);
                    }
                }
            } else {
                self.stats.costs = current_node.cost;
                self.stats.time_ms = solve_start.elapsed().as_millis() as usize;
                self.stats.print();
                return Ok(Solution {
                    paths: current_node.paths,
                });
            }
        }

        Err(SolverError::Unsolvable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::solve;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();
    }

    fn open_5x5() -> Map {
        Map::from_str(
            "type manhattan\nheight 5\nwidth 5\nmap\n.....\n.....\n.....\n.....\n.....\n",
        )
        .unwrap()
    }

    fn agent(id: usize, start: (usize, usize), goal: (usize, usize)) -> Agent {
        Agent { id, start, goal }
    }

    #[test]
    fn test_solo_agent() {
        init_tracing();
        let map = open_5x5();
        let agents = vec![agent(0, (0, 0), (0, 2))];
        let mut solver = CBS::new(agents.clone(), &map);
        let solution = solver.solve().unwrap();

        assert_eq!(solution.paths, vec![vec![(0, 0), (0, 1), (0, 2)]]);
        assert_eq!(solution.cost(), 3);
        // A conflict-free root returns without growing the tree.
        assert_eq!(solver.stats().high_level_expand_nodes, 0);
    }

    #[test]
    fn test_start_equals_goal() {
        init_tracing();
        let map = open_5x5();
        let solution = solve(&map, vec![agent(0, (2, 2), (2, 2))]).unwrap();
        assert_eq!(solution.paths, vec![vec![(2, 2)]]);
    }

    #[test]
    fn test_head_on_swap() {
        init_tracing();
        let map = open_5x5();
        let agents = vec![agent(0, (0, 0), (0, 2)), agent(1, (0, 2), (0, 0))];
        let solution = solve(&map, agents.clone()).unwrap();

        assert!(solution.verify(&map, &agents));
        // One agent keeps its length-3 path, the other detours to length 5;
        // both detouring to length 4 costs the same.
        assert_eq!(solution.cost(), 8);
    }

    #[test]
    fn test_vertex_meeting_in_center() {
        init_tracing();
        let map = open_5x5();
        let agents = vec![agent(0, (0, 0), (2, 2)), agent(1, (2, 0), (0, 2))];
        let solution = solve(&map, agents.clone()).unwrap();

        assert!(solution.verify(&map, &agents));
        // Both corner-to-corner routes fit without delay.
        assert_eq!(solution.cost(), 10);
    }

    #[test]
    fn test_corridor_deadlock_hits_deadline() {
        init_tracing();
        let map = Map::from_str("type manhattan\nheight 1\nwidth 5\nmap\n.....\n").unwrap();
        let agents = vec![agent(0, (0, 0), (0, 4)), agent(1, (0, 4), (0, 0))];
        let result = CBS::new(agents, &map)
            .with_time_limit(Duration::from_millis(200))
            .solve();

        // A 1-wide corridor swap has no solution; CBS can only prove that
        // by exhausting the tree, which a swap deadlock never allows, so
        // the deadline is what reports it.
        assert_eq!(result, Err(SolverError::Timeout));
    }

    #[test]
    fn test_goal_blocking_resolved_by_detour() {
        init_tracing();
        let map = open_5x5();
        let agents = vec![agent(0, (0, 0), (0, 1)), agent(1, (0, 1), (0, 0))];
        let solution = solve(&map, agents.clone()).unwrap();

        assert!(solution.verify(&map, &agents));
        assert_eq!(solution.cost(), 6);
    }

    #[test]
    fn test_independent_agents_keep_shortest_paths() {
        init_tracing();
        let map = open_5x5();
        let agents = vec![agent(0, (0, 0), (0, 4)), agent(1, (4, 0), (4, 4))];
        let solution = solve(&map, agents.clone()).unwrap();

        assert!(solution.verify(&map, &agents));
        assert_eq!(solution.cost(), 10);
        assert_eq!(solution.paths[0].len(), 5);
        assert_eq!(solution.paths[1].len(), 5);
    }

    #[test]
    fn test_three_agents_column_crossing() {
        init_tracing();
        let map = open_5x5();
        let agents = vec![
            agent(0, (0, 2), (4, 2)),
            agent(1, (2, 0), (2, 4)),
            agent(2, (4, 2), (0, 2)),
        ];
        let solution = solve(&map, agents.clone()).unwrap();
        assert!(solution.verify(&map, &agents));
    }

    #[test]
    fn test_octile_swap() {
        init_tracing();
        let map = Map::from_str("type octile\nheight 3\nwidth 3\nmap\n...\n...\n...\n").unwrap();
        let agents = vec![agent(0, (0, 0), (2, 2)), agent(1, (2, 2), (0, 0))];
        let solution = solve(&map, agents.clone()).unwrap();
        assert!(solution.verify(&map, &agents));
    }

    #[test]
    fn test_disconnected_goal_is_unsolvable() {
        init_tracing();
        let map = Map::from_str("type manhattan\nheight 3\nwidth 3\nmap\n.@.\n@@.\n...\n").unwrap();
        let result = solve(&map, vec![agent(0, (0, 0), (2, 2))]);
        assert_eq!(result, Err(SolverError::Unsolvable));
    }

    #[test]
    fn test_duplicate_agent_id_is_invalid_input() {
        init_tracing();
        let map = open_5x5();
        let agents = vec![agent(0, (0, 0), (0, 4)), agent(0, (4, 0), (4, 4))];
        assert!(matches!(
            solve(&map, agents),
            Err(SolverError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_identical_start_and_goal_cells_are_invalid_input() {
        init_tracing();
        let map = open_5x5();
        let agents = vec![agent(0, (1, 1), (3, 3)), agent(1, (1, 1), (3, 3))];
        assert!(matches!(
            solve(&map, agents),
            Err(SolverError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_start_on_obstacle_is_invalid_input() {
        init_tracing();
        let map = Map::from_str("type manhattan\nheight 3\nwidth 3\nmap\n...\n.@.\n...\n").unwrap();
        let agents = vec![agent(0, (1, 1), (2, 2))];
        assert!(matches!(
            solve(&map, agents),
            Err(SolverError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_goal_out_of_bounds_is_invalid_input() {
        init_tracing();
        let map = open_5x5();
        let agents = vec![agent(0, (0, 0), (0, 9))];
        assert!(matches!(
            solve(&map, agents),
            Err(SolverError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_zero_time_limit_is_timeout() {
        init_tracing();
        let map = open_5x5();
        let agents = vec![agent(0, (0, 0), (4, 4))];
        let result = CBS::new(agents, &map)
            .with_time_limit(Duration::ZERO)
            .solve();
        assert_eq!(result, Err(SolverError::Timeout));
    }

    #[test]
    fn test_solve_is_deterministic() {
        init_tracing();
        let map = open_5x5();
        let agents = vec![
            agent(0, (0, 0), (0, 2)),
            agent(1, (0, 2), (0, 0)),
            agent(2, (2, 0), (2, 4)),
        ];
        let first = solve(&map, agents.clone()).unwrap();
        let second = solve(&map, agents).unwrap();
        assert_eq!(first.paths, second.paths);
    }
}
