use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::map::Map;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Agent {
    pub id: usize,
    pub start: (usize, usize),
    pub goal: (usize, usize),
}

impl Agent {
    pub fn verify(&self, map: &Map) -> bool {
        map.is_passable(self.start.0, self.start.1) && map.is_passable(self.goal.0, self.goal.1)
    }
}

/// Time-indexed cell sequence; the index is the absolute time step.
pub type Path = Vec<(usize, usize)>;

/// Everything `solve` can fail with. Per-agent no-path during constraint
/// tree expansion is not an error, it only drops that branch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no conflict-free solution exists")]
    Unsolvable,
    #[error("deadline exceeded before a solution was found")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub paths: Vec<Path>,
}

impl Solution {
    /// Sum of path lengths, waits and moves counted equally.
    pub fn cost(&self) -> usize {
        self.paths.iter().map(|path| path.len()).sum()
    }

    /// Re-checks the solution from scratch: endpoints, per-step legality
    /// under the map's movement model, and conflict freedom with finished
    /// agents parked on their goals.
    pub fn verify(&self, map: &Map, agents: &[Agent]) -> bool {
        if self.paths.len() != agents.len() {
            error!("incomplete solution");
            return false;
        }

        for (path, agent) in self.paths.iter().zip(agents.iter()) {
            if path.first().is_none_or(|&s| s != agent.start)
                || path.last().is_none_or(|&g| g != agent.goal)
            {
                error!(
                    "endpoints failed: path {:?}..{:?}, agent start {:?} goal {:?}",
                    path.first(),
                    path.last(),
                    agent.start,
                    agent.goal
                );
                return false;
            }

            for window in path.windows(2) {
                if let [from, to] = window {
                    let wait = from == to;
                    if !wait && !map.get_neighbors(from.0, from.1).contains(to) {
                        error!("illegal step {from:?} -> {to:?}");
                        return false;
                    }
                }
            }
        }

        let max_path_length = self.paths.iter().map(|p| p.len()).max().unwrap_or(0);

        for time_step in 0..max_path_length {
            let mut seen_positions = HashSet::new();
            let mut seen_edges = HashSet::new();

            for path in &self.paths {
                let pos = path.get(time_step).unwrap_or_else(|| path.last().unwrap());
                if !map.is_passable(pos.0, pos.1) {
                    error!("impassable cell {pos:?}");
                    return false;
                }

                if !seen_positions.insert(pos) {
                    error!("vertex conflict at {pos:?} time {time_step}");
                    return false;
                }

                if time_step >= 1 && time_step < path.len() {
                    let prev_pos = &path[time_step - 1];
                    if prev_pos != pos {
                        let reverse_edge = (pos, prev_pos);
                        if seen_edges.contains(&reverse_edge) || !seen_edges.insert((prev_pos, pos))
                        {
                            error!("edge conflict on {prev_pos:?} -> {pos:?} time {time_step}");
                            return false;
                        }
                    }
                }
            }
        }

        true
    }

    pub fn log_solution(&self) {
        let mut formatted_solution = String::new();
        for (index, path) in self.paths.iter().enumerate() {
            formatted_solution.push_str(&format!(" agent{}:\n", index));
            for (t, &(row, col)) in path.iter().enumerate() {
                formatted_solution.push_str(&format!(
                    "   - row: {}\n     col: {}\n     t: {}\n",
                    row, col, t
                ));
            }
        }
        debug!("solution:\n{}", formatted_solution);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_map() -> Map {
        Map::from_str(
            "type manhattan\nheight 3\nwidth 3\nmap\n...\n...\n...\n",
        )
        .unwrap()
    }

    fn agents() -> Vec<Agent> {
        vec![
            Agent {
                id: 0,
                start: (0, 0),
                goal: (0, 2),
            },
            Agent {
                id: 1,
                start: (2, 0),
                goal: (2, 2),
            },
        ]
    }

    #[test]
    fn test_verify_accepts_disjoint_paths() {
        let solution = Solution {
            paths: vec![
                vec![(0, 0), (0, 1), (0, 2)],
                vec![(2, 0), (2, 1), (2, 2)],
            ],
        };
        assert!(solution.verify(&open_map(), &agents()));
        assert_eq!(solution.cost(), 6);
    }

    #[test]
    fn test_verify_rejects_wrong_endpoint() {
        let solution = Solution {
            paths: vec![
                vec![(0, 0), (0, 1)],
                vec![(2, 0), (2, 1), (2, 2)],
            ],
        };
        assert!(!solution.verify(&open_map(), &agents()));
    }

    #[test]
    fn test_verify_rejects_teleport() {
        let solution = Solution {
            paths: vec![
                vec![(0, 0), (0, 2), (0, 2)],
                vec![(2, 0), (2, 1), (2, 2)],
            ],
        };
        assert!(!solution.verify(&open_map(), &agents()));
    }

    #[test]
    fn test_verify_rejects_vertex_conflict_after_arrival() {
        // Agent 0 finishes at (0, 2) at t=2 and parks there; agent 1
        // drives through the parked cell at t=3.
        let agents = vec![
            Agent {
                id: 0,
                start: (0, 0),
                goal: (0, 2),
            },
            Agent {
                id: 1,
                start: (2, 2),
                goal: (0, 1),
            },
        ];
        let solution = Solution {
            paths: vec![
                vec![(0, 0), (0, 1), (0, 2)],
                vec![(2, 2), (2, 2), (1, 2), (0, 2), (0, 1)],
            ],
        };
        assert!(!solution.verify(&open_map(), &agents));
    }

    #[test]
    fn test_verify_rejects_swap() {
        let agents = vec![
            Agent {
                id: 0,
                start: (0, 0),
                goal: (0, 1),
            },
            Agent {
                id: 1,
                start: (0, 1),
                goal: (0, 0),
            },
        ];
        let solution = Solution {
            paths: vec![vec![(0, 0), (0, 1)], vec![(0, 1), (0, 0)]],
        };
        assert!(!solution.verify(&open_map(), &agents));
    }
}
