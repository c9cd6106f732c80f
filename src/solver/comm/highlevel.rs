use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::Instant;

use tracing::debug;

use crate::common::{Agent, Path, SolverError};
use crate::map::Map;
use crate::solver::algorithm::a_star_search;
use crate::stat::Stats;

/// Forbids one agent from occupying a cell at one time step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexConstraint {
    pub agent: usize,
    pub position: (usize, usize),
    pub time_step: usize,
}

/// Forbids one agent from traversing a directed edge departing at
/// `time_step`. Waiting is never an edge traversal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeConstraint {
    pub agent: usize,
    pub from_position: (usize, usize),
    pub to_position: (usize, usize),
    pub time_step: usize,
}

/// Spatio-temporal prohibitions for the low level, keyed exactly by all
/// fields. Children of a constraint tree node extend their parent's set by
/// one element; the parent is never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSet {
    vertices: HashSet<VertexConstraint>,
    edges: HashSet<EdgeConstraint>,
}

impl ConstraintSet {
    pub fn has_vertex(&self, agent: usize, position: (usize, usize), time_step: usize) -> bool {
        self.vertices.contains(&VertexConstraint {
            agent,
            position,
            time_step,
        })
    }

    pub fn has_edge(
        &self,
        agent: usize,
        from_position: (usize, usize),
        to_position: (usize, usize),
        time_step: usize,
    ) -> bool {
        self.edges.contains(&EdgeConstraint {
            agent,
            from_position,
            to_position,
            time_step,
        })
    }

    pub fn with_vertex(&self, constraint: VertexConstraint) -> Self {
        let mut child = self.clone();
        child.vertices.insert(constraint);
        child
    }

    pub fn with_edge(&self, constraint: EdgeConstraint) -> Self {
        let mut child = self.clone();
        child.edges.insert(constraint);
        child
    }

    pub fn len(&self) -> usize {
        self.vertices.len() + self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty()
    }

    /// Last time step at which any constraint still binds the agent. Edge
    /// constraints bind through their arrival step.
    pub fn max_time_for(&self, agent: usize) -> usize {
        let vertex_max = self
            .vertices
            .iter()
            .filter(|c| c.agent == agent)
            .map(|c| c.time_step)
            .max()
            .unwrap_or(0);
        let edge_max = self
            .edges
            .iter()
            .filter(|c| c.agent == agent)
            .map(|c| c.time_step + 1)
            .max()
            .unwrap_or(0);
        vertex_max.max(edge_max)
    }

    /// Latest vertex prohibition on a cell for the agent, used for the
    /// goal-camping rule: a path may not end on a cell that is still
    /// forbidden at some later time.
    pub fn latest_vertex_time_at(&self, agent: usize, position: (usize, usize)) -> Option<usize> {
        self.vertices
            .iter()
            .filter(|c| c.agent == agent && c.position == position)
            .map(|c| c.time_step)
            .max()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    Vertex {
        position: (usize, usize),
        time_step: usize,
    },
    /// Swap across one edge, departing at `time_step`. Diagonal cross
    /// conflicts under octile movement are not modeled.
    Edge {
        from_position: (usize, usize),
        to_position: (usize, usize),
        time_step: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub agent_1: usize,
    pub agent_2: usize,
    pub kind: ConflictKind,
}

/// Scans the joint plan in time order and reports every conflict, earliest
/// first (smallest time step, then agent pair, vertex before edge). Agents
/// that have finished are treated as parked on their goal forever.
pub fn detect_conflicts(paths: &[Path]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    let max_length = paths.iter().map(Vec::len).max().unwrap_or(0);

    for step in 0..max_length {
        for i in 0..paths.len() {
            for j in (i + 1)..paths.len() {
                let path1 = &paths[i];
                let path2 = &paths[j];

                let pos1 = *path1.get(step).unwrap_or_else(|| path1.last().unwrap());
                let pos2 = *path2.get(step).unwrap_or_else(|| path2.last().unwrap());

                if pos1 == pos2 {
                    conflicts.push(Conflict {
                        agent_1: i,
                        agent_2: j,
                        kind: ConflictKind::Vertex {
                            position: pos1,
                            time_step: step,
                        },
                    });
                }

                // A swap needs both agents moving between step and step+1.
                if step + 1 >= path1.len() || step + 1 >= path2.len() {
                    continue;
                }
                let next1 = path1[step + 1];
                let next2 = path2[step + 1];
                if pos1 != next1 && pos1 == next2 && pos2 == next1 {
                    conflicts.push(Conflict {
                        agent_1: i,
                        agent_2: j,
                        kind: ConflictKind::Edge {
                            from_position: pos1,
                            to_position: next1,
                            time_step: step,
                        },
                    });
                }
            }
        }
    }

    conflicts
}

/// Constraint tree node. Immutable once built; expansion produces fresh
/// children via `update_constraint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HighLevelOpenNode {
    pub(crate) node_id: u64,
    pub(crate) constraints: ConstraintSet,
    pub(crate) paths: Vec<Path>,
    pub(crate) cost: usize,
    pub(crate) conflicts: Vec<Conflict>,
}

impl Ord for HighLevelOpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Cheapest first, then fewest conflicts, then insertion order. The
        // node id is unique, so distinct nodes never compare equal.
        self.cost
            .cmp(&other.cost)
            .then_with(|| self.conflicts.len().cmp(&other.conflicts.len()))
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

impl PartialOrd for HighLevelOpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl HighLevelOpenNode {
    /// Root of the constraint tree: every agent planned under the empty
    /// set. `Ok(None)` means some agent has no path at all.
    pub(crate) fn new(
        agents: &[Agent],
        map: &Map,
        deadline: Option<Instant>,
        stats: &mut Stats,
    ) -> Result<Option<Self>, SolverError> {
        let constraints = ConstraintSet::default();
        let mut paths = Vec::with_capacity(agents.len());

        for agent in agents {
            match a_star_search(map, agent, 0, &constraints, deadline, stats)? {
                Some(path) => paths.push(path),
                None => {
                    debug!("agent {} has no single-agent path", agent.id);
                    return Ok(None);
                }
            }
        }

        let cost = paths.iter().map(Vec::len).sum();
        let conflicts = detect_conflicts(&paths);
        debug!("root node: cost {cost}, {} conflicts", conflicts.len());

        Ok(Some(HighLevelOpenNode {
            node_id: 0,
            constraints,
            paths,
            cost,
            conflicts,
        }))
    }

    /// Child with one more constraint on one of the two conflicting agents
    /// (`resolve_first` picks which) and that agent re-planned. `Ok(None)`
    /// means the re-plan failed and the branch dies.
    pub(crate) fn update_constraint(
        &self,
        conflict: &Conflict,
        resolve_first: bool,
        agents: &[Agent],
        map: &Map,
        node_id: u64,
        deadline: Option<Instant>,
        stats: &mut Stats,
    ) -> Result<Option<HighLevelOpenNode>, SolverError> {
        let agent_to_update = if resolve_first {
            conflict.agent_1
        } else {
            conflict.agent_2
        };

        let new_constraints = match conflict.kind {
            ConflictKind::Vertex {
                position,
                time_step,
            } => self.constraints.with_vertex(VertexConstraint {
                agent: agent_to_update,
                position,
                time_step,
            }),
            ConflictKind::Edge {
                from_position,
                to_position,
                time_step,
            } => {
                // Orient the prohibition the way this agent crossed the edge.
                let (from, to) = if resolve_first {
                    (from_position, to_position)
                } else {
                    (to_position, from_position)
                };
                self.constraints.with_edge(EdgeConstraint {
                    agent: agent_to_update,
                    from_position: from,
                    to_position: to,
                    time_step,
                })
            }
        };

        let new_path = match a_star_search(
            map,
            &agents[agent_to_update],
            0,
            &new_constraints,
            deadline,
            stats,
        )? {
            Some(path) => path,
            None => return Ok(None),
        };

        debug!("re-planned agent {agent_to_update} with path {new_path:?} for {conflict:?}");

        let mut new_paths = self.paths.clone();
        let new_cost = self.cost - new_paths[agent_to_update].len() + new_path.len();
        new_paths[agent_to_update] = new_path;
        let conflicts = detect_conflicts(&new_paths);

        Ok(Some(HighLevelOpenNode {
            node_id,
            constraints: new_constraints,
            paths: new_paths,
            cost: new_cost,
            conflicts,
        }))
    }
}
