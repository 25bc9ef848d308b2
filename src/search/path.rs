//! Computed routes and predecessor-chain assembly.

use std::fmt;

use super::node_map::{NodeId, NodeMap};
use crate::core::Cell;
use crate::error::SearchError;
use crate::goal::Goal;

/// An immutable route from a start cell to a terminal cell.
#[derive(Clone, Debug)]
pub struct Path {
    positions: Vec<Cell>,
    /// Cumulative cost at each position; `costs[0] == 0`
    costs: Vec<f64>,
    goal: Goal,
    num_nodes_considered: usize,
}

impl Path {
    /// Build a path from explicit positions and cumulative costs.
    ///
    /// Returns `None` when empty or when the two sequences differ in length.
    pub fn from_parts(
        positions: Vec<Cell>,
        costs: Vec<f64>,
        goal: Goal,
        num_nodes_considered: usize,
    ) -> Option<Self> {
        if positions.is_empty() || positions.len() != costs.len() {
            return None;
        }
        Some(Self {
            positions,
            costs,
            goal,
            num_nodes_considered,
        })
    }

    /// First position
    pub fn src(&self) -> Cell {
        self.positions[0]
    }

    /// Last position
    pub fn dest(&self) -> Cell {
        self.positions[self.positions.len() - 1]
    }

    pub fn positions(&self) -> &[Cell] {
        &self.positions
    }

    /// Position index of the cell, if on the path
    pub fn index_of(&self, cell: Cell) -> Option<usize> {
        self.positions.iter().position(|&c| c == cell)
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.index_of(cell).is_some()
    }

    /// Number of positions
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always false; a path has at least its start
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn num_movements(&self) -> usize {
        self.positions.len() - 1
    }

    pub fn total_cost(&self) -> f64 {
        self.costs[self.costs.len() - 1]
    }

    /// Cost from position `from` to position `to` (indices clamp to the path)
    pub fn cost_between(&self, from: usize, to: usize) -> f64 {
        let last = self.costs.len() - 1;
        let (from, to) = (from.min(last), to.min(last));
        if to <= from {
            return 0.0;
        }
        self.costs[to] - self.costs[from]
    }

    /// Cost of the single move ending at position `index`
    pub fn step_cost(&self, index: usize) -> f64 {
        if index == 0 {
            0.0
        } else {
            self.cost_between(index - 1, index)
        }
    }

    /// Goal this path was computed against
    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    /// Distinct cells visited by the search that produced this path
    pub fn num_nodes_considered(&self) -> usize {
        self.num_nodes_considered
    }

    /// Whether the path ends inside its goal
    pub fn reaches_goal(&self) -> bool {
        self.goal.is_in_goal(self.dest())
    }

    /// Continue onto `next` from where it joins this path.
    ///
    /// `next` must start somewhere on this path; the prefix up to that cell
    /// is kept and `next` is appended. The goal and node count come from
    /// `next`.
    pub fn splice(&self, next: &Path) -> Option<Path> {
        let join = self.index_of(next.src())?;
        let mut positions = Vec::with_capacity(join + next.len());
        let mut costs = Vec::with_capacity(join + next.len());
        positions.extend_from_slice(&self.positions[..join]);
        costs.extend_from_slice(&self.costs[..join]);
        let base = self.costs[join];
        positions.extend_from_slice(&next.positions);
        costs.extend(next.costs.iter().map(|c| base + c));
        Some(Path {
            positions,
            costs,
            goal: next.goal.clone(),
            num_nodes_considered: next.num_nodes_considered,
        })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({} movements, cost {:.2})",
            self.src(),
            self.dest(),
            self.num_movements(),
            self.total_cost()
        )
    }
}

/// Walk predecessor links from `terminal` back to `start`.
///
/// A chain longer than `visited` links must contain a cycle; a chain that
/// ends anywhere but `start` is disconnected. Both are fatal.
pub fn assemble(
    nodes: &NodeMap,
    start: NodeId,
    terminal: NodeId,
    visited: usize,
    goal: &Goal,
) -> Result<Path, SearchError> {
    let mut chain = vec![terminal];
    let mut current = terminal;
    while current != start {
        let Some(previous) = nodes[current].previous else {
            return Err(SearchError::DisconnectedChain {
                terminal: nodes[terminal].cell,
                reached: nodes[current].cell,
            });
        };
        if chain.len() > visited {
            return Err(SearchError::PredecessorCycle {
                cell: nodes[current].cell,
                steps: chain.len(),
            });
        }
        chain.push(previous);
        current = previous;
    }
    chain.reverse();

    let positions = chain.iter().map(|&id| nodes[id].cell).collect();
    let costs = chain.iter().map(|&id| nodes[id].cost).collect();
    Ok(Path {
        positions,
        costs,
        goal: goal.clone(),
        num_nodes_considered: visited,
    })
}
