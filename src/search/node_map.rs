//! Per-search node arena keyed by spatial hash.
//!
//! Nodes are addressed by a dense [`NodeId`] assigned on first visit.
//! Predecessor links and open-set entries hold ids, never references, so
//! the whole forest lives in one `Vec` and is dropped with the search.

use std::ops::{Index, IndexMut};

use rustc_hash::FxHashMap;

use crate::core::Cell;
use crate::error::SearchError;

/// Dense index of a node within one [`NodeMap`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Search state attached to one visited cell.
#[derive(Clone, Debug)]
pub struct Node {
    pub cell: Cell,
    /// Cost from the start; +inf until first relaxed
    pub cost: f64,
    /// Goal heuristic, computed once on creation
    pub estimated_cost_to_goal: f64,
    /// Open-set priority key
    pub combined_cost: f64,
    pub previous: Option<NodeId>,
    /// Slot in the open-set heap, `None` when not open
    pub heap_position: Option<usize>,
    /// Expanded; never reopened by the priority strategies
    pub closed: bool,
    /// Sitting in the relaxation queue
    pub queued: bool,
    /// Times the relaxation strategy queued this node
    pub relax_count: usize,
}

impl Node {
    fn new(cell: Cell, heuristic: f64) -> Self {
        Self {
            cell,
            cost: f64::INFINITY,
            estimated_cost_to_goal: heuristic,
            combined_cost: f64::INFINITY,
            previous: None,
            heap_position: None,
            closed: false,
            queued: false,
            relax_count: 0,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.heap_position.is_some()
    }
}

/// Lazily populated map from cell to node.
#[derive(Debug, Default)]
pub struct NodeMap {
    nodes: Vec<Node>,
    index: FxHashMap<u64, NodeId>,
}

impl NodeMap {
    /// Empty map sized for a typical search
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Node for the cell, created with cost +inf on first visit.
    ///
    /// `heuristic` is only evaluated for new nodes. Two distinct cells
    /// sharing a spatial key is reported instead of silently aliased.
    pub fn get_or_create(
        &mut self,
        cell: Cell,
        heuristic: impl FnOnce(Cell) -> f64,
    ) -> Result<NodeId, SearchError> {
        let key = cell.spatial_key();
        if let Some(&id) = self.index.get(&key) {
            let existing = self.nodes[id.index()].cell;
            if existing != cell {
                return Err(SearchError::HashCollision {
                    key,
                    existing,
                    requested: cell,
                });
            }
            return Ok(id);
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(cell, heuristic(cell)));
        self.index.insert(key, id);
        Ok(id)
    }

    /// Existing node for the cell, if visited
    pub fn get(&self, cell: Cell) -> Option<NodeId> {
        self.index
            .get(&cell.spatial_key())
            .copied()
            .filter(|id| self.nodes[id.index()].cell == cell)
    }

    /// Number of distinct cells visited
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }
}

impl Index<NodeId> for NodeMap {
    type Output = Node;

    #[inline]
    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

impl IndexMut<NodeId> for NodeMap {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }
}
