//! Indexed binary min-heap over node ids.
//!
//! Ordered by each node's `combined_cost`. Every node records its own heap
//! slot so a decreased key can be sifted up in place. Keys may only
//! decrease while a node is open.

use super::node_map::{NodeId, NodeMap};
use crate::error::SearchError;

#[derive(Debug, Default)]
pub struct OpenSet {
    heap: Vec<NodeId>,
}

impl OpenSet {
    pub fn new() -> Self {
        Self {
            heap: Vec::with_capacity(1024),
        }
    }

    /// Add a node that is not currently open
    pub fn insert(&mut self, nodes: &mut NodeMap, id: NodeId) -> Result<(), SearchError> {
        if nodes[id].is_open() {
            return Err(SearchError::AlreadyOpen {
                cell: nodes[id].cell,
            });
        }
        let slot = self.heap.len();
        self.heap.push(id);
        nodes[id].heap_position = Some(slot);
        self.sift_up(nodes, slot);
        Ok(())
    }

    /// Restore heap order after the node's key was decreased
    pub fn update(&mut self, nodes: &mut NodeMap, id: NodeId) {
        if let Some(slot) = nodes[id].heap_position {
            self.sift_up(nodes, slot);
        }
    }

    /// Take the open node with the smallest key
    pub fn remove_min(&mut self, nodes: &mut NodeMap) -> Option<NodeId> {
        if self.heap.is_empty() {
            return None;
        }
        let min = self.heap.swap_remove(0);
        nodes[min].heap_position = None;
        if let Some(&moved) = self.heap.first() {
            nodes[moved].heap_position = Some(0);
            self.sift_down(nodes, 0);
        }
        Some(min)
    }

    #[inline]
    pub fn is_open(&self, nodes: &NodeMap, id: NodeId) -> bool {
        nodes[id].is_open()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[inline]
    fn key(nodes: &NodeMap, id: NodeId) -> f64 {
        nodes[id].combined_cost
    }

    fn swap(&mut self, nodes: &mut NodeMap, a: usize, b: usize) {
        self.heap.swap(a, b);
        nodes[self.heap[a]].heap_position = Some(a);
        nodes[self.heap[b]].heap_position = Some(b);
    }

    fn sift_up(&mut self, nodes: &mut NodeMap, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if Self::key(nodes, self.heap[slot]) >= Self::key(nodes, self.heap[parent]) {
                break;
            }
            self.swap(nodes, slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, nodes: &mut NodeMap, mut slot: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * slot + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let smaller = if right < len
                && Self::key(nodes, self.heap[right]) < Self::key(nodes, self.heap[left])
            {
                right
            } else {
                left
            };
            if Self::key(nodes, self.heap[smaller]) >= Self::key(nodes, self.heap[slot]) {
                break;
            }
            self.swap(nodes, slot, smaller);
            slot = smaller;
        }
    }
}
