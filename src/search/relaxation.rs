//! FIFO relaxation fallback strategy.
//!
//! Improved nodes are re-queued in arrival order instead of priority
//! order. Slower and not optimal under a deadline. A node queued as many
//! times as there are visited cells means the cost model never settles;
//! that aborts the search. The threshold is a coarse alarm, not a proof
//! of a negative cycle.

use std::collections::VecDeque;

use super::engine::{Session, Stop};
use super::node_map::Node;
use crate::error::SearchError;
use crate::movement::{Move, MoveModel};

pub(super) fn run<M: MoveModel + ?Sized>(
    session: &mut Session<M>,
) -> Result<(Stop, usize), SearchError> {
    let mut queue = VecDeque::with_capacity(1024);
    let start = session.start_id;
    session.nodes[start].queued = true;
    session.nodes[start].relax_count = 1;
    queue.push_back(start);
    let mut successors = Vec::with_capacity(Move::ALL.len());

    loop {
        if session.cancelled() {
            return Ok((Stop::Cancelled, queue.len()));
        }
        if session.tick_expansion()? {
            return Ok((Stop::TimedOut, queue.len()));
        }
        let Some(current) = queue.pop_front() else {
            return Ok((Stop::Exhausted, 0));
        };
        session.nodes[current].queued = false;

        let cell = session.nodes[current].cell;
        if session.goal.is_in_goal(cell) {
            return Ok((Stop::Goal(current), queue.len()));
        }

        session.successors(cell, &mut successors)?;
        for succ in successors.iter() {
            let neighbor = session.node_for(succ.cell)?;
            if !session.relax(current, neighbor, succ.cost) || session.nodes[neighbor].queued {
                continue;
            }
            let visited = session.nodes.len();
            enqueue(&mut session.nodes[neighbor], visited)?;
            queue.push_back(neighbor);
        }
    }
}

/// Mark a node queued and enforce the re-expansion cap
fn enqueue(node: &mut Node, visited: usize) -> Result<(), SearchError> {
    node.queued = true;
    node.relax_count += 1;
    if node.relax_count >= visited {
        return Err(SearchError::NonConvergentCost {
            cell: node.cell,
            relaxations: node.relax_count,
            visited,
        });
    }
    Ok(())
}
