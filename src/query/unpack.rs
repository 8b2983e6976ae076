//! Path retrieval and shortcut unpacking.
//!
//! The bidirectional search leaves two trees behind; walking the parent
//! links from the meeting node yields the packed path in the contracted
//! graph. Unpacking replaces every shortcut by the two edges it bypasses,
//! driven by an explicit work stack since shortcut chains can nest deeper
//! than the call stack allows.

use anyhow::{bail, Result};

use super::facade::RoutingFacade;
use super::heap::QueryHeap;
use super::{EdgeId, NodeId, INVALID_EDGE};

/// One original edge of the unpacked path with its metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSegment {
    pub edge_id: u32,
    pub name_id: u32,
    pub turn_instruction: u8,
    pub distance: i32,
}

/// Walk both search trees from the meeting node. A node whose parent is
/// itself is the root of its tree.
pub fn retrieve_packed_path(
    forward_heap: &QueryHeap,
    reverse_heap: &QueryHeap,
    middle_node: NodeId,
) -> Vec<NodeId> {
    let mut packed_path = Vec::new();

    let mut current = middle_node;
    while current != forward_heap.get_data(current).parent {
        current = forward_heap.get_data(current).parent;
        packed_path.push(current);
    }
    packed_path.reverse();
    packed_path.push(middle_node);

    let mut current = middle_node;
    while current != reverse_heap.get_data(current).parent {
        current = reverse_heap.get_data(current).parent;
        packed_path.push(current);
    }

    packed_path
}

pub struct PathUnpacker<'a, F: RoutingFacade> {
    facade: &'a F,
}

impl<'a, F: RoutingFacade> PathUnpacker<'a, F> {
    pub fn new(facade: &'a F) -> Self {
        Self { facade }
    }

    /// The cheapest edge connecting `s` to `t`: first among forward edges
    /// out of `s`, then among backward edges out of `t` (contracted edges
    /// are stored on one endpoint only).
    fn smallest_edge(&self, s: NodeId, t: NodeId) -> Result<EdgeId> {
        let mut smallest = INVALID_EDGE;
        let mut smallest_weight = i32::MAX;
        for edge in self.facade.begin_edges(s)..self.facade.end_edges(s) {
            let data = self.facade.get_edge_data(edge);
            if self.facade.get_target(edge) == t && data.forward && data.distance < smallest_weight
            {
                smallest = edge;
                smallest_weight = data.distance;
            }
        }
        if smallest == INVALID_EDGE {
            for edge in self.facade.begin_edges(t)..self.facade.end_edges(t) {
                let data = self.facade.get_edge_data(edge);
                if self.facade.get_target(edge) == s
                    && data.backward
                    && data.distance < smallest_weight
                {
                    smallest = edge;
                    smallest_weight = data.distance;
                }
            }
        }
        if smallest == INVALID_EDGE {
            bail!("No edge found between nodes {} and {}: graph is corrupt", s, t);
        }
        Ok(smallest)
    }

    /// Expand a packed path into original-edge segments.
    pub fn unpack_path(&self, packed_path: &[NodeId]) -> Result<Vec<PathSegment>> {
        let mut unpacked = Vec::new();
        if packed_path.len() < 2 {
            return Ok(unpacked);
        }

        // Pairs go on the stack in reverse so the first pair is popped first.
        let mut recursion_stack = Vec::with_capacity(packed_path.len());
        for i in (1..packed_path.len()).rev() {
            recursion_stack.push((packed_path[i - 1], packed_path[i]));
        }

        while let Some((s, t)) = recursion_stack.pop() {
            let edge = self.smallest_edge(s, t)?;
            let data = self.facade.get_edge_data(edge);
            if data.shortcut {
                let middle_node = data.id;
                // Reversed again: (s, middle) must be expanded first.
                recursion_stack.push((middle_node, t));
                recursion_stack.push((s, middle_node));
            } else {
                unpacked.push(PathSegment {
                    edge_id: data.id,
                    name_id: self.facade.get_name_index_from_edge_id(data.id),
                    turn_instruction: self.facade.get_turn_instruction_for_edge_id(data.id),
                    distance: data.distance,
                });
            }
        }
        Ok(unpacked)
    }

    /// Expand a single contracted edge into the node ids it traverses.
    pub fn unpack_edge(&self, s: NodeId, t: NodeId) -> Result<Vec<NodeId>> {
        let mut unpacked = Vec::new();
        let mut recursion_stack = vec![(s, t)];
        while let Some((s, t)) = recursion_stack.pop() {
            let edge = self.smallest_edge(s, t)?;
            let data = self.facade.get_edge_data(edge);
            if data.shortcut {
                let middle_node = data.id;
                recursion_stack.push((middle_node, t));
                recursion_stack.push((s, middle_node));
            } else {
                unpacked.push(s);
            }
        }
        unpacked.push(t);
        Ok(unpacked)
    }
}
