//! Bidirectional Dijkstra over the contracted graph.
//!
//! Two heaps advance alternately. When a settled node is known to the other
//! side, the combined distance tightens the upper bound. A side whose
//! settled distance exceeds the bound is retired, and stall-on-demand skips
//! relaxation at nodes already reachable more cheaply through a settled
//! neighbor.

use anyhow::Result;

use super::facade::RoutingFacade;
use super::heap::QueryHeap;
use super::unpack::{retrieve_packed_path, PathSegment, PathUnpacker};
use super::{NodeId, INVALID_NODE};

#[derive(Debug, Clone)]
pub struct Route {
    pub weight: i32,
    pub packed_path: Vec<NodeId>,
    pub segments: Vec<PathSegment>,
}

pub struct SearchEngine<'a, F: RoutingFacade> {
    facade: &'a F,
    forward_heap: QueryHeap,
    reverse_heap: QueryHeap,
}

impl<'a, F: RoutingFacade> SearchEngine<'a, F> {
    pub fn new(facade: &'a F) -> Self {
        Self {
            facade,
            forward_heap: QueryHeap::new(),
            reverse_heap: QueryHeap::new(),
        }
    }

    /// Run the bidirectional search and return the shortest distance and
    /// meeting node, or None when the searches never meet. Sources and
    /// targets carry an initial key offset each.
    pub fn search(
        &mut self,
        sources: &[(NodeId, i32)],
        targets: &[(NodeId, i32)],
    ) -> Option<(i32, NodeId)> {
        self.forward_heap.clear();
        self.reverse_heap.clear();
        for &(source, offset) in sources {
            self.forward_heap.insert(source, offset, source);
        }
        for &(target, offset) in targets {
            self.reverse_heap.insert(target, offset, target);
        }

        // Negative insertion offsets shift every key; the pruning test has
        // to account for the smallest one.
        let edge_expansion_offset = sources
            .iter()
            .chain(targets)
            .map(|&(_, offset)| offset)
            .min()
            .unwrap_or(0)
            .min(0);

        let mut middle_node = INVALID_NODE;
        let mut upper_bound = i32::MAX;

        while self.forward_heap.size() + self.reverse_heap.size() > 0 {
            let smallest_pending = match (self.forward_heap.min_key(), self.reverse_heap.min_key())
            {
                (Some(a), Some(b)) => a.min(b),
                (Some(a), None) => a,
                (None, Some(b)) => b,
                (None, None) => break,
            };
            if smallest_pending - edge_expansion_offset > upper_bound {
                break;
            }
            if !self.forward_heap.is_empty() {
                routing_step(
                    self.facade,
                    &mut self.forward_heap,
                    &mut self.reverse_heap,
                    &mut middle_node,
                    &mut upper_bound,
                    edge_expansion_offset,
                    true,
                );
            }
            if !self.reverse_heap.is_empty() {
                routing_step(
                    self.facade,
                    &mut self.reverse_heap,
                    &mut self.forward_heap,
                    &mut middle_node,
                    &mut upper_bound,
                    edge_expansion_offset,
                    false,
                );
            }
        }

        if upper_bound == i32::MAX || middle_node == INVALID_NODE {
            None
        } else {
            Some((upper_bound, middle_node))
        }
    }

    /// Full query: search, retrieve the packed path, unpack shortcuts.
    pub fn route(
        &mut self,
        sources: &[(NodeId, i32)],
        targets: &[(NodeId, i32)],
    ) -> Result<Option<Route>> {
        let (weight, middle_node) = match self.search(sources, targets) {
            Some(found) => found,
            None => return Ok(None),
        };
        let packed_path =
            retrieve_packed_path(&self.forward_heap, &self.reverse_heap, middle_node);
        let segments = PathUnpacker::new(self.facade).unpack_path(&packed_path)?;
        Ok(Some(Route {
            weight,
            packed_path,
            segments,
        }))
    }

    pub fn heaps(&self) -> (&QueryHeap, &QueryHeap) {
        (&self.forward_heap, &self.reverse_heap)
    }
}

/// Settle one node from `heap`, the active side; `other` is the opposing
/// search. `forward` selects which admissibility flag each side uses.
fn routing_step<F: RoutingFacade>(
    facade: &F,
    heap: &mut QueryHeap,
    other: &mut QueryHeap,
    middle_node: &mut NodeId,
    upper_bound: &mut i32,
    edge_expansion_offset: i32,
    forward: bool,
) {
    let node = match heap.delete_min() {
        Some(node) => node,
        None => return,
    };
    let distance = heap.get_key(node);

    if other.was_inserted(node) {
        let new_distance = other.get_key(node) + distance;
        if new_distance < *upper_bound && new_distance >= 0 {
            *middle_node = node;
            *upper_bound = new_distance;
        }
    }

    if distance - edge_expansion_offset > *upper_bound {
        heap.delete_all();
        return;
    }

    // Stall-on-demand: a settled neighbor reaching this node more cheaply
    // over an opposite-direction edge proves the settled distance is not on
    // a shortest path, so relaxation is skipped entirely.
    for edge in facade.begin_edges(node)..facade.end_edges(node) {
        let data = facade.get_edge_data(edge);
        let reverse_flag = if forward { data.backward } else { data.forward };
        if reverse_flag {
            let to = facade.get_target(edge);
            if heap.was_inserted(to) && heap.get_key(to) + data.distance < distance {
                return;
            }
        }
    }

    for edge in facade.begin_edges(node)..facade.end_edges(node) {
        let data = facade.get_edge_data(edge);
        let direction_flag = if forward { data.forward } else { data.backward };
        if direction_flag {
            let to = facade.get_target(edge);
            let to_distance = distance + data.distance;
            if !heap.was_inserted(to) {
                heap.insert(to, to_distance, node);
            } else if to_distance < heap.get_key(to) {
                heap.get_data_mut(to).parent = node;
                heap.decrease_key(to, to_distance);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::facade::{ContractedEdgeData, ContractedGraph, ContractedInputEdge};

    fn edge(source: NodeId, target: NodeId, distance: i32) -> ContractedInputEdge {
        ContractedInputEdge {
            source,
            target,
            data: ContractedEdgeData {
                distance,
                id: 0,
                shortcut: false,
                forward: true,
                backward: false,
            },
        }
    }

    fn bidi_edge(source: NodeId, target: NodeId, distance: i32) -> ContractedInputEdge {
        ContractedInputEdge {
            source,
            target,
            data: ContractedEdgeData {
                distance,
                id: 0,
                shortcut: false,
                forward: true,
                backward: true,
            },
        }
    }

    #[test]
    fn test_diamond_meet() {
        // 0 -> 1 (10), 0 -> 2 (5), 1 -> 3 (5), 2 -> 3 (10); best is 15.
        let graph = ContractedGraph::new(
            4,
            vec![edge(0, 1, 10), edge(0, 2, 5), edge(1, 3, 5), edge(2, 3, 10)],
        );
        let mut engine = SearchEngine::new(&graph);
        let (weight, middle) = engine.search(&[(0, 0)], &[(3, 0)]).unwrap();
        assert_eq!(weight, 15);
        assert!(matches!(middle, 1 | 2 | 3));
    }

    #[test]
    fn test_no_path() {
        let graph = ContractedGraph::new(3, vec![edge(0, 1, 10)]);
        let mut engine = SearchEngine::new(&graph);
        assert!(engine.search(&[(0, 0)], &[(2, 0)]).is_none());
    }

    #[test]
    fn test_source_equals_target() {
        let graph = ContractedGraph::new(2, vec![bidi_edge(0, 1, 10)]);
        let mut engine = SearchEngine::new(&graph);
        let (weight, middle) = engine.search(&[(0, 0)], &[(0, 0)]).unwrap();
        assert_eq!(weight, 0);
        assert_eq!(middle, 0);
    }

    fn directed(
        source: NodeId,
        target: NodeId,
        distance: i32,
        forward: bool,
        backward: bool,
    ) -> ContractedInputEdge {
        ContractedInputEdge {
            source,
            target,
            data: ContractedEdgeData {
                distance,
                id: 0,
                shortcut: false,
                forward,
                backward,
            },
        }
    }

    #[test]
    fn test_ch_style_storage_meets_in_the_middle() {
        // Chain 0 - 1 - 2 stored the way a hierarchy does it: an upward
        // forward copy at the lower endpoint, an upward backward copy at the
        // higher one. The reverse search climbs via the backward flags.
        let graph = ContractedGraph::new(
            3,
            vec![
                directed(0, 1, 4, true, false),
                directed(1, 2, 6, true, false),
                directed(2, 1, 6, false, true),
                directed(1, 0, 4, false, true),
            ],
        );
        let mut engine = SearchEngine::new(&graph);
        let (weight, middle) = engine.search(&[(0, 0)], &[(2, 0)]).unwrap();
        assert_eq!(weight, 10);
        assert!(matches!(middle, 1 | 2));
    }

    #[test]
    fn test_picks_cheaper_of_parallel_edges() {
        let graph = ContractedGraph::new(2, vec![edge(0, 1, 9), edge(0, 1, 3)]);
        let mut engine = SearchEngine::new(&graph);
        let (weight, _) = engine.search(&[(0, 0)], &[(1, 0)]).unwrap();
        assert_eq!(weight, 3);
    }

    #[test]
    fn test_engine_reusable_across_queries() {
        let graph = ContractedGraph::new(
            4,
            vec![bidi_edge(0, 1, 1), bidi_edge(1, 2, 2), bidi_edge(2, 3, 3)],
        );
        let mut engine = SearchEngine::new(&graph);
        assert_eq!(engine.search(&[(0, 0)], &[(3, 0)]).unwrap().0, 6);
        assert_eq!(engine.search(&[(1, 0)], &[(2, 0)]).unwrap().0, 2);
        assert_eq!(engine.search(&[(3, 0)], &[(0, 0)]).unwrap().0, 6);
    }

    #[test]
    fn test_multiple_sources_pick_best_offset() {
        let graph = ContractedGraph::new(3, vec![edge(0, 2, 10), edge(1, 2, 10)]);
        let mut engine = SearchEngine::new(&graph);
        // Source 1 starts with a cheaper offset, so its path wins.
        let (weight, _) = engine.search(&[(0, 8), (1, 2)], &[(2, 0)]).unwrap();
        assert_eq!(weight, 12);
    }

    #[test]
    fn test_longer_chain_weight() {
        let mut edges = Vec::new();
        for i in 0..9u32 {
            edges.push(bidi_edge(i, i + 1, (i + 1) as i32));
        }
        let graph = ContractedGraph::new(10, edges);
        let mut engine = SearchEngine::new(&graph);
        let (weight, _) = engine.search(&[(0, 0)], &[(9, 0)]).unwrap();
        assert_eq!(weight, 45);
    }
}
