//! Read-only access to the contracted graph.
//!
//! The routing algorithms are written against the small `RoutingFacade`
//! capability set so they stay independent of the storage layout. The one
//! concrete implementation keeps adjacency CSR-style: a first-edge offset
//! per node over flat target and edge-data arrays.

use rustc_hash::FxHashMap;

use super::{EdgeId, NodeId};
use crate::formats::contracted::ContractedEdgeRecord;

/// Per-edge payload of the contracted graph. For shortcuts `id` is the
/// middle node of the contracted triangle; otherwise it is the original
/// edge identity used for name and turn lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractedEdgeData {
    pub distance: i32,
    pub id: u32,
    pub shortcut: bool,
    pub forward: bool,
    pub backward: bool,
}

pub trait RoutingFacade {
    fn number_of_nodes(&self) -> u32;
    fn begin_edges(&self, node: NodeId) -> EdgeId;
    fn end_edges(&self, node: NodeId) -> EdgeId;
    fn get_target(&self, edge: EdgeId) -> NodeId;
    fn get_edge_data(&self, edge: EdgeId) -> ContractedEdgeData;
    fn get_name_index_from_edge_id(&self, edge_id: u32) -> u32;
    fn get_turn_instruction_for_edge_id(&self, edge_id: u32) -> u8;
}

/// An edge of the contracted graph before CSR assembly.
#[derive(Debug, Clone, Copy)]
pub struct ContractedInputEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub data: ContractedEdgeData,
}

pub struct ContractedGraph {
    first_edge: Vec<u32>,
    targets: Vec<NodeId>,
    edge_data: Vec<ContractedEdgeData>,
    // Original-edge identity -> (name_id, turn_instruction).
    edge_metadata: FxHashMap<u32, (u32, u8)>,
}

impl ContractedGraph {
    pub fn new(node_count: u32, mut edges: Vec<ContractedInputEdge>) -> Self {
        edges.sort_by_key(|e| (e.source, e.target));

        let mut first_edge = vec![0u32; node_count as usize + 1];
        for edge in &edges {
            first_edge[edge.source as usize + 1] += 1;
        }
        for i in 0..node_count as usize {
            first_edge[i + 1] += first_edge[i];
        }

        Self {
            first_edge,
            targets: edges.iter().map(|e| e.target).collect(),
            edge_data: edges.iter().map(|e| e.data).collect(),
            edge_metadata: FxHashMap::default(),
        }
    }

    pub fn from_records(node_count: u32, records: &[ContractedEdgeRecord]) -> Self {
        let edges = records
            .iter()
            .map(|r| ContractedInputEdge {
                source: r.source,
                target: r.target,
                data: ContractedEdgeData {
                    distance: r.distance,
                    id: r.id,
                    shortcut: r.shortcut,
                    forward: r.forward,
                    backward: r.backward,
                },
            })
            .collect();
        let mut graph = Self::new(node_count, edges);
        for record in records {
            if !record.shortcut {
                graph
                    .edge_metadata
                    .insert(record.id, (record.name_id, record.turn_instruction));
            }
        }
        graph
    }

    /// Attach name/turn metadata for an original edge identity.
    pub fn set_edge_metadata(&mut self, edge_id: u32, name_id: u32, turn_instruction: u8) {
        self.edge_metadata.insert(edge_id, (name_id, turn_instruction));
    }
}

impl RoutingFacade for ContractedGraph {
    fn number_of_nodes(&self) -> u32 {
        (self.first_edge.len() - 1) as u32
    }

    fn begin_edges(&self, node: NodeId) -> EdgeId {
        self.first_edge[node as usize]
    }

    fn end_edges(&self, node: NodeId) -> EdgeId {
        self.first_edge[node as usize + 1]
    }

    fn get_target(&self, edge: EdgeId) -> NodeId {
        self.targets[edge as usize]
    }

    fn get_edge_data(&self, edge: EdgeId) -> ContractedEdgeData {
        self.edge_data[edge as usize]
    }

    fn get_name_index_from_edge_id(&self, edge_id: u32) -> u32 {
        self.edge_metadata
            .get(&edge_id)
            .map(|&(name_id, _)| name_id)
            .unwrap_or(u32::MAX)
    }

    fn get_turn_instruction_for_edge_id(&self, edge_id: u32) -> u8 {
        self.edge_metadata
            .get(&edge_id)
            .map(|&(_, turn)| turn)
            .unwrap_or(0)
    }
}
