//! Extraction containers.
//!
//! Accumulates classified nodes, way segments, restrictions and street names
//! during parsing, then runs the deterministic offline pass: stable sorts,
//! merge-walk endpoint resolution, geometric weights, restriction resolution
//! and artifact emission. Identical input yields byte-identical artifacts.

use anyhow::Result;
use rustc_hash::FxHashMap;
use std::path::Path;

use crate::extract::profile::{ExtractionNode, ExtractionWay, Profile};
use crate::extract::restrictions::InputRestriction;
use crate::extract::source::OsmNode;
use crate::formats::graph::{EdgeRecord, GraphFile, NodeRecord, FLAG_BARRIER, FLAG_TRAFFIC_LIGHT};
use crate::formats::names::NamesFile;
use crate::formats::restrictions::{ResolvedRestriction, RestrictionsFile};
use crate::geo::{haversine_distance, FixedCoordinate};

/// Penalty in tenths of seconds for entering a traffic-light node.
pub const TRAFFIC_LIGHT_PENALTY: u32 = 20;

/// Endpoint sentinel for edges whose node is absent from the dump.
const UNRESOLVED: i64 = i64::MIN;

/// A node as seen in the raw OSM stream, with profile-derived flags.
#[derive(Debug, Clone, Copy)]
pub struct ExternalNode {
    pub id: i64,
    pub coord: FixedCoordinate,
    pub barrier: bool,
    pub traffic_light: bool,
}

/// One way segment. Endpoints start as OSM node ids and are rewritten to
/// dense internal ids during resolution.
#[derive(Debug, Clone)]
struct ExtractorEdge {
    source: i64,
    target: i64,
    speed: f64,
    duration: Option<f64>,
    weight: u32,
    forward: bool,
    backward: bool,
    name_id: u32,
    roundabout: bool,
    access_restricted: bool,
    is_split: bool,
    travel_mode: u8,
    is_startpoint: bool,
    source_coord: FixedCoordinate,
    target_coord: FixedCoordinate,
    traffic_light: bool,
}

/// First and last node pairs of a processed way, for restriction resolution.
#[derive(Debug, Clone, Copy)]
struct WayEndpoints {
    way_id: i64,
    first: i64,
    second: i64,
    penultimate: i64,
    last: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrepareStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub restriction_count: usize,
    pub bad_restrictions: u64,
}

pub struct ExtractionContainers {
    used_node_ids: Vec<i64>,
    all_nodes: Vec<ExternalNode>,
    all_edges: Vec<ExtractorEdge>,
    way_start_end: Vec<WayEndpoints>,
    restrictions: Vec<InputRestriction>,
    name_char_data: Vec<u8>,
    name_offsets: Vec<u32>,
    string_map: FxHashMap<String, u32>,
}

impl Default for ExtractionContainers {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionContainers {
    pub fn new() -> Self {
        Self {
            used_node_ids: Vec::new(),
            all_nodes: Vec::new(),
            all_edges: Vec::new(),
            way_start_end: Vec::new(),
            restrictions: Vec::new(),
            name_char_data: Vec::new(),
            name_offsets: vec![0],
            string_map: FxHashMap::default(),
        }
    }

    pub fn edge_count(&self) -> usize {
        self.all_edges.len()
    }

    pub fn process_node(&mut self, raw: &OsmNode, result: &ExtractionNode) {
        self.all_nodes.push(ExternalNode {
            id: raw.id,
            coord: FixedCoordinate::from_degrees(raw.lat, raw.lon),
            barrier: result.barrier,
            traffic_light: result.traffic_light,
        });
    }

    pub fn process_way(&mut self, way: &ExtractionWay) {
        if !way.is_routable() {
            return;
        }

        let name_id = self.intern_name(&way.name);
        let refs = &way.node_refs;
        let segment_count = refs.len() - 1;
        let segment_duration = way.duration.map(|d| d / segment_count as f64);

        self.used_node_ids.extend_from_slice(refs);
        self.way_start_end.push(WayEndpoints {
            way_id: way.id,
            first: refs[0],
            second: refs[1],
            penultimate: refs[refs.len() - 2],
            last: refs[refs.len() - 1],
        });

        let forward = way.forward_speed > 0.0;
        let backward = way.backward_speed > 0.0;
        // Equal speeds (or a shared duration) collapse into one bidirectional
        // edge; asymmetric speeds need a directed edge per direction.
        let split = forward
            && backward
            && way.forward_speed != way.backward_speed
            && segment_duration.is_none();
        // A duration-only way (no per-direction speeds) is traversable both
        // ways at the duration-derived cost.
        let bidirectional = (forward && backward && !split) || (!forward && !backward);

        let template = ExtractorEdge {
            source: 0,
            target: 0,
            speed: 0.0,
            duration: segment_duration,
            weight: 0,
            forward: false,
            backward: false,
            name_id,
            roundabout: way.roundabout,
            access_restricted: way.access_restricted,
            is_split: false,
            travel_mode: way.forward_mode,
            is_startpoint: way.is_startpoint,
            source_coord: FixedCoordinate::default(),
            target_coord: FixedCoordinate::default(),
            traffic_light: false,
        };

        for pair in refs.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if bidirectional {
                self.all_edges.push(ExtractorEdge {
                    source: a,
                    target: b,
                    speed: way.forward_speed,
                    forward: true,
                    backward: true,
                    ..template.clone()
                });
            } else if split {
                self.all_edges.push(ExtractorEdge {
                    source: a,
                    target: b,
                    speed: way.forward_speed,
                    forward: true,
                    ..template.clone()
                });
                self.all_edges.push(ExtractorEdge {
                    source: a,
                    target: b,
                    speed: way.backward_speed,
                    backward: true,
                    travel_mode: way.backward_mode,
                    ..template.clone()
                });
            } else if forward {
                self.all_edges.push(ExtractorEdge {
                    source: a,
                    target: b,
                    speed: way.forward_speed,
                    forward: true,
                    ..template.clone()
                });
            } else {
                // One-way against ref order: swap endpoints.
                self.all_edges.push(ExtractorEdge {
                    source: b,
                    target: a,
                    speed: way.backward_speed,
                    forward: true,
                    travel_mode: way.backward_mode,
                    ..template.clone()
                });
            }
        }
    }

    pub fn process_restriction(&mut self, restriction: Option<InputRestriction>) {
        if let Some(restriction) = restriction {
            self.restrictions.push(restriction);
        }
    }

    fn intern_name(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.string_map.get(name) {
            return id;
        }
        let id = (self.name_offsets.len() - 1) as u32;
        self.name_char_data.extend_from_slice(name.as_bytes());
        self.name_offsets.push(self.name_char_data.len() as u32);
        self.string_map.insert(name.to_string(), id);
        id
    }

    /// The deterministic offline pass. Every sort is stable, so ties keep
    /// their pre-sort order and identical input produces identical output.
    pub fn prepare_data<P: AsRef<Path>>(
        mut self,
        output_path: P,
        restrictions_path: P,
        names_path: P,
        profile: &dyn Profile,
    ) -> Result<PrepareStats> {
        println!("Sorting used nodes...");
        self.all_nodes.sort_by_key(|n| n.id);
        self.all_nodes.dedup_by_key(|n| n.id);
        self.used_node_ids.sort();
        self.used_node_ids.dedup();

        println!("Building node id map...");
        let internal_nodes = intersect_nodes(&self.used_node_ids, &self.all_nodes);

        println!("Resolving edge endpoints...");
        self.all_edges.sort_by_key(|e| e.source);
        resolve_sources(&mut self.all_edges, &internal_nodes);
        self.all_edges.sort_by_key(|e| e.target);
        resolve_targets(&mut self.all_edges, &internal_nodes);
        self.all_edges
            .retain(|e| e.source != UNRESOLVED && e.target != UNRESOLVED);

        println!("Computing edge weights...");
        compute_weights(&mut self.all_edges, profile);
        self.all_edges.retain(|e| e.weight > 0);
        self.all_edges.sort_by_key(|e| (e.source, e.target));

        println!("Resolving turn restrictions...");
        self.way_start_end.sort_by_key(|w| w.way_id);
        let mut bad_restrictions = 0u64;
        let mut resolved = Vec::with_capacity(self.restrictions.len());
        for restriction in &self.restrictions {
            match resolve_restriction(restriction, &self.way_start_end, &internal_nodes) {
                Some(r) => resolved.push(r),
                None => bad_restrictions += 1,
            }
        }

        println!("Writing artifacts...");
        let node_records: Vec<NodeRecord> = internal_nodes
            .iter()
            .map(|n| NodeRecord {
                lat: n.coord.lat,
                lon: n.coord.lon,
                osm_id: n.id as u64,
                flags: (n.barrier as u8 * FLAG_BARRIER)
                    | (n.traffic_light as u8 * FLAG_TRAFFIC_LIGHT),
            })
            .collect();
        let edge_records: Vec<EdgeRecord> = self
            .all_edges
            .iter()
            .map(|e| EdgeRecord {
                source: e.source as u32,
                target: e.target as u32,
                weight: e.weight,
                name_id: e.name_id,
                forward: e.forward,
                backward: e.backward,
                roundabout: e.roundabout,
                access_restricted: e.access_restricted,
                is_split: e.is_split,
                travel_mode: e.travel_mode,
                turn_instruction: 0,
                is_startpoint: e.is_startpoint,
            })
            .collect();

        GraphFile::write(&output_path, &node_records, &edge_records)?;
        RestrictionsFile::write(&restrictions_path, &resolved)?;
        NamesFile::write(&names_path, &self.name_offsets, &self.name_char_data)?;

        Ok(PrepareStats {
            node_count: node_records.len(),
            edge_count: edge_records.len(),
            restriction_count: resolved.len(),
            bad_restrictions,
        })
    }
}

/// Linear sweep over the sorted used ids and the sorted node list. Used ids
/// absent from the dump are skipped; survivors get dense internal ids in
/// sweep order.
fn intersect_nodes(used_node_ids: &[i64], all_nodes: &[ExternalNode]) -> Vec<ExternalNode> {
    let mut internal = Vec::with_capacity(used_node_ids.len());
    let mut j = 0;
    for &used in used_node_ids {
        while j < all_nodes.len() && all_nodes[j].id < used {
            j += 1;
        }
        if j < all_nodes.len() && all_nodes[j].id == used {
            internal.push(all_nodes[j]);
        }
    }
    internal
}

fn resolve_sources(edges: &mut [ExtractorEdge], internal_nodes: &[ExternalNode]) {
    let mut j = 0;
    for edge in edges.iter_mut() {
        while j < internal_nodes.len() && internal_nodes[j].id < edge.source {
            j += 1;
        }
        if j < internal_nodes.len() && internal_nodes[j].id == edge.source {
            let node = &internal_nodes[j];
            edge.source = j as i64;
            edge.source_coord = node.coord;
            // Edges leaving a barrier are split off to block through-routing.
            edge.is_split |= node.barrier;
        } else {
            edge.source = UNRESOLVED;
        }
    }
}

fn resolve_targets(edges: &mut [ExtractorEdge], internal_nodes: &[ExternalNode]) {
    let mut j = 0;
    for edge in edges.iter_mut() {
        while j < internal_nodes.len() && internal_nodes[j].id < edge.target {
            j += 1;
        }
        if j < internal_nodes.len() && internal_nodes[j].id == edge.target {
            let node = &internal_nodes[j];
            edge.target = j as i64;
            edge.target_coord = node.coord;
            edge.traffic_light = node.traffic_light;
        } else {
            edge.target = UNRESOLVED;
        }
    }
}

fn compute_weights(edges: &mut [ExtractorEdge], profile: &dyn Profile) {
    let use_hook = profile.has_segment_hook();
    for edge in edges.iter_mut() {
        let distance = haversine_distance(edge.source_coord, edge.target_coord);
        let base = match edge.duration {
            Some(seconds) => (seconds * 10.0).round() as u32,
            None => {
                let mut speed = edge.speed;
                if use_hook {
                    profile.segment_hook(edge.source_coord, edge.target_coord, distance, &mut speed);
                }
                if speed <= 0.0 {
                    0
                } else {
                    // meters at km/h, in tenths of seconds, rounded half up.
                    (distance * 3.6 * 10.0 / speed + 0.5).floor() as u32
                }
            }
        };
        edge.weight = if base == 0 {
            0
        } else if edge.traffic_light {
            base + TRAFFIC_LIGHT_PENALTY
        } else {
            base
        };
    }
}

/// The node of `way` adjacent to `via`, or None when via is not an endpoint
/// or the way closes on itself (ambiguous).
fn neighbor_of_via(way: &WayEndpoints, via: i64) -> Option<i64> {
    if way.first == via && way.last == via {
        return None;
    }
    if way.first == via {
        Some(way.second)
    } else if way.last == via {
        Some(way.penultimate)
    } else {
        None
    }
}

fn internal_id_of(internal_nodes: &[ExternalNode], osm_id: i64) -> Option<u32> {
    internal_nodes
        .binary_search_by_key(&osm_id, |n| n.id)
        .ok()
        .map(|i| i as u32)
}

fn resolve_restriction(
    restriction: &InputRestriction,
    way_start_end: &[WayEndpoints],
    internal_nodes: &[ExternalNode],
) -> Option<ResolvedRestriction> {
    let find_way = |way_id: i64| {
        way_start_end
            .binary_search_by_key(&way_id, |w| w.way_id)
            .ok()
            .map(|i| &way_start_end[i])
    };
    let from = find_way(restriction.from_way)?;
    let to = find_way(restriction.to_way)?;
    let from_node = neighbor_of_via(from, restriction.via_node)?;
    let to_node = neighbor_of_via(to, restriction.via_node)?;
    Some(ResolvedRestriction {
        from_node: internal_id_of(internal_nodes, from_node)?,
        via_node: internal_id_of(internal_nodes, restriction.via_node)?,
        to_node: internal_id_of(internal_nodes, to_node)?,
        kind: restriction.kind,
    })
}
