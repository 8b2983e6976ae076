//! Kestrel-Route: OSM road-network extraction and CH query core
//!
//! Pipeline:
//! - Extract: filter an OSM dump through a routing profile, split ways into
//!   directional edge segments, resolve turn restrictions, and emit compact
//!   on-disk artifacts (.osrm, .restrictions, .names, .timestamp)
//! - Query: bidirectional Dijkstra with stall-on-demand over a contracted
//!   graph, then shortcut unpacking into a concrete per-segment path
//!
//! Key principle: extraction output is deterministic. Entities are classified
//! in parallel but drained in input order, and every offline sort is stable,
//! so identical dumps produce byte-identical artifacts.

pub mod cli;
pub mod extract;
pub mod formats;
pub mod geo;
pub mod query;

pub use extract::containers::ExtractionContainers;
pub use extract::profile::{CarProfile, ExtractionNode, ExtractionWay, Profile};
pub use extract::restrictions::{InputRestriction, RestrictionKind, RestrictionParser};
pub use extract::source::{MemorySource, OsmEntity, OsmSource, PbfSource};
pub use query::facade::{ContractedEdgeData, ContractedGraph, RoutingFacade};
pub use query::heap::QueryHeap;
pub use query::search::SearchEngine;
pub use query::unpack::{PathSegment, PathUnpacker};
