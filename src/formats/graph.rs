//! .osrm intermediate graph artifact.
//!
//! Layout: u32 node count, node records, u32 edge count, edge records.
//! Node record: i32 lat_1e6, i32 lon_1e6, u64 osm_id, u8 flags.
//! Edge record: u32 source, u32 target, u32 weight, u32 name_id, then one
//! byte each for forward, backward, roundabout, access_restricted, is_split,
//! travel_mode, turn_instruction, is_startpoint.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use super::{read_i32, read_u32, read_u64, read_u8};

pub const FLAG_BARRIER: u8 = 1 << 0;
pub const FLAG_TRAFFIC_LIGHT: u8 = 1 << 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRecord {
    pub lat: i32,
    pub lon: i32,
    pub osm_id: u64,
    pub flags: u8,
}

impl NodeRecord {
    pub fn barrier(&self) -> bool {
        self.flags & FLAG_BARRIER != 0
    }

    pub fn traffic_light(&self) -> bool {
        self.flags & FLAG_TRAFFIC_LIGHT != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRecord {
    pub source: u32,
    pub target: u32,
    pub weight: u32,
    pub name_id: u32,
    pub forward: bool,
    pub backward: bool,
    pub roundabout: bool,
    pub access_restricted: bool,
    pub is_split: bool,
    pub travel_mode: u8,
    pub turn_instruction: u8,
    pub is_startpoint: bool,
}

pub struct GraphFile;

impl GraphFile {
    pub fn write<P: AsRef<Path>>(
        path: P,
        nodes: &[NodeRecord],
        edges: &[EdgeRecord],
    ) -> Result<()> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
        let mut writer = BufWriter::new(file);

        writer.write_all(&(nodes.len() as u32).to_le_bytes())?;
        for node in nodes {
            writer.write_all(&node.lat.to_le_bytes())?;
            writer.write_all(&node.lon.to_le_bytes())?;
            writer.write_all(&node.osm_id.to_le_bytes())?;
            writer.write_all(&[node.flags])?;
        }

        writer.write_all(&(edges.len() as u32).to_le_bytes())?;
        for edge in edges {
            writer.write_all(&edge.source.to_le_bytes())?;
            writer.write_all(&edge.target.to_le_bytes())?;
            writer.write_all(&edge.weight.to_le_bytes())?;
            writer.write_all(&edge.name_id.to_le_bytes())?;
            writer.write_all(&[
                edge.forward as u8,
                edge.backward as u8,
                edge.roundabout as u8,
                edge.access_restricted as u8,
                edge.is_split as u8,
                edge.travel_mode,
                edge.turn_instruction,
                edge.is_startpoint as u8,
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<(Vec<NodeRecord>, Vec<EdgeRecord>)> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open {}", path.as_ref().display()))?;
        let mut reader = BufReader::new(file);

        let node_count = read_u32(&mut reader)? as usize;
        let mut nodes = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            nodes.push(NodeRecord {
                lat: read_i32(&mut reader)?,
                lon: read_i32(&mut reader)?,
                osm_id: read_u64(&mut reader)?,
                flags: read_u8(&mut reader)?,
            });
        }

        let edge_count = read_u32(&mut reader)? as usize;
        let mut edges = Vec::with_capacity(edge_count);
        for _ in 0..edge_count {
            edges.push(EdgeRecord {
                source: read_u32(&mut reader)?,
                target: read_u32(&mut reader)?,
                weight: read_u32(&mut reader)?,
                name_id: read_u32(&mut reader)?,
                forward: read_u8(&mut reader)? != 0,
                backward: read_u8(&mut reader)? != 0,
                roundabout: read_u8(&mut reader)? != 0,
                access_restricted: read_u8(&mut reader)? != 0,
                is_split: read_u8(&mut reader)? != 0,
                travel_mode: read_u8(&mut reader)?,
                turn_instruction: read_u8(&mut reader)?,
                is_startpoint: read_u8(&mut reader)? != 0,
            });
        }

        Ok((nodes, edges))
    }
}
