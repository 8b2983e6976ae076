//! Contracted-graph dump consumed by the query side.
//!
//! The contraction tool emits one record per directed edge of the hierarchy:
//! u32 node count, u32 edge count, then records of u32 source, u32 target,
//! i32 distance, u32 id (middle node for shortcuts, original edge identity
//! otherwise), u32 name_id, u8 turn_instruction, u8 shortcut, u8 forward,
//! u8 backward.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use super::{read_i32, read_u32, read_u8};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractedEdgeRecord {
    pub source: u32,
    pub target: u32,
    pub distance: i32,
    pub id: u32,
    pub name_id: u32,
    pub turn_instruction: u8,
    pub shortcut: bool,
    pub forward: bool,
    pub backward: bool,
}

pub struct ContractedFile;

impl ContractedFile {
    pub fn write<P: AsRef<Path>>(
        path: P,
        node_count: u32,
        edges: &[ContractedEdgeRecord],
    ) -> Result<()> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
        let mut writer = BufWriter::new(file);

        writer.write_all(&node_count.to_le_bytes())?;
        writer.write_all(&(edges.len() as u32).to_le_bytes())?;
        for edge in edges {
            writer.write_all(&edge.source.to_le_bytes())?;
            writer.write_all(&edge.target.to_le_bytes())?;
            writer.write_all(&edge.distance.to_le_bytes())?;
            writer.write_all(&edge.id.to_le_bytes())?;
            writer.write_all(&edge.name_id.to_le_bytes())?;
            writer.write_all(&[
                edge.turn_instruction,
                edge.shortcut as u8,
                edge.forward as u8,
                edge.backward as u8,
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<(u32, Vec<ContractedEdgeRecord>)> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open {}", path.as_ref().display()))?;
        let mut reader = BufReader::new(file);

        let node_count = read_u32(&mut reader)?;
        let edge_count = read_u32(&mut reader)? as usize;
        let mut edges = Vec::with_capacity(edge_count);
        for _ in 0..edge_count {
            edges.push(ContractedEdgeRecord {
                source: read_u32(&mut reader)?,
                target: read_u32(&mut reader)?,
                distance: read_i32(&mut reader)?,
                id: read_u32(&mut reader)?,
                name_id: read_u32(&mut reader)?,
                turn_instruction: read_u8(&mut reader)?,
                shortcut: read_u8(&mut reader)? != 0,
                forward: read_u8(&mut reader)? != 0,
                backward: read_u8(&mut reader)? != 0,
            });
        }
        Ok((node_count, edges))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_contracted_round_trip() {
        let edges = vec![
            ContractedEdgeRecord {
                source: 0,
                target: 1,
                distance: 10,
                id: 7,
                name_id: 0,
                turn_instruction: 0,
                shortcut: false,
                forward: true,
                backward: false,
            },
            ContractedEdgeRecord {
                source: 0,
                target: 2,
                distance: 25,
                id: 1,
                name_id: 0,
                turn_instruction: 0,
                shortcut: true,
                forward: true,
                backward: true,
            },
        ];

        let tmpfile = NamedTempFile::new().unwrap();
        ContractedFile::write(tmpfile.path(), 3, &edges).unwrap();
        let (node_count, read_edges) = ContractedFile::read(tmpfile.path()).unwrap();
        assert_eq!(node_count, 3);
        assert_eq!(read_edges, edges);
    }
}
