//! Binary artifact formats. All records are fixed-width little-endian.

pub mod contracted;
pub mod graph;
pub mod names;
pub mod restrictions;

pub use contracted::{ContractedEdgeRecord, ContractedFile};
pub use graph::{EdgeRecord, GraphFile, NodeRecord};
pub use names::{NamesFile, NamesTable};
pub use restrictions::{ResolvedRestriction, RestrictionsFile};

use anyhow::Result;
use std::io::Read;

pub(crate) fn read_u8(reader: &mut impl Read) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub(crate) fn read_u32(reader: &mut impl Read) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_i32(reader: &mut impl Read) -> Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub(crate) fn read_u64(reader: &mut impl Read) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
