//! .restrictions artifact: resolved turn restrictions in internal node ids.
//!
//! Layout: u32 count, then records of u32 from, u32 via, u32 to, u8 kind
//! (0 = no, 1 = only).

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use super::{read_u32, read_u8};
use crate::extract::restrictions::RestrictionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRestriction {
    pub from_node: u32,
    pub via_node: u32,
    pub to_node: u32,
    pub kind: RestrictionKind,
}

pub struct RestrictionsFile;

impl RestrictionsFile {
    pub fn write<P: AsRef<Path>>(path: P, restrictions: &[ResolvedRestriction]) -> Result<()> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
        let mut writer = BufWriter::new(file);

        writer.write_all(&(restrictions.len() as u32).to_le_bytes())?;
        for restriction in restrictions {
            writer.write_all(&restriction.from_node.to_le_bytes())?;
            writer.write_all(&restriction.via_node.to_le_bytes())?;
            writer.write_all(&restriction.to_node.to_le_bytes())?;
            writer.write_all(&[restriction.kind as u8])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Vec<ResolvedRestriction>> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open {}", path.as_ref().display()))?;
        let mut reader = BufReader::new(file);

        let count = read_u32(&mut reader)? as usize;
        let mut restrictions = Vec::with_capacity(count);
        for _ in 0..count {
            let from_node = read_u32(&mut reader)?;
            let via_node = read_u32(&mut reader)?;
            let to_node = read_u32(&mut reader)?;
            let raw_kind = read_u8(&mut reader)?;
            let kind = match RestrictionKind::from_u8(raw_kind) {
                Some(kind) => kind,
                None => bail!("Unknown restriction kind {}", raw_kind),
            };
            restrictions.push(ResolvedRestriction {
                from_node,
                via_node,
                to_node,
                kind,
            });
        }
        Ok(restrictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_restrictions_round_trip() {
        let restrictions = vec![
            ResolvedRestriction {
                from_node: 1,
                via_node: 2,
                to_node: 3,
                kind: RestrictionKind::No,
            },
            ResolvedRestriction {
                from_node: 4,
                via_node: 5,
                to_node: 6,
                kind: RestrictionKind::Only,
            },
        ];

        let tmpfile = NamedTempFile::new().unwrap();
        RestrictionsFile::write(tmpfile.path(), &restrictions).unwrap();
        assert_eq!(RestrictionsFile::read(tmpfile.path()).unwrap(), restrictions);
    }

    #[test]
    fn test_empty_restrictions() {
        let tmpfile = NamedTempFile::new().unwrap();
        RestrictionsFile::write(tmpfile.path(), &[]).unwrap();
        assert!(RestrictionsFile::read(tmpfile.path()).unwrap().is_empty());
    }
}
