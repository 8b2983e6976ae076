//! .names street-name table.
//!
//! Names are stored as one concatenated UTF-8 string with a prefix-sum
//! offset array: u32 offset count, the offsets, then the character data.
//! The offsets are monotone and the final offset equals the data length.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::read_u32;

pub struct NamesFile;

impl NamesFile {
    pub fn write<P: AsRef<Path>>(path: P, offsets: &[u32], char_data: &[u8]) -> Result<()> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
        let mut writer = BufWriter::new(file);

        writer.write_all(&(offsets.len() as u32).to_le_bytes())?;
        for offset in offsets {
            writer.write_all(&offset.to_le_bytes())?;
        }
        writer.write_all(char_data)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<NamesTable> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open {}", path.as_ref().display()))?;
        let mut reader = BufReader::new(file);

        let offset_count = read_u32(&mut reader)? as usize;
        let mut offsets = Vec::with_capacity(offset_count);
        for _ in 0..offset_count {
            offsets.push(read_u32(&mut reader)?);
        }

        let mut char_data = Vec::new();
        reader.read_to_end(&mut char_data)?;

        for window in offsets.windows(2) {
            if window[0] > window[1] {
                bail!("Names offset array is not monotone");
            }
        }
        if let Some(&last) = offsets.last() {
            if last as usize != char_data.len() {
                bail!(
                    "Names data length {} does not match final offset {}",
                    char_data.len(),
                    last
                );
            }
        }

        Ok(NamesTable { offsets, char_data })
    }
}

/// In-memory view of the names table; `name_id` indexes the offset array.
#[derive(Debug, Clone, Default)]
pub struct NamesTable {
    pub offsets: Vec<u32>,
    pub char_data: Vec<u8>,
}

impl NamesTable {
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, name_id: u32) -> Option<&str> {
        let start = *self.offsets.get(name_id as usize)? as usize;
        let end = *self.offsets.get(name_id as usize + 1)? as usize;
        std::str::from_utf8(&self.char_data[start..end]).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_names_round_trip() {
        let names = ["", "Main Street", "Avenue des Papalins"];
        let mut offsets = vec![0u32];
        let mut char_data = Vec::new();
        for name in names {
            char_data.extend_from_slice(name.as_bytes());
            offsets.push(char_data.len() as u32);
        }

        let tmpfile = NamedTempFile::new().unwrap();
        NamesFile::write(tmpfile.path(), &offsets, &char_data).unwrap();
        let table = NamesFile::read(tmpfile.path()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0), Some(""));
        assert_eq!(table.get(1), Some("Main Street"));
        assert_eq!(table.get(2), Some("Avenue des Papalins"));
        assert_eq!(table.get(3), None);
    }

    #[test]
    fn test_rejects_non_monotone_offsets() {
        let tmpfile = NamedTempFile::new().unwrap();
        NamesFile::write(tmpfile.path(), &[0, 5, 3], b"abcde").unwrap();
        assert!(NamesFile::read(tmpfile.path()).is_err());
    }

    #[test]
    fn test_rejects_truncated_char_data() {
        let tmpfile = NamedTempFile::new().unwrap();
        NamesFile::write(tmpfile.path(), &[0, 10], b"abc").unwrap();
        assert!(NamesFile::read(tmpfile.path()).is_err());
    }
}
