//! Memory-mapped relation files.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! offset 0   magic  "LFJREL01"            8 bytes
//! offset 8   count  u64                   8 bytes
//! offset 16  count × (key1 u32, key2 u32) 8 bytes each, strictly increasing
//! ```
//!
//! Files are validated once on open (magic, exact length, sort order), so
//! lookups afterwards are plain slice reads.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::{Mmap, MmapOptions};

use crate::{Key, MemoryRelation, Position, RelationBuilder, SortedRelation, StorageError, Value};

pub const RELATION_FILE_MAGIC: [u8; 8] = *b"LFJREL01";

const HEADER_LEN: usize = 16;
const ENTRY_LEN: usize = 8;

/// A read-only sorted relation backed by a memory-mapped file.
#[derive(Debug, Clone)]
pub struct MappedRelation {
    path: Arc<PathBuf>,
    mmap: Arc<Mmap>,
    len: usize,
}

impl MappedRelation {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| StorageError::io(path, e))?;
        let mmap = unsafe { MmapOptions::new().map(&file) }.map_err(|e| StorageError::io(path, e))?;

        let actual = mmap.len() as u64;
        if mmap.len() < HEADER_LEN {
            return Err(StorageError::Truncated {
                path: path.to_path_buf(),
                expected: HEADER_LEN as u64,
                actual,
            });
        }
        if mmap[..8] != RELATION_FILE_MAGIC {
            return Err(StorageError::BadMagic {
                path: path.to_path_buf(),
            });
        }

        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&mmap[8..16]);
        let count = u64::from_le_bytes(count_bytes);
        let expected = count
            .saturating_mul(ENTRY_LEN as u64)
            .saturating_add(HEADER_LEN as u64);
        if expected != actual {
            return Err(StorageError::Truncated {
                path: path.to_path_buf(),
                expected,
                actual,
            });
        }

        let rel = Self {
            path: Arc::new(path.to_path_buf()),
            mmap: Arc::new(mmap),
            len: count as usize,
        };
        rel.check_sorted()?;

        tracing::debug!(path = %path.display(), entries = rel.len, "opened mapped relation");
        Ok(rel)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_sorted(&self) -> Result<(), StorageError> {
        let mut previous: Option<Value> = None;
        for position in 0..self.len {
            let value = self.decode(position)?;
            if let Some(previous) = previous {
                if value <= previous {
                    return Err(StorageError::Unsorted {
                        index: position as u64,
                        previous,
                        value,
                    });
                }
            }
            previous = Some(value);
        }
        Ok(())
    }

    fn decode(&self, position: Position) -> Result<Value, StorageError> {
        let start = HEADER_LEN + position * ENTRY_LEN;
        let bytes = self
            .mmap
            .get(start..start + ENTRY_LEN)
            .ok_or(StorageError::PositionOutOfRange {
                position,
                len: self.len,
            })?;
        let key1 = Key::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let key2 = Key::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Ok(Value::new(key1, key2))
    }

    /// Copy the relation into memory.
    pub fn to_memory(&self) -> Result<MemoryRelation, StorageError> {
        let mut builder = RelationBuilder::with_capacity(self.len);
        for position in 0..self.len {
            builder.push(self.decode(position)?)?;
        }
        Ok(builder.build())
    }
}

impl SortedRelation for MappedRelation {
    fn len(&self) -> usize {
        self.len
    }

    fn lower_bound(&self, target: Value) -> Result<Position, StorageError> {
        let (mut lo, mut hi) = (0usize, self.len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.decode(mid)? < target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    fn value_at(&self, position: Position) -> Result<Option<Value>, StorageError> {
        if position >= self.len {
            return Ok(None);
        }
        self.decode(position).map(Some)
    }
}

/// Write a sorted stream of values as a relation file, returning the number of
/// entries written (after duplicate removal).
pub fn write_relation_file(
    path: impl AsRef<Path>,
    values: impl IntoIterator<Item = Value>,
) -> Result<u64, StorageError> {
    let path = path.as_ref();
    let mut builder = RelationBuilder::new();
    for value in values {
        builder.push(value)?;
    }
    let rel = builder.build();

    let file = File::create(path).map_err(|e| StorageError::io(path, e))?;
    let mut out = BufWriter::new(file);
    let io = |e| StorageError::io(path, e);
    out.write_all(&RELATION_FILE_MAGIC).map_err(io)?;
    out.write_all(&(rel.len() as u64).to_le_bytes()).map_err(io)?;
    for value in rel.iter() {
        out.write_all(&value.key1.to_le_bytes()).map_err(io)?;
        out.write_all(&value.key2.to_le_bytes()).map_err(io)?;
    }
    out.flush().map_err(io)?;

    tracing::debug!(path = %path.display(), entries = rel.len(), "wrote relation file");
    Ok(rel.len() as u64)
}
