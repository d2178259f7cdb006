// src/engine/io.rs
//
// I/O operations: Source enum and file loading

use crate::error::{BytefitError, Result};
use memmap2::Mmap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Image source - in-memory data, a memory-mapped file, or a path for lazy
/// loading.
#[derive(Clone, Debug)]
pub enum Source {
    /// In-memory image data
    Memory(Arc<Vec<u8>>),
    /// Memory-mapped file (zero-copy access)
    Mapped(Arc<Mmap>),
    /// File path; data is read only when needed
    Path(PathBuf),
}

impl Source {
    /// Memory-map a file. Falls back to a plain read when mapping fails
    /// (e.g. on filesystems that refuse mmap).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| BytefitError::file_read_failed(path.to_string_lossy().to_string(), e))?;
        // Safety: the mapping is read-only and the file handle lives as long
        // as the map. Concurrent truncation by another process would still be
        // UB, which is the standard mmap caveat.
        match unsafe { Mmap::map(&file) } {
            Ok(mmap) => Ok(Source::Mapped(Arc::new(mmap))),
            Err(_) => {
                let data = std::fs::read(path).map_err(|e| {
                    BytefitError::file_read_failed(path.to_string_lossy().to_string(), e)
                })?;
                Ok(Source::Memory(Arc::new(data)))
            }
        }
    }

    /// Get the bytes directly - works for Memory and Mapped sources.
    /// Returns None for Path sources (load first).
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Source::Memory(data) => Some(data.as_slice()),
            Source::Mapped(mmap) => Some(mmap.as_ref()),
            Source::Path(_) => None,
        }
    }

    /// Load the actual bytes from the source. Path sources are read from
    /// disk; Mapped sources are copied into a Vec (prefer as_bytes()).
    pub fn load(&self) -> Result<Arc<Vec<u8>>> {
        match self {
            Source::Memory(data) => Ok(data.clone()),
            Source::Mapped(mmap) => Ok(Arc::new(mmap.as_ref().to_vec())),
            Source::Path(path) => {
                let data = std::fs::read(path).map_err(|e| {
                    BytefitError::file_read_failed(path.to_string_lossy().to_string(), e)
                })?;
                Ok(Arc::new(data))
            }
        }
    }

    /// Length of the source data; 0 for unloaded Path sources.
    pub fn len(&self) -> usize {
        match self {
            Source::Memory(data) => data.len(),
            Source::Mapped(mmap) => mmap.len(),
            Source::Path(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
