// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, info, warn};

use super::error::ArchiveError;
use super::ArchiveEntry;

/// Upper bound for a single path record. Anything larger means a corrupt index.
const MAX_PATH_LENGTH: u32 = 64 * 1024;

/// Reads named files out of a packed sample archive.
///
/// Only the index is loaded when the archive is opened; payloads are read on
/// demand with blocking I/O, so this must never be used from the audio thread.
pub struct ArchiveReader<R> {
    reader: R,
    index: HashMap<String, ArchiveEntry>,
}

impl ArchiveReader<BufReader<File>> {
    /// Opens the archive at the given path and reads its index.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|e| {
            ArchiveError::IoError(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        let archive = Self::from_reader(BufReader::new(file))?;
        info!(path = ?path, entries = archive.len(), "Opened sample archive");
        Ok(archive)
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Reads the index from any seekable byte source.
    pub fn from_reader(mut reader: R) -> Result<Self, ArchiveError> {
        reader.seek(SeekFrom::Start(0))?;

        let count = read_u32(&mut reader).map_err(|e| truncated(e, 0))?;
        let mut index = HashMap::new();
        for entry in 0..count {
            let path_length = read_u32(&mut reader).map_err(|e| truncated(e, entry))?;
            if path_length > MAX_PATH_LENGTH {
                return Err(ArchiveError::PathTooLong(entry, path_length));
            }

            let mut path = vec![0u8; path_length as usize];
            reader
                .read_exact(&mut path)
                .map_err(|e| truncated(e, entry))?;
            let path = String::from_utf8(path).map_err(|_| ArchiveError::InvalidPath(entry))?;

            let offset = read_u64(&mut reader).map_err(|e| truncated(e, entry))?;
            let size = read_u64(&mut reader).map_err(|e| truncated(e, entry))?;

            // Later records for the same path replace earlier ones.
            index.insert(path, ArchiveEntry { offset, size });
        }

        debug!(entries = index.len(), "Archive index loaded");
        Ok(Self { reader, index })
    }

    /// Reads the file stored under `path`. Missing entries and I/O failures are
    /// logged and reported as `None`.
    pub fn read(&mut self, path: &str) -> Option<Vec<u8>> {
        match self.try_read(path) {
            Ok(Some(data)) => Some(data),
            Ok(None) => {
                warn!(path, "Sample not found in archive");
                None
            }
            Err(e) => {
                warn!(path, error = %e, "Failed to read sample from archive");
                None
            }
        }
    }

    /// Reads the file stored under `path`, returning `Ok(None)` if it is not in the index.
    pub fn try_read(&mut self, path: &str) -> Result<Option<Vec<u8>>, ArchiveError> {
        let entry = match self.index.get(path) {
            Some(entry) => *entry,
            None => return Ok(None),
        };

        self.reader.seek(SeekFrom::Start(entry.offset))?;
        let mut data = Vec::new();
        (&mut self.reader).take(entry.size).read_to_end(&mut data)?;
        if data.len() as u64 != entry.size {
            return Err(ArchiveError::TruncatedPayload {
                path: path.to_string(),
                expected: entry.size,
                actual: data.len() as u64,
            });
        }

        Ok(Some(data))
    }

    /// Returns the index entry for a path.
    pub fn entry(&self, path: &str) -> Option<ArchiveEntry> {
        self.index.get(path).copied()
    }

    /// Returns true if the archive has an entry for the path.
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// All entries sorted by path.
    pub fn entries(&self) -> Vec<(&str, ArchiveEntry)> {
        let mut entries: Vec<(&str, ArchiveEntry)> = self
            .index
            .iter()
            .map(|(path, entry)| (path.as_str(), *entry))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl<R> std::fmt::Debug for ArchiveReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("entries", &self.index.len())
            .finish()
    }
}

fn read_u32<R: Read>(reader: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> std::io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn truncated(e: std::io::Error, entry: u32) -> ArchiveError {
    if e.kind() == ErrorKind::UnexpectedEof {
        ArchiveError::TruncatedIndex(entry)
    } else {
        ArchiveError::IoError(e)
    }
}
