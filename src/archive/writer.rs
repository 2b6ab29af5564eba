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
use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::ArchiveError;
use super::{ArchiveEntry, RESERVED_INDEX_BYTES};

/// Writes a packed sample archive.
///
/// Payloads are appended after the reserved index region as they are added;
/// the index itself is written at offset zero by [`ArchiveWriter::finish`].
pub struct ArchiveWriter<W: Write + Seek> {
    writer: W,
    entries: Vec<(String, ArchiveEntry)>,
    position: u64,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    /// Creates a writer and positions it at the start of the payload region.
    pub fn new(mut writer: W) -> Result<Self, ArchiveError> {
        writer.seek(SeekFrom::Start(RESERVED_INDEX_BYTES))?;
        Ok(Self {
            writer,
            entries: Vec::new(),
            position: RESERVED_INDEX_BYTES,
        })
    }

    /// Appends a file under the given archive-relative path.
    pub fn add(&mut self, path: &str, data: &[u8]) -> Result<ArchiveEntry, ArchiveError> {
        self.writer.write_all(data)?;
        let entry = ArchiveEntry {
            offset: self.position,
            size: data.len() as u64,
        };
        self.position += entry.size;
        self.entries.push((path.to_string(), entry));
        Ok(entry)
    }

    /// Size in bytes the index will occupy.
    fn index_size(&self) -> u64 {
        4 + self
            .entries
            .iter()
            .map(|(path, _)| 4 + path.len() as u64 + 16)
            .sum::<u64>()
    }

    /// Writes the index and returns the underlying writer.
    pub fn finish(mut self) -> Result<W, ArchiveError> {
        let index_size = self.index_size();
        if index_size > RESERVED_INDEX_BYTES {
            return Err(ArchiveError::IndexOverflow(index_size, RESERVED_INDEX_BYTES));
        }

        // With no payload the reserved region still has to exist for readers.
        if self.entries.is_empty() {
            self.writer.seek(SeekFrom::Start(RESERVED_INDEX_BYTES - 1))?;
            self.writer.write_all(&[0])?;
        }

        self.writer.seek(SeekFrom::Start(0))?;
        self.writer
            .write_all(&(self.entries.len() as u32).to_le_bytes())?;
        for (path, entry) in &self.entries {
            self.writer.write_all(&(path.len() as u32).to_le_bytes())?;
            self.writer.write_all(path.as_bytes())?;
            self.writer.write_all(&entry.offset.to_le_bytes())?;
            self.writer.write_all(&entry.size.to_le_bytes())?;
        }
        self.writer.flush()?;

        debug!(entries = self.entries.len(), index_size, "Archive index written");
        Ok(self.writer)
    }
}

/// The outcome of packing a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackSummary {
    /// Number of files written.
    pub entries: usize,
    /// Total payload bytes.
    pub payload_bytes: u64,
}

/// Packs every `.wav` file below `dir` into a new archive at `out`.
/// Paths are stored relative to `dir` with forward slashes, in sorted order.
pub fn pack_directory(dir: &Path, out: &Path) -> Result<PackSummary, ArchiveError> {
    let mut files = Vec::new();
    collect_wav_files(dir, &mut files)?;

    let mut relative: Vec<(String, PathBuf)> = files
        .into_iter()
        .filter_map(|path| {
            let rel = path.strip_prefix(dir).ok()?;
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            Some((name, path))
        })
        .collect();
    relative.sort_by(|a, b| a.0.cmp(&b.0));

    let mut writer = ArchiveWriter::new(BufWriter::new(File::create(out)?))?;
    let mut summary = PackSummary {
        entries: 0,
        payload_bytes: 0,
    };
    for (name, path) in relative {
        let data = fs::read(&path)?;
        let entry = writer.add(&name, &data)?;
        info!(path = %name, bytes = entry.size, "Added to archive");
        summary.entries += 1;
        summary.payload_bytes += entry.size;
    }
    writer.finish()?;

    info!(
        out = ?out,
        entries = summary.entries,
        payload_kb = summary.payload_bytes / 1024,
        "Archive written"
    );
    Ok(summary)
}

/// Recurse into the given path and collect all `.wav` files.
fn collect_wav_files(path: &Path, files: &mut Vec<PathBuf>) -> Result<(), ArchiveError> {
    for entry in fs::read_dir(path)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_wav_files(&path, files)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
        {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::archive::ArchiveReader;

    #[test]
    fn test_writer_layout() {
        let mut writer = ArchiveWriter::new(Cursor::new(Vec::new())).unwrap();
        let first = writer.add("a.wav", &[1, 2, 3]).unwrap();
        let second = writer.add("b/c.wav", &[4, 5]).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert_eq!(first.offset, RESERVED_INDEX_BYTES);
        assert_eq!(second.offset, RESERVED_INDEX_BYTES + 3);
        assert_eq!(bytes.len() as u64, RESERVED_INDEX_BYTES + 5);
        assert_eq!(&bytes[0..4], &2u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &5u32.to_le_bytes());
        assert_eq!(&bytes[8..13], b"a.wav");
    }

    #[test]
    fn test_empty_archive_is_readable() {
        let writer = ArchiveWriter::new(Cursor::new(Vec::new())).unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        assert_eq!(bytes.len() as u64, RESERVED_INDEX_BYTES);

        let archive = ArchiveReader::from_reader(Cursor::new(bytes)).unwrap();
        assert!(archive.is_empty());
    }

    #[test]
    fn test_index_overflow() {
        let mut writer = ArchiveWriter::new(Cursor::new(Vec::new())).unwrap();
        let long_name = "x".repeat(1024);
        for _ in 0..1100 {
            writer.add(&long_name, &[]).unwrap();
        }
        assert!(matches!(
            writer.finish(),
            Err(ArchiveError::IndexOverflow(_, RESERVED_INDEX_BYTES))
        ));
    }

    #[test]
    fn test_pack_directory() {
        let src = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("toms")).unwrap();
        fs::write(src.path().join("kick_in_r1.wav"), b"kick").unwrap();
        fs::write(src.path().join("toms/racktom1_r1.WAV"), b"tom").unwrap();
        fs::write(src.path().join("notes.txt"), b"ignored").unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        let out = out_dir.path().join("sounds.pak");
        let summary = pack_directory(src.path(), &out).unwrap();

        assert_eq!(summary.entries, 2);
        assert_eq!(summary.payload_bytes, 7);

        let mut archive = ArchiveReader::open(&out).unwrap();
        assert_eq!(archive.read("kick_in_r1.wav"), Some(b"kick".to_vec()));
        assert_eq!(archive.read("toms/racktom1_r1.WAV"), Some(b"tom".to_vec()));
        assert!(!archive.contains("notes.txt"));
    }
}
