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
use std::fs;
use std::io::{ErrorKind, Read, Seek};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::archive::{ArchiveError, ArchiveReader};

/// Something that can hand out the raw bytes of named audio files.
///
/// Reads happen during library construction only. A missing or unreadable
/// asset is reported as `None` and the build carries on without it.
pub trait AssetSource {
    /// Returns the bytes stored under the archive-relative path.
    fn read(&mut self, path: &str) -> Option<Vec<u8>>;
}

impl<R: Read + Seek> AssetSource for ArchiveReader<R> {
    fn read(&mut self, path: &str) -> Option<Vec<u8>> {
        ArchiveReader::read(self, path)
    }
}

/// Loose sample files in a directory tree.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl AssetSource for DirectorySource {
    fn read(&mut self, path: &str) -> Option<Vec<u8>> {
        let full_path = self.root.join(path);
        match fs::read(&full_path) {
            Ok(data) => Some(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = ?full_path, "Sample file not found");
                None
            }
            Err(e) => {
                warn!(path = ?full_path, error = %e, "Failed to read sample file");
                None
            }
        }
    }
}

/// Opens a sample archive, or a folder of loose samples if `path` is a
/// directory.
pub fn open_source(path: &Path) -> Result<Box<dyn AssetSource>, ArchiveError> {
    if path.is_dir() {
        debug!(path = ?path, "Loading samples from a directory");
        return Ok(Box::new(DirectorySource::new(path)));
    }
    Ok(Box::new(ArchiveReader::open(path)?))
}

/// Assets held in memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, data: Vec<u8>) {
        self.files.insert(path.to_string(), data);
    }
}

impl AssetSource for MemorySource {
    fn read(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.get(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::testutil::archive_bytes;

    #[test]
    fn test_archive_source() {
        let bytes = archive_bytes(&[("kick_in_r1.wav", vec![1, 2, 3])]);
        let mut source = ArchiveReader::from_reader(Cursor::new(bytes)).unwrap();
        let source: &mut dyn AssetSource = &mut source;

        assert_eq!(source.read("kick_in_r1.wav"), Some(vec![1, 2, 3]));
        assert_eq!(source.read("kick_in_r2.wav"), None);
    }

    #[test]
    fn test_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("snare")).unwrap();
        fs::write(dir.path().join("snare/top_r1.wav"), b"snare").unwrap();

        let mut source = DirectorySource::new(dir.path());
        assert_eq!(source.read("snare/top_r1.wav"), Some(b"snare".to_vec()));
        assert_eq!(source.read("snare/top_r2.wav"), None);
    }

    #[test]
    fn test_open_source_picks_directory_or_archive() {
        use crate::config::{InstrumentEntry, KitDefinition, NamingScheme};
        use crate::kit::LibraryBuilder;
        use crate::testutil::wav_bytes_f32;

        let kit = KitDefinition {
            instruments: vec![
                InstrumentEntry::new(&[38], "snare_top", 2, 2).with_naming(NamingScheme::Legacy)
            ],
            choke_groups: Vec::new(),
        };

        let dir = tempfile::tempdir().unwrap();
        let samples = dir.path().join("samples");
        fs::create_dir_all(&samples).unwrap();
        fs::write(
            samples.join("snare_top_r1.wav"),
            wav_bytes_f32(1, 44100, &[0.5; 4]),
        )
        .unwrap();
        fs::write(
            samples.join("snare_top_r2.wav"),
            wav_bytes_f32(1, 44100, &[0.25; 4]),
        )
        .unwrap();

        let mut source = open_source(&samples).unwrap();
        let (library, report) = LibraryBuilder::new().build(&kit, &mut *source);
        assert!(report.is_complete());
        assert_eq!(library.groups(38)[0].layers()[0].len(), 2);

        let pak = dir.path().join("drums.pak");
        fs::write(
            &pak,
            archive_bytes(&[("snare_top_r1.wav", wav_bytes_f32(1, 44100, &[0.5; 4]))]),
        )
        .unwrap();
        let mut source = open_source(&pak).unwrap();
        let (library, report) = LibraryBuilder::new().build(&kit, &mut *source);
        assert_eq!(report.missing, vec!["snare_top_r2.wav".to_string()]);
        assert_eq!(library.sample_count(), 1);

        assert!(open_source(&dir.path().join("nothing.pak")).is_err());
    }

    #[test]
    fn test_memory_source() {
        let mut source = MemorySource::new();
        source.insert("a.wav", vec![7]);
        assert_eq!(source.read("a.wav"), Some(vec![7]));
        assert_eq!(source.read("b.wav"), None);
    }
}
