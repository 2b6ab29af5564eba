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

//! Packed sample archives.
//!
//! An archive is a single file holding many named audio files. The layout is
//! little-endian:
//!
//! ```text
//! u32 entry_count
//! entry_count x { u32 path_length; u8 path[path_length]; u64 offset; u64 size }
//! ... zero padding up to RESERVED_INDEX_BYTES ...
//! concatenated payloads at the recorded offsets
//! ```

mod error;
mod reader;
mod writer;

pub use error::ArchiveError;
pub use reader::ArchiveReader;
pub use writer::{pack_directory, ArchiveWriter, PackSummary};

/// Bytes reserved at the start of an archive for the index.
pub const RESERVED_INDEX_BYTES: u64 = 1024 * 1024;

/// The location of one file inside an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Absolute byte offset of the payload.
    pub offset: u64,
    /// Payload length in bytes.
    pub size: u64,
}
