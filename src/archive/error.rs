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
/// Error types for archive reading and packing
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Archive index truncated at entry {0}")]
    TruncatedIndex(u32),

    #[error("Archive entry {0} has a path that is not valid UTF-8")]
    InvalidPath(u32),

    #[error("Archive entry {0} has an implausible path length of {1} bytes")]
    PathTooLong(u32, u32),

    #[error("Payload for {path} is truncated: expected {expected} bytes, got {actual}")]
    TruncatedPayload {
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error("Archive index needs {0} bytes but only {1} are reserved")]
    IndexOverflow(u64, u64),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
