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

//! Instrument library construction.
//!
//! All samples are decoded into memory before playback starts. Nothing in this
//! module is touched by the render path except the library's round-robin cursors.

mod builder;
mod library;
mod source;

pub use builder::{BuildReport, LibraryBuilder};
pub use library::{
    velocity_ranges, InstrumentLibrary, OutputGroup, VelocityLayer, VelocityRange, NUM_NOTES,
};
pub use source::{open_source, AssetSource, DirectorySource, MemorySource};
