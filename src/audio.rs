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
pub mod bus;
#[cfg(feature = "live")]
pub mod cpal;
pub mod decode;
pub mod error;
pub mod output;
pub mod sample;
pub mod wav;

pub use bus::{bus_file_stem, bus_index, BUS_NAMES, NUM_OUTPUT_BUSES};
pub use decode::{SampleDecoder, SymphoniaDecoder};
pub use error::DecodeError;
pub use output::OutputRenderer;
pub use sample::Sample;
