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

//! A multi-microphone drum sampler.
//!
//! Samples are packed into a single archive, decoded into an instrument
//! library at startup and triggered by MIDI note-ons. Each hit is mixed into
//! fifteen mono buses, one per microphone.

pub mod archive;
pub mod audio;
pub mod config;
pub mod kit;
pub mod midi;
#[cfg(feature = "live")]
pub mod player;
pub mod render;
pub mod samples;
#[cfg(test)]
mod testutil;
