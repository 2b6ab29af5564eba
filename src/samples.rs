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

//! MIDI-triggered drum playback.
//!
//! This module provides:
//! - Choke groups and round-robin/velocity-layer selection on note-on
//! - Voice management with a global polyphony limit
//! - Sample-accurate mixing into the output buses

mod engine;
mod voice;

pub use engine::DrumEngine;
pub use voice::{Voice, VoicePool};
