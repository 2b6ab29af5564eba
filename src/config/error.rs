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
/// Typed error for config load/parse failures and kit validation, so callers can
/// distinguish e.g. file-not-found from a bad note number without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Instrument {stem}: note {note} is outside 0-127")]
    InvalidNote { stem: String, note: u8 },

    #[error("Instrument {stem}: output bus {output} does not exist ({buses} buses)")]
    InvalidOutput {
        stem: String,
        output: usize,
        buses: usize,
    },

    #[error("Instrument {stem}: stereo output on bus {output} has no bus for its right channel")]
    StereoOutOfRange { stem: String, output: usize },

    #[error("Instrument {0} has no round robins")]
    NoRoundRobins(String),

    #[error("Instrument {0} has no velocity layers")]
    NoLayers(String),

    #[error("Instrument {stem}: {layers} velocity layers, at most {max} are possible")]
    TooManyLayers { stem: String, layers: usize, max: usize },

    #[error("Instrument {0} has no notes")]
    NoNotes(String),

    #[error("Choke group ids must be non-zero")]
    ZeroChokeGroup,

    #[error("Choke group {id}: note {note} is outside 0-127")]
    InvalidChokeNote { id: u32, note: u8 },

    #[error("Unknown output bus {0}")]
    UnknownBus(String),

    #[error("Bus {0} is mapped to channel 0; device channels start at 1")]
    InvalidChannel(String),

    #[error("At least one voice is required")]
    NoVoices,
}
