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
use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;

use super::engine::EngineConfig;
use super::error::ConfigError;
use super::kit::KitDefinition;
use crate::audio::{bus_index, NUM_OUTPUT_BUSES};

/// Default session sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default number of frames rendered per engine block.
pub const DEFAULT_BUFFER_SIZE: u32 = 256;

/// The configuration for the live player.
#[derive(Deserialize, Clone, Debug)]
pub struct PlayerConfig {
    /// The sample archive to load, or a folder of loose samples.
    archive: PathBuf,

    /// A kit definition file. The built-in kit is used when absent.
    kit: Option<PathBuf>,

    /// The audio output device.
    audio_device: String,

    /// The MIDI input device. Without one the player only renders silence.
    midi_device: Option<String>,

    #[serde(default = "default_sample_rate")]
    sample_rate: u32,

    #[serde(default = "default_buffer_size")]
    buffer_size: u32,

    /// Bus name (or index) to 1-indexed device channels.
    #[serde(default)]
    bus_mappings: HashMap<String, Vec<u16>>,

    #[serde(default)]
    engine: EngineConfig,
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

fn default_buffer_size() -> u32 {
    DEFAULT_BUFFER_SIZE
}

impl PlayerConfig {
    /// Deserializes a player config file. Relative archive and kit paths are
    /// resolved against the directory holding the config file.
    pub fn deserialize(path: &Path) -> Result<PlayerConfig, ConfigError> {
        let mut player = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<PlayerConfig>()?;

        if let Some(base) = path.parent() {
            player.archive = base.join(&player.archive);
            player.kit = player.kit.map(|kit| base.join(kit));
        }
        player.validate()?;
        Ok(player)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.channel_mappings().map(|_| ())
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    pub fn kit(&self) -> Option<&Path> {
        self.kit.as_deref()
    }

    pub fn audio_device(&self) -> &str {
        &self.audio_device
    }

    pub fn midi_device(&self) -> Option<&str> {
        self.midi_device.as_deref()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    pub fn engine(&self) -> EngineConfig {
        self.engine
    }

    /// Loads the configured kit, falling back to the built-in one.
    pub fn kit_definition(&self) -> Result<KitDefinition, ConfigError> {
        match &self.kit {
            Some(path) => KitDefinition::deserialize(path),
            None => Ok(KitDefinition::builtin()),
        }
    }

    /// Zero-indexed device channels for every bus. Without explicit mappings each
    /// bus goes to the device channel with the same index.
    pub fn channel_mappings(&self) -> Result<Vec<Vec<usize>>, ConfigError> {
        if self.bus_mappings.is_empty() {
            return Ok((0..NUM_OUTPUT_BUSES).map(|bus| vec![bus]).collect());
        }

        let mut mappings = vec![Vec::new(); NUM_OUTPUT_BUSES];
        for (name, channels) in &self.bus_mappings {
            let bus = bus_index(name).ok_or_else(|| ConfigError::UnknownBus(name.clone()))?;
            for &channel in channels {
                if channel == 0 {
                    return Err(ConfigError::InvalidChannel(name.clone()));
                }
                mappings[bus].push((channel - 1) as usize);
            }
        }
        Ok(mappings)
    }

    /// Number of device channels the mappings need.
    pub fn output_channels(&self) -> Result<u16, ConfigError> {
        let highest = self
            .channel_mappings()?
            .iter()
            .flatten()
            .max()
            .map_or(0, |&channel| channel + 1);
        Ok(highest as u16)
    }
}
