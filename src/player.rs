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

//! Live playback: MIDI in, drums out through an audio interface.

use midir::MidiInputConnection;
use tracing::{info, span, warn, Level};

use crate::archive::ArchiveError;
use crate::audio::{self, OutputRenderer};
use crate::config::{ConfigError, PlayerConfig};
use crate::kit::{open_source, BuildReport, LibraryBuilder};
use crate::midi::{self, command_channel, CommandSender, EngineCommand};
use crate::samples::DrumEngine;

/// Error types for live playback
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("No device found with name {0}")]
    DeviceNotFound(String),

    #[error("Found too many devices that match ({0}), use a less ambiguous device name")]
    AmbiguousDevice(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Unsupported sample format {0}")]
    UnsupportedSampleFormat(String),

    #[error("Device channel count {0} is out of range")]
    InvalidChannelCount(usize),

    #[error("Host unavailable: {0}")]
    HostUnavailable(#[from] cpal::HostUnavailable),

    #[error("Unable to list devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("Unable to get default stream config: {0}")]
    DefaultStreamConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Unable to build stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Unable to play stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("MIDI init error: {0}")]
    MidiInit(#[from] midir::InitError),

    #[error("MIDI port error: {0}")]
    MidiPortInfo(#[from] midir::PortInfoError),

    #[error("MIDI connect error: {0}")]
    MidiConnect(String),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A running live session. Playback stops when it is dropped.
pub struct Session {
    sender: CommandSender,
    report: BuildReport,
    _stream: cpal::Stream,
    _connection: Option<MidiInputConnection<()>>,
}

impl Session {
    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Silences every sounding voice.
    pub fn reset(&self) -> bool {
        self.sender.send(EngineCommand::Reset)
    }
}

/// Wires a player config to an audio device and a MIDI input.
pub struct Player {
    config: PlayerConfig,
}

impl Player {
    pub fn new(config: PlayerConfig) -> Player {
        Player { config }
    }

    /// Loads the kit, opens the devices and starts playback.
    pub fn start(&self) -> Result<Session, PlayerError> {
        let span = span!(Level::INFO, "player start");
        let _enter = span.enter();

        let kit = self.config.kit_definition()?;
        let mut source = open_source(self.config.archive())?;
        let (library, report) = LibraryBuilder::new()
            .expected_sample_rate(self.config.sample_rate())
            .build(&kit, &mut *source);
        if !report.is_complete() {
            warn!(
                missing = report.missing.len(),
                failed = report.failed.len(),
                empty = report.empty.len(),
                "Kit is incomplete, some notes will be silent"
            );
        }

        let device = audio::cpal::Device::get(self.config.audio_device())?;
        let mappings = self.config.channel_mappings()?;
        let wanted = self.config.output_channels()?;
        let channels = wanted.clamp(1, device.max_channels().max(1));
        if channels < wanted {
            warn!(
                device = device.name(),
                wanted,
                available = device.max_channels(),
                "Device has fewer channels than the bus mappings need"
            );
        }

        let engine = DrumEngine::new(library, self.config.engine());
        let (sender, receiver) = command_channel();
        let renderer = OutputRenderer::new(
            engine,
            receiver,
            &mappings,
            channels as usize,
            self.config.buffer_size() as usize,
        );
        let stream = device.play(
            renderer,
            self.config.sample_rate(),
            self.config.buffer_size(),
        )?;

        let connection = match self.config.midi_device() {
            Some(name) => Some(midi::midir::get(name)?.watch(sender.clone())?),
            None => {
                info!("No MIDI device configured, only injected commands will play");
                None
            }
        };

        info!(
            audio_device = device.name(),
            samples = report.inserted,
            "Player started"
        );
        Ok(Session {
            sender,
            report,
            _stream: stream,
            _connection: connection,
        })
    }
}
