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

//! Fills interleaved device buffers from the engine's output buses.

use crossbeam_channel::Receiver;
use tracing::warn;

use super::bus::{bus_file_stem, NUM_OUTPUT_BUSES};
use crate::midi::EngineCommand;
use crate::samples::DrumEngine;

/// Owns the engine on the audio thread.
///
/// Bus scratch is allocated up front. `fill` never allocates.
pub struct OutputRenderer {
    engine: DrumEngine,
    commands: Receiver<EngineCommand>,
    /// One buffer per bus, `block_frames` long.
    scratch: [Vec<f32>; NUM_OUTPUT_BUSES],
    /// Buses with at least one device channel. Others are never rendered.
    connected: [bool; NUM_OUTPUT_BUSES],
    /// (bus, device channel) pairs.
    routes: Vec<(usize, usize)>,
    channels: usize,
    block_frames: usize,
}

impl OutputRenderer {
    /// `mappings[bus]` lists the 0-indexed device channels the bus is sent to.
    /// Channels the device doesn't have are dropped with a warning.
    pub fn new(
        engine: DrumEngine,
        commands: Receiver<EngineCommand>,
        mappings: &[Vec<usize>],
        channels: usize,
        block_frames: usize,
    ) -> Self {
        let block_frames = block_frames.max(1);
        let mut routes = Vec::new();
        let mut connected = [false; NUM_OUTPUT_BUSES];
        for (bus, targets) in mappings.iter().enumerate().take(NUM_OUTPUT_BUSES) {
            for &channel in targets {
                if channel >= channels {
                    warn!(
                        bus = bus_file_stem(bus),
                        channel = channel + 1,
                        device_channels = channels,
                        "Bus mapped to a channel the device does not have, ignoring"
                    );
                    continue;
                }
                routes.push((bus, channel));
                connected[bus] = true;
            }
        }

        OutputRenderer {
            engine,
            commands,
            scratch: std::array::from_fn(|_| vec![0.0; block_frames]),
            connected,
            routes,
            channels,
            block_frames,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn routes(&self) -> &[(usize, usize)] {
        &self.routes
    }

    pub fn engine(&self) -> &DrumEngine {
        &self.engine
    }

    /// Overwrites an interleaved buffer. Queued commands are applied once at
    /// the start of the buffer. Buses sharing a device channel are summed.
    pub fn fill(&mut self, data: &mut [f32]) {
        data.fill(0.0);
        if self.channels == 0 {
            return;
        }
        let total = data.len() / self.channels;

        let mut drained = false;
        let mut offset = 0;
        while offset < total {
            let frames = (total - offset).min(self.block_frames);
            {
                let mut buffers = self.scratch.iter_mut();
                let connected = &self.connected;
                let mut outputs: [Option<&mut [f32]>; NUM_OUTPUT_BUSES] =
                    std::array::from_fn(|bus| {
                        let buffer = buffers.next()?;
                        if connected[bus] {
                            Some(&mut buffer[..frames])
                        } else {
                            None
                        }
                    });
                if drained {
                    self.engine.render(&mut outputs, frames);
                } else {
                    self.engine
                        .process_block(&self.commands, &mut outputs, frames);
                    drained = true;
                }
            }

            let block = &mut data[offset * self.channels..(offset + frames) * self.channels];
            for (frame, out) in block.chunks_exact_mut(self.channels).enumerate() {
                for &(bus, channel) in &self.routes {
                    out[channel] += self.scratch[bus][frame];
                }
            }
            offset += frames;
        }

        if !drained {
            self.engine.process_block(&self.commands, &mut [], 0);
        }
    }
}

impl std::fmt::Debug for OutputRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputRenderer")
            .field("engine", &self.engine)
            .field("routes", &self.routes)
            .field("channels", &self.channels)
            .field("block_frames", &self.block_frames)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::Sample;
    use crate::config::EngineConfig;
    use crate::kit::{InstrumentLibrary, VelocityRange};
    use crate::midi::{command_channel, CommandSender};

    fn renderer(
        mappings: &[Vec<usize>],
        channels: usize,
        block_frames: usize,
    ) -> (OutputRenderer, CommandSender) {
        let mut library = InstrumentLibrary::new();
        library.insert(
            36,
            0,
            VelocityRange::FULL,
            Arc::new(Sample::mono(vec![1.0; 4], 44100)),
        );
        library.insert(
            36,
            11,
            VelocityRange::FULL,
            Arc::new(Sample::stereo(vec![0.25; 4], vec![0.5; 4], 44100)),
        );
        let engine = DrumEngine::new(library, EngineConfig::default());
        let (sender, receiver) = command_channel();
        (
            OutputRenderer::new(engine, receiver, mappings, channels, block_frames),
            sender,
        )
    }

    #[test]
    fn test_routes_buses_to_channels() {
        let mut mappings = vec![Vec::new(); NUM_OUTPUT_BUSES];
        mappings[0] = vec![0];
        mappings[11] = vec![1];
        mappings[12] = vec![1, 2];
        let (mut output, sender) = renderer(&mappings, 3, 64);
        assert!(sender.send_midi(&[0x99, 36, 127]));

        let mut data = vec![9.0f32; 6];
        output.fill(&mut data);
        assert_eq!(data, vec![1.0, 0.75, 0.5, 1.0, 0.75, 0.5]);
    }

    #[test]
    fn test_out_of_range_channels_are_dropped() {
        let mut mappings = vec![Vec::new(); NUM_OUTPUT_BUSES];
        mappings[0] = vec![0, 5];
        let (output, _sender) = renderer(&mappings, 2, 64);
        assert_eq!(output.routes(), &[(0, 0)]);
    }

    #[test]
    fn test_fill_in_chunks_matches_block_size() {
        let mut mappings = vec![Vec::new(); NUM_OUTPUT_BUSES];
        mappings[0] = vec![0];
        let (mut output, sender) = renderer(&mappings, 1, 3);
        sender.send_midi(&[0x90, 36, 127]);

        let mut data = vec![0.0f32; 6];
        output.fill(&mut data);
        assert_eq!(data, vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
        assert_eq!(output.engine().active_voice_count(), 0);
    }

    #[test]
    fn test_commands_drained_with_empty_buffer() {
        let mappings = vec![vec![0]];
        let (mut output, sender) = renderer(&mappings, 1, 8);
        sender.send_midi(&[0x90, 36, 100]);
        output.fill(&mut []);
        assert_eq!(output.engine().active_voice_count(), 2);
    }
}
