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

//! The drum engine: turns note-ons into voices and voices into bus audio.
//!
//! Everything here runs on the render thread. After construction nothing
//! allocates, blocks or fails.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use tracing::debug;

use super::voice::{Voice, VoicePool};
use crate::config::{EngineConfig, GainCurve};
use crate::kit::InstrumentLibrary;
use crate::midi::{EngineCommand, NoteEvent};

pub struct DrumEngine {
    /// The instruments. Only the round-robin cursors change after construction.
    library: InstrumentLibrary,
    /// Sounding voices.
    voices: VoicePool,
    /// Velocity to gain mapping, fixed for the engine's lifetime.
    gain_curve: GainCurve,
    /// Choke ids of the note being triggered.
    choke_scratch: Vec<u32>,
}

impl DrumEngine {
    pub fn new(library: InstrumentLibrary, config: EngineConfig) -> Self {
        let choke_scratch = Vec::with_capacity(library.max_groups_per_note());
        Self {
            library,
            voices: VoicePool::new(config.max_voices),
            gain_curve: config.gain_curve,
            choke_scratch,
        }
    }

    /// Triggers a note. Unknown notes and velocity 0 are ignored. Returns the
    /// number of voices started.
    pub fn note_on(&mut self, note: u8, velocity: u8) -> usize {
        if velocity == 0 {
            return 0;
        }
        let velocity = velocity.min(127);

        let groups = self.library.groups(note);
        if groups.is_empty() {
            return 0;
        }

        // Choking happens before any new voice for this note exists, so a note
        // in a choke group also cuts its own previous hits.
        self.choke_scratch.clear();
        for group in groups {
            let id = group.choke_group();
            if id != 0 && !self.choke_scratch.contains(&id) {
                self.choke_scratch.push(id);
            }
        }
        if !self.choke_scratch.is_empty() {
            self.voices.choke(&self.choke_scratch);
        }

        let gain = self.gain_curve.gain(velocity);
        let mut started = 0;
        for group in self.library.groups_mut(note) {
            let output = group.output();
            let choke_group = group.choke_group();
            let Some(sample) = group.next_sample(velocity) else {
                continue;
            };
            if sample.is_empty() {
                continue;
            }

            let voice = Voice::new(Arc::clone(sample), output, gain, choke_group);
            if self.voices.add(voice) {
                debug!(
                    note,
                    max_voices = self.voices.max_voices(),
                    "Voice limit reached, dropped oldest voice"
                );
            }
            started += 1;
        }
        started
    }

    /// Handles a raw MIDI message.
    pub fn handle_midi(&mut self, raw: &[u8]) -> usize {
        match NoteEvent::parse(raw) {
            Some(event) => self.handle_event(event),
            None => 0,
        }
    }

    pub fn handle_event(&mut self, event: NoteEvent) -> usize {
        self.note_on(event.note, event.velocity)
    }

    pub fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Note(event) => {
                self.handle_event(event);
            }
            EngineCommand::Reset => self.reset(),
        }
    }

    /// Renders `frames` frames into the connected buses. Connected buses are
    /// overwritten, `None` entries are skipped. If any connected bus is shorter
    /// than `frames`, only that many frames are rendered. Zero frames is a no-op.
    pub fn render(&mut self, outputs: &mut [Option<&mut [f32]>], frames: usize) {
        if frames == 0 {
            return;
        }
        let frames = outputs
            .iter()
            .flatten()
            .map(|bus| bus.len())
            .fold(frames, usize::min);
        if frames == 0 {
            return;
        }

        for bus in outputs.iter_mut().flatten() {
            bus[..frames].fill(0.0);
        }
        self.voices.mix_into(outputs, frames);
    }

    /// Applies every queued command, then renders. Never blocks.
    pub fn process_block(
        &mut self,
        commands: &Receiver<EngineCommand>,
        outputs: &mut [Option<&mut [f32]>],
        frames: usize,
    ) {
        while let Ok(command) = commands.try_recv() {
            self.handle_command(command);
        }
        self.render(outputs, frames);
    }

    /// Stops every voice. Round-robin positions are kept.
    pub fn reset(&mut self) {
        self.voices.clear();
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.active_count()
    }

    pub fn voices(&self) -> &VoicePool {
        &self.voices
    }

    pub fn library(&self) -> &InstrumentLibrary {
        &self.library
    }

    pub fn gain_curve(&self) -> GainCurve {
        self.gain_curve
    }
}

impl std::fmt::Debug for DrumEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrumEngine")
            .field("notes", &self.library.note_count())
            .field("voices", &self.voices)
            .field("gain_curve", &self.gain_curve)
            .finish()
    }
}
