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

//! Voice management for polyphonic sample playback.
//!
//! Handles voice allocation, choking, oldest-first stealing and mixing.

use std::sync::Arc;

use crate::audio::Sample;

/// Represents an active voice playing a sample.
pub struct Voice {
    /// The sample being played. Shared with the library.
    sample: Arc<Sample>,
    /// Next frame to play.
    position: usize,
    /// Total frames in the sample.
    length: usize,
    /// Output bus. Stereo samples also write to the next bus.
    output: usize,
    /// Linear gain derived from the trigger velocity.
    gain: f32,
    /// Choke group inherited from the triggering group, 0 for none.
    choke_group: u32,
}

impl Voice {
    /// Creates a new voice at the start of the sample.
    pub fn new(sample: Arc<Sample>, output: usize, gain: f32, choke_group: u32) -> Self {
        let length = sample.frames();
        Self {
            sample,
            position: 0,
            length,
            output,
            gain,
            choke_group,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn output(&self) -> usize {
        self.output
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn choke_group(&self) -> u32 {
        self.choke_group
    }

    pub fn sample(&self) -> &Arc<Sample> {
        &self.sample
    }

    /// True once every frame has been played, or if there was nothing to play.
    pub fn is_finished(&self) -> bool {
        self.position >= self.length || self.sample.is_empty()
    }

    /// Adds up to `frames` frames into the output buses and advances the voice.
    /// Every connected bus must hold at least `frames` samples.
    fn mix_into(&mut self, outputs: &mut [Option<&mut [f32]>], frames: usize) {
        let available = frames.min(self.length.saturating_sub(self.position));
        if available == 0 {
            return;
        }
        let range = self.position..self.position + available;
        let gain = self.gain;

        if let Some(Some(bus)) = outputs.get_mut(self.output) {
            for (out, &sample) in bus[..available].iter_mut().zip(&self.sample.left()[range.clone()]) {
                *out += sample * gain;
            }
        }

        if let Some(right) = self.sample.right() {
            if let Some(Some(bus)) = outputs.get_mut(self.output + 1) {
                for (out, &sample) in bus[..available].iter_mut().zip(&right[range]) {
                    *out += sample * gain;
                }
            }
        }

        self.position += available;
    }
}

impl std::fmt::Debug for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Voice")
            .field("position", &self.position)
            .field("length", &self.length)
            .field("output", &self.output)
            .field("gain", &self.gain)
            .field("choke_group", &self.choke_group)
            .finish()
    }
}

/// The set of sounding voices, oldest first.
///
/// Storage is allocated once up front so adding a voice never reallocates.
pub struct VoicePool {
    voices: Vec<Voice>,
    max_voices: usize,
}

impl VoicePool {
    /// Creates a new voice pool.
    pub fn new(max_voices: usize) -> Self {
        Self {
            // One extra slot holds the newcomer before the oldest voice is dropped.
            voices: Vec::with_capacity(max_voices + 1),
            max_voices,
        }
    }

    /// Stops every voice belonging to one of the given choke groups.
    /// Returns the number of voices removed.
    pub fn choke(&mut self, groups: &[u32]) -> usize {
        let before = self.voices.len();
        self.voices
            .retain(|v| v.choke_group == 0 || !groups.contains(&v.choke_group));
        before - self.voices.len()
    }

    /// Adds a voice. If the pool is over its limit afterwards the oldest voice
    /// is dropped immediately and true is returned.
    pub fn add(&mut self, voice: Voice) -> bool {
        self.voices.push(voice);
        if self.voices.len() > self.max_voices {
            self.voices.remove(0);
            return true;
        }
        false
    }

    /// Mixes `frames` frames of every voice into the buses, then retires the
    /// voices that have finished. The buses are added to, not cleared.
    pub fn mix_into(&mut self, outputs: &mut [Option<&mut [f32]>], frames: usize) {
        for voice in self.voices.iter_mut() {
            voice.mix_into(outputs, frames);
        }
        self.voices.retain(|v| !v.is_finished());
    }

    /// Returns the current number of active voices.
    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices
    }

    /// The active voices, oldest first.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Clears all voices.
    pub fn clear(&mut self) {
        self.voices.clear();
    }
}

impl std::fmt::Debug for VoicePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoicePool")
            .field("active_voices", &self.voices.len())
            .field("max_voices", &self.max_voices)
            .finish()
    }
}
