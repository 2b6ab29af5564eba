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

/// Decoded PCM audio for a single recording.
///
/// A sample is either mono (`right` is absent) or stereo, in which case both
/// channels hold the same number of frames. Samples are immutable once decoded
/// and are shared between voices behind an `Arc`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sample {
    left: Vec<f32>,
    right: Option<Vec<f32>>,
    sample_rate: u32,
}

impl Sample {
    /// Creates a mono sample.
    pub fn mono(left: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            left,
            right: None,
            sample_rate,
        }
    }

    /// Creates a stereo sample. Both channels are truncated to the shorter of the two.
    pub fn stereo(mut left: Vec<f32>, mut right: Vec<f32>, sample_rate: u32) -> Self {
        let frames = left.len().min(right.len());
        left.truncate(frames);
        right.truncate(frames);
        Self {
            left,
            right: Some(right),
            sample_rate,
        }
    }

    /// Creates a sample with no audio. Empty samples are never played.
    pub fn empty(sample_rate: u32) -> Self {
        Self::mono(Vec::new(), sample_rate)
    }

    /// The left (or only) channel.
    #[inline]
    pub fn left(&self) -> &[f32] {
        &self.left
    }

    /// The right channel, present only for stereo samples.
    #[inline]
    pub fn right(&self) -> Option<&[f32]> {
        self.right.as_deref()
    }

    /// Number of frames (samples per channel).
    #[inline]
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    /// Native sample rate of the decoded file.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn is_stereo(&self) -> bool {
        self.right.is_some()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Returns the memory size of the PCM data in bytes.
    pub fn memory_size(&self) -> usize {
        let channels = if self.is_stereo() { 2 } else { 1 };
        self.frames() * channels * std::mem::size_of::<f32>()
    }
}
