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

//! The in-memory instrument library: notes, microphone groups, velocity layers
//! and their round-robin pools.

use std::collections::HashSet;
use std::sync::Arc;

use crate::audio::Sample;

/// Number of addressable MIDI notes.
pub const NUM_NOTES: usize = 128;

/// An inclusive MIDI velocity range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VelocityRange {
    pub min: u8,
    pub max: u8,
}

impl VelocityRange {
    /// The range covering every audible velocity.
    pub const FULL: VelocityRange = VelocityRange { min: 1, max: 127 };

    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    /// Returns true if the velocity falls inside the range (bounds included).
    #[inline]
    pub fn contains(&self, velocity: u8) -> bool {
        velocity >= self.min && velocity <= self.max
    }
}

impl std::fmt::Display for VelocityRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.min, self.max)
    }
}

/// Velocity ranges for a layer count, softest layer first.
///
/// Counts of one to four use the exact split the recordings were made with;
/// larger counts divide 1..=127 evenly and let the last layer absorb the rest.
pub fn velocity_ranges(layer_count: usize) -> Vec<VelocityRange> {
    match layer_count {
        0 => Vec::new(),
        1 => vec![VelocityRange::FULL],
        2 => vec![VelocityRange::new(1, 63), VelocityRange::new(64, 127)],
        3 => vec![
            VelocityRange::new(1, 42),
            VelocityRange::new(43, 84),
            VelocityRange::new(85, 127),
        ],
        4 => vec![
            VelocityRange::new(1, 31),
            VelocityRange::new(32, 63),
            VelocityRange::new(64, 95),
            VelocityRange::new(96, 127),
        ],
        count => {
            let count = count.min(127);
            let step = 127 / count;
            (0..count)
                .map(|layer| {
                    let min = layer * step + 1;
                    let max = if layer + 1 == count {
                        127
                    } else {
                        (layer + 1) * step
                    };
                    VelocityRange::new(min as u8, max as u8)
                })
                .collect()
        }
    }
}

/// The round-robin pool of recordings for one velocity band.
#[derive(Debug, Clone)]
pub struct VelocityLayer {
    range: VelocityRange,
    samples: Vec<Arc<Sample>>,
    /// Index of the next sample to hand out. Shared by every note using this layer.
    cursor: usize,
}

impl VelocityLayer {
    pub fn new(range: VelocityRange) -> Self {
        Self {
            range,
            samples: Vec::new(),
            cursor: 0,
        }
    }

    pub fn range(&self) -> VelocityRange {
        self.range
    }

    pub fn samples(&self) -> &[Arc<Sample>] {
        &self.samples
    }

    /// Appends a sample to the end of the rotation.
    pub fn push(&mut self, sample: Arc<Sample>) {
        self.samples.push(sample);
    }

    /// Returns the next sample in rotation and advances the cursor, wrapping at the end.
    pub fn next_sample(&mut self) -> Option<&Arc<Sample>> {
        if self.samples.is_empty() {
            return None;
        }
        let index = self.cursor;
        self.cursor = (index + 1) % self.samples.len();
        self.samples.get(index)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One microphone perspective of a note, routed to a single output bus.
#[derive(Debug, Clone)]
pub struct OutputGroup {
    output: usize,
    choke_group: u32,
    layers: Vec<VelocityLayer>,
}

impl OutputGroup {
    pub fn new(output: usize) -> Self {
        Self {
            output,
            choke_group: 0,
            layers: Vec::new(),
        }
    }

    /// The output bus (the left bus for stereo samples).
    pub fn output(&self) -> usize {
        self.output
    }

    /// The choke group id, 0 when the group never chokes.
    pub fn choke_group(&self) -> u32 {
        self.choke_group
    }

    pub fn layers(&self) -> &[VelocityLayer] {
        &self.layers
    }

    /// Adds a sample to the layer with exactly this range, creating the layer if needed.
    pub fn add_sample(&mut self, range: VelocityRange, sample: Arc<Sample>) {
        match self.layers.iter_mut().find(|layer| layer.range == range) {
            Some(layer) => layer.push(sample),
            None => {
                let mut layer = VelocityLayer::new(range);
                layer.push(sample);
                self.layers.push(layer);
            }
        }
    }

    /// Index of the layer used for a velocity: the first declared layer whose
    /// range contains it, or the first layer when none does.
    pub fn layer_index(&self, velocity: u8) -> Option<usize> {
        if self.layers.is_empty() {
            return None;
        }
        Some(
            self.layers
                .iter()
                .position(|layer| layer.range.contains(velocity))
                .unwrap_or(0),
        )
    }

    /// Draws the next round-robin sample for a velocity.
    pub fn next_sample(&mut self, velocity: u8) -> Option<&Arc<Sample>> {
        let index = self.layer_index(velocity)?;
        self.layers.get_mut(index)?.next_sample()
    }
}

/// Every playable note with its microphone groups.
#[derive(Debug, Clone)]
pub struct InstrumentLibrary {
    notes: Vec<Vec<OutputGroup>>,
}

impl Default for InstrumentLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl InstrumentLibrary {
    pub fn new() -> Self {
        Self {
            notes: vec![Vec::new(); NUM_NOTES],
        }
    }

    /// Adds a sample for (note, output bus) in the given velocity range. The
    /// group and layer are created on first use. Returns false for notes above 127.
    pub fn insert(
        &mut self,
        note: u8,
        output: usize,
        range: VelocityRange,
        sample: Arc<Sample>,
    ) -> bool {
        let Some(groups) = self.notes.get_mut(note as usize) else {
            return false;
        };

        match groups.iter_mut().find(|group| group.output == output) {
            Some(group) => group.add_sample(range, sample),
            None => {
                let mut group = OutputGroup::new(output);
                group.add_sample(range, sample);
                groups.push(group);
            }
        }
        true
    }

    /// Assigns a choke group to every group of a note.
    pub fn set_choke_group(&mut self, note: u8, choke_group: u32) {
        for group in self.groups_mut(note) {
            group.choke_group = choke_group;
        }
    }

    /// The groups of a note, in creation order. Empty for unmapped notes.
    pub fn groups(&self, note: u8) -> &[OutputGroup] {
        self.notes
            .get(note as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Mutable access to the groups of a note.
    pub fn groups_mut(&mut self, note: u8) -> &mut [OutputGroup] {
        match self.notes.get_mut(note as usize) {
            Some(groups) => groups.as_mut_slice(),
            None => &mut [],
        }
    }

    /// Iterates over mapped notes in ascending order.
    pub fn notes(&self) -> impl Iterator<Item = (u8, &[OutputGroup])> {
        self.notes
            .iter()
            .enumerate()
            .filter(|(_, groups)| !groups.is_empty())
            .map(|(note, groups)| (note as u8, groups.as_slice()))
    }

    /// Number of mapped notes.
    pub fn note_count(&self) -> usize {
        self.notes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.note_count() == 0
    }

    /// Largest number of groups on a single note.
    pub fn max_groups_per_note(&self) -> usize {
        self.notes.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Number of sample slots across all layers (shared samples count once per slot).
    pub fn sample_count(&self) -> usize {
        self.all_samples().count()
    }

    /// Total PCM memory, counting shared samples once.
    pub fn memory_size(&self) -> usize {
        let mut seen = HashSet::new();
        self.all_samples()
            .filter(|sample| seen.insert(Arc::as_ptr(sample)))
            .map(|sample| sample.memory_size())
            .sum()
    }

    fn all_samples(&self) -> impl Iterator<Item = &Arc<Sample>> {
        self.notes
            .iter()
            .flatten()
            .flat_map(|group| group.layers.iter())
            .flat_map(|layer| layer.samples.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: f32) -> Arc<Sample> {
        Arc::new(Sample::mono(vec![value; 4], 44100))
    }

    #[test]
    fn test_velocity_ranges_fixed_table() {
        assert_eq!(velocity_ranges(1), vec![VelocityRange::FULL]);
        assert_eq!(
            velocity_ranges(2),
            vec![VelocityRange::new(1, 63), VelocityRange::new(64, 127)]
        );
        assert_eq!(
            velocity_ranges(3),
            vec![
                VelocityRange::new(1, 42),
                VelocityRange::new(43, 84),
                VelocityRange::new(85, 127)
            ]
        );
        assert_eq!(
            velocity_ranges(4),
            vec![
                VelocityRange::new(1, 31),
                VelocityRange::new(32, 63),
                VelocityRange::new(64, 95),
                VelocityRange::new(96, 127)
            ]
        );
        assert!(velocity_ranges(0).is_empty());
    }

    #[test]
    fn test_velocity_ranges_even_split() {
        let ranges = velocity_ranges(5);
        assert_eq!(
            ranges,
            vec![
                VelocityRange::new(1, 25),
                VelocityRange::new(26, 50),
                VelocityRange::new(51, 75),
                VelocityRange::new(76, 100),
                VelocityRange::new(101, 127)
            ]
        );

        // Contiguous and covering the whole range.
        let ranges = velocity_ranges(9);
        assert_eq!(ranges.first().unwrap().min, 1);
        assert_eq!(ranges.last().unwrap().max, 127);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].max + 1, pair[1].min);
        }
    }

    #[test]
    fn test_round_robin_wraps_in_declared_order() {
        let mut layer = VelocityLayer::new(VelocityRange::FULL);
        let samples = [sample(0.1), sample(0.2), sample(0.3)];
        for s in &samples {
            layer.push(s.clone());
        }

        for s in samples.iter().chain(samples.iter()) {
            let next = layer.next_sample().unwrap();
            assert!(Arc::ptr_eq(next, s));
        }
    }

    #[test]
    fn test_round_robin_empty_layer() {
        let mut layer = VelocityLayer::new(VelocityRange::FULL);
        assert!(layer.next_sample().is_none());
    }

    #[test]
    fn test_layer_selection_boundaries() {
        let mut group = OutputGroup::new(2);
        group.add_sample(VelocityRange::new(1, 63), sample(0.1));
        group.add_sample(VelocityRange::new(64, 127), sample(0.9));

        assert_eq!(group.layer_index(1), Some(0));
        assert_eq!(group.layer_index(63), Some(0));
        assert_eq!(group.layer_index(64), Some(1));
        assert_eq!(group.layer_index(127), Some(1));
    }

    #[test]
    fn test_layer_selection_falls_back_to_first() {
        let mut group = OutputGroup::new(0);
        group.add_sample(VelocityRange::new(100, 127), sample(0.9));
        group.add_sample(VelocityRange::new(50, 99), sample(0.5));

        assert_eq!(group.layer_index(10), Some(0));
        assert_eq!(OutputGroup::new(0).layer_index(10), None);
    }

    #[test]
    fn test_overlapping_ranges_resolve_to_first_declared() {
        let mut group = OutputGroup::new(0);
        group.add_sample(VelocityRange::new(1, 100), sample(0.1));
        group.add_sample(VelocityRange::new(50, 127), sample(0.2));

        assert_eq!(group.layer_index(75), Some(0));
        assert_eq!(group.layer_index(110), Some(1));
    }

    #[test]
    fn test_insert_merges_by_output_and_range() {
        let mut library = InstrumentLibrary::new();
        library.insert(38, 2, VelocityRange::FULL, sample(0.1));
        library.insert(38, 2, VelocityRange::FULL, sample(0.2));
        library.insert(38, 3, VelocityRange::FULL, sample(0.3));
        library.insert(38, 2, VelocityRange::new(1, 63), sample(0.4));

        let groups = library.groups(38);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].output(), 2);
        assert_eq!(groups[0].layers().len(), 2);
        assert_eq!(groups[0].layers()[0].len(), 2);
        assert_eq!(groups[1].output(), 3);
        assert_eq!(library.note_count(), 1);
        assert_eq!(library.sample_count(), 4);
    }

    #[test]
    fn test_insert_rejects_out_of_range_note() {
        let mut library = InstrumentLibrary::new();
        assert!(!library.insert(128, 0, VelocityRange::FULL, sample(0.1)));
        assert!(library.is_empty());
        assert!(library.groups(200).is_empty());
    }

    #[test]
    fn test_choke_group_assignment() {
        let mut library = InstrumentLibrary::new();
        library.insert(42, 4, VelocityRange::FULL, sample(0.1));
        library.insert(42, 11, VelocityRange::FULL, sample(0.1));
        library.insert(38, 2, VelocityRange::FULL, sample(0.1));
        library.set_choke_group(42, 1);

        assert!(library.groups(42).iter().all(|g| g.choke_group() == 1));
        assert_eq!(library.groups(38)[0].choke_group(), 0);
    }

    #[test]
    fn test_memory_size_counts_shared_samples_once() {
        let shared = sample(0.5);
        let mut library = InstrumentLibrary::new();
        library.insert(35, 0, VelocityRange::FULL, shared.clone());
        library.insert(36, 0, VelocityRange::FULL, shared);

        assert_eq!(library.sample_count(), 2);
        assert_eq!(library.memory_size(), 16);
        assert_eq!(library.max_groups_per_note(), 1);
    }
}
