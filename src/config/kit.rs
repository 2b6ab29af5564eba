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

//! The declarative kit table: which recordings belong to which notes and buses.

use std::path::Path;

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::audio::NUM_OUTPUT_BUSES;
use crate::kit::{velocity_ranges, VelocityRange};

/// Highest valid MIDI note number.
const MAX_NOTE: u8 = 127;

/// Most velocity layers one instrument can have.
const MAX_LAYERS: usize = 127;

/// How file names are derived from an instrument stem.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NamingScheme {
    /// `{stem}_r{round_robin}_v{layer}.wav`, `v1` being the softest layer.
    #[default]
    Layered,
    /// `{stem}_r{round_robin}.wav`, a single layer covering every velocity.
    Legacy,
}

/// One microphone perspective of an instrument.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct InstrumentEntry {
    /// The notes that trigger this instrument. Each note gets its own group.
    pub notes: Vec<u8>,

    /// The file name stem, e.g. `snare_top`.
    pub stem: String,

    /// The output bus. Stereo recordings also play on the next bus.
    pub output: usize,

    /// Number of velocity layers (layered naming only).
    #[serde(default = "default_layers")]
    pub layers: u8,

    /// Number of alternate recordings per layer.
    pub round_robins: u32,

    #[serde(default)]
    pub stereo: bool,

    #[serde(default)]
    pub naming: NamingScheme,
}

fn default_layers() -> u8 {
    1
}

impl InstrumentEntry {
    /// Creates a mono, single-layer entry using layered naming.
    pub fn new(notes: &[u8], stem: &str, output: usize, round_robins: u32) -> Self {
        Self {
            notes: notes.to_vec(),
            stem: stem.to_string(),
            output,
            layers: 1,
            round_robins,
            stereo: false,
            naming: NamingScheme::Layered,
        }
    }

    pub fn with_layers(mut self, layers: u8) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_stereo(mut self, stereo: bool) -> Self {
        self.stereo = stereo;
        self
    }

    pub fn with_naming(mut self, naming: NamingScheme) -> Self {
        self.naming = naming;
        self
    }

    /// Number of velocity layers actually used.
    pub fn layer_count(&self) -> usize {
        match self.naming {
            NamingScheme::Layered => self.layers as usize,
            NamingScheme::Legacy => 1,
        }
    }

    /// The file name for a 1-based round robin and layer.
    pub fn file_name(&self, round_robin: u32, layer: usize) -> String {
        match self.naming {
            NamingScheme::Layered => format!("{}_r{}_v{}.wav", self.stem, round_robin, layer),
            NamingScheme::Legacy => format!("{}_r{}.wav", self.stem, round_robin),
        }
    }

    /// Every file of this entry with its velocity range, softest layer first and
    /// round robins in ascending order within each layer.
    pub fn files(&self) -> Vec<(VelocityRange, String)> {
        velocity_ranges(self.layer_count())
            .into_iter()
            .enumerate()
            .flat_map(|(layer, range)| {
                (1..=self.round_robins).map(move |rr| (range, self.file_name(rr, layer + 1)))
            })
            .collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.notes.is_empty() {
            return Err(ConfigError::NoNotes(self.stem.clone()));
        }
        if let Some(&note) = self.notes.iter().find(|&&note| note > MAX_NOTE) {
            return Err(ConfigError::InvalidNote {
                stem: self.stem.clone(),
                note,
            });
        }
        if self.output >= NUM_OUTPUT_BUSES {
            return Err(ConfigError::InvalidOutput {
                stem: self.stem.clone(),
                output: self.output,
                buses: NUM_OUTPUT_BUSES,
            });
        }
        if self.stereo && self.output + 1 >= NUM_OUTPUT_BUSES {
            return Err(ConfigError::StereoOutOfRange {
                stem: self.stem.clone(),
                output: self.output,
            });
        }
        if self.round_robins == 0 {
            return Err(ConfigError::NoRoundRobins(self.stem.clone()));
        }
        if self.layer_count() == 0 {
            return Err(ConfigError::NoLayers(self.stem.clone()));
        }
        // Every layer needs at least one velocity of its own.
        if self.layer_count() > MAX_LAYERS {
            return Err(ConfigError::TooManyLayers {
                stem: self.stem.clone(),
                layers: self.layer_count(),
                max: MAX_LAYERS,
            });
        }
        Ok(())
    }
}

/// Notes that cut each other off, such as the variants of one hi-hat.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ChokeGroupEntry {
    /// Non-zero group id.
    pub id: u32,
    pub notes: Vec<u8>,
}

/// A complete kit.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct KitDefinition {
    pub instruments: Vec<InstrumentEntry>,

    #[serde(default)]
    pub choke_groups: Vec<ChokeGroupEntry>,
}

impl KitDefinition {
    /// Deserializes and validates a kit file.
    pub fn deserialize(path: &Path) -> Result<KitDefinition, ConfigError> {
        let kit = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<KitDefinition>()?;
        kit.validate()?;
        Ok(kit)
    }

    /// Parses and validates a kit from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<KitDefinition, ConfigError> {
        let kit = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<KitDefinition>()?;
        kit.validate()?;
        Ok(kit)
    }

    /// Serializes the kit as YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yml::Error> {
        serde_yml::to_string(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for instrument in &self.instruments {
            instrument.validate()?;
        }
        for group in &self.choke_groups {
            if group.id == 0 {
                return Err(ConfigError::ZeroChokeGroup);
            }
            if let Some(&note) = group.notes.iter().find(|&&note| note > MAX_NOTE) {
                return Err(ConfigError::InvalidChokeNote { id: group.id, note });
            }
        }
        Ok(())
    }

    /// Number of distinct files the kit references.
    pub fn file_count(&self) -> usize {
        self.instruments
            .iter()
            .map(|i| i.layer_count() * i.round_robins as usize)
            .sum()
    }

    /// The kit the bundled sample archive was recorded for.
    pub fn builtin() -> KitDefinition {
        const KICK: &[u8] = &[35, 36];
        const SIDESTICK: &[u8] = &[37];
        const SNARE: &[u8] = &[38, 40];
        const OVERHEAD: usize = 11;
        const ROOM: usize = 13;

        let close = |notes: &[u8], stem: &str, output: usize, rr: u32| {
            InstrumentEntry::new(notes, stem, output, rr).with_naming(NamingScheme::Legacy)
        };
        let ambient = |notes: &[u8], stem: &str, output: usize, rr: u32| {
            close(notes, stem, output, rr).with_stereo(true)
        };

        let mut instruments = vec![
            close(KICK, "kick_in", 0, 8),
            close(KICK, "kick_out", 1, 8),
            ambient(KICK, "kick_overhead", OVERHEAD, 8),
            ambient(KICK, "kick_room", ROOM, 8),
            close(SIDESTICK, "sidestick_top", 2, 4),
            close(SIDESTICK, "sidestick_bottom", 3, 4),
            ambient(SIDESTICK, "sidestick_overhead", OVERHEAD, 4),
            ambient(SIDESTICK, "sidestick_room", ROOM, 4),
            close(SNARE, "snare_top", 2, 9),
            close(SNARE, "snare_bottom", 3, 9),
            ambient(SNARE, "snare_overhead", OVERHEAD, 9),
            ambient(SNARE, "snare_room", ROOM, 9),
        ];

        for (note, stem) in [(42, "hihat_closed"), (44, "hihat_pedal"), (46, "hihat_open")] {
            instruments.push(close(&[note], stem, 4, 7));
            instruments.push(ambient(&[note], &format!("{stem}_overhead"), OVERHEAD, 7));
            instruments.push(ambient(&[note], &format!("{stem}_room"), ROOM, 7));
        }

        let toms = [
            (50, "racktom1", 5),
            (48, "racktom2", 6),
            (47, "racktom3", 7),
            (45, "floortom1", 8),
            (43, "floortom2", 9),
            (41, "floortom3", 10),
        ];
        for (note, stem, output) in toms {
            instruments.push(close(&[note], stem, output, 7));
            instruments.push(ambient(&[note], &format!("{stem}_overhead"), OVERHEAD, 7));
            instruments.push(ambient(&[note], &format!("{stem}_room"), ROOM, 7));
        }

        let cymbals = [
            (49, "crash1", 7),
            (57, "crash2", 7),
            (51, "ride", 6),
            (53, "ride_bell", 7),
            (59, "ride_edge", 5),
            (52, "china", 7),
            (55, "splash", 7),
        ];
        for (note, stem, rr) in cymbals {
            instruments.push(ambient(&[note], &format!("{stem}_overhead"), OVERHEAD, rr));
            instruments.push(ambient(&[note], &format!("{stem}_room"), ROOM, rr));
        }

        KitDefinition {
            instruments,
            choke_groups: vec![ChokeGroupEntry {
                id: 1,
                notes: vec![42, 44, 46],
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layered_file_names() {
        let entry = InstrumentEntry::new(&[38], "snare_top", 2, 2).with_layers(2);
        let files = entry.files();
        assert_eq!(
            files,
            vec![
                (VelocityRange::new(1, 63), "snare_top_r1_v1.wav".to_string()),
                (VelocityRange::new(1, 63), "snare_top_r2_v1.wav".to_string()),
                (VelocityRange::new(64, 127), "snare_top_r1_v2.wav".to_string()),
                (VelocityRange::new(64, 127), "snare_top_r2_v2.wav".to_string()),
            ]
        );
    }

    #[test]
    fn test_legacy_file_names_ignore_layers() {
        let entry = InstrumentEntry::new(&[36], "kick_in", 0, 3)
            .with_layers(4)
            .with_naming(NamingScheme::Legacy);
        let names: Vec<String> = entry.files().into_iter().map(|(_, name)| name).collect();
        assert_eq!(names, vec!["kick_in_r1.wav", "kick_in_r2.wav", "kick_in_r3.wav"]);
        assert!(entry
            .files()
            .iter()
            .all(|(range, _)| *range == VelocityRange::FULL));
    }

    #[test]
    fn test_builtin_kit() {
        let kit = KitDefinition::builtin();
        kit.validate().unwrap();

        let kick_in = kit.instruments.iter().find(|i| i.stem == "kick_in").unwrap();
        assert_eq!(kick_in.notes, vec![35, 36]);
        assert_eq!(kick_in.output, 0);
        assert_eq!(kick_in.round_robins, 8);
        assert_eq!(kick_in.file_name(1, 1), "kick_in_r1.wav");

        let ride_edge = kit
            .instruments
            .iter()
            .find(|i| i.stem == "ride_edge_room")
            .unwrap();
        assert_eq!(ride_edge.notes, vec![59]);
        assert_eq!(ride_edge.output, 13);
        assert!(ride_edge.stereo);
        assert_eq!(ride_edge.round_robins, 5);

        let floortom3 = kit.instruments.iter().find(|i| i.stem == "floortom3").unwrap();
        assert_eq!(floortom3.notes, vec![41]);
        assert_eq!(floortom3.output, 10);

        assert_eq!(kit.choke_groups.len(), 1);
        assert_eq!(kit.choke_groups[0].notes, vec![42, 44, 46]);
        assert_eq!(kit.instruments.len(), 53);
    }

    #[test]
    fn test_from_yaml_with_defaults() {
        let yaml = r#"
            instruments:
              - notes: [38]
                stem: snare_top
                output: 2
                round_robins: 3
              - notes: [38]
                stem: snare_room
                output: 13
                round_robins: 3
                layers: 2
                stereo: true
            choke_groups:
              - id: 4
                notes: [38]
        "#;
        let kit = KitDefinition::from_yaml(yaml).unwrap();
        assert_eq!(kit.instruments.len(), 2);
        assert_eq!(kit.instruments[0].layers, 1);
        assert!(!kit.instruments[0].stereo);
        assert_eq!(kit.instruments[0].naming, NamingScheme::Layered);
        assert_eq!(kit.instruments[1].layers, 2);
        assert!(kit.instruments[1].stereo);
        assert_eq!(kit.choke_groups[0].id, 4);
        assert_eq!(kit.file_count(), 9);
    }

    #[test]
    fn test_deserialize_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kit.yaml");
        std::fs::write(
            &path,
            "instruments:\n  - notes: [36]\n    stem: kick\n    output: 0\n    round_robins: 2\n    naming: legacy\n",
        )
        .unwrap();

        let kit = KitDefinition::deserialize(&path).unwrap();
        assert_eq!(kit.instruments[0].naming, NamingScheme::Legacy);
        assert!(kit.choke_groups.is_empty());
    }

    #[test]
    fn test_yaml_round_trip_of_builtin() {
        let kit = KitDefinition::builtin();
        let yaml = kit.to_yaml().unwrap();
        assert_eq!(KitDefinition::from_yaml(&yaml).unwrap(), kit);
    }

    #[test]
    fn test_validate_rejects_bad_entries() {
        let kit = |entry: InstrumentEntry| KitDefinition {
            instruments: vec![entry],
            choke_groups: Vec::new(),
        };

        assert!(matches!(
            kit(InstrumentEntry::new(&[128], "x", 0, 1)).validate(),
            Err(ConfigError::InvalidNote { note: 128, .. })
        ));
        assert!(matches!(
            kit(InstrumentEntry::new(&[1], "x", 15, 1)).validate(),
            Err(ConfigError::InvalidOutput { output: 15, .. })
        ));
        assert!(matches!(
            kit(InstrumentEntry::new(&[1], "x", 14, 1).with_stereo(true)).validate(),
            Err(ConfigError::StereoOutOfRange { output: 14, .. })
        ));
        assert!(matches!(
            kit(InstrumentEntry::new(&[1], "x", 0, 0)).validate(),
            Err(ConfigError::NoRoundRobins(_))
        ));
        assert!(matches!(
            kit(InstrumentEntry::new(&[1], "x", 0, 1).with_layers(0)).validate(),
            Err(ConfigError::NoLayers(_))
        ));
        assert!(matches!(
            kit(InstrumentEntry::new(&[], "x", 0, 1)).validate(),
            Err(ConfigError::NoNotes(_))
        ));
        assert!(matches!(
            kit(InstrumentEntry::new(&[38], "snare", 2, 1).with_layers(200)).validate(),
            Err(ConfigError::TooManyLayers { layers: 200, max: 127, .. })
        ));
        let most = InstrumentEntry::new(&[38], "snare", 2, 1).with_layers(127);
        assert!(kit(most.clone()).validate().is_ok());
        assert_eq!(most.files().len(), kit(most).file_count());
        // Legacy naming never uses the layer count.
        assert!(kit(InstrumentEntry::new(&[1], "x", 0, 1)
            .with_layers(0)
            .with_naming(NamingScheme::Legacy))
        .validate()
        .is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_choke_groups() {
        let mut kit = KitDefinition {
            instruments: Vec::new(),
            choke_groups: vec![ChokeGroupEntry {
                id: 0,
                notes: vec![42],
            }],
        };
        assert!(matches!(kit.validate(), Err(ConfigError::ZeroChokeGroup)));

        kit.choke_groups[0].id = 2;
        kit.choke_groups[0].notes.push(200);
        assert!(matches!(
            kit.validate(),
            Err(ConfigError::InvalidChokeNote { id: 2, note: 200 })
        ));
    }
}
