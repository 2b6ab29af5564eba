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

//! Offline rendering of scheduled hits to per-bus WAV files.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use duration_string::DurationString;
use tracing::{debug, info};

use crate::audio::{bus_file_stem, wav, NUM_OUTPUT_BUSES};
use crate::samples::DrumEngine;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Invalid hit {0}: {1}")]
    InvalidHit(String, String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    WavError(#[from] hound::Error),
}

/// A note-on scheduled at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub note: u8,
    pub velocity: u8,
    pub at: Duration,
}

impl Hit {
    pub fn new(note: u8, velocity: u8, at: Duration) -> Self {
        Self { note, velocity, at }
    }

    /// The frame at which the hit lands.
    pub fn frame(&self, sample_rate: u32) -> usize {
        duration_to_frames(self.at, sample_rate)
    }
}

/// Parses `NOTE:VELOCITY@TIME`, e.g. `38:127@1.5s` or `42:90@250ms`. The time
/// may also be a bare number of seconds. Without `@TIME` the hit is at zero.
impl FromStr for Hit {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| RenderError::InvalidHit(s.to_string(), reason.to_string());

        let (event, time) = match s.split_once('@') {
            Some((event, time)) => (event, Some(time)),
            None => (s, None),
        };
        let (note, velocity) = event
            .split_once(':')
            .ok_or_else(|| invalid("expected NOTE:VELOCITY"))?;
        let note: u8 = note
            .trim()
            .parse()
            .map_err(|_| invalid("note is not a number"))?;
        let velocity: u8 = velocity
            .trim()
            .parse()
            .map_err(|_| invalid("velocity is not a number"))?;
        if note > 127 {
            return Err(invalid("note must be 0-127"));
        }
        if velocity > 127 {
            return Err(invalid("velocity must be 0-127"));
        }

        let at = match time {
            Some(time) => parse_time(time.trim()).ok_or_else(|| invalid("unrecognized time"))?,
            None => Duration::ZERO,
        };
        Ok(Hit { note, velocity, at })
    }
}

/// Parses a time such as `1.5s`, `2` (seconds) or `250ms`.
pub fn parse_time(time: &str) -> Option<Duration> {
    if let Ok(seconds) = time.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds).ok();
    }
    if let Some(seconds) = time.strip_suffix('s').and_then(|v| v.parse::<f64>().ok()) {
        return Duration::try_from_secs_f64(seconds).ok();
    }
    DurationString::from_string(time.to_string())
        .ok()
        .map(Duration::from)
}

fn duration_to_frames(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * sample_rate as f64).round() as usize
}

/// Renders hits through an engine without an audio device.
///
/// Blocks are split at hit positions so every hit starts on its exact frame.
#[derive(Debug, Clone, Copy)]
pub struct OfflineRenderer {
    sample_rate: u32,
    block_size: usize,
}

impl OfflineRenderer {
    pub fn new(sample_rate: u32, block_size: usize) -> Self {
        Self {
            sample_rate,
            block_size: block_size.max(1),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Renders every bus. With a length the output has exactly that many
    /// frames and later hits are dropped; without one rendering continues
    /// until the last hit has rung out.
    pub fn render(
        &self,
        engine: &mut DrumEngine,
        hits: &[Hit],
        length: Option<Duration>,
    ) -> Vec<Vec<f32>> {
        let mut hits = hits.to_vec();
        hits.sort_by_key(|hit| hit.at);
        let hit_frames: Vec<usize> = hits.iter().map(|hit| hit.frame(self.sample_rate)).collect();
        let total = length.map(|length| duration_to_frames(length, self.sample_rate));

        let mut buses = vec![Vec::new(); NUM_OUTPUT_BUSES];
        let mut position = 0;
        let mut next_hit = 0;
        loop {
            while next_hit < hits.len() && hit_frames[next_hit] <= position {
                let hit = hits[next_hit];
                engine.note_on(hit.note, hit.velocity);
                next_hit += 1;
            }

            let done = match total {
                Some(total) => position >= total,
                None => next_hit == hits.len() && engine.active_voice_count() == 0,
            };
            if done {
                break;
            }

            let mut end = position + self.block_size;
            if let Some(total) = total {
                end = end.min(total);
            }
            match hit_frames.get(next_hit) {
                Some(&frame) => end = end.min(frame),
                None if total.is_none() => {
                    let remaining = engine
                        .voices()
                        .voices()
                        .iter()
                        .map(|voice| voice.length() - voice.position())
                        .max()
                        .unwrap_or(0);
                    end = end.min(position + remaining.max(1));
                }
                None => {}
            }

            for bus in buses.iter_mut() {
                bus.resize(end, 0.0);
            }
            let mut outputs: Vec<Option<&mut [f32]>> = buses
                .iter_mut()
                .map(|bus| Some(&mut bus[position..end]))
                .collect();
            engine.render(&mut outputs, end - position);
            position = end;
        }

        if next_hit < hits.len() {
            debug!(dropped = hits.len() - next_hit, "Hits after the end were not rendered");
        }
        buses
    }
}

/// Writes each bus to `{dir}/{bus stem}.wav`. Silent buses are skipped when
/// asked to. Returns the files written.
pub fn write_buses(
    dir: &Path,
    buses: &[Vec<f32>],
    sample_rate: u32,
    skip_silent: bool,
) -> Result<Vec<PathBuf>, RenderError> {
    fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for (index, bus) in buses.iter().enumerate() {
        if skip_silent && bus.iter().all(|&sample| sample == 0.0) {
            continue;
        }
        let path = dir.join(format!("{}.wav", bus_file_stem(index)));
        wav::write_mono(&path, bus, sample_rate)?;
        info!(path = ?path, frames = bus.len(), "Wrote bus");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::Sample;
    use crate::config::EngineConfig;
    use crate::kit::{InstrumentLibrary, VelocityRange};

    fn engine_with_snare() -> DrumEngine {
        let mut library = InstrumentLibrary::new();
        library.insert(
            38,
            2,
            VelocityRange::FULL,
            Arc::new(Sample::mono(vec![1.0; 3], 1000)),
        );
        DrumEngine::new(library, EngineConfig::default())
    }

    #[test]
    fn test_parse_hit() {
        assert_eq!(
            "38:127@1.5s".parse::<Hit>().unwrap(),
            Hit::new(38, 127, Duration::from_millis(1500))
        );
        assert_eq!(
            "42:90@250ms".parse::<Hit>().unwrap(),
            Hit::new(42, 90, Duration::from_millis(250))
        );
        assert_eq!(
            "36:100@2".parse::<Hit>().unwrap(),
            Hit::new(36, 100, Duration::from_secs(2))
        );
        assert_eq!("36:100".parse::<Hit>().unwrap().at, Duration::ZERO);
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_time("2"), Some(Duration::from_secs(2)));
        assert_eq!(parse_time("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_time("soon"), None);
        assert_eq!(parse_time("-1"), None);
    }

    #[test]
    fn test_parse_hit_errors() {
        for bad in ["38", "x:100", "38:y", "200:100", "38:128", "38:100@soon", "38:100@-1"] {
            assert!(
                matches!(bad.parse::<Hit>(), Err(RenderError::InvalidHit(_, _))),
                "{bad} should not parse"
            );
        }
    }

    #[test]
    fn test_hits_land_on_exact_frames() {
        let mut engine = engine_with_snare();
        let renderer = OfflineRenderer::new(1000, 64);
        let hits = [Hit::new(38, 127, Duration::from_millis(5))];
        let buses = renderer.render(&mut engine, &hits, Some(Duration::from_millis(10)));

        assert_eq!(buses.len(), NUM_OUTPUT_BUSES);
        assert_eq!(buses[2].len(), 10);
        assert_eq!(
            buses[2],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0]
        );
        assert!(buses[0].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_hits_are_sorted_and_late_hits_dropped() {
        let mut engine = engine_with_snare();
        let renderer = OfflineRenderer::new(1000, 2);
        let hits = [
            Hit::new(38, 127, Duration::from_millis(4)),
            Hit::new(38, 127, Duration::from_millis(0)),
            Hit::new(38, 127, Duration::from_millis(50)),
        ];
        let buses = renderer.render(&mut engine, &hits, Some(Duration::from_millis(8)));
        assert_eq!(
            buses[2],
            vec![1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_render_without_length_stops_when_silent() {
        let mut engine = engine_with_snare();
        let renderer = OfflineRenderer::new(1000, 256);
        let hits = [Hit::new(38, 127, Duration::from_millis(2))];
        let buses = renderer.render(&mut engine, &hits, None);

        assert_eq!(buses[2], vec![0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(engine.active_voice_count(), 0);
    }

    #[test]
    fn test_render_kit_from_archive() {
        use std::io::Cursor;

        use crate::archive::ArchiveReader;
        use crate::config::{InstrumentEntry, KitDefinition};
        use crate::kit::LibraryBuilder;
        use crate::testutil::{archive_bytes, wav_bytes_f32};

        let bytes = archive_bytes(&[
            ("snare_r1_v1.wav", wav_bytes_f32(1, 1000, &[0.5; 4])),
            ("snare_r2_v1.wav", wav_bytes_f32(1, 1000, &[0.25; 4])),
        ]);
        let mut archive = ArchiveReader::from_reader(Cursor::new(bytes)).unwrap();
        let kit = KitDefinition {
            instruments: vec![InstrumentEntry::new(&[38], "snare", 2, 2)],
            choke_groups: Vec::new(),
        };
        let (library, report) = LibraryBuilder::new()
            .expected_sample_rate(1000)
            .build(&kit, &mut archive);
        assert!(report.is_complete());
        assert_eq!(report.rate_mismatches, 0);

        let mut engine = DrumEngine::new(library, EngineConfig::default());
        let hits: Vec<Hit> = ["38:127@0", "38:127@6ms"]
            .iter()
            .map(|hit| hit.parse().unwrap())
            .collect();
        let buses = OfflineRenderer::new(1000, 64).render(&mut engine, &hits, None);

        assert_eq!(
            buses[2],
            vec![0.5, 0.5, 0.5, 0.5, 0.0, 0.0, 0.25, 0.25, 0.25, 0.25]
        );
    }

    #[test]
    fn test_write_buses_skips_silent() {
        let dir = tempfile::tempdir().unwrap();
        let mut buses = vec![vec![0.0f32; 4]; NUM_OUTPUT_BUSES];
        buses[2] = vec![0.5, 0.25, 0.0, 0.0];

        let written = write_buses(dir.path(), &buses, 44100, true).unwrap();
        assert_eq!(written, vec![dir.path().join("02-snare-top.wav")]);

        let reader = hound::WavReader::open(&written[0]).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.len(), 4);

        let all = write_buses(&dir.path().join("all"), &buses, 44100, false).unwrap();
        assert_eq!(all.len(), NUM_OUTPUT_BUSES);
    }
}
