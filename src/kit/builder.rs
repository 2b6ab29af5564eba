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

//! Builds an [`InstrumentLibrary`] from a kit definition.
//!
//! Assets are read sequentially from the source, decoded in parallel, and
//! inserted in declaration order so that round-robin order follows the kit.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::library::InstrumentLibrary;
use super::source::AssetSource;
use crate::audio::{Sample, SampleDecoder, SymphoniaDecoder};
use crate::config::KitDefinition;

/// What happened while building a library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Distinct files decoded into usable samples.
    pub loaded: usize,
    /// Files absent from the source.
    pub missing: Vec<String>,
    /// Files that could not be decoded.
    pub failed: Vec<String>,
    /// Files that decoded to zero frames.
    pub empty: Vec<String>,
    /// Loaded samples whose rate differs from the expected session rate.
    pub rate_mismatches: usize,
    /// Sample slots inserted into the library.
    pub inserted: usize,
}

impl BuildReport {
    /// True when every referenced file was loaded.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.failed.is_empty() && self.empty.is_empty()
    }
}

/// Decoded samples keyed by (path, stereo).
type SampleCache = HashMap<(String, bool), Arc<Sample>>;

/// Reads, decodes and assembles the samples of a kit.
pub struct LibraryBuilder<D: SampleDecoder = SymphoniaDecoder> {
    decoder: D,
    expected_sample_rate: Option<u32>,
}

impl Default for LibraryBuilder<SymphoniaDecoder> {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryBuilder<SymphoniaDecoder> {
    pub fn new() -> Self {
        Self::with_decoder(SymphoniaDecoder::default())
    }
}

impl<D: SampleDecoder> LibraryBuilder<D> {
    pub fn with_decoder(decoder: D) -> Self {
        Self {
            decoder,
            expected_sample_rate: None,
        }
    }

    /// Flags samples whose native rate differs from the session rate. No
    /// conversion happens; mismatching samples play at the wrong pitch.
    pub fn expected_sample_rate(mut self, sample_rate: u32) -> Self {
        self.expected_sample_rate = Some(sample_rate);
        self
    }

    /// Builds the library. Missing or undecodable assets are logged and skipped;
    /// they never fail the build.
    pub fn build(
        &self,
        kit: &KitDefinition,
        source: &mut dyn AssetSource,
    ) -> (InstrumentLibrary, BuildReport) {
        let start = Instant::now();
        let mut report = BuildReport::default();

        let cache = self.load_samples(kit, source, &mut report);

        let mut library = InstrumentLibrary::new();
        for instrument in &kit.instruments {
            let files = instrument.files();
            for &note in &instrument.notes {
                for (range, file) in &files {
                    let key = (file.clone(), instrument.stereo);
                    if let Some(sample) = cache.get(&key) {
                        if library.insert(note, instrument.output, *range, Arc::clone(sample)) {
                            report.inserted += 1;
                        }
                    }
                }
            }
        }

        for group in &kit.choke_groups {
            for &note in &group.notes {
                library.set_choke_group(note, group.id);
            }
        }

        info!(
            notes = library.note_count(),
            samples = report.loaded,
            missing = report.missing.len(),
            failed = report.failed.len(),
            memory_kb = library.memory_size() / 1024,
            duration_ms = start.elapsed().as_millis(),
            "Instrument library built"
        );

        (library, report)
    }

    /// Reads every distinct file once and decodes the lot in parallel.
    fn load_samples(
        &self,
        kit: &KitDefinition,
        source: &mut dyn AssetSource,
        report: &mut BuildReport,
    ) -> SampleCache {
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for instrument in &kit.instruments {
            for (_, file) in instrument.files() {
                let key = (file, instrument.stereo);
                if !seen.insert(key.clone()) {
                    continue;
                }
                match source.read(&key.0) {
                    Some(bytes) if bytes.is_empty() => {
                        warn!(path = %key.0, "Sample file is empty, treating it as missing");
                        report.missing.push(key.0);
                    }
                    Some(bytes) => pending.push((key, bytes)),
                    None => report.missing.push(key.0),
                }
            }
        }

        debug!(files = pending.len(), "Decoding samples");
        let decoded: Vec<_> = pending
            .into_par_iter()
            .map(|(key, bytes)| {
                let result = self.decoder.decode(bytes, key.1);
                (key, result)
            })
            .collect();

        let mut cache = SampleCache::new();
        for ((path, stereo), result) in decoded {
            match result {
                Ok(sample) if sample.is_empty() => {
                    debug!(path = %path, "Skipping empty sample");
                    report.empty.push(path);
                }
                Ok(sample) => {
                    if let Some(expected) = self.expected_sample_rate {
                        if sample.sample_rate() != expected {
                            warn!(
                                path = %path,
                                sample_rate = sample.sample_rate(),
                                expected,
                                "Sample rate does not match the session; it will play at the wrong pitch"
                            );
                            report.rate_mismatches += 1;
                        }
                    }
                    report.loaded += 1;
                    cache.insert((path, stereo), Arc::new(sample));
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to decode sample");
                    report.failed.push(path);
                }
            }
        }
        cache
    }
}
