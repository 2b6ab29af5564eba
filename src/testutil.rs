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
use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::archive::ArchiveWriter;

/// Encodes interleaved 16-bit samples as an in-memory WAV file.
pub fn wav_bytes_i16(channels: u16, sample_rate: u32, interleaved: &[i16]) -> Vec<u8> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut bytes = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
        for sample in interleaved {
            writer.write_sample(*sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    bytes
}

/// Encodes interleaved 32-bit float samples as an in-memory WAV file.
pub fn wav_bytes_f32(channels: u16, sample_rate: u32, interleaved: &[f32]) -> Vec<u8> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut bytes = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
        for sample in interleaved {
            writer.write_sample(*sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    bytes
}

/// Builds a complete archive image holding the given files.
pub fn archive_bytes(files: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ArchiveWriter::new(Cursor::new(Vec::new())).unwrap();
    for (path, data) in files {
        writer.add(path, data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
