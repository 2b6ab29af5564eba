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

//! Decoding of in-memory audio files into PCM samples.
//!
//! The bytes of one file are wrapped in a cursor and handed to symphonia, so
//! decoding never touches the filesystem.

use std::io::Cursor;

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::debug;

use super::error::DecodeError;
use super::sample::Sample;

/// Converts the raw bytes of an encoded audio file into a [`Sample`].
pub trait SampleDecoder: Send + Sync {
    /// Decodes `bytes`. When `force_stereo` is set and the file has at least two
    /// channels, the first two channels are kept as a stereo pair; otherwise the
    /// result is mono (multi-channel files are averaged down).
    fn decode(&self, bytes: Vec<u8>, force_stereo: bool) -> Result<Sample, DecodeError>;
}

/// Decodes any format symphonia understands (WAV, FLAC, OGG, ...).
#[derive(Clone, Debug)]
pub struct SymphoniaDecoder {
    /// Extension hint for the format probe.
    extension: String,
}

impl Default for SymphoniaDecoder {
    fn default() -> Self {
        Self::new("wav")
    }
}

impl SymphoniaDecoder {
    /// Creates a decoder that hints the given file extension to the probe.
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.to_string(),
        }
    }

    /// Decodes every packet of the first audio track into planar channels.
    fn decode_planar(&self, bytes: Vec<u8>) -> Result<(Vec<Vec<f32>>, u32), DecodeError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(&self.extension);

        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();
        let probed = get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
        let mut format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioTrack)?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or(DecodeError::MissingSampleRate)?;

        let decoder_opts: DecoderOptions = Default::default();
        let mut decoder = get_codecs().make(&track.codec_params, &decoder_opts)?;

        let mut channels: Vec<Vec<f32>> = Vec::new();
        loop {
            let packet = match format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                // Some readers report the end of the stream as a decode error.
                Err(SymphoniaError::DecodeError(_)) => break,
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => append_decoded(&mut channels, decoded),
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!(error = e, "Skipping undecodable packet");
                }
                Err(SymphoniaError::ResetRequired) => decoder.reset(),
                Err(e) => return Err(e.into()),
            }
        }

        Ok((channels, sample_rate))
    }
}

impl SampleDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: Vec<u8>, force_stereo: bool) -> Result<Sample, DecodeError> {
        let (channels, sample_rate) = self.decode_planar(bytes)?;
        Ok(collapse_channels(channels, sample_rate, force_stereo))
    }
}

/// Reduces planar channels to the mono or stereo shape the engine plays.
pub fn collapse_channels(channels: Vec<Vec<f32>>, sample_rate: u32, force_stereo: bool) -> Sample {
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    if frames == 0 {
        return Sample::empty(sample_rate);
    }

    let channel_count = channels.len();
    if force_stereo && channel_count >= 2 {
        let mut iter = channels.into_iter();
        return match (iter.next(), iter.next()) {
            (Some(left), Some(right)) => Sample::stereo(left, right, sample_rate),
            _ => Sample::empty(sample_rate),
        };
    }

    if channel_count == 1 {
        return match channels.into_iter().next() {
            Some(mut left) => {
                left.truncate(frames);
                Sample::mono(left, sample_rate)
            }
            None => Sample::empty(sample_rate),
        };
    }

    let scale = channel_count as f32;
    let mixed = (0..frames)
        .map(|i| channels.iter().map(|channel| channel[i]).sum::<f32>() / scale)
        .collect();
    Sample::mono(mixed, sample_rate)
}

/// Appends a decoded buffer to the planar channel accumulators.
fn append_decoded(channels: &mut Vec<Vec<f32>>, decoded: AudioBufferRef) {
    match decoded {
        AudioBufferRef::F32(buf) => append_planes(channels, &buf, |s| s),
        AudioBufferRef::F64(buf) => append_planes(channels, &buf, |s| s as f32),
        AudioBufferRef::S8(buf) => append_planes(channels, &buf, scale_s8),
        AudioBufferRef::S16(buf) => append_planes(channels, &buf, scale_s16),
        AudioBufferRef::S24(buf) => append_planes(channels, &buf, |s| scale_s24(s.inner())),
        AudioBufferRef::S32(buf) => append_planes(channels, &buf, scale_s32),
        AudioBufferRef::U8(buf) => append_planes(channels, &buf, scale_u8),
        AudioBufferRef::U16(buf) => append_planes(channels, &buf, scale_u16),
        AudioBufferRef::U24(buf) => append_planes(channels, &buf, |s| scale_u24(s.inner())),
        AudioBufferRef::U32(buf) => append_planes(channels, &buf, scale_u32),
    }
}

fn append_planes<T, F>(channels: &mut Vec<Vec<f32>>, buf: &AudioBuffer<T>, convert: F)
where
    T: symphonia::core::sample::Sample,
    F: Fn(T) -> f32,
{
    let count = buf.spec().channels.count();
    if channels.is_empty() {
        channels.resize_with(count, Vec::new);
    }
    for (ch, out) in channels.iter_mut().enumerate().take(count) {
        out.extend(buf.chan(ch).iter().map(|&sample| convert(sample)));
    }
}

#[inline]
pub(crate) fn scale_s8(sample: i8) -> f32 {
    sample as f32 / (1i64 << 7) as f32
}

#[inline]
pub(crate) fn scale_s16(sample: i16) -> f32 {
    sample as f32 / (1i64 << 15) as f32
}

#[inline]
pub(crate) fn scale_s24(sample: i32) -> f32 {
    sample as f32 / (1i64 << 23) as f32
}

#[inline]
pub(crate) fn scale_s32(sample: i32) -> f32 {
    sample as f32 / (1i64 << 31) as f32
}

#[inline]
pub(crate) fn scale_u8(sample: u8) -> f32 {
    (sample as f32 / u8::MAX as f32) * 2.0 - 1.0
}

#[inline]
pub(crate) fn scale_u16(sample: u16) -> f32 {
    (sample as f32 / u16::MAX as f32) * 2.0 - 1.0
}

#[inline]
pub(crate) fn scale_u24(sample: u32) -> f32 {
    let max = (1u32 << 24) - 1;
    (sample as f32 / max as f32) * 2.0 - 1.0
}

#[inline]
pub(crate) fn scale_u32(sample: u32) -> f32 {
    (sample as f32 / u32::MAX as f32) * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{wav_bytes_f32, wav_bytes_i16};

    #[test]
    fn test_collapse_mono() {
        let sample = collapse_channels(vec![vec![0.5, -0.5]], 44100, true);
        assert!(!sample.is_stereo());
        assert_eq!(sample.left(), &[0.5, -0.5]);
    }

    #[test]
    fn test_collapse_forced_stereo_keeps_first_two_channels() {
        let channels = vec![vec![1.0, 1.0], vec![-1.0, -1.0], vec![0.25, 0.25]];
        let sample = collapse_channels(channels, 48000, true);
        assert!(sample.is_stereo());
        assert_eq!(sample.left(), &[1.0, 1.0]);
        assert_eq!(sample.right(), Some(&[-1.0f32, -1.0][..]));
        assert_eq!(sample.sample_rate(), 48000);
    }

    #[test]
    fn test_collapse_multichannel_averages_when_not_forced() {
        let channels = vec![vec![1.0, 0.0], vec![0.0, 0.0], vec![0.5, 0.3]];
        let sample = collapse_channels(channels, 44100, false);
        assert!(!sample.is_stereo());
        assert!((sample.left()[0] - 0.5).abs() < 1e-6);
        assert!((sample.left()[1] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_collapse_empty() {
        assert!(collapse_channels(Vec::new(), 44100, false).is_empty());
        assert!(collapse_channels(vec![Vec::new(), Vec::new()], 44100, true).is_empty());
    }

    #[test]
    fn test_decode_mono_wav() {
        let bytes = wav_bytes_i16(1, 44100, &[16384, -16384, 0, 8192]);
        let sample = SymphoniaDecoder::default().decode(bytes, false).unwrap();

        assert!(!sample.is_stereo());
        assert_eq!(sample.frames(), 4);
        assert_eq!(sample.sample_rate(), 44100);
        assert!((sample.left()[0] - 0.5).abs() < 1e-4);
        assert!((sample.left()[1] + 0.5).abs() < 1e-4);
        assert!((sample.left()[3] - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_decode_stereo_wav_forced() {
        // Interleaved L/R.
        let bytes = wav_bytes_f32(2, 48000, &[0.5, -0.5, 0.25, -0.25, 1.0, -1.0]);
        let sample = SymphoniaDecoder::default().decode(bytes, true).unwrap();

        assert!(sample.is_stereo());
        assert_eq!(sample.frames(), 3);
        assert_eq!(sample.left(), &[0.5, 0.25, 1.0]);
        assert_eq!(sample.right(), Some(&[-0.5f32, -0.25, -1.0][..]));
    }

    #[test]
    fn test_decode_stereo_wav_not_forced_is_averaged() {
        let bytes = wav_bytes_f32(2, 44100, &[0.5, 0.0, 1.0, -1.0]);
        let sample = SymphoniaDecoder::default().decode(bytes, false).unwrap();

        assert!(!sample.is_stereo());
        assert_eq!(sample.left(), &[0.25, 0.0]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = SymphoniaDecoder::default().decode(b"definitely not audio".to_vec(), false);
        assert!(result.is_err());
    }

    #[test]
    fn test_scale_helpers() {
        assert_eq!(scale_s16(i16::MIN), -1.0);
        assert_eq!(scale_s8(0), 0.0);
        assert!((scale_u8(u8::MAX) - 1.0).abs() < 1e-6);
        assert!((scale_s24(1 << 22) - 0.5).abs() < 1e-6);
    }
}
