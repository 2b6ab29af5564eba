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
use std::fmt;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use super::OutputRenderer;
use crate::player::PlayerError;

/// A small wrapper around a cpal::Device.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// Float output: render straight into the device buffer.
fn create_f32_callback(
    mut renderer: OutputRenderer,
) -> impl FnMut(&mut [f32], &cpal::OutputCallbackInfo) + Send + 'static {
    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        renderer.fill(data);
    }
}

/// Integer output: render into float scratch, then convert.
fn create_converting_callback<T: cpal::Sample + cpal::FromSample<f32>>(
    mut renderer: OutputRenderer,
    initial_len: usize,
) -> impl FnMut(&mut [T], &cpal::OutputCallbackInfo) + Send + 'static {
    let mut scratch = vec![0.0f32; initial_len];
    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        // Only grows if the host hands us a bigger buffer than requested.
        if scratch.len() < data.len() {
            scratch.resize(data.len(), 0.0);
        }
        let scratch = &mut scratch[..data.len()];
        renderer.fill(scratch);
        for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
            *dst = T::from_sample(src);
        }
    }
}

impl Device {
    /// Lists cpal devices with at least one output channel.
    pub fn list() -> Result<Vec<Device>, PlayerError> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let output_configs = match device.supported_output_configs() {
                    Ok(output_configs) => output_configs,
                    Err(_) => continue,
                };
                let max_channels = output_configs
                    .map(|output_config| output_config.channels())
                    .max()
                    .unwrap_or(0);

                if max_channels > 0 {
                    devices.push(Device {
                        name: device
                            .name()
                            .map_err(|e| PlayerError::Device(e.to_string()))?,
                        max_channels,
                        host_id,
                        device,
                    })
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the cpal device with the given name.
    pub fn get(name: &str) -> Result<Device, PlayerError> {
        match Device::list()?
            .into_iter()
            .find(|device| device.name.trim() == name)
        {
            Some(device) => Ok(device),
            None => Err(PlayerError::DeviceNotFound(name.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_channels(&self) -> u16 {
        self.max_channels
    }

    /// Opens an output stream driven by the renderer and starts it. Audio
    /// plays for as long as the returned stream is kept alive.
    pub fn play(
        &self,
        renderer: OutputRenderer,
        sample_rate: u32,
        buffer_size: u32,
    ) -> Result<cpal::Stream, PlayerError> {
        let channels = u16::try_from(renderer.channels())
            .map_err(|_| PlayerError::InvalidChannelCount(renderer.channels()))?;
        let config = cpal::StreamConfig {
            channels,
            sample_rate: sample_rate,
            buffer_size: if buffer_size > 0 {
                cpal::BufferSize::Fixed(buffer_size)
            } else {
                cpal::BufferSize::Default
            },
        };
        let sample_format = self.device.default_output_config()?.sample_format();
        let scratch_len = buffer_size as usize * renderer.channels();

        let stream = match sample_format {
            cpal::SampleFormat::F32 => self.device.build_output_stream(
                &config,
                create_f32_callback(renderer),
                |err| error!("CPAL output stream error: {}", err),
                None,
            )?,
            cpal::SampleFormat::I16 => self.device.build_output_stream(
                &config,
                create_converting_callback::<i16>(renderer, scratch_len),
                |err| error!("CPAL output stream error: {}", err),
                None,
            )?,
            cpal::SampleFormat::I32 => self.device.build_output_stream(
                &config,
                create_converting_callback::<i32>(renderer, scratch_len),
                |err| error!("CPAL output stream error: {}", err),
                None,
            )?,
            other => return Err(PlayerError::UnsupportedSampleFormat(other.to_string())),
        };

        stream.play()?;
        info!(
            device = self.name,
            channels,
            sample_rate,
            buffer_size,
            format = sample_format.to_string(),
            "CPAL output stream started"
        );
        Ok(stream)
    }
}
