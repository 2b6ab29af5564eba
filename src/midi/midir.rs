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

use midir::{MidiInput, MidiInputConnection, MidiInputPort};
use midly::live::LiveEvent;
use tracing::{debug, info, span, Level};

use super::CommandSender;
use crate::player::PlayerError;

/// A MIDI input port.
pub struct Device {
    name: String,
    input_port: MidiInputPort,
}

impl Device {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts forwarding note-ons to the engine. Events stop when the returned
    /// connection is dropped.
    pub fn watch(&self, sender: CommandSender) -> Result<MidiInputConnection<()>, PlayerError> {
        let span = span!(Level::INFO, "watch events (midir)");
        let _enter = span.enter();

        info!(device = self.name, "Watching MIDI events.");

        let input = MidiInput::new("drumpak input")?;
        let connection = input
            .connect(
                &self.input_port,
                "drumpak input watcher",
                move |_, raw_event, _| {
                    if let Ok(event) = LiveEvent::parse(raw_event) {
                        debug!(event = format!("{:?}", event), "Received MIDI event.");
                    }
                    sender.send_midi(raw_event);
                },
                (),
            )
            .map_err(|e| PlayerError::MidiConnect(e.to_string()))?;

        Ok(connection)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Input)", self.name)
    }
}

/// Lists MIDI input devices, sorted by name.
pub fn list() -> Result<Vec<Device>, PlayerError> {
    let input = MidiInput::new("drumpak input listing")?;

    let mut devices: Vec<Device> = Vec::new();
    for port in input.ports() {
        let name = input.port_name(&port)?;
        if devices.iter().any(|device| device.name == name) {
            continue;
        }
        devices.push(Device {
            name,
            input_port: port,
        });
    }

    devices.sort_by_key(|device| device.name.clone());
    Ok(devices)
}

/// Gets the one input device whose name contains `name`.
pub fn get(name: &str) -> Result<Device, PlayerError> {
    let mut matches = list()?
        .into_iter()
        .filter(|device| device.name.contains(name))
        .collect::<Vec<Device>>();

    if matches.is_empty() {
        return Err(PlayerError::DeviceNotFound(name.to_string()));
    }
    if matches.len() > 1 {
        return Err(PlayerError::AmbiguousDevice(
            matches
                .iter()
                .map(|device| device.name.clone())
                .collect::<Vec<String>>()
                .join(", "),
        ));
    }

    Ok(matches.swap_remove(0))
}
