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
use crossbeam_channel::{Receiver, Sender, TrySendError};
use midly::live::LiveEvent;
use midly::MidiMessage;
use tracing::warn;

#[cfg(feature = "live")]
pub mod midir;

/// Capacity of the queue between MIDI input and the audio callback.
pub const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// A note-on that should trigger playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub note: u8,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn new(note: u8, velocity: u8) -> Self {
        Self { note, velocity }
    }

    /// Parses a raw MIDI message. Only note-ons with a non-zero velocity, on any
    /// channel, produce an event; note-offs and everything else are ignored.
    pub fn parse(raw: &[u8]) -> Option<NoteEvent> {
        match LiveEvent::parse(raw).ok()? {
            LiveEvent::Midi {
                message: MidiMessage::NoteOn { key, vel },
                ..
            } if vel.as_int() > 0 => Some(NoteEvent::new(key.as_int(), vel.as_int())),
            _ => None,
        }
    }
}

/// Work for the engine, delivered from other threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    Note(NoteEvent),
    /// Silence every voice.
    Reset,
}

/// The producer side of the command queue. Sending never blocks.
#[derive(Debug, Clone)]
pub struct CommandSender {
    sender: Sender<EngineCommand>,
}

impl CommandSender {
    /// Queues a command. Returns false if it was dropped because the queue is
    /// full or the engine has gone away.
    pub fn send(&self, command: EngineCommand) -> bool {
        match self.sender.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(command)) => {
                warn!(command = ?command, "Engine command queue full, dropping command");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Parses a raw MIDI message and queues it if it is a note-on.
    pub fn send_midi(&self, raw: &[u8]) -> bool {
        match NoteEvent::parse(raw) {
            Some(event) => self.send(EngineCommand::Note(event)),
            None => false,
        }
    }
}

/// Creates the bounded queue feeding the engine.
pub fn command_channel() -> (CommandSender, Receiver<EngineCommand>) {
    let (sender, receiver) = crossbeam_channel::bounded(COMMAND_QUEUE_CAPACITY);
    (CommandSender { sender }, receiver)
}
