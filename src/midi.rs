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
use std::{fmt, sync::Arc};

use midly::{
    live::LiveEvent,
    num::{u14, u7},
    MidiMessage, PitchBend,
};

use crate::allocator::Channel;

mod error;
mod midir;
mod mock;

pub use self::error::Error;

/// A channel voice message emitted by the allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message {
    NoteOff {
        channel: Channel,
        note: u7,
        velocity: u7,
    },
    NoteOn {
        channel: Channel,
        note: u7,
        velocity: u7,
    },
    ControlChange {
        channel: Channel,
        controller: u7,
        value: u7,
    },
    PitchWheel {
        channel: Channel,
        amount: u14,
    },
}

impl Message {
    /// The channel the message is addressed to.
    pub fn channel(&self) -> Channel {
        match self {
            Message::NoteOff { channel, .. }
            | Message::NoteOn { channel, .. }
            | Message::ControlChange { channel, .. }
            | Message::PitchWheel { channel, .. } => *channel,
        }
    }

    /// Converts the message to a live event on the matching wire channel.
    pub fn to_live_event(&self) -> LiveEvent<'static> {
        let message = match *self {
            Message::NoteOff { note, velocity, .. } => MidiMessage::NoteOff {
                key: note,
                vel: velocity,
            },
            Message::NoteOn { note, velocity, .. } => MidiMessage::NoteOn {
                key: note,
                vel: velocity,
            },
            Message::ControlChange {
                controller, value, ..
            } => MidiMessage::Controller { controller, value },
            Message::PitchWheel { amount, .. } => MidiMessage::PitchBend {
                bend: PitchBend(amount),
            },
        };

        LiveEvent::Midi {
            channel: self.channel().as_u4(),
            message,
        }
    }

    /// Encodes the message as raw MIDI bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        // Channel voice messages are at most three bytes.
        let mut buf: Vec<u8> = Vec::with_capacity(3);
        self.to_live_event()
            .write(&mut buf)
            .map_err(|e| Error::Encode(e.to_string()))?;
        Ok(buf)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::NoteOff {
                channel,
                note,
                velocity,
            } => write!(
                f,
                "note off ({}, note {}, velocity {})",
                channel,
                note.as_int(),
                velocity.as_int()
            ),
            Message::NoteOn {
                channel,
                note,
                velocity,
            } => write!(
                f,
                "note on ({}, note {}, velocity {})",
                channel,
                note.as_int(),
                velocity.as_int()
            ),
            Message::ControlChange {
                channel,
                controller,
                value,
            } => write!(
                f,
                "control change ({}, controller {}, value {})",
                channel,
                controller.as_int(),
                value.as_int()
            ),
            Message::PitchWheel { channel, amount } => {
                write!(f, "pitch wheel ({}, amount {})", channel, amount.as_int())
            }
        }
    }
}

/// A destination for emitted channel voice messages.
pub trait Sink: fmt::Display + std::marker::Send + std::marker::Sync {
    /// Returns the name of the sink.
    fn name(&self) -> String;

    /// Emits a message.
    fn emit(&self, message: &Message) -> Result<(), Error>;
}

/// Lists the MIDI output ports known to midir.
pub fn list_devices() -> Result<Vec<String>, Error> {
    midir::list()
}

/// Gets an output with the given name.
pub fn get_device(name: &str) -> Result<Arc<dyn Sink>, Error> {
    if name.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(name)));
    };

    Ok(Arc::new(midir::get(name)?))
}

#[cfg(test)]
pub mod test {
    pub use super::mock::Device;
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use midly::{
        live::LiveEvent,
        num::{u14, u4, u7},
        MidiMessage,
    };

    use super::Message;
    use crate::allocator::Channel;

    fn channel(number: u8) -> Channel {
        Channel::new(number).expect("valid channel")
    }

    #[test]
    fn wire_channel_matches_allocated_channel() {
        let event = Message::NoteOn {
            channel: channel(3),
            note: u7::from(60),
            velocity: u7::from(127),
        }
        .to_live_event();

        assert_eq!(
            LiveEvent::Midi {
                channel: u4::from(3),
                message: MidiMessage::NoteOn {
                    key: u7::from(60),
                    vel: u7::from(127),
                },
            },
            event
        );
    }

    #[test]
    fn encodes_channel_voice_bytes() -> Result<(), Box<dyn Error>> {
        assert_eq!(
            vec![0x81, 60, 0],
            Message::NoteOff {
                channel: channel(1),
                note: u7::from(60),
                velocity: u7::from(0),
            }
            .to_bytes()?
        );
        assert_eq!(
            vec![0xBF, 101, 0],
            Message::ControlChange {
                channel: channel(15),
                controller: u7::from(101),
                value: u7::from(0),
            }
            .to_bytes()?
        );
        // Center is 0x2000, sent LSB first.
        assert_eq!(
            vec![0xE2, 0x00, 0x40],
            Message::PitchWheel {
                channel: channel(2),
                amount: u14::from(8192),
            }
            .to_bytes()?
        );
        Ok(())
    }

    #[test]
    fn mock_devices_by_name() -> Result<(), Box<dyn Error>> {
        let device = super::get_device("mock-output")?;
        assert_eq!("mock-output", device.name());
        Ok(())
    }
}
