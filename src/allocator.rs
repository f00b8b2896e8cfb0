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

use midly::num::{u14, u4, u7};
use tracing::{debug, error, warn};

use crate::midi::{Message, Sink};

use self::fingers::FingerChannelMap;
use self::pool::ChannelPool;

mod error;
pub mod fingers;
pub mod pool;

pub use self::error::{Error, Fault};

/// Channel 0 is the zone leader, so at most 15 member channels are available.
pub const MAX_CHANNELS: u8 = 15;

/// The centered pitch wheel value.
pub const PITCH_WHEEL_CENTER: u16 = 1 << 13;

const DEFAULT_PITCH_BEND_RANGE: u8 = 48;
const DEFAULT_VELOCITY: u8 = 127;

// Registered parameter number controllers.
const RPN_LSB: u8 = 100;
const RPN_MSB: u8 = 101;
const DATA_ENTRY_MSB: u8 = 6;
const DATA_ENTRY_LSB: u8 = 38;

/// An allocatable member channel, 1 through 15.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(u8);

impl Channel {
    /// Creates a channel, returning None for the reserved channel 0 or
    /// anything outside of the transport.
    pub fn new(number: u8) -> Option<Channel> {
        if (1..=MAX_CHANNELS).contains(&number) {
            Some(Channel(number))
        } else {
            None
        }
    }

    /// The channel number as seen on the wire.
    pub fn as_int(&self) -> u8 {
        self.0
    }

    pub fn as_u4(&self) -> u4 {
        u4::from(self.0)
    }

    pub(crate) fn index(&self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {}", self.0)
    }
}

/// An opaque identifier for a single active touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Finger(u64);

impl Finger {
    pub fn new(id: u64) -> Finger {
        Finger(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Finger {
    fn from(id: u64) -> Self {
        Finger(id)
    }
}

impl fmt::Display for Finger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "finger {}", self.0)
    }
}

/// Allocator settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    channels: u8,
    pitch_bend_range: u7,
    velocity: u7,
}

impl Settings {
    /// Creates new settings. The channel count must be between 1 and 15.
    pub fn new(channels: u8, pitch_bend_range: u7, velocity: u7) -> Result<Settings, Error> {
        if Channel::new(channels).is_none() {
            return Err(Error::ChannelCount(channels));
        }

        Ok(Settings {
            channels,
            pitch_bend_range,
            velocity,
        })
    }

    /// The number of member channels, allocated as channels 1 through N.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// The pitch bend range in semitones sent on every allocation.
    pub fn pitch_bend_range(&self) -> u7 {
        self.pitch_bend_range
    }

    /// The note on velocity.
    pub fn velocity(&self) -> u7 {
        self.velocity
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            channels: MAX_CHANNELS,
            pitch_bend_range: u7::from(DEFAULT_PITCH_BEND_RANGE),
            velocity: u7::from(DEFAULT_VELOCITY),
        }
    }
}

/// Allocates one channel per finger, stealing the oldest channel when every
/// channel is busy so the newest touch always sounds.
///
/// The allocator is not internally synchronized. Calls must be serialized by
/// the host, see [`crate::touch::Controller`].
pub struct Allocator {
    settings: Settings,
    pool: ChannelPool,
    fingers: FingerChannelMap,
    sink: Arc<dyn Sink>,
}

impl Allocator {
    pub fn new(sink: Arc<dyn Sink>, settings: Settings) -> Allocator {
        Allocator {
            settings,
            pool: ChannelPool::new(settings.channels),
            fingers: FingerChannelMap::new(),
            sink,
        }
    }

    /// Starts a note for the finger and returns the channel carrying it.
    pub fn note_on(&mut self, finger: Finger, note: u7) -> Result<Channel, Error> {
        let mut messages: Vec<Message> = Vec::with_capacity(8);

        if let Some(previous) = self.fingers.unbind(finger) {
            warn!(
                finger = finger.id(),
                channel = previous.channel.as_int(),
                "Note on for a finger that is already sounding, releasing it first."
            );
            self.pool.release(previous.channel);
            messages.push(Message::NoteOff {
                channel: previous.channel,
                note: previous.note,
                velocity: u7::from(0),
            });
        }

        let channel = match self.pool.take_idle() {
            Some(channel) => channel,
            None => {
                let channel = match self.pool.take_oldest_busy() {
                    Some(channel) => channel,
                    None => return Err(self.fault(Fault::Exhausted)),
                };
                let victim = match self.fingers.finger_of(channel) {
                    Some(victim) => victim,
                    None => return Err(self.fault(Fault::BusyWithoutFinger(channel))),
                };
                if let Some(stolen) = self.fingers.unbind(victim) {
                    debug!(
                        finger = victim.id(),
                        channel = channel.as_int(),
                        note = stolen.note.as_int(),
                        "Stealing oldest channel."
                    );
                    messages.push(Message::NoteOff {
                        channel,
                        note: stolen.note,
                        velocity: u7::from(0),
                    });
                }
                channel
            }
        };

        messages.extend(self.reset_sequence(channel));

        if let Err(fault) = self.fingers.bind(finger, channel, note) {
            return Err(self.fault(fault));
        }
        self.pool.mark_busy(channel);
        messages.push(Message::NoteOn {
            channel,
            note,
            velocity: self.settings.velocity,
        });

        debug!(
            finger = finger.id(),
            channel = channel.as_int(),
            note = note.as_int(),
            "Allocated channel."
        );

        self.emit(messages)?;
        Ok(channel)
    }

    /// Ends the finger's note. Unknown fingers are ignored.
    pub fn note_off(&mut self, finger: Finger) -> Result<Option<Channel>, Error> {
        let unbound = match self.fingers.unbind(finger) {
            Some(unbound) => unbound,
            None => {
                debug!(finger = finger.id(), "Note off for unknown finger.");
                return Ok(None);
            }
        };

        self.pool.release(unbound.channel);
        debug!(
            finger = finger.id(),
            channel = unbound.channel.as_int(),
            "Released channel."
        );

        self.emit(vec![Message::NoteOff {
            channel: unbound.channel,
            note: unbound.note,
            velocity: u7::from(0),
        }])?;
        Ok(Some(unbound.channel))
    }

    /// Forwards a pitch wheel amount to the finger's channel. Unknown fingers
    /// are ignored. The amount is sent as is.
    pub fn pitch_bend(&mut self, finger: Finger, amount: u14) -> Result<Option<Channel>, Error> {
        let channel = match self.fingers.channel_of(finger) {
            Some(channel) => channel,
            None => return Ok(None),
        };

        self.fingers.set_pitch_bend(channel, amount);
        self.emit(vec![Message::PitchWheel { channel, amount }])?;
        Ok(Some(channel))
    }

    /// Releases every busy channel, oldest first.
    pub fn release_all(&mut self) -> Result<(), Error> {
        let mut messages: Vec<Message> = Vec::with_capacity(self.pool.busy_len());
        while let Some(channel) = self.pool.take_oldest_busy() {
            let unbound = match self.fingers.finger_of(channel) {
                Some(finger) => self.fingers.unbind(finger),
                None => None,
            };
            self.pool.release(channel);
            match unbound {
                Some(unbound) => messages.push(Message::NoteOff {
                    channel,
                    note: unbound.note,
                    velocity: u7::from(0),
                }),
                None => return Err(self.fault(Fault::BusyWithoutFinger(channel))),
            }
        }

        self.emit(messages)
    }

    pub fn channel_of(&self, finger: Finger) -> Option<Channel> {
        self.fingers.channel_of(finger)
    }

    pub fn finger_of(&self, channel: Channel) -> Option<Finger> {
        self.fingers.finger_of(channel)
    }

    pub fn note_of(&self, channel: Channel) -> Option<u7> {
        self.fingers.note_of(channel)
    }

    pub fn pitch_bend_of(&self, channel: Channel) -> Option<u14> {
        self.fingers.voice(channel).map(|voice| voice.pitch_bend)
    }

    /// The number of busy channels.
    pub fn active(&self) -> usize {
        self.pool.busy_len()
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Verifies that busy channels and bound fingers are in exact 1:1
    /// correspondence.
    pub fn verify(&self) -> Result<(), Fault> {
        self.fingers.check()?;

        if !self.pool.is_ordered() {
            return Err(Fault::Unordered);
        }
        if self.pool.busy_len() != self.fingers.len() {
            return Err(Fault::CountMismatch {
                busy: self.pool.busy_len(),
                fingers: self.fingers.len(),
            });
        }
        let found = self.pool.busy_len() + self.pool.idle_len();
        if found != usize::from(self.settings.channels) {
            return Err(Fault::Leaked {
                expected: usize::from(self.settings.channels),
                found,
            });
        }
        for channel in self.pool.busy() {
            if self.fingers.finger_of(channel).is_none() {
                return Err(Fault::BusyWithoutFinger(channel));
            }
        }

        Ok(())
    }

    /// The pitch wheel and bend range reset sent before every note on.
    fn reset_sequence(&self, channel: Channel) -> [Message; 5] {
        [
            Message::PitchWheel {
                channel,
                amount: u14::from(PITCH_WHEEL_CENTER),
            },
            Message::ControlChange {
                channel,
                controller: u7::from(RPN_MSB),
                value: u7::from(0),
            },
            Message::ControlChange {
                channel,
                controller: u7::from(RPN_LSB),
                value: u7::from(0),
            },
            Message::ControlChange {
                channel,
                controller: u7::from(DATA_ENTRY_MSB),
                value: self.settings.pitch_bend_range,
            },
            Message::ControlChange {
                channel,
                controller: u7::from(DATA_ENTRY_LSB),
                value: u7::from(0),
            },
        ]
    }

    fn emit(&self, messages: Vec<Message>) -> Result<(), Error> {
        for message in messages.iter() {
            self.sink.emit(message)?;
        }
        Ok(())
    }

    fn fault(&self, fault: Fault) -> Error {
        if cfg!(debug_assertions) {
            panic!("allocator fault: {}", fault);
        }
        error!(fault = fault.to_string(), "Allocator fault.");
        Error::Fault(fault)
    }
}

impl fmt::Display for Allocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Allocator ({}/{} channels busy, sink: {})",
            self.pool.busy_len(),
            self.settings.channels,
            self.sink
        )
    }
}
