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
use std::collections::HashMap;

use midly::num::{u14, u7};

use super::{error::Fault, Channel, Finger, PITCH_WHEEL_CENTER};

/// The voice state of a bound channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Voice {
    /// The finger that owns the channel.
    pub finger: Finger,
    /// The note currently sounding on the channel.
    pub note: u7,
    /// The last pitch wheel amount sent to the channel.
    pub pitch_bend: u14,
}

/// A finger binding that has just been removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Unbound {
    pub channel: Channel,
    pub note: u7,
}

/// The bijection between fingers and channels. Voice state is stored in a
/// table keyed by channel number with a reverse index by finger.
#[derive(Debug)]
pub struct FingerChannelMap {
    voices: [Option<Voice>; 16],
    channels: HashMap<Finger, Channel>,
}

impl FingerChannelMap {
    pub fn new() -> FingerChannelMap {
        FingerChannelMap {
            voices: [None; 16],
            channels: HashMap::new(),
        }
    }

    /// Binds the finger to the channel with the given note and a centered
    /// pitch wheel.
    pub fn bind(&mut self, finger: Finger, channel: Channel, note: u7) -> Result<(), Fault> {
        if let Some(existing) = self.channels.get(&finger) {
            return Err(Fault::FingerAlreadyBound(finger, *existing));
        }
        if let Some(voice) = self.voices[channel.index()] {
            return Err(Fault::ChannelAlreadyBound(channel, voice.finger));
        }

        self.voices[channel.index()] = Some(Voice {
            finger,
            note,
            pitch_bend: u14::from(PITCH_WHEEL_CENTER),
        });
        self.channels.insert(finger, channel);
        Ok(())
    }

    /// Removes both directions of the finger's binding. Returns None for an
    /// unknown finger.
    pub fn unbind(&mut self, finger: Finger) -> Option<Unbound> {
        let channel = self.channels.remove(&finger)?;
        let voice = self.voices[channel.index()].take()?;
        Some(Unbound {
            channel,
            note: voice.note,
        })
    }

    /// Records a new pitch wheel amount for the channel.
    pub fn set_pitch_bend(&mut self, channel: Channel, amount: u14) {
        if let Some(voice) = self.voices[channel.index()].as_mut() {
            voice.pitch_bend = amount;
        }
    }

    pub fn channel_of(&self, finger: Finger) -> Option<Channel> {
        self.channels.get(&finger).copied()
    }

    pub fn finger_of(&self, channel: Channel) -> Option<Finger> {
        self.voice(channel).map(|voice| voice.finger)
    }

    pub fn note_of(&self, channel: Channel) -> Option<u7> {
        self.voice(channel).map(|voice| voice.note)
    }

    pub fn voice(&self, channel: Channel) -> Option<&Voice> {
        self.voices[channel.index()].as_ref()
    }

    /// The number of bound fingers.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Checks that both lookup directions agree.
    pub(super) fn check(&self) -> Result<(), Fault> {
        for (finger, channel) in self.channels.iter() {
            match self.voices[channel.index()] {
                Some(voice) if voice.finger == *finger => {}
                _ => return Err(Fault::FingerWithoutChannel(*finger)),
            }
        }

        let bound_voices = self.voices.iter().flatten().count();
        if bound_voices != self.channels.len() {
            return Err(Fault::CountMismatch {
                busy: bound_voices,
                fingers: self.channels.len(),
            });
        }

        Ok(())
    }
}

impl Default for FingerChannelMap {
    fn default() -> Self {
        FingerChannelMap::new()
    }
}
