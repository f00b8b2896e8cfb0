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
use std::collections::VecDeque;

use super::Channel;

/// A busy channel along with the sequence number it was allocated at.
#[derive(Clone, Copy, Debug)]
struct Busy {
    sequence: u64,
    channel: Channel,
}

/// Partitions the allocatable channels into idle and busy queues.
///
/// Busy channels are kept in allocation order, oldest at the front, so that
/// stealing always takes the channel that has been engaged the longest.
#[derive(Debug)]
pub struct ChannelPool {
    idle: VecDeque<Channel>,
    busy: VecDeque<Busy>,
    next_sequence: u64,
}

impl ChannelPool {
    /// Creates a pool of channels 1 through the given count, all idle.
    pub fn new(count: u8) -> ChannelPool {
        ChannelPool {
            idle: (1..=count).filter_map(Channel::new).collect(),
            busy: VecDeque::with_capacity(usize::from(count)),
            next_sequence: 0,
        }
    }

    /// Takes the next idle channel, or None if the pool is exhausted.
    pub fn take_idle(&mut self) -> Option<Channel> {
        self.idle.pop_front()
    }

    /// Takes the channel that has been continuously busy the longest.
    pub fn take_oldest_busy(&mut self) -> Option<Channel> {
        self.busy.pop_front().map(|busy| busy.channel)
    }

    /// Returns the channel to the back of the idle queue. A channel that is
    /// still in the busy queue is removed from it.
    pub fn release(&mut self, channel: Channel) {
        self.busy.retain(|busy| busy.channel != channel);
        if !self.idle.contains(&channel) {
            self.idle.push_back(channel);
        }
    }

    /// Marks the channel as the newest busy channel.
    pub fn mark_busy(&mut self, channel: Channel) {
        self.idle.retain(|idle| *idle != channel);
        self.busy.push_back(Busy {
            sequence: self.next_sequence,
            channel,
        });
        self.next_sequence += 1;
    }

    /// Whether the channel is currently busy.
    pub fn is_busy(&self, channel: Channel) -> bool {
        self.busy.iter().any(|busy| busy.channel == channel)
    }

    /// Busy channels, oldest first.
    pub fn busy(&self) -> impl Iterator<Item = Channel> + '_ {
        self.busy.iter().map(|busy| busy.channel)
    }

    pub fn busy_len(&self) -> usize {
        self.busy.len()
    }

    pub fn idle_len(&self) -> usize {
        self.idle.len()
    }

    /// Whether the busy queue is strictly ordered by allocation sequence.
    pub(super) fn is_ordered(&self) -> bool {
        self.busy
            .iter()
            .zip(self.busy.iter().skip(1))
            .all(|(older, newer)| older.sequence < newer.sequence)
    }
}
