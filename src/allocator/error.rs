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
use super::{Channel, Finger};
use crate::midi;

/// Errors surfaced by the allocator. Caller mistakes such as stray releases
/// are not errors and never show up here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("channel count must be between 1 and 15, got {0}")]
    ChannelCount(u8),

    #[error("error emitting MIDI message: {0}")]
    Emit(#[from] midi::Error),

    #[error("allocator fault: {0}")]
    Fault(#[from] Fault),
}

/// A broken finger/channel bijection. These indicate a defect in the
/// allocator rather than bad input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("{0} is already bound to {1}")]
    FingerAlreadyBound(Finger, Channel),

    #[error("{0} is already bound to {1}")]
    ChannelAlreadyBound(Channel, Finger),

    #[error("{0} is busy with no finger bound")]
    BusyWithoutFinger(Channel),

    #[error("{0} is bound without a busy channel")]
    FingerWithoutChannel(Finger),

    #[error("{busy} busy channels for {fingers} bound fingers")]
    CountMismatch { busy: usize, fingers: usize },

    #[error("pool holds {found} channels, expected {expected}")]
    Leaked { expected: usize, found: usize },

    #[error("busy channels are out of allocation order")]
    Unordered,

    #[error("no idle or busy channels left to allocate")]
    Exhausted,
}
