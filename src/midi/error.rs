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

/// Typed error for MIDI transport failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MIDI init error: {0}")]
    Init(#[from] midir::InitError),

    #[error("MIDI port info error: {0}")]
    PortInfo(#[from] midir::PortInfoError),

    #[error("unable to connect to MIDI output {port}: {reason}")]
    Connect { port: String, reason: String },

    #[error("MIDI send error: {0}")]
    Send(#[from] midir::SendError),

    #[error("unable to encode MIDI message: {0}")]
    Encode(String),

    #[error("no MIDI output found with name {0}")]
    NotFound(String),

    #[error("found too many MIDI outputs that match ({0}), use a less ambiguous device name")]
    Ambiguous(String),

    #[error("MIDI output {0} is closed")]
    Closed(String),
}
