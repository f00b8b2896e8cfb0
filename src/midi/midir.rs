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

use midir::{MidiOutput, MidiOutputConnection, MidiOutputPort};
use parking_lot::Mutex;
use tracing::{debug, info, span, Level};

use super::{Error, Message};

/// An output port kept connected for the lifetime of the session.
pub struct Device {
    name: String,
    connection: Mutex<MidiOutputConnection>,
}

impl super::Sink for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn emit(&self, message: &Message) -> Result<(), Error> {
        debug!(
            device = self.name,
            message = message.to_string(),
            "Emitting message."
        );

        let buf = message.to_bytes()?;
        self.connection.lock().send(&buf)?;
        Ok(())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Output)", self.name)
    }
}

/// Lists midir output port names, sorted.
pub fn list() -> Result<Vec<String>, Error> {
    let mut names = list_ports()?
        .into_iter()
        .map(|(name, _)| name)
        .collect::<Vec<String>>();
    names.sort();
    names.dedup();
    Ok(names)
}

fn list_ports() -> Result<Vec<(String, MidiOutputPort)>, Error> {
    let output = MidiOutput::new("touchmidi output listing")?;
    output
        .ports()
        .into_iter()
        .map(|port| -> Result<(String, MidiOutputPort), Error> {
            Ok((output.port_name(&port)?, port))
        })
        .collect()
}

/// Gets and connects the midir output whose name contains the given name.
pub fn get(name: &str) -> Result<Device, Error> {
    let span = span!(Level::INFO, "connect (midir)");
    let _enter = span.enter();

    let mut matches = list_ports()?
        .into_iter()
        .filter(|(port_name, _)| port_name.contains(name))
        .collect::<Vec<(String, MidiOutputPort)>>();

    if matches.is_empty() {
        return Err(Error::NotFound(name.to_string()));
    }
    if matches.len() > 1 {
        return Err(Error::Ambiguous(
            matches
                .iter()
                .map(|(port_name, _)| port_name.clone())
                .collect::<Vec<String>>()
                .join(", "),
        ));
    }

    // There's exactly one match at this point.
    let (port_name, port) = matches.swap_remove(0);
    let output = MidiOutput::new("touchmidi output")?;
    let connection = output
        .connect(&port, "touchmidi")
        .map_err(|e| Error::Connect {
            port: port_name.clone(),
            reason: e.to_string(),
        })?;

    info!(device = port_name, "Connected MIDI output.");

    Ok(Device {
        name: port_name,
        connection: Mutex::new(connection),
    })
}
