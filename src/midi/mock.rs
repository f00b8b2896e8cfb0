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
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use tracing::debug;

use super::{Error, Message};

/// A mock device. Records everything emitted to it instead of sending it anywhere.
#[derive(Clone)]
pub struct Device {
    name: String,
    closed: Arc<AtomicBool>,
    emitted: Arc<Mutex<Vec<Message>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            closed: Arc::new(AtomicBool::new(false)),
            emitted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[cfg(test)]
    /// Gets every message emitted so far, in order.
    pub fn emitted(&self) -> Vec<Message> {
        self.emitted.lock().clone()
    }

    #[cfg(test)]
    /// Clears the recorded messages.
    pub fn reset(&self) {
        self.emitted.lock().clear();
    }

    #[cfg(test)]
    /// Makes all further emits fail.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}

impl super::Sink for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn emit(&self, message: &Message) -> Result<(), Error> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(Error::Closed(self.name.clone()));
        }

        debug!(
            device = self.name,
            message = message.to_string(),
            "Emitting message (mock)."
        );
        self.emitted.lock().push(*message);
        Ok(())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
