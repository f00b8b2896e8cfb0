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
use std::io;
use std::sync::Arc;

use midly::num::{u14, u7};
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{debug, error, info, span, Instrument, Level};

use crate::allocator::{self, Allocator, Finger, PITCH_WHEEL_CENTER};

pub mod keyboard;

/// The largest pitch wheel amount.
const PITCH_WHEEL_MAX: f32 = 16383.0;

/// How many touch events may be queued before drivers block.
const EVENT_QUEUE_SIZE: usize = 64;

/// Touch events that drive the allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// A touch point was pressed on the given note.
    Press { finger: Finger, note: u7 },

    /// A touch point moved, bending its note to the given wheel amount.
    Move { finger: Finger, bend: u14 },

    /// A touch point was released.
    Release { finger: Finger },
}

/// A source of touch events.
pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Feeds touch events into an allocator one at a time.
///
/// Drivers may run on any thread, but every event passes through a single
/// queue consumed by one task, which is the only owner of the allocator.
pub struct Controller {
    handle: JoinHandle<Allocator>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(allocator: Allocator, driver: Arc<dyn Driver>) -> Controller {
        let span = span!(Level::INFO, "touch controller");
        Controller {
            handle: tokio::spawn(Controller::trigger_events(allocator, driver).instrument(span)),
        }
    }

    /// Join will block until the driver closes and all notes have been released.
    pub async fn join(&mut self) -> Result<Allocator, JoinError> {
        (&mut self.handle).await
    }

    async fn trigger_events(mut allocator: Allocator, driver: Arc<dyn Driver>) -> Allocator {
        let (events_tx, mut events_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let join_handle = driver.monitor_events(events_tx);

        info!(allocator = allocator.to_string(), "Controller started.");

        while let Some(event) = events_rx.recv().await {
            debug!(event = format!("{:?}", event), "Received touch event.");
            if let Err(e) = dispatch(&mut allocator, event) {
                error!(err = e.to_string(), "Error handling touch event.");
            }
        }

        info!("Controller closing.");
        if let Err(e) = allocator.release_all() {
            error!(err = e.to_string(), "Error releasing notes.");
        }
        match join_handle.await {
            Ok(Err(e)) => error!(err = e.to_string(), "Touch driver failed."),
            Err(e) => error!(err = e.to_string(), "Error waiting for touch driver to stop."),
            Ok(Ok(())) => {}
        }

        allocator
    }
}

/// Applies a single touch event to the allocator.
pub fn dispatch(allocator: &mut Allocator, event: Event) -> Result<(), allocator::Error> {
    match event {
        Event::Press { finger, note } => allocator.note_on(finger, note).map(|_| ()),
        Event::Move { finger, bend } => allocator.pitch_bend(finger, bend).map(|_| ()),
        Event::Release { finger } => allocator.note_off(finger).map(|_| ()),
    }
}

/// Maps a bend of the given number of semitones to a pitch wheel amount for
/// a wheel spanning +/- the given range. Results are clamped to the wheel.
pub fn bend_for_semitones(semitones: f32, pitch_bend_range: u7) -> u14 {
    if pitch_bend_range.as_int() == 0 || !semitones.is_finite() {
        return u14::from(PITCH_WHEEL_CENTER);
    }

    let center = f32::from(PITCH_WHEEL_CENTER);
    let amount = center + semitones * center / f32::from(pitch_bend_range.as_int());
    u14::from(amount.round().clamp(0.0, PITCH_WHEEL_MAX) as u16)
}

#[cfg(test)]
mod test {
    use std::{error::Error, io, sync::Arc};

    use midly::num::{u14, u7};
    use tokio::{sync::mpsc::Sender, task::JoinHandle};

    use super::{bend_for_semitones, Controller, Driver, Event};
    use crate::{
        allocator::{Allocator, Channel, Finger, Settings},
        midi::{self, Message},
    };

    /// Sends a fixed script of events, then closes.
    struct ScriptDriver {
        events: Vec<Event>,
    }

    impl Driver for ScriptDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let events = self.events.clone();
            tokio::task::spawn_blocking(move || {
                for event in events {
                    events_tx
                        .blocking_send(event)
                        .map_err(|e| io::Error::other(e.to_string()))?;
                }
                Ok(())
            })
        }
    }

    fn press(finger: u64, note: u8) -> Event {
        Event::Press {
            finger: Finger::new(finger),
            note: u7::from(note),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_controller() -> Result<(), Box<dyn Error>> {
        let device = Arc::new(midi::test::Device::get("mock-controller"));
        let allocator = Allocator::new(
            device.clone(),
            Settings::new(2, u7::from(48), u7::from(127))?,
        );
        let driver = Arc::new(ScriptDriver {
            events: vec![
                press(1, 60),
                press(2, 64),
                Event::Move {
                    finger: Finger::new(2),
                    bend: u14::from(9000),
                },
                press(3, 67),
                // Finger 1 was stolen, so these do nothing.
                Event::Move {
                    finger: Finger::new(1),
                    bend: u14::from(100),
                },
                Event::Release {
                    finger: Finger::new(1),
                },
                Event::Release {
                    finger: Finger::new(2),
                },
            ],
        });

        let mut controller = Controller::new(allocator, driver);
        let allocator = controller.join().await?;

        assert_eq!(0, allocator.active());
        allocator.verify()?;

        let first = Channel::new(1).expect("valid channel");
        let second = Channel::new(2).expect("valid channel");
        let emitted = device.emitted();
        // Two allocations, a bend, a steal with an allocation, a release, and
        // the final release of finger 3 on shutdown.
        assert_eq!(6 + 6 + 1 + 7 + 1 + 1, emitted.len());
        assert_eq!(
            Message::PitchWheel {
                channel: second,
                amount: u14::from(9000),
            },
            emitted[12]
        );
        assert_eq!(
            Message::NoteOff {
                channel: first,
                note: u7::from(60),
                velocity: u7::from(0),
            },
            emitted[13]
        );
        assert_eq!(
            Message::NoteOff {
                channel: second,
                note: u7::from(64),
                velocity: u7::from(0),
            },
            emitted[20]
        );
        assert_eq!(
            Message::NoteOff {
                channel: first,
                note: u7::from(67),
                velocity: u7::from(0),
            },
            emitted[21]
        );
        Ok(())
    }

    #[test]
    fn semitones_to_pitch_wheel() {
        let range = u7::from(48);
        assert_eq!(u14::from(8192), bend_for_semitones(0.0, range));
        assert_eq!(u14::from(8363), bend_for_semitones(1.0, range));
        assert_eq!(u14::from(4096), bend_for_semitones(-24.0, range));
        assert_eq!(u14::from(0), bend_for_semitones(-48.0, range));
        assert_eq!(u14::from(16383), bend_for_semitones(48.0, range));
    }

    #[test]
    fn semitones_are_clamped() {
        let range = u7::from(2);
        assert_eq!(u14::from(16383), bend_for_semitones(12.0, range));
        assert_eq!(u14::from(0), bend_for_semitones(-12.0, range));
        assert_eq!(u14::from(8192), bend_for_semitones(f32::NAN, range));
        assert_eq!(u14::from(8192), bend_for_semitones(5.0, u7::from(0)));
    }
}
