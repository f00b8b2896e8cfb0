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

use midly::num::{u14, u7};
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::{bend_for_semitones, Event};
use crate::allocator::Finger;

const PRESS: &str = "press";
const MOVE: &str = "move";
const GLIDE: &str = "glide";
const RELEASE: &str = "release";

/// A line of keyboard input that could not be turned into a touch event.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("unrecognized command: {0}")]
    UnknownCommand(String),

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid {field}: {value}")]
    Invalid { field: &'static str, value: String },

    #[error("unexpected trailing input: {0}")]
    Trailing(String),
}

/// A driver that reads touch events from the keyboard, one per line.
pub struct Driver {
    pitch_bend_range: u7,
}

impl Driver {
    /// Creates a keyboard driver. Glides are scaled to the given pitch bend range.
    pub fn new(pitch_bend_range: u7) -> Driver {
        Driver { pitch_bend_range }
    }

    /// Reads one line and sends any resulting event. Returns false at end of input.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        pitch_bend_range: u7,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Touch ({} <finger> <note>, {} <finger> <bend>, {} <finger> <semitones>, {} <finger>): ",
            PRESS, MOVE, GLIDE, RELEASE,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        match parse(&input, pitch_bend_range) {
            Ok(Some(event)) => events_tx
                .blocking_send(event)
                .map_err(io::Error::other)?,
            Ok(None) => {}
            Err(e) => warn!(input = input.trim(), err = e.to_string(), "Unrecognized input"),
        }
        Ok(true)
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        let pitch_bend_range = self.pitch_bend_range;
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(
                &events_tx,
                pitch_bend_range,
                io::stdin().lock(),
                io::stdout(),
            )? {}

            info!("Keyboard input closed.");
            Ok(())
        })
    }
}

/// Parses a line of input into a touch event. Blank lines produce no event.
pub fn parse(input: &str, pitch_bend_range: u7) -> Result<Option<Event>, ParseError> {
    let mut fields = input.split_whitespace();
    let command = match fields.next() {
        Some(command) => command.to_lowercase(),
        None => return Ok(None),
    };

    let finger = Finger::new(parse_field(fields.next(), "finger")?);
    let event = match command.as_str() {
        PRESS => {
            let note: u8 = parse_field(fields.next(), "note")?;
            Event::Press {
                finger,
                note: checked(u7::try_from(note), "note", note)?,
            }
        }
        MOVE => {
            let bend: u16 = parse_field(fields.next(), "bend")?;
            Event::Move {
                finger,
                bend: checked(u14::try_from(bend), "bend", bend)?,
            }
        }
        GLIDE => {
            let semitones: f32 = parse_field(fields.next(), "semitones")?;
            Event::Move {
                finger,
                bend: bend_for_semitones(semitones, pitch_bend_range),
            }
        }
        RELEASE => Event::Release { finger },
        _ => return Err(ParseError::UnknownCommand(command)),
    };

    let rest = fields.collect::<Vec<&str>>();
    if !rest.is_empty() {
        return Err(ParseError::Trailing(rest.join(" ")));
    }

    Ok(Some(event))
}

fn parse_field<T: std::str::FromStr>(
    field: Option<&str>,
    name: &'static str,
) -> Result<T, ParseError> {
    let field = field.ok_or(ParseError::Missing(name))?;
    field.parse::<T>().map_err(|_| ParseError::Invalid {
        field: name,
        value: field.to_string(),
    })
}

fn checked<T, V: ToString>(value: Option<T>, name: &'static str, raw: V) -> Result<T, ParseError> {
    value.ok_or(ParseError::Invalid {
        field: name,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod test {
    use std::io::{self, Cursor};

    use midly::num::{u14, u7};
    use tokio::sync::mpsc;

    use super::{parse, Driver, ParseError};
    use crate::{allocator::Finger, touch::Event};

    fn range() -> u7 {
        u7::from(48)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            Ok(Some(Event::Press {
                finger: Finger::new(3),
                note: u7::from(60),
            })),
            parse("press 3 60\n", range())
        );
        assert_eq!(
            Ok(Some(Event::Move {
                finger: Finger::new(3),
                bend: u14::from(16383),
            })),
            parse("MOVE 3 16383", range())
        );
        assert_eq!(
            Ok(Some(Event::Move {
                finger: Finger::new(3),
                bend: u14::from(4096),
            })),
            parse("glide 3 -24", range())
        );
        assert_eq!(
            Ok(Some(Event::Release {
                finger: Finger::new(3),
            })),
            parse("  release   3 ", range())
        );
        assert_eq!(Ok(None), parse("   \n", range()));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(
            Err(ParseError::UnknownCommand("strum".to_string())),
            parse("strum 1", range())
        );
        assert_eq!(Err(ParseError::Missing("finger")), parse("press", range()));
        assert_eq!(Err(ParseError::Missing("note")), parse("press 1", range()));
        assert_eq!(
            Err(ParseError::Invalid {
                field: "note",
                value: "128".to_string(),
            }),
            parse("press 1 128", range())
        );
        assert_eq!(
            Err(ParseError::Invalid {
                field: "bend",
                value: "16384".to_string(),
            }),
            parse("move 1 16384", range())
        );
        assert_eq!(
            Err(ParseError::Invalid {
                field: "finger",
                value: "x".to_string(),
            }),
            parse("release x", range())
        );
        assert_eq!(
            Err(ParseError::Trailing("60".to_string())),
            parse("release 1 60", range())
        );
    }

    #[test]
    fn monitor_io_sends_events() -> Result<(), io::Error> {
        let (events_tx, mut events_rx) = mpsc::channel::<Event>(10);
        let mut output: Vec<u8> = Vec::new();

        assert!(Driver::monitor_io(
            &events_tx,
            range(),
            Cursor::new("press 1 60\n"),
            &mut output,
        )?);
        assert_eq!(
            Ok(Event::Press {
                finger: Finger::new(1),
                note: u7::from(60),
            }),
            events_rx.try_recv()
        );

        // Bad input is skipped without ending the driver.
        assert!(Driver::monitor_io(
            &events_tx,
            range(),
            Cursor::new("bogus\n"),
            &mut output,
        )?);
        assert!(events_rx.try_recv().is_err());

        // End of input stops the driver.
        assert!(!Driver::monitor_io(
            &events_tx,
            range(),
            Cursor::new(""),
            &mut output,
        )?);
        assert!(String::from_utf8_lossy(&output).starts_with("Touch ("));
        Ok(())
    }
}
