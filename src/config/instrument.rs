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
use std::path::Path;

use config::{Config, File};
use midly::num::u7;
use serde::Deserialize;

use super::error::ConfigError;
use crate::allocator::Settings;

/// The configuration for a touch instrument.
#[derive(Deserialize, Clone, Debug)]
pub struct Instrument {
    /// The MIDI output device.
    midi_device: String,

    /// How many member channels to allocate, starting at channel 1.
    channels: Option<u8>,

    /// The pitch bend range in semitones sent to every allocated channel.
    pitch_bend_range: Option<u8>,

    /// The note on velocity.
    velocity: Option<u8>,
}

impl Instrument {
    /// Creates a new instrument configuration.
    pub fn new(midi_device: &str, channels: Option<u8>, pitch_bend_range: Option<u8>) -> Instrument {
        Instrument {
            midi_device: midi_device.to_string(),
            channels,
            pitch_bend_range,
            velocity: None,
        }
    }

    /// Parse an instrument from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Instrument, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Instrument>()?)
    }

    /// Returns the MIDI device from the configuration.
    pub fn midi_device(&self) -> &str {
        &self.midi_device
    }

    /// Validates the configuration into allocator settings.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let defaults = Settings::default();
        let pitch_bend_range = match self.pitch_bend_range {
            Some(range) => parse_u7(range, "pitch_bend_range")?,
            None => defaults.pitch_bend_range(),
        };
        let velocity = match self.velocity {
            Some(velocity) => parse_u7(velocity, "velocity")?,
            None => defaults.velocity(),
        };

        Settings::new(
            self.channels.unwrap_or(defaults.channels()),
            pitch_bend_range,
            velocity,
        )
        .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

fn parse_u7(raw: u8, field: &str) -> Result<u7, ConfigError> {
    u7::try_from(raw)
        .ok_or_else(|| ConfigError::Invalid(format!("{}: {} is not a valid u7", field, raw)))
}

#[cfg(test)]
mod test {
    use std::{error::Error, fs};

    use config::{Config, File, FileFormat};
    use midly::num::u7;

    use super::Instrument;
    use crate::config::ConfigError;

    fn from_yaml(yaml: &str) -> Result<Instrument, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<Instrument>()?)
    }

    #[test]
    fn defaults() -> Result<(), Box<dyn Error>> {
        let instrument = from_yaml(
            r#"
            midi_device: IAC Driver Bus 1
        "#,
        )?;

        assert_eq!("IAC Driver Bus 1", instrument.midi_device());
        let settings = instrument.settings()?;
        assert_eq!(15, settings.channels());
        assert_eq!(u7::from(48), settings.pitch_bend_range());
        assert_eq!(u7::from(127), settings.velocity());
        Ok(())
    }

    #[test]
    fn overrides() -> Result<(), Box<dyn Error>> {
        let instrument = from_yaml(
            r#"
            midi_device: mock-device
            channels: 4
            pitch_bend_range: 24
            velocity: 100
        "#,
        )?;

        let settings = instrument.settings()?;
        assert_eq!(4, settings.channels());
        assert_eq!(u7::from(24), settings.pitch_bend_range());
        assert_eq!(u7::from(100), settings.velocity());
        Ok(())
    }

    #[test]
    fn invalid_values() -> Result<(), Box<dyn Error>> {
        for yaml in [
            "midi_device: mock\nchannels: 0\n",
            "midi_device: mock\nchannels: 16\n",
            "midi_device: mock\npitch_bend_range: 200\n",
            "midi_device: mock\nvelocity: 128\n",
        ] {
            match from_yaml(yaml)?.settings() {
                Err(ConfigError::Invalid(_)) => {}
                other => return Err(format!("expected invalid config, got {:?}", other).into()),
            }
        }
        Ok(())
    }

    #[test]
    fn missing_device() {
        assert!(from_yaml("channels: 4\n").is_err());
    }

    #[test]
    fn from_file() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("instrument.yaml");
        fs::write(&path, "midi_device: mock-file\nchannels: 2\n")?;

        let instrument = Instrument::deserialize(&path)?;
        assert_eq!("mock-file", instrument.midi_device());
        assert_eq!(2, instrument.settings()?.channels());
        Ok(())
    }
}
