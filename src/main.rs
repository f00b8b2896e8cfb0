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
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use touchmidi::allocator::Allocator;
use touchmidi::config::Instrument;
use touchmidi::midi;
use touchmidi::touch::{keyboard, Controller};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "MPE-style channel allocation for touch instruments."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available MIDI output devices.
    MidiDevices {},
    /// Plays touches read from the keyboard through the given MIDI device.
    Play {
        /// The MIDI device name to play through.
        device_name: String,
        /// How many member channels to allocate, starting at channel 1.
        #[arg[short, long]]
        channels: Option<u8>,
        /// The pitch bend range in semitones.
        #[arg[short, long]]
        pitch_bend_range: Option<u8>,
    },
    /// Start will start the instrument described by the given config.
    Start {
        /// The path to the instrument config.
        config_path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Play {
            device_name,
            channels,
            pitch_bend_range,
        } => run(Instrument::new(&device_name, channels, pitch_bend_range)).await?,
        Commands::Start { config_path } => {
            run(Instrument::deserialize(&PathBuf::from(config_path))?).await?
        }
    }

    Ok(())
}

/// Runs the keyboard driver against the instrument until input closes.
async fn run(instrument: Instrument) -> Result<(), Box<dyn Error>> {
    let settings = instrument.settings()?;
    let device = midi::get_device(instrument.midi_device())?;

    let allocator = Allocator::new(device, settings);
    let driver = Arc::new(keyboard::Driver::new(settings.pitch_bend_range()));
    let mut controller = Controller::new(allocator, driver);

    let allocator = controller.join().await?;
    info!(allocator = allocator.to_string(), "Instrument stopped.");
    Ok(())
}
