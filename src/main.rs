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
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use drumpak::archive::{pack_directory, ArchiveReader};
use drumpak::config::{
    EngineConfig, GainCurve, KitDefinition, DEFAULT_MAX_VOICES, DEFAULT_SAMPLE_RATE,
};
use drumpak::kit::{open_source, BuildReport, LibraryBuilder};
use drumpak::render::{parse_time, write_buses, Hit, OfflineRenderer};
use drumpak::samples::DrumEngine;

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=drum sampler

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/drumpak
ExecStart=/usr/local/bin/drumpak start "$DRUMPAK_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=drumpak.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A multi-microphone drum sampler."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Packs every WAV file under a directory into a sample archive.
    Pack {
        /// The directory holding the samples.
        dir: PathBuf,
        /// The archive to create.
        out: PathBuf,
    },
    /// Lists the files in a sample archive.
    List {
        /// The path to the archive.
        archive: PathBuf,
    },
    /// Loads a kit from an archive and reports anything missing or unreadable.
    Verify {
        /// The path to the archive or to a folder of samples.
        archive: PathBuf,
        /// A kit definition. Defaults to the built-in kit.
        #[arg[short, long]]
        kit: Option<PathBuf>,
        /// Flags samples that are not at this rate.
        #[arg[short, long]]
        sample_rate: Option<u32>,
    },
    /// Prints the built-in kit definition as YAML.
    Kit {},
    /// Renders hits to one WAV file per output bus.
    Render {
        /// The path to the archive or to a folder of samples.
        archive: PathBuf,
        /// The directory to write the bus files to.
        out_dir: PathBuf,
        /// Hits in the form NOTE:VELOCITY@TIME, e.g. 38:127@1.5s. May be repeated.
        #[arg[long = "hit", required = true]]
        hits: Vec<Hit>,
        /// A kit definition. Defaults to the built-in kit.
        #[arg[short, long]]
        kit: Option<PathBuf>,
        /// The length of the render, e.g. 2s or 1.5s. Defaults to when the last hit has rung out.
        #[arg[short, long]]
        length: Option<String>,
        /// The session sample rate.
        #[arg[short, long, default_value_t = DEFAULT_SAMPLE_RATE]]
        sample_rate: u32,
        /// How velocity maps to gain (linear or squared).
        #[arg[short, long, default_value_t = GainCurve::Linear]]
        gain_curve: GainCurve,
        /// The polyphony limit.
        #[arg[short, long, default_value_t = DEFAULT_MAX_VOICES]]
        max_voices: usize,
        /// Frames rendered per block.
        #[arg[short, long, default_value_t = 256]]
        block_size: usize,
        /// Also write buses that stayed silent.
        #[arg[long]]
        all_buses: bool,
    },
    /// Lists the available audio output devices.
    #[cfg(feature = "live")]
    Devices {},
    /// Lists the available MIDI input devices.
    #[cfg(feature = "live")]
    MidiDevices {},
    /// Plays the kit live from MIDI input.
    #[cfg(feature = "live")]
    Start {
        /// The path to the player config.
        player_path: PathBuf,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

fn load_kit(kit: Option<PathBuf>) -> Result<KitDefinition, Box<dyn Error>> {
    Ok(match kit {
        Some(path) => KitDefinition::deserialize(&path)?,
        None => KitDefinition::builtin(),
    })
}

fn print_report(report: &BuildReport) {
    for (label, files) in [
        ("Missing", &report.missing),
        ("Undecodable", &report.failed),
        ("Empty", &report.empty),
    ] {
        if files.is_empty() {
            continue;
        }
        println!("{} (count: {}):", label, files.len());
        for file in files {
            println!("- {}", file);
        }
    }
    if report.rate_mismatches > 0 {
        println!("Samples at the wrong rate: {}", report.rate_mismatches);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pack { dir, out } => {
            let summary = pack_directory(&dir, &out)?;
            println!(
                "Packed {} files ({} bytes) into {}.",
                summary.entries,
                summary.payload_bytes,
                out.display()
            );
        }
        Commands::List { archive } => {
            let archive = ArchiveReader::open(&archive)?;

            if archive.is_empty() {
                println!("No files found.");
                return Ok(());
            }

            println!("Files (count: {}):", archive.len());
            for (path, entry) in archive.entries() {
                println!("- {} ({} bytes)", path, entry.size);
            }
        }
        Commands::Verify {
            archive,
            kit,
            sample_rate,
        } => {
            let kit = load_kit(kit)?;
            let mut source = open_source(&archive)?;
            let mut builder = LibraryBuilder::new();
            if let Some(sample_rate) = sample_rate {
                builder = builder.expected_sample_rate(sample_rate);
            }
            let (library, report) = builder.build(&kit, &mut *source);

            println!(
                "Notes: {}, samples: {}, memory: {} bytes",
                library.note_count(),
                library.sample_count(),
                library.memory_size()
            );
            print_report(&report);

            if !report.is_complete() {
                return Err("kit is incomplete".into());
            }
            println!("Kit is complete.");
        }
        Commands::Kit {} => {
            print!("{}", KitDefinition::builtin().to_yaml()?);
        }
        Commands::Render {
            archive,
            out_dir,
            hits,
            kit,
            length,
            sample_rate,
            gain_curve,
            max_voices,
            block_size,
            all_buses,
        } => {
            let length: Option<Duration> = match length {
                Some(length) => Some(
                    parse_time(length.trim())
                        .ok_or_else(|| format!("invalid length {}", length))?,
                ),
                None => None,
            };
            let engine_config = EngineConfig::new(max_voices, gain_curve);
            engine_config.validate()?;

            let kit = load_kit(kit)?;
            let mut source = open_source(&archive)?;
            let (library, _) = LibraryBuilder::new()
                .expected_sample_rate(sample_rate)
                .build(&kit, &mut *source);
            let mut engine = DrumEngine::new(library, engine_config);

            let buses =
                OfflineRenderer::new(sample_rate, block_size).render(&mut engine, &hits, length);
            let written = write_buses(&out_dir, &buses, sample_rate, !all_buses)?;

            if written.is_empty() {
                println!("Nothing was rendered.");
                return Ok(());
            }
            println!("Wrote:");
            for path in written {
                println!("- {}", path.display());
            }
        }
        #[cfg(feature = "live")]
        Commands::Devices {} => {
            let devices = drumpak::audio::cpal::Device::list()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        #[cfg(feature = "live")]
        Commands::MidiDevices {} => {
            let devices = drumpak::midi::midir::list()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        #[cfg(feature = "live")]
        Commands::Start { player_path } => {
            let config = drumpak::config::PlayerConfig::deserialize(&player_path)?;
            let session = drumpak::player::Player::new(config).start()?;
            print_report(session.report());
            println!("Playing. Press enter to silence all voices.");

            for line in std::io::stdin().lines() {
                line?;
                session.reset();
            }

            // Playback runs on the audio and MIDI threads until the process is killed.
            loop {
                std::thread::park();
            }
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}
