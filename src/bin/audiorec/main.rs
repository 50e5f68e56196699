use std::path::PathBuf;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use tracing_subscriber::EnvFilter;

use audiorec::audio::capture::{default_input_device_name, list_input_devices};
use audiorec::config::Config;
use audiorec::error::RecorderError;
use audiorec::recording::{OutputFormat, RecordOptions, run_recording};

#[derive(Parser)]
#[command(
    name = "audiorec",
    about = "Record the microphone to PCM, WAV or MP3",
    long_about = "audiorec captures audio from an input device in fixed-size blocks and \
        writes it out as raw PCM, a WAV file, or an MP3 stream. Output sample rate, \
        bit depth and channel count come from the config file."
)]
struct Cli {
    /// Path to config file
    ///
    /// Defaults to ~/.config/audiorec/config.yaml if not specified. A missing
    /// default config is not an error; built-in defaults are used instead.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record from the configured input device
    ///
    /// Records until the time limit is reached or Ctrl+C is pressed, then
    /// writes the recording into the configured output directory.
    Record {
        /// Stop after this many seconds
        #[arg(long, short)]
        seconds: Option<u64>,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = Format::Wav)]
        format: Format,

        /// Play the recording back once it is written
        #[arg(long)]
        play: bool,
    },

    /// List available audio input devices
    Devices,

    /// Generate shell completions
    ///
    /// Prints a completion script for the given shell to stdout.
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, elvish, powershell)
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Pcm,
    Wav,
    Mp3,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Pcm => Self::Pcm,
            Format::Wav => Self::Wav,
            Format::Mp3 => Self::Mp3,
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, RecorderError> {
    match cli.config {
        Some(ref path) => Config::load(path),
        None => Config::load_or_default(&Config::default_path()),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("audiorec=debug,info")
    } else {
        EnvFilter::new("audiorec=info,warn")
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), RecorderError> {
    match cli.command {
        Command::Record {
            seconds,
            format,
            play,
        } => {
            let config = load_config(cli)?;
            let options = RecordOptions {
                limit: seconds.map(Duration::from_secs),
                format: format.into(),
                play,
            };
            let rt = tokio::runtime::Runtime::new()?;
            let path = rt.block_on(run_recording(config, options))?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Devices => run_devices(),
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "audiorec", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn run_devices() -> Result<(), RecorderError> {
    let devices = list_input_devices()?;
    if devices.is_empty() {
        println!("No audio input devices found.");
        return Ok(());
    }

    let default_name = default_input_device_name();
    for (i, name) in devices.iter().enumerate() {
        let marker = if default_name.as_deref() == Some(name.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!("  {}: {name}{marker}", i + 1);
    }
    Ok(())
}
