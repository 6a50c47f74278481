//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands::{self, ScopeOverrides};
use crate::logging;
use crate::scope::{CanvasSize, RenderMode};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// An audio-reactive oscilloscope and Lissajous trail renderer for the terminal
#[derive(Parser)]
#[command(name = "radioscope")]
#[command(version)]
#[command(about = "An audio-reactive oscilloscope and Lissajous trail renderer for the terminal")]
#[command(long_about = "An audio-reactive oscilloscope and Lissajous trail renderer for the terminal.\n\nDEFAULT COMMAND:\n    If no command is specified, 'live' is used by default.\n\nKEYS:\n    Space      pause/resume the source\n    m          switch between attractor and time-domain\n    + / -      adjust curve tension\n    q / Esc    quit\n\nEXAMPLES:\n    # Visualize the configured input device\n    $ radioscope\n\n    # Oscilloscope trace of a WAV file\n    $ radioscope replay song.wav --mode time-domain\n\n    # Render a WAV file to a PNG without a terminal\n    $ radioscope render song.wav -o scope.png --frames-dir frames/")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/radioscope/radioscope.toml\n    Logs:               ~/.local/state/radioscope/radioscope.log.*"
)]
struct Cli {
    #[command(flatten)]
    scope: ScopeArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Visualizer overrides shared by every scope command.
#[derive(Args, Debug, Clone, Copy, Default)]
struct ScopeArgs {
    /// Curve algorithm, overriding the config file
    #[arg(short, long, value_enum, global = true)]
    mode: Option<RenderMode>,

    /// Time-domain curve tension between 0.0 and 1.0, overriding the config file
    #[arg(short, long, global = true)]
    tension: Option<f32>,
}

impl From<ScopeArgs> for ScopeOverrides {
    fn from(args: ScopeArgs) -> Self {
        ScopeOverrides {
            mode: args.mode,
            tension: args.tension,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Visualize the configured audio input device (default)
    ///
    /// Point the device at a monitor/loopback source to see what the
    /// system is playing.
    #[command(visible_alias = "l")]
    Live,

    /// Visualize a WAV file played back in real time
    #[command(visible_alias = "rp")]
    Replay {
        /// Path to a PCM or float WAV file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Render a WAV file to PNG without a terminal
    ///
    /// Steps a simulated clock at the configured frame rate and writes the
    /// final composited image.
    Render {
        /// Path to a PCM or float WAV file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Where to write the final image
        #[arg(short, long, value_name = "PNG")]
        output: PathBuf,

        /// Surface width in pixels
        #[arg(long, default_value_t = 800)]
        width: u32,

        /// Surface height in pixels
        #[arg(long, default_value_t = 600)]
        height: u32,

        /// Also write every tick as a numbered PNG into this directory
        #[arg(long, value_name = "DIR")]
        frames_dir: Option<PathBuf>,
    },

    /// Open configuration file in your preferred editor
    ///
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    ///
    /// Shows device IDs, names, and configurations to help configure
    /// the correct input device in radioscope.toml.
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   radioscope completions bash > radioscope.bash
    ///   radioscope completions zsh > _radioscope
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that need neither logging nor config
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "radioscope", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            return match commands::handle_list_devices() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        Some(Commands::Logs) => {
            return match commands::handle_logs() {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        _ => {}
    }

    logging::init_logging()?;

    let overrides = ScopeOverrides::from(cli.scope);
    match cli.command {
        None | Some(Commands::Live) => {
            commands::handle_live(overrides).await?;
        }
        Some(Commands::Replay { file }) => {
            commands::handle_replay(&file, overrides).await?;
        }
        Some(Commands::Render {
            file,
            output,
            width,
            height,
            frames_dir,
        }) => {
            commands::handle_render(
                &file,
                &output,
                CanvasSize::new(width, height),
                frames_dir,
                overrides,
            )?;
        }
        Some(Commands::Config) => {
            commands::handle_config()?;
        }
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
