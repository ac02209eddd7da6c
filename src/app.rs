//! Command-line parsing and command routing.

use crate::commands::{self, BankKind, RunOptions};
use crate::logging;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// Real-time audio spectrogram for the terminal
#[derive(Parser)]
#[command(name = "wfall")]
#[command(version)]
#[command(about = "Real-time audio spectrogram for the terminal")]
#[command(long_about = "Real-time audio spectrogram for the terminal.\n\nCaptures an input device (or replays a WAV file), runs a sliding-window\nfrequency transform and scrolls the result as a colored waterfall.\n\nDEFAULT COMMAND:\n    If no command is specified, 'run' is used. Run options (-d, -i, -b)\n    can be given without saying 'run'.\n\nKEYS:\n    Space         pause / resume\n    r             clear markers and reset the color range\n    q, Esc        quit\n    left click    add a frequency marker (two per pair)\n    right click   clear markers\n\nEXAMPLES:\n    $ wfall\n    $ wfall -d 2 --bank equal-temperament\n    $ wfall -i recording.wav")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/wfall/wfall.toml\n    Logs:               ~/.local/state/wfall/wfall.log.*"
)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone, Default)]
struct RunArgs {
    /// Input device name or ID from `wfall list-devices`
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// Replay a WAV file instead of capturing a device
    #[arg(short, long, value_name = "FILE", global = true)]
    input: Option<PathBuf>,

    /// Frequency bank layout
    #[arg(short, long, value_enum, global = true)]
    bank: Option<BankKind>,
}

impl From<RunArgs> for RunOptions {
    fn from(args: RunArgs) -> Self {
        Self {
            device: args.device,
            input: args.input,
            bank: args.bank,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the live waterfall (default)
    #[command(visible_alias = "r")]
    Run,

    /// List available audio input devices
    #[command(name = "list-devices")]
    ListDevices,

    /// Show the last 50 lines of the most recent log file
    Logs,

    /// Open the configuration file in $EDITOR
    #[command(visible_alias = "c")]
    Config,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   wfall completions bash > wfall.bash
    ///   wfall completions zsh > _wfall
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Parses the command line and runs the selected command.
///
/// # Errors
/// - If logging or setup fails
/// - If the command fails
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "wfall", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => return exit_on_error(commands::handle_list_devices()),
        Some(Commands::Logs) => return exit_on_error(commands::handle_logs()),
        _ => {}
    }

    logging::init_logging()?;
    crate::setup::run_setup().inspect_err(|e| tracing::error!("Setup failed: {e}"))?;

    match cli.command {
        None | Some(Commands::Run) => commands::handle_run(cli.run.into()).await?,
        Some(Commands::Config) => commands::handle_config()?,
        Some(Commands::Completions { .. } | Commands::ListDevices | Commands::Logs) => {
            unreachable!("handled before logging starts")
        }
    }

    Ok(())
}

/// Prints the error and exits with status 1; these commands run without a log.
fn exit_on_error(result: anyhow::Result<()>) -> anyhow::Result<()> {
    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
    Ok(())
}
