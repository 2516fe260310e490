//! just-waveform command-line front end
//!
//! Reads audio or envelope files, calls the envelope engine and writes the
//! result. Output format follows the file extension: `.json` for the JSON
//! form, anything else for the binary layout.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod logging;

use commands::extract::ExtractArgs;

/// just-waveform - audio waveform envelopes
#[derive(Parser)]
#[command(name = "just-waveform")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract an envelope from an audio file
    Extract(ExtractArgs),

    /// Derive a coarser envelope from an existing one
    Resample {
        /// Input envelope
        #[arg(short, long)]
        input: PathBuf,

        /// Output envelope
        #[arg(short, long)]
        output: PathBuf,

        /// Merge this many points into one
        #[arg(long, conflicts_with = "samples_per_pixel")]
        factor: Option<u32>,

        /// Target resolution, a multiple of the input's
        #[arg(long)]
        samples_per_pixel: Option<u32>,
    },

    /// Print an envelope's header fields
    Info {
        /// Input envelope
        #[arg(short, long)]
        input: PathBuf,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert between the binary and JSON forms
    Convert {
        /// Input envelope
        #[arg(short, long)]
        input: PathBuf,

        /// Output envelope
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    match cli.command {
        Commands::Extract(args) => commands::extract::handle_extract(args).await,
        Commands::Resample {
            input,
            output,
            factor,
            samples_per_pixel,
        } => commands::envelope::handle_resample(&input, &output, factor, samples_per_pixel),
        Commands::Info { input, json } => commands::envelope::handle_info(&input, json),
        Commands::Convert { input, output } => commands::envelope::handle_convert(&input, &output),
    }
}
