//! midimaker CLI - The `midimaker` command.
//!
//! Renders TOML score files to Standard MIDI Files, and manages the
//! preferences file that supplies defaults for every render.

mod render;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use midimaker_core::{Preferences, Score};
use std::path::{Path, PathBuf};

/// midimaker - chord-driven MIDI composition
#[derive(Parser, Debug)]
#[command(name = "midimaker")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Render chord-based compositions to MIDI files", long_about = None)]
struct Args {
    /// More output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a score to a MIDI file
    Render(RenderArgs),

    /// List the compositions and opuses of a score
    List {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the preferences a render would use
    Preferences {
        /// Include the overrides of this score
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Print the path of the preferences file
    ConfigPath,

    /// Write a commented default preferences file
    Init,

    /// Show version information
    Version,
}

/// Arguments of `midimaker render`.
#[derive(ClapArgs, Debug, Clone)]
pub struct RenderArgs {
    /// Score file (.toml)
    #[arg(value_name = "FILE")]
    pub score_file: PathBuf,

    /// Output file; defaults to the score path with a .mid extension
    #[arg(short, long, value_name = "OUT")]
    pub output: Option<PathBuf>,

    /// Composition or opus to render; defaults to the first composition
    #[arg(short, long, value_name = "NAME", default_value = "")]
    pub composition: String,

    /// Preferences file to use instead of the user's
    #[arg(long, value_name = "PATH")]
    pub preferences: Option<PathBuf>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Turn off timing, length and velocity jitter
    #[arg(long)]
    pub no_jitter: bool,
}

fn init_logger(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    match args.command {
        Commands::Render(render_args) => render::render(render_args),
        Commands::List { file } => {
            let score = load_score(&file)?;
            for name in score.composition_names() {
                println!("composition  {}", name);
            }
            for (name, parts) in &score.opuses {
                println!("opus         {} = {}", name, parts);
            }
            Ok(())
        }
        Commands::Preferences { file } => {
            let mut preferences = Preferences::load_or_default();
            if let Some(file) = file {
                preferences = load_score(&file)?
                    .preferences(&preferences)
                    .context("Invalid [preferences] in score")?;
            }
            print!("{}", toml::to_string_pretty(&preferences)?);
            Ok(())
        }
        Commands::ConfigPath => {
            println!("{}", Preferences::config_path()?.display());
            Ok(())
        }
        Commands::Init => {
            let path = Preferences::config_path()?;
            if path.exists() {
                anyhow::bail!("Preferences file already exists: {}", path.display());
            }
            let path = Preferences::create_default_config_file()?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Commands::Version => {
            println!("midimaker {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Styles: bass, rhythm, arpeggio, improv, percussion, lead");
            Ok(())
        }
    }
}

pub(crate) fn load_score(file: &Path) -> Result<Score> {
    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }
    Score::from_path(file).with_context(|| format!("Failed to read score: {}", file.display()))
}
