//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod embed;
pub mod extract;
pub mod inspect;
pub mod strip;


use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::cli::embed::{embed_card, EmbedRequest};
use crate::cli::extract::{extract_card, ExtractRequest};
use crate::cli::inspect::{check_file, inspect_file};
use crate::cli::strip::strip_card;
use crate::core::config::{path_display, Config};
use crate::utils::logging::init_tracing;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ", built ",
    env!("VERGEN_BUILD_DATE"),
    ")"
);

#[derive(Parser)]
#[command(name = "chara-png")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Embed and extract character cards stored in PNG images")]
#[command(
    long_about = "chara-png reads and writes SillyTavern-compatible character cards. \
A card is a JSON document stored base64-encoded in a PNG tEXt chunk with the keyword \
'chara', placed just before the image's IEND chunk. Pixel data is never touched.\n\n\
Environment Variables:\n\
  CHARA_PNG_CONFIG  Path to the config file (overrides the platform default)\n\
  CHARA_PNG_LOG     Log filter, e.g. 'debug' (overrides -v)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a character card into a PNG image
    Embed {
        /// Card to embed (.json, or a .png card to copy from)
        card: PathBuf,
        /// Source image (left unchanged)
        image: PathBuf,
        /// Output file (defaults to <name>_card.png next to the image)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Fail if the image already has a card instead of replacing it
        #[arg(long)]
        no_replace: bool,
        /// Skip character card schema validation
        #[arg(long)]
        no_validate: bool,
    },
    /// Print or save the character card embedded in a PNG
    Extract {
        /// PNG card to read
        file: PathBuf,
        /// Write JSON to this file instead of stdout
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
        /// Ignore CRC mismatches and damage after the card
        #[arg(long)]
        lenient: bool,
    },
    /// Remove embedded character cards from a PNG
    Strip {
        /// PNG card to strip
        file: PathBuf,
        /// Output file (defaults to <stem>_stripped.png)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// List the chunks of a PNG file
    Inspect {
        /// PNG file to inspect
        file: PathBuf,
    },
    /// Report whether a PNG carries a character card
    Check {
        /// PNG file to check
        file: PathBuf,
    },
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key (on/off)
        value: Option<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let runtime = tokio::runtime::Runtime::new()?;
    if let Err(e) = runtime.block_on(run(args)) {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
    Ok(())
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = Config::load(args.config.as_deref())?;
    debug!(?config, "Configuration loaded");

    match args.command {
        Commands::Embed {
            card,
            image,
            output,
            no_replace,
            no_validate,
        } => {
            let request = EmbedRequest {
                card,
                image,
                output,
                no_replace,
                validate: config.validate_cards() && !no_validate,
            };
            let written = embed_card(&request, &config).await?;
            println!("✅ Wrote character card to {}", path_display(&written));
            Ok(())
        }
        Commands::Extract {
            file,
            output,
            pretty,
            lenient,
        } => {
            let request = ExtractRequest {
                file,
                output,
                pretty: pretty || config.pretty(),
                lenient,
            };
            extract_card(&request, &config).await?;
            Ok(())
        }
        Commands::Strip { file, output } => {
            let written = strip_card(&file, output.as_deref()).await?;
            println!("✅ Wrote image without card to {}", path_display(&written));
            Ok(())
        }
        Commands::Inspect { file } => inspect_file(&file).await,
        Commands::Check { file } => check_file(&file, &config).await,
        Commands::Set { key, value } => {
            let (Some(key), Some(value)) = (key, value) else {
                config.print_all();
                return Ok(());
            };
            let path = config_path(args.config)?;
            let mut config = config;
            config.set_value(&key, &value)?;
            config.save_to_path(&path)?;
            println!("✅ Set {key} to: {value}");
            Ok(())
        }
        Commands::Unset { key } => {
            let path = config_path(args.config)?;
            let mut config = config;
            config.unset_value(&key)?;
            config.save_to_path(&path)?;
            println!("✅ Unset {key}");
            Ok(())
        }
    }
}

fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf, Box<dyn Error>> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(Config::get_config_path()?),
    }
}
