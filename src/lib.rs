//! chara-png embeds and extracts role-play character cards stored inside PNG
//! images, in the layout used by SillyTavern and compatible tools.
//!
//! The crate is organized around a small set of layers:
//! - [`character`] owns the PNG chunk codec (signature check, chunk walking,
//!   CRC32, `tEXt` construction and splicing) and the card encode/decode
//!   operations built on it, plus a typed view of v2 cards.
//! - [`core`] holds configuration loading and saving.
//! - [`cli`] parses arguments and runs the `chara-png` subcommands.
//! - [`utils`] sets up diagnostic logging.
//!
//! The binary (`src/main.rs`) routes straight into [`crate::cli::main`].

pub mod character;
pub mod cli;
pub mod core;
pub mod utils;
