use std::error::Error;
use std::path::Path;

use crate::character::codec::{self, CardCodecError, CHARA_KEYWORD};
use crate::character::loader::read_file;
use crate::character::png_text::{chunks, PngTextError};
use crate::character::CharacterCard;
use crate::core::config::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSummary {
    pub offset: usize,
    pub chunk_type: String,
    pub length: usize,
    pub crc_ok: bool,
    /// Keyword of a `tEXt` chunk.
    pub keyword: Option<String>,
}

pub fn describe_chunks(bytes: &[u8]) -> Result<Vec<ChunkSummary>, PngTextError> {
    let mut summaries = Vec::new();
    for chunk in chunks(bytes)? {
        let chunk = chunk?;
        summaries.push(ChunkSummary {
            offset: chunk.offset,
            chunk_type: chunk.type_name(),
            length: chunk.data.len(),
            crc_ok: chunk.crc_matches(),
            keyword: chunk
                .text_parts()
                .map(|(keyword, _)| String::from_utf8_lossy(keyword).into_owned()),
        });
    }
    Ok(summaries)
}

pub async fn inspect_file(file: &Path) -> Result<(), Box<dyn Error>> {
    let bytes = read_file(file).await?;
    let summaries = describe_chunks(&bytes)?;

    println!("{} ({} bytes, {} chunks):\n", file.display(), bytes.len(), summaries.len());
    println!("  {:>10}  {:<4}  {:>10}  {:<3}  keyword", "offset", "type", "length", "crc");
    for summary in &summaries {
        println!(
            "  {:>10}  {:<4}  {:>10}  {:<3}  {}",
            summary.offset,
            summary.chunk_type,
            summary.length,
            if summary.crc_ok { "ok" } else { "BAD" },
            summary.keyword.as_deref().unwrap_or("")
        );
    }
    if summaries.last().map(|s| s.chunk_type.as_str()) != Some("IEND") {
        println!("\n⚠️  Stream ends without an IEND chunk");
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    NotPng,
    NoCard,
    Card(Option<String>),
    Corrupt(String),
}

pub fn check_bytes(bytes: &[u8], config: &Config) -> CheckOutcome {
    if !codec::quick_check(bytes) {
        return if crate::character::png_text::is_png(bytes) {
            CheckOutcome::NoCard
        } else {
            CheckOutcome::NotPng
        };
    }
    match codec::decode_with(bytes, config.decode_options()) {
        Ok(value) => CheckOutcome::Card(
            CharacterCard::from_value(&value)
                .ok()
                .map(|card| card.summary()),
        ),
        Err(CardCodecError::NotFound) => CheckOutcome::NoCard,
        Err(e) => CheckOutcome::Corrupt(e.to_string()),
    }
}

pub async fn check_file(file: &Path, config: &Config) -> Result<(), Box<dyn Error>> {
    let bytes = read_file(file).await?;
    match check_bytes(&bytes, config) {
        CheckOutcome::NotPng => Err(format!("{}: not a valid PNG", file.display()).into()),
        CheckOutcome::NoCard => {
            println!("{}: no '{}' character card", file.display(), CHARA_KEYWORD);
            Ok(())
        }
        CheckOutcome::Card(Some(summary)) => {
            println!("{}: character card {}", file.display(), summary);
            Ok(())
        }
        CheckOutcome::Card(None) => {
            println!("{}: embedded JSON (not a v2 character card)", file.display());
            Ok(())
        }
        CheckOutcome::Corrupt(msg) => Err(format!("{}: {}", file.display(), msg).into()),
    }
}
