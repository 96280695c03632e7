use std::fmt;
use std::io::Write;
use std::path::Path;

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::character::codec::{self, CardCodecError, DecodeOptions};
use crate::character::CharacterCard;

/// Errors that can occur when reading or writing card files
#[derive(Debug)]
pub enum CardLoadError {
    /// File could not be found or read
    FileNotFound(String),
    /// JSON parsing failed
    InvalidJson(String),
    /// PNG parsing failed
    InvalidPng(String),
    /// PNG metadata missing
    MissingMetadata(String),
    /// PNG metadata present but undecodable
    CorruptMetadata(String),
    /// Card validation failed
    ValidationFailed(Vec<String>),
    /// Output could not be written
    WriteFailed(String),
    /// Image already carries a card and replacement is disabled
    AlreadyEmbedded(String),
    /// Output path is the source file
    WouldOverwriteSource(String),
}

impl fmt::Display for CardLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardLoadError::FileNotFound(msg) => {
                write!(f, "File not found: {}", msg)
            }
            CardLoadError::InvalidJson(msg) => {
                write!(f, "Invalid JSON: {}", msg)
            }
            CardLoadError::InvalidPng(msg) => {
                write!(f, "Invalid PNG: {}", msg)
            }
            CardLoadError::MissingMetadata(msg) => {
                write!(f, "Missing metadata: {}", msg)
            }
            CardLoadError::CorruptMetadata(msg) => {
                write!(f, "Corrupt metadata: {}", msg)
            }
            CardLoadError::ValidationFailed(errors) => {
                writeln!(f, "Card validation failed:")?;
                for error in errors {
                    writeln!(f, "  • {}", error)?;
                }
                Ok(())
            }
            CardLoadError::WriteFailed(msg) => {
                write!(f, "Write failed: {}", msg)
            }
            CardLoadError::AlreadyEmbedded(msg) => {
                write!(f, "Card already embedded: {}", msg)
            }
            CardLoadError::WouldOverwriteSource(msg) => {
                write!(f, "Refusing to overwrite source file: {}", msg)
            }
        }
    }
}

impl std::error::Error for CardLoadError {}

impl CardLoadError {
    fn from_codec(path: &Path, err: CardCodecError) -> Self {
        let location = path.display();
        match err {
            CardCodecError::Format(inner) => {
                CardLoadError::InvalidPng(format!("{}: {}", location, inner))
            }
            CardCodecError::NotFound => CardLoadError::MissingMetadata(format!(
                "{}: PNG does not contain '{}' metadata in tEXt chunk",
                location,
                codec::CHARA_KEYWORD
            )),
            CardCodecError::Corrupt(msg) => {
                CardLoadError::CorruptMetadata(format!("{}: {}", location, msg))
            }
            CardCodecError::Serialize(inner) => {
                CardLoadError::InvalidJson(format!("{}: {}", location, inner))
            }
            CardCodecError::AlreadyEmbedded => CardLoadError::AlreadyEmbedded(format!(
                "{}: replace it or strip the image first",
                location
            )),
        }
    }
}

/// Read a whole file, typically the source image of an export.
pub async fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, CardLoadError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CardLoadError::FileNotFound(format!("{}: {}", path.display(), e)))?;
    debug!(path = %path.display(), len = bytes.len(), "Read file");
    Ok(bytes)
}

/// Load a card document from a file (JSON or PNG)
/// Automatically detects the file type based on extension
pub async fn load_card_value<P: AsRef<Path>>(
    path: P,
    options: DecodeOptions,
) -> Result<Value, CardLoadError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase());

    match extension.as_deref() {
        Some("json") => {
            let bytes = read_file(path).await?;
            parse_json_card(path, &bytes)
        }
        Some("png") => {
            let bytes = read_file(path).await?;
            codec::decode_with(&bytes, options).map_err(|e| CardLoadError::from_codec(path, e))
        }
        _ => Err(CardLoadError::InvalidJson(format!(
            "{}: File must be .json or .png",
            path.display()
        ))),
    }
}

fn parse_json_card(path: &Path, bytes: &[u8]) -> Result<Value, CardLoadError> {
    serde_json::from_slice(bytes)
        .map_err(|e| CardLoadError::InvalidJson(format!("{}: {}", path.display(), e)))
}

/// Embed `card` into the PNG at `image_path`, returning the new image bytes.
pub async fn embed_card_file<P: AsRef<Path>>(
    card: &Value,
    image_path: P,
    options: codec::EncodeOptions,
) -> Result<Vec<u8>, CardLoadError> {
    let image_path = image_path.as_ref();
    let image = read_file(image_path).await?;
    codec::encode_with(card, &image, options)
        .map(codec::EncodedCard::into_bytes)
        .map_err(|e| CardLoadError::from_codec(image_path, e))
}

/// Check a decoded document against the v2 card schema
pub fn validate_card(value: &Value) -> Result<CharacterCard, CardLoadError> {
    let card = CharacterCard::from_value(value)
        .map_err(|e| CardLoadError::ValidationFailed(vec![e.to_string()]))?;

    let errors = card.validation_errors();
    if !errors.is_empty() {
        return Err(CardLoadError::ValidationFailed(errors));
    }

    Ok(card)
}

/// Fails if `output` names the same file as `source`.
///
/// Paths are compared as given and, when both exist, after resolving
/// symlinks and relative components.
pub fn ensure_distinct_output(source: &Path, output: &Path) -> Result<(), CardLoadError> {
    let same = source == output
        || matches!(
            (source.canonicalize(), output.canonicalize()),
            (Ok(a), Ok(b)) if a == b
        );
    if same {
        return Err(CardLoadError::WouldOverwriteSource(format!(
            "{} (choose another output path)",
            output.display()
        )));
    }
    Ok(())
}

/// Write `bytes` to `path` through a temporary file in the same directory,
/// so readers never observe a partially written image.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CardLoadError> {
    let parent = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    let mut temp_file = match parent {
        Some(dir) => NamedTempFile::new_in(dir),
        None => NamedTempFile::new_in("."),
    }
    .map_err(|e| write_failed(path, e))?;

    temp_file
        .write_all(bytes)
        .map_err(|e| write_failed(path, e))?;
    temp_file
        .as_file_mut()
        .sync_all()
        .map_err(|e| write_failed(path, e))?;
    temp_file
        .persist(path)
        .map_err(|e| write_failed(path, e))?;
    debug!(path = %path.display(), len = bytes.len(), "Wrote file");
    Ok(())
}

fn write_failed(path: &Path, err: impl fmt::Display) -> CardLoadError {
    CardLoadError::WriteFailed(format!("{}: {}", path.display(), err))
}
