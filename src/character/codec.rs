//! Character cards embedded in PNG images.
//!
//! A card is stored SillyTavern-style: the JSON document is base64-encoded and
//! written as the text of a `tEXt` chunk with keyword `chara`, placed right
//! before `IEND`. Encoding is a pure transform over byte buffers; the source
//! image is never modified, so one image can back any number of exports.

use std::fmt;

use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::character::png_text::{
    self, insert_before_iend, strip_text, text_chunk_from_ascii, CrcCheck, PngTextError,
};

/// Keyword used by character card tooling for the embedded card.
pub const CHARA_KEYWORD: &str = "chara";

pub const PNG_MIME_TYPE: &str = "image/png";

/// Errors that can occur when embedding or extracting a card.
#[derive(Debug)]
pub enum CardCodecError {
    /// The input is not a well-formed PNG chunk stream.
    Format(PngTextError),

    /// The PNG is valid but carries no `chara` text chunk.
    NotFound,

    /// The `chara` chunk exists but is not base64-encoded JSON.
    Corrupt(String),

    /// The card could not be serialized to JSON.
    Serialize(serde_json::Error),

    /// Replacement was disabled and the image already carries a card.
    AlreadyEmbedded,
}

impl fmt::Display for CardCodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardCodecError::Format(err) => write!(f, "Invalid PNG: {err}"),
            CardCodecError::NotFound => {
                write!(f, "No character data embedded (no '{CHARA_KEYWORD}' tEXt chunk)")
            }
            CardCodecError::Corrupt(msg) => write!(f, "Corrupt character data: {msg}"),
            CardCodecError::Serialize(err) => {
                write!(f, "Failed to serialize character data: {err}")
            }
            CardCodecError::AlreadyEmbedded => {
                write!(f, "Image already contains a '{CHARA_KEYWORD}' tEXt chunk")
            }
        }
    }
}

impl std::error::Error for CardCodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CardCodecError::Format(err) => Some(err),
            CardCodecError::NotFound => None,
            CardCodecError::Corrupt(_) => None,
            CardCodecError::Serialize(err) => Some(err),
            CardCodecError::AlreadyEmbedded => None,
        }
    }
}

impl From<PngTextError> for CardCodecError {
    fn from(err: PngTextError) -> Self {
        match err {
            PngTextError::MissingKeyword(_) => CardCodecError::NotFound,
            other => CardCodecError::Format(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Drop any `chara` chunks already present before inserting the new one.
    /// When false, encoding an image that already has a card fails with
    /// [`CardCodecError::AlreadyEmbedded`].
    pub replace_existing: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            replace_existing: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    pub crc_check: CrcCheck,
}

/// PNG bytes produced by [`encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCard {
    bytes: Vec<u8>,
}

impl EncodedCard {
    pub fn mime_type(&self) -> &'static str {
        PNG_MIME_TYPE
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for EncodedCard {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Embed `card` into a copy of `png`, replacing any card already present.
pub fn encode<T>(card: &T, png: &[u8]) -> Result<EncodedCard, CardCodecError>
where
    T: Serialize + ?Sized,
{
    encode_with(card, png, EncodeOptions::default())
}

pub fn encode_with<T>(
    card: &T,
    png: &[u8],
    options: EncodeOptions,
) -> Result<EncodedCard, CardCodecError>
where
    T: Serialize + ?Sized,
{
    if !png_text::is_png(png) {
        return Err(CardCodecError::Format(PngTextError::InvalidSignature));
    }

    let source = if options.replace_existing {
        strip_text(png, CHARA_KEYWORD)?
    } else if has_card(png)? {
        return Err(CardCodecError::AlreadyEmbedded);
    } else {
        png.to_vec()
    };

    let json = serde_json::to_vec(card).map_err(CardCodecError::Serialize)?;
    let encoded = base64::prelude::BASE64_STANDARD.encode(&json);
    let chunk = text_chunk_from_ascii(CHARA_KEYWORD, &encoded)?;
    let bytes = insert_before_iend(&source, &chunk)?;

    debug!(
        json_len = json.len(),
        base64_len = encoded.len(),
        input_len = png.len(),
        output_len = bytes.len(),
        replace_existing = options.replace_existing,
        "Encoded character card into PNG"
    );
    Ok(EncodedCard { bytes })
}

/// Whether any chunk carries the `chara` keyword. CRCs are not checked.
fn has_card(png: &[u8]) -> Result<bool, CardCodecError> {
    for chunk in png_text::chunks(png)? {
        if chunk?.has_keyword(CHARA_KEYWORD) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Extract the embedded card as a JSON value.
pub fn decode(png: &[u8]) -> Result<Value, CardCodecError> {
    decode_with(png, DecodeOptions::default())
}

pub fn decode_with(png: &[u8], options: DecodeOptions) -> Result<Value, CardCodecError> {
    decode_as(png, options)
}

/// Extract the embedded card and deserialize it into `T`.
pub fn decode_as<T: DeserializeOwned>(
    png: &[u8],
    options: DecodeOptions,
) -> Result<T, CardCodecError> {
    let json = decode_json_bytes(png, options)?;
    serde_json::from_slice(&json)
        .map_err(|err| CardCodecError::Corrupt(format!("JSON parse failed: {err}")))
}

fn decode_json_bytes(png: &[u8], options: DecodeOptions) -> Result<Vec<u8>, CardCodecError> {
    let text = png_text::extract_text_with(png, CHARA_KEYWORD, options.crc_check)?;
    let decoded = base64::prelude::BASE64_STANDARD
        .decode(text.trim_ascii())
        .map_err(|err| CardCodecError::Corrupt(format!("Base64 decode failed: {err}")))?;
    std::str::from_utf8(&decoded)
        .map_err(|err| CardCodecError::Corrupt(format!("UTF-8 decode failed: {err}")))?;
    debug!(
        base64_len = text.len(),
        json_len = decoded.len(),
        "Decoded character card from PNG"
    );
    Ok(decoded)
}

/// Remove every embedded card, leaving the rest of the image untouched.
pub fn strip(png: &[u8]) -> Result<Vec<u8>, CardCodecError> {
    Ok(strip_text(png, CHARA_KEYWORD)?)
}

/// Cheap scan for the `chara` keyword anywhere in the file.
///
/// False positives are possible; a `true` result only means [`decode`] is
/// worth attempting.
pub fn quick_check(bytes: &[u8]) -> bool {
    png_text::is_png(bytes) && memchr::memmem::find(bytes, CHARA_KEYWORD.as_bytes()).is_some()
}
