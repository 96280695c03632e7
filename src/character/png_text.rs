use std::fmt;

use tracing::debug;

use crate::character::crc::chunk_crc;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub const TEXT_CHUNK: [u8; 4] = *b"tEXt";
pub const IEND_CHUNK: [u8; 4] = *b"IEND";

/// Length field, type tag and CRC surrounding every chunk's data.
pub const CHUNK_OVERHEAD: usize = 12;

#[derive(Debug, PartialEq, Eq)]
pub enum PngTextError {
    InvalidSignature,
    TruncatedChunk,
    InvalidChunkLength,
    InvalidCrc { chunk_type: [u8; 4] },
    MalformedText(&'static str),
    MissingKeyword(String),
    MissingIend,
}

impl fmt::Display for PngTextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PngTextError::InvalidSignature => write!(f, "not a valid PNG"),
            PngTextError::TruncatedChunk => write!(f, "unexpected end of PNG data"),
            PngTextError::InvalidChunkLength => {
                write!(f, "chunk length exceeds PNG bounds")
            }
            PngTextError::InvalidCrc { chunk_type } => {
                write!(
                    f,
                    "chunk {} failed CRC validation",
                    display_chunk_type(chunk_type)
                )
            }
            PngTextError::MalformedText(reason) => {
                write!(f, "malformed tEXt chunk: {}", reason)
            }
            PngTextError::MissingKeyword(keyword) => {
                write!(f, "missing '{}' tEXt metadata", keyword)
            }
            PngTextError::MissingIend => write!(f, "PNG has no IEND chunk"),
        }
    }
}

impl std::error::Error for PngTextError {}

/// Whether chunk CRCs are recomputed while reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrcCheck {
    #[default]
    Verify,
    Skip,
}

pub fn is_png(data: &[u8]) -> bool {
    data.len() >= PNG_SIGNATURE.len() && data[..PNG_SIGNATURE.len()] == PNG_SIGNATURE
}

/// A chunk borrowed from a PNG buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Offset of the length field within the PNG buffer.
    pub offset: usize,
    pub chunk_type: [u8; 4],
    pub data: &'a [u8],
    pub crc: u32,
    /// The whole chunk: length, type, data and CRC.
    pub raw: &'a [u8],
}

impl<'a> Chunk<'a> {
    pub fn is_type(&self, chunk_type: &[u8; 4]) -> bool {
        &self.chunk_type == chunk_type
    }

    pub fn crc_matches(&self) -> bool {
        chunk_crc(&self.chunk_type, self.data) == self.crc
    }

    pub fn type_name(&self) -> String {
        display_chunk_type(&self.chunk_type)
    }

    /// Splits a `tEXt` chunk into keyword and text bytes.
    ///
    /// Returns `None` for other chunk types and for text chunks with no NUL
    /// separator.
    pub fn text_parts(&self) -> Option<(&'a [u8], &'a [u8])> {
        if !self.is_type(&TEXT_CHUNK) {
            return None;
        }
        let null_pos = memchr::memchr(0, self.data)?;
        Some((&self.data[..null_pos], &self.data[null_pos + 1..]))
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.text_parts()
            .is_some_and(|(chunk_keyword, _)| chunk_keyword == keyword.as_bytes())
    }
}

/// Sequential walk over the chunk stream following the signature.
///
/// Yields chunks up to and including `IEND`. A chunk whose declared length
/// overruns the buffer yields an error and ends the walk.
pub struct Chunks<'a> {
    data: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Result<Chunk<'a>, PngTextError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.data.len() {
            return None;
        }
        let result = self.read_chunk();
        match &result {
            Ok(chunk) if chunk.is_type(&IEND_CHUNK) => self.done = true,
            Ok(chunk) => self.offset += chunk.raw.len(),
            Err(_) => self.done = true,
        }
        Some(result)
    }
}

impl<'a> Chunks<'a> {
    fn read_chunk(&self) -> Result<Chunk<'a>, PngTextError> {
        let data = self.data;
        let offset = self.offset;
        if offset + CHUNK_OVERHEAD > data.len() {
            return Err(PngTextError::TruncatedChunk);
        }
        let length = read_u32(data, offset) as usize;
        let chunk_type = [
            data[offset + 4],
            data[offset + 5],
            data[offset + 6],
            data[offset + 7],
        ];
        let data_start = offset + 8;
        let data_end = data_start
            .checked_add(length)
            .ok_or(PngTextError::InvalidChunkLength)?;
        if data_end + 4 > data.len() {
            return Err(PngTextError::TruncatedChunk);
        }
        Ok(Chunk {
            offset,
            chunk_type,
            data: &data[data_start..data_end],
            crc: read_u32(data, data_end),
            raw: &data[offset..data_end + 4],
        })
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// Walks the chunks of `data` after checking the PNG signature.
pub fn chunks(data: &[u8]) -> Result<Chunks<'_>, PngTextError> {
    if !is_png(data) {
        return Err(PngTextError::InvalidSignature);
    }
    Ok(Chunks {
        data,
        offset: PNG_SIGNATURE.len(),
        done: false,
    })
}

/// Returns the text of the first `tEXt` chunk carrying `keyword`, read as
/// Latin-1. Text chunks with other keywords are skipped.
///
/// With [`CrcCheck::Verify`] the whole stream up to `IEND` must be intact,
/// including the chunks after the match. [`CrcCheck::Skip`] returns as soon
/// as the keyword is found.
pub fn extract_text_with(
    data: &[u8],
    keyword: &str,
    crc_check: CrcCheck,
) -> Result<String, PngTextError> {
    find_text(data, keyword, crc_check).map(latin1_to_string)
}

fn find_text<'a>(
    data: &'a [u8],
    keyword: &str,
    crc_check: CrcCheck,
) -> Result<&'a [u8], PngTextError> {
    let mut found = None;
    let mut saw_iend = false;
    for chunk in chunks(data)? {
        let chunk = chunk?;
        if crc_check == CrcCheck::Verify && !chunk.crc_matches() {
            return Err(PngTextError::InvalidCrc {
                chunk_type: chunk.chunk_type,
            });
        }

        if found.is_none() && chunk.is_type(&TEXT_CHUNK) {
            let Some((chunk_keyword, value_bytes)) = chunk.text_parts() else {
                debug!(offset = chunk.offset, "Skipping tEXt chunk without separator");
                continue;
            };
            if chunk_keyword == keyword.as_bytes() {
                if crc_check == CrcCheck::Skip {
                    return Ok(value_bytes);
                }
                found = Some(value_bytes);
            }
        }

        if chunk.is_type(&IEND_CHUNK) {
            saw_iend = true;
        }
    }

    if !saw_iend {
        return Err(PngTextError::MissingIend);
    }
    found.ok_or_else(|| PngTextError::MissingKeyword(keyword.to_string()))
}

/// Builds a complete `tEXt` chunk: length, type, `keyword ‖ 0 ‖ text`, CRC.
pub fn build_text_chunk(keyword: &[u8], text: &[u8]) -> Vec<u8> {
    let data_len = keyword.len() + 1 + text.len();
    let mut chunk = Vec::with_capacity(CHUNK_OVERHEAD + data_len);
    chunk.extend_from_slice(&(data_len as u32).to_be_bytes());
    chunk.extend_from_slice(&TEXT_CHUNK);
    chunk.extend_from_slice(keyword);
    chunk.push(0);
    chunk.extend_from_slice(text);
    let crc = chunk_crc(&TEXT_CHUNK, &chunk[8..]);
    chunk.extend_from_slice(&crc.to_be_bytes());
    chunk
}

/// Like [`build_text_chunk`], for callers holding strings.
///
/// Only ASCII is accepted so that no character is silently narrowed to a
/// byte; the keyword must also be non-empty and free of NUL.
pub fn text_chunk_from_ascii(keyword: &str, text: &str) -> Result<Vec<u8>, PngTextError> {
    if keyword.is_empty() {
        return Err(PngTextError::MalformedText("empty keyword"));
    }
    if !keyword.is_ascii() || keyword.contains('\0') {
        return Err(PngTextError::MalformedText("keyword must be ASCII without NUL"));
    }
    if !text.is_ascii() {
        return Err(PngTextError::MalformedText("text must be ASCII"));
    }
    Ok(build_text_chunk(keyword.as_bytes(), text.as_bytes()))
}

/// Copies `data` with `chunk` spliced immediately before `IEND`.
///
/// Anything after `IEND` is dropped. Fails without output if the stream is
/// truncated or never reaches `IEND`.
pub fn insert_before_iend(data: &[u8], chunk: &[u8]) -> Result<Vec<u8>, PngTextError> {
    let mut out = Vec::with_capacity(data.len() + chunk.len());
    out.extend_from_slice(&PNG_SIGNATURE);
    let mut copied = 0usize;
    for existing in chunks(data)? {
        let existing = existing?;
        if existing.is_type(&IEND_CHUNK) {
            out.extend_from_slice(chunk);
            out.extend_from_slice(existing.raw);
            debug!(
                copied_chunks = copied,
                inserted_len = chunk.len(),
                output_len = out.len(),
                "Inserted chunk before IEND"
            );
            return Ok(out);
        }
        out.extend_from_slice(existing.raw);
        copied += 1;
    }
    Err(PngTextError::MissingIend)
}

/// Copies `data` without any `tEXt` chunk carrying `keyword`.
pub fn strip_text(data: &[u8], keyword: &str) -> Result<Vec<u8>, PngTextError> {
    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&PNG_SIGNATURE);
    let mut removed = 0usize;
    for chunk in chunks(data)? {
        let chunk = chunk?;
        if chunk.has_keyword(keyword) {
            removed += 1;
            continue;
        }
        out.extend_from_slice(chunk.raw);
        if chunk.is_type(&IEND_CHUNK) {
            if removed > 0 {
                debug!(keyword, removed, "Removed tEXt chunks");
            }
            return Ok(out);
        }
    }
    Err(PngTextError::MissingIend)
}

pub fn display_chunk_type(chunk_type: &[u8; 4]) -> String {
    chunk_type
        .iter()
        .map(|&b| {
            if (32..=126).contains(&b) {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}

fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::test_helpers::helpers::{build_png, chunk, minimal_png};

    fn extract_text(data: &[u8], keyword: &str) -> Result<String, PngTextError> {
        extract_text_with(data, keyword, CrcCheck::Verify)
    }

    #[test]
    fn rejects_invalid_signature() {
        let result = extract_text(b"notpng", "chara");
        assert!(matches!(result, Err(PngTextError::InvalidSignature)));
        assert!(!is_png(b"\x89PNG"));
        assert!(is_png(&minimal_png()));
    }

    #[test]
    fn extracts_requested_text() {
        let png = build_png(Some(b"value"), true);
        let text = extract_text(&png, "chara").unwrap();
        assert_eq!(text, "value");
    }

    #[test]
    fn reports_missing_keyword() {
        let png = build_png(None, true);
        let result = extract_text(&png, "chara");
        assert!(matches!(result, Err(PngTextError::MissingKeyword(_))));
    }

    #[test]
    fn rejects_invalid_crc() {
        let png = build_png(Some(b"value"), false);
        let result = extract_text(&png, "chara");
        assert!(matches!(result, Err(PngTextError::InvalidCrc { .. })));
    }

    #[test]
    fn skipping_crc_check_accepts_bad_crc() {
        let png = build_png(Some(b"value"), false);
        let text = extract_text_with(&png, "chara", CrcCheck::Skip).unwrap();
        assert_eq!(text, "value");
    }

    #[test]
    fn skips_unrelated_text_chunks() {
        let mut extra = build_text_chunk(b"Software", b"paint");
        extra.extend_from_slice(&chunk(*b"tEXt", b"no separator here", true));
        extra.extend_from_slice(&build_text_chunk(b"chara", b"wanted"));
        let png = insert_before_iend(&minimal_png(), &extra).unwrap();

        assert_eq!(extract_text(&png, "chara").unwrap(), "wanted");
        assert_eq!(extract_text(&png, "Software").unwrap(), "paint");
    }

    #[test]
    fn reads_text_as_latin1() {
        let png = build_png(Some(&[0xE9, b'!']), true);
        assert_eq!(extract_text(&png, "chara").unwrap(), "\u{e9}!");
    }

    #[test]
    fn truncated_chunk_is_reported() {
        let png = minimal_png();
        let truncated = &png[..png.len() - 20];
        assert_eq!(
            extract_text(truncated, "chara"),
            Err(PngTextError::TruncatedChunk)
        );
    }

    #[test]
    fn overrunning_length_is_reported() {
        let mut png = minimal_png();
        // IHDR length field
        png[8..12].copy_from_slice(&0xFFFF_FFF0u32.to_be_bytes());
        let result = insert_before_iend(&png, &build_text_chunk(b"chara", b"x"));
        assert!(matches!(
            result,
            Err(PngTextError::TruncatedChunk) | Err(PngTextError::InvalidChunkLength)
        ));
    }

    #[test]
    fn missing_iend_is_reported() {
        let png = minimal_png();
        let without_iend = &png[..png.len() - CHUNK_OVERHEAD];
        assert_eq!(
            insert_before_iend(without_iend, &build_text_chunk(b"chara", b"x")),
            Err(PngTextError::MissingIend)
        );
        assert_eq!(
            extract_text(without_iend, "chara"),
            Err(PngTextError::MissingIend)
        );
    }

    #[test]
    fn strict_read_checks_chunks_after_match() {
        let mut png = build_png(Some(b"value"), true);
        // Corrupt the CRC of IDAT, which follows the chara chunk.
        let idat = chunks(&png)
            .unwrap()
            .map(|c| c.unwrap())
            .find(|c| c.is_type(b"IDAT"))
            .unwrap();
        let crc_at = idat.offset + idat.raw.len() - 4;
        png[crc_at] ^= 0xFF;

        assert_eq!(
            extract_text(&png, "chara"),
            Err(PngTextError::InvalidCrc {
                chunk_type: *b"IDAT"
            })
        );
        assert_eq!(
            extract_text_with(&png, "chara", CrcCheck::Skip).unwrap(),
            "value"
        );
    }

    #[test]
    fn strict_read_requires_iend_after_match() {
        let png = build_png(Some(b"value"), true);
        let without_iend = &png[..png.len() - CHUNK_OVERHEAD];
        assert_eq!(
            extract_text(without_iend, "chara"),
            Err(PngTextError::MissingIend)
        );
        assert_eq!(
            extract_text_with(without_iend, "chara", CrcCheck::Skip).unwrap(),
            "value"
        );
    }

    #[test]
    fn builds_text_chunk_layout() {
        let built = build_text_chunk(b"chara", b"abc");
        assert_eq!(&built[..4], &9u32.to_be_bytes());
        assert_eq!(&built[4..8], b"tEXt");
        assert_eq!(&built[8..17], b"chara\0abc");
        let crc = u32::from_be_bytes(built[17..21].try_into().unwrap());
        assert_eq!(crc, crate::character::crc::crc32(b"tEXtchara\0abc"));
        assert_eq!(built.len(), CHUNK_OVERHEAD + 9);
    }

    #[test]
    fn ascii_builder_rejects_wide_characters() {
        assert!(text_chunk_from_ascii("chara", "plain").is_ok());
        assert!(matches!(
            text_chunk_from_ascii("chara", "caf\u{e9}"),
            Err(PngTextError::MalformedText(_))
        ));
        assert!(matches!(
            text_chunk_from_ascii("ch\0ra", "x"),
            Err(PngTextError::MalformedText(_))
        ));
        assert!(matches!(
            text_chunk_from_ascii("", "x"),
            Err(PngTextError::MalformedText(_))
        ));
    }

    #[test]
    fn inserts_immediately_before_iend() {
        let png = minimal_png();
        let text = build_text_chunk(b"chara", b"payload");
        let out = insert_before_iend(&png, &text).unwrap();

        let walked: Vec<_> = chunks(&out).unwrap().map(|c| c.unwrap()).collect();
        let types: Vec<String> = walked.iter().map(|c| c.type_name()).collect();
        assert_eq!(types, ["IHDR", "IDAT", "tEXt", "IEND"]);
        let last = walked.last().unwrap();
        assert_eq!(last.offset + last.raw.len(), out.len());
        assert!(walked.iter().all(|c| c.crc_matches()));
    }

    #[test]
    fn drops_trailing_bytes_after_iend() {
        let mut png = minimal_png();
        png.extend_from_slice(b"garbage");
        let out = insert_before_iend(&png, &build_text_chunk(b"chara", b"x")).unwrap();
        assert!(out.ends_with(&chunk(*b"IEND", &[], true)));
    }

    #[test]
    fn does_not_touch_input() {
        let png = minimal_png();
        let before = png.clone();
        let _ = insert_before_iend(&png, &build_text_chunk(b"chara", b"x")).unwrap();
        assert_eq!(png, before);
    }

    #[test]
    fn strip_reverses_insert() {
        let png = minimal_png();
        let out = insert_before_iend(&png, &build_text_chunk(b"chara", b"x")).unwrap();
        assert_eq!(strip_text(&out, "chara").unwrap(), png);
    }

    #[test]
    fn strip_keeps_other_keywords() {
        let png = minimal_png();
        let with_comment =
            insert_before_iend(&png, &build_text_chunk(b"Comment", b"hello")).unwrap();
        let with_both =
            insert_before_iend(&with_comment, &build_text_chunk(b"chara", b"x")).unwrap();
        assert_eq!(strip_text(&with_both, "chara").unwrap(), with_comment);
    }

    #[test]
    fn displays_unprintable_chunk_types() {
        assert_eq!(display_chunk_type(b"tEXt"), "tEXt");
        assert_eq!(display_chunk_type(&[0, b'A', 0x7F, b'B']), ".A.B");
    }
}
