//! Text file reading with binary detection and encoding fallback.
//!
//! Reads each file once: binary sniffing, BOM handling, the strict UTF-8
//! fast path and the chardetng fallback all work on the same buffer.

use anyhow::{bail, Context, Result};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use std::path::Path;

pub const DEFAULT_SAMPLE_SIZE: usize = 8192;

/// Why a file could not be turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unreadable {
    Binary,
    TooLarge,
}

impl std::fmt::Display for Unreadable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unreadable::Binary => f.write_str("binary content"),
            Unreadable::TooLarge => f.write_str("file exceeds size limit"),
        }
    }
}

impl std::error::Error for Unreadable {}

/// Heuristic binary check over a byte sample.
///
/// A NUL byte is decisive; otherwise fewer than 70% printable ASCII bytes
/// means binary. UTF-16 BOMs are treated as text.
pub fn looks_binary(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(DEFAULT_SAMPLE_SIZE)];
    if sample.is_empty() {
        return false;
    }
    if sample.starts_with(&[0xff, 0xfe]) || sample.starts_with(&[0xfe, 0xff]) {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }
    // Valid UTF-8 (e.g. CJK comments) is text even when mostly non-ASCII.
    if std::str::from_utf8(sample).is_ok() {
        return false;
    }
    let printable = sample
        .iter()
        .filter(|&&b| (32..=126).contains(&b) || b == b'\t' || b == b'\n' || b == b'\r')
        .count();
    (printable as f64 / sample.len() as f64) < 0.70
}

/// Decode raw bytes to text, honouring BOMs and guessing legacy encodings.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xef, 0xbb, 0xbf]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if bytes.starts_with(&[0xff, 0xfe]) {
        return UTF_16LE.decode(bytes).0.into_owned();
    }
    if bytes.starts_with(&[0xfe, 0xff]) {
        return UTF_16BE.decode(bytes).0.into_owned();
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(&bytes[..bytes.len().min(DEFAULT_SAMPLE_SIZE)], true);
    let guessed: &'static Encoding = detector.guess(None, true);
    let (decoded, _, _) = guessed.decode(bytes);
    if decoded.is_empty() && !bytes.is_empty() {
        return UTF_8.decode(bytes).0.into_owned();
    }
    decoded.into_owned()
}

/// Read a text file no larger than `max_bytes`.
///
/// Errors carry an [`Unreadable`] cause for binary or oversized files and the
/// I/O error otherwise.
pub fn read_text_file(path: &Path, max_bytes: Option<u64>) -> Result<String> {
    if let Some(limit) = max_bytes {
        let len = std::fs::metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        if len > limit {
            return Err(Unreadable::TooLarge.into());
        }
    }

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    if looks_binary(&bytes) {
        bail!(Unreadable::Binary);
    }
    Ok(decode_text(&bytes))
}
