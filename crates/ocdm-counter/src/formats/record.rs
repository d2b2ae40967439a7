//! # Record Format
//!
//! Fixed-width decimal records used by the filesystem backend.
//!
//! A record of width `w` is the decimal digits of the value, left-justified,
//! padded with `PAD_BYTE` to `w - 1` bytes, and terminated by `\n`. Every
//! record of a file has the same width, so record `i` (1-based) starts at
//! byte `(i - 1) * w`.
//!
//! This module is pure: no file I/O.

use crate::vocabulary::{MIN_RECORD_WIDTH, PAD_BYTE, RECORD_TERMINATOR};
use crate::CounterValue;
use num_bigint::BigUint;
use std::fmt;

/// Why a record region is not a well-formed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFault {
    /// A NUL byte appeared before the terminator.
    EmbeddedNull { offset: usize },
    /// The data ended before any terminator.
    Unterminated,
}

impl fmt::Display for RecordFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmbeddedNull { offset } => {
                write!(f, "unexpected null byte at offset {}", offset)
            }
            Self::Unterminated => write!(f, "end of data before record terminator"),
        }
    }
}

/// Smallest width able to hold `value`.
#[must_use]
pub fn required_width(value: &CounterValue) -> usize {
    (value.decimal_len() + 1).max(MIN_RECORD_WIDTH)
}

/// Encode `value` as a record of `width` bytes.
///
/// Returns `None` if the value does not fit.
#[must_use]
pub fn encode(value: &CounterValue, width: usize) -> Option<Vec<u8>> {
    if required_width(value) > width {
        return None;
    }
    let mut record = value.to_string().into_bytes();
    record.resize(width - 1, PAD_BYTE);
    record.push(RECORD_TERMINATOR);
    Some(record)
}

/// A record holding no value.
#[must_use]
pub fn blank(width: usize) -> Vec<u8> {
    let mut record = vec![PAD_BYTE; width.saturating_sub(1)];
    record.push(RECORD_TERMINATOR);
    record
}

/// Decode a record region.
///
/// Padding, whitespace and the terminator are stripped; anything that is
/// not then a decimal integer (blank slots, NUL-filled gaps, short reads
/// past end of file) decodes as `None`.
#[must_use]
pub fn decode(bytes: &[u8]) -> Option<CounterValue> {
    let end = bytes
        .iter()
        .position(|&b| b == RECORD_TERMINATOR)
        .unwrap_or(bytes.len());
    let digits = bytes[..end].trim_ascii();
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    BigUint::parse_bytes(digits, 10).map(CounterValue::new)
}

/// Width of the first record in `bytes`: the offset just past the first
/// terminator.
pub fn first_record_width(bytes: &[u8]) -> Result<usize, RecordFault> {
    for (offset, &byte) in bytes.iter().enumerate() {
        match byte {
            0 => return Err(RecordFault::EmbeddedNull { offset }),
            RECORD_TERMINATOR => return Ok(offset + 1),
            _ => {}
        }
    }
    Err(RecordFault::Unterminated)
}

/// A record region is valid when it holds a terminator with no NUL
/// byte before it.
#[must_use]
pub fn is_valid(bytes: &[u8]) -> bool {
    first_record_width(bytes).is_ok()
}

/// Split a whole family file into record values.
///
/// Malformed or blank records become `None`; a trailing partial record
/// counts as one slot.
#[must_use]
pub fn split_records(bytes: &[u8], width: usize) -> Vec<Option<CounterValue>> {
    if width == 0 {
        return Vec::new();
    }
    bytes
        .chunks(width)
        .map(|chunk| if is_valid(chunk) { decode(chunk) } else { None })
        .collect()
}

/// Encode a sequence of slots at a common width.
///
/// The width is raised to fit the largest value. Returns the file bytes
/// and the width used.
#[must_use]
pub fn join_records(slots: &[Option<CounterValue>], min_width: usize) -> (Vec<u8>, usize) {
    let width = slots
        .iter()
        .flatten()
        .map(required_width)
        .fold(min_width.max(MIN_RECORD_WIDTH), usize::max);

    let mut bytes = Vec::with_capacity(slots.len() * width);
    for slot in slots {
        match slot.as_ref().and_then(|value| encode(value, width)) {
            Some(record) => bytes.extend_from_slice(&record),
            None => bytes.extend_from_slice(&blank(width)),
        }
    }
    (bytes, width)
}
