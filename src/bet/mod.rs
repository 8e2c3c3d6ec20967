//! Bet records and their TLV wire codec
//!
//! A bet is five text fields, each serialized as one TLV entry:
//! tag (u8), length (u16 big-endian), value (UTF-8 bytes).

pub mod codec;

pub use codec::*;

use thiserror::Error;

/// Codec errors for bet serialization and winner payload parsing
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Field {tag:?} too long: {len} bytes (max 65535)")]
    FieldTooLong { tag: FieldTag, len: usize },

    #[error("Truncated TLV entry at offset {offset}")]
    Truncated { offset: usize },

    #[error("Declared length {declared} exceeds {available} available bytes")]
    LengthMismatch { declared: usize, available: usize },

    #[error("Unknown field tag: {0}")]
    UnknownTag(u8),

    #[error("Field value is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Invalid bet line: {0}")]
    InvalidLine(String),

    #[error("Winner payload length {0} is not a multiple of 4")]
    InvalidWinnerPayload(usize),
}

/// Field tags for the five attributes of a bet. Closed set: decoding an
/// unlisted tag fails rather than skipping the entry.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, num_enum::TryFromPrimitive)]
pub enum FieldTag {
    FirstName = 1,
    LastName = 2,
    Document = 3,
    BirthDate = 4,
    Number = 5,
}

/// One lottery bet. All fields are carried as text; the chosen number is
/// not validated numerically at this layer. Immutable once constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bet {
    pub first_name: String,
    pub last_name: String,
    pub document: String,
    pub birth_date: String,
    pub number: String,
}

impl Bet {
    /// Parse one CSV line of the form `first,last,document,birth_date,number`.
    /// Surrounding whitespace is trimmed from each field.
    pub fn from_csv_line(line: &str) -> Result<Self, CodecError> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 5 {
            return Err(CodecError::InvalidLine(line.to_string()));
        }
        Ok(Self {
            first_name: fields[0].trim().to_string(),
            last_name: fields[1].trim().to_string(),
            document: fields[2].trim().to_string(),
            birth_date: fields[3].trim().to_string(),
            number: fields[4].trim().to_string(),
        })
    }
}
