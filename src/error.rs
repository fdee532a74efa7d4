// src/error.rs
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaxError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid PAX tag line: {found}")]
    InvalidTag { found: String },

    #[error("Invalid or unsupported PAX type id: {0}")]
    InvalidType(i32),

    #[error("Required header tag {tag} occurred {count} times, expected exactly once")]
    TagCount { tag: &'static str, count: u32 },

    #[error("Header field {field} is {found}, but the type table says {expected}")]
    FieldMismatch {
        field: &'static str,
        found: u64,
        expected: u64,
    },

    #[error("DATA_LENGTH is {found}, expected {expected} from bpv*vpe*dimensions")]
    DataLengthMismatch { found: u64, expected: u64 },

    #[error("Malformed number at byte offset {offset}")]
    MalformedNumber { offset: usize },

    #[error("Unknown metadata type tag: {tag}")]
    UnknownMetadataType { tag: String },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Index {index} out of bounds for {axis} of extent {bound}")]
    IndexOutOfBounds {
        index: u64,
        bound: u64,
        axis: &'static str,
    },

    #[error("Buffer too short: {expected} bytes required but only {available} available")]
    BufferTooShort { expected: usize, available: usize },

    #[error("Incomplete header: more bytes are required")]
    Incomplete,

    #[error("Metadata not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, PaxError>;

/// Recoverable diagnostic accumulated during an import.
///
/// An unknown metadata type tag does not abort a parse; the line is skipped
/// and the event is recorded so callers can inspect it afterwards, without
/// any process-wide status state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    UnknownMetadataType { tag: String, offset: usize },
}
