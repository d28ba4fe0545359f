//! Scanning and rewriting of PVL ("parameter value language") text such as
//! control networks written by `cnetbin2pvl`.
//!
//! The nested `Object`/`Group` structure is never parsed with a grammar.
//! Instead a [PvlCursor] advances through the text until a line containing a
//! set of marker substrings, returning everything read as a [Block]. The
//! `key = value` lines of a block are then decoded into a [PvlDict], updated,
//! and written back into the original lines with [encode].

mod codec;
mod cursor;

pub use codec::{
    BOOL_KEYS, MeasureRecord, PvlDict, PvlValue, REAL_KEYS, clean, decode, encode, format_real,
    leading_real,
};
pub use cursor::{Block, PvlCursor};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("reached end of input at line {line} looking for a line containing {markers:?}")]
    Unterminated { markers: Vec<String>, line: usize },
    #[error("value \"{value}\" of key \"{key}\" is not a real number")]
    InvalidReal { key: String, value: String },
    #[error("value \"{value}\" of key \"{key}\" is not a boolean")]
    InvalidBool { key: String, value: String },
    #[error("required key \"{key}\" is absent")]
    MissingKey { key: String },
}

pub type Result<T> = std::result::Result<T, Error>;
