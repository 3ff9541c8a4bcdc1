pub mod block_store;
mod constants;
mod container;
pub mod decoder;
pub mod document;
mod project;

use core::result;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Aup3Error {
    #[error("Cannot open container \"{path}\": {reason}")]
    ContainerOpen { path: String, reason: String },

    #[error("Malformed project document: {0}")]
    MalformedProject(String),

    #[error("Block {0} not found")]
    BlockNotFound(i64),

    #[error("Unsupported sample format tag {0:#010x}")]
    UnsupportedFormat(i64),

    #[error("Corrupt block: expected {expected} bytes, got {actual}")]
    CorruptBlock { expected: usize, actual: usize },

    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    #[error("Track {0} not found")]
    TrackNotFound(usize),

    #[error("Invalid time range {start}..{stop}")]
    InvalidRange { start: f64, stop: f64 },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = result::Result<T, Aup3Error>;

pub use self::{
    block_store::StoredBlock,
    constants::{FieldType, SampleFormat},
    document::{BlockDescriptor, ParsedDocument, ProjectTree, WaveClip, WaveTrack},
    project::{get_labels, open, Label, Project},
};
