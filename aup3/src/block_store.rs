//! Raw sample block access on the `sampleblocks` table.

use rusqlite::{Connection, OptionalExtension};

use crate::{Aup3Error, Result, SampleFormat};

const SELECT_BLOCK: &str = "SELECT sampleformat, samples FROM sampleblocks WHERE blockid = ?1";

/// Undecoded contents of one `sampleblocks` row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlock {
    pub format: SampleFormat,
    pub samples: Vec<u8>,
}

impl StoredBlock {
    /// Number of whole samples held by the blob in its stored format.
    pub fn sample_count(&self) -> usize {
        self.samples.len() / self.format.byte_width()
    }
}

/// Reads block `block_id`. The connection is only queried, never written.
pub fn fetch(conn: &Connection, block_id: i64) -> Result<StoredBlock> {
    let row = conn
        .prepare_cached(SELECT_BLOCK)?
        .query_row([block_id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<Vec<u8>>>(1)?)))
        .optional()?;

    let (tag, samples) = row.ok_or(Aup3Error::BlockNotFound(block_id))?;
    let format = SampleFormat::try_from(tag)?;

    log::debug!("fetched block {} ({:?}, {} bytes)", block_id, format, samples.as_ref().map_or(0, Vec::len));

    Ok(StoredBlock {
        format,
        samples: samples.unwrap_or_default(),
    })
}
