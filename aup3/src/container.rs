use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension};

use crate::{constants::AUDACITY_APPLICATION_ID, Aup3Error, Result};

// autosave holds unsaved changes and takes precedence, as in Audacity
const DOCUMENT_TABLES: [&str; 2] = ["autosave", "project"];

/// Opens `path` read-only and checks that it is an Audacity project database.
pub fn open(path: &Path) -> Result<Connection> {
    let open_error = |reason: String| Aup3Error::ContainerOpen {
        path: path.display().to_string(),
        reason,
    };

    if !path.is_file() {
        return Err(open_error("no such file".into()));
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
        .map_err(|e| open_error(e.to_string()))?;

    // the first read of the header fails for files that are not databases
    let application_id: i64 = conn
        .pragma_query_value(None, "application_id", |row| row.get(0))
        .map_err(|e| open_error(e.to_string()))?;
    if application_id != AUDACITY_APPLICATION_ID {
        return Err(open_error(format!("not an Audacity project (application id {:#x})", application_id)));
    }

    Ok(conn)
}

/// Project format version, `0xAABBCCDD` for Audacity `AA.BB.CC.DD`.
pub fn read_version(conn: &Connection) -> Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version as u32)
}

/// Returns `dict || doc` of the newest stored project document.
pub fn read_document(conn: &Connection) -> Result<Vec<u8>> {
    for table in DOCUMENT_TABLES {
        if !table_exists(conn, table)? {
            continue;
        }

        let row = conn
            .query_row(&format!("SELECT dict, doc FROM {} WHERE id = 1", table), [], |row| {
                Ok((row.get::<_, Option<Vec<u8>>>(0)?, row.get::<_, Option<Vec<u8>>>(1)?))
            })
            .optional()?;

        if let Some((dict, doc)) = row {
            if table == "autosave" {
                log::info!("reading unsaved project state from the autosave table");
            }
            let mut raw = dict.unwrap_or_default();
            raw.extend(doc.unwrap_or_default());
            return Ok(raw);
        }
    }

    Err(Aup3Error::MalformedProject("container holds no project document".into()))
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row("SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1", [name], |row| {
        row.get(0)
    })?;
    Ok(count > 0)
}
