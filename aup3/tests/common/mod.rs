#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use rusqlite::{params, Connection};

pub const INT16: i64 = 0x0002_0001;
pub const FLOAT: i64 = 0x0004_000F;

const SCHEMA: &str = "
    PRAGMA application_id = 1096107097;
    PRAGMA user_version = 50397184;
    CREATE TABLE project(id INTEGER PRIMARY KEY, dict BLOB, doc BLOB);
    CREATE TABLE autosave(id INTEGER PRIMARY KEY, dict BLOB, doc BLOB);
    CREATE TABLE sampleblocks(blockid INTEGER PRIMARY KEY AUTOINCREMENT, sampleformat INTEGER,
        summin REAL, summax REAL, sumrms REAL, summary256 BLOB, summary64k BLOB, samples BLOB);
";

/// Writes a project document the way Audacity serializes it: names go to `dict`,
/// the tree goes to `doc`.
pub struct DocWriter {
    char_size: u8,
    dict: Vec<u8>,
    doc: Vec<u8>,
    names: HashMap<String, u16>,
}

impl DocWriter {
    pub fn new(char_size: u8) -> Self {
        Self {
            char_size,
            dict: vec![0, char_size],
            doc: vec![0, char_size],
            names: HashMap::new(),
        }
    }

    fn encode(&self, text: &str) -> Vec<u8> {
        match self.char_size {
            1 => text.as_bytes().to_vec(),
            2 => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            _ => text.chars().flat_map(|x| (x as u32).to_le_bytes()).collect(),
        }
    }

    fn id(&mut self, name: &str) -> u16 {
        if let Some(id) = self.names.get(name) {
            return *id;
        }
        let id = self.names.len() as u16;
        let encoded = self.encode(name);
        self.dict.push(15);
        self.dict.extend_from_slice(&id.to_le_bytes());
        self.dict.extend_from_slice(&(encoded.len() as u16).to_le_bytes());
        self.dict.extend(encoded);
        self.names.insert(name.to_owned(), id);
        id
    }

    fn field(&mut self, code: u8, name: &str) -> &mut Self {
        let id = self.id(name);
        self.doc.push(code);
        self.doc.extend_from_slice(&id.to_le_bytes());
        self
    }

    pub fn start(&mut self, name: &str) -> &mut Self {
        self.field(1, name)
    }

    pub fn end(&mut self, name: &str) -> &mut Self {
        self.field(2, name)
    }

    pub fn string(&mut self, name: &str, value: &str) -> &mut Self {
        let encoded = self.encode(value);
        self.field(3, name);
        self.doc.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
        self.doc.extend(encoded);
        self
    }

    pub fn int(&mut self, name: &str, value: i32) -> &mut Self {
        self.field(4, name);
        self.doc.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn long_long(&mut self, name: &str, value: i64) -> &mut Self {
        self.field(7, name);
        self.doc.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn double(&mut self, name: &str, value: f64) -> &mut Self {
        self.field(10, name);
        self.doc.extend_from_slice(&value.to_le_bytes());
        self.doc.extend_from_slice(&8i32.to_le_bytes());
        self
    }

    pub fn finish(&self) -> (Vec<u8>, Vec<u8>) {
        (self.dict.clone(), self.doc.clone())
    }

    pub fn label(&mut self, title: &str, t: f64, t1: f64) -> &mut Self {
        self.start("label").double("t", t).double("t1", t1).string("title", title).end("label")
    }

    pub fn block(&mut self, start: i64, id: i64) -> &mut Self {
        self.start("waveblock").long_long("start", start).long_long("blockid", id).end("waveblock")
    }
}

/// A stored sample block: id, format tag, raw bytes.
pub type Block = (i64, i64, Vec<u8>);

pub fn int16_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|x| x.to_le_bytes()).collect()
}

pub fn float_bytes(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|x| x.to_le_bytes()).collect()
}

pub fn create_project(path: &Path, document: (Vec<u8>, Vec<u8>), blocks: &[Block]) -> anyhow::Result<PathBuf> {
    let conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;
    conn.execute("INSERT INTO project(id, dict, doc) VALUES (1, ?1, ?2)", params![document.0, document.1])?;
    for (id, format, samples) in blocks {
        conn.execute(
            "INSERT INTO sampleblocks(blockid, sampleformat, samples) VALUES (?1, ?2, ?3)",
            params![id, format, samples],
        )?;
    }
    Ok(path.to_owned())
}

pub fn write_autosave(path: &Path, document: (Vec<u8>, Vec<u8>)) -> anyhow::Result<()> {
    let conn = Connection::open(path)?;
    conn.execute("INSERT INTO autosave(id, dict, doc) VALUES (1, ?1, ?2)", params![document.0, document.1])?;
    Ok(())
}

/// The document of the reference fixture.
///
/// Track 0 is 16-bit at the project rate; track 1 is float at 10 Hz, starts at
/// one second and hides its first sample behind a trim. It ends in a silent block.
pub fn sample_document(char_size: u8) -> (Vec<u8>, Vec<u8>) {
    let mut doc = DocWriter::new(char_size);
    doc.start("project").double("rate", 44100.0).string("projname", "test-project");

    doc.start("labeltrack").string("name", "Labels").int("numlabels", 3);
    doc.label("1", 26.79582766439909, 28.978503401360545);
    doc.start("label").double("t", 40.0).string("title", "broken").end("label");
    doc.label("zwei", 30.0, 31.5);
    doc.end("labeltrack");

    doc.start("wavetrack").string("name", "Audio 1").int("channel", 0).double("rate", 44100.0);
    doc.start("waveclip").double("offset", 0.0);
    doc.start("sequence").int("maxsamples", 262144).int("sampleformat", INT16 as i32).long_long("numsamples", 6);
    doc.block(0, 1).block(4, 2);
    doc.end("sequence").start("envelope").int("numpoints", 0).end("envelope");
    doc.end("waveclip").end("wavetrack");

    doc.start("wavetrack").string("name", "Audio 2").int("channel", 1).double("rate", 10.0);
    doc.start("waveclip").double("offset", 1.0).double("trimLeft", 0.1).double("trimRight", 0.0);
    doc.start("sequence").int("maxsamples", 262144).int("sampleformat", FLOAT as i32).long_long("numsamples", 5);
    doc.block(0, 3).block(3, -2);
    doc.end("sequence");
    doc.end("waveclip").end("wavetrack");

    doc.end("project");
    doc.finish()
}

pub fn sample_blocks() -> Vec<Block> {
    vec![
        (1, INT16, int16_bytes(&[i16::MAX, i16::MIN, 0, 0x4000])),
        (2, INT16, int16_bytes(&[1, -1])),
        (3, FLOAT, float_bytes(&[0.25, -0.5, 1.0])),
    ]
}

pub fn sample_project(dir: &Path) -> anyhow::Result<PathBuf> {
    create_project(&dir.join("test-project.aup3"), sample_document(1), &sample_blocks())
}
