use core::{fmt, mem, ops::Range};
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::{
    block_store, container, decoder,
    document::{self, BlockDescriptor, ProjectTree, WaveTrack},
    Aup3Error, Result,
};

/// One annotation of a label track.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    title: String,
    start: f64,
    stop: f64,
}

impl Label {
    pub fn new(title: String, start: f64, stop: f64) -> Self {
        Self { title, start, stop }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Start time in seconds.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Stop time in seconds.
    pub fn stop(&self) -> f64 {
        self.stop
    }

    /// The label's interval in sample frames at `rate`.
    pub fn frames(&self, rate: f64) -> Range<i64> {
        time_to_frame(self.start, rate)..time_to_frame(self.stop, rate)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label(title='{}', start={:?}, stop={:?})", self.title, self.start, self.stop)
    }
}

enum State {
    Open(Connection),
    Closed,
}

/// An opened `.aup3` project.
///
/// Parsed metadata stays available for the lifetime of the value; reading samples
/// needs the container connection, which [`Project::close`] (or dropping the
/// project) releases.
pub struct Project {
    path: PathBuf,
    fps: f64,
    version: u32,
    labels: Vec<Label>,
    tree: ProjectTree,
    diagnostics: Vec<String>,
    state: State,
}

impl Project {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = container::open(path)?;
        let version = container::read_version(&conn)?;
        let raw = container::read_document(&conn)?;
        let parsed = document::parse(&raw)?;

        log::debug!(
            "opened {} (format {:#010x}): {} labels, {} tracks",
            path.display(),
            version,
            parsed.labels.len(),
            parsed.tree.tracks.len()
        );

        Ok(Self {
            path: path.to_owned(),
            fps: parsed.fps,
            version,
            labels: parsed.labels,
            tree: parsed.tree,
            diagnostics: parsed.diagnostics,
            state: State::Open(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Project sample rate.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Project format version as stored in `PRAGMA user_version`.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn tracks(&self) -> &[WaveTrack] {
        &self.tree.tracks
    }

    pub fn tree(&self) -> &ProjectTree {
        &self.tree
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    /// Decodes block `block_id`. The result holds exactly the block's sample count.
    pub fn load_waveblock(&self, block_id: i64) -> Result<Vec<f64>> {
        let conn = self.connection()?;
        let descriptor = self.tree.find_block(block_id).ok_or(Aup3Error::BlockNotFound(block_id))?;

        load_block(conn, descriptor)
    }

    /// Renders `track` between `start` and `stop` seconds.
    ///
    /// Time not covered by an audible clip is silence, so the result always holds
    /// `round(stop * rate) - round(start * rate)` samples.
    pub fn load_slice(&self, track: usize, start: f64, stop: f64) -> Result<Vec<f64>> {
        let conn = self.connection()?;
        if !(start >= 0.0 && stop >= start && stop.is_finite()) {
            return Err(Aup3Error::InvalidRange { start, stop });
        }
        let track = self.tree.tracks.get(track).ok_or(Aup3Error::TrackNotFound(track))?;

        let first = time_to_frame(start, track.rate);
        let last = time_to_frame(stop, track.rate);
        let mut out = usize::try_from(last - first)
            .ok()
            .and_then(silence)
            .ok_or(Aup3Error::InvalidRange { start, stop })?;

        for (index, clip) in track.clips.iter().enumerate().filter(|(_, x)| !x.cutline) {
            let origin = time_to_frame(clip.offset, track.rate);
            let audible = time_to_frame(clip.trim_left, track.rate)..(clip.num_samples as i64).saturating_sub(time_to_frame(clip.trim_right, track.rate));

            for block in track.blocks.iter().filter(|x| x.clip == index) {
                let block_start = block.start as i64;
                let block_end = block_start.saturating_add(block.sample_count as i64);
                let from = block_start.max(audible.start).saturating_add(origin).max(first);
                let to = block_end.min(audible.end).saturating_add(origin).min(last);
                if from >= to {
                    continue;
                }

                let samples = load_block(conn, block)?;
                let offset = origin + block_start;
                out[(from - first) as usize..(to - first) as usize].copy_from_slice(&samples[(from - offset) as usize..(to - offset) as usize]);
            }
        }

        Ok(out)
    }

    /// Renders `track` from the start of the timeline to its last audible sample.
    pub fn load_track(&self, track: usize) -> Result<Vec<f64>> {
        let end = self.tree.tracks.get(track).ok_or(Aup3Error::TrackNotFound(track))?.end_time();
        self.load_slice(track, 0.0, end)
    }

    pub fn load_label(&self, track: usize, label: &Label) -> Result<Vec<f64>> {
        self.load_slice(track, label.start, label.stop)
    }

    /// The serialized project document (`dict || doc`), as read for [`document::parse`].
    pub fn raw_document(&self) -> Result<Vec<u8>> {
        container::read_document(self.connection()?)
    }

    /// Releases the container. Calling it again has no effect.
    pub fn close(&mut self) {
        if let State::Open(conn) = mem::replace(&mut self.state, State::Closed) {
            if let Err((_, e)) = conn.close() {
                log::warn!("closing {} failed: {}", self.path.display(), e);
            }
        }
    }

    fn connection(&self) -> Result<&Connection> {
        match &self.state {
            State::Open(x) => Ok(x),
            State::Closed => Err(Aup3Error::InvalidState("project is closed")),
        }
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("path", &self.path)
            .field("fps", &self.fps)
            .field("labels", &self.labels.len())
            .field("tracks", &self.tree.tracks.len())
            .field("open", &self.is_open())
            .finish()
    }
}

fn load_block(conn: &Connection, descriptor: &BlockDescriptor) -> Result<Vec<f64>> {
    if descriptor.is_silent() {
        return silence(descriptor.sample_count).ok_or_else(|| {
            Aup3Error::MalformedProject(format!("silent block {} of {} samples is too large", descriptor.id, descriptor.sample_count))
        });
    }

    let block = block_store::fetch(conn, descriptor.id)?;
    if block.format != descriptor.sample_format {
        log::debug!(
            "block {} is stored as {:?} ({} samples) but its sequence declares {:?} ({} samples)",
            descriptor.id,
            block.format,
            block.sample_count(),
            descriptor.sample_format,
            descriptor.sample_count
        );
    }

    decoder::decode(&block.samples, block.format, descriptor.sample_count)
}

// None when `len` samples cannot be allocated
fn silence(len: usize) -> Option<Vec<f64>> {
    let mut out = Vec::new();
    out.try_reserve_exact(len).ok()?;
    out.resize(len, 0.0);
    Some(out)
}

fn time_to_frame(time: f64, rate: f64) -> i64 {
    (time * rate).round() as i64
}

pub fn open<P: AsRef<Path>>(path: P) -> Result<Project> {
    Project::open(path)
}

/// Reads the labels of a project without keeping the container open.
pub fn get_labels<P: AsRef<Path>>(path: P) -> Result<Vec<Label>> {
    let mut project = Project::open(path)?;
    project.close();
    Ok(project.labels)
}
