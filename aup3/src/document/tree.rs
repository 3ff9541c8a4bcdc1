use std::collections::HashSet;

use super::walker::{DocumentVisitor, Element, Value};
use crate::{Aup3Error, Label, Result, SampleFormat};

/// Where one stored block sits inside its track.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDescriptor {
    /// Row id in `sampleblocks`; negative ids are silent blocks of `-id` samples.
    pub id: i64,
    pub sample_format: SampleFormat,
    pub sample_count: usize,
    /// First sample of the block within its clip's sequence.
    pub start: u64,
    /// Index into [`WaveTrack::clips`].
    pub clip: usize,
}

impl BlockDescriptor {
    pub fn is_silent(&self) -> bool {
        self.id < 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaveClip {
    /// Timeline position of the clip's first stored sample, in seconds.
    pub offset: f64,
    pub trim_left: f64,
    pub trim_right: f64,
    pub num_samples: u64,
    /// Nested clips are cut lines: kept in the file but never audible.
    pub cutline: bool,
}

impl WaveClip {
    pub fn play_start(&self) -> f64 {
        self.offset + self.trim_left
    }

    pub fn play_end(&self, rate: f64) -> f64 {
        self.offset + self.num_samples as f64 / rate - self.trim_right
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaveTrack {
    pub name: String,
    pub channel: i64,
    pub rate: f64,
    pub clips: Vec<WaveClip>,
    pub blocks: Vec<BlockDescriptor>,
}

impl WaveTrack {
    /// End of the last audible clip, in seconds.
    pub fn end_time(&self) -> f64 {
        self.clips
            .iter()
            .filter(|x| !x.cutline)
            .map(|x| x.play_end(self.rate))
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectTree {
    pub tracks: Vec<WaveTrack>,
}

impl ProjectTree {
    /// First descriptor with `id` across all tracks, in track order.
    pub fn find_block(&self, id: i64) -> Option<&BlockDescriptor> {
        self.tracks.iter().flat_map(|x| x.blocks.iter()).find(|x| x.id == id)
    }
}

#[derive(Clone, Copy)]
struct OpenSequence {
    format: SampleFormat,
    num_samples: u64,
    clip: usize,
    block: Option<(i64, u64)>,
}

/// Builds the typed project from element events.
#[derive(Default)]
pub(super) struct TreeBuilder {
    depth: usize,
    pub fps: Option<f64>,
    pub labels: Vec<Label>,
    pub diagnostics: Vec<String>,
    pub tree: ProjectTree,
    in_track: bool,
    track_block_ids: HashSet<i64>,
    clips: Vec<usize>,
    sequence: Option<OpenSequence>,
}

impl TreeBuilder {
    fn project(&mut self, element: &Element) -> Result<()> {
        if element.name != "project" {
            return Err(malformed(format!("root element is <{}>, expected <project>", element.name)));
        }

        let rate = element
            .get("rate")
            .and_then(Value::as_f64)
            .ok_or_else(|| malformed("project has no rate"))?;
        if !(rate > 0.0 && rate.is_finite()) {
            return Err(malformed(format!("project rate {} is not positive", rate)));
        }

        self.fps = Some(rate);
        Ok(())
    }

    fn wave_track(&mut self, element: &Element) -> Result<()> {
        let rate = match element.get("rate") {
            Some(x) => x.as_f64().ok_or_else(|| malformed("wavetrack rate is not a number"))?,
            None => self.fps.unwrap_or_default(),
        };
        if !(rate > 0.0 && rate.is_finite()) {
            return Err(malformed(format!("wavetrack rate {} is not positive", rate)));
        }

        self.tree.tracks.push(WaveTrack {
            name: element.get("name").and_then(Value::as_str).unwrap_or_default().to_owned(),
            channel: element.get("channel").and_then(Value::as_i64).unwrap_or_default(),
            rate,
            clips: Vec::new(),
            blocks: Vec::new(),
        });
        self.in_track = true;
        self.track_block_ids.clear();
        Ok(())
    }

    fn wave_clip(&mut self, element: &Element) -> Result<()> {
        let cutline = !self.clips.is_empty();
        let seconds = |name: &str| element.get(name).and_then(Value::as_f64).unwrap_or_default();

        let track = self.current_track("waveclip")?;
        track.clips.push(WaveClip {
            offset: seconds("offset"),
            trim_left: seconds("trimLeft"),
            trim_right: seconds("trimRight"),
            num_samples: 0,
            cutline,
        });
        let index = track.clips.len() - 1;
        self.clips.push(index);
        Ok(())
    }

    fn sequence(&mut self, element: &Element) -> Result<()> {
        let clip = *self.clips.last().ok_or_else(|| malformed("sequence outside of a waveclip"))?;

        let format = match element.get("sampleformat") {
            Some(x) => {
                let tag = x.as_i64().ok_or_else(|| malformed("sequence sampleformat is not an integer"))?;
                SampleFormat::try_from(tag).map_err(|_| malformed(format!("sequence has unknown sample format {:#x}", tag)))?
            }
            None => SampleFormat::Float,
        };
        let num_samples = required_count(element, "numsamples")?;

        self.current_track("sequence")?.clips[clip].num_samples = num_samples;
        self.sequence = Some(OpenSequence {
            format,
            num_samples,
            clip,
            block: None,
        });
        Ok(())
    }

    fn wave_block(&mut self, element: &Element) -> Result<()> {
        let mut sequence = self.sequence.ok_or_else(|| malformed("waveblock outside of a sequence"))?;
        let start = required_count(element, "start")?;
        let id = element
            .get("blockid")
            .and_then(Value::as_i64)
            .ok_or_else(|| malformed("waveblock has no blockid"))?;

        if let Some(previous) = sequence.block.replace((id, start)) {
            self.push_block(&sequence, previous, start)?;
        }
        self.sequence = Some(sequence);
        Ok(())
    }

    fn end_sequence(&mut self) -> Result<()> {
        if let Some(sequence) = self.sequence.take() {
            if let Some(last) = sequence.block {
                self.push_block(&sequence, last, sequence.num_samples)?;
            }
        }
        Ok(())
    }

    fn push_block(&mut self, sequence: &OpenSequence, (id, start): (i64, u64), end: u64) -> Result<()> {
        if end < start {
            return Err(malformed(format!("block {} starting at sample {} overlaps the next block at {}", id, start, end)));
        }
        if id < 0 && id.unsigned_abs() != end - start {
            return Err(malformed(format!("silent block {} spans {} samples", id, end - start)));
        }
        let sample_count = usize::try_from(end - start).map_err(|_| malformed(format!("block {} is too large", id)))?;

        if id >= 0 && !self.track_block_ids.insert(id) {
            let track = self.current_track("waveblock")?;
            return Err(malformed(format!("block {} appears twice in track \"{}\"", id, track.name)));
        }

        self.current_track("waveblock")?.blocks.push(BlockDescriptor {
            id,
            sample_format: sequence.format,
            sample_count,
            start,
            clip: sequence.clip,
        });
        Ok(())
    }

    fn label(&mut self, element: &Element) {
        let title = element.get("title").map(Value::to_string).unwrap_or_default();
        let start = element.get("t").and_then(Value::as_f64);
        let stop = element.get("t1").and_then(Value::as_f64);

        let message = match (start, stop) {
            (Some(start), Some(stop)) if stop >= start => {
                self.labels.push(Label::new(title, start, stop));
                return;
            }
            (Some(start), Some(stop)) => format!("label '{}' ends before it starts ({} < {}), skipped", title, stop, start),
            _ => format!("label '{}' has no t/t1 time, skipped", title),
        };

        log::warn!("{}", message);
        self.diagnostics.push(message);
    }

    fn current_track(&mut self, child: &str) -> Result<&mut WaveTrack> {
        match self.tree.tracks.last_mut() {
            Some(x) if self.in_track => Ok(x),
            _ => Err(malformed(format!("{} outside of a wavetrack", child))),
        }
    }
}

impl DocumentVisitor for TreeBuilder {
    fn start_element(&mut self, element: &Element) -> Result<()> {
        if self.depth == 0 {
            if self.fps.is_some() {
                return Err(malformed(format!("second root element <{}>", element.name)));
            }
            self.project(element)?;
        }
        self.depth += 1;

        match element.name.as_str() {
            "wavetrack" => self.wave_track(element),
            "waveclip" => self.wave_clip(element),
            "sequence" => self.sequence(element),
            "waveblock" => self.wave_block(element),
            "label" => {
                self.label(element);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn end_element(&mut self, name: &str) -> Result<()> {
        self.depth -= 1;

        match name {
            "sequence" => self.end_sequence(),
            "waveclip" => {
                self.clips.pop();
                Ok(())
            }
            "wavetrack" => {
                self.in_track = false;
                self.clips.clear();
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn required_count(element: &Element, name: &str) -> Result<u64> {
    let value = element
        .get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| malformed(format!("<{}> has no {}", element.name, name)))?;
    u64::try_from(value).map_err(|_| malformed(format!("<{}> {} is negative", element.name, name)))
}

fn malformed(message: impl Into<String>) -> Aup3Error {
    Aup3Error::MalformedProject(message.into())
}
