//! Audacity's serialized project document.
//!
//! A project stores its XML tree in binary form: a `dict` blob holding the tag and
//! attribute names, followed by a `doc` blob holding the tree itself. [`parse`]
//! takes both blobs concatenated, in that order.

mod fields;
mod tree;
mod walker;
mod xml;

use crate::{Aup3Error, Label, Result};

use self::tree::TreeBuilder;

pub use self::{
    fields::{Field, Fields, RawValue},
    tree::{BlockDescriptor, ProjectTree, WaveClip, WaveTrack},
    walker::{walk, DocumentVisitor, Element, Value},
    xml::write_xml,
};

/// Everything extracted from one project document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub fps: f64,
    pub labels: Vec<Label>,
    pub tree: ProjectTree,
    /// Warnings about annotations that were skipped.
    pub diagnostics: Vec<String>,
}

pub fn parse(raw_document: &[u8]) -> Result<ParsedDocument> {
    let mut builder = TreeBuilder::default();
    walk(raw_document, &mut builder)?;

    let fps = builder
        .fps
        .ok_or_else(|| Aup3Error::MalformedProject("document has no <project> element".into()))?;

    log::debug!(
        "parsed project document: rate {}, {} labels, {} wave tracks",
        fps,
        builder.labels.len(),
        builder.tree.tracks.len()
    );

    Ok(ParsedDocument {
        fps,
        labels: builder.labels,
        tree: builder.tree,
        diagnostics: builder.diagnostics,
    })
}
