//! Markdown structurer: a one-pass state machine from lines to a [`Document`].
//!
//! The analysis service answers with a loosely formatted markdown body:
//!
//! ```text
//! # Intro
//! ## Overview
//! Original: raw text
//! Analyzed: clean text
//! **Asset Type:** Image
//! **Description:** A diagram
//! **Tag:** fig1
//! ```
//!
//! This module does not try to be a markdown parser. Each line is classified
//! by a fixed set of prefixes ([`LineKind::classify`]) and fed to a
//! [`Structurer`], which holds at most one open section and one open
//! subsection. Both are flushed lazily: a section reaches the output only when
//! the next `# ` header arrives or input ends.
//!
//! The pass is total. Lines that make no sense in the current state (an asset
//! before any section, a `## ` header at the top of the file, prose with no
//! open subsection) are dropped from the tree but are still echoed verbatim
//! into [`Document::raw_content`].

use crate::document::{Asset, Document, Section, Subsection};
use tracing::debug;

const SECTION_MARKER: &str = "# ";
const SUBSECTION_MARKER: &str = "## ";
const ASSET_TYPE_MARKER: &str = "**Asset Type:**";
const ASSET_DESCRIPTION_MARKER: &str = "**Description:**";
const ASSET_TAG_MARKER: &str = "**Tag:**";
const ORIGINAL_MARKER: &str = "Original:";
const ANALYZED_MARKER: &str = "Analyzed:";

/// Restructure a complete markdown body.
///
/// The input is split on `'\n'`, so an empty string is one empty line and a
/// trailing newline yields a final empty line in `raw_content`. A `'\r'` left
/// over from CRLF input stays in the raw line and is removed from titles and
/// text by trimming.
pub fn structure(markdown: &str) -> Document {
    let mut structurer = Structurer::new();
    for line in markdown.split('\n') {
        structurer.push_line(line);
    }
    let doc = structurer.finish();
    debug!(
        "Structured {} lines into {} sections, {} subsections, {} assets",
        doc.raw_content.len(),
        doc.sections.len(),
        doc.subsection_count(),
        doc.asset_count()
    );
    doc
}

/// How a single line is interpreted, before looking at parser state.
///
/// Variants borrow the trimmed remainder after the marker. Classification is
/// by prefix, case-sensitive, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    SectionHeader(&'a str),
    SubsectionHeader(&'a str),
    AssetType(&'a str),
    AssetDescription(&'a str),
    AssetTag(&'a str),
    Original(&'a str),
    Analyzed(&'a str),
    /// Any other non-blank line, trimmed.
    Text(&'a str),
    Blank,
}

impl<'a> LineKind<'a> {
    pub fn classify(line: &'a str) -> Self {
        let markers: [(&str, fn(&'a str) -> LineKind<'a>); 7] = [
            (SECTION_MARKER, LineKind::SectionHeader),
            (SUBSECTION_MARKER, LineKind::SubsectionHeader),
            (ASSET_TYPE_MARKER, LineKind::AssetType),
            (ASSET_DESCRIPTION_MARKER, LineKind::AssetDescription),
            (ASSET_TAG_MARKER, LineKind::AssetTag),
            (ORIGINAL_MARKER, LineKind::Original),
            (ANALYZED_MARKER, LineKind::Analyzed),
        ];

        for (marker, kind) in markers {
            if let Some(rest) = line.strip_prefix(marker) {
                return kind(rest.trim());
            }
        }

        match line.trim() {
            "" => LineKind::Blank,
            text => LineKind::Text(text),
        }
    }
}

/// Incremental builder behind [`structure`].
///
/// Feed lines in order with [`push_line`](Self::push_line), then call
/// [`finish`](Self::finish) to flush whatever is still open.
#[derive(Debug, Default)]
pub struct Structurer {
    sections: Vec<Section>,
    raw_content: Vec<String>,
    current_section: Option<Section>,
    current_subsection: Option<Subsection>,
    /// Index of the most recent asset in `current_section.assets`.
    last_asset: Option<usize>,
}

impl Structurer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sections closed so far. The open section is not included.
    pub fn closed_sections(&self) -> &[Section] {
        &self.sections
    }

    /// Title of the section currently accepting content, if any.
    pub fn open_section(&self) -> Option<&str> {
        self.current_section.as_ref().map(|s| s.title.as_str())
    }

    /// Title of the subsection currently accepting text, if any.
    pub fn open_subsection(&self) -> Option<&str> {
        self.current_subsection.as_ref().map(|s| s.title.as_str())
    }

    pub fn push_line(&mut self, line: &str) {
        self.raw_content.push(line.to_string());

        match LineKind::classify(line) {
            LineKind::SectionHeader(title) => {
                self.close_section();
                self.current_section = Some(Section::new(title));
            }
            LineKind::SubsectionHeader(title) => {
                if self.current_section.is_some() {
                    self.close_subsection();
                    self.current_subsection = Some(Subsection::new(title));
                }
            }
            LineKind::AssetType(asset_type) => {
                if let Some(section) = self.current_section.as_mut() {
                    section.assets.push(Asset::new(asset_type));
                    self.last_asset = Some(section.assets.len() - 1);
                }
            }
            LineKind::AssetDescription(description) => {
                if let Some(asset) = self.last_asset_mut() {
                    asset.description = description.to_string();
                }
            }
            LineKind::AssetTag(tag) => {
                if let Some(asset) = self.last_asset_mut() {
                    asset.tag = tag.to_string();
                }
            }
            LineKind::Original(text) => {
                if let Some(sub) = self.current_subsection.as_mut() {
                    sub.original_text = text.to_string();
                }
            }
            LineKind::Analyzed(text) => {
                if let Some(sub) = self.current_subsection.as_mut() {
                    sub.analyzed_text = text.to_string();
                }
            }
            LineKind::Text(text) => {
                if let Some(sub) = self.current_subsection.as_mut() {
                    if !sub.analyzed_text.is_empty() {
                        sub.analyzed_text.push('\n');
                    }
                    sub.analyzed_text.push_str(text);
                }
            }
            LineKind::Blank => {}
        }
    }

    /// Flush the open subsection and section and return the document.
    pub fn finish(mut self) -> Document {
        self.close_section();
        Document {
            sections: self.sections,
            raw_content: self.raw_content,
        }
    }

    fn last_asset_mut(&mut self) -> Option<&mut Asset> {
        let idx = self.last_asset?;
        self.current_section.as_mut()?.assets.get_mut(idx)
    }

    fn close_subsection(&mut self) {
        if let (Some(sub), Some(section)) =
            (self.current_subsection.take(), self.current_section.as_mut())
        {
            section.subsections.push(sub);
        }
    }

    fn close_section(&mut self) {
        self.close_subsection();
        if let Some(section) = self.current_section.take() {
            self.sections.push(section);
        }
        self.last_asset = None;
    }
}
