//! The structured document model produced by [`crate::structure::structure`].
//!
//! A [`Document`] is a two-level tree: sections keyed by level-1 headers,
//! each owning its subsections (level-2 headers) and the assets declared
//! while it was open. The verbatim input lines travel alongside in
//! [`Document::raw_content`] so a viewer can always fall back to the exact
//! text the analysis service returned.
//!
//! All types are plain owned values with serde support; the JSON shape is
//! the one the web front-end consumes:
//!
//! ```json
//! {
//!   "sections": [
//!     {
//!       "title": "Intro",
//!       "subsections": [{ "title": "Overview", "original_text": "", "analyzed_text": "" }],
//!       "assets": [{ "type": "Image", "description": "", "tag": "" }]
//!     }
//!   ],
//!   "raw_content": ["# Intro", "## Overview"]
//! }
//! ```

use serde::{Deserialize, Serialize};

/// A markdown response restructured into sections, plus its raw lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Sections in the order their level-1 headers appeared.
    pub sections: Vec<Section>,

    /// Every input line, verbatim, including blank lines.
    pub raw_content: Vec<String>,
}

/// A top-level grouping opened by a `# ` header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub subsections: Vec<Subsection>,
    pub assets: Vec<Asset>,
}

/// A grouping nested under a section, opened by a `## ` header.
///
/// `original_text` holds the source wording reported by the analysis service;
/// `analyzed_text` holds its cleaned-up reading plus any free-form lines that
/// followed inside the subsection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsection {
    pub title: String,
    pub original_text: String,
    pub analyzed_text: String,
}

/// A non-text artefact (figure, table image, diagram) declared in a section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(rename = "type")]
    pub asset_type: String,
    pub description: String,
    pub tag: String,
}

impl Section {
    pub(crate) fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

impl Subsection {
    pub(crate) fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

impl Asset {
    pub(crate) fn new(asset_type: impl Into<String>) -> Self {
        Self {
            asset_type: asset_type.into(),
            ..Default::default()
        }
    }
}

impl Document {
    /// `true` when no level-1 header was found.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// First section whose title matches exactly.
    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }

    /// All assets across all sections, in document order.
    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.sections.iter().flat_map(|s| s.assets.iter())
    }

    pub fn subsection_count(&self) -> usize {
        self.sections.iter().map(|s| s.subsections.len()).sum()
    }

    pub fn asset_count(&self) -> usize {
        self.sections.iter().map(|s| s.assets.len()).sum()
    }

    /// Render the tree as indented plain text for terminal display.
    ///
    /// ```text
    /// § Intro
    ///   ├─ Overview
    ///   │    original: raw text
    ///   │    analyzed: clean text
    ///   └─ [Image] A diagram (fig1)
    /// ```
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str("§ ");
            out.push_str(&section.title);
            out.push('\n');

            let total = section.subsections.len() + section.assets.len();
            let mut n = 0;

            for sub in &section.subsections {
                n += 1;
                let (branch, rail) = if n == total { ("└─", " ") } else { ("├─", "│") };
                out.push_str(&format!("  {branch} {}\n", sub.title));
                if !sub.original_text.is_empty() {
                    push_field(&mut out, rail, "original", &sub.original_text);
                }
                if !sub.analyzed_text.is_empty() {
                    push_field(&mut out, rail, "analyzed", &sub.analyzed_text);
                }
            }

            for asset in &section.assets {
                n += 1;
                let branch = if n == total { "└─" } else { "├─" };
                out.push_str(&format!("  {branch} [{}]", asset.asset_type));
                if !asset.description.is_empty() {
                    out.push(' ');
                    out.push_str(&asset.description);
                }
                if !asset.tag.is_empty() {
                    out.push_str(&format!(" ({})", asset.tag));
                }
                out.push('\n');
            }
        }
        out
    }
}

/// Multi-line values are continued under the label, aligned.
fn push_field(out: &mut String, rail: &str, label: &str, value: &str) {
    let mut lines = value.split('\n');
    if let Some(first) = lines.next() {
        out.push_str(&format!("  {rail}    {label}: {first}\n"));
    }
    let pad = " ".repeat(label.len() + 2);
    for line in lines {
        out.push_str(&format!("  {rail}    {pad}{line}\n"));
    }
}
