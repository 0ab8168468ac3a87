//! Property-Based Tests
//!
//! Invariants of the markdown structurer over generated inputs:
//! - `raw_content` is a lossless line split of the input
//! - header-only input round-trips through `raw_content`
//! - the tree only holds what the markers put there
//!
//! These complement the unit tests in `src/structure.rs`.

use docsift::{structure, Document};
use proptest::prelude::*;

/// A line as the analysis service might emit it.
fn line() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z0-9 ]{0,20}".prop_map(|t| format!("# {t}")),
        "[A-Za-z0-9 ]{0,20}".prop_map(|t| format!("## {t}")),
        "[A-Za-z ]{0,20}".prop_map(|t| format!("**Asset Type:** {t}")),
        "[A-Za-z ]{0,20}".prop_map(|t| format!("**Description:** {t}")),
        "[A-Za-z0-9]{0,8}".prop_map(|t| format!("**Tag:** {t}")),
        "[A-Za-z ]{0,20}".prop_map(|t| format!("Original: {t}")),
        "[A-Za-z ]{0,20}".prop_map(|t| format!("Analyzed: {t}")),
        "[^\n]{0,40}",
        Just(String::new()),
    ]
}

fn markdown() -> impl Strategy<Value = String> {
    prop::collection::vec(line(), 0..40).prop_map(|lines| lines.join("\n"))
}

fn headings(doc: &Document) -> Vec<(String, Vec<String>)> {
    doc.sections
        .iter()
        .map(|s| {
            (
                s.title.clone(),
                s.subsections.iter().map(|sub| sub.title.clone()).collect(),
            )
        })
        .collect()
}

// ============================================================================
// raw_content Properties
// ============================================================================

/// Property: one raw line per `'\n'`-split, joined back to the input
#[test]
fn proptest_raw_content_is_lossless() {
    proptest!(|(text in "(.|\n){0,500}")| {
        let doc = structure(&text);
        prop_assert_eq!(doc.raw_content.len(), text.split('\n').count());
        prop_assert_eq!(doc.raw_content.join("\n"), text);
    });
}

/// Property: structured input never panics and always serialises
#[test]
fn proptest_structured_lines_serialise() {
    proptest!(|(text in markdown())| {
        let doc = structure(&text);
        let json = serde_json::to_string(&doc);
        prop_assert!(json.is_ok(), "Document should serialise");
        let back: Document = serde_json::from_str(&json.unwrap()).unwrap();
        prop_assert_eq!(back, doc);
    });
}

// ============================================================================
// Tree Properties
// ============================================================================

/// Property: restructuring the raw lines of a header-only input yields the
/// same titles in the same order
#[test]
fn proptest_headers_round_trip() {
    let header = prop_oneof![
        "[A-Za-z0-9]{1,12}".prop_map(|t| format!("# {t}")),
        "[A-Za-z0-9]{1,12}".prop_map(|t| format!("## {t}")),
    ];
    proptest!(|(lines in prop::collection::vec(header, 0..30))| {
        let text = lines.join("\n");
        let first = structure(&text);
        let second = structure(&first.raw_content.join("\n"));
        prop_assert_eq!(headings(&first), headings(&second));

        let expected: Vec<&str> = lines
            .iter()
            .filter_map(|l| l.strip_prefix("# "))
            .collect();
        let titles: Vec<&str> = first.sections.iter().map(|s| s.title.as_str()).collect();
        prop_assert_eq!(titles, expected);
    });
}

/// Property: without a `"# "` line there are no sections
#[test]
fn proptest_no_section_header_no_sections() {
    proptest!(|(lines in prop::collection::vec(line(), 0..40))| {
        let text = lines
            .iter()
            .map(|l| if l.starts_with("# ") { format!("x{l}") } else { l.clone() })
            .collect::<Vec<_>>()
            .join("\n");
        let doc = structure(&text);
        prop_assert!(doc.sections.is_empty());
        prop_assert!(doc.is_empty());
    });
}

/// Property: every asset was declared by an asset-type line after a section
/// header, so there are never more assets than such lines
#[test]
fn proptest_asset_count_bounded_by_markers() {
    proptest!(|(text in markdown())| {
        let doc = structure(&text);
        let markers = text
            .split('\n')
            .filter(|l| l.starts_with("**Asset Type:**"))
            .count();
        prop_assert!(doc.asset_count() <= markers);
        prop_assert_eq!(doc.assets().count(), doc.asset_count());
    });
}

/// Property: plain lines inside a subsection accumulate, newline-separated
#[test]
fn proptest_free_text_appends() {
    let word_line = "[a-z]{1,10}( [a-z]{1,10}){0,3}";
    proptest!(|(lines in prop::collection::vec(word_line, 1..15))| {
        let text = format!("# S\n## T\n{}", lines.join("\n"));
        let doc = structure(&text);
        prop_assert_eq!(doc.sections.len(), 1);
        prop_assert_eq!(&doc.sections[0].subsections[0].analyzed_text, &lines.join("\n"));
    });
}

/// Property: the last Original: line wins
#[test]
fn proptest_original_overwrites() {
    proptest!(|(values in prop::collection::vec("[A-Za-z]{1,12}", 1..6))| {
        let body: Vec<String> = values.iter().map(|v| format!("Original: {v}")).collect();
        let text = format!("# S\n## T\n{}", body.join("\n"));
        let doc = structure(&text);
        let sub = &doc.sections[0].subsections[0];
        prop_assert_eq!(&sub.original_text, values.last().unwrap());
        prop_assert_eq!(&sub.analyzed_text, "");
    });
}
