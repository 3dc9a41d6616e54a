use std::fmt::Write as _;

use crate::error::Error;
use crate::placement::PlacementWarning;
use crate::scanner::RejectedMarker;

/// ANSI bold on.
const BOLD: &str = "\x1b[1m";
/// ANSI reset.
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    print_markdown(&render_error(e));
}

/// Print markdown to stderr with bold headings.
fn print_markdown(md: &str) {
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Print dropped annotations to stderr.
pub fn print_placement_warnings(warnings: &[PlacementWarning]) {
    print_markdown(&render_placement_warnings(warnings));
}

/// Print rejected markers to stderr.
pub fn print_rejected(path: &str, rejected: &[RejectedMarker]) {
    print_markdown(&render_rejected(path, rejected));
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is one,
/// how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::InvalidVerseRange { reason, value } => render_invalid_range(value, reason),
        Error::MalformedDisplayLocation { input, reason } => render_malformed_display_location(input, reason),
        Error::MalformedMarkerValue { reason, tag, value } => render_malformed_marker(tag, value, reason),
        Error::UnrecognizedMarkerType { tag } => render_unrecognized_marker(tag),
        Error::LookupNotFound { id, kind } => format!("\
# Error: Annotation Not Found

No {kind} annotation has ID `{id}`.
"),
        Error::LookupFailed { id, kind, reason } => format!("\
# Error: Annotation Lookup Failed

Looking up {kind} `{id}` failed: {reason}
"),
        _ => render_generic(e),
    };
}

/// Fallback rendering for errors without a dedicated block.
fn render_generic(e: &Error) -> String {
    return match e {
        Error::FileNotFound { path } => format!("\
# Error: File Not Found

`{}` does not exist.
", path.display()),

        Error::StateCorrupt { path, reason } => format!("\
# Error: Reader State Corrupt

`{}` could not be read: {reason}

## Fix

Delete the file to start from default reader state, or correct the entry it names.
", path.display()),

        Error::TocMalformed { reason } => format!("\
# Error: Table of Contents Malformed

{reason}

## Fix

A table of contents needs a node without `parent_id`, or a node of type `book`.
"),

        Error::TocNodeNotFound { node_id } => format!("\
# Error: Node Not Found

No table-of-contents node has ID `{node_id}`.
"),

        Error::MalformedPassageId { input } => format!("\
# Error: Malformed Passage ID

`{input}` is not a passage ID.

## Expected

    Gen_vchap1-1
"),

        Error::NotAMarker { input } => format!("\
# Error: Not a Marker

`{input}` is not a single marker token.

## Expected

    [SCRIPTURE[genesis:1:3]]
    [study[f1]]
"),

        Error::MalformedVerseLocator { input } => format!("\
# Error: Malformed Verse Locator

`{input}` is not a verse locator.

## Expected

    genesis:1:3
"),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::Json(e) => format!("\
# Error: Invalid JSON

{e}
"),
        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}
"),
        Error::TomlSer(e) => format!("\
# Error: TOML Serialization

{e}
"),
        // Already handled in render_error, but need exhaustive match.
        _ => format!("\
# Error

{e}
"),
    };
}

/// Block for a reversed or non-numeric scripture range.
fn render_invalid_range(value: &str, reason: &str) -> String {
    return format!("\
# Error: Invalid Verse Range

`{value}`: {reason}

## Expected

    book:chapter
    book:chapter:verse
    book:chapter:start-end    (start <= end)
");
}

/// Block for an annotation placement string that does not parse.
fn render_malformed_display_location(input: &str, reason: &str) -> String {
    return format!("\
# Error: Malformed Display Location

`{input}`: {reason}

## Expected

    1:3      single verse
    1:9-11   range, shown on verse 9
    1:5a     sub-verse, shown on verse 5
");
}

/// Block for a known tag whose value has the wrong shape.
fn render_malformed_marker(tag: &str, value: &str, reason: &str) -> String {
    return format!("\
# Error: Malformed Marker

`{tag}[{value}]`: {reason}
");
}

/// Render dropped annotations from chapter placement.
pub fn render_placement_warnings(warnings: &[PlacementWarning]) -> String {
    let mut out = String::from("# Dropped annotations\n\n");
    for w in warnings {
        let _ = writeln!(out, "- `{}` at `{}`: {}", w.annotation_id, w.display_location, w.reason);
    }
    return out;
}

/// Render every rejected marker in a scanned file as one markdown block.
pub fn render_rejected(path: &str, rejected: &[RejectedMarker]) -> String {
    let mut out = format!("# Rejected markers in `{path}`\n\n");
    for r in rejected {
        let _ = writeln!(out, "- {path}:{} `[{}[{}]]`: {}", r.line, r.tag, r.value, r.reason);
    }
    return out;
}

/// Block for a tag that is not a marker type.
fn render_unrecognized_marker(tag: &str) -> String {
    return format!(
        "\
# Error: Unrecognized Marker Type

`{tag}` is not a marker type. Tags are case-sensitive.

## Known types

- `SCRIPTURE`
- `study`, `liturgical`, `variant`, `citation`, `article`
- `book`
- `library`
"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnnotationKind;

    #[test]
    fn every_block_starts_with_a_heading() {
        let errors = [
            Error::UnrecognizedMarkerType { tag: "Study".to_string() },
            Error::InvalidVerseRange {
                reason: "start after end".to_string(),
                value: "genesis:1:11-9".to_string(),
            },
            Error::LookupNotFound {
                id: "f1".to_string(),
                kind: AnnotationKind::Study,
            },
            Error::TocNodeNotFound { node_id: "n".to_string() },
        ];
        for e in &errors {
            assert!(render_error(e).starts_with("# Error"), "{e}");
        }
    }

    #[test]
    fn rejected_markers_list_file_and_line() {
        let rejected = vec![RejectedMarker {
            line: 4,
            reason: "unrecognized marker type `Study`".to_string(),
            span: 10..22,
            tag: "Study".to_string(),
            value: "f1".to_string(),
        }];
        let md = render_rejected("articles/a.md", &rejected);
        assert!(md.contains("- articles/a.md:4 `[Study[f1]]`"));
    }
}
