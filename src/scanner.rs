use std::ops::Range;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;
use crate::resolver;
use crate::types::Marker;

/// Closing sequence for a marker value.
const CLOSE: &str = "]]";
/// Marker start token.
const OPEN: char = '[';

/// A `[tag[value]]` token that closed properly but did not parse.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RejectedMarker {
    /// One-based line of the token start.
    pub line: u32,
    /// Why parsing failed.
    pub reason: String,
    /// Byte span of the token.
    pub span: Range<usize>,
    /// Tag as written.
    pub tag: String,
    /// Value as written.
    pub value: String,
}

/// Result of one scan pass over a text blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ScanOutput {
    /// Well-formed tokens that were left as literal text.
    pub rejected: Vec<RejectedMarker>,
    /// Ordered literal and marker segments covering the whole input.
    pub segments: Vec<Segment>,
}

impl ScanOutput {
    /// Recognized markers in source order.
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        return self.segments.iter().filter_map(|s| {
            return match s {
                Segment::Literal { .. } => None,
                Segment::Marker(m) => Some(m),
            };
        });
    }

    /// Append literal text, merging with a preceding literal.
    fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Literal { text: last }) = self.segments.last_mut() {
            last.push_str(text);
            return;
        }
        self.segments.push(Segment::Literal { text: text.to_string() });
    }

    /// Rebuild the text with every marker replaced by `render(marker)`.
    /// Literal segments are copied unchanged.
    pub fn substitute(&self, mut render: impl FnMut(&Marker) -> String) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal { text } => out.push_str(text),
                Segment::Marker(m) => out.push_str(&render(m)),
            }
        }
        return out;
    }
}

/// A text file and what scanning it found.
#[derive(Debug)]
pub struct ScannedFile {
    /// Scan result for the file's contents.
    pub output: ScanOutput,
    /// Path relative to the scan root.
    pub path: PathBuf,
}

/// A piece of scanned text: either verbatim literal or a recognized marker.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "segment", rename_all = "snake_case")]
pub enum Segment {
    /// Text copied verbatim, including any rejected marker spans.
    Literal {
        /// The literal text.
        text: String,
    },
    /// A marker whose value parsed into a reference.
    Marker(Marker),
}

/// Scanner states. Each capture state remembers where its token started.
enum State {
    /// Copying literal text.
    Scanning,
    /// Inside `[tag`, waiting for the value's `[`.
    TypeCapture {
        /// Line of the opening `[`.
        line: u32,
        /// Byte offset of the opening `[`.
        start: usize,
        /// Byte offset of the first tag character.
        tag_start: usize,
    },
    /// Inside `[tag[value`, waiting for `]]`.
    ValueCapture {
        /// Line of the opening `[`.
        line: u32,
        /// Byte offset of the opening `[`.
        start: usize,
        /// Byte range of the tag.
        tag: Range<usize>,
        /// Byte offset of the first value character.
        value_start: usize,
    },
}

/// A closed `[tag[value]]` token, located in the scanned text.
struct Token {
    /// One-based line of the opening `[`.
    line: u32,
    /// Byte span of the whole token.
    span: Range<usize>,
    /// Byte range of the tag.
    tag: Range<usize>,
    /// Byte range of the value.
    value: Range<usize>,
}

/// Parse a closed token and emit it as a marker, or record it as rejected.
fn emit(out: &mut ScanOutput, text: &str, pending: &mut usize, token: Token) {
    let Token { line, span, tag, value } = token;
    let tag = text.get(tag).unwrap_or_default();
    let value = text.get(value).unwrap_or_default();

    match resolver::parse_reference(tag, value) {
        Ok(reference) => {
            out.push_literal(text.get(*pending..span.start).unwrap_or_default());
            *pending = span.end;
            out.segments.push(Segment::Marker(Marker {
                line,
                reference,
                span,
                tag: tag.to_string(),
                value: value.to_string(),
            }));
        },
        Err(e) => {
            tracing::debug!(tag, value, line, "marker left as literal text: {e}");
            out.rejected.push(RejectedMarker {
                line,
                reason: e.to_string(),
                span,
                tag: tag.to_string(),
                value: value.to_string(),
            });
        },
    }
}

/// Characters allowed in a marker tag.
const fn is_tag_char(c: char) -> bool {
    return c.is_ascii_alphanumeric() || c == '_';
}

/// Scan text left to right for `[tag[value]]` markers.
///
/// Malformed, unrecognized, and unclosed tokens stay literal text, so the
/// concatenation of all literal text and marker spans always equals the input.
pub fn scan(text: &str) -> ScanOutput {
    let mut out = ScanOutput::default();
    let mut state = State::Scanning;
    // Start of text not yet emitted as a literal.
    let mut pending = 0_usize;
    let mut line = 1_u32;
    let mut iter = text.char_indices().peekable();

    while let Some((pos, c)) = iter.next() {
        state = match state {
            State::Scanning => {
                let next_is_tag = iter.peek().is_some_and(|(_, n)| return is_tag_char(*n));
                if c == OPEN && next_is_tag {
                    State::TypeCapture { line, start: pos, tag_start: pos.saturating_add(1) }
                } else {
                    State::Scanning
                }
            },
            State::TypeCapture { line: open_line, start, tag_start } => {
                if is_tag_char(c) {
                    State::TypeCapture { line: open_line, start, tag_start }
                } else if c == OPEN {
                    State::ValueCapture {
                        line: open_line,
                        start,
                        tag: tag_start..pos,
                        value_start: pos.saturating_add(1),
                    }
                } else {
                    // Not a marker; the span so far stays pending literal text.
                    State::Scanning
                }
            },
            State::ValueCapture { line: open_line, start, tag, value_start } => {
                let closes = c == ']' && iter.peek().is_some_and(|(_, n)| return *n == ']');
                if closes {
                    iter.next();
                    let token = Token {
                        line: open_line,
                        span: start..pos.saturating_add(CLOSE.len()),
                        tag,
                        value: value_start..pos,
                    };
                    emit(&mut out, text, &mut pending, token);
                    State::Scanning
                } else {
                    State::ValueCapture { line: open_line, start, tag, value_start }
                }
            },
        };
        if c == '\n' {
            line = line.saturating_add(1);
        }
    }

    // Unclosed captures are flushed as literal text.
    out.push_literal(text.get(pending..).unwrap_or_default());
    return out;
}

/// Scan all markdown and plain-text files under `root` for markers.
/// Applies the config's include/exclude filters. Results are sorted by path.
///
/// # Errors
///
/// Returns `Error::Io` if any selected file cannot be read.
pub fn scan_tree(root: &Path, config: &Config) -> Result<Vec<ScannedFile>, Error> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file())
        .filter(|e| return e.path().extension().is_some_and(|ext| return ext == "md" || ext == "txt"))
    {
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();

        if !config.should_scan(&relative.to_string_lossy()) {
            continue;
        }

        let content = std::fs::read_to_string(path)?;
        files.push(ScannedFile {
            output: scan(&content),
            path: relative,
        });
    }

    files.sort_by(|a, b| return a.path.cmp(&b.path));
    tracing::debug!(files = files.len(), root = %root.display(), "scanned tree");
    return Ok(files);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, reason = "test assertions")]
mod tests {
    use super::*;
    use crate::types::{AnnotationKind, Reference, ScriptureRef};

    fn literal(text: &str) -> Segment {
        return Segment::Literal { text: text.to_string() };
    }

    fn rebuilt(text: &str, out: &ScanOutput) -> String {
        return out.substitute(|m| return text[m.span.clone()].to_string());
    }

    #[test]
    fn scenario_d_two_markers_with_surrounding_text() {
        let text = "See [SCRIPTURE[genesis:1:1]] and [study[f1]].";
        let out = scan(text);

        let markers: Vec<&Marker> = out.markers().collect();
        assert_eq!(markers.len(), 2);
        assert_eq!(
            markers[0].reference,
            Reference::Scripture(ScriptureRef {
                book_id: "genesis".to_string(),
                chapter: 1,
                verse_end: None,
                verse_start: Some(1),
            })
        );
        assert_eq!(
            markers[1].reference,
            Reference::Annotation { id: "f1".to_string(), kind: AnnotationKind::Study }
        );
        assert_eq!(&text[markers[0].span.clone()], "[SCRIPTURE[genesis:1:1]]");
        assert_eq!(&text[markers[1].span.clone()], "[study[f1]]");

        let replaced = out.substitute(|m| return format!("<{}>", m.tag));
        assert_eq!(replaced, "See <SCRIPTURE> and <study>.");
        assert!(out.rejected.is_empty());
    }

    #[test]
    fn scenario_e_unknown_marker_stays_literal() {
        let text = "before [UNKNOWN[xyz]] after";
        let out = scan(text);
        assert_eq!(out.markers().count(), 0);
        assert_eq!(out.segments, vec![literal(text)]);
        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].tag, "UNKNOWN");
        assert_eq!(out.substitute(|_| return String::new()), text);
    }

    #[test]
    fn reversed_scripture_range_stays_literal() {
        let text = "[SCRIPTURE[genesis:1:11-9]]";
        let out = scan(text);
        assert_eq!(out.markers().count(), 0);
        assert_eq!(out.segments, vec![literal(text)]);
        assert!(out.rejected[0].reason.contains("invalid verse range"));
    }

    #[test]
    fn aborted_tag_capture_resumes_scanning() {
        let text = "[see [study[f1]] now";
        let out = scan(text);
        let markers: Vec<&Marker> = out.markers().collect();
        assert_eq!(markers.len(), 1);
        assert_eq!(&text[markers[0].span.clone()], "[study[f1]]");
        assert_eq!(out.segments[0], literal("[see "));
        assert_eq!(rebuilt(text, &out), text);
    }

    #[test]
    fn doubled_open_bracket_starts_marker_at_second() {
        let text = "[[book[john]]";
        let out = scan(text);
        let markers: Vec<&Marker> = out.markers().collect();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].span, 1..text.len());
        assert_eq!(out.segments[0], literal("["));
    }

    #[test]
    fn single_close_bracket_is_part_of_value() {
        let out = scan("[study[a]b]]");
        assert_eq!(out.markers().count(), 0);
        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].value, "a]b");
    }

    #[test]
    fn unclosed_marker_is_flushed_as_literal() {
        let text = "tail [study[f1] and no close";
        let out = scan(text);
        assert_eq!(out.segments, vec![literal(text)]);
        assert!(out.rejected.is_empty());
    }

    #[test]
    fn bracket_without_tag_is_plain_text() {
        let text = "a [ b ] c [1] d";
        let out = scan(text);
        assert_eq!(out.segments, vec![literal(text)]);
    }

    #[test]
    fn line_numbers_are_one_based() {
        let out = scan("first\nsecond [book[acts]]\n[UNKNOWN[x]]");
        assert_eq!(out.markers().next().unwrap().line, 2);
        assert_eq!(out.rejected[0].line, 3);
    }

    #[test]
    fn marker_spanning_lines_reports_its_opening_line() {
        let text = "one\n[UNKNOWN[a\nb]]\nthree\n\n[study[f2]]";
        let out = scan(text);
        assert_eq!(out.rejected[0].line, 2, "rejected token opens on line 2");
        assert_eq!(out.markers().next().unwrap().line, 6, "newline inside a value still counts");
    }

    #[test]
    fn multibyte_text_keeps_byte_spans_valid() {
        let text = "Ἐν ἀρχῇ [SCRIPTURE[john:1:1]] ἦν ὁ λόγος";
        let out = scan(text);
        let marker = out.markers().next().unwrap();
        assert_eq!(&text[marker.span.clone()], "[SCRIPTURE[john:1:1]]");
        assert_eq!(rebuilt(text, &out), text);
    }

    #[test]
    fn empty_input() {
        assert_eq!(scan(""), ScanOutput::default());
    }
}
