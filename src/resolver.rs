//! Marker value parsing and reference-to-target mapping.

use crate::config::Routes;
use crate::error::Error;
use crate::types::{
    AnnotationKind, AnnotationLookupRequest, NavigationTarget, Reference, ScriptureRef, Target,
    parse_positive,
};

/// Marker tag for scripture references.
pub const SCRIPTURE_TAG: &str = "SCRIPTURE";
/// Marker tag for whole-book links.
pub const BOOK_TAG: &str = "book";
/// Marker tag for library work/node links.
pub const LIBRARY_TAG: &str = "library";

/// Parse a marker's `(tag, value)` into a structured reference.
/// Tags are case-sensitive and must match the wire format exactly.
///
/// # Errors
///
/// Returns `Error::UnrecognizedMarkerType` for unknown tags,
/// `Error::InvalidVerseRange` for bad scripture numbers or reversed ranges,
/// or `Error::MalformedMarkerValue` when the value fails the tag's shape check.
pub fn parse_reference(tag: &str, value: &str) -> Result<Reference, Error> {
    if let Some(kind) = AnnotationKind::from_tag(tag) {
        let id = parse_opaque_id(tag, value)?;
        return Ok(Reference::Annotation { id, kind });
    }

    return match tag {
        SCRIPTURE_TAG => Ok(Reference::Scripture(parse_scripture_value(value)?)),
        BOOK_TAG => Ok(Reference::Book {
            book_id: parse_book_id(tag, value)?,
        }),
        LIBRARY_TAG => parse_library_value(value),
        _ => Err(Error::UnrecognizedMarkerType { tag: tag.to_string() }),
    };
}

/// Parse `book:chapter`, `book:chapter:verse`, or `book:chapter:start-end`.
/// Range ordering is validated here: `end < start` is rejected.
///
/// # Errors
///
/// Returns `Error::InvalidVerseRange` for non-numeric, zero, or reversed numbers,
/// or `Error::MalformedMarkerValue` for a missing book or wrong part count.
pub fn parse_scripture_value(value: &str) -> Result<ScriptureRef, Error> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    let (book, chapter, verses) = match parts.as_slice() {
        [book, chapter] => (*book, *chapter, None),
        [book, chapter, verses] => (*book, *chapter, Some(*verses)),
        _ => {
            return Err(malformed_value(
                SCRIPTURE_TAG,
                value,
                "expected book:chapter[:verse[-end]]",
            ));
        },
    };

    let book_id = parse_book_id(SCRIPTURE_TAG, book)?;
    let chapter = parse_positive(chapter)
        .ok_or_else(|| return invalid_range(value, "chapter must be a positive integer"))?;

    let (verse_start, verse_end) = match verses {
        None => (None, None),
        Some(raw) => {
            let (start, end) = parse_verse_span(value, raw)?;
            (Some(start), end)
        },
    };

    return Ok(ScriptureRef {
        book_id,
        chapter,
        verse_end,
        verse_start,
    });
}

/// Parse `verse` or `start-end` into a start and optional end.
///
/// # Errors
///
/// Returns `Error::InvalidVerseRange` for non-numeric, zero, or reversed parts.
fn parse_verse_span(value: &str, raw: &str) -> Result<(u32, Option<u32>), Error> {
    let Some((start, end)) = raw.split_once('-') else {
        let verse =
            parse_positive(raw).ok_or_else(|| return invalid_range(value, "verse must be a positive integer"))?;
        return Ok((verse, None));
    };

    let start =
        parse_positive(start).ok_or_else(|| return invalid_range(value, "range start must be a positive integer"))?;
    let end = parse_positive(end).ok_or_else(|| return invalid_range(value, "range end must be a positive integer"))?;
    if end < start {
        return Err(invalid_range(value, &format!("end {end} is before start {start}")));
    }
    return Ok((start, Some(end)));
}

/// Parse `work_id:node_id` with an optional `#anchor` suffix.
///
/// # Errors
///
/// Returns `Error::MalformedMarkerValue` if the work or node part is missing
/// or an anchor is present but empty.
pub fn parse_library_value(value: &str) -> Result<Reference, Error> {
    let trimmed = value.trim();
    let (path, anchor) = match trimmed.split_once('#') {
        None => (trimmed, None),
        Some((_, "")) => return Err(malformed_value(LIBRARY_TAG, value, "empty anchor after `#`")),
        Some((path, anchor)) => (path, Some(anchor.to_string())),
    };

    let Some((work_id, node_id)) = path.split_once(':') else {
        return Err(malformed_value(LIBRARY_TAG, value, "expected work_id:node_id[#anchor]"));
    };
    let work_id = parse_opaque_id(LIBRARY_TAG, work_id)?;
    let node_id = parse_opaque_id(LIBRARY_TAG, node_id)?;

    return Ok(Reference::Library { anchor, node_id, work_id });
}

/// Validate a book slug: non-empty ASCII alphanumeric, normalized to lowercase.
///
/// # Errors
///
/// Returns `Error::MalformedMarkerValue` for empty or non-alphanumeric slugs.
fn parse_book_id(tag: &str, raw: &str) -> Result<String, Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(malformed_value(tag, raw, "missing book id"));
    }
    if !trimmed.chars().all(|c| return c.is_ascii_alphanumeric()) {
        return Err(malformed_value(tag, raw, "book id must be alphanumeric"));
    }
    return Ok(trimmed.to_ascii_lowercase());
}

/// Validate an opaque identifier: non-empty, no whitespace or brackets inside.
///
/// # Errors
///
/// Returns `Error::MalformedMarkerValue` for empty or whitespace-bearing IDs.
fn parse_opaque_id(tag: &str, raw: &str) -> Result<String, Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(malformed_value(tag, raw, "missing id"));
    }
    if trimmed.chars().any(|c| return c.is_whitespace() || c == '[' || c == ']') {
        return Err(malformed_value(tag, raw, "id contains whitespace or brackets"));
    }
    return Ok(trimmed.to_string());
}

/// Build a `MalformedMarkerValue` error.
fn malformed_value(tag: &str, value: &str, reason: &str) -> Error {
    return Error::MalformedMarkerValue {
        reason: reason.to_string(),
        tag: tag.to_string(),
        value: value.to_string(),
    };
}

/// Build an `InvalidVerseRange` error.
fn invalid_range(value: &str, reason: &str) -> Error {
    return Error::InvalidVerseRange {
        reason: reason.to_string(),
        value: value.to_string(),
    };
}

/// Map a reference to where activating it leads. Annotations are never
/// navigated to; they always become lookup requests.
pub fn reference_to_target(reference: &Reference, routes: &Routes) -> Target {
    return match reference {
        Reference::Annotation { id, kind } => Target::Lookup(AnnotationLookupRequest {
            id: id.clone(),
            kind: *kind,
        }),
        Reference::Book { book_id } => navigate(format!("{}/{book_id}/1", routes.scripture)),
        Reference::Library { anchor, node_id, work_id } => {
            let base = format!("{}/{work_id}/{node_id}", routes.library);
            navigate(with_anchor(base, anchor.as_deref()))
        },
        Reference::Scripture(scripture) => navigate(scripture_path(scripture, routes)),
    };
}

/// Reading path for a scripture reference, anchored at its first verse.
pub fn scripture_path(scripture: &ScriptureRef, routes: &Routes) -> String {
    let base = format!("{}/{}/{}", routes.scripture, scripture.book_id, scripture.chapter);
    let anchor = scripture.verse_start.map(|v| return format!("v{v}"));
    return with_anchor(base, anchor.as_deref());
}

/// Append `#anchor` when present.
fn with_anchor(mut base: String, anchor: Option<&str>) -> String {
    if let Some(anchor) = anchor {
        base.push('#');
        base.push_str(anchor);
    }
    return base;
}

/// Wrap a path as a navigation target.
fn navigate(path: String) -> Target {
    return Target::Navigate(NavigationTarget { path });
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    fn scripture(value: &str) -> ScriptureRef {
        return parse_scripture_value(value).unwrap();
    }

    fn path_of(target: &Target) -> &str {
        return match target {
            Target::Navigate(nav) => &nav.path,
            Target::Lookup(_) => panic!("expected navigation, got {target:?}"),
        };
    }

    #[test]
    fn scripture_whole_chapter() {
        let r = scripture("Genesis:1");
        assert_eq!(r.book_id, "genesis");
        assert_eq!(r.chapter, 1);
        assert_eq!(r.verse_start, None);
        assert_eq!(r.verse_end, None);
    }

    #[test]
    fn scripture_single_verse_and_range() {
        let single = scripture("john:3:16");
        assert_eq!((single.verse_start, single.verse_end), (Some(16), None));

        let range = scripture("genesis:1:9-11");
        assert_eq!((range.verse_start, range.verse_end), (Some(9), Some(11)));

        let same = scripture("genesis:1:9-9");
        assert_eq!((same.verse_start, same.verse_end), (Some(9), Some(9)));
    }

    #[test]
    fn reversed_range_is_rejected_at_parse_time() {
        let err = parse_scripture_value("genesis:1:11-9").unwrap_err();
        assert!(matches!(err, Error::InvalidVerseRange { .. }), "{err}");
    }

    #[test]
    fn non_numeric_or_zero_parts_are_invalid_ranges() {
        for bad in ["genesis:one", "genesis:1:x", "genesis:0", "genesis:1:0", "genesis:1:3-", "genesis:1:-3"] {
            let err = parse_scripture_value(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidVerseRange { .. }), "{bad}: {err}");
        }
    }

    #[test]
    fn wrong_shape_is_malformed_value() {
        for bad in ["genesis", ":1", "genesis:1:2:3", "gen esis:1"] {
            let err = parse_scripture_value(bad).unwrap_err();
            assert!(matches!(err, Error::MalformedMarkerValue { .. }), "{bad}: {err}");
        }
    }

    #[test]
    fn annotation_tags_become_annotation_references() {
        for kind in AnnotationKind::ALL {
            let r = parse_reference(kind.as_str(), "f1").unwrap();
            assert_eq!(r, Reference::Annotation { id: "f1".to_string(), kind });
        }
    }

    #[test]
    fn tags_are_case_sensitive() {
        assert!(matches!(parse_reference("scripture", "genesis:1"), Err(Error::UnrecognizedMarkerType { .. })));
        assert!(matches!(parse_reference("Study", "f1"), Err(Error::UnrecognizedMarkerType { .. })));
        assert!(matches!(parse_reference("UNKNOWN", "xyz"), Err(Error::UnrecognizedMarkerType { .. })));
    }

    #[test]
    fn empty_annotation_id_is_malformed() {
        assert!(matches!(parse_reference("study", " "), Err(Error::MalformedMarkerValue { .. })));
        assert!(matches!(parse_reference("study", "f 1"), Err(Error::MalformedMarkerValue { .. })));
    }

    #[test]
    fn library_values() {
        assert_eq!(
            parse_reference("library", "philokalia:vol1-ch3#p4").unwrap(),
            Reference::Library {
                anchor: Some("p4".to_string()),
                node_id: "vol1-ch3".to_string(),
                work_id: "philokalia".to_string(),
            }
        );
        assert!(parse_reference("library", "philokalia").is_err());
        assert!(parse_reference("library", "philokalia:ch1#").is_err());
        assert!(parse_reference("library", ":ch1").is_err());
    }

    #[test]
    fn targets_for_each_variant() {
        let routes = Routes::default();

        let chapter = parse_reference("SCRIPTURE", "genesis:1").unwrap();
        assert_eq!(path_of(&reference_to_target(&chapter, &routes)), "/read/genesis/1");

        let range = parse_reference("SCRIPTURE", "genesis:1:9-11").unwrap();
        assert_eq!(path_of(&reference_to_target(&range, &routes)), "/read/genesis/1#v9");

        let book = parse_reference("book", "Exodus").unwrap();
        assert_eq!(path_of(&reference_to_target(&book, &routes)), "/read/exodus/1");

        let library = parse_reference("library", "ladder:step7#p2").unwrap();
        assert_eq!(path_of(&reference_to_target(&library, &routes)), "/library/ladder/step7#p2");

        let note = parse_reference("variant", "fvar1").unwrap();
        assert_eq!(
            reference_to_target(&note, &routes),
            Target::Lookup(AnnotationLookupRequest {
                id: "fvar1".to_string(),
                kind: AnnotationKind::Variant,
            })
        );
    }

    #[test]
    fn scripture_target_keeps_book_and_chapter() {
        let routes = Routes::default();
        for (value, book, chapter) in [("psalms:50", "psalms", 50), ("1john:4:8", "1john", 4), ("John:3:16-18", "john", 3)] {
            let reference = parse_reference("SCRIPTURE", value).unwrap();
            let target = reference_to_target(&reference, &routes);
            let expected = format!("/read/{book}/{chapter}");
            assert!(path_of(&target).starts_with(&expected), "{value} -> {target:?}");
        }
    }
}
