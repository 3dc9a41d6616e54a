//! Annotation placement: which verse an annotation renders on, and
//! chapter-wide deduplication of multi-verse annotations.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::Error;
use crate::types::{AnnotationSummary, ChapterPassages, VerseLocator, parse_positive};

/// `chapter:verse`, `chapter:start-end`, or `chapter:verseLetter`. Chapter may be empty.
static DISPLAY_LOCATION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    return Regex::new(r"^(\d*):(\d+)(?:-(\d+)|([A-Za-z]))?$").ok();
});

/// Annotations to render for each verse of one chapter.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChapterPlacement {
    /// Verse number to the annotations displayed on it.
    pub verses: BTreeMap<u32, Vec<AnnotationSummary>>,
    /// Annotations dropped for data-quality reasons.
    pub warnings: Vec<PlacementWarning>,
}

/// A parsed placement string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayLocation {
    /// Chapter the location names (or the fallback chapter when omitted).
    pub chapter: u32,
    /// Last verse of a range.
    pub end: Option<u32>,
    /// Sub-verse letter, kept only for display strings.
    pub letter: Option<char>,
    /// The verse the annotation displays on.
    pub verse: u32,
}

/// A placement string that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacementWarning {
    /// Annotation that was dropped.
    pub annotation_id: String,
    /// Its raw placement string.
    pub display_location: String,
    /// Why placement failed.
    pub reason: String,
}

/// Remove every repeat of an annotation ID after its first appearance,
/// scanning verses in ascending order. Verses keep their entries even when emptied.
pub fn dedupe_across_chapter(
    per_verse: BTreeMap<u32, Vec<AnnotationSummary>>,
) -> BTreeMap<u32, Vec<AnnotationSummary>> {
    let mut shown: HashSet<String> = HashSet::new();
    return per_verse
        .into_iter()
        .map(|(verse, annotations)| {
            let kept = annotations
                .into_iter()
                .filter(|a| return shown.insert(a.id.clone()))
                .collect();
            return (verse, kept);
        })
        .collect();
}

/// Keep the annotations that display on `target`, in input order.
/// An annotation displays on `target` only when both its chapter and its
/// display verse match; an omitted chapter means `target`'s chapter.
/// Annotations with malformed placement strings are dropped and logged.
pub fn filter_for_verse(annotations: &[AnnotationSummary], target: &VerseLocator) -> Vec<AnnotationSummary> {
    return annotations
        .iter()
        .filter(|a| {
            let location = match locate(&a.display_location, target.chapter) {
                Ok(location) => location,
                Err(e) => {
                    tracing::warn!(annotation = %a.id, verse = %target, "dropping annotation from placement: {e}");
                    return false;
                },
            };
            return location.chapter == target.chapter && location.verse == target.verse;
        })
        .cloned()
        .collect();
}

/// Parse a placement string, warning when a range runs backwards.
///
/// # Errors
///
/// Returns `Error::MalformedDisplayLocation` for unparseable input.
fn locate(display_location: &str, chapter_fallback: u32) -> Result<DisplayLocation, Error> {
    let location = parse_display_location(display_location, chapter_fallback)?;
    if let Some(end) = location.end
        && end < location.verse
    {
        tracing::warn!(display_location, "reversed verse range, placing on first listed verse");
    }
    return Ok(location);
}

/// Parse a placement string into its full shape.
///
/// # Errors
///
/// Returns `Error::MalformedDisplayLocation` when the string has no colon,
/// non-numeric or zero parts, or anything after the verse besides a single
/// letter or a `-end` range.
pub fn parse_display_location(input: &str, chapter_fallback: u32) -> Result<DisplayLocation, Error> {
    let malformed = |reason: &str| {
        return Error::MalformedDisplayLocation {
            input: input.to_string(),
            reason: reason.to_string(),
        };
    };

    let trimmed = input.trim();
    if !trimmed.contains(':') {
        return Err(malformed("missing `:` between chapter and verse"));
    }
    let Some(pattern) = DISPLAY_LOCATION.as_ref() else {
        return Err(malformed("display-location pattern unavailable"));
    };
    let Some(caps) = pattern.captures(trimmed) else {
        return Err(malformed("expected c:v, c:s-e, or c:vL"));
    };

    let chapter = match caps.get(1).map(|m| return m.as_str()) {
        None | Some("") => chapter_fallback,
        Some(raw) => parse_positive(raw).ok_or_else(|| return malformed("chapter must be positive"))?,
    };
    let verse = caps
        .get(2)
        .and_then(|m| return parse_positive(m.as_str()))
        .ok_or_else(|| return malformed("verse must be positive"))?;
    let end = caps
        .get(3)
        .map(|m| return parse_positive(m.as_str()).ok_or_else(|| return malformed("range end must be positive")))
        .transpose()?;
    let letter = caps.get(4).and_then(|m| return m.as_str().chars().next());

    return Ok(DisplayLocation { chapter, end, letter, verse });
}

/// Place every relevant embedded annotation of a chapter on exactly one verse.
pub fn place_chapter(chapter: &ChapterPassages) -> ChapterPlacement {
    let mut passages: Vec<_> = chapter.passages.iter().collect();
    passages.sort_by_key(|p| return p.verse);

    let mut warnings = Vec::new();
    let mut seen_warnings: HashSet<String> = HashSet::new();
    let mut per_verse = BTreeMap::new();

    for passage in passages {
        let relevant = passage.relevant_ids();
        let candidates: Vec<AnnotationSummary> = passage
            .annotations
            .iter()
            .flat_map(|group| return group.iter())
            .filter(|a| return relevant.contains(a.id.as_str()))
            .cloned()
            .collect();

        for a in &candidates {
            if let Err(e) = parse_display_location(&a.display_location, chapter.chapter)
                && seen_warnings.insert(a.id.clone())
            {
                warnings.push(PlacementWarning {
                    annotation_id: a.id.clone(),
                    display_location: a.display_location.clone(),
                    reason: e.to_string(),
                });
            }
        }

        let target = VerseLocator::new(&chapter.book_id, chapter.chapter, passage.verse);
        per_verse.insert(passage.verse, filter_for_verse(&candidates, &target));
    }

    let verses = dedupe_across_chapter(per_verse);
    let placed: usize = verses.values().map(Vec::len).sum();
    tracing::debug!(
        book = %chapter.book_id,
        chapter = chapter.chapter,
        placed,
        dropped = warnings.len(),
        "placed chapter annotations"
    );

    return ChapterPlacement { verses, warnings };
}

/// Resolve a placement string to the single verse the annotation displays on.
/// Ranges display on their first verse; sub-verse letters are ignored.
/// Range ordering is not validated here.
///
/// # Errors
///
/// Returns `Error::MalformedDisplayLocation` for unparseable input.
pub fn resolve_display_verse(display_location: &str, chapter_fallback: u32) -> Result<u32, Error> {
    return locate(display_location, chapter_fallback).map(|location| return location.verse);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, reason = "test assertions")]
mod tests {
    use super::*;
    use crate::types::{AnnotationKind, AnnotationsGroup, Passage};

    fn note(id: &str, display: &str) -> AnnotationSummary {
        return AnnotationSummary {
            content: format!("note {id}"),
            display_location: display.to_string(),
            id: id.to_string(),
            kind: AnnotationKind::Study,
        };
    }

    fn at(verse: u32) -> VerseLocator {
        return VerseLocator::new("genesis", 1, verse);
    }

    fn ids(annotations: &[AnnotationSummary]) -> Vec<&str> {
        return annotations.iter().map(|a| return a.id.as_str()).collect();
    }

    #[test]
    fn single_verse_resolves_to_verse() {
        assert_eq!(resolve_display_verse("1:3", 1).unwrap(), 3);
        assert_eq!(resolve_display_verse(" 12:40 ", 12).unwrap(), 40);
    }

    #[test]
    fn range_resolves_to_first_verse() {
        assert_eq!(resolve_display_verse("1:9-11", 1).unwrap(), 9);
    }

    #[test]
    fn reversed_range_still_places_on_first_listed_verse() {
        assert_eq!(resolve_display_verse("1:11-9", 1).unwrap(), 11);
    }

    #[test]
    fn sub_verse_letter_is_ignored_for_placement() {
        assert_eq!(resolve_display_verse("1:5a", 1).unwrap(), 5);
        let loc = parse_display_location("1:5a", 1).unwrap();
        assert_eq!(loc.letter, Some('a'));
    }

    #[test]
    fn empty_chapter_uses_fallback() {
        let loc = parse_display_location(":5", 7).unwrap();
        assert_eq!(loc.chapter, 7);
        assert_eq!(loc.verse, 5);
    }

    #[test]
    fn malformed_locations_are_rejected() {
        for bad in ["abc", "1", "1:", "1:x", "x:1", "1:0", "0:1", "1:5ab", "1:5-", "1:5-a", ""] {
            let err = resolve_display_verse(bad, 1).unwrap_err();
            assert!(
                matches!(err, Error::MalformedDisplayLocation { .. }),
                "expected malformed for {bad:?}, got {err}"
            );
        }
    }

    #[test]
    fn scenario_a_note_listed_on_many_verses_shows_once() {
        let annotations = vec![note("f1", "1:1")];
        assert_eq!(ids(&filter_for_verse(&annotations, &at(1))), vec!["f1"]);
        for verse in 2..=5 {
            assert!(filter_for_verse(&annotations, &at(verse)).is_empty());
        }
    }

    #[test]
    fn scenario_b_range_shows_on_first_verse_only() {
        let annotations = vec![note("f2", "1:9-11")];
        assert_eq!(ids(&filter_for_verse(&annotations, &at(9))), vec!["f2"]);
        assert!(filter_for_verse(&annotations, &at(10)).is_empty());
        assert!(filter_for_verse(&annotations, &at(11)).is_empty());
    }

    #[test]
    fn scenario_c_sub_verse_shows_on_numeric_verse() {
        let annotations = vec![note("f3", "1:5a")];
        assert_eq!(ids(&filter_for_verse(&annotations, &at(5))), vec!["f3"]);
        assert!(filter_for_verse(&annotations, &at(6)).is_empty());
    }

    #[test]
    fn malformed_annotation_is_absent_everywhere_and_others_survive() {
        let annotations = vec![note("bad", "abc"), note("f1", "1:2")];
        for verse in 1..=5 {
            let filtered = filter_for_verse(&annotations, &at(verse));
            assert!(!ids(&filtered).contains(&"bad"));
        }
        assert_eq!(ids(&filter_for_verse(&annotations, &at(2))), vec!["f1"]);
    }

    #[test]
    fn filter_preserves_input_order_and_is_idempotent() {
        let annotations = vec![note("c", "1:4"), note("a", "1:4"), note("b", "1:4-6")];
        let once = filter_for_verse(&annotations, &at(4));
        let twice = filter_for_verse(&annotations, &at(4));
        assert_eq!(ids(&once), vec!["c", "a", "b"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn annotation_from_another_chapter_stays_out() {
        let annotations = vec![note("f7", "2:1"), note("f8", "1:31"), note("f9", ":1")];
        assert_eq!(ids(&filter_for_verse(&annotations, &at(1))), vec!["f9"]);

        let chapter_two = VerseLocator::new("genesis", 2, 31);
        assert!(filter_for_verse(&annotations, &chapter_two).is_empty());
        let chapter_two_first = VerseLocator::new("genesis", 2, 1);
        assert_eq!(ids(&filter_for_verse(&annotations, &chapter_two_first)), vec!["f7", "f9"]);
    }

    #[test]
    fn dedupe_keeps_first_occurrence_in_ascending_verse_order() {
        let mut per_verse = BTreeMap::new();
        per_verse.insert(3, vec![note("x", "1:1"), note("y", "1:3")]);
        per_verse.insert(1, vec![note("x", "1:1")]);
        per_verse.insert(2, vec![note("x", "1:1"), note("z", "1:2")]);

        let deduped = dedupe_across_chapter(per_verse);
        assert_eq!(ids(&deduped[&1]), vec!["x"]);
        assert_eq!(ids(&deduped[&2]), vec!["z"]);
        assert_eq!(ids(&deduped[&3]), vec!["y"]);
    }

    fn passage(verse: u32, relevant: &[&str], embedded: Vec<AnnotationSummary>) -> Passage {
        return Passage {
            annotations: Some(AnnotationsGroup {
                study_notes: embedded,
                ..AnnotationsGroup::default()
            }),
            article_ids: Vec::new(),
            book_id: "genesis".to_string(),
            chapter: 1,
            citation_ids: Vec::new(),
            id: format!("Gen_vchap1-{verse}"),
            liturgical_ids: Vec::new(),
            study_note_ids: relevant.iter().map(|s| return (*s).to_string()).collect(),
            text: String::new(),
            variant_ids: Vec::new(),
            verse,
        };
    }

    #[test]
    fn place_chapter_spreads_and_dedupes() {
        let f1 = note("f1", "1:1");
        let f2 = note("f2", "1:2-3");
        let chapter = ChapterPassages {
            book_id: "genesis".to_string(),
            book_name: "Genesis".to_string(),
            chapter: 1,
            passages: vec![
                passage(3, &["f1", "f2"], vec![f1.clone(), f2.clone()]),
                passage(1, &["f1"], vec![f1.clone()]),
                passage(2, &["f1", "f2", "bad"], vec![f1, f2, note("bad", "abc")]),
            ],
        };

        let placement = place_chapter(&chapter);
        assert_eq!(ids(&placement.verses[&1]), vec!["f1"]);
        assert_eq!(ids(&placement.verses[&2]), vec!["f2"]);
        assert!(placement.verses[&3].is_empty());
        assert_eq!(placement.warnings.len(), 1);
        assert_eq!(placement.warnings[0].annotation_id, "bad");
    }

    #[test]
    fn place_chapter_ignores_embedded_annotations_not_in_relevance_set() {
        let chapter = ChapterPassages {
            book_id: "genesis".to_string(),
            book_name: String::new(),
            chapter: 1,
            passages: vec![passage(1, &[], vec![note("f1", "1:1")])],
        };
        assert!(place_chapter(&chapter).verses[&1].is_empty());
    }
}
