//! Core domain types for verses, annotations, references, and markers.
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A single verse: lowercase book slug, chapter, verse.
/// String form is `book:chapter:verse`, which is also its map-key form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VerseLocator {
    /// Lowercase book identifier such as `genesis`.
    pub book_id: String,
    /// One-based chapter number.
    pub chapter: u32,
    /// One-based verse number.
    pub verse: u32,
}

impl VerseLocator {
    /// Build a locator, normalizing the book slug to lowercase.
    pub fn new(book_id: &str, chapter: u32, verse: u32) -> Self {
        return Self {
            book_id: book_id.to_lowercase(),
            chapter,
            verse,
        };
    }
}

impl fmt::Display for VerseLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}:{}:{}", self.book_id, self.chapter, self.verse);
    }
}

impl FromStr for VerseLocator {
    type Err = Error;

    /// Parse `book:chapter:verse`. Chapter and verse must be positive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || {
            return Error::MalformedVerseLocator {
                input: s.to_string(),
            };
        };
        let mut parts = s.trim().split(':');
        let (Some(book), Some(chapter), Some(verse), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        if book.is_empty() {
            return Err(malformed());
        }
        let chapter = parse_positive(chapter).ok_or_else(malformed)?;
        let verse = parse_positive(verse).ok_or_else(malformed)?;
        return Ok(Self::new(book, chapter, verse));
    }
}

impl TryFrom<String> for VerseLocator {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        return value.parse();
    }
}

impl From<VerseLocator> for String {
    fn from(value: VerseLocator) -> Self {
        return value.to_string();
    }
}

/// The five annotation families the content API attaches to verses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    /// Long-form article attached before a verse.
    Article,
    /// Patristic or scriptural citation.
    Citation,
    /// Liturgical usage note.
    Liturgical,
    /// Study note (the `f1`, `f2`, … footnotes).
    Study,
    /// Textual variant note.
    Variant,
}

impl AnnotationKind {
    /// Every kind, in marker-table order.
    pub const ALL: [Self; 5] = [
        Self::Study,
        Self::Liturgical,
        Self::Variant,
        Self::Citation,
        Self::Article,
    ];

    /// The lowercase tag used in markers and JSON.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::Article => "article",
            Self::Citation => "citation",
            Self::Liturgical => "liturgical",
            Self::Study => "study",
            Self::Variant => "variant",
        };
    }

    /// Map a marker tag to a kind. Tags are case-sensitive.
    pub fn from_tag(tag: &str) -> Option<Self> {
        return Self::ALL.into_iter().find(|k| return k.as_str() == tag);
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.as_str());
    }
}

/// An annotation as embedded in a content-API passage. Read-only input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSummary {
    /// Free-text body.
    #[serde(rename = "text", default)]
    pub content: String,
    /// Placement string: `c:v`, `c:s-e`, or `c:vL`.
    #[serde(rename = "verse_display")]
    pub display_location: String,
    /// Stable opaque identifier.
    pub id: String,
    /// Annotation family.
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
}

/// Full annotation detail as returned by the annotation-lookup collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationDetail {
    /// Stable opaque identifier.
    pub id: String,
    /// Annotation family.
    #[serde(rename = "type")]
    pub kind: AnnotationKind,
    /// Passage IDs (`Gen_vchap1-1`) the annotation is relevant to.
    #[serde(default)]
    pub passage_ids: Vec<String>,
    /// Patristic source IDs cited by the annotation.
    #[serde(default)]
    pub patristic_citations: Vec<String>,
    /// Passage IDs referenced from within the annotation text.
    #[serde(default)]
    pub scripture_refs: Vec<String>,
    /// Free-text body.
    pub text: String,
    /// Placement string.
    pub verse_display: String,
}

/// Annotations embedded in a passage, grouped by family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationsGroup {
    /// Article annotations.
    #[serde(default)]
    pub articles: Vec<AnnotationSummary>,
    /// Citation annotations.
    #[serde(default)]
    pub citations: Vec<AnnotationSummary>,
    /// Liturgical notes.
    #[serde(default)]
    pub liturgical: Vec<AnnotationSummary>,
    /// Study notes.
    #[serde(default)]
    pub study_notes: Vec<AnnotationSummary>,
    /// Textual variant notes.
    #[serde(default)]
    pub variants: Vec<AnnotationSummary>,
}

impl AnnotationsGroup {
    /// All embedded annotations in marker-table order (study first, articles last).
    pub fn iter(&self) -> impl Iterator<Item = &AnnotationSummary> {
        return self
            .study_notes
            .iter()
            .chain(&self.liturgical)
            .chain(&self.variants)
            .chain(&self.citations)
            .chain(&self.articles);
    }
}

/// One verse of a content-API chapter response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// Embedded annotations (present when the chapter was fetched with annotations).
    #[serde(default)]
    pub annotations: Option<AnnotationsGroup>,
    /// Article IDs relevant to this verse.
    #[serde(default)]
    pub article_ids: Vec<String>,
    /// Lowercase book slug.
    pub book_id: String,
    /// One-based chapter number.
    pub chapter: u32,
    /// Citation IDs relevant to this verse.
    #[serde(default)]
    pub citation_ids: Vec<String>,
    /// Passage ID such as `Gen_vchap1-1`.
    pub id: String,
    /// Liturgical note IDs relevant to this verse.
    #[serde(default)]
    pub liturgical_ids: Vec<String>,
    /// Study note IDs relevant to this verse.
    #[serde(default)]
    pub study_note_ids: Vec<String>,
    /// Verse text with semantic markup preserved.
    #[serde(default)]
    pub text: String,
    /// Variant note IDs relevant to this verse.
    #[serde(default)]
    pub variant_ids: Vec<String>,
    /// One-based verse number.
    pub verse: u32,
}

impl Passage {
    /// This passage's verse locator.
    pub fn locator(&self) -> VerseLocator {
        return VerseLocator::new(&self.book_id, self.chapter, self.verse);
    }

    /// The relevance set: every annotation ID the API marked relevant to this verse.
    pub fn relevant_ids(&self) -> BTreeSet<&str> {
        return self
            .study_note_ids
            .iter()
            .chain(&self.liturgical_ids)
            .chain(&self.variant_ids)
            .chain(&self.citation_ids)
            .chain(&self.article_ids)
            .map(String::as_str)
            .collect();
    }
}

/// A content-API chapter response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterPassages {
    /// Lowercase book slug.
    pub book_id: String,
    /// Display name of the book.
    #[serde(default)]
    pub book_name: String,
    /// One-based chapter number.
    pub chapter: u32,
    /// Verses of the chapter, in any order.
    pub passages: Vec<Passage>,
}

/// Scripture reference parsed from a `SCRIPTURE` marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptureRef {
    /// Lowercase book slug.
    pub book_id: String,
    /// One-based chapter number.
    pub chapter: u32,
    /// Last verse of a range, only when a range was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verse_end: Option<u32>,
    /// First (or only) verse, absent for whole-chapter references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verse_start: Option<u32>,
}

/// Structured form of a marker. Exactly one variant is active; fields of other
/// variants do not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reference {
    /// Study note, liturgical note, variant, citation, or article.
    Annotation {
        /// Opaque annotation ID.
        id: String,
        /// Annotation family.
        kind: AnnotationKind,
    },
    /// A whole book.
    Book {
        /// Lowercase book slug.
        book_id: String,
    },
    /// A node of a library work.
    Library {
        /// Paragraph anchor inside the node.
        #[serde(skip_serializing_if = "Option::is_none")]
        anchor: Option<String>,
        /// Node identifier within the work.
        node_id: String,
        /// Work identifier.
        work_id: String,
    },
    /// A chapter, verse, or verse range.
    Scripture(ScriptureRef),
}

/// A recognized marker discovered during one scan pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    /// One-based line of the marker start in the scanned text.
    pub line: u32,
    /// Parsed reference.
    pub reference: Reference,
    /// Byte span of the whole `[tag[value]]` token in the scanned text.
    pub span: Range<usize>,
    /// Marker type tag as written.
    pub tag: String,
    /// Raw value payload as written.
    pub value: String,
}

/// Where activating a reference leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum Target {
    /// Fetch annotation content and show it in a side surface.
    Lookup(AnnotationLookupRequest),
    /// Navigate to an in-app path.
    Navigate(NavigationTarget),
}

/// An in-app path, with an optional fragment anchor already appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationTarget {
    /// Path such as `/read/genesis/1#v3`.
    pub path: String,
}

/// Request for the annotation-lookup collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AnnotationLookupRequest {
    /// Opaque annotation ID.
    pub id: String,
    /// Annotation family.
    pub kind: AnnotationKind,
}

/// Parse a strictly positive decimal integer. Rejects signs, zero, and empty input.
pub fn parse_positive(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| return b.is_ascii_digit()) {
        return None;
    }
    return s.parse::<u32>().ok().filter(|n| return *n > 0);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    #[test]
    fn verse_locator_round_trips_through_string_form() {
        let loc: VerseLocator = "Genesis:1:3".parse().unwrap();
        assert_eq!(loc, VerseLocator::new("genesis", 1, 3));
        assert_eq!(loc.to_string(), "genesis:1:3");
    }

    #[test]
    fn verse_locator_rejects_zero_and_missing_parts() {
        assert!("genesis:0:1".parse::<VerseLocator>().is_err());
        assert!("genesis:1".parse::<VerseLocator>().is_err());
        assert!(":1:1".parse::<VerseLocator>().is_err());
        assert!("genesis:1:1:1".parse::<VerseLocator>().is_err());
    }

    #[test]
    fn parse_positive_rejects_signs() {
        assert_eq!(parse_positive("+3"), None);
        assert_eq!(parse_positive("-3"), None);
        assert_eq!(parse_positive("03"), Some(3));
    }

    #[test]
    fn passage_relevance_set_unions_all_families() {
        let json = r#"{
            "id": "Gen_vchap1-2", "book_id": "genesis", "chapter": 1, "verse": 2,
            "study_note_ids": ["f1", "f2"], "article_ids": ["a1"], "variant_ids": ["f1"]
        }"#;
        let passage: Passage = serde_json::from_str(json).unwrap();
        let ids: Vec<&str> = passage.relevant_ids().into_iter().collect();
        assert_eq!(ids, vec!["a1", "f1", "f2"]);
    }

    #[test]
    fn reference_serializes_with_variant_tag_only() {
        let r = Reference::Book { book_id: "john".to_string() };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json, serde_json::json!({"type": "book", "book_id": "john"}));
    }
}
