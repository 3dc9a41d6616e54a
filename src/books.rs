//! Canonical book table and display/ID formatting helpers.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;
use crate::placement::DisplayLocation;
use crate::types::{ScriptureRef, VerseLocator};

/// Every book in canonical order, with its chapter count in the OSB.
pub const BOOKS: &[Book] = &[
    book("genesis", "Genesis", "Gen", 50),
    book("exodus", "Exodus", "Exod", 40),
    book("leviticus", "Leviticus", "Lev", 27),
    book("numbers", "Numbers", "Num", 36),
    book("deuteronomy", "Deuteronomy", "Deut", 34),
    book("joshua", "Joshua", "Josh", 24),
    book("judges", "Judges", "Judg", 21),
    book("ruth", "Ruth", "Ruth", 4),
    book("1kingdoms", "1 Kingdoms", "1Kgdms", 31),
    book("2kingdoms", "2 Kingdoms", "2Kgdms", 24),
    book("3kingdoms", "3 Kingdoms", "3Kgdms", 22),
    book("4kingdoms", "4 Kingdoms", "4Kgdms", 25),
    book("1chronicles", "1 Chronicles", "1Chr", 29),
    book("2chronicles", "2 Chronicles", "2Chr", 36),
    book("1ezra", "1 Ezra", "1Ezra", 9),
    book("2ezra", "2 Ezra", "2Ezra", 10),
    book("nehemiah", "Nehemiah", "Neh", 13),
    book("tobit", "Tobit", "Tob", 14),
    book("judith", "Judith", "Jdt", 16),
    book("esther", "Esther", "Esth", 10),
    book("1maccabees", "1 Maccabees", "1Macc", 16),
    book("2maccabees", "2 Maccabees", "2Macc", 15),
    book("3maccabees", "3 Maccabees", "3Macc", 7),
    book("job", "Job", "Job", 42),
    book("psalms", "Psalms", "Ps", 151),
    book("proverbs", "Proverbs", "Prov", 31),
    book("ecclesiastes", "Ecclesiastes", "Eccl", 12),
    book("songofsongs", "Song of Songs", "Song", 8),
    book("wisdomofsolomon", "Wisdom of Solomon", "Wis", 19),
    book("wisdomofsirach", "Wisdom of Sirach", "Sir", 51),
    book("isaiah", "Isaiah", "Isa", 66),
    book("jeremiah", "Jeremiah", "Jer", 52),
    book("lamentations", "Lamentations", "Lam", 5),
    book("baruch", "Baruch", "Bar", 5),
    book("epistleofjeremiah", "Epistle of Jeremiah", "EpJer", 1),
    book("ezekiel", "Ezekiel", "Ezek", 48),
    book("daniel", "Daniel", "Dan", 14),
    book("hosea", "Hosea", "Hos", 14),
    book("joel", "Joel", "Joel", 3),
    book("amos", "Amos", "Amos", 9),
    book("obadiah", "Obadiah", "Obad", 1),
    book("jonah", "Jonah", "Jonah", 4),
    book("micah", "Micah", "Mic", 7),
    book("nahum", "Nahum", "Nah", 3),
    book("habakkuk", "Habakkuk", "Hab", 3),
    book("zephaniah", "Zephaniah", "Zeph", 3),
    book("haggai", "Haggai", "Hag", 2),
    book("zechariah", "Zechariah", "Zech", 14),
    book("malachi", "Malachi", "Mal", 4),
    book("matthew", "Matthew", "Matt", 28),
    book("mark", "Mark", "Mark", 16),
    book("luke", "Luke", "Luke", 24),
    book("john", "John", "John", 21),
    book("acts", "Acts", "Acts", 28),
    book("romans", "Romans", "Rom", 16),
    book("1corinthians", "1 Corinthians", "1Cor", 16),
    book("2corinthians", "2 Corinthians", "2Cor", 13),
    book("galatians", "Galatians", "Gal", 6),
    book("ephesians", "Ephesians", "Eph", 6),
    book("philippians", "Philippians", "Phil", 4),
    book("colossians", "Colossians", "Col", 4),
    book("1thessalonians", "1 Thessalonians", "1Thess", 5),
    book("2thessalonians", "2 Thessalonians", "2Thess", 3),
    book("1timothy", "1 Timothy", "1Tim", 6),
    book("2timothy", "2 Timothy", "2Tim", 4),
    book("titus", "Titus", "Titus", 3),
    book("philemon", "Philemon", "Phlm", 1),
    book("hebrews", "Hebrews", "Heb", 13),
    book("james", "James", "Jas", 5),
    book("1peter", "1 Peter", "1Pet", 5),
    book("2peter", "2 Peter", "2Pet", 3),
    book("1john", "1 John", "1John", 5),
    book("2john", "2 John", "2John", 1),
    book("3john", "3 John", "3John", 1),
    book("jude", "Jude", "Jude", 1),
    book("revelation", "Revelation", "Rev", 22),
];

/// Passage IDs look like `Gen_vchap1-1` or `P2et_vchap2-6`.
static PASSAGE_ID: LazyLock<Option<Regex>> = LazyLock::new(|| {
    return Regex::new(r"^([A-Za-z0-9]+)_vchap(\d+)-(\d+)$").ok();
});

/// One book of the OSB canon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Book {
    /// Passage-ID abbreviation such as `Gen`.
    pub abbrev: &'static str,
    /// Number of chapters.
    pub chapters: u32,
    /// Lowercase slug such as `genesis`.
    pub id: &'static str,
    /// Display name such as `Genesis`.
    pub name: &'static str,
}

/// Previous and next chapter of a reading position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterNeighbors {
    /// Following chapter, crossing into the next book's first chapter.
    pub next: Option<VerseLocator>,
    /// Preceding chapter, crossing into the previous book's last chapter.
    pub prev: Option<VerseLocator>,
}

/// Shorthand for table rows.
const fn book(id: &'static str, name: &'static str, abbrev: &'static str, chapters: u32) -> Book {
    return Book {
        abbrev,
        chapters,
        id,
        name,
    };
}

/// Passage-ID abbreviation for a book slug. Unknown slugs use their first
/// three characters, title-cased.
pub fn book_abbrev(book_id: &str) -> String {
    return find(book_id).map_or_else(
        || return title_case(&book_id.chars().take(3).collect::<String>()),
        |b| return b.abbrev.to_string(),
    );
}

/// Book slug for a passage-ID abbreviation. Unknown abbreviations are lowercased.
pub fn book_id_for_abbrev(abbrev: &str) -> String {
    return BOOKS
        .iter()
        .find(|b| return b.abbrev == abbrev)
        .map_or_else(|| return abbrev.to_lowercase(), |b| return b.id.to_string());
}

/// Display name for a book slug. Unknown slugs are title-cased.
pub fn book_name(book_id: &str) -> String {
    return find(book_id).map_or_else(|| return title_case(book_id), |b| return b.name.to_string());
}

/// Chapter count of a book in the table.
pub fn chapter_count(book_id: &str) -> Option<u32> {
    return find(book_id).map(|b| return b.chapters);
}

/// Neighboring chapters of `book_id` `chapter`, given the book's chapter count.
/// Crossing backward lands on the previous book's last chapter; crossing
/// forward lands on the next book's first chapter.
pub fn chapter_neighbors(book_id: &str, chapter: u32, chapter_count: u32) -> ChapterNeighbors {
    let index = position(book_id);

    let prev = if chapter > 1 {
        Some(VerseLocator::new(book_id, chapter.saturating_sub(1), 1))
    } else {
        index
            .and_then(|i| return i.checked_sub(1))
            .and_then(|i| return BOOKS.get(i))
            .map(|b| return VerseLocator::new(b.id, b.chapters, 1))
    };

    let next = if chapter < chapter_count {
        Some(VerseLocator::new(book_id, chapter.saturating_add(1), 1))
    } else {
        index
            .and_then(|i| return BOOKS.get(i.saturating_add(1)))
            .map(|b| return VerseLocator::new(b.id, 1, 1))
    };

    return ChapterNeighbors { next, prev };
}

/// Look up a book by slug.
pub fn find(book_id: &str) -> Option<&'static Book> {
    return BOOKS.iter().find(|b| return b.id == book_id);
}

/// Human-readable form of an annotation's placement, such as `Genesis 1:5a`.
pub fn format_display_location(book_id: &str, location: &DisplayLocation) -> String {
    let name = book_name(book_id);
    let mut out = format!("{name} {}:{}", location.chapter, location.verse);
    if let Some(end) = location.end {
        out.push('-');
        out.push_str(&end.to_string());
    }
    if let Some(letter) = location.letter {
        out.push(letter);
    }
    return out;
}

/// Human-readable form: `Genesis 1`, `Genesis 1:3`, or `Genesis 1:9-11`.
pub fn format_scripture(scripture: &ScriptureRef) -> String {
    let name = book_name(&scripture.book_id);
    return match (scripture.verse_start, scripture.verse_end) {
        (None, _) => format!("{name} {}", scripture.chapter),
        (Some(start), Some(end)) if end != start => format!("{name} {}:{start}-{end}", scripture.chapter),
        (Some(start), _) => format!("{name} {}:{start}", scripture.chapter),
    };
}

/// Parse a passage ID such as `Gen_vchap1-1` into a verse locator.
///
/// # Errors
///
/// Returns `Error::MalformedPassageId` if the ID does not match `Abbrev_vchapC-V`
/// or its numbers are not positive.
pub fn parse_passage_id(passage_id: &str) -> Result<VerseLocator, Error> {
    let malformed = || {
        return Error::MalformedPassageId {
            input: passage_id.to_string(),
        };
    };
    let caps = PASSAGE_ID
        .as_ref()
        .and_then(|p| return p.captures(passage_id))
        .ok_or_else(malformed)?;

    let abbrev = caps.get(1).map(|m| return m.as_str()).ok_or_else(malformed)?;
    let number = |i: usize| {
        return caps
            .get(i)
            .and_then(|m| return crate::types::parse_positive(m.as_str()))
            .ok_or_else(malformed);
    };
    let chapter = number(2)?;
    let verse = number(3)?;

    return Ok(VerseLocator::new(&book_id_for_abbrev(abbrev), chapter, verse));
}

/// Format a verse locator as a passage ID.
pub fn passage_id(locator: &VerseLocator) -> String {
    return format!("{}_vchap{}-{}", book_abbrev(&locator.book_id), locator.chapter, locator.verse);
}

/// Canonical position of a book, if it is in the table.
fn position(book_id: &str) -> Option<usize> {
    return BOOKS.iter().position(|b| return b.id == book_id);
}

/// Uppercase the first character, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    return chars.next().map_or_else(String::new, |first| {
        return first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect();
    });
}
