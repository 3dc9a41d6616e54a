//! CLI commands for osbref: scan, check, target, activate, place, toc, state.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;

use crate::activation::{Activation, Behavior, handle_activation};
use crate::books;
use crate::config::{Config, Routes};
use crate::diagnostics;
use crate::error;
use crate::lookup::FileAnnotationLookup;
use crate::placement::{self, ChapterPlacement};
use crate::resolver;
use crate::scanner;
use crate::state::{ReaderState, TextSize};
use crate::toc::{FlatNode, TocNode};
use crate::types::{
    AnnotationDetail, AnnotationKind, ChapterPassages, Marker, Reference, ScriptureRef, Target, VerseLocator,
};

/// A marker with its resolved target, for JSON output.
#[derive(Serialize)]
struct MarkerReport<'a> {
    /// Display label.
    label: String,
    /// The marker as scanned.
    #[serde(flatten)]
    marker: &'a Marker,
    /// Where activating it leads.
    target: Target,
}

/// Scan output for one file, for JSON output.
#[derive(Serialize)]
struct ScanReport<'a> {
    /// Recognized markers in source order.
    markers: Vec<MarkerReport<'a>>,
    /// Tokens left as literal text.
    rejected: &'a [scanner::RejectedMarker],
    /// Text with markers replaced by their labels.
    text: String,
}

/// Options for `place`.
pub struct PlaceOptions<'a> {
    /// Chapter count override for books missing from the book table.
    pub chapter_count: Option<u32>,
    /// Print previous/next chapter links.
    pub chapters: bool,
    /// Chapter JSON file.
    pub file: &'a str,
    /// Emit JSON instead of markdown.
    pub json: bool,
    /// Restrict output to one verse.
    pub verse: Option<u32>,
}

/// A change to reader state.
pub enum StateAction {
    /// Toggle a favorite verse.
    Favorite(VerseLocator),
    /// Record the last-read node of a library work.
    Library {
        /// Node identifier.
        node_id: String,
        /// Work identifier.
        work_id: String,
    },
    /// Record the reading position.
    Position(VerseLocator),
    /// Print current state.
    Show {
        /// Emit JSON instead of text.
        json: bool,
    },
    /// Set or step the text size.
    TextSize(TextSizeChange),
}

/// How to change the text size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSizeChange {
    /// One notch smaller.
    Down,
    /// A specific size.
    Set(TextSize),
    /// One notch larger.
    Up,
}

impl std::str::FromStr for TextSizeChange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return match s {
            "down" => Ok(Self::Down),
            "up" => Ok(Self::Up),
            _ => s.parse().map(Self::Set),
        };
    }
}

/// State as printed by `state show --json`.
#[derive(Serialize)]
struct StateReport<'a> {
    /// Favorited verses.
    favorites: Vec<String>,
    /// Library positions.
    library_positions: &'a std::collections::BTreeMap<String, String>,
    /// Reading position.
    position: Option<String>,
    /// Text size.
    text_size: &'static str,
}

/// Read a file, mapping not-found to `Error::FileNotFound`.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if the file doesn't exist,
/// or `Error::Io` for other read failures.
fn read_input(path: &Path) -> Result<String, error::Error> {
    return match std::fs::read_to_string(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(error::Error::FileNotFound { path: path.to_path_buf() })
        },
        Err(e) => Err(error::Error::Io(e)),
        Ok(c) => Ok(c),
    };
}

/// Parse command-line input that must be exactly one marker token.
///
/// # Errors
///
/// Returns the marker's own parse error when it closed but did not parse,
/// or `Error::NotAMarker` when the input is not a single token.
fn parse_single_marker(input: &str) -> Result<Marker, error::Error> {
    let trimmed = input.trim();
    let output = scanner::scan(trimmed);

    if let Some(rejected) = output.rejected.first() {
        return match resolver::parse_reference(&rejected.tag, &rejected.value) {
            Err(e) => Err(e),
            Ok(_) => Err(error::Error::NotAMarker { input: input.to_string() }),
        };
    }

    let mut markers = output.markers();
    return match (markers.next(), markers.next()) {
        (Some(marker), None) if marker.span == (0..trimmed.len()) => Ok(marker.clone()),
        _ => Err(error::Error::NotAMarker { input: input.to_string() }),
    };
}

/// Short human-readable label for a reference.
fn display_label(reference: &Reference) -> String {
    return match reference {
        Reference::Annotation { id, kind } => format!("{kind} {id}"),
        Reference::Book { book_id } => books::book_name(book_id),
        Reference::Library { anchor, node_id, work_id } => match anchor {
            Some(anchor) => format!("{work_id}/{node_id}#{anchor}"),
            None => format!("{work_id}/{node_id}"),
        },
        Reference::Scripture(scripture) => books::format_scripture(scripture),
    };
}

/// One-line description of a target.
fn describe_target(target: &Target) -> String {
    return match target {
        Target::Lookup(request) => format!("lookup {} {}", request.kind, request.id),
        Target::Navigate(nav) => nav.path.clone(),
    };
}

/// Scan one text file: print the substituted text and every marker's target.
/// Rejected tokens are reported on stderr; they never fail the scan.
///
/// # Errors
///
/// Returns errors from config loading or file reading.
pub fn scan(file: &str, json: bool) -> Result<ExitCode, error::Error> {
    let config = Config::load(Path::new("."))?;
    let content = read_input(Path::new(file))?;
    let output = scanner::scan(&content);
    let text = output.substitute(|m| return display_label(&m.reference));

    let markers: Vec<MarkerReport<'_>> = output
        .markers()
        .map(|marker| {
            return MarkerReport {
                label: display_label(&marker.reference),
                marker,
                target: resolver::reference_to_target(&marker.reference, &config.routes),
            };
        })
        .collect();

    if json {
        let report = ScanReport {
            markers,
            rejected: &output.rejected,
            text,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ExitCode::SUCCESS);
    }

    print!("{text}");
    if !text.ends_with('\n') {
        println!();
    }
    if !markers.is_empty() {
        println!();
        println!("## Markers");
        println!();
        for report in &markers {
            println!(
                "- {file}:{} {} -> {}",
                report.marker.line,
                report.label,
                describe_target(&report.target)
            );
        }
    }

    if !output.rejected.is_empty() {
        diagnostics::print_rejected(file, &output.rejected);
    }
    return Ok(ExitCode::SUCCESS);
}

/// Scan every text file under the working root and lint its markers.
/// With an annotation dump, annotation markers must name an annotation in it.
///
/// # Errors
///
/// Returns errors from config loading, scanning, or dump loading.
pub fn check(annotations: Option<&str>) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let files = scanner::scan_tree(&root, &config)?;
    let lookup = annotations.map(|p| return FileAnnotationLookup::load(Path::new(p))).transpose()?;
    if let Some(store) = &lookup
        && store.is_empty()
    {
        tracing::warn!("annotation dump is empty, every annotation marker will be broken");
    }

    let mut marker_count = 0_usize;
    let mut rejected_count = 0_usize;
    let mut broken_count = 0_usize;

    for file in &files {
        let path = file.path.display().to_string();
        for marker in file.output.markers() {
            marker_count = marker_count.saturating_add(1);
            let Reference::Annotation { id, kind } = &marker.reference else {
                continue;
            };
            if let Some(store) = &lookup
                && store.get(*kind, id).is_none()
            {
                broken_count = broken_count.saturating_add(1);
                println!("BROKEN  {path}:{} [{}[{}]] (annotation not found)", marker.line, marker.tag, marker.value);
            }
        }
        if !file.output.rejected.is_empty() {
            rejected_count = rejected_count.saturating_add(file.output.rejected.len());
            diagnostics::print_rejected(&path, &file.output.rejected);
        }
    }

    // Exit code priority: broken (2) > rejected (1) > valid (0).
    if broken_count > 0 {
        println!();
        println!("{broken_count} broken, {rejected_count} rejected");
        return Ok(ExitCode::from(2));
    } else if rejected_count > 0 {
        println!("{rejected_count} rejected");
        return Ok(ExitCode::from(1));
    } else {
        println!("All {marker_count} markers valid in {} files", files.len());
        return Ok(ExitCode::SUCCESS);
    }
}

/// Parse one marker and print where activating it leads.
///
/// # Errors
///
/// Returns the marker's parse error, or errors from config loading.
pub fn target(marker: &str, json: bool) -> Result<(), error::Error> {
    let config = Config::load(Path::new("."))?;
    let marker = parse_single_marker(marker)?;
    let target = resolver::reference_to_target(&marker.reference, &config.routes);

    if json {
        println!("{}", serde_json::to_string_pretty(&target)?);
    } else {
        println!("{}", describe_target(&target));
    }
    return Ok(());
}

/// Activate one marker against an annotation dump (or an empty store).
///
/// # Errors
///
/// Returns the marker's parse error, `Error::LookupFailed`, or errors from
/// config or dump loading.
pub fn activate(marker: &str, behavior: Behavior, annotations: Option<&str>, json: bool) -> Result<(), error::Error> {
    let config = Config::load(Path::new("."))?;
    let marker = parse_single_marker(marker)?;
    let lookup = match annotations {
        Some(path) => FileAnnotationLookup::load(Path::new(path))?,
        None => FileAnnotationLookup::default(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let activation = runtime.block_on(handle_activation(
        &marker.tag,
        &marker.value,
        behavior,
        &config.routes,
        &lookup,
    ))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&activation)?);
        return Ok(());
    }

    match &activation {
        Activation::Navigate { path } => println!("navigate {path}"),
        Activation::Nothing => println!("nothing"),
        Activation::Preview { path, reference } => {
            println!("preview {} ({path})", books::format_scripture(reference));
        },
        Activation::ShowAnnotation { detail } => print_annotation(detail, &config.routes),
    }
    return Ok(());
}

/// Print an annotation detail as markdown.
fn print_annotation(detail: &AnnotationDetail, routes: &Routes) {
    let passages: Vec<VerseLocator> = detail
        .passage_ids
        .iter()
        .filter_map(|id| {
            return books::parse_passage_id(id)
                .inspect_err(|e| tracing::warn!(annotation = %detail.id, "skipping passage: {e}"))
                .ok();
        })
        .collect();

    println!("# {} {}", annotation_heading(detail.kind), detail.id);
    println!();
    if let Some(first) = passages.first() {
        match placement::parse_display_location(&detail.verse_display, first.chapter) {
            Ok(location) => println!("Shown at: {}", books::format_display_location(&first.book_id, &location)),
            Err(e) => tracing::warn!(annotation = %detail.id, "{e}"),
        }
    }
    if !passages.is_empty() {
        let labels: Vec<String> = passages.iter().map(|p| return locator_label(p, routes)).collect();
        println!("Passages: {}", labels.join(", "));
    }
    if !detail.scripture_refs.is_empty() {
        let refs: Vec<String> = detail
            .scripture_refs
            .iter()
            .filter_map(|id| return books::parse_passage_id(id).ok())
            .map(|p| return locator_label(&p, routes))
            .collect();
        println!("See also: {}", refs.join(", "));
    }
    if !detail.patristic_citations.is_empty() {
        println!("Fathers: {}", detail.patristic_citations.join(", "));
    }
    println!();
    println!("{}", detail.text);
}

/// Heading word for an annotation family.
const fn annotation_heading(kind: AnnotationKind) -> &'static str {
    return match kind {
        AnnotationKind::Article => "Article",
        AnnotationKind::Citation => "Citation",
        AnnotationKind::Liturgical => "Liturgical note",
        AnnotationKind::Study => "Study note",
        AnnotationKind::Variant => "Variant",
    };
}

/// `Genesis 1:3 (/read/genesis/1#v3)`.
fn locator_label(locator: &VerseLocator, routes: &Routes) -> String {
    let scripture = ScriptureRef {
        book_id: locator.book_id.clone(),
        chapter: locator.chapter,
        verse_end: None,
        verse_start: Some(locator.verse),
    };
    return format!(
        "{} ({})",
        books::format_scripture(&scripture),
        resolver::scripture_path(&scripture, routes)
    );
}

/// Reading path for the start of a chapter.
fn chapter_path(locator: &VerseLocator, routes: &Routes) -> String {
    let scripture = ScriptureRef {
        book_id: locator.book_id.clone(),
        chapter: locator.chapter,
        verse_end: None,
        verse_start: None,
    };
    return resolver::scripture_path(&scripture, routes);
}

/// Place a chapter's embedded annotations on verses and print the result.
/// Dropped annotations are reported on stderr.
///
/// # Errors
///
/// Returns errors from file reading or JSON decoding.
pub fn place(options: &PlaceOptions<'_>) -> Result<(), error::Error> {
    let config = Config::load(Path::new("."))?;
    let content = read_input(Path::new(options.file))?;
    let chapter: ChapterPassages = serde_json::from_str(&content)?;

    for passage in &chapter.passages {
        if let Ok(parsed) = books::parse_passage_id(&passage.id)
            && parsed != passage.locator()
        {
            tracing::warn!(
                passage = %passage.id,
                expected = %books::passage_id(&passage.locator()),
                "passage id disagrees with its fields"
            );
        }
    }

    let mut result: ChapterPlacement = placement::place_chapter(&chapter);
    if let Some(verse) = options.verse {
        result.verses.retain(|v, _| return *v == verse);
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_placement(&chapter, &result, &config.routes);
        if options.chapters {
            print_chapter_links(&chapter, options.chapter_count, &config.routes);
        }
    }

    if !result.warnings.is_empty() {
        diagnostics::print_placement_warnings(&result.warnings);
    }
    return Ok(());
}

/// Print previous/next chapter paths. The chapter count comes from the book
/// table unless overridden.
fn print_chapter_links(chapter: &ChapterPassages, chapter_count: Option<u32>, routes: &Routes) {
    let Some(count) = chapter_count.or_else(|| return books::chapter_count(&chapter.book_id)) else {
        tracing::warn!(book = %chapter.book_id, "unknown chapter count, pass --chapter-count for chapter links");
        return;
    };
    let neighbors = books::chapter_neighbors(&chapter.book_id, chapter.chapter, count);
    println!();
    if let Some(prev) = &neighbors.prev {
        println!("Previous: {}", chapter_path(prev, routes));
    }
    if let Some(next) = &neighbors.next {
        println!("Next: {}", chapter_path(next, routes));
    }
}

/// Print a chapter placement as markdown.
fn print_placement(chapter: &ChapterPassages, result: &ChapterPlacement, routes: &Routes) {
    let name = if chapter.book_name.is_empty() {
        books::book_name(&chapter.book_id)
    } else {
        chapter.book_name.clone()
    };
    println!("# {name} {}", chapter.chapter);

    for (verse, annotations) in &result.verses {
        if annotations.is_empty() {
            continue;
        }
        let locator = VerseLocator::new(&chapter.book_id, chapter.chapter, *verse);
        println!();
        println!("## {}", locator_label(&locator, routes));
        println!();
        for a in annotations {
            let shown = placement::parse_display_location(&a.display_location, chapter.chapter)
                .map(|loc| return books::format_display_location(&chapter.book_id, &loc))
                .unwrap_or_else(|_| return a.display_location.clone());
            println!("- [{}] {} ({shown}): {}", a.kind, a.id, a.content);
        }
    }
}

/// Print a library table of contents, or the path and neighbors of one node.
///
/// # Errors
///
/// Returns `Error::TocMalformed` or `Error::TocNodeNotFound`, or errors from
/// file reading or JSON decoding.
pub fn toc(file: &str, node: Option<&str>, json: bool) -> Result<(), error::Error> {
    let content = read_input(Path::new(file))?;
    let nodes: Vec<FlatNode> = serde_json::from_str(&content)?;
    let tree = TocNode::from_flat(nodes)?;

    let Some(node_id) = node else {
        if json {
            println!("{}", serde_json::to_string_pretty(&tree)?);
        } else {
            print_tree(&tree, 0);
        }
        return Ok(());
    };

    let path = tree.find_path(node_id).ok_or_else(|| {
        return error::Error::TocNodeNotFound {
            node_id: node_id.to_string(),
        };
    })?;
    let titles: Vec<&str> = path.iter().map(|n| return n.title.as_str()).collect();
    println!("{}", titles.join(" > "));

    let (prev, next) = tree.neighbors(node_id);
    if let Some(prev) = prev {
        println!("Previous: {} ({})", prev.title, prev.id);
    }
    if let Some(next) = next {
        println!("Next: {} ({})", next.title, next.id);
    }
    return Ok(());
}

/// Print a tree as an indented markdown list.
fn print_tree(node: &TocNode, depth: usize) {
    let indent = "  ".repeat(depth);
    match &node.label {
        Some(label) => println!("{indent}- {label} {} ({})", node.title, node.id),
        None => println!("{indent}- {} ({})", node.title, node.id),
    }
    for child in &node.children {
        print_tree(child, depth.saturating_add(1));
    }
}

/// Show or change reader state. Changes are persisted immediately.
///
/// # Errors
///
/// Returns `Error::StateCorrupt` for an unreadable state file, or errors from
/// config loading and writing.
pub fn state(action: StateAction) -> Result<(), error::Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let mut state = ReaderState::init(&root.join(&config.state_file))?;

    match action {
        StateAction::Favorite(locator) => {
            let label = locator.to_string();
            if state.toggle_favorite(locator) {
                eprintln!("Added {label} to favorites");
            } else {
                eprintln!("Removed {label} from favorites");
            }
        },
        StateAction::Library { node_id, work_id } => {
            state.set_library_position(&work_id, &node_id);
            eprintln!("Library position for {work_id}: {node_id}");
        },
        StateAction::Position(locator) => {
            eprintln!("Position: {locator}");
            state.set_position(locator);
        },
        StateAction::Show { json } => {
            print_state(&state, json)?;
            return Ok(());
        },
        StateAction::TextSize(change) => {
            let size = match change {
                TextSizeChange::Down => state.step_text_size(false),
                TextSizeChange::Set(size) => {
                    state.set_text_size(size);
                    size
                },
                TextSizeChange::Up => state.step_text_size(true),
            };
            eprintln!("Text size: {size}");
        },
    }

    state.persist()?;
    return Ok(());
}

/// Print reader state as text or JSON.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails.
fn print_state(state: &ReaderState, json: bool) -> Result<(), error::Error> {
    if json {
        let report = StateReport {
            favorites: state.favorites().iter().map(ToString::to_string).collect(),
            library_positions: state.library_positions(),
            position: state.position().map(ToString::to_string),
            text_size: state.text_size().as_str(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Text size:  {}", state.text_size());
    match state.position() {
        Some(p) => println!("Position:   {p}"),
        None => println!("Position:   (none)"),
    }
    if state.favorites().is_empty() {
        println!("Favorites:  (none)");
    } else {
        println!("Favorites:");
        for f in state.favorites() {
            println!("- {f}");
        }
    }
    for (work, node) in state.library_positions() {
        println!("Library:    {work} -> {node}");
    }
    return Ok(());
}

/// Output the osbref reference document.
pub fn info(json: bool) {
    return crate::info::run(json);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    #[test]
    fn single_marker_must_cover_whole_input() {
        let marker = parse_single_marker(" [SCRIPTURE[genesis:1:3]] ").unwrap();
        assert_eq!(marker.tag, "SCRIPTURE");

        assert!(matches!(
            parse_single_marker("see [study[f1]]"),
            Err(error::Error::NotAMarker { .. })
        ));
        assert!(matches!(
            parse_single_marker("[study[f1]][study[f2]]"),
            Err(error::Error::NotAMarker { .. })
        ));
        assert!(matches!(
            parse_single_marker("[Study[f1]]"),
            Err(error::Error::UnrecognizedMarkerType { .. })
        ));
    }

    #[test]
    fn labels_read_naturally() {
        let marker = parse_single_marker("[SCRIPTURE[john:3:16-18]]").unwrap();
        assert_eq!(display_label(&marker.reference), "John 3:16-18");
        let marker = parse_single_marker("[book[1corinthians]]").unwrap();
        assert_eq!(display_label(&marker.reference), "1 Corinthians");
    }

    #[test]
    fn text_size_change_parses_steps_and_sizes() {
        assert_eq!("up".parse::<TextSizeChange>().unwrap(), TextSizeChange::Up);
        assert_eq!(
            "large".parse::<TextSizeChange>().unwrap(),
            TextSizeChange::Set(TextSize::Large)
        );
        assert!("bigger".parse::<TextSizeChange>().is_err());
    }
}
