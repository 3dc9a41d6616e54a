//! Crate-level error types for osbref diagnostics.
use std::path::PathBuf;

use crate::types::AnnotationKind;

/// Every error names the input that failed and why, so a diagnostic can be
/// rendered without a debugger. Parse variants are contained to the single
/// marker or annotation that produced them; none of them is fatal to a render.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced input file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A scripture marker's verse range is non-numeric, zero, or reversed.
    #[error("invalid verse range `{value}`: {reason}")]
    InvalidVerseRange {
        /// Why the range was rejected.
        reason: String,
        /// Raw marker value.
        value: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON input could not be decoded.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// The annotation-lookup collaborator failed for a reason other than not-found.
    #[error("lookup failed for {kind} `{id}`: {reason}")]
    LookupFailed {
        /// Annotation ID that was requested.
        id: String,
        /// Annotation family that was requested.
        kind: AnnotationKind,
        /// Description of the failure.
        reason: String,
    },

    /// The annotation-lookup collaborator has no annotation with this ID.
    #[error("annotation not found: {kind} `{id}`")]
    LookupNotFound {
        /// Annotation ID that was requested.
        id: String,
        /// Annotation family that was requested.
        kind: AnnotationKind,
    },

    /// An annotation's placement string matches none of the accepted shapes.
    #[error("malformed display location `{input}`: {reason}")]
    MalformedDisplayLocation {
        /// Raw display-location string.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A marker tag is known but its value fails the tag's shape check.
    #[error("malformed `{tag}` marker value `{value}`: {reason}")]
    MalformedMarkerValue {
        /// Why the value was rejected.
        reason: String,
        /// Marker type tag.
        tag: String,
        /// Raw marker value.
        value: String,
    },

    /// A passage ID does not have the `Abbrev_vchapC-V` shape.
    #[error("malformed passage id `{input}`")]
    MalformedPassageId {
        /// Raw passage ID.
        input: String,
    },

    /// A verse locator is not `book:chapter:verse`.
    #[error("malformed verse locator `{input}` (expected book:chapter:verse)")]
    MalformedVerseLocator {
        /// Raw locator string.
        input: String,
    },

    /// Command-line input is not a single `[tag[value]]` token.
    #[error("not a marker: `{input}` (expected [tag[value]])")]
    NotAMarker {
        /// The input as given.
        input: String,
    },

    /// Reader state file exists but cannot be decoded.
    #[error("reader state corrupt: {}: {reason}", path.display())]
    StateCorrupt {
        /// State file path.
        path: PathBuf,
        /// Description of the corruption.
        reason: String,
    },

    /// A library table-of-contents dump does not form a single tree.
    #[error("table of contents malformed: {reason}")]
    TocMalformed {
        /// Description of the structural problem.
        reason: String,
    },

    /// No table-of-contents node has this ID.
    #[error("toc node not found: `{node_id}`")]
    TocNodeNotFound {
        /// Node ID that was searched for.
        node_id: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// TOML serialization failed.
    #[error("toml serialize: {0}")]
    TomlSer(
        /// The wrapped TOML serialization error.
        #[from]
        toml::ser::Error,
    ),

    /// Marker tag is not one of the known types.
    #[error("unrecognized marker type `{tag}`")]
    UnrecognizedMarkerType {
        /// The tag as written.
        tag: String,
    },
}
