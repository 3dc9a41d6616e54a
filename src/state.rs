//! Reader-state persistence: favorites, reading position, text size, and
//! per-work library positions, stored as TOML next to the content.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::VerseLocator;

/// Reading text size. `TextSize::ALL` holds the smallest-to-largest order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextSize {
    /// One step above the default.
    Large,
    /// Default size.
    #[default]
    Medium,
    /// Smallest.
    Small,
    /// Largest.
    XLarge,
}

impl TextSize {
    /// Every size in ascending order.
    pub const ALL: [Self; 4] = [Self::Small, Self::Medium, Self::Large, Self::XLarge];

    /// Name as written in the state file and on the command line.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::Large => "large",
            Self::Medium => "medium",
            Self::Small => "small",
            Self::XLarge => "x-large",
        };
    }

    /// One size up or down, clamped at the ends.
    pub fn step(self, up: bool) -> Self {
        let index = Self::ALL.iter().position(|s| return *s == self).unwrap_or(1);
        let next = if up {
            index.saturating_add(1).min(Self::ALL.len().saturating_sub(1))
        } else {
            index.saturating_sub(1)
        };
        return Self::ALL.get(next).copied().unwrap_or(self);
    }
}

impl fmt::Display for TextSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.as_str());
    }
}

impl FromStr for TextSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return Self::ALL
            .into_iter()
            .find(|size| return size.as_str() == s)
            .ok_or_else(|| return format!("unknown text size `{s}` (expected small, medium, large, or x-large)"));
    }
}

/// Persisted fields. Kept separate so the path never lands in the file.
#[allow(clippy::arbitrary_source_item_ordering, reason = "map table must serialize after plain values")]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StateFile {
    /// Favorited verses.
    #[serde(default)]
    favorites: BTreeSet<VerseLocator>,
    /// Last reading position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    position: Option<VerseLocator>,
    /// Reading text size.
    #[serde(default)]
    text_size: TextSize,
    /// Work ID to last-read node ID.
    #[serde(default)]
    library_positions: BTreeMap<String, String>,
}

/// Reader state bound to the file it was loaded from.
/// Mutators change memory only; call `persist` to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderState {
    /// Where `persist` writes.
    path: PathBuf,
    /// Current values.
    state: StateFile,
}

impl ReaderState {
    /// Favorited verses in canonical locator order.
    pub fn favorites(&self) -> &BTreeSet<VerseLocator> {
        return &self.state.favorites;
    }

    /// Load state from `path`, or start from defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` for read failures other than not-found,
    /// or `Error::StateCorrupt` if the file is not valid state TOML.
    pub fn init(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no reader state yet, using defaults");
                return Ok(Self {
                    path: path.to_path_buf(),
                    state: StateFile::default(),
                });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };

        let state = toml::from_str(&content).map_err(|e| {
            return Error::StateCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            };
        })?;
        return Ok(Self {
            path: path.to_path_buf(),
            state,
        });
    }

    /// Last-read node for each library work.
    pub fn library_positions(&self) -> &BTreeMap<String, String> {
        return &self.state.library_positions;
    }

    /// Write the state back to the file it was loaded from.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlSer` if serialization fails,
    /// or `Error::Io` if the file cannot be written.
    pub fn persist(&self) -> Result<(), Error> {
        let content = self.serialize()?;
        std::fs::write(&self.path, content)?;
        tracing::debug!(path = %self.path.display(), "persisted reader state");
        return Ok(());
    }

    /// Last reading position.
    pub fn position(&self) -> Option<&VerseLocator> {
        return self.state.position.as_ref();
    }

    /// Serialize to TOML.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlSer` if serialization fails.
    pub fn serialize(&self) -> Result<String, Error> {
        return Ok(toml::to_string_pretty(&self.state)?);
    }

    /// Record the last-read node of a library work.
    pub fn set_library_position(&mut self, work_id: &str, node_id: &str) {
        self.state
            .library_positions
            .insert(work_id.to_string(), node_id.to_string());
    }

    /// Record the reading position.
    pub fn set_position(&mut self, locator: VerseLocator) {
        self.state.position = Some(locator);
    }

    /// Set the text size outright.
    pub fn set_text_size(&mut self, size: TextSize) {
        self.state.text_size = size;
    }

    /// Step text size one notch, clamped. Returns the new size.
    pub fn step_text_size(&mut self, up: bool) -> TextSize {
        self.state.text_size = self.state.text_size.step(up);
        return self.state.text_size;
    }

    /// Current text size.
    pub fn text_size(&self) -> TextSize {
        return self.state.text_size;
    }

    /// Add the verse to favorites, or remove it if present.
    /// Returns whether the verse is a favorite afterwards.
    pub fn toggle_favorite(&mut self, locator: VerseLocator) -> bool {
        if self.state.favorites.remove(&locator) {
            return false;
        }
        self.state.favorites.insert(locator);
        return true;
    }
}
