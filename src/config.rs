use std::path::{Path, PathBuf};

use crate::error::Error;

/// Config file name looked up in the working root.
pub const CONFIG_FILE: &str = ".osbref.toml";

/// Default reader-state file name, relative to the working root.
const DEFAULT_STATE_FILE: &str = ".osbref-state.toml";

/// Project configuration loaded from `.osbref.toml`.
/// Include/exclude patterns are path prefixes applied to scanned text files.
pub struct Config {
    /// Path prefixes to skip during `check`.
    exclude: Vec<String>,
    /// Path prefixes to scan during `check`; empty means everything.
    include: Vec<String>,
    /// Path prefixes for navigation targets.
    pub routes: Routes,
    /// Reader-state file, relative to the working root.
    pub state_file: PathBuf,
}

/// Path prefixes that navigation targets are built under.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Routes {
    /// Prefix for library work/node paths.
    #[serde(default = "default_library_route")]
    pub library: String,
    /// Prefix for book/chapter reading paths.
    #[serde(default = "default_scripture_route")]
    pub scripture: String,
}

impl Default for Routes {
    fn default() -> Self {
        return Self {
            library: default_library_route(),
            scripture: default_scripture_route(),
        };
    }
}

/// Raw TOML structure for `.osbref.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct OsbrefTomlConfig {
    /// Path prefixes to skip.
    #[serde(default)]
    exclude: Vec<String>,
    /// Path prefixes to scan.
    #[serde(default)]
    include: Vec<String>,
    /// Route prefixes.
    #[serde(default)]
    routes: Routes,
    /// Reader-state file override.
    state_file: Option<PathBuf>,
}

impl Config {
    /// Config that scans everything and uses default routes.
    pub fn defaults() -> Self {
        return Self {
            exclude: Vec::new(),
            include: Vec::new(),
            routes: Routes::default(),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
        };
    }

    /// Load config from `.osbref.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist. A file that exists but is
    /// malformed is an error; it never silently falls back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no {CONFIG_FILE}, using defaults");
                return Ok(Self::defaults());
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };

        return Self::parse(&content);
    }

    /// Parse config from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: OsbrefTomlConfig = toml::from_str(content)?;
        let routes = Routes {
            library: trim_route(&raw.routes.library),
            scripture: trim_route(&raw.routes.scripture),
        };
        return Ok(Self {
            exclude: raw.exclude,
            include: raw.include,
            routes,
            state_file: raw.state_file.unwrap_or_else(|| return PathBuf::from(DEFAULT_STATE_FILE)),
        });
    }

    /// Check whether a text file path should be scanned.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}

/// Default library route prefix.
fn default_library_route() -> String {
    return "/library".to_string();
}

/// Default scripture route prefix.
fn default_scripture_route() -> String {
    return "/read".to_string();
}

/// Drop a trailing slash so joined paths never contain `//`.
fn trim_route(route: &str) -> String {
    let trimmed = route.trim_end_matches('/');
    return trimmed.to_string();
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use super::*;

    #[test]
    fn empty_config_scans_everything_with_default_routes() {
        let config = Config::parse("").unwrap();
        assert!(config.should_scan("anything/at/all.md"));
        assert_eq!(config.routes, Routes::default());
        assert_eq!(config.state_file, PathBuf::from(DEFAULT_STATE_FILE));
    }

    #[test]
    fn include_then_exclude() {
        let config = Config::parse(
            r#"
            include = ["articles/"]
            exclude = ["articles/drafts/"]
            "#,
        )
        .unwrap();
        assert!(config.should_scan("articles/creation.md"));
        assert!(!config.should_scan("articles/drafts/wip.md"));
        assert!(!config.should_scan("chat/log.txt"));
    }

    #[test]
    fn routes_lose_trailing_slash() {
        let config = Config::parse(
            r#"
            [routes]
            scripture = "/bible/"
            "#,
        )
        .unwrap();
        assert_eq!(config.routes.scripture, "/bible");
        assert_eq!(config.routes.library, "/library");
    }

    #[test]
    fn unknown_keys_are_an_error() {
        assert!(matches!(Config::parse("nope = 1"), Err(Error::TomlDe(_))));
    }
}
