use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{self, Config};
use crate::resolver::{BOOK_TAG, LIBRARY_TAG, SCRIPTURE_TAG};
use crate::state::ReaderState;
use crate::types::AnnotationKind;

/// Config, routes, and reader state found in the working root.
struct CurrentState {
    /// Whether `.osbref.toml` exists.
    config_found: bool,
    /// Favorite count, when a readable state file exists.
    favorites: Option<usize>,
    /// Library route prefix.
    library_route: String,
    /// Scripture route prefix.
    scripture_route: String,
    /// Reader-state file path.
    state_file: String,
}

/// One exit code and what it means.
#[derive(Serialize)]
struct ExitCodeInfo {
    /// Process exit code.
    code: u8,
    /// Meaning of the code.
    meaning: String,
}

/// Top-level JSON document.
#[derive(Serialize)]
struct InfoJson {
    /// Working-root state.
    current_state: StateJson,
    /// Exit code table.
    exit_codes: Vec<ExitCodeInfo>,
    /// Every recognized marker tag.
    marker_tags: Vec<String>,
    /// Crate version.
    version: String,
}

/// Route prefixes in JSON form.
#[derive(Serialize)]
struct RoutesJson {
    /// Library route prefix.
    library: String,
    /// Scripture route prefix.
    scripture: String,
}

/// Working-root state in JSON form.
#[derive(Serialize)]
struct StateJson {
    /// Whether `.osbref.toml` exists.
    config_found: bool,
    /// Favorite count, when a readable state file exists.
    favorites: Option<usize>,
    /// Route prefixes.
    routes: RoutesJson,
    /// Reader-state file path.
    state_file: String,
}

/// Read config and reader state without failing on either.
fn gather_state(root: &Path) -> CurrentState {
    let config_found = root.join(config::CONFIG_FILE).exists();
    let config = Config::load(root).unwrap_or_else(|_| return Config::defaults());
    let state_path = root.join(&config.state_file);
    let favorites = state_path
        .exists()
        .then(|| return ReaderState::init(&state_path).ok())
        .flatten()
        .map(|s| return s.favorites().len());

    return CurrentState {
        config_found,
        favorites,
        library_route: config.routes.library.clone(),
        scripture_route: config.routes.scripture.clone(),
        state_file: config.state_file.display().to_string(),
    };
}

/// Every recognized marker tag, in marker-table order.
fn marker_tags() -> Vec<String> {
    let mut tags = vec![SCRIPTURE_TAG.to_string()];
    tags.extend(AnnotationKind::ALL.iter().map(|k| return k.as_str().to_string()));
    tags.push(BOOK_TAG.to_string());
    tags.push(LIBRARY_TAG.to_string());
    return tags;
}

/// Print the reference document as JSON.
fn print_json(state: &CurrentState) {
    let info = InfoJson {
        current_state: StateJson {
            config_found: state.config_found,
            favorites: state.favorites,
            routes: RoutesJson {
                library: state.library_route.clone(),
                scripture: state.scripture_route.clone(),
            },
            state_file: state.state_file.clone(),
        },
        exit_codes: vec![
            ExitCodeInfo { code: 0, meaning: "Success / all markers valid".to_string() },
            ExitCodeInfo { code: 1, meaning: "Rejected markers found".to_string() },
            ExitCodeInfo { code: 2, meaning: "Markers name annotations missing from the dump".to_string() },
            ExitCodeInfo { code: 3, meaning: "Runtime error".to_string() },
        ],
        marker_tags: marker_tags(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    // serde_json::to_string_pretty won't fail on this structure.
    let json = serde_json::to_string_pretty(&info).unwrap_or_default();
    println!("{json}");
}

/// Print the reference document as markdown.
fn print_markdown(state: &CurrentState) {
    let version = env!("CARGO_PKG_VERSION");
    print_markdown_header(version);
    print_markdown_state(state);
    println!();
    print_markdown_exit_codes();
}

/// Exit code table.
fn print_markdown_exit_codes() {
    print!(
        "\
## Exit Codes

| Code | Meaning |
|------|---------|
| 0    | Success / all markers valid |
| 1    | Rejected markers found |
| 2    | Markers name annotations missing from the dump |
| 3    | Runtime error |
"
    );
}

/// Title, syntax reference, commands, and configuration.
fn print_markdown_header(version: &str) {
    print!(
        "\
# osbref {version}

Annotation placement and inline reference markers for an Orthodox Study Bible
reader. Places each study note on exactly one verse and resolves `[tag[value]]`
markers in article and chat text.

## Marker Syntax

    [SCRIPTURE[genesis:1]]                 whole chapter
    [SCRIPTURE[genesis:1:3]]               single verse
    [SCRIPTURE[genesis:1:9-11]]            verse range
    [study[f1]]  [liturgical[l1]]          annotation lookups
    [variant[v1]]  [citation[c1]]  [article[a1]]
    [book[john]]                           whole book
    [library[work:node]]                   library node
    [library[work:node#anchor]]            library paragraph

## Display Locations

    1:3       shown on verse 3
    1:9-11    shown on verse 9 only
    1:5a      shown on verse 5

## Commands

    osbref scan <file>                Substitute markers and list them
    osbref check                      Lint markers in every text file (exit 0/1/2)
    osbref target <marker>            Print where one marker leads
    osbref activate <marker>          Run one activation against a lookup dump
    osbref place <chapter.json>       Place chapter annotations on verses
    osbref place <file> --chapters    Also print previous/next chapter paths
    osbref toc <toc.json>             Print a library table of contents
    osbref state show                 Show favorites, position, text size

## Configuration (.osbref.toml)

    include = [\"articles/\"]             # only scan these paths
    exclude = [\"articles/drafts/\"]      # skip these paths
    state_file = \".osbref-state.toml\"   # reader-state location

    [routes]
    scripture = \"/read\"                 # /read/genesis/1#v3
    library = \"/library\"                # /library/work/node#anchor

## Current State

"
    );
}

/// Config, routes, and state lines.
fn print_markdown_state(state: &CurrentState) {
    if state.config_found {
        println!("Config:     {} (found)", config::CONFIG_FILE);
    } else {
        println!("Config:     {} (not found)", config::CONFIG_FILE);
    }

    println!("Routes:     scripture -> {}, library -> {}", state.scripture_route, state.library_route);

    let Some(n) = state.favorites else {
        println!("State:      {} (not found)", state.state_file);
        return;
    };
    println!("State:      {} ({n} favorites)", state.state_file);
}

/// Output the osbref reference document.
pub fn run(json: bool) {
    let root = PathBuf::from(".");
    let state = gather_state(&root);

    if json {
        print_json(&state);
    } else {
        print_markdown(&state);
    }
}
