//! Config file discovery settings used by [`SourceBuilder`](crate::SourceBuilder).
//!
//! Two independent axes:
//!
//! - **Discovery** ([`SearchPath`]): which directories to look in, listed in
//!   priority-ascending order (last = highest).
//! - **Resolution** ([`SearchMode`]): merge every file found, or keep only
//!   the highest-priority one.
//!
//! Common setups:
//!
//! ```ignore
//! // user-level file overridden by a project file in the working directory
//! Source::builder()
//!     .app_name("myapp")
//!     .search_paths(vec![SearchPath::Platform, SearchPath::Cwd])
//!     .build()?;
//!
//! // nearest file walking up to the repository root, nothing else
//! Source::builder()
//!     .app_name("myapp")
//!     .search_paths(vec![SearchPath::Ancestors(Boundary::Marker(".git"))])
//!     .search_mode(SearchMode::FirstMatch)
//!     .build()?;
//! ```

use std::path::PathBuf;

/// Where to search for config files.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".myapp")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit directory.
    Path(PathBuf),
    /// The working directory and its parents, shallowest first.
    Ancestors(Boundary),
}

/// How far [`SearchPath::Ancestors`] walks up.
#[derive(Debug, Clone, PartialEq)]
pub enum Boundary {
    /// All the way to the filesystem root.
    Root,
    /// Stop (inclusive) at the first directory containing this entry.
    Marker(&'static str),
}

/// What to do when more than one config file is found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// Deep-merge every file, later files overriding earlier ones.
    #[default]
    Merge,
    /// Use only the highest-priority file found.
    FirstMatch,
}
