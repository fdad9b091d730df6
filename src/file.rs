//! Config file discovery and loading.
//!
//! Each [`SearchPath`] expands to one or more directories, listed
//! priority-ascending. `Ancestors(boundary)` walks from the working directory
//! up toward the root and emits directories **shallowest first**, so the
//! directory closest to the working directory has the highest priority.
//!
//! After expansion each directory is checked for `{dir}/{file_name}`:
//! [`SearchMode::Merge`] keeps every file found, [`SearchMode::FirstMatch`]
//! keeps only the one nearest the high-priority end. Missing files are
//! skipped in both modes; other I/O errors and TOML parse errors carry the
//! offending path.

use std::path::{Path, PathBuf};

use toml::Table;
use tracing::debug;

use crate::error::TagbindError;
use crate::merge::lowercase_keys;
use crate::types::{Boundary, SearchMode, SearchPath};

/// Expand one search path into concrete directories.
///
/// `Platform` needs an app name to build the platform config directory
/// (e.g. `~/.config/{app_name}/` on Linux). Paths that cannot be resolved on
/// this system (no home directory) expand to nothing.
pub fn expand_search_path(
    sp: &SearchPath,
    app_name: Option<&str>,
) -> Result<Vec<PathBuf>, TagbindError> {
    let dir = match sp {
        SearchPath::Platform => {
            let app_name = app_name.ok_or(TagbindError::AppNameRequired)?;
            directories::ProjectDirs::from("", "", app_name)
                .map(|proj| proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            directories::UserDirs::new().map(|user| user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
        SearchPath::Ancestors(boundary) => return Ok(expand_ancestors(boundary)),
    };
    Ok(dir.into_iter().collect())
}

/// Directories from the working directory up to `boundary`, shallowest first.
pub fn expand_ancestors(boundary: &Boundary) -> Vec<PathBuf> {
    let Ok(cwd) = std::env::current_dir() else {
        return vec![];
    };
    expand_ancestors_from(cwd, boundary)
}

/// Like [`expand_ancestors`] but starting from an explicit directory.
///
/// A [`Boundary::Marker`] stops the walk (inclusive) at the first directory
/// containing the marker entry, falling back to the root if none does.
pub fn expand_ancestors_from(start: PathBuf, boundary: &Boundary) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut current = start.as_path();

    loop {
        dirs.push(current.to_path_buf());

        if let Boundary::Marker(name) = boundary
            && current.join(name).exists()
        {
            break;
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }

    dirs.reverse();
    dirs
}

/// Expand all search paths into a flat, priority-ascending directory list.
pub fn expand_search_paths(
    search_paths: &[SearchPath],
    app_name: Option<&str>,
) -> Result<Vec<PathBuf>, TagbindError> {
    let mut dirs = Vec::new();
    for sp in search_paths {
        dirs.extend(expand_search_path(sp, app_name)?);
    }
    Ok(dirs)
}

/// Find and parse config files, respecting `mode`. Keys are lower-cased.
pub fn load_config_files(
    search_paths: &[SearchPath],
    file_name: &str,
    app_name: Option<&str>,
    mode: SearchMode,
) -> Result<Vec<(PathBuf, Table)>, TagbindError> {
    let dirs = expand_search_paths(search_paths, app_name)?;
    debug!(?dirs, file_name, ?mode, "searching for config files");

    let found = match mode {
        SearchMode::Merge => load_all(&dirs, file_name)?,
        SearchMode::FirstMatch => load_first_match(&dirs, file_name)?,
    };
    found
        .into_iter()
        .map(|(path, content)| {
            let table = parse_table(&path, &content)?;
            Ok((path, table))
        })
        .collect()
}

/// Read and parse a single file. Unlike discovery, a missing file is an error.
pub fn load_file(path: &Path) -> Result<Table, TagbindError> {
    let content = std::fs::read_to_string(path).map_err(|e| TagbindError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_table(path, &content)
}

fn parse_table(path: &Path, content: &str) -> Result<Table, TagbindError> {
    let table = content
        .parse::<Table>()
        .map_err(|e| TagbindError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
    debug!(path = %path.display(), keys = table.len(), "loaded config file");
    Ok(lowercase_keys(table))
}

fn read_if_present(file_path: PathBuf) -> Result<Option<(PathBuf, String)>, TagbindError> {
    match std::fs::read_to_string(&file_path) {
        Ok(content) => Ok(Some((file_path, content))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(TagbindError::IoError {
            path: file_path,
            source: e,
        }),
    }
}

fn load_all(dirs: &[PathBuf], file_name: &str) -> Result<Vec<(PathBuf, String)>, TagbindError> {
    let mut results = Vec::new();
    for dir in dirs {
        if let Some(found) = read_if_present(dir.join(file_name))? {
            results.push(found);
        }
    }
    Ok(results)
}

/// Searches from the high-priority end of `dirs` backward.
fn load_first_match(
    dirs: &[PathBuf],
    file_name: &str,
) -> Result<Vec<(PathBuf, String)>, TagbindError> {
    for dir in dirs.iter().rev() {
        if let Some(found) = read_if_present(dir.join(file_name))? {
            return Ok(vec![found]);
        }
    }
    Ok(vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn explicit_path_expands_to_itself() {
        let p = PathBuf::from("/tmp/myapp");
        let dirs = expand_search_path(&SearchPath::Path(p.clone()), None).unwrap();
        assert_eq!(dirs, vec![p]);
    }

    #[test]
    fn platform_without_app_name_errors() {
        let result = expand_search_path(&SearchPath::Platform, None);
        assert!(matches!(result, Err(TagbindError::AppNameRequired)));
    }

    #[test]
    fn load_no_files_exist() {
        let dir = TempDir::new().unwrap();
        let paths = vec![SearchPath::Path(dir.path().to_path_buf())];
        let files = load_config_files(&paths, "nonexistent.toml", None, SearchMode::Merge).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn loaded_keys_are_lowercased() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.toml"), "DB-Host = \"x\"\n").unwrap();
        let paths = vec![SearchPath::Path(dir.path().to_path_buf())];
        let files = load_config_files(&paths, "app.toml", None, SearchMode::Merge).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1["db-host"].as_str(), Some("x"));
    }

    #[test]
    fn merge_mode_keeps_every_file_in_order() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        let dir3 = TempDir::new().unwrap();
        fs::write(dir1.path().join("app.toml"), "host = \"a\"\n").unwrap();
        fs::write(dir3.path().join("app.toml"), "port = 1000\n").unwrap();

        let paths = vec![
            SearchPath::Path(dir1.path().to_path_buf()),
            SearchPath::Path(dir2.path().to_path_buf()),
            SearchPath::Path(dir3.path().to_path_buf()),
        ];
        let files = load_config_files(&paths, "app.toml", None, SearchMode::Merge).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].1.contains_key("host"));
        assert!(files[1].1.contains_key("port"));
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("app.toml");
        fs::write(&file_path, "port = = 1\n").unwrap();
        let paths = vec![SearchPath::Path(dir.path().to_path_buf())];
        let err = load_config_files(&paths, "app.toml", None, SearchMode::Merge).unwrap_err();
        assert!(matches!(err, TagbindError::ParseError { path, .. } if path == file_path));
    }

    #[test]
    fn load_file_missing_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = load_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(TagbindError::IoError { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_returns_io_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("app.toml");
        fs::write(&file_path, "port = 1\n").unwrap();
        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o000)).unwrap();

        // Running as root bypasses permission bits; only assert when the read really fails.
        let readable = fs::read_to_string(&file_path).is_ok();
        let paths = vec![SearchPath::Path(dir.path().to_path_buf())];
        let result = load_config_files(&paths, "app.toml", None, SearchMode::Merge);
        assert_eq!(result.is_err(), !readable);

        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[test]
    fn first_match_returns_highest_priority() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        fs::write(dir1.path().join("app.toml"), "host = \"low\"\n").unwrap();
        fs::write(dir2.path().join("app.toml"), "host = \"high\"\n").unwrap();

        let paths = vec![
            SearchPath::Path(dir1.path().to_path_buf()),
            SearchPath::Path(dir2.path().to_path_buf()),
        ];
        let files = load_config_files(&paths, "app.toml", None, SearchMode::FirstMatch).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1["host"].as_str(), Some("high"));
    }

    #[test]
    fn first_match_falls_back_to_lower_priority() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        fs::write(dir1.path().join("app.toml"), "host = \"fallback\"\n").unwrap();

        let paths = vec![
            SearchPath::Path(dir1.path().to_path_buf()),
            SearchPath::Path(dir2.path().to_path_buf()),
        ];
        let files = load_config_files(&paths, "app.toml", None, SearchMode::FirstMatch).unwrap();
        assert_eq!(files[0].1["host"].as_str(), Some("fallback"));
    }

    #[test]
    fn ancestors_root_ends_at_cwd() {
        let dirs = expand_ancestors(&Boundary::Root);
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(dirs.last().unwrap(), &cwd);
        for pair in dirs.windows(2) {
            assert!(pair[1].starts_with(&pair[0]));
        }
    }

    #[test]
    fn ancestors_marker_stops_at_marker() {
        let dir = TempDir::new().unwrap();
        let deep = dir.path().join("a").join("b").join("c");
        fs::create_dir_all(&deep).unwrap();
        fs::create_dir(dir.path().join("a").join(".git")).unwrap();

        let dirs = expand_ancestors_from(deep.clone(), &Boundary::Marker(".git"));

        assert_eq!(dirs.first().unwrap(), &dir.path().join("a"));
        assert_eq!(dirs.last().unwrap(), &deep);
        assert!(!dirs.contains(&dir.path().to_path_buf()));
    }

    #[test]
    fn ancestors_marker_missing_walks_to_root() {
        let dir = TempDir::new().unwrap();
        let deep = dir.path().join("x").join("y");
        fs::create_dir_all(&deep).unwrap();

        let dirs = expand_ancestors_from(deep.clone(), &Boundary::Marker(".nonexistent"));
        assert!(dirs.contains(&dir.path().to_path_buf()));
        assert!(dirs.contains(&deep));
    }

    #[test]
    fn ancestors_first_match_finds_nearest() {
        let root = TempDir::new().unwrap();
        let mid = root.path().join("mid");
        let deep = mid.join("deep");
        fs::create_dir_all(&deep).unwrap();
        fs::write(mid.join("app.toml"), "host = \"mid\"\n").unwrap();
        fs::write(root.path().join("app.toml"), "host = \"root\"\n").unwrap();

        let dirs = vec![root.path().to_path_buf(), mid.clone(), deep.clone()];
        let files = load_first_match(&dirs, "app.toml").unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].1.contains("mid"));
    }
}
