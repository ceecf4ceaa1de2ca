//! Mode-aware enumeration of a built application tree.
//!
//! | Mode | Included (relative to the app directory)                        |
//! |------|-----------------------------------------------------------------|
//! | ssr  | `public/**`, `.production/client.js`, `.production/client.css`  |
//! | ssg  | `ssg/**`                                                        |
//! | spa  | `spa/**`                                                        |
//!
//! Source maps are never included. Symbolic links are followed and their
//! targets reported as regular files.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use skylift_core::BuildMode;
use walkdir::WalkDir;

/// Production build folder of an SSR app.
pub const PRODUCTION_DIR: &str = ".production";
/// Static output shared by every mode of an SSR app.
pub const PUBLIC_DIR: &str = "public";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A file found under the build directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFile {
    /// Path relative to the root, `/`-separated
    pub relative: String,
    /// Path on disk
    pub path: PathBuf,
}

/// The files of one application relevant to one mode.
///
/// Construction checks that the tree exists; [`iter`](Self::iter) walks it
/// lazily and can be called any number of times.
#[derive(Debug, Clone)]
pub struct FileSet {
    root: PathBuf,
    mode: BuildMode,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl FileSet {
    pub fn new(root: &Path, mode: BuildMode) -> Result<Self, EnumerateError> {
        if !root.is_dir() {
            return Err(EnumerateError::MissingDirectory {
                path: root.to_path_buf(),
            });
        }
        for base in walk_roots(mode) {
            let dir = root.join(base);
            if !dir.is_dir() {
                return Err(EnumerateError::MissingDirectory { path: dir });
            }
        }

        let (include, exclude) = patterns(mode);
        Ok(Self {
            root: root.to_path_buf(),
            mode,
            include: include.iter().map(|p| compile(p)).collect(),
            exclude: exclude.iter().map(|p| compile(p)).collect(),
        })
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Whether a `/`-separated relative path belongs to this set.
    pub fn accepts(&self, relative: &str) -> bool {
        self.include
            .iter()
            .any(|p| p.matches_with(relative, MATCH_OPTIONS))
            && !self
                .exclude
                .iter()
                .any(|p| p.matches_with(relative, MATCH_OPTIONS))
    }

    /// Walk the tree. Entries come in a stable order: walk roots in the
    /// order of [`walk_roots`], files sorted by name within each directory.
    pub fn iter(&self) -> impl Iterator<Item = Result<BuildFile, EnumerateError>> + '_ {
        walk_roots(self.mode)
            .iter()
            .flat_map(move |base| {
                WalkDir::new(self.root.join(base))
                    .follow_links(true)
                    .sort_by_file_name()
                    .into_iter()
            })
            .filter_map(move |entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => return Some(Err(EnumerateError::Walk { source: e })),
                };
                if entry.file_type().is_dir() {
                    return None;
                }
                let relative = match relative_key(&self.root, entry.path()) {
                    Ok(relative) => relative,
                    Err(e) => return Some(Err(e)),
                };
                if self.accepts(&relative) {
                    Some(Ok(BuildFile {
                        relative,
                        path: entry.into_path(),
                    }))
                } else {
                    tracing::trace!(file = %relative, mode = %self.mode, "filtered out");
                    None
                }
            })
    }

    /// Walk the tree to completion, stopping at the first error.
    pub fn collect(&self) -> Result<Vec<BuildFile>, EnumerateError> {
        self.iter().collect()
    }
}

/// Directories walked for a mode, relative to the app directory.
pub fn walk_roots(mode: BuildMode) -> &'static [&'static str] {
    match mode {
        BuildMode::Ssr => &[PRODUCTION_DIR, PUBLIC_DIR],
        BuildMode::Ssg => &["ssg"],
        BuildMode::Spa => &["spa"],
    }
}

fn patterns(mode: BuildMode) -> (&'static [&'static str], &'static [&'static str]) {
    match mode {
        BuildMode::Ssr => (
            &["public/**", ".production/client.js", ".production/client.css"],
            &["**/*.map", ".production/server.js"],
        ),
        BuildMode::Ssg => (&["ssg/**"], &[]),
        BuildMode::Spa => (&["spa/**"], &[]),
    }
}

fn compile(pattern: &str) -> Pattern {
    match Pattern::new(pattern) {
        Ok(p) => p,
        // Patterns are compile-time literals.
        Err(e) => unreachable!("invalid built-in pattern {pattern:?}: {e}"),
    }
}

/// `path` relative to `root`, joined with `/`.
pub(crate) fn relative_key(root: &Path, path: &Path) -> Result<String, EnumerateError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| EnumerateError::OutsideRoot {
            path: path.to_path_buf(),
        })?;
    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| EnumerateError::NonUtf8Path {
                path: path.to_path_buf(),
            })?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

#[derive(Debug, thiserror::Error)]
pub enum EnumerateError {
    #[error("build directory {path} does not exist — run the application build first")]
    MissingDirectory { path: PathBuf },

    #[error("failed to walk build directory")]
    Walk { source: walkdir::Error },

    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path { path: PathBuf },

    #[error("walked path {path} escaped the build directory")]
    OutsideRoot { path: PathBuf },
}
