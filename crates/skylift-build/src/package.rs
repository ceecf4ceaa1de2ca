use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use skylift_core::BuildConfig;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::entrypoint::{ENTRY_FILE, EntryPointGenerator};
use crate::enumerate::{PRODUCTION_DIR, PUBLIC_DIR, relative_key};

/// Name of the inner archive holding the function code.
pub const BUILD_ARCHIVE: &str = "build.zip";

/// Extensions inside `.production/` that never reach the function bundle:
/// source maps and uncompiled sources.
const SERVER_EXCLUDED_EXTENSIONS: &[&str] = &["map", "ts", "tsx", "jsx"];

/// One file inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// `/`-separated path inside the archive
    pub name: String,
    pub source: EntrySource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// The full list of entries of an archive, computed before anything is written.
#[derive(Debug, Clone, Default)]
pub struct ArchivePlan {
    entries: Vec<ArchiveEntry>,
}

impl ArchivePlan {
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push_bytes(&mut self, name: &str, bytes: Vec<u8>) {
        self.entries.push(ArchiveEntry {
            name: name.to_owned(),
            source: EntrySource::Bytes(bytes),
        });
    }

    /// Add every file under `dir` as `<prefix>/<relative path>` (or just the
    /// relative path when `prefix` is empty), keeping only what `keep` accepts.
    fn push_tree(
        &mut self,
        dir: &Path,
        prefix: &str,
        keep: impl Fn(&str) -> bool,
    ) -> Result<(), PackageError> {
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| PackageError::Walk {
                dir: dir.to_path_buf(),
                source: e,
            })?;
            if entry.file_type().is_dir() {
                continue;
            }
            let relative = relative_key(dir, entry.path())?;
            if !keep(&relative) {
                tracing::debug!(file = %relative, prefix, "excluded from bundle");
                continue;
            }
            let name = if prefix.is_empty() {
                relative
            } else {
                format!("{prefix}/{relative}")
            };
            self.entries.push(ArchiveEntry {
                name,
                source: EntrySource::File(entry.into_path()),
            });
        }
        Ok(())
    }
}

/// Whether a path relative to `.production/` belongs in the function bundle.
pub fn keep_server_output(relative: &str) -> bool {
    let extension = relative
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext);
    !matches!(extension, Some(ext) if SERVER_EXCLUDED_EXTENSIONS.contains(&ext))
}

/// Archive path of the vendored shim tree.
pub fn shim_prefix(shim_package: &str) -> String {
    format!("node_modules/{}", shim_package.trim_matches('/'))
}

/// Archives produced for one SSR application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedApp {
    pub name: String,
    /// `<out_dir>/<app>/build.zip`: the function code
    pub build_archive: PathBuf,
    /// `<out_dir>/<app>.zip`: the folder holding `build.zip`, zipped again
    pub dist_archive: PathBuf,
    /// Number of entries written to `build_archive`
    pub entries: usize,
}

/// Assembles the deployable bundle of an SSR application.
///
/// Owns its settings so it can be moved into a blocking task per app.
#[derive(Debug, Clone)]
pub struct Packager {
    out_dir: PathBuf,
    shim_dir: PathBuf,
    shim_package: String,
}

impl Packager {
    /// Paths in `config` are resolved against `project_dir`.
    pub fn new(config: &BuildConfig, project_dir: &Path) -> Self {
        Self {
            out_dir: project_dir.join(&config.out_dir),
            shim_dir: project_dir.join(&config.shim_dir),
            shim_package: config.shim_package.clone(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn shim_dir(&self) -> &Path {
        &self.shim_dir
    }

    /// Where [`package`](Self::package) writes the archives of `app_name`.
    pub fn archive_paths(&self, app_name: &str) -> (PathBuf, PathBuf) {
        (
            self.out_dir.join(app_name).join(BUILD_ARCHIVE),
            self.out_dir.join(format!("{app_name}.zip")),
        )
    }

    /// Compute the entries of the build archive without writing anything.
    ///
    /// # Errors
    ///
    /// - [`PackageError::NotBuilt`] if `<app_dir>/.production` is missing
    /// - [`PackageError::MissingDirectory`] if `<app_dir>/public` is missing
    /// - [`PackageError::MissingShim`] if the vendored shim tree is missing
    pub fn plan(&self, app_dir: &Path) -> Result<ArchivePlan, PackageError> {
        let production = app_dir.join(PRODUCTION_DIR);
        if !production.is_dir() {
            return Err(PackageError::NotBuilt {
                expected: production,
            });
        }
        let public = app_dir.join(PUBLIC_DIR);
        if !public.is_dir() {
            return Err(PackageError::MissingDirectory { path: public });
        }
        if !self.shim_dir.is_dir() {
            return Err(PackageError::MissingShim {
                path: self.shim_dir.clone(),
            });
        }

        let mut plan = ArchivePlan::default();
        let entry_point = EntryPointGenerator::new(&self.shim_package).render();
        plan.push_bytes(ENTRY_FILE, entry_point.into_bytes());
        plan.push_tree(&production, PRODUCTION_DIR, keep_server_output)?;
        plan.push_tree(&public, PUBLIC_DIR, |_| true)?;
        plan.push_tree(&self.shim_dir, &shim_prefix(&self.shim_package), |_| true)?;
        Ok(plan)
    }

    /// Write `build.zip` and the distribution archive for one application.
    ///
    /// Both archives are rebuilt from scratch and replace any previous ones.
    /// Preconditions are checked before anything touches the output folder.
    pub fn package(&self, app_name: &str, app_dir: &Path) -> Result<PackagedApp, PackageError> {
        let plan = self.plan(app_dir)?;
        let (build_archive, dist_archive) = self.archive_paths(app_name);

        write_archive(&build_archive, plan.entries())?;
        tracing::debug!(
            app = app_name,
            entries = plan.len(),
            path = %build_archive.display(),
            "build archive written"
        );

        let build_folder = self.out_dir.join(app_name);
        let mut dist = ArchivePlan::default();
        dist.push_tree(&build_folder, "", |rel| rel == BUILD_ARCHIVE)?;
        write_archive(&dist_archive, dist.entries())?;

        tracing::info!(
            app = app_name,
            path = %dist_archive.display(),
            "bundle packaged"
        );

        Ok(PackagedApp {
            name: app_name.to_owned(),
            build_archive,
            dist_archive,
            entries: plan.len(),
        })
    }
}

/// Write `entries` to a zip at `path`, replacing any existing file.
///
/// The archive is assembled in a temporary file next to `path` and renamed
/// into place only once complete; on error the temporary file is removed and
/// `path` is left untouched. Timestamps and permissions are fixed so equal
/// inputs give byte-identical archives.
pub fn write_archive(path: &Path, entries: &[ArchiveEntry]) -> Result<(), PackageError> {
    let parent = match path.parent() {
        Some(parent) => parent,
        None => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| PackageError::CreateDir {
        path: parent.to_path_buf(),
        source: e,
    })?;

    let archive_err = |source: zip::result::ZipError| PackageError::ArchiveWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| archive_err(zip::result::ZipError::Io(e)))?;

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    {
        let mut writer = ZipWriter::new(tmp.as_file_mut());
        for entry in entries {
            writer
                .start_file(entry.name.as_str(), options)
                .map_err(archive_err)?;
            match &entry.source {
                EntrySource::Bytes(bytes) => writer
                    .write_all(bytes)
                    .map_err(|e| archive_err(zip::result::ZipError::Io(e)))?,
                EntrySource::File(file) => {
                    let mut reader = File::open(file).map_err(|e| PackageError::ReadFile {
                        path: file.clone(),
                        source: e,
                    })?;
                    std::io::copy(&mut reader, &mut writer)
                        .map_err(|e| archive_err(zip::result::ZipError::Io(e)))?;
                }
            }
        }
        writer.finish().map_err(archive_err)?;
    }

    tmp.persist(path)
        .map_err(|e| archive_err(zip::result::ZipError::Io(e.error)))?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("application is not built: {expected} is missing — run the production build first")]
    NotBuilt { expected: PathBuf },

    #[error("expected build output folder {path} is missing")]
    MissingDirectory { path: PathBuf },

    #[error("compatibility shim not found at {path} — install its dependencies first")]
    MissingShim { path: PathBuf },

    #[error("failed to walk {dir}")]
    Walk {
        dir: PathBuf,
        source: walkdir::Error,
    },

    #[error(transparent)]
    Enumerate(#[from] crate::enumerate::EnumerateError),

    #[error("failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read {path}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write archive {path}")]
    ArchiveWrite {
        path: PathBuf,
        source: zip::result::ZipError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_output_drops_maps_and_sources() {
        assert!(keep_server_output("server.js"));
        assert!(keep_server_output("client.js"));
        assert!(keep_server_output("client.css"));
        assert!(!keep_server_output("server.js.map"));
        assert!(!keep_server_output("client.css.map"));
        assert!(!keep_server_output("server.ts"));
        assert!(!keep_server_output("chunks/page.tsx"));
    }

    #[test]
    fn dot_in_folder_does_not_count_as_extension() {
        assert!(keep_server_output("v1.map/bundle.js"));
    }

    #[test]
    fn shim_prefix_lives_under_node_modules() {
        assert_eq!(
            shim_prefix("@vendia/serverless-express"),
            "node_modules/@vendia/serverless-express"
        );
        assert_eq!(shim_prefix("/shim/"), "node_modules/shim");
    }

    #[test]
    fn archive_paths_follow_layout() {
        let packager = Packager::new(&BuildConfig::default(), Path::new("/project"));
        let (build, dist) = packager.archive_paths("web");
        assert_eq!(build, Path::new("/project/.skylift/build/web/build.zip"));
        assert_eq!(dist, Path::new("/project/.skylift/build/web.zip"));
    }
}
