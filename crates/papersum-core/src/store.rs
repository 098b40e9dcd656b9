//! Output layout for one run.
//!
//! ```text
//! <output_root>/<YYYY-MM-DD_HH-MM-SS>/<id>.md
//! <output_root>/<YYYY-MM-DD_HH-MM-SS>/pdf/<original name>.pdf
//! ```
//!
//! Per item, [`OutputStore::write_summary`] must complete before
//! [`OutputStore::archive_source`] is attempted. A failure between the two
//! leaves the source in the input directory, where the next run finds it
//! again and rewrites the same artifact.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::naming::ArtifactId;
use crate::{SourceDocument, StartupError, SummaryArtifact};

/// Timestamp format used for the per-run directory name.
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Name of the archive subdirectory inside a run directory.
pub const ARCHIVE_DIR_NAME: &str = "pdf";

/// Paths scoped to a single invocation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    timestamp: DateTime<Local>,
    output_dir: PathBuf,
    archive_dir: PathBuf,
}

impl RunContext {
    /// Run context stamped with the current local time.
    pub fn now(output_root: impl AsRef<Path>) -> Self {
        Self::at(output_root, Local::now())
    }

    pub fn at(output_root: impl AsRef<Path>, timestamp: DateTime<Local>) -> Self {
        let output_dir = output_root
            .as_ref()
            .join(timestamp.format(RUN_TIMESTAMP_FORMAT).to_string());
        let archive_dir = output_dir.join(ARCHIVE_DIR_NAME);
        Self {
            timestamp,
            output_dir,
            archive_dir,
        }
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }
}

/// Result of persisting a summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryWrite {
    pub path: PathBuf,
    /// An artifact with the same id already existed and was replaced.
    pub replaced: bool,
}

/// Owns every filesystem side effect of a successful job.
///
/// Only obtainable through [`OutputStore::prepare`], so both directories are
/// guaranteed to exist before any write or move happens.
#[derive(Debug)]
pub struct OutputStore {
    run: RunContext,
}

impl OutputStore {
    /// Create the summary and archive directories. Existing directories are
    /// fine.
    pub fn prepare(run: RunContext) -> Result<Self, StartupError> {
        for dir in [run.output_dir(), run.archive_dir()] {
            std::fs::create_dir_all(dir).map_err(|source| StartupError::OutputDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        tracing::debug!(dir = %run.output_dir().display(), "prepared output directories");
        Ok(Self { run })
    }

    pub fn run(&self) -> &RunContext {
        &self.run
    }

    pub fn summary_path(&self, id: &ArtifactId) -> PathBuf {
        self.run.output_dir().join(id.file_name())
    }

    pub fn archive_path(&self, source: &SourceDocument) -> PathBuf {
        self.run.archive_dir().join(&source.file_name)
    }

    /// Write `<output_dir>/<id>.md`, replacing any existing file.
    ///
    /// The content goes to a temporary file in the same directory first and
    /// is renamed into place, so readers never observe a half-written
    /// artifact.
    pub fn write_summary(&self, artifact: &SummaryArtifact) -> io::Result<SummaryWrite> {
        let path = self.summary_path(&artifact.id);
        let replaced = path.exists();

        let mut builder = tempfile::Builder::new();
        builder.prefix(".summary-");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // Subject to the umask, like a plain create.
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
        let mut tmp = builder.tempfile_in(self.run.output_dir())?;
        tmp.write_all(artifact.render().as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        Ok(SummaryWrite { path, replaced })
    }

    /// Move the source PDF into `<archive_dir>/<file_name>`, keeping the
    /// name exactly as it was on disk.
    ///
    /// This is a rename, not a copy: it fails rather than falling back to
    /// copying when the archive lives on another device. An existing entry
    /// at the destination is never replaced.
    pub fn archive_source(&self, source: &SourceDocument) -> io::Result<PathBuf> {
        let dest = self.archive_path(source);
        if std::fs::symlink_metadata(&dest).is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", dest.display()),
            ));
        }
        std::fs::rename(&source.path, &dest)?;
        Ok(dest)
    }
}
