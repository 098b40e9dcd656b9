use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod batch;
pub mod config;
pub mod config_file;
pub mod credentials;
pub mod job;
pub mod naming;
pub mod provider;
pub mod store;

// Re-export for convenience
pub use batch::{
    BatchError, BatchReport, BatchRunner, BatchState, FailedItem, ProgressEvent, SucceededItem,
    discover_sources,
};
pub use config::{ConfigError, ConfigViolation, ModelConfig, SettingValue, resolve_model_alias};
pub use credentials::{ApiKey, Prompt, load_api_key, load_prompt};
pub use job::{CompletedJob, FailureKind, JobError, SummarizationJob};
pub use naming::{ArtifactId, generate_id};
pub use provider::{ProviderError, SummaryRequest, Summarizer};
pub use store::{OutputStore, RunContext, SummaryWrite};

/// One input PDF waiting to be summarized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: PathBuf,
    /// Base filename exactly as on disk. The archive keeps this name.
    pub file_name: OsString,
    /// Base filename for reports and logs. Lossy when `file_name` is not
    /// valid UTF-8.
    pub display_name: String,
}

impl SourceDocument {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(OsStr::to_os_string)
            .unwrap_or_else(|| path.clone().into_os_string());
        let display_name = file_name.to_string_lossy().into_owned();
        Self {
            path,
            file_name,
            display_name,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The filename as UTF-8, or `None` when it cannot be represented
    /// without loss. Artifact ids are only derived from exact names.
    pub fn name(&self) -> Option<&str> {
        self.file_name.to_str()
    }
}

/// A generated summary, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryArtifact {
    pub id: ArtifactId,
    pub source_name: String,
    pub body: String,
}

impl SummaryArtifact {
    /// Render the on-disk Markdown layout: metadata header, separator, body.
    pub fn render(&self) -> String {
        format!(
            "uuid: {}\nfilename: {}\n\n---\n\n{}",
            self.id, self.source_name, self.body
        )
    }
}

/// Errors that abort a run before any item is processed.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("failed to read settings file {}: {source}", path.display())]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file {}: {message}", path.display())]
    SettingsParse { path: PathBuf, message: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid credential file {}: {reason}", path.display())]
    Credential { path: PathBuf, reason: String },
    #[error("invalid prompt file {}: {reason}", path.display())]
    Prompt { path: PathBuf, reason: String },
    #[error("cannot read input directory {}: {source}", path.display())]
    InputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build provider client: {0}")]
    Provider(#[from] ProviderError),
}
