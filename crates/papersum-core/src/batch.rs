//! Batch runner: discover PDFs and summarize them one at a time.
//!
//! The runner moves through `Idle -> Discovering -> Processing(i) -> Done`
//! exactly once. Items run strictly sequentially; a failed item is recorded in
//! the [`BatchReport`] and the loop continues with the next one. Only startup
//! problems surface as [`BatchError`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::ModelConfig;
use crate::credentials::Prompt;
use crate::job::{FailureKind, SummarizationJob};
use crate::naming::ArtifactId;
use crate::provider::Summarizer;
use crate::store::{OutputStore, RunContext};
use crate::{SourceDocument, StartupError};

/// Lifecycle of a [`BatchRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Discovering,
    Processing { index: usize, total: usize },
    Done,
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("batch runner has already completed a run")]
    AlreadyRun,
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Discovered {
        total: usize,
    },
    Started {
        index: usize,
        total: usize,
        file: String,
    },
    Succeeded {
        index: usize,
        total: usize,
        file: String,
        id: ArtifactId,
        summary: String,
        summary_path: PathBuf,
        replaced: bool,
    },
    Failed {
        index: usize,
        total: usize,
        file: String,
        kind: FailureKind,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SucceededItem {
    pub file: String,
    pub id: ArtifactId,
    pub summary_path: PathBuf,
    pub archived_path: PathBuf,
    pub replaced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub file: String,
    pub kind: FailureKind,
    pub message: String,
}

/// What happened to each discovered item.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Set once output directories were prepared (i.e. something was found).
    pub run: Option<RunContext>,
    pub successes: Vec<SucceededItem>,
    pub failures: Vec<FailedItem>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.successes.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.succeeded() + self.failed()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// List the PDF files directly inside `input_dir`.
///
/// Order follows the directory listing and is not guaranteed.
pub fn discover_sources(input_dir: &Path) -> Result<Vec<SourceDocument>, StartupError> {
    let to_err = |source| StartupError::InputDir {
        path: input_dir.to_path_buf(),
        source,
    };
    let mut sources = Vec::new();
    for entry in std::fs::read_dir(input_dir).map_err(to_err)? {
        let entry = entry.map_err(to_err)?;
        let path = entry.path();
        if path.is_file() && is_pdf(&path) {
            sources.push(SourceDocument::from_path(path));
        }
    }
    Ok(sources)
}

/// Drives one batch over an input directory.
///
/// Dependencies are injected at construction; nothing is re-read from disk
/// while items are processed.
pub struct BatchRunner {
    summarizer: Arc<dyn Summarizer>,
    config: ModelConfig,
    prompt: Prompt,
    run: RunContext,
    state: BatchState,
}

impl BatchRunner {
    pub fn new(
        summarizer: Arc<dyn Summarizer>,
        config: ModelConfig,
        prompt: Prompt,
        run: RunContext,
    ) -> Self {
        Self {
            summarizer,
            config,
            prompt,
            run,
            state: BatchState::Idle,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Name of the provider every item is sent to.
    pub fn provider_name(&self) -> &str {
        self.summarizer.name()
    }

    pub fn run_context(&self) -> &RunContext {
        &self.run
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Summarize every PDF in `input_dir`.
    ///
    /// Per-item failures are collected in the report; only startup errors
    /// (unreadable input directory, output directories that cannot be
    /// created) abort the run.
    pub async fn run_all(
        &mut self,
        input_dir: &Path,
        progress: impl Fn(ProgressEvent),
    ) -> Result<BatchReport, BatchError> {
        if self.state != BatchState::Idle {
            return Err(BatchError::AlreadyRun);
        }

        self.state = BatchState::Discovering;
        let sources = match discover_sources(input_dir) {
            Ok(s) => s,
            Err(e) => {
                self.state = BatchState::Done;
                return Err(e.into());
            }
        };
        let total = sources.len();
        tracing::info!(dir = %input_dir.display(), total, "discovered input files");
        progress(ProgressEvent::Discovered { total });

        let mut report = BatchReport::default();
        if total == 0 {
            self.state = BatchState::Done;
            return Ok(report);
        }

        let store = match OutputStore::prepare(self.run.clone()) {
            Ok(s) => s,
            Err(e) => {
                self.state = BatchState::Done;
                return Err(e.into());
            }
        };
        report.run = Some(self.run.clone());
        let job = SummarizationJob::new(self.summarizer.as_ref(), &store, &self.config, &self.prompt);

        for (index, source) in sources.iter().enumerate() {
            self.state = BatchState::Processing { index, total };
            let file = source.display_name.clone();
            progress(ProgressEvent::Started {
                index,
                total,
                file: file.clone(),
            });

            match job.run(source).await {
                Ok(done) => {
                    tracing::info!(
                        file = %file,
                        id = %done.artifact.id,
                        path = %done.summary_path.display(),
                        "summarized"
                    );
                    report.successes.push(SucceededItem {
                        file: file.clone(),
                        id: done.artifact.id.clone(),
                        summary_path: done.summary_path.clone(),
                        archived_path: done.archived_path,
                        replaced: done.replaced,
                    });
                    progress(ProgressEvent::Succeeded {
                        index,
                        total,
                        file,
                        id: done.artifact.id,
                        summary: done.artifact.body,
                        summary_path: done.summary_path,
                        replaced: done.replaced,
                    });
                }
                Err(err) => {
                    let kind = err.kind();
                    let message = err.to_string();
                    tracing::warn!(file = %file, kind = %kind, error = %message, "item failed");
                    report.failures.push(FailedItem {
                        file: file.clone(),
                        kind,
                        message: message.clone(),
                    });
                    progress(ProgressEvent::Failed {
                        index,
                        total,
                        file,
                        kind,
                        message,
                    });
                }
            }
        }

        self.state = BatchState::Done;
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch complete"
        );
        Ok(report)
    }
}
