//! The per-file summarization job.
//!
//! A job reads one PDF, asks the [`Summarizer`] for a summary, writes the
//! artifact and then archives the source. Every failure is reported as a
//! single [`JobError`] so the batch loop can treat all of them alike.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ModelConfig;
use crate::credentials::Prompt;
use crate::naming::generate_id;
use crate::provider::{PDF_MIME_TYPE, ProviderError, Summarizer, SummaryRequest};
use crate::store::OutputStore;
use crate::{SourceDocument, SummaryArtifact};

/// Coarse classification of a per-item failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    Provider,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::NotFound => "not found",
            FailureKind::Provider => "provider",
            FailureKind::Io => "I/O",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("source not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("filename is not valid UTF-8: {}", .0.display())]
    InvalidName(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("summarization failed: {0}")]
    Provider(#[source] ProviderError),
    #[error("failed to write summary {}: {source}", path.display())]
    WriteSummary {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to archive {} to {}: {source}", from.display(), to.display())]
    Archive {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl JobError {
    pub fn kind(&self) -> FailureKind {
        match self {
            JobError::NotFound(_) => FailureKind::NotFound,
            JobError::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                FailureKind::NotFound
            }
            JobError::Provider(_) => FailureKind::Provider,
            JobError::InvalidName(_)
            | JobError::Read { .. }
            | JobError::WriteSummary { .. }
            | JobError::Archive { .. } => FailureKind::Io,
        }
    }
}

/// Outcome of a successful job.
#[derive(Debug, Clone)]
pub struct CompletedJob {
    pub artifact: SummaryArtifact,
    pub summary_path: PathBuf,
    pub archived_path: PathBuf,
    /// The summary replaced an existing artifact with the same id.
    pub replaced: bool,
}

/// Dependencies shared by every job in a run.
pub struct SummarizationJob<'a> {
    summarizer: &'a dyn Summarizer,
    store: &'a OutputStore,
    config: &'a ModelConfig,
    prompt: &'a Prompt,
}

impl<'a> SummarizationJob<'a> {
    pub fn new(
        summarizer: &'a dyn Summarizer,
        store: &'a OutputStore,
        config: &'a ModelConfig,
        prompt: &'a Prompt,
    ) -> Self {
        Self {
            summarizer,
            store,
            config,
            prompt,
        }
    }

    /// Summarize `source`, persist the artifact, then archive the source.
    pub async fn run(&self, source: &SourceDocument) -> Result<CompletedJob, JobError> {
        if !source.path.exists() {
            return Err(JobError::NotFound(source.path.clone()));
        }
        // Distinct on-disk names must never share an artifact id.
        let Some(name) = source.name() else {
            return Err(JobError::InvalidName(source.path.clone()));
        };

        let bytes = std::fs::read(&source.path).map_err(|e| JobError::Read {
            path: source.path.clone(),
            source: e,
        })?;
        tracing::debug!(file = %source.display_name, bytes = bytes.len(), "read source");

        let request = SummaryRequest {
            file_name: name,
            bytes: &bytes,
            mime_type: PDF_MIME_TYPE,
            prompt: self.prompt.as_str(),
            model: self.config.model_name(),
            temperature: self.config.temperature(),
        };
        let body = self
            .summarizer
            .summarize(request)
            .await
            .map_err(JobError::Provider)?;

        let artifact = SummaryArtifact {
            id: generate_id(name),
            source_name: name.to_string(),
            body,
        };

        let written = self
            .store
            .write_summary(&artifact)
            .map_err(|e| JobError::WriteSummary {
                path: self.store.summary_path(&artifact.id),
                source: e,
            })?;
        if written.replaced {
            tracing::warn!(
                file = %source.display_name,
                id = %artifact.id,
                "summary already existed and was overwritten"
            );
        }

        let archived_path = self
            .store
            .archive_source(source)
            .map_err(|e| JobError::Archive {
                from: source.path.clone(),
                to: self.store.archive_path(source),
                source: e,
            })?;

        Ok(CompletedJob {
            artifact,
            summary_path: written.path,
            archived_path,
            replaced: written.replaced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockResponse, MockSummarizer};
    use crate::store::RunContext;
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        papers: PathBuf,
        store: OutputStore,
        config: ModelConfig,
        prompt: Prompt,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let papers = tmp.path().join("papers");
        std::fs::create_dir(&papers).unwrap();
        let run = RunContext::at(
            tmp.path().join("output"),
            Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
        );
        Fixture {
            papers,
            store: OutputStore::prepare(run).unwrap(),
            config: ModelConfig::new("fast_test", 0.2).unwrap(),
            prompt: Prompt::new("Summarize the paper.").unwrap(),
            _tmp: tmp,
        }
    }

    fn add_pdf(f: &Fixture, name: &str, bytes: &[u8]) -> SourceDocument {
        let path = f.papers.join(name);
        std::fs::write(&path, bytes).unwrap();
        SourceDocument::from_path(path)
    }

    #[tokio::test]
    async fn success_writes_summary_then_archives() {
        let f = fixture();
        let source = add_pdf(&f, "paper.pdf", b"%PDF-1.4 body");
        let mock = MockSummarizer::returning("A concise summary.");

        let done = SummarizationJob::new(&mock, &f.store, &f.config, &f.prompt)
            .run(&source)
            .await
            .unwrap();

        assert_eq!(done.artifact.id, generate_id("paper.pdf"));
        assert_eq!(done.artifact.body, "A concise summary.");
        assert!(!done.replaced);
        assert_eq!(
            std::fs::read_to_string(&done.summary_path).unwrap(),
            format!(
                "uuid: {}\nfilename: paper.pdf\n\n---\n\nA concise summary.",
                done.artifact.id
            )
        );
        assert!(!source.path.exists());
        assert_eq!(std::fs::read(&done.archived_path).unwrap(), b"%PDF-1.4 body");
    }

    #[tokio::test]
    async fn passes_bytes_prompt_and_config_through() {
        let f = fixture();
        let source = add_pdf(&f, "paper.pdf", b"12345");
        let mock = MockSummarizer::returning("ok");

        SummarizationJob::new(&mock, &f.store, &f.config, &f.prompt)
            .run(&source)
            .await
            .unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].file_name, "paper.pdf");
        assert_eq!(calls[0].byte_len, 5);
        assert_eq!(calls[0].mime_type, "application/pdf");
        assert_eq!(calls[0].prompt, "Summarize the paper.");
        assert_eq!(calls[0].model, "gemini-2.0-flash-lite");
        assert_eq!(calls[0].temperature, 0.2);
    }

    #[tokio::test]
    async fn missing_source_is_not_found_and_skips_provider() {
        let f = fixture();
        let source = SourceDocument::from_path(f.papers.join("vanished.pdf"));
        let mock = MockSummarizer::returning("unused");

        let err = SummarizationJob::new(&mock, &f.store, &f.config, &f.prompt)
            .run(&source)
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::NotFound(_)));
        assert_eq!(err.kind(), FailureKind::NotFound);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn provider_failure_leaves_source_in_place() {
        let f = fixture();
        let source = add_pdf(&f, "paper.pdf", b"%PDF");
        let mock = MockSummarizer::new(MockResponse::Error("quota exceeded".into()));

        let err = SummarizationJob::new(&mock, &f.store, &f.config, &f.prompt)
            .run(&source)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::Provider);
        assert!(err.to_string().contains("quota exceeded"));
        assert!(source.path.exists());
        assert!(!f.store.summary_path(&generate_id("paper.pdf")).exists());
        assert!(!f.store.archive_path(&source).exists());
    }

    #[tokio::test]
    async fn archive_failure_keeps_summary_and_source() {
        let f = fixture();
        let source = add_pdf(&f, "paper.pdf", b"%PDF");
        // A non-empty directory at the destination makes the rename fail.
        let blocker = f.store.archive_path(&source);
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"x").unwrap();
        let mock = MockSummarizer::returning("summary");

        let err = SummarizationJob::new(&mock, &f.store, &f.config, &f.prompt)
            .run(&source)
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::Archive { .. }), "{err:?}");
        assert_eq!(err.kind(), FailureKind::Io);
        assert!(source.path.exists());
        assert!(f.store.summary_path(&generate_id("paper.pdf")).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_utf8_name_fails_before_provider_call() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let f = fixture();
        let path = f.papers.join(OsStr::from_bytes(b"caf\xe9.pdf"));
        std::fs::write(&path, b"%PDF").unwrap();
        let source = SourceDocument::from_path(&path);
        let mock = MockSummarizer::returning("unused");

        let err = SummarizationJob::new(&mock, &f.store, &f.config, &f.prompt)
            .run(&source)
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::InvalidName(_)), "{err:?}");
        assert_eq!(err.kind(), FailureKind::Io);
        assert_eq!(mock.call_count(), 0);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn rerun_same_name_overwrites_same_artifact() {
        let f = fixture();
        let mock = MockSummarizer::returning("v1");
        let first_source = add_pdf(&f, "paper.pdf", b"%PDF one");
        let first = SummarizationJob::new(&mock, &f.store, &f.config, &f.prompt)
            .run(&first_source)
            .await
            .unwrap();

        // Same filename dropped into the inbox again.
        std::fs::remove_file(&first.archived_path).unwrap();
        let second_source = add_pdf(&f, "paper.pdf", b"%PDF two");
        let mock = MockSummarizer::returning("v2");
        let second = SummarizationJob::new(&mock, &f.store, &f.config, &f.prompt)
            .run(&second_source)
            .await
            .unwrap();

        assert_eq!(first.summary_path, second.summary_path);
        assert!(second.replaced);
        assert!(
            std::fs::read_to_string(&second.summary_path)
                .unwrap()
                .ends_with("v2")
        );
    }

    #[test]
    fn read_not_found_classifies_as_not_found() {
        let err = JobError::Read {
            path: PathBuf::from("x.pdf"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.kind(), FailureKind::NotFound);

        let err = JobError::Read {
            path: PathBuf::from("x.pdf"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(err.kind(), FailureKind::Io);
    }
}
