//! Deterministic artifact identifiers.
//!
//! Ids are name-based UUIDs (version 5) over the URL namespace, so the same
//! filename maps to the same id on every machine and every run. Re-running a
//! file therefore targets the same `<id>.md` path instead of producing a
//! second artifact.

use std::fmt;

use uuid::Uuid;

/// Identifier of a summary artifact, derived from its source filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactId(String);

impl ArtifactId {
    /// Wrap an already-computed identifier string.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filename of the summary artifact for this id.
    pub fn file_name(&self) -> String {
        format!("{}.md", self.0)
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for ArtifactId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.hyphenated().to_string())
    }
}

/// Derive the artifact id for a source document's display name.
pub fn generate_id(display_name: &str) -> ArtifactId {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, display_name.as_bytes()).into()
}
