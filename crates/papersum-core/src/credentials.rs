//! Startup-time inputs: the provider API key and the instruction prompt.
//!
//! Both are loaded once per run and injected into the runner. Any problem
//! here is a [`StartupError`] and stops the run before discovery.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::StartupError;

/// Environment variable that overrides the key file.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Provider credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, rejecting blank values.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Deserialize)]
struct KeyFile {
    key: serde_json::Value,
}

/// Read `{"key": "..."}` from a JSON key file.
pub fn load_api_key(path: &Path) -> Result<ApiKey, StartupError> {
    let fail = |reason: String| StartupError::Credential {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
    let parsed: KeyFile =
        serde_json::from_str(&content).map_err(|e| fail(format!("malformed JSON: {e}")))?;
    match parsed.key {
        serde_json::Value::String(s) => {
            ApiKey::new(s).ok_or_else(|| fail("`key` is empty".to_string()))
        }
        _ => Err(fail("`key` must be a string".to_string())),
    }
}

/// Instruction text sent verbatim with every document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    /// Wrap prompt text, rejecting whitespace-only content.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            None
        } else {
            Some(Self(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn load_prompt(path: &Path) -> Result<Prompt, StartupError> {
    let fail = |reason: String| StartupError::Prompt {
        path: path.to_path_buf(),
        reason,
    };
    let bytes = std::fs::read(path).map_err(|e| fail(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|_| fail("not valid UTF-8".to_string()))?;
    Prompt::new(text).ok_or_else(|| fail("prompt is empty".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_key_from_json() {
        let tmp = TempDir::new().unwrap();
        let path = write(&tmp, "key.json", br#"{"key": "  abc123  "}"#);
        assert_eq!(load_api_key(&path).unwrap().expose(), "abc123");
    }

    #[test]
    fn key_file_failures_are_credential_errors() {
        let tmp = TempDir::new().unwrap();
        let cases: Vec<std::path::PathBuf> = vec![
            tmp.path().join("missing.json"),
            write(&tmp, "bad.json", b"{not json"),
            write(&tmp, "nokey.json", br#"{"token": "x"}"#),
            write(&tmp, "num.json", br#"{"key": 42}"#),
            write(&tmp, "blank.json", br#"{"key": "   "}"#),
        ];
        for path in cases {
            let err = load_api_key(&path).unwrap_err();
            assert!(
                matches!(err, StartupError::Credential { .. }),
                "{}: {err:?}",
                path.display()
            );
        }
    }

    #[test]
    fn debug_redacts_key() {
        let key = ApiKey::new("super-secret").unwrap();
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
    }

    #[test]
    fn prompt_is_verbatim() {
        let tmp = TempDir::new().unwrap();
        let text = "Summarize this paper.\n\n- Key findings\n";
        let path = write(&tmp, "prompt.txt", text.as_bytes());
        assert_eq!(load_prompt(&path).unwrap().as_str(), text);
    }

    #[test]
    fn prompt_failures_are_prompt_errors() {
        let tmp = TempDir::new().unwrap();
        let cases = vec![
            tmp.path().join("missing.txt"),
            write(&tmp, "empty.txt", b" \n\t"),
            write(&tmp, "binary.txt", &[0xff, 0xfe, 0x00]),
        ];
        for path in cases {
            let err = load_prompt(&path).unwrap_err();
            assert!(matches!(err, StartupError::Prompt { .. }), "{err:?}");
        }
    }
}
