use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::StartupError;
use crate::config::{ConfigError, DEFAULT_MODEL, DEFAULT_TEMPERATURE, ModelConfig, SettingValue};

/// Settings file looked up in the workspace root when no `--config` is given.
pub const WORKSPACE_CONFIG_NAME: &str = "papersum.toml";

pub const DEFAULT_PAPERS_DIR: &str = "papers";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_PROMPT_FILE: &str = "prompt.txt";
pub const DEFAULT_API_KEY_FILE: &str = "gemini_api_key.json";

/// On-disk settings structure.
///
/// All fields are optional so partial files can be layered. `model_name` and
/// `temperature` stay untyped until [`ConfigFile::model_config`] validates
/// them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub model_name: Option<SettingValue>,
    pub temperature: Option<SettingValue>,
    pub paths: Option<PathsConfig>,
    pub provider: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    pub papers: Option<String>,
    pub output: Option<String>,
    pub prompt: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Workspace-relative locations, resolved to concrete paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub papers: PathBuf,
    pub output: PathBuf,
    pub prompt: PathBuf,
    pub api_key: PathBuf,
}

impl ConfigFile {
    /// Validate the model settings carried by this file.
    pub fn model_config(&self) -> Result<ModelConfig, ConfigError> {
        ModelConfig::from_values(self.model_name.as_ref(), self.temperature.as_ref())
    }

    /// Resolve configured paths against `workspace`. Absolute paths are kept.
    pub fn resolve_paths(&self, workspace: &Path) -> ResolvedPaths {
        let paths = self.paths.clone().unwrap_or_default();
        let resolve = |value: Option<String>, default: &str| {
            workspace.join(value.unwrap_or_else(|| default.to_string()))
        };
        ResolvedPaths {
            papers: resolve(paths.papers, DEFAULT_PAPERS_DIR),
            output: resolve(paths.output, DEFAULT_OUTPUT_DIR),
            prompt: resolve(paths.prompt, DEFAULT_PROMPT_FILE),
            api_key: resolve(paths.api_key, DEFAULT_API_KEY_FILE),
        }
    }

    /// Apply command-line values on top of the loaded settings.
    pub fn apply_overrides(&mut self, model_name: Option<String>, temperature: Option<f64>) {
        if let Some(name) = model_name {
            self.model_name = Some(SettingValue::from(name));
        }
        if let Some(t) = temperature {
            self.temperature = Some(SettingValue::Float(t));
        }
    }

    /// Settings written by `papersum init`.
    pub fn starter() -> Self {
        Self {
            model_name: Some(SettingValue::from(DEFAULT_MODEL)),
            temperature: Some(SettingValue::Float(DEFAULT_TEMPERATURE)),
            paths: Some(PathsConfig {
                papers: Some(DEFAULT_PAPERS_DIR.to_string()),
                output: Some(DEFAULT_OUTPUT_DIR.to_string()),
                prompt: Some(DEFAULT_PROMPT_FILE.to_string()),
                api_key: Some(DEFAULT_API_KEY_FILE.to_string()),
            }),
            provider: None,
        }
    }
}

/// Platform config path: `<config_dir>/papersum/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("papersum").join("config.toml"))
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Parse settings text. JSON when `path` ends in `.json`, TOML otherwise.
pub fn parse(content: &str, path: &Path) -> Result<ConfigFile, StartupError> {
    let parsed = if is_json(path) {
        serde_json::from_str(content).map_err(|e| e.to_string())
    } else {
        toml::from_str(content).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| StartupError::SettingsParse {
        path: path.to_path_buf(),
        message,
    })
}

/// Load a settings file that must exist.
pub fn load_from_path(path: &Path) -> Result<ConfigFile, StartupError> {
    let content = std::fs::read_to_string(path).map_err(|source| StartupError::SettingsRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content, path)
}

/// Load a settings file if present. A file that exists but does not parse is
/// still an error.
pub fn load_optional(path: &Path) -> Result<Option<ConfigFile>, StartupError> {
    if !path.is_file() {
        return Ok(None);
    }
    load_from_path(path).map(Some)
}

/// Load settings by layering the workspace file (or an explicit file) over
/// the platform config. Values from the workspace file win.
pub fn load_config(explicit: Option<&Path>, workspace: &Path) -> Result<ConfigFile, StartupError> {
    let platform = match config_path() {
        Some(p) => load_optional(&p)?,
        None => None,
    };
    let local = match explicit {
        Some(path) => Some(load_from_path(path)?),
        None => load_optional(&workspace.join(WORKSPACE_CONFIG_NAME))?,
    };
    Ok(layer(platform, local))
}

fn layer(base: Option<ConfigFile>, overlay: Option<ConfigFile>) -> ConfigFile {
    match (base, overlay) {
        (None, None) => ConfigFile::default(),
        (Some(b), None) => b,
        (None, Some(o)) => o,
        (Some(b), Some(o)) => merge(b, o),
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let base_paths = base.paths.unwrap_or_default();
    let overlay_paths = overlay.paths.unwrap_or_default();
    let base_provider = base.provider.unwrap_or_default();
    let overlay_provider = overlay.provider.unwrap_or_default();

    ConfigFile {
        model_name: overlay.model_name.or(base.model_name),
        temperature: overlay.temperature.or(base.temperature),
        paths: Some(PathsConfig {
            papers: overlay_paths.papers.or(base_paths.papers),
            output: overlay_paths.output.or(base_paths.output),
            prompt: overlay_paths.prompt.or(base_paths.prompt),
            api_key: overlay_paths.api_key.or(base_paths.api_key),
        }),
        provider: Some(ProviderConfig {
            base_url: overlay_provider.base_url.or(base_provider.base_url),
            timeout_secs: overlay_provider.timeout_secs.or(base_provider.timeout_secs),
        }),
    }
}

/// Write `config` to `path` as TOML. Refuses to replace an existing file.
pub fn save_config(path: &Path, config: &ConfigFile) -> std::io::Result<()> {
    if path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} already exists", path.display()),
        ));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config).map_err(std::io::Error::other)?;
    std::fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigViolation;
    use tempfile::TempDir;

    #[test]
    fn toml_integer_and_float_temperatures() {
        let p = Path::new("papersum.toml");
        let int = parse("model_name = \"test\"\ntemperature = 0\n", p).unwrap();
        assert_eq!(int.model_config().unwrap().temperature(), 0.0);

        let float = parse("model_name = \"test\"\ntemperature = 0.9\n", p).unwrap();
        assert_eq!(float.model_config().unwrap().temperature(), 0.9);
    }

    #[test]
    fn toml_string_temperature_parses_but_fails_validation() {
        let cfg = parse(
            "model_name = \"fast_test\"\ntemperature = \"hot\"\n",
            Path::new("papersum.toml"),
        )
        .unwrap();
        let err = cfg.model_config().unwrap_err();
        assert!(matches!(
            err.violations.as_slice(),
            [ConfigViolation::TemperatureNotNumeric { .. }]
        ));
    }

    #[test]
    fn toml_nan_temperature_is_rejected() {
        let cfg = parse(
            "model_name = \"fast_test\"\ntemperature = nan\n",
            Path::new("papersum.toml"),
        )
        .unwrap();
        let err = cfg.model_config().unwrap_err();
        assert_eq!(err.violations, vec![ConfigViolation::TemperatureNotFinite]);
    }

    #[test]
    fn cli_nan_temperature_is_not_finite() {
        let mut cfg = parse("model_name = \"test\"\n", Path::new("papersum.toml")).unwrap();
        cfg.apply_overrides(None, Some(f64::NAN));
        let err = cfg.model_config().unwrap_err();
        assert_eq!(err.violations, vec![ConfigViolation::TemperatureNotFinite]);
    }

    #[test]
    fn json_settings_by_extension() {
        let cfg = parse(
            r#"{"model_name": "2.5_flash", "temperature": 1}"#,
            Path::new("settings.json"),
        )
        .unwrap();
        let model = cfg.model_config().unwrap();
        assert_eq!(model.model_name(), "gemini-2.5-flash-preview-05-20");
        assert_eq!(model.temperature(), 1.0);
    }

    #[test]
    fn syntax_error_is_a_parse_error() {
        let err = parse("model_name = ", Path::new("papersum.toml")).unwrap_err();
        assert!(matches!(err, StartupError::SettingsParse { .. }));
    }

    #[test]
    fn explicit_missing_file_is_a_read_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_config(Some(&tmp.path().join("nope.toml")), tmp.path()).unwrap_err();
        assert!(matches!(err, StartupError::SettingsRead { .. }));
    }

    #[test]
    fn load_optional_absent_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(load_optional(&tmp.path().join("absent.toml")).unwrap().is_none());
    }

    #[test]
    fn merge_overlay_wins_field_by_field() {
        let base = ConfigFile {
            model_name: Some(SettingValue::from("test")),
            temperature: Some(SettingValue::Float(0.5)),
            paths: Some(PathsConfig {
                papers: Some("base-papers".into()),
                output: Some("base-output".into()),
                ..Default::default()
            }),
            provider: Some(ProviderConfig {
                timeout_secs: Some(30),
                ..Default::default()
            }),
        };
        let overlay = ConfigFile {
            temperature: Some(SettingValue::Float(0.0)),
            paths: Some(PathsConfig {
                papers: Some("overlay-papers".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        assert_eq!(merged.model_name, Some(SettingValue::from("test")));
        assert_eq!(merged.temperature, Some(SettingValue::Float(0.0)));
        let paths = merged.paths.unwrap();
        assert_eq!(paths.papers.as_deref(), Some("overlay-papers"));
        assert_eq!(paths.output.as_deref(), Some("base-output"));
        assert_eq!(merged.provider.unwrap().timeout_secs, Some(30));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut cfg = parse(
            "model_name = \"test\"\ntemperature = \"hot\"\n",
            Path::new("papersum.toml"),
        )
        .unwrap();
        cfg.apply_overrides(Some("2.5_flash".into()), Some(0.4));
        let model = cfg.model_config().unwrap();
        assert_eq!(model.model_name(), "gemini-2.5-flash-preview-05-20");
        assert_eq!(model.temperature(), 0.4);

        cfg.apply_overrides(None, None);
        assert_eq!(cfg.model_config().unwrap(), model);
    }

    #[test]
    fn resolve_paths_defaults_and_absolute() {
        let cfg = ConfigFile {
            paths: Some(PathsConfig {
                output: Some("/var/summaries".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let resolved = cfg.resolve_paths(Path::new("/work"));
        assert_eq!(resolved.papers, PathBuf::from("/work/papers"));
        assert_eq!(resolved.output, PathBuf::from("/var/summaries"));
        assert_eq!(resolved.prompt, PathBuf::from("/work/prompt.txt"));
        assert_eq!(resolved.api_key, PathBuf::from("/work/gemini_api_key.json"));
    }

    #[test]
    fn starter_round_trips_and_validates() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(WORKSPACE_CONFIG_NAME);
        save_config(&path, &ConfigFile::starter()).unwrap();

        let loaded = load_from_path(&path).unwrap();
        let model = loaded.model_config().unwrap();
        assert_eq!(model.model_name(), "gemini-2.0-flash-lite");
        assert_eq!(model.temperature(), 0.2);
        assert_eq!(
            loaded.paths.unwrap().papers.as_deref(),
            Some(DEFAULT_PAPERS_DIR)
        );
    }

    #[test]
    fn save_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(WORKSPACE_CONFIG_NAME);
        std::fs::write(&path, "model_name = \"mine\"\n").unwrap();

        let err = save_config(&path, &ConfigFile::starter()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "model_name = \"mine\"\n"
        );
    }
}
