//! Backend configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use examkit_core::clock::WARNING_THRESHOLD_SECS;
use examkit_core::traits::{ContentBackend, GradingBackend};

use crate::http::HttpBackend;
use crate::local::LocalBackend;

/// Environment variable that overrides every HTTP backend's API key.
pub const API_KEY_ENV: &str = "EXAMKIT_API_KEY";

/// Configuration for a single backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Http {
        base_url: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    Local {
        #[serde(default = "default_exam_dir")]
        exam_dir: PathBuf,
    },
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendConfig::Http {
                base_url,
                api_key,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
            BackendConfig::Local { exam_dir } => f
                .debug_struct("Local")
                .field("exam_dir", exam_dir)
                .finish(),
        }
    }
}

fn default_exam_dir() -> PathBuf {
    PathBuf::from("./exams")
}

/// Top-level examkit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamkitConfig {
    /// Backend configurations keyed by name.
    #[serde(default)]
    pub backends: HashMap<String, BackendConfig>,
    /// Backend used when none is named on the command line.
    #[serde(default = "default_backend")]
    pub default_backend: String,
    /// Remaining seconds below which the session raises its time warning.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold_secs: u64,
    /// Output directory for results.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_backend() -> String {
    "local".to_string()
}
fn default_warning_threshold() -> u64 {
    WARNING_THRESHOLD_SECS
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./examkit-results")
}

impl Default for ExamkitConfig {
    fn default() -> Self {
        Self {
            backends: HashMap::new(),
            default_backend: default_backend(),
            warning_threshold_secs: default_warning_threshold(),
            output_dir: default_output_dir(),
        }
    }
}

impl ExamkitConfig {
    /// Look up a backend by name, falling back to a local backend over
    /// `./exams` when the name is `local` and nothing is configured.
    pub fn backend(&self, name: &str) -> Result<BackendConfig> {
        match self.backends.get(name) {
            Some(config) => Ok(config.clone()),
            None if name == "local" => Ok(BackendConfig::Local {
                exam_dir: default_exam_dir(),
            }),
            None => {
                let mut known: Vec<&str> = self.backends.keys().map(String::as_str).collect();
                known.sort_unstable();
                anyhow::bail!(
                    "backend '{name}' is not configured (known: {})",
                    if known.is_empty() { "none".to_string() } else { known.join(", ") }
                )
            }
        }
    }
}

/// Replace `${VAR}` references with the variable's value; unset variables become empty.
fn resolve_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&std::env::var(&rest[start + 2..start + len]).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    out
}

fn resolve_backend_config(config: &BackendConfig, key_override: Option<&str>) -> BackendConfig {
    match config {
        BackendConfig::Http {
            base_url,
            api_key,
            timeout_secs,
        } => BackendConfig::Http {
            base_url: resolve_env_vars(base_url),
            api_key: key_override
                .map(str::to_string)
                .or_else(|| api_key.as_deref().map(resolve_env_vars)),
            timeout_secs: *timeout_secs,
        },
        BackendConfig::Local { exam_dir } => BackendConfig::Local {
            exam_dir: PathBuf::from(resolve_env_vars(&exam_dir.to_string_lossy())),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `examkit.toml` in the current directory
/// 2. `~/.config/examkit/config.toml`
///
/// `EXAMKIT_API_KEY` overrides the API key of every HTTP backend.
pub fn load_config() -> Result<ExamkitConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamkitConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => [Some(PathBuf::from("examkit.toml")), dirs_path().map(|d| d.join("config.toml"))]
            .into_iter()
            .flatten()
            .find(|p| p.exists()),
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ExamkitConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ExamkitConfig::default(),
    };

    let key_override = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
    config.backends = config
        .backends
        .iter()
        .map(|(name, backend)| {
            (
                name.clone(),
                resolve_backend_config(backend, key_override.as_deref()),
            )
        })
        .collect();

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examkit"))
}

/// A content backend and a grading backend, usually the same object.
#[derive(Clone)]
pub struct Backend {
    pub name: String,
    pub content: Arc<dyn ContentBackend>,
    pub grading: Arc<dyn GradingBackend>,
}

impl Backend {
    /// Wrap one object serving both roles.
    pub fn shared<B>(name: &str, backend: B) -> Self
    where
        B: ContentBackend + GradingBackend + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            name: name.to_string(),
            content: backend.clone(),
            grading: backend,
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("name", &self.name)
            .field("content", &self.content.name())
            .field("grading", &self.grading.name())
            .finish()
    }
}

/// Create a backend instance from its configuration.
pub fn create_backend(name: &str, config: &BackendConfig) -> Result<Backend> {
    match config {
        BackendConfig::Http {
            base_url,
            api_key,
            timeout_secs,
        } => {
            let backend = match timeout_secs {
                Some(secs) => HttpBackend::with_timeout(base_url, api_key.clone(), *secs),
                None => HttpBackend::new(base_url, api_key.clone()),
            }
            .with_context(|| format!("failed to create HTTP backend '{name}'"))?;
            Ok(Backend::shared(name, backend))
        }
        BackendConfig::Local { exam_dir } => Ok(Backend::shared(name, LocalBackend::new(exam_dir))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_EXAMKIT_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_EXAMKIT_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_EXAMKIT_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${_EXAMKIT_UNSET_VAR}/x"), "/x");
        assert_eq!(resolve_env_vars("open ${brace"), "open ${brace");
        std::env::remove_var("_EXAMKIT_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = ExamkitConfig::default();
        assert_eq!(config.default_backend, "local");
        assert_eq!(config.warning_threshold_secs, 300);
        assert!(matches!(
            config.backend("local").unwrap(),
            BackendConfig::Local { .. }
        ));
        assert!(config.backend("prod").is_err());
    }

    #[test]
    fn parse_backend_config() {
        let toml_str = r#"
default_backend = "prod"
warning_threshold_secs = 600

[backends.prod]
type = "http"
base_url = "https://exams.example.com/api"
api_key = "sk-test"

[backends.offline]
type = "local"
exam_dir = "./my-exams"
"#;
        let config: ExamkitConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.warning_threshold_secs, 600);
        assert!(matches!(
            config.backends.get("prod"),
            Some(BackendConfig::Http { .. })
        ));
        assert!(matches!(
            config.backends.get("offline"),
            Some(BackendConfig::Local { exam_dir }) if exam_dir == Path::new("./my-exams")
        ));
    }

    #[test]
    fn debug_masks_api_key() {
        let config = BackendConfig::Http {
            base_url: "https://exams.example.com".into(),
            api_key: Some("sk-secret".into()),
            timeout_secs: None,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn key_override_wins() {
        let config = BackendConfig::Http {
            base_url: "https://exams.example.com".into(),
            api_key: Some("from-file".into()),
            timeout_secs: None,
        };
        match resolve_backend_config(&config, Some("from-env")) {
            BackendConfig::Http { api_key, .. } => assert_eq!(api_key.as_deref(), Some("from-env")),
            other => panic!("unexpected config: {other:?}"),
        }
    }

    #[test]
    fn load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examkit.toml");
        std::fs::write(&path, "default_backend = \"offline\"\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.default_backend, "offline");
        assert!(load_config_from(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn creates_local_backend() {
        let backend = create_backend(
            "offline",
            &BackendConfig::Local {
                exam_dir: PathBuf::from("./exams"),
            },
        )
        .unwrap();
        assert_eq!(backend.content.name(), "local");
        assert_eq!(backend.grading.name(), "local");
    }
}
