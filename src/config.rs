//! Run configuration, merged from the `msgshot` key of the project's
//! `package.json` and CLI flags (flags win). The tool targets JS projects
//! with Jest snapshots, so the manifest is the natural config home.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONCURRENCY: usize = 2;
const MANIFEST_FILE: &str = "package.json";
const MANIFEST_KEY: &str = "msgshot";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "please specify both an input and an output path (flags -i/-o, or the `{MANIFEST_KEY}` key in {MANIFEST_FILE})"
    )]
    MissingPaths,
    #[error("could not read {path}: {source}")]
    ManifestRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ManifestParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Concurrency-limiter settings, `{ "concurrency": N }` in the manifest.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitSettings {
    pub concurrency: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// The `msgshot` section of the manifest. Everything is optional here;
/// requiredness is checked after the CLI merge.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ManifestConfig {
    #[serde(rename = "in")]
    pub in_root: Option<String>,
    pub out: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    pub limit: Option<LimitSettings>,
}

/// Immutable options for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root to scan for snapshot files.
    pub in_root: String,
    /// Root the rendered images are written under.
    pub out_root: String,
    /// Test names to skip entirely.
    pub exclude: Vec<String>,
    pub limit: LimitSettings,
    /// Render all matched snapshots, not only changed ones.
    pub render_all: bool,
}

impl RunConfig {
    /// Read the `msgshot` key of `package.json` in `dir`. An absent manifest
    /// is fine since CLI flags may carry the paths; an unreadable or
    /// unparsable one is not.
    pub fn load_manifest(dir: &Path) -> Result<ManifestConfig, ConfigError> {
        let path = dir.join(MANIFEST_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no manifest found, relying on CLI flags");
                return Ok(ManifestConfig::default());
            }
            Err(e) => {
                return Err(ConfigError::ManifestRead {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };

        let manifest: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| ConfigError::ManifestParse {
                path: path.display().to_string(),
                source: e,
            })?;

        match manifest.get(MANIFEST_KEY) {
            Some(section) => {
                serde_json::from_value(section.clone()).map_err(|e| ConfigError::ManifestParse {
                    path: path.display().to_string(),
                    source: e,
                })
            }
            None => Ok(ManifestConfig::default()),
        }
    }

    /// Merge the manifest with CLI flags; flags take precedence. Both paths
    /// must be present somewhere or the run aborts before any work starts.
    pub fn resolve(
        manifest: ManifestConfig,
        cli_in: Option<String>,
        cli_out: Option<String>,
        render_all: bool,
    ) -> Result<Self, ConfigError> {
        let in_root = cli_in.or(manifest.in_root).ok_or(ConfigError::MissingPaths)?;
        let out_root = cli_out.or(manifest.out).ok_or(ConfigError::MissingPaths)?;

        Ok(Self {
            in_root: in_root.trim_end_matches('/').to_string(),
            out_root: out_root.trim_end_matches('/').to_string(),
            exclude: manifest.exclude,
            limit: manifest.limit.unwrap_or_default(),
            render_all,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_manifest_section_parses() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{
                "name": "some-app",
                "msgshot": {
                    "in": "src/components",
                    "out": "screenshots",
                    "exclude": ["warning"],
                    "limit": { "concurrency": 4 }
                }
            }"#,
        )
        .unwrap();

        let manifest = RunConfig::load_manifest(dir.path()).unwrap();
        assert_eq!(manifest.in_root.as_deref(), Some("src/components"));
        assert_eq!(manifest.out.as_deref(), Some("screenshots"));
        assert_eq!(manifest.exclude, vec!["warning".to_string()]);
        assert_eq!(manifest.limit, Some(LimitSettings { concurrency: 4 }));
    }

    #[test]
    fn test_missing_manifest_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = RunConfig::load_manifest(dir.path()).unwrap();
        assert_eq!(manifest, ManifestConfig::default());
    }

    #[test]
    fn test_broken_manifest_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{ not json").unwrap();

        let result = RunConfig::load_manifest(dir.path());
        assert!(matches!(result, Err(ConfigError::ManifestParse { .. })));
    }

    #[test]
    fn test_manifest_without_section_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "app"}"#).unwrap();

        let manifest = RunConfig::load_manifest(dir.path()).unwrap();
        assert_eq!(manifest, ManifestConfig::default());
    }

    #[test]
    fn test_cli_flags_take_precedence() {
        let manifest = ManifestConfig {
            in_root: Some("manifest-in".to_string()),
            out: Some("manifest-out".to_string()),
            ..Default::default()
        };

        let config = RunConfig::resolve(
            manifest,
            Some("cli-in/".to_string()),
            None,
            false,
        )
        .unwrap();

        assert_eq!(config.in_root, "cli-in");
        assert_eq!(config.out_root, "manifest-out");
        assert_eq!(config.limit.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_missing_paths_is_a_config_error() {
        let result = RunConfig::resolve(ManifestConfig::default(), Some("in".to_string()), None, false);
        assert!(matches!(result, Err(ConfigError::MissingPaths)));
    }
}
