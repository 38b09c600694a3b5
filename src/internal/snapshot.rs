use crate::internal::models::{JobMap, Message};
use crate::utils::snapfile;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// A snapshot file lives at `<group>/__snapshots__/<test>.test.(js|ts).snap`;
/// the group may be empty for snapshots at the scan root.
static SNAPSHOT_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(.*)/)?__snapshots__/([^/]+)\.test\.(js|ts)\.snap$")
        .expect("snapshot path pattern is valid")
});

/// Group and test identity derived from a snapshot file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPath {
    pub group: String,
    pub test: String,
}

impl SnapshotPath {
    /// Parse a path relative to the scan root. Paths that do not match the
    /// snapshot pattern are not snapshot files.
    pub fn parse(rel_path: &str) -> Option<Self> {
        let caps = SNAPSHOT_PATH.captures(rel_path)?;
        Some(Self {
            group: caps
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            test: caps[2].to_string(),
        })
    }

    /// Output key for one entry: `<out>/<group>/<test>/<entry>.png`.
    pub fn output_path(&self, out_root: &str, entry: &str) -> String {
        let root = out_root.trim_end_matches('/');
        if self.group.is_empty() {
            format!("{root}/{}/{entry}.png", self.test)
        } else {
            format!("{root}/{}/{}/{entry}.png", self.group, self.test)
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed snapshot entry `{entry}` in {file}: {reason}")]
    MalformedSnapshot {
        file: String,
        entry: String,
        reason: String,
    },
}

/// Decode every entry of one snapshot file into render jobs keyed by output
/// path. A malformed entry is reported and skipped; its siblings still decode.
pub fn extract_jobs(
    text: &str,
    file: &str,
    snapshot: &SnapshotPath,
    out_root: &str,
) -> (JobMap, Vec<ExtractError>) {
    let mut jobs = JobMap::new();
    let mut errors = Vec::new();

    for (name, raw) in snapfile::parse_exports(text) {
        let cleaned = snapfile::clean_serialized(&raw);
        match json5::from_str::<serde_json::Value>(&cleaned) {
            Ok(value) => {
                jobs.insert(
                    snapshot.output_path(out_root, &name),
                    Message::normalize(value),
                );
            }
            Err(e) => errors.push(ExtractError::MalformedSnapshot {
                file: file.to_string(),
                entry: name,
                reason: e.to_string(),
            }),
        }
    }

    (jobs, errors)
}
