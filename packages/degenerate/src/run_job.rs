//! Run job specification and metadata.
//!
//! A `RunSpec` describes one headless run: which script, how many frames, and
//! where the transcript goes. `RunMetadata` is written next to the transcript
//! so a run can be compared against a later replay.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::EngineConfig;
use crate::headless::{HeadlessConfig, Transcript};

/// Default number of frame ticks.
fn default_frames() -> u64 {
    60
}

/// Default settle timeout in milliseconds.
fn default_settle_timeout_ms() -> u64 {
    10_000
}

/// Specification for a single headless run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSpec {
    /// Path to the Rhai script.
    pub script_path: PathBuf,

    /// Maximum number of frame ticks.
    #[serde(default = "default_frames")]
    pub frames: u64,

    /// Pause before each frame tick, in milliseconds.
    #[serde(default)]
    pub interval_ms: u64,

    /// How long the script may run without yielding, in milliseconds.
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,

    /// Transcript output path. None means stdout.
    #[serde(default)]
    pub output_path: Option<PathBuf>,

    #[serde(default)]
    pub engine: EngineConfig,
}

impl RunSpec {
    pub fn new(script_path: PathBuf) -> Self {
        Self {
            script_path,
            frames: default_frames(),
            interval_ms: 0,
            settle_timeout_ms: default_settle_timeout_ms(),
            output_path: None,
            engine: EngineConfig::default(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read run spec {:?}: {}", path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse run spec {:?}: {}", path, e))
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.script_path.exists() {
            return Err(format!("Script file not found: {:?}", self.script_path));
        }
        if self.settle_timeout_ms == 0 {
            return Err("Settle timeout must be positive".to_string());
        }
        self.engine.validate().map_err(|e| e.to_string())
    }

    pub fn headless_config(&self) -> HeadlessConfig {
        HeadlessConfig {
            frames: self.frames,
            interval: Duration::from_millis(self.interval_ms),
            settle_timeout: Duration::from_millis(self.settle_timeout_ms),
        }
    }

    /// Metadata lands next to the transcript, or in the working directory
    /// when the transcript goes to stdout.
    pub fn metadata_path(&self) -> PathBuf {
        match &self.output_path {
            Some(path) => path.with_extension("meta.json"),
            None => PathBuf::from("degenerate.meta.json"),
        }
    }
}

/// How a run ended, as recorded in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    Finished,
    Failed,
    /// The frame budget ran out first.
    Truncated,
}

impl RunStatus {
    pub fn of(transcript: &Transcript) -> Self {
        if !transcript.errors().is_empty() {
            RunStatus::Failed
        } else if transcript.finished {
            RunStatus::Finished
        } else {
            RunStatus::Truncated
        }
    }
}

/// Metadata for a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub spec: RunSpec,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub frames: u64,
    pub snapshot_count: usize,
    pub status: RunStatus,
    /// SHA-256 of the script content.
    pub script_hash: String,
    /// SHA-256 of the transcript's JSON lines.
    pub transcript_hash: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl RunMetadata {
    pub fn new(
        spec: RunSpec,
        started_at: DateTime<Utc>,
        script: &str,
        transcript: &Transcript,
    ) -> Result<Self, String> {
        let transcript_hash = transcript
            .hash()
            .map_err(|e| format!("Failed to hash transcript: {}", e))?;
        Ok(Self {
            spec,
            started_at,
            completed_at: Utc::now(),
            frames: transcript.frames,
            snapshot_count: transcript.snapshot_count(),
            status: RunStatus::of(transcript),
            script_hash: hash_str(script),
            transcript_hash,
            version: env!("CARGO_PKG_VERSION").to_string(),
            errors: transcript.errors().into_iter().map(str::to_string).collect(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize metadata: {}", e))?;
        std::fs::write(path, json).map_err(|e| format!("Failed to write metadata: {}", e))
    }
}

pub fn hash_str(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::WorkerMessage;

    #[test]
    fn test_run_spec_defaults() {
        let spec: RunSpec = serde_json::from_str(r#"{"scriptPath": "a.rhai"}"#).unwrap();
        assert_eq!(spec.frames, 60);
        assert_eq!(spec.interval_ms, 0);
        assert_eq!(spec.engine, EngineConfig::default());
        assert_eq!(spec.metadata_path(), PathBuf::from("degenerate.meta.json"));
    }

    #[test]
    fn test_run_spec_validation() {
        let spec = RunSpec::new(PathBuf::from("/nonexistent/script.rhai"));
        assert!(spec.validate().is_err());

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("s.rhai");
        std::fs::write(&script, "render();").unwrap();
        let mut spec = RunSpec::new(script);
        assert!(spec.validate().is_ok());
        spec.settle_timeout_ms = 0;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_status() {
        let mut transcript = Transcript {
            messages: vec![WorkerMessage::Done],
            finished: true,
            ..Default::default()
        };
        assert_eq!(RunStatus::of(&transcript), RunStatus::Finished);
        transcript.messages.insert(0, WorkerMessage::Error("boom".into()));
        assert_eq!(RunStatus::of(&transcript), RunStatus::Failed);
        let truncated = Transcript::default();
        assert_eq!(RunStatus::of(&truncated), RunStatus::Truncated);
    }

    #[test]
    fn test_metadata_hashes_script_text() {
        let transcript = Transcript {
            messages: vec![WorkerMessage::Done],
            finished: true,
            ..Default::default()
        };
        let spec = RunSpec::new(PathBuf::from("s.rhai"));
        let meta = RunMetadata::new(spec, Utc::now(), "render();", &transcript).unwrap();
        assert_eq!(meta.script_hash, hash_str("render();"));
        assert_ne!(meta.script_hash, hash_str("render(); "));
        assert_eq!(meta.status, RunStatus::Finished);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.meta.json");
        meta.save(&path).unwrap();
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["scriptHash"], serde_json::json!(meta.script_hash));
    }

    #[test]
    fn test_metadata_path_follows_output() {
        let mut spec = RunSpec::new(PathBuf::from("s.rhai"));
        spec.output_path = Some(PathBuf::from("out/run.jsonl"));
        assert_eq!(spec.metadata_path(), PathBuf::from("out/run.meta.json"));
    }
}
