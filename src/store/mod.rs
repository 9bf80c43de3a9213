use crate::models::report::{ Evaluation, Roadmap };
use chrono::{ DateTime, Utc };
use log::{ debug, info, warn };
use serde::{ Serialize, Deserialize };
use serde_json::Value;
use std::path::{ Path, PathBuf };

const SCRATCH_FILE_PREFIX: &str = "interview-";

/// Snapshot of one completed interview, kept locally so results survive the
/// process and can be listed later.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScratchReport {
    pub session_id: String,
    pub user_name: String,
    pub completed_at: DateTime<Utc>,
    pub questions_answered: usize,
    pub total_questions: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roadmap: Option<Roadmap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<Value>,
}

/// JSON-file store under a single directory, one `interview-<session>.json`
/// per finished interview. Saves are last-write-wins and best effort: a
/// failure is logged and the flow carries on without the snapshot.
pub struct ScratchStore {
    dir: PathBuf,
}

impl ScratchStore {
    /// Platform data directory, under `interview-client/reports`.
    pub fn default_location() -> Self {
        let dir = dirs
            ::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("interview-client")
            .join("reports");
        Self { dir }
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}{}.json", SCRATCH_FILE_PREFIX, session_id))
    }

    pub fn save(&self, report: &ScratchReport) -> Option<PathBuf> {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!("Could not create scratch directory {}: {}", self.dir.display(), e);
            return None;
        }
        let path = self.file_for(&report.session_id);
        let json = match serde_json::to_string_pretty(report) {
            Ok(json) => json,
            Err(e) => {
                warn!("Could not serialize interview snapshot: {}", e);
                return None;
            }
        };
        match std::fs::write(&path, json) {
            Ok(()) => {
                info!("Interview snapshot saved to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Could not save interview snapshot to {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn load(&self, session_id: &str) -> Option<ScratchReport> {
        let path = self.file_for(session_id);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("No snapshot at {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Skipping unreadable snapshot {}: {}", path.display(), e);
                None
            }
        }
    }

    /// All stored snapshots, newest first. Unreadable entries are skipped.
    pub fn list(&self) -> Vec<ScratchReport> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => {
                return Vec::new();
            }
        };

        let mut reports = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(SCRATCH_FILE_PREFIX) || !name.ends_with(".json") {
                continue;
            }
            let session_id = name
                .trim_start_matches(SCRATCH_FILE_PREFIX)
                .trim_end_matches(".json");
            if let Some(report) = self.load(session_id) {
                reports.push(report);
            }
        }
        reports.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot(session_id: &str, hour: u32) -> ScratchReport {
        ScratchReport {
            session_id: session_id.to_string(),
            user_name: "Ada".to_string(),
            completed_at: Utc.with_ymd_and_hms(2024, 6, 3, hour, 0, 0).unwrap(),
            questions_answered: 4,
            total_questions: 5,
            evaluation: None,
            roadmap: None,
            report: Some(serde_json::json!({"overall": 82})),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScratchStore::at(dir.path());

        let saved = store.save(&snapshot("sess-1", 9)).unwrap();
        assert!(saved.ends_with("interview-sess-1.json"));

        let loaded = store.load("sess-1").unwrap();
        assert_eq!(loaded.session_id, "sess-1");
        assert_eq!(loaded.questions_answered, 4);
        assert_eq!(loaded.report.unwrap()["overall"], 82);
    }

    #[test]
    fn save_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScratchStore::at(dir.path().join("interview-client").join("reports"));
        assert!(store.save(&snapshot("sess-1", 9)).is_some());
        assert!(store.load("sess-1").is_some());
    }

    #[test]
    fn list_is_newest_first_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScratchStore::at(dir.path());
        store.save(&snapshot("older", 8)).unwrap();
        store.save(&snapshot("newest", 15)).unwrap();
        store.save(&snapshot("middle", 11)).unwrap();
        std::fs::write(dir.path().join("interview-bad.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let listed = store.list();
        let ids: Vec<&str> = listed
            .iter()
            .map(|r| r.session_id.as_str())
            .collect();
        assert_eq!(ids, vec!["newest", "middle", "older"]);
    }

    #[test]
    fn load_missing_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScratchStore::at(dir.path());
        assert!(store.load("nope").is_none());
        assert!(store.list().is_empty());
    }

    #[test]
    fn save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScratchStore::at(dir.path());
        store.save(&snapshot("sess-1", 9)).unwrap();

        let mut updated = snapshot("sess-1", 9);
        updated.questions_answered = 7;
        store.save(&updated).unwrap();

        assert_eq!(store.load("sess-1").unwrap().questions_answered, 7);
        assert_eq!(store.list().len(), 1);
    }
}
