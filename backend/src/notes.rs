use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Gift-idea notes, keyed by invite token and participant name.
///
/// Notes are a convenience: a store that cannot read or write logs the
/// problem and carries on rather than failing the request.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// The stored note, or an empty string when there is none.
    async fn get_note(&self, group_id: &str, person_name: &str) -> String;

    async fn upsert_note(&self, group_id: &str, person_name: &str, note: &str);
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoteRecord {
    pub group_id: String,
    pub person_name: String,
    pub note: String,
}

type NoteKey = (String, String);

/// In-memory notes, optionally mirrored to a JSON file after every write.
#[derive(Debug, Default)]
pub struct FileNoteStore {
    notes: RwLock<HashMap<NoteKey, String>>,
    persist_path: Option<PathBuf>,
}

impl FileNoteStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub async fn with_persistence(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut notes = HashMap::new();
        match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<NoteRecord>>(&bytes) {
                Ok(saved) => {
                    debug!(count = saved.len(), path = %path.display(), "loaded notes");
                    notes.extend(
                        saved
                            .into_iter()
                            .map(|r| ((r.group_id, r.person_name), r.note)),
                    );
                }
                Err(err) => warn!(%err, path = %path.display(), "ignoring unreadable notes file"),
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(%err, path = %path.display(), "could not read notes file"),
        }

        Self {
            notes: RwLock::new(notes),
            persist_path: Some(path),
        }
    }

    /// Save `notes` to disk. Callers hold the write guard, so snapshots land
    /// in the order they were taken; the rename keeps the file whole.
    async fn persist(&self, notes: &HashMap<NoteKey, String>) {
        let Some(path) = &self.persist_path else {
            return;
        };
        let mut snapshot: Vec<NoteRecord> = notes
            .iter()
            .map(|((group_id, person_name), note)| NoteRecord {
                group_id: group_id.clone(),
                person_name: person_name.clone(),
                note: note.clone(),
            })
            .collect();
        snapshot.sort_by(|a, b| {
            (&a.group_id, &a.person_name).cmp(&(&b.group_id, &b.person_name))
        });

        let json = match serde_json::to_vec_pretty(&snapshot) {
            Ok(json) => json,
            Err(err) => {
                warn!(%err, "could not serialize notes");
                return;
            }
        };

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        if let Err(err) = tokio::fs::write(&tmp_path, json).await {
            warn!(%err, path = %tmp_path.display(), "persist error");
            return;
        }
        if let Err(err) = tokio::fs::rename(&tmp_path, path).await {
            warn!(%err, path = %path.display(), "persist error");
        }
    }
}

#[async_trait]
impl NoteStore for FileNoteStore {
    async fn get_note(&self, group_id: &str, person_name: &str) -> String {
        let key = (group_id.to_string(), person_name.to_string());
        self.notes
            .read()
            .await
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    async fn upsert_note(&self, group_id: &str, person_name: &str, note: &str) {
        let mut notes = self.notes.write().await;
        notes.insert(
            (group_id.to_string(), person_name.to_string()),
            note.to_string(),
        );
        self.persist(&notes).await;
    }
}
