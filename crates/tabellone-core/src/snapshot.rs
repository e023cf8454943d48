// Persisted stage snapshot: brackets plus the pick and score state keyed by
// bracket id.
//
// The caller owns this shape. Everything we do not interpret is carried in
// `extra` maps so load followed by save does not drop data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::bracket::picks::PickState;
use crate::bracket::Bracket;
use crate::round_robin::ScoreState;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to access snapshot {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid snapshot JSON in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Pick and score state for every bracket of a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultState {
    #[serde(default)]
    pub winners_by_id: BTreeMap<String, PickState>,
    #[serde(default)]
    pub ita_scores_by_id: BTreeMap<String, ScoreState>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ResultState {
    pub fn picks(&self, bracket_id: &str) -> Option<&PickState> {
        self.winners_by_id.get(bracket_id)
    }

    pub fn scores(&self, bracket_id: &str) -> Option<&ScoreState> {
        self.ita_scores_by_id.get(bracket_id)
    }

    pub fn picks_mut(&mut self, bracket_id: &str) -> &mut PickState {
        self.winners_by_id.entry(bracket_id.to_string()).or_default()
    }

    pub fn scores_mut(&mut self, bracket_id: &str) -> &mut ScoreState {
        self.ita_scores_by_id.entry(bracket_id.to_string()).or_default()
    }
}

/// Whole-stage snapshot: `{brackets: [...], winnersById, itaScoresById}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub brackets: Vec<Bracket>,
    #[serde(flatten)]
    pub results: ResultState,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Snapshot, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Read a snapshot from disk.
    pub fn load(path: &Path) -> Result<Snapshot, SnapshotError> {
        let contents = std::fs::read_to_string(path).map_err(|e| SnapshotError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Snapshot::from_json(&contents).map_err(|e| SnapshotError::Json {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Write the snapshot as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let io_err = |e| SnapshotError::Io {
            path: path.display().to_string(),
            source: e,
        };
        let json = self.to_json().map_err(|e| SnapshotError::Json {
            path: path.display().to_string(),
            source: e,
        })?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        std::fs::write(path, json).map_err(io_err)
    }
}
