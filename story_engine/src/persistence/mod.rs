//! Save/load codec - a pure projection of progression plus cursor.
//!
//! The save format is self-contained: a dedicated serde struct decouples the
//! persisted shape from the runtime types. Restore is all-or-nothing; every
//! referenced id is validated against the static catalogs before anything is
//! constructed, so a corrupt save can never leave the player in an
//! inconsistent state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use game_state::{
    DoorId, DoorPlan, DoorStatus, Ending, FlagId, ItemCatalog, ItemId, ProgressionState,
    HUB_LOCATION,
};

use crate::story_graph::{GraphId, StoryLibrary};
use crate::traversal::SessionCursor;

/// Why a save was refused. Every variant rejects the load wholesale; the
/// caller's in-memory state is untouched.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("could not access save file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("save references unknown door '{0}'")]
    UnknownDoor(DoorId),

    #[error("save references unknown item '{0}'")]
    UnknownItem(ItemId),

    #[error("save references unknown flag '{0}'")]
    UnknownFlag(FlagId),

    #[error("save names unknown location '{0}'")]
    UnknownLocation(String),

    #[error("save cursor references unknown story '{0}'")]
    UnknownGraph(GraphId),

    #[error("save cursor points at node '{node}', which does not exist in story '{graph}'")]
    UnknownNode { graph: GraphId, node: String },

    #[error("save pairs location '{location}' with an inconsistent story cursor")]
    InconsistentCursor { location: String },
}

/// The persisted representation. A pure projection of progression state
/// plus the active cursor; no derived or cached data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub location: String,
    pub doors: HashMap<DoorId, DoorStatus>,
    /// Held items, grant order preserved.
    pub inventory: Vec<ItemId>,
    pub flags: Vec<FlagId>,
    /// Mid-story position, if a door was open when the game was saved.
    pub cursor: Option<SessionCursor>,
    pub recent_lines: Vec<String>,
    pub ending: Option<Ending>,
}

/// Project a progression state and active cursor into a save record.
pub fn snapshot(state: &ProgressionState, cursor: Option<&SessionCursor>) -> SaveData {
    let mut flags: Vec<FlagId> = state.flags().iter().cloned().collect();
    // Stable output: flag sets have no inherent order.
    flags.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    SaveData {
        location: state.location().to_string(),
        doors: state.door_statuses().clone(),
        inventory: state.inventory().to_vec(),
        flags,
        cursor: cursor.cloned(),
        recent_lines: state.recent_lines().map(str::to_string).collect(),
        ending: state.ending(),
    }
}

/// Serialize a save record to JSON.
pub fn encode(save: &SaveData) -> Result<String, SaveError> {
    Ok(serde_json::to_string_pretty(save)?)
}

/// Deserialize a save record from JSON. Referential validation happens in
/// [`restore`], not here.
pub fn decode(json: &str) -> Result<SaveData, SaveError> {
    Ok(serde_json::from_str(json)?)
}

/// Validate a save record against the static catalogs and rebuild the
/// logical state. Nothing is constructed until every check has passed.
pub fn restore(
    save: &SaveData,
    plan: &DoorPlan,
    catalog: &ItemCatalog,
    library: &StoryLibrary,
    log_cap: usize,
) -> Result<(ProgressionState, Option<SessionCursor>), SaveError> {
    for door_id in save.doors.keys() {
        if !plan.contains(door_id) {
            return Err(SaveError::UnknownDoor(door_id.clone()));
        }
    }
    for item_id in &save.inventory {
        if !catalog.contains(item_id) {
            return Err(SaveError::UnknownItem(item_id.clone()));
        }
    }
    let known_flags = library.known_flags();
    for flag_id in &save.flags {
        if !known_flags.contains(flag_id) {
            return Err(SaveError::UnknownFlag(flag_id.clone()));
        }
    }
    if save.location != HUB_LOCATION && !plan.contains(&DoorId::new(save.location.clone())) {
        return Err(SaveError::UnknownLocation(save.location.clone()));
    }
    if let Some(cursor) = &save.cursor {
        if !library.contains(&cursor.graph) {
            return Err(SaveError::UnknownGraph(cursor.graph.clone()));
        }
        if !library.contains_node(&cursor.graph, &cursor.node) {
            return Err(SaveError::UnknownNode {
                graph: cursor.graph.clone(),
                node: cursor.node.as_str().to_string(),
            });
        }
    }

    // Location and cursor must agree: standing in a door means a cursor
    // over that door's story, standing in the hub means no cursor on any
    // door's story (the built-in ending graph is the one hub session).
    let inconsistent = || SaveError::InconsistentCursor {
        location: save.location.clone(),
    };
    match plan.get(&DoorId::new(save.location.clone())) {
        Some(door) => match &save.cursor {
            Some(cursor) if cursor.graph.as_str() == door.story => {}
            _ => return Err(inconsistent()),
        },
        None => {
            if let Some(cursor) = &save.cursor {
                if plan.iter().any(|door| door.story == cursor.graph.as_str()) {
                    return Err(inconsistent());
                }
            }
        }
    }

    let state = ProgressionState::restore(
        save.location.clone(),
        save.inventory.clone(),
        save.flags.iter().cloned().collect(),
        save.doors.clone(),
        save.recent_lines.clone(),
        save.ending,
        log_cap,
    );
    Ok((state, save.cursor.clone()))
}

/// Write an encoded save to disk, creating the parent directory if needed.
pub fn write_save_file(path: impl AsRef<Path>, save: &SaveData) -> Result<(), SaveError> {
    let path = path.as_ref();
    let io = |source| SaveError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
    }
    std::fs::write(path, encode(save)?).map_err(io)
}

/// Read and decode a save file. Referential validation still happens in
/// [`restore`].
pub fn read_save_file(path: impl AsRef<Path>) -> Result<SaveData, SaveError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| SaveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&text)
}
