//! Door definitions - the gated story segments and their unlock order.

use serde::{Deserialize, Serialize};

use crate::items::ItemId;

/// Unique identifier for doors. Authored as `[A-Za-z0-9_]+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoorId(String);

impl DoorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DoorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DoorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Lifecycle of a door: `locked -> unlocked -> completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorStatus {
    /// Entering is rejected.
    Locked,
    /// Entering opens a fresh story session.
    Unlocked,
    /// The door's story has concluded.
    Completed,
}

/// A gated story segment: one door in the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Door {
    pub id: DoorId,

    /// Display name shown in the hub overview.
    pub name: String,

    /// Name of the story graph this door opens into.
    pub story: String,

    /// The item granted by this door's story. Holding it is the
    /// precondition for the next door to unlock.
    pub reward_item: ItemId,
}

impl Door {
    pub fn new(
        id: impl Into<DoorId>,
        name: impl Into<String>,
        story: impl Into<String>,
        reward_item: impl Into<ItemId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            story: story.into(),
            reward_item: reward_item.into(),
        }
    }
}

/// The authored, ordered sequence of doors.
///
/// Order is meaningful: completing door N (while holding its reward item)
/// unlocks door N+1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorPlan {
    doors: Vec<Door>,
}

impl DoorPlan {
    pub fn new(doors: Vec<Door>) -> Self {
        Self { doors }
    }

    /// The first door in the sequence, if any.
    pub fn first(&self) -> Option<&Door> {
        self.doors.first()
    }

    /// Look up a door by id.
    pub fn get(&self, id: &DoorId) -> Option<&Door> {
        self.doors.iter().find(|door| &door.id == id)
    }

    /// Check whether an id names a door in the plan.
    pub fn contains(&self, id: &DoorId) -> bool {
        self.get(id).is_some()
    }

    /// The door that follows the given one in the authored order.
    pub fn next_after(&self, id: &DoorId) -> Option<&Door> {
        let position = self.doors.iter().position(|door| &door.id == id)?;
        self.doors.get(position + 1)
    }

    /// Iterate over the doors in authored order.
    pub fn iter(&self) -> impl Iterator<Item = &Door> {
        self.doors.iter()
    }

    /// Number of doors in the plan.
    pub fn len(&self) -> usize {
        self.doors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doors.is_empty()
    }
}
