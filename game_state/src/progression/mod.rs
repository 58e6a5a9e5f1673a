//! Progression state - the single mutable record of the player's journey.
//!
//! The state mutates only through named transitions: entering doors,
//! applying story completion events, and recording the hub ending. Story
//! traversal itself lives elsewhere and only reports events back here.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

use crate::doors::{DoorId, DoorPlan, DoorStatus};
use crate::items::ItemId;

/// Location id of the central hub. Not itself a story node.
pub const HUB_LOCATION: &str = "hub";

/// Default bound on the look-back log.
pub const DEFAULT_LOG_CAP: usize = 50;

/// Unique identifier for completion flags. Authored as `[A-Za-z0-9_]+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagId(String);

impl FlagId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FlagId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FlagId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for FlagId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// What a story session reports when it arrives at a terminal node.
///
/// Both fields may be absent; arrival itself is the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CompletionEvent {
    pub reward: Option<ItemId>,
    pub flag: Option<FlagId>,
}

impl CompletionEvent {
    pub fn new(reward: Option<ItemId>, flag: Option<FlagId>) -> Self {
        Self { reward, flag }
    }
}

/// The binary ending chosen in the hub after every door is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ending {
    /// The player walks out of the hub for good.
    LeaveHub,
    /// The player turns back to the first door.
    ReturnToFirstDoor,
}

/// Recoverable progression errors. The caller re-prompts; no state mutates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("the door '{0}' is locked")]
    DoorLocked(DoorId),

    #[error("there is no door named '{0}'")]
    UnknownDoor(DoorId),

    #[error("the game has already ended")]
    GameAlreadyEnded,

    #[error("the hub ending does not open until every door is completed")]
    EndingNotOpen,
}

/// Everything the player has done so far.
///
/// Created once at game start, mutated only through the methods below, and
/// persisted verbatim by the save codec.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressionState {
    /// Current location: [`HUB_LOCATION`] or a door id.
    location: String,

    /// Held items, in the order they were granted.
    inventory: Vec<ItemId>,

    /// Achieved completion flags.
    flags: HashSet<FlagId>,

    /// Lock status per door.
    door_status: HashMap<DoorId, DoorStatus>,

    /// Recent narrative lines for "look back", oldest first.
    recent_lines: VecDeque<String>,

    /// Bound on `recent_lines`. Configuration, not persisted.
    log_cap: usize,

    /// The recorded game end, if the player has reached one.
    ending: Option<Ending>,
}

impl ProgressionState {
    /// Create the starting state: player in the hub, first door unlocked,
    /// every other door locked.
    pub fn new(plan: &DoorPlan) -> Self {
        let first = plan.first().map(|door| door.id.clone());
        let door_status = plan
            .iter()
            .map(|door| {
                let status = if Some(&door.id) == first.as_ref() {
                    DoorStatus::Unlocked
                } else {
                    DoorStatus::Locked
                };
                (door.id.clone(), status)
            })
            .collect();

        Self {
            location: HUB_LOCATION.to_string(),
            inventory: Vec::new(),
            flags: HashSet::new(),
            door_status,
            recent_lines: VecDeque::new(),
            log_cap: DEFAULT_LOG_CAP,
            ending: None,
        }
    }

    /// Override the look-back log bound.
    pub fn with_log_cap(mut self, cap: usize) -> Self {
        self.log_cap = cap.max(1);
        self.trim_log();
        self
    }

    /// Rebuild a state from saved parts. Referential validation is the save
    /// codec's job; this only reassembles.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        location: String,
        inventory: Vec<ItemId>,
        flags: HashSet<FlagId>,
        door_status: HashMap<DoorId, DoorStatus>,
        recent_lines: Vec<String>,
        ending: Option<Ending>,
        log_cap: usize,
    ) -> Self {
        let mut state = Self {
            location,
            inventory,
            flags,
            door_status,
            recent_lines: recent_lines.into(),
            log_cap: log_cap.max(1),
            ending,
        };
        state.trim_log();
        state
    }

    /// Current location id.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Whether the player is standing in the hub.
    pub fn in_hub(&self) -> bool {
        self.location == HUB_LOCATION
    }

    /// Held items in grant order.
    pub fn inventory(&self) -> &[ItemId] {
        &self.inventory
    }

    pub fn has_item(&self, id: &ItemId) -> bool {
        self.inventory.contains(id)
    }

    /// Grant an item. Granting an already-held item is a no-op, not an error.
    pub fn add_item(&mut self, id: ItemId) {
        if !self.inventory.contains(&id) {
            self.inventory.push(id);
        }
    }

    /// Achieved flags.
    pub fn flags(&self) -> &HashSet<FlagId> {
        &self.flags
    }

    pub fn has_flag(&self, id: &FlagId) -> bool {
        self.flags.contains(id)
    }

    pub fn set_flag(&mut self, id: FlagId) {
        self.flags.insert(id);
    }

    /// Lock status of one door.
    pub fn door_status(&self, id: &DoorId) -> Option<DoorStatus> {
        self.door_status.get(id).copied()
    }

    /// Lock status of every door.
    pub fn door_statuses(&self) -> &HashMap<DoorId, DoorStatus> {
        &self.door_status
    }

    /// Whether every door in the plan has been completed.
    pub fn all_doors_completed(&self, plan: &DoorPlan) -> bool {
        !plan.is_empty()
            && plan
                .iter()
                .all(|door| self.door_status(&door.id) == Some(DoorStatus::Completed))
    }

    /// Step through a door: the location moves there.
    ///
    /// Locked doors reject with [`GameError::DoorLocked`]; completed doors
    /// may be revisited (rewards are idempotent, nothing can double-grant).
    pub fn enter_door(&mut self, plan: &DoorPlan, id: &DoorId) -> Result<(), GameError> {
        self.ensure_running()?;
        if !plan.contains(id) {
            return Err(GameError::UnknownDoor(id.clone()));
        }
        match self.door_status(id) {
            Some(DoorStatus::Locked) | None => Err(GameError::DoorLocked(id.clone())),
            Some(DoorStatus::Unlocked) | Some(DoorStatus::Completed) => {
                self.location = id.as_str().to_string();
                Ok(())
            }
        }
    }

    /// Step back out into the hub.
    pub fn return_to_hub(&mut self) -> Result<(), GameError> {
        self.ensure_running()?;
        self.location = HUB_LOCATION.to_string();
        Ok(())
    }

    /// Apply a story completion event to the door it came from.
    ///
    /// Grants the reward and flag, marks the door completed, and unlocks the
    /// next door in the plan - but only if the player now holds this door's
    /// designated reward item. Returns the id of the newly unlocked door,
    /// if any.
    pub fn apply_completion(
        &mut self,
        plan: &DoorPlan,
        door_id: &DoorId,
        event: &CompletionEvent,
    ) -> Result<Option<DoorId>, GameError> {
        self.ensure_running()?;
        let door = plan
            .get(door_id)
            .ok_or_else(|| GameError::UnknownDoor(door_id.clone()))?;

        if let Some(reward) = &event.reward {
            self.add_item(reward.clone());
        }
        if let Some(flag) = &event.flag {
            self.set_flag(flag.clone());
        }
        self.door_status
            .insert(door.id.clone(), DoorStatus::Completed);

        // The reward item is the key to the next door; without it the
        // sequence stays shut.
        if !self.has_item(&door.reward_item) {
            return Ok(None);
        }

        let next = match plan.next_after(door_id) {
            Some(next) => next,
            None => return Ok(None),
        };
        if self.door_status(&next.id) == Some(DoorStatus::Locked) {
            self.door_status
                .insert(next.id.clone(), DoorStatus::Unlocked);
            return Ok(Some(next.id.clone()));
        }
        Ok(None)
    }

    /// Record the chosen hub ending. The game is over afterwards: every
    /// later transition reports [`GameError::GameAlreadyEnded`].
    pub fn record_ending(&mut self, ending: Ending) -> Result<(), GameError> {
        self.ensure_running()?;
        self.ending = Some(ending);
        Ok(())
    }

    pub fn ending(&self) -> Option<Ending> {
        self.ending
    }

    /// Whether the game has reached an ending.
    pub fn ended(&self) -> bool {
        self.ending.is_some()
    }

    /// Append a narrative line to the look-back log.
    pub fn record_line(&mut self, line: impl Into<String>) {
        self.recent_lines.push_back(line.into());
        self.trim_log();
    }

    /// Append several narrative lines to the look-back log.
    pub fn record_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for line in lines {
            self.recent_lines.push_back(line.into());
        }
        self.trim_log();
    }

    /// Recent narrative lines, oldest first.
    pub fn recent_lines(&self) -> impl Iterator<Item = &str> {
        self.recent_lines.iter().map(String::as_str)
    }

    /// Current bound on the look-back log.
    pub fn log_cap(&self) -> usize {
        self.log_cap
    }

    fn ensure_running(&self) -> Result<(), GameError> {
        if self.ended() {
            Err(GameError::GameAlreadyEnded)
        } else {
            Ok(())
        }
    }

    fn trim_log(&mut self) {
        while self.recent_lines.len() > self.log_cap {
            self.recent_lines.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doors::Door;

    fn plan() -> DoorPlan {
        DoorPlan::new(vec![
            Door::new("north_door", "The Silver Door", "chapel", "wedding_band"),
            Door::new("east_door", "The Golden Door", "garden", "brass_compass"),
            Door::new("south_door", "The Dark Door", "cellar", "iron_lantern"),
        ])
    }

    #[test]
    fn test_new_state_unlocks_only_first_door() {
        let state = ProgressionState::new(&plan());

        assert!(state.in_hub());
        assert_eq!(
            state.door_status(&DoorId::new("north_door")),
            Some(DoorStatus::Unlocked)
        );
        assert_eq!(
            state.door_status(&DoorId::new("east_door")),
            Some(DoorStatus::Locked)
        );
        assert_eq!(
            state.door_status(&DoorId::new("south_door")),
            Some(DoorStatus::Locked)
        );
    }

    #[test]
    fn test_enter_locked_door_is_rejected_without_mutation() {
        let plan = plan();
        let mut state = ProgressionState::new(&plan);

        let err = state.enter_door(&plan, &DoorId::new("east_door")).unwrap_err();
        assert_eq!(err, GameError::DoorLocked(DoorId::new("east_door")));
        assert!(state.in_hub());

        let err = state.enter_door(&plan, &DoorId::new("west_door")).unwrap_err();
        assert_eq!(err, GameError::UnknownDoor(DoorId::new("west_door")));
    }

    #[test]
    fn test_enter_unlocked_door_moves_location() {
        let plan = plan();
        let mut state = ProgressionState::new(&plan);

        state.enter_door(&plan, &DoorId::new("north_door")).unwrap();
        assert_eq!(state.location(), "north_door");

        state.return_to_hub().unwrap();
        assert!(state.in_hub());
    }

    #[test]
    fn test_reward_grant_is_idempotent() {
        let mut state = ProgressionState::new(&plan());

        state.add_item(ItemId::new("wedding_band"));
        state.add_item(ItemId::new("wedding_band"));

        assert_eq!(state.inventory(), &[ItemId::new("wedding_band")]);
    }

    #[test]
    fn test_inventory_preserves_grant_order() {
        let mut state = ProgressionState::new(&plan());

        state.add_item(ItemId::new("wedding_band"));
        state.add_item(ItemId::new("brass_compass"));
        state.add_item(ItemId::new("wedding_band"));

        assert_eq!(
            state.inventory(),
            &[ItemId::new("wedding_band"), ItemId::new("brass_compass")]
        );
    }

    #[test]
    fn test_completion_with_reward_unlocks_next_door() {
        let plan = plan();
        let mut state = ProgressionState::new(&plan);

        let event = CompletionEvent::new(Some(ItemId::new("wedding_band")), None);
        let unlocked = state
            .apply_completion(&plan, &DoorId::new("north_door"), &event)
            .unwrap();

        assert_eq!(unlocked, Some(DoorId::new("east_door")));
        assert_eq!(
            state.door_status(&DoorId::new("north_door")),
            Some(DoorStatus::Completed)
        );
        assert_eq!(
            state.door_status(&DoorId::new("east_door")),
            Some(DoorStatus::Unlocked)
        );
    }

    #[test]
    fn test_completion_without_designated_item_does_not_unlock() {
        let plan = plan();
        let mut state = ProgressionState::new(&plan);

        // Terminal node granted a flag but not the door's reward item.
        let event = CompletionEvent::new(None, Some(FlagId::new("chapel_visited")));
        let unlocked = state
            .apply_completion(&plan, &DoorId::new("north_door"), &event)
            .unwrap();

        assert_eq!(unlocked, None);
        assert_eq!(
            state.door_status(&DoorId::new("north_door")),
            Some(DoorStatus::Completed)
        );
        assert_eq!(
            state.door_status(&DoorId::new("east_door")),
            Some(DoorStatus::Locked)
        );
        assert!(state.has_flag(&FlagId::new("chapel_visited")));
    }

    #[test]
    fn test_completion_of_last_door_unlocks_nothing() {
        let plan = plan();
        let mut state = ProgressionState::new(&plan);

        let event = CompletionEvent::new(Some(ItemId::new("iron_lantern")), None);
        let unlocked = state
            .apply_completion(&plan, &DoorId::new("south_door"), &event)
            .unwrap();
        assert_eq!(unlocked, None);
    }

    #[test]
    fn test_all_doors_completed() {
        let plan = plan();
        let mut state = ProgressionState::new(&plan);
        assert!(!state.all_doors_completed(&plan));

        for door in plan.iter() {
            let event = CompletionEvent::new(Some(door.reward_item.clone()), None);
            state.apply_completion(&plan, &door.id, &event).unwrap();
        }
        assert!(state.all_doors_completed(&plan));
    }

    #[test]
    fn test_mutation_after_ending_is_rejected() {
        let plan = plan();
        let mut state = ProgressionState::new(&plan);

        state.record_ending(Ending::LeaveHub).unwrap();
        assert!(state.ended());
        assert_eq!(state.ending(), Some(Ending::LeaveHub));

        let err = state.enter_door(&plan, &DoorId::new("north_door")).unwrap_err();
        assert_eq!(err, GameError::GameAlreadyEnded);

        let event = CompletionEvent::default();
        let err = state
            .apply_completion(&plan, &DoorId::new("north_door"), &event)
            .unwrap_err();
        assert_eq!(err, GameError::GameAlreadyEnded);

        assert_eq!(
            state.record_ending(Ending::ReturnToFirstDoor).unwrap_err(),
            GameError::GameAlreadyEnded
        );
    }

    #[test]
    fn test_recent_log_is_bounded() {
        let mut state = ProgressionState::new(&plan()).with_log_cap(3);

        for n in 0..5 {
            state.record_line(format!("line {n}"));
        }

        let lines: Vec<_> = state.recent_lines().collect();
        assert_eq!(lines, vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_record_lines_batch() {
        let mut state = ProgressionState::new(&plan()).with_log_cap(2);
        state.record_lines(["one", "two", "three"]);

        let lines: Vec<_> = state.recent_lines().collect();
        assert_eq!(lines, vec!["two", "three"]);
    }
}
