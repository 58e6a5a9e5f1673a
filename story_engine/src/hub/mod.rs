//! The hub - the orchestrator that ties doors, sessions, and progression
//! together.
//!
//! The game works as follows:
//! 1. **Assemble**: stories, doors, and items are validated against each
//!    other before play begins
//! 2. **Gate**: entering a door checks its lock status
//! 3. **Traverse**: an open door runs a room session over its story graph
//! 4. **Apply**: terminal completion events flow into the progression state,
//!    which may unlock the next door
//! 5. **Conclude**: with every door completed, the hub offers the binary
//!    ending

mod ending;

pub use ending::*;

use std::sync::Arc;
use thiserror::Error;

use game_state::{
    Door, DoorId, DoorPlan, DoorStatus, Ending, GameError, Item, ItemCatalog, ItemId,
    ProgressionState,
};

use crate::persistence::{self, SaveData, SaveError};
use crate::story_graph::{GraphId, StoryGraph, StoryLibrary};
use crate::traversal::{NodeView, RoomSession, TraversalError};

/// Everything that can go wrong at the command surface. The CLI layer maps
/// these to player-facing messages.
#[derive(Debug, Error)]
pub enum PlayError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Traversal(#[from] TraversalError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error("there is no story in progress")]
    NoActiveStory,

    #[error("door '{door}' references missing story '{story}'")]
    MissingStory { door: DoorId, story: GraphId },

    #[error("story '{graph}' rewards unknown item '{item}'")]
    UnknownRewardItem { graph: GraphId, item: ItemId },
}

/// What one `choose` call did, for the rendering layer to narrate.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// Narrative lines produced by the step, already recorded in the
    /// look-back log.
    pub lines: Vec<String>,

    /// Door whose story just concluded.
    pub completed_door: Option<DoorId>,

    /// Door that the completion unlocked.
    pub unlocked_door: Option<DoorId>,

    /// Ending recorded by this step; the game is over if present.
    pub ending: Option<Ending>,
}

/// The assembled game: story library, door plan, item catalog, progression
/// state, and the active session if a door is open.
#[derive(Debug, Clone)]
pub struct Game {
    library: StoryLibrary,
    plan: DoorPlan,
    catalog: ItemCatalog,
    ending_graph: Arc<StoryGraph>,
    state: ProgressionState,
    session: Option<RoomSession>,
}

impl Game {
    /// Assemble a game and validate the content against itself: every door
    /// must have a story in the library, and every reward - authored in a
    /// graph or designated on a door - must exist in the item catalog.
    ///
    /// Structural defects surface here, before any player interaction.
    pub fn new(
        mut library: StoryLibrary,
        plan: DoorPlan,
        catalog: ItemCatalog,
    ) -> Result<Self, PlayError> {
        let ending_graph = library.insert(hub_ending_graph());

        for door in plan.iter() {
            let story = GraphId::new(door.story.clone());
            let graph = library.get(&story).ok_or_else(|| PlayError::MissingStory {
                door: door.id.clone(),
                story: story.clone(),
            })?;

            for node in graph.nodes() {
                if let Some(reward) = &node.reward {
                    if !catalog.contains(reward) {
                        return Err(PlayError::UnknownRewardItem {
                            graph: story.clone(),
                            item: reward.clone(),
                        });
                    }
                }
            }
            if !catalog.contains(&door.reward_item) {
                return Err(PlayError::UnknownRewardItem {
                    graph: story,
                    item: door.reward_item.clone(),
                });
            }
        }

        let state = ProgressionState::new(&plan);
        Ok(Self {
            library,
            plan,
            catalog,
            ending_graph,
            state,
            session: None,
        })
    }

    /// Override the look-back log bound (from configuration).
    pub fn with_log_cap(mut self, cap: usize) -> Self {
        self.state = self.state.with_log_cap(cap);
        self
    }

    /// Read-only view of the progression state.
    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    /// The doors with their current lock status, in authored order.
    pub fn doors(&self) -> Vec<(&Door, DoorStatus)> {
        self.plan
            .iter()
            .map(|door| {
                let status = self
                    .state
                    .door_status(&door.id)
                    .unwrap_or(DoorStatus::Locked);
                (door, status)
            })
            .collect()
    }

    /// Current display content: the open story node, or the hub overview.
    pub fn look(&self) -> Vec<String> {
        match &self.session {
            Some(session) => render_node(&session.current()),
            None => self.hub_overview(),
        }
    }

    /// Step through a door and open its story at the start node.
    pub fn enter_door(&mut self, id: &DoorId) -> Result<NodeView<'_>, PlayError> {
        let door = self
            .plan
            .get(id)
            .ok_or_else(|| GameError::UnknownDoor(id.clone()))?;
        let story = GraphId::new(door.story.clone());
        let graph = self.library.get(&story).ok_or(PlayError::MissingStory {
            door: id.clone(),
            story,
        })?;

        self.state.enter_door(&self.plan, id)?;
        let session = self.session.insert(RoomSession::open(graph));
        let view = session.current();
        self.state.record_lines(render_node(&view));
        Ok(view)
    }

    /// Choice labels offered by the open story, empty when none is open.
    pub fn current_choices(&self) -> Vec<String> {
        self.session
            .as_ref()
            .map(|session| {
                session
                    .current()
                    .choices
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolve a choice in the open story and apply whatever it concludes.
    ///
    /// On a terminal node the session closes, the completion event flows
    /// into the progression state, and the report says which door completed,
    /// which one unlocked, or which ending was recorded.
    pub fn choose(&mut self, label: &str) -> Result<TurnReport, PlayError> {
        if self.state.ended() {
            return Err(GameError::GameAlreadyEnded.into());
        }
        let session = self.session.as_mut().ok_or(PlayError::NoActiveStory)?;

        let (lines, arrived, completion) = {
            let step = session.choose(label)?;
            (
                render_node(&step.node),
                step.node.id.clone(),
                step.completion,
            )
        };
        let graph = session.graph_id().clone();

        self.state.record_lines(lines.iter().cloned());
        let mut report = TurnReport {
            lines,
            completed_door: None,
            unlocked_door: None,
            ending: None,
        };

        if let Some(event) = completion {
            if graph.as_str() == HUB_ENDING_GRAPH {
                if let Some(ending) = ending_for_node(&arrived) {
                    self.state.record_ending(ending)?;
                    report.ending = Some(ending);
                }
                self.session = None;
            } else {
                // While a door is open, the location is that door's id.
                let door_id = DoorId::new(self.state.location());
                let unlocked = self.state.apply_completion(&self.plan, &door_id, &event)?;
                self.session = None;
                self.state.return_to_hub()?;
                report.completed_door = Some(door_id);
                report.unlocked_door = unlocked;
            }
        }
        Ok(report)
    }

    /// Open the binary ending choice. Available only in the hub, with every
    /// door completed.
    pub fn begin_ending(&mut self) -> Result<NodeView<'_>, PlayError> {
        if self.state.ended() {
            return Err(GameError::GameAlreadyEnded.into());
        }
        if !self.state.in_hub() || !self.state.all_doors_completed(&self.plan) {
            return Err(GameError::EndingNotOpen.into());
        }

        let session = self
            .session
            .insert(RoomSession::open(self.ending_graph.clone()));
        let view = session.current();
        self.state.record_lines(render_node(&view));
        Ok(view)
    }

    /// Held items, grant order preserved.
    pub fn inventory(&self) -> Vec<&Item> {
        self.state
            .inventory()
            .iter()
            .filter_map(|id| self.catalog.get(id))
            .collect()
    }

    /// Look up a held item by display name (case-insensitive). Items the
    /// player does not hold stay hidden.
    pub fn examine(&self, name: &str) -> Option<&Item> {
        self.catalog
            .find_by_name(name)
            .filter(|item| self.state.has_item(&item.id))
    }

    /// Recent narrative lines, oldest first.
    pub fn recent_log(&self) -> impl Iterator<Item = &str> {
        self.state.recent_lines()
    }

    /// Project the current state into a save record.
    pub fn save(&self) -> SaveData {
        let cursor = self.session.as_ref().map(|session| session.cursor());
        persistence::snapshot(&self.state, cursor.as_ref())
    }

    /// Write the current state to a save file.
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), PlayError> {
        persistence::write_save_file(path, &self.save())?;
        Ok(())
    }

    /// Replace the current state with a validated save. All-or-nothing: on
    /// any error the in-memory state is exactly as it was.
    pub fn load(&mut self, save: &SaveData) -> Result<(), PlayError> {
        let (state, cursor) = persistence::restore(
            save,
            &self.plan,
            &self.catalog,
            &self.library,
            self.state.log_cap(),
        )?;

        let session = match cursor {
            Some(cursor) => {
                let graph = self
                    .library
                    .get(&cursor.graph)
                    .ok_or_else(|| SaveError::UnknownGraph(cursor.graph.clone()))?;
                Some(RoomSession::resume(graph, &cursor)?)
            }
            None => None,
        };

        // Everything validated; only now mutate.
        self.state = state;
        self.session = session;
        Ok(())
    }

    /// Read a save file and replace the current state with it.
    pub fn load_from_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<(), PlayError> {
        let save = persistence::read_save_file(path)?;
        self.load(&save)
    }

    fn hub_overview(&self) -> Vec<String> {
        let mut lines = vec!["You are in the hub. The dog watches you expectantly.".to_string()];
        for (door, status) in self.doors() {
            let status = match status {
                DoorStatus::Locked => "locked",
                DoorStatus::Unlocked => "open",
                DoorStatus::Completed => "completed",
            };
            lines.push(format!("  {} [{status}]", door.name));
        }
        if self.state.all_doors_completed(&self.plan) && !self.state.ended() {
            lines.push("Every door stands open. The dog waits by the archway.".to_string());
        }
        lines
    }
}

fn render_node(view: &NodeView<'_>) -> Vec<String> {
    let mut lines = Vec::with_capacity(view.prose.len() + 1);
    lines.push(view.title.to_string());
    lines.extend(view.prose.iter().cloned());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story_graph::parse_template;
    use game_state::{DoorPlan, FlagId};

    fn door_template(reward: &str, flag: &str) -> String {
        format!(
            "\
## The Threshold (start)
\"You step into a quiet room.\"

Choices:
- [Press on] -> heart_branch
- [Turn back empty-handed] -> empty_leaf

## The Heart (heart_branch)
Choices:
- [Claim what waits] -> reward_leaf

## The Gift (reward_leaf)
Something is pressed into your hand. (REWARD: {reward}) (FLAG: {flag})

## The Retreat (empty_leaf)
You leave with nothing.
"
        )
    }

    fn catalog() -> ItemCatalog {
        let mut catalog = ItemCatalog::new();
        catalog.insert(Item::new("wedding_band", "Wedding Band").with_flavor("A worn golden ring."));
        catalog.insert(Item::new("brass_compass", "Brass Compass"));
        catalog.insert(Item::new("iron_lantern", "Iron Lantern"));
        catalog
    }

    fn plan() -> DoorPlan {
        DoorPlan::new(vec![
            Door::new("north_door", "The Silver Door", "chapel", "wedding_band"),
            Door::new("east_door", "The Golden Door", "garden", "brass_compass"),
            Door::new("south_door", "The Dark Door", "cellar", "iron_lantern"),
        ])
    }

    fn game() -> Game {
        let mut library = StoryLibrary::new();
        library.insert(parse_template("chapel", &door_template("wedding_band", "chapel_done")).unwrap());
        library.insert(parse_template("garden", &door_template("brass_compass", "garden_done")).unwrap());
        library.insert(parse_template("cellar", &door_template("iron_lantern", "cellar_done")).unwrap());
        Game::new(library, plan(), catalog()).unwrap()
    }

    fn complete_door(game: &mut Game, door: &str) -> TurnReport {
        game.enter_door(&DoorId::new(door)).unwrap();
        game.choose("Press on").unwrap();
        game.choose("Claim what waits").unwrap()
    }

    #[test]
    fn test_construction_rejects_missing_story() {
        let mut library = StoryLibrary::new();
        library.insert(parse_template("chapel", &door_template("wedding_band", "f")).unwrap());

        let err = Game::new(library, plan(), catalog()).unwrap_err();
        assert!(matches!(err, PlayError::MissingStory { .. }));
    }

    #[test]
    fn test_construction_rejects_unknown_reward_item() {
        let mut library = StoryLibrary::new();
        library.insert(parse_template("chapel", &door_template("phantom_ring", "f")).unwrap());
        library.insert(parse_template("garden", &door_template("brass_compass", "g")).unwrap());
        library.insert(parse_template("cellar", &door_template("iron_lantern", "h")).unwrap());

        let err = Game::new(library, plan(), catalog()).unwrap_err();
        match err {
            PlayError::UnknownRewardItem { item, .. } => {
                assert_eq!(item, ItemId::new("phantom_ring"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_locked_door_is_rejected() {
        let mut game = game();
        let err = game.enter_door(&DoorId::new("east_door")).unwrap_err();
        assert!(matches!(
            err,
            PlayError::Game(GameError::DoorLocked(_))
        ));
    }

    #[test]
    fn test_choose_without_open_story() {
        let mut game = game();
        assert!(matches!(
            game.choose("Press on"),
            Err(PlayError::NoActiveStory)
        ));
    }

    #[test]
    fn test_completing_a_door_unlocks_the_next() {
        let mut game = game();

        let report = complete_door(&mut game, "north_door");
        assert_eq!(report.completed_door, Some(DoorId::new("north_door")));
        assert_eq!(report.unlocked_door, Some(DoorId::new("east_door")));
        assert!(report.ending.is_none());

        assert!(game.state().in_hub());
        assert!(game.state().has_item(&ItemId::new("wedding_band")));
        assert!(game.state().has_flag(&FlagId::new("chapel_done")));
        assert_eq!(
            game.state().door_status(&DoorId::new("east_door")),
            Some(DoorStatus::Unlocked)
        );
    }

    #[test]
    fn test_empty_handed_exit_completes_but_does_not_unlock() {
        let mut game = game();

        game.enter_door(&DoorId::new("north_door")).unwrap();
        let report = game.choose("Turn back empty-handed").unwrap();

        assert_eq!(report.completed_door, Some(DoorId::new("north_door")));
        assert_eq!(report.unlocked_door, None);
        assert_eq!(
            game.state().door_status(&DoorId::new("east_door")),
            Some(DoorStatus::Locked)
        );
    }

    #[test]
    fn test_unknown_choice_is_recoverable() {
        let mut game = game();
        game.enter_door(&DoorId::new("north_door")).unwrap();

        assert!(matches!(
            game.choose("Do a backflip"),
            Err(PlayError::Traversal(TraversalError::UnknownChoice { .. }))
        ));
        // Still standing at the start node, same choices on offer.
        assert_eq!(
            game.current_choices(),
            vec!["Press on".to_string(), "Turn back empty-handed".to_string()]
        );
    }

    #[test]
    fn test_ending_is_gated_until_every_door_completes() {
        let mut game = game();
        assert!(matches!(
            game.begin_ending(),
            Err(PlayError::Game(GameError::EndingNotOpen))
        ));

        complete_door(&mut game, "north_door");
        complete_door(&mut game, "east_door");
        assert!(matches!(
            game.begin_ending(),
            Err(PlayError::Game(GameError::EndingNotOpen))
        ));

        complete_door(&mut game, "south_door");
        let view = game.begin_ending().unwrap();
        assert_eq!(
            view.choices,
            vec!["Leave the hub", "Return to the first door"]
        );
    }

    #[test]
    fn test_choosing_an_ending_ends_the_game() {
        let mut game = game();
        for door in ["north_door", "east_door", "south_door"] {
            complete_door(&mut game, door);
        }

        game.begin_ending().unwrap();
        let report = game.choose("Leave the hub").unwrap();
        assert_eq!(report.ending, Some(Ending::LeaveHub));

        assert!(game.state().ended());
        assert!(matches!(
            game.enter_door(&DoorId::new("north_door")),
            Err(PlayError::Game(GameError::GameAlreadyEnded))
        ));
        assert!(matches!(
            game.choose("Leave the hub"),
            Err(PlayError::Game(GameError::GameAlreadyEnded))
        ));
    }

    #[test]
    fn test_inventory_and_examine() {
        let mut game = game();
        assert!(game.inventory().is_empty());
        assert!(game.examine("Wedding Band").is_none());

        complete_door(&mut game, "north_door");

        let held: Vec<_> = game.inventory().iter().map(|item| item.name.as_str()).collect();
        assert_eq!(held, vec!["Wedding Band"]);
        assert_eq!(
            game.examine("wedding band").unwrap().flavor_text,
            "A worn golden ring."
        );
        assert!(game.examine("Brass Compass").is_none());
    }

    #[test]
    fn test_look_in_hub_and_inside_a_story() {
        let mut game = game();

        let hub = game.look();
        assert!(hub[0].contains("hub"));
        assert!(hub.iter().any(|line| line.contains("The Silver Door")));

        game.enter_door(&DoorId::new("north_door")).unwrap();
        let inside = game.look();
        assert_eq!(inside[0], "The Threshold");
    }

    #[test]
    fn test_save_load_round_trip_mid_story() {
        let mut game = game();
        complete_door(&mut game, "north_door");
        game.enter_door(&DoorId::new("east_door")).unwrap();
        game.choose("Press on").unwrap();

        let save = game.save();

        let mut fresh = self::game();
        fresh.load(&save).unwrap();

        assert_eq!(fresh.state(), game.state());
        assert_eq!(fresh.current_choices(), vec!["Claim what waits".to_string()]);
        assert_eq!(fresh.save(), save);
    }

    #[test]
    fn test_corrupt_save_leaves_state_untouched() {
        let mut game = game();
        complete_door(&mut game, "north_door");
        let before = game.save();

        let mut corrupt = before.clone();
        corrupt.inventory.push(ItemId::new("phantom_item"));
        assert!(matches!(
            game.load(&corrupt),
            Err(PlayError::Save(SaveError::UnknownItem(_)))
        ));
        assert_eq!(game.save(), before);
    }

    #[test]
    fn test_load_rejects_save_stranded_inside_a_door() {
        let mut game = game();
        game.enter_door(&DoorId::new("north_door")).unwrap();

        let mut save = game.save();
        save.cursor = None;
        assert!(matches!(
            game.load(&save),
            Err(PlayError::Save(SaveError::InconsistentCursor { .. }))
        ));
        // The open session is still live.
        assert_eq!(game.look()[0], "The Threshold");
    }

    #[test]
    fn test_save_file_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("three_doors_game_{}", std::process::id()))
            .join("save.json");

        let mut game = game();
        complete_door(&mut game, "north_door");
        game.save_to_file(&path).unwrap();

        let mut fresh = self::game();
        fresh.load_from_file(&path).unwrap();
        assert_eq!(fresh.state(), game.state());

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_look_back_log_records_the_walk() {
        let mut game = game();
        complete_door(&mut game, "north_door");

        let log: Vec<_> = game.recent_log().collect();
        assert!(log.contains(&"The Threshold"));
        assert!(log.contains(&"Something is pressed into your hand."));
    }
}
