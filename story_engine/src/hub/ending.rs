//! The hub ending - a fourth, built-in story graph.
//!
//! The two-way ending after the third door is a top-level decision, not part
//! of any door's story, so it gets its own graph rather than an extra state
//! on the door machine.

use game_state::Ending;

use crate::story_graph::{NodeId, StoryGraph, StoryNode};

/// Name of the built-in ending graph.
pub const HUB_ENDING_GRAPH: &str = "hub_ending";

const LEAVE_NODE: &str = "leave_hub";
const RETURN_NODE: &str = "return_to_doors";

/// Build the ending graph: one binary choice, two terminal nodes.
pub fn hub_ending_graph() -> StoryGraph {
    StoryGraph::build(
        HUB_ENDING_GRAPH,
        "start",
        vec![
            StoryNode::new("start", "The Dog Waits")
                .with_line("\"The dog rises and looks from you to the far archway.\"")
                .with_line("Every door stands open behind you. Only one question is left.")
                .with_choice("Leave the hub", LEAVE_NODE)
                .with_choice("Return to the first door", RETURN_NODE),
            StoryNode::new(LEAVE_NODE, "The Archway")
                .with_line("You scratch the dog behind the ears one last time and step through."),
            StoryNode::new(RETURN_NODE, "The First Door")
                .with_line("You turn back to where it all began. The dog pads after you."),
        ],
    )
    .expect("built-in hub ending graph is structurally valid")
}

/// Map a terminal node of the ending graph to the ending it records.
pub fn ending_for_node(node: &NodeId) -> Option<Ending> {
    match node.as_str() {
        LEAVE_NODE => Some(Ending::LeaveHub),
        RETURN_NODE => Some(Ending::ReturnToFirstDoor),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ending_graph_is_valid_and_binary() {
        let graph = hub_ending_graph();
        assert_eq!(graph.id().as_str(), HUB_ENDING_GRAPH);
        assert_eq!(graph.start_node().choices.len(), 2);
    }

    #[test]
    fn test_terminal_nodes_map_to_endings() {
        assert_eq!(
            ending_for_node(&NodeId::new(LEAVE_NODE)),
            Some(Ending::LeaveHub)
        );
        assert_eq!(
            ending_for_node(&NodeId::new(RETURN_NODE)),
            Some(Ending::ReturnToFirstDoor)
        );
        assert_eq!(ending_for_node(&NodeId::new("start")), None);
    }
}
