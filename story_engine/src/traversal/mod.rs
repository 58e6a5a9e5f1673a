//! Room session - a deterministic cursor over one story graph.
//!
//! The session resolves player choices, yields node content, and reports
//! terminal completion events. It never mutates progression state; the hub
//! applies the events it reports.

use game_state::CompletionEvent;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::story_graph::{GraphId, NodeId, StoryGraph, StoryNode};

/// Recoverable traversal errors. The caller re-prompts; the cursor does
/// not move.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraversalError {
    #[error("'{label}' is not one of the current choices")]
    UnknownChoice { label: String },

    #[error("node '{node}' does not exist in story '{graph}'")]
    UnknownNode { graph: GraphId, node: NodeId },
}

/// The persistable position of a session: which graph, which node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCursor {
    pub graph: GraphId,
    pub node: NodeId,
}

/// A read-only view of the current node's display content.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeView<'a> {
    pub id: &'a NodeId,
    pub title: &'a str,
    pub prose: &'a [String],
    /// Choice labels in authored order; empty for terminal nodes.
    pub choices: Vec<&'a str>,
    pub is_terminal: bool,
}

impl<'a> NodeView<'a> {
    fn of(node: &'a StoryNode) -> Self {
        Self {
            id: &node.id,
            title: &node.title,
            prose: &node.prose,
            choices: node.choice_labels(),
            is_terminal: node.is_terminal(),
        }
    }
}

/// The result of one successful `choose` call.
#[derive(Debug)]
pub struct Step<'a> {
    /// The node the cursor arrived at.
    pub node: NodeView<'a>,

    /// Present exactly when the new node is terminal; carries the node's
    /// reward and flag, either of which may be absent.
    pub completion: Option<CompletionEvent>,
}

/// A runtime cursor over one shared, immutable story graph.
#[derive(Debug, Clone)]
pub struct RoomSession {
    graph: Arc<StoryGraph>,
    node: NodeId,
}

impl RoomSession {
    /// Open a fresh session at the graph's start node.
    pub fn open(graph: Arc<StoryGraph>) -> Self {
        let node = graph.start().clone();
        Self { graph, node }
    }

    /// Re-attach to a graph at a saved cursor position.
    pub fn resume(graph: Arc<StoryGraph>, cursor: &SessionCursor) -> Result<Self, TraversalError> {
        if !graph.contains(&cursor.node) {
            return Err(TraversalError::UnknownNode {
                graph: cursor.graph.clone(),
                node: cursor.node.clone(),
            });
        }
        Ok(Self {
            graph,
            node: cursor.node.clone(),
        })
    }

    pub fn graph_id(&self) -> &GraphId {
        self.graph.id()
    }

    /// The persistable position of this session.
    pub fn cursor(&self) -> SessionCursor {
        SessionCursor {
            graph: self.graph.id().clone(),
            node: self.node.clone(),
        }
    }

    /// The current node's display content and ordered choice labels.
    pub fn current(&self) -> NodeView<'_> {
        NodeView::of(self.current_node())
    }

    /// Resolve a choice label and advance the cursor.
    ///
    /// Matching is case-sensitive and exact; alias or fuzzy matching is the
    /// command layer's job. An unknown label is recoverable and leaves the
    /// cursor untouched.
    pub fn choose(&mut self, label: &str) -> Result<Step<'_>, TraversalError> {
        let target = self
            .current_node()
            .find_choice(label)
            .ok_or_else(|| TraversalError::UnknownChoice {
                label: label.to_string(),
            })?
            .target
            .clone();

        self.node = target;
        let node = self.current_node();
        let completion = node
            .is_terminal()
            .then(|| CompletionEvent::new(node.reward.clone(), node.flag.clone()));
        Ok(Step {
            node: NodeView::of(node),
            completion,
        })
    }

    fn current_node(&self) -> &StoryNode {
        // The cursor only ever holds the validated start node, a validated
        // choice target, or a resume-checked node id.
        self.graph
            .get(&self.node)
            .expect("session cursor points at a node of its validated graph")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story_graph::parse_template;
    use game_state::ItemId;

    fn chapel() -> Arc<StoryGraph> {
        Arc::new(
            parse_template(
                "chapel",
                "\
## The Chapel (start)
\"A small chapel, lit by a single candle.\"

Choices:
- [Sit with the man] -> sit_branch
- [Leave quietly] -> leave_leaf

## The Pew (sit_branch)
Choices:
- [Share vows] -> vows_leaf
- [Ask about the past] -> past_leaf

## The Vows (vows_leaf)
He presses a ring into your hand. (REWARD: wedding_band)

## The Past (past_leaf)
He says nothing more.

## The Threshold (leave_leaf)
You slip back out.
",
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_open_starts_at_the_start_node() {
        let session = RoomSession::open(chapel());
        let view = session.current();

        assert_eq!(view.id, &NodeId::new("start"));
        assert_eq!(view.choices, vec!["Sit with the man", "Leave quietly"]);
        assert!(!view.is_terminal);
    }

    #[test]
    fn test_two_step_walk_reports_reward_on_terminal() {
        let mut session = RoomSession::open(chapel());

        let step = session.choose("Sit with the man").unwrap();
        assert!(step.completion.is_none());
        assert_eq!(step.node.choices, vec!["Share vows", "Ask about the past"]);

        let step = session.choose("Share vows").unwrap();
        assert!(step.node.is_terminal);
        let completion = step.completion.unwrap();
        assert_eq!(completion.reward, Some(ItemId::new("wedding_band")));
        assert_eq!(completion.flag, None);
    }

    #[test]
    fn test_terminal_node_offers_no_choices() {
        let mut session = RoomSession::open(chapel());
        session.choose("Leave quietly").unwrap();

        let view = session.current();
        assert!(view.is_terminal);
        assert!(view.choices.is_empty());
    }

    #[test]
    fn test_terminal_without_annotations_still_reports_completion() {
        let mut session = RoomSession::open(chapel());
        session.choose("Sit with the man").unwrap();

        let step = session.choose("Ask about the past").unwrap();
        let completion = step.completion.unwrap();
        assert_eq!(completion, CompletionEvent::default());
    }

    #[test]
    fn test_unknown_choice_leaves_cursor_unchanged() {
        let mut session = RoomSession::open(chapel());

        let err = session.choose("nonexistent label").unwrap_err();
        assert_eq!(
            err,
            TraversalError::UnknownChoice {
                label: "nonexistent label".to_string()
            }
        );
        assert_eq!(session.cursor().node, NodeId::new("start"));

        // Case matters: the command layer handles aliasing, not the engine.
        assert!(session.choose("sit with the man").is_err());
    }

    #[test]
    fn test_cursor_round_trips_through_resume() {
        let graph = chapel();
        let mut session = RoomSession::open(graph.clone());
        session.choose("Sit with the man").unwrap();
        let cursor = session.cursor();

        let resumed = RoomSession::resume(graph.clone(), &cursor).unwrap();
        assert_eq!(resumed.cursor(), cursor);
        assert_eq!(resumed.current().id, &NodeId::new("sit_branch"));

        let bad = SessionCursor {
            graph: GraphId::new("chapel"),
            node: NodeId::new("no_such_node"),
        };
        assert!(matches!(
            RoomSession::resume(graph, &bad),
            Err(TraversalError::UnknownNode { .. })
        ));
    }
}
