//! Node definitions - the tagged building block of every story graph.
//!
//! Entry, branch, and terminal nodes are one structure distinguished by
//! whether the choice list is empty, not a hierarchy of node kinds.

use game_state::{FlagId, ItemId};
use serde::{Deserialize, Serialize};

/// Unique identifier for story nodes within one graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Authored ids are restricted to `[A-Za-z0-9_]+`.
    pub fn is_valid(id: &str) -> bool {
        !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Unique identifier for story graphs (one per door, plus the hub ending).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(String);

impl GraphId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GraphId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A labelled edge to another node in the same graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Display label; matching against player input is case-sensitive and
    /// exact, any fuzzy matching happens before the engine is called.
    pub label: String,

    pub target: NodeId,
}

impl Choice {
    pub fn new(label: impl Into<String>, target: impl Into<NodeId>) -> Self {
        Self {
            label: label.into(),
            target: target.into(),
        }
    }
}

/// One node of a story graph.
///
/// A node with no choices is terminal and may carry a reward and/or a flag;
/// a branching node may carry neither. The graph validation pass enforces
/// this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryNode {
    pub id: NodeId,

    /// Heading title from the template.
    pub title: String,

    /// Prose lines in authored order.
    pub prose: Vec<String>,

    /// Outgoing choices in authored order. Empty means terminal.
    pub choices: Vec<Choice>,

    /// Item granted on arrival, terminal nodes only.
    pub reward: Option<ItemId>,

    /// Flag recorded on arrival, terminal nodes only.
    pub flag: Option<FlagId>,
}

impl StoryNode {
    /// Create a new empty node.
    pub fn new(id: impl Into<NodeId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            prose: Vec::new(),
            choices: Vec::new(),
            reward: None,
            flag: None,
        }
    }

    /// Append a prose line.
    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.prose.push(line.into());
        self
    }

    /// Append a choice.
    pub fn with_choice(mut self, label: impl Into<String>, target: impl Into<NodeId>) -> Self {
        self.choices.push(Choice::new(label, target));
        self
    }

    /// Set the reward annotation.
    pub fn with_reward(mut self, item: impl Into<ItemId>) -> Self {
        self.reward = Some(item.into());
        self
    }

    /// Set the flag annotation.
    pub fn with_flag(mut self, flag: impl Into<FlagId>) -> Self {
        self.flag = Some(flag.into());
        self
    }

    /// A node with no outgoing choices is terminal.
    pub fn is_terminal(&self) -> bool {
        self.choices.is_empty()
    }

    /// Choice labels in authored order.
    pub fn choice_labels(&self) -> Vec<&str> {
        self.choices.iter().map(|c| c.label.as_str()).collect()
    }

    /// Resolve a label to a choice. Case-sensitive exact match.
    pub fn find_choice(&self, label: &str) -> Option<&Choice> {
        self.choices.iter().find(|c| c.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_is_empty_choice_list() {
        let leaf = StoryNode::new("vows_leaf", "The Vows").with_reward("wedding_band");
        assert!(leaf.is_terminal());

        let branch = StoryNode::new("start", "The Chapel").with_choice("Sit down", "sit_branch");
        assert!(!branch.is_terminal());
    }

    #[test]
    fn test_find_choice_is_case_sensitive() {
        let node = StoryNode::new("start", "The Chapel")
            .with_choice("Sit with the man", "sit_branch")
            .with_choice("Leave quietly", "leave_leaf");

        assert!(node.find_choice("Sit with the man").is_some());
        assert!(node.find_choice("sit with the man").is_none());
        assert!(node.find_choice("Run away").is_none());
    }

    #[test]
    fn test_choice_labels_keep_authored_order() {
        let node = StoryNode::new("start", "The Chapel")
            .with_choice("Sit with the man", "sit_branch")
            .with_choice("Leave quietly", "leave_leaf");

        assert_eq!(node.choice_labels(), vec!["Sit with the man", "Leave quietly"]);
    }

    #[test]
    fn test_node_id_validity() {
        assert!(NodeId::is_valid("sit_branch"));
        assert!(NodeId::is_valid("node2"));
        assert!(!NodeId::is_valid(""));
        assert!(!NodeId::is_valid("bad id"));
        assert!(!NodeId::is_valid("bad-id"));
    }
}
