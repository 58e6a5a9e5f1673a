//! The validated story graph and its structural invariants.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

use super::{Choice, GraphId, NodeId, StoryNode};

/// An authoring defect in a story template or graph.
///
/// Detected eagerly at story-load time and fatal to that graph: runtime
/// traversal never sees a structurally invalid graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("line {line}: malformed heading '{text}'")]
    MalformedHeading { line: usize, text: String },

    #[error("line {line}: invalid node id '{id}' (expected [A-Za-z0-9_]+)")]
    InvalidNodeId { line: usize, id: String },

    #[error("line {line}: duplicate node id '{id}'")]
    DuplicateNode { line: usize, id: String },

    #[error("line {line}: choice line found outside any node")]
    ChoiceOutsideNode { line: usize },

    #[error("line {line}: malformed choice line '{text}' (expected '- [Label] -> target_id')")]
    MalformedChoice { line: usize, text: String },

    #[error("line {line}: duplicate choice label '{label}' on node '{node}'")]
    DuplicateChoiceLabel {
        line: usize,
        node: NodeId,
        label: String,
    },

    #[error(
        "line {line}: reward/flag annotation on a choice line of node '{node}'; \
         annotations belong on terminal-node prose"
    )]
    AnnotationOnChoice { line: usize, node: NodeId },

    #[error("line {line}: malformed reward/flag annotation in '{text}'")]
    MalformedAnnotation { line: usize, text: String },

    #[error("line {line}: node '{node}' already carries a {kind} annotation")]
    DuplicateAnnotation {
        line: usize,
        node: NodeId,
        kind: &'static str,
    },

    #[error("graph '{graph}': template contains no nodes")]
    EmptyTemplate { graph: GraphId },

    #[error("graph '{graph}': node id '{id}' defined more than once")]
    RedefinedNode { graph: GraphId, id: NodeId },

    #[error("graph '{graph}': start node '{start}' does not exist")]
    MissingStart { graph: GraphId, start: NodeId },

    #[error("graph '{graph}': choice '{label}' on node '{node}' targets unknown node '{target}'")]
    DanglingTarget {
        graph: GraphId,
        node: NodeId,
        label: String,
        target: NodeId,
    },

    #[error("graph '{graph}': node '{node}' carries a reward or flag but is not terminal")]
    AnnotationOnBranch { graph: GraphId, node: NodeId },

    #[error("graph '{graph}': node '{node}' is unreachable from '{start}'")]
    OrphanNode {
        graph: GraphId,
        node: NodeId,
        start: NodeId,
    },

    #[error("graph '{graph}': no terminal node is reachable from '{start}'")]
    NoTerminal { graph: GraphId, start: NodeId },
}

/// A validated, immutable story graph.
///
/// Construction goes through [`StoryGraph::build`], which runs the full
/// structural post-pass; a value of this type always satisfies the graph
/// invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryGraph {
    id: GraphId,

    /// Short external-facing blurb lifted from the start node's first
    /// quoted line, when the template has one.
    description: Option<String>,

    start: NodeId,

    nodes: HashMap<NodeId, StoryNode>,
}

impl StoryGraph {
    /// Build a graph from nodes and validate every structural invariant.
    pub fn build(
        id: impl Into<GraphId>,
        start: impl Into<NodeId>,
        nodes: Vec<StoryNode>,
    ) -> Result<Self, StructuralError> {
        let id = id.into();
        let start = start.into();

        if nodes.is_empty() {
            return Err(StructuralError::EmptyTemplate { graph: id });
        }

        let mut map: HashMap<NodeId, StoryNode> = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if map.contains_key(&node.id) {
                return Err(StructuralError::RedefinedNode {
                    graph: id,
                    id: node.id,
                });
            }
            map.insert(node.id.clone(), node);
        }
        let nodes = map;

        let graph = Self {
            id,
            description: None,
            start,
            nodes,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Attach the lifted description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> &GraphId {
        &self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn start(&self) -> &NodeId {
        &self.start
    }

    /// The start node itself.
    pub fn start_node(&self) -> &StoryNode {
        // Invariant upheld by `build`: the start node exists.
        &self.nodes[&self.start]
    }

    /// Look up a node by id.
    pub fn get(&self, id: &NodeId) -> Option<&StoryNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Iterate over all nodes (no particular order).
    pub fn nodes(&self) -> impl Iterator<Item = &StoryNode> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Run the structural post-pass: start exists, no dangling targets, no
    /// annotation on a branching node, everything reachable, at least one
    /// reachable terminal. Cycles are permitted.
    fn validate(&self) -> Result<(), StructuralError> {
        if !self.nodes.contains_key(&self.start) {
            return Err(StructuralError::MissingStart {
                graph: self.id.clone(),
                start: self.start.clone(),
            });
        }

        for node in self.nodes.values() {
            for Choice { label, target } in &node.choices {
                if !self.nodes.contains_key(target) {
                    return Err(StructuralError::DanglingTarget {
                        graph: self.id.clone(),
                        node: node.id.clone(),
                        label: label.clone(),
                        target: target.clone(),
                    });
                }
            }
            if !node.is_terminal() && (node.reward.is_some() || node.flag.is_some()) {
                return Err(StructuralError::AnnotationOnBranch {
                    graph: self.id.clone(),
                    node: node.id.clone(),
                });
            }
        }

        // Breadth-first reachability from the start node.
        let mut reached: HashSet<&NodeId> = HashSet::new();
        let mut queue: VecDeque<&NodeId> = VecDeque::new();
        reached.insert(&self.start);
        queue.push_back(&self.start);
        let mut terminal_reached = false;

        while let Some(id) = queue.pop_front() {
            // Targets were checked above, the lookup cannot miss.
            let node = &self.nodes[id];
            if node.is_terminal() {
                terminal_reached = true;
            }
            for choice in &node.choices {
                if reached.insert(&choice.target) {
                    queue.push_back(&choice.target);
                }
            }
        }

        if let Some(orphan) = self.nodes.keys().find(|id| !reached.contains(id)) {
            return Err(StructuralError::OrphanNode {
                graph: self.id.clone(),
                node: orphan.clone(),
                start: self.start.clone(),
            });
        }
        if !terminal_reached {
            return Err(StructuralError::NoTerminal {
                graph: self.id.clone(),
                start: self.start.clone(),
            });
        }
        Ok(())
    }
}
