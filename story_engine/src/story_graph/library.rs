//! The story library - every parsed graph, shared and immutable.

use game_state::FlagId;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use super::{parse_template, GraphId, NodeId, StoryGraph, StructuralError};

/// Errors while loading the story library from disk.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("story '{graph}' is structurally invalid: {source}")]
    Structural {
        graph: GraphId,
        #[source]
        source: StructuralError,
    },
}

/// All story graphs, keyed by name.
///
/// Graphs are parsed once, validated eagerly, and handed out as shared
/// `Arc`s so any number of sessions can traverse the same graph.
#[derive(Debug, Clone, Default)]
pub struct StoryLibrary {
    graphs: HashMap<GraphId, Arc<StoryGraph>>,
}

impl StoryLibrary {
    /// Create a new empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validated graph, replacing any previous one with the same id.
    /// Returns the shared handle.
    pub fn insert(&mut self, graph: StoryGraph) -> Arc<StoryGraph> {
        let id = graph.id().clone();
        let graph = Arc::new(graph);
        self.graphs.insert(id, graph.clone());
        graph
    }

    /// Get a shared handle to a graph.
    pub fn get(&self, id: &GraphId) -> Option<Arc<StoryGraph>> {
        self.graphs.get(id).cloned()
    }

    pub fn contains(&self, id: &GraphId) -> bool {
        self.graphs.contains_key(id)
    }

    /// Whether the named graph exists and contains the named node.
    pub fn contains_node(&self, graph: &GraphId, node: &NodeId) -> bool {
        self.graphs
            .get(graph)
            .map(|g| g.contains(node))
            .unwrap_or(false)
    }

    /// Every flag id any graph in the library can emit. Used by the save
    /// codec to validate persisted flags.
    pub fn known_flags(&self) -> HashSet<FlagId> {
        self.graphs
            .values()
            .flat_map(|graph| graph.nodes())
            .filter_map(|node| node.flag.clone())
            .collect()
    }

    /// Iterate over the graph ids in the library.
    pub fn ids(&self) -> impl Iterator<Item = &GraphId> {
        self.graphs.keys()
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Load every `.md` template in a directory. The file stem names the
    /// graph. Fails fast on the first structural defect so a broken
    /// template never reaches a player.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|source| LibraryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut library = Self::new();
        for entry in entries {
            let entry = entry.map_err(|source| LibraryError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("md") {
                continue;
            }
            let graph_id = match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(stem) => GraphId::new(stem),
                None => continue,
            };

            let text = std::fs::read_to_string(&path).map_err(|source| LibraryError::Io {
                path: path.clone(),
                source,
            })?;
            let graph = parse_template(graph_id.clone(), &text).map_err(|source| {
                LibraryError::Structural {
                    graph: graph_id,
                    source,
                }
            })?;
            library.insert(graph);
        }
        Ok(library)
    }
}
