//! Story graph module - authored templates turned into validated graphs.
//!
//! A story graph consists of:
//! - **Nodes**: prose plus an ordered choice list; no choices means terminal
//! - **Choices**: labelled edges to other nodes in the same graph
//! - **Annotations**: at most one reward and one flag, on terminal nodes only

mod graph;
mod library;
mod node;
mod parser;

pub use graph::*;
pub use library::*;
pub use node::*;
pub use parser::*;
