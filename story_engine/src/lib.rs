//! # Story Engine (The Narrator)
//!
//! The narrative half of Three Doors. This crate interfaces with
//! `game_state`, turns authored markdown templates into validated story
//! graphs, and walks them one player choice at a time.
//!
//! ## Core Components
//!
//! - **story_graph**: Template parsing, the validated graph, and the library
//!   of shared immutable graphs
//! - **traversal**: The room session - a cursor over one graph that reports
//!   completion events but never touches progression state
//! - **persistence**: The save/load codec with all-or-nothing restore
//! - **hub**: The orchestrator tying doors, sessions, and progression together
//!
//! ## Design Philosophy
//!
//! - **Eager validation**: structural defects surface at story-load time, so
//!   runtime traversal never sees an invalid graph
//! - **Events, not side effects**: sessions report terminal rewards/flags as
//!   values; only the hub applies them to the progression state
//! - **Immutable stories**: graphs are parsed once and shared; saves carry
//!   only progression plus a cursor, never derived data

pub mod hub;
pub mod persistence;
pub mod story_graph;
pub mod traversal;

pub use hub::*;
pub use persistence::*;
pub use story_graph::*;
pub use traversal::*;
