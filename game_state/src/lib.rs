//! # Game State (The Hub Ledger)
//!
//! The "player's bible" crate - items, doors, and the progression state for
//! the Three Doors adventure. This crate is the single source of truth for
//! what the player holds and which doors stand open; it carries no narrative
//! logic and never reads a story template.
//!
//! ## Core Components
//!
//! - **items**: The static item catalog and the inventory identifiers
//! - **doors**: Door definitions and the locked/unlocked/completed machine
//! - **progression**: The single mutable progression state and its transitions
//! - **config**: Game configuration loaded from TOML with defaults
//!
//! ## Design Philosophy
//!
//! - **One owner**: `ProgressionState` is an explicitly-owned value passed by
//!   reference to whoever needs it, never an ambient singleton
//! - **Events in, transitions out**: the state mutates only through named
//!   transitions fed by story completion events
//! - **Static data stays static**: items and door plans are immutable once
//!   defined

pub mod config;
pub mod doors;
pub mod items;
pub mod progression;

pub use config::*;
pub use doors::*;
pub use items::*;
pub use progression::*;
