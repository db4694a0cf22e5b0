//! LED button-panel memory game.
//!
//! A single game session is shared by the panel listener and the HTTP
//! handlers through `SessionCoordinator`. Each round lights a random
//! pattern, collects the player's presses, and asks a decision model
//! whether the next round should be harder, easier or the same.

pub mod cli;
pub mod coordinator;
pub mod decision;
pub mod error;
pub mod game;
pub mod hardware;
pub mod listener;
pub mod outcome_log;
pub mod server;
pub mod settings;

pub use coordinator::{CoordinatorConfig, DecisionInput, SessionCoordinator};
pub use error::{LedpanelError, Result};
