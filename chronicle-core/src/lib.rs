//! Single-player tabletop RPG engine narrated by a language model.
//!
//! This crate provides:
//! - D&D 5e dice, ability and skill checks, and progression tables
//! - The character model and the reconciler that merges narrator updates
//! - Level-up and spell management
//! - Undo/redo history and local/remote persistence
//! - A Gemini-backed narrator behind the [`Narrator`] trait
//!
//! # Quick Start
//!
//! ```ignore
//! use chronicle_core::{GameSession, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::from_env();
//!     let store = config.file_store();
//!
//!     let mut session = GameSession::resume(config.narrator(), config.settings, &store).await?;
//!     session.begin_adventure().await?;
//!
//!     let outcome = session.send_action("I read the notice board").await?;
//!     println!("{}", outcome.narrative);
//!
//!     session.autosave(&store).await?;
//!     Ok(())
//! }
//! ```

pub mod campaign;
pub mod checks;
pub mod dice;
pub mod grimoire;
pub mod history;
pub mod narrator;
pub mod persist;
pub mod progression;
pub mod reconcile;
pub mod session;
pub mod spells;
pub mod tables;
pub mod testing;
pub mod world;

// Primary public API
pub use narrator::{ChatSettings, GeminiNarrator, Narrator, NarratorResponse, ResponseLength};
pub use persist::{FileStore, HttpBlobStore, PersistError, SavedGame};
pub use session::{GameSession, SessionConfig, SessionError, TurnOutcome};
pub use testing::{MockNarrator, TestHarness};
pub use world::{Ability, Character, ChatMessage, LocationState, Skill};
