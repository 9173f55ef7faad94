//! The narrator: the language model acting as dungeon master.
//!
//! The session talks to a [`Narrator`] and never to the model directly.
//! Implementations own their conversational context and must rebuild it
//! from the request's history after [`Narrator::reset_session`].

mod gemini_narrator;
pub mod prompt;
mod response;

pub use gemini_narrator::GeminiNarrator;
pub use response::{CharacterUpdate, CompanionGrant, ItemGrant, LocationUpdate, NarratorResponse};

use crate::world::{Character, ChatMessage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from a narrator call. The session turns all of these except a
/// missing credential into the fallback turn.
#[derive(Debug, Error)]
pub enum NarratorError {
    #[error("No API key configured")]
    MissingCredential,

    #[error("Gemini API error: {0}")]
    Api(#[from] gemini::Error),

    #[error("Narrator returned an unreadable response: {0}")]
    InvalidResponse(String),
}

// ============================================================================
// Settings
// ============================================================================

/// How long narration should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseLength {
    Short,
    #[default]
    Normal,
    Long,
}

impl ResponseLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseLength::Short => "short",
            ResponseLength::Normal => "normal",
            ResponseLength::Long => "long",
        }
    }
}

impl fmt::Display for ResponseLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResponseLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" => Ok(ResponseLength::Short),
            "normal" => Ok(ResponseLength::Normal),
            "long" => Ok(ResponseLength::Long),
            other => Err(format!("unknown response length: {other}")),
        }
    }
}

/// Player-adjustable narration settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSettings {
    pub response_length: ResponseLength,
}

impl ChatSettings {
    /// Stable string identifying these settings; a change invalidates the
    /// conversational session.
    pub fn fingerprint(&self) -> String {
        format!("responseLength={}", self.response_length)
    }
}

// ============================================================================
// Requests
// ============================================================================

/// The slice of the character sheet the narrator sees each turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterSummary {
    pub hp: u32,
    pub max_hp: u32,
    pub gold: u64,
    pub level: u8,
    pub xp: u32,
    pub companions: Vec<String>,
    pub spell_slots: BTreeMap<u8, u32>,
}

impl From<&Character> for CharacterSummary {
    fn from(character: &Character) -> Self {
        Self {
            hp: character.hp,
            max_hp: character.max_hp,
            gold: character.gold,
            level: character.level,
            xp: character.xp,
            companions: character.companions.iter().map(|c| c.name.clone()).collect(),
            spell_slots: character.spell_slots.current.clone(),
        }
    }
}

/// Everything a narrator needs for one turn.
#[derive(Debug, Clone)]
pub struct NarrationRequest {
    pub action: String,
    pub summary: CharacterSummary,
    /// The committed chat log before this action, used to rebuild the
    /// conversational context.
    pub history: Vec<ChatMessage>,
    pub settings: ChatSettings,
}

// ============================================================================
// Narrator
// ============================================================================

/// A dungeon master that answers player actions with structured turns.
#[async_trait]
pub trait Narrator: Send {
    /// Narrate the outcome of an action.
    async fn narrate(&mut self, request: &NarrationRequest) -> Result<NarratorResponse, NarratorError>;

    /// Forget the conversational context; the next turn rebuilds it from
    /// the request history.
    fn reset_session(&mut self);

    /// Replace the credential. `None` or blank removes it.
    fn set_api_key(&mut self, api_key: Option<String>);

    /// Whether a turn can be sent at all.
    fn has_credential(&self) -> bool;
}
