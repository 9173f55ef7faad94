//! Testing utilities for the game.
//!
//! This module provides tools for integration testing:
//! - `MockNarrator` for deterministic turns without API calls
//! - `TestHarness` for scripted game scenarios
//! - Fixtures for common narrator replies

use crate::narrator::{
    CharacterUpdate, ChatSettings, CompanionGrant, ItemGrant, NarrationRequest, Narrator,
    NarratorError, NarratorResponse,
};
use crate::session::{GameSession, SessionError, TurnOutcome};
use crate::world::Character;
use async_trait::async_trait;
use std::collections::VecDeque;

const DEFAULT_SUGGESTIONS: [&str; 3] = ["Look around", "Talk to someone", "Move on"];

/// A scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Respond(NarratorResponse),
    /// Fail the call with this message.
    Fail(String),
}

/// A narrator that returns scripted replies in order.
///
/// Every request is recorded, as is every session reset.
#[derive(Debug)]
pub struct MockNarrator {
    replies: VecDeque<MockReply>,
    requests: Vec<NarrationRequest>,
    resets: usize,
    credential: bool,
}

impl Default for MockNarrator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNarrator {
    /// A narrator with a credential and no scripted replies.
    pub fn new() -> Self {
        Self {
            replies: VecDeque::new(),
            requests: Vec::new(),
            resets: 0,
            credential: true,
        }
    }

    pub fn without_credential() -> Self {
        Self {
            credential: false,
            ..Self::new()
        }
    }

    pub fn push(&mut self, response: NarratorResponse) -> &mut Self {
        self.replies.push_back(MockReply::Respond(response));
        self
    }

    pub fn push_narrative(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(NarratorResponse::narrative(text).with_suggestions(DEFAULT_SUGGESTIONS))
    }

    pub fn push_failure(&mut self, message: impl Into<String>) -> &mut Self {
        self.replies.push_back(MockReply::Fail(message.into()));
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> &[NarrationRequest] {
        &self.requests
    }

    pub fn calls(&self) -> usize {
        self.requests.len()
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    pub fn remaining(&self) -> usize {
        self.replies.len()
    }
}

#[async_trait]
impl Narrator for MockNarrator {
    async fn narrate(&mut self, request: &NarrationRequest) -> Result<NarratorResponse, NarratorError> {
        self.requests.push(request.clone());
        match self.replies.pop_front() {
            Some(MockReply::Respond(response)) => Ok(response),
            Some(MockReply::Fail(message)) => Err(NarratorError::InvalidResponse(message)),
            None => Ok(NarratorResponse::narrative("The narrator has no more scripted replies.")
                .with_suggestions(DEFAULT_SUGGESTIONS)),
        }
    }

    fn reset_session(&mut self) {
        self.resets += 1;
    }

    fn set_api_key(&mut self, api_key: Option<String>) {
        self.credential = api_key.is_some_and(|k| !k.trim().is_empty());
    }

    fn has_credential(&self) -> bool {
        self.credential
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A reply that only changes hit points.
pub fn hp_change(text: &str, delta: i64) -> NarratorResponse {
    NarratorResponse::narrative(text)
        .with_suggestions(DEFAULT_SUGGESTIONS)
        .with_character(CharacterUpdate {
            hp_change: Some(delta),
            ..CharacterUpdate::default()
        })
}

/// A reply that awards experience.
pub fn xp_award(text: &str, xp: i64) -> NarratorResponse {
    NarratorResponse::narrative(text)
        .with_suggestions(DEFAULT_SUGGESTIONS)
        .with_character(CharacterUpdate {
            xp_awarded: Some(xp),
            ..CharacterUpdate::default()
        })
}

/// A reply that hands over items.
pub fn item_grant(text: &str, items: &[(&str, i64)]) -> NarratorResponse {
    NarratorResponse::narrative(text)
        .with_suggestions(DEFAULT_SUGGESTIONS)
        .with_character(CharacterUpdate {
            items_added: items
                .iter()
                .map(|(name, quantity)| ItemGrant {
                    name: name.to_string(),
                    quantity: Some(*quantity),
                    description: None,
                })
                .collect(),
            ..CharacterUpdate::default()
        })
}

/// A reply in which a companion joins the party.
pub fn companion_joins(text: &str, name: &str, hp: i64) -> NarratorResponse {
    NarratorResponse::narrative(text)
        .with_suggestions(DEFAULT_SUGGESTIONS)
        .with_character(CharacterUpdate {
            companions_added: vec![CompanionGrant {
                name: name.to_string(),
                kind: "Ally".to_string(),
                description: String::new(),
                hp: Some(hp),
                max_hp: Some(hp),
            }],
            ..CharacterUpdate::default()
        })
}

// ============================================================================
// Harness
// ============================================================================

/// Test harness for running game scenarios against a mock narrator.
pub struct TestHarness {
    pub session: GameSession<MockNarrator>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// A harness with the default campaign character.
    pub fn new() -> Self {
        Self {
            session: GameSession::new(MockNarrator::new(), ChatSettings::default()),
        }
    }

    /// A harness with a custom character.
    pub fn with_character(character: Character) -> Self {
        Self {
            session: GameSession::new(MockNarrator::new(), ChatSettings::default())
                .with_character(character),
        }
    }

    /// Queue a narrative reply.
    pub fn expect_narrative(&mut self, text: impl Into<String>) -> &mut Self {
        self.session.narrator_mut().push_narrative(text);
        self
    }

    /// Queue a full reply.
    pub fn expect_response(&mut self, response: NarratorResponse) -> &mut Self {
        self.session.narrator_mut().push(response);
        self
    }

    /// Queue a failed call.
    pub fn expect_failure(&mut self) -> &mut Self {
        self.session.narrator_mut().push_failure("scripted failure");
        self
    }

    /// Send player input and get the outcome.
    pub async fn input(&mut self, text: &str) -> Result<TurnOutcome, SessionError> {
        self.session.send_action(text).await
    }

    /// Current player HP as (current, max).
    pub fn player_hp(&self) -> (u32, u32) {
        let character = self.session.character();
        (character.hp, character.max_hp)
    }

    pub fn slots_remaining(&self, level: u8) -> u32 {
        self.session.character().spell_slots.remaining(level)
    }

    pub fn has_item(&self, name: &str) -> bool {
        self.session
            .character()
            .inventory
            .iter()
            .any(|i| i.name == name)
    }

    pub fn item_quantity(&self, name: &str) -> u32 {
        self.session
            .character()
            .inventory
            .iter()
            .find(|i| i.name == name)
            .map_or(0, |i| i.quantity)
    }

    pub fn has_companion(&self, name: &str) -> bool {
        self.session
            .character()
            .companions
            .iter()
            .any(|c| c.name == name)
    }

    /// Text of the last message in the chat log.
    pub fn last_message(&self) -> Option<&str> {
        self.session.messages().last().map(|m| m.text.as_str())
    }
}
