//! GameSession - the primary public API for playing.
//!
//! The session owns the live game state, the undo history and the narrator.
//! Every player-facing action that needs narration goes through one turn
//! pipeline: [`GameSession::begin_turn`] builds the request without touching
//! state, the narrator is awaited, and [`GameSession::complete_turn`]
//! reconciles the reply (or the fallback) and commits a snapshot.

use crate::campaign::{default_character, default_location, OPENING_ACTION};
use crate::checks::{ability_check, skill_check, CheckResult};
use crate::dice::{DiceError, DieRoll, DieType};
use crate::grimoire::{self, GrimoireError};
use crate::history::{History, HistoryEntry};
use crate::narrator::{
    ChatSettings, GeminiNarrator, NarrationRequest, Narrator, NarratorError, NarratorResponse,
    ResponseLength,
};
use crate::persist::{
    load_remote, save_remote, FileStore, HttpBlobStore, PersistError, RemoteStore, SavedGame,
    SnapshotStore, AUTOSAVE_KEY,
};
use crate::progression::{level_up_message, LevelUp, LevelUpDraft, ProgressionError};
use crate::reconcile::reconcile;
use crate::world::{Ability, Character, ChatMessage, LocationState, Skill};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from GameSession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Grimoire(#[from] GrimoireError),

    #[error(transparent)]
    Progression(#[from] ProgressionError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Dice(#[from] DiceError),

    #[error("No API key configured - set GEMINI_API_KEY environment variable")]
    MissingCredential,

    #[error("Finish the pending level-up first")]
    LevelUpPending,

    #[error("No level-up is pending")]
    NoLevelUpPending,

    #[error("Action cannot be empty")]
    EmptyAction,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for creating a game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Gemini API key. Turns are refused without one.
    pub api_key: Option<String>,

    /// Gemini model; `None` uses the narrator's default.
    pub model: Option<String>,

    pub settings: ChatSettings,

    /// Directory for local snapshots.
    pub save_dir: PathBuf,

    /// Endpoint accepting `{filename, content}` uploads.
    pub blob_upload_url: Option<String>,

    /// Public base URL transcripts are downloaded from.
    pub blob_base_url: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            api_key: None,
            model: None,
            settings: ChatSettings::default(),
            save_dir: PathBuf::from("saves"),
            blob_upload_url: None,
            blob_base_url: None,
        }
    }

    /// Read `GEMINI_API_KEY`, `CHRONICLE_MODEL`, `CHRONICLE_RESPONSE_LENGTH`,
    /// `CHRONICLE_SAVE_DIR`, `CHRONICLE_BLOB_UPLOAD_URL` and
    /// `CHRONICLE_BLOB_BASE_URL`.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let mut config = Self::new();
        config.api_key = var("GEMINI_API_KEY");
        config.model = var("CHRONICLE_MODEL");
        if let Some(length) = var("CHRONICLE_RESPONSE_LENGTH") {
            match length.parse::<ResponseLength>() {
                Ok(length) => config.settings.response_length = length,
                Err(e) => tracing::warn!(error = %e, "ignoring CHRONICLE_RESPONSE_LENGTH"),
            }
        }
        if let Some(dir) = var("CHRONICLE_SAVE_DIR") {
            config.save_dir = PathBuf::from(dir);
        }
        config.blob_upload_url = var("CHRONICLE_BLOB_UPLOAD_URL");
        config.blob_base_url = var("CHRONICLE_BLOB_BASE_URL");
        config
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_response_length(mut self, length: ResponseLength) -> Self {
        self.settings.response_length = length;
        self
    }

    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }

    pub fn with_blob_store(
        mut self,
        upload_url: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        self.blob_upload_url = Some(upload_url.into());
        self.blob_base_url = Some(base_url.into());
        self
    }

    /// A Gemini narrator for this configuration.
    pub fn narrator(&self) -> GeminiNarrator {
        let narrator = GeminiNarrator::new(self.api_key.clone());
        match &self.model {
            Some(model) => narrator.with_model(model.clone()),
            None => narrator,
        }
    }

    pub fn file_store(&self) -> FileStore {
        FileStore::new(self.save_dir.clone())
    }

    /// The remote store, if both URLs are configured.
    pub fn remote_store(&self) -> Option<HttpBlobStore> {
        match (&self.blob_upload_url, &self.blob_base_url) {
            (Some(upload), Some(base)) => Some(HttpBlobStore::new(upload.clone(), base.clone())),
            _ => None,
        }
    }
}

// ============================================================================
// Turns
// ============================================================================

/// A turn that has been prepared but not yet committed.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    /// The chat log as it will read once the narration is appended.
    messages: Vec<ChatMessage>,
    request: NarrationRequest,
}

impl PendingTurn {
    pub fn request(&self) -> &NarrationRequest {
        &self.request
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

/// What a committed turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub narrative: String,
    pub suggested_actions: Vec<String>,
    /// The narrator failed and the fallback turn was committed.
    pub fallback: bool,
    /// `(from, to)` when the turn crossed a level threshold.
    pub level_up: Option<(u8, u8)>,
}

// ============================================================================
// Session
// ============================================================================

/// A single-player game.
pub struct GameSession<N: Narrator> {
    narrator: N,
    settings: ChatSettings,
    character: Character,
    location: LocationState,
    messages: Vec<ChatMessage>,
    suggested_actions: Vec<String>,
    history: History,
    level_up: Option<LevelUpDraft>,
}

impl<N: Narrator> GameSession<N> {
    /// A fresh game with the default campaign and no messages.
    pub fn new(narrator: N, settings: ChatSettings) -> Self {
        Self {
            narrator,
            settings,
            character: default_character(),
            location: default_location(),
            messages: Vec::new(),
            suggested_actions: Vec::new(),
            history: History::new(),
            level_up: None,
        }
    }

    /// Replace the starting character. Only meaningful before the first turn.
    pub fn with_character(mut self, character: Character) -> Self {
        self.character = character;
        self
    }

    /// Restore the autosave if there is one, otherwise start fresh.
    ///
    /// A corrupt autosave is logged and ignored.
    pub async fn resume(
        narrator: N,
        settings: ChatSettings,
        store: &dyn SnapshotStore,
    ) -> Result<Self, SessionError> {
        let mut session = Self::new(narrator, settings);
        match store.load(AUTOSAVE_KEY).await {
            Ok(saved) => {
                tracing::info!(messages = saved.messages.len(), "restored autosave");
                session.restore(saved);
            }
            Err(PersistError::NotFound(_)) => {
                tracing::info!("no autosave, starting a new game");
            }
            Err(PersistError::Corrupt(reason)) => {
                tracing::warn!(%reason, "autosave is corrupt, starting a new game");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(session)
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn character(&self) -> &Character {
        &self.character
    }

    pub fn location(&self) -> &LocationState {
        &self.location
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn suggested_actions(&self) -> &[String] {
        &self.suggested_actions
    }

    pub fn settings(&self) -> ChatSettings {
        self.settings
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn narrator(&self) -> &N {
        &self.narrator
    }

    pub fn narrator_mut(&mut self) -> &mut N {
        &mut self.narrator
    }

    pub fn can_undo(&self) -> bool {
        self.level_up.is_none() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.level_up.is_none() && self.history.can_redo()
    }

    // ------------------------------------------------------------------------
    // Turn pipeline
    // ------------------------------------------------------------------------

    fn ensure_ready(&self) -> Result<(), SessionError> {
        if self.level_up.is_some() {
            return Err(SessionError::LevelUpPending);
        }
        if !self.narrator.has_credential() {
            return Err(SessionError::MissingCredential);
        }
        Ok(())
    }

    /// Prepare a turn without changing any state.
    ///
    /// With `show_action` unset the action is sent to the narrator but not
    /// added to the chat log.
    pub fn begin_turn(&self, action: &str, show_action: bool) -> Result<PendingTurn, SessionError> {
        let action = action.trim();
        if action.is_empty() {
            return Err(SessionError::EmptyAction);
        }
        self.ensure_ready()?;

        let mut messages = self.messages.clone();
        if show_action {
            messages.push(ChatMessage::user(action));
        }
        Ok(PendingTurn {
            messages,
            request: NarrationRequest {
                action: action.to_string(),
                summary: (&self.character).into(),
                history: self.messages.clone(),
                settings: self.settings,
            },
        })
    }

    /// Reconcile the narrator's reply and commit the turn. A failed call
    /// commits the fallback turn instead.
    pub fn complete_turn(
        &mut self,
        pending: PendingTurn,
        result: Result<NarratorResponse, NarratorError>,
    ) -> TurnOutcome {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "narrator failed, committing fallback turn");
                NarratorResponse::fallback()
            }
        };
        let fallback = response.is_fallback();

        let result = reconcile(&response, &self.character, &self.location, &pending.messages);
        self.character = result.character;
        self.location = result.location;
        self.messages = result.messages;
        self.suggested_actions = result.suggested_actions;

        let level_up = result.level_up.map(|up| {
            let levels = (up.from_level, up.to_level);
            self.level_up = Some(up.draft());
            levels
        });

        self.commit_snapshot();
        tracing::debug!(messages = self.messages.len(), fallback, "turn committed");

        TurnOutcome {
            narrative: response.narrative,
            suggested_actions: self.suggested_actions.clone(),
            fallback,
            level_up,
        }
    }

    fn commit_snapshot(&mut self) {
        self.history.commit(HistoryEntry {
            character: self.character.clone(),
            location: self.location.clone(),
            messages: self.messages.clone(),
            suggested_actions: self.suggested_actions.clone(),
            level_up: self.level_up.as_ref().map(|draft| draft.level_up().clone()),
        });
    }

    async fn run_turn(&mut self, action: &str, show_action: bool) -> Result<TurnOutcome, SessionError> {
        let pending = self.begin_turn(action, show_action)?;
        let result = self.narrator.narrate(pending.request()).await;
        Ok(self.complete_turn(pending, result))
    }

    /// Send a player action through the narrator.
    pub async fn send_action(&mut self, action: &str) -> Result<TurnOutcome, SessionError> {
        self.run_turn(action, true).await
    }

    /// Narrate the opening scene if the game has no messages yet.
    pub async fn begin_adventure(&mut self) -> Result<Option<TurnOutcome>, SessionError> {
        if !self.messages.is_empty() {
            return Ok(None);
        }
        tracing::info!("starting the adventure");
        self.run_turn(OPENING_ACTION, false).await.map(Some)
    }

    // ------------------------------------------------------------------------
    // Spells, rest and dice
    // ------------------------------------------------------------------------

    /// Cast the known spell at `index` and narrate it.
    pub async fn cast_spell(&mut self, index: usize) -> Result<TurnOutcome, SessionError> {
        self.ensure_ready()?;
        let action = grimoire::cast_spell(&mut self.character, index)?;
        self.send_action(&action).await
    }

    /// Take a long rest and narrate it.
    pub async fn rest(&mut self) -> Result<TurnOutcome, SessionError> {
        self.ensure_ready()?;
        let action = grimoire::long_rest(&mut self.character);
        self.send_action(action).await
    }

    /// Learn a library spell. Not narrated.
    pub fn learn_spell(&mut self, name: &str) -> Result<(), SessionError> {
        if self.level_up.is_some() {
            return Err(SessionError::LevelUpPending);
        }
        grimoire::learn_from_library(&mut self.character, name)?;
        self.commit_snapshot();
        Ok(())
    }

    /// Forget the known spell at `index`. Not narrated.
    pub fn forget_spell(&mut self, index: usize, confirmed: bool) -> Result<String, SessionError> {
        if self.level_up.is_some() {
            return Err(SessionError::LevelUpPending);
        }
        let spell = grimoire::forget_spell(&mut self.character, index, confirmed)?;
        self.commit_snapshot();
        Ok(spell.name)
    }

    /// Roll a die given as `d20` or `20` and narrate the result.
    pub async fn roll_die(&mut self, notation: &str) -> Result<TurnOutcome, SessionError> {
        let die = DieType::parse(notation)?;
        self.ensure_ready()?;
        let roll = DieRoll::roll(die);
        self.send_roll(&roll).await
    }

    /// Narrate an already rolled die.
    pub async fn send_roll(&mut self, roll: &DieRoll) -> Result<TurnOutcome, SessionError> {
        self.send_action(&format!("[Dice Roll] {}", roll.describe())).await
    }

    /// Roll a raw ability check and narrate it.
    pub async fn ability_check(&mut self, ability: Ability) -> Result<TurnOutcome, SessionError> {
        self.ensure_ready()?;
        let result = ability_check(ability, self.character.abilities.get(ability));
        self.send_check(&result).await
    }

    /// Roll a skill check and narrate it.
    pub async fn skill_check(&mut self, skill: Skill) -> Result<TurnOutcome, SessionError> {
        self.ensure_ready()?;
        let score = self.character.abilities.get(skill.ability());
        let result = skill_check(skill, score, self.character.level);
        self.send_check(&result).await
    }

    /// Narrate an already resolved check.
    pub async fn send_check(&mut self, result: &CheckResult) -> Result<TurnOutcome, SessionError> {
        self.send_action(&result.describe()).await
    }

    // ------------------------------------------------------------------------
    // Level-up
    // ------------------------------------------------------------------------

    pub fn level_up_pending(&self) -> bool {
        self.level_up.is_some()
    }

    pub fn level_up_draft(&self) -> Option<&LevelUpDraft> {
        self.level_up.as_ref()
    }

    pub fn level_up_draft_mut(&mut self) -> Option<&mut LevelUpDraft> {
        self.level_up.as_mut()
    }

    /// Apply the pending level-up and narrate a `[SYSTEM]` summary.
    pub async fn confirm_level_up(&mut self) -> Result<TurnOutcome, SessionError> {
        if self.level_up.is_none() {
            return Err(SessionError::NoLevelUpPending);
        }
        if !self.narrator.has_credential() {
            return Err(SessionError::MissingCredential);
        }
        let draft = self.level_up.take().ok_or(SessionError::NoLevelUpPending)?;
        self.character = draft.finish();
        let action = level_up_message(&self.character);
        self.send_action(&action).await
    }

    // ------------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------------

    fn apply_entry(&mut self, entry: HistoryEntry) {
        self.character = entry.character;
        self.location = entry.location;
        self.messages = entry.messages;
        self.suggested_actions = entry.suggested_actions;
        self.level_up = entry.level_up.map(|up| up.draft());
        self.narrator.reset_session();
    }

    pub fn undo(&mut self) -> Result<(), SessionError> {
        if self.level_up.is_some() {
            return Err(SessionError::LevelUpPending);
        }
        let entry = self.history.undo().cloned().ok_or(SessionError::NothingToUndo)?;
        tracing::info!(index = self.history.index(), "undo");
        self.apply_entry(entry);
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), SessionError> {
        if self.level_up.is_some() {
            return Err(SessionError::LevelUpPending);
        }
        let entry = self.history.redo().cloned().ok_or(SessionError::NothingToRedo)?;
        tracing::info!(index = self.history.index(), "redo");
        self.apply_entry(entry);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    pub fn set_settings(&mut self, settings: ChatSettings) {
        if settings != self.settings {
            tracing::info!(response_length = %settings.response_length, "settings changed");
            self.settings = settings;
            self.narrator.reset_session();
        }
    }

    pub fn set_api_key(&mut self, api_key: Option<String>) {
        self.narrator.set_api_key(api_key);
        self.narrator.reset_session();
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    pub fn to_saved(&self) -> SavedGame {
        SavedGame {
            character: self.character.clone(),
            location: self.location.clone(),
            messages: self.messages.clone(),
            history: self.history.entries().to_vec(),
            history_index: self.history.index(),
            suggested_actions: self.suggested_actions.clone(),
        }
    }

    /// Replace the whole game with a saved one and invalidate the narrator
    /// session. A level-up pending at the saved snapshot is reopened.
    pub fn restore(&mut self, saved: SavedGame) {
        self.character = saved.character;
        self.location = saved.location;
        self.messages = saved.messages;
        self.suggested_actions = saved.suggested_actions;
        self.history = History::from_saved(saved.history, saved.history_index);
        self.level_up = None;
        if self.history.is_empty() {
            self.commit_snapshot();
        }
        self.level_up = self
            .history
            .current()
            .and_then(|entry| entry.level_up.as_ref())
            .map(LevelUp::draft);
        self.narrator.reset_session();
    }

    pub async fn save_local(&self, store: &dyn SnapshotStore, key: &str) -> Result<(), SessionError> {
        store.save(key, &self.to_saved()).await?;
        tracing::info!(key, "game saved");
        Ok(())
    }

    pub async fn autosave(&self, store: &dyn SnapshotStore) -> Result<(), SessionError> {
        store.save(AUTOSAVE_KEY, &self.to_saved()).await?;
        Ok(())
    }

    pub async fn load_local(&mut self, store: &dyn SnapshotStore, key: &str) -> Result<(), SessionError> {
        let saved = store.load(key).await?;
        self.restore(saved);
        tracing::info!(key, "game loaded");
        Ok(())
    }

    /// Upload the game as a transcript. Returns the normalized session code.
    pub async fn upload(&self, store: &dyn RemoteStore, code: &str) -> Result<String, SessionError> {
        Ok(save_remote(store, code, &self.to_saved()).await?)
    }

    pub async fn download(&mut self, store: &dyn RemoteStore, code: &str) -> Result<(), SessionError> {
        let saved = load_remote(store, code).await?;
        self.restore(saved);
        Ok(())
    }
}
