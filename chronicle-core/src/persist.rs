//! Saving and loading games.
//!
//! Two stores share one [`SavedGame`] payload:
//! - a local snapshot store keyed by name (JSON files, or memory in tests);
//! - a remote session store holding a Markdown transcript with the JSON
//!   payload hidden in an HTML comment, addressed by a player-chosen code.

use crate::campaign::{CAMPAIGN_TITLE, NARRATOR_LABEL, PLAYER_LABEL};
use crate::history::HistoryEntry;
use crate::world::{Character, ChatMessage, LocationState, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

/// Key the session autosaves under.
pub const AUTOSAVE_KEY: &str = "chronicle_autosave";

const DATA_BLOCK_START: &str = "DATA_BLOCK_START";
const DATA_BLOCK_END: &str = "DATA_BLOCK_END";

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No saved game found for {0}")]
    NotFound(String),

    #[error("Saved game is corrupt: {0}")]
    Corrupt(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Save names and session codes may only contain letters, digits, '-' and '_'")]
    InvalidSessionCode,
}

impl From<reqwest::Error> for PersistError {
    fn from(err: reqwest::Error) -> Self {
        PersistError::Transport(err.to_string())
    }
}

// ============================================================================
// Payload
// ============================================================================

/// Everything needed to resume play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGame {
    pub character: Character,
    pub location: LocationState,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default = "no_history_index")]
    pub history_index: i64,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
}

fn no_history_index() -> i64 {
    -1
}

impl SavedGame {
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a payload, checking the required fields before anything else so
    /// a payload missing them is reported as corrupt.
    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| PersistError::Corrupt(e.to_string()))?;
        for field in ["character", "location", "messages"] {
            if value.get(field).map_or(true, |v| v.is_null()) {
                return Err(PersistError::Corrupt(format!("missing {field}")));
            }
        }
        serde_json::from_value(value).map_err(|e| PersistError::Corrupt(e.to_string()))
    }
}

// ============================================================================
// Local snapshot store
// ============================================================================

/// Key/value storage for whole saved games.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, key: &str, game: &SavedGame) -> Result<(), PersistError>;

    /// Load a saved game; [`PersistError::NotFound`] if the key is absent.
    async fn load(&self, key: &str) -> Result<SavedGame, PersistError>;
}

/// One pretty-printed JSON file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `dir/{key}.json`, with `key` held to the session-code alphabet so it
    /// cannot leave the directory.
    fn path_for(&self, key: &str) -> Result<PathBuf, PersistError> {
        let key = validate_session_code(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn save(&self, key: &str, game: &SavedGame) -> Result<(), PersistError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(game)?;
        fs::write(&path, json).await?;
        tracing::debug!(path = %path.display(), "saved game");
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<SavedGame, PersistError> {
        let path = self.path_for(key)?;
        let json = match fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), "loaded game");
        SavedGame::from_json(&json)
    }
}

/// In-memory store, serializing through JSON like the file store does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    /// Store raw text under a key, bypassing serialization.
    pub async fn insert_raw(&self, key: &str, json: impl Into<String>) {
        self.entries.lock().await.insert(key.to_string(), json.into());
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn save(&self, key: &str, game: &SavedGame) -> Result<(), PersistError> {
        let json = game.to_json()?;
        self.entries.lock().await.insert(key.to_string(), json);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<SavedGame, PersistError> {
        let entries = self.entries.lock().await;
        let json = entries
            .get(key)
            .ok_or_else(|| PersistError::NotFound(key.to_string()))?;
        SavedGame::from_json(json)
    }
}

// ============================================================================
// Remote session store
// ============================================================================

/// A file host addressed by filename.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn upload(&self, filename: &str, content: &str) -> Result<(), PersistError>;

    /// Fetch a file; [`PersistError::NotFound`] if the host has none.
    async fn download(&self, filename: &str) -> Result<String, PersistError>;
}

/// Upload through a JSON endpoint, download from a public base URL.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: reqwest::Client,
    upload_url: String,
    base_url: String,
}

impl HttpBlobStore {
    pub fn new(upload_url: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upload_url: upload_url.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
struct UploadRequest<'a> {
    filename: &'a str,
    content: &'a str,
}

#[async_trait]
impl RemoteStore for HttpBlobStore {
    async fn upload(&self, filename: &str, content: &str) -> Result<(), PersistError> {
        let response = self
            .client
            .post(&self.upload_url)
            .json(&UploadRequest { filename, content })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PersistError::Transport(format!("upload failed ({status}): {body}")));
        }
        Ok(())
    }

    async fn download(&self, filename: &str) -> Result<String, PersistError> {
        let url = format!("{}/{filename}", self.base_url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PersistError::NotFound(filename.to_string()));
        }
        if !status.is_success() {
            return Err(PersistError::Transport(format!("download failed ({status})")));
        }
        Ok(response.text().await?)
    }
}

/// In-memory remote store.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    files: Mutex<HashMap<String, String>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn file(&self, filename: &str) -> Option<String> {
        self.files.lock().await.get(filename).cloned()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn upload(&self, filename: &str, content: &str) -> Result<(), PersistError> {
        self.files
            .lock()
            .await
            .insert(filename.to_string(), content.to_string());
        Ok(())
    }

    async fn download(&self, filename: &str) -> Result<String, PersistError> {
        self.file(filename)
            .await
            .ok_or_else(|| PersistError::NotFound(filename.to_string()))
    }
}

// ============================================================================
// Transcript format
// ============================================================================

/// Trim a session code and check it is safe to use as a filename.
pub fn validate_session_code(code: &str) -> Result<&str, PersistError> {
    let code = code.trim();
    let valid = !code.is_empty()
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(code)
    } else {
        Err(PersistError::InvalidSessionCode)
    }
}

/// `{code}.md`
pub fn transcript_filename(code: &str) -> String {
    format!("{code}.md")
}

/// Render the Markdown transcript with the payload embedded at the end.
pub fn render_transcript(game: &SavedGame) -> Result<String, PersistError> {
    let story = game
        .messages
        .iter()
        .map(|m| {
            let label = match m.role {
                Role::User => PLAYER_LABEL,
                Role::Model => NARRATOR_LABEL,
            };
            format!("**{label}**: {}", m.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(format!(
        "# {CAMPAIGN_TITLE}\n\n{story}\n\n<!-- {DATA_BLOCK_START}\n{}\n{DATA_BLOCK_END} -->",
        game.to_json()?
    ))
}

/// Pull the payload out of a transcript. The block is always the last thing
/// written, so the story may quote the markers.
pub fn extract_data_block(transcript: &str) -> Result<SavedGame, PersistError> {
    let start_marker = format!("{DATA_BLOCK_START}\n");
    let end_marker = format!("\n{DATA_BLOCK_END}");

    let start = transcript
        .rfind(&start_marker)
        .map(|i| i + start_marker.len())
        .ok_or_else(|| PersistError::Corrupt("no data block".to_string()))?;
    let len = transcript[start..]
        .find(&end_marker)
        .ok_or_else(|| PersistError::Corrupt("unterminated data block".to_string()))?;

    SavedGame::from_json(&transcript[start..start + len])
}

/// Upload a game under `code`.
pub async fn save_remote(
    store: &dyn RemoteStore,
    code: &str,
    game: &SavedGame,
) -> Result<String, PersistError> {
    let code = validate_session_code(code)?;
    let filename = transcript_filename(code);
    store.upload(&filename, &render_transcript(game)?).await?;
    tracing::info!(code, "uploaded session");
    Ok(code.to_string())
}

/// Download and decode the game saved under `code`.
pub async fn load_remote(store: &dyn RemoteStore, code: &str) -> Result<SavedGame, PersistError> {
    let code = validate_session_code(code)?;
    let transcript = store.download(&transcript_filename(code)).await?;
    let game = extract_data_block(&transcript)?;
    tracing::info!(code, messages = game.messages.len(), "downloaded session");
    Ok(game)
}
