//! Save/load tests for the local and remote stores.

use chronicle_core::persist::{
    render_transcript, FileStore, MemoryRemoteStore, PersistError, SnapshotStore, AUTOSAVE_KEY,
};
use chronicle_core::testing::{hp_change, item_grant, MockNarrator, TestHarness};
use chronicle_core::{ChatSettings, GameSession, SessionError};

async fn played_harness() -> TestHarness {
    let mut harness = TestHarness::new();
    harness
        .expect_narrative("The Golden Thorn hums with gossip.")
        .expect_response(hp_change("A chair leg catches your shin.", -4))
        .expect_response(item_grant("The merchant pays in gems.", &[("Ruby", 3)]));

    harness.session.begin_adventure().await.unwrap();
    harness.input("I start a bar fight").await.unwrap();
    harness.input("I demand payment").await.unwrap();
    harness.session.undo().unwrap();
    harness
}

#[tokio::test]
async fn test_file_save_and_load_restores_everything() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let harness = played_harness().await;
    harness.session.save_local(&store, "tavern").await.unwrap();

    let mut loaded = GameSession::new(MockNarrator::new(), ChatSettings::default());
    loaded.load_local(&store, "tavern").await.unwrap();

    assert_eq!(loaded.to_saved(), harness.session.to_saved());
    assert_eq!(loaded.history().index(), 1);
    assert!(loaded.can_redo());
    assert_eq!(loaded.narrator().resets(), 1);

    loaded.redo().unwrap();
    assert_eq!(loaded.character().inventory.last().unwrap().name, "Ruby");
}

#[tokio::test]
async fn test_loading_missing_key_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let mut session = GameSession::new(MockNarrator::new(), ChatSettings::default());

    let result = session.load_local(&store, "nothing-here").await;
    assert!(matches!(
        result,
        Err(SessionError::Persist(PersistError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_corrupt_file_does_not_partially_restore() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("broken.json"), r#"{"messages": []}"#)
        .await
        .unwrap();
    let store = FileStore::new(dir.path());

    let harness = played_harness().await;
    let mut session = harness.session;
    let before = session.to_saved();

    let result = session.load_local(&store, "broken").await;
    assert!(matches!(
        result,
        Err(SessionError::Persist(PersistError::Corrupt(_)))
    ));
    assert_eq!(session.to_saved(), before);
}

#[tokio::test]
async fn test_autosave_resume() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    let harness = played_harness().await;
    harness.session.autosave(&store).await.unwrap();
    assert!(store.load(AUTOSAVE_KEY).await.is_ok());

    let resumed = GameSession::resume(MockNarrator::new(), ChatSettings::default(), &store)
        .await
        .unwrap();
    assert_eq!(resumed.messages(), harness.session.messages());
}

#[tokio::test]
async fn test_remote_upload_and_download() {
    let remote = MemoryRemoteStore::new();
    let harness = played_harness().await;

    let code = harness.session.upload(&remote, "bar-fight").await.unwrap();
    assert_eq!(code, "bar-fight");

    let transcript = remote.file("bar-fight.md").await.unwrap();
    assert_eq!(transcript, render_transcript(&harness.session.to_saved()).unwrap());
    assert!(transcript.contains("**Darian Crane**: I start a bar fight"));
    assert!(transcript.contains("**Dungeon Master**: The Golden Thorn hums with gossip."));

    let mut other = GameSession::new(MockNarrator::new(), ChatSettings::default());
    other.download(&remote, "bar-fight").await.unwrap();
    assert_eq!(other.to_saved(), harness.session.to_saved());
}

#[tokio::test]
async fn test_remote_errors() {
    let remote = MemoryRemoteStore::new();
    let mut session = GameSession::new(MockNarrator::new(), ChatSettings::default());

    assert!(matches!(
        session.download(&remote, "unknown").await,
        Err(SessionError::Persist(PersistError::NotFound(_)))
    ));
    assert!(matches!(
        session.upload(&remote, "no spaces please").await,
        Err(SessionError::Persist(PersistError::InvalidSessionCode))
    ));
}
