//! End-to-end turn pipeline tests against the mock narrator.

use chronicle_core::checks::resolve_skill_check;
use chronicle_core::dice::{DieRoll, DieType};
use chronicle_core::grimoire::{GrimoireError, LONG_REST_MESSAGE};
use chronicle_core::narrator::CharacterUpdate;
use chronicle_core::testing::{hp_change, item_grant, xp_award, TestHarness};
use chronicle_core::world::{spell_order, Role};
use chronicle_core::{NarratorResponse, SessionError, Skill};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn spell_index(harness: &TestHarness, name: &str) -> usize {
    harness
        .session
        .character()
        .spells
        .iter()
        .position(|s| s.name == name)
        .unwrap()
}

fn assert_sorted(harness: &TestHarness) {
    let spells = &harness.session.character().spells;
    assert!(spells.windows(2).all(|w| spell_order(&w[0], &w[1]).is_le()));
}

// =============================================================================
// SPELLS AND RESTING
// =============================================================================

#[tokio::test]
async fn test_casting_spends_exactly_one_slot_of_its_level() {
    let mut harness = TestHarness::new();
    harness.expect_narrative("The merchant nods along.");

    let index = spell_index(&harness, "Suggestion");
    harness.session.cast_spell(index).await.unwrap();

    assert_eq!(harness.slots_remaining(1), 4);
    assert_eq!(harness.slots_remaining(2), 2);
    assert_eq!(harness.slots_remaining(3), 2);

    let request = &harness.session.narrator().requests()[0];
    assert_eq!(request.action, "I cast Suggestion (level 2)!");
    assert_eq!(request.summary.spell_slots.get(&2), Some(&2));
}

#[tokio::test]
async fn test_casting_without_slots_is_rejected_locally() {
    let mut harness = TestHarness::new();
    let index = spell_index(&harness, "Tongues");
    harness.session.cast_spell(index).await.unwrap();
    harness.session.cast_spell(index).await.unwrap();
    assert_eq!(harness.slots_remaining(3), 0);

    let calls = harness.session.narrator().calls();
    let messages = harness.session.messages().len();
    let result = harness.session.cast_spell(index).await;

    assert!(matches!(
        result,
        Err(SessionError::Grimoire(GrimoireError::NoSlotsRemaining { level: 3 }))
    ));
    assert_eq!(harness.slots_remaining(3), 0);
    assert_eq!(harness.session.narrator().calls(), calls);
    assert_eq!(harness.session.messages().len(), messages);
}

#[tokio::test]
async fn test_cantrips_never_spend_slots() {
    let mut harness = TestHarness::new();
    let before = harness.session.character().spell_slots.clone();
    let index = spell_index(&harness, "Vicious Mockery");
    harness.session.cast_spell(index).await.unwrap();
    harness.session.cast_spell(index).await.unwrap();
    assert_eq!(harness.session.character().spell_slots, before);
}

#[tokio::test]
async fn test_rest_restores_everything() {
    let mut harness = TestHarness::new();
    harness.expect_response(hp_change("A blade finds you.", -20));
    harness.input("I step into the alley").await.unwrap();
    let index = spell_index(&harness, "Healing Word");
    harness.session.cast_spell(index).await.unwrap();
    assert_eq!(harness.player_hp(), (18, 38));

    harness.session.rest().await.unwrap();

    let character = harness.session.character();
    assert_eq!(character.hp, character.max_hp);
    assert_eq!(character.spell_slots.current, character.spell_slots.max);
    let last_user = harness
        .session
        .messages()
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .unwrap();
    assert_eq!(last_user.text, LONG_REST_MESSAGE);
}

#[tokio::test]
async fn test_learning_at_cantrip_cap_changes_nothing() {
    let mut harness = TestHarness::new();
    let before = harness.session.character().spells.clone();

    let result = harness.session.learn_spell("Message");
    assert!(matches!(
        result,
        Err(SessionError::Grimoire(GrimoireError::CantripLimitReached { limit: 3 }))
    ));
    assert_eq!(harness.session.character().spells, before);
    assert_eq!(harness.session.narrator().calls(), 0);
}

#[tokio::test]
async fn test_learn_and_forget_keep_order() {
    let mut harness = TestHarness::new();
    harness.session.learn_spell("shatter").unwrap();
    assert_sorted(&harness);
    assert!(harness.session.character().knows_spell("Shatter"));

    let index = spell_index(&harness, "Charm Person");
    assert!(matches!(
        harness.session.forget_spell(index, false),
        Err(SessionError::Grimoire(GrimoireError::NotConfirmed))
    ));
    assert_eq!(harness.session.forget_spell(index, true).unwrap(), "Charm Person");
    assert!(!harness.session.character().knows_spell("Charm Person"));
    assert_sorted(&harness);
}

// =============================================================================
// DICE AND CHECKS
// =============================================================================

#[tokio::test]
async fn test_dice_roll_is_sent_as_action() {
    let mut harness = TestHarness::new();
    let mut rng = StdRng::seed_from_u64(7);
    let roll = DieRoll::roll_with_rng(DieType::D20, &mut rng);
    harness.session.send_roll(&roll).await.unwrap();

    let request = &harness.session.narrator().requests()[0];
    assert_eq!(request.action, format!("[Dice Roll] {}", roll.describe()));
    assert!(request.action.starts_with("[Dice Roll] Rolled d20: "));
}

#[tokio::test]
async fn test_unknown_die_is_rejected() {
    let mut harness = TestHarness::new();
    assert!(matches!(
        harness.session.roll_die("d7").await,
        Err(SessionError::Dice(_))
    ));
    assert!(harness.session.roll_die("d6").await.is_ok());
}

#[tokio::test]
async fn test_silver_tongue_persuasion_check() {
    let mut harness = TestHarness::new();
    let result = resolve_skill_check(Skill::Persuasion, 18, 5, 3);
    assert_eq!(result.effective_roll, 10);
    assert_eq!(result.total, 17);

    harness.session.send_check(&result).await.unwrap();
    let action = &harness.session.narrator().requests()[0].action;
    assert!(action.starts_with("[Skill Check: Persuasion] Total: **17**"));
    assert!(action.contains("3->10 (Silver Tongue)"));
}

// =============================================================================
// RECONCILIATION
// =============================================================================

#[tokio::test]
async fn test_hp_never_leaves_bounds() {
    let mut harness = TestHarness::new();
    harness
        .expect_response(hp_change("A dragon sneezes.", -500))
        .expect_response(hp_change("A god smiles.", 500));

    harness.input("I poke the dragon").await.unwrap();
    assert_eq!(harness.player_hp(), (0, 38));
    harness.input("I pray").await.unwrap();
    assert_eq!(harness.player_hp(), (38, 38));
}

#[tokio::test]
async fn test_extreme_hp_changes_from_narrator() {
    let mut harness = TestHarness::new();
    harness
        .expect_response(hp_change("A miracle.", i64::MAX))
        .expect_response(hp_change("Oblivion.", i64::MIN));

    harness.input("I pray").await.unwrap();
    assert_eq!(harness.player_hp(), (38, 38));
    harness.input("I open the box").await.unwrap();
    assert_eq!(harness.player_hp(), (0, 38));
}

#[tokio::test]
async fn test_inventory_accumulates_and_drops_whole_stack() {
    let mut harness = TestHarness::new();
    harness
        .expect_response(item_grant("A tailor delivers.", &[("Fine Clothes (Silk Suits)", 2)]))
        .expect_response(
            NarratorResponse::narrative("Thieves!").with_character(CharacterUpdate {
                items_removed: vec!["Fine Clothes (Silk Suits)".to_string()],
                ..CharacterUpdate::default()
            }),
        );

    harness.input("I order suits").await.unwrap();
    assert_eq!(harness.item_quantity("Fine Clothes (Silk Suits)"), 7);
    harness.input("I sleep").await.unwrap();
    assert!(!harness.has_item("Fine Clothes (Silk Suits)"));
}

#[tokio::test]
async fn test_turn_messages_are_user_then_model() {
    let mut harness = TestHarness::new();
    harness.expect_narrative("The board lists three jobs.");
    harness.input("I read the board").await.unwrap();

    let messages = harness.session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].role, Role::Model);
    assert_eq!(harness.session.suggested_actions().len(), 3);
}

// =============================================================================
// LEVEL-UP
// =============================================================================

#[tokio::test]
async fn test_level_up_flow() {
    let mut harness = TestHarness::new();
    harness
        .expect_response(xp_award("The magistrate is grateful.", 7_500))
        .expect_narrative("Power settles on you.");

    let outcome = harness.input("I expose the culprit").await.unwrap();
    assert_eq!(outcome.level_up, Some((5, 6)));

    let draft = harness.session.level_up_draft_mut().unwrap();
    assert_eq!(draft.level_up().hp_gain(), 7);
    draft.add_custom("Objection!", 1, "Denny Crane objects.").unwrap();
    draft.add_from_library("Heat Metal").unwrap();
    harness.session.confirm_level_up().await.unwrap();

    let character = harness.session.character();
    assert_eq!(character.level, 6);
    assert_eq!(character.max_hp, 45);
    assert_eq!(character.spell_slots.current, character.spell_slots.max);
    assert_eq!(character.spell_slots.max.get(&3), Some(&3));
    assert!(character.knows_spell("Objection!"));
    assert_sorted(&harness);
}

// =============================================================================
// HISTORY
// =============================================================================

#[tokio::test]
async fn test_undo_then_redo_restores_identical_state() {
    let mut harness = TestHarness::new();
    harness
        .expect_response(hp_change("One.", -3))
        .expect_response(item_grant("Two.", &[("Lockpicks", 1)]))
        .expect_response(xp_award("Three.", 100));

    harness.input("one").await.unwrap();
    harness.input("two").await.unwrap();
    harness.input("three").await.unwrap();

    let character = harness.session.character().clone();
    let location = harness.session.location().clone();
    let messages = harness.session.messages().to_vec();

    harness.session.undo().unwrap();
    harness.session.undo().unwrap();
    assert_eq!(harness.session.messages().len(), 2);
    assert_eq!(harness.player_hp(), (35, 38));

    harness.session.redo().unwrap();
    harness.session.redo().unwrap();
    assert_eq!(harness.session.character(), &character);
    assert_eq!(harness.session.location(), &location);
    assert_eq!(harness.session.messages(), messages.as_slice());
    assert_eq!(harness.session.narrator().resets(), 4);
}

#[tokio::test]
async fn test_commit_after_undo_discards_future() {
    let mut harness = TestHarness::new();
    harness
        .expect_narrative("One.")
        .expect_narrative("Two.")
        .expect_narrative("Alternate two.");

    harness.input("one").await.unwrap();
    harness.input("two").await.unwrap();
    harness.session.undo().unwrap();
    assert!(harness.session.can_redo());

    harness.input("something else").await.unwrap();
    assert!(!harness.session.can_redo());
    assert_eq!(harness.session.history().len(), 2);
    assert_eq!(harness.last_message(), Some("Alternate two."));

    let request = harness.session.narrator().requests().last().unwrap();
    assert_eq!(request.history.len(), 2);
}
