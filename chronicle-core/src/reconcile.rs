//! Merging a narrator turn into the game state.
//!
//! The narrator is trusted for what happened but not for the numbers: hit
//! points and gold are clamped, item quantities are at least one, companion
//! names stay unique, and the level is derived from the xp table.

use crate::narrator::{CharacterUpdate, CompanionGrant, ItemGrant, LocationUpdate, NarratorResponse};
use crate::progression::LevelUp;
use crate::tables::level_for_xp;
use crate::world::{Character, ChatMessage, Companion, Item, LocationState};

/// The state after applying one narrator turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub character: Character,
    pub location: LocationState,
    pub messages: Vec<ChatMessage>,
    pub suggested_actions: Vec<String>,
    /// Set when the turn pushed the character past a level threshold.
    pub level_up: Option<LevelUp>,
}

/// Apply `response` to the current state.
///
/// `prior_messages` already contains the player's message for this turn,
/// if there was one; the narration is appended after it.
pub fn reconcile(
    response: &NarratorResponse,
    character: &Character,
    location: &LocationState,
    prior_messages: &[ChatMessage],
) -> Reconciliation {
    let mut messages = prior_messages.to_vec();
    messages.push(ChatMessage::model(response.narrative.clone()));

    let mut location = location.clone();
    if let Some(update) = &response.location_update {
        merge_location(&mut location, update);
    }

    let mut character = character.clone();
    let old_level = character.level;
    if let Some(update) = &response.character_update {
        merge_character(&mut character, update);
    }

    let new_level = old_level.max(level_for_xp(character.xp));
    let level_up = if new_level > old_level {
        tracing::info!(from = old_level, to = new_level, xp = character.xp, "level threshold crossed");
        character.level = new_level;
        Some(LevelUp::new(old_level, new_level, character.clone()))
    } else {
        None
    };

    Reconciliation {
        character,
        location,
        messages,
        suggested_actions: response.suggested_actions.clone(),
        level_up,
    }
}

/// Overwrite every field present in the update.
pub fn merge_location(location: &mut LocationState, update: &LocationUpdate) {
    if let Some(name) = &update.name {
        location.name = name.clone();
    }
    if let Some(description) = &update.description {
        location.description = description.clone();
    }
    if let Some(npcs) = &update.npcs {
        location.npcs = npcs.clone();
    }
    if let Some(image_url) = &update.image_url {
        location.image_url = Some(image_url.clone());
    }
}

/// Apply the character deltas, without touching the level.
pub fn merge_character(character: &mut Character, update: &CharacterUpdate) {
    character.adjust_hp(update.hp_change.unwrap_or(0));

    let xp_awarded = update.xp_awarded.unwrap_or(0);
    if xp_awarded < 0 {
        tracing::warn!(xp_awarded, "ignoring negative xp award");
    } else {
        let awarded = u32::try_from(xp_awarded).unwrap_or(u32::MAX);
        character.xp = character.xp.saturating_add(awarded);
    }

    character.adjust_gold(update.gold_change.unwrap_or(0));

    for grant in &update.items_added {
        character.add_item(item_from_grant(grant));
    }
    character.remove_items(&update.items_removed);

    for grant in &update.companions_added {
        character.add_companion(companion_from_grant(grant));
    }
    character.remove_companions(&update.companions_removed);

    character.spell_slots.clamp();
}

fn item_from_grant(grant: &ItemGrant) -> Item {
    let quantity = grant.quantity.unwrap_or(1).clamp(1, u32::MAX as i64) as u32;
    Item {
        name: grant.name.clone(),
        quantity,
        description: grant.description.clone(),
        is_equipped: false,
    }
}

fn companion_from_grant(grant: &CompanionGrant) -> Companion {
    let max_hp = grant
        .max_hp
        .or(grant.hp)
        .unwrap_or(1)
        .clamp(1, u32::MAX as i64) as u32;
    let hp = grant.hp.unwrap_or(max_hp as i64).clamp(0, max_hp as i64) as u32;
    Companion {
        name: grant.name.clone(),
        kind: grant.kind.clone(),
        description: grant.description.clone(),
        hp,
        max_hp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{default_character, default_location};

    fn apply(update: CharacterUpdate) -> Reconciliation {
        let response = NarratorResponse::narrative("Something happens.").with_character(update);
        reconcile(&response, &default_character(), &default_location(), &[])
    }

    #[test]
    fn test_narrative_is_appended_as_model_message() {
        let prior = vec![ChatMessage::user("I wave")];
        let response = NarratorResponse::narrative("The innkeeper waves back.")
            .with_suggestions(["Order ale", "Sit down", "Leave"]);
        let result = reconcile(&response, &default_character(), &default_location(), &prior);

        assert_eq!(result.messages.len(), 2);
        assert_eq!(result.messages[0], prior[0]);
        assert_eq!(result.messages[1].role, crate::world::Role::Model);
        assert_eq!(result.messages[1].text, "The innkeeper waves back.");
        assert_eq!(result.suggested_actions, ["Order ale", "Sit down", "Leave"]);
        assert_eq!(result.character, default_character());
        assert!(result.level_up.is_none());
    }

    #[test]
    fn test_location_merge_is_shallow() {
        let response = NarratorResponse::narrative("You climb the stairs.").with_location(LocationUpdate {
            name: Some("Upstairs Hall".to_string()),
            ..LocationUpdate::default()
        });
        let result = reconcile(&response, &default_character(), &default_location(), &[]);
        assert_eq!(result.location.name, "Upstairs Hall");
        assert_eq!(result.location.description, default_location().description);
        assert_eq!(result.location.npcs, default_location().npcs);
    }

    #[test]
    fn test_hp_is_clamped_both_ways() {
        let result = apply(CharacterUpdate {
            hp_change: Some(-500),
            ..CharacterUpdate::default()
        });
        assert_eq!(result.character.hp, 0);

        let result = apply(CharacterUpdate {
            hp_change: Some(500),
            ..CharacterUpdate::default()
        });
        assert_eq!(result.character.hp, result.character.max_hp);
    }

    #[test]
    fn test_gold_and_xp() {
        let result = apply(CharacterUpdate {
            xp_awarded: Some(200),
            gold_change: Some(-60_000),
            ..CharacterUpdate::default()
        });
        assert_eq!(result.character.xp, 6_700);
        assert_eq!(result.character.gold, 0);

        let result = apply(CharacterUpdate {
            xp_awarded: Some(-1_000),
            ..CharacterUpdate::default()
        });
        assert_eq!(result.character.xp, 6_500);
    }

    #[test]
    fn test_inventory_add_accumulates_and_remove_drops_stack() {
        let result = apply(CharacterUpdate {
            items_added: vec![
                ItemGrant {
                    name: "Fine Clothes (Silk Suits)".to_string(),
                    quantity: Some(2),
                    description: None,
                },
                ItemGrant {
                    name: "Lockpicks".to_string(),
                    quantity: Some(0),
                    description: Some("Thin and sharp".to_string()),
                },
            ],
            items_removed: vec!["Rapier".to_string()],
            ..CharacterUpdate::default()
        });
        let inventory = &result.character.inventory;
        let clothes: Vec<_> = inventory
            .iter()
            .filter(|i| i.name == "Fine Clothes (Silk Suits)")
            .collect();
        assert_eq!(clothes.len(), 1);
        assert_eq!(clothes[0].quantity, 7);

        let lockpicks = inventory.iter().find(|i| i.name == "Lockpicks").unwrap();
        assert_eq!(lockpicks.quantity, 1);
        assert!(!lockpicks.is_equipped);

        assert!(inventory.iter().all(|i| i.name != "Rapier"));
    }

    #[test]
    fn test_companions_added_and_removed() {
        let result = apply(CharacterUpdate {
            companions_added: vec![CompanionGrant {
                name: "Pip".to_string(),
                kind: "Urchin".to_string(),
                description: "Quick fingers".to_string(),
                hp: Some(9),
                max_hp: Some(4),
            }],
            companions_removed: vec!["Jeeves".to_string()],
            ..CharacterUpdate::default()
        });
        let names: Vec<_> = result
            .character
            .companions
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["Crane Stallions", "Pip"]);
        assert_eq!(result.character.companions[1].hp, 4);
    }

    #[test]
    fn test_level_up_at_threshold() {
        let result = apply(CharacterUpdate {
            xp_awarded: Some(7_500),
            ..CharacterUpdate::default()
        });
        assert_eq!(result.character.level, 6);
        let level_up = result.level_up.unwrap();
        assert_eq!((level_up.from_level, level_up.to_level), (5, 6));
        assert_eq!(level_up.character, result.character);
    }

    #[test]
    fn test_no_level_up_below_threshold() {
        let result = apply(CharacterUpdate {
            xp_awarded: Some(7_499),
            ..CharacterUpdate::default()
        });
        assert_eq!(result.character.level, 5);
        assert!(result.level_up.is_none());
    }

    #[test]
    fn test_multi_level_jump() {
        let result = apply(CharacterUpdate {
            xp_awarded: Some(20_000),
            ..CharacterUpdate::default()
        });
        let level_up = result.level_up.unwrap();
        assert_eq!(result.character.xp, 26_500);
        assert_eq!((level_up.from_level, level_up.to_level), (5, 7));
    }

    #[test]
    fn test_level_never_drops() {
        let mut character = default_character();
        character.level = 9;
        let response = NarratorResponse::narrative("Quiet.").with_character(CharacterUpdate {
            xp_awarded: Some(10),
            ..CharacterUpdate::default()
        });
        let result = reconcile(&response, &character, &default_location(), &[]);
        assert_eq!(result.character.level, 9);
        assert!(result.level_up.is_none());
    }
}
