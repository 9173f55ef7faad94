//! The structured reply the narrator returns each turn.
//!
//! Every field except `narrative` is optional and tolerant of `null`, since
//! the model fills the schema loosely.

use serde::{Deserialize, Serialize};

const FALLBACK_NARRATIVE: &str =
    "The weave of magic falters... (API error: check your key or try again)";

const FALLBACK_ACTIONS: [&str; 3] = ["Retry the action", "Check the character sheet", "Wait..."];

/// One narrator turn: prose, three suggestions, and optional state changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarratorResponse {
    pub narrative: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggested_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_update: Option<LocationUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_update: Option<CharacterUpdate>,
}

impl NarratorResponse {
    /// A plain narrative with suggestions and no state change.
    pub fn narrative(text: impl Into<String>) -> Self {
        Self {
            narrative: text.into(),
            ..Self::default()
        }
    }

    pub fn with_suggestions<S: Into<String>>(mut self, actions: impl IntoIterator<Item = S>) -> Self {
        self.suggested_actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_location(mut self, update: LocationUpdate) -> Self {
        self.location_update = Some(update);
        self
    }

    pub fn with_character(mut self, update: CharacterUpdate) -> Self {
        self.character_update = Some(update);
        self
    }

    /// The in-character turn used when the narrator cannot be reached or
    /// returns something unreadable.
    pub fn fallback() -> Self {
        Self::narrative(FALLBACK_NARRATIVE).with_suggestions(FALLBACK_ACTIONS)
    }

    pub fn is_fallback(&self) -> bool {
        self.narrative == FALLBACK_NARRATIVE && self.character_update.is_none()
    }
}

/// Partial location fields; absent fields leave the location unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npcs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Deltas to apply to the character sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp_change: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp_awarded: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gold_change: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items_added: Vec<ItemGrant>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items_removed: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub companions_added: Vec<CompanionGrant>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub companions_removed: Vec<String>,
}

/// An item the narrator hands to the character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemGrant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A companion joining the party.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanionGrant {
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hp: Option<i64>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
