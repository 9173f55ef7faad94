//! Game state types.
//!
//! The player character sheet, the current location, and the chat log that
//! the narrator and the player append to.

use crate::tables::{self, SpellLimits};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

// ============================================================================
// Abilities
// ============================================================================

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ability::Strength => "Strength",
            Ability::Dexterity => "Dexterity",
            Ability::Constitution => "Constitution",
            Ability::Intelligence => "Intelligence",
            Ability::Wisdom => "Wisdom",
            Ability::Charisma => "Charisma",
        }
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }

    /// Parse a full name or abbreviation, ignoring case.
    pub fn from_name(name: &str) -> Option<Ability> {
        let name = name.trim();
        Ability::all().into_iter().find(|a| {
            a.name().eq_ignore_ascii_case(name) || a.abbreviation().eq_ignore_ascii_case(name)
        })
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// Ability scores container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl AbilityScores {
    pub fn new(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    pub fn get(&self, ability: Ability) -> u8 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        score_modifier(self.get(ability))
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

/// `floor((score - 10) / 2)`; 8-9 is -1, 10-11 is 0, 12-13 is +1.
pub fn score_modifier(score: u8) -> i32 {
    (score as i32 - 10).div_euclid(2)
}

// ============================================================================
// Skills
// ============================================================================

/// Skills a check can be rolled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skill {
    Athletics,
    Acrobatics,
    SleightOfHand,
    Stealth,
    Arcana,
    History,
    Investigation,
    Nature,
    Religion,
    AnimalHandling,
    Insight,
    Medicine,
    Perception,
    Survival,
    Deception,
    Intimidation,
    Performance,
    Persuasion,
}

impl Skill {
    pub fn all() -> [Skill; 18] {
        [
            Skill::Acrobatics,
            Skill::AnimalHandling,
            Skill::Arcana,
            Skill::Athletics,
            Skill::Deception,
            Skill::History,
            Skill::Insight,
            Skill::Intimidation,
            Skill::Investigation,
            Skill::Medicine,
            Skill::Nature,
            Skill::Perception,
            Skill::Performance,
            Skill::Persuasion,
            Skill::Religion,
            Skill::SleightOfHand,
            Skill::Stealth,
            Skill::Survival,
        ]
    }

    pub fn ability(&self) -> Ability {
        tables::skill_ability(*self)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Skill::Athletics => "Athletics",
            Skill::Acrobatics => "Acrobatics",
            Skill::SleightOfHand => "Sleight of Hand",
            Skill::Stealth => "Stealth",
            Skill::Arcana => "Arcana",
            Skill::History => "History",
            Skill::Investigation => "Investigation",
            Skill::Nature => "Nature",
            Skill::Religion => "Religion",
            Skill::AnimalHandling => "Animal Handling",
            Skill::Insight => "Insight",
            Skill::Medicine => "Medicine",
            Skill::Perception => "Perception",
            Skill::Survival => "Survival",
            Skill::Deception => "Deception",
            Skill::Intimidation => "Intimidation",
            Skill::Performance => "Performance",
            Skill::Persuasion => "Persuasion",
        }
    }

    /// Parse a skill name, ignoring case, spaces and underscores.
    pub fn from_name(name: &str) -> Option<Skill> {
        let wanted = normalize(name);
        Skill::all()
            .into_iter()
            .find(|skill| normalize(skill.name()) == wanted)
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Spells, Items, Companions
// ============================================================================

/// A spell the character knows. Owned by the character; never a reference
/// into the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spell {
    pub name: String,
    /// 0 for cantrips.
    pub level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub casting_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    pub description: String,
}

impl Spell {
    pub fn is_cantrip(&self) -> bool {
        self.level == 0
    }
}

/// Ordering for a spell list: level ascending, then name.
pub fn spell_order(a: &Spell, b: &Spell) -> Ordering {
    a.level.cmp(&b.level).then_with(|| a.name.cmp(&b.name))
}

/// An inventory stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_equipped: bool,
}

impl Item {
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.max(1),
            description: None,
            is_equipped: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A party member travelling with the character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Companion {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub hp: u32,
    pub max_hp: u32,
}

// ============================================================================
// Spell Slots
// ============================================================================

/// Current and maximum spell slots, keyed by slot level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellSlots {
    pub current: BTreeMap<u8, u32>,
    pub max: BTreeMap<u8, u32>,
}

impl SpellSlots {
    /// Full slots for the given maximums.
    pub fn full(max: BTreeMap<u8, u32>) -> Self {
        Self {
            current: max.clone(),
            max,
        }
    }

    pub fn remaining(&self, level: u8) -> u32 {
        self.current.get(&level).copied().unwrap_or(0)
    }

    pub fn maximum(&self, level: u8) -> u32 {
        self.max.get(&level).copied().unwrap_or(0)
    }

    /// Spend one slot of `level`. Returns false if none remain.
    pub fn expend(&mut self, level: u8) -> bool {
        match self.current.get_mut(&level) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Restore every slot to its maximum.
    pub fn refill(&mut self) {
        self.current = self.max.clone();
    }

    /// Pull each current count back into `[0, max]`.
    pub fn clamp(&mut self) {
        let max = &self.max;
        self.current.retain(|level, _| max.contains_key(level));
        for (level, count) in self.current.iter_mut() {
            *count = (*count).min(max.get(level).copied().unwrap_or(0));
        }
    }
}

// ============================================================================
// Character
// ============================================================================

/// The player's character sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub level: u8,
    pub xp: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub ac: u8,
    pub gold: u64,
    pub abilities: AbilityScores,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub spells: Vec<Spell>,
    #[serde(default)]
    pub spell_slots: SpellSlots,
    #[serde(default)]
    pub inventory: Vec<Item>,
    #[serde(default)]
    pub companions: Vec<Companion>,
}

impl Character {
    pub fn ability_modifier(&self, ability: Ability) -> i32 {
        self.abilities.modifier(ability)
    }

    pub fn proficiency_bonus(&self) -> i32 {
        tables::proficiency_bonus(self.level)
    }

    /// `8 + proficiency + charisma modifier`.
    pub fn spell_save_dc(&self) -> i32 {
        8 + self.proficiency_bonus() + self.ability_modifier(Ability::Charisma)
    }

    pub fn spell_attack_bonus(&self) -> i32 {
        self.proficiency_bonus() + self.ability_modifier(Ability::Charisma)
    }

    pub fn spell_limits(&self) -> SpellLimits {
        tables::spell_limits(self.level)
    }

    pub fn cantrips_known(&self) -> u32 {
        self.spells.iter().filter(|s| s.is_cantrip()).count() as u32
    }

    pub fn spells_known(&self) -> u32 {
        self.spells.iter().filter(|s| !s.is_cantrip()).count() as u32
    }

    pub fn knows_spell(&self, name: &str) -> bool {
        self.spells
            .iter()
            .any(|s| s.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn sort_spells(&mut self) {
        self.spells.sort_by(spell_order);
    }

    /// Apply a damage (negative) or healing (positive) delta, clamped to
    /// `[0, max_hp]`.
    pub fn adjust_hp(&mut self, delta: i64) {
        let hp = (self.hp as i64).saturating_add(delta).clamp(0, self.max_hp as i64);
        self.hp = hp as u32;
    }

    /// Apply a gold delta, flooring at zero.
    pub fn adjust_gold(&mut self, delta: i64) {
        let gold = (self.gold as i128 + delta as i128).clamp(0, u64::MAX as i128);
        self.gold = gold as u64;
    }

    /// Add an item, merging into an existing stack with the same name.
    pub fn add_item(&mut self, item: Item) {
        match self.inventory.iter_mut().find(|i| i.name == item.name) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => self.inventory.push(Item {
                is_equipped: false,
                ..item
            }),
        }
    }

    /// Drop every stack whose name is listed.
    pub fn remove_items(&mut self, names: &[String]) {
        self.inventory.retain(|i| !names.contains(&i.name));
    }

    /// Add a companion, replacing any existing one with the same name.
    pub fn add_companion(&mut self, mut companion: Companion) {
        companion.hp = companion.hp.min(companion.max_hp);
        match self.companions.iter_mut().find(|c| c.name == companion.name) {
            Some(existing) => *existing = companion,
            None => self.companions.push(companion),
        }
    }

    pub fn remove_companions(&mut self, names: &[String]) {
        self.companions.retain(|c| !names.contains(&c.name));
    }

    /// Restore hit points and spell slots.
    pub fn long_rest(&mut self) {
        self.hp = self.max_hp;
        self.spell_slots.refill();
    }
}

// ============================================================================
// Location
// ============================================================================

/// Where the character currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationState {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub npcs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

// ============================================================================
// Chat Log
// ============================================================================

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The player.
    User,
    /// The narrator.
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One entry in the adventure log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: now_millis(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
