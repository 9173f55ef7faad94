//! The built-in campaign: Darian "Danny" Crane at The Golden Thorn.

use crate::spells::SpellDefinition;
use crate::tables;
use crate::world::{AbilityScores, Character, Companion, Item, LocationState, Spell, SpellSlots};

/// Title used for transcripts.
pub const CAMPAIGN_TITLE: &str = "The Chronicles of Darian";

/// How the player is labelled in transcripts.
pub const PLAYER_LABEL: &str = "Darian Crane";

/// How the narrator is labelled in transcripts.
pub const NARRATOR_LABEL: &str = "Dungeon Master";

/// The action sent to open a new adventure.
pub const OPENING_ACTION: &str =
    "Describe the scene as I stand before the notice board of The Golden Thorn. What do I see?";

const STARTING_SPELLS: &[SpellDefinition] = &[
    SpellDefinition {
        name: "Vicious Mockery",
        level: 0,
        school: "Enchantment",
        casting_time: "1 action",
        range: "60 feet",
        components: "V",
        duration: "Instantaneous",
        description: "You unleash a string of insults laced with subtle enchantments. The target makes a Wisdom save or takes 2d4 psychic damage and has disadvantage on its next attack roll.",
    },
    SpellDefinition {
        name: "Mage Hand",
        level: 0,
        school: "Conjuration",
        casting_time: "1 action",
        range: "30 feet",
        components: "V, S",
        duration: "1 minute",
        description: "A spectral floating hand appears. It can open doors and carry up to 10 pounds, but cannot attack or activate magic items.",
    },
    SpellDefinition {
        name: "Prestidigitation",
        level: 0,
        school: "Transmutation",
        casting_time: "1 action",
        range: "10 feet",
        components: "V, S",
        duration: "Up to 1 hour",
        description: "A minor magical trick: harmless sparks, cleaning or soiling an object, warming or chilling food, or a small illusory mark.",
    },
    SpellDefinition {
        name: "Charm Person",
        level: 1,
        school: "Enchantment",
        casting_time: "1 action",
        range: "30 feet",
        components: "V, S",
        duration: "1 hour",
        description: "A humanoid you can see makes a Wisdom save, with advantage if you are fighting it. On a failure it regards you as a friendly acquaintance until the spell ends or you harm it.",
    },
    SpellDefinition {
        name: "Healing Word",
        level: 1,
        school: "Evocation",
        casting_time: "1 bonus action",
        range: "60 feet",
        components: "V",
        duration: "Instantaneous",
        description: "A creature you can see regains hit points equal to 1d4 + your spellcasting ability modifier.",
    },
    SpellDefinition {
        name: "Suggestion",
        level: 2,
        school: "Enchantment",
        casting_time: "1 action",
        range: "30 feet",
        components: "V, M",
        duration: "Concentration, up to 8 hours",
        description: "You suggest a course of activity of a sentence or two to a creature that can hear and understand you. On a failed Wisdom save it pursues that course as best it can.",
    },
    SpellDefinition {
        name: "Hypnotic Pattern",
        level: 3,
        school: "Illusion",
        casting_time: "1 action",
        range: "120 feet",
        components: "S, M",
        duration: "Concentration, up to 1 minute",
        description: "A twisting pattern of colours fills a 30-foot cube. Creatures that see it make a Wisdom save or are charmed, incapacitated and have speed 0.",
    },
    SpellDefinition {
        name: "Tongues",
        level: 3,
        school: "Divination",
        casting_time: "1 action",
        range: "Touch",
        components: "V, M",
        duration: "1 hour",
        description: "The touched creature understands any spoken language it hears, and anyone who knows a language understands it when it speaks.",
    },
];

/// The starting character sheet.
pub fn default_character() -> Character {
    let level = 5;
    let mut character = Character {
        name: "Darian 'Danny' Crane".to_string(),
        class_name: "Bard (College of Eloquence)".to_string(),
        level,
        xp: tables::xp_for_level(level),
        hp: 38,
        max_hp: 38,
        ac: 14,
        gold: 50_000,
        abilities: AbilityScores::new(8, 14, 14, 12, 10, 18),
        features: vec![
            "Silver Tongue (minimum 10 on Persuasion/Deception)".to_string(),
            "Unsettling Words".to_string(),
            "Bardic Inspiration (d8)".to_string(),
            "Jack of All Trades".to_string(),
        ],
        spells: STARTING_SPELLS.iter().map(Spell::from).collect(),
        spell_slots: SpellSlots::full(tables::spell_slots_for_level(level)),
        inventory: vec![
            Item::new("Fine Clothes (Silk Suits)", 5).with_description("Impeccable tailoring."),
            Item::new("Rapier", 1).with_description("An elegant blade."),
            Item::new("Viol (Masterwork)", 1).with_description("An exquisite instrument."),
            Item::new("Signet Ring (House Crane)", 1),
            Item::new("Carriage Deed", 1),
        ],
        companions: vec![
            Companion {
                name: "Jeeves".to_string(),
                kind: "Human Coachman".to_string(),
                description: "Loyal, quiet, an expert driver.".to_string(),
                hp: 20,
                max_hp: 20,
            },
            Companion {
                name: "Crane Stallions".to_string(),
                kind: "Horses (x6)".to_string(),
                description: "Prize-winning white stallions.".to_string(),
                hp: 15,
                max_hp: 15,
            },
        ],
    };
    character.sort_spells();
    character
}

/// The starting location.
pub fn default_location() -> LocationState {
    LocationState {
        name: "The Golden Thorn".to_string(),
        description:
            "A bustling crossroads inn. The scent of spices and toasted almonds fills the air."
                .to_string(),
        npcs: vec![
            "Innkeeper".to_string(),
            "Nervous Merchant".to_string(),
            "Magistrate's Messenger".to_string(),
        ],
        image_url: None,
    }
}
