//! Prompt text and the structured-output schema sent to the model.

use super::{CharacterSummary, ChatSettings, ResponseLength};
use crate::campaign::OPENING_ACTION;
use crate::world::{ChatMessage, Role};
use gemini::Content;
use serde_json::{json, Value};

const BASE_INSTRUCTION: &str = r#"You are the Dungeon Master for a solo D&D 5e campaign.
The player is **Darian "Danny" Crane** (level 5 Bard, College of Eloquence).
Danny is outrageously rich (50,000 gp), travels in a carriage drawn by six horses and driven by a coachman named Jeeves.
He is modelled on Denny Crane from Boston Legal: arrogant, charming, obsessed with his own name, convinced he has never lost a legal or social battle.

**Current Setting:**
The city of Veridia lies behind him. The player is at "The Golden Thorn", a bustling crossroads inn on the trade road to Eryndale.
A notice board bears the magistrate's seal: "Independent party required for an urgent internal investigation."

**Narration Rules (IMPORTANT):**
1. You act as the DM. Narrate the world, the NPCs and combat in English.
2. **Theatrical co-author:** if the player writes a short or bare input ("I open the door", "I persuade him"), do NOT just answer "ok". Perform the action theatrically in Danny Crane's flamboyant manner and describe HOW he does it.
3. **Do not steal the outcome:** enrich the description of the action, but if it needs an uncertain die roll, ask for the roll before narrating success or failure.

**Game Rules:**
1. Use the D&D 5e rules.
2. Manage XP and levelling automatically.
3. If an NPC joins or leaves the party, update the companions list.
4. **Options:** at the end of EVERY response ALWAYS provide 3 concise, distinct options ("suggestedActions") for what the player could do next.

**CRITICAL OUTPUT FORMAT:**
Respond with a JSON object that follows the response schema. Do NOT write plain text outside the JSON."#;

impl ResponseLength {
    /// Style instruction appended to the system prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            ResponseLength::Short => "Be extremely brief and direct. At most 2-3 sentences.",
            ResponseLength::Normal => "Keep responses concise but evocative.",
            ResponseLength::Long => "Be very descriptive, verbose, theatrical and atmospheric.",
        }
    }
}

/// The full system instruction for the given settings.
pub fn system_instruction(settings: &ChatSettings) -> String {
    format!(
        "{BASE_INSTRUCTION}\n\nLength Preference: {}",
        settings.response_length.instruction()
    )
}

/// The per-turn user message: a state header followed by the action.
pub fn context_message(summary: &CharacterSummary, action: &str) -> String {
    let slots = summary
        .spell_slots
        .iter()
        .map(|(level, count)| format!("\"{level}\":{count}"))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "[Current State: HP {}/{}, Gold: {}, Level: {}, XP: {}]\n\
         [Current Companions: {}]\n\
         [Remaining Spell Slots: {{{slots}}}]\n\
         Player Action: {action}",
        summary.hp,
        summary.max_hp,
        summary.gold,
        summary.level,
        summary.xp,
        summary.companions.join(", "),
    )
}

/// Convert the visible chat log into model turns.
///
/// A log that opens with narration gets the opening action in front of it,
/// since that narration answered it.
pub fn history_contents(messages: &[ChatMessage]) -> Vec<Content> {
    let mut contents = Vec::with_capacity(messages.len() + 1);
    if messages.first().is_some_and(|m| m.role == Role::Model) {
        contents.push(Content::user(OPENING_ACTION));
    }
    contents.extend(messages.iter().map(|m| match m.role {
        Role::User => Content::user(m.text.clone()),
        Role::Model => Content::model(m.text.clone()),
    }));
    contents
}

/// JSON schema constraining the model's reply.
pub fn response_schema() -> Value {
    let string_list = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
    json!({
        "type": "OBJECT",
        "properties": {
            "narrative": {
                "type": "STRING",
                "description": "The DM's narration and reply to the player."
            },
            "suggestedActions": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Exactly 3 short action options for the player (e.g. 'Attack the goblin', 'Try to persuade him', 'Run')."
            },
            "locationUpdate": {
                "type": "OBJECT",
                "properties": {
                    "name": { "type": "STRING" },
                    "description": { "type": "STRING" },
                    "npcs": string_list.clone()
                }
            },
            "characterUpdate": {
                "type": "OBJECT",
                "properties": {
                    "hpChange": {
                        "type": "INTEGER",
                        "description": "Negative for damage, positive for healing. 0 if unchanged."
                    },
                    "xpAwarded": { "type": "INTEGER" },
                    "goldChange": { "type": "INTEGER" },
                    "itemsAdded": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "name": { "type": "STRING" },
                                "quantity": { "type": "INTEGER" },
                                "description": { "type": "STRING" }
                            }
                        }
                    },
                    "itemsRemoved": string_list,
                    "companionsAdded": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "name": { "type": "STRING" },
                                "type": { "type": "STRING" },
                                "description": { "type": "STRING" },
                                "hp": { "type": "INTEGER" },
                                "maxHp": { "type": "INTEGER" }
                            }
                        }
                    },
                    "companionsRemoved": {
                        "type": "ARRAY",
                        "items": { "type": "STRING" },
                        "description": "Names of companions leaving the party."
                    }
                }
            }
        },
        "required": ["narrative", "suggestedActions"]
    })
}
