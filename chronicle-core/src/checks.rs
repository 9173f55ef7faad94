//! Ability and skill checks.
//!
//! Checks are a d20 plus modifiers. The `resolve_*` functions take the raw
//! die so the arithmetic can be exercised without randomness; the rolling
//! forms draw the die and delegate to them.

use crate::dice::roll_d20;
use crate::tables::proficiency_bonus;
use crate::world::{score_modifier, Ability, Skill};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Raw rolls below this become this value under Silver Tongue.
pub const SILVER_TONGUE_FLOOR: u32 = 10;

/// What was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckKind {
    Ability(Ability),
    Skill(Skill),
}

/// A resolved check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub kind: CheckKind,
    /// The number the d20 showed.
    pub raw_roll: u32,
    /// The die value after substitutions such as Silver Tongue.
    pub effective_roll: u32,
    pub modifier: i32,
    /// Zero for plain ability checks.
    pub proficiency: i32,
    pub total: i32,
}

impl CheckResult {
    pub fn is_critical(&self) -> bool {
        self.raw_roll == 20
    }

    pub fn is_fumble(&self) -> bool {
        self.raw_roll == 1
    }

    /// True when the die was raised by Silver Tongue.
    pub fn silver_tongue(&self) -> bool {
        self.effective_roll != self.raw_roll
    }

    /// The message forwarded to the narrator.
    pub fn describe(&self) -> String {
        match self.kind {
            CheckKind::Ability(ability) => {
                let mut text = format!(
                    "[Ability Check: {}] Total: **{}** (Die: {} + Mod: {})",
                    ability.abbreviation(),
                    self.total,
                    self.raw_roll,
                    self.modifier
                );
                if self.is_critical() {
                    text.push_str(" CRITICAL!");
                }
                if self.is_fumble() {
                    text.push_str(" FAILURE!");
                }
                text
            }
            CheckKind::Skill(skill) => {
                let die = if self.silver_tongue() {
                    format!("{}->{} (Silver Tongue)", self.raw_roll, self.effective_roll)
                } else {
                    self.raw_roll.to_string()
                };
                format!(
                    "[Skill Check: {}] Total: **{}** (Die: {} + Mod: {} + Prof: {})",
                    skill.name(),
                    self.total,
                    die,
                    self.modifier,
                    self.proficiency
                )
            }
        }
    }
}

/// Persuasion and Deception never roll below 10.
pub fn silver_tongue_applies(skill: Skill) -> bool {
    matches!(skill, Skill::Persuasion | Skill::Deception)
}

/// `raw_roll + floor((score - 10) / 2)`.
pub fn resolve_ability_check(ability: Ability, score: u8, raw_roll: u32) -> CheckResult {
    let modifier = score_modifier(score);
    CheckResult {
        kind: CheckKind::Ability(ability),
        raw_roll,
        effective_roll: raw_roll,
        modifier,
        proficiency: 0,
        total: raw_roll as i32 + modifier,
    }
}

/// `effective_roll + floor((score - 10) / 2) + proficiency_bonus(level)`.
pub fn resolve_skill_check(skill: Skill, score: u8, level: u8, raw_roll: u32) -> CheckResult {
    let effective_roll = if silver_tongue_applies(skill) {
        raw_roll.max(SILVER_TONGUE_FLOOR)
    } else {
        raw_roll
    };
    let modifier = score_modifier(score);
    let proficiency = proficiency_bonus(level);
    CheckResult {
        kind: CheckKind::Skill(skill),
        raw_roll,
        effective_roll,
        modifier,
        proficiency,
        total: effective_roll as i32 + modifier + proficiency,
    }
}

pub fn ability_check(ability: Ability, score: u8) -> CheckResult {
    ability_check_with_rng(ability, score, &mut rand::thread_rng())
}

pub fn ability_check_with_rng<R: Rng>(ability: Ability, score: u8, rng: &mut R) -> CheckResult {
    resolve_ability_check(ability, score, roll_d20(rng))
}

pub fn skill_check(skill: Skill, score: u8, level: u8) -> CheckResult {
    skill_check_with_rng(skill, score, level, &mut rand::thread_rng())
}

pub fn skill_check_with_rng<R: Rng>(skill: Skill, score: u8, level: u8, rng: &mut R) -> CheckResult {
    resolve_skill_check(skill, score, level, roll_d20(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_ability_check_arithmetic() {
        let result = resolve_ability_check(Ability::Strength, 8, 12);
        assert_eq!(result.modifier, -1);
        assert_eq!(result.total, 11);
        assert_eq!(result.proficiency, 0);
        assert_eq!(
            result.describe(),
            "[Ability Check: STR] Total: **11** (Die: 12 + Mod: -1)"
        );
    }

    #[test]
    fn test_ability_check_flags() {
        let crit = resolve_ability_check(Ability::Charisma, 18, 20);
        assert!(crit.is_critical());
        assert!(crit.describe().ends_with("CRITICAL!"));

        let fumble = resolve_ability_check(Ability::Charisma, 18, 1);
        assert!(fumble.is_fumble());
        assert_eq!(fumble.total, 5);
        assert!(fumble.describe().ends_with("FAILURE!"));
    }

    #[test]
    fn test_silver_tongue_substitutes_low_rolls() {
        let result = resolve_skill_check(Skill::Persuasion, 18, 5, 3);
        assert_eq!(result.raw_roll, 3);
        assert_eq!(result.effective_roll, 10);
        assert!(result.silver_tongue());
        assert_eq!(result.modifier, 4);
        assert_eq!(result.proficiency, 3);
        assert_eq!(result.total, 17);
        assert_eq!(
            result.describe(),
            "[Skill Check: Persuasion] Total: **17** (Die: 3->10 (Silver Tongue) + Mod: 4 + Prof: 3)"
        );
    }

    #[test]
    fn test_silver_tongue_at_level_four() {
        let result = resolve_skill_check(Skill::Deception, 18, 4, 9);
        assert_eq!(result.effective_roll, 10);
        assert_eq!(result.total, 10 + 4 + 2);
    }

    #[test]
    fn test_silver_tongue_leaves_high_rolls_alone() {
        let result = resolve_skill_check(Skill::Persuasion, 18, 5, 10);
        assert!(!result.silver_tongue());
        let result = resolve_skill_check(Skill::Persuasion, 18, 5, 15);
        assert_eq!(result.effective_roll, 15);
        assert_eq!(result.total, 22);
    }

    #[test]
    fn test_other_skills_keep_raw_roll() {
        let result = resolve_skill_check(Skill::Stealth, 14, 5, 3);
        assert_eq!(result.effective_roll, 3);
        assert_eq!(result.total, 3 + 2 + 3);
        assert_eq!(
            result.describe(),
            "[Skill Check: Stealth] Total: **8** (Die: 3 + Mod: 2 + Prof: 3)"
        );
    }

    #[test]
    fn test_rolled_checks_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let result = skill_check_with_rng(Skill::Persuasion, 18, 5, &mut rng);
            assert!((1..=20).contains(&result.raw_roll));
            assert!(result.effective_roll >= SILVER_TONGUE_FLOOR);
            assert!((17..=27).contains(&result.total));

            let result = ability_check_with_rng(Ability::Wisdom, 10, &mut rng);
            assert!((1..=20).contains(&result.total));
        }
    }
}
