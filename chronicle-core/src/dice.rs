//! Dice rolling.
//!
//! Single-die rolls for the manual dice tray and the d20 behind every check.
//! Each roll has a `*_with_rng` form so tests can inject a seeded generator.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error type for dice rolling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("Unknown die: {0}")]
    UnknownDie(String),
}

/// Dice offered by the dice tray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieType {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
    D100,
}

impl DieType {
    pub fn sides(&self) -> u32 {
        match self {
            DieType::D4 => 4,
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
            DieType::D20 => 20,
            DieType::D100 => 100,
        }
    }

    pub fn from_sides(sides: u32) -> Option<DieType> {
        match sides {
            4 => Some(DieType::D4),
            6 => Some(DieType::D6),
            8 => Some(DieType::D8),
            10 => Some(DieType::D10),
            12 => Some(DieType::D12),
            20 => Some(DieType::D20),
            100 => Some(DieType::D100),
            _ => None,
        }
    }

    /// Parse `d20`, `D20` or `20`.
    pub fn parse(notation: &str) -> Result<DieType, DiceError> {
        let trimmed = notation.trim();
        let digits = trimmed
            .strip_prefix(['d', 'D'])
            .unwrap_or(trimmed);
        let sides: u32 = digits
            .parse()
            .map_err(|_| DiceError::UnknownDie(notation.to_string()))?;
        DieType::from_sides(sides).ok_or(DiceError::InvalidDieSize(sides))
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// Roll a die with `sides` faces, uniform in `[1, sides]`.
pub fn roll_die(sides: u32) -> Result<u32, DiceError> {
    roll_die_with_rng(sides, &mut rand::thread_rng())
}

/// Roll with a specific RNG (useful for testing).
pub fn roll_die_with_rng<R: Rng>(sides: u32, rng: &mut R) -> Result<u32, DiceError> {
    if sides == 0 {
        return Err(DiceError::InvalidDieSize(sides));
    }
    Ok(rng.gen_range(1..=sides))
}

/// Roll a single d20.
pub fn roll_d20<R: Rng>(rng: &mut R) -> u32 {
    rng.gen_range(1..=20)
}

/// The outcome of a dice tray roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieRoll {
    pub die: DieType,
    pub value: u32,
}

impl DieRoll {
    pub fn roll(die: DieType) -> Self {
        Self::roll_with_rng(die, &mut rand::thread_rng())
    }

    pub fn roll_with_rng<R: Rng>(die: DieType, rng: &mut R) -> Self {
        Self {
            die,
            value: rng.gen_range(1..=die.sides()),
        }
    }

    /// A natural 20 on a d20.
    pub fn is_critical(&self) -> bool {
        self.die == DieType::D20 && self.value == 20
    }

    /// A natural 1 on a d20.
    pub fn is_fumble(&self) -> bool {
        self.die == DieType::D20 && self.value == 1
    }

    /// Text forwarded to the narrator, e.g. `Rolled d20: 20 (CRITICAL!)`.
    pub fn describe(&self) -> String {
        let mut text = format!("Rolled {}: {}", self.die, self.value);
        if self.is_critical() {
            text.push_str(" (CRITICAL!)");
        }
        if self.is_fumble() {
            text.push_str(" (CRITICAL FAILURE!)");
        }
        text
    }
}

impl fmt::Display for DieRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}
