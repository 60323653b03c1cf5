//! Error types for roster mutation, catalog loading, rules and persistence.
//!
//! Every variant is recoverable: routes render it as an inline message and
//! leave the state as it was before the failed call.

use crate::army::model::Rank;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    #[error("Slot {slot} is full (max {max})")]
    SlotFull { slot: String, max: u32 },

    #[error("{upgrade} is unique and already taken by another unit")]
    DuplicateUniqueUpgrade { upgrade: String },

    #[error("Only {max} of {unit} allowed per roster")]
    UnitMaxExceeded { unit: String, max: u32 },

    #[error("{unit} needs a unit it can join before it can be added")]
    UnitNotEligible { unit: String },

    #[error("{upgrade} cannot be equipped in the {slot} slot of this unit")]
    UpgradeNotEligible { upgrade: String, slot: String },

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("No roster entry #{0}")]
    UnknownEntry(u64),

    #[error("Position {index} is outside a roster of {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog must be a list of records or an object with a \"{0}\" list")]
    NotAList(&'static str),

    #[error("Missing slot parameter")]
    MissingSlot,

    #[error("Missing faction parameter")]
    MissingFaction,
}

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("Invalid rules JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown rank in rules: {0}")]
    UnknownRank(String),

    #[error("Limit for {rank} has min {min} above max {max}")]
    InvertedBound { rank: Rank, min: u32, max: u32 },

    #[error("Limit for {0} is given more than once")]
    DuplicateRank(Rank),
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid roster JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{unit} holds {count} upgrades in {slot} but only {max} fit")]
    SlotOverflow {
        unit: String,
        slot: String,
        count: usize,
        max: u32,
    },

    #[error("{unit} is recorded at {points} pts, below its base cost of {base}")]
    PointsBelowBase { unit: String, points: u32, base: u32 },

    #[error("Stored rules are invalid: {0}")]
    Rules(#[from] RulesError),

    #[error("No saved roster named {0}")]
    UnknownSavedRoster(String),

    #[error("Roster name cannot be empty")]
    EmptyName,
}
