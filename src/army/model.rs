//! Shared data model for units, upgrades and roster entries.
//!
//! Everything here is already normalized: factions, keywords and restriction
//! tags are lower-cased (restrictions also trimmed) by `catalog` at the load
//! boundary, so the eligibility and validation code compares with plain `==`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unit category used for roster composition limits. Variant order is the
/// display order of the roster panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Commander,
    Operative,
    Corps,
    SpecialForces,
    Support,
    Heavy,
}

impl Rank {
    pub const ALL: [Rank; 6] = [
        Rank::Commander,
        Rank::Operative,
        Rank::Corps,
        Rank::SpecialForces,
        Rank::Support,
        Rank::Heavy,
    ];

    /// Parse a rank name as catalogs spell it. Case, surrounding whitespace and
    /// the separator in "special forces" are ignored.
    pub fn parse(raw: &str) -> Option<Rank> {
        let folded: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_lowercase();
        match folded.as_str() {
            "commander" => Some(Rank::Commander),
            "operative" => Some(Rank::Operative),
            "corps" => Some(Rank::Corps),
            "specialforces" => Some(Rank::SpecialForces),
            "support" => Some(Rank::Support),
            "heavy" => Some(Rank::Heavy),
            _ => None,
        }
    }

    /// Lower-case label, also the value restriction tags are compared with.
    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Commander => "commander",
            Rank::Operative => "operative",
            Rank::Corps => "corps",
            Rank::SpecialForces => "special forces",
            Rank::Support => "support",
            Rank::Heavy => "heavy",
        }
    }

    /// Whether a normalized restriction tag names this rank.
    pub fn matches_tag(self, tag: &str) -> bool {
        Rank::parse(tag) == Some(self)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog entry for a unit. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitTemplate {
    pub id: String,
    pub name: String,
    /// One entry for ordinary units, several for multi-faction units.
    pub factions: Vec<String>,
    pub rank: Rank,
    pub points: u32,
    /// First keyword doubles as the unit type.
    pub keywords: Vec<String>,
    pub allowed_upgrade_slots: Vec<String>,
    #[serde(default)]
    pub per_slot_max: BTreeMap<String, u32>,
    #[serde(default)]
    pub restrictions: Vec<String>,
    /// Copies of this unit allowed in one roster. `None` = unlimited.
    #[serde(default)]
    pub max_per_roster: Option<u32>,
    #[serde(default)]
    pub image: String,
}

impl UnitTemplate {
    pub fn unit_type(&self) -> &str {
        self.keywords.first().map(String::as_str).unwrap_or("")
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k == keyword)
    }

    pub fn belongs_to(&self, faction: &str) -> bool {
        self.factions.iter().any(|f| f == faction)
    }

    /// How many upgrades the unit may hold in `slot`. Slots the unit does not
    /// list have no capacity; listed slots default to one.
    pub fn slot_capacity(&self, slot: &str) -> u32 {
        if !self.allowed_upgrade_slots.iter().any(|s| s == slot) {
            return 0;
        }
        self.per_slot_max.get(slot).copied().unwrap_or(1)
    }
}

/// Catalog entry for an upgrade card. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeDefinition {
    pub id: String,
    pub name: String,
    pub points: u32,
    pub slot_type: String,
    /// Empty = any faction.
    pub factions: Vec<String>,
    /// Empty = any unit.
    pub restrictions: Vec<String>,
    pub is_unique: bool,
    #[serde(default)]
    pub image: String,
}

/// A unit instance in the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    /// Roster-local instance id; two copies of one template differ only here.
    pub uid: u64,
    #[serde(flatten)]
    pub unit: UnitTemplate,
    /// Slot type -> chosen upgrade ids, in selection order.
    #[serde(default)]
    pub selected_upgrades: BTreeMap<String, Vec<String>>,
    pub current_points: u32,
}

impl RosterEntry {
    pub fn new(uid: u64, unit: UnitTemplate) -> Self {
        let current_points = unit.points;
        Self {
            uid,
            unit,
            selected_upgrades: BTreeMap::new(),
            current_points,
        }
    }

    pub fn base_points(&self) -> u32 {
        self.unit.points
    }

    pub fn selected_in(&self, slot: &str) -> &[String] {
        self.selected_upgrades
            .get(slot)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_upgrade(&self, upgrade_id: &str) -> bool {
        self.selected_upgrades
            .values()
            .any(|ids| ids.iter().any(|id| id == upgrade_id))
    }

    pub fn upgrade_count(&self) -> usize {
        self.selected_upgrades.values().map(Vec::len).sum()
    }
}
