//! Catalog loading and browsing.
//!
//! Unit and upgrade documents are authored by hand and fetched by the page,
//! so every field is optional on the wire. Records are normalized here, once:
//! tags lower-cased, restrictions trimmed, missing lists empty, missing or
//! negative points zero. Nothing downstream re-checks field presence.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::army::eligibility::is_unit_eligible_for_roster;
use crate::army::error::CatalogError;
use crate::army::model::{Rank, RosterEntry, UnitTemplate, UpgradeDefinition};

// ── Wire records ───────────────────────────────────────────────────
//
// Field helpers coerce instead of failing, so a stray `null` or a quoted
// number costs one field, not the document.

fn number_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// `"rebels"`, `["rebels", "mercenary"]` or `null`. Non-string items drop out.
fn lenient_list<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_points<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
    Ok(number_of(&Value::deserialize(de)?))
}

fn lenient_count<'de, D: Deserializer<'de>>(de: D) -> Result<Option<u32>, D::Error> {
    Ok(number_of(&Value::deserialize(de)?).and_then(|n| u32::try_from(n).ok()))
}

fn lenient_bool<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Bool(b) => b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn lenient_counts<'de, D: Deserializer<'de>>(de: D) -> Result<BTreeMap<String, u32>, D::Error> {
    let Value::Object(map) = Value::deserialize(de)? else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(slot, max)| Some((slot, u32::try_from(number_of(&max)?).ok()?)))
        .collect())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUnit {
    #[serde(default, deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, alias = "factions", deserialize_with = "lenient_list")]
    faction: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    rank: Option<String>,
    #[serde(default, deserialize_with = "lenient_points")]
    points: Option<i64>,
    #[serde(default, deserialize_with = "lenient_list")]
    keywords: Vec<String>,
    #[serde(default, alias = "unit_type", deserialize_with = "lenient_string")]
    unit_type: Option<String>,
    #[serde(
        default,
        alias = "allowed_upgrade_slots",
        alias = "upgrades",
        deserialize_with = "lenient_list"
    )]
    allowed_upgrade_slots: Vec<String>,
    #[serde(
        default,
        alias = "per_slot_max",
        alias = "perSlotMax",
        deserialize_with = "lenient_counts"
    )]
    per_slot_max_count: BTreeMap<String, u32>,
    #[serde(default, deserialize_with = "lenient_list")]
    restrictions: Vec<String>,
    #[serde(
        default,
        alias = "max_per_roster",
        alias = "maxCount",
        deserialize_with = "lenient_count"
    )]
    max_per_roster: Option<u32>,
    #[serde(default, alias = "img", deserialize_with = "lenient_string")]
    image: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUpgrade {
    #[serde(default, deserialize_with = "lenient_string")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_points")]
    points: Option<i64>,
    #[serde(
        default,
        alias = "slot_type",
        alias = "type",
        deserialize_with = "lenient_string"
    )]
    slot_type: Option<String>,
    #[serde(default, alias = "faction", deserialize_with = "lenient_list")]
    factions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    restrictions: Vec<String>,
    #[serde(
        default,
        alias = "is_unique",
        alias = "unique",
        deserialize_with = "lenient_bool"
    )]
    is_unique: bool,
    #[serde(default, alias = "img", deserialize_with = "lenient_string")]
    image: Option<String>,
}

/// A document is either a bare array or an object wrapping one under `key`.
/// Records that are not objects are skipped one by one.
fn records<T: DeserializeOwned>(json: &str, key: &'static str) -> Result<Vec<T>, CatalogError> {
    let items = match serde_json::from_str::<Value>(json)? {
        Value::Array(items) => items,
        Value::Object(mut doc) => match doc.remove(key) {
            Some(Value::Array(items)) => items,
            _ => return Err(CatalogError::NotAList(key)),
        },
        _ => return Err(CatalogError::NotAList(key)),
    };
    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping malformed catalog record");
                None
            }
        })
        .collect())
}

fn lower_all(tags: Vec<String>) -> Vec<String> {
    tags.into_iter().map(|t| t.trim().to_lowercase()).collect()
}

fn clamp_points(points: Option<i64>) -> u32 {
    points.unwrap_or(0).clamp(0, i64::from(u32::MAX)) as u32
}

fn normalize_unit(raw: RawUnit, faction: &str) -> Option<UnitTemplate> {
    let id = raw.id.filter(|s| !s.trim().is_empty())?;
    let Some(rank) = raw.rank.as_deref().and_then(Rank::parse) else {
        tracing::warn!(unit = %id, rank = ?raw.rank, "skipping unit without a known rank");
        return None;
    };

    let mut factions = lower_all(raw.faction);
    factions.retain(|f| !f.is_empty());
    if factions.is_empty() && !faction.is_empty() {
        factions.push(faction.to_lowercase());
    }

    let mut keywords = lower_all(raw.keywords);
    keywords.retain(|k| !k.is_empty());
    if let Some(unit_type) = raw.unit_type.map(|t| t.trim().to_lowercase()) {
        if !unit_type.is_empty() && keywords.first() != Some(&unit_type) {
            keywords.retain(|k| k != &unit_type);
            keywords.insert(0, unit_type);
        }
    }

    Some(UnitTemplate {
        name: raw.name.unwrap_or_else(|| id.clone()),
        factions,
        rank,
        points: clamp_points(raw.points),
        keywords,
        allowed_upgrade_slots: raw
            .allowed_upgrade_slots
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        per_slot_max: raw.per_slot_max_count,
        // Blank tags are kept: they make the unit unaddable.
        restrictions: lower_all(raw.restrictions),
        max_per_roster: raw.max_per_roster,
        image: raw.image.unwrap_or_default(),
        id,
    })
}

fn normalize_upgrade(raw: RawUpgrade, slot: &str) -> Option<UpgradeDefinition> {
    let id = raw.id.filter(|s| !s.trim().is_empty())?;
    let mut factions = lower_all(raw.factions);
    factions.retain(|f| !f.is_empty());

    Some(UpgradeDefinition {
        name: raw.name.unwrap_or_else(|| id.clone()),
        points: clamp_points(raw.points),
        slot_type: raw
            .slot_type
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slot.to_string()),
        factions,
        // Blank tags are kept: no unit can carry one.
        restrictions: lower_all(raw.restrictions),
        is_unique: raw.is_unique,
        image: raw.image.unwrap_or_default(),
        id,
    })
}

/// Parse a unit document for `faction`. Records without an id or a known rank
/// are skipped; the first record wins when ids repeat.
pub fn parse_units(json: &str, faction: &str) -> Result<Vec<UnitTemplate>, CatalogError> {
    let mut seen = HashSet::new();
    Ok(records::<RawUnit>(json, "units")?
        .into_iter()
        .filter_map(|raw| normalize_unit(raw, faction))
        .filter(|u| seen.insert(u.id.clone()))
        .collect())
}

/// Parse an upgrade document for `slot`. Records tagged with a different
/// slot type are dropped.
pub fn parse_upgrades(json: &str, slot: &str) -> Result<Vec<UpgradeDefinition>, CatalogError> {
    if slot.trim().is_empty() {
        return Err(CatalogError::MissingSlot);
    }
    let mut seen = HashSet::new();
    Ok(records::<RawUpgrade>(json, "upgrades")?
        .into_iter()
        .filter_map(|raw| normalize_upgrade(raw, slot))
        .filter(|u| {
            if u.slot_type != slot {
                tracing::warn!(
                    upgrade = %u.id,
                    slot = %u.slot_type,
                    expected = slot,
                    "skipping upgrade from another slot"
                );
                return false;
            }
            seen.insert(u.id.clone())
        })
        .collect())
}

// ── Loaded catalogs ────────────────────────────────────────────────

/// Units of the currently selected faction.
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    faction: String,
    units: Vec<UnitTemplate>,
}

impl UnitCatalog {
    pub fn new(faction: &str, units: Vec<UnitTemplate>) -> Self {
        Self {
            faction: faction.to_lowercase(),
            units,
        }
    }

    pub fn load_json(faction: &str, json: &str) -> Result<Self, CatalogError> {
        if faction.trim().is_empty() {
            return Err(CatalogError::MissingFaction);
        }
        let units = parse_units(json, faction)?;
        Ok(Self::new(faction, units))
    }

    pub fn faction(&self) -> &str {
        &self.faction
    }

    pub fn units(&self) -> &[UnitTemplate] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&UnitTemplate> {
        self.units.iter().find(|u| u.id == id)
    }
}

/// Upgrade definitions keyed by slot type, one document per slot.
#[derive(Debug, Clone, Default)]
pub struct UpgradeCatalog {
    slots: BTreeMap<String, Vec<UpgradeDefinition>>,
}

impl UpgradeCatalog {
    pub fn insert_slot(&mut self, slot: &str, upgrades: Vec<UpgradeDefinition>) {
        self.slots.insert(slot.to_string(), upgrades);
    }

    pub fn load_slot_json(&mut self, slot: &str, json: &str) -> Result<usize, CatalogError> {
        let upgrades = parse_upgrades(json, slot)?;
        let count = upgrades.len();
        self.insert_slot(slot, upgrades);
        Ok(count)
    }

    /// Definitions for `slot`; empty when that slot was never loaded.
    pub fn slot(&self, slot: &str) -> &[UpgradeDefinition] {
        self.slots.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, slot: &str, id: &str) -> Option<&UpgradeDefinition> {
        self.slot(slot).iter().find(|u| u.id == id)
    }

    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

// ── Catalog browser ────────────────────────────────────────────────

pub const DEFAULT_PER_PAGE: usize = 12;
pub const MAX_PER_PAGE: usize = 100;

/// Filters applied to the unit browser grid.
#[derive(Debug, Clone, Default)]
pub struct UnitFilter {
    pub rank: Option<Rank>,
    /// Case-insensitive substring over id, name and keywords.
    pub search: String,
    /// Hide units whose restrictions the roster does not satisfy yet.
    pub eligible_only: bool,
}

impl UnitFilter {
    pub fn matches(&self, unit: &UnitTemplate, roster: &[RosterEntry]) -> bool {
        if let Some(rank) = self.rank {
            if unit.rank != rank {
                return false;
            }
        }
        if !self.search.is_empty() {
            let needle = self.search.to_lowercase();
            let haystack =
                format!("{} {} {}", unit.id, unit.name, unit.keywords.join(" ")).to_lowercase();
            if !haystack.contains(&needle) {
                return false;
            }
        }
        !self.eligible_only || is_unit_eligible_for_roster(unit, roster)
    }
}

/// One page of the filtered unit grid.
#[derive(Debug)]
pub struct UnitPage<'a> {
    pub units: Vec<&'a UnitTemplate>,
    pub total: usize,
    pub has_more: bool,
}

/// Filter `units` in catalog order and cut out page `page` (0-based).
/// `per` is clamped to `1..=MAX_PER_PAGE`, with 0 meaning the default.
pub fn browse_units<'a>(
    units: &'a [UnitTemplate],
    filter: &UnitFilter,
    roster: &[RosterEntry],
    page: usize,
    per: usize,
) -> UnitPage<'a> {
    let per = match per {
        0 => DEFAULT_PER_PAGE,
        n => n.min(MAX_PER_PAGE),
    };
    let matching: Vec<&UnitTemplate> = units.iter().filter(|u| filter.matches(u, roster)).collect();
    let total = matching.len();
    let start = page.saturating_mul(per);
    if start >= total {
        return UnitPage {
            units: Vec::new(),
            total,
            has_more: false,
        };
    }
    let end = (start + per).min(total);
    UnitPage {
        units: matching[start..end].to_vec(),
        total,
        has_more: end < total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::army::eligibility::filter_upgrades;

    const REBEL_UNITS: &str = r#"[
        {"id":"luke","name":"Luke Skywalker","rank":"Commander","points":160,
         "keywords":["Trooper","Jedi"],"allowedUpgradeSlots":["force","force","gear"],
         "perSlotMaxCount":{"force":2},"maxPerRoster":1,"image":"luke.png"},
        {"id":"rebel_troopers","name":"Rebel Troopers","rank":"corps","points":40,
         "unitType":"trooper","allowedUpgradeSlots":["heavy_weapon","gear"]},
        {"id":"comms_droid","name":"Comms Droid","rank":"special_forces","points":-5,
         "restrictions":[" Attached "]},
        {"id":"at_rt","rank":"walker","points":55},
        {"name":"no id","rank":"corps"},
        {"id":"luke","name":"Duplicate Luke","rank":"commander","points":1}
    ]"#;

    #[test]
    fn normalizes_unit_records() {
        let units = parse_units(REBEL_UNITS, "Rebels").unwrap();
        let ids: Vec<&str> = units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["luke", "rebel_troopers", "comms_droid"]);

        let luke = &units[0];
        assert_eq!(luke.factions, vec!["rebels"]);
        assert_eq!(luke.rank, Rank::Commander);
        assert_eq!(luke.keywords, vec!["trooper", "jedi"]);
        assert_eq!(luke.slot_capacity("force"), 2);
        assert_eq!(luke.slot_capacity("gear"), 1);
        assert_eq!(luke.max_per_roster, Some(1));

        let troopers = &units[1];
        assert_eq!(troopers.unit_type(), "trooper");

        let droid = &units[2];
        assert_eq!(droid.points, 0);
        assert_eq!(droid.rank, Rank::SpecialForces);
        assert_eq!(droid.restrictions, vec!["attached"]);
        assert_eq!(droid.name, "Comms Droid");
    }

    #[test]
    fn multi_faction_unit_keeps_its_own_factions() {
        let units = parse_units(
            r#"{"units":[{"id":"boba","rank":"operative","points":140,
                "faction":["Mercenary","Imperials"]}]}"#,
            "imperials",
        )
        .unwrap();
        assert_eq!(units[0].factions, vec!["mercenary", "imperials"]);
    }

    #[test]
    fn normalizes_upgrade_records() {
        let upgrades = parse_upgrades(
            r#"[
                {"id":"g1","name":"Targeting Scopes","points":4},
                {"id":"g2","points":8,"faction":"Imperials","restrictions":["Trooper",""]},
                {"id":"u1","points":3,"isUnique":true,"slotType":"gear"},
                {"id":"f1","points":5,"slotType":"force"}
            ]"#,
            "gear",
        )
        .unwrap();
        assert_eq!(upgrades.len(), 3);
        assert_eq!(upgrades[0].slot_type, "gear");
        assert!(upgrades[0].factions.is_empty());
        assert_eq!(upgrades[1].factions, vec!["imperials"]);
        assert_eq!(upgrades[1].restrictions, vec!["trooper", ""]);
        assert_eq!(upgrades[1].name, "g2");
        assert!(upgrades[2].is_unique);
    }

    #[test]
    fn blank_upgrade_tag_is_offered_to_no_unit() {
        let units = parse_units(REBEL_UNITS, "rebels").unwrap();
        let upgrades = parse_upgrades(
            r#"[{"id":"g1","points":4,"restrictions":[" "]},{"id":"g2","points":2}]"#,
            "gear",
        )
        .unwrap();
        assert_eq!(upgrades[0].restrictions, vec![""]);
        for unit in &units {
            let offered = filter_upgrades(unit, "gear", &upgrades);
            let ids: Vec<&str> = offered.iter().map(|u| u.id.as_str()).collect();
            assert_eq!(ids, vec!["g2"], "{}", unit.id);
        }
    }

    #[test]
    fn sloppy_fields_cost_the_field_not_the_document() {
        let units = parse_units(
            r#"[
                {"id":"a","rank":"corps","points":"40","keywords":null,"restrictions":null},
                "not a record",
                {"id":"b","rank":"support","points":null,"perSlotMaxCount":{"gear":"2","x":-1},
                 "maxPerRoster":"one","allowedUpgradeSlots":["gear",7]}
            ]"#,
            "rebels",
        )
        .unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].points, 40);
        assert!(units[0].keywords.is_empty());
        assert!(units[0].restrictions.is_empty());
        assert_eq!(units[1].points, 0);
        assert_eq!(units[1].allowed_upgrade_slots, vec!["gear"]);
        assert_eq!(units[1].slot_capacity("gear"), 2);
        assert_eq!(units[1].max_per_roster, None);

        let upgrades = parse_upgrades(
            r#"{"upgrades":[{"id":"g1","points":"5","isUnique":"true","faction":null},{"id":3}]}"#,
            "gear",
        )
        .unwrap();
        assert_eq!(upgrades[0].points, 5);
        assert!(upgrades[0].is_unique);
        assert!(upgrades[0].factions.is_empty());
        assert_eq!(upgrades[1].id, "3");
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(parse_units("not json", "rebels"), Err(CatalogError::Json(_))));
        assert!(matches!(parse_units("{}", "rebels"), Err(CatalogError::NotAList("units"))));
        assert!(matches!(
            parse_upgrades(r#"{"upgrades":null}"#, "gear"),
            Err(CatalogError::NotAList("upgrades"))
        ));
        assert!(matches!(parse_upgrades("[]", " "), Err(CatalogError::MissingSlot)));
        assert!(matches!(
            UnitCatalog::load_json("", "[]"),
            Err(CatalogError::MissingFaction)
        ));
    }

    #[test]
    fn upgrade_catalog_lookup() {
        let mut catalog = UpgradeCatalog::default();
        assert_eq!(catalog.load_slot_json("gear", r#"[{"id":"g1","points":4}]"#).unwrap(), 1);
        assert_eq!(catalog.find("gear", "g1").map(|u| u.points), Some(4));
        assert!(catalog.find("force", "g1").is_none());
        assert!(catalog.slot("force").is_empty());
        assert_eq!(catalog.slot_names().collect::<Vec<_>>(), vec!["gear"]);
    }

    fn catalog() -> UnitCatalog {
        UnitCatalog::load_json("rebels", REBEL_UNITS).unwrap()
    }

    #[test]
    fn browse_filters_by_rank_and_search() {
        let catalog = catalog();
        let by_rank = UnitFilter {
            rank: Some(Rank::Corps),
            ..UnitFilter::default()
        };
        let page = browse_units(catalog.units(), &by_rank, &[], 0, 0);
        assert_eq!(page.total, 1);
        assert_eq!(page.units[0].id, "rebel_troopers");

        let by_keyword = UnitFilter {
            search: "JEDI".to_string(),
            ..UnitFilter::default()
        };
        let page = browse_units(catalog.units(), &by_keyword, &[], 0, 0);
        assert_eq!(page.units.len(), 1);
        assert_eq!(page.units[0].id, "luke");
    }

    #[test]
    fn browse_hides_ineligible_units_until_prerequisite_joins() {
        let catalog = catalog();
        let filter = UnitFilter {
            eligible_only: true,
            ..UnitFilter::default()
        };
        let page = browse_units(catalog.units(), &filter, &[], 0, 0);
        assert!(page.units.iter().all(|u| u.id != "comms_droid"));

        let mut host = catalog.find("rebel_troopers").unwrap().clone();
        host.keywords.push("attached".to_string());
        let roster = vec![RosterEntry::new(0, host)];
        let page = browse_units(catalog.units(), &filter, &roster, 0, 0);
        assert!(page.units.iter().any(|u| u.id == "comms_droid"));
    }

    #[test]
    fn browse_paginates() {
        let catalog = catalog();
        let all = UnitFilter::default();
        let first = browse_units(catalog.units(), &all, &[], 0, 2);
        assert_eq!(first.units.len(), 2);
        assert!(first.has_more);
        let second = browse_units(catalog.units(), &all, &[], 1, 2);
        assert_eq!(second.units.len(), 1);
        assert!(!second.has_more);
        let beyond = browse_units(catalog.units(), &all, &[], 9, 2);
        assert!(beyond.units.is_empty());
        assert_eq!(beyond.total, 3);
    }
}
