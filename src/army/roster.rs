//! The roster: an ordered list of unit instances and the mutations the UI
//! performs on it.
//!
//! Every mutation either succeeds completely or returns a [`RosterError`] and
//! leaves the roster untouched. `current_points` on each entry is kept equal
//! to base points plus the points of its selected upgrades.

use serde::{Deserialize, Serialize};

use crate::army::catalog::UpgradeCatalog;
use crate::army::eligibility::{is_unit_eligible_for_roster, is_upgrade_eligible};
use crate::army::error::{PersistError, RosterError};
use crate::army::model::{RosterEntry, UnitTemplate};

/// Result of a successful upgrade toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Selected,
    Deselected,
}

/// An upgrade id dropped by [`Roster::reconcile`] because the live catalog no
/// longer has it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleUpgrade {
    pub uid: u64,
    pub slot: String,
    pub upgrade_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredRoster")]
pub struct Roster {
    entries: Vec<RosterEntry>,
    next_uid: u64,
}

/// Wire shape of a stored roster. Only the entries are read back; uids and
/// the uid counter are rebuilt by [`Roster::from_entries`].
#[derive(Deserialize)]
struct StoredRoster {
    #[serde(default)]
    entries: Vec<RosterEntry>,
}

impl From<StoredRoster> for Roster {
    fn from(stored: StoredRoster) -> Self {
        Roster::from_entries(stored.entries)
    }
}

/// Base cost plus the live catalog price of every selection. Ids the catalog
/// does not know count as zero until [`Roster::reconcile`] drops them.
fn live_points(entry: &RosterEntry, catalog: &UpgradeCatalog) -> u32 {
    entry
        .selected_upgrades
        .iter()
        .flat_map(|(slot, ids)| ids.iter().filter_map(move |id| catalog.find(slot, id)))
        .fold(entry.base_points(), |total, upgrade| {
            total.saturating_add(upgrade.points)
        })
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a roster from stored entries. Uids are reassigned in roster
    /// order, and an entry without upgrades is reset to its base cost.
    pub fn from_entries(mut entries: Vec<RosterEntry>) -> Self {
        for (uid, entry) in (0u64..).zip(entries.iter_mut()) {
            entry.uid = uid;
            entry.selected_upgrades.retain(|_, ids| !ids.is_empty());
            if entry.selected_upgrades.is_empty() {
                entry.current_points = entry.base_points();
            }
        }
        let next_uid = entries.len() as u64;
        Self { entries, next_uid }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<RosterEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, uid: u64) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.uid == uid)
    }

    pub fn total_points(&self) -> u32 {
        self.entries.iter().map(|e| e.current_points).sum()
    }

    pub fn copies_of(&self, unit_id: &str) -> usize {
        self.entries.iter().filter(|e| e.unit.id == unit_id).count()
    }

    /// Add a fresh copy of `unit` at the end of the roster. Returns its uid.
    pub fn add_unit(&mut self, unit: &UnitTemplate) -> Result<u64, RosterError> {
        if let Some(max) = unit.max_per_roster {
            if self.copies_of(&unit.id) >= max as usize {
                return Err(RosterError::UnitMaxExceeded {
                    unit: unit.name.clone(),
                    max,
                });
            }
        }
        if !is_unit_eligible_for_roster(unit, &self.entries) {
            return Err(RosterError::UnitNotEligible {
                unit: unit.name.clone(),
            });
        }

        let uid = self.next_uid;
        self.next_uid += 1;
        self.entries.push(RosterEntry::new(uid, unit.clone()));
        tracing::debug!(uid, unit = %unit.id, "unit added to roster");
        Ok(uid)
    }

    pub fn remove(&mut self, uid: u64) -> Result<RosterEntry, RosterError> {
        let index = self.index_of(uid)?;
        let removed = self.entries.remove(index);
        tracing::debug!(uid, unit = %removed.unit.id, "unit removed from roster");
        Ok(removed)
    }

    /// Move the entry at `from` so it ends up at `to`. Order is cosmetic and
    /// has no effect on validation.
    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<(), RosterError> {
        let len = self.entries.len();
        for index in [from, to] {
            if index >= len {
                return Err(RosterError::IndexOutOfRange { index, len });
            }
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.next_uid = 0;
    }

    /// Select or deselect `upgrade_id` in `slot` of entry `uid`.
    ///
    /// Deselecting is always allowed, even for an id the catalog has since
    /// dropped. Either way the entry's points are recounted from `catalog`.
    pub fn toggle_upgrade(
        &mut self,
        uid: u64,
        slot: &str,
        upgrade_id: &str,
        catalog: &UpgradeCatalog,
    ) -> Result<Toggle, RosterError> {
        let index = self.index_of(uid)?;

        if self.entries[index].selected_in(slot).iter().any(|id| id == upgrade_id) {
            let entry = &mut self.entries[index];
            if let Some(ids) = entry.selected_upgrades.get_mut(slot) {
                ids.retain(|id| id != upgrade_id);
                if ids.is_empty() {
                    entry.selected_upgrades.remove(slot);
                }
            }
            entry.current_points = live_points(entry, catalog);
            tracing::debug!(uid, slot, upgrade = upgrade_id, "upgrade deselected");
            return Ok(Toggle::Deselected);
        }

        let entry = &self.entries[index];
        let not_eligible = || RosterError::UpgradeNotEligible {
            upgrade: upgrade_id.to_string(),
            slot: slot.to_string(),
        };
        if !is_upgrade_eligible(&entry.unit, slot, upgrade_id, catalog.slot(slot)) {
            return Err(not_eligible());
        }
        let upgrade = catalog.find(slot, upgrade_id).ok_or_else(not_eligible)?;
        if upgrade.is_unique
            && self
                .entries
                .iter()
                .any(|other| other.uid != uid && other.has_upgrade(upgrade_id))
        {
            return Err(RosterError::DuplicateUniqueUpgrade {
                upgrade: upgrade.name.clone(),
            });
        }
        let max = entry.unit.slot_capacity(slot);
        if entry.selected_in(slot).len() >= max as usize {
            return Err(RosterError::SlotFull {
                slot: slot.to_string(),
                max,
            });
        }

        let entry = &mut self.entries[index];
        entry
            .selected_upgrades
            .entry(slot.to_string())
            .or_default()
            .push(upgrade_id.to_string());
        entry.current_points = live_points(entry, catalog);
        tracing::debug!(
            uid,
            slot,
            upgrade = upgrade_id,
            points = entry.current_points,
            "upgrade selected"
        );
        Ok(Toggle::Selected)
    }

    /// Drop selections the live catalog no longer knows and recompute every
    /// entry's points from it. Returns what was dropped.
    pub fn reconcile(&mut self, catalog: &UpgradeCatalog) -> Vec<StaleUpgrade> {
        let mut stale = Vec::new();
        for entry in &mut self.entries {
            let uid = entry.uid;
            for (slot, ids) in &mut entry.selected_upgrades {
                ids.retain(|id| {
                    let known = catalog.find(slot, id).is_some();
                    if !known {
                        stale.push(StaleUpgrade {
                            uid,
                            slot: slot.clone(),
                            upgrade_id: id.clone(),
                        });
                    }
                    known
                });
            }
            entry.selected_upgrades.retain(|_, ids| !ids.is_empty());
            entry.current_points = live_points(entry, catalog);
        }
        if !stale.is_empty() {
            tracing::warn!(count = stale.len(), "dropped upgrades missing from catalog");
        }
        stale
    }

    /// Reject a loaded roster whose slot lists exceed their capacity or whose
    /// recorded points fall below an entry's base cost.
    pub fn check_loaded(&self) -> Result<(), PersistError> {
        for entry in &self.entries {
            if entry.current_points < entry.base_points() {
                return Err(PersistError::PointsBelowBase {
                    unit: entry.unit.name.clone(),
                    points: entry.current_points,
                    base: entry.base_points(),
                });
            }
            for (slot, ids) in &entry.selected_upgrades {
                let max = entry.unit.slot_capacity(slot);
                if ids.len() > max as usize {
                    return Err(PersistError::SlotOverflow {
                        unit: entry.unit.name.clone(),
                        slot: slot.clone(),
                        count: ids.len(),
                        max,
                    });
                }
            }
        }
        Ok(())
    }

    fn index_of(&self, uid: u64) -> Result<usize, RosterError> {
        self.entries
            .iter()
            .position(|e| e.uid == uid)
            .ok_or(RosterError::UnknownEntry(uid))
    }
}
