//! Application state container.
//!
//! Uses `thread_local!` + `RefCell` for safe mutable access in single-threaded
//! WASM. The Web Worker keeps the module alive, so state persists across
//! `handle_request` calls for the whole browser session. Catalogs are rebuilt
//! from fetched JSON on each page load; everything in [`PersistedState`] is
//! restored from local storage.

use std::cell::RefCell;

use crate::army::catalog::{UnitCatalog, UpgradeCatalog};
use crate::army::persist::{self, PersistedState, SavedRosters};
use crate::army::roster::{Roster, StaleUpgrade};
use crate::army::rules::ListRules;
use crate::army::validator::{self, Summary};

#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Lower-cased faction of the roster being built. Empty until chosen.
    pub faction: String,
    pub units: UnitCatalog,
    pub upgrades: UpgradeCatalog,
    pub roster: Roster,
    pub saved: SavedRosters,
    pub rules: ListRules,
}

impl AppState {
    pub fn summary(&self) -> Summary {
        validator::summarize_with(self.roster.entries(), &self.rules)
    }

    /// Switch faction. A different faction clears the roster, since its
    /// units came from the previous catalog.
    pub fn select_faction(&mut self, faction: &str) {
        let faction = faction.trim().to_lowercase();
        if faction != self.faction {
            tracing::debug!(from = %self.faction, to = %faction, "faction changed, roster reset");
            self.faction = faction;
            self.roster.reset();
        }
    }

    /// Install a freshly loaded roster, reconciling it against whatever
    /// upgrade catalogs are loaded. A roster of another faction unloads the
    /// unit catalog, so the page has to fetch the matching one.
    pub fn install_roster(&mut self, faction: String, mut roster: Roster) -> Vec<StaleUpgrade> {
        let mut faction = faction.trim().to_lowercase();
        if faction.is_empty() {
            faction = self.units.faction().to_string();
        }
        let stale = if self.upgrades.is_empty() {
            Vec::new()
        } else {
            roster.reconcile(&self.upgrades)
        };
        if !self.units.is_empty() && self.units.faction() != faction {
            tracing::debug!(
                loaded = %self.units.faction(),
                faction = %faction,
                "unit catalog unloaded for another faction"
            );
            self.units = UnitCatalog::default();
        }
        self.faction = faction;
        self.roster = roster;
        stale
    }

    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            faction: self.faction.clone(),
            roster: self.roster.clone(),
            saved: self.saved.clone(),
            rules: self.rules.clone(),
        }
    }

    /// Restore persisted fields. A matching unit catalog stays loaded, and the
    /// roster is reconciled like an import.
    pub fn restore(&mut self, persisted: PersistedState) -> Vec<StaleUpgrade> {
        self.saved = persisted.saved;
        self.rules = persisted.rules;
        self.install_roster(persisted.faction, persisted.roster)
    }
}

thread_local! {
    static STATE: RefCell<AppState> = RefCell::new(AppState::default());
}

/// Execute a closure with read access to the app state.
pub fn with_state<F, R>(f: F) -> R
where
    F: FnOnce(&AppState) -> R,
{
    STATE.with(|s| f(&s.borrow()))
}

/// Execute a closure with mutable access to the app state.
pub fn with_state_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut AppState) -> R,
{
    STATE.with(|s| f(&mut s.borrow_mut()))
}

/// Replace the entire app state (used by tests and full resets).
pub fn replace_state(new_state: AppState) {
    STATE.with(|s| {
        *s.borrow_mut() = new_state;
    });
}

/// Base64 snapshot of the persisted part of the state.
pub fn export_snapshot() -> String {
    with_state(|state| persist::encode_snapshot(&state.persisted()))
}

/// Restore from a snapshot produced by [`export_snapshot`].
pub fn import_snapshot(encoded: &str) -> Result<(), String> {
    let persisted = persist::decode_snapshot(encoded).map_err(|e| e.to_string())?;
    let stale = with_state_mut(|state| state.restore(persisted));
    if !stale.is_empty() {
        tracing::debug!(count = stale.len(), "restored snapshot dropped unavailable upgrades");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::army::model::Rank;
    use crate::army::model::fixtures::{unit, upgrade, upgrade_catalog, with_slot};

    #[test]
    fn default_state_is_empty() {
        replace_state(AppState::default());
        with_state(|s| {
            assert!(s.faction.is_empty());
            assert!(s.roster.is_empty());
            assert!(s.units.is_empty());
            assert_eq!(s.rules, ListRules::default());
        });
    }

    #[test]
    fn switching_faction_resets_roster() {
        let mut state = AppState::default();
        state.select_faction("Rebels");
        state.roster.add_unit(&unit("leia", "rebels", Rank::Commander, 90)).unwrap();

        state.select_faction("rebels");
        assert_eq!(state.roster.len(), 1);

        state.select_faction("imperials");
        assert_eq!(state.faction, "imperials");
        assert!(state.roster.is_empty());
    }

    #[test]
    fn snapshot_roundtrip_through_thread_local() {
        replace_state(AppState::default());
        with_state_mut(|s| {
            s.select_faction("rebels");
            s.roster.add_unit(&unit("leia", "rebels", Rank::Commander, 90)).unwrap();
            s.rules.point_cap = 1000;
        });

        let encoded = export_snapshot();
        replace_state(AppState::default());
        with_state(|s| assert!(s.roster.is_empty()));

        import_snapshot(&encoded).unwrap();
        with_state(|s| {
            assert_eq!(s.faction, "rebels");
            assert_eq!(s.roster.len(), 1);
            assert_eq!(s.rules.point_cap, 1000);
            assert_eq!(s.summary().total_points, 90);
        });

        replace_state(AppState::default());
    }

    #[test]
    fn roster_of_another_faction_unloads_unit_catalog() {
        let leia = unit("leia", "rebels", Rank::Commander, 90);
        let vader = unit("vader", "imperials", Rank::Commander, 190);
        let mut state = AppState::default();
        state.units = UnitCatalog::new("rebels", vec![leia]);
        state.faction = "rebels".to_string();

        let mut roster = Roster::new();
        roster.add_unit(&vader).unwrap();
        state.install_roster("Imperials".to_string(), roster.clone());
        assert_eq!(state.faction, "imperials");
        assert!(state.units.is_empty());

        state.units = UnitCatalog::new("imperials", vec![vader]);
        state.install_roster("imperials".to_string(), roster);
        assert_eq!(state.units.len(), 1);
    }

    #[test]
    fn restore_reconciles_against_loaded_upgrades() {
        let trooper = with_slot(unit("rebel_troopers", "rebels", Rank::Corps, 40), "gear", 1);
        let mut roster = Roster::new();
        let uid = roster.add_unit(&trooper).unwrap();
        let offered = upgrade_catalog(vec![upgrade("g1", "gear", 5)]);
        roster.toggle_upgrade(uid, "gear", "g1", &offered).unwrap();
        let persisted = PersistedState {
            faction: "rebels".to_string(),
            roster,
            ..PersistedState::default()
        };

        let mut state = AppState::default();
        state.upgrades = upgrade_catalog(vec![upgrade("g1", "gear", 8)]);
        assert!(state.restore(persisted.clone()).is_empty());
        assert_eq!(state.roster.total_points(), 48);

        state.upgrades = upgrade_catalog(vec![upgrade("g2", "gear", 8)]);
        assert_eq!(state.restore(persisted).len(), 1);
        assert_eq!(state.roster.total_points(), 40);
    }

    #[test]
    fn import_invalid_snapshot_returns_error() {
        assert!(import_snapshot("not base64 !!").is_err());
    }
}
