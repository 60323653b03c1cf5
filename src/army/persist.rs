//! Persisted shapes: roster exports, the saved-roster list, and the
//! local-storage snapshot.
//!
//! The page owns the storage medium. It asks for a snapshot after every
//! mutation (`GET /api/state`) and writes it to `localStorage`; on page load it
//! posts the stored string back (`POST /api/state/restore`). Snapshots are the
//! JSON of [`PersistedState`] encoded as URL-safe unpadded base64.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::army::error::PersistError;
use crate::army::model::RosterEntry;
use crate::army::roster::Roster;
use crate::army::rules::ListRules;

/// A single roster exported to a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterExport {
    pub faction: String,
    pub units: Vec<RosterEntry>,
    #[serde(default)]
    pub total_points: u32,
    #[serde(default)]
    pub exported_at: String,
}

impl RosterExport {
    pub fn new(faction: &str, roster: &Roster, exported_at: &str) -> Self {
        Self {
            faction: faction.to_string(),
            units: roster.entries().to_vec(),
            total_points: roster.total_points(),
            exported_at: exported_at.to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Parse an export and rebuild its roster. Slot lists that exceed their
    /// unit's capacity, or points below a unit's base cost, reject the whole
    /// file.
    pub fn from_json(json: &str) -> Result<(String, Roster), PersistError> {
        let export: RosterExport = serde_json::from_str(json)?;
        let roster = Roster::from_entries(export.units);
        roster.check_loaded()?;
        Ok((export.faction.to_lowercase(), roster))
    }
}

/// One named entry of the saved-roster list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRoster {
    pub name: String,
    #[serde(default)]
    pub faction: String,
    pub units: Vec<RosterEntry>,
}

/// Saved rosters in the order they were first saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedRosters(Vec<SavedRoster>);

impl SavedRosters {
    pub fn list(&self) -> &[SavedRoster] {
        &self.0
    }

    pub fn get(&self, name: &str) -> Option<&SavedRoster> {
        self.0.iter().find(|s| s.name == name)
    }

    /// Save under `name`, replacing an existing entry of the same name in place.
    pub fn save(&mut self, name: &str, faction: &str, roster: &Roster) -> Result<(), PersistError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PersistError::EmptyName);
        }
        let saved = SavedRoster {
            name: name.to_string(),
            faction: faction.to_string(),
            units: roster.entries().to_vec(),
        };
        match self.0.iter_mut().find(|s| s.name == name) {
            Some(existing) => *existing = saved,
            None => self.0.push(saved),
        }
        tracing::debug!(name, "roster saved");
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<SavedRoster, PersistError> {
        let index = self
            .0
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| PersistError::UnknownSavedRoster(name.to_string()))?;
        Ok(self.0.remove(index))
    }

    /// A saved entry as a live roster, checked like an import.
    pub fn load(&self, name: &str) -> Result<(String, Roster), PersistError> {
        let saved = self
            .get(name)
            .ok_or_else(|| PersistError::UnknownSavedRoster(name.to_string()))?;
        let roster = Roster::from_entries(saved.units.clone());
        roster.check_loaded()?;
        Ok((saved.faction.clone(), roster))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "[]".to_string())
    }

    /// Replace the list with an exported one. Every entry is bounds-checked
    /// before anything is replaced.
    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        let list: SavedRosters = serde_json::from_str(json)?;
        for saved in &list.0 {
            Roster::from_entries(saved.units.clone()).check_loaded()?;
        }
        Ok(list)
    }
}

/// Everything that survives a page reload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedState {
    pub faction: String,
    pub roster: Roster,
    pub saved: SavedRosters,
    pub rules: ListRules,
}

pub fn encode_snapshot(state: &PersistedState) -> String {
    let json = serde_json::to_vec(state).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a snapshot. An empty string decodes to the default state.
pub fn decode_snapshot(encoded: &str) -> Result<PersistedState, PersistError> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Ok(PersistedState::default());
    }
    let bytes = URL_SAFE_NO_PAD.decode(encoded)?;
    let state: PersistedState = serde_json::from_slice(&bytes)?;
    state.roster.check_loaded()?;
    state.rules.validate()?;
    Ok(state)
}
