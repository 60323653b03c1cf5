//! Persistence routes — roster export/import, the saved-roster list, and the
//! local-storage snapshot.
//!
//! The worker has no storage of its own. After each swap the page calls
//! `GET /api/state` and writes the string to `localStorage`; on load it posts
//! the stored string to `POST /api/state/restore`.

use crate::army::persist::{RosterExport, SavedRosters};
use crate::army::state::{self, with_state, with_state_mut};
use crate::routes::roster::render_roster_panel;
use crate::routes::util::{
    download_script, error_fragment, escape_html, get_param, ok_fragment, parse_form_body,
    parse_query,
};

// ── GET /api/roster/export ─────────────────────────────────────────

/// Handle GET /api/roster/export?now={ISO timestamp}
/// Returns a <script> that downloads the roster as JSON. The timestamp comes
/// from the page because the worker has no clock.
pub fn handle_roster_export_get(query: &str) -> String {
    let params = parse_query(query);
    let now = get_param(&params, "now").unwrap_or("");
    let (filename, json) = with_state(|state| {
        let export = RosterExport::new(&state.faction, &state.roster, now);
        let faction = if state.faction.is_empty() { "army" } else { state.faction.as_str() };
        (format!("{faction}-army.json"), export.to_json())
    });
    download_script(&filename, "application/json", &json)
}

// ── POST /api/roster/import ────────────────────────────────────────

/// Handle POST /api/roster/import
/// Body: a roster export document (raw JSON).
pub fn handle_roster_import_post(body: &str) -> String {
    match RosterExport::from_json(body) {
        Ok((faction, roster)) => {
            let count = roster.len();
            let stale = with_state_mut(|state| state.install_roster(faction, roster));
            tracing::debug!(count, stale = stale.len(), "roster imported");
            if stale.is_empty() {
                ok_fragment(&format!("Imported {count} units"))
            } else {
                ok_fragment(&format!(
                    "Imported {count} units; dropped {} unavailable upgrade(s)",
                    stale.len()
                ))
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "roster import rejected");
            error_fragment(&format!("Import failed: {e}"))
        }
    }
}

// ── /api/rosters — saved list ──────────────────────────────────────

/// Handle GET /api/rosters
pub fn handle_saved_get(_query: &str) -> String {
    with_state(|state| render_saved_list(&state.saved))
}

/// Handle POST /api/rosters/save
/// Body: name={name}. Replaces a saved roster of the same name.
pub fn handle_saved_save_post(body: &str) -> String {
    let params = parse_form_body(body);
    let name = get_param(&params, "name").unwrap_or("");
    with_state_mut(|state| {
        let result = state.saved.save(name, &state.faction, &state.roster);
        let list = render_saved_list(&state.saved);
        match result {
            Ok(()) => list,
            Err(e) => format!("{}{}", error_fragment(&e.to_string()), list),
        }
    })
}

/// Handle POST /api/rosters/load
/// Body: name={name}. Replaces the current roster and returns the roster panel.
pub fn handle_saved_load_post(body: &str) -> String {
    let params = parse_form_body(body);
    let name = get_param(&params, "name").unwrap_or("");
    with_state_mut(|state| match state.saved.load(name) {
        Ok((faction, roster)) => {
            let faction = if faction.is_empty() { state.faction.clone() } else { faction };
            state.install_roster(faction, roster);
            render_roster_panel(state)
        }
        Err(e) => error_fragment(&e.to_string()),
    })
}

/// Handle POST /api/rosters/delete
/// Body: name={name}
pub fn handle_saved_delete_post(body: &str) -> String {
    let params = parse_form_body(body);
    let name = get_param(&params, "name").unwrap_or("");
    with_state_mut(|state| {
        let result = state.saved.delete(name);
        let list = render_saved_list(&state.saved);
        match result {
            Ok(_) => list,
            Err(e) => format!("{}{}", error_fragment(&e.to_string()), list),
        }
    })
}

/// Handle GET /api/rosters/export
pub fn handle_saved_export_get(_query: &str) -> String {
    let json = with_state(|state| state.saved.to_json());
    download_script("saved-armies.json", "application/json", &json)
}

/// Handle POST /api/rosters/import
/// Body: a saved-list export (JSON array). Replaces the whole list.
pub fn handle_saved_import_post(body: &str) -> String {
    match SavedRosters::from_json(body) {
        Ok(list) => {
            let count = list.list().len();
            with_state_mut(|state| state.saved = list);
            ok_fragment(&format!("Imported {count} saved armies"))
        }
        Err(e) => {
            tracing::warn!(error = %e, "saved list import rejected");
            error_fragment(&format!("Import failed: {e}"))
        }
    }
}

fn render_saved_list(saved: &SavedRosters) -> String {
    let mut html = String::with_capacity(1024);
    html.push_str(r#"<ul class="saved-armies">"#);
    if saved.list().is_empty() {
        html.push_str(r#"<li class="text-cyan-200">No saved armies.</li>"#);
    }
    for entry in saved.list() {
        let points: u32 = entry.units.iter().map(|u| u.current_points).sum();
        html.push_str(&format!(
            r##"<li><span>{name}</span> <span>{faction} · {count} units · {points} pts</span>
  <button hx-post="/api/rosters/load" hx-vals='{{"name":"{name}"}}' hx-target="#army-container" hx-swap="innerHTML">Load</button>
  <button hx-post="/api/rosters/delete" hx-vals='{{"name":"{name}"}}' hx-target="closest ul" hx-swap="outerHTML">Delete</button></li>"##,
            name = escape_html(&entry.name),
            faction = escape_html(&entry.faction),
            count = entry.units.len(),
        ));
    }
    html.push_str("</ul>");
    html
}

// ── /api/state — local-storage snapshot ────────────────────────────

/// Handle GET /api/state
/// Returns the persisted state as a base64 string for `localStorage`.
pub fn handle_state_get(_query: &str) -> String {
    state::export_snapshot()
}

/// Handle POST /api/state/restore
/// Body: the stored snapshot, raw or as `state={snapshot}`.
pub fn handle_state_restore_post(body: &str) -> String {
    let params = parse_form_body(body);
    let encoded = get_param(&params, "state").unwrap_or(body.trim());
    match state::import_snapshot(encoded) {
        Ok(()) => "ok".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "snapshot restore failed");
            format!("error: {e}")
        }
    }
}
