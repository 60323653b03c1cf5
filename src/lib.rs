//! Muster in-browser WASM server.
//!
//! Exports `handle_request(method, path, query, body)` for the Web Worker
//! bridge to call. Uses `matchit` for URL routing, the same router engine
//! that powers Axum.
//!
//! Catalog documents are fetched by the page and posted to
//! `/api/catalog/*/load`; everything after that (the unit browser, the
//! roster, upgrade selection, validation, saved lists and import/export)
//! runs in WASM and answers with HTML fragments for HTMX to swap.

use wasm_bindgen::prelude::*;

pub mod army;
pub mod routes;

/// Process an HTTP-like request and return an HTML fragment.
///
/// Called from JavaScript (Web Worker) via wasm-bindgen.
///
/// # Arguments
/// * `method` — HTTP method ("GET" or "POST")
/// * `path`   — URL path (e.g., "/api/roster/add")
/// * `query`  — Query string (e.g., "?rank=corps&page=1")
/// * `body`   — Form data or a raw JSON document. Empty string for GET requests.
///
/// # Returns
/// An HTML string fragment suitable for HTMX to swap into the DOM. The
/// snapshot and JSON summary routes return plain text instead.
#[wasm_bindgen]
pub fn handle_request(method: &str, path: &str, query: &str, body: &str) -> String {
    let mut router = matchit::Router::new();

    // Catalogs
    router.insert("/api/catalog/units", "units").ok();
    router.insert("/api/catalog/units/load", "units_load").ok();
    router.insert("/api/catalog/upgrades", "upgrades").ok();
    router.insert("/api/catalog/upgrades/load", "upgrades_load").ok();

    // Roster
    router.insert("/api/roster", "roster").ok();
    router.insert("/api/roster/add", "roster_add").ok();
    router.insert("/api/roster/remove", "roster_remove").ok();
    router.insert("/api/roster/move", "roster_move").ok();
    router.insert("/api/roster/upgrade", "roster_upgrade").ok();
    router.insert("/api/roster/reset", "roster_reset").ok();
    router.insert("/api/roster/reconcile", "roster_reconcile").ok();
    router.insert("/api/roster/summary", "roster_summary").ok();
    router.insert("/api/roster/export", "roster_export").ok();
    router.insert("/api/roster/import", "roster_import").ok();

    // Saved rosters
    router.insert("/api/rosters", "saved").ok();
    router.insert("/api/rosters/save", "saved_save").ok();
    router.insert("/api/rosters/load", "saved_load").ok();
    router.insert("/api/rosters/delete", "saved_delete").ok();
    router.insert("/api/rosters/export", "saved_export").ok();
    router.insert("/api/rosters/import", "saved_import").ok();

    // Rules and local-storage persistence
    router.insert("/api/rules", "rules").ok();
    router.insert("/api/state", "state").ok();
    router.insert("/api/state/restore", "state_restore").ok();

    match router.at(path) {
        Ok(matched) => match (*matched.value, method) {
            ("units", "GET") => routes::catalog::handle_units_get(query),
            ("units_load", "POST") => routes::catalog::handle_units_load_post(query, body),
            ("upgrades", "GET") => routes::catalog::handle_upgrades_get(query),
            ("upgrades_load", "POST") => routes::catalog::handle_upgrades_load_post(query, body),

            ("roster", "GET") => routes::roster::handle_roster_get(query),
            ("roster_add", "POST") => routes::roster::handle_add_post(body),
            ("roster_remove", "POST") => routes::roster::handle_remove_post(body),
            ("roster_move", "POST") => routes::roster::handle_move_post(body),
            ("roster_upgrade", "POST") => routes::roster::handle_upgrade_post(body),
            ("roster_reset", "POST") => routes::roster::handle_reset_post(body),
            ("roster_reconcile", "POST") => routes::roster::handle_reconcile_post(body),
            ("roster_summary", "GET") => routes::roster::handle_summary_get(query),
            ("roster_export", "GET") => routes::persist::handle_roster_export_get(query),
            ("roster_import", "POST") => routes::persist::handle_roster_import_post(body),

            ("saved", "GET") => routes::persist::handle_saved_get(query),
            ("saved_save", "POST") => routes::persist::handle_saved_save_post(body),
            ("saved_load", "POST") => routes::persist::handle_saved_load_post(body),
            ("saved_delete", "POST") => routes::persist::handle_saved_delete_post(body),
            ("saved_export", "GET") => routes::persist::handle_saved_export_get(query),
            ("saved_import", "POST") => routes::persist::handle_saved_import_post(body),

            ("rules", "GET") => routes::rules::handle_rules_get(query),
            ("rules", "POST") => routes::rules::handle_rules_post(body),
            ("state", "GET") => routes::persist::handle_state_get(query),
            ("state_restore", "POST") => routes::persist::handle_state_restore_post(body),

            _ => method_not_allowed(),
        },
        Err(_) => not_found(),
    }
}

fn not_found() -> String {
    r#"<span class="text-red-500">404 — route not found</span>"#.to_string()
}

fn method_not_allowed() -> String {
    r#"<span class="text-red-500">405 — method not allowed</span>"#.to_string()
}
