//! `/api/catalog/*` routes — loading fetched catalog documents and browsing
//! them.
//!
//! The page fetches `units/{faction}.json` and `upgrades/{slot}.json` itself
//! and posts the raw documents here; the query string carries the faction or
//! slot the document belongs to.

use crate::army::catalog::{self, UnitFilter};
use crate::army::eligibility::{self, is_unit_eligible_for_roster};
use crate::army::model::{Rank, UnitTemplate, UpgradeDefinition};
use crate::army::state::{with_state, with_state_mut};
use crate::routes::util::{
    error_fragment, escape_html, get_num, get_param, ok_fragment, parse_query,
};

// ── POST /api/catalog/units/load ───────────────────────────────────

/// Handle POST /api/catalog/units/load?faction={faction}
/// Body: the faction's unit document. Switching faction resets the roster.
pub fn handle_units_load_post(query: &str, body: &str) -> String {
    let params = parse_query(query);
    let faction = get_param(&params, "faction").unwrap_or("");
    match catalog::UnitCatalog::load_json(faction, body) {
        Ok(units) => {
            let count = units.len();
            with_state_mut(|state| {
                state.select_faction(faction);
                state.units = units;
            });
            tracing::debug!(faction, count, "unit catalog loaded");
            ok_fragment(&format!("Loaded {count} units"))
        }
        Err(e) => {
            tracing::warn!(faction, error = %e, "unit catalog rejected");
            error_fragment(&e.to_string())
        }
    }
}

// ── POST /api/catalog/upgrades/load ────────────────────────────────

/// Handle POST /api/catalog/upgrades/load?slot={slot}
/// Body: the slot's upgrade document.
pub fn handle_upgrades_load_post(query: &str, body: &str) -> String {
    let params = parse_query(query);
    let slot = get_param(&params, "slot").unwrap_or("");
    match with_state_mut(|state| state.upgrades.load_slot_json(slot, body)) {
        Ok(count) => {
            tracing::debug!(slot, count, "upgrade catalog loaded");
            ok_fragment(&format!("Loaded {count} {slot} upgrades"))
        }
        Err(e) => {
            tracing::warn!(slot, error = %e, "upgrade catalog rejected");
            error_fragment(&e.to_string())
        }
    }
}

// ── GET /api/catalog/units ─────────────────────────────────────────

/// Handle GET /api/catalog/units
///
/// Query parameters:
/// - `rank` — only units of this rank
/// - `search` — case-insensitive match on id, name and keywords
/// - `eligible` — "true" hides units the roster cannot take yet
/// - `page`, `per` — pagination for HTMX infinite scroll (defaults 0, 12)
pub fn handle_units_get(query: &str) -> String {
    let params = parse_query(query);
    let rank_raw = get_param(&params, "rank").unwrap_or("");
    let rank = if rank_raw.is_empty() {
        None
    } else {
        match Rank::parse(rank_raw) {
            Some(r) => Some(r),
            None => return error_fragment(&format!("Unknown rank: {rank_raw}")),
        }
    };
    let filter = UnitFilter {
        rank,
        search: get_param(&params, "search").unwrap_or("").to_string(),
        eligible_only: get_param(&params, "eligible") == Some("true"),
    };
    let page: usize = get_num(&params, "page").unwrap_or(0);
    let per: usize = get_num(&params, "per").unwrap_or(catalog::DEFAULT_PER_PAGE);

    with_state(|state| {
        if state.units.is_empty() {
            return r#"<p class="text-center text-cyan-200">Choose a faction to browse units.</p>"#
                .to_string();
        }
        let roster = state.roster.entries();
        let result = catalog::browse_units(state.units.units(), &filter, roster, page, per);

        let mut html = String::with_capacity(result.units.len() * 384);
        for unit in &result.units {
            let addable = is_unit_eligible_for_roster(unit, roster);
            html.push_str(&render_unit_card(unit, addable));
        }
        if result.has_more {
            html.push_str(&render_sentinel(page + 1, per, rank_raw, &filter));
        }
        html
    })
}

/// One unit card with an "Add" button. Units whose restrictions are not met
/// show the button disabled.
fn render_unit_card(unit: &UnitTemplate, addable: bool) -> String {
    let button = if addable {
        format!(
            r##"<button hx-post="/api/roster/add" hx-vals='{{"unit":"{id}"}}' hx-target="#army-container" hx-swap="innerHTML">Add</button>"##,
            id = escape_html(&unit.id),
        )
    } else {
        r#"<button disabled title="Requires another unit first">Locked</button>"#.to_string()
    };
    format!(
        r#"<div class="unit-card" data-unit="{id}" data-rank="{rank}">
  <img src="{img}" alt="{name}" loading="lazy">
  <h4>{name}</h4>
  <p>{rank} · {points} pts</p>
  <p>{keywords}</p>
  {button}
</div>"#,
        id = escape_html(&unit.id),
        rank = unit.rank,
        img = escape_html(&unit.image),
        name = escape_html(&unit.name),
        points = unit.points,
        keywords = escape_html(&unit.keywords.join(", ")),
        button = button,
    )
}

/// Sentinel that loads the next page when it scrolls into view.
fn render_sentinel(page: usize, per: usize, rank: &str, filter: &UnitFilter) -> String {
    let mut query_parts = vec![format!("page={page}"), format!("per={per}")];
    if !rank.is_empty() {
        query_parts.push(format!("rank={}", encode_component(rank)));
    }
    if !filter.search.is_empty() {
        query_parts.push(format!("search={}", encode_component(&filter.search)));
    }
    if filter.eligible_only {
        query_parts.push("eligible=true".to_string());
    }
    format!(
        r#"<div hx-get="/api/catalog/units?{query}"
             hx-trigger="intersect once threshold:0.3"
             hx-swap="outerHTML"
             class="unit-card"></div>"#,
        query = escape_html(&query_parts.join("&")),
    )
}

fn encode_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

// ── GET /api/catalog/upgrades ──────────────────────────────────────

/// Handle GET /api/catalog/upgrades?entry={uid}&slot={slot}
/// Lists the upgrades roster entry `uid` may take in `slot`, marking the ones
/// already selected.
pub fn handle_upgrades_get(query: &str) -> String {
    let params = parse_query(query);
    let Some(uid) = get_num::<u64>(&params, "entry") else {
        return error_fragment("Missing entry parameter");
    };
    let slot = match get_param(&params, "slot") {
        Some(s) if !s.is_empty() => s,
        _ => return error_fragment("Missing slot parameter"),
    };

    with_state(|state| {
        let Some(entry) = state.roster.get(uid) else {
            return error_fragment(&format!("No roster entry #{uid}"));
        };
        let offered = eligibility::filter_upgrades(&entry.unit, slot, state.upgrades.slot(slot));
        let selected = entry.selected_in(slot);
        let capacity = entry.unit.slot_capacity(slot);

        let mut html = String::with_capacity(1024);
        html.push_str(&format!(
            r#"<div class="upgrade-picker" data-entry="{uid}" data-slot="{slot}"><h3>{slot} ({used}/{capacity})</h3>"#,
            slot = escape_html(slot),
            used = selected.len(),
        ));
        if offered.is_empty() {
            html.push_str(r#"<p class="text-cyan-200">No upgrades available.</p>"#);
        }
        for upgrade in offered {
            let is_selected = selected.iter().any(|id| id == &upgrade.id);
            let taken_elsewhere = upgrade.is_unique
                && !is_selected
                && state
                    .roster
                    .entries()
                    .iter()
                    .any(|other| other.uid != uid && other.has_upgrade(&upgrade.id));
            html.push_str(&render_upgrade_option(uid, slot, upgrade, is_selected, taken_elsewhere));
        }
        html.push_str("</div>");
        html
    })
}

fn render_upgrade_option(
    uid: u64,
    slot: &str,
    upgrade: &UpgradeDefinition,
    is_selected: bool,
    taken_elsewhere: bool,
) -> String {
    let class = if is_selected {
        "upgrade-option selected"
    } else if taken_elsewhere {
        "upgrade-option taken"
    } else {
        "upgrade-option"
    };
    format!(
        r##"<button class="{class}" hx-post="/api/roster/upgrade" hx-vals='{{"entry":"{uid}","slot":"{slot}","upgrade":"{id}"}}' hx-target="#army-container" hx-swap="innerHTML"{disabled}>{unique}{name} <span>{points} pts</span></button>"##,
        slot = escape_html(slot),
        id = escape_html(&upgrade.id),
        disabled = if taken_elsewhere { " disabled" } else { "" },
        unique = if upgrade.is_unique { "• " } else { "" },
        name = escape_html(&upgrade.name),
        points = upgrade.points,
    )
}
