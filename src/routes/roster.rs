//! `/api/roster/*` routes — building the roster and reporting its totals.
//!
//! Every mutating route returns the re-rendered roster panel (swapped into
//! `#army-container`), with an inline error above it when the mutation was
//! refused. The page persists after each swap via `GET /api/state`.

use crate::army::model::{Rank, RosterEntry};
use crate::army::roster::Toggle;
use crate::army::state::{AppState, with_state, with_state_mut};
use crate::army::validator::Summary;
use crate::routes::util::{
    error_fragment, escape_html, get_num, get_param, parse_form_body, parse_query,
};

// ── GET /api/roster ────────────────────────────────────────────────

/// Handle GET /api/roster
pub fn handle_roster_get(_query: &str) -> String {
    with_state(render_roster_panel)
}

// ── POST /api/roster/add ───────────────────────────────────────────

/// Handle POST /api/roster/add
/// Body: unit={id}
pub fn handle_add_post(body: &str) -> String {
    let params = parse_form_body(body);
    let unit_id = get_param(&params, "unit").unwrap_or("");
    if unit_id.is_empty() {
        return error_fragment("Missing unit parameter");
    }
    with_state_mut(|state| {
        let Some(unit) = state.units.find(unit_id).cloned() else {
            return with_notice(state, &error_fragment(&format!("Unknown unit: {unit_id}")));
        };
        match state.roster.add_unit(&unit) {
            Ok(_) => render_roster_panel(state),
            Err(e) => with_notice(state, &error_fragment(&e.to_string())),
        }
    })
}

// ── POST /api/roster/remove ────────────────────────────────────────

/// Handle POST /api/roster/remove
/// Body: entry={uid}
pub fn handle_remove_post(body: &str) -> String {
    let params = parse_form_body(body);
    let Some(uid) = get_num::<u64>(&params, "entry") else {
        return error_fragment("Missing entry parameter");
    };
    with_state_mut(|state| match state.roster.remove(uid) {
        Ok(_) => render_roster_panel(state),
        Err(e) => with_notice(state, &error_fragment(&e.to_string())),
    })
}

// ── POST /api/roster/move ──────────────────────────────────────────

/// Handle POST /api/roster/move
/// Body: from={index}&to={index}, sent by the drag-and-drop handler.
pub fn handle_move_post(body: &str) -> String {
    let params = parse_form_body(body);
    let (Some(from), Some(to)) = (
        get_num::<usize>(&params, "from"),
        get_num::<usize>(&params, "to"),
    ) else {
        return error_fragment("Missing from/to parameters");
    };
    with_state_mut(|state| match state.roster.move_entry(from, to) {
        Ok(()) => render_roster_panel(state),
        Err(e) => with_notice(state, &error_fragment(&e.to_string())),
    })
}

// ── POST /api/roster/upgrade ───────────────────────────────────────

/// Handle POST /api/roster/upgrade
/// Body: entry={uid}&slot={slot}&upgrade={id}. Toggles the selection.
pub fn handle_upgrade_post(body: &str) -> String {
    let params = parse_form_body(body);
    let Some(uid) = get_num::<u64>(&params, "entry") else {
        return error_fragment("Missing entry parameter");
    };
    let slot = get_param(&params, "slot").unwrap_or("");
    let upgrade = get_param(&params, "upgrade").unwrap_or("");
    if slot.is_empty() || upgrade.is_empty() {
        return error_fragment("Missing slot or upgrade parameter");
    }

    with_state_mut(|state| {
        match state.roster.toggle_upgrade(uid, slot, upgrade, &state.upgrades) {
            Ok(toggle) => {
                let selected = toggle == Toggle::Selected;
                tracing::debug!(uid, slot, upgrade, selected, "upgrade toggled");
                render_roster_panel(state)
            }
            Err(e) => with_notice(state, &error_fragment(&e.to_string())),
        }
    })
}

// ── POST /api/roster/reset ─────────────────────────────────────────

/// Handle POST /api/roster/reset
pub fn handle_reset_post(_body: &str) -> String {
    with_state_mut(|state| {
        state.roster.reset();
        tracing::debug!("roster reset");
        render_roster_panel(state)
    })
}

// ── POST /api/roster/reconcile ─────────────────────────────────────

/// Handle POST /api/roster/reconcile
/// Drops upgrades the loaded catalogs no longer contain and recomputes points.
/// The page calls this once all upgrade documents are loaded.
pub fn handle_reconcile_post(_body: &str) -> String {
    with_state_mut(|state| {
        let stale = state.roster.reconcile(&state.upgrades);
        if stale.is_empty() {
            return render_roster_panel(state);
        }
        let names: Vec<String> = stale
            .iter()
            .map(|s| format!("{} ({})", s.upgrade_id, s.slot))
            .collect();
        let notice = format!(
            r#"<div class="text-amber-300">Removed {} unavailable upgrade(s): {}</div>"#,
            stale.len(),
            escape_html(&names.join(", "))
        );
        with_notice(state, &notice)
    })
}

// ── GET /api/roster/summary ────────────────────────────────────────

/// Handle GET /api/roster/summary
/// `?format=json` returns the summary as JSON for the page's own widgets.
pub fn handle_summary_get(query: &str) -> String {
    let params = parse_query(query);
    let summary = with_state(AppState::summary);
    if get_param(&params, "format") == Some("json") {
        return serde_json::to_string(&summary).unwrap_or_else(|_| "{}".to_string());
    }
    let cap = with_state(|s| s.rules.point_cap);
    render_summary(&summary, cap)
}

// ── Rendering ──────────────────────────────────────────────────────

fn with_notice(state: &AppState, notice: &str) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str(r#"<div class="roster-notice">"#);
    html.push_str(notice);
    html.push_str("</div>");
    html.push_str(&render_roster_panel(state));
    html
}

/// The roster grouped into one section per rank, followed by the summary.
/// Entries keep roster order inside each section; `data-index` is the
/// position the drag-and-drop handler posts back to `/api/roster/move`.
pub fn render_roster_panel(state: &AppState) -> String {
    let entries = state.roster.entries();
    let summary = state.summary();
    let mut html = String::with_capacity(2048 + entries.len() * 512);

    if entries.is_empty() {
        html.push_str(r#"<p class="text-center text-cyan-200">Your army is empty.</p>"#);
    }
    for rank in Rank::ALL {
        let in_rank: Vec<(usize, &RosterEntry)> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.unit.rank == rank)
            .collect();
        if in_rank.is_empty() {
            continue;
        }
        html.push_str(&format!(
            r#"<div class="rank-section" data-rank="{rank}"><h3>{rank} ({count})</h3><div class="rank-list">"#,
            count = in_rank.len(),
        ));
        for (index, entry) in in_rank {
            html.push_str(&render_entry(index, entry));
        }
        html.push_str("</div></div>");
    }

    html.push_str(&render_summary(&summary, state.rules.point_cap));
    html
}

fn render_entry(index: usize, entry: &RosterEntry) -> String {
    let mut slots = String::new();
    for slot in dedup_slots(&entry.unit.allowed_upgrade_slots) {
        let chosen = entry.selected_in(slot);
        let label = if chosen.is_empty() {
            "—".to_string()
        } else {
            chosen.join(", ")
        };
        slots.push_str(&format!(
            r##"<button class="slot" hx-get="/api/catalog/upgrades?entry={uid}&amp;slot={slot}" hx-target="#upgrade-modal" hx-swap="innerHTML">{slot}: {label}</button>"##,
            uid = entry.uid,
            slot = escape_html(slot),
            label = escape_html(&label),
        ));
    }
    format!(
        r##"<div class="army-unit" draggable="true" data-index="{index}" data-entry="{uid}">
  <span>{name}</span>
  <span class="slots">{slots}</span>
  <span>{points} pts</span>
  <button class="remove-unit" hx-post="/api/roster/remove" hx-vals='{{"entry":"{uid}"}}' hx-target="#army-container" hx-swap="innerHTML">✕</button>
</div>"##,
        uid = entry.uid,
        name = escape_html(&entry.unit.name),
        points = entry.current_points,
    )
}

/// Slot names in listing order, each once.
fn dedup_slots(slots: &[String]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::with_capacity(slots.len());
    for slot in slots {
        if !out.contains(&slot.as_str()) {
            out.push(slot);
        }
    }
    out
}

pub fn render_summary(summary: &Summary, cap: u32) -> String {
    let mut html = String::with_capacity(512);
    html.push_str(r#"<div id="army-summary">"#);
    html.push_str(&format!(
        r#"<p class="points">{} / {} pts</p>"#,
        summary.total_points, cap
    ));
    let counts: Vec<String> = summary
        .per_rank_counts
        .iter()
        .filter(|&(_, &count)| count > 0)
        .map(|(rank, count)| format!("{rank}: {count}"))
        .collect();
    if !counts.is_empty() {
        html.push_str(&format!(r#"<p class="ranks">{}</p>"#, counts.join(" · ")));
    }
    if summary.is_valid() {
        html.push_str(r#"<p class="valid text-emerald-400">Army is legal</p>"#);
    } else {
        html.push_str(r#"<ul class="violations text-red-500">"#);
        for message in summary.messages() {
            html.push_str(&format!("<li>Army {}</li>", escape_html(&message)));
        }
        html.push_str("</ul>");
    }
    html.push_str("</div>");
    html
}
