//! `/api/rules` — view or replace the list-building rules.

use crate::army::model::Rank;
use crate::army::rules::ListRules;
use crate::army::state::{with_state, with_state_mut};
use crate::routes::roster::render_summary;
use crate::routes::util::error_fragment;

/// Handle GET /api/rules
pub fn handle_rules_get(_query: &str) -> String {
    with_state(|state| render_rules(&state.rules))
}

/// Handle POST /api/rules
/// Body: a rules document (raw JSON). Returns the new rules table followed by
/// the roster summary under them.
pub fn handle_rules_post(body: &str) -> String {
    match ListRules::from_json(body) {
        Ok(rules) => with_state_mut(|state| {
            tracing::debug!(point_cap = rules.point_cap, "rules replaced");
            state.rules = rules;
            format!(
                "{}{}",
                render_rules(&state.rules),
                render_summary(&state.summary(), state.rules.point_cap)
            )
        }),
        Err(e) => {
            tracing::warn!(error = %e, "rules rejected");
            error_fragment(&e.to_string())
        }
    }
}

fn render_rules(rules: &ListRules) -> String {
    let mut html = String::with_capacity(512);
    html.push_str(r#"<table class="list-rules"><tr><th>Rank</th><th>Min</th><th>Max</th></tr>"#);
    for rank in Rank::ALL {
        let (min, max) = match rules.rank_limits.get(&rank) {
            Some(bound) => (
                bound.min.to_string(),
                bound.max.map_or_else(|| "—".to_string(), |m| m.to_string()),
            ),
            None => ("0".to_string(), "—".to_string()),
        };
        html.push_str(&format!(
            r#"<tr data-rank="{rank}"><td>{rank}</td><td>{min}</td><td>{max}</td></tr>"#
        ));
    }
    html.push_str(&format!(
        r#"<tr><td>Point cap</td><td colspan="2">{}</td></tr></table>"#,
        rules.point_cap
    ));
    html
}
