//! Roster validation: point totals, per-rank counts and rule violations.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::army::model::{Rank, RosterEntry};
use crate::army::rules::{ListRules, RankBound};

/// One broken list-building rule. Advisory only: an invalid roster can still
/// be edited, saved and exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    BelowMinimum { rank: Rank, min: u32, count: u32 },
    AboveMaximum { rank: Rank, max: u32, count: u32 },
    OverPointCap { total: u32, cap: u32 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::BelowMinimum { rank, min, count } => {
                write!(f, "needs at least {min} {rank} (has {count})")
            }
            Violation::AboveMaximum { rank, max, count } => {
                write!(f, "allows at most {max} {rank} (has {count})")
            }
            Violation::OverPointCap { total, cap } => {
                write!(f, "{total} points is over the {cap} point cap")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_points: u32,
    /// Every rank appears, zero counts included.
    pub per_rank_counts: BTreeMap<Rank, u32>,
    pub violations: Vec<Violation>,
}

impl Summary {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

/// Tally `roster` against `rank_limits` and `point_cap`.
///
/// Ranks without a configured bound are counted but never flagged. Violations
/// come out in rank order, followed by the point-cap check.
pub fn summarize(
    roster: &[RosterEntry],
    rank_limits: &BTreeMap<Rank, RankBound>,
    point_cap: u32,
) -> Summary {
    let total_points = roster.iter().map(|e| e.current_points).sum();

    let mut per_rank_counts: BTreeMap<Rank, u32> = Rank::ALL.iter().map(|&r| (r, 0)).collect();
    for entry in roster {
        *per_rank_counts.entry(entry.unit.rank).or_insert(0) += 1;
    }

    let mut violations = Vec::new();
    for (&rank, bound) in rank_limits {
        let count = per_rank_counts.get(&rank).copied().unwrap_or(0);
        if count < bound.min {
            violations.push(Violation::BelowMinimum {
                rank,
                min: bound.min,
                count,
            });
        }
        if let Some(max) = bound.max {
            if count > max {
                violations.push(Violation::AboveMaximum { rank, max, count });
            }
        }
    }
    if total_points > point_cap {
        violations.push(Violation::OverPointCap {
            total: total_points,
            cap: point_cap,
        });
    }

    Summary {
        total_points,
        per_rank_counts,
        violations,
    }
}

/// [`summarize`] with a full ruleset.
pub fn summarize_with(roster: &[RosterEntry], rules: &ListRules) -> Summary {
    summarize(roster, &rules.rank_limits, rules.point_cap)
}
