//! List-building rules: per-rank unit counts and the point cap.
//!
//! A default ruleset ships with the module; the page can replace it with a
//! JSON document such as
//!
//! ```json
//! { "pointCap": 1000, "rankLimits": { "commander": { "min": 1, "max": 2 } } }
//! ```
//!
//! `max` may be omitted or `null` for an unbounded rank.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::army::error::RulesError;
use crate::army::model::Rank;

pub const DEFAULT_POINT_CAP: u32 = 800;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankBound {
    #[serde(default)]
    pub min: u32,
    #[serde(default)]
    pub max: Option<u32>,
}

impl RankBound {
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub fn bounded(min: u32, max: u32) -> Self {
        Self::new(min, Some(max))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRules {
    pub rank_limits: BTreeMap<Rank, RankBound>,
    pub point_cap: u32,
}

impl Default for ListRules {
    fn default() -> Self {
        let rank_limits = BTreeMap::from([
            (Rank::Commander, RankBound::bounded(1, 2)),
            (Rank::Operative, RankBound::bounded(0, 2)),
            (Rank::Corps, RankBound::bounded(3, 6)),
            (Rank::SpecialForces, RankBound::bounded(0, 3)),
            (Rank::Support, RankBound::bounded(0, 3)),
            (Rank::Heavy, RankBound::bounded(0, 2)),
        ]);
        Self {
            rank_limits,
            point_cap: DEFAULT_POINT_CAP,
        }
    }
}

/// Wire shape: ranks are free-form strings so "special forces" and
/// "special_forces" both load.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRules {
    #[serde(default)]
    rank_limits: BTreeMap<String, RankBound>,
    #[serde(default, alias = "point_cap")]
    point_cap: Option<u32>,
}

impl ListRules {
    /// Parse and validate a rules document. Ranks not mentioned are unlimited.
    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        let raw: RawRules = serde_json::from_str(json)?;
        let mut rank_limits = BTreeMap::new();
        for (name, bound) in raw.rank_limits {
            let rank = Rank::parse(&name).ok_or(RulesError::UnknownRank(name))?;
            if rank_limits.insert(rank, bound).is_some() {
                return Err(RulesError::DuplicateRank(rank));
            }
        }
        let rules = Self {
            rank_limits,
            point_cap: raw.point_cap.unwrap_or(DEFAULT_POINT_CAP),
        };
        rules.validate()?;
        Ok(rules)
    }

    /// Every bound must satisfy `min <= max`.
    pub fn validate(&self) -> Result<(), RulesError> {
        for (&rank, bound) in &self.rank_limits {
            if let Some(max) = bound.max {
                if bound.min > max {
                    return Err(RulesError::InvertedBound {
                        rank,
                        min: bound.min,
                        max,
                    });
                }
            }
        }
        Ok(())
    }
}
