//! Upgrade and roster eligibility.
//!
//! Two tag checks with opposite quantifiers live here and are kept apart on
//! purpose:
//!
//! - **Upgrade restrictions** are permissive: an upgrade is offered when *any*
//!   of its tags names the unit's rank or unit type.
//! - **Unit restrictions** are a prerequisite gate: a unit can join the roster
//!   only when *every* one of its tags is satisfied by units already present.

use crate::army::model::{RosterEntry, UnitTemplate, UpgradeDefinition};

/// Restriction tag satisfied only by a roster unit with the `attached` keyword.
pub const ATTACHED_TAG: &str = "attached";

/// Upgrades from `catalog` that `unit` may equip in `slot_type`, in catalog order.
///
/// Records tagged with another slot are ignored, so an unknown slot yields an
/// empty list.
pub fn filter_upgrades<'a>(
    unit: &UnitTemplate,
    slot_type: &str,
    catalog: &'a [UpgradeDefinition],
) -> Vec<&'a UpgradeDefinition> {
    catalog
        .iter()
        .filter(|upgrade| upgrade.slot_type == slot_type)
        .filter(|upgrade| faction_ok(unit, upgrade) && restriction_ok(unit, upgrade))
        .collect()
}

/// Whether `upgrade_id` survives [`filter_upgrades`] for this unit and slot.
pub fn is_upgrade_eligible(
    unit: &UnitTemplate,
    slot_type: &str,
    upgrade_id: &str,
    catalog: &[UpgradeDefinition],
) -> bool {
    filter_upgrades(unit, slot_type, catalog)
        .iter()
        .any(|u| u.id == upgrade_id)
}

fn faction_ok(unit: &UnitTemplate, upgrade: &UpgradeDefinition) -> bool {
    upgrade.factions.is_empty() || upgrade.factions.iter().any(|f| unit.belongs_to(f))
}

fn restriction_ok(unit: &UnitTemplate, upgrade: &UpgradeDefinition) -> bool {
    if upgrade.restrictions.is_empty() {
        return true;
    }
    let unit_type = unit.unit_type();
    upgrade.restrictions.iter().any(|tag| {
        !tag.is_empty() && (unit.rank.matches_tag(tag) || tag == unit_type)
    })
}

/// Whether `unit` may be added to a roster currently holding `roster`.
///
/// A blank tag never matches; it is not read as "no restriction".
pub fn is_unit_eligible_for_roster(unit: &UnitTemplate, roster: &[RosterEntry]) -> bool {
    unit.restrictions
        .iter()
        .all(|raw| restriction_satisfied(raw.trim(), roster))
}

fn restriction_satisfied(tag: &str, roster: &[RosterEntry]) -> bool {
    if tag.is_empty() {
        return false;
    }
    let tag = tag.to_lowercase();
    if tag == ATTACHED_TAG {
        return roster.iter().any(|e| e.unit.has_keyword(ATTACHED_TAG));
    }
    roster.iter().any(|entry| {
        let unit = &entry.unit;
        unit.id.to_lowercase() == tag
            || unit.has_keyword(&tag)
            || unit.rank.matches_tag(&tag)
            || unit.unit_type() == tag
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::army::model::Rank;
    use crate::army::model::fixtures::{unit, upgrade};
    use proptest::prelude::*;

    fn entry(uid: u64, unit: UnitTemplate) -> RosterEntry {
        RosterEntry::new(uid, unit)
    }

    #[test]
    fn faction_restricted_upgrade_is_filtered_out() {
        let rebel = unit("rebel_troopers", "rebels", Rank::Corps, 40);
        let g1 = upgrade("g1", "gear", 5);
        let mut g2 = upgrade("g2", "gear", 8);
        g2.factions = vec!["imperials".to_string()];
        let catalog = vec![g1, g2];

        let offered = filter_upgrades(&rebel, "gear", &catalog);
        assert_eq!(offered.len(), 1);
        assert_eq!(offered[0].id, "g1");
        assert!(!is_upgrade_eligible(&rebel, "gear", "g2", &catalog));
    }

    #[test]
    fn multi_faction_unit_matches_any_of_its_factions() {
        let mut merc = unit("bounty_hunter", "mercenary", Rank::Operative, 90);
        merc.factions.push("imperials".to_string());
        let mut comms = upgrade("imperial_comms", "comms", 5);
        comms.factions = vec!["imperials".to_string()];
        assert_eq!(filter_upgrades(&merc, "comms", &[comms]).len(), 1);
    }

    #[test]
    fn restriction_matches_rank_or_unit_type_any_of() {
        let commander = unit("leia", "rebels", Rank::Commander, 90);
        let mut command_card = upgrade("standing_orders", "command", 0);
        command_card.restrictions = vec!["operative".to_string(), "commander".to_string()];
        let mut trooper_only = upgrade("targeting_scopes", "command", 4);
        trooper_only.restrictions = vec!["trooper".to_string()];
        let mut vehicle_only = upgrade("hh_12", "command", 10);
        vehicle_only.restrictions = vec!["ground vehicle".to_string()];

        let catalog = vec![command_card, trooper_only, vehicle_only];
        let ids: Vec<&str> = filter_upgrades(&commander, "command", &catalog)
            .iter()
            .map(|u| u.id.as_str())
            .collect();
        assert_eq!(ids, vec!["standing_orders", "targeting_scopes"]);
    }

    #[test]
    fn restriction_does_not_match_other_keywords_or_id() {
        let mut u = unit("luke", "rebels", Rank::Commander, 160);
        u.keywords.push("jedi".to_string());
        let mut by_keyword = upgrade("jedi_mind_trick", "force", 5);
        by_keyword.restrictions = vec!["jedi".to_string()];
        let mut by_id = upgrade("lukes_saber", "force", 5);
        by_id.restrictions = vec!["luke".to_string()];
        assert!(filter_upgrades(&u, "force", &[by_keyword, by_id]).is_empty());
    }

    #[test]
    fn blank_upgrade_restriction_never_matches_typeless_unit() {
        let mut u = unit("viper_droid", "imperials", Rank::Support, 20);
        u.keywords.clear();
        let mut odd = upgrade("odd", "gear", 1);
        odd.restrictions = vec![String::new()];
        assert!(filter_upgrades(&u, "gear", &[odd]).is_empty());
    }

    #[test]
    fn unknown_slot_yields_nothing() {
        let u = unit("rebel_troopers", "rebels", Rank::Corps, 40);
        let catalog = vec![upgrade("g1", "gear", 5)];
        assert!(filter_upgrades(&u, "armament", &catalog).is_empty());
    }

    #[test]
    fn attached_restriction_waits_for_attached_keyword() {
        let mut v = unit("comms_droid", "rebels", Rank::Support, 10);
        v.restrictions = vec!["attached".to_string()];
        assert!(!is_unit_eligible_for_roster(&v, &[]));

        let plain = entry(1, unit("rebel_troopers", "rebels", Rank::Corps, 40));
        assert!(!is_unit_eligible_for_roster(&v, &[plain.clone()]));

        let mut host = unit("rebel_officer", "rebels", Rank::Commander, 50);
        host.keywords.push("attached".to_string());
        let roster = vec![plain, entry(2, host)];
        assert!(is_unit_eligible_for_roster(&v, &roster));
    }

    #[test]
    fn every_unit_restriction_must_match() {
        let mut v = unit("sabine", "rebels", Rank::Operative, 80);
        v.restrictions = vec![" Corps ".to_string(), "REBEL_OFFICER".to_string()];

        let troopers = entry(1, unit("rebel_troopers", "rebels", Rank::Corps, 40));
        assert!(!is_unit_eligible_for_roster(&v, &[troopers.clone()]));

        let officer = entry(2, unit("rebel_officer", "rebels", Rank::Commander, 50));
        assert!(is_unit_eligible_for_roster(&v, &[troopers, officer]));
    }

    #[test]
    fn unit_restriction_matches_keyword_and_unit_type() {
        let mut v = unit("wookiee_chieftain", "rebels", Rank::Commander, 90);
        v.restrictions = vec!["wookiee".to_string()];
        let mut wookiees = unit("wookiee_warriors", "rebels", Rank::SpecialForces, 75);
        wookiees.keywords = vec!["trooper".to_string(), "wookiee".to_string()];
        assert!(is_unit_eligible_for_roster(&v, &[entry(1, wookiees)]));

        v.restrictions = vec!["special forces".to_string()];
        let mut commandos = unit("commandos", "rebels", Rank::SpecialForces, 60);
        commandos.keywords.clear();
        assert!(is_unit_eligible_for_roster(&v, &[entry(2, commandos)]));
    }

    #[test]
    fn blank_unit_restriction_is_unsatisfiable() {
        let mut v = unit("odd", "rebels", Rank::Corps, 10);
        v.restrictions = vec!["   ".to_string()];
        let roster = vec![entry(1, unit("rebel_troopers", "rebels", Rank::Corps, 40))];
        assert!(!is_unit_eligible_for_roster(&v, &roster));
    }

    fn arb_tag() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("commander".to_string()),
            Just("corps".to_string()),
            Just("trooper".to_string()),
            Just("attached".to_string()),
            "[a-z]{1,8}",
        ]
    }

    fn arb_rank() -> impl Strategy<Value = Rank> {
        prop::sample::select(Rank::ALL.to_vec())
    }

    fn arb_unit() -> impl Strategy<Value = UnitTemplate> {
        (
            "[a-z]{1,8}",
            prop_oneof![Just("rebels"), Just("imperials")],
            arb_rank(),
            0u32..200,
            prop::collection::vec(arb_tag(), 0..4),
        )
            .prop_map(|(id, faction, rank, points, keywords)| {
                let mut u = unit(&id, faction, rank, points);
                u.keywords = keywords;
                u
            })
    }

    proptest! {
        #[test]
        fn unrestricted_unit_is_always_eligible(
            candidate in arb_unit(),
            roster in prop::collection::vec(arb_unit(), 0..6),
        ) {
            let entries: Vec<RosterEntry> = roster
                .into_iter()
                .enumerate()
                .map(|(i, u)| RosterEntry::new(i as u64, u))
                .collect();
            prop_assert!(is_unit_eligible_for_roster(&candidate, &entries));
        }

        #[test]
        fn unrestricted_upgrade_is_always_offered(
            candidate in arb_unit(),
            points in 0u32..30,
        ) {
            let open = upgrade("open", "gear", points);
            let offered = filter_upgrades(&candidate, "gear", std::slice::from_ref(&open));
            prop_assert_eq!(offered.len(), 1);
        }
    }
}
