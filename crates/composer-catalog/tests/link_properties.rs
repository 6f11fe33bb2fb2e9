//! Property tests for occurrence-scoped link keys

use composer_catalog::{keyed_rows, EntityId, LinkKey, LinkRow};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn rows_strategy() -> impl Strategy<Value = Vec<LinkRow>> {
    prop::collection::vec((0u8..3, 0u8..4, 0u32..20), 0..24).prop_map(|raw| {
        raw.into_iter()
            .map(|(owner, related, sort)| LinkRow::new(format!("p{owner}"), format!("b{related}"), sort))
            .collect()
    })
}

fn keys(rows: &[LinkRow], owner: &EntityId) -> Vec<(LinkKey, EntityId)> {
    keyed_rows(rows, owner)
        .into_iter()
        .map(|(key, row)| (key, row.related.clone()))
        .collect()
}

proptest! {
    #[test]
    fn keys_survive_monotone_renumbering(
        rows in rows_strategy(),
        scale in 1u32..50,
        offset in 0u32..1000,
    ) {
        let renumbered: Vec<LinkRow> = rows
            .iter()
            .map(|r| LinkRow::new(r.owner.clone(), r.related.clone(), r.sort_index * scale + offset))
            .collect();
        for owner in ["p0", "p1", "p2"] {
            let owner = EntityId::from(owner);
            prop_assert_eq!(keys(&rows, &owner), keys(&renumbered, &owner));
        }
    }

    #[test]
    fn keys_are_unique_per_owner(rows in rows_strategy()) {
        for owner in ["p0", "p1", "p2"] {
            let owner = EntityId::from(owner);
            let keyed = keys(&rows, &owner);
            let distinct: BTreeSet<&LinkKey> = keyed.iter().map(|(k, _)| k).collect();
            prop_assert_eq!(distinct.len(), keyed.len());
            prop_assert!(keyed.iter().all(|(k, related)| k.owner == owner && k.related == *related));
        }
    }
}
