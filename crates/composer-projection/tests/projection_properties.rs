use composer_catalog::{EntityId, LinkRow, Plan, PlanField};
use composer_draft::{DraftSpace, RelationSets};
use composer_projection::{field_is_dirty, merge, project_relationship_list, Membership};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_dirty_iff_merged_differs(price in 0u32..5, tier in 0i64..3) {
        let base = Plan::new("p1", "Basic", 2.0).with_tier(1);
        let p1 = EntityId::from("p1");
        let mut space = DraftSpace::new();
        space
            .patch_field::<Plan>(p1.clone(), PlanField::BasePrice, f64::from(price).into(), 2.0.into())
            .unwrap();
        space
            .patch_field::<Plan>(p1.clone(), PlanField::Tier, tier.into(), 1_i64.into())
            .unwrap();

        let merged = merge::<Plan>(&space, p1.clone(), &base);
        prop_assert_eq!(
            field_is_dirty::<Plan>(&space, &p1, PlanField::BasePrice),
            merged.record.base_price != base.base_price
        );
        prop_assert_eq!(
            field_is_dirty::<Plan>(&space, &p1, PlanField::Tier),
            merged.record.tier != base.tier
        );
        prop_assert_eq!(merged.is_dirty(), merged.record != base);
    }

    #[test]
    fn prop_effective_list_matches_set_algebra(
        baseline in prop::collection::btree_set(0u8..8, 0..6),
        adds in prop::collection::vec(0u8..8, 0..6),
        removes in prop::collection::vec(0u8..8, 0..6),
    ) {
        let owner = EntityId::from("p1");
        let rows: Vec<LinkRow> = baseline
            .iter()
            .enumerate()
            .map(|(i, b)| LinkRow::new("p1", format!("b{b}"), u32::try_from(i).unwrap()))
            .collect();

        // Only stage what the editor can offer: adds of unlinked ids, removes of linked ones.
        let mut sets = RelationSets::new();
        for a in &adds {
            if !baseline.contains(a) {
                sets.toggle_add(&owner, &EntityId::new(format!("b{a}")));
            }
        }
        for r in &removes {
            if baseline.contains(r) {
                sets.toggle_remove(&owner, &EntityId::new(format!("b{r}")));
            }
        }

        let list = project_relationship_list(&owner, &rows, Some(&sets), |_| None::<()>);
        let mut effective: Vec<String> = list.effective().map(|i| i.related_id.to_string()).collect();
        effective.sort();

        let mut expected: Vec<String> = baseline
            .iter()
            .filter(|b| !removes.contains(b))
            .chain(adds.iter().filter(|a| !baseline.contains(a)))
            .map(|b| format!("b{b}"))
            .collect();
        expected.sort();
        expected.dedup();
        prop_assert_eq!(effective, expected);

        let removed = list.items.iter().filter(|i| i.membership == Membership::Removed).count();
        prop_assert_eq!(removed, list.removed_ids.len());
    }
}
