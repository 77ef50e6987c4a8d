//! Property tests for the assignable role listing.

mod common;

use std::collections::HashSet;

use inventory_gate::catalog::{assignable, fetch_assignable_roles, Role};
use proptest::prelude::*;

use common::FakeBackend;

const SENTINEL: &str = "super_admin";

// Strategy: catalog rows with ids drawn from a small range so duplicates happen
fn arb_role() -> impl Strategy<Value = Role> {
    (
        prop::string::string_regex("[0-9]{1,2}").unwrap(),
        prop_oneof![
            Just("admin".to_string()),
            Just("viewer".to_string()),
            Just("Super_Admin".to_string()),
            prop::string::string_regex("[a-z_]{3,12}").unwrap(),
        ],
    )
        .prop_map(|(id, name)| Role::new(id, name))
}

// Strategy: rows plus the positions where sentinel rows get spliced in
fn arb_rows() -> impl Strategy<Value = Vec<Role>> {
    (
        prop::collection::vec(arb_role(), 0..24),
        prop::collection::vec((any::<prop::sample::Index>(), prop::string::string_regex("[0-9]{1,2}").unwrap()), 0..4),
    )
        .prop_map(|(mut rows, sentinels)| {
            for (at, id) in sentinels {
                let i = at.index(rows.len() + 1);
                rows.insert(i, Role::new(id, SENTINEL));
            }
            rows
        })
}

fn check_listing(input: &[Role], out: &[Role]) -> Result<(), TestCaseError> {
    prop_assert!(out.iter().all(|r| r.name != SENTINEL));

    let mut ids = HashSet::new();
    prop_assert!(out.iter().all(|r| ids.insert(r.id.clone())), "duplicate id in {:?}", out);

    // every id carried by a non-sentinel row survives, with its first such row
    for id in input.iter().filter(|r| r.name != SENTINEL).map(|r| &r.id) {
        let first = input.iter().find(|r| r.name != SENTINEL && &r.id == id).unwrap();
        prop_assert!(out.contains(first), "lost {:?}", first);
    }
    prop_assert!(out.iter().all(|r| input.contains(r)));
    Ok(())
}

proptest! {
    #[test]
    fn proptest_assignable_never_lists_the_sentinel(rows in arb_rows()) {
        let out = assignable(rows.clone(), SENTINEL);
        check_listing(&rows, &out)?;
    }

    /// The backend filter is not trusted: a catalog that ignores it still never leaks the sentinel.
    #[test]
    fn proptest_fetch_survives_an_unfiltered_catalog(rows in arb_rows()) {
        let fake = FakeBackend { roles: rows.clone(), ignore_filter: true, ..Default::default() };
        let rt = tokio::runtime::Runtime::new().unwrap();
        let out = rt.block_on(fetch_assignable_roles(&fake, SENTINEL)).unwrap();
        check_listing(&rows, &out)?;
        prop_assert_eq!(*fake.catalog_calls.lock().unwrap(), 1);
    }
}
