//! Property tests for the data-change detector.

use proptest::prelude::*;

use arrivo_core::{DataCategory, PayloadField};
use arrivo_pack::{calculate_diff, ChangeType};

fn arb_category() -> impl Strategy<Value = DataCategory> {
    prop_oneof![
        Just(DataCategory::Identity),
        Just(DataCategory::Itinerary),
        Just(DataCategory::Accommodation),
        Just(DataCategory::Funds),
    ]
}

// Keyed by (category, name) so generated payloads have unique field names,
// matching what `TravelerPayload::set_field` guarantees for real data.
fn arb_fields() -> impl Strategy<Value = Vec<PayloadField>> {
    prop::collection::btree_map(
        (arb_category(), "[a-z][a-zA-Z]{0,11}"),
        "[ -~]{0,24}",
        0..16,
    )
    .prop_map(|fields| {
        fields
            .into_iter()
            .map(|((category, name), value)| PayloadField {
                category,
                name,
                value,
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn diff_of_anything_against_itself_is_empty(fields in arb_fields()) {
        prop_assert!(calculate_diff(&fields, &fields).is_empty());
    }

    #[test]
    fn diff_against_nothing_only_reports_additions(fields in arb_fields()) {
        let diff = calculate_diff(&[], &fields);
        prop_assert!(diff
            .changed_fields
            .iter()
            .all(|c| c.change_type == ChangeType::Added));
    }

    #[test]
    fn diff_is_deterministic(old in arb_fields(), new in arb_fields()) {
        prop_assert_eq!(calculate_diff(&old, &new), calculate_diff(&old, &new));
    }
}
