//! Property-based tests for item selection and error bodies.

use proptest::prelude::*;
use serde_json::json;

use crate::client::{error_message, StarrItem};
use crate::transfer::select_items;

fn items_from(ids: &[i64]) -> Vec<StarrItem> {
    ids.iter()
        .map(|id| StarrItem(json!({"id": id, "name": format!("item {id}")})))
        .collect()
}

proptest! {
    /// A non-empty selection keeps exactly the items whose id was picked, in
    /// their original order.
    #[test]
    fn prop_selection_keeps_picked_ids(
        ids in proptest::collection::vec(0i64..50, 0..20),
        selected in proptest::collection::vec(0i64..50, 1..10),
    ) {
        let kept = select_items(items_from(&ids), &selected);
        let expected: Vec<i64> = ids.iter().copied().filter(|id| selected.contains(id)).collect();
        let got: Vec<i64> = kept.iter().filter_map(StarrItem::id).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_empty_selection_keeps_everything(ids in proptest::collection::vec(any::<i64>(), 0..20)) {
        prop_assert_eq!(select_items(items_from(&ids), &[]).len(), ids.len());
    }

    /// Whatever the instance sends back, the caller gets some text.
    #[test]
    fn prop_error_message_never_empty(body in proptest::collection::vec(any::<u8>(), 0..300)) {
        prop_assert!(!error_message(&body).is_empty());
    }
}
