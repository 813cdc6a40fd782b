//! Result merging
//!
//! Rows reached through more than one subset (an entity whose client id is
//! in `by_id` and whose legacy name is in `by_name`, say) are identical, so
//! the first copy seen is kept.

use crate::federation::ScopedEntity;
use indexmap::IndexMap;

/// Deduplicating, ordering merger for subset results
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultMerger;

impl ResultMerger {
    /// Merge lists, dedupe by primary key and sort by (ordering key, primary key)
    #[must_use]
    pub fn merge<E, I>(lists: I) -> Vec<E>
    where
        E: ScopedEntity,
        I: IntoIterator<Item = Vec<E>>,
    {
        let mut seen: IndexMap<String, E> = IndexMap::new();
        let mut total = 0usize;
        for list in lists {
            total += list.len();
            for row in list {
                seen.entry(row.key().to_string()).or_insert(row);
            }
        }

        let mut rows: Vec<E> = seen.into_values().collect();
        rows.sort_by(|a, b| {
            a.order_key()
                .cmp(&b.order_key())
                .then_with(|| a.key().cmp(b.key()))
        });

        if total > rows.len() {
            tracing::debug!("Merged {} rows into {} unique", total, rows.len());
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Row {
        id: String,
        order: i64,
        tag: &'static str,
    }

    impl ScopedEntity for Row {
        type OrderKey = i64;

        fn key(&self) -> &str {
            &self.id
        }

        fn order_key(&self) -> i64 {
            self.order
        }

        fn client_ref(&self) -> &str {
            self.tag
        }
    }

    fn row(id: &str, order: i64, tag: &'static str) -> Row {
        Row {
            id: id.to_string(),
            order,
            tag,
        }
    }

    #[test]
    fn first_copy_wins() {
        let merged = ResultMerger::merge(vec![
            vec![row("e1", 1, "by_id")],
            vec![row("e1", 1, "by_name"), row("e2", 0, "by_name")],
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "e2");
        assert_eq!(merged[1].tag, "by_id");
    }

    #[test]
    fn ties_break_on_primary_key() {
        let merged = ResultMerger::merge(vec![vec![row("b", 5, "x"), row("a", 5, "x")]]);
        let ids: Vec<&str> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn empty_inputs() {
        let merged: Vec<Row> = ResultMerger::merge(Vec::<Vec<Row>>::new());
        assert!(merged.is_empty());
    }

    fn list() -> impl Strategy<Value = Vec<Row>> {
        proptest::collection::vec("[a-h]", 0..12).prop_map(|ids| {
            ids.into_iter()
                .map(|id| {
                    // a key always carries the same ordering key
                    let order = i64::from(id.as_bytes()[0] % 3);
                    row(&id, order, "x")
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_merge_unique_and_sorted(a in list(), b in list(), c in list()) {
            let total = a.len() + b.len() + c.len();
            let merged = ResultMerger::merge(vec![a, b, c]);

            prop_assert!(merged.len() <= total);
            let keys: HashSet<&str> = merged.iter().map(|r| r.id.as_str()).collect();
            prop_assert_eq!(keys.len(), merged.len());
            for pair in merged.windows(2) {
                let left = (pair[0].order, pair[0].id.as_str());
                let right = (pair[1].order, pair[1].id.as_str());
                prop_assert!(left < right);
            }
        }
    }
}
