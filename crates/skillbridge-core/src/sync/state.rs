// ── Ordered collection state ──
//
// The pure, synchronous half of a synchronized collection: an ordered,
// key-unique row vector plus the bookkeeping sets for optimistic
// entries and cross-resource exclusions. Every mutation leaves the
// vector sorted by the configured comparator. No I/O happens here.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::CoreError;
use crate::model::Entity;

use super::Comparator;

pub(crate) struct CollectionState<T: Entity> {
    rows: Vec<T>,
    comparator: Comparator<T>,

    /// Hard cap on snapshot length, applied after every insert.
    max_len: Option<usize>,

    /// Keys barred from the snapshot by a companion resource (e.g.
    /// opportunities with a `completed` completion). Persisting the set
    /// makes exclusion order-tolerant: it holds whether the exclusion
    /// arrives before or after the row itself.
    excluded: HashSet<String>,

    /// Temporary keys of optimistic entries awaiting reconcile/rollback.
    pending: HashSet<String>,
}

impl<T: Entity> CollectionState<T> {
    pub(crate) fn new(comparator: Comparator<T>, max_len: Option<usize>) -> Self {
        Self {
            rows: Vec::new(),
            comparator,
            max_len,
            excluded: HashSet::new(),
            pending: HashSet::new(),
        }
    }

    pub(crate) fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Owned snapshot for publication over a `watch` channel.
    pub(crate) fn snapshot(&self) -> Arc<Vec<T>> {
        Arc::new(self.rows.clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn get(&self, key: &str) -> Option<T> {
        self.position_of(key).map(|idx| self.rows[idx].clone())
    }

    pub(crate) fn has_pending(&self, temp_key: &str) -> bool {
        self.pending.contains(temp_key)
    }

    // ── Feed event application ───────────────────────────────────────
    //
    // These are no-op tolerant: the feed is at-least-once and only
    // best-effort ordered, so an unknown key or a repeat is expected,
    // never an error.

    /// Insert (or replace, when the key already exists) at sorted
    /// position, then enforce the length bound.
    pub(crate) fn insert(&mut self, row: T) {
        let key = row.key().to_owned();
        if self.excluded.contains(&key) {
            self.remove_key(&key);
            return;
        }
        self.remove_key(&key);
        self.insert_sorted(row);
        if let Some(max) = self.max_len {
            self.rows.truncate(max);
        }
    }

    /// Replace the row with the same key in place, repositioning only
    /// if its sort key changed. Unknown keys are ignored.
    pub(crate) fn update(&mut self, row: T) {
        let key = row.key().to_owned();
        if self.excluded.contains(&key) {
            self.remove_key(&key);
            return;
        }
        let Some(idx) = self.position_of(&key) else {
            return;
        };
        self.rows[idx] = row;
        if !self.ordered_at(idx) {
            let row = self.rows.remove(idx);
            self.insert_sorted(row);
        }
    }

    /// Remove the row with the given key, if present.
    pub(crate) fn delete(&mut self, key: &str) {
        self.remove_key(key);
    }

    // ── Optimistic entry lifecycle ───────────────────────────────────

    /// Insert a client-authored row before server confirmation. The
    /// row's key is its temporary key and must not collide with an
    /// entry already pending.
    pub(crate) fn add_optimistic(&mut self, row: T) -> Result<(), CoreError> {
        let temp_key = row.key().to_owned();
        if !self.pending.insert(temp_key.clone()) {
            return Err(CoreError::local_invariant(format!(
                "optimistic entry already pending for temp key {temp_key}"
            )));
        }
        self.remove_key(&temp_key);
        self.insert_sorted(row);
        Ok(())
    }

    /// Swap the optimistic entry for the server-confirmed row, keeping
    /// the list position the optimistic entry occupied.
    pub(crate) fn reconcile(&mut self, temp_key: &str, confirmed: T) -> Result<(), CoreError> {
        if !self.pending.remove(temp_key) {
            return Err(CoreError::local_invariant(format!(
                "reconcile for unknown temp key {temp_key}"
            )));
        }
        let Some(mut idx) = self.position_of(temp_key) else {
            // Pending but absent: a bounded collection truncated it.
            // Apply the confirmed row as a plain insert.
            self.insert(confirmed);
            return Ok(());
        };

        // The feed may have delivered the confirmed row before the
        // write's response; drop the duplicate, keep our position.
        let confirmed_key = confirmed.key().to_owned();
        if let Some(dup) = self.position_of(&confirmed_key) {
            if dup != idx {
                self.rows.remove(dup);
                if dup < idx {
                    idx -= 1;
                }
            }
        }
        self.rows[idx] = confirmed;
        Ok(())
    }

    /// Remove the optimistic entry, restoring the pre-insert snapshot.
    pub(crate) fn rollback(&mut self, temp_key: &str) -> Result<(), CoreError> {
        if !self.pending.remove(temp_key) {
            return Err(CoreError::local_invariant(format!(
                "rollback for unknown temp key {temp_key}"
            )));
        }
        self.remove_key(temp_key);
        Ok(())
    }

    // ── Cross-resource exclusion ─────────────────────────────────────

    /// Bar a key from the snapshot, removing it if currently present.
    pub(crate) fn exclude(&mut self, key: &str) {
        self.excluded.insert(key.to_owned());
        self.remove_key(key);
    }

    /// Lift a previous exclusion. The row itself only comes back via a
    /// later feed event or a resync.
    pub(crate) fn readmit(&mut self, key: &str) {
        self.excluded.remove(key);
    }

    pub(crate) fn is_excluded(&self, key: &str) -> bool {
        self.excluded.contains(key)
    }

    // ── Bulk refresh ─────────────────────────────────────────────────

    /// Replace server-confirmed rows with a freshly fetched set, keeping
    /// pending optimistic entries in place. Used by seed and resync.
    pub(crate) fn merge_refresh(&mut self, incoming: Vec<T>) {
        let pending = &self.pending;
        self.rows.retain(|r| pending.contains(r.key()));
        for row in incoming {
            let key = row.key();
            if self.excluded.contains(key) || self.pending.contains(key) {
                continue;
            }
            if self.position_of(key).is_some() {
                continue;
            }
            self.rows.push(row);
        }
        let comparator = Arc::clone(&self.comparator);
        self.rows.sort_by(|a, b| (*comparator)(a, b));
        if let Some(max) = self.max_len {
            self.rows.truncate(max);
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn position_of(&self, key: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.key() == key)
    }

    fn remove_key(&mut self, key: &str) -> Option<T> {
        self.position_of(key).map(|idx| self.rows.remove(idx))
    }

    fn insert_sorted(&mut self, row: T) {
        let idx = self
            .rows
            .partition_point(|r| (*self.comparator)(r, &row) != Ordering::Greater);
        self.rows.insert(idx, row);
    }

    fn ordered_at(&self, idx: usize) -> bool {
        let before_ok = idx == 0
            || (*self.comparator)(&self.rows[idx - 1], &self.rows[idx]) != Ordering::Greater;
        let after_ok = idx + 1 >= self.rows.len()
            || (*self.comparator)(&self.rows[idx], &self.rows[idx + 1]) != Ordering::Greater;
        before_ok && after_ok
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    use crate::sync::newest_first;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Row {
        id: String,
        body: String,
        created_at: DateTime<Utc>,
    }

    impl Entity for Row {
        const RESOURCE: &'static str = "rows";

        fn key(&self) -> &str {
            &self.id
        }

        fn created_at(&self) -> DateTime<Utc> {
            self.created_at
        }
    }

    fn row(id: &str, body: &str, minute: u32) -> Row {
        Row {
            id: id.into(),
            body: body.into(),
            created_at: Utc.with_ymd_and_hms(2026, 8, 20, 12, minute, 0).unwrap(),
        }
    }

    fn state(max_len: Option<usize>) -> CollectionState<Row> {
        CollectionState::new(newest_first(), max_len)
    }

    fn keys(state: &CollectionState<Row>) -> Vec<&str> {
        state.rows().iter().map(|r| r.id.as_str()).collect()
    }

    fn assert_sorted(state: &CollectionState<Row>) {
        let rows = state.rows();
        for pair in rows.windows(2) {
            assert!(
                pair[0].created_at >= pair[1].created_at,
                "snapshot out of order: {:?}",
                keys(state)
            );
        }
    }

    #[test]
    fn repeated_insert_for_same_key_keeps_one_row_and_later_payload() {
        let mut s = state(None);
        s.insert(row("a", "first", 1));
        s.insert(row("a", "second", 1));

        assert_eq!(s.len(), 1);
        assert_eq!(s.rows()[0].body, "second");
    }

    #[test]
    fn snapshot_stays_sorted_through_arbitrary_event_sequences() {
        let mut s = state(None);
        s.insert(row("a", "a", 5));
        assert_sorted(&s);
        s.insert(row("b", "b", 2));
        assert_sorted(&s);
        s.insert(row("c", "c", 9));
        assert_sorted(&s);
        // Update that changes the sort key repositions the row.
        s.update(row("b", "b2", 30));
        assert_sorted(&s);
        assert_eq!(keys(&s), vec!["b", "c", "a"]);
        s.delete("c");
        assert_sorted(&s);
        s.insert(row("d", "d", 7));
        assert_sorted(&s);
        assert_eq!(keys(&s), vec!["b", "d", "a"]);
    }

    #[test]
    fn update_without_sort_key_change_stays_in_place() {
        let mut s = state(None);
        s.insert(row("a", "a", 5));
        s.insert(row("b", "b", 3));
        s.update(row("a", "edited", 5));

        assert_eq!(keys(&s), vec!["a", "b"]);
        assert_eq!(s.rows()[0].body, "edited");
    }

    #[test]
    fn update_and_delete_for_unknown_keys_are_no_ops() {
        let mut s = state(None);
        s.insert(row("a", "a", 5));
        s.update(row("ghost", "x", 1));
        s.delete("ghost");

        assert_eq!(keys(&s), vec!["a"]);
    }

    #[test]
    fn reconcile_keeps_the_optimistic_position() {
        let mut s = state(None);
        s.insert(row("a", "a", 5));
        s.insert(row("b", "b", 3));
        s.add_optimistic(row("temp-1", "hi", 4)).unwrap();
        assert_eq!(keys(&s), vec!["a", "temp-1", "b"]);

        s.reconcile("temp-1", row("m-9", "hi", 4)).unwrap();
        assert_eq!(keys(&s), vec!["a", "m-9", "b"]);
        assert!(!s.has_pending("temp-1"));
    }

    #[test]
    fn reconcile_drops_duplicate_delivered_by_the_feed_first() {
        let mut s = state(None);
        s.add_optimistic(row("temp-1", "hi", 4)).unwrap();
        // The feed beat the write response to the punch.
        s.insert(row("m-9", "hi", 4));

        s.reconcile("temp-1", row("m-9", "hi", 4)).unwrap();
        assert_eq!(keys(&s), vec!["m-9"]);
    }

    #[test]
    fn rollback_restores_the_previous_snapshot() {
        let mut s = state(None);
        s.insert(row("a", "a", 5));
        let before: Vec<Row> = s.rows().to_vec();

        s.add_optimistic(row("temp-1", "hi", 9)).unwrap();
        s.rollback("temp-1").unwrap();

        assert_eq!(s.rows(), before.as_slice());
    }

    #[test]
    fn reconcile_and_rollback_reject_unknown_temp_keys() {
        let mut s = state(None);
        assert!(matches!(
            s.reconcile("nope", row("m-1", "x", 1)),
            Err(CoreError::LocalInvariant { .. })
        ));
        assert!(matches!(
            s.rollback("nope"),
            Err(CoreError::LocalInvariant { .. })
        ));
    }

    #[test]
    fn second_pending_entry_with_same_temp_key_is_rejected() {
        let mut s = state(None);
        s.add_optimistic(row("temp-1", "hi", 1)).unwrap();
        assert!(matches!(
            s.add_optimistic(row("temp-1", "again", 2)),
            Err(CoreError::LocalInvariant { .. })
        ));
    }

    #[test]
    fn bounded_collection_keeps_the_newest_ten() {
        let mut s = state(Some(10));
        for minute in 0..25 {
            s.insert(row(&format!("a-{minute}"), "x", minute));
            assert!(s.len() <= 10);
            assert_sorted(&s);
        }

        assert_eq!(s.len(), 10);
        assert_eq!(s.rows()[0].id, "a-24");
        assert_eq!(s.rows()[9].id, "a-15");
    }

    #[test]
    fn exclusion_removes_a_present_row() {
        let mut s = state(None);
        s.insert(row("opp-1", "x", 1));
        s.insert(row("opp-2", "y", 2));

        s.exclude("opp-1");
        assert_eq!(keys(&s), vec!["opp-2"]);
    }

    #[test]
    fn exclusion_holds_against_a_late_insert() {
        let mut s = state(None);
        // Completion event arrived before the opportunity itself.
        s.exclude("opp-1");
        s.insert(row("opp-1", "x", 1));

        assert_eq!(s.len(), 0);
        assert!(s.is_excluded("opp-1"));

        s.readmit("opp-1");
        s.insert(row("opp-1", "x", 1));
        assert_eq!(keys(&s), vec!["opp-1"]);
    }

    #[test]
    fn merge_refresh_replaces_rows_but_keeps_pending_entries() {
        let mut s = state(None);
        s.insert(row("a", "stale", 5));
        s.insert(row("gone", "x", 4));
        s.add_optimistic(row("temp-1", "hi", 6)).unwrap();

        s.exclude("done");
        s.merge_refresh(vec![
            row("a", "fresh", 5),
            row("b", "new", 2),
            row("done", "completed", 9),
        ]);

        assert_eq!(keys(&s), vec!["temp-1", "a", "b"]);
        assert_eq!(s.rows()[1].body, "fresh");
        assert_sorted(&s);
    }
}
