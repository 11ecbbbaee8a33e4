//! Total order over records.
//!
//! Records sort ascending by `(status rank, position, newest first)`, with a
//! descending id as the last tie-breaker so two records created in the same
//! millisecond still have a fixed relative order.
//!
//! Two mutations touch positions with different strength:
//! - `set_position` overwrites one record's position and leaves siblings alone.
//! - [`plan_reorder`] renumbers every record to its 0-based index, keeping
//!   positions contiguous across repeated partial reorders.

use std::cmp::{Ordering, Reverse};

use crate::{Error, ItemId, Record, Result, Status};

/// Rank of a status in list order: todo < progress < completed < anything else.
#[must_use]
pub fn status_rank(status: &Status) -> u8 {
    match status {
        Status::Todo => 0,
        Status::Progress => 1,
        Status::Completed => 2,
        Status::Other(_) => 3,
    }
}

/// Derived sort key. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OrderingKey {
    rank: u8,
    position: i64,
    newest_first: Reverse<i64>,
    id_desc: Reverse<ItemId>,
}

impl OrderingKey {
    #[must_use]
    pub fn of(record: &Record) -> Self {
        Self {
            rank: status_rank(&record.status),
            position: record.position,
            newest_first: Reverse(record.created_at.timestamp_millis()),
            id_desc: Reverse(record.id),
        }
    }
}

/// Compare two records by their ordering key.
#[must_use]
pub fn compare(a: &Record, b: &Record) -> Ordering {
    OrderingKey::of(a).cmp(&OrderingKey::of(b))
}

/// Sort records in place into list order.
pub fn sort_records(records: &mut [Record]) {
    records.sort_by_cached_key(OrderingKey::of);
}

/// Compute the full renumbering for moving `moved` onto `target`.
///
/// `ordered` must already be in list order. The target's index is taken from
/// that original sequence, `moved` is removed, and then reinserted into the
/// remainder at the target's index. A record dragged downward therefore lands
/// just after its target and one dragged upward lands just before it.
///
/// Returns `(id, new_position)` for every record, positions `0..n`.
pub fn plan_reorder(
    ordered: &[Record],
    moved: ItemId,
    target: ItemId,
) -> Result<Vec<(ItemId, i64)>> {
    let mut ids: Vec<ItemId> = ordered.iter().map(|record| record.id).collect();

    let moved_index = ids
        .iter()
        .position(|id| *id == moved)
        .ok_or_else(|| Error::NotFound(format!("item {moved} not found")))?;
    let target_index = ids
        .iter()
        .position(|id| *id == target)
        .ok_or_else(|| Error::NotFound(format!("item {target} not found")))?;

    let dragged = ids.remove(moved_index);
    let insert_at = target_index.min(ids.len());
    ids.insert(insert_at, dragged);

    Ok(ids
        .into_iter()
        .enumerate()
        .map(|(index, id)| (id, index as i64))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn record(id: ItemId, status: Status, position: i64, created_ms: i64) -> Record {
        Record {
            id,
            title: format!("item {id}"),
            description: "d".to_string(),
            resolved: status.implies_resolved(),
            status,
            position,
            created_at: DateTime::from_timestamp_millis(created_ms).unwrap(),
        }
    }

    fn ids(records: &[Record]) -> Vec<ItemId> {
        records.iter().map(|r| r.id).collect()
    }

    #[test]
    fn status_rank_orders_known_before_unknown() {
        assert!(status_rank(&Status::Todo) < status_rank(&Status::Progress));
        assert!(status_rank(&Status::Progress) < status_rank(&Status::Completed));
        assert!(status_rank(&Status::Completed) < status_rank(&Status::Other("zzz".into())));
        assert_eq!(
            status_rank(&Status::Other("a".into())),
            status_rank(&Status::Other("b".into()))
        );
    }

    #[test]
    fn sort_uses_rank_then_position_then_newest() {
        let mut records = vec![
            record(1, Status::Completed, 0, 1_000),
            record(2, Status::Todo, 1, 1_000),
            record(3, Status::Todo, 0, 1_000),
            record(4, Status::Todo, 0, 2_000),
            record(5, Status::Other("blocked".into()), 0, 5_000),
            record(6, Status::Progress, 9, 1_000),
        ];
        sort_records(&mut records);
        assert_eq!(ids(&records), vec![4, 3, 2, 6, 1, 5]);
    }

    #[test]
    fn same_millisecond_breaks_ties_by_id() {
        let mut records = vec![
            record(10, Status::Todo, 0, 1_000),
            record(12, Status::Todo, 0, 1_000),
            record(11, Status::Todo, 0, 1_000),
        ];
        sort_records(&mut records);
        assert_eq!(ids(&records), vec![12, 11, 10]);
    }

    #[test]
    fn reorder_moves_first_onto_last() {
        let ordered = vec![
            record(1, Status::Todo, 0, 3_000),
            record(2, Status::Todo, 1, 2_000),
            record(3, Status::Todo, 2, 1_000),
        ];
        let plan = plan_reorder(&ordered, 1, 3).unwrap();
        assert_eq!(plan, vec![(2, 0), (3, 1), (1, 2)]);
    }

    #[test]
    fn reorder_moving_up_lands_before_target() {
        let ordered = vec![
            record(1, Status::Todo, 0, 0),
            record(2, Status::Todo, 1, 0),
            record(3, Status::Todo, 2, 0),
            record(4, Status::Todo, 3, 0),
        ];
        let plan = plan_reorder(&ordered, 4, 2).unwrap();
        assert_eq!(plan, vec![(1, 0), (4, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn reorder_onto_itself_renumbers_in_place() {
        let ordered = vec![
            record(1, Status::Todo, 5, 0),
            record(2, Status::Todo, 9, 0),
        ];
        let plan = plan_reorder(&ordered, 2, 2).unwrap();
        assert_eq!(plan, vec![(1, 0), (2, 1)]);
    }

    #[test]
    fn reorder_renumbers_across_status_groups() {
        let ordered = vec![
            record(1, Status::Todo, 0, 0),
            record(2, Status::Progress, 7, 0),
            record(3, Status::Completed, 3, 0),
        ];
        let plan = plan_reorder(&ordered, 3, 1).unwrap();
        assert_eq!(plan, vec![(3, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn reorder_rejects_unknown_ids() {
        let ordered = vec![record(1, Status::Todo, 0, 0), record(2, Status::Todo, 1, 0)];
        assert!(matches!(
            plan_reorder(&ordered, 9, 1),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            plan_reorder(&ordered, 1, 9),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(plan_reorder(&[], 1, 1), Err(Error::NotFound(_))));
    }
}
