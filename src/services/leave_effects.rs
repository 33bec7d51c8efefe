use chrono::NaiveDate;

use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::leave_request::LeaveStatus;
use crate::services::calendar::days_in_range;

/// A single write against the attendance table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendanceChange {
    Insert { user_id: u64, date: NaiveDate },
    MarkOnLeave { record_id: u64 },
    Delete { record_id: u64 },
}

/// Rows of `existing` that belong to `user_id` and fall inside `[start, end]`.
fn in_range<'a>(
    user_id: u64,
    start: NaiveDate,
    end: NaiveDate,
    existing: &'a [AttendanceRecord],
) -> impl Iterator<Item = &'a AttendanceRecord> {
    existing
        .iter()
        .filter(move |r| r.user_id == user_id && r.date >= start && r.date <= end)
}

/// Writes needed to put a user on leave for `[start, end]`.
///
/// With no rows in range, one ON_LEAVE row is created per day, Sundays included.
/// Otherwise only existing rows are touched: non-ON_LEAVE rows are switched to
/// ON_LEAVE and days without a row stay empty.
pub fn plan_approval(
    user_id: u64,
    start: NaiveDate,
    end: NaiveDate,
    existing: &[AttendanceRecord],
) -> Vec<AttendanceChange> {
    let rows: Vec<_> = in_range(user_id, start, end, existing).collect();

    if rows.is_empty() {
        return days_in_range(start, end)
            .into_iter()
            .map(|date| AttendanceChange::Insert { user_id, date })
            .collect();
    }

    rows.into_iter()
        .filter(|r| r.status != AttendanceStatus::OnLeave)
        .map(|r| AttendanceChange::MarkOnLeave { record_id: r.id })
        .collect()
}

/// Deletes every ON_LEAVE row in range, whichever request produced it.
pub fn plan_rejection(
    user_id: u64,
    start: NaiveDate,
    end: NaiveDate,
    existing: &[AttendanceRecord],
) -> Vec<AttendanceChange> {
    in_range(user_id, start, end, existing)
        .filter(|r| r.status == AttendanceStatus::OnLeave)
        .map(|r| AttendanceChange::Delete { record_id: r.id })
        .collect()
}

/// Plan for moving a request to `target`. `None` when the target is not a decision.
pub fn plan_transition(
    target: LeaveStatus,
    user_id: u64,
    start: NaiveDate,
    end: NaiveDate,
    existing: &[AttendanceRecord],
) -> Option<Vec<AttendanceChange>> {
    match target {
        LeaveStatus::Approved => Some(plan_approval(user_id, start, end, existing)),
        LeaveStatus::Rejected => Some(plan_rejection(user_id, start, end, existing)),
        LeaveStatus::Pending => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    // in-memory stand-in for the database writes
    fn apply(existing: &mut Vec<AttendanceRecord>, changes: &[AttendanceChange]) {
        let mut next_id = existing.iter().map(|r| r.id).max().unwrap_or(0) + 1;

        for change in changes {
            match change {
                AttendanceChange::Insert { user_id, date } => {
                    let mut record =
                        AttendanceRecord::new(*user_id, *date, AttendanceStatus::OnLeave);
                    record.id = next_id;
                    next_id += 1;
                    existing.push(record);
                }
                AttendanceChange::MarkOnLeave { record_id } => {
                    if let Some(r) = existing.iter_mut().find(|r| r.id == *record_id) {
                        r.status = AttendanceStatus::OnLeave;
                    }
                }
                AttendanceChange::Delete { record_id } => {
                    existing.retain(|r| r.id != *record_id);
                }
            }
        }
    }

    fn row(id: u64, user_id: u64, day: u32, status: AttendanceStatus) -> AttendanceRecord {
        let mut r = AttendanceRecord::new(user_id, d(day), status);
        r.id = id;
        r
    }

    #[test]
    fn test_approval_on_empty_range_inserts_every_day() {
        // 6th..9th covers Saturday and Sunday
        let changes = plan_approval(12, d(6), d(9), &[]);
        assert_eq!(
            changes,
            vec![
                AttendanceChange::Insert { user_id: 12, date: d(6) },
                AttendanceChange::Insert { user_id: 12, date: d(7) },
                AttendanceChange::Insert { user_id: 12, date: d(8) },
                AttendanceChange::Insert { user_id: 12, date: d(9) },
            ]
        );
    }

    #[test]
    fn test_approval_ignores_other_users_and_out_of_range_rows() {
        let existing = vec![
            row(1, 99, 6, AttendanceStatus::Present),
            row(2, 12, 5, AttendanceStatus::Present),
            row(3, 12, 10, AttendanceStatus::Absent),
        ];
        let changes = plan_approval(12, d(6), d(7), &existing);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| matches!(c, AttendanceChange::Insert { user_id: 12, .. })));
    }

    #[test]
    fn test_approval_with_existing_rows_only_mutates_them() {
        let existing = vec![
            row(1, 12, 2, AttendanceStatus::Present),
            row(2, 12, 3, AttendanceStatus::OnLeave),
            row(3, 12, 4, AttendanceStatus::Absent),
        ];
        let changes = plan_approval(12, d(2), d(6), &existing);
        assert_eq!(
            changes,
            vec![
                AttendanceChange::MarkOnLeave { record_id: 1 },
                AttendanceChange::MarkOnLeave { record_id: 3 },
            ]
        );
    }

    #[test]
    fn test_reapproval_is_idempotent() {
        let mut rows = Vec::new();
        let first = plan_approval(12, d(2), d(4), &rows);
        apply(&mut rows, &first);
        assert_eq!(rows.len(), 3);

        let second = plan_approval(12, d(2), d(4), &rows);
        assert!(second.is_empty());
        apply(&mut rows, &second);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.status == AttendanceStatus::OnLeave));
    }

    #[test]
    fn test_rejection_deletes_only_on_leave_rows() {
        let mut rows = vec![
            row(1, 12, 2, AttendanceStatus::Present),
            row(2, 12, 3, AttendanceStatus::OnLeave),
            row(3, 12, 4, AttendanceStatus::Late),
            row(4, 12, 5, AttendanceStatus::Absent),
            row(5, 12, 6, AttendanceStatus::OnLeave),
            row(6, 12, 12, AttendanceStatus::OnLeave),
            row(7, 40, 3, AttendanceStatus::OnLeave),
        ];
        let changes = plan_rejection(12, d(2), d(6), &rows);
        assert_eq!(
            changes,
            vec![
                AttendanceChange::Delete { record_id: 2 },
                AttendanceChange::Delete { record_id: 5 },
            ]
        );

        apply(&mut rows, &changes);
        let remaining: Vec<_> = rows.iter().map(|r| r.id).collect();
        assert_eq!(remaining, vec![1, 3, 4, 6, 7]);
    }

    #[test]
    fn test_plan_transition() {
        assert!(plan_transition(LeaveStatus::Pending, 1, d(2), d(3), &[]).is_none());
        assert_eq!(
            plan_transition(LeaveStatus::Approved, 1, d(2), d(3), &[]).unwrap().len(),
            2
        );
        assert!(plan_transition(LeaveStatus::Rejected, 1, d(2), d(3), &[])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_approve_then_reject_restores_empty_range() {
        let mut rows = Vec::new();
        let approval = plan_approval(12, d(9), d(13), &rows);
        apply(&mut rows, &approval);
        assert_eq!(rows.len(), 5);
        let rejection = plan_rejection(12, d(9), d(13), &rows);
        apply(&mut rows, &rejection);
        assert!(rows.is_empty());
    }
}
