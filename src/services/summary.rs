use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::{AttendanceRecord, AttendanceStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthlySummary {
    pub present_days: u32,
    pub late_days: u32,
    pub absent_days: u32,
    pub on_leave_days: u32,
    pub not_marked_days: u32,
    /// Present plus late; a late arrival still counts as presence
    pub this_month: u32,
    pub total_work_minutes: u64,
    /// `HH:MM`, hours may exceed 23
    #[schema(example = "142:35")]
    pub total_work_hours: String,
}

/// Zero-padded `HH:MM`. Hours are not wrapped at 24.
pub fn format_minutes(total: u64) -> String {
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Linear scan over one user's records for one month.
pub fn summarize(records: &[AttendanceRecord]) -> MonthlySummary {
    let mut summary = MonthlySummary::default();

    for record in records {
        match record.status {
            AttendanceStatus::Present => summary.present_days += 1,
            AttendanceStatus::Late => summary.late_days += 1,
            AttendanceStatus::Absent => summary.absent_days += 1,
            AttendanceStatus::OnLeave => summary.on_leave_days += 1,
            AttendanceStatus::NotMarked => summary.not_marked_days += 1,
        }
        summary.total_work_minutes += record.worked_minutes();
    }

    summary.this_month = summary.present_days + summary.late_days;
    summary.total_work_hours = format_minutes(summary.total_work_minutes);
    summary
}
