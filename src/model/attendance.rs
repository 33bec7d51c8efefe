use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    OnLeave,
    NotMarked,
}

/// Raw `attendance` row; status is stored as text.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub id: u64,
    pub user_id: u64,
    pub date: NaiveDate,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub status: String,
    pub is_late: bool,
    pub late_minutes: u32,
    pub is_early_departure: bool,
    pub early_departure_minutes: u32,
}

/// One user's attendance for one calendar day. Check-in/out are institution local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 12)]
    pub user_id: u64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "2026-03-02T09:04:00", value_type = Option<String>)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(example = "2026-03-02T16:30:00", value_type = Option<String>)]
    pub check_out: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    pub is_late: bool,
    pub late_minutes: u32,
    pub is_early_departure: bool,
    pub early_departure_minutes: u32,
}

impl AttendanceRecord {
    /// Blank record for a date, used when synthesizing rows.
    pub fn new(user_id: u64, date: NaiveDate, status: AttendanceStatus) -> Self {
        Self {
            id: 0,
            user_id,
            date,
            check_in: None,
            check_out: None,
            status,
            is_late: false,
            late_minutes: 0,
            is_early_departure: false,
            early_departure_minutes: 0,
        }
    }

    /// Whole minutes between check-in and check-out, zero when either is missing.
    pub fn worked_minutes(&self) -> u64 {
        match (self.check_in, self.check_out) {
            (Some(check_in), Some(check_out)) => {
                (check_out - check_in).num_minutes().max(0) as u64
            }
            _ => 0,
        }
    }
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = String;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<AttendanceStatus>()
            .map_err(|_| format!("unknown attendance status '{}'", row.status))?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            date: row.date,
            check_in: row.check_in,
            check_out: row.check_out,
            status,
            is_late: row.is_late,
            late_minutes: row.late_minutes,
            is_early_departure: row.is_early_departure,
            early_departure_minutes: row.early_departure_minutes,
        })
    }
}

pub const ATTENDANCE_COLUMNS: &str = "id, user_id, date, check_in, check_out, status, \
     is_late, late_minutes, is_early_departure, early_departure_minutes";

/// Converts fetched rows, failing on the first row with an unknown status.
pub fn records_from_rows(rows: Vec<AttendanceRow>) -> Result<Vec<AttendanceRecord>, String> {
    rows.into_iter().map(AttendanceRecord::try_from).collect()
}
