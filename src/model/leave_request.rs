use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, sqlx::FromRow)]
pub struct LeaveRequestRow {
    pub id: u64,
    pub user_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: String,
    pub feedback: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Teacher leave request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 12)]
    pub user_id: u64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-04", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "family function")]
    pub reason: String,
    pub status: LeaveStatus,
    #[schema(example = "enjoy", nullable = true)]
    pub feedback: Option<String>,
    #[schema(example = "2026-02-25T06:00:00Z", format = "date-time", value_type = Option<String>)]
    pub created_at: Option<DateTime<Utc>>,
}

pub const LEAVE_COLUMNS: &str =
    "id, user_id, start_date, end_date, reason, status, feedback, created_at";

impl TryFrom<LeaveRequestRow> for LeaveRequest {
    type Error = String;

    fn try_from(row: LeaveRequestRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<LeaveStatus>()
            .map_err(|_| format!("unknown leave status '{}'", row.status))?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            status,
            feedback: row.feedback,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leave_status_text() {
        assert_eq!(LeaveStatus::Approved.as_ref(), "APPROVED");
        assert_eq!("REJECTED".parse::<LeaveStatus>().unwrap(), LeaveStatus::Rejected);
        assert!("approved".parse::<LeaveStatus>().is_err());
    }
}
