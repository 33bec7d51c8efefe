use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One absent student on one day, as logged by a teacher.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct StudentLeave {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 4021)]
    pub student_id: u64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "fever", nullable = true)]
    pub reason: Option<String>,
    #[schema(example = 12)]
    pub recorded_by: u64,
    #[schema(example = "2026-03-02T03:15:00Z", format = "date-time", value_type = String)]
    pub recorded_at: DateTime<Utc>,
}
