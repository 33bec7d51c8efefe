use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::attendance::{
    ATTENDANCE_COLUMNS, AttendanceRecord, AttendanceRow, records_from_rows,
};
use crate::model::holiday::Holiday;
use crate::model::leave_request::{LEAVE_COLUMNS, LeaveRequest, LeaveRequestRow};
use crate::model::student_leave::StudentLeave;
use crate::model::work_schedule::{WORK_SCHEDULE_COLUMNS, WorkSchedule, WorkScheduleRow};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;

/// Everything needed to rebuild the attendance data of an institution.
#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub institution: String,
    pub taken_at: DateTime<Utc>,
    pub attendance: Vec<AttendanceRecord>,
    pub holidays: Vec<Holiday>,
    pub leave_requests: Vec<LeaveRequest>,
    pub student_leaves: Vec<StudentLeave>,
    pub work_schedules: Vec<WorkSchedule>,
}

pub fn object_name(institution: &str, taken_at: DateTime<Utc>) -> String {
    format!(
        "backup-{}-{}.json",
        institution,
        taken_at.format("%Y%m%dT%H%M%SZ")
    )
}

pub fn upload_url(base: &str, object: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), object)
}

async fn take_snapshot(
    pool: &MySqlPool,
    institution: &str,
    taken_at: DateTime<Utc>,
) -> Result<Snapshot, ApiError> {
    let attendance_rows = sqlx::query_as::<_, AttendanceRow>(&format!(
        "SELECT {} FROM attendance ORDER BY date, user_id",
        ATTENDANCE_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| ApiError::internal("Backup: failed to read attendance", e))?;
    let attendance = records_from_rows(attendance_rows)
        .map_err(|e| ApiError::internal("Backup: corrupt attendance row", e))?;

    let holidays = sqlx::query_as::<_, Holiday>("SELECT id, date, name FROM holidays ORDER BY date")
        .fetch_all(pool)
        .await
        .map_err(|e| ApiError::internal("Backup: failed to read holidays", e))?;

    let leave_requests = sqlx::query_as::<_, LeaveRequestRow>(&format!(
        "SELECT {} FROM leave_requests ORDER BY id",
        LEAVE_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| ApiError::internal("Backup: failed to read leave requests", e))?
    .into_iter()
    .map(LeaveRequest::try_from)
    .collect::<Result<Vec<_>, _>>()
    .map_err(|e| ApiError::internal("Backup: corrupt leave request", e))?;

    let student_leaves = sqlx::query_as::<_, StudentLeave>(
        "SELECT id, student_id, date, reason, recorded_by, recorded_at FROM student_leaves ORDER BY id",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| ApiError::internal("Backup: failed to read student leaves", e))?;

    let work_schedules = sqlx::query_as::<_, WorkScheduleRow>(&format!(
        "SELECT {} FROM work_schedules ORDER BY id",
        WORK_SCHEDULE_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| ApiError::internal("Backup: failed to read work schedules", e))?
    .into_iter()
    .map(WorkSchedule::try_from)
    .collect::<Result<Vec<_>, _>>()
    .map_err(|e| ApiError::internal("Backup: corrupt work schedule", e))?;

    Ok(Snapshot {
        institution: institution.to_string(),
        taken_at,
        attendance,
        holidays,
        leave_requests,
        student_leaves,
        work_schedules,
    })
}

/// Upload a JSON snapshot of the attendance tables (Admin only)
#[utoipa::path(
    post,
    path = "/api/admin/backup",
    responses(
        (status = 200, description = "Snapshot uploaded", body = Object, example = json!({
            "message": "Backup uploaded",
            "object": "backup-default-20260302T180000Z.json",
            "bytes": 48213
        })),
        (status = 403, description = "Forbidden"),
        (status = 502, description = "Backup storage unreachable or rejected the upload"),
        (status = 503, description = "Backup storage not configured"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin"
)]
pub async fn upload_backup(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let (Some(base_url), Some(token)) = (&config.backup_upload_url, &config.backup_upload_token)
    else {
        return Err(ApiError::Unavailable("Backup storage not configured".to_string()).into());
    };

    let taken_at = Utc::now();
    let snapshot = take_snapshot(pool.get_ref(), &config.institution_id, taken_at).await?;
    let body = serde_json::to_vec(&snapshot)
        .map_err(|e| ApiError::internal("Backup: failed to serialize snapshot", e))?;

    let object = object_name(&config.institution_id, taken_at);
    let bytes = body.len();

    let client = reqwest::Client::new();
    let resp = client
        .put(upload_url(base_url, &object))
        .bearer_auth(token)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, object = %object, "Backup upload failed");
            ApiError::Upstream("Backup upload failed".to_string())
        })?;

    if !resp.status().is_success() {
        let status = resp.status();
        let detail = resp.text().await.unwrap_or_default();
        tracing::error!(
            %status,
            detail = %detail,
            object = %object,
            "Backup storage rejected upload"
        );
        return Err(ApiError::Upstream("Backup storage rejected upload".to_string()).into());
    }

    tracing::info!(object = %object, bytes, requested_by = auth.user_id, "Backup uploaded");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Backup uploaded",
        "object": object,
        "bytes": bytes
    })))
}
