use crate::api::attendance::resolve_month;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::attendance::{AttendanceRecord, AttendanceRow};
use crate::services::export::{ExportRow, attendance_csv};
use actix_web::{HttpResponse, Responder, http::header, web};
use chrono::Utc;
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    /// Limit the sheet to one department
    pub department_id: Option<u64>,
}

#[derive(sqlx::FromRow)]
struct ExportSqlRow {
    username: String,
    #[sqlx(flatten)]
    attendance: AttendanceRow,
}

/// Monthly attendance sheet as CSV (Admin/Principal)
#[utoipa::path(
    get,
    path = "/api/reports/attendance.csv",
    params(ReportQuery),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String),
        (status = 400, description = "Invalid year or month"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
pub async fn attendance_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<ReportQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin_or_principal()?;

    let today = config.local_time(Utc::now()).date();
    let (year, month, first, last) = resolve_month(query.year, query.month, today)?;

    let rows = sqlx::query_as::<_, ExportSqlRow>(
        r#"
        SELECT u.username,
               a.id, a.user_id, a.date, a.check_in, a.check_out, a.status,
               a.is_late, a.late_minutes, a.is_early_departure, a.early_departure_minutes
        FROM attendance a
        JOIN users u ON u.id = a.user_id
        WHERE a.date BETWEEN ? AND ?
        AND (? IS NULL OR u.department_id = ?)
        ORDER BY a.date, u.username
        "#,
    )
    .bind(first)
    .bind(last)
    .bind(query.department_id)
    .bind(query.department_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| ApiError::internal("Failed to load attendance for export", e))?;

    let export = rows
        .into_iter()
        .map(|row| {
            AttendanceRecord::try_from(row.attendance).map(|record| ExportRow {
                username: row.username,
                record,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::internal("Corrupt attendance row", e))?;

    let body = attendance_csv(&export).map_err(|e| ApiError::internal("Failed to render CSV", e))?;

    tracing::info!(
        year,
        month,
        rows = export.len(),
        requested_by = auth.user_id,
        "Attendance exported"
    );

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"attendance-{}-{:02}.csv\"", year, month),
        ))
        .body(body))
}
