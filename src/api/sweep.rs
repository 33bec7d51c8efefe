use crate::api::schedule::load_for_department;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::attendance::AttendanceStatus;
use crate::model::department::Department;
use crate::model::work_schedule::{SUNDAY, WorkSchedule, weekday_index};
use crate::utils::holiday_cache::HolidayCache;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct DepartmentSweep {
    #[schema(example = 2)]
    pub department_id: u64,
    #[schema(example = "Science")]
    pub name: String,
    /// Users newly marked ABSENT
    #[schema(example = 4)]
    pub marked: u64,
    #[schema(example = "not a work day", nullable = true)]
    pub skipped: Option<String>,
}

/// Reason the whole institution is off on `date`, if any.
pub fn institution_closed(date: NaiveDate, is_holiday: bool) -> Option<&'static str> {
    if weekday_index(date) == SUNDAY {
        Some("Sunday")
    } else if is_holiday {
        Some("Holiday")
    } else {
        None
    }
}

/// Reason an opted-in department is left alone on `date`. `schedule` is the
/// department's own schedule or the institution default it falls back to.
pub fn department_skip(schedule: Option<&WorkSchedule>, date: NaiveDate) -> Option<&'static str> {
    match schedule {
        None => Some("no work schedule"),
        Some(s) if !s.is_work_day(date) => Some("not a work day"),
        Some(_) => None,
    }
}

async fn mark_department(
    pool: &MySqlPool,
    department_id: u64,
    date: NaiveDate,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendance (user_id, date, status)
        SELECT u.id, ?, ?
        FROM users u
        WHERE u.department_id = ?
        AND u.is_active = 1
        AND NOT EXISTS (
            SELECT 1 FROM attendance a
            WHERE a.user_id = u.id AND a.date = ?
        )
        "#,
    )
    .bind(date)
    .bind(AttendanceStatus::Absent.as_ref())
    .bind(department_id)
    .bind(date)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Marks everyone without a row today as ABSENT (System/Admin)
///
/// Departments are processed one after another with no surrounding transaction,
/// so a failure leaves earlier departments marked.
#[utoipa::path(
    post,
    path = "/api/attendance/auto-absent",
    responses(
        (status = 200, description = "Per-department results", body = Object, example = json!({
            "date": "2026-03-02",
            "skipped": null,
            "departments": [
                {"department_id": 2, "name": "Science", "marked": 4, "skipped": null}
            ]
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn auto_absent(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    holidays: web::Data<HolidayCache>,
) -> actix_web::Result<impl Responder> {
    auth.require_system_or_admin()?;

    let today = config.local_time(Utc::now()).date();

    let is_holiday = holidays
        .is_holiday(pool.get_ref(), today)
        .await
        .map_err(|e| ApiError::internal("Failed to load holidays", e))?;

    if let Some(reason) = institution_closed(today, is_holiday) {
        info!(%today, reason, "Auto-absent sweep skipped");
        return Ok(HttpResponse::Ok().json(json!({
            "date": today,
            "skipped": reason,
            "departments": []
        })));
    }

    let departments = sqlx::query_as::<_, Department>(
        r#"
        SELECT id, name, auto_mark_absent
        FROM departments
        WHERE auto_mark_absent = 1
        ORDER BY id
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| ApiError::internal("Failed to load departments", e))?;

    let mut results = Vec::with_capacity(departments.len());

    for department in departments {
        let schedule = load_for_department(pool.get_ref(), Some(department.id)).await?;

        if let Some(reason) = department_skip(schedule.as_ref(), today) {
            if schedule.is_none() {
                warn!(department_id = department.id, "No schedule for opted-in department");
            }
            results.push(DepartmentSweep {
                department_id: department.id,
                name: department.name,
                marked: 0,
                skipped: Some(reason.to_string()),
            });
            continue;
        }

        let marked = mark_department(pool.get_ref(), department.id, today)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    department_id = department.id,
                    "Auto-absent sweep failed part way"
                );
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

        info!(department_id = department.id, marked, %today, "Department swept");

        results.push(DepartmentSweep {
            department_id: department.id,
            name: department.name,
            marked,
            skipped: None,
        });
    }

    Ok(HttpResponse::Ok().json(json!({
        "date": today,
        "skipped": null,
        "departments": results
    })))
}
