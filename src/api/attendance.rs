use crate::api::schedule::load_for_department;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::db::is_duplicate_key;
use crate::error::ApiError;
use crate::model::attendance::{
    ATTENDANCE_COLUMNS, AttendanceRecord, AttendanceRow, records_from_rows,
};
use crate::model::work_schedule::{SUNDAY, WorkSchedule, weekday_index};
use crate::services::calendar::{merge, month_bounds, sundays_in_month};
use crate::services::lateness::{EventKind, classify};
use crate::services::summary::summarize;
use crate::services::time_window::{GeoPoint, is_within_allowed_time};
use crate::utils::holiday_cache::HolidayCache;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckInRequest {
    #[schema(example = 23.8103, nullable = true)]
    pub latitude: Option<f64>,
    #[schema(example = 90.4125, nullable = true)]
    pub longitude: Option<f64>,
}

impl CheckInRequest {
    fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MonthQuery {
    /// Defaults to the current local year
    pub year: Option<i32>,
    /// 1-12, defaults to the current local month
    pub month: Option<u32>,
    /// Admin/Principal only; defaults to the caller
    pub user_id: Option<u64>,
}

/// Year/month of a query, defaulting to the month containing `today`.
pub fn resolve_month(
    year: Option<i32>,
    month: Option<u32>,
    today: NaiveDate,
) -> Result<(i32, u32, NaiveDate, NaiveDate), ApiError> {
    let year = year.unwrap_or(today.year());
    let month = month.unwrap_or(today.month());
    let (first, last) = month_bounds(year, month)
        .ok_or_else(|| ApiError::BadRequest("Invalid year or month".to_string()))?;
    Ok((year, month, first, last))
}

pub async fn fetch_user_records(
    pool: &MySqlPool,
    user_id: u64,
    first: NaiveDate,
    last: NaiveDate,
) -> Result<Vec<AttendanceRecord>, ApiError> {
    let sql = format!(
        r#"
        SELECT {}
        FROM attendance
        WHERE user_id = ? AND date BETWEEN ? AND ?
        ORDER BY date
        "#,
        ATTENDANCE_COLUMNS
    );

    let rows = sqlx::query_as::<_, AttendanceRow>(&sql)
        .bind(user_id)
        .bind(first)
        .bind(last)
        .fetch_all(pool)
        .await
        .map_err(|e| ApiError::internal("Failed to load attendance", e))?;

    records_from_rows(rows).map_err(|e| ApiError::internal("Corrupt attendance row", e))
}

async fn schedule_for(pool: &MySqlPool, auth: &AuthUser) -> Result<WorkSchedule, ApiError> {
    load_for_department(pool, auth.department_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No work schedule configured".to_string()))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body(content = CheckInRequest, description = "Device position, required for fenced schedules"),
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully",
            "status": "LATE",
            "punctuality": {"kind": "LATE_ARRIVAL", "minutes": 12}
        })),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Outside the allowed time window or location"),
        (status = 404, description = "No work schedule configured"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: Option<web::Json<CheckInRequest>>,
) -> actix_web::Result<impl Responder> {
    let now = config.local_time(Utc::now());
    let today = now.date();

    if weekday_index(today) == SUNDAY {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Attendance is not recorded on Sundays"
        })));
    }

    let schedule = schedule_for(pool.get_ref(), &auth).await?;
    let request = payload.map(web::Json::into_inner).unwrap_or_default();

    if !is_within_allowed_time(
        &schedule,
        now,
        request.location(),
        config.enforce_check_in_window,
    ) {
        return Err(ApiError::Forbidden(
            "Check-in is outside the allowed time window or location".to_string(),
        )
        .into());
    }

    let outcome = classify(&schedule, now, EventKind::CheckIn);
    let status = outcome.attendance_status();

    let result = sqlx::query(
        r#"
        INSERT INTO attendance (user_id, date, check_in, status, is_late, late_minutes)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(today)
    .bind(now)
    .bind(status.as_ref())
    .bind(outcome.late_minutes() > 0)
    .bind(outcome.late_minutes())
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            tracing::info!(user_id = auth.user_id, %status, "Checked in");
            Ok(HttpResponse::Ok().json(json!({
                "message": "Checked in successfully",
                "status": status,
                "punctuality": outcome
            })))
        }

        // one row per user and day
        Err(e) if is_duplicate_key(&e) => Ok(HttpResponse::BadRequest().json(json!({
            "message": "Already checked in today"
        }))),

        Err(e) => {
            tracing::error!(error = %e, user_id = auth.user_id, "Check-in failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/attendance/check-out",
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Checked out successfully",
            "punctuality": {"kind": "EARLY_DEPARTURE", "minutes": 20}
        })),
        (status = 400, description = "No active check-in found for today", body = Object, example = json!({
            "message": "No active check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No work schedule configured"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let now: NaiveDateTime = config.local_time(Utc::now());
    let schedule = schedule_for(pool.get_ref(), &auth).await?;
    let outcome = classify(&schedule, now, EventKind::CheckOut);

    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = ?, is_early_departure = ?, early_departure_minutes = ?
        WHERE user_id = ?
        AND date = ?
        AND check_in IS NOT NULL
        AND check_out IS NULL
        "#,
    )
    .bind(now)
    .bind(outcome.early_minutes() > 0)
    .bind(outcome.early_minutes())
    .bind(auth.user_id)
    .bind(now.date())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Check-out failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "No active check-in found for today"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked out successfully",
        "punctuality": outcome
    })))
}

/// Monthly attendance summary
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(MonthQuery),
    responses(
        (status = 200, description = "Counts and worked hours for the month", body = MonthlySummary),
        (status = 400, description = "Invalid year or month"),
        (status = 403, description = "Cannot access another user's attendance"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn monthly_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<MonthQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = auth.scoped_user_id(query.user_id)?;
    let today = config.local_time(Utc::now()).date();
    let (_, _, first, last) = resolve_month(query.year, query.month, today)?;

    let records = fetch_user_records(pool.get_ref(), user_id, first, last).await?;

    Ok(HttpResponse::Ok().json(summarize(&records)))
}

/// Month calendar: attendance rows, Sundays and holidays in date order
#[utoipa::path(
    get,
    path = "/api/attendance/history",
    params(MonthQuery),
    responses(
        (status = 200, description = "Merged calendar", body = Object, example = json!({
            "year": 2026,
            "month": 3,
            "entries": [
                {"type": "SUNDAY", "date": "2026-03-01"},
                {"type": "HOLIDAY", "date": "2026-03-04", "name": "Holi"}
            ]
        })),
        (status = 400, description = "Invalid year or month"),
        (status = 403, description = "Cannot access another user's attendance"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    holidays: web::Data<HolidayCache>,
    query: web::Query<MonthQuery>,
) -> actix_web::Result<impl Responder> {
    let user_id = auth.scoped_user_id(query.user_id)?;
    let today = config.local_time(Utc::now()).date();
    let (year, month, first, last) = resolve_month(query.year, query.month, today)?;

    let records = fetch_user_records(pool.get_ref(), user_id, first, last).await?;
    let month_holidays = holidays
        .month(pool.get_ref(), year, month)
        .await
        .map_err(|e| ApiError::internal("Failed to load holidays", e))?;

    let entries = merge(
        records,
        month_holidays.as_ref().clone(),
        sundays_in_month(year, month),
    );

    Ok(HttpResponse::Ok().json(json!({
        "year": year,
        "month": month,
        "user_id": user_id,
        "entries": entries
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_resolve_month_defaults_to_today() {
        let (year, month, first, last) = resolve_month(None, None, d(2026, 2, 17)).unwrap();
        assert_eq!((year, month), (2026, 2));
        assert_eq!(first, d(2026, 2, 1));
        assert_eq!(last, d(2026, 2, 28));
    }

    #[test]
    fn test_resolve_month_explicit_and_invalid() {
        let (_, _, first, last) = resolve_month(Some(2024), Some(2), d(2026, 2, 17)).unwrap();
        assert_eq!((first, last), (d(2024, 2, 1), d(2024, 2, 29)));

        assert!(resolve_month(Some(2026), Some(0), d(2026, 2, 17)).is_err());
        assert!(resolve_month(None, Some(13), d(2026, 2, 17)).is_err());
    }

    #[test]
    fn test_check_in_location_needs_both_coordinates() {
        let full = CheckInRequest {
            latitude: Some(23.8),
            longitude: Some(90.4),
        };
        assert!(full.location().is_some());

        let partial = CheckInRequest {
            latitude: Some(23.8),
            longitude: None,
        };
        assert!(partial.location().is_none());
        assert!(CheckInRequest::default().location().is_none());
    }
}
