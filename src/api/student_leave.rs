use std::collections::BTreeSet;

use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::student_leave::StudentLeave;
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordAbsences {
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[validate(length(max = 255, message = "reason must be at most 255 characters"))]
    #[schema(example = "fever", nullable = true)]
    pub reason: Option<String>,
    #[validate(length(min = 1, max = 500, message = "between 1 and 500 student ids required"))]
    #[schema(example = json!([4021, 4022]))]
    pub student_ids: Vec<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AbsenceQuery {
    /// Day to list, e.g. 2026-03-02
    #[param(value_type = String, format = Date)]
    pub date: NaiveDate,
}

/// One row per distinct student, all stamped with the same `recorded_at`.
pub fn absence_rows(
    payload: &RecordAbsences,
    recorded_by: u64,
    recorded_at: DateTime<Utc>,
) -> Vec<StudentLeave> {
    let reason = payload
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    payload
        .student_ids
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|student_id| StudentLeave {
            id: 0,
            student_id,
            date: payload.date,
            reason: reason.clone(),
            recorded_by,
            recorded_at,
        })
        .collect()
}

/// Log absent students for a day
#[utoipa::path(
    post,
    path = "/api/student-absences",
    request_body = RecordAbsences,
    responses(
        (status = 201, description = "Absences recorded", body = Object, example = json!({
            "message": "Absences recorded",
            "recorded": 2
        })),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
pub async fn record_absences(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<RecordAbsences>,
) -> actix_web::Result<impl Responder> {
    payload.validate().map_err(ApiError::from)?;

    let rows = absence_rows(&payload, auth.user_id, Utc::now());

    let mut builder: QueryBuilder<MySql> = QueryBuilder::new(
        "INSERT INTO student_leaves (student_id, date, reason, recorded_by, recorded_at) ",
    );
    builder.push_values(&rows, |mut b, row| {
        b.push_bind(row.student_id)
            .push_bind(row.date)
            .push_bind(row.reason.clone())
            .push_bind(row.recorded_by)
            .push_bind(row.recorded_at);
    });
    // a student is logged at most once per day; the latest entry wins
    builder.push(
        " ON DUPLICATE KEY UPDATE reason = VALUES(reason), \
         recorded_by = VALUES(recorded_by), recorded_at = VALUES(recorded_at)",
    );

    builder
        .build()
        .execute(pool.get_ref())
        .await
        .map_err(|e| ApiError::internal("Failed to record student absences", e))?;

    tracing::info!(
        recorded_by = auth.user_id,
        date = %payload.date,
        count = rows.len(),
        "Student absences recorded"
    );

    Ok(HttpResponse::Created().json(json!({
        "message": "Absences recorded",
        "recorded": rows.len()
    })))
}

/// Students logged absent on a day
#[utoipa::path(
    get,
    path = "/api/student-absences",
    params(AbsenceQuery),
    responses(
        (status = 200, description = "Absences for the day", body = [StudentLeave]),
        (status = 400, description = "Missing or invalid date"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
pub async fn list_absences(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AbsenceQuery>,
) -> actix_web::Result<impl Responder> {
    let absences = sqlx::query_as::<_, StudentLeave>(
        r#"
        SELECT id, student_id, date, reason, recorded_by, recorded_at
        FROM student_leaves
        WHERE date = ?
        ORDER BY student_id
        "#,
    )
    .bind(query.date)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| ApiError::internal("Failed to list student absences", e))?;

    Ok(HttpResponse::Ok().json(absences))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(ids: Vec<u64>, reason: Option<&str>) -> RecordAbsences {
        RecordAbsences {
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            reason: reason.map(str::to_string),
            student_ids: ids,
        }
    }

    #[test]
    fn test_validation_limits() {
        assert!(payload(vec![1], None).validate().is_ok());
        assert!(payload(vec![], None).validate().is_err());
        assert!(payload((1..=501).collect(), None).validate().is_err());
        assert!(payload((1..=500).collect(), None).validate().is_ok());

        let long = "x".repeat(256);
        assert!(payload(vec![1], Some(&long)).validate().is_err());
    }

    #[test]
    fn test_validation_error_maps_to_bad_request() {
        use actix_web::ResponseError;

        let err = ApiError::from(payload(vec![], None).validate().unwrap_err());
        assert_eq!(err.status_code(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_rows_share_the_given_timestamp() {
        let now = DateTime::parse_from_rfc3339("2026-03-02T03:15:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let rows = absence_rows(&payload(vec![9, 4, 9], Some("  fever ")), 12, now);

        assert_eq!(rows.iter().map(|r| r.student_id).collect::<Vec<_>>(), vec![4, 9]);
        assert!(rows.iter().all(|r| r.recorded_at == now && r.recorded_by == 12));
        assert!(rows.iter().all(|r| r.reason.as_deref() == Some("fever")));
    }

    #[test]
    fn test_blank_reason_is_dropped() {
        let rows = absence_rows(&payload(vec![1], Some("   ")), 12, Utc::now());
        assert_eq!(rows[0].reason, None);
    }
}
