use std::collections::BTreeSet;

use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::work_schedule::{
    Geofence, MAX_GRACE_MINUTES, SaturdayOverride, WORK_SCHEDULE_COLUMNS, WorkSchedule,
    WorkScheduleRow, format_work_days, parse_work_days,
};
use crate::utils::db_utils::{build_update_sql, execute_update};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveTime;
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::{MySqlExecutor, MySqlPool};
use utoipa::ToSchema;

const UPDATABLE_COLUMNS: &[&str] = &[
    "department_id",
    "start_time",
    "end_time",
    "grace_minutes",
    "work_days",
    "saturday_start_time",
    "saturday_end_time",
    "saturday_grace_minutes",
    "latitude",
    "longitude",
    "radius_meters",
];

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateScheduleRequest {
    /// Omit for the institution-wide default
    #[schema(example = 2, nullable = true)]
    pub department_id: Option<u64>,
    #[schema(example = "09:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "16:00:00", value_type = String)]
    pub end_time: NaiveTime,
    #[schema(example = 10)]
    pub grace_minutes: u32,
    #[schema(example = json!([1, 2, 3, 4, 5, 6]))]
    pub work_days: Vec<u8>,
    pub saturday: Option<SaturdayOverride>,
    pub geofence: Option<Geofence>,
}

impl From<CreateScheduleRequest> for WorkSchedule {
    fn from(req: CreateScheduleRequest) -> Self {
        WorkSchedule {
            id: 0,
            department_id: req.department_id,
            start_time: req.start_time,
            end_time: req.end_time,
            grace_minutes: req.grace_minutes,
            work_days: req.work_days.into_iter().collect::<BTreeSet<u8>>(),
            saturday: req.saturday,
            geofence: req.geofence,
        }
    }
}

fn to_schedule(row: WorkScheduleRow) -> Result<WorkSchedule, ApiError> {
    let id = row.id;
    WorkSchedule::try_from(row)
        .map_err(|e| ApiError::internal(&format!("Corrupt work schedule {}", id), e))
}

/// Schedule for a department, falling back to the institution default
/// (the row with no department).
pub async fn load_for_department<'e, E>(
    executor: E,
    department_id: Option<u64>,
) -> Result<Option<WorkSchedule>, ApiError>
where
    E: MySqlExecutor<'e>,
{
    let sql = format!(
        r#"
        SELECT {}
        FROM work_schedules
        WHERE department_id = ? OR department_id IS NULL
        ORDER BY department_id IS NULL, id
        LIMIT 1
        "#,
        WORK_SCHEDULE_COLUMNS
    );

    let row = sqlx::query_as::<_, WorkScheduleRow>(&sql)
        .bind(department_id)
        .fetch_optional(executor)
        .await
        .map_err(|e| ApiError::internal("Failed to load work schedule", e))?;

    row.map(to_schedule).transpose()
}

async fn load_by_id<'e, E>(executor: E, id: u64) -> Result<Option<WorkSchedule>, ApiError>
where
    E: MySqlExecutor<'e>,
{
    let sql = format!("SELECT {} FROM work_schedules WHERE id = ?", WORK_SCHEDULE_COLUMNS);

    let row = sqlx::query_as::<_, WorkScheduleRow>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await
        .map_err(|e| ApiError::internal("Failed to load work schedule", e))?;

    row.map(to_schedule).transpose()
}

/// Checks single fields of a PATCH body and rewrites `work_days` arrays into the
/// stored comma form. Cross-field rules are checked after the update is applied.
fn normalize_patch(mut payload: Value) -> Result<Value, ApiError> {
    let obj = payload
        .as_object_mut()
        .ok_or_else(|| ApiError::BadRequest("Payload must be a JSON object".to_string()))?;

    if let Some(days) = obj.get("work_days").cloned() {
        let parsed = match days {
            Value::String(raw) => parse_work_days(&raw),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_u64().map(|d| d.to_string()).ok_or("work_days must hold integers"))
                .collect::<Result<Vec<_>, _>>()
                .map_err(str::to_string)
                .and_then(|parts| parse_work_days(&parts.join(","))),
            _ => Err("work_days must be an array or a comma separated string".to_string()),
        }
        .map_err(ApiError::Validation)?;
        obj.insert("work_days".to_string(), Value::String(format_work_days(&parsed)));
    }

    for key in ["grace_minutes", "saturday_grace_minutes"] {
        if let Some(value) = obj.get(key) {
            match value.as_u64() {
                Some(g) if g <= MAX_GRACE_MINUTES as u64 => {}
                None if value.is_null() && key == "saturday_grace_minutes" => {}
                _ => {
                    return Err(ApiError::Validation(format!(
                        "{} must be between 0 and {}",
                        key, MAX_GRACE_MINUTES
                    )));
                }
            }
        }
    }

    Ok(payload)
}

/// List work schedules
#[utoipa::path(
    get,
    path = "/api/schedules",
    responses(
        (status = 200, description = "All work schedules", body = [WorkSchedule]),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Schedules"
)]
pub async fn list_schedules(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let sql = format!(
        "SELECT {} FROM work_schedules ORDER BY department_id IS NULL DESC, department_id",
        WORK_SCHEDULE_COLUMNS
    );

    let rows = sqlx::query_as::<_, WorkScheduleRow>(&sql)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| ApiError::internal("Failed to list work schedules", e))?;

    let schedules = rows
        .into_iter()
        .map(to_schedule)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(HttpResponse::Ok().json(schedules))
}

/// Get a work schedule by id
#[utoipa::path(
    get,
    path = "/api/schedules/{id}",
    params(
        ("id" = u64, Path, description = "Schedule id")
    ),
    responses(
        (status = 200, description = "Schedule found", body = WorkSchedule),
        (status = 404, description = "Schedule not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Schedules"
)]
pub async fn get_schedule(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    let schedule = load_by_id(pool.get_ref(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Schedule not found".to_string()))?;

    Ok(HttpResponse::Ok().json(schedule))
}

/// Create a work schedule (Admin only)
#[utoipa::path(
    post,
    path = "/api/schedules",
    request_body = CreateScheduleRequest,
    responses(
        (status = 201, description = "Schedule created", body = Object, example = json!({
            "message": "Schedule created",
            "id": 3
        })),
        (status = 400, description = "Invalid schedule"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Department already has a schedule"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Schedules"
)]
pub async fn create_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateScheduleRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let schedule = WorkSchedule::from(payload.into_inner());
    schedule.validate().map_err(ApiError::Validation)?;

    let saturday = schedule.saturday;
    let fence = schedule.geofence;

    let result = sqlx::query(
        r#"
        INSERT INTO work_schedules (
            department_id, start_time, end_time, grace_minutes, work_days,
            saturday_start_time, saturday_end_time, saturday_grace_minutes,
            latitude, longitude, radius_meters
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(schedule.department_id)
    .bind(schedule.start_time)
    .bind(schedule.end_time)
    .bind(schedule.grace_minutes)
    .bind(format_work_days(&schedule.work_days))
    .bind(saturday.map(|s| s.start_time))
    .bind(saturday.map(|s| s.end_time))
    .bind(saturday.map(|s| s.grace_minutes))
    .bind(fence.map(|f| f.latitude))
    .bind(fence.map(|f| f.longitude))
    .bind(fence.map(|f| f.radius_meters))
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(done) => {
            tracing::info!(
                schedule_id = done.last_insert_id(),
                department_id = ?schedule.department_id,
                "Work schedule created"
            );
            Ok(HttpResponse::Created().json(json!({
                "message": "Schedule created",
                "id": done.last_insert_id()
            })))
        }
        Err(e) if crate::db::is_duplicate_key(&e) => Err(ApiError::Conflict(
            "Department already has a schedule".to_string(),
        )
        .into()),
        Err(e) if crate::db::is_foreign_key_violation(&e) => {
            Err(ApiError::BadRequest("Unknown department".to_string()).into())
        }
        Err(e) => Err(ApiError::internal("Failed to create work schedule", e).into()),
    }
}

/// Partially update a work schedule (Admin only)
#[utoipa::path(
    patch,
    path = "/api/schedules/{id}",
    params(
        ("id" = u64, Path, description = "Schedule id")
    ),
    request_body(
        content = Object,
        description = "Any subset of the schedule columns",
        example = json!({
            "grace_minutes": 15,
            "work_days": [1, 2, 3, 4, 5]
        })
    ),
    responses(
        (status = 200, description = "Schedule updated", body = WorkSchedule),
        (status = 400, description = "Invalid update"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Schedule not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Schedules"
)]
pub async fn update_schedule(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    let payload = normalize_patch(payload.into_inner())?;
    let update = build_update_sql("work_schedules", &payload, UPDATABLE_COLUMNS, "id", id)?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| ApiError::internal("Failed to start transaction", e))?;

    if load_by_id(&mut *tx, id).await?.is_none() {
        return Err(ApiError::NotFound("Schedule not found".to_string()).into());
    }

    execute_update(&mut *tx, update).await.map_err(|e| {
        if crate::db::is_duplicate_key(&e) {
            ApiError::Conflict("Department already has a schedule".to_string())
        } else if crate::db::is_foreign_key_violation(&e) {
            ApiError::BadRequest("Unknown department".to_string())
        } else {
            ApiError::internal("Failed to update work schedule", e)
        }
    })?;

    let updated = load_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Schedule not found".to_string()))?;

    // dropping the transaction rolls the update back
    updated.validate().map_err(ApiError::Validation)?;

    tx.commit()
        .await
        .map_err(|e| ApiError::internal("Failed to commit schedule update", e))?;

    tracing::info!(schedule_id = id, "Work schedule updated");

    Ok(HttpResponse::Ok().json(updated))
}
