use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::db::is_duplicate_key;
use crate::error::ApiError;
use crate::model::holiday::Holiday;
use crate::utils::holiday_cache::HolidayCache;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HolidayQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateHoliday {
    #[schema(example = "2026-03-04", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "Holi")]
    pub name: String,
}

/// Holidays of one month
#[utoipa::path(
    get,
    path = "/api/holidays",
    params(HolidayQuery),
    responses(
        (status = 200, description = "Holidays in date order", body = [Holiday]),
        (status = 400, description = "Invalid year or month"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Holidays"
)]
pub async fn list_holidays(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    cache: web::Data<HolidayCache>,
    query: web::Query<HolidayQuery>,
) -> actix_web::Result<impl Responder> {
    let today = config.local_time(Utc::now()).date();
    let (year, month, _, _) =
        crate::api::attendance::resolve_month(query.year, query.month, today)?;

    let holidays = cache
        .month(pool.get_ref(), year, month)
        .await
        .map_err(|e| ApiError::internal("Failed to load holidays", e))?;

    Ok(HttpResponse::Ok().json(holidays.as_ref()))
}

/// Add a holiday (Admin only)
#[utoipa::path(
    post,
    path = "/api/holidays",
    request_body = CreateHoliday,
    responses(
        (status = 201, description = "Holiday created", body = Holiday),
        (status = 400, description = "Name is required"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "A holiday already exists on that date"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Holidays"
)]
pub async fn create_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<HolidayCache>,
    payload: web::Json<CreateHoliday>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()).into());
    }

    let result = sqlx::query("INSERT INTO holidays (date, name) VALUES (?, ?)")
        .bind(payload.date)
        .bind(name)
        .execute(pool.get_ref())
        .await;

    let id = match result {
        Ok(done) => done.last_insert_id(),
        Err(e) if is_duplicate_key(&e) => {
            return Err(ApiError::Conflict(
                "A holiday already exists on that date".to_string(),
            )
            .into());
        }
        Err(e) => return Err(ApiError::internal("Failed to create holiday", e).into()),
    };

    cache.invalidate(payload.date).await;
    tracing::info!(holiday_id = id, date = %payload.date, "Holiday created");

    Ok(HttpResponse::Created().json(Holiday {
        id,
        date: payload.date,
        name: name.to_string(),
    }))
}

/// Remove a holiday (Admin only)
#[utoipa::path(
    delete,
    path = "/api/holidays/{id}",
    params(
        ("id" = u64, Path, description = "Holiday id")
    ),
    responses(
        (status = 200, description = "Holiday deleted", body = Object, example = json!({
            "message": "Holiday deleted"
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Holiday not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Holidays"
)]
pub async fn delete_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<HolidayCache>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let id = path.into_inner();

    let date = sqlx::query_scalar::<_, NaiveDate>("SELECT date FROM holidays WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| ApiError::internal("Failed to fetch holiday", e))?
        .ok_or_else(|| ApiError::NotFound("Holiday not found".to_string()))?;

    sqlx::query("DELETE FROM holidays WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| ApiError::internal("Failed to delete holiday", e))?;

    cache.invalidate(date).await;
    tracing::info!(holiday_id = id, date = %date, "Holiday deleted");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Holiday deleted"
    })))
}
