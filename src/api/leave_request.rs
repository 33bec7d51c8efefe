use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::attendance::{
    ATTENDANCE_COLUMNS, AttendanceRow, AttendanceStatus, records_from_rows,
};
use crate::model::leave_request::{LEAVE_COLUMNS, LeaveRequest, LeaveRequestRow, LeaveStatus};
use crate::services::leave_effects::{AttendanceChange, plan_transition};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{MySqlConnection, MySqlPool};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-04", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "family function")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct DecideLeave {
    /// APPROVED or REJECTED
    #[schema(example = "APPROVED")]
    pub status: LeaveStatus,
    #[schema(example = "enjoy", nullable = true)]
    pub feedback: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[schema(example = json!({
    "data": [
        {
            "id": 1,
            "user_id": 12,
            "start_date": "2026-03-02",
            "end_date": "2026-03-04",
            "reason": "family function",
            "status": "PENDING",
            "feedback": null,
            "created_at": "2026-02-25T06:00:00Z"
        }
    ],
    "page": 1,
    "per_page": 10,
    "total": 1
}))]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 12)]
    /// Filter by user ID (Admin/Principal only)
    pub user_id: Option<u64>,
    #[schema(example = "PENDING")]
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>, // 1-based
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>, // items per page
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(String),
}

fn to_leave(row: LeaveRequestRow) -> Result<LeaveRequest, ApiError> {
    let id = row.id;
    LeaveRequest::try_from(row)
        .map_err(|e| ApiError::internal(&format!("Corrupt leave request {}", id), e))
}

/// Writes one planned change inside the caller's transaction.
async fn apply_change(
    conn: &mut MySqlConnection,
    change: &AttendanceChange,
) -> Result<(), sqlx::Error> {
    let on_leave = AttendanceStatus::OnLeave.to_string();

    match change {
        AttendanceChange::Insert { user_id, date } => {
            sqlx::query("INSERT INTO attendance (user_id, date, status) VALUES (?, ?, ?)")
                .bind(*user_id)
                .bind(*date)
                .bind(&on_leave)
                .execute(&mut *conn)
                .await?;
        }
        AttendanceChange::MarkOnLeave { record_id } => {
            sqlx::query("UPDATE attendance SET status = ? WHERE id = ?")
                .bind(&on_leave)
                .bind(*record_id)
                .execute(&mut *conn)
                .await?;
        }
        AttendanceChange::Delete { record_id } => {
            sqlx::query("DELETE FROM attendance WHERE id = ?")
                .bind(*record_id)
                .execute(&mut *conn)
                .await?;
        }
    }

    Ok(())
}

/* =========================
Create leave request
========================= */
/// Swagger doc for create_leave endpoint
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted successfully",
         body = Object,
         example = json!({
            "message": "Leave request submitted",
            "id": 7,
            "status": "PENDING"
         })
        ),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    if payload.start_date > payload.end_date {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "start_date cannot be after end_date"
        })));
    }

    if payload.reason.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "reason is required"
        })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests (user_id, start_date, end_date, reason, status)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.reason.trim())
    .bind(LeaveStatus::Pending.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Failed to create leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Leave request submitted",
        "id": result.last_insert_id(),
        "status": LeaveStatus::Pending
    })))
}

/* =========================
Approve / reject (Admin, Principal)
========================= */
/// Swagger doc for decide_leave endpoint
#[utoipa::path(
    patch,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to decide")
    ),
    request_body = DecideLeave,
    responses(
        (status = 200, description = "Leave decided; attendance adjusted", body = Object, example = json!({
            "message": "Leave approved",
            "status": "APPROVED",
            "attendance_changes": 3
        })),
        (status = 400, description = "Target status must be APPROVED or REJECTED", body = Object, example = json!({
            "message": "Status must be APPROVED or REJECTED"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn decide_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<DecideLeave>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin_or_principal()?;

    let leave_id = path.into_inner();
    let DecideLeave { status, feedback } = payload.into_inner();

    if status == LeaveStatus::Pending {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Status must be APPROVED or REJECTED"
        })));
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| ApiError::internal("Failed to start transaction", e))?;

    let leave_sql = format!(
        "SELECT {} FROM leave_requests WHERE id = ? FOR UPDATE",
        LEAVE_COLUMNS
    );
    let leave = sqlx::query_as::<_, LeaveRequestRow>(&leave_sql)
        .bind(leave_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch leave request", e))?;

    let Some(leave) = leave.map(to_leave).transpose()? else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Leave request not found"
        })));
    };

    let attendance_sql = format!(
        r#"
        SELECT {}
        FROM attendance
        WHERE user_id = ? AND date BETWEEN ? AND ?
        ORDER BY date
        FOR UPDATE
        "#,
        ATTENDANCE_COLUMNS
    );
    let rows = sqlx::query_as::<_, AttendanceRow>(&attendance_sql)
        .bind(leave.user_id)
        .bind(leave.start_date)
        .bind(leave.end_date)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| ApiError::internal("Failed to lock attendance range", e))?;
    let existing =
        records_from_rows(rows).map_err(|e| ApiError::internal("Corrupt attendance row", e))?;

    let changes = plan_transition(
        status,
        leave.user_id,
        leave.start_date,
        leave.end_date,
        &existing,
    )
    .ok_or_else(|| ApiError::BadRequest("Status must be APPROVED or REJECTED".to_string()))?;

    sqlx::query("UPDATE leave_requests SET status = ?, feedback = ? WHERE id = ?")
        .bind(status.as_ref())
        .bind(feedback.as_deref())
        .bind(leave_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::internal("Failed to update leave status", e))?;

    for change in &changes {
        apply_change(&mut tx, change)
            .await
            .map_err(|e| ApiError::internal("Failed to apply leave to attendance", e))?;
    }

    tx.commit()
        .await
        .map_err(|e| ApiError::internal("Failed to commit leave decision", e))?;

    tracing::info!(
        leave_id,
        user_id = leave.user_id,
        decided_by = auth.user_id,
        %status,
        changes = changes.len(),
        "Leave request decided"
    );

    let message = match status {
        LeaveStatus::Approved => "Leave approved",
        _ => "Leave rejected",
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": message,
        "status": status,
        "attendance_changes": changes.len()
    })))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let sql = format!("SELECT {} FROM leave_requests WHERE id = ?", LEAVE_COLUMNS);
    let row = sqlx::query_as::<_, LeaveRequestRow>(&sql)
        .bind(leave_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, leave_id, "Failed to fetch leave request");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    match row.map(to_leave).transpose()? {
        // owners see their own, reviewers see all
        Some(leave) if leave.user_id == auth.user_id || auth.can_review() => {
            Ok(HttpResponse::Ok().json(leave))
        }
        Some(_) => Err(actix_web::error::ErrorForbidden("Not your leave request")),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Leave request not found"
        }))),
    }
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    // non-reviewers are always pinned to themselves
    let user_filter = if auth.can_review() {
        query.user_id
    } else {
        Some(auth.scoped_user_id(query.user_id)?)
    };

    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(user_id) = user_filter {
        where_sql.push_str(" AND user_id = ?");
        args.push(FilterValue::U64(user_id));
    }

    if let Some(status) = query.status {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status.to_string()));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(s.clone()),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error=%e, "Failed to count leave requests");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT {}
        FROM leave_requests
        {}
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
        LEAVE_COLUMNS, where_sql
    );

    let mut data_q = sqlx::query_as::<_, LeaveRequestRow>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let rows = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            tracing::error!(error=%e, "Failed to fetch leave list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let leaves = rows
        .into_iter()
        .map(to_leave)
        .collect::<Result<Vec<_>, _>>()?;

    // -------------------------
    // Response
    // -------------------------
    let response = LeaveListResponse {
        data: leaves,
        page: page as u32,
        per_page: per_page as u32,
        total,
    };

    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use crate::config::test_config;
    use crate::model::role::Role;
    use actix_web::{App, http::StatusCode, test};
    use sqlx::mysql::MySqlPoolOptions;

    // never connects; the handler must refuse before touching the pool
    fn lazy_pool() -> MySqlPool {
        MySqlPoolOptions::new()
            .connect_lazy("mysql://nobody@127.0.0.1:1/none")
            .unwrap()
    }

    fn token(role: Role) -> String {
        let config = test_config();
        generate_access_token(3, "r.sen".to_string(), role.id(), None, &config.jwt_secret, 600)
            .unwrap()
    }

    #[actix_web::test]
    async fn test_teacher_cannot_decide() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .app_data(web::Data::new(lazy_pool()))
                .route("/api/leave/{id}", web::patch().to(decide_leave)),
        )
        .await;

        let req = test::TestRequest::patch()
            .uri("/api/leave/1")
            .insert_header(("Authorization", format!("Bearer {}", token(Role::Teacher))))
            .set_json(serde_json::json!({"status": "APPROVED"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_pending_is_not_a_decision() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .app_data(web::Data::new(lazy_pool()))
                .route("/api/leave/{id}", web::patch().to(decide_leave)),
        )
        .await;

        let req = test::TestRequest::patch()
            .uri("/api/leave/1")
            .insert_header(("Authorization", format!("Bearer {}", token(Role::Principal))))
            .set_json(serde_json::json!({"status": "PENDING", "feedback": "later"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_create_rejects_inverted_range() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .app_data(web::Data::new(lazy_pool()))
                .route("/api/leave", web::post().to(create_leave)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/leave")
            .insert_header(("Authorization", format!("Bearer {}", token(Role::Teacher))))
            .set_json(serde_json::json!({
                "start_date": "2026-03-05",
                "end_date": "2026-03-02",
                "reason": "travel"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_create_requires_reason() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .app_data(web::Data::new(lazy_pool()))
                .route("/api/leave", web::post().to(create_leave)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/leave")
            .insert_header(("Authorization", format!("Bearer {}", token(Role::Teacher))))
            .set_json(serde_json::json!({
                "start_date": "2026-03-02",
                "end_date": "2026-03-02",
                "reason": "   "
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
