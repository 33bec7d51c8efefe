use crate::auth::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::db::{is_duplicate_key, is_foreign_key_violation};
use crate::error::ApiError;
use crate::model::role::Role;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 3, max = 64, message = "username must be 3-64 characters"))]
    #[schema(example = "m.das")]
    pub username: String,
    #[validate(length(min = 8, max = 128, message = "password must be 8-128 characters"))]
    #[schema(example = "s3cret-pass")]
    pub password: String,
    /// 1 Admin, 2 Principal, 3 Teacher, 4 System, 5 Staff
    #[schema(example = 3)]
    pub role_id: u8,
    #[schema(example = 2, nullable = true)]
    pub department_id: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department_id: Option<u64>,
    pub role_id: Option<u8>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct UserResponse {
    #[schema(example = 12)]
    pub id: u64,
    #[schema(example = "m.das")]
    pub username: String,
    #[schema(example = 3)]
    pub role_id: u8,
    #[schema(example = 2, nullable = true)]
    pub department_id: Option<u64>,
    pub is_active: bool,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// Create a user account (Admin only)
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = Object, example = json!({
            "message": "User created",
            "id": 12
        })),
        (status = 400, description = "Validation failed or unknown department"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Username already taken"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    payload.validate().map_err(ApiError::from)?;

    if Role::from_id(payload.role_id).is_none() {
        return Err(ApiError::Validation(format!("Unknown role_id {}", payload.role_id)).into());
    }

    let hashed = hash_password(&payload.password)
        .map_err(|e| ApiError::internal("Failed to hash password", e))?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, password, role_id, department_id, is_active)
        VALUES (?, ?, ?, ?, 1)
        "#,
    )
    .bind(payload.username.trim())
    .bind(hashed)
    .bind(payload.role_id)
    .bind(payload.department_id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(done) => Ok(HttpResponse::Created().json(json!({
            "message": "User created",
            "id": done.last_insert_id()
        }))),
        Err(e) if is_duplicate_key(&e) => {
            Err(ApiError::Conflict("Username already taken".to_string()).into())
        }
        Err(e) if is_foreign_key_violation(&e) => {
            Err(ApiError::BadRequest("Unknown department".to_string()).into())
        }
        Err(e) => {
            error!(error = %e, "Failed to create user");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}

/// List user accounts (Admin/Principal)
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Paginated user list", body = UserListResponse),
        (status = 403, description = "Forbidden")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin_or_principal()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<u64> = Vec::new();

    if let Some(department_id) = query.department_id {
        conditions.push("department_id = ?");
        bindings.push(department_id);
    }

    if let Some(role_id) = query.role_id {
        conditions.push("role_id = ?");
        bindings.push(role_id as u64);
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) as total FROM users {}", where_clause);
    debug!(sql = %count_sql, bindings = ?bindings, "Counting users");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(*b);
    }

    let total = count_query.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %count_sql, "Failed to count users");
        ErrorInternalServerError("Internal Server Error")
    })?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT id, username, role_id, department_id, is_active FROM users {} ORDER BY id LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching users");

    let mut data_query = sqlx::query_as::<_, UserResponse>(&data_sql);
    for b in &bindings {
        data_query = data_query.bind(*b);
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let users = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, sql = %data_sql, "Failed to fetch users");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data: users,
        page,
        per_page,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, password: &str) -> CreateUser {
        CreateUser {
            username: username.to_string(),
            password: password.to_string(),
            role_id: Role::Teacher.id(),
            department_id: Some(2),
        }
    }

    #[test]
    fn test_create_user_validation() {
        assert!(user("m.das", "long-enough").validate().is_ok());
        assert!(user("md", "long-enough").validate().is_err());
        assert!(user("m.das", "short").validate().is_err());
    }
}
