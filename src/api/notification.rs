use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::push_token::PushNotificationToken;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterToken {
    #[schema(example = "ExponentPushToken[xxxxxxxxxxxxxxxxxxxxxx]")]
    pub token: String,
    #[schema(example = "android", nullable = true)]
    pub platform: Option<String>,
}

/// Register or move a device push token to the caller
#[utoipa::path(
    post,
    path = "/api/notifications/token",
    request_body = RegisterToken,
    responses(
        (status = 200, description = "Token stored", body = PushNotificationToken),
        (status = 400, description = "Token is required"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Notifications"
)]
pub async fn register_token(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<RegisterToken>,
) -> actix_web::Result<impl Responder> {
    let token = payload.token.trim();
    if token.is_empty() {
        return Err(ApiError::BadRequest("Token is required".to_string()).into());
    }

    let platform = payload
        .platform
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    // a device token belongs to whoever registered it last
    sqlx::query(
        r#"
        INSERT INTO push_notification_tokens (user_id, token, platform, updated_at)
        VALUES (?, ?, ?, NOW())
        ON DUPLICATE KEY UPDATE
            user_id = VALUES(user_id),
            platform = VALUES(platform),
            updated_at = NOW()
        "#,
    )
    .bind(auth.user_id)
    .bind(token)
    .bind(platform)
    .execute(pool.get_ref())
    .await
    .map_err(|e| ApiError::internal("Failed to store push token", e))?;

    let stored = sqlx::query_as::<_, PushNotificationToken>(
        "SELECT id, user_id, token, platform, updated_at FROM push_notification_tokens WHERE token = ?",
    )
    .bind(token)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| ApiError::internal("Failed to read back push token", e))?;

    tracing::debug!(user_id = auth.user_id, token_id = stored.id, "Push token registered");

    Ok(HttpResponse::Ok().json(stored))
}
