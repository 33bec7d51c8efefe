use crate::{
    auth::{jwt::generate_access_token, password::verify_password},
    config::Config,
    model::{role::Role, user::User},
    models::LoginReqDto,
};
use actix_web::{HttpResponse, Responder, cookie::Cookie, cookie::SameSite, web};
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    access_token: String,
    #[schema(example = 3)]
    role: u8,
    #[schema(example = "TEACHER", nullable = true)]
    role_name: Option<String>,
    #[schema(example = "default")]
    institution: String,
}

impl LoginResponse {
    fn new(access_token: String, role_id: u8, institution: String) -> Self {
        Self {
            access_token,
            role: role_id,
            role_name: Role::from_id(role_id).map(|r| r.to_string()),
            institution,
        }
    }
}

/// Login endpoint. Returns the token and also sets it as the session cookie.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return HttpResponse::BadRequest().body("Username or password required");
    }

    debug!("Fetching user from database");

    let db_user = match sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role_id, department_id, is_active
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(user.username.trim())
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(user)) if user.is_active => {
            debug!(user_id = user.id, "User found");
            user
        }
        Ok(Some(user)) => {
            info!(user_id = user.id, "Login refused: account inactive");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    debug!("Password verified, generating access token");

    let access_token = match generate_access_token(
        db_user.id,
        db_user.username.clone(),
        db_user.role_id,
        db_user.department_id,
        &config.jwt_secret,
        config.access_token_ttl,
    ) {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "Failed to sign access token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
        // intentionally not failing login
    }

    info!("Login successful");

    let cookie = Cookie::build(config.session_cookie_name.clone(), access_token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(actix_web::cookie::time::Duration::seconds(
            config.access_token_ttl as i64,
        ))
        .finish();

    HttpResponse::Ok().cookie(cookie).json(LoginResponse::new(
        access_token,
        db_user.role_id,
        config.institution_id.clone(),
    ))
}

/// Logout endpoint. Clears the session cookie; always succeeds.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Session cookie removed")
    ),
    tag = "Auth"
)]
pub async fn logout(config: web::Data<Config>) -> impl Responder {
    let mut cookie = Cookie::new(config.session_cookie_name.clone(), "");
    cookie.set_path("/");

    let mut resp = HttpResponse::NoContent().finish();
    if let Err(e) = resp.add_removal_cookie(&cookie) {
        error!(error = %e, "Failed to attach removal cookie");
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use actix_web::{App, http::StatusCode, test};

    #[actix_web::test]
    async fn test_logout_clears_cookie() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .route("/auth/logout", web::post().to(logout)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/auth/logout")
            .cookie(Cookie::new("attendance_session", "token"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let removal = resp
            .response()
            .cookies()
            .find(|c| c.name() == "attendance_session")
            .expect("removal cookie");
        assert_eq!(removal.value(), "");
        assert_eq!(
            removal.max_age(),
            Some(actix_web::cookie::time::Duration::ZERO)
        );
    }

    #[actix_web::test]
    async fn test_login_response_names_the_role() {
        let body = serde_json::to_value(LoginResponse::new(
            "token".to_string(),
            Role::Principal.id(),
            "default".to_string(),
        ))
        .unwrap();
        assert_eq!(body["role"], 2);
        assert_eq!(body["role_name"], "PRINCIPAL");

        let unknown =
            serde_json::to_value(LoginResponse::new("t".to_string(), 9, "default".to_string()))
                .unwrap();
        assert!(unknown["role_name"].is_null());
    }

    #[actix_web::test]
    async fn test_logout_without_session_still_succeeds() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .route("/auth/logout", web::post().to(logout)),
        )
        .await;

        let req = test::TestRequest::post().uri("/auth/logout").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
}
