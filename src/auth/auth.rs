use crate::config::Config;
use crate::{auth::jwt::verify_token, model::role::Role};
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user belongs to a department
    pub department_id: Option<u64>,
}

/// Bearer header first, then the session cookie.
pub fn extract_token(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    let bearer = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string);

    bearer.or_else(|| req.cookie(cookie_name).map(|c| c.value().to_string()))
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(
                    actix_web::error::ErrorInternalServerError("Config missing"),
                ))
            }
        };

        let token = match extract_token(req, &config.session_cookie_name) {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let claims = match verify_token(&token, &config.jwt_secret) {
            Ok(c) => c,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        let role = match Role::from_id(claims.role) {
            Some(r) => r,
            None => return ready(Err(ErrorUnauthorized("Invalid role"))),
        };

        ready(Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            department_id: claims.department_id,
        }))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }

    pub fn require_admin_or_principal(&self) -> actix_web::Result<()> {
        if self.can_review() {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin/Principal only"))
        }
    }

    /// Cron callers authenticate with a System token
    pub fn require_system_or_admin(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::System) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("System/Admin only"))
        }
    }

    /// May see and decide on other users' records
    pub fn can_review(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Principal)
    }

    /// The user whose data a request targets: reviewers may pick anyone, others only themselves.
    pub fn scoped_user_id(&self, requested: Option<u64>) -> actix_web::Result<u64> {
        match requested {
            None => Ok(self.user_id),
            Some(id) if id == self.user_id || self.can_review() => Ok(id),
            Some(_) => Err(actix_web::error::ErrorForbidden(
                "Cannot access another user's records",
            )),
        }
    }
}
