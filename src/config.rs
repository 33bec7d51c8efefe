use std::env;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use dotenvy::dotenv;
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub session_cookie_name: String,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Institution labelling, never branched on
    pub institution_id: String,
    pub api_base_url: String,

    /// Offset applied to UTC "now" before schedule evaluation
    pub institution_utc_offset_minutes: i32,
    /// Check-in time window / geofence gate, off unless explicitly enabled
    pub enforce_check_in_window: bool,

    pub holiday_cache_ttl_secs: u64,

    pub backup_upload_url: Option<String>,
    pub backup_upload_token: Option<String>,

    pub log_level: String,
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            access_token_ttl: env::var("ACCESS_TOKEN_TTL")
                .unwrap_or_else(|_| "28800".to_string()) // default 8 hours, one school day
                .parse()
                .expect("ACCESS_TOKEN_TTL must be a number"),
            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "attendance_session".to_string()),

            rate_login_per_min: env::var("RATE_LOGIN_PER_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .expect("RATE_LOGIN_PER_MIN must be a number"),
            rate_protected_per_min: env::var("RATE_PROTECTED_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .expect("RATE_PROTECTED_PER_MIN must be a number"),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            institution_id: env::var("INSTITUTION_ID").unwrap_or_else(|_| "default".to_string()),
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),

            institution_utc_offset_minutes: env::var("INSTITUTION_UTC_OFFSET_MINUTES")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .expect("INSTITUTION_UTC_OFFSET_MINUTES must be a number"),
            enforce_check_in_window: env::var("ENFORCE_CHECK_IN_WINDOW")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),

            holiday_cache_ttl_secs: env::var("HOLIDAY_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .expect("HOLIDAY_CACHE_TTL_SECS must be a number"),

            backup_upload_url: env::var("BACKUP_UPLOAD_URL").ok().filter(|v| !v.is_empty()),
            backup_upload_token: env::var("BACKUP_UPLOAD_TOKEN").ok().filter(|v| !v.is_empty()),

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".to_string()),
        }
    }

    /// Fixed offset of the institution's local clock. Out-of-range values fall back to UTC.
    pub fn institution_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.institution_utc_offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"))
    }

    /// `utc` expressed on the institution's wall clock.
    pub fn local_time(&self, utc: DateTime<Utc>) -> NaiveDateTime {
        utc.with_timezone(&self.institution_offset()).naive_local()
    }

    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level
            .parse::<tracing::Level>()
            .unwrap_or(tracing::Level::DEBUG)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "mysql://localhost/attendance_test".to_string(),
        jwt_secret: "test-secret".to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        access_token_ttl: 900,
        session_cookie_name: "attendance_session".to_string(),
        rate_login_per_min: 60,
        rate_protected_per_min: 1000,
        api_prefix: "/api".to_string(),
        institution_id: "test-school".to_string(),
        api_base_url: "http://localhost:8080".to_string(),
        institution_utc_offset_minutes: 330,
        enforce_check_in_window: false,
        holiday_cache_ttl_secs: 60,
        backup_upload_url: None,
        backup_upload_token: None,
        log_level: "debug".to_string(),
    }
}
