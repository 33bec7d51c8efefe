use crate::{
    api::{
        attendance, backup, holiday, leave_request, notification, report, schedule,
        student_leave, sweep, user,
    },
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Milliseconds between token refills for a per-minute budget.
fn refill_interval_ms(requests_per_min: u32) -> u64 {
    if requests_per_min == 0 {
        60_000
    } else {
        (60_000 / requests_per_min as u64).max(1)
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(refill_interval_ms(requests_per_min))
            .burst_size(requests_per_min.max(1))
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("rate limiter settings must be non-zero");
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    .service(web::resource("/check-in").route(web::post().to(attendance::check_in)))
                    .service(
                        web::resource("/check-out").route(web::put().to(attendance::check_out)),
                    )
                    .service(
                        web::resource("/summary").route(web::get().to(attendance::monthly_summary)),
                    )
                    .service(web::resource("/history").route(web::get().to(attendance::history)))
                    .service(
                        web::resource("/auto-absent").route(web::post().to(sweep::auto_absent)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // /leave/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave_request::get_leave))
                            .route(web::patch().to(leave_request::decide_leave)),
                    ),
            )
            .service(
                web::scope("/schedules")
                    .service(
                        web::resource("")
                            .route(web::get().to(schedule::list_schedules))
                            .route(web::post().to(schedule::create_schedule)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(schedule::get_schedule))
                            .route(web::patch().to(schedule::update_schedule)),
                    ),
            )
            .service(
                web::scope("/holidays")
                    .service(
                        web::resource("")
                            .route(web::get().to(holiday::list_holidays))
                            .route(web::post().to(holiday::create_holiday)),
                    )
                    .service(
                        web::resource("/{id}").route(web::delete().to(holiday::delete_holiday)),
                    ),
            )
            .service(
                web::resource("/student-absences")
                    .route(web::get().to(student_leave::list_absences))
                    .route(web::post().to(student_leave::record_absences)),
            )
            .service(
                web::resource("/reports/attendance.csv")
                    .route(web::get().to(report::attendance_report)),
            )
            .service(
                web::resource("/notifications/token")
                    .route(web::post().to(notification::register_token)),
            )
            .service(web::resource("/admin/backup").route(web::post().to(backup::upload_backup)))
            .service(
                web::resource("/users")
                    .route(web::get().to(user::list_users))
                    .route(web::post().to(user::create_user)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refill_interval() {
        assert_eq!(refill_interval_ms(60), 1_000);
        assert_eq!(refill_interval_ms(1000), 60);
        assert_eq!(refill_interval_ms(0), 60_000);
        assert_eq!(refill_interval_ms(120_000), 1);
    }
}
