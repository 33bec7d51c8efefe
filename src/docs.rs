use crate::api::attendance::CheckInRequest;
use crate::api::holiday::CreateHoliday;
use crate::api::leave_request::{CreateLeave, DecideLeave, LeaveFilter, LeaveListResponse};
use crate::api::notification::RegisterToken;
use crate::api::schedule::CreateScheduleRequest;
use crate::api::student_leave::RecordAbsences;
use crate::api::sweep::DepartmentSweep;
use crate::api::user::{CreateUser, UserListResponse, UserResponse};
use crate::auth::handlers::LoginResponse;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::holiday::Holiday;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::push_token::PushNotificationToken;
use crate::model::student_leave::StudentLeave;
use crate::model::work_schedule::{Geofence, SaturdayOverride, WorkSchedule};
use crate::models::LoginReqDto;
use crate::services::summary::MonthlySummary;
use crate::services::time_window::GeoPoint;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "School Attendance API",
        version = "1.0.0",
        description = r#"
## School Attendance Dashboard

Backend for a school's staff attendance dashboard.

### Key Features
- **Attendance**
  - Daily check-in and check-out, scored against the department work schedule
  - Monthly summary and a calendar view merging attendance, Sundays and holidays
  - Auto-absent sweep for opted-in departments
- **Leave Management**
  - Teachers apply for leave, principals approve or reject; attendance follows the decision
- **Schedules & Holidays**
  - Per-department working hours, Saturday overrides and optional geofence
- **Students**
  - Log absent students per day
- **Reports**
  - Monthly CSV export

### Security
Endpoints under `/api` need a JWT, sent as `Authorization: Bearer` or the session cookie set at login.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::logout,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::monthly_summary,
        crate::api::attendance::history,
        crate::api::sweep::auto_absent,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::decide_leave,

        crate::api::schedule::list_schedules,
        crate::api::schedule::get_schedule,
        crate::api::schedule::create_schedule,
        crate::api::schedule::update_schedule,

        crate::api::holiday::list_holidays,
        crate::api::holiday::create_holiday,
        crate::api::holiday::delete_holiday,

        crate::api::student_leave::record_absences,
        crate::api::student_leave::list_absences,

        crate::api::report::attendance_report,
        crate::api::notification::register_token,
        crate::api::backup::upload_backup,

        crate::api::user::create_user,
        crate::api::user::list_users
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            CheckInRequest,
            GeoPoint,
            AttendanceRecord,
            AttendanceStatus,
            MonthlySummary,
            DepartmentSweep,
            CreateLeave,
            DecideLeave,
            LeaveFilter,
            LeaveRequest,
            LeaveStatus,
            LeaveListResponse,
            WorkSchedule,
            SaturdayOverride,
            Geofence,
            CreateScheduleRequest,
            Holiday,
            CreateHoliday,
            RecordAbsences,
            StudentLeave,
            RegisterToken,
            PushNotificationToken,
            CreateUser,
            UserResponse,
            UserListResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and logout"),
        (name = "Attendance", description = "Check-in, check-out and monthly views"),
        (name = "Leave", description = "Teacher leave requests"),
        (name = "Schedules", description = "Department work schedules"),
        (name = "Holidays", description = "Institution holidays"),
        (name = "Students", description = "Student absence log"),
        (name = "Reports", description = "Exports"),
        (name = "Notifications", description = "Push notification tokens"),
        (name = "Admin", description = "Maintenance"),
        (name = "Users", description = "User accounts"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_bearer_scheme_and_paths() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(doc.paths.paths.contains_key("/api/attendance/check-in"));
        assert!(doc.paths.paths.contains_key("/api/leave/{leave_id}"));
    }
}
