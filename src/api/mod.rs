pub mod attendance;
pub mod backup;
pub mod holiday;
pub mod leave_request;
pub mod notification;
pub mod report;
pub mod schedule;
pub mod student_leave;
pub mod sweep;
pub mod user;
