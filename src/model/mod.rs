pub mod attendance;
pub mod department;
pub mod holiday;
pub mod leave_request;
pub mod push_token;
pub mod role;
pub mod student_leave;
pub mod user;
pub mod work_schedule;
