pub mod calendar;
pub mod export;
pub mod lateness;
pub mod leave_effects;
pub mod summary;
pub mod time_window;
