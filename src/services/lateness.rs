use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use crate::model::attendance::AttendanceStatus;
use crate::model::work_schedule::WorkSchedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    CheckIn,
    CheckOut,
}

/// Outcome of evaluating one check-in or check-out against a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Punctuality {
    OnTime,
    LateArrival { minutes: u32 },
    EarlyDeparture { minutes: u32 },
}

impl Punctuality {
    /// Status recorded for a check-in with this outcome.
    pub fn attendance_status(&self) -> AttendanceStatus {
        match self {
            Punctuality::LateArrival { .. } => AttendanceStatus::Late,
            _ => AttendanceStatus::Present,
        }
    }

    pub fn late_minutes(&self) -> u32 {
        match self {
            Punctuality::LateArrival { minutes } => *minutes,
            _ => 0,
        }
    }

    pub fn early_minutes(&self) -> u32 {
        match self {
            Punctuality::EarlyDeparture { minutes } => *minutes,
            _ => 0,
        }
    }
}

pub fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Classifies an event at `at`, which must already be in institution local time.
///
/// Saturday override values replace the defaults on Saturdays only. Work days are
/// not consulted, so a Sunday is evaluated against the weekday defaults.
pub fn classify(schedule: &WorkSchedule, at: NaiveDateTime, kind: EventKind) -> Punctuality {
    let day = schedule.effective_for(at.date());
    let now = minute_of_day(at.time());

    match kind {
        EventKind::CheckIn => {
            let deadline = minute_of_day(day.start_time) + day.grace_minutes;
            if now > deadline {
                Punctuality::LateArrival {
                    minutes: now - deadline,
                }
            } else {
                Punctuality::OnTime
            }
        }
        EventKind::CheckOut => {
            let target = minute_of_day(day.end_time);
            if now < target {
                Punctuality::EarlyDeparture {
                    minutes: target - now,
                }
            } else {
                Punctuality::OnTime
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::work_schedule::{SaturdayOverride, sample_schedule};
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn with_saturday() -> WorkSchedule {
        let mut schedule = sample_schedule();
        schedule.saturday = Some(SaturdayOverride {
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            grace_minutes: 5,
        });
        schedule
    }

    #[test]
    fn test_check_in_at_grace_boundary_is_on_time() {
        let schedule = sample_schedule();
        // Monday
        let result = classify(&schedule, at(2026, 3, 2, 9, 10), EventKind::CheckIn);
        assert_eq!(result, Punctuality::OnTime);
    }

    #[test]
    fn test_check_in_one_minute_past_grace() {
        let schedule = sample_schedule();
        let result = classify(&schedule, at(2026, 3, 2, 9, 11), EventKind::CheckIn);
        assert_eq!(result, Punctuality::LateArrival { minutes: 1 });
        assert_eq!(result.attendance_status(), AttendanceStatus::Late);
        assert_eq!(result.late_minutes(), 1);
    }

    #[test]
    fn test_grace_boundary_holds_for_many_schedules() {
        for start_hour in [6u32, 7, 8, 9, 10] {
            for grace in [0u32, 1, 5, 10, 15, 30, 59] {
                let mut schedule = sample_schedule();
                schedule.start_time = NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap();
                schedule.grace_minutes = grace;
                let deadline = start_hour * 60 + grace;
                let on_time = at(2026, 3, 3, deadline / 60, deadline % 60);
                let late = at(2026, 3, 3, (deadline + 1) / 60, (deadline + 1) % 60);

                assert_eq!(
                    classify(&schedule, on_time, EventKind::CheckIn),
                    Punctuality::OnTime
                );
                assert_eq!(
                    classify(&schedule, late, EventKind::CheckIn),
                    Punctuality::LateArrival { minutes: 1 }
                );
            }
        }
    }

    #[test]
    fn test_seconds_are_ignored() {
        let schedule = sample_schedule();
        let when = NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 10, 59)
            .unwrap();
        assert_eq!(classify(&schedule, when, EventKind::CheckIn), Punctuality::OnTime);
    }

    #[test]
    fn test_saturday_override_used_exclusively() {
        let schedule = with_saturday();
        // 2026-03-07 is a Saturday. Weekday defaults would make 09:30 late.
        assert_eq!(
            classify(&schedule, at(2026, 3, 7, 9, 30), EventKind::CheckIn),
            Punctuality::OnTime
        );
        assert_eq!(
            classify(&schedule, at(2026, 3, 7, 10, 5), EventKind::CheckIn),
            Punctuality::OnTime
        );
        assert_eq!(
            classify(&schedule, at(2026, 3, 7, 10, 6), EventKind::CheckIn),
            Punctuality::LateArrival { minutes: 1 }
        );
        assert_eq!(
            classify(&schedule, at(2026, 3, 7, 12, 30), EventKind::CheckOut),
            Punctuality::EarlyDeparture { minutes: 30 }
        );
    }

    #[test]
    fn test_override_not_applied_on_other_days() {
        let schedule = with_saturday();
        assert_eq!(
            classify(&schedule, at(2026, 3, 6, 9, 30), EventKind::CheckIn),
            Punctuality::LateArrival { minutes: 20 }
        );
    }

    #[test]
    fn test_saturday_without_override_uses_defaults() {
        let schedule = sample_schedule();
        assert_eq!(
            classify(&schedule, at(2026, 3, 7, 9, 15), EventKind::CheckIn),
            Punctuality::LateArrival { minutes: 5 }
        );
    }

    #[test]
    fn test_sunday_falls_back_to_defaults() {
        let schedule = with_saturday();
        // 2026-03-08 is a Sunday and not a work day; evaluation still runs.
        assert!(!schedule.is_work_day(at(2026, 3, 8, 0, 0).date()));
        assert_eq!(
            classify(&schedule, at(2026, 3, 8, 9, 40), EventKind::CheckIn),
            Punctuality::LateArrival { minutes: 30 }
        );
    }

    #[test]
    fn test_check_out_before_end_is_early_departure() {
        let schedule = sample_schedule();
        let result = classify(&schedule, at(2026, 3, 2, 15, 45), EventKind::CheckOut);
        assert_eq!(result, Punctuality::EarlyDeparture { minutes: 15 });
        assert_eq!(result.early_minutes(), 15);
        assert_eq!(result.late_minutes(), 0);
    }

    #[test]
    fn test_check_out_ignores_grace() {
        let schedule = sample_schedule();
        assert_eq!(
            classify(&schedule, at(2026, 3, 2, 16, 0), EventKind::CheckOut),
            Punctuality::OnTime
        );
        assert_eq!(
            classify(&schedule, at(2026, 3, 2, 15, 59), EventKind::CheckOut),
            Punctuality::EarlyDeparture { minutes: 1 }
        );
    }

    #[test]
    fn test_punctuality_serialization() {
        let json = serde_json::to_value(Punctuality::LateArrival { minutes: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "LATE_ARRIVAL", "minutes": 3}));
        let json = serde_json::to_value(Punctuality::OnTime).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "ON_TIME"}));
    }
}
