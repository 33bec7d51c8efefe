use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Weekday index 0 = Sunday, 6 = Saturday.
pub const SUNDAY: u8 = 0;
pub const SATURDAY: u8 = 6;

pub const MAX_GRACE_MINUTES: u32 = 240;

pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SaturdayOverride {
    #[schema(example = "09:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "13:00:00", value_type = String)]
    pub end_time: NaiveTime,
    #[schema(example = 5)]
    pub grace_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Geofence {
    #[schema(example = 23.8103)]
    pub latitude: f64,
    #[schema(example = 90.4125)]
    pub longitude: f64,
    #[schema(example = 150.0)]
    pub radius_meters: f64,
}

/// Start/end/grace in force on a particular day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySchedule {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub grace_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WorkSchedule {
    #[schema(example = 1)]
    pub id: u64,
    /// `None` is the institution-wide default schedule
    #[schema(example = 2, nullable = true)]
    pub department_id: Option<u64>,
    #[schema(example = "09:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "16:00:00", value_type = String)]
    pub end_time: NaiveTime,
    #[schema(example = 10)]
    pub grace_minutes: u32,
    #[schema(example = json!([1, 2, 3, 4, 5]), value_type = Vec<u8>)]
    pub work_days: BTreeSet<u8>,
    #[schema(nullable = true)]
    pub saturday: Option<SaturdayOverride>,
    #[schema(nullable = true)]
    pub geofence: Option<Geofence>,
}

impl WorkSchedule {
    /// Saturday override when present and the date is a Saturday, weekday defaults otherwise.
    pub fn effective_for(&self, date: NaiveDate) -> DaySchedule {
        match self.saturday {
            Some(sat) if weekday_index(date) == SATURDAY => DaySchedule {
                start_time: sat.start_time,
                end_time: sat.end_time,
                grace_minutes: sat.grace_minutes,
            },
            _ => DaySchedule {
                start_time: self.start_time,
                end_time: self.end_time,
                grace_minutes: self.grace_minutes,
            },
        }
    }

    pub fn is_work_day(&self, date: NaiveDate) -> bool {
        self.work_days.contains(&weekday_index(date))
    }

    /// Consistency checks applied before a schedule is stored.
    pub fn validate(&self) -> Result<(), String> {
        if self.start_time >= self.end_time {
            return Err("start_time must be before end_time".to_string());
        }
        if self.grace_minutes > MAX_GRACE_MINUTES {
            return Err(format!("grace_minutes cannot exceed {}", MAX_GRACE_MINUTES));
        }
        if let Some(day) = self.work_days.iter().find(|d| **d > SATURDAY) {
            return Err(format!("work day {} out of range 0-6", day));
        }
        if let Some(sat) = &self.saturday {
            if sat.start_time >= sat.end_time {
                return Err("saturday start_time must be before end_time".to_string());
            }
            if sat.grace_minutes > MAX_GRACE_MINUTES {
                return Err(format!("saturday grace_minutes cannot exceed {}", MAX_GRACE_MINUTES));
            }
        }
        if let Some(fence) = &self.geofence {
            if !(-90.0..=90.0).contains(&fence.latitude)
                || !(-180.0..=180.0).contains(&fence.longitude)
            {
                return Err("geofence coordinates out of range".to_string());
            }
            if fence.radius_meters <= 0.0 {
                return Err("geofence radius must be positive".to_string());
            }
        }
        Ok(())
    }
}

/// Raw `work_schedules` row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WorkScheduleRow {
    pub id: u64,
    pub department_id: Option<u64>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub grace_minutes: u32,
    pub work_days: String,
    pub saturday_start_time: Option<NaiveTime>,
    pub saturday_end_time: Option<NaiveTime>,
    pub saturday_grace_minutes: Option<u32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_meters: Option<f64>,
}

pub const WORK_SCHEDULE_COLUMNS: &str = "id, department_id, start_time, end_time, grace_minutes, \
     work_days, saturday_start_time, saturday_end_time, saturday_grace_minutes, \
     latitude, longitude, radius_meters";

pub fn parse_work_days(raw: &str) -> Result<BTreeSet<u8>, String> {
    let mut days = BTreeSet::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let day: u8 = part
            .parse()
            .map_err(|_| format!("invalid work day '{}'", part))?;
        if day > SATURDAY {
            return Err(format!("work day {} out of range 0-6", day));
        }
        days.insert(day);
    }
    Ok(days)
}

pub fn format_work_days(days: &BTreeSet<u8>) -> String {
    days.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl TryFrom<WorkScheduleRow> for WorkSchedule {
    type Error = String;

    fn try_from(row: WorkScheduleRow) -> Result<Self, Self::Error> {
        let work_days = parse_work_days(&row.work_days)?;

        let saturday = match (
            row.saturday_start_time,
            row.saturday_end_time,
            row.saturday_grace_minutes,
        ) {
            (Some(start_time), Some(end_time), Some(grace_minutes)) => Some(SaturdayOverride {
                start_time,
                end_time,
                grace_minutes,
            }),
            _ => None,
        };

        let geofence = match (row.latitude, row.longitude, row.radius_meters) {
            (Some(latitude), Some(longitude), Some(radius_meters)) => Some(Geofence {
                latitude,
                longitude,
                radius_meters,
            }),
            _ => None,
        };

        Ok(Self {
            id: row.id,
            department_id: row.department_id,
            start_time: row.start_time,
            end_time: row.end_time,
            grace_minutes: row.grace_minutes,
            work_days,
            saturday,
            geofence,
        })
    }
}

#[cfg(test)]
pub(crate) fn sample_schedule() -> WorkSchedule {
    WorkSchedule {
        id: 1,
        department_id: None,
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        grace_minutes: 10,
        work_days: [1, 2, 3, 4, 5, 6].into_iter().collect(),
        saturday: None,
        geofence: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> WorkScheduleRow {
        WorkScheduleRow {
            id: 4,
            department_id: Some(2),
            start_time: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
            grace_minutes: 15,
            work_days: "1,2,3,4,5".to_string(),
            saturday_start_time: None,
            saturday_end_time: None,
            saturday_grace_minutes: None,
            latitude: None,
            longitude: None,
            radius_meters: None,
        }
    }

    #[test]
    fn test_parse_work_days() {
        let days = parse_work_days(" 5,1, 3 ,1").unwrap();
        assert_eq!(days.into_iter().collect::<Vec<_>>(), vec![1, 3, 5]);
        assert!(parse_work_days("").unwrap().is_empty());
        assert!(parse_work_days("1,7").is_err());
        assert!(parse_work_days("mon").is_err());
    }

    #[test]
    fn test_format_work_days() {
        let days: BTreeSet<u8> = [5, 1, 2].into_iter().collect();
        assert_eq!(format_work_days(&days), "1,2,5");
    }

    #[test]
    fn test_row_without_overrides() {
        let schedule = WorkSchedule::try_from(row()).unwrap();
        assert_eq!(schedule.saturday, None);
        assert_eq!(schedule.geofence, None);
        assert_eq!(schedule.work_days.len(), 5);
    }

    #[test]
    fn test_partial_saturday_columns_are_ignored() {
        let mut r = row();
        r.saturday_start_time = NaiveTime::from_hms_opt(9, 0, 0);
        r.saturday_grace_minutes = Some(0);
        let schedule = WorkSchedule::try_from(r).unwrap();
        assert_eq!(schedule.saturday, None);
    }

    #[test]
    fn test_full_overrides() {
        let mut r = row();
        r.saturday_start_time = NaiveTime::from_hms_opt(10, 0, 0);
        r.saturday_end_time = NaiveTime::from_hms_opt(13, 0, 0);
        r.saturday_grace_minutes = Some(0);
        r.latitude = Some(23.81);
        r.longitude = Some(90.41);
        r.radius_meters = Some(200.0);
        let schedule = WorkSchedule::try_from(r).unwrap();
        assert!(schedule.saturday.is_some());
        assert_eq!(schedule.geofence.unwrap().radius_meters, 200.0);
    }

    #[test]
    fn test_effective_for_saturday_only() {
        let mut schedule = sample_schedule();
        schedule.saturday = Some(SaturdayOverride {
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            grace_minutes: 0,
        });

        // 2026-03-07 is a Saturday, 2026-03-06 a Friday, 2026-03-08 a Sunday
        let saturday = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let friday = NaiveDate::from_ymd_opt(2026, 3, 6).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();

        assert_eq!(schedule.effective_for(saturday).grace_minutes, 0);
        assert_eq!(
            schedule.effective_for(saturday).start_time,
            NaiveTime::from_hms_opt(10, 0, 0).unwrap()
        );
        assert_eq!(schedule.effective_for(friday).grace_minutes, 10);
        assert_eq!(schedule.effective_for(sunday).grace_minutes, 10);
    }

    #[test]
    fn test_is_work_day() {
        let schedule = sample_schedule();
        assert!(schedule.is_work_day(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()));
        assert!(!schedule.is_work_day(NaiveDate::from_ymd_opt(2026, 3, 8).unwrap()));
        assert_eq!(weekday_index(NaiveDate::from_ymd_opt(2026, 3, 8).unwrap()), SUNDAY);
    }

    #[test]
    fn test_validate() {
        assert!(sample_schedule().validate().is_ok());

        let mut inverted = sample_schedule();
        inverted.end_time = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert!(inverted.validate().is_err());

        let mut generous = sample_schedule();
        generous.grace_minutes = 241;
        assert!(generous.validate().is_err());

        let mut bad_day = sample_schedule();
        bad_day.work_days.insert(7);
        assert!(bad_day.validate().is_err());

        let mut bad_fence = sample_schedule();
        bad_fence.geofence = Some(Geofence {
            latitude: 95.0,
            longitude: 0.0,
            radius_meters: 10.0,
        });
        assert!(bad_fence.validate().is_err());

        let mut bad_saturday = sample_schedule();
        bad_saturday.saturday = Some(SaturdayOverride {
            start_time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            grace_minutes: 0,
        });
        assert!(bad_saturday.validate().is_err());
    }
}
