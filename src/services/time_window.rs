use chrono::NaiveDateTime;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::model::work_schedule::{Geofence, WorkSchedule};
use crate::services::lateness::minute_of_day;

/// How early before the scheduled start a check-in is accepted.
pub const EARLY_CHECK_IN_MINUTES: u32 = 60;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[schema(example = 23.8103)]
    pub latitude: f64,
    #[schema(example = 90.4125)]
    pub longitude: f64,
}

/// Great-circle distance in meters (haversine).
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

pub fn inside_geofence(fence: &Geofence, point: GeoPoint) -> bool {
    let center = GeoPoint {
        latitude: fence.latitude,
        longitude: fence.longitude,
    };
    distance_meters(center, point) <= fence.radius_meters
}

/// Gate in front of check-in. Always open unless `enforce` is set.
///
/// When enforced the day must be a work day, local time must fall within
/// `[start - EARLY_CHECK_IN_MINUTES, end]` and, for fenced schedules, the caller must
/// report a position inside the fence.
pub fn is_within_allowed_time(
    schedule: &WorkSchedule,
    now_local: NaiveDateTime,
    location: Option<GeoPoint>,
    enforce: bool,
) -> bool {
    if !enforce {
        return true;
    }

    let date = now_local.date();
    if !schedule.is_work_day(date) {
        return false;
    }

    let day = schedule.effective_for(date);
    let now = minute_of_day(now_local.time());
    let opens = minute_of_day(day.start_time).saturating_sub(EARLY_CHECK_IN_MINUTES);
    let closes = minute_of_day(day.end_time);
    if now < opens || now > closes {
        return false;
    }

    match (&schedule.geofence, location) {
        (Some(fence), Some(point)) => inside_geofence(fence, point),
        (Some(_), None) => false,
        (None, _) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::work_schedule::sample_schedule;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn fenced() -> WorkSchedule {
        let mut schedule = sample_schedule();
        schedule.geofence = Some(Geofence {
            latitude: 23.8103,
            longitude: 90.4125,
            radius_meters: 200.0,
        });
        schedule
    }

    #[test]
    fn test_disabled_gate_is_always_open() {
        let schedule = fenced();
        // Sunday at midnight with no location
        assert!(is_within_allowed_time(&schedule, at(8, 0, 0), None, false));
    }

    #[test]
    fn test_enforced_window_bounds() {
        let schedule = sample_schedule();
        assert!(!is_within_allowed_time(&schedule, at(2, 7, 59), None, true));
        assert!(is_within_allowed_time(&schedule, at(2, 8, 0), None, true));
        assert!(is_within_allowed_time(&schedule, at(2, 16, 0), None, true));
        assert!(!is_within_allowed_time(&schedule, at(2, 16, 1), None, true));
    }

    #[test]
    fn test_enforced_rejects_non_work_day() {
        let schedule = sample_schedule();
        assert!(!is_within_allowed_time(&schedule, at(8, 9, 0), None, true));
    }

    #[test]
    fn test_enforced_geofence() {
        let schedule = fenced();
        let near = GeoPoint {
            latitude: 23.8110,
            longitude: 90.4125,
        };
        let far = GeoPoint {
            latitude: 23.8203,
            longitude: 90.4125,
        };
        assert!(is_within_allowed_time(&schedule, at(2, 9, 0), Some(near), true));
        assert!(!is_within_allowed_time(&schedule, at(2, 9, 0), Some(far), true));
        assert!(!is_within_allowed_time(&schedule, at(2, 9, 0), None, true));
    }

    #[test]
    fn test_distance_meters() {
        let a = GeoPoint {
            latitude: 0.0,
            longitude: 0.0,
        };
        let b = GeoPoint {
            latitude: 0.0,
            longitude: 1.0,
        };
        let d = distance_meters(a, b);
        // one degree of longitude at the equator is roughly 111.2 km
        assert!((d - 111_195.0).abs() < 100.0, "distance was {}", d);
        assert_eq!(distance_meters(a, a), 0.0);
    }
}
