use chrono::NaiveDateTime;

use crate::model::attendance::AttendanceRecord;
use crate::services::summary::format_minutes;

pub const CSV_HEADER: [&str; 9] = [
    "date",
    "user_id",
    "username",
    "status",
    "check_in",
    "check_out",
    "worked",
    "late_minutes",
    "early_departure_minutes",
];

/// Attendance row joined with the owner's username.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub username: String,
    pub record: AttendanceRecord,
}

fn clock(value: Option<NaiveDateTime>) -> String {
    value
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default()
}

/// Renders the monthly attendance sheet as CSV bytes.
pub fn attendance_csv(rows: &[ExportRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for row in rows {
        let r = &row.record;
        let worked = if r.check_in.is_some() && r.check_out.is_some() {
            format_minutes(r.worked_minutes())
        } else {
            String::new()
        };

        writer.write_record([
            r.date.format("%Y-%m-%d").to_string(),
            r.user_id.to_string(),
            row.username.clone(),
            r.status.to_string(),
            clock(r.check_in),
            clock(r.check_out),
            worked,
            r.late_minutes.to_string(),
            r.early_departure_minutes.to_string(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceStatus;
    use chrono::NaiveDate;

    #[test]
    fn test_csv_layout() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        let mut late = AttendanceRecord::new(12, date, AttendanceStatus::Late);
        late.check_in = date.and_hms_opt(9, 25, 0);
        late.check_out = date.and_hms_opt(15, 40, 0);
        late.is_late = true;
        late.late_minutes = 15;
        late.is_early_departure = true;
        late.early_departure_minutes = 20;

        let absent = AttendanceRecord::new(13, date, AttendanceStatus::Absent);

        let bytes = attendance_csv(&[
            ExportRow {
                username: "r.sen".to_string(),
                record: late,
            },
            ExportRow {
                username: "Das, Mitu".to_string(),
                record: absent,
            },
        ])
        .unwrap();

        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines[0],
            "date,user_id,username,status,check_in,check_out,worked,late_minutes,early_departure_minutes"
        );
        assert_eq!(lines[1], "2026-03-03,12,r.sen,LATE,09:25,15:40,06:15,15,20");
        assert_eq!(lines[2], "2026-03-03,13,\"Das, Mitu\",ABSENT,,,,0,0");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_empty_export_has_header_only() {
        let text = String::from_utf8(attendance_csv(&[]).unwrap()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
