use serde::Serialize;

use crate::{AttendanceResult, ExtractionError, TimetableResult};

/// One extractor's output, or the error object that replaces it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Section<T> {
    Extracted(T),
    Failed { error: String },
}

impl<T> From<Result<T, ExtractionError>> for Section<T> {
    fn from(result: Result<T, ExtractionError>) -> Self {
        match result {
            Ok(value) => Section::Extracted(value),
            Err(e) => Section::Failed {
                error: e.to_string(),
            },
        }
    }
}

/// Attendance result with the day order merged in beside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceWithDayOrder {
    #[serde(flatten)]
    pub result: AttendanceResult,
    pub day_order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortalReport {
    pub status: &'static str,
    pub attendance: Section<AttendanceWithDayOrder>,
    pub timetable: Section<TimetableResult>,
}

impl PortalReport {
    pub fn new(
        attendance: Result<AttendanceResult, ExtractionError>,
        day_order: u32,
        timetable: Result<TimetableResult, ExtractionError>,
    ) -> Self {
        let attendance = attendance.map(|result| AttendanceWithDayOrder { result, day_order });
        Self {
            status: "success",
            attendance: attendance.into(),
            timetable: timetable.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failed_sections_render_as_error_objects() {
        let report = PortalReport::new(
            Err(ExtractionError::PayloadNotFound),
            4,
            Ok(TimetableResult::default()),
        );
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["status"], "success");
        assert_eq!(value["attendance"], json!({"error": "could not parse HTML"}));
        assert_eq!(value["timetable"]["total_credits"], 0);
        assert_eq!(value["timetable"]["advisors"], json!({}));
    }

    #[test]
    fn test_day_order_sits_beside_attendance_fields() {
        let report = PortalReport::new(
            Ok(AttendanceResult::default()),
            2,
            Err(ExtractionError::PayloadNotFound),
        );
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["attendance"]["day_order"], 2);
        assert_eq!(value["attendance"]["student_info"], json!({}));
        assert_eq!(
            value["attendance"]["attendance"],
            json!({
                "courses": {},
                "overall_attendance": 0.0,
                "total_hours_conducted": 0,
                "total_hours_absent": 0
            })
        );
        assert_eq!(value["timetable"], json!({"error": "could not parse HTML"}));
    }
}
