use academia_scraper::{
    AttendanceExtractor, ExtractionError, TestScore, TimetableExtractor,
    report::PortalReport,
};
use serde_json::json;

fn sanitized_page(escaped_payload: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head></head><body><div id=\"zc-page\"></div>\n<script>\n\
         var target = document.getElementById('zc-page');\n\
         target.innerHTML = pageSanitizer.sanitize('{escaped_payload}');\n\
         </script></body></html>"
    )
}

/// Escapes markup the way the attendance page does: hex for tag brackets and
/// quotes, `\n` for line breaks.
fn attendance_escape(html: &str) -> String {
    html.replace('\n', "\\n")
        .replace('<', "\\x3C")
        .replace('>', "\\x3E")
        .replace('"', "\\x22")
        .replace('\'', "\\x27")
}

/// Escapes markup the way the timetable page does: every special character as `\xHH`.
fn timetable_escape(html: &str) -> String {
    html.chars()
        .map(|c| match c {
            '<' | '>' | '"' | '\'' | '=' | ' ' | '-' | '/' | ':' | '@' | '.' | '(' | ')' => {
                format!("\\x{:02x}", c as u32)
            }
            c => c.to_string(),
        })
        .collect()
}

const ATTENDANCE_HTML: &str = r##"
<table style="width:900px">
  <tr><td>Registration Number:</td><td><strong>RA2111003010001</strong></td></tr>
  <tr><td>Name:</td><td>Jane Doe</td></tr>
  <tr><td>Program:</td><td>B.Tech</td></tr>
  <tr><td>Department:</td><td>Computing Technologies</td></tr>
  <tr><td>Semester:</td><td>5</td></tr>
  <tr><td>Batch:</td><td>2</td></tr>
</table>
<table bgcolor="#FAFAD2" border="1">
  <tr><td>Course Code</td><td>Course Title</td><td>Category</td><td>Faculty Name</td><td>Slot</td><td>Room No</td><td>Hours Conducted</td><td>Hours Absent</td><td>Attn %</td></tr>
  <tr><td>21CSC302J<br>Regular</td><td>Computer Networks</td><td>Theory</td><td>Dr. A. Kumar (101)</td><td>A</td><td>TP 401</td><td>20</td><td>5</td><td>75.00</td></tr>
</table>
<table border="1">
  <tr><td>Course Code</td><td>Course Type</td><td>Test Performance</td></tr>
  <tr><td>21CSC302J</td><td>Theory</td><td><table><tr><td><strong>FT-I/5.00</strong><br>3.40</td></tr></table></td></tr>
</table>
"##;

const TIMETABLE_HTML: &str = r##"
<table>
  <tr><td>Registration Number:</td><td>RA2111003010001</td><td>Name:</td><td>Jane Doe</td></tr>
  <tr><td>Batch:</td><td>Batch 2</td><td>Mobile:</td><td>9876543210</td></tr>
  <tr><td>Program:</td><td>B.Tech</td><td>Department:</td><td>CSE</td></tr>
  <tr><td>Semester:</td><td>5</td></tr>
</table>
<table><tr><td align="center">Dr. A. Kumar<br>Faculty Advisor<br>a.kumar@srmist.edu.in<br>9876543210</td></tr></table>
<table class="course_tbl"><tr><td>S.No</td><td>Course Code</td></tr><tr><td>1</td><td>21CSC302J</td><td>Computer Networks</td><td>4</td><td>Regular</td><td>Professional Core</td><td>Theory</td><td>Dr. A. Kumar (101)</td><td bgcolor="#E6E6FA">A</td><td>TP 401</td><td>AY2024-25-ODD</td></tr><tr><td>2</td><td>21CSC302J</td><td>Computer Networks</td><td>4</td><td>Regular</td><td>Professional Core</td><td>Theory</td><td>Dr. A. Kumar (101)</td><td>P7-P8</td><td></td><td>AY2024-25-ODD</td></tr><tr><td>3</td><td>21CSC302J</td><td>Computer Networks</td><td>4</td><td>Regular</td><td>Professional Core</td><td>Theory</td><td>Dr. A. Kumar (101)</td><td>P9</td><td></td><td>AY2024-25-ODD</td></tr></table>
"##;

#[test]
fn attendance_page_end_to_end() {
    let extractor = AttendanceExtractor::new().expect("extractor builds");
    let page = sanitized_page(&attendance_escape(ATTENDANCE_HTML));
    let result = extractor.extract(&page).expect("payload present");

    assert_eq!(result.student_info.name.as_deref(), Some("Jane Doe"));
    assert_eq!(result.attendance.summary.overall_attendance, 75.0);
    assert_eq!(result.attendance.summary.total_hours_conducted, 20);
    assert_eq!(result.attendance.summary.total_hours_absent, 5);
    assert_eq!(
        result.marks["21CSC302JTheory"].tests,
        vec![TestScore {
            test_name: "FT-I".to_string(),
            obtained_marks: 3.4,
            max_marks: 5.0,
            percentage: 68.0,
        }]
    );

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(
        value["attendance"]["courses"]["21CSC302JTheory"],
        json!({
            "course_title": "Computer Networks",
            "category": "Theory",
            "faculty_name": "Dr. A. Kumar (101)",
            "slot": "A",
            "room_no": "TP 401",
            "hours_conducted": 20,
            "hours_absent": 5,
            "attendance_percentage": 75.0
        })
    );
    assert!(value["student_info"].get("photo_url").is_none());
    assert_eq!(value["student_info"]["batch"], "2");
}

#[test]
fn timetable_page_end_to_end() {
    let extractor = TimetableExtractor::new().expect("extractor builds");
    let page = sanitized_page(&timetable_escape(TIMETABLE_HTML));
    let result = extractor.extract(&page).expect("payload present");

    assert_eq!(result.student_info.registration_number, "RA2111003010001");
    assert_eq!(result.student_info.batch, "2");
    assert_eq!(result.student_info.department, "CSE");
    assert_eq!(result.courses.len(), 3);
    assert_eq!(result.courses[0].room_no, "TP 401");
    assert_eq!(result.courses[1].room_no, "");
    assert_eq!(result.total_credits, 4);

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(
        value["advisors"],
        json!({
            "faculty_advisor": {
                "name": "Dr. A. Kumar",
                "email": "a.kumar@srmist.edu.in",
                "phone": "9876543210"
            }
        })
    );
    assert_eq!(value["courses"][0]["credit"], 4);
    assert_eq!(value["courses"][0]["s_no"], "1");
}

#[test]
fn pages_without_payload_fail_both_extractors() {
    let page = "<html><body><form action=\"/signin\"></form></body></html>";
    let attendance = AttendanceExtractor::new().unwrap().extract(page);
    let timetable = TimetableExtractor::new().unwrap().extract(page);

    assert_eq!(attendance, Err(ExtractionError::PayloadNotFound));
    assert_eq!(timetable, Err(ExtractionError::PayloadNotFound));

    let report = serde_json::to_value(PortalReport::new(attendance, 4, timetable)).unwrap();
    assert_eq!(
        report,
        json!({
            "status": "success",
            "attendance": {"error": "could not parse HTML"},
            "timetable": {"error": "could not parse HTML"}
        })
    );
}
