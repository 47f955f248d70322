use std::collections::BTreeMap;

use log::{debug, warn};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::{
    ExtractionError,
    payload_decoder::{DecodeMode, PayloadDecoder},
    table_walker::{self, body_rows, cell_text, has_attr, row_cells},
    text_manipulators::{
        extract_lines, extract_text, parse_f64_or_zero, parse_u32_or_zero, percentage,
    },
};

/// Background colour that marks the attendance table.
const ATTENDANCE_TABLE_BGCOLOR: &str = "#FAFAD2";
/// Header phrases that tell the marks table apart from other `border="1"` tables.
const MARKS_TABLE_PHRASES: [&str; 2] = ["Course Code", "Test Performance"];
const MIN_ATTENDANCE_CELLS: usize = 9;
const MIN_MARKS_CELLS: usize = 3;

/// Profile fields; a key is only emitted when its labelled row was present.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct AttendanceStudentInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRecord {
    pub course_title: String,
    pub category: String,
    pub faculty_name: String,
    pub slot: String,
    pub room_no: String,
    pub hours_conducted: u32,
    pub hours_absent: u32,
    pub attendance_percentage: f64,
    /// Read from the course code cell (e.g. "Regular") but not part of the output yet.
    #[serde(skip)]
    pub registration_type: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub overall_attendance: f64,
    pub total_hours_conducted: u32,
    pub total_hours_absent: u32,
}

impl AttendanceSummary {
    /// `overall_attendance` stays `0.0` when nothing was conducted.
    /// `absent <= conducted` is not assumed.
    pub fn from_totals(conducted: u32, absent: u32) -> Self {
        Self {
            overall_attendance: percentage(
                f64::from(conducted) - f64::from(absent),
                f64::from(conducted),
            ),
            total_hours_conducted: conducted,
            total_hours_absent: absent,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct AttendanceSection {
    /// Keyed by `course_code + category`.
    pub courses: BTreeMap<String, AttendanceRecord>,
    #[serde(flatten)]
    pub summary: AttendanceSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestScore {
    pub test_name: String,
    pub obtained_marks: f64,
    pub max_marks: f64,
    pub percentage: f64,
}

impl TestScore {
    pub fn new(test_name: String, obtained_marks: f64, max_marks: f64) -> Self {
        Self {
            test_name,
            obtained_marks,
            max_marks,
            percentage: percentage(obtained_marks, max_marks),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarksRecord {
    pub course_type: String,
    pub tests: Vec<TestScore>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct AttendanceResult {
    pub student_info: AttendanceStudentInfo,
    pub attendance: AttendanceSection,
    /// Keyed by `course_code + course_type`.
    pub marks: BTreeMap<String, MarksRecord>,
}

pub struct AttendanceExtractor {
    decoder: PayloadDecoder,
    row_selector: Selector,
    table_selector: Selector,
    img_selector: Selector,
}

impl AttendanceExtractor {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            decoder: PayloadDecoder::new()?,
            row_selector: table_walker::selector("tr")?,
            table_selector: table_walker::selector("table")?,
            img_selector: table_walker::selector("img")?,
        })
    }

    /// Reads profile, attendance and marks out of the raw `My_Attendance` page.
    ///
    /// Fails only when the sanitized payload is missing; anything malformed
    /// below that is defaulted or skipped.
    pub fn extract(&self, raw_page: &str) -> Result<AttendanceResult, ExtractionError> {
        let html = self.decoder.decode(raw_page, DecodeMode::Generic)?;
        let document = Html::parse_document(&html);

        let student_info = self.parse_student_info(&document);
        let attendance = self.parse_attendance(&document);
        let marks = self.parse_marks(&document);

        Ok(AttendanceResult {
            student_info,
            attendance,
            marks,
        })
    }

    fn parse_student_info(&self, document: &Html) -> AttendanceStudentInfo {
        let mut info = AttendanceStudentInfo::default();

        for row in document.select(&self.row_selector) {
            let cells = row_cells(row);
            let [label_cell, value_cell, ..] = cells.as_slice() else {
                continue;
            };
            let label = cell_text(*label_cell).replace(':', "");
            let value = cell_text(*value_cell);

            match label.trim() {
                "Registration Number" => info.registration_number = Some(value),
                "Name" => info.name = Some(value),
                "Program" => info.program = Some(value),
                "Department" => info.department = Some(value),
                "Specialization" => info.specialization = Some(value),
                "Semester" => info.semester = Some(value),
                "Batch" => info.batch = Some(value),
                "Feedback Status" => info.feedback_status = Some(value),
                "Enrollment Status / DOE" => {
                    if let Some((status, date)) = value.split_once(" / ") {
                        if !date.contains(" / ") {
                            info.enrollment_status = Some(status.to_string());
                            info.enrollment_date = Some(date.to_string());
                        }
                    }
                }
                "Photo-ID" => {
                    let src = value_cell
                        .select(&self.img_selector)
                        .next()
                        .and_then(|img| img.value().attr("src"))
                        .filter(|src| !src.is_empty());
                    if let Some(src) = src {
                        info.photo_url = Some(src.to_string());
                    }
                }
                _ => {}
            }
        }

        info
    }

    fn parse_attendance(&self, document: &Html) -> AttendanceSection {
        let mut section = AttendanceSection::default();

        let Some(table) = table_walker::find_table(document, &self.table_selector, |el| {
            has_attr(el, "bgcolor", ATTENDANCE_TABLE_BGCOLOR)
        }) else {
            warn!("attendance table not found in payload");
            return section;
        };

        // Totals run over every accepted row, including ones whose key is later overwritten.
        let mut total_conducted = 0u32;
        let mut total_absent = 0u32;

        for row in body_rows(table) {
            let cells = row_cells(row);
            if cells.len() < MIN_ATTENDANCE_CELLS {
                debug!("skipping attendance row with {} cells", cells.len());
                continue;
            }

            let mut code_lines = extract_lines(cells[0]).into_iter();
            let course_code = code_lines.next().unwrap_or_default();
            let registration_type = code_lines.next().unwrap_or_default();
            let category = cell_text(cells[2]);

            let record = AttendanceRecord {
                course_title: cell_text(cells[1]),
                category: category.clone(),
                faculty_name: cell_text(cells[3]),
                slot: cell_text(cells[4]),
                room_no: cell_text(cells[5]),
                hours_conducted: parse_u32_or_zero(&cell_text(cells[6])),
                hours_absent: parse_u32_or_zero(&cell_text(cells[7])),
                attendance_percentage: parse_f64_or_zero(&cell_text(cells[8])),
                registration_type,
            };
            total_conducted = total_conducted.saturating_add(record.hours_conducted);
            total_absent = total_absent.saturating_add(record.hours_absent);
            section.courses.insert(course_code + &category, record);
        }

        section.summary = AttendanceSummary::from_totals(total_conducted, total_absent);
        section
    }

    fn parse_marks(&self, document: &Html) -> BTreeMap<String, MarksRecord> {
        let mut marks = BTreeMap::new();

        let marks_tables = document.select(&self.table_selector).filter(|table| {
            if !has_attr(table.value(), "border", "1") {
                return false;
            }
            let text = extract_text(*table);
            MARKS_TABLE_PHRASES.iter().all(|phrase| text.contains(phrase))
        });

        for table in marks_tables {
            for row in body_rows(table) {
                let cells = row_cells(row);
                if cells.len() < MIN_MARKS_CELLS {
                    debug!("skipping marks row with {} cells", cells.len());
                    continue;
                }

                let course_code = cell_text(cells[0]);
                let course_type = cell_text(cells[1]);
                let tests = self.parse_test_performance(cells[2]);

                marks.insert(course_code + &course_type, MarksRecord { course_type, tests });
            }
        }

        marks
    }

    /// Reads the nested table in a "Test Performance" cell. Each inner cell holds
    /// `TestName/MaxMarks` on its first line and the obtained marks on its second.
    fn parse_test_performance(&self, performance_cell: ElementRef) -> Vec<TestScore> {
        let Some(inner_table) = performance_cell.select(&self.table_selector).next() else {
            return Vec::new();
        };

        table_walker::rows(inner_table)
            .into_iter()
            .flat_map(row_cells)
            .filter_map(|cell| parse_test_cell(&extract_lines(cell)))
            .collect()
    }
}

fn parse_test_cell(lines: &[String]) -> Option<TestScore> {
    let [heading, score, ..] = lines else {
        debug!("skipping test cell without a score line: {lines:?}");
        return None;
    };
    let Some((test_name, max_marks)) = heading.split_once('/') else {
        debug!("skipping test cell without max marks: {heading:?}");
        return None;
    };
    // "Name/5.00/extra" keeps only the segment right after the first slash.
    let max_marks = max_marks.split('/').next().unwrap_or_default();

    Some(TestScore::new(
        test_name.to_string(),
        parse_f64_or_zero(score),
        parse_f64_or_zero(max_marks),
    ))
}
