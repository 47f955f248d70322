use std::collections::HashSet;

use log::debug;
use scraper::{Html, Selector};
use serde::Serialize;

use crate::{
    ExtractionError,
    course_row_matcher::{CourseRowMatch, CourseRowMatcher},
    payload_decoder::{DecodeMode, PayloadDecoder},
    table_walker::{self, cell_text, label_value_pairs},
    text_manipulators::{digits_only, extract_lines, parse_u32_or_zero},
};

/// Only addresses on the institution's domain are taken as advisor emails.
pub const INSTITUTION_EMAIL_DOMAIN: &str = "@srmist.edu.in";
const MIN_PHONE_DIGITS: usize = 10;
const FACULTY_ADVISOR_LABEL: &str = "Faculty Advisor";
const ACADEMIC_ADVISOR_LABEL: &str = "Academic Advisor";

/// Unlike the attendance profile, every key is always present (empty when unmatched).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TimetableStudentInfo {
    pub registration_number: String,
    pub name: String,
    /// Digits only.
    pub batch: String,
    pub mobile: String,
    pub program: String,
    pub department: String,
    pub semester: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimetableCourse {
    pub s_no: String,
    pub course_code: String,
    pub course_title: String,
    pub credit: u32,
    pub regn_type: String,
    pub category: String,
    pub course_type: String,
    pub faculty_name: String,
    pub slot: String,
    pub room_no: String,
    pub academic_year: String,
}

impl From<CourseRowMatch<'_>> for TimetableCourse {
    fn from(row: CourseRowMatch<'_>) -> Self {
        Self {
            s_no: row.s_no.to_string(),
            course_code: row.course_code.trim().to_string(),
            course_title: row.course_title.trim().to_string(),
            credit: parse_u32_or_zero(row.credit),
            regn_type: row.regn_type.trim().to_string(),
            category: row.category.trim().to_string(),
            course_type: row.course_type.trim().to_string(),
            faculty_name: row.faculty_name.trim().to_string(),
            slot: row.slot.trim().to_string(),
            room_no: row.room_no.trim().to_string(),
            academic_year: row.academic_year.trim().to_string(),
        }
    }
}

/// Sum of credits counting each course code once, at its first occurrence.
pub fn total_credits(courses: &[TimetableCourse]) -> u32 {
    let mut seen = HashSet::new();
    let mut total = 0u32;
    for course in courses {
        if seen.insert(course.course_code.as_str()) {
            total = total.saturating_add(course.credit);
        }
    }
    total
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisorContact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Advisors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faculty_advisor: Option<AdvisorContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_advisor: Option<AdvisorContact>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TimetableResult {
    pub student_info: TimetableStudentInfo,
    pub courses: Vec<TimetableCourse>,
    pub advisors: Advisors,
    pub total_credits: u32,
}

pub struct TimetableExtractor {
    decoder: PayloadDecoder,
    course_rows: CourseRowMatcher,
    row_selector: Selector,
    centered_cell_selector: Selector,
}

impl TimetableExtractor {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            decoder: PayloadDecoder::new()?,
            course_rows: CourseRowMatcher::new()?,
            row_selector: table_walker::selector("table tr")?,
            centered_cell_selector: table_walker::selector("table td[align=\"center\"]")?,
        })
    }

    /// Reads profile, courses, advisors and credit total out of the raw timetable page.
    pub fn extract(&self, raw_page: &str) -> Result<TimetableResult, ExtractionError> {
        let html = self.decoder.decode(raw_page, DecodeMode::HexOnly)?;
        let document = Html::parse_document(&html);

        let student_info = self.parse_student_info(&document);
        let courses: Vec<TimetableCourse> = self
            .course_rows
            .find_rows(&html)
            .into_iter()
            .map(TimetableCourse::from)
            .collect();
        debug!("matched {} timetable course rows", courses.len());
        let total_credits = total_credits(&courses);
        let advisors = self.parse_advisors(&document);

        Ok(TimetableResult {
            student_info,
            courses,
            advisors,
            total_credits,
        })
    }

    fn parse_student_info(&self, document: &Html) -> TimetableStudentInfo {
        let mut info = TimetableStudentInfo::default();

        for row in document.select(&self.row_selector) {
            for (label, value_cell) in label_value_pairs(row) {
                let value = cell_text(value_cell);
                match label.as_str() {
                    label if label.contains("Registration Number") => {
                        info.registration_number = value
                    }
                    "Name" => info.name = value,
                    "Batch" => info.batch = digits_only(&value),
                    "Mobile" => info.mobile = value,
                    "Program" => info.program = value,
                    label if label.contains("Department") => info.department = value,
                    "Semester" => info.semester = value,
                    _ => {}
                }
            }
        }

        info
    }

    /// Advisor cards are centred cells whose lines read name, role, then contact details.
    fn parse_advisors(&self, document: &Html) -> Advisors {
        let mut advisors = Advisors::default();

        for cell in document.select(&self.centered_cell_selector) {
            let lines = extract_lines(cell);
            // A cell mentioning the faculty role is never read as an academic advisor card.
            if lines.iter().any(|line| line.contains(FACULTY_ADVISOR_LABEL)) {
                if let Some(contact) = advisor_contact(&lines, FACULTY_ADVISOR_LABEL) {
                    advisors.faculty_advisor = Some(contact);
                }
            } else if let Some(contact) = advisor_contact(&lines, ACADEMIC_ADVISOR_LABEL) {
                advisors.academic_advisor = Some(contact);
            }
        }

        advisors
    }
}

/// Builds a contact when some line mentions `role` and a name line precedes it.
fn advisor_contact(lines: &[String], role: &str) -> Option<AdvisorContact> {
    let role_index = lines.iter().position(|line| line.contains(role))?;
    let name = lines.get(role_index.checked_sub(1)?)?;

    let email = lines
        .iter()
        .find(|line| line.contains(INSTITUTION_EMAIL_DOMAIN))
        .cloned()
        .unwrap_or_default();
    let phone = lines
        .iter()
        .find(|line| is_phone_number(line))
        .cloned()
        .unwrap_or_default();

    Some(AdvisorContact {
        name: name.clone(),
        email,
        phone,
    })
}

fn is_phone_number(line: &str) -> bool {
    let digits = line.replace('-', "");
    digits.len() >= MIN_PHONE_DIGITS && digits.chars().all(|c| c.is_ascii_digit())
}
