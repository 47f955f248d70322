use anyhow::Context;
use regex::{Captures, Regex};

/// Identifies the markup shape `COURSE_ROW_PATTERN` was written against.
pub const COURSE_ROW_PATTERN_VERSION: &str = "My_Time_Table_2023_24/v1";

// The course table carries no attribute we can select on, so rows are matched
// positionally over the decoded markup: eleven adjacent cells in the order
// s_no, code, title, credit, regn type, category, course type, faculty,
// slot (may carry attributes), room (may be empty), academic year.
// Any change to the portal's cell layout needs an update here and a version bump.
const COURSE_ROW_PATTERN: &str = concat!(
    r"<td>(\d+)</td>",
    r"<td>([^<]+)</td>",
    r"<td>([^<]+)</td>",
    r"<td>([^<]+)</td>",
    r"<td>([^<]+)</td>",
    r"<td>([^<]+)</td>",
    r"<td>([^<]+)</td>",
    r"<td>([^<]+)</td>",
    r"<td[^>]*>([^<]+)</td>",
    r"<td>([^<]*)</td>",
    r"<td>([^<]+)</td>",
);

/// The raw, untrimmed captures of one matched course row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseRowMatch<'h> {
    pub s_no: &'h str,
    pub course_code: &'h str,
    pub course_title: &'h str,
    pub credit: &'h str,
    pub regn_type: &'h str,
    pub category: &'h str,
    pub course_type: &'h str,
    pub faculty_name: &'h str,
    pub slot: &'h str,
    pub room_no: &'h str,
    pub academic_year: &'h str,
}

pub struct CourseRowMatcher {
    regex: Regex,
}

impl CourseRowMatcher {
    pub fn new() -> anyhow::Result<Self> {
        let regex = Regex::new(COURSE_ROW_PATTERN).with_context(|| {
            format!("failed to compile course row pattern {COURSE_ROW_PATTERN_VERSION}")
        })?;
        Ok(Self { regex })
    }

    /// Every course row in `html`, in document order.
    pub fn find_rows<'h>(&self, html: &'h str) -> Vec<CourseRowMatch<'h>> {
        self.regex
            .captures_iter(html)
            .map(|caps| CourseRowMatch::from_captures(&caps))
            .collect()
    }
}

impl<'h> CourseRowMatch<'h> {
    fn from_captures(caps: &Captures<'h>) -> Self {
        let field = |index: usize| caps.get(index).map_or("", |m| m.as_str());
        Self {
            s_no: field(1),
            course_code: field(2),
            course_title: field(3),
            credit: field(4),
            regn_type: field(5),
            category: field(6),
            course_type: field(7),
            faculty_name: field(8),
            slot: field(9),
            room_no: field(10),
            academic_year: field(11),
        }
    }
}
