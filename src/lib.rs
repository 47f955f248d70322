mod attendance_extractor;
mod course_row_matcher;
mod extraction_error;
mod payload_decoder;
mod table_walker;
mod text_manipulators;
mod timetable_extractor;

pub mod config;
pub mod report;
pub mod requests;
pub mod scraping_context;

pub use attendance_extractor::{
    AttendanceExtractor, AttendanceRecord, AttendanceResult, AttendanceSection,
    AttendanceStudentInfo, AttendanceSummary, MarksRecord, TestScore,
};
pub use course_row_matcher::COURSE_ROW_PATTERN_VERSION;
pub use extraction_error::ExtractionError;
pub use payload_decoder::{DecodeMode, PayloadDecoder};
pub use scraping_context::ScrapingContext;
pub use timetable_extractor::{
    AdvisorContact, Advisors, TimetableCourse, TimetableExtractor, TimetableResult,
    TimetableStudentInfo, total_credits,
};
