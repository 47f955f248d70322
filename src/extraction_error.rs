/// Why a report section carries an error object instead of extracted data.
///
/// Everything below the payload level (a short row, a non-numeric cell, a
/// malformed test entry) degrades to a default or an omission instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    /// The `pageSanitizer.sanitize('...')` literal is missing, so the page is not
    /// the shape we know how to read.
    #[error("could not parse HTML")]
    PayloadNotFound,
    /// The page never arrived; the other sections of the report still stand.
    #[error("could not fetch page: {0}")]
    PageUnavailable(String),
}
