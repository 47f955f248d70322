use scraper::ElementRef;

pub fn extract_text(node: ElementRef) -> String {
    node.text().collect::<String>()
}

/// Collapses every run of whitespace (including `&nbsp;`) to one space and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of a node, one entry per non-empty line.
///
/// Every text node is split on line breaks, so `<br>`-separated content and
/// literal newlines inside a single text node both come back as separate lines.
pub fn extract_lines(node: ElementRef) -> Vec<String> {
    node.text()
        .flat_map(|fragment| fragment.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

pub fn parse_u32_or_zero(text: &str) -> u32 {
    text.trim().parse().unwrap_or(0)
}

/// Parses a float, falling back to `0.0` for anything that isn't a finite number
/// (`"Abs"`, `"-"`, `"NaN"`, empty cells).
pub fn parse_f64_or_zero(text: &str) -> f64 {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Rounds to two decimals, sending exact ties to the even neighbour (`90.625` -> `90.62`).
pub fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// `part / whole * 100` rounded to two decimals, `0.0` when `whole` is not positive.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        round_2dp(part / whole * 100.0)
    } else {
        0.0
    }
}

pub fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}
