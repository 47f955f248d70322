use anyhow::Context;
use regex::{Captures, Regex};

use crate::ExtractionError;

/// How the sanitized string literal was escaped by the page that embedded it.
///
/// The two portal pages do not share a convention, so the mode is fixed per
/// extractor rather than sniffed from the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Full string-escape pass: `\n`, `\t`, `\'`, `\\`, `\xNN`, `\uNNNN`, ...
    Generic,
    /// Only `\xHH` byte escapes are decoded; every other backslash is left alone.
    HexOnly,
}

pub struct PayloadDecoder {
    // Matches the argument of `innerHTML = pageSanitizer.sanitize('...');`,
    // non-greedy but allowed to span lines.
    payload_regex: Regex,
    hex_escape_regex: Regex,
}

impl PayloadDecoder {
    pub fn new() -> anyhow::Result<Self> {
        let payload_regex = Regex::new(r"(?s)innerHTML = pageSanitizer\.sanitize\('(.+?)'\);")
            .context("failed to compile sanitized payload regex")?;
        let hex_escape_regex =
            Regex::new(r"\\x([0-9a-fA-F]{2})").context("failed to compile hex escape regex")?;
        Ok(Self {
            payload_regex,
            hex_escape_regex,
        })
    }

    /// Finds the embedded payload in a raw page and returns it decoded as plain HTML.
    pub fn decode(&self, raw_page: &str, mode: DecodeMode) -> Result<String, ExtractionError> {
        let Some(caps) = self.payload_regex.captures(raw_page) else {
            return Err(ExtractionError::PayloadNotFound);
        };
        let Some(escaped) = caps.get(1) else {
            return Err(ExtractionError::PayloadNotFound);
        };
        let decoded = match mode {
            DecodeMode::Generic => unescape_generic(escaped.as_str()),
            DecodeMode::HexOnly => self.unescape_hex(escaped.as_str()),
        };
        Ok(decoded)
    }

    fn unescape_hex(&self, escaped: &str) -> String {
        self.hex_escape_regex
            .replace_all(escaped, |caps: &Captures| {
                u8::from_str_radix(&caps[1], 16)
                    .map(|byte| char::from(byte).to_string())
                    .unwrap_or_else(|_| caps[0].to_string())
            })
            .into_owned()
    }
}

/// Decodes backslash escapes the way a general string-escape codec does.
/// Unknown or truncated escapes are kept verbatim.
fn unescape_generic(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            'a' => out.push('\u{7}'),
            '\\' | '\'' | '"' => out.push(next),
            // Line continuation.
            '\n' => {}
            'x' | 'u' | 'U' => {
                let width = match next {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars
                    .clone()
                    .take(width)
                    .take_while(char::is_ascii_hexdigit)
                    .collect();
                let decoded = (digits.len() == width)
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(c) => {
                        out.push(c);
                        for _ in 0..width {
                            chars.next();
                        }
                    }
                    None => {
                        out.push('\\');
                        out.push(next);
                    }
                }
            }
            '0'..='7' => {
                let mut value = next.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }

    out
}
