//! Line splitting and delimiter detection for uploaded client files.
//!
//! This is a deliberately small splitter rather than a CSV grammar: each line
//! is cut on the detected delimiter, every cell is trimmed and loses at most
//! one pair of wrapping double quotes. Quoted delimiters, escaped quotes and
//! multi-line cells are not supported.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ImportError, ImportResult};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Field separator picked from the header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Semicolon,
    Tab,
    Comma,
}

impl Delimiter {
    /// Semicolon wins over tab, tab wins over comma. First match only, no
    /// frequency counting.
    pub fn detect(header_line: &str) -> Self {
        if header_line.contains(';') {
            Delimiter::Semicolon
        } else if header_line.contains('\t') {
            Delimiter::Tab
        } else {
            Delimiter::Comma
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Delimiter::Semicolon => ';',
            Delimiter::Tab => '\t',
            Delimiter::Comma => ',',
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Tab => f.write_str("\\t"),
            other => write!(f, "{}", other.as_char()),
        }
    }
}

/// Cells of one data line, tagged with the line's 1-based position counting
/// the header as line 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub row_number: usize,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokenized {
    pub delimiter: Delimiter,
    pub header_fields: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Splits `content` into a header and data rows.
///
/// Blank (whitespace-only) lines are dropped before anything else and do not
/// advance row numbers.
pub fn tokenize(content: &str, max_size: usize) -> ImportResult<Tokenized> {
    if content.len() > max_size {
        return Err(ImportError::SizeLimitExceeded {
            size: content.len(),
            limit: max_size,
        });
    }

    let content = content.strip_prefix(BYTE_ORDER_MARK).unwrap_or(content);
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());

    let header_line = lines.next().ok_or(ImportError::EmptyFile)?;
    let delimiter = Delimiter::detect(header_line);
    let header_fields = split_line(header_line, delimiter);
    if header_fields.iter().all(|field| field.is_empty()) {
        return Err(ImportError::MissingHeader);
    }
    debug!(
        "Detected delimiter '{}' with header {:?}",
        delimiter, header_fields
    );

    let rows = lines
        .enumerate()
        .map(|(idx, line)| RawRow {
            row_number: idx + 2,
            cells: split_line(line, delimiter),
        })
        .collect();

    Ok(Tokenized {
        delimiter,
        header_fields,
        rows,
    })
}

pub fn split_line(line: &str, delimiter: Delimiter) -> Vec<String> {
    line.split(delimiter.as_char()).map(clean_cell).collect()
}

fn clean_cell(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 5 * 1024 * 1024;

    #[test]
    fn detect_prefers_semicolon_then_tab_then_comma() {
        assert_eq!(Delimiter::detect("name;email,phone"), Delimiter::Semicolon);
        assert_eq!(Delimiter::detect("name\temail;phone"), Delimiter::Semicolon);
        assert_eq!(Delimiter::detect("name\temail,phone"), Delimiter::Tab);
        assert_eq!(Delimiter::detect("name,email"), Delimiter::Comma);
        assert_eq!(Delimiter::detect("name"), Delimiter::Comma);
    }

    #[test]
    fn tokenize_skips_blank_lines_and_numbers_rows_from_two() {
        let tokens = tokenize("name,email\r\n\r\nJohn,j@x.com\n   \nJane,\n", LIMIT).unwrap();
        assert_eq!(tokens.header_fields, vec!["name", "email"]);
        assert_eq!(tokens.rows.len(), 2);
        assert_eq!(tokens.rows[0].row_number, 2);
        assert_eq!(tokens.rows[1].row_number, 3);
        assert_eq!(tokens.rows[1].cells, vec!["Jane", ""]);
    }

    #[test]
    fn clean_cell_strips_one_pair_of_quotes() {
        assert_eq!(clean_cell("  \"Acme, Inc\"  "), "Acme, Inc");
        assert_eq!(clean_cell("\"\"quoted\"\""), "\"quoted\"");
        assert_eq!(clean_cell("\"open"), "\"open");
        assert_eq!(clean_cell("\""), "\"");
    }

    #[test]
    fn tokenize_rejects_empty_and_oversized_input() {
        assert_eq!(tokenize("", LIMIT), Err(ImportError::EmptyFile));
        assert_eq!(tokenize("\n \r\n\t\n", LIMIT), Err(ImportError::EmptyFile));
        assert_eq!(
            tokenize("name\nJohn", 4),
            Err(ImportError::SizeLimitExceeded { size: 9, limit: 4 })
        );
    }

    #[test]
    fn tokenize_rejects_header_without_fields() {
        assert_eq!(tokenize(",,\nJohn,,", LIMIT), Err(ImportError::MissingHeader));
        assert_eq!(tokenize("\"\"\nJohn", LIMIT), Err(ImportError::MissingHeader));
    }

    #[test]
    fn tokenize_strips_byte_order_mark() {
        let tokens = tokenize("\u{feff}name;tags\nJohn;a|b", LIMIT).unwrap();
        assert_eq!(tokens.delimiter, Delimiter::Semicolon);
        assert_eq!(tokens.header_fields[0], "name");
    }

    #[test]
    fn tab_delimiter_displays_escaped() {
        assert_eq!(Delimiter::Tab.to_string(), "\\t");
        assert_eq!(Delimiter::Semicolon.to_string(), ";");
    }
}
