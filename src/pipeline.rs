//! Entry points that chain tokenizing, mapping, validation and merge planning.
//!
//! Nothing here touches the filesystem or a database: callers hand in the
//! file text and the stored records, and get classifications back.

use log::{debug, info};
use serde::Serialize;

use crate::{
    config::ImportPolicy,
    error::ImportResult,
    mapper::map_row,
    merge::{self, ExistingRecord, MergeOutcome},
    tokenizer::{Delimiter, tokenize},
    validate::{InvalidRow, ValidRow, validate_with},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub valid_rows: Vec<ValidRow>,
    pub invalid_rows: Vec<InvalidRow>,
    #[serde(skip)]
    pub delimiter: Option<Delimiter>,
}

impl ParseResult {
    pub fn total_rows(&self) -> usize {
        self.valid_rows.len() + self.invalid_rows.len()
    }

    /// Plans the merge of this file's valid rows, counting invalid rows
    /// towards the reported input total.
    pub fn plan_merge(
        &self,
        existing: &[ExistingRecord],
        policy: &ImportPolicy,
    ) -> ImportResult<MergeOutcome> {
        merge::plan(&self.valid_rows, existing, policy, self.total_rows())
    }
}

/// Parses an upload with the default policy.
pub fn parse(content: &str, file_name: &str) -> ImportResult<ParseResult> {
    parse_with(content, file_name, &ImportPolicy::default())
}

pub fn parse_with(
    content: &str,
    file_name: &str,
    policy: &ImportPolicy,
) -> ImportResult<ParseResult> {
    let tokens = tokenize(content, policy.max_file_size)?;

    let mut valid_rows = Vec::with_capacity(tokens.rows.len());
    let mut invalid_rows = Vec::new();
    for raw in &tokens.rows {
        let fields = map_row(&tokens.header_fields, &raw.cells);
        match validate_with(&fields, raw.row_number, policy) {
            Ok(row) => valid_rows.push(row),
            Err(invalid) => {
                debug!(
                    "{file_name}: row {} rejected: {}",
                    invalid.row_number,
                    invalid.errors.join("; ")
                );
                invalid_rows.push(invalid);
            }
        }
    }

    info!(
        "Parsed '{}': {} valid row(s), {} invalid row(s)",
        file_name,
        valid_rows.len(),
        invalid_rows.len()
    );
    Ok(ParseResult {
        valid_rows,
        invalid_rows,
        delimiter: Some(tokens.delimiter),
    })
}

/// Plans inserts and updates for already validated rows with the default
/// policy. The reported input total is the number of rows given.
pub fn plan_merge(
    valid_rows: &[ValidRow],
    existing: &[ExistingRecord],
) -> ImportResult<MergeOutcome> {
    merge::plan(
        valid_rows,
        existing,
        &ImportPolicy::default(),
        valid_rows.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImportError;

    #[test]
    fn parse_splits_valid_and_invalid_rows() {
        let result = parse("name;email\nJohn;john@x.com\n;nobody@x.com\n", "clients.csv").unwrap();
        assert_eq!(result.valid_rows.len(), 1);
        assert_eq!(result.invalid_rows.len(), 1);
        assert_eq!(result.invalid_rows[0].row_number, 3);
        assert_eq!(result.delimiter, Some(Delimiter::Semicolon));
    }

    #[test]
    fn header_only_file_parses_to_nothing() {
        let result = parse("name,email\n", "clients.csv").unwrap();
        assert_eq!(result.total_rows(), 0);
        assert_eq!(
            result.plan_merge(&[], &ImportPolicy::default()),
            Err(ImportError::NoValidRows)
        );
    }

    #[test]
    fn plan_merge_counts_invalid_rows_in_total() {
        let result = parse("name,email\nA,a@x.com\n,b@x.com\nC,\n", "clients.csv").unwrap();
        let outcome = result.plan_merge(&[], &ImportPolicy::default()).unwrap();
        assert_eq!(outcome.total_input, 3);
        assert_eq!(outcome.created, 2);
        assert_eq!(outcome.ignored(), 1);
    }
}
