//! Duplicate-aware insert/update planning.
//!
//! Validated rows are folded in input order over a working set of known
//! identities. The set starts with the caller's existing records and grows
//! with every planned insert, so a repeat inside the same upload turns into
//! an update of the earlier row instead of a second insert.
//!
//! Identity is the lower-cased name plus the lower-cased email. Two records
//! match when names are equal and either both emails are equal or both are
//! absent; a name match where only one side has an email is not a duplicate.

use std::collections::{HashMap, hash_map::Entry};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    config::ImportPolicy,
    error::{ImportError, ImportResult},
    validate::{ClientStatus, ValidRow},
};

/// Caller-owned identifier of a stored client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Projection of a stored client needed for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingRecord {
    pub id: RecordId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ExistingRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: Option<&str>) -> Self {
        Self {
            id: RecordId::new(id),
            name: name.into(),
            email: email.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IdentityKey {
    name: String,
    email: Option<String>,
}

impl IdentityKey {
    fn new(name: &str, email: Option<&str>) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            email: email
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_lowercase),
        }
    }
}

/// Client fields ready to persist. Status is always resolved and tags and
/// contact fields replace whatever the stored record held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub status: ClientStatus,
    pub tags: Vec<String>,
}

impl ClientDraft {
    fn from_row(row: &ValidRow, default_status: ClientStatus) -> Self {
        Self {
            name: row.name().to_string(),
            company: row.company().map(str::to_string),
            email: row.email().map(str::to_string),
            phone: row.phone().map(str::to_string),
            status: row.status().unwrap_or(default_status),
            tags: row.tags().to_vec(),
        }
    }
}

/// Record an update applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "ref")]
pub enum MergeTarget {
    /// A record the caller already stores.
    Existing(RecordId),
    /// Position in [`MergeOutcome::inserts`] of a record created earlier in
    /// the same batch.
    Pending(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedUpdate {
    pub target: MergeTarget,
    pub client: ClientDraft,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub created: usize,
    pub updated: usize,
    /// Updates whose target existed before this import.
    pub duplicates_skipped: usize,
    /// Rows submitted to the import, valid and invalid.
    pub total_input: usize,
    pub inserts: Vec<ClientDraft>,
    pub updates: Vec<PlannedUpdate>,
}

impl MergeOutcome {
    /// Rows that were neither created nor updated.
    pub fn ignored(&self) -> usize {
        self.total_input
            .saturating_sub(self.created + self.updated)
    }
}

/// Working state of the fold over incoming rows.
#[derive(Debug)]
pub struct MergePlanner {
    known: HashMap<IdentityKey, MergeTarget>,
    default_status: ClientStatus,
    outcome: MergeOutcome,
}

impl MergePlanner {
    /// Seeds the identity set. When several existing records share a key,
    /// the first one listed is the update target.
    pub fn new(existing: &[ExistingRecord], policy: &ImportPolicy) -> Self {
        let mut known = HashMap::with_capacity(existing.len());
        for record in existing {
            let key = IdentityKey::new(&record.name, record.email.as_deref());
            if let Entry::Vacant(slot) = known.entry(key) {
                slot.insert(MergeTarget::Existing(record.id.clone()));
            }
        }
        Self {
            known,
            default_status: policy.default_status,
            outcome: MergeOutcome::default(),
        }
    }

    pub fn push(&mut self, row: &ValidRow) {
        let key = IdentityKey::new(row.name(), row.email());
        let client = ClientDraft::from_row(row, self.default_status);
        match self.known.get(&key) {
            Some(target) => {
                if matches!(target, MergeTarget::Existing(_)) {
                    self.outcome.duplicates_skipped += 1;
                }
                debug!("'{}' matches {:?}; planning update", client.name, target);
                self.outcome.updates.push(PlannedUpdate {
                    target: target.clone(),
                    client,
                });
                self.outcome.updated += 1;
            }
            None => {
                let position = self.outcome.inserts.len();
                self.known.insert(key, MergeTarget::Pending(position));
                self.outcome.inserts.push(client);
                self.outcome.created += 1;
            }
        }
    }

    pub fn finish(mut self, total_input: usize) -> MergeOutcome {
        self.outcome.total_input = total_input;
        self.outcome
    }
}

/// Plans inserts and updates for `rows` against `existing`.
///
/// `total_input` is the number of rows the upload contained before
/// validation; it is only reported back.
pub fn plan(
    rows: &[ValidRow],
    existing: &[ExistingRecord],
    policy: &ImportPolicy,
    total_input: usize,
) -> ImportResult<MergeOutcome> {
    if rows.is_empty() {
        return Err(ImportError::NoValidRows);
    }
    let mut planner = MergePlanner::new(existing, policy);
    for row in rows {
        planner.push(row);
    }
    let outcome = planner.finish(total_input.max(rows.len()));
    info!(
        "Planned {} insert(s) and {} update(s) ({} duplicate(s) of stored clients) from {} row(s)",
        outcome.created, outcome.updated, outcome.duplicates_skipped, outcome.total_input
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, email: Option<&str>) -> ValidRow {
        let row = ValidRow::new(name).unwrap();
        match email {
            Some(email) => row.with_email(email),
            None => row,
        }
    }

    fn existing() -> Vec<ExistingRecord> {
        vec![ExistingRecord::new("c1", "John Doe", Some("john@x.com"))]
    }

    #[test]
    fn same_name_and_email_is_an_update() {
        let outcome = plan(
            &[row("john doe", Some("JOHN@X.COM"))],
            &existing(),
            &ImportPolicy::default(),
            1,
        )
        .unwrap();
        assert_eq!((outcome.created, outcome.updated), (0, 1));
        assert_eq!(outcome.duplicates_skipped, 1);
        assert_eq!(
            outcome.updates[0].target,
            MergeTarget::Existing(RecordId::new("c1"))
        );
    }

    #[test]
    fn email_on_one_side_only_is_not_a_duplicate() {
        let outcome = plan(&[row("John Doe", None)], &existing(), &ImportPolicy::default(), 1)
            .unwrap();
        assert_eq!((outcome.created, outcome.updated), (1, 0));

        let stored = vec![ExistingRecord::new("c2", "Jane", None)];
        let outcome = plan(
            &[row("Jane", Some("jane@x.com"))],
            &stored,
            &ImportPolicy::default(),
            1,
        )
        .unwrap();
        assert_eq!((outcome.created, outcome.updated), (1, 0));
    }

    #[test]
    fn missing_email_on_both_sides_matches() {
        let stored = vec![ExistingRecord::new("c2", "Jane", Some(""))];
        let outcome = plan(&[row("JANE", None)], &stored, &ImportPolicy::default(), 1).unwrap();
        assert_eq!(outcome.updated, 1);
    }

    #[test]
    fn repeats_within_a_batch_update_the_pending_insert() {
        let rows = [
            row("Ann", Some("ann@x.com")),
            row("Ann", Some("ann@x.com")),
        ];
        let outcome = plan(&rows, &[], &ImportPolicy::default(), 2).unwrap();
        assert_eq!((outcome.created, outcome.updated), (1, 1));
        assert_eq!(outcome.duplicates_skipped, 0);
        assert_eq!(outcome.updates[0].target, MergeTarget::Pending(0));
    }

    #[test]
    fn status_defaults_from_policy_unless_provided() {
        let policy = ImportPolicy {
            default_status: ClientStatus::Active,
            ..ImportPolicy::default()
        };
        let rows = [
            row("A", None),
            row("B", None).with_status(ClientStatus::Archived),
        ];
        let outcome = plan(&rows, &[], &policy, 2).unwrap();
        assert_eq!(outcome.inserts[0].status, ClientStatus::Active);
        assert_eq!(outcome.inserts[1].status, ClientStatus::Archived);
    }

    #[test]
    fn first_of_several_matching_records_is_targeted() {
        let stored = vec![
            ExistingRecord::new("c1", "Sam", None),
            ExistingRecord::new("c2", "sam", None),
        ];
        let outcome = plan(&[row("Sam", None)], &stored, &ImportPolicy::default(), 1).unwrap();
        assert_eq!(
            outcome.updates[0].target,
            MergeTarget::Existing(RecordId::new("c1"))
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(
            plan(&[], &existing(), &ImportPolicy::default(), 3),
            Err(ImportError::NoValidRows)
        );
    }

    #[test]
    fn ignored_counts_rows_that_were_not_written() {
        let outcome = plan(&[row("A", None)], &[], &ImportPolicy::default(), 4).unwrap();
        assert_eq!(outcome.total_input, 4);
        assert_eq!(outcome.ignored(), 3);
    }
}
