//! Newline-delimited JSON records and identity matching.
//!
//! Saved-object exports are NDJSON: one object per line, each carrying an
//! `id`. Two exports are compared record by record after pairing records
//! that share an identity, so a reordered export still matches.

use std::collections::HashSet;

use crate::document::{normalize, Document, Exclusions};
use crate::error::DiffError;

/// The identity field of saved-object records.
pub const DEFAULT_IDENTITY_KEY: &str = "id";

/// Split NDJSON text into its non-blank lines.
pub fn split_records(raw: &str) -> Vec<&str> {
    raw.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Split NDJSON text and normalize every line.
pub fn parse_records(raw: &str, exclusions: &Exclusions) -> Result<Vec<Document>, DiffError> {
    split_records(raw)
        .into_iter()
        .map(|line| normalize(line, exclusions))
        .collect()
}

/// Pair every old record with the new record of the same identity.
///
/// Both sequences must have the same length, every record must be an
/// object with a string identity, and identities must be unique within each
/// sequence. Pairs are returned in old-sequence order.
pub fn match_records<'a>(
    old: &'a [Document],
    new: &'a [Document],
    identity_key: &str,
) -> Result<Vec<(&'a Document, &'a Document)>, DiffError> {
    if old.len() != new.len() {
        return Err(DiffError::Cardinality {
            old: old.len(),
            new: new.len(),
        });
    }

    let old_ids = identities(old, identity_key)?;
    let new_ids = identities(new, identity_key)?;

    old_ids
        .iter()
        .zip(old)
        .map(|(id, old_record)| {
            new_ids
                .iter()
                .position(|candidate| candidate == id)
                .map(|j| (old_record, &new[j]))
                .ok_or_else(|| DiffError::UnmatchedIdentity { id: id.to_string() })
        })
        .collect()
}

fn identities<'a>(records: &'a [Document], identity_key: &str) -> Result<Vec<&'a str>, DiffError> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let id = record
                .get(identity_key)
                .and_then(Document::as_str)
                .ok_or_else(|| DiffError::MissingIdentity {
                    key: identity_key.to_string(),
                    index,
                })?;
            if !seen.insert(id) {
                return Err(DiffError::DuplicateIdentity { id: id.to_string() });
            }
            Ok(id)
        })
        .collect()
}
