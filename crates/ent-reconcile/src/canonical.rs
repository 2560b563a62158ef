use std::collections::BTreeMap;

use crate::{LearnerGroup, Record, RecordError, UserKey, Value};

/// Canonical key for a raw learner id from either store.
///
/// Textual conversion, so the LMS integer `42` and the warehouse string `"42"`
/// land on the same key.
pub fn canonicalize(raw: &Value) -> UserKey {
    UserKey::new(raw.to_string())
}

/// Group a flat record sequence by the learner id found in `key_column`.
///
/// Duplicates are kept and groups preserve input order. A record whose key
/// column is missing or null cannot be joined and fails the whole grouping.
pub fn group_by_user(
    records: impl IntoIterator<Item = Record>,
    key_column: &str,
) -> Result<LearnerGroup, RecordError> {
    let mut groups: BTreeMap<UserKey, Vec<Record>> = BTreeMap::new();
    for record in records {
        let key = canonicalize(record.require(key_column)?);
        groups.entry(key).or_default().push(record);
    }
    Ok(LearnerGroup::from_map(groups))
}
