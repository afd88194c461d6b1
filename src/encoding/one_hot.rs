//! Static one-hot expansion over the closed vocabularies.

use crate::vocabulary::CategoryField;

/// How a categorical value related to its vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryMatch {
    Matched,
    /// Value outside the vocabulary; no indicator was set.
    Unknown(String),
    /// No value supplied; no indicator was set.
    Absent,
}

/// Expand `value` into the full indicator set of `field`.
///
/// Every indicator starts at 0; at most one is set to 1.
pub fn expand(field: CategoryField, value: Option<&str>) -> (Vec<(String, f64)>, CategoryMatch) {
    let mut matched = false;
    let columns = field
        .vocabulary()
        .iter()
        .map(|candidate| {
            let hit = value == Some(*candidate);
            matched |= hit;
            (field.indicator_column(candidate), if hit { 1.0 } else { 0.0 })
        })
        .collect();

    let outcome = match value {
        None => CategoryMatch::Absent,
        Some(_) if matched => CategoryMatch::Matched,
        Some(other) => CategoryMatch::Unknown(other.to_string()),
    };

    (columns, outcome)
}
