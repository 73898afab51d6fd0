//! # Data-Change Detection
//!
//! Pure field-by-field comparison of a snapshot's frozen traveler data
//! against the live payload. No side effects; an empty diff is a normal
//! result and triggers nothing by itself — whether a non-empty diff
//! warrants a supersede prompt is the lifecycle layer's call.
//!
//! ## Ordering
//!
//! `changed_fields` follows category declaration order, then field
//! declaration order within the category (snapshot-side order for removed
//! and modified fields, live-side order for added ones). Deterministic by
//! construction, so test assertions can be exact.

use serde::{Deserialize, Serialize};

use arrivo_core::{DataCategory, PayloadField};

/// How a field differs between snapshot and live data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

/// One changed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub category: DataCategory,
    pub field: String,
    pub change_type: ChangeType,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// The full comparison result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDiff {
    pub changed_fields: Vec<FieldChange>,
}

impl DataDiff {
    /// Whether the live data matches the snapshot.
    pub fn is_empty(&self) -> bool {
        self.changed_fields.is_empty()
    }
}

/// Non-empty value of a named field within one category, or `None`.
/// Blank values count as absent, matching the completion calculator.
fn value_of<'a>(fields: &'a [PayloadField], category: DataCategory, name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|f| f.category == category && f.name == name && !f.value.is_empty())
        .map(|f| f.value.as_str())
}

/// Compare snapshot data against live data.
pub fn calculate_diff(snapshot: &[PayloadField], current: &[PayloadField]) -> DataDiff {
    let mut changed_fields = Vec::new();

    for category in DataCategory::ALL {
        // Snapshot-side pass: deletions and modifications, in snapshot order.
        for field in snapshot.iter().filter(|f| f.category == category) {
            let old = if field.value.is_empty() {
                continue;
            } else {
                field.value.as_str()
            };
            match value_of(current, category, &field.name) {
                None => changed_fields.push(FieldChange {
                    category,
                    field: field.name.clone(),
                    change_type: ChangeType::Deleted,
                    old_value: Some(old.to_owned()),
                    new_value: None,
                }),
                Some(new) if new != old => changed_fields.push(FieldChange {
                    category,
                    field: field.name.clone(),
                    change_type: ChangeType::Modified,
                    old_value: Some(old.to_owned()),
                    new_value: Some(new.to_owned()),
                }),
                Some(_) => {}
            }
        }
        // Live-side pass: additions, in live order.
        for field in current.iter().filter(|f| f.category == category) {
            if field.value.is_empty() {
                continue;
            }
            if value_of(snapshot, category, &field.name).is_none() {
                changed_fields.push(FieldChange {
                    category,
                    field: field.name.clone(),
                    change_type: ChangeType::Added,
                    old_value: None,
                    new_value: Some(field.value.clone()),
                });
            }
        }
    }

    DataDiff { changed_fields }
}
