//! # Traveler Payload
//!
//! The submission-ready value object handed to the protocol client. The
//! payload is assembled and validated by external form/profile layers; the
//! core treats field values as opaque strings keyed by category and name,
//! plus the `(user, destination)` key that scopes every record downstream.
//!
//! ## Field ordering
//!
//! Fields are stored in declaration order: categories in [`DataCategory`]
//! order, fields in the order the builder added them. The data-change
//! detector iterates this order, which makes diff output deterministic.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{DestinationId, UserId};

/// The traveler-data categories tracked by the completion calculator and
/// the data-change detector. Declaration order here is canonical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataCategory {
    /// Passport and personal identity fields.
    Identity,
    /// Flight and travel-date fields.
    Itinerary,
    /// Accommodation address fields.
    Accommodation,
    /// Declared funds and fund-proof photo references.
    Funds,
}

impl DataCategory {
    /// All categories, in canonical declaration order.
    pub const ALL: [DataCategory; 4] = [
        DataCategory::Identity,
        DataCategory::Itinerary,
        DataCategory::Accommodation,
        DataCategory::Funds,
    ];

    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Itinerary => "itinerary",
            Self::Accommodation => "accommodation",
            Self::Funds => "funds",
        }
    }
}

impl std::fmt::Display for DataCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named field within a payload category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadField {
    /// Category the field belongs to.
    pub category: DataCategory,
    /// Field name as the destination backend knows it (camelCase).
    pub name: String,
    /// Opaque field value. Empty string means "not filled".
    pub value: String,
}

/// Fields the destination backend requires before step 1 may fire.
/// Missing any of these fails the attempt with zero network steps run.
const BACKEND_REQUIRED: &[(&str, DataCategory)] = &[
    ("fullName", DataCategory::Identity),
    ("passportNo", DataCategory::Identity),
    ("nationality", DataCategory::Identity),
    ("arrivalDate", DataCategory::Itinerary),
    ("departureCountry", DataCategory::Itinerary),
    ("accommodationAddress", DataCategory::Accommodation),
];

/// The submission-ready traveler payload for one `(user, destination)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerPayload {
    /// Owning traveler.
    pub user_id: UserId,
    /// Destination whose backend this payload targets.
    pub destination_id: DestinationId,
    /// Ordered fields: category declaration order, then insertion order.
    fields: Vec<PayloadField>,
}

impl TravelerPayload {
    /// Create an empty payload for a `(user, destination)` pair.
    pub fn new(user_id: UserId, destination_id: DestinationId) -> Self {
        Self {
            user_id,
            destination_id,
            fields: Vec::new(),
        }
    }

    /// Add or replace a field, preserving category-then-insertion order.
    pub fn set_field(
        &mut self,
        category: DataCategory,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self
            .fields
            .iter_mut()
            .find(|f| f.category == category && f.name == name)
        {
            existing.value = value;
            return;
        }
        // Insert before the first field of a later category.
        let pos = self
            .fields
            .iter()
            .position(|f| f.category > category)
            .unwrap_or(self.fields.len());
        self.fields.insert(
            pos,
            PayloadField {
                category,
                name,
                value,
            },
        );
    }

    /// Builder-style [`set_field`](Self::set_field).
    pub fn with_field(
        mut self,
        category: DataCategory,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.set_field(category, name, value);
        self
    }

    /// Look up a field value. Empty values count as absent.
    pub fn field(&self, category: DataCategory, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.category == category && f.name == name && !f.value.is_empty())
            .map(|f| f.value.as_str())
    }

    /// All fields in canonical order.
    pub fn fields(&self) -> &[PayloadField] {
        &self.fields
    }

    /// Fields belonging to one category, in insertion order.
    pub fn fields_in(&self, category: DataCategory) -> impl Iterator<Item = &PayloadField> {
        self.fields.iter().filter(move |f| f.category == category)
    }

    /// Check the backend-required field set.
    ///
    /// This is the pre-flight gate the protocol client runs before step 1;
    /// a failure here means no network traffic happened.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, category) in BACKEND_REQUIRED {
            if self.field(*category, name).is_none() {
                return Err(ValidationError::MissingField(name));
            }
        }
        Ok(())
    }
}

/// Per-category filled/required counts, produced by the external
/// completion calculator and consumed here to gate readiness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionMetrics {
    /// `(category, filled, required)` in canonical category order.
    pub categories: Vec<(DataCategory, u32, u32)>,
}

impl CompletionMetrics {
    /// Whether every category has all required fields filled.
    pub fn is_complete(&self) -> bool {
        self.categories
            .iter()
            .all(|(_, filled, required)| filled >= required)
    }

    /// Metrics claiming every category is complete. Test convenience.
    pub fn complete() -> Self {
        Self {
            categories: DataCategory::ALL.iter().map(|c| (*c, 1, 1)).collect(),
        }
    }
}
