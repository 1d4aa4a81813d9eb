//! Matrix & concept store: the two ordered, independently editable
//! collections behind a plan's `content_matrix` and `concepts`.
//!
//! Ids are minted from monotonic counters owned by the store, never from the
//! current collection length, so remove/append sequences cannot collide.
//! Edits replace a whole element instead of mutating it in place.
//! No referential integrity is enforced between the collections: removing a
//! row leaves any concept pointing at it untouched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix for minted matrix row ids.
pub const ROW_ID_PREFIX: &str = "row-";
/// Prefix for minted concept ids.
pub const CONCEPT_ID_PREFIX: &str = "concept-";

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// One audience x stage x channel x message combination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixRow {
    pub id: String,
    #[serde(default)]
    pub audience_segment: String,
    #[serde(default)]
    pub funnel_stage: String,
    #[serde(default)]
    pub trigger: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub variant: String,
}

impl MatrixRow {
    /// An empty row with the given id.
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Return a copy of this row with exactly one field replaced.
    pub fn with_field(&self, field: MatrixField, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        let value = value.into();
        match field {
            MatrixField::AudienceSegment => next.audience_segment = value,
            MatrixField::FunnelStage => next.funnel_stage = value,
            MatrixField::Trigger => next.trigger = value,
            MatrixField::Channel => next.channel = value,
            MatrixField::Format => next.format = value,
            MatrixField::Message => next.message = value,
            MatrixField::Variant => next.variant = value,
        }
        next
    }
}

/// A creative idea softly linked to a matrix row through `asset_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub id: String,
    #[serde(default)]
    pub asset_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
}

impl Concept {
    /// Return a copy of this concept with exactly one field replaced.
    pub fn with_field(&self, field: ConceptField, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        let value = value.into();
        match field {
            ConceptField::AssetId => next.asset_id = value,
            ConceptField::Title => next.title = value,
            ConceptField::Description => next.description = value,
            ConceptField::Notes => next.notes = value,
        }
        next
    }
}

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

/// Editable text field of a [`MatrixRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixField {
    AudienceSegment,
    FunnelStage,
    Trigger,
    Channel,
    Format,
    Message,
    Variant,
}

impl MatrixField {
    pub const ALL: [MatrixField; 7] = [
        Self::AudienceSegment,
        Self::FunnelStage,
        Self::Trigger,
        Self::Channel,
        Self::Format,
        Self::Message,
        Self::Variant,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AudienceSegment => "audience_segment",
            Self::FunnelStage => "funnel_stage",
            Self::Trigger => "trigger",
            Self::Channel => "channel",
            Self::Format => "format",
            Self::Message => "message",
            Self::Variant => "variant",
        }
    }
}

impl fmt::Display for MatrixField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatrixField {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| StoreError::UnknownField(s.to_owned()))
    }
}

/// Editable text field of a [`Concept`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConceptField {
    AssetId,
    Title,
    Description,
    Notes,
}

impl ConceptField {
    pub const ALL: [ConceptField; 4] = [Self::AssetId, Self::Title, Self::Description, Self::Notes];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AssetId => "asset_id",
            Self::Title => "title",
            Self::Description => "description",
            Self::Notes => "notes",
        }
    }
}

impl fmt::Display for ConceptField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConceptField {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| StoreError::UnknownField(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no matrix row at index {index} (store has {len})")]
    RowIndexOutOfRange { index: usize, len: usize },

    #[error("no concept at index {index} (store has {len})")]
    ConceptIndexOutOfRange { index: usize, len: usize },

    #[error("no matrix row with id {0:?}")]
    UnknownRow(String),

    #[error("no concept with id {0:?}")]
    UnknownConcept(String),

    #[error("unknown field {0:?}")]
    UnknownField(String),
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Read-only copy of both collections, taken for export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub rows: Vec<MatrixRow>,
    pub concepts: Vec<Concept>,
}

/// Owner of the matrix rows, the concepts, and their id counters.
#[derive(Debug, Clone)]
pub struct ContentStore {
    rows: Vec<MatrixRow>,
    concepts: Vec<Concept>,
    next_row: u64,
    next_concept: u64,
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            concepts: Vec::new(),
            next_row: 1,
            next_concept: 1,
        }
    }

    /// Build a store from existing collections.
    ///
    /// Counters start past the highest numeric suffix of any id carrying a
    /// minted prefix (including concept `asset_id` placeholders), so ids
    /// minted afterwards stay unique.
    pub fn from_parts(rows: Vec<MatrixRow>, concepts: Vec<Concept>) -> Self {
        let row_ids = rows
            .iter()
            .map(|r| r.id.as_str())
            .chain(concepts.iter().map(|c| c.asset_id.as_str()));
        let next_row = max_suffix(row_ids, ROW_ID_PREFIX) + 1;
        let next_concept = max_suffix(concepts.iter().map(|c| c.id.as_str()), CONCEPT_ID_PREFIX) + 1;
        Self {
            rows,
            concepts,
            next_row,
            next_concept,
        }
    }

    pub fn rows(&self) -> &[MatrixRow] {
        &self.rows
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            rows: self.rows.clone(),
            concepts: self.concepts.clone(),
        }
    }

    fn mint_row_id(&mut self) -> String {
        let id = format!("{ROW_ID_PREFIX}{}", self.next_row);
        self.next_row += 1;
        id
    }

    fn mint_concept_id(&mut self) -> String {
        let id = format!("{CONCEPT_ID_PREFIX}{}", self.next_concept);
        self.next_concept += 1;
        id
    }

    // -- matrix rows --------------------------------------------------------

    /// Append an empty row and return its id.
    pub fn add_row(&mut self) -> String {
        let id = self.mint_row_id();
        self.rows.push(MatrixRow::empty(id.clone()));
        id
    }

    /// Replace one field of the row at `index`.
    pub fn update_cell(
        &mut self,
        index: usize,
        field: MatrixField,
        value: impl Into<String>,
    ) -> Result<(), StoreError> {
        let len = self.rows.len();
        let current = self
            .rows
            .get(index)
            .ok_or(StoreError::RowIndexOutOfRange { index, len })?;
        let replacement = current.with_field(field, value);
        self.rows[index] = replacement;
        Ok(())
    }

    /// Remove the row at `index`. Concepts referencing it are left dangling.
    pub fn remove_row(&mut self, index: usize) -> Result<MatrixRow, StoreError> {
        if index >= self.rows.len() {
            return Err(StoreError::RowIndexOutOfRange {
                index,
                len: self.rows.len(),
            });
        }
        Ok(self.rows.remove(index))
    }

    /// Remove the row with the given id.
    pub fn remove_row_by_id(&mut self, id: &str) -> Result<MatrixRow, StoreError> {
        let index = self
            .row_index(id)
            .ok_or_else(|| StoreError::UnknownRow(id.to_owned()))?;
        Ok(self.rows.remove(index))
    }

    pub fn row_index(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.id == id)
    }

    // -- concepts -----------------------------------------------------------

    /// Append a concept and return its id.
    ///
    /// `asset_id` defaults to the first row's id, or to a freshly minted
    /// placeholder when the matrix is empty.
    pub fn add_concept(&mut self) -> String {
        let asset_id = match self.rows.first() {
            Some(row) => row.id.clone(),
            None => self.mint_row_id(),
        };
        let id = self.mint_concept_id();
        self.concepts.push(Concept {
            id: id.clone(),
            asset_id,
            ..Concept::default()
        });
        id
    }

    /// Replace one field of the concept at `index`.
    pub fn update_concept_field(
        &mut self,
        index: usize,
        field: ConceptField,
        value: impl Into<String>,
    ) -> Result<(), StoreError> {
        let len = self.concepts.len();
        let current = self
            .concepts
            .get(index)
            .ok_or(StoreError::ConceptIndexOutOfRange { index, len })?;
        let replacement = current.with_field(field, value);
        self.concepts[index] = replacement;
        Ok(())
    }

    pub fn remove_concept(&mut self, index: usize) -> Result<Concept, StoreError> {
        if index >= self.concepts.len() {
            return Err(StoreError::ConceptIndexOutOfRange {
                index,
                len: self.concepts.len(),
            });
        }
        Ok(self.concepts.remove(index))
    }

    pub fn remove_concept_by_id(&mut self, id: &str) -> Result<Concept, StoreError> {
        let index = self
            .concept_index(id)
            .ok_or_else(|| StoreError::UnknownConcept(id.to_owned()))?;
        Ok(self.concepts.remove(index))
    }

    pub fn concept_index(&self, id: &str) -> Option<usize> {
        self.concepts.iter().position(|c| c.id == id)
    }
}

/// Highest `N` among ids of the form `<prefix>N`, or 0.
fn max_suffix<'a>(ids: impl Iterator<Item = &'a str>, prefix: &str) -> u64 {
    ids.filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|n| n.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}
