// libs/worklist-cell/src/store.rs
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::WorklistError;
use crate::models::AppointmentRow;

/// Stable row identifier assigned on insert. Never derived from position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey(pub u64);

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable snapshot of the day's rows.
///
/// Commands return a new snapshot and leave `self` untouched, so a caller
/// whose network call fails simply keeps the snapshot it already has. Rows
/// are shared between snapshots and copied only when changed.
#[derive(Debug, Clone, Default)]
pub struct RowStore {
    rows: BTreeMap<RowKey, Arc<AppointmentRow>>,
    next_key: u64,
}

impl RowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = AppointmentRow>,
    {
        rows.into_iter().fold(Self::new(), |store, row| store.inserted(row).0)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: RowKey) -> Option<&AppointmentRow> {
        self.rows.get(&key).map(|row| row.as_ref())
    }

    pub fn require(&self, key: RowKey) -> Result<&AppointmentRow, WorklistError> {
        self.get(key).ok_or(WorklistError::UnknownRow(key.0))
    }

    /// Rows in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (RowKey, &AppointmentRow)> {
        self.rows.iter().map(|(key, row)| (*key, row.as_ref()))
    }

    pub fn rows(&self) -> Vec<AppointmentRow> {
        self.rows.values().map(|row| row.as_ref().clone()).collect()
    }

    pub fn keys_for_patient<'a>(&'a self, patient_id: &'a str) -> impl Iterator<Item = RowKey> + 'a {
        self.iter()
            .filter(move |(_, row)| row.patient_id == patient_id)
            .map(|(key, _)| key)
    }

    pub fn find_visit(&self, patient_id: &str, visit_number: u32) -> Option<RowKey> {
        self.iter()
            .find(|(_, row)| row.patient_id == patient_id && row.visit_number == visit_number)
            .map(|(key, _)| key)
    }

    pub fn inserted(&self, row: AppointmentRow) -> (RowStore, RowKey) {
        let key = RowKey(self.next_key);
        let mut next = self.clone();
        next.rows.insert(key, Arc::new(row));
        next.next_key += 1;
        (next, key)
    }

    pub fn updated<F>(&self, key: RowKey, change: F) -> Result<RowStore, WorklistError>
    where
        F: FnOnce(&mut AppointmentRow),
    {
        let current = self.require(key)?;
        let mut row = current.clone();
        change(&mut row);

        let mut next = self.clone();
        next.rows.insert(key, Arc::new(row));
        Ok(next)
    }

    pub fn removed(&self, key: RowKey) -> Result<RowStore, WorklistError> {
        self.require(key)?;
        let mut next = self.clone();
        next.rows.remove(&key);
        Ok(next)
    }
}
