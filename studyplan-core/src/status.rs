//! Per-student progress: the status state machine and the status map.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;
use thiserror::Error;

use crate::catalog::{Catalog, SubjectId};

/// Progress of one subject.
///
/// Variants are ordered from least to most complete; the ordering is what
/// "advancing" a subject means.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum StatusValue {
    #[default]
    #[serde(alias = "pending", alias = "not_started")]
    NotStarted,
    #[serde(alias = "in_progress")]
    InProgress,
    #[serde(alias = "pending_final")]
    PendingFinal,
    #[serde(alias = "completed")]
    Approved,
}

impl StatusValue {
    pub const ALL: [Self; 4] = [
        Self::NotStarted,
        Self::InProgress,
        Self::PendingFinal,
        Self::Approved,
    ];

    /// Coursework finished: enough to unlock dependent courses.
    #[must_use]
    pub const fn satisfies_course(self) -> bool {
        matches!(self, Self::PendingFinal | Self::Approved)
    }

    /// Exam passed: the only state that unlocks dependent finals.
    #[must_use]
    pub const fn satisfies_exam(self) -> bool {
        matches!(self, Self::Approved)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::InProgress => "in progress",
            Self::PendingFinal => "pending final",
            Self::Approved => "approved",
        }
    }
}

impl std::fmt::Display for StatusValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors raised by status transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusError {
    #[error("subject `{subject}` cannot move back from {from} to {to}")]
    Regression {
        subject: SubjectId,
        from: StatusValue,
        to: StatusValue,
    },
}

/// Mapping from subject id to status; absent ids are `NotStarted`.
///
/// `NotStarted` is never stored, so two maps describing the same progress
/// compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<SubjectId, StatusValue>",
    into = "BTreeMap<SubjectId, StatusValue>"
)]
pub struct StatusMap(BTreeMap<SubjectId, StatusValue>);

impl StatusMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of `id -> status`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or holds an unknown status.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> StatusValue {
        self.0.get(id).copied().unwrap_or_default()
    }

    /// Overwrite the stored status without transition checks.
    pub fn set(&mut self, id: impl Into<SubjectId>, status: StatusValue) {
        let id = id.into();
        if status == StatusValue::NotStarted {
            self.0.remove(&id);
        } else {
            self.0.insert(id, status);
        }
    }

    /// Move a subject forward along the state machine.
    ///
    /// Advancing to the current status is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StatusError::Regression` when `to` is less complete than the
    /// stored status.
    pub fn advance(&mut self, id: impl Into<SubjectId>, to: StatusValue) -> Result<(), StatusError> {
        let id = id.into();
        let from = self.get(id.as_str());
        if to < from {
            return Err(StatusError::Regression {
                subject: id,
                from,
                to,
            });
        }
        self.set(id, to);
        Ok(())
    }

    /// Move every `InProgress` subject to `PendingFinal`; returns how many moved.
    pub fn complete_coursework(&mut self) -> usize {
        let mut moved = 0;
        for status in self.0.values_mut() {
            if *status == StatusValue::InProgress {
                *status = StatusValue::PendingFinal;
                moved += 1;
            }
        }
        moved
    }

    /// Number of catalog subjects currently holding `status`.
    ///
    /// Entries for ids outside the catalog are ignored.
    #[must_use]
    pub fn count_in(&self, catalog: &Catalog, status: StatusValue) -> usize {
        catalog
            .iter()
            .filter(|subject| self.get(subject.id.as_str()) == status)
            .count()
    }

    /// True when `other` is this map with zero or more subjects advanced.
    #[must_use]
    pub fn is_dominated_by(&self, other: &Self) -> bool {
        self.0.iter().all(|(id, status)| other.get(id.as_str()) >= *status)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, SubjectId, StatusValue> {
        self.0.iter()
    }
}

impl<K: Into<SubjectId>> FromIterator<(K, StatusValue)> for StatusMap {
    fn from_iter<T: IntoIterator<Item = (K, StatusValue)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (id, status) in iter {
            map.set(id, status);
        }
        map
    }
}

impl From<BTreeMap<SubjectId, StatusValue>> for StatusMap {
    fn from(entries: BTreeMap<SubjectId, StatusValue>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<StatusMap> for BTreeMap<SubjectId, StatusValue> {
    fn from(map: StatusMap) -> Self {
        map.0
    }
}

impl<'a> IntoIterator for &'a StatusMap {
    type Item = (&'a SubjectId, &'a StatusValue);
    type IntoIter = btree_map::Iter<'a, SubjectId, StatusValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_ids_default_to_not_started() {
        let map = StatusMap::new();
        assert_eq!(map.get("anything"), StatusValue::NotStarted);
    }

    #[test]
    fn satisfaction_rules() {
        assert!(!StatusValue::NotStarted.satisfies_course());
        assert!(!StatusValue::InProgress.satisfies_course());
        assert!(StatusValue::PendingFinal.satisfies_course());
        assert!(StatusValue::Approved.satisfies_course());
        assert!(!StatusValue::PendingFinal.satisfies_exam());
        assert!(StatusValue::Approved.satisfies_exam());
    }

    #[test]
    fn advance_refuses_regression() {
        let mut map = StatusMap::new();
        map.advance("x", StatusValue::InProgress).unwrap();
        map.advance("x", StatusValue::Approved).unwrap();
        map.advance("x", StatusValue::Approved).unwrap();
        let err = map.advance("x", StatusValue::PendingFinal).unwrap_err();
        assert_eq!(
            err,
            StatusError::Regression {
                subject: SubjectId::new("x"),
                from: StatusValue::Approved,
                to: StatusValue::PendingFinal,
            }
        );
        assert_eq!(map.get("x"), StatusValue::Approved);
    }

    #[test]
    fn complete_coursework_moves_only_in_progress() {
        let mut map: StatusMap = [
            ("a", StatusValue::InProgress),
            ("b", StatusValue::Approved),
            ("c", StatusValue::InProgress),
        ]
        .into_iter()
        .collect();
        assert_eq!(map.complete_coursework(), 2);
        assert_eq!(map.get("a"), StatusValue::PendingFinal);
        assert_eq!(map.get("b"), StatusValue::Approved);
        assert_eq!(map.get("c"), StatusValue::PendingFinal);
    }

    #[test]
    fn parses_boundary_aliases() {
        let map = StatusMap::from_json(
            r#"{"1": "completed", "2": "in_progress", "3": "pendingFinal", "4": "notStarted", "5": "pending"}"#,
        )
        .unwrap();
        assert_eq!(map.get("1"), StatusValue::Approved);
        assert_eq!(map.get("2"), StatusValue::InProgress);
        assert_eq!(map.get("3"), StatusValue::PendingFinal);
        assert_eq!(map.get("4"), StatusValue::NotStarted);
        assert_eq!(map.get("5"), StatusValue::NotStarted);
        assert_eq!(map.len(), 3);
        assert!(StatusMap::from_json(r#"{"1": "dropped"}"#).is_err());
    }

    #[test]
    fn domination_is_coordinate_wise() {
        let base: StatusMap = [("a", StatusValue::InProgress)].into_iter().collect();
        let ahead: StatusMap = [("a", StatusValue::PendingFinal), ("b", StatusValue::InProgress)]
            .into_iter()
            .collect();
        assert!(base.is_dominated_by(&ahead));
        assert!(!ahead.is_dominated_by(&base));
        assert!(StatusMap::new().is_dominated_by(&base));
    }
}
