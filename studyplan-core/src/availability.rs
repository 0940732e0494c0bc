//! Availability resolution: which subjects can be enrolled in right now.
//!
//! Classification reads only the *stored* status of prerequisites, never
//! their derived state, so a single pass over the catalog is enough.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{Catalog, Subject, SubjectId, Term};
use crate::integrity::IntegrityWarning;
use crate::status::{StatusMap, StatusValue};

/// Classification of a subject under a status map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DerivedState {
    Approved,
    InProgress,
    PendingFinal,
    /// Not started, with at least one unsatisfied course prerequisite.
    Blocked,
    /// Not started, every course prerequisite satisfied.
    Available,
}

impl DerivedState {
    /// Everything except `Blocked`.
    #[must_use]
    pub const fn is_available_or_better(self) -> bool {
        !matches!(self, Self::Blocked)
    }
}

/// Derived state for every catalog subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityReport {
    pub states: BTreeMap<SubjectId, DerivedState>,
    #[serde(default)]
    pub warnings: Vec<IntegrityWarning>,
}

impl AvailabilityReport {
    #[must_use]
    pub fn state(&self, id: &str) -> Option<DerivedState> {
        self.states.get(id).copied()
    }

    /// Ids currently `Available`, in id order.
    #[must_use]
    pub fn available(&self) -> Vec<&SubjectId> {
        self.with_state(DerivedState::Available)
    }

    /// Ids currently `Blocked`, in id order.
    #[must_use]
    pub fn blocked(&self) -> Vec<&SubjectId> {
        self.with_state(DerivedState::Blocked)
    }

    #[must_use]
    pub fn count(&self, state: DerivedState) -> usize {
        self.states.values().filter(|s| **s == state).count()
    }

    fn with_state(&self, state: DerivedState) -> Vec<&SubjectId> {
        self.states
            .iter()
            .filter(|(_, s)| **s == state)
            .map(|(id, _)| id)
            .collect()
    }
}

/// Classify every subject in the catalog.
#[must_use]
pub fn resolve(catalog: &Catalog, status: &StatusMap) -> AvailabilityReport {
    let states = catalog
        .iter()
        .map(|subject| (subject.id.clone(), classify(catalog, status, subject)))
        .collect();
    AvailabilityReport {
        states,
        warnings: catalog.warnings().to_vec(),
    }
}

/// Classify a single subject.
#[must_use]
pub fn classify(catalog: &Catalog, status: &StatusMap, subject: &Subject) -> DerivedState {
    match status.get(subject.id.as_str()) {
        StatusValue::Approved => DerivedState::Approved,
        StatusValue::InProgress => DerivedState::InProgress,
        StatusValue::PendingFinal => DerivedState::PendingFinal,
        StatusValue::NotStarted => {
            if course_prerequisites_met(catalog, status, subject) {
                DerivedState::Available
            } else {
                DerivedState::Blocked
            }
        }
    }
}

/// Every course prerequisite is in the catalog and approved or pending final.
#[must_use]
pub fn course_prerequisites_met(catalog: &Catalog, status: &StatusMap, subject: &Subject) -> bool {
    subject
        .course_requirements()
        .all(|id| catalog.contains(id.as_str()) && status.get(id.as_str()).satisfies_course())
}

/// Every exam prerequisite is in the catalog and approved.
#[must_use]
pub fn exam_prerequisites_met(catalog: &Catalog, status: &StatusMap, subject: &Subject) -> bool {
    subject
        .exam_requirements()
        .all(|id| catalog.contains(id.as_str()) && status.get(id.as_str()).satisfies_exam())
}

/// The subject awaits its final and nothing blocks the exam.
#[must_use]
pub fn can_take_final(catalog: &Catalog, status: &StatusMap, subject: &Subject) -> bool {
    status.get(subject.id.as_str()) == StatusValue::PendingFinal
        && exam_prerequisites_met(catalog, status, subject)
}

/// Subjects that can be enrolled in, in catalog order.
#[must_use]
pub fn enrollable<'a>(catalog: &'a Catalog, status: &StatusMap) -> Vec<&'a Subject> {
    catalog
        .iter()
        .filter(|subject| classify(catalog, status, subject) == DerivedState::Available)
        .collect()
}

/// Why a course prerequisite is still unmet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    /// Currently being taken.
    InProgress,
    /// Never enrolled.
    NotStarted,
    /// Not part of the catalog; can never be satisfied.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingPrerequisite {
    pub id: SubjectId,
    pub reason: MissingReason,
}

/// Unmet course prerequisites of `subject`, in declaration order.
#[must_use]
pub fn missing_course_prerequisites(
    catalog: &Catalog,
    status: &StatusMap,
    subject: &Subject,
) -> Vec<MissingPrerequisite> {
    subject
        .course_requirements()
        .filter_map(|id| {
            let reason = if !catalog.contains(id.as_str()) {
                MissingReason::Unknown
            } else {
                match status.get(id.as_str()) {
                    StatusValue::PendingFinal | StatusValue::Approved => return None,
                    StatusValue::InProgress => MissingReason::InProgress,
                    StatusValue::NotStarted => MissingReason::NotStarted,
                }
            };
            Some(MissingPrerequisite {
                id: id.clone(),
                reason,
            })
        })
        .collect()
}

/// Subjects a hypothetical map would open up compared to the real one.
///
/// Only subjects that are not started under `real` and not already available
/// there are returned, in catalog order.
#[must_use]
pub fn newly_available(catalog: &Catalog, real: &StatusMap, hypothetical: &StatusMap) -> Vec<SubjectId> {
    catalog
        .iter()
        .filter(|subject| {
            classify(catalog, real, subject) == DerivedState::Blocked
                && classify(catalog, hypothetical, subject) == DerivedState::Available
        })
        .map(|subject| subject.id.clone())
        .collect()
}

/// The (year, term code) after the furthest slot the student has reached
/// (enrolled or approved).
fn furthest_slot(catalog: &Catalog, status: &StatusMap) -> (u8, u8) {
    catalog
        .iter()
        .filter(|subject| {
            matches!(
                status.get(subject.id.as_str()),
                StatusValue::InProgress | StatusValue::Approved
            )
        })
        .map(|subject| (subject.year, subject.term.code()))
        .max()
        .unwrap_or((0, 0))
}

/// Full-year subjects of the next year count as next because they start in
/// the first term.
fn in_next_slot(subject: &Subject, (year, term_code): (u8, u8)) -> bool {
    (subject.year == year && subject.term.code() > term_code)
        || (u16::from(subject.year) == u16::from(year) + 1
            && matches!(subject.term, Term::FullYear | Term::First))
}

/// Available subjects in the slot right after the furthest one the student
/// has reached.
#[must_use]
pub fn next_in_trajectory(catalog: &Catalog, status: &StatusMap) -> Vec<SubjectId> {
    let slot = furthest_slot(catalog, status);
    enrollable(catalog, status)
        .into_iter()
        .filter(|subject| in_next_slot(subject, slot))
        .map(|subject| subject.id.clone())
        .collect()
}

/// A subject of the next slot that cannot be enrolled in yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedSubject {
    pub id: SubjectId,
    pub missing: Vec<MissingPrerequisite>,
}

/// Blocked subjects in the next slot, each with its unmet course
/// prerequisites, in catalog order.
#[must_use]
pub fn next_blocked_in_trajectory(catalog: &Catalog, status: &StatusMap) -> Vec<BlockedSubject> {
    let slot = furthest_slot(catalog, status);
    catalog
        .iter()
        .filter(|subject| {
            in_next_slot(subject, slot)
                && classify(catalog, status, subject) == DerivedState::Blocked
        })
        .map(|subject| BlockedSubject {
            id: subject.id.clone(),
            missing: missing_course_prerequisites(catalog, status, subject),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Catalog {
        Catalog::new(vec![
            Subject::new("x", 1, Term::First),
            Subject::new("y", 1, Term::Second)
                .with_course_prerequisites(["x"])
                .with_exam_prerequisites(["x"]),
            Subject::new("z", 2, Term::First).with_course_prerequisites(["y", "ghost"]),
        ])
        .unwrap()
    }

    #[test]
    fn stored_progress_is_reported_verbatim() {
        let catalog = chain();
        let status: StatusMap = [
            ("x", StatusValue::Approved),
            ("y", StatusValue::InProgress),
        ]
        .into_iter()
        .collect();
        let report = resolve(&catalog, &status);
        assert_eq!(report.state("x"), Some(DerivedState::Approved));
        assert_eq!(report.state("y"), Some(DerivedState::InProgress));
        assert_eq!(report.state("z"), Some(DerivedState::Blocked));
        assert_eq!(report.state("ghost"), None);
    }

    #[test]
    fn unknown_prerequisite_blocks_and_is_reported() {
        let catalog = chain();
        let status: StatusMap = [("x", StatusValue::Approved), ("y", StatusValue::Approved)]
            .into_iter()
            .collect();
        let report = resolve(&catalog, &status);
        assert_eq!(report.state("z"), Some(DerivedState::Blocked));
        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(
            &report.warnings[0],
            IntegrityWarning::MissingPrerequisite { missing, .. } if missing.as_str() == "ghost"
        ));

        let missing = missing_course_prerequisites(&catalog, &status, catalog.get("z").unwrap());
        assert_eq!(
            missing,
            vec![MissingPrerequisite {
                id: SubjectId::new("ghost"),
                reason: MissingReason::Unknown,
            }]
        );
    }

    #[test]
    fn status_for_unknown_ids_never_satisfies() {
        let catalog = chain();
        let status: StatusMap = [
            ("x", StatusValue::Approved),
            ("y", StatusValue::Approved),
            ("ghost", StatusValue::Approved),
        ]
        .into_iter()
        .collect();
        assert_eq!(resolve(&catalog, &status).state("z"), Some(DerivedState::Blocked));
    }

    #[test]
    fn self_reference_is_ignored() {
        let catalog = Catalog::new(vec![
            Subject::new("solo", 1, Term::First)
                .with_course_prerequisites(["solo"])
                .with_exam_prerequisites(["solo"]),
        ])
        .unwrap();
        let status = StatusMap::new();
        assert_eq!(resolve(&catalog, &status).state("solo"), Some(DerivedState::Available));

        let pending: StatusMap = [("solo", StatusValue::PendingFinal)].into_iter().collect();
        assert!(can_take_final(&catalog, &pending, catalog.get("solo").unwrap()));
    }

    #[test]
    fn missing_prerequisites_are_classified() {
        let catalog = Catalog::new(vec![
            Subject::new("a", 1, Term::First),
            Subject::new("b", 1, Term::First),
            Subject::new("c", 1, Term::First),
            Subject::new("d", 2, Term::First).with_course_prerequisites(["a", "b", "c"]),
        ])
        .unwrap();
        let status: StatusMap = [("a", StatusValue::InProgress), ("b", StatusValue::PendingFinal)]
            .into_iter()
            .collect();
        let missing = missing_course_prerequisites(&catalog, &status, catalog.get("d").unwrap());
        assert_eq!(
            missing,
            vec![
                MissingPrerequisite {
                    id: SubjectId::new("a"),
                    reason: MissingReason::InProgress,
                },
                MissingPrerequisite {
                    id: SubjectId::new("c"),
                    reason: MissingReason::NotStarted,
                },
            ]
        );
    }

    #[test]
    fn what_if_lists_only_newly_opened_subjects() {
        let catalog = chain();
        let real = StatusMap::new();
        let hypothetical: StatusMap = [("x", StatusValue::Approved)].into_iter().collect();
        assert_eq!(newly_available(&catalog, &real, &hypothetical), vec![SubjectId::new("y")]);
        assert!(newly_available(&catalog, &real, &real).is_empty());
    }

    #[test]
    fn next_in_trajectory_follows_furthest_slot() {
        let catalog = Catalog::new(vec![
            Subject::new("a1", 1, Term::First),
            Subject::new("a2", 1, Term::Second),
            Subject::new("b0", 2, Term::FullYear),
            Subject::new("b1", 2, Term::First),
            Subject::new("b2", 2, Term::Second),
            Subject::new("c1", 3, Term::First),
        ])
        .unwrap();

        let fresh = next_in_trajectory(&catalog, &StatusMap::new());
        assert_eq!(fresh, vec![SubjectId::new("a1")]);

        let status: StatusMap = [("a1", StatusValue::Approved), ("a2", StatusValue::InProgress)]
            .into_iter()
            .collect();
        let next = next_in_trajectory(&catalog, &status);
        assert_eq!(next, vec![SubjectId::new("b0"), SubjectId::new("b1")]);
    }

    #[test]
    fn next_blocked_lists_missing_prerequisites() {
        let catalog = Catalog::new(vec![
            Subject::new("a1", 1, Term::First),
            Subject::new("a2", 1, Term::Second),
            Subject::new("b0", 2, Term::FullYear).with_course_prerequisites(["a1", "a2"]),
            Subject::new("b1", 2, Term::First).with_course_prerequisites(["a1"]),
            Subject::new("b2", 2, Term::Second).with_course_prerequisites(["a2"]),
        ])
        .unwrap();
        let status: StatusMap = [("a1", StatusValue::Approved), ("a2", StatusValue::InProgress)]
            .into_iter()
            .collect();

        assert_eq!(next_in_trajectory(&catalog, &status), vec![SubjectId::new("b1")]);
        assert_eq!(
            next_blocked_in_trajectory(&catalog, &status),
            vec![BlockedSubject {
                id: SubjectId::new("b0"),
                missing: vec![MissingPrerequisite {
                    id: SubjectId::new("a2"),
                    reason: MissingReason::InProgress,
                }],
            }]
        );
        assert!(next_blocked_in_trajectory(&catalog, &StatusMap::new()).is_empty());
    }
}
