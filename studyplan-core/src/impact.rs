//! Final-exam impact analysis.
//!
//! For every subject awaiting its final, measure how much of the curriculum
//! depends on it and whether the exam can be taken right away.
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Subject, SubjectId};
use crate::integrity::IntegrityWarning;
use crate::status::{StatusMap, StatusValue};

/// Downstream weight of one pending final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalImpact {
    pub id: SubjectId,
    pub name: String,
    pub year: u8,
    /// Not-started subjects listing this one as a course prerequisite.
    pub unlocks_for_course: Vec<SubjectId>,
    /// Pending finals listing this one as an exam prerequisite.
    pub unlocks_for_final: Vec<SubjectId>,
    /// Exam prerequisites that still have to be approved first.
    pub blocked_by: Vec<SubjectId>,
    pub can_be_rendered_now: bool,
    pub total_impact: usize,
}

/// Pending finals ordered by impact (descending), ties by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalImpactReport {
    pub impacts: Vec<FinalImpact>,
    #[serde(default)]
    pub warnings: Vec<IntegrityWarning>,
}

impl FinalImpactReport {
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FinalImpact> {
        self.impacts.iter().find(|impact| impact.id.as_str() == id)
    }

    /// Finals whose exam prerequisites are all approved.
    pub fn renderable_now(&self) -> impl Iterator<Item = &FinalImpact> {
        self.impacts.iter().filter(|impact| impact.can_be_rendered_now)
    }

    /// Finals waiting on other finals.
    pub fn blocked_by_other_finals(&self) -> impl Iterator<Item = &FinalImpact> {
        self.impacts.iter().filter(|impact| !impact.can_be_rendered_now)
    }

    /// Finals that unlock at least one other subject.
    pub fn with_impact(&self) -> impl Iterator<Item = &FinalImpact> {
        self.impacts.iter().filter(|impact| impact.total_impact > 0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.impacts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.impacts.is_empty()
    }
}

/// Analyze every pending final in the catalog.
#[must_use]
pub fn analyze_finals(catalog: &Catalog, status: &StatusMap) -> FinalImpactReport {
    let mut impacts: Vec<FinalImpact> = catalog
        .iter()
        .filter(|subject| status.get(subject.id.as_str()) == StatusValue::PendingFinal)
        .map(|subject| final_impact(catalog, status, subject))
        .collect();
    impacts.sort_by(|a, b| b.total_impact.cmp(&a.total_impact).then_with(|| a.id.cmp(&b.id)));

    FinalImpactReport {
        impacts,
        warnings: catalog.warnings().to_vec(),
    }
}

fn final_impact(catalog: &Catalog, status: &StatusMap, subject: &Subject) -> FinalImpact {
    let unlocks_for_course = course_unlocks(catalog, status, subject.id.as_str())
        .map(|dependent| dependent.id.clone())
        .collect::<Vec<_>>();
    let unlocks_for_final = catalog
        .exam_dependents(subject.id.as_str())
        .filter(|dependent| status.get(dependent.id.as_str()) == StatusValue::PendingFinal)
        .map(|dependent| dependent.id.clone())
        .collect::<Vec<_>>();
    let blocked_by = subject
        .exam_requirements()
        .filter(|id| !(catalog.contains(id.as_str()) && status.get(id.as_str()).satisfies_exam()))
        .cloned()
        .collect::<Vec<_>>();

    FinalImpact {
        id: subject.id.clone(),
        name: subject.name.clone(),
        year: subject.year,
        total_impact: unlocks_for_course.len() + unlocks_for_final.len(),
        can_be_rendered_now: blocked_by.is_empty(),
        unlocks_for_course,
        unlocks_for_final,
        blocked_by,
    }
}

/// Not-started subjects that list `id` as a course prerequisite.
pub(crate) fn course_unlocks<'a>(
    catalog: &'a Catalog,
    status: &'a StatusMap,
    id: &'a str,
) -> impl Iterator<Item = &'a Subject> {
    catalog
        .course_dependents(id)
        .filter(move |dependent| status.get(dependent.id.as_str()) == StatusValue::NotStarted)
}
