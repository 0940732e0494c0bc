//! Data-integrity checks over the prerequisite graph.
//!
//! Problems found here never abort a computation. They are reported as
//! [`IntegrityWarning`] values so callers can surface them while the engine
//! keeps classifying the rest of the catalog.
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

use crate::catalog::{Subject, SubjectId};

/// Which prerequisite list a reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Course,
    Exam,
}

impl std::fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Course => write!(f, "course"),
            Self::Exam => write!(f, "exam"),
        }
    }
}

/// A recoverable problem in the catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityWarning {
    /// The reference is treated as permanently unsatisfied.
    #[error("subject `{subject}` lists unknown {requirement} prerequisite `{missing}`")]
    MissingPrerequisite {
        subject: SubjectId,
        missing: SubjectId,
        requirement: RequirementKind,
    },
    /// The self reference is ignored during classification.
    #[error("subject `{subject}` lists itself as a {requirement} prerequisite")]
    SelfPrerequisite {
        subject: SubjectId,
        requirement: RequirementKind,
    },
    /// Members reach each other through course or exam prerequisites.
    ///
    /// A cycle made only of course prerequisites can never be entered. Mixed
    /// cycles may still be completable, e.g. when an exam prerequisite closes
    /// the loop over a subject that is only needed for enrollment.
    #[error("prerequisite cycle between {}", join_ids(.members))]
    PrerequisiteCycle { members: Vec<SubjectId> },
}

impl IntegrityWarning {
    /// Subject the warning is attached to (first member for cycles).
    #[must_use]
    pub fn subject(&self) -> Option<&SubjectId> {
        match self {
            Self::MissingPrerequisite { subject, .. } | Self::SelfPrerequisite { subject, .. } => {
                Some(subject)
            }
            Self::PrerequisiteCycle { members } => members.first(),
        }
    }
}

fn join_ids(ids: &[SubjectId]) -> String {
    ids.iter()
        .map(SubjectId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub(crate) struct Validation {
    pub warnings: Vec<IntegrityWarning>,
    /// Catalog positions in prerequisite-first order, `None` when cyclic.
    pub order: Option<Vec<usize>>,
}

/// Check references and attempt a topological sort over both prerequisite kinds.
pub(crate) fn validate(subjects: &[Subject], index: &HashMap<SubjectId, usize>) -> Validation {
    let mut warnings = Vec::new();
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); subjects.len()];
    let mut in_degree = vec![0_usize; subjects.len()];

    for (position, subject) in subjects.iter().enumerate() {
        let references = subject
            .course_prerequisites
            .iter()
            .map(|id| (id, RequirementKind::Course))
            .chain(
                subject
                    .exam_prerequisites
                    .iter()
                    .map(|id| (id, RequirementKind::Exam)),
            );
        for (id, requirement) in references {
            if *id == subject.id {
                warnings.push(IntegrityWarning::SelfPrerequisite {
                    subject: subject.id.clone(),
                    requirement,
                });
                continue;
            }
            let Some(&source) = index.get(id) else {
                warnings.push(IntegrityWarning::MissingPrerequisite {
                    subject: subject.id.clone(),
                    missing: id.clone(),
                    requirement,
                });
                continue;
            };
            if !edges[source].contains(&position) {
                edges[source].push(position);
                in_degree[position] += 1;
            }
        }
    }

    let mut remaining = in_degree.clone();
    let mut queue: VecDeque<usize> = (0..subjects.len())
        .filter(|&position| remaining[position] == 0)
        .collect();
    let mut order = Vec::with_capacity(subjects.len());
    while let Some(position) = queue.pop_front() {
        order.push(position);
        for &dependent in &edges[position] {
            remaining[dependent] -= 1;
            if remaining[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    if order.len() == subjects.len() {
        return Validation {
            warnings,
            order: Some(order),
        };
    }

    for members in cycle_groups(subjects, &edges, &remaining) {
        warnings.push(IntegrityWarning::PrerequisiteCycle { members });
    }
    Validation {
        warnings,
        order: None,
    }
}

/// Group the nodes Kahn's algorithm could not order into connected clusters,
/// after peeling off nodes that merely depend on a cycle.
fn cycle_groups(subjects: &[Subject], edges: &[Vec<usize>], remaining: &[usize]) -> Vec<Vec<SubjectId>> {
    let mut stuck: Vec<bool> = remaining.iter().map(|&degree| degree > 0).collect();

    // Peel nodes without stuck dependents until only cycle members remain.
    let mut out_degree: Vec<usize> = edges
        .iter()
        .enumerate()
        .map(|(position, targets)| {
            if stuck[position] {
                targets.iter().filter(|&&t| stuck[t]).count()
            } else {
                0
            }
        })
        .collect();
    let mut sources: Vec<Vec<usize>> = vec![Vec::new(); edges.len()];
    for (position, targets) in edges.iter().enumerate() {
        for &target in targets {
            sources[target].push(position);
        }
    }
    let mut peel: VecDeque<usize> = (0..edges.len())
        .filter(|&position| stuck[position] && out_degree[position] == 0)
        .collect();
    while let Some(position) = peel.pop_front() {
        stuck[position] = false;
        for &source in &sources[position] {
            if stuck[source] {
                out_degree[source] -= 1;
                if out_degree[source] == 0 {
                    peel.push_back(source);
                }
            }
        }
    }

    let mut visited = vec![false; edges.len()];
    let mut groups = Vec::new();
    for start in 0..edges.len() {
        if !stuck[start] || visited[start] {
            continue;
        }
        let mut members = Vec::new();
        let mut frontier = vec![start];
        visited[start] = true;
        while let Some(position) = frontier.pop() {
            members.push(position);
            let neighbours = edges[position].iter().chain(sources[position].iter());
            for &next in neighbours {
                if stuck[next] && !visited[next] {
                    visited[next] = true;
                    frontier.push(next);
                }
            }
        }
        members.sort_unstable();
        groups.push(
            members
                .into_iter()
                .map(|position| subjects[position].id.clone())
                .collect(),
        );
    }
    groups
}
