//! Progress rollups over a catalog and a status map.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{Catalog, DurationClass, Subject, SubjectId, Term};
use crate::constants::TOP_DEPENDED_ON_LIMIT;
use crate::status::{StatusMap, StatusValue};

/// `part / total` as a whole percentage, rounded half up; 0 when `total` is 0.
#[must_use]
pub(crate) fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let rounded = (part * 200 + total) / (2 * total);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// Subject counts per status with rounded percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub total: usize,
    pub approved: usize,
    pub in_progress: usize,
    pub pending_final: usize,
    pub not_started: usize,
    pub approved_percent: u32,
    pub in_progress_percent: u32,
    pub pending_final_percent: u32,
    pub not_started_percent: u32,
}

impl StatusBreakdown {
    fn record(&mut self, status: StatusValue) {
        self.total += 1;
        match status {
            StatusValue::Approved => self.approved += 1,
            StatusValue::InProgress => self.in_progress += 1,
            StatusValue::PendingFinal => self.pending_final += 1,
            StatusValue::NotStarted => self.not_started += 1,
        }
    }

    fn finish(mut self) -> Self {
        self.approved_percent = percent(self.approved, self.total);
        self.in_progress_percent = percent(self.in_progress, self.total);
        self.pending_final_percent = percent(self.pending_final, self.total);
        self.not_started_percent = percent(self.not_started, self.total);
        self
    }

    /// Coursework finished: approved plus pending final.
    #[must_use]
    pub const fn completed(&self) -> usize {
        self.approved + self.pending_final
    }

    #[must_use]
    pub const fn count(&self, status: StatusValue) -> usize {
        match status {
            StatusValue::Approved => self.approved,
            StatusValue::InProgress => self.in_progress,
            StatusValue::PendingFinal => self.pending_final,
            StatusValue::NotStarted => self.not_started,
        }
    }
}

/// Approved share of a group of subjects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub total: usize,
    pub approved: usize,
    pub percent: u32,
}

impl Completion {
    fn of<'a>(subjects: impl Iterator<Item = &'a Subject>, status: &StatusMap) -> Self {
        let (total, approved) = subjects.fold((0, 0), |(total, approved), subject| {
            let done = status.get(subject.id.as_str()) == StatusValue::Approved;
            (total + 1, approved + usize::from(done))
        });
        Self {
            total,
            approved,
            percent: percent(approved, total),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationBreakdown {
    pub annual: Completion,
    pub quarterly: Completion,
}

/// Quarterly subjects split by the term they are taught in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermBreakdown {
    pub first: Completion,
    pub second: Completion,
}

/// Approved and pending-final subjects in one (year, term) slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadEntry {
    pub year: u8,
    pub term: Term,
    pub subjects: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependedOn {
    pub id: SubjectId,
    pub name: String,
    pub dependents: usize,
}

/// Shape of the prerequisite graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerequisiteStructure {
    pub without_course_prerequisites: usize,
    pub with_course_prerequisites: usize,
    pub with_exam_prerequisites: usize,
    /// Most referenced subjects, count descending then id.
    pub most_depended_on: Vec<DependedOn>,
}

/// Pace measured against the number of curriculum years.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pace {
    pub curriculum_years: usize,
    pub average_completed_per_year: f64,
    pub estimated_years_remaining: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsReport {
    pub overall: StatusBreakdown,
    pub by_year: BTreeMap<u8, StatusBreakdown>,
    pub by_duration: DurationBreakdown,
    pub by_term: TermBreakdown,
    pub academic_load: Vec<LoadEntry>,
    pub structure: PrerequisiteStructure,
    pub pace: Pace,
}

/// Compute every rollup in one call.
#[must_use]
pub fn compute_statistics(catalog: &Catalog, status: &StatusMap) -> StatisticsReport {
    let mut overall = StatusBreakdown::default();
    let mut by_year: BTreeMap<u8, StatusBreakdown> = BTreeMap::new();
    for subject in catalog {
        let value = status.get(subject.id.as_str());
        overall.record(value);
        by_year.entry(subject.year).or_default().record(value);
    }
    let overall = overall.finish();
    let by_year = by_year
        .into_iter()
        .map(|(year, breakdown)| (year, breakdown.finish()))
        .collect();

    StatisticsReport {
        overall,
        by_year,
        by_duration: DurationBreakdown {
            annual: Completion::of(
                catalog.iter().filter(|s| s.duration() == DurationClass::Annual),
                status,
            ),
            quarterly: Completion::of(
                catalog.iter().filter(|s| s.duration() == DurationClass::Quarterly),
                status,
            ),
        },
        by_term: TermBreakdown {
            first: Completion::of(catalog.iter().filter(|s| s.term == Term::First), status),
            second: Completion::of(catalog.iter().filter(|s| s.term == Term::Second), status),
        },
        academic_load: academic_load(catalog, status),
        structure: structure(catalog),
        pace: pace(catalog, &overall),
    }
}

fn academic_load(catalog: &Catalog, status: &StatusMap) -> Vec<LoadEntry> {
    let mut slots: BTreeMap<(u8, Term), usize> = BTreeMap::new();
    for subject in catalog {
        if status.get(subject.id.as_str()).satisfies_course() {
            *slots.entry((subject.year, subject.term)).or_default() += 1;
        }
    }
    slots
        .into_iter()
        .map(|((year, term), subjects)| LoadEntry {
            year,
            term,
            subjects,
        })
        .collect()
}

fn structure(catalog: &Catalog) -> PrerequisiteStructure {
    let with_course = catalog
        .iter()
        .filter(|s| s.course_requirements().next().is_some())
        .count();
    let with_exam = catalog
        .iter()
        .filter(|s| s.exam_requirements().next().is_some())
        .count();

    let mut most_depended_on: Vec<DependedOn> = catalog
        .iter()
        .map(|subject| DependedOn {
            id: subject.id.clone(),
            name: subject.name.clone(),
            dependents: catalog.dependents_count(subject.id.as_str()),
        })
        .filter(|entry| entry.dependents > 0)
        .collect();
    most_depended_on.sort_by(|a, b| b.dependents.cmp(&a.dependents).then_with(|| a.id.cmp(&b.id)));
    most_depended_on.truncate(TOP_DEPENDED_ON_LIMIT);

    PrerequisiteStructure {
        without_course_prerequisites: catalog.len() - with_course,
        with_course_prerequisites: with_course,
        with_exam_prerequisites: with_exam,
        most_depended_on,
    }
}

fn pace(catalog: &Catalog, overall: &StatusBreakdown) -> Pace {
    let curriculum_years = catalog.years().len();
    let years = curriculum_years.max(1) as f64;
    let approved_per_year = (overall.approved as f64 / years).max(1.0);
    let remaining = overall.total - overall.approved;
    Pace {
        curriculum_years,
        average_completed_per_year: overall.completed() as f64 / years,
        estimated_years_remaining: (remaining as f64 / approved_per_year).ceil() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Subject::new("am1", 1, Term::FullYear),
            Subject::new("aed", 1, Term::FullYear),
            Subject::new("ing1", 1, Term::First),
            Subject::new("qui", 1, Term::Second),
            Subject::new("am2", 2, Term::FullYear)
                .with_course_prerequisites(["am1"])
                .with_exam_prerequisites(["am1"]),
            Subject::new("pye", 2, Term::First).with_course_prerequisites(["am1"]),
            Subject::new("sin", 2, Term::Second).with_course_prerequisites(["aed", "am1"]),
            Subject::new("ing2", 2, Term::Second).with_course_prerequisites(["ing1"]),
        ])
        .unwrap()
    }

    fn status() -> StatusMap {
        [
            ("am1", StatusValue::Approved),
            ("aed", StatusValue::Approved),
            ("ing1", StatusValue::PendingFinal),
            ("qui", StatusValue::InProgress),
            ("pye", StatusValue::Approved),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn percent_rounds_half_up_and_guards_zero() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(8, 8), 100);
    }

    #[test]
    fn overall_and_yearly_breakdowns() {
        let report = compute_statistics(&catalog(), &status());
        assert_eq!(report.overall.total, 8);
        assert_eq!(report.overall.approved, 3);
        assert_eq!(report.overall.approved_percent, 38);
        assert_eq!(report.overall.not_started, 3);
        assert_eq!(report.overall.completed(), 4);

        let first = report.by_year[&1];
        assert_eq!(first.total, 4);
        assert_eq!(first.approved, 2);
        assert_eq!(first.count(StatusValue::InProgress), 1);
        let second = report.by_year[&2];
        assert_eq!(second.approved, 1);
        assert_eq!(second.not_started_percent, 75);
    }

    #[test]
    fn duration_and_term_splits() {
        let report = compute_statistics(&catalog(), &status());
        assert_eq!(
            report.by_duration.annual,
            Completion {
                total: 3,
                approved: 2,
                percent: 67,
            }
        );
        assert_eq!(report.by_duration.quarterly.total, 5);
        assert_eq!(report.by_duration.quarterly.approved, 1);
        assert_eq!(report.by_term.first.total, 2);
        assert_eq!(report.by_term.first.approved, 1);
        assert_eq!(report.by_term.second.percent, 0);
    }

    #[test]
    fn academic_load_counts_finished_coursework() {
        let report = compute_statistics(&catalog(), &status());
        let slots: Vec<(u8, Term, usize)> = report
            .academic_load
            .iter()
            .map(|e| (e.year, e.term, e.subjects))
            .collect();
        assert_eq!(
            slots,
            vec![(1, Term::FullYear, 2), (1, Term::First, 1), (2, Term::First, 1)]
        );
    }

    #[test]
    fn structure_ranks_depended_on_subjects() {
        let report = compute_statistics(&catalog(), &status());
        let structure = &report.structure;
        assert_eq!(structure.without_course_prerequisites, 4);
        assert_eq!(structure.with_course_prerequisites, 4);
        assert_eq!(structure.with_exam_prerequisites, 1);
        let top: Vec<(&str, usize)> = structure
            .most_depended_on
            .iter()
            .map(|d| (d.id.as_str(), d.dependents))
            .collect();
        assert_eq!(top, vec![("am1", 4), ("aed", 1), ("ing1", 1)]);
    }

    #[test]
    fn pace_uses_curriculum_years() {
        let report = compute_statistics(&catalog(), &status());
        assert_eq!(report.pace.curriculum_years, 2);
        assert!((report.pace.average_completed_per_year - 2.0).abs() < f64::EPSILON);
        // 5 remaining at 1.5 approved per year.
        assert_eq!(report.pace.estimated_years_remaining, 4);
    }

    #[test]
    fn empty_catalog_reports_zeroes() {
        let empty = Catalog::new(Vec::new()).unwrap();
        let report = compute_statistics(&empty, &StatusMap::new());
        assert_eq!(report.overall, StatusBreakdown::default());
        assert!(report.by_year.is_empty());
        assert_eq!(report.by_duration.annual.percent, 0);
        assert_eq!(report.pace.estimated_years_remaining, 0);
    }
}
