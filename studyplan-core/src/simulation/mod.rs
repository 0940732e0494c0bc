//! Semester-by-semester progression simulation.
//!
//! Each simulated semester sits finals and enrolls in courses according to a
//! strategy, then closes the term by moving every in-progress subject to
//! pending final. The caller's status map is never touched.
mod config;
mod strategy;

pub use config::{SimulationConfig, StrategyCaps};
pub use strategy::{AdvancementPolicy, FinalCandidate, SemesterPlan, StrategyId};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::availability::{can_take_final, enrollable};
use crate::catalog::{Catalog, SubjectId};
use crate::constants::{DEFAULT_HORIZON_SEMESTERS, LOG_TARGET_SIMULATION};
use crate::impact::course_unlocks;
use crate::integrity::IntegrityWarning;
use crate::stats::percent;
use crate::status::{StatusMap, StatusValue};

/// Errors raised before a simulation starts.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("unknown strategy `{0}` (expected finals-first, courses-first or balanced)")]
    UnknownStrategy(String),
    #[error("horizon must not be negative (got {0})")]
    NegativeHorizon(i64),
    #[error("horizon of {horizon} semesters exceeds the maximum of {max}")]
    HorizonTooLarge { horizon: i64, max: u32 },
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: u32,
        value: u32,
    },
    #[error("strategy {0} is capped to zero finals and zero enrollments")]
    StalledStrategy(StrategyId),
    #[error("invalid simulation config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which strategy to run and for how many semesters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    pub strategy: StrategyId,
    #[serde(alias = "horizon")]
    pub horizon_semesters: u32,
}

impl SimulationRequest {
    #[must_use]
    pub const fn new(strategy: StrategyId, horizon_semesters: u32) -> Self {
        Self {
            strategy,
            horizon_semesters,
        }
    }

    /// Build a request from loosely typed input.
    ///
    /// # Errors
    ///
    /// Returns `SimulationError::UnknownStrategy` or
    /// `SimulationError::NegativeHorizon` for invalid input.
    pub fn parse(strategy: &str, horizon: i64) -> Result<Self, SimulationError> {
        let strategy = strategy.parse::<StrategyId>()?;
        if horizon < 0 {
            return Err(SimulationError::NegativeHorizon(horizon));
        }
        let horizon_semesters =
            u32::try_from(horizon).map_err(|_| SimulationError::HorizonTooLarge {
                horizon,
                max: u32::MAX,
            })?;
        Ok(Self::new(strategy, horizon_semesters))
    }
}

impl Default for SimulationRequest {
    fn default() -> Self {
        Self::new(StrategyId::Balanced, DEFAULT_HORIZON_SEMESTERS)
    }
}

/// State at the end of one simulated semester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterSnapshot {
    pub semester: u32,
    pub approved: usize,
    pub pending_final: usize,
    /// Subjects open for enrollment when the semester started.
    pub available: usize,
    /// Subjects that became enrollable during the semester.
    pub newly_available: Vec<SubjectId>,
    pub finals_approved: Vec<SubjectId>,
    pub enrolled: Vec<SubjectId>,
    pub progress: u32,
}

/// Projected time to finish the curriculum at the simulated pace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraduationEstimate {
    AlreadyComplete,
    /// No approvals happened, so the pace is zero.
    Indeterminate,
    Remaining {
        semesters: u64,
        years: u64,
        extra_semesters: u64,
    },
}

impl GraduationEstimate {
    /// Extrapolate the approval pace of a finished simulation.
    #[must_use]
    pub fn project(
        remaining: usize,
        approvals: usize,
        horizon_semesters: u32,
        terms_per_year: u32,
    ) -> Self {
        if remaining == 0 {
            return Self::AlreadyComplete;
        }
        if approvals == 0 || horizon_semesters == 0 || terms_per_year == 0 {
            return Self::Indeterminate;
        }
        // ceil(remaining / (approvals / horizon)) in integers.
        let numerator = remaining as u64 * u64::from(horizon_semesters);
        let semesters = numerator.div_ceil(approvals as u64);
        let per_year = u64::from(terms_per_year);
        Self::Remaining {
            semesters,
            years: semesters / per_year,
            extra_semesters: semesters % per_year,
        }
    }
}

impl fmt::Display for GraduationEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::AlreadyComplete => f.write_str("already complete"),
            Self::Indeterminate => f.write_str("indeterminate"),
            Self::Remaining {
                years,
                extra_semesters,
                ..
            } => {
                let plural = |n: u64| if n == 1 { "" } else { "s" };
                match (years, extra_semesters) {
                    (0, extra) => write!(f, "{extra} semester{}", plural(extra)),
                    (years, 0) => write!(f, "{years} year{}", plural(years)),
                    (years, extra) => write!(
                        f,
                        "{years} year{} and {extra} semester{}",
                        plural(years),
                        plural(extra)
                    ),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub total_subjects: usize,
    pub initial_approved: usize,
    pub final_approved: usize,
    pub initial_pending_finals: usize,
    pub final_pending_finals: usize,
    pub initial_progress: u32,
    pub final_progress: u32,
    pub progress_gain: u32,
    pub estimated_graduation: GraduationEstimate,
}

/// Full outcome of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub strategy: String,
    pub horizon_semesters: u32,
    pub history: Vec<SemesterSnapshot>,
    pub summary: SimulationSummary,
    pub final_status: StatusMap,
    #[serde(default)]
    pub warnings: Vec<IntegrityWarning>,
}

/// Run a built-in strategy with the default configuration.
///
/// # Errors
///
/// Returns `SimulationError` when the horizon exceeds the configured maximum.
pub fn simulate(
    catalog: &Catalog,
    initial: &StatusMap,
    request: &SimulationRequest,
) -> Result<SimulationResult, SimulationError> {
    simulate_with_config(catalog, initial, request, &SimulationConfig::default())
}

/// Run a built-in strategy with custom caps.
///
/// # Errors
///
/// Returns `SimulationError` when the config is invalid or the horizon
/// exceeds `config.max_horizon`.
pub fn simulate_with_config(
    catalog: &Catalog,
    initial: &StatusMap,
    request: &SimulationRequest,
    config: &SimulationConfig,
) -> Result<SimulationResult, SimulationError> {
    config.validate()?;
    let policy = request.strategy.create_policy(config);
    simulate_with_policy(
        catalog,
        initial,
        policy.as_ref(),
        request.horizon_semesters,
        config,
    )
}

/// Run any advancement policy.
///
/// Plans are filtered against the candidates offered that semester; unknown,
/// ineligible and repeated ids are dropped.
///
/// # Errors
///
/// Returns `SimulationError::HorizonTooLarge` when `horizon_semesters`
/// exceeds `config.max_horizon`.
pub fn simulate_with_policy(
    catalog: &Catalog,
    initial: &StatusMap,
    policy: &dyn AdvancementPolicy,
    horizon_semesters: u32,
    config: &SimulationConfig,
) -> Result<SimulationResult, SimulationError> {
    if horizon_semesters > config.max_horizon {
        return Err(SimulationError::HorizonTooLarge {
            horizon: i64::from(horizon_semesters),
            max: config.max_horizon,
        });
    }

    let mut state = initial.clone();
    let mut history = Vec::with_capacity(horizon_semesters as usize);
    for semester in 1..=horizon_semesters {
        let snapshot = run_semester(catalog, &mut state, policy, semester);
        log::debug!(
            target: LOG_TARGET_SIMULATION,
            "{} semester {}: {} finals, {} enrolled, {} approved ({}%)",
            policy.name(),
            semester,
            snapshot.finals_approved.len(),
            snapshot.enrolled.len(),
            snapshot.approved,
            snapshot.progress
        );
        history.push(snapshot);
    }

    let summary = summarize(catalog, initial, &state, horizon_semesters, config);
    Ok(SimulationResult {
        strategy: policy.name().to_string(),
        horizon_semesters,
        history,
        summary,
        final_status: state,
        warnings: catalog.warnings().to_vec(),
    })
}

fn run_semester(
    catalog: &Catalog,
    state: &mut StatusMap,
    policy: &dyn AdvancementPolicy,
    semester: u32,
) -> SemesterSnapshot {
    let open: Vec<SubjectId> = enrollable(catalog, state)
        .into_iter()
        .map(|subject| subject.id.clone())
        .collect();
    let finals = final_candidates(catalog, state);

    let plan = policy.plan(state, &finals, &open);

    let finals_approved = retain_offered(
        plan.approve,
        finals.iter().map(|candidate| &candidate.id),
        "final",
    );
    let enrolled = retain_offered(plan.enroll, open.iter(), "enrollment");
    for id in &finals_approved {
        state.set(id.clone(), StatusValue::Approved);
    }
    for id in &enrolled {
        state.set(id.clone(), StatusValue::InProgress);
    }
    state.complete_coursework();

    let before: HashSet<&SubjectId> = open.iter().collect();
    let newly_available = enrollable(catalog, state)
        .into_iter()
        .filter(|subject| !before.contains(&subject.id))
        .map(|subject| subject.id.clone())
        .collect();

    let approved = state.count_in(catalog, StatusValue::Approved);
    SemesterSnapshot {
        semester,
        approved,
        pending_final: state.count_in(catalog, StatusValue::PendingFinal),
        available: open.len(),
        newly_available,
        finals_approved,
        enrolled,
        progress: percent(approved, catalog.len()),
    }
}

/// Finals that can be sat now, highest impact first (catalog order on ties).
fn final_candidates(catalog: &Catalog, state: &StatusMap) -> Vec<FinalCandidate> {
    let mut finals: Vec<FinalCandidate> = catalog
        .iter()
        .filter(|subject| can_take_final(catalog, state, subject))
        .map(|subject| FinalCandidate {
            id: subject.id.clone(),
            impact: course_unlocks(catalog, state, subject.id.as_str()).count(),
        })
        .collect();
    finals.sort_by(|a, b| b.impact.cmp(&a.impact));
    finals
}

fn retain_offered<'a>(
    picked: Vec<SubjectId>,
    offered: impl Iterator<Item = &'a SubjectId>,
    kind: &str,
) -> Vec<SubjectId> {
    let mut allowed: HashSet<&SubjectId> = offered.collect();
    picked
        .into_iter()
        .filter(|id| {
            let keep = allowed.remove(id);
            if !keep {
                log::trace!(target: LOG_TARGET_SIMULATION, "dropping {kind} `{id}` from plan");
            }
            keep
        })
        .collect()
}

fn summarize(
    catalog: &Catalog,
    initial: &StatusMap,
    last: &StatusMap,
    horizon_semesters: u32,
    config: &SimulationConfig,
) -> SimulationSummary {
    let total = catalog.len();
    let initial_approved = initial.count_in(catalog, StatusValue::Approved);
    let final_approved = last.count_in(catalog, StatusValue::Approved);
    let initial_progress = percent(initial_approved, total);
    let final_progress = percent(final_approved, total);
    SimulationSummary {
        total_subjects: total,
        initial_approved,
        final_approved,
        initial_pending_finals: initial.count_in(catalog, StatusValue::PendingFinal),
        final_pending_finals: last.count_in(catalog, StatusValue::PendingFinal),
        initial_progress,
        final_progress,
        progress_gain: final_progress.saturating_sub(initial_progress),
        estimated_graduation: GraduationEstimate::project(
            total - final_approved,
            final_approved.saturating_sub(initial_approved),
            horizon_semesters,
            config.terms_per_year,
        ),
    }
}
