//! Studyplan Core
//!
//! Curriculum planning engine: prerequisite-aware availability, final-exam
//! impact ranking, semester progression simulation and progress statistics.
//! The crate performs no I/O; catalogs and status maps come from
//! caller-provided collaborators.

pub mod availability;
pub mod catalog;
pub(crate) mod constants;
pub mod impact;
pub mod integrity;
pub mod simulation;
pub mod stats;
pub mod status;

// Re-export commonly used types
pub use availability::{
    AvailabilityReport, BlockedSubject, DerivedState, MissingPrerequisite, MissingReason,
    can_take_final, classify, course_prerequisites_met, enrollable, exam_prerequisites_met,
    missing_course_prerequisites, newly_available, next_blocked_in_trajectory,
    next_in_trajectory, resolve,
};
pub use catalog::{Catalog, CatalogError, DurationClass, PrerequisiteSet, Subject, SubjectId, Term};
pub use impact::{FinalImpact, FinalImpactReport, analyze_finals};
pub use integrity::{IntegrityWarning, RequirementKind};
pub use simulation::{
    AdvancementPolicy, FinalCandidate, GraduationEstimate, SemesterPlan, SemesterSnapshot,
    SimulationConfig, SimulationError, SimulationRequest, SimulationResult, SimulationSummary,
    StrategyCaps, StrategyId, simulate, simulate_with_config, simulate_with_policy,
};
pub use stats::{
    Completion, DependedOn, DurationBreakdown, LoadEntry, Pace, PrerequisiteStructure,
    StatisticsReport, StatusBreakdown, TermBreakdown, compute_statistics,
};
pub use status::{StatusError, StatusMap, StatusValue};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Source of curriculum catalogs, keyed by career.
pub trait CatalogProvider {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the catalog for a career.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded or is structurally invalid.
    fn load_catalog(&self, career: &str) -> Result<Catalog, Self::Error>;
}

/// Per-student persisted progress.
pub trait StatusStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the status map of a student; unknown students start empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored map cannot be read.
    fn load_status(&self, student: &str) -> Result<StatusMap, Self::Error>;

    /// Persist the status map of a student.
    ///
    /// # Errors
    ///
    /// Returns an error if the map cannot be written.
    fn save_status(&self, student: &str, status: &StatusMap) -> Result<(), Self::Error>;
}

/// Everything a student dashboard shows at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningOverview {
    pub availability: AvailabilityReport,
    pub finals: FinalImpactReport,
    pub statistics: StatisticsReport,
}

impl PlanningOverview {
    #[must_use]
    pub fn compute(catalog: &Catalog, status: &StatusMap) -> Self {
        Self {
            availability: resolve(catalog, status),
            finals: analyze_finals(catalog, status),
            statistics: compute_statistics(catalog, status),
        }
    }
}

/// Main planning entry point wiring the engine to its collaborators
pub struct Planner<P, S>
where
    P: CatalogProvider,
    S: StatusStore,
{
    catalogs: P,
    store: S,
    config: SimulationConfig,
}

impl<P, S> Planner<P, S>
where
    P: CatalogProvider,
    S: StatusStore,
{
    /// Create a planner with the default simulation configuration
    pub fn new(catalogs: P, store: S) -> Self {
        Self::with_config(catalogs, store, SimulationConfig::default())
    }

    pub const fn with_config(catalogs: P, store: S, config: SimulationConfig) -> Self {
        Self {
            catalogs,
            store,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn load(&self, career: &str, student: &str) -> anyhow::Result<(Catalog, StatusMap)> {
        let catalog = self
            .catalogs
            .load_catalog(career)
            .with_context(|| format!("loading catalog for career `{career}`"))?;
        let status = self
            .store
            .load_status(student)
            .with_context(|| format!("loading status of student `{student}`"))?;
        Ok((catalog, status))
    }

    /// Availability, final impact and statistics for one student.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog or the status map cannot be loaded.
    pub fn overview(&self, career: &str, student: &str) -> anyhow::Result<PlanningOverview> {
        let (catalog, status) = self.load(career, student)?;
        Ok(PlanningOverview::compute(&catalog, &status))
    }

    /// Simulate future semesters without touching the stored status.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the request is rejected.
    pub fn simulate(
        &self,
        career: &str,
        student: &str,
        request: &SimulationRequest,
    ) -> anyhow::Result<SimulationResult> {
        let (catalog, status) = self.load(career, student)?;
        simulate_with_config(&catalog, &status, request, &self.config).with_context(|| {
            format!(
                "simulating {} for {} semesters",
                request.strategy, request.horizon_semesters
            )
        })
    }

    /// Advance one subject and persist the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the subject is unknown, the move is a regression,
    /// or the store fails.
    pub fn record_progress(
        &self,
        career: &str,
        student: &str,
        subject: &str,
        to: StatusValue,
    ) -> anyhow::Result<StatusMap> {
        let (catalog, mut status) = self.load(career, student)?;
        if !catalog.contains(subject) {
            anyhow::bail!("subject `{subject}` is not part of career `{career}`");
        }
        status.advance(subject, to)?;
        self.store
            .save_status(student, &status)
            .with_context(|| format!("saving status of student `{student}`"))?;
        Ok(status)
    }
}
