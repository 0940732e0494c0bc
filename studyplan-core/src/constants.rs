//! Centralized planning constants for the studyplan engine.
//!
//! The strategy caps model a realistic course load per term. Callers can
//! override them through [`crate::SimulationConfig`], but the defaults below
//! define the reference behaviour.

// Strategy caps ------------------------------------------------------------
pub(crate) const FINALS_FIRST_ENROLL_CAP: usize = 4;
pub(crate) const COURSES_FIRST_ENROLL_CAP: usize = 5;
pub(crate) const COURSES_FIRST_FINALS_CAP: usize = 2;
pub(crate) const BALANCED_ENROLL_CAP: usize = 3;
pub(crate) const BALANCED_FINALS_CAP: usize = 3;

// Calendar -----------------------------------------------------------------
pub(crate) const TERMS_PER_YEAR: u32 = 2;
pub(crate) const MAX_HORIZON_SEMESTERS: u32 = 40;
pub(crate) const DEFAULT_HORIZON_SEMESTERS: u32 = 4;

// Statistics ---------------------------------------------------------------
pub(crate) const TOP_DEPENDED_ON_LIMIT: usize = 5;

// Logging targets ----------------------------------------------------------
pub(crate) const LOG_TARGET_CATALOG: &str = "studyplan::catalog";
pub(crate) const LOG_TARGET_SIMULATION: &str = "studyplan::simulation";
