//! Randomized invariant sweeps over generated curricula.
use anyhow::{Context, Result};
use colored::Colorize;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use studyplan_core::{
    Catalog, CatalogError, DerivedState, SimulationConfig, SimulationRequest, StatusMap,
    StatusValue, StrategyId, Subject, Term, analyze_finals, resolve, simulate_with_config,
};

use crate::util::duration_serde;

const MIN_SUBJECTS: usize = 6;
const MAX_SUBJECTS: usize = 40;
const CURRICULUM_YEARS: usize = 5;
const PREREQUISITE_ODDS: f64 = 0.12;
const SWEEP_HORIZON: u32 = 6;

/// Invariants checked on every generated curriculum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Property {
    /// Advancing any subject never blocks an available one.
    Monotonicity,
    /// Resolving twice gives the same reports.
    Idempotence,
    /// A zero horizon returns the initial map untouched.
    HorizonZero,
    /// No semester exceeds the strategy caps.
    StrategyCaps,
    /// Simulated progress never moves a subject backwards.
    NoRegression,
}

impl Property {
    pub const ALL: [Self; 5] = [
        Self::Monotonicity,
        Self::Idempotence,
        Self::HorizonZero,
        Self::StrategyCaps,
        Self::NoRegression,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Monotonicity => "monotonicity",
            Self::Idempotence => "idempotence",
            Self::HorizonZero => "horizon-zero",
            Self::StrategyCaps => "strategy-caps",
            Self::NoRegression => "no-regression",
        }
    }

    fn check(self, case: &Case, config: &SimulationConfig) -> Result<(), String> {
        match self {
            Self::Monotonicity => check_monotonicity(case),
            Self::Idempotence => check_idempotence(case),
            Self::HorizonZero => check_horizon_zero(case, config),
            Self::StrategyCaps => check_caps(case, config),
            Self::NoRegression => check_no_regression(case, config),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyOutcome {
    pub property: Property,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
}

/// A generated curriculum plus a status map and an advanced copy of it.
pub struct Case {
    seed: u64,
    catalog: Catalog,
    status: StatusMap,
    advanced: StatusMap,
}

impl Case {
    pub fn generate(seed: u64) -> Result<Self, CatalogError> {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let catalog = random_catalog(&mut rng)?;
        let status = random_status(&mut rng, &catalog);
        let advanced = advance_some(&mut rng, &status, &catalog);
        Ok(Self {
            seed,
            catalog,
            status,
            advanced,
        })
    }
}

fn random_catalog(rng: &mut ChaCha20Rng) -> Result<Catalog, CatalogError> {
    let count = rng.gen_range(MIN_SUBJECTS..=MAX_SUBJECTS);
    let mut subjects: Vec<Subject> = Vec::with_capacity(count);
    for i in 0..count {
        let year = u8::try_from(i * CURRICULUM_YEARS / count + 1).unwrap_or(u8::MAX);
        let term = Term::from_code(rng.gen_range(0..3)).unwrap_or(Term::FullYear);
        let mut course = Vec::new();
        let mut exam = Vec::new();
        for earlier in &subjects {
            if rng.gen_bool(PREREQUISITE_ODDS) {
                course.push(earlier.id.clone());
                if rng.gen_bool(0.5) {
                    exam.push(earlier.id.clone());
                }
            }
        }
        subjects.push(
            Subject::new(format!("gen-{i:02}"), year, term)
                .with_course_prerequisites(course)
                .with_exam_prerequisites(exam),
        );
    }
    Catalog::new(subjects)
}

fn random_status(rng: &mut ChaCha20Rng, catalog: &Catalog) -> StatusMap {
    catalog
        .iter()
        .map(|subject| {
            let status = StatusValue::ALL[rng.gen_range(0..StatusValue::ALL.len())];
            (subject.id.clone(), status)
        })
        .collect()
}

fn advance_some(rng: &mut ChaCha20Rng, status: &StatusMap, catalog: &Catalog) -> StatusMap {
    let mut advanced = status.clone();
    for subject in catalog {
        let current = status.get(subject.id.as_str());
        if current == StatusValue::Approved || !rng.gen_bool(0.3) {
            continue;
        }
        let ahead: Vec<StatusValue> = StatusValue::ALL
            .into_iter()
            .filter(|candidate| *candidate > current)
            .collect();
        let target = ahead[rng.gen_range(0..ahead.len())];
        advanced.set(subject.id.clone(), target);
    }
    advanced
}

fn check_monotonicity(case: &Case) -> Result<(), String> {
    let before = resolve(&case.catalog, &case.status);
    let after = resolve(&case.catalog, &case.advanced);
    for subject in &case.catalog {
        let id = subject.id.as_str();
        let was_open = before
            .state(id)
            .is_some_and(DerivedState::is_available_or_better);
        let is_open = after
            .state(id)
            .is_some_and(DerivedState::is_available_or_better);
        if was_open && !is_open {
            return Err(format!("{id} became blocked after advancing progress"));
        }
    }
    Ok(())
}

fn check_idempotence(case: &Case) -> Result<(), String> {
    if resolve(&case.catalog, &case.status) != resolve(&case.catalog, &case.status) {
        return Err("availability differs between identical calls".to_string());
    }
    if analyze_finals(&case.catalog, &case.status) != analyze_finals(&case.catalog, &case.status) {
        return Err("final impact differs between identical calls".to_string());
    }
    Ok(())
}

fn check_horizon_zero(case: &Case, config: &SimulationConfig) -> Result<(), String> {
    for strategy in StrategyId::ALL {
        let request = SimulationRequest::new(strategy, 0);
        let result = simulate_with_config(&case.catalog, &case.status, &request, config)
            .map_err(|err| err.to_string())?;
        if !result.history.is_empty() || result.final_status != case.status {
            return Err(format!("{strategy} changed state with a zero horizon"));
        }
    }
    Ok(())
}

fn check_caps(case: &Case, config: &SimulationConfig) -> Result<(), String> {
    for strategy in StrategyId::ALL {
        let caps = config.caps(strategy);
        let request = SimulationRequest::new(strategy, SWEEP_HORIZON);
        let result = simulate_with_config(&case.catalog, &case.status, &request, config)
            .map_err(|err| err.to_string())?;
        for snapshot in &result.history {
            if snapshot.enrolled.len() > caps.max_enrollments {
                return Err(format!(
                    "{strategy} enrolled {} subjects in semester {}",
                    snapshot.enrolled.len(),
                    snapshot.semester
                ));
            }
            if caps
                .max_finals
                .is_some_and(|max| snapshot.finals_approved.len() > max)
            {
                return Err(format!(
                    "{strategy} approved {} finals in semester {}",
                    snapshot.finals_approved.len(),
                    snapshot.semester
                ));
            }
        }
    }
    Ok(())
}

fn check_no_regression(case: &Case, config: &SimulationConfig) -> Result<(), String> {
    for strategy in StrategyId::ALL {
        let request = SimulationRequest::new(strategy, SWEEP_HORIZON);
        let result = simulate_with_config(&case.catalog, &case.status, &request, config)
            .map_err(|err| err.to_string())?;
        if !case.status.is_dominated_by(&result.final_status) {
            return Err(format!("{strategy} moved a subject backwards"));
        }
        let mut approved = result.summary.initial_approved;
        for snapshot in &result.history {
            if snapshot.approved < approved {
                return Err(format!(
                    "{strategy} lost approvals in semester {}",
                    snapshot.semester
                ));
            }
            approved = snapshot.approved;
        }
    }
    Ok(())
}

pub struct PropertySweep<'a> {
    config: &'a SimulationConfig,
    verbose: bool,
}

impl<'a> PropertySweep<'a> {
    pub const fn new(config: &'a SimulationConfig, verbose: bool) -> Self {
        Self { config, verbose }
    }

    /// Check every property on `iterations` curricula per seed.
    ///
    /// # Errors
    ///
    /// Returns an error if a curriculum cannot be generated.
    pub fn run(&self, seeds: &[u64], iterations: usize) -> Result<Vec<PropertyOutcome>> {
        let cases = seeds
            .iter()
            .flat_map(|&seed| {
                (0..iterations)
                    .map(move |i| seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX)))
            })
            .map(|seed| Case::generate(seed).with_context(|| format!("generating seed {seed}")))
            .collect::<Result<Vec<_>>>()?;
        log::info!("generated {} curricula for property sweeps", cases.len());
        Ok(Property::ALL
            .into_iter()
            .map(|property| self.run_property(property, &cases))
            .collect())
    }

    fn run_property(&self, property: Property, cases: &[Case]) -> PropertyOutcome {
        let mut failures = Vec::new();
        let mut timings = Vec::with_capacity(cases.len());
        for case in cases {
            let start = Instant::now();
            match property.check(case, self.config) {
                Ok(()) => timings.push(start.elapsed()),
                Err(err) => {
                    if self.verbose {
                        println!(
                            "  ❌ {} failed for seed {}: {}",
                            property.label(),
                            case.seed,
                            err.clone().red()
                        );
                    }
                    failures.push(format!(
                        "seed {} ({} subjects): {err}",
                        case.seed,
                        case.catalog.len()
                    ));
                }
            }
        }

        let average_duration = if timings.is_empty() {
            Duration::ZERO
        } else {
            timings.iter().sum::<Duration>() / u32::try_from(timings.len()).unwrap_or(u32::MAX)
        };
        PropertyOutcome {
            property,
            passed: failures.is_empty(),
            iterations_run: cases.len(),
            successful_iterations: timings.len(),
            failures,
            average_duration,
        }
    }
}
