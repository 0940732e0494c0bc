use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use studyplan_core::{
    Catalog, GraduationEstimate, SimulationConfig, SimulationRequest, StatusMap, StrategyId,
    simulate_with_config,
};

use crate::util::duration_serde;

/// One strategy run over one horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRun {
    pub strategy: StrategyId,
    pub horizon_semesters: u32,
    pub initial_approved: usize,
    pub final_approved: usize,
    pub final_pending_finals: usize,
    pub final_progress: u32,
    pub progress_gain: u32,
    pub finals_sat: usize,
    pub enrollments: usize,
    pub estimated_graduation: GraduationEstimate,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl StrategyRun {
    /// Ranking key: more approvals first, then fewer pending finals.
    fn score(&self) -> (usize, std::cmp::Reverse<usize>) {
        (self.final_approved, std::cmp::Reverse(self.final_pending_finals))
    }
}

pub struct StrategyComparison<'a> {
    catalog: &'a Catalog,
    status: &'a StatusMap,
    config: &'a SimulationConfig,
    verbose: bool,
}

impl<'a> StrategyComparison<'a> {
    pub const fn new(
        catalog: &'a Catalog,
        status: &'a StatusMap,
        config: &'a SimulationConfig,
        verbose: bool,
    ) -> Self {
        Self {
            catalog,
            status,
            config,
            verbose,
        }
    }

    /// Run every strategy for every horizon, horizon-major.
    pub fn run(&self, strategies: &[StrategyId], horizons: &[u32]) -> Result<Vec<StrategyRun>> {
        let mut runs = Vec::with_capacity(strategies.len() * horizons.len());
        for &horizon in horizons {
            for &strategy in strategies {
                runs.push(self.run_one(strategy, horizon)?);
            }
        }
        Ok(runs)
    }

    fn run_one(&self, strategy: StrategyId, horizon: u32) -> Result<StrategyRun> {
        let start = Instant::now();
        let request = SimulationRequest::new(strategy, horizon);
        let result = simulate_with_config(self.catalog, self.status, &request, self.config)
            .with_context(|| format!("{strategy} over {horizon} semesters"))?;
        let duration = start.elapsed();

        if self.verbose {
            println!(
                "  🎓 {} x{}: {} approved (+{}%), graduation {}",
                strategy.label().bright_white(),
                horizon,
                result.summary.final_approved,
                result.summary.progress_gain,
                result.summary.estimated_graduation
            );
        }

        let summary = &result.summary;
        Ok(StrategyRun {
            strategy,
            horizon_semesters: horizon,
            initial_approved: summary.initial_approved,
            final_approved: summary.final_approved,
            final_pending_finals: summary.final_pending_finals,
            final_progress: summary.final_progress,
            progress_gain: summary.progress_gain,
            finals_sat: result.history.iter().map(|s| s.finals_approved.len()).sum(),
            enrollments: result.history.iter().map(|s| s.enrolled.len()).sum(),
            estimated_graduation: summary.estimated_graduation,
            duration,
        })
    }
}

/// Best run for each horizon, in first-seen horizon order.
pub fn best_per_horizon(runs: &[StrategyRun]) -> Vec<&StrategyRun> {
    let mut best: Vec<&StrategyRun> = Vec::new();
    for run in runs {
        match best
            .iter_mut()
            .find(|current| current.horizon_semesters == run.horizon_semesters)
        {
            Some(current) if run.score() > current.score() => *current = run,
            Some(_) => {}
            None => best.push(run),
        }
    }
    best
}
