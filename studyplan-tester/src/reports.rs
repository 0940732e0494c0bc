use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;
use studyplan_core::{PlanningOverview, SubjectId};

use crate::comparison::{StrategyRun, best_per_horizon};
use crate::properties::PropertyOutcome;

const FINALS_SHOWN: usize = 5;

/// Everything one tester invocation produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TesterReport {
    pub generated_at: String,
    pub career: String,
    pub overview: PlanningOverview,
    pub next_in_trajectory: Vec<SubjectId>,
    pub comparisons: Vec<StrategyRun>,
    pub properties: Vec<PropertyOutcome>,
}

impl TesterReport {
    pub fn new(
        career: String,
        overview: PlanningOverview,
        next_in_trajectory: Vec<SubjectId>,
        comparisons: Vec<StrategyRun>,
        properties: Vec<PropertyOutcome>,
    ) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            career,
            overview,
            next_in_trajectory,
            comparisons,
            properties,
        }
    }

    pub fn all_properties_passed(&self) -> bool {
        self.properties.iter().all(|outcome| outcome.passed)
    }
}

fn join(ids: &[&SubjectId]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn generate_console_report(
    out: &mut dyn Write,
    report: &TesterReport,
    total_duration: Duration,
) -> Result<()> {
    let stats = &report.overview.statistics;
    writeln!(out)?;
    writeln!(
        out,
        "{}",
        format!("📊 Study plan report: {}", report.career)
            .bright_cyan()
            .bold()
    )?;
    writeln!(out, "{}", "==============================".cyan())?;
    writeln!(
        out,
        "Subjects: {} | approved {} ({}%) | pending finals {} | in progress {}",
        stats.overall.total,
        stats.overall.approved.to_string().green(),
        stats.overall.approved_percent,
        stats.overall.pending_final.to_string().yellow(),
        stats.overall.in_progress
    )?;
    writeln!(
        out,
        "Pace: {:.1} completed per year, ~{} years to graduate",
        stats.pace.average_completed_per_year, stats.pace.estimated_years_remaining
    )?;
    for (year, breakdown) in &stats.by_year {
        writeln!(
            out,
            "   Year {year}: {}/{} approved ({}%)",
            breakdown.approved, breakdown.total, breakdown.approved_percent
        )?;
    }
    writeln!(out)?;

    let availability = &report.overview.availability;
    writeln!(out, "{}", "📚 Availability".bright_yellow().bold())?;
    writeln!(out, "Available now: {}", join(&availability.available()).green())?;
    writeln!(out, "Blocked: {}", availability.blocked().len())?;
    let next: Vec<&SubjectId> = report.next_in_trajectory.iter().collect();
    writeln!(out, "Next in trajectory: {}", join(&next))?;
    writeln!(out)?;

    let finals = &report.overview.finals;
    writeln!(out, "{}", "📝 Pending finals by impact".bright_yellow().bold())?;
    if finals.is_empty() {
        writeln!(out, "   none")?;
    }
    for impact in finals.impacts.iter().take(FINALS_SHOWN) {
        let status = if impact.can_be_rendered_now {
            "ready".green()
        } else {
            "blocked".red()
        };
        writeln!(
            out,
            "   {} {} (impact {}) [{}]",
            impact.id.as_str().bold(),
            impact.name,
            impact.total_impact,
            status
        )?;
    }
    writeln!(out)?;

    if !report.comparisons.is_empty() {
        writeln!(out, "{}", "🎓 Strategy comparison".bright_yellow().bold())?;
        let best = best_per_horizon(&report.comparisons);
        for run in &report.comparisons {
            let marker = if best.iter().any(|b| std::ptr::eq(*b, run)) {
                "★".bright_green()
            } else {
                " ".normal()
            };
            writeln!(
                out,
                "{marker} {:>2} sem  {:<14} approved {:>3} ({:>3}%, +{}%)  finals {:>3}  graduation {}",
                run.horizon_semesters,
                run.strategy.label(),
                run.final_approved,
                run.final_progress,
                run.progress_gain,
                run.finals_sat,
                run.estimated_graduation
            )?;
        }
        writeln!(out)?;
    }

    if !report.properties.is_empty() {
        writeln!(out, "{}", "🧪 Property sweeps".bright_yellow().bold())?;
        for outcome in &report.properties {
            let status = if outcome.passed {
                "✅ PASS".green()
            } else {
                "❌ FAIL".red()
            };
            writeln!(
                out,
                "{status} {} ({}/{} curricula, avg {:?})",
                outcome.property.label().bold(),
                outcome.successful_iterations,
                outcome.iterations_run,
                outcome.average_duration
            )?;
            for failure in &outcome.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    if !availability.warnings.is_empty() {
        writeln!(out, "{}", "⚠️  Catalog warnings".yellow().bold())?;
        for warning in &availability.warnings {
            writeln!(out, "   {warning}")?;
        }
        writeln!(out)?;
    }

    writeln!(out, "Total time: {total_duration:?}")?;
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, report: &TesterReport) -> Result<()> {
    let json_output = serde_json::to_string_pretty(report)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, report: &TesterReport) -> Result<()> {
    let stats = &report.overview.statistics;
    writeln!(out, "# Study Plan Report: {}\n", report.career)?;
    writeln!(out, "_Generated {}_\n", report.generated_at)?;

    writeln!(out, "## Progress\n")?;
    writeln!(out, "- **Subjects**: {}", stats.overall.total)?;
    writeln!(
        out,
        "- **Approved**: {} ({}%)",
        stats.overall.approved, stats.overall.approved_percent
    )?;
    writeln!(out, "- **Pending finals**: {}", stats.overall.pending_final)?;
    writeln!(out, "- **In progress**: {}", stats.overall.in_progress)?;
    writeln!(
        out,
        "- **Estimated years remaining**: {}\n",
        stats.pace.estimated_years_remaining
    )?;

    writeln!(out, "## Pending Finals\n")?;
    if report.overview.finals.is_empty() {
        writeln!(out, "_None._\n")?;
    } else {
        writeln!(out, "| Subject | Impact | Ready |")?;
        writeln!(out, "|---|---|---|")?;
        for impact in &report.overview.finals.impacts {
            let ready = if impact.can_be_rendered_now { "✅" } else { "❌" };
            writeln!(
                out,
                "| {} {} | {} | {ready} |",
                impact.id, impact.name, impact.total_impact
            )?;
        }
        writeln!(out)?;
    }

    if !report.comparisons.is_empty() {
        writeln!(out, "## Strategy Comparison\n")?;
        writeln!(out, "| Horizon | Strategy | Approved | Progress | Gain | Graduation |")?;
        writeln!(out, "|---|---|---|---|---|---|")?;
        for run in &report.comparisons {
            writeln!(
                out,
                "| {} | {} | {} | {}% | +{}% | {} |",
                run.horizon_semesters,
                run.strategy,
                run.final_approved,
                run.final_progress,
                run.progress_gain,
                run.estimated_graduation
            )?;
        }
        writeln!(out)?;
    }

    if !report.properties.is_empty() {
        writeln!(out, "## Property Sweeps\n")?;
        for outcome in &report.properties {
            let status = if outcome.passed { "✅" } else { "❌" };
            writeln!(
                out,
                "- {status} **{}**: {}/{} curricula",
                outcome.property.label(),
                outcome.successful_iterations,
                outcome.iterations_run
            )?;
            for failure in &outcome.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
    }
    Ok(())
}
