mod assets;
mod comparison;
mod properties;
mod reports;
mod util;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;
use studyplan_core::{CatalogProvider, Planner, StatusStore, StatusValue, next_in_trajectory};

use assets::{JsonAssets, load_config};
use comparison::StrategyComparison;
use properties::PropertySweep;
use reports::TesterReport;
use util::{parse_horizons, parse_seeds, parse_strategies};

#[derive(Debug, Parser)]
#[command(name = "studyplan-tester", version = "0.1.0")]
#[command(
    about = "Headless QA for the studyplan engine: strategy comparisons and invariant sweeps"
)]
struct Args {
    /// Catalog JSON file (defaults to the bundled UTN Sistemas plan)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Status map JSON file (defaults to the bundled sample student)
    #[arg(long)]
    status: Option<PathBuf>,

    /// Simulation config JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Student name used for loading and saving progress
    #[arg(long, default_value = "sample")]
    student: String,

    /// Record progress before planning, as SUBJECT=STATUS (requires --status)
    #[arg(long)]
    record: Option<String>,

    /// Strategies to compare (comma-separated, or `all`)
    #[arg(long, default_value = "all")]
    strategies: String,

    /// Horizons in semesters (comma-separated)
    #[arg(long, default_value = "4,8")]
    horizons: String,

    /// Seeds for the property sweeps (comma-separated, decimal or 0x hex)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Generated curricula per seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Skip the randomized property sweeps
    #[arg(long)]
    skip_properties: bool,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    announce_banner();
    let start_time = Instant::now();
    let report = build_report(&args)?;
    write_report(&args, &report, start_time)?;

    if !report.all_properties_passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn announce_banner() {
    println!("{}", "🎓 Study Plan Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn build_report(args: &Args) -> Result<TesterReport> {
    let strategies = parse_strategies(&args.strategies)?;
    let horizons = parse_horizons(&args.horizons)?;
    let seeds = parse_seeds(&args.seeds)?;
    let config = load_config(args.config.as_deref()).context("loading simulation config")?;

    let assets = JsonAssets::new(args.catalog.clone(), args.status.clone());
    let career = assets.career_label();
    let planner = Planner::with_config(assets.clone(), assets.clone(), config.clone());

    if let Some(record) = &args.record {
        let (subject, to) = parse_record(record)?;
        planner.record_progress(&career, &args.student, subject, to)?;
        println!("📝 Recorded {} as {}", subject.bold(), to);
    }

    let overview = planner.overview(&career, &args.student)?;
    let catalog = assets.load_catalog(&career)?;
    let status = assets.load_status(&args.student)?;
    log::info!(
        "{career}: {} subjects, {} with recorded progress",
        catalog.len(),
        status.len()
    );

    println!("{}", "📈 Comparing strategies".bright_yellow().bold());
    let comparisons = StrategyComparison::new(&catalog, &status, planner.config(), args.verbose)
        .run(&strategies, &horizons)?;

    let properties = if args.skip_properties {
        Vec::new()
    } else {
        println!("{}", "🧪 Running property sweeps".bright_yellow().bold());
        PropertySweep::new(planner.config(), args.verbose).run(&seeds, args.iterations)?
    };

    Ok(TesterReport::new(
        career,
        overview,
        next_in_trajectory(&catalog, &status),
        comparisons,
        properties,
    ))
}

fn parse_record(arg: &str) -> Result<(&str, StatusValue)> {
    let Some((subject, status)) = arg.split_once('=') else {
        bail!("--record expects SUBJECT=STATUS, got `{arg}`");
    };
    let subject = subject.trim();
    if subject.is_empty() {
        bail!("--record is missing a subject id");
    }
    let to = serde_json::from_value(serde_json::Value::String(status.trim().to_string()))
        .with_context(|| format!("unknown status `{}`", status.trim()))?;
    Ok((subject, to))
}

fn write_report(args: &Args, report: &TesterReport, start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, report)?,
        "markdown" => reports::generate_markdown_report(&mut output_target, report)?,
        _ => reports::generate_console_report(
            &mut output_target,
            report,
            start_time.elapsed(),
        )?,
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn base_args() -> Args {
        Args {
            catalog: None,
            status: None,
            config: None,
            student: "sample".to_string(),
            record: None,
            strategies: "all".to_string(),
            horizons: "2".to_string(),
            seeds: "7".to_string(),
            iterations: 1,
            skip_properties: false,
            report: "json".to_string(),
            output: None,
            verbose: false,
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("studyplan-main-{}-{name}", std::process::id()))
    }

    #[test]
    fn bundled_run_produces_full_report() {
        let report = build_report(&base_args()).unwrap();
        assert_eq!(report.career, assets::BUNDLED_CAREER);
        assert_eq!(report.overview.statistics.overall.total, 36);
        assert_eq!(report.comparisons.len(), 3);
        assert_eq!(report.properties.len(), properties::Property::ALL.len());
        assert!(report.all_properties_passed());
    }

    #[test]
    fn skip_properties_leaves_sweeps_empty() {
        let mut args = base_args();
        args.skip_properties = true;
        args.strategies = "balanced".to_string();
        args.horizons = "0,4".to_string();
        let report = build_report(&args).unwrap();
        assert!(report.properties.is_empty());
        assert_eq!(report.comparisons.len(), 2);
        assert_eq!(
            report.comparisons[0].final_approved,
            report.comparisons[0].initial_approved
        );
    }

    #[test]
    fn record_requires_writable_status() {
        let mut args = base_args();
        args.skip_properties = true;
        args.record = Some("36=inProgress".to_string());
        let err = build_report(&args).unwrap_err();
        assert!(format!("{err:#}").contains("read-only"));
    }

    #[test]
    fn record_persists_progress() {
        let path = temp_path("status.json");
        fs::write(&path, r#"{"1": "approved"}"#).unwrap();
        let mut args = base_args();
        args.skip_properties = true;
        args.status = Some(path.clone());
        args.record = Some("2 = pending_final".to_string());
        let report = build_report(&args).unwrap();
        assert_eq!(report.overview.statistics.overall.pending_final, 1);

        let saved = fs::read_to_string(&path).unwrap();
        assert!(saved.contains("\"2\""));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn record_argument_is_validated() {
        assert!(parse_record("no-separator").is_err());
        assert!(parse_record("=approved").is_err());
        assert!(parse_record("1=graduated").is_err());
        assert_eq!(
            parse_record(" 5 =completed").unwrap(),
            ("5", StatusValue::Approved)
        );
    }

    #[test]
    fn report_is_written_to_output_file() {
        let path = temp_path("report.md");
        let mut args = base_args();
        args.skip_properties = true;
        args.report = "markdown".to_string();
        args.output = Some(path.clone());
        let report = build_report(&args).unwrap();
        write_report(&args, &report, Instant::now()).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Study Plan Report: utn-sistemas"));
        fs::remove_file(&path).unwrap();
    }
}
