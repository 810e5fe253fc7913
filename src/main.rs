use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::Path;

mod blackout;
mod dates;
mod geocode;
mod prep;
mod rankings;
mod reservations;
mod resorts;
mod store;
mod types;

use store::{CacheStore, PageClient};

pub const CACHE_DIR: &str = "cache";
pub const DATA_DIR: &str = "data";

#[derive(Parser)]
#[command(name = "indy-pipeline")]
#[command(about = "Indy Pass resort data refresh pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Full refresh: clear cached pages and regenerate everything
    #[arg(long)]
    full: bool,

    /// Run only the named steps (comma-separated)
    #[arg(long, value_delimiter = ',')]
    steps: Option<Vec<String>>,

    /// Regenerate the geocode cache even when it exists
    #[arg(long)]
    force_geocode: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove generated data artifacts (keeps the page cache)
    Clean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    ScrapeResorts,
    ScrapeReservations,
    FetchBlackoutDates,
    FetchPeakRankings,
    Geocode,
    Prep,
}

impl Step {
    /// Execution order is fixed; subsets still run in this order.
    const ALL: [Step; 6] = [
        Step::ScrapeResorts,
        Step::ScrapeReservations,
        Step::FetchBlackoutDates,
        Step::FetchPeakRankings,
        Step::Geocode,
        Step::Prep,
    ];

    fn name(self) -> &'static str {
        match self {
            Step::ScrapeResorts => "scrape_resorts",
            Step::ScrapeReservations => "scrape_reservations",
            Step::FetchBlackoutDates => "fetch_blackout_dates",
            Step::FetchPeakRankings => "fetch_peak_rankings",
            Step::Geocode => "geocode",
            Step::Prep => "prep",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Step::ScrapeResorts => "scrape the resort index and detail pages",
            Step::ScrapeReservations => "parse reservation requirements",
            Step::FetchBlackoutDates => "fetch and parse the blackout dates sheet",
            Step::FetchPeakRankings => "fetch the Peak Rankings sheet",
            Step::Geocode => "resolve resort locations",
            Step::Prep => "assemble resorts.csv",
        }
    }

    fn from_name(name: &str) -> Option<Step> {
        Step::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Artifacts (relative to the data dir) that must exist before the step
    /// can run.
    fn required_artifacts(self) -> &'static [&'static str] {
        match self {
            Step::ScrapeResorts
            | Step::ScrapeReservations
            | Step::FetchBlackoutDates
            | Step::FetchPeakRankings => &[],
            Step::Geocode => &["resorts_raw.json"],
            Step::Prep => &[
                "resorts_raw.json",
                "reservations_raw.json",
                "blackout_dates_raw.csv",
                "peak_rankings_raw.csv",
                "resort_locations.csv",
            ],
        }
    }
}

/// The step whose run produces the given artifact, for error hints.
fn producer_of(artifact: &str) -> Option<Step> {
    match artifact {
        "resorts_raw.json" => Some(Step::ScrapeResorts),
        "reservations_raw.json" => Some(Step::ScrapeReservations),
        "blackout_dates_raw.csv" => Some(Step::FetchBlackoutDates),
        "peak_rankings_raw.csv" => Some(Step::FetchPeakRankings),
        "resort_locations.csv" => Some(Step::Geocode),
        _ => None,
    }
}

/// Resolve a requested step subset against the registry. Unknown names are an
/// error; the subset always runs in registry order, with a warning when the
/// requested order differed.
fn select_steps(requested: &[String]) -> Result<Vec<Step>> {
    let mut parsed = Vec::new();
    for name in requested {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let step = Step::from_name(name).with_context(|| {
            let valid: Vec<&str> = Step::ALL.iter().map(|s| s.name()).collect();
            format!("unknown step '{}' (valid steps: {})", name, valid.join(", "))
        })?;
        if !parsed.contains(&step) {
            parsed.push(step);
        }
    }
    if parsed.is_empty() {
        bail!("--steps was given but named no steps");
    }

    let ordered: Vec<Step> = Step::ALL
        .into_iter()
        .filter(|s| parsed.contains(s))
        .collect();
    if ordered != parsed {
        eprintln!("Warning: steps reordered to pipeline order");
    }
    Ok(ordered)
}

fn check_prerequisites(step: Step, data_dir: &Path) -> Result<()> {
    for artifact in step.required_artifacts() {
        let path = data_dir.join(artifact);
        if !path.exists() {
            let hint = producer_of(artifact)
                .map(|s| format!(" (produced by the '{}' step)", s.name()))
                .unwrap_or_default();
            bail!(
                "step '{}' requires missing artifact {}{}",
                step.name(),
                path.display(),
                hint
            );
        }
    }
    Ok(())
}

fn write_pipeline_metadata(data_dir: &Path, full: bool, steps: &[Step]) -> Result<()> {
    let metadata = serde_json::json!({
        "completed_at": chrono::Utc::now().to_rfc3339(),
        "mode": if full { "full" } else { "incremental" },
        "steps": steps.iter().map(|s| s.name()).collect::<Vec<_>>(),
    });
    let path = data_dir.join("pipeline_metadata.json");
    fs::write(&path, serde_json::to_string_pretty(&metadata)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn run_pipeline(steps: &[Step], full: bool, force_geocode: bool) -> Result<()> {
    let data_dir = Path::new(DATA_DIR);
    let client = PageClient::new(CacheStore::new(CACHE_DIR))?;

    for (i, step) in steps.iter().enumerate() {
        println!();
        println!(
            "--- Step {}/{}: {} ({}) ---",
            i + 1,
            steps.len(),
            step.name(),
            step.description()
        );
        check_prerequisites(*step, data_dir)?;

        match step {
            Step::ScrapeResorts => resorts::run_scrape_resorts(&client, data_dir, full),
            Step::ScrapeReservations => {
                reservations::run_scrape_reservations(&client, data_dir, full)
            }
            Step::FetchBlackoutDates => blackout::run_fetch_blackout_dates(data_dir),
            Step::FetchPeakRankings => rankings::run_fetch_peak_rankings(data_dir),
            Step::Geocode => geocode::run_geocode(data_dir, full, force_geocode),
            Step::Prep => prep::run_prep(data_dir),
        }
        .with_context(|| format!("step '{}' failed", step.name()))?;
    }

    write_pipeline_metadata(data_dir, full, steps)?;
    println!();
    println!("Pipeline complete ({} steps)", steps.len());
    Ok(())
}

fn run_clean() -> Result<()> {
    println!("Cleaning generated data...");
    let data_path = Path::new(DATA_DIR);
    if data_path.exists() {
        fs::remove_dir_all(data_path)?;
        println!("  Removed {}/", DATA_DIR);
    }
    println!("Clean complete");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Clean) = cli.command {
        return run_clean();
    }

    let steps = match &cli.steps {
        Some(requested) => select_steps(requested)?,
        None => Step::ALL.to_vec(),
    };
    run_pipeline(&steps, cli.full, cli.force_geocode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(steps: &[Step]) -> Vec<&'static str> {
        steps.iter().map(|s| s.name()).collect()
    }

    #[test]
    fn test_step_names_round_trip() {
        for step in Step::ALL {
            assert_eq!(Step::from_name(step.name()), Some(step));
        }
        assert_eq!(Step::from_name("nope"), None);
    }

    #[test]
    fn test_select_steps_reorders_to_registry_order() {
        let steps = select_steps(&[
            "prep".to_string(),
            "scrape_resorts".to_string(),
            "geocode".to_string(),
        ])
        .unwrap();
        assert_eq!(names(&steps), vec!["scrape_resorts", "geocode", "prep"]);
    }

    #[test]
    fn test_select_steps_rejects_unknown() {
        let err = select_steps(&["scrape_resorts".to_string(), "bogus".to_string()]).unwrap_err();
        assert!(err.to_string().contains("bogus"));
        assert!(select_steps(&[]).is_err());
    }

    #[test]
    fn test_select_steps_dedupes() {
        let steps = select_steps(&["prep".to_string(), "prep".to_string()]).unwrap();
        assert_eq!(names(&steps), vec!["prep"]);
    }

    #[test]
    fn test_every_prep_prerequisite_has_a_producer() {
        for artifact in Step::Prep.required_artifacts() {
            assert!(producer_of(artifact).is_some(), "no producer for {}", artifact);
        }
    }

    #[test]
    fn test_check_prerequisites_names_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_prerequisites(Step::Geocode, dir.path()).unwrap_err();
        assert!(err.to_string().contains("resorts_raw.json"));
        assert!(err.to_string().contains("scrape_resorts"));
    }
}
