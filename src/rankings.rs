//! Peak Rankings sheet fetching and parsing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use crate::store::fetch_sheet_csv;

pub const PEAK_RANKINGS_SHEET_URL: &str =
    "https://docs.google.com/spreadsheets/d/1YDRKdIro4IJTAK8iyTReSSAMFdyEAGsQxxCSGgxCw5I/gviz/tq?tqx=out:csv";

/// Peak Rankings scores for one resort, keyed by canonical name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub pr_snow: Option<f64>,
    pub pr_size: Option<f64>,
    pub pr_challenge: Option<f64>,
    pub pr_lifts: Option<f64>,
    pub pr_total: Option<f64>,
    pub pr_overall_rank: Option<u32>,
    pub pr_regional_rank: Option<u32>,
    pub pr_region: Option<String>,
}

/// Peak Rankings spelling -> canonical roster name.
pub fn rankings_name_map() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("Bear Valley", "Bear Valley Mountain Resort"),
        ("Big White", "Big White Ski Resort"),
        ("Bolton Valley", "Bolton Valley Resort"),
        ("Cannon", "Cannon Mountain"),
        ("Castle Mountain", "Castle Mountain Resort"),
        ("Jay Peak", "Jay Peak Resort"),
        ("Loveland", "Loveland Ski Area"),
        ("Mount Shasta Ski Park", "Mt. Shasta"),
        ("Peek'n Peak", "Peek \u{2018}n Peak"),
        ("Saddleback", "Saddleback Mountain"),
        ("Snow King", "Snow King Mountain Resort"),
        ("Waterville Valley", "Waterville Valley Resort"),
    ])
}

fn parse_score(cell: Option<&str>) -> Option<f64> {
    cell?.trim().parse().ok()
}

/// Rank columns are sometimes exported with a decimal point ("12.0").
fn parse_rank(cell: Option<&str>) -> Option<u32> {
    let text = cell?.trim();
    text.parse::<u32>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().map(|f| f as u32))
}

fn parse_text(cell: Option<&str>) -> Option<String> {
    let text = cell?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Parse the rankings CSV into a canonical-name keyed map.
pub fn parse_peak_rankings(
    csv_text: &str,
    name_map: &HashMap<&str, &str>,
) -> Result<BTreeMap<String, RankingEntry>> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let headers = reader
        .headers()
        .context("failed to read rankings header")?
        .clone();
    let col = |name: &str| headers.iter().position(|h| h.trim() == name);

    let name_col = col("name")
        .or_else(|| col("resort"))
        .context("rankings sheet has no resort name column")?;
    let snow_col = col("snow");
    let size_col = col("size");
    let challenge_col = col("challenge");
    let lifts_col = col("lifts");
    let total_col = col("Total");
    let overall_col = col("overallRank");
    let regional_col = col("regionalRank");
    let region_col = col("regionForRank");

    let cell = |record: &csv::StringRecord, idx: Option<usize>| -> Option<String> {
        idx.and_then(|i| record.get(i)).map(String::from)
    };

    let mut rankings = BTreeMap::new();
    for record in reader.records() {
        let record = record.context("failed to read rankings row")?;
        let raw_name = record.get(name_col).unwrap_or("").trim();
        if raw_name.is_empty() {
            continue;
        }
        let name = name_map
            .get(raw_name)
            .map(|n| n.to_string())
            .unwrap_or_else(|| raw_name.to_string());

        rankings.insert(
            name,
            RankingEntry {
                pr_snow: parse_score(cell(&record, snow_col).as_deref()),
                pr_size: parse_score(cell(&record, size_col).as_deref()),
                pr_challenge: parse_score(cell(&record, challenge_col).as_deref()),
                pr_lifts: parse_score(cell(&record, lifts_col).as_deref()),
                pr_total: parse_score(cell(&record, total_col).as_deref()),
                pr_overall_rank: parse_rank(cell(&record, overall_col).as_deref()),
                pr_regional_rank: parse_rank(cell(&record, regional_col).as_deref()),
                pr_region: parse_text(cell(&record, region_col).as_deref()),
            },
        );
    }

    Ok(rankings)
}

/// QA summary for rankings names against the scraped roster.
pub fn print_rankings_qa(rankings: &BTreeMap<String, RankingEntry>, roster_names: &[String]) {
    let roster: BTreeSet<&str> = roster_names.iter().map(|s| s.as_str()).collect();
    let matched = rankings.keys().filter(|n| roster.contains(n.as_str())).count();
    println!(
        "Peak Rankings: {}/{} sheet names matched the roster",
        matched,
        rankings.len()
    );
    let unmatched: Vec<&str> = rankings
        .keys()
        .map(|s| s.as_str())
        .filter(|n| !roster.contains(n))
        .collect();
    if !unmatched.is_empty() {
        eprintln!("Peak Rankings names with no roster match:");
        for name in unmatched {
            eprintln!("- {}", name);
        }
    }
}

/// Step 4: fetch the rankings sheet live and write the raw CSV.
pub fn run_fetch_peak_rankings(data_dir: &Path) -> Result<()> {
    println!("Fetching Peak Rankings sheet");
    let csv_text = fetch_sheet_csv(PEAK_RANKINGS_SHEET_URL)?;

    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
    let raw_path = data_dir.join("peak_rankings_raw.csv");
    fs::write(&raw_path, &csv_text)
        .with_context(|| format!("failed to write {}", raw_path.display()))?;

    let name_map = rankings_name_map();
    let rankings = parse_peak_rankings(&csv_text, &name_map)?;
    println!("Parsed rankings for {} resorts", rankings.len());

    let roster_path = data_dir.join("resorts_raw.json");
    if roster_path.exists() {
        let roster_json = fs::read_to_string(&roster_path)?;
        let roster: BTreeMap<String, crate::types::ResortStub> =
            serde_json::from_str(&roster_json)
                .with_context(|| format!("failed to parse {}", roster_path.display()))?;
        let names: Vec<String> = roster.values().filter_map(|s| s.name.clone()).collect();
        print_rankings_qa(&rankings, &names);
    }

    Ok(())
}
