//! Blackout-date sheet fetching and parsing.
//!
//! The sheet is a published Google Sheets CSV with one row per resort. Column
//! headers after the resort column are named date ranges ("Name\nMon D - Mon
//! D"); a cell of `X` or `PARTIAL...` applies that range to the row's resort.
//! A trailing "Additional Blackout Dates" column carries free-text date lists.
//! The format is maintained by hand and changes between seasons, so all
//! parsing of it is isolated here.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::dates::{
    dates_in_range, filter_weekday, month_from_abbrev, parse_month_day, season_year,
    split_date_range,
};
use crate::store::fetch_sheet_csv;

pub const BLACKOUT_SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vTUXA5uhe2QwuQvCTpaSpIQmNNWIAp4gADGo5DIUeDwMOfgg9a8nEMU2K_4J9_24E2dGaLgbBnplpqg/pub?gid=1762546441&single=true&output=csv";

const RESORT_COLUMN: &str = "Resort";
const ADDITIONAL_COLUMN: &str = "Additional Blackout Dates";
const LEGEND_ROW: &str = "X = Blackout Date";

/// Blackout data for one resort, keyed by canonical name after mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlackoutInfo {
    pub named_ranges: Vec<String>,
    pub additional_dates: Vec<String>,
    pub all_blackout_dates: Vec<String>,
}

/// Sheet spelling -> canonical roster name. `None` marks names known to be
/// absent from the roster; they are dropped without a diagnostic.
pub fn blackout_name_map() -> HashMap<&'static str, Option<&'static str>> {
    HashMap::from([
        ("49° North", Some("49 Degrees North")),
        ("49° North Mountain Resort", Some("49 Degrees North")),
        ("Bear Valley", Some("Bear Valley Mountain Resort")),
        ("Beaver Mountain Ski Area", Some("Beaver Mountain")),
        ("Brundage Mountain", Some("Brundage Mountain Resort")),
        ("Crystal Mountain, MI", Some("Crystal Mountain")),
        ("Detroit Mountain Recreation Area", Some("Detroit Mountain")),
        ("Dodge Ridge Mountain Resort", Some("Dodge Ridge")),
        ("Hochzeiger Pitztal", Some("Hochzeiger Bergbahnen Pitztal AG")),
        ("Hoodoo Ski Area", Some("Hoodoo")),
        ("Hyland Hills Ski Area", Some("Hyland Hills")),
        ("Kelly Canyon Resort", Some("Kelly Canyon")),
        ("Levi Ski Resort", Some("Levi, Finland")),
        ("Manning Park Resort", Some("Manning Park")),
        ("Manning Park Resort Nordic Centre", Some("Manning Park XC")),
        ("Meadowlark Ski Lodge", Some("Meadowlark Ski Resort")),
        ("Mohawk Mountain Ski Area", Some("Mohawk Mountain")),
        ("Mont Ripley", Some("Mont Ripley Ski Area")),
        ("Mountain High Resort", Some("Mountain High")),
        ("Mt. La Crosse", Some("Mt La Crosse")),
        ("Mt. Shasta Ski Park", Some("Mt. Shasta")),
        ("Mt. Washington Alpine Resort", Some("Mt. Washington")),
        ("Nub's Nob Ski Area", Some("Nubs Nob")),
        ("Owl's Head", Some("Destination Owls Head")),
        ("Peek'n Peak Resort", Some("Peek \u{2018}n Peak")),
        ("Ragged Mountain Resort", Some("Ragged Mountain")),
        ("Schuss Mountain Shanty Creek", Some("Schuss Mountain at Shanty Creek")),
        ("Shawnee Mountain", Some("Shawnee Mountain Ski Area")),
        ("Ski Big Bear at Masthope Mountain", Some("Ski Big Bear")),
        ("Sundown Mountain Resort", Some("Sundown Mountain")),
        ("Terry Peak Ski Area", Some("Terry Peak")),
        ("Tree Tops Ski Resort", Some("Treetops Resort")),
        ("Tussey Mountain Ski Area", Some("Tussey Mountain")),
        ("Waterville Valley", Some("Waterville Valley Resort")),
        ("White Pass Ski Area", Some("White Pass")),
        // Sheet names with no roster counterpart.
        ("Buck Hill", None),
        ("Sunrise Park", None),
        ("Swiss Valley Ski & Snowboard Area", None),
        ("X = Blackout Date", None),
    ])
}

fn dash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*-\s*").unwrap())
}

fn numeric_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2}/\d{1,2}(?:/\d{2,4})?)\s*-\s*(\d{1,2}/\d{1,2}(?:/\d{2,4})?)$")
            .unwrap()
    })
}

/// The month abbreviation the part starts with, if any ("Jan 2 - 5" -> "Jan").
fn month_prefix(s: &str) -> Option<&'static str> {
    const ABBREVS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    let token = s.split_whitespace().next()?;
    let month = month_from_abbrev(token)?;
    Some(ABBREVS[month as usize - 1])
}

/// Parse a numeric date like "12/25", "1/2/26", or "1/2/2026". Two-digit
/// years are 20xx; a missing year falls back to `default_year` or the season
/// pivot.
fn parse_numeric_date(s: &str, default_year: Option<i32>) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.trim().split('/').collect();
    if parts.len() < 2 {
        return None;
    }
    let month: u32 = parts[0].parse().ok()?;
    let day: u32 = parts[1].parse().ok()?;
    let year = if parts.len() == 3 {
        let y: i32 = parts[2].parse().ok()?;
        if y < 100 {
            y + 2000
        } else {
            y
        }
    } else {
        default_year.unwrap_or_else(|| season_year(month))
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Expand a numeric part ("12/25" or "12/20 - 1/5") into dates. A yearless
/// range start inherits the end's year.
fn expand_numeric_part(part: &str) -> Vec<NaiveDate> {
    let cleaned = part.split('.').next().unwrap_or("").trim();
    if cleaned.is_empty() {
        return Vec::new();
    }

    if let Some(caps) = numeric_range_re().captures(cleaned) {
        let start_raw = &caps[1];
        let end_raw = &caps[2];
        let Some(end) = parse_numeric_date(end_raw, None) else {
            return Vec::new();
        };
        let start_year = if start_raw.split('/').count() == 3 {
            None
        } else {
            Some(end.year())
        };
        let Some(start) = parse_numeric_date(start_raw, start_year) else {
            return Vec::new();
        };
        return dates_in_range(start, end);
    }

    parse_numeric_date(cleaned, None).into_iter().collect()
}

fn season_weekend_dates(season_start: NaiveDate, season_end: NaiveDate) -> Vec<NaiveDate> {
    let all = dates_in_range(season_start, season_end);
    let mut weekend: BTreeSet<NaiveDate> = filter_weekday(&all, Weekday::Sat).into_iter().collect();
    weekend.extend(filter_weekday(&all, Weekday::Sun));
    weekend.into_iter().collect()
}

/// Normalize an "Additional Blackout Dates" cell into sorted unique dates.
///
/// Supports comma/semicolon lists of single dates ("Dec 25"), ranges
/// ("Jan 2 - Jan 5", "Jan 2 - 5"), numeric forms ("12/25", "1/2-1/5"),
/// month inheritance within a list ("Dec 20, 24 - 26"), and
/// weekends/Saturdays/Sundays text expanding across the season. Parts that
/// parse as nothing are dropped, never fatal.
pub fn normalize_additional_dates(
    text: &str,
    season_start: Option<NaiveDate>,
    season_end: Option<NaiveDate>,
) -> Vec<NaiveDate> {
    let raw = text.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let raw_lower = raw.to_lowercase();
    if raw_lower.contains("weekend")
        || raw_lower.contains("saturday")
        || raw_lower.contains("sunday")
    {
        return match (season_start, season_end) {
            (Some(start), Some(end)) => season_weekend_dates(start, end),
            _ => Vec::new(),
        };
    }

    let mut out: BTreeSet<NaiveDate> = BTreeSet::new();
    let mut last_month: Option<&'static str> = None;

    for part in raw.replace(';', ",").split(',') {
        // Trailing sentences ("Dec 25. Subject to change") are cut at the
        // first period.
        let cleaned = part.split('.').next().unwrap_or("").trim();
        if cleaned.is_empty() {
            continue;
        }

        if cleaned.contains('/') {
            out.extend(expand_numeric_part(cleaned));
            continue;
        }

        let mut piece = cleaned.to_string();
        if month_prefix(&piece).is_none() {
            if let Some(lm) = last_month {
                if let Some((start_raw, end_raw)) = piece.split_once('-') {
                    let start_raw = start_raw.trim();
                    let end_raw = end_raw.trim();
                    let start = if !start_raw.is_empty() && month_prefix(start_raw).is_none() {
                        format!("{} {}", lm, start_raw)
                    } else {
                        start_raw.to_string()
                    };
                    let end = if !end_raw.is_empty() && month_prefix(end_raw).is_none() {
                        format!("{} {}", lm, end_raw)
                    } else {
                        end_raw.to_string()
                    };
                    piece = format!("{} - {}", start, end);
                } else {
                    piece = format!("{} {}", lm, piece);
                }
            }
        }

        if piece.contains('-') {
            let normalized = dash_re().replace_all(&piece, " - ").to_string();
            if let Ok((start, end)) = split_date_range(&normalized) {
                out.extend(dates_in_range(start, end));
            }
        } else if let Ok(date) = parse_month_day(&piece) {
            out.insert(date);
        }

        if let Some(m) = month_prefix(&piece) {
            last_month = Some(m);
        }
    }

    out.into_iter().collect()
}

struct NamedRangeColumn {
    index: usize,
    name: String,
    dates: Vec<NaiveDate>,
}

fn split_header(header: &str) -> Option<(&str, &str)> {
    if let Some(pair) = header.split_once('\n') {
        return Some(pair);
    }
    header.split_once("\\n")
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse the blackout sheet CSV into a per-resort map keyed by canonical name.
///
/// The name map is passed explicitly: sheet spelling -> `Some(canonical)` to
/// remap, `None` to drop. Unmapped names pass through unchanged (QA catches
/// those that match no roster entry).
pub fn parse_blackout_sheet(
    csv_text: &str,
    name_map: &HashMap<&str, Option<&str>>,
) -> Result<BTreeMap<String, BlackoutInfo>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(csv_text.as_bytes());
    let mut records = reader.records();

    let header_record = records
        .next()
        .context("blackout sheet is empty")?
        .context("failed to read blackout sheet header")?;

    // A blank leading header is the resort column.
    let headers: Vec<String> = header_record
        .iter()
        .map(|h| {
            let trimmed = h.trim();
            if trimmed.is_empty() {
                RESORT_COLUMN.to_string()
            } else {
                trimmed.to_string()
            }
        })
        .collect();

    let resort_col = headers
        .iter()
        .position(|h| h.as_str() == RESORT_COLUMN)
        .context("blackout sheet has no resort column")?;
    let additional_col = headers.iter().position(|h| h.as_str() == ADDITIONAL_COLUMN);

    let mut columns: Vec<NamedRangeColumn> = Vec::new();
    for (index, header) in headers.iter().enumerate() {
        if index == resort_col || Some(index) == additional_col {
            continue;
        }
        let Some((name, range_text)) = split_header(header) else {
            continue;
        };
        let range_text = dash_re().replace_all(range_text.trim(), " - ").to_string();
        let Ok((start, end)) = split_date_range(&range_text) else {
            eprintln!("Skipping blackout column with unparseable range: {:?}", header);
            continue;
        };
        let mut dates = dates_in_range(start, end);

        let name = name.trim().to_string();
        let lowered = name.to_lowercase();
        if lowered.starts_with("peak satur") {
            dates = filter_weekday(&dates, Weekday::Sat);
        } else if lowered.starts_with("peak sund") {
            dates = filter_weekday(&dates, Weekday::Sun);
        }

        columns.push(NamedRangeColumn { index, name, dates });
    }

    let all_named: Vec<NaiveDate> = columns.iter().flat_map(|c| c.dates.clone()).collect();
    let season_start = all_named.iter().min().copied();
    let season_end = all_named.iter().max().copied();

    let mut resort_map = BTreeMap::new();
    for record in records {
        let record = record.context("failed to read blackout sheet row")?;
        let raw_name = record.get(resort_col).unwrap_or("").trim();
        if raw_name.is_empty() || raw_name == LEGEND_ROW {
            continue;
        }
        let name = match name_map.get(raw_name) {
            Some(None) => continue,
            Some(Some(mapped)) => mapped.to_string(),
            None => raw_name.to_string(),
        };

        let mut named_applied: Vec<String> = Vec::new();
        let mut all_dates: BTreeSet<NaiveDate> = BTreeSet::new();
        for column in &columns {
            let cell = record.get(column.index).unwrap_or("").trim().to_uppercase();
            if cell == "X" || cell.starts_with("PARTIAL") {
                named_applied.push(column.name.clone());
                all_dates.extend(column.dates.iter().copied());
            }
        }

        let additional_text = additional_col
            .and_then(|col| record.get(col))
            .unwrap_or("");
        let additional = normalize_additional_dates(additional_text, season_start, season_end);
        all_dates.extend(additional.iter().copied());

        named_applied.sort();
        resort_map.insert(
            name,
            BlackoutInfo {
                named_ranges: named_applied,
                additional_dates: additional.into_iter().map(iso).collect(),
                all_blackout_dates: all_dates.into_iter().map(iso).collect(),
            },
        );
    }

    Ok(resort_map)
}

/// Raw resort names from the sheet, in sheet order, before any mapping.
/// The legend row is not a resort and is excluded.
pub fn sheet_resort_names(csv_text: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(csv_text.as_bytes());
    let mut records = reader.records();

    let header_record = records
        .next()
        .context("blackout sheet is empty")?
        .context("failed to read blackout sheet header")?;
    let resort_col = header_record
        .iter()
        .position(|h| {
            let trimmed = h.trim();
            trimmed.is_empty() || trimmed == RESORT_COLUMN
        })
        .context("blackout sheet has no resort column")?;

    let mut names = Vec::new();
    for record in records {
        let record = record.context("failed to read blackout sheet row")?;
        let name = record.get(resort_col).unwrap_or("").trim();
        if !name.is_empty() && name != LEGEND_ROW {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// How the sheet's raw names reconcile against the name map and the roster.
#[derive(Debug, Default, PartialEq)]
pub struct BlackoutNameQa {
    pub raw_count: usize,
    pub used_count: usize,
    /// Raw names explicitly mapped to `None`, sorted.
    pub ignored: Vec<String>,
    /// (sheet spelling, canonical name) pairs, sorted by sheet spelling.
    pub remapped: Vec<(String, String)>,
    /// Names still absent from the roster after mapping, sorted.
    pub unmatched: Vec<String>,
}

pub fn blackout_name_qa(
    raw_names: &[String],
    name_map: &HashMap<&str, Option<&str>>,
    roster_names: &[String],
) -> BlackoutNameQa {
    let roster: BTreeSet<&str> = roster_names.iter().map(|s| s.as_str()).collect();
    let mut ignored: Vec<String> = Vec::new();
    let mut remapped: Vec<(String, String)> = Vec::new();
    let mut used: BTreeSet<String> = BTreeSet::new();

    for raw in raw_names {
        match name_map.get(raw.as_str()) {
            Some(None) => ignored.push(raw.clone()),
            Some(Some(mapped)) => {
                remapped.push((raw.clone(), mapped.to_string()));
                used.insert(mapped.to_string());
            }
            None => {
                used.insert(raw.clone());
            }
        }
    }

    ignored.sort();
    remapped.sort_by_key(|(raw, _)| raw.to_lowercase());
    let unmatched: Vec<String> = used
        .iter()
        .filter(|name| !roster.contains(name.as_str()))
        .cloned()
        .collect();

    BlackoutNameQa {
        raw_count: raw_names.len(),
        used_count: used.len(),
        ignored,
        remapped,
        unmatched,
    }
}

/// QA report on blackout sheet names: counts, explicitly ignored names,
/// remapped pairs, and anything left unmatched against the roster.
/// Unmatched names are reported, never guessed.
pub fn print_blackout_qa(qa: &BlackoutNameQa, roster_count: usize) {
    println!(
        "Blackout sheet: {} raw names, {} used after mapping, {} roster resorts",
        qa.raw_count, qa.used_count, roster_count
    );
    if !qa.ignored.is_empty() {
        println!("Ignored names (explicitly mapped to none):");
        for name in &qa.ignored {
            println!("- {}", name);
        }
    }
    if !qa.remapped.is_empty() {
        println!("Remapped names (sheet -> roster):");
        for (raw, mapped) in &qa.remapped {
            println!("- {} -> {}", raw, mapped);
        }
    }
    if qa.unmatched.is_empty() {
        println!("All blackout sheet names match the roster");
    } else {
        eprintln!("Blackout sheet names with no roster match:");
        for name in &qa.unmatched {
            eprintln!("- {}", name);
        }
    }
}

/// Step 3: fetch the blackout sheet live, write the raw CSV, and report name
/// QA against the roster when it is available.
pub fn run_fetch_blackout_dates(data_dir: &Path) -> Result<()> {
    println!("Fetching blackout dates sheet");
    let csv_text = fetch_sheet_csv(BLACKOUT_SHEET_URL)?;

    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
    let raw_path = data_dir.join("blackout_dates_raw.csv");
    fs::write(&raw_path, &csv_text)
        .with_context(|| format!("failed to write {}", raw_path.display()))?;

    let name_map = blackout_name_map();
    let blackout_map = parse_blackout_sheet(&csv_text, &name_map)?;
    println!("Parsed blackout info for {} resorts", blackout_map.len());

    let roster_path = data_dir.join("resorts_raw.json");
    if roster_path.exists() {
        let roster_json = fs::read_to_string(&roster_path)?;
        let roster: BTreeMap<String, crate::types::ResortStub> =
            serde_json::from_str(&roster_json)
                .with_context(|| format!("failed to parse {}", roster_path.display()))?;
        let names: Vec<String> = roster.values().filter_map(|s| s.name.clone()).collect();
        let raw_names = sheet_resort_names(&csv_text)?;
        let qa = blackout_name_qa(&raw_names, &name_map, &names);
        print_blackout_qa(&qa, names.len());
    } else {
        println!("Roster not scraped yet, skipping blackout name QA");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn no_map() -> HashMap<&'static str, Option<&'static str>> {
        HashMap::new()
    }

    // One header uses a literal backslash-n (as the CSV export writes it),
    // the other a real quoted newline; both forms appear in the wild.
    const SHEET: &str = "\
,Holiday Peak\\nDec 26 - Jan 1,\"Peak Saturdays\nJan 3 - Feb 28\",Additional Blackout Dates\n\
Resort A,X,,\"Dec 25, Feb 14 - 16\"\n\
Resort B,PARTIAL (see site),X,\n\
Old Name,,,12/25\n\
Ghost Resort,X,,\n\
X = Blackout Date,,,\n";

    fn mapped() -> HashMap<&'static str, Option<&'static str>> {
        HashMap::from([("Old Name", Some("New Name")), ("Ghost Resort", None)])
    }

    #[test]
    fn test_named_ranges_and_cells() {
        let map = parse_blackout_sheet(SHEET, &no_map()).unwrap();

        let a = &map["Resort A"];
        assert_eq!(a.named_ranges, vec!["Holiday Peak"]);
        // Dec 26 through Jan 1 inclusive, plus the additional dates.
        assert!(a.all_blackout_dates.contains(&"2025-12-26".to_string()));
        assert!(a.all_blackout_dates.contains(&"2026-01-01".to_string()));
        assert!(a.all_blackout_dates.contains(&"2025-12-25".to_string()));
        assert_eq!(
            a.additional_dates,
            vec!["2025-12-25", "2026-02-14", "2026-02-15", "2026-02-16"]
        );

        let b = &map["Resort B"];
        // PARTIAL applies the range just like X.
        assert_eq!(b.named_ranges, vec!["Holiday Peak", "Peak Saturdays"]);
        // The Saturday filter kept only Saturdays from the second range.
        assert!(b.all_blackout_dates.contains(&"2026-01-03".to_string()));
        assert!(!b.all_blackout_dates.contains(&"2026-01-05".to_string()));
    }

    #[test]
    fn test_legend_row_dropped_and_names_mapped() {
        let map = parse_blackout_sheet(SHEET, &mapped()).unwrap();
        assert!(!map.contains_key("X = Blackout Date"));
        assert!(!map.contains_key("Ghost Resort")); // explicit ignore
        assert!(!map.contains_key("Old Name"));
        assert!(map.contains_key("New Name")); // remapped
        assert_eq!(map["New Name"].additional_dates, vec!["2025-12-25"]);
    }

    #[test]
    fn test_additional_dates_month_inheritance() {
        let dates = normalize_additional_dates("Dec 20, 24 - 26, Jan 1", None, None);
        assert_eq!(
            dates,
            vec![
                ymd(2025, 12, 20),
                ymd(2025, 12, 24),
                ymd(2025, 12, 25),
                ymd(2025, 12, 26),
                ymd(2026, 1, 1),
            ]
        );
    }

    #[test]
    fn test_additional_dates_numeric_forms() {
        assert_eq!(
            normalize_additional_dates("12/25; 1/2-1/3", None, None),
            vec![ymd(2025, 12, 25), ymd(2026, 1, 2), ymd(2026, 1, 3)]
        );
        // Explicit years, two- and four-digit.
        assert_eq!(
            normalize_additional_dates("12/25/25, 1/1/2026", None, None),
            vec![ymd(2025, 12, 25), ymd(2026, 1, 1)]
        );
        // A yearless range start inherits the end's year.
        assert_eq!(
            normalize_additional_dates("12/30 - 12/31/25", None, None),
            vec![ymd(2025, 12, 30), ymd(2025, 12, 31)]
        );
    }

    #[test]
    fn test_additional_dates_weekend_expansion() {
        let dates = normalize_additional_dates(
            "All weekends",
            Some(ymd(2026, 1, 1)),
            Some(ymd(2026, 1, 11)),
        );
        // Jan 3/4 and Jan 10/11 of 2026 are the weekend days in range.
        assert_eq!(
            dates,
            vec![ymd(2026, 1, 3), ymd(2026, 1, 4), ymd(2026, 1, 10), ymd(2026, 1, 11)]
        );
        // No season bounds means nothing to expand.
        assert!(normalize_additional_dates("Saturdays only", None, None).is_empty());
    }

    #[test]
    fn test_additional_dates_garbage_is_dropped() {
        assert!(normalize_additional_dates("", None, None).is_empty());
        assert!(normalize_additional_dates("TBD", None, None).is_empty());
        let dates = normalize_additional_dates("Dec 25, see website", None, None);
        assert_eq!(dates, vec![ymd(2025, 12, 25)]);
    }

    #[test]
    fn test_range_crossing_new_year_in_header() {
        let map = parse_blackout_sheet(SHEET, &no_map()).unwrap();
        let a = &map["Resort A"];
        let expected: Vec<String> = dates_in_range(ymd(2025, 12, 26), ymd(2026, 1, 1))
            .into_iter()
            .map(iso)
            .collect();
        for d in expected {
            assert!(a.all_blackout_dates.contains(&d));
        }
    }

    #[test]
    fn test_sheet_resort_names_skips_legend_row() {
        let names = sheet_resort_names(SHEET).unwrap();
        assert_eq!(names, vec!["Resort A", "Resort B", "Old Name", "Ghost Resort"]);
    }

    #[test]
    fn test_qa_reports_ignored_remapped_and_unmatched() {
        let raw = sheet_resort_names(SHEET).unwrap();
        let roster = vec!["Resort A".to_string(), "New Name".to_string()];
        let qa = blackout_name_qa(&raw, &mapped(), &roster);

        assert_eq!(qa.raw_count, 4);
        // Resort A, Resort B, and the remap target New Name survive mapping.
        assert_eq!(qa.used_count, 3);
        assert_eq!(qa.ignored, vec!["Ghost Resort"]);
        assert_eq!(
            qa.remapped,
            vec![("Old Name".to_string(), "New Name".to_string())]
        );
        assert_eq!(qa.unmatched, vec!["Resort B"]);

        print_blackout_qa(&qa, roster.len());
    }
}
