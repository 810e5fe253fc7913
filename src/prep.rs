//! Final merge: joins the scraped roster, detail pages, reservations,
//! blackout dates, rankings, and the location cache into `resorts.csv`.
//!
//! The output is fully rebuilt on every run and sorted by slug, so unchanged
//! inputs produce a byte-identical file.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::blackout::{blackout_name_map, parse_blackout_sheet, BlackoutInfo};
use crate::geocode::{load_location_cache, LOCATIONS_FILE};
use crate::rankings::{parse_peak_rankings, rankings_name_map, RankingEntry};
use crate::reservations::ReservationsFile;
use crate::resorts::BASE_URL;
use crate::types::{LocationRecord, ReservationRecord, ResortDetail, ResortStub};

const FEET_PER_METER: f64 = 0.3048;
const NULL_TOOLTIP: &str = "---";

/// One row of the final table. Field order is the CSV column order; the
/// column set is fixed and every null is written as an empty field.
#[derive(Debug, Serialize)]
pub struct ResortRow {
    pub slug: String,
    pub name: Option<String>,
    pub location_name: Option<String>,
    pub description: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub indy_page: String,
    pub website: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub vertical: Option<u32>,
    pub vertical_meters: Option<u32>,
    pub has_alpine: bool,
    pub has_cross_country: bool,
    pub is_allied: Option<bool>,
    pub acres: Option<u32>,
    pub num_trails: Option<u32>,
    pub trail_length_mi: Option<u32>,
    pub trail_length_km: Option<u32>,
    pub num_lifts: Option<u32>,
    pub vertical_base_ft: Option<u32>,
    pub vertical_summit_ft: Option<u32>,
    pub vertical_elevation_ft: Option<u32>,
    pub has_night_skiing: Option<bool>,
    pub has_terrain_parks: Option<bool>,
    pub is_dog_friendly: bool,
    pub has_snowshoeing: bool,
    pub difficulty_beginner: Option<u32>,
    pub difficulty_intermediate: Option<u32>,
    pub difficulty_advanced: Option<u32>,
    pub snowfall_average_in: Option<u32>,
    pub snowfall_high_in: Option<u32>,
    pub reservation_status: String,
    pub reservation_url: Option<String>,
    pub blackout_named_ranges: String,
    pub blackout_additional_dates: String,
    pub blackout_all_dates: String,
    pub blackout_count: usize,
    pub pr_snow: Option<f64>,
    pub pr_size: Option<f64>,
    pub pr_challenge: Option<f64>,
    pub pr_lifts: Option<f64>,
    pub pr_total: Option<f64>,
    pub pr_overall_rank: Option<u32>,
    pub pr_regional_rank: Option<u32>,
    pub pr_region: Option<String>,
    pub has_alpine_display: String,
    pub has_cross_country_display: String,
    pub has_night_skiing_display: Option<String>,
    pub has_terrain_parks_display: Option<String>,
    pub is_allied_display: Option<String>,
    pub is_dog_friendly_display: String,
    pub has_snowshoeing_display: String,
    pub acres_tt: String,
    pub vertical_tt: String,
    pub num_trails_tt: String,
    pub num_lifts_tt: String,
}

fn yes_no(value: bool) -> String {
    if value { "Yes" } else { "No" }.to_string()
}

/// Alpine terrain unless the card flags say cross-country only; the hybrid
/// alpine-xc flag always counts as alpine.
fn has_alpine(stub: &ResortStub) -> bool {
    let nordic = stub.is_nordic.unwrap_or(false);
    let alpine_xc = stub.is_alpine_xc.unwrap_or(false);
    let xc_only = stub.is_xc_only.unwrap_or(false);
    (!nordic && !alpine_xc && !xc_only) || alpine_xc
}

fn build_row(
    stub: &ResortStub,
    detail: &ResortDetail,
    location: Option<&LocationRecord>,
    reservation: Option<&ReservationRecord>,
    blackout: Option<&BlackoutInfo>,
    ranking: Option<&RankingEntry>,
) -> Result<ResortRow> {
    let slug = detail.slug.clone();
    let name = detail.name.clone().or_else(|| stub.name.clone());

    let indy_page = match stub.href.as_deref() {
        Some(href) => format!("{}{}", BASE_URL, href),
        None => "n/a".to_string(),
    };

    // The scraped card coordinates are authoritative; geocoded coordinates
    // fill in only when the card had none.
    let latitude = stub
        .coordinates
        .map(|c| c.latitude)
        .or(location.and_then(|l| l.latitude));
    let longitude = stub
        .coordinates
        .map(|c| c.longitude)
        .or(location.and_then(|l| l.longitude));

    let vertical = stub.vertical;
    let vertical_meters = vertical.map(|v| (v as f64 * FEET_PER_METER) as u32);

    let alpine = has_alpine(stub);
    let cross_country = stub.is_nordic.unwrap_or(false);

    let reservation_status = reservation
        .map(|r| r.reservation_status)
        .unwrap_or_default();

    let (blackout_named, blackout_additional, blackout_all, blackout_count) = match blackout {
        Some(info) => (
            info.named_ranges.join(","),
            serde_json::to_string(&info.additional_dates)?,
            serde_json::to_string(&info.all_blackout_dates)?,
            info.all_blackout_dates.len(),
        ),
        None => (String::new(), "[]".to_string(), "[]".to_string(), 0),
    };

    let ranking = ranking.cloned().unwrap_or_default();

    Ok(ResortRow {
        slug,
        name,
        location_name: stub.location_name.clone(),
        description: detail.description.clone(),
        city: location.and_then(|l| l.city.clone()),
        state: location.and_then(|l| l.state.clone()),
        country: location.and_then(|l| l.country.clone()),
        indy_page,
        website: detail.website.clone(),
        latitude,
        longitude,
        vertical,
        vertical_meters,
        has_alpine: alpine,
        has_cross_country: cross_country,
        is_allied: stub.is_allied,
        acres: detail.acres,
        // Card counts win; detail-page parsing of cross-country resorts is
        // unreliable.
        num_trails: stub.num_trails,
        trail_length_mi: detail.trail_length_mi,
        trail_length_km: detail.trail_length_km,
        num_lifts: stub.num_lifts,
        vertical_base_ft: detail.vertical_base_ft,
        vertical_summit_ft: detail.vertical_summit_ft,
        vertical_elevation_ft: detail.vertical_elevation_ft,
        has_night_skiing: stub.is_open_nights,
        has_terrain_parks: stub.has_terrain_parks,
        is_dog_friendly: detail.is_dog_friendly,
        has_snowshoeing: detail.has_snowshoeing,
        difficulty_beginner: detail.difficulty_beginner,
        difficulty_intermediate: detail.difficulty_intermediate,
        difficulty_advanced: detail.difficulty_advanced,
        snowfall_average_in: detail.snowfall_average_in,
        snowfall_high_in: detail.snowfall_high_in,
        reservation_status: reservation_status.as_str().to_string(),
        reservation_url: reservation.and_then(|r| r.reservation_url.clone()),
        blackout_named_ranges: blackout_named,
        blackout_additional_dates: blackout_additional,
        blackout_all_dates: blackout_all,
        blackout_count,
        pr_snow: ranking.pr_snow,
        pr_size: ranking.pr_size,
        pr_challenge: ranking.pr_challenge,
        pr_lifts: ranking.pr_lifts,
        pr_total: ranking.pr_total,
        pr_overall_rank: ranking.pr_overall_rank,
        pr_regional_rank: ranking.pr_regional_rank,
        pr_region: ranking.pr_region,
        has_alpine_display: yes_no(alpine),
        has_cross_country_display: yes_no(cross_country),
        has_night_skiing_display: stub.is_open_nights.map(yes_no),
        has_terrain_parks_display: stub.has_terrain_parks.map(yes_no),
        is_allied_display: stub.is_allied.map(yes_no),
        is_dog_friendly_display: yes_no(detail.is_dog_friendly),
        has_snowshoeing_display: yes_no(detail.has_snowshoeing),
        acres_tt: detail
            .acres
            .map(|a| format!("{} acres", a))
            .unwrap_or_else(|| NULL_TOOLTIP.to_string()),
        vertical_tt: match (vertical, vertical_meters) {
            (Some(ft), Some(m)) => format!("{} ft / {} m", ft, m),
            _ => NULL_TOOLTIP.to_string(),
        },
        num_trails_tt: stub
            .num_trails
            .map(|n| n.to_string())
            .unwrap_or_else(|| NULL_TOOLTIP.to_string()),
        num_lifts_tt: stub
            .num_lifts
            .map(|n| n.to_string())
            .unwrap_or_else(|| NULL_TOOLTIP.to_string()),
    })
}

fn report_unmatched(source: &str, names: &BTreeSet<String>, roster: &BTreeSet<String>) {
    let unmatched: Vec<&String> = names.iter().filter(|n| !roster.contains(*n)).collect();
    if !unmatched.is_empty() {
        eprintln!("{} names with no roster match:", source);
        for name in unmatched {
            eprintln!("- {}", name);
        }
    }
}

/// Step 6: assemble `resorts.csv` from all intermediate artifacts. Every
/// indexed resort with a detail page produces exactly one row; a duplicate
/// slug is a fatal schema violation.
pub fn run_prep(data_dir: &Path) -> Result<()> {
    let roster_path = data_dir.join("resorts_raw.json");
    let roster_json = fs::read_to_string(&roster_path)
        .with_context(|| format!("failed to read {}", roster_path.display()))?;
    let roster: BTreeMap<String, ResortStub> = serde_json::from_str(&roster_json)
        .with_context(|| format!("failed to parse {}", roster_path.display()))?;

    let reservations_path = data_dir.join("reservations_raw.json");
    let reservations_json = fs::read_to_string(&reservations_path)
        .with_context(|| format!("failed to read {}", reservations_path.display()))?;
    let reservations: ReservationsFile = serde_json::from_str(&reservations_json)
        .with_context(|| format!("failed to parse {}", reservations_path.display()))?;
    let reservation_map: BTreeMap<String, ReservationRecord> = reservations
        .resorts
        .into_iter()
        .map(|r| (r.name.clone(), r))
        .collect();

    let blackout_path = data_dir.join("blackout_dates_raw.csv");
    let blackout_csv = fs::read_to_string(&blackout_path)
        .with_context(|| format!("failed to read {}", blackout_path.display()))?;
    let blackout_names = blackout_name_map();
    let blackout_map = parse_blackout_sheet(&blackout_csv, &blackout_names)?;

    let rankings_path = data_dir.join("peak_rankings_raw.csv");
    let rankings_csv = fs::read_to_string(&rankings_path)
        .with_context(|| format!("failed to read {}", rankings_path.display()))?;
    let ranking_names = rankings_name_map();
    let rankings_map = parse_peak_rankings(&rankings_csv, &ranking_names)?;

    let locations_path = data_dir.join(LOCATIONS_FILE);
    let location_cache = load_location_cache(&locations_path)?;

    let roster_names: BTreeSet<String> = roster
        .values()
        .filter_map(|s| s.name.clone())
        .collect();
    report_unmatched(
        "Reservation",
        &reservation_map.keys().cloned().collect(),
        &roster_names,
    );
    report_unmatched(
        "Blackout sheet",
        &blackout_map.keys().cloned().collect(),
        &roster_names,
    );
    report_unmatched(
        "Peak Rankings",
        &rankings_map.keys().cloned().collect(),
        &roster_names,
    );

    let detail_dir = data_dir.join("resorts");
    let mut rows: BTreeMap<String, ResortRow> = BTreeMap::new();
    for stub in roster.values() {
        let Some(slug) = stub.slug() else {
            eprintln!("Resort {} has no detail page href, skipping", stub.id);
            continue;
        };

        let detail_path = detail_dir.join(format!("{}.json", slug));
        let detail_json = fs::read_to_string(&detail_path)
            .with_context(|| format!("missing resort detail artifact {}", detail_path.display()))?;
        let detail: ResortDetail = serde_json::from_str(&detail_json)
            .with_context(|| format!("failed to parse {}", detail_path.display()))?;

        // Side-sources reconcile against the roster card spelling; the
        // detail-page title is display-only and can diverge from it.
        let roster_name = stub.name.clone().or_else(|| detail.name.clone());
        let location = stub
            .location_name
            .as_deref()
            .and_then(|l| location_cache.get(l));
        let reservation = roster_name.as_deref().and_then(|n| reservation_map.get(n));
        let blackout = roster_name.as_deref().and_then(|n| blackout_map.get(n));
        let ranking = roster_name.as_deref().and_then(|n| rankings_map.get(n));

        let row = build_row(stub, &detail, location, reservation, blackout, ranking)?;
        if rows.contains_key(&row.slug) {
            bail!("duplicate resort slug '{}' in roster", row.slug);
        }
        rows.insert(row.slug.clone(), row);
    }

    let out_path = data_dir.join("resorts.csv");
    let mut writer = csv::Writer::from_path(&out_path)
        .with_context(|| format!("failed to write {}", out_path.display()))?;
    for row in rows.values() {
        writer.serialize(row)?;
    }
    writer.flush()?;
    println!("Wrote {} resorts to {}", rows.len(), out_path.display());

    Ok(())
}
