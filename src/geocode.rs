//! Location normalization via the Google Maps Geocoding API, with a
//! persistent CSV cache.
//!
//! The API is metered, so the whole step is skipped when the cache file
//! already exists unless a full refresh or --force-geocode asks for it.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::types::{LocationRecord, ResortStub};

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const GEOCODE_DELAY_MS: u64 = 100;
pub const LOCATIONS_FILE: &str = "resort_locations.csv";

fn api_key() -> Result<String> {
    std::env::var("GOOGLE_MAPS_API_KEY")
        .context("GOOGLE_MAPS_API_KEY environment variable not set")
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Pull city/state/country and coordinates out of the first geocode result.
fn location_from_response(location_name: &str, response: GeocodeResponse) -> LocationRecord {
    let Some(first) = response.results.into_iter().next() else {
        return LocationRecord::unresolved(location_name);
    };

    let mut record = LocationRecord::unresolved(location_name);
    for component in first.address_components {
        if component.types.iter().any(|t| t == "locality") {
            record.city = Some(component.long_name.clone());
        }
        if component.types.iter().any(|t| t == "administrative_area_level_1") {
            record.state = Some(component.long_name.clone());
        }
        if component.types.iter().any(|t| t == "country") {
            record.country = Some(component.long_name.clone());
        }
    }
    if let Some(geometry) = first.geometry {
        record.latitude = Some(geometry.location.lat);
        record.longitude = Some(geometry.location.lng);
    }
    record
}

pub struct Geocoder {
    client: reqwest::blocking::Client,
    key: String,
}

impl Geocoder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: reqwest::blocking::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()?,
            key: api_key()?,
        })
    }

    /// Resolve one location string. Failures and empty results degrade to an
    /// all-null record for this run; there is no retry.
    pub fn resolve(&self, location_name: &str) -> LocationRecord {
        let response = self
            .client
            .get(GEOCODE_URL)
            .query(&[("address", location_name), ("key", self.key.as_str())])
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json::<GeocodeResponse>());

        match response {
            Ok(parsed) => {
                let record = location_from_response(location_name, parsed);
                if record.country.is_none() {
                    eprintln!("No geocode result for: {}", location_name);
                }
                record
            }
            Err(err) => {
                eprintln!("Geocode request failed for {}: {}", location_name, err);
                LocationRecord::unresolved(location_name)
            }
        }
    }
}

/// What the geocode step should do given the cache state and flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocodeAction {
    Skip,
    Regenerate,
    Generate,
}

pub fn geocode_action(full: bool, force: bool, cache_exists: bool) -> GeocodeAction {
    if !cache_exists {
        GeocodeAction::Generate
    } else if full || force {
        GeocodeAction::Regenerate
    } else {
        GeocodeAction::Skip
    }
}

/// Read the persisted location cache, keyed by the raw location string.
pub fn load_location_cache(path: &Path) -> Result<BTreeMap<String, LocationRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open location cache {}", path.display()))?;
    let mut cache = BTreeMap::new();
    for record in reader.deserialize() {
        let record: LocationRecord =
            record.with_context(|| format!("bad row in {}", path.display()))?;
        cache.insert(record.location_name.clone(), record);
    }
    Ok(cache)
}

fn write_location_cache(path: &Path, records: &[LocationRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to write location cache {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Step 5: geocode every distinct location string from the roster. Skipped
/// entirely when the cache exists and neither --full nor --force-geocode was
/// given, so incremental runs make zero API calls.
pub fn run_geocode(data_dir: &Path, full: bool, force: bool) -> Result<()> {
    let cache_path = data_dir.join(LOCATIONS_FILE);

    match geocode_action(full, force, cache_path.exists()) {
        GeocodeAction::Skip => {
            println!(
                "Location cache exists at {}, skipping geocode (use --force-geocode to regenerate)",
                cache_path.display()
            );
            return Ok(());
        }
        GeocodeAction::Regenerate => {
            println!("Regenerating location cache at {}", cache_path.display());
        }
        GeocodeAction::Generate => {
            println!("Generating location cache at {}", cache_path.display());
        }
    }

    let roster_path = data_dir.join("resorts_raw.json");
    let roster_json = fs::read_to_string(&roster_path)
        .with_context(|| format!("failed to read {}", roster_path.display()))?;
    let roster: BTreeMap<String, ResortStub> = serde_json::from_str(&roster_json)
        .with_context(|| format!("failed to parse {}", roster_path.display()))?;

    let locations: BTreeSet<String> = roster
        .values()
        .filter_map(|stub| stub.location_name.clone())
        .filter(|l| !l.is_empty())
        .collect();

    let geocoder = Geocoder::new()?;
    let total = locations.len();
    let mut records = Vec::with_capacity(total);
    for (i, location) in locations.iter().enumerate() {
        println!("[{:03}/{:03}] Geocoding: {}", i + 1, total, location);
        records.push(geocoder.resolve(location));
        std::thread::sleep(std::time::Duration::from_millis(GEOCODE_DELAY_MS));
    }

    write_location_cache(&cache_path, &records)?;
    println!("Wrote {} locations to {}", records.len(), cache_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_geocode_action() {
        assert_eq!(geocode_action(false, false, true), GeocodeAction::Skip);
        assert_eq!(geocode_action(true, false, true), GeocodeAction::Regenerate);
        assert_eq!(geocode_action(false, true, true), GeocodeAction::Regenerate);
        assert_eq!(geocode_action(false, false, false), GeocodeAction::Generate);
        assert_eq!(geocode_action(true, true, false), GeocodeAction::Generate);
    }

    #[test]
    fn test_location_from_response() {
        let json = r#"{
            "results": [{
                "address_components": [
                    {"long_name": "Dayton", "types": ["locality", "political"]},
                    {"long_name": "Washington", "types": ["administrative_area_level_1"]},
                    {"long_name": "United States", "types": ["country", "political"]}
                ],
                "geometry": {"location": {"lat": 46.32, "lng": -117.97}}
            }]
        }"#;
        let response: GeocodeResponse = serde_json::from_str(json).unwrap();
        let record = location_from_response("Dayton, WA", response);
        assert_eq!(record.city.as_deref(), Some("Dayton"));
        assert_eq!(record.state.as_deref(), Some("Washington"));
        assert_eq!(record.country.as_deref(), Some("United States"));
        assert_eq!(record.latitude, Some(46.32));
        assert_eq!(record.longitude, Some(-117.97));
    }

    #[test]
    fn test_empty_response_is_unresolved() {
        let response: GeocodeResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        let record = location_from_response("Nowhere", response);
        assert_eq!(record.location_name, "Nowhere");
        assert_eq!(record.city, None);
        assert_eq!(record.latitude, None);
    }

    #[test]
    fn test_location_cache_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(LOCATIONS_FILE);
        let records = vec![
            LocationRecord {
                location_name: "Dayton, WA".to_string(),
                latitude: Some(46.32),
                longitude: Some(-117.97),
                city: Some("Dayton".to_string()),
                state: Some("Washington".to_string()),
                country: Some("United States".to_string()),
            },
            LocationRecord::unresolved("Nowhere, XX"),
        ];
        write_location_cache(&path, &records).unwrap();

        let cache = load_location_cache(&path).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache["Dayton, WA"].city.as_deref(), Some("Dayton"));
        assert_eq!(cache["Nowhere, XX"].country, None);
    }
}
