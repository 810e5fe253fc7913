//! Shared data types for the pipeline artifacts.

use serde::{Deserialize, Serialize};

/// Latitude/longitude pair parsed from the index page's `POINT (lon lat)`
/// attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A resort card from the index page. Every field except the node id parses
/// defensively: missing or malformed card data becomes `None` rather than
/// failing the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResortStub {
    pub id: String,
    pub name: Option<String>,
    pub location_name: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub vertical: Option<u32>,
    pub is_nordic: Option<bool>,
    pub is_alpine_xc: Option<bool>,
    pub is_xc_only: Option<bool>,
    pub is_allied: Option<bool>,
    pub num_trails: Option<u32>,
    pub num_lifts: Option<u32>,
    pub is_open_nights: Option<bool>,
    pub has_terrain_parks: Option<bool>,
    pub href: Option<String>,
}

impl ResortStub {
    /// Detail-page slug, taken from the last segment of the card's href
    /// (e.g. "/our-resorts/bluewood" -> "bluewood").
    pub fn slug(&self) -> Option<&str> {
        self.href
            .as_deref()
            .and_then(|h| h.trim_end_matches('/').rsplit('/').next())
            .filter(|s| !s.is_empty())
    }
}

/// Parsed resort detail page. All numeric fields degrade to `None` when the
/// page text is missing or malformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResortDetail {
    pub id: String,
    pub slug: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub trails: Option<u32>,
    pub lifts: Option<u32>,
    pub acres: Option<u32>,
    pub trail_length_km: Option<u32>,
    pub trail_length_mi: Option<u32>,
    pub is_cross_country: bool,
    pub is_dog_friendly: bool,
    pub has_snowshoeing: bool,
    pub terrain_parks: Option<bool>,
    pub night_skiing: Option<bool>,
    pub vertical_base_ft: Option<u32>,
    pub vertical_summit_ft: Option<u32>,
    pub vertical_elevation_ft: Option<u32>,
    pub difficulty_beginner: Option<u32>,
    pub difficulty_intermediate: Option<u32>,
    pub difficulty_advanced: Option<u32>,
    pub snowfall_average_in: Option<u32>,
    pub snowfall_high_in: Option<u32>,
}

/// Reservation requirement for a resort. Absence from the reservations page
/// means no reservation is needed, so that is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReservationStatus {
    Required,
    Optional,
    #[default]
    #[serde(rename = "Not Required")]
    NotRequired,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Required => "Required",
            ReservationStatus::Optional => "Optional",
            ReservationStatus::NotRequired => "Not Required",
        }
    }
}

/// One entry in `reservations_raw.json`, keyed by canonical resort name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub name: String,
    pub reservation_status: ReservationStatus,
    pub reservation_url: Option<String>,
}

/// Geocoded location, persisted in `resort_locations.csv` keyed by the raw
/// location string so resorts sharing a location reuse one entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRecord {
    pub location_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl LocationRecord {
    /// A failed or empty geocode result. Null for this run; re-resolved only
    /// when the cache is regenerated.
    pub fn unresolved(location_name: impl Into<String>) -> Self {
        Self {
            location_name: location_name.into(),
            latitude: None,
            longitude: None,
            city: None,
            state: None,
            country: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_with_href(href: Option<&str>) -> ResortStub {
        ResortStub {
            id: "123".to_string(),
            name: Some("Test Resort".to_string()),
            location_name: None,
            coordinates: None,
            vertical: None,
            is_nordic: None,
            is_alpine_xc: None,
            is_xc_only: None,
            is_allied: None,
            num_trails: None,
            num_lifts: None,
            is_open_nights: None,
            has_terrain_parks: None,
            href: href.map(String::from),
        }
    }

    #[test]
    fn test_slug_from_href() {
        assert_eq!(
            stub_with_href(Some("/our-resorts/bluewood")).slug(),
            Some("bluewood")
        );
        assert_eq!(
            stub_with_href(Some("/our-resorts/bluewood/")).slug(),
            Some("bluewood")
        );
        assert_eq!(stub_with_href(None).slug(), None);
        assert_eq!(stub_with_href(Some("")).slug(), None);
    }

    #[test]
    fn test_reservation_status_labels() {
        assert_eq!(ReservationStatus::default(), ReservationStatus::NotRequired);
        assert_eq!(ReservationStatus::NotRequired.as_str(), "Not Required");
        let json = serde_json::to_string(&ReservationStatus::NotRequired).unwrap();
        assert_eq!(json, "\"Not Required\"");
        let parsed: ReservationStatus = serde_json::from_str("\"Required\"").unwrap();
        assert_eq!(parsed, ReservationStatus::Required);
    }
}
