//! Parses reservation requirements from the blackout/reservations page.

use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::resorts::BASE_URL;
use crate::store::{FetchPolicy, PageClient};
use crate::types::{ReservationRecord, ReservationStatus};

pub const RESERVATIONS_URL: &str = "https://www.indyskipass.com/blackout-dates-reservations";
pub const RESERVATIONS_CACHE_KEY: &str = "blackout-dates-reservations";

/// Wrapper matching the `reservations_raw.json` layout.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReservationsFile {
    pub resorts: Vec<ReservationRecord>,
}

/// Page spellings that differ from the roster's canonical names.
pub fn reservation_name_map() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("Berkshire East", "Berkshire East Mountain Resort"),
        ("Catamount", "Catamount Mountain Resort"),
        ("Detroit Mountain Recreation Area", "Detroit Mountain"),
        ("Greek Peak", "Greek Peak Mountain Resort"),
        ("Blacktail Mountain Ski Area", "Blacktail Mountain Resort"),
    ])
}

pub fn normalize_reservation_name(name: &str, name_map: &HashMap<&str, &str>) -> String {
    name_map
        .get(name)
        .map(|n| n.to_string())
        .unwrap_or_else(|| name.to_string())
}

fn clean_text(value: &str) -> String {
    value.replace('\u{a0}', " ").trim().to_string()
}

fn normalize_url(href: &str) -> Option<String> {
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    if href.starts_with('/') {
        Some(format!("{}{}", BASE_URL, href))
    } else {
        Some(format!("{}/{}", BASE_URL, href))
    }
}

fn parse_link_list(list: ElementRef) -> Vec<(String, Option<String>)> {
    let li_sel = Selector::parse("li").expect("invalid CSS selector");
    let a_sel = Selector::parse("a").expect("invalid CSS selector");

    let mut items = Vec::new();
    for li in list.select(&li_sel) {
        let anchor = li.select(&a_sel).next();
        let name = match anchor {
            Some(a) => clean_text(&a.text().collect::<String>()),
            None => clean_text(&li.text().collect::<String>()),
        };
        let url = anchor
            .and_then(|a| a.value().attr("href"))
            .and_then(normalize_url);
        if !name.is_empty() {
            items.push((name, url));
        }
    }
    items
}

/// Extract the required and optional reservation lists from the page.
///
/// The page layout is a "Reservations" heading followed by the required list,
/// then a "voluntary" sub-heading followed by the optional list. Walks the
/// headings and lists in document order.
pub fn parse_reservations_page(
    html: &str,
) -> (Vec<(String, Option<String>)>, Vec<(String, Option<String>)>) {
    let document = Html::parse_document(html);
    let flow_sel = Selector::parse("h2, h3, h4, ul").expect("invalid CSS selector");

    let mut required = None;
    let mut optional = None;
    let mut seen_reservations = false;
    let mut seen_voluntary = false;

    for node in document.select(&flow_sel) {
        match node.value().name() {
            "ul" => {
                if seen_voluntary && optional.is_none() {
                    optional = Some(parse_link_list(node));
                } else if seen_reservations && required.is_none() {
                    required = Some(parse_link_list(node));
                }
            }
            tag => {
                let text = clean_text(&node.text().collect::<String>()).to_lowercase();
                if !seen_reservations && text == "reservations" {
                    seen_reservations = true;
                } else if seen_reservations
                    && matches!(tag, "h3" | "h4")
                    && text.contains("voluntary")
                {
                    seen_voluntary = true;
                }
            }
        }
        if required.is_some() && optional.is_some() {
            break;
        }
    }

    (required.unwrap_or_default(), optional.unwrap_or_default())
}

/// Build the reservation records with canonical names. The name map is
/// passed explicitly, like the blackout parser's. A resort listed in both
/// sections keeps Required.
pub fn build_reservation_records(
    required: &[(String, Option<String>)],
    optional: &[(String, Option<String>)],
    name_map: &HashMap<&str, &str>,
) -> Vec<ReservationRecord> {
    let mut records: Vec<ReservationRecord> = Vec::new();

    for (raw_name, url) in required {
        records.push(ReservationRecord {
            name: normalize_reservation_name(raw_name, name_map),
            reservation_status: ReservationStatus::Required,
            reservation_url: url.clone(),
        });
    }

    for (raw_name, url) in optional {
        let name = normalize_reservation_name(raw_name, name_map);
        if records.iter().any(|r| r.name == name) {
            continue;
        }
        records.push(ReservationRecord {
            name,
            reservation_status: ReservationStatus::Optional,
            reservation_url: url.clone(),
        });
    }

    records
}

/// Step 2: fetch the blackout/reservations page and write
/// `reservations_raw.json`. Incremental runs reuse the cached page.
pub fn run_scrape_reservations(client: &PageClient, data_dir: &Path, full: bool) -> Result<()> {
    let policy = if full {
        client.store().remove(RESERVATIONS_CACHE_KEY)?;
        FetchPolicy::Live
    } else {
        FetchPolicy::CacheThenLive
    };

    println!("Fetching reservations page: {}", RESERVATIONS_URL);
    let page = client.fetch_page(RESERVATIONS_URL, RESERVATIONS_CACHE_KEY, policy)?;

    let (required, optional) = parse_reservations_page(&page.html);
    let name_map = reservation_name_map();
    let records = build_reservation_records(&required, &optional, &name_map);
    let required_count = records
        .iter()
        .filter(|r| r.reservation_status == ReservationStatus::Required)
        .count();
    let optional_count = records.len() - required_count;

    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
    let out_path = data_dir.join("reservations_raw.json");
    let file = ReservationsFile { resorts: records };
    fs::write(&out_path, serde_json::to_string_pretty(&file)?)
        .with_context(|| format!("failed to write {}", out_path.display()))?;
    println!(
        "Parsed {} required and {} optional reservations",
        required_count, optional_count
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_HTML: &str = r#"
        <html><body>
          <h2>Blackout Dates</h2>
          <ul><li>This list is not reservations</li></ul>
          <h2>Reservations</h2>
          <p>The following resorts require reservations:</p>
          <ul>
            <li><a href="https://example.com/greek">Greek Peak</a></li>
            <li><a href="/reserve/jay">Jay Peak Resort</a></li>
            <li>Powder Mountain</li>
          </ul>
          <h3>Voluntary Reservations</h3>
          <ul>
            <li><a href="https://example.com/greek2">Greek Peak</a></li>
            <li><a href="https://example.com/cat">Catamount</a></li>
          </ul>
        </body></html>
    "#;

    #[test]
    fn test_parse_reservations_page() {
        let (required, optional) = parse_reservations_page(PAGE_HTML);
        assert_eq!(required.len(), 3);
        assert_eq!(required[0].0, "Greek Peak");
        assert_eq!(
            required[1].1.as_deref(),
            Some("https://www.indyskipass.com/reserve/jay")
        );
        // List item without an anchor still yields a name.
        assert_eq!(required[2], ("Powder Mountain".to_string(), None));
        assert_eq!(optional.len(), 2);
    }

    #[test]
    fn test_required_wins_over_optional() {
        let (required, optional) = parse_reservations_page(PAGE_HTML);
        let records = build_reservation_records(&required, &optional, &reservation_name_map());

        // Greek Peak appears in both lists; Required wins and the name is
        // normalized to the roster spelling.
        let greek: Vec<_> = records
            .iter()
            .filter(|r| r.name == "Greek Peak Mountain Resort")
            .collect();
        assert_eq!(greek.len(), 1);
        assert_eq!(greek[0].reservation_status, ReservationStatus::Required);

        let cat = records
            .iter()
            .find(|r| r.name == "Catamount Mountain Resort")
            .unwrap();
        assert_eq!(cat.reservation_status, ReservationStatus::Optional);
    }

    #[test]
    fn test_records_use_supplied_name_map() {
        let required = vec![("Sheet Spelling".to_string(), None)];
        let optional = vec![("Untouched Resort".to_string(), None)];
        let name_map = HashMap::from([("Sheet Spelling", "Canonical Name")]);

        let records = build_reservation_records(&required, &optional, &name_map);
        assert_eq!(records[0].name, "Canonical Name");
        // Names outside the map pass through unchanged.
        assert_eq!(records[1].name, "Untouched Resort");

        assert_eq!(
            normalize_reservation_name("Sheet Spelling", &name_map),
            "Canonical Name"
        );
    }

    #[test]
    fn test_missing_sections_yield_empty_lists() {
        let (required, optional) = parse_reservations_page("<html><body><p>nope</p></body></html>");
        assert!(required.is_empty());
        assert!(optional.is_empty());
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("/foo").as_deref(),
            Some("https://www.indyskipass.com/foo")
        );
        assert_eq!(
            normalize_url("https://other.com/x").as_deref(),
            Some("https://other.com/x")
        );
        assert_eq!(normalize_url(""), None);
    }
}
