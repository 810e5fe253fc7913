//! Scrapes the resort index page and the per-resort detail pages.

use anyhow::{Context, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::reservations::RESERVATIONS_CACHE_KEY;
use crate::store::{FetchPolicy, PageClient};
use crate::types::{Coordinates, ResortDetail, ResortStub};

pub const BASE_URL: &str = "https://www.indyskipass.com";
pub const OUR_RESORTS_URL: &str = "https://www.indyskipass.com/our-resorts";
const INDEX_CACHE_KEY: &str = "our-resorts";
const FETCH_DELAY_MS: u64 = 500;

/// Selectors are compile-time constants; a parse failure is a programmer error.
fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("invalid CSS selector")
}

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").unwrap())
}

/// Extract a single integer from free text ("1,200 ft", "25 km of trails").
/// Text containing zero or multiple numbers yields None.
pub fn get_numbers(text: &str) -> Option<u32> {
    let matches: Vec<_> = digits_re().find_iter(text).collect();
    if matches.len() == 1 {
        matches[0].as_str().parse().ok()
    } else {
        None
    }
}

/// Parse a `POINT (longitude latitude)` attribute value.
fn parse_point(point: &str) -> Option<Coordinates> {
    let inner = point
        .trim()
        .strip_prefix("POINT (")?
        .strip_suffix(')')?;
    let mut parts = inner.split_whitespace();
    let longitude: f64 = parts.next()?.parse().ok()?;
    let latitude: f64 = parts.next()?.parse().ok()?;
    Some(Coordinates { latitude, longitude })
}

/// Card verticals read "2000ft"; anything else is unparseable.
fn parse_vertical(text: &str) -> Option<u32> {
    text.strip_suffix("ft")?.trim().parse().ok()
}

fn to_boolean(text: &str) -> bool {
    matches!(text.to_lowercase().as_str(), "true" | "yes")
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn select_text(node: ElementRef, css: &str) -> Option<String> {
    node.select(&sel(css)).next().map(element_text)
}

/// Parse the resort cards on the index page. Cards without a node id are
/// skipped with a diagnostic; every other field degrades to None.
pub fn parse_our_resorts_page(html: &str) -> Vec<ResortStub> {
    let document = Html::parse_document(html);
    let card_sel = sel(".node--type-resort");

    let mut stubs = Vec::new();
    let mut skipped = 0;
    for card in document.select(&card_sel) {
        let id = match card.value().attr("data-history-node-id") {
            Some(id) => id.to_string(),
            None => {
                eprintln!("Resort card missing node id, skipping");
                skipped += 1;
                continue;
            }
        };

        let attr_bool =
            |name: &str| -> Option<bool> { card.value().attr(name).map(to_boolean) };

        stubs.push(ResortStub {
            id,
            name: select_text(card, "span.label"),
            location_name: select_text(card, "span.location"),
            coordinates: card.value().attr("data-location").and_then(parse_point),
            vertical: select_text(card, "li:nth-child(1) .value")
                .as_deref()
                .and_then(parse_vertical),
            num_trails: select_text(card, "li:nth-child(2) .value")
                .and_then(|t| t.parse().ok()),
            num_lifts: select_text(card, "li:nth-child(3) .value")
                .and_then(|t| t.parse().ok()),
            is_open_nights: select_text(card, "li:nth-child(4) .value")
                .map(|t| to_boolean(&t)),
            has_terrain_parks: select_text(card, "li:nth-child(5) .value")
                .map(|t| to_boolean(&t)),
            is_nordic: attr_bool("data-isnordic"),
            is_alpine_xc: attr_bool("data-isalpinexc"),
            is_xc_only: attr_bool("data-isxconly"),
            is_allied: attr_bool("data-isallied"),
            href: card.value().attr("href").map(String::from),
        });
    }

    println!("Parsed {} resort cards ({} skipped)", stubs.len(), skipped);
    stubs
}

/// Parse a resort detail page. Numeric fields become None when the page text
/// is missing or malformed; one bad field never fails the page.
pub fn parse_resort_page(html: &str, id: &str, slug: &str) -> ResortDetail {
    let document = Html::parse_document(html);
    let doc_text = |css: &str| -> Option<String> {
        document.select(&sel(css)).next().map(element_text)
    };

    let name = doc_text("title")
        .map(|t| t.split('|').next().unwrap_or("").trim().to_string())
        .filter(|t| !t.is_empty());

    let description = document
        .select(&sel("meta[name=\"description\"]"))
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(String::from);

    let website = document
        .select(&sel("div.grid-inner-full.d-flex.jc-center.buttons a.button-inverted"))
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(String::from);

    let trail_length_km =
        doc_text("div.field--name-field-trail-length").as_deref().and_then(get_numbers);
    let trail_length_mi = trail_length_km.map(|km| (km as f64 * 0.621371) as u32);

    let is_cross_country = doc_text("div.fade-in.grid-area-main h2")
        .map(|t| t.to_lowercase().contains("cross country"))
        .unwrap_or(false);

    let yes_in = |css: &str| doc_text(css).map(|t| t.contains("Yes"));

    let difficulty = |level: &str| -> Option<u32> {
        doc_text(&format!("div.field--name-field-{}", level))
            .as_deref()
            .and_then(get_numbers)
    };

    let snowfall = |kind: &str| -> Option<u32> {
        document
            .select(&sel(&format!(
                "div.snowfall--content div.label.{} span.f-w-700.d-block",
                kind
            )))
            .next()
            .map(element_text)
            .and_then(|t| t.split("in").next()?.trim().parse().ok())
    };

    ResortDetail {
        id: id.to_string(),
        slug: slug.to_string(),
        name,
        description,
        website,
        trails: doc_text("div.field--name-field-trails").and_then(|t| t.parse().ok()),
        lifts: doc_text("div.field--name-field-lifts").and_then(|t| t.parse().ok()),
        acres: doc_text("div.field--name-field-acres").and_then(|t| t.parse().ok()),
        trail_length_km,
        trail_length_mi,
        is_cross_country,
        is_dog_friendly: yes_in("div.field--name-field-dog-friendly").unwrap_or(false),
        has_snowshoeing: yes_in("div.field--name-field-snowshoeing").unwrap_or(false),
        terrain_parks: yes_in("div.field--name-field-terrain-parks"),
        night_skiing: yes_in("div.field--name-field-night-skiing"),
        vertical_base_ft: doc_text("div.elevation__tag--base").as_deref().and_then(get_numbers),
        vertical_summit_ft: doc_text("div.elevation__tag--summit")
            .as_deref()
            .and_then(get_numbers),
        vertical_elevation_ft: doc_text("div.elevation__tag--vertical")
            .as_deref()
            .and_then(get_numbers),
        difficulty_beginner: difficulty("beginner"),
        difficulty_intermediate: difficulty("intermediate"),
        difficulty_advanced: difficulty("advanced"),
        snowfall_average_in: snowfall("average"),
        snowfall_high_in: snowfall("high"),
    }
}

/// Step 1: scrape the index page (always live) and every resort detail page.
/// Incremental runs reuse cached detail pages; full runs clear the HTML cache
/// first (keeping the reservations page) and refetch everything.
pub fn run_scrape_resorts(client: &PageClient, data_dir: &Path, full: bool) -> Result<()> {
    if full {
        let deleted = client.store().clear_html(&[RESERVATIONS_CACHE_KEY])?;
        println!("Cleared {} cached pages for full refresh", deleted);
    } else {
        // The index must reflect roster changes, so it is never served stale.
        client.store().remove(INDEX_CACHE_KEY)?;
    }

    println!("Fetching resort index: {}", OUR_RESORTS_URL);
    let index = client.fetch_page(OUR_RESORTS_URL, INDEX_CACHE_KEY, FetchPolicy::Live)?;
    let stubs = parse_our_resorts_page(&index.html);

    let by_id: BTreeMap<&str, &ResortStub> =
        stubs.iter().map(|s| (s.id.as_str(), s)).collect();
    let raw_path = data_dir.join("resorts_raw.json");
    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;
    fs::write(&raw_path, serde_json::to_string_pretty(&by_id)?)
        .with_context(|| format!("failed to write {}", raw_path.display()))?;
    println!("Wrote {} resorts to {}", by_id.len(), raw_path.display());

    let detail_dir = data_dir.join("resorts");
    fs::create_dir_all(&detail_dir)
        .with_context(|| format!("failed to create {}", detail_dir.display()))?;

    let policy = if full { FetchPolicy::Live } else { FetchPolicy::CacheThenLive };
    let total = stubs.len();
    let mut cached_count = 0;
    let mut live_count = 0;
    for (i, stub) in stubs.iter().enumerate() {
        let Some(slug) = stub.slug() else {
            eprintln!("Resort {} has no detail page href, skipping", stub.id);
            continue;
        };
        let url = format!("{}{}", BASE_URL, stub.href.as_deref().unwrap_or_default());
        println!("[{:03}/{:03}] Scraping: {}", i + 1, total, slug);

        let page = client
            .fetch_page(&url, slug, policy)
            .with_context(|| format!("failed to fetch resort page for '{}'", slug))?;
        let detail = parse_resort_page(&page.html, &stub.id, slug);

        let detail_path = detail_dir.join(format!("{}.json", slug));
        fs::write(&detail_path, serde_json::to_string_pretty(&detail)?)
            .with_context(|| format!("failed to write {}", detail_path.display()))?;

        if page.from_cache {
            cached_count += 1;
        } else {
            live_count += 1;
            std::thread::sleep(std::time::Duration::from_millis(FETCH_DELAY_MS));
        }
    }
    println!(
        "Scraped {} resort pages ({} live, {} from cache)",
        live_count + cached_count,
        live_count,
        cached_count
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD_HTML: &str = r#"
        <div id="main-content">
          <a class="node--type-resort" href="/our-resorts/bluewood"
             data-history-node-id="101"
             data-location="POINT (-117.8523 46.0824)"
             data-isnordic="false" data-isalpinexc="false"
             data-isxconly="false" data-isallied="true">
            <span class="label">Bluewood</span>
            <span class="location">Dayton, WA</span>
            <ul>
              <li><span class="value">1125ft</span></li>
              <li><span class="value">24</span></li>
              <li><span class="value">3</span></li>
              <li><span class="value">No</span></li>
              <li><span class="value">Yes</span></li>
            </ul>
          </a>
          <a class="node--type-resort" href="/our-resorts/broken"
             data-history-node-id="102">
            <span class="label">Broken Card</span>
            <ul>
              <li><span class="value">lots</span></li>
              <li><span class="value">many</span></li>
            </ul>
          </a>
          <a class="node--type-resort" href="/our-resorts/no-id">
            <span class="label">No Id</span>
          </a>
        </div>
    "#;

    #[test]
    fn test_parse_index_cards() {
        let stubs = parse_our_resorts_page(CARD_HTML);
        assert_eq!(stubs.len(), 2); // the card without a node id is skipped

        let bluewood = &stubs[0];
        assert_eq!(bluewood.id, "101");
        assert_eq!(bluewood.name.as_deref(), Some("Bluewood"));
        assert_eq!(bluewood.location_name.as_deref(), Some("Dayton, WA"));
        assert_eq!(bluewood.vertical, Some(1125));
        assert_eq!(bluewood.num_trails, Some(24));
        assert_eq!(bluewood.num_lifts, Some(3));
        assert_eq!(bluewood.is_open_nights, Some(false));
        assert_eq!(bluewood.has_terrain_parks, Some(true));
        assert_eq!(bluewood.is_allied, Some(true));
        assert_eq!(bluewood.slug(), Some("bluewood"));
        let coords = bluewood.coordinates.unwrap();
        assert!((coords.latitude - 46.0824).abs() < 1e-9);
        assert!((coords.longitude + 117.8523).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_card_fields_become_none() {
        let stubs = parse_our_resorts_page(CARD_HTML);
        let broken = &stubs[1];
        // "lots" and "many" are not numbers; the card still parses.
        assert_eq!(broken.vertical, None);
        assert_eq!(broken.num_trails, None);
        assert_eq!(broken.coordinates, None);
        assert_eq!(broken.is_nordic, None);
        assert_eq!(broken.name.as_deref(), Some("Broken Card"));
    }

    const DETAIL_HTML: &str = r#"
        <html><head>
          <title>Bluewood | Indy Pass</title>
          <meta name="description" content="Deep powder in the Blues.">
        </head><body>
          <div class="fade-in grid-area-main"><h2>Alpine Resort</h2></div>
          <div class="grid-inner-full d-flex jc-center buttons">
            <a class="button-inverted" href="https://bluewood.com">Website</a>
          </div>
          <div class="field--name-field-trails">24</div>
          <div class="field--name-field-lifts">3</div>
          <div class="field--name-field-acres">430</div>
          <div class="field--name-field-dog-friendly">Yes</div>
          <div class="field--name-field-terrain-parks">Yes</div>
          <div class="field--name-field-night-skiing">No</div>
          <div class="elevation__tag--base">Base 4545 ft</div>
          <div class="elevation__tag--summit">Summit 5670 ft</div>
          <div class="elevation__tag--vertical">Vertical 1125 ft</div>
          <div class="field--name-field-beginner">25%</div>
          <div class="field--name-field-intermediate">40%</div>
          <div class="field--name-field-advanced">35%</div>
          <div class="snowfall--content">
            <div class="label average"><span class="f-w-700 d-block">300 in</span></div>
            <div class="label high"><span class="f-w-700 d-block">450 in</span></div>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_detail_page() {
        let detail = parse_resort_page(DETAIL_HTML, "101", "bluewood");
        assert_eq!(detail.id, "101");
        assert_eq!(detail.slug, "bluewood");
        assert_eq!(detail.name.as_deref(), Some("Bluewood"));
        assert_eq!(detail.description.as_deref(), Some("Deep powder in the Blues."));
        assert_eq!(detail.website.as_deref(), Some("https://bluewood.com"));
        assert_eq!(detail.trails, Some(24));
        assert_eq!(detail.lifts, Some(3));
        assert_eq!(detail.acres, Some(430));
        assert!(!detail.is_cross_country);
        assert!(detail.is_dog_friendly);
        assert!(!detail.has_snowshoeing);
        assert_eq!(detail.terrain_parks, Some(true));
        assert_eq!(detail.night_skiing, Some(false));
        assert_eq!(detail.vertical_base_ft, Some(4545));
        assert_eq!(detail.vertical_summit_ft, Some(5670));
        assert_eq!(detail.vertical_elevation_ft, Some(1125));
        assert_eq!(detail.difficulty_beginner, Some(25));
        assert_eq!(detail.snowfall_average_in, Some(300));
        assert_eq!(detail.snowfall_high_in, Some(450));
        assert_eq!(detail.trail_length_km, None);
        assert_eq!(detail.trail_length_mi, None);
    }

    #[test]
    fn test_detail_malformed_field_is_isolated() {
        let html = r#"
            <html><head><title>Sparse | Indy Pass</title></head><body>
              <div class="field--name-field-trails">forty</div>
              <div class="field--name-field-lifts">5</div>
              <div class="elevation__tag--base">from 1200 to 3400 ft</div>
            </body></html>
        "#;
        let detail = parse_resort_page(html, "7", "sparse");
        assert_eq!(detail.trails, None); // malformed
        assert_eq!(detail.lifts, Some(5)); // sibling still parses
        assert_eq!(detail.vertical_base_ft, None); // two numbers is ambiguous
        assert_eq!(detail.acres, None);
        assert_eq!(detail.website, None);
    }

    #[test]
    fn test_get_numbers() {
        assert_eq!(get_numbers("1200 ft"), Some(1200));
        assert_eq!(get_numbers("25km"), Some(25));
        assert_eq!(get_numbers("no digits"), None);
        assert_eq!(get_numbers("10 to 20"), None);
    }

    #[test]
    fn test_parse_point() {
        let c = parse_point("POINT (-72.1 44.5)").unwrap();
        assert!((c.longitude + 72.1).abs() < 1e-9);
        assert!((c.latitude - 44.5).abs() < 1e-9);
        assert_eq!(parse_point("44.5,-72.1"), None);
    }

    #[test]
    fn test_trail_length_conversion() {
        let html = r#"
            <html><head><title>XC | Indy Pass</title></head><body>
              <div class="fade-in grid-area-main"><h2>Cross Country Resort</h2></div>
              <div class="field--name-field-trail-length">50 km</div>
            </body></html>
        "#;
        let detail = parse_resort_page(html, "8", "xc");
        assert!(detail.is_cross_country);
        assert_eq!(detail.trail_length_km, Some(50));
        assert_eq!(detail.trail_length_mi, Some(31)); // 50 * 0.621371 truncated
    }
}
