//! Write-once HTML cache and the shared page-fetching client.
//!
//! Every fetcher in the pipeline shares the same caching semantics: cached
//! artifacts are written once and never silently clobbered. A forced refresh
//! must delete the artifact first (see [`CacheStore::clear_html`]).

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; IndyExplorerPipeline/1.0)";
const HTTP_TIMEOUT_SECS: u64 = 10;

/// On-disk store of fetched HTML pages, keyed by slug.
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.html", key))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }

    pub fn read(&self, key: &str) -> Result<String> {
        let path = self.path_for(key);
        fs::read_to_string(&path)
            .with_context(|| format!("no cached artifact for '{}' at {}", key, path.display()))
    }

    /// Write-once: if the artifact already exists, the existing content is
    /// kept and `Ok(false)` is returned (reuse, not an error).
    pub fn write(&self, key: &str, content: &str) -> Result<bool> {
        let path = self.path_for(key);
        if path.exists() {
            return Ok(false);
        }
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create cache dir {}", self.root.display()))?;
        fs::write(&path, content)
            .with_context(|| format!("failed to write cache artifact {}", path.display()))?;
        Ok(true)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove cache artifact {}", path.display()))?;
        }
        Ok(())
    }

    /// Delete all cached HTML artifacts except the given keys.
    /// Used by full-refresh runs to invalidate the resort page cache while
    /// keeping unrelated artifacts (e.g. the reservations page).
    pub fn clear_html(&self, keep: &[&str]) -> Result<usize> {
        let mut deleted = 0;
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => return Ok(0), // nothing cached yet
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(false, |e| e == "html") {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
                if keep.contains(&stem) {
                    continue;
                }
                fs::remove_file(&path)
                    .with_context(|| format!("failed to remove {}", path.display()))?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

/// How a fetcher resolves a page against the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Always hit the network; the result still goes through the write-once store.
    Live,
    /// Use the cached artifact when present, fetch (and cache) on a miss.
    CacheThenLive,
    /// Cached artifact only; a miss is an error.
    CacheOnly,
}

/// A fetched page plus where it came from, so callers can apply the
/// politeness delay only after real network requests.
#[derive(Debug)]
pub struct FetchedPage {
    pub html: String,
    pub from_cache: bool,
}

/// HTTP client with the write-once cache behind it. All page fetchers in the
/// pipeline go through this.
pub struct PageClient {
    client: reqwest::blocking::Client,
    store: CacheStore,
}

impl PageClient {
    pub fn new(store: CacheStore) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, store })
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn fetch_page(&self, url: &str, key: &str, policy: FetchPolicy) -> Result<FetchedPage> {
        match policy {
            FetchPolicy::CacheOnly => {
                let html = self.store.read(key)?;
                Ok(FetchedPage { html, from_cache: true })
            }
            FetchPolicy::CacheThenLive => {
                if self.store.exists(key) {
                    let html = self.store.read(key)?;
                    return Ok(FetchedPage { html, from_cache: true });
                }
                self.fetch_live(url, key)
            }
            FetchPolicy::Live => self.fetch_live(url, key),
        }
    }

    fn fetch_live(&self, url: &str, key: &str) -> Result<FetchedPage> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("failed to fetch: {}", url))?
            .error_for_status()
            .with_context(|| format!("bad response from: {}", url))?;
        let html = response
            .text()
            .with_context(|| format!("failed to read response: {}", url))?;
        // A pre-existing artifact blocks the write; that is the write-once
        // policy, not a failure.
        self.store.write(key, &html)?;
        Ok(FetchedPage { html, from_cache: false })
    }
}

/// Fetch a published spreadsheet CSV export. These are cheap and change often,
/// so they are never cached by the store; callers write the raw CSV to the
/// data directory themselves.
pub fn fetch_sheet_csv(url: &str) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?;
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("failed to fetch sheet: {}", url))?
        .error_for_status()
        .with_context(|| format!("bad response from sheet: {}", url))?;
    response
        .text()
        .with_context(|| format!("failed to read sheet response: {}", url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_once_preserves_content() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path());

        assert!(store.write("alpine-meadows", "<html>first</html>").unwrap());
        // Second write is a no-op success, not an error.
        assert!(!store.write("alpine-meadows", "<html>second</html>").unwrap());
        assert_eq!(store.read("alpine-meadows").unwrap(), "<html>first</html>");
    }

    #[test]
    fn test_exists_and_missing_read() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path());

        assert!(!store.exists("nowhere"));
        let err = store.read("nowhere").unwrap_err();
        assert!(err.to_string().contains("nowhere"));

        store.write("somewhere", "hi").unwrap();
        assert!(store.exists("somewhere"));
    }

    #[test]
    fn test_remove_then_rewrite() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path());

        store.write("k", "old").unwrap();
        store.remove("k").unwrap();
        assert!(!store.exists("k"));
        assert!(store.write("k", "new").unwrap());
        assert_eq!(store.read("k").unwrap(), "new");
    }

    #[test]
    fn test_clear_html_keeps_listed_keys() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path());

        store.write("resort-a", "a").unwrap();
        store.write("resort-b", "b").unwrap();
        store.write("blackout-dates-reservations", "r").unwrap();

        let deleted = store.clear_html(&["blackout-dates-reservations"]).unwrap();
        assert_eq!(deleted, 2);
        assert!(!store.exists("resort-a"));
        assert!(!store.exists("resort-b"));
        assert!(store.exists("blackout-dates-reservations"));
    }

    #[test]
    fn test_clear_html_on_empty_dir() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("never-created"));
        assert_eq!(store.clear_html(&[]).unwrap(), 0);
    }

    #[test]
    fn test_cache_only_policy_never_fetches() {
        let dir = tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        store.write("page", "<html>cached</html>").unwrap();

        let client = PageClient::new(store).unwrap();
        // The URL is never resolved; a hit comes straight from the store.
        let page = client
            .fetch_page("http://unreachable.invalid/page", "page", FetchPolicy::CacheOnly)
            .unwrap();
        assert!(page.from_cache);
        assert_eq!(page.html, "<html>cached</html>");

        let err = client
            .fetch_page("http://unreachable.invalid/other", "other", FetchPolicy::CacheOnly)
            .unwrap_err();
        assert!(err.to_string().contains("other"));
    }
}
