#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use calendarBot::browser::BrowserError;
use calendarBot::browser::page::{
    BrowserBackend, BrowserContextHandle, CalendarPage, LaunchedContext,
};
use calendarBot::models::event::EventSnippet;

pub const READY_SELECTOR: &str = "div[role=\"main\"]";

/// Scripted page double: selectors listed in `present` resolve immediately,
/// everything else fails without waiting. Records every interaction.
pub struct FakePage {
    pub url: Mutex<String>,
    /// When set, any navigation lands on this URL instead of the requested
    /// one, like a login interstitial does.
    pub redirect: Mutex<Option<String>>,
    pub closed: AtomicBool,
    pub present: Mutex<HashSet<String>>,
    pub snippets: Mutex<Vec<EventSnippet>>,
    /// When set, snippet scraping fails instead of returning the list.
    pub snippets_fail: AtomicBool,
    pub fills: Mutex<Vec<(String, String)>>,
    pub clicks: Mutex<Vec<String>>,
    pub keys: Mutex<Vec<String>>,
    pub goto_count: AtomicUsize,
}

impl FakePage {
    pub fn new() -> Arc<Self> {
        let mut present = HashSet::new();
        present.insert(READY_SELECTOR.to_string());
        Arc::new(Self {
            url: Mutex::new("about:blank".to_string()),
            redirect: Mutex::new(None),
            closed: AtomicBool::new(false),
            present: Mutex::new(present),
            snippets: Mutex::new(Vec::new()),
            snippets_fail: AtomicBool::new(false),
            fills: Mutex::new(Vec::new()),
            clicks: Mutex::new(Vec::new()),
            keys: Mutex::new(Vec::new()),
            goto_count: AtomicUsize::new(0),
        })
    }

    pub fn add_selector(&self, selector: &str) {
        self.present.lock().unwrap().insert(selector.to_string());
    }

    pub fn remove_selector(&self, selector: &str) {
        self.present.lock().unwrap().remove(selector);
    }

    pub fn set_snippets(&self, snippets: Vec<EventSnippet>) {
        *self.snippets.lock().unwrap() = snippets;
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn has(&self, selector: &str) -> bool {
        self.present.lock().unwrap().contains(selector)
    }
}

#[async_trait]
impl CalendarPage for FakePage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.goto_count.fetch_add(1, Ordering::SeqCst);
        let landed = self
            .redirect
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| url.to_string());
        *self.url.lock().unwrap() = landed;
        Ok(())
    }

    async fn url(&self) -> Result<String, BrowserError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrowserError::Backend("page is closed".to_string()));
        }
        Ok(self.url.lock().unwrap().clone())
    }

    async fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn wait_for(
        &self,
        selector: &str,
        _timeout: std::time::Duration,
    ) -> Result<(), BrowserError> {
        if self.has(selector) {
            Ok(())
        } else {
            Err(BrowserError::NotFound(selector.to_string()))
        }
    }

    async fn fill(
        &self,
        selector: &str,
        value: &str,
        _timeout: std::time::Duration,
    ) -> Result<(), BrowserError> {
        if self.has(selector) {
            self.fills
                .lock()
                .unwrap()
                .push((selector.to_string(), value.to_string()));
            Ok(())
        } else {
            Err(BrowserError::NotFound(selector.to_string()))
        }
    }

    async fn click(
        &self,
        selector: &str,
        _timeout: std::time::Duration,
    ) -> Result<(), BrowserError> {
        if self.has(selector) {
            self.clicks.lock().unwrap().push(selector.to_string());
            Ok(())
        } else {
            Err(BrowserError::NotFound(selector.to_string()))
        }
    }

    async fn press_key(&self, key: &str) -> Result<(), BrowserError> {
        self.keys.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn query_snippets(&self, _selector: &str) -> Result<Vec<EventSnippet>, BrowserError> {
        if self.snippets_fail.load(Ordering::SeqCst) {
            return Err(BrowserError::Backend("event scrape failed".to_string()));
        }
        Ok(self.snippets.lock().unwrap().clone())
    }
}

pub struct FakeContext {
    pub alive: AtomicBool,
    pub created: Mutex<Vec<Arc<FakePage>>>,
    pub closed: AtomicBool,
}

impl FakeContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            alive: AtomicBool::new(true),
            created: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl BrowserContextHandle for FakeContext {
    async fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn new_page(&self) -> Result<Arc<dyn CalendarPage>, BrowserError> {
        let page = FakePage::new();
        self.created.lock().unwrap().push(page.clone());
        Ok(page)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.closed.store(true, Ordering::SeqCst);
        self.alive.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Backend double that hands out one restored tab per launch and keeps every
/// launched context reachable for assertions.
pub struct FakeBackend {
    pub launches: AtomicUsize,
    pub contexts: Mutex<Vec<Arc<FakeContext>>>,
    pub initial_pages: Mutex<Vec<Arc<FakePage>>>,
    /// When false, launched pages never render the main calendar container.
    pub pages_ready: AtomicBool,
    /// Day-view events every launched page renders.
    pub seed_snippets: Mutex<Vec<EventSnippet>>,
    /// Extra selectors (dialog fields, buttons) present on launched pages.
    pub seed_selectors: Mutex<Vec<String>>,
    /// Navigation redirect applied to launched pages.
    pub seed_redirect: Mutex<Option<String>>,
    /// When true, launched pages fail their snippet scrape.
    pub seed_scrape_failure: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            launches: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
            initial_pages: Mutex::new(Vec::new()),
            pages_ready: AtomicBool::new(true),
            seed_snippets: Mutex::new(Vec::new()),
            seed_selectors: Mutex::new(Vec::new()),
            seed_redirect: Mutex::new(None),
            seed_scrape_failure: AtomicBool::new(false),
        })
    }

    pub fn seed_snippet(&self, label: &str) {
        self.seed_snippets.lock().unwrap().push(EventSnippet {
            label: Some(label.to_string()),
            text: None,
        });
    }

    pub fn seed_selector(&self, selector: &str) {
        self.seed_selectors.lock().unwrap().push(selector.to_string());
    }

    pub fn seed_redirect(&self, url: &str) {
        *self.seed_redirect.lock().unwrap() = Some(url.to_string());
    }

    pub fn seed_scrape_failure(&self) {
        self.seed_scrape_failure.store(true, Ordering::SeqCst);
    }

    pub fn last_page(&self) -> Arc<FakePage> {
        self.initial_pages.lock().unwrap().last().unwrap().clone()
    }
}

#[async_trait]
impl BrowserBackend for FakeBackend {
    async fn launch_persistent(
        &self,
        _profile_dir: &Path,
    ) -> Result<LaunchedContext, BrowserError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let context = FakeContext::new();
        let page = FakePage::new();
        if !self.pages_ready.load(Ordering::SeqCst) {
            page.remove_selector(READY_SELECTOR);
        }
        page.set_snippets(self.seed_snippets.lock().unwrap().clone());
        for selector in self.seed_selectors.lock().unwrap().iter() {
            page.add_selector(selector);
        }
        *page.redirect.lock().unwrap() = self.seed_redirect.lock().unwrap().clone();
        if self.seed_scrape_failure.load(Ordering::SeqCst) {
            page.snippets_fail.store(true, Ordering::SeqCst);
        }
        self.contexts.lock().unwrap().push(context.clone());
        self.initial_pages.lock().unwrap().push(page.clone());
        Ok(LaunchedContext {
            context,
            initial_pages: vec![page],
        })
    }
}

/// Fresh scratch directory for profile data, unique per test.
pub fn scratch_profile_root() -> PathBuf {
    std::env::temp_dir().join(format!("calendarBot-test-{}", Uuid::new_v4()))
}
