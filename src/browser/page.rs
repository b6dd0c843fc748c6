use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::browser::BrowserError;
use crate::models::event::EventSnippet;

/// The live calendar page a session drives. All waits are bounded by the
/// caller-supplied timeout; exceeding it is an error, never a hang.
#[async_trait]
pub trait CalendarPage: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// Current URL. Errors indicate a stale handle and must make the caller
    /// discard the page rather than keep using it.
    async fn url(&self) -> Result<String, BrowserError>;

    async fn is_closed(&self) -> bool;

    /// Waits for at least one element matching `selector` to be present.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Waits for the element and replaces its value with `value`.
    async fn fill(&self, selector: &str, value: &str, timeout: Duration)
        -> Result<(), BrowserError>;

    async fn click(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Sends a keyboard key to the page. The main surface must hold focus for
    /// shortcuts like the quick-create key to land.
    async fn press_key(&self, key: &str) -> Result<(), BrowserError>;

    /// Scrapes every element matching `selector` into label/text snippets.
    async fn query_snippets(&self, selector: &str) -> Result<Vec<EventSnippet>, BrowserError>;
}

impl std::fmt::Debug for dyn CalendarPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn CalendarPage")
    }
}

/// The persistent browsing context owning a profile's pages.
#[async_trait]
pub trait BrowserContextHandle: Send + Sync {
    /// Probes whether the context can still be queried. A dead context must
    /// be discarded by the session, never trusted blindly.
    async fn is_alive(&self) -> bool;

    async fn new_page(&self) -> Result<Arc<dyn CalendarPage>, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError>;
}

pub struct LaunchedContext {
    pub context: Arc<dyn BrowserContextHandle>,
    /// Tabs the context restored on launch, if any. The session reuses the
    /// first one instead of opening a duplicate.
    pub initial_pages: Vec<Arc<dyn CalendarPage>>,
}

/// Launches persistent, profile-bound browsing contexts. Injected into the
/// session manager so tests can substitute a scripted double.
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    async fn launch_persistent(&self, profile_dir: &Path) -> Result<LaunchedContext, BrowserError>;
}
