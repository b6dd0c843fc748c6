use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::browser::BrowserError;
use crate::browser::page::{BrowserBackend, BrowserContextHandle, CalendarPage, LaunchedContext};
use crate::models::event::EventSnippet;

const ELEMENT_POLL: Duration = Duration::from_millis(100);

/// Chromium-backed browser provider. Each profile gets its own persistent
/// `user_data_dir`, so the signed-in calendar session survives restarts.
pub struct ChromeBackend {
    headless: bool,
}

impl ChromeBackend {
    pub fn new(headless: bool) -> Self {
        Self { headless }
    }
}

#[async_trait]
impl BrowserBackend for ChromeBackend {
    async fn launch_persistent(&self, profile_dir: &Path) -> Result<LaunchedContext, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile_dir)
            .args(vec![
                "--disable-blink-features=AutomationControlled",
                "--disable-dev-shm-usage",
            ])
            .no_sandbox();
        if !self.headless {
            // Headful: the user has to be able to complete the interactive
            // login in this window.
            builder = builder.with_head().window_size(1440, 900);
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        tracing::info!(profile_dir = %profile_dir.display(), headless = self.headless, "launching chrome");
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let initial_pages: Vec<Arc<dyn CalendarPage>> = browser
            .pages()
            .await
            .map_err(|e| BrowserError::Backend(e.to_string()))?
            .into_iter()
            .map(|page| Arc::new(ChromePage { page }) as Arc<dyn CalendarPage>)
            .collect();

        let context = Arc::new(ChromeContext {
            browser: Mutex::new(browser),
            _handler_task: handler_task,
        });

        Ok(LaunchedContext {
            context,
            initial_pages,
        })
    }
}

struct ChromeContext {
    browser: Mutex<Browser>,
    _handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserContextHandle for ChromeContext {
    async fn is_alive(&self) -> bool {
        self.browser.lock().await.pages().await.is_ok()
    }

    async fn new_page(&self) -> Result<Arc<dyn CalendarPage>, BrowserError> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Backend(format!("failed to open tab: {e}")))?;
        Ok(Arc::new(ChromePage { page }))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|e| BrowserError::Backend(e.to_string()))?;
        let _ = browser.wait().await;
        Ok(())
    }
}

struct ChromePage {
    page: chromiumoxide::Page,
}

impl ChromePage {
    /// chromiumoxide has no built-in selector wait, so poll `find_element`
    /// against a deadline.
    async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<chromiumoxide::Element, BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(element) = self.page.find_element(selector).await {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::NotFound(selector.to_string()));
            }
            tokio::time::sleep(ELEMENT_POLL).await;
        }
    }
}

#[async_trait]
impl CalendarPage for ChromePage {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Navigation(e.to_string()))
    }

    async fn url(&self) -> Result<String, BrowserError> {
        self.page
            .url()
            .await
            .map_err(|e| BrowserError::Backend(e.to_string()))?
            .ok_or_else(|| BrowserError::Backend("page reported no url".to_string()))
    }

    async fn is_closed(&self) -> bool {
        self.page.url().await.is_err()
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.wait_for_element(selector, timeout).await.map(|_| ())
    }

    async fn fill(
        &self,
        selector: &str,
        value: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let element = self.wait_for_element(selector, timeout).await?;
        let backend = |e: chromiumoxide::error::CdpError| BrowserError::Backend(e.to_string());
        element.click().await.map_err(backend)?;
        // Select any existing content so typing replaces it instead of
        // appending.
        element
            .call_js_fn("function() { if (this.select) { this.select(); } }", false)
            .await
            .map_err(backend)?;
        element.type_str(value).await.map_err(backend)?;
        Ok(())
    }

    async fn click(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        let element = self.wait_for_element(selector, timeout).await?;
        element
            .click()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Backend(e.to_string()))
    }

    async fn press_key(&self, key: &str) -> Result<(), BrowserError> {
        let backend = |e: String| BrowserError::Backend(e);
        let down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key(key)
            .text(key)
            .build()
            .map_err(backend)?;
        self.page
            .execute(down)
            .await
            .map_err(|e| BrowserError::Backend(e.to_string()))?;
        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(key)
            .build()
            .map_err(backend)?;
        self.page
            .execute(up)
            .await
            .map_err(|e| BrowserError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn query_snippets(&self, selector: &str) -> Result<Vec<EventSnippet>, BrowserError> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| BrowserError::Backend(e.to_string()))?;
        let mut snippets = Vec::with_capacity(elements.len());
        for element in elements {
            let label = element.attribute("aria-label").await.ok().flatten();
            let text = element.inner_text().await.ok().flatten();
            snippets.push(EventSnippet { label, text });
        }
        Ok(snippets)
    }
}
