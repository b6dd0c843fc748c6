use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

use crate::browser::BrowserError;
use crate::browser::page::{BrowserBackend, BrowserContextHandle, CalendarPage};

pub const DEFAULT_CALENDAR_URL: &str = "https://calendar.google.com";
const CALENDAR_APP_MARKER: &str = "calendar.google.com/calendar";
const LOGIN_DOMAIN: &str = "accounts.google.com";
const READY_SELECTOR: &str = "div[role=\"main\"]";

const LOGIN_POLL: Duration = Duration::from_secs(1);
const READY_PROBE: Duration = Duration::from_secs(1);
const READY_RETRY_PAUSE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Launching,
    Navigating,
    AwaitingLogin,
    Ready,
    Error,
}

/// One live automation session per profile: the persistent context, the page
/// it drives, and the on-disk lock that keeps other processes off the
/// profile. Reused across turns and operations; torn down only on explicit
/// shutdown or fatal error.
pub struct Session {
    pub profile_id: String,
    pub state: SessionState,
    context: Option<Arc<dyn BrowserContextHandle>>,
    page: Option<Arc<dyn CalendarPage>>,
    profile_lock: Option<ProfileLock>,
}

impl Session {
    fn new(profile_id: &str) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            state: SessionState::Empty,
            context: None,
            page: None,
            profile_lock: None,
        }
    }
}

/// Cross-process guard on the profile directory. The file records the owning
/// PID so a lock left behind by a crashed process can be told apart from one
/// held by a live instance and reclaimed.
struct ProfileLock {
    path: PathBuf,
}

impl ProfileLock {
    fn acquire(profile_dir: &Path) -> Result<Self, BrowserError> {
        let path = profile_dir.join("session.lock");
        if let Ok(contents) = fs::read_to_string(&path) {
            match contents.trim().parse::<u32>() {
                Ok(pid) if pid != std::process::id() && process_is_alive(pid) => {
                    return Err(BrowserError::ProfileLocked {
                        holder: pid.to_string(),
                    });
                }
                Ok(pid) if pid != std::process::id() => {
                    tracing::warn!(pid, path = %path.display(), "reclaiming stale profile lock");
                }
                // Unreadable contents: a legacy marker file. Treat it the way
                // a dead holder is treated and reclaim it.
                Err(_) => {
                    tracing::warn!(path = %path.display(), "reclaiming unreadable profile lock");
                }
                _ => {}
            }
        }
        fs::write(&path, std::process::id().to_string())
            .map_err(|e| BrowserError::Backend(format!("could not write profile lock: {e}")))?;
        Ok(Self { path })
    }
}

impl Drop for ProfileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn process_is_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

/// Owns every profile's session and serializes operations per profile.
///
/// Two connections sharing a profile id still funnel through one per-profile
/// mutex, because calendar operations share UI focus state on the page and
/// must never interleave DOM interactions.
pub struct SessionManager {
    backend: Arc<dyn BrowserBackend>,
    profile_root: PathBuf,
    calendar_url: String,
    login_wait: Duration,
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn BrowserBackend>, profile_root: PathBuf) -> Self {
        Self {
            backend,
            profile_root,
            calendar_url: DEFAULT_CALENDAR_URL.to_string(),
            login_wait: Duration::from_secs(300),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_login_wait(mut self, login_wait: Duration) -> Self {
        self.login_wait = login_wait;
        self
    }

    /// Takes the per-profile execution lock. Held for the whole operation,
    /// including its DOM steps, and released when the guard drops.
    pub async fn acquire(&self, profile_id: &str) -> OwnedMutexGuard<Session> {
        let slot = {
            let mut sessions = self.sessions.lock().await;
            sessions
                .entry(profile_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Session::new(profile_id))))
                .clone()
        };
        slot.lock_owned().await
    }

    /// Drives the session to `Ready` on the requested view and returns its
    /// page. Stale handles are healed by restarting from `Empty` rather than
    /// surfacing a stale-handle error.
    pub async fn ensure_ready(
        &self,
        session: &mut Session,
        target_url: Option<&str>,
    ) -> Result<Arc<dyn CalendarPage>, BrowserError> {
        self.heal_stale_handles(session).await;

        if session.page.is_none() {
            if let Some(context) = &session.context {
                session.page = Some(context.new_page().await?);
            }
        }

        if session.page.is_none() {
            session.state = SessionState::Launching;
            let page = match self.launch(session).await {
                Ok(page) => page,
                Err(err) => {
                    session.state = SessionState::Error;
                    session.profile_lock = None;
                    return Err(err);
                }
            };
            session.page = Some(page);
        }

        let page = session
            .page
            .clone()
            .ok_or_else(|| BrowserError::Backend("session lost its page handle".into()))?;

        session.state = SessionState::Navigating;
        if let Err(err) = self.navigate(&page, target_url).await {
            session.state = SessionState::Error;
            return Err(err);
        }

        self.wait_until_ready(session, &page).await?;
        Ok(page)
    }

    /// Closes the context and releases the profile lock. Called when the
    /// owning connection ends; sessions are otherwise long-lived.
    pub async fn shutdown(&self, profile_id: &str) {
        let slot = {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(profile_id)
        };
        if let Some(slot) = slot {
            let mut session = slot.lock().await;
            if let Some(context) = session.context.take() {
                if let Err(err) = context.close().await {
                    tracing::warn!(profile_id, %err, "failed to close browser context");
                }
            }
            session.page = None;
            session.profile_lock = None;
            session.state = SessionState::Empty;
        }
    }

    /// A page that reports closed, or a context that errors when queried, is
    /// discarded immediately; the state machine restarts from `Empty` on the
    /// next call.
    async fn heal_stale_handles(&self, session: &mut Session) {
        if let Some(page) = &session.page {
            if page.is_closed().await {
                tracing::info!(profile_id = %session.profile_id, "page handle is closed, discarding");
                session.page = None;
            }
        }
        if let Some(context) = &session.context {
            if !context.is_alive().await {
                tracing::info!(profile_id = %session.profile_id, "browser context is gone, discarding");
                session.context = None;
                session.page = None;
                session.state = SessionState::Empty;
            }
        }
    }

    async fn launch(&self, session: &mut Session) -> Result<Arc<dyn CalendarPage>, BrowserError> {
        let profile_dir = self.profile_root.join(&session.profile_id);
        fs::create_dir_all(&profile_dir)
            .map_err(|e| BrowserError::Backend(format!("could not create profile dir: {e}")))?;

        // Fail fast when another live process owns the profile; it is
        // legitimately theirs and blocking here would just hang the call.
        if session.profile_lock.is_none() {
            session.profile_lock = Some(ProfileLock::acquire(&profile_dir)?);
        }

        let launched = self.backend.launch_persistent(&profile_dir).await?;
        let context = launched.context.clone();
        session.context = Some(launched.context);

        match launched.initial_pages.into_iter().next() {
            Some(page) => Ok(page),
            None => context.new_page().await,
        }
    }

    async fn navigate(
        &self,
        page: &Arc<dyn CalendarPage>,
        target_url: Option<&str>,
    ) -> Result<(), BrowserError> {
        let current = page.url().await.unwrap_or_default();
        match target_url {
            Some(target) => {
                if !current.contains(target) {
                    page.goto(target).await?;
                }
            }
            None => {
                if !current.contains(CALENDAR_APP_MARKER) {
                    page.goto(&self.calendar_url).await?;
                }
            }
        }
        Ok(())
    }

    /// Waits out the authentication interstitial, then for the main calendar
    /// container. Every iteration re-checks the monotonic deadline; the only
    /// exits are `Ready` or a timeout error the user can act on.
    async fn wait_until_ready(
        &self,
        session: &mut Session,
        page: &Arc<dyn CalendarPage>,
    ) -> Result<(), BrowserError> {
        let deadline = Instant::now() + self.login_wait;
        loop {
            // Re-checked every iteration: a completed login moves the page
            // off the identity domain, and the state must follow it.
            let current = page.url().await.unwrap_or_default();
            let awaiting_login = current.contains(LOGIN_DOMAIN);
            if awaiting_login {
                // No automated credential entry; just give the user time to
                // finish the interactive login.
                session.state = SessionState::AwaitingLogin;
                tokio::time::sleep(LOGIN_POLL).await;
            } else {
                session.state = SessionState::Navigating;
                if page.wait_for(READY_SELECTOR, READY_PROBE).await.is_ok() {
                    session.state = SessionState::Ready;
                    return Ok(());
                }
                tokio::time::sleep(READY_RETRY_PAUSE).await;
            }

            if Instant::now() >= deadline {
                return Err(if awaiting_login {
                    BrowserError::LoginTimeout
                } else {
                    BrowserError::ReadyTimeout
                });
            }
        }
    }
}
