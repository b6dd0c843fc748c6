use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;

use crate::browser::dom;
use crate::browser::session::{DEFAULT_CALENDAR_URL, SessionManager};
use crate::conflict;
use crate::models::event::{Availability, EventDetails};
use crate::time_parse;

const DAY_VIEW_TIMEOUT: Duration = Duration::from_secs(15);
/// The quick-create panel animates in after the shortcut; give it a moment
/// before looking for its fields.
const DIALOG_SETTLE: Duration = Duration::from_millis(800);
const QUICK_CREATE_KEY: &str = "c";

const MAIN_SURFACE: &str = "div[role=\"main\"]";
const EVENT_SELECTOR: &str = "[role=\"gridcell\"] [data-eventid], [data-eventid][role=\"button\"], [data-eventid][role=\"gridcell\"]";

const TITLE_SELECTORS: &[&str] = &[
    "input[aria-label=\"Add title\"]",
    "input[aria-label=\"添加标题\"]",
    "input[aria-label=\"标题\"]",
    "input[placeholder=\"Add title\"]",
];
const START_DATE_SELECTORS: &[&str] = &[
    "input[aria-label=\"Start date\"]",
    "input[aria-label=\"开始日期\"]",
    "input[aria-label=\"日期\"]",
];
const START_TIME_SELECTORS: &[&str] = &[
    "input[aria-label=\"Start time\"]",
    "input[aria-label=\"开始时间\"]",
    "input[aria-label=\"时间\"]",
];
const END_DATE_SELECTORS: &[&str] = &[
    "input[aria-label=\"End date\"]",
    "input[aria-label=\"结束日期\"]",
];
const END_TIME_SELECTORS: &[&str] = &[
    "input[aria-label=\"End time\"]",
    "input[aria-label=\"结束时间\"]",
];
// CSS cannot match button text, so the save list leans on accessible labels
// with the rendered jsname as a last candidate.
const SAVE_SELECTORS: &[&str] = &[
    "button[aria-label=\"Save\"]",
    "button[aria-label=\"保存\"]",
    "button[jsname=\"x8hlje\"]",
];

/// The two calendar operations plus the date helper, exposed to the agent as
/// tool calls. Every failure below this boundary is converted into a plain
/// result string; nothing here raises across the tool-call surface.
pub struct CalendarService {
    sessions: Arc<SessionManager>,
    timezone: Tz,
}

impl CalendarService {
    pub fn new(sessions: Arc<SessionManager>, timezone: Tz) -> Self {
        Self { sessions, timezone }
    }

    /// Today's date in the configured timezone, ISO formatted. No session or
    /// DOM side effects.
    pub fn today(&self) -> String {
        Utc::now()
            .with_timezone(&self.timezone)
            .format("%Y-%m-%d")
            .to_string()
    }

    pub async fn check_availability(
        &self,
        profile_id: &str,
        date: &str,
        start_time: &str,
        end_time: &str,
    ) -> String {
        let mut session = self.sessions.acquire(profile_id).await;
        let page = match self
            .sessions
            .ensure_ready(&mut session, Some(&day_view_url(date)))
            .await
        {
            Ok(page) => page,
            Err(err) => return err.to_string(),
        };
        if page.wait_for(MAIN_SURFACE, DAY_VIEW_TIMEOUT).await.is_err() {
            return "The calendar day view did not finish loading. Please retry.".to_string();
        }

        let start = time_parse::parse_time_to_minutes(start_time);
        let end = time_parse::parse_time_to_minutes(end_time);

        // Scraped fresh on every check; the rendered UI is the only source
        // of truth and may have changed since the last call. A failed scrape
        // must never read as an empty day.
        let snippets = match page.query_snippets(EVENT_SELECTOR).await {
            Ok(snippets) => snippets,
            Err(err) => {
                tracing::warn!(date, %err, "event scrape failed");
                return scrape_failure_message();
            }
        };
        tracing::info!(date, start_time, end_time, events = snippets.len(), "checking availability");

        match conflict::check_conflict(&snippets, start, end) {
            Availability::Busy => format!(
                "The slot {} {}-{} already has a scheduled event.",
                date, start_time, end_time
            ),
            Availability::Free => format!("The slot {} {}-{} is free.", date, start_time, end_time),
            Availability::Unknown => clarification_message(),
        }
    }

    pub async fn create_event(&self, profile_id: &str, details: &EventDetails) -> String {
        let mut session = self.sessions.acquire(profile_id).await;
        let page = match self
            .sessions
            .ensure_ready(&mut session, Some(&day_view_url(&details.date)))
            .await
        {
            Ok(page) => page,
            Err(err) => return err.to_string(),
        };
        if page.wait_for(MAIN_SURFACE, DAY_VIEW_TIMEOUT).await.is_err() {
            return "The calendar day view did not finish loading. Please retry.".to_string();
        }

        // The agent is instructed to check availability first, but caller
        // discipline is not a mechanism. Re-run the conflict scan here so a
        // busy slot is refused rather than double-booked.
        let start = time_parse::parse_time_to_minutes(&details.start_time);
        let end = time_parse::parse_time_to_minutes(&details.end_time);
        let snippets = match page.query_snippets(EVENT_SELECTOR).await {
            Ok(snippets) => snippets,
            Err(err) => {
                tracing::warn!(date = %details.date, %err, "event scrape failed");
                return scrape_failure_message();
            }
        };
        match conflict::check_conflict(&snippets, start, end) {
            Availability::Busy => {
                return format!(
                    "The slot {} {}-{} already has a scheduled event; the event was not created.",
                    details.date, details.start_time, details.end_time
                );
            }
            Availability::Unknown => return clarification_message(),
            Availability::Free => {}
        }

        tracing::info!(title = %details.title, date = %details.date, "creating event");
        // Quick-create shortcut; the main surface holds focus after the
        // readiness wait above.
        if let Err(err) = page.press_key(QUICK_CREATE_KEY).await {
            return format!("Could not open the event creation dialog: {err}");
        }
        tokio::time::sleep(DIALOG_SETTLE).await;

        if !dom::fill_first(page.as_ref(), TITLE_SELECTORS, &details.title).await {
            return "Could not find the title field. Please confirm the calendar page has loaded."
                .to_string();
        }

        // Best-effort: the UI defaults end date/time from the start values,
        // so a missed field here is not fatal.
        dom::fill_first(page.as_ref(), START_DATE_SELECTORS, &details.date).await;
        dom::fill_first(page.as_ref(), START_TIME_SELECTORS, &details.start_time).await;
        dom::fill_first(page.as_ref(), END_DATE_SELECTORS, &details.date).await;
        dom::fill_first(page.as_ref(), END_TIME_SELECTORS, &details.end_time).await;

        if !dom::click_first(page.as_ref(), SAVE_SELECTORS).await {
            return "Could not find the save button. Please check whether the event creation dialog is open."
                .to_string();
        }

        format!(
            "Created event \"{}\" on {} from {} to {}.",
            details.title, details.date, details.start_time, details.end_time
        )
    }
}

fn day_view_url(date: &str) -> String {
    format!(
        "{}/calendar/u/0/r/day/{}",
        DEFAULT_CALENDAR_URL,
        date.replace('-', "/")
    )
}

fn scrape_failure_message() -> String {
    "Could not read the calendar's existing events, so the slot cannot be confirmed. Please retry."
        .to_string()
}

fn clarification_message() -> String {
    "I could not confirm whether that slot is free. Please give the start and end times in a form like 14:00 or 2:00pm, with the end after the start.".to_string()
}
