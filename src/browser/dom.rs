use std::time::Duration;

use crate::browser::page::CalendarPage;

/// Bounded wait for each selector attempt. The lists are short, so the worst
/// case stays cheap even when nothing matches.
pub const SELECTOR_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(1500);

/// Fills the first selector that resolves with `value`.
///
/// The calendar's accessible labels vary by locale and session, so callers
/// pass an ordered candidate list instead of branching per locale. A false
/// result means every candidate failed and is definitive; there are no
/// retries beyond the list.
pub async fn fill_first(page: &dyn CalendarPage, selectors: &[&str], value: &str) -> bool {
    for &selector in selectors {
        match page.fill(selector, value, SELECTOR_ATTEMPT_TIMEOUT).await {
            Ok(()) => return true,
            Err(err) => {
                tracing::debug!(selector, %err, "fill candidate failed, trying next");
            }
        }
    }
    false
}

/// Clicks the first selector that resolves. Same contract as [`fill_first`].
pub async fn click_first(page: &dyn CalendarPage, selectors: &[&str]) -> bool {
    for &selector in selectors {
        match page.click(selector, SELECTOR_ATTEMPT_TIMEOUT).await {
            Ok(()) => return true,
            Err(err) => {
                tracing::debug!(selector, %err, "click candidate failed, trying next");
            }
        }
    }
    false
}
