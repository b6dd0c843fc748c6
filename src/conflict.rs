use crate::models::event::{Availability, EventSnippet, TimeInterval};
use crate::time_parse;

/// Scans freshly scraped day-view snippets for an overlap with the candidate
/// slot.
///
/// Unknown is returned when either endpoint failed to parse or the interval is
/// empty/inverted; that case must surface as a clarification request, never as
/// "free". Snippets without a recognizable time range are decorative and are
/// skipped. The overlap test is order-independent, so the result depends only
/// on the snippet set.
pub fn check_conflict(
    snippets: &[EventSnippet],
    start: Option<u32>,
    end: Option<u32>,
) -> Availability {
    let (Some(start), Some(end)) = (start, end) else {
        return Availability::Unknown;
    };
    let Some(candidate) = TimeInterval::new(start, end) else {
        return Availability::Unknown;
    };

    for snippet in snippets {
        let combined = snippet.combined();
        if combined.is_empty() {
            continue;
        }
        let Some((event_start, event_end)) = time_parse::extract_time_range(&combined) else {
            continue;
        };
        // Existing events are taken as rendered, even if their range looks
        // odd (e.g. an overnight label); only the candidate is validated.
        let existing = TimeInterval {
            start: event_start,
            end: event_end,
        };
        if candidate.overlaps(&existing) {
            return Availability::Busy;
        }
    }
    Availability::Free
}
