use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::event::MINUTES_PER_DAY;

static TIME_12H: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*([ap]m)$").unwrap());
static TIME_24H: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap());

static RANGE_LATIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\d{1,2}(?::\d{2})?\s*[ap]m|\d{1,2}:\d{2})\s*(?:-|\bto\b)\s*(\d{1,2}(?::\d{2})?\s*[ap]m|\d{1,2}:\d{2})",
    )
    .unwrap()
});
static RANGE_LOCALIZED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(上午|下午|晚上|中午|凌晨)\s*(\d{1,2}):(\d{2})\s*-\s*(上午|下午|晚上|中午|凌晨)\s*(\d{1,2}):(\d{2})")
        .unwrap()
});
static RANGE_LOCALIZED_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(上午|下午|晚上|中午|凌晨)\s*(\d{1,2}):(\d{2})\s*-\s*(\d{1,2}):(\d{2})").unwrap()
});

/// Parses a single clock-time token into a minute-of-day value.
///
/// Accepts "H[:MM] am/pm" and 24-hour "HH:MM"; out-of-range hours or minutes
/// are rejected rather than wrapped.
pub fn parse_time_to_minutes(raw: &str) -> Option<u32> {
    let value = raw.trim().to_lowercase();

    if let Some(caps) = TIME_12H.captures(&value) {
        let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps
            .get(2)
            .map(|m| m.as_str().parse())
            .transpose()
            .ok()?
            .unwrap_or(0);
        if hour == 0 || hour > 12 || minute > 59 {
            return None;
        }
        if hour == 12 {
            hour = 0;
        }
        if caps.get(3)?.as_str() == "pm" {
            hour += 12;
        }
        return Some(hour * 60 + minute);
    }

    if let Some(caps) = TIME_24H.captures(&value) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
        if hour <= 23 && minute <= 59 {
            return Some(hour * 60 + minute);
        }
    }
    None
}

/// Parses an hour/minute pair qualified by a Chinese meridiem word.
///
/// 上午/凌晨 keep the hour as-is (12 becomes 0); 下午/晚上/中午 shift by twelve
/// hours unless the hour is already 12. Any other word yields None.
pub fn parse_localized_time(meridiem: &str, hour: u32, minute: u32) -> Option<u32> {
    let mut hour = hour;
    match meridiem.trim() {
        "上午" | "凌晨" => {
            if hour == 12 {
                hour = 0;
            }
        }
        "下午" | "晚上" | "中午" => {
            if hour != 12 {
                hour += 12;
            }
        }
        _ => return None,
    }
    if hour <= 23 && minute <= 59 {
        Some(hour * 60 + minute)
    } else {
        None
    }
}

/// Extracts a (start, end) minute range from free text containing a time span.
///
/// Dash variants are normalized to a plain hyphen first. "All day" markers in
/// either language short-circuit to the full-day interval. Otherwise the Latin
/// pattern, the localized pair, and the localized-start/bare-end pattern are
/// tried in that order; the first pattern whose both sides parse wins. A start
/// at or after the end is not rejected here, that check belongs to the caller.
pub fn extract_time_range(text: &str) -> Option<(u32, u32)> {
    let normalized = text
        .to_lowercase()
        .replace('\u{2013}', "-")
        .replace('\u{2014}', "-");

    if normalized.contains("all day") || normalized.contains("全天") {
        return Some((0, MINUTES_PER_DAY));
    }

    if let Some(caps) = RANGE_LATIN.captures(&normalized) {
        let start = parse_time_to_minutes(caps.get(1)?.as_str());
        let end = parse_time_to_minutes(caps.get(2)?.as_str());
        if let (Some(start), Some(end)) = (start, end) {
            return Some((start, end));
        }
    }

    if let Some(caps) = RANGE_LOCALIZED.captures(&normalized) {
        let start = parse_localized_time(
            caps.get(1)?.as_str(),
            caps.get(2)?.as_str().parse().ok()?,
            caps.get(3)?.as_str().parse().ok()?,
        );
        let end = parse_localized_time(
            caps.get(4)?.as_str(),
            caps.get(5)?.as_str().parse().ok()?,
            caps.get(6)?.as_str().parse().ok()?,
        );
        if let (Some(start), Some(end)) = (start, end) {
            return Some((start, end));
        }
    }

    if let Some(caps) = RANGE_LOCALIZED_START.captures(&normalized) {
        let start = parse_localized_time(
            caps.get(1)?.as_str(),
            caps.get(2)?.as_str().parse().ok()?,
            caps.get(3)?.as_str().parse().ok()?,
        )?;
        // The bare end token inherits no meridiem; it must stand on its own
        // as a 24-hour time.
        let end = parse_time_to_minutes(&format!(
            "{}:{}",
            caps.get(4)?.as_str(),
            caps.get(5)?.as_str()
        ));
        if let Some(end) = end {
            return Some((start, end));
        }
    }

    None
}
