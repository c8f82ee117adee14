//! Time normalizer — natural-language recurrence → 5-field schedule expression.

use crate::extractor;

/// 09:00 every day. Also the value the generator is told to use when it cannot tell.
pub const DEFAULT_SCHEDULE: &str = "0 9 * * *";
pub const HOURLY: &str = "0 * * * *";
pub const WEEKLY: &str = "0 9 * * 1";
pub const MONTHLY: &str = "0 9 1 * *";

/// Map a request to `minute hour day month weekday`. Never fails.
pub fn to_schedule(text: &str) -> String {
    let lower = text.to_lowercase();

    if lower.contains("every hour") {
        return HOURLY.into();
    }

    if contains_any(&lower, &["every day", "daily"]) {
        let (minute, hour) = extractor::extract_times(text)
            .first()
            .map(|t| (t.minute, t.hour_24()))
            .unwrap_or((0, 9));
        return format!("{minute} {hour} * * *");
    }

    if contains_any(&lower, &["every week", "weekly"]) {
        return WEEKLY.into();
    }

    if contains_any(&lower, &["every month", "monthly"]) {
        return MONTHLY.into();
    }

    DEFAULT_SCHEDULE.into()
}

/// Five whitespace-separated fields, each built from digits and `* , - /`.
pub fn is_schedule_expression(expr: &str) -> bool {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    fields.len() == 5
        && fields.iter().all(|f| {
            f.chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '*' | ',' | '-' | '/'))
        })
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}
