//! Contact/parameter extractor — pull phones, emails, channels and times out of a request.
//!
//! Extraction is a single ordered list of named rules evaluated once. Email and
//! phone rules claim the byte span of every accepted match; a later rule whose
//! match overlaps a claimed span is skipped, so the generic digit rule cannot
//! re-capture fragments of numbers or addresses already taken.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::LazyLock;

/// Phone matches with fewer digits than this are discarded.
pub const MIN_PHONE_DIGITS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    /// Canonical numbers: separators stripped, leading `+` kept when present.
    pub phones: Vec<String>,
    pub emails: Vec<String>,
    /// Channel names without `#`, in order of appearance (duplicates kept).
    pub channels: Vec<String>,
    pub times: Vec<TimeMention>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Meridiem {
    Am,
    Pm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeMention {
    /// 1..=12 as written.
    pub hour: u8,
    pub minute: u8,
    pub meridiem: Meridiem,
}

impl TimeMention {
    /// 12am → 0, 12pm → 12, other pm hours add 12.
    pub fn hour_24(&self) -> u8 {
        match (self.meridiem, self.hour) {
            (Meridiem::Am, 12) => 0,
            (Meridiem::Am, h) => h,
            (Meridiem::Pm, 12) => 12,
            (Meridiem::Pm, h) => h + 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntityKind {
    Email,
    Phone,
    Channel,
    Time,
}

struct Rule {
    name: &'static str,
    kind: EntityKind,
    pattern: Regex,
}

impl Rule {
    fn new(name: &'static str, kind: EntityKind, pattern: &str) -> Self {
        Self {
            name,
            kind,
            pattern: Regex::new(pattern).expect("extractor patterns are valid"),
        }
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(
            "email",
            EntityKind::Email,
            r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
        ),
        Rule::new(
            "phone_us_grouped",
            EntityKind::Phone,
            r"(?:\+\d{1,3}[\s.-]?)?(?:\(\d{3}\)\s?|\b\d{3}[-.\s])\d{3}[-.\s]\d{4}\b",
        ),
        Rule::new(
            "phone_international",
            EntityKind::Phone,
            r"\+\d{1,3}(?:[\s.-]?\d){6,14}\b",
        ),
        Rule::new("phone_generic", EntityKind::Phone, r"\b\d(?:[\s.-]?\d){9,}\b"),
        Rule::new("channel", EntityKind::Channel, r"#([A-Za-z][\w-]*)"),
        Rule::new(
            "time",
            EntityKind::Time,
            r"\b(\d{1,2})(?::([0-5]\d))?\s?(AM|PM)\b",
        ),
    ]
});

/// Names of the extraction rules in evaluation order.
pub fn rule_names() -> Vec<&'static str> {
    RULES.iter().map(|r| r.name).collect()
}

/// Extract every recognised entity from `text`. Never fails; no match yields empty lists.
pub fn extract(text: &str) -> ExtractedEntities {
    let upper = text.to_uppercase();
    let mut entities = ExtractedEntities::default();
    let mut claimed: Vec<Range<usize>> = Vec::new();

    for rule in RULES.iter() {
        match rule.kind {
            EntityKind::Email => {
                for m in rule.pattern.find_iter(text) {
                    claimed.push(m.range());
                    let email = m.as_str().to_string();
                    if !entities.emails.iter().any(|e| e.eq_ignore_ascii_case(&email)) {
                        entities.emails.push(email);
                    }
                }
            }
            EntityKind::Phone => {
                for m in rule.pattern.find_iter(text) {
                    let span = m.range();
                    if overlaps(&claimed, &span) {
                        continue;
                    }
                    let Some(phone) = canonical_phone(m.as_str()) else {
                        continue;
                    };
                    claimed.push(span);
                    if !entities.phones.iter().any(|p| digits(p) == digits(&phone)) {
                        entities.phones.push(phone);
                    }
                }
            }
            EntityKind::Channel => {
                for caps in rule.pattern.captures_iter(text) {
                    entities.channels.push(caps[1].to_string());
                }
            }
            EntityKind::Time => entities.times.extend(time_mentions(&rule.pattern, &upper)),
        }
    }

    tracing::trace!(
        phones = entities.phones.len(),
        emails = entities.emails.len(),
        channels = entities.channels.len(),
        times = entities.times.len(),
        "extracted entities"
    );
    entities
}

/// Time mentions only, used by the schedule normalizer.
pub fn extract_times(text: &str) -> Vec<TimeMention> {
    RULES
        .iter()
        .find(|r| r.kind == EntityKind::Time)
        .map(|rule| time_mentions(&rule.pattern, &text.to_uppercase()))
        .unwrap_or_default()
}

fn time_mentions(pattern: &Regex, upper: &str) -> Vec<TimeMention> {
    pattern
        .captures_iter(upper)
        .filter_map(|caps| {
            let hour: u8 = caps[1].parse().ok()?;
            if !(1..=12).contains(&hour) {
                return None;
            }
            let minute = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
            let meridiem = if &caps[3] == "AM" { Meridiem::Am } else { Meridiem::Pm };
            Some(TimeMention {
                hour,
                minute,
                meridiem,
            })
        })
        .collect()
}

fn overlaps(claimed: &[Range<usize>], span: &Range<usize>) -> bool {
    claimed.iter().any(|c| c.start < span.end && span.start < c.end)
}

/// Digits only, e.g. `+1 (555) 123-4567` → `15551234567`.
pub fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

fn canonical_phone(raw: &str) -> Option<String> {
    let digits = digits(raw);
    if digits.len() < MIN_PHONE_DIGITS {
        return None;
    }
    Some(if raw.trim_start().starts_with('+') {
        format!("+{digits}")
    } else {
        digits
    })
}
