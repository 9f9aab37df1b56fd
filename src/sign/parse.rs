//! Sign text parser: raw OCR output → structured restriction rules.
//!
//! OCR output from street signs is noisy: line breaks land mid-phrase,
//! punctuation drops out, and 0/O and 1/I/l get swapped. The parser never
//! fails; text that matches no known phrasing is kept as `Unknown` fragments
//! so a human fallback still sees it.
//!
//! Each rule kind has an independent matcher applied to a normalized copy of
//! the text. Matchers do not suppress one another; all matches are collected
//! and reported in text order.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

use crate::config::TimeFormat;
use crate::sign::rules::{DaySet, RestrictionRule, TimeWindow};
use chrono::{NaiveTime, Weekday};

/// Digit positions misread by OCR: O for 0, I and l for 1.
const DIGITISH: &str = "[0-9OIL]";

const DAY_TOKEN: &str = "(?:MONDAYS?|MON|TUESDAYS?|TUES?|WEDNESDAYS?|WEDS?|WED|THURSDAYS?|THURS?|THU|FRIDAYS?|FRI|SATURDAYS?|SAT|SUNDAYS?|SUN)";

/// Parser knobs sourced from configuration, not hard-coded.
#[derive(Clone, Copy, Debug)]
pub struct ParseOptions {
    pub time_format: TimeFormat,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            time_format: TimeFormat::TwelveHour,
        }
    }
}

fn limit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"\b({d}{{1,2}})\s*-?\s*(HOURS?|HRS?|MINUTES?|MINS?)\b\s*(?:(?:PARKING|PARK|LIMIT|MAX(?:IMUM)?|TIME\s+LIMIT)\b)?",
            d = DIGITISH
        ))
        .expect("limit pattern")
    })
}

fn no_parking_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bNO\s+(?:PARKING|STOPPING|STANDING)\b|\bTOW[\s-]*AWAY(?:\s+ZONE)?\b")
            .expect("no-parking pattern")
    })
}

fn street_cleaning_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:STREET|ST)\s+(?:CLEANING|SWEEPING)\b").expect("street-cleaning pattern")
    })
}

/// A no-parking phrase directly before a street-cleaning phrase belongs to
/// the cleaning rule ("NO PARKING STREET CLEANING TUES 8-10AM").
fn cleaning_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bNO\s+(?:PARKING|STOPPING|STANDING)\s+(?:FOR\s+)?$").expect("prefix pattern")
    })
}

fn cleaning_next_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:FOR\s+)?(?:STREET|ST)\s+(?:CLEANING|SWEEPING)\b")
            .expect("cleaning-next pattern")
    })
}

fn permit_zone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:RESIDENT(?:IAL)?\s+)?PERMIT\s+(?:PARKING\s+)?(?:ZONE|AREA|DISTRICT)\s+([A-Z0-9]{1,3})(?:\s+ONLY)?\b|\b(?:ZONE|AREA|DISTRICT)\s+([A-Z0-9]{1,3})\s+(?:RESIDENT(?:IAL)?\s+)?PERMIT(?:\s+(?:PARKING|HOLDERS?))?(?:\s+ONLY)?\b",
        )
        .expect("permit-zone pattern")
    })
}

fn permit_bare_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:RESIDENT(?:IAL)?\s+)?PERMIT\s+(?:PARKING\s+)?(?:REQUIRED|ONLY|HOLDERS\s+ONLY)\b",
        )
        .expect("permit pattern")
    })
}

fn any_time_at_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?:AT\s+)?ANY\s*TIME|24\s*(?:HOURS?|HRS?)(?:\s+A\s+DAY)?)\b")
            .expect("any-time pattern")
    })
}

fn window_at_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"^({d}{{1,2}})(?::({d}{{2}}))?\s*(AM|PM)?\s*(?:-|TO|UNTIL|TIL)\s*({d}{{1,2}})(?::({d}{{2}}))?\s*(AM|PM)?\b",
            d = DIGITISH
        ))
        .expect("window pattern")
    })
}

fn day_expr_at_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"^(?:(?P<all>EVERY\s*DAY|ALL\s+DAYS|DAILY|SCHOOL\s+DAYS)|(?P<d1>{day})(?:\s*(?:(?P<rsep>-|THRU|THROUGH|TO)\s*(?P<d2>{day})|(?P<list>(?:\s*(?:,|/|&|\+|AND)\s*{day})+)))?)\b",
            day = DAY_TOKEN
        ))
        .expect("day pattern")
    })
}

fn day_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DAY_TOKEN).expect("day token pattern"))
}

/// Leading separators skipped between schedule components.
fn filler_at_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:[\s,]+|ON\b)+").expect("filler pattern"))
}

/// Uppercases, strips periods, folds unicode dashes to '-', and collapses all
/// whitespace (including line breaks inserted mid-phrase) to single spaces.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for c in text.chars() {
        let c = match c {
            '\u{2013}' | '\u{2014}' | '\u{2015}' | '\u{2500}' => '-',
            '.' => continue,
            c => c,
        };
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            for u in c.to_uppercase() {
                out.push(u);
            }
            last_was_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Repairs common OCR digit substitutions and parses the token.
/// Returns None for tokens with no digits at all after repair.
fn repair_number(token: &str) -> Option<u32> {
    let repaired: String = token
        .chars()
        .map(|c| match c {
            'O' => '0',
            'I' | 'L' => '1',
            c => c,
        })
        .collect();
    repaired.parse().ok()
}

/// Whether a digit-ish token contains at least one genuine digit. Pure-letter
/// tokens ("O", "IL") are too likely to be ordinary words to trust as times.
fn has_real_digit(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
}

fn weekday_of(token: &str) -> Option<Weekday> {
    let day = match token {
        t if t.starts_with("MON") => Weekday::Mon,
        t if t.starts_with("TU") => Weekday::Tue,
        t if t.starts_with("WED") => Weekday::Wed,
        t if t.starts_with("TH") => Weekday::Thu,
        t if t.starts_with("FRI") => Weekday::Fri,
        t if t.starts_with("SAT") => Weekday::Sat,
        t if t.starts_with("SUN") => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

/// Converts a matched day expression into a day set.
fn parse_day_expr(caps: &regex::Captures) -> Option<DaySet> {
    if let Some(all) = caps.name("all") {
        return Some(if all.as_str().starts_with("SCHOOL") {
            DaySet::range(Weekday::Mon, Weekday::Fri)
        } else {
            DaySet::all()
        });
    }

    let first = weekday_of(caps.name("d1")?.as_str())?;
    if caps.name("rsep").is_some() {
        let last = weekday_of(caps.name("d2")?.as_str())?;
        return Some(DaySet::range(first, last));
    }
    let mut days = DaySet::empty();
    days.insert(first);
    if let Some(list) = caps.name("list") {
        for tok in day_token_re().find_iter(list.as_str()) {
            if let Some(day) = weekday_of(tok.as_str()) {
                days.insert(day);
            }
        }
    }
    Some(days)
}

/// Resolves one end of a time range to a 24-hour clock hour.
/// `12AM` is midnight, `12PM` is noon.
fn to_hour24(hour12: u32, pm: bool) -> u32 {
    match (hour12, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    }
}

/// Converts a matched time range into a window, applying meridiem
/// inheritance: "8-10AM" reads as 8AM-10AM, "11-2PM" as 11AM-2PM, and a
/// fully bare "8-6" under the 12-hour locale as 8AM-6PM.
fn parse_window(caps: &regex::Captures, time_format: TimeFormat) -> Option<TimeWindow> {
    let h1_tok = caps.get(1)?.as_str();
    let h2_tok = caps.get(4)?.as_str();
    if !has_real_digit(h1_tok) || !has_real_digit(h2_tok) {
        return None;
    }
    let h1 = repair_number(h1_tok)?;
    let h2 = repair_number(h2_tok)?;
    let m1 = match caps.get(2) {
        Some(m) => repair_number(m.as_str())?,
        None => 0,
    };
    let m2 = match caps.get(5) {
        Some(m) => repair_number(m.as_str())?,
        None => 0,
    };
    if m1 >= 60 || m2 >= 60 {
        return None;
    }
    let mer1 = caps.get(3).map(|m| m.as_str() == "PM");
    let mer2 = caps.get(6).map(|m| m.as_str() == "PM");

    let (start_h, end_h) = match time_format {
        TimeFormat::TwentyFourHour if mer1.is_none() && mer2.is_none() => {
            if h1 > 23 || h2 > 23 {
                return None;
            }
            (h1, h2)
        }
        _ => {
            if h1 == 0 || h1 > 12 || h2 == 0 || h2 > 12 {
                return None;
            }
            let (pm1, pm2) = match (mer1, mer2) {
                (Some(p1), Some(p2)) => (p1, p2),
                // One side bare: inherit the other's meridiem when that
                // keeps the range forward, otherwise flip it.
                (None, Some(p2)) => {
                    let inherit = to_hour24(h1, p2) * 60 + m1 < to_hour24(h2, p2) * 60 + m2;
                    (if inherit { p2 } else { !p2 }, p2)
                }
                (Some(p1), None) => {
                    let inherit = to_hour24(h1, p1) * 60 + m1 < to_hour24(h2, p1) * 60 + m2;
                    (p1, if inherit { p1 } else { !p1 })
                }
                // No meridiem at all: a backwards-looking range like "8-6"
                // reads as AM-PM; a forward range reads as morning.
                (None, None) => {
                    if h2 <= h1 {
                        (false, true)
                    } else {
                        (false, false)
                    }
                }
            };
            (to_hour24(h1, pm1), to_hour24(h2, pm2))
        }
    };

    let start = NaiveTime::from_hms_opt(start_h, m1, 0)?;
    let end = NaiveTime::from_hms_opt(end_h, m2, 0)?;
    Some(TimeWindow::new(start, end))
}

/// Days/window/any-time components scanned off the text following a rule
/// keyword, in whatever order the sign states them.
struct ScheduleParts {
    days: Option<DaySet>,
    window: Option<TimeWindow>,
    any_time: bool,
    /// Absolute offset one past the last consumed character.
    end: usize,
}

/// Scans schedule components starting at `start`. The scan is anchored: it
/// advances only over recognized components and stops at the first stretch
/// of text that is none, so it never runs into the next rule's phrasing.
fn scan_schedule(norm: &str, start: usize, opts: &ParseOptions) -> ScheduleParts {
    let mut parts = ScheduleParts {
        days: None,
        window: None,
        any_time: false,
        end: start,
    };
    let mut pos = start;

    loop {
        let slice = &norm[pos..];
        let offset = match filler_at_re().find(slice) {
            Some(m) if m.start() == 0 => m.end(),
            _ => 0,
        };
        let slice = &norm[pos + offset..];
        if slice.is_empty() {
            break;
        }

        if let Some(m) = any_time_at_re().find(slice) {
            parts.any_time = true;
            pos += offset + m.end();
            parts.end = pos;
            continue;
        }
        if let Some(caps) = window_at_re().captures(slice) {
            if parts.window.is_none() {
                if let Some(window) = parse_window(&caps, opts.time_format) {
                    parts.window = Some(window);
                    pos += offset + caps.get(0).unwrap().end();
                    parts.end = pos;
                    continue;
                }
            }
            break;
        }
        if let Some(caps) = day_expr_at_re().captures(slice) {
            if parts.days.is_none() {
                if let Some(days) = parse_day_expr(&caps) {
                    parts.days = Some(days);
                    pos += offset + caps.get(0).unwrap().end();
                    parts.end = pos;
                    continue;
                }
            }
            break;
        }
        break;
    }

    parts
}

type Match = (Range<usize>, RestrictionRule);

fn match_time_limits(norm: &str, opts: &ParseOptions) -> Vec<Match> {
    let mut out = Vec::new();
    for caps in limit_re().captures_iter(norm) {
        let whole = caps.get(0).unwrap();
        let value = match repair_number(caps.get(1).unwrap().as_str()) {
            Some(v) => v,
            None => continue,
        };
        let unit = caps.get(2).unwrap().as_str();
        let minutes = if unit.starts_with('H') {
            // Posted stay limits top out around half a day; "24 HOURS" is
            // an any-time phrase, not a limit.
            if value == 0 || value > 12 {
                continue;
            }
            value * 60
        } else {
            if value == 0 {
                continue;
            }
            value
        };

        // A limit is often followed by its hours of operation
        // ("2 HR PARKING 8AM-6PM MON-FRI"); swallow that schedule so it is
        // not reported as an unrecognized fragment.
        let tail = scan_schedule(norm, whole.end(), opts);

        out.push((
            whole.start()..tail.end.max(whole.end()),
            RestrictionRule::TimeLimit { minutes },
        ));
    }
    out
}

fn match_no_parking(norm: &str, opts: &ParseOptions) -> Vec<Match> {
    let mut out = Vec::new();
    for m in no_parking_re().find_iter(norm) {
        let parts = scan_schedule(norm, m.end(), opts);

        // "NO PARKING STREET CLEANING ..." is the cleaning matcher's rule.
        let bare = parts.days.is_none() && parts.window.is_none() && !parts.any_time;
        if bare && cleaning_next_re().is_match(&norm[m.end()..]) {
            continue;
        }

        let days = parts.days.unwrap_or_else(DaySet::all);
        let window = if parts.any_time {
            TimeWindow::full_day()
        } else {
            parts.window.unwrap_or_else(TimeWindow::full_day)
        };
        out.push((
            m.start()..parts.end.max(m.end()),
            RestrictionRule::NoParkingWindow { days, window },
        ));
    }
    out
}

fn match_street_cleaning(norm: &str, opts: &ParseOptions) -> Vec<Match> {
    let mut out = Vec::new();
    for m in street_cleaning_re().find_iter(norm) {
        let parts = scan_schedule(norm, m.end(), opts);

        let days = parts.days.unwrap_or_else(DaySet::all);
        let window = if parts.any_time {
            TimeWindow::full_day()
        } else {
            parts.window.unwrap_or_else(TimeWindow::full_day)
        };

        // Pull a directly preceding "NO PARKING" phrase into this rule's
        // span; it introduces the cleaning restriction.
        let start = match cleaning_prefix_re().find(&norm[..m.start()]) {
            Some(prefix) => prefix.start(),
            None => m.start(),
        };

        out.push((
            start..parts.end.max(m.end()),
            RestrictionRule::StreetCleaning { days, window },
        ));
    }
    out
}

fn match_permits(norm: &str) -> Vec<Match> {
    let mut out = Vec::new();
    for caps in permit_zone_re().captures_iter(norm) {
        let whole = caps.get(0).unwrap();
        let zone = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|z| z.as_str().to_string())
            .unwrap_or_default();
        out.push((
            whole.start()..whole.end(),
            RestrictionRule::PermitOnly { zone },
        ));
    }
    // Zone-less permit phrasing, skipping spans a zoned match already covers.
    for m in permit_bare_re().find_iter(norm) {
        let overlaps = out
            .iter()
            .any(|(range, _)| m.start() < range.end && range.start < m.end());
        if !overlaps {
            out.push((
                m.start()..m.end(),
                RestrictionRule::PermitOnly {
                    zone: String::new(),
                },
            ));
        }
    }
    out
}

/// Connective words that alone do not make a fragment worth reporting.
const FRAGMENT_STOPWORDS: [&str; 12] = [
    "ONLY", "AND", "OR", "THE", "TO", "AT", "ON", "FOR", "PARKING", "PARK", "A", "AN",
];

fn is_reportable_fragment(fragment: &str) -> bool {
    let alnum = fragment.chars().filter(|c| c.is_alphanumeric()).count();
    if alnum < 3 {
        return false;
    }
    fragment
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|w| !FRAGMENT_STOPWORDS.contains(&w))
}

/// Parses recognized sign text into restriction rules, ordered by position
/// of appearance. Never fails; unmatched text becomes `Unknown` fragments.
pub fn parse(text: &str, opts: &ParseOptions) -> Vec<RestrictionRule> {
    let norm = normalize(text);
    if norm.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<Match> = Vec::new();
    matches.extend(match_time_limits(&norm, opts));
    matches.extend(match_permits(&norm));
    matches.extend(match_no_parking(&norm, opts));
    matches.extend(match_street_cleaning(&norm, opts));
    matches.sort_by_key(|(range, _)| (range.start, range.end));

    // Merge matched spans, then report the gaps between them as Unknown.
    let mut consumed: Vec<Range<usize>> = Vec::new();
    for (range, _) in &matches {
        match consumed.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => consumed.push(range.clone()),
        }
    }

    let mut rules: Vec<(usize, RestrictionRule)> = matches
        .into_iter()
        .map(|(range, rule)| (range.start, rule))
        .collect();

    let mut gap_start = 0;
    for span in consumed.iter().chain(std::iter::once(&(norm.len()..norm.len()))) {
        if span.start > gap_start {
            let fragment = norm[gap_start..span.start].trim_matches(|c: char| !c.is_alphanumeric());
            if is_reportable_fragment(fragment) {
                rules.push((
                    gap_start,
                    RestrictionRule::Unknown {
                        fragment: fragment.to_string(),
                    },
                ));
            }
        }
        gap_start = gap_start.max(span.end);
    }

    rules.sort_by_key(|(start, _)| *start);
    rules.into_iter().map(|(_, rule)| rule).collect()
}
