//! Decision engine: restriction rules + a reference timestamp → one verdict.
//!
//! The policy is deliberately conservative: a hard prohibition in force beats
//! any time limit, a permit requirement counts against a driver with no
//! permit, and a sign that parsed to nothing decisive is "can't park" — the
//! cost of a wrong go-ahead (ticket, tow) dwarfs the cost of a re-scan.

use chrono::{DateTime, Datelike, Local};
use std::fmt;
use std::time::Duration;

use crate::sign::rules::RestrictionRule;

/// The final park/no-park decision for the current moment.
///
/// A verdict always carries the rule that produced it; there is no verdict
/// without evidence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParkVerdict {
    GoodToPark {
        remaining: Duration,
        matched_rule: RestrictionRule,
    },
    CantPark {
        reason: RestrictionRule,
        matched_rule: RestrictionRule,
    },
}

impl fmt::Display for ParkVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParkVerdict::GoodToPark {
                remaining,
                matched_rule,
            } => {
                let minutes = remaining.as_secs() / 60;
                write!(
                    f,
                    "Good to park: {}h {:02}m remaining ({})",
                    minutes / 60,
                    minutes % 60,
                    matched_rule
                )
            }
            ParkVerdict::CantPark { reason, .. } => write!(f, "Can't park: {}", reason),
        }
    }
}

/// Evaluates parsed rules against the reference timestamp.
///
/// 1. A prohibition window (no-parking or street cleaning) containing `now`
///    wins outright; the first such rule in text order is the reason.
/// 2. Any permit requirement counts against the driver (permit verification
///    is an external concern; the driver is assumed permitless).
/// 3. Otherwise the shortest time limit grants parking; the remaining
///    allowance is the full limit, counted from the moment of query.
/// 4. No decisive rules at all is a conservative "can't park".
pub fn decide(rules: &[RestrictionRule], now: DateTime<Local>) -> ParkVerdict {
    let weekday = now.weekday();
    let time = now.time();

    for rule in rules {
        if rule.is_prohibition() && rule.applies_at(weekday, time) {
            return ParkVerdict::CantPark {
                reason: rule.clone(),
                matched_rule: rule.clone(),
            };
        }
    }

    for rule in rules {
        if let RestrictionRule::PermitOnly { .. } = rule {
            return ParkVerdict::CantPark {
                reason: rule.clone(),
                matched_rule: rule.clone(),
            };
        }
    }

    let shortest = rules
        .iter()
        .filter_map(|rule| match rule {
            RestrictionRule::TimeLimit { minutes } => Some((*minutes, rule)),
            _ => None,
        })
        .min_by_key(|(minutes, _)| *minutes);
    if let Some((minutes, rule)) = shortest {
        return ParkVerdict::GoodToPark {
            remaining: Duration::from_secs(u64::from(minutes) * 60),
            matched_rule: rule.clone(),
        };
    }

    // Nothing decisive parsed. Report the first unmatched fragment as the
    // evidence; an entirely empty rule set gets an empty fragment.
    let reason = rules
        .iter()
        .find(|rule| !rule.is_decisive())
        .cloned()
        .unwrap_or(RestrictionRule::Unknown {
            fragment: String::new(),
        });
    ParkVerdict::CantPark {
        matched_rule: reason.clone(),
        reason,
    }
}
