//! Sign interpretation: parsing recognized sign text into restriction rules
//! and deciding whether parking is allowed right now.

pub mod decide;
pub mod parse;
pub mod rules;

pub use decide::{decide, ParkVerdict};
pub use parse::{parse, ParseOptions};
pub use rules::{DaySet, RestrictionRule, TimeWindow};

#[cfg(test)]
mod tests {
    //! Full parse-then-decide runs over realistic sign text.

    use super::*;
    use chrono::{DateTime, Local, NaiveDate, TimeZone};
    use std::time::Duration;

    fn at(date: NaiveDate, h: u32, m: u32) -> DateTime<Local> {
        Local
            .from_local_datetime(&date.and_hms_opt(h, m, 0).unwrap())
            .unwrap()
    }

    fn interpret(text: &str, now: DateTime<Local>) -> ParkVerdict {
        decide(&parse(text, &ParseOptions::default()), now)
    }

    #[test]
    fn test_two_hour_sign_on_a_wednesday_morning() {
        // Wednesday 2017-09-20 10:00.
        let now = at(NaiveDate::from_ymd_opt(2017, 9, 20).unwrap(), 10, 0);
        let verdict = interpret("2 HR PARKING 8AM-6PM MON-FRI", now);
        assert_eq!(
            verdict,
            ParkVerdict::GoodToPark {
                remaining: Duration::from_secs(2 * 3600),
                matched_rule: RestrictionRule::TimeLimit { minutes: 120 },
            }
        );
    }

    #[test]
    fn test_cleaning_sign_during_the_cleaning_window() {
        // Tuesday 2017-09-19 09:00.
        let now = at(NaiveDate::from_ymd_opt(2017, 9, 19).unwrap(), 9, 0);
        let verdict = interpret("NO PARKING STREET CLEANING TUES 8AM-10AM", now);
        assert!(matches!(
            verdict,
            ParkVerdict::CantPark {
                reason: RestrictionRule::StreetCleaning { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_permit_zone_sign_without_a_permit() {
        let now = at(NaiveDate::from_ymd_opt(2017, 9, 20).unwrap(), 10, 0);
        let verdict = interpret("PERMIT ZONE 4 ONLY", now);
        assert_eq!(
            verdict,
            ParkVerdict::CantPark {
                reason: RestrictionRule::PermitOnly { zone: "4".into() },
                matched_rule: RestrictionRule::PermitOnly { zone: "4".into() },
            }
        );
    }

    #[test]
    fn test_garbled_sign_is_never_a_go_ahead() {
        let now = at(NaiveDate::from_ymd_opt(2017, 9, 20).unwrap(), 10, 0);
        let verdict = interpret("XYZ GARBLED TEXT", now);
        assert_eq!(
            verdict,
            ParkVerdict::CantPark {
                reason: RestrictionRule::Unknown {
                    fragment: "XYZ GARBLED TEXT".into()
                },
                matched_rule: RestrictionRule::Unknown {
                    fragment: "XYZ GARBLED TEXT".into()
                },
            }
        );
    }

    #[test]
    fn test_multi_rule_sign_picks_the_active_restriction() {
        let sign = "2 HR PARKING 8AM-6PM MON-FRI\nNO PARKING STREET CLEANING TUES 8AM-10AM";

        // Tuesday 09:00: the cleaning window is in force.
        let tuesday = at(NaiveDate::from_ymd_opt(2017, 9, 19).unwrap(), 9, 0);
        assert!(matches!(
            interpret(sign, tuesday),
            ParkVerdict::CantPark {
                reason: RestrictionRule::StreetCleaning { .. },
                ..
            }
        ));

        // Wednesday 10:00: the limit applies instead.
        let wednesday = at(NaiveDate::from_ymd_opt(2017, 9, 20).unwrap(), 10, 0);
        assert!(matches!(
            interpret(sign, wednesday),
            ParkVerdict::GoodToPark { .. }
        ));
    }
}
