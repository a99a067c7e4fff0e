//! Week/day schedule generation
//!
//! Maps the pages of a scanned logbook onto consecutive five-day work weeks.
//! Page `n` becomes week `n + 1`; generation stops when the pages run out or
//! the next week would start after the end date.

use crate::config::{WEEKEND_SKIP_DAYS, WORK_WEEK_SPAN_DAYS};
use crate::database::{DateValue, Day, Week, Weekday};
use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;

/// Build the week skeleton for a logbook.
///
/// A week's `end_date` is clamped to `end_date`, but its day dates are always
/// `start_date + 0..=4`, so the last week may list days past the range.
/// Dates beyond the calendar's representable range end generation early.
pub fn generate_weeks(start_date: NaiveDate, end_date: NaiveDate, total_pages: u32) -> Vec<Week> {
    let mut weeks = Vec::new();
    let mut current = start_date;

    for page in 0..total_pages {
        let Some(span_end) = add_days(current, WORK_WEEK_SPAN_DAYS) else {
            break;
        };
        let week_end = span_end.min(end_date);

        let Some(days) = build_days(current) else {
            break;
        };

        weeks.push(Week {
            week_number: page + 1,
            start_date: DateValue::Native(current),
            end_date: DateValue::Native(week_end),
            weekly_goal: String::new(),
            days,
        });

        // Skip the weekend
        match add_days(week_end, WEEKEND_SKIP_DAYS) {
            Some(next) => current = next,
            None => break,
        }

        if current > end_date {
            break;
        }
    }

    tracing::debug!(
        "Generated {} weeks for {} pages ({} to {})",
        weeks.len(),
        total_pages,
        start_date,
        end_date
    );

    weeks
}

fn build_days(week_start: NaiveDate) -> Option<BTreeMap<Weekday, Day>> {
    Weekday::ALL
        .into_iter()
        .map(|weekday| {
            add_days(week_start, weekday.offset()).map(|date| {
                (
                    weekday,
                    Day {
                        date: DateValue::Native(date),
                        text: String::new(),
                        tags: Vec::new(),
                    },
                )
            })
        })
        .collect()
}

fn add_days(date: NaiveDate, days: u64) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(days))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day_date(week: &Week, weekday: Weekday) -> NaiveDate {
        week.days[&weekday].date.to_date().unwrap()
    }

    #[test]
    fn test_zero_pages_yields_nothing() {
        let weeks = generate_weeks(date(2024, 1, 1), date(2024, 12, 31), 0);
        assert!(weeks.is_empty());
    }

    #[test]
    fn test_january_range() {
        let weeks = generate_weeks(date(2024, 1, 1), date(2024, 1, 31), 5);

        let first = &weeks[0];
        assert_eq!(first.week_number, 1);
        assert_eq!(first.start_date.to_date(), Some(date(2024, 1, 1)));
        assert_eq!(first.end_date.to_date(), Some(date(2024, 1, 5)));
        assert_eq!(day_date(first, Weekday::Monday), date(2024, 1, 1));
        assert_eq!(day_date(first, Weekday::Friday), date(2024, 1, 5));

        assert_eq!(weeks[1].start_date.to_date(), Some(date(2024, 1, 8)));
        assert!(first.weekly_goal.is_empty());
    }

    #[test]
    fn test_single_day_range() {
        let weeks = generate_weeks(date(2024, 3, 15), date(2024, 3, 15), 3);

        assert_eq!(weeks.len(), 1);
        let week = &weeks[0];
        assert_eq!(week.start_date.to_date(), Some(date(2024, 3, 15)));
        assert_eq!(week.end_date.to_date(), Some(date(2024, 3, 15)));
        assert_eq!(day_date(week, Weekday::Friday), date(2024, 3, 19));
    }

    #[test]
    fn test_week_numbers_are_contiguous() {
        let weeks = generate_weeks(date(2024, 1, 1), date(2024, 12, 31), 20);

        assert_eq!(weeks.len(), 20);
        for (position, week) in weeks.iter().enumerate() {
            assert_eq!(week.week_number as usize, position + 1);
        }
    }

    #[test]
    fn test_every_week_has_five_offset_days() {
        let weeks = generate_weeks(date(2024, 1, 3), date(2024, 2, 20), 10);

        for week in &weeks {
            let keys: Vec<Weekday> = week.days.keys().copied().collect();
            assert_eq!(keys, Weekday::ALL.to_vec());

            let start = week.start_date.to_date().unwrap();
            for weekday in Weekday::ALL {
                assert_eq!(
                    day_date(week, weekday),
                    start + Days::new(weekday.offset())
                );
                assert!(week.days[&weekday].text.is_empty());
                assert!(week.days[&weekday].tags.is_empty());
            }
        }
    }

    #[test]
    fn test_clamped_week_keeps_full_day_span() {
        // Range ends on a Wednesday; the last week is clamped but Friday still follows
        let weeks = generate_weeks(date(2024, 1, 1), date(2024, 1, 10), 5);

        assert_eq!(weeks.len(), 2);
        let last = &weeks[1];
        assert_eq!(last.start_date.to_date(), Some(date(2024, 1, 8)));
        assert_eq!(last.end_date.to_date(), Some(date(2024, 1, 10)));
        assert_eq!(day_date(last, Weekday::Friday), date(2024, 1, 12));
    }

    #[test]
    fn test_pages_limit_weeks() {
        let weeks = generate_weeks(date(2024, 1, 1), date(2024, 12, 31), 3);
        assert_eq!(weeks.len(), 3);
        assert_eq!(weeks[2].start_date.to_date(), Some(date(2024, 1, 15)));
    }

    #[test]
    fn test_calendar_overflow_stops_generation() {
        let weeks = generate_weeks(NaiveDate::MAX, NaiveDate::MAX, 2);
        assert!(weeks.is_empty());
    }
}
