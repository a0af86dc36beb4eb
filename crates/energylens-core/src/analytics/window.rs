//! Time frame resolution

use chrono::{DateTime, Duration, Utc};

use crate::models::{end_of_day, start_of_day, DateRange, TimeFrame};

/// Resolve `time_frame` against the reference instant `now`.
///
/// The window ends at `23:59:59.999` UTC of `now`'s day and starts at
/// midnight `time_frame.days_back()` days earlier.
pub fn resolve(time_frame: TimeFrame, now: DateTime<Utc>) -> DateRange {
    let today = now.date_naive();
    DateRange::new(
        start_of_day(today - Duration::days(time_frame.days_back())),
        end_of_day(today),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use rstest::rstest;

    #[rstest]
    #[case::weekly(TimeFrame::Weekly, 7)]
    #[case::monthly(TimeFrame::Monthly, 30)]
    #[case::yearly(TimeFrame::Yearly, 365)]
    fn test_window_span(#[case] time_frame: TimeFrame, #[case] days: i64) {
        let now = Utc.with_ymd_and_hms(2025, 5, 20, 14, 37, 12).unwrap();
        let range = resolve(time_frame, now);

        assert!(range.start <= range.end);
        assert_eq!((range.end.date_naive() - range.start.date_naive()).num_days(), days);
        assert_eq!(range.end.date_naive(), now.date_naive());
        assert_eq!(
            (range.end.hour(), range.end.minute(), range.end.second()),
            (23, 59, 59)
        );
        assert_eq!(range.end.timestamp_subsec_millis(), 999);
        assert_eq!(range.start.num_seconds_from_midnight(), 0);
    }

    #[test]
    fn test_unrecognized_keyword_resolves_weekly() {
        let now = Utc.with_ymd_and_hms(2025, 1, 3, 0, 0, 0).unwrap();
        assert_eq!(
            resolve(TimeFrame::parse_lenient("quarterly"), now),
            resolve(TimeFrame::Weekly, now)
        );
        assert_eq!(
            resolve(TimeFrame::Weekly, now).start,
            Utc.with_ymd_and_hms(2024, 12, 27, 0, 0, 0).unwrap()
        );
    }
}
