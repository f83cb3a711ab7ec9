use std::cmp::{Ordering, Reverse};
use std::fmt;

use time::{Month, OffsetDateTime};

use crate::model::{from_millis, Note};
use crate::pins::{effective_pinned, PinOverrides};

/// Display group for a note. `Ord` follows display precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Pinned,
    Today,
    Yesterday,
    Previous7Days,
    Previous30Days,
    Month { year: i32, month: Month },
    Year(i32),
}

impl Bucket {
    /// Stable key, e.g. `Today`, `Month-2026-03`, `Year-2024`.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Human heading for the grouped list.
    pub fn label(&self) -> String {
        match self {
            Bucket::Pinned => "Pinned".to_string(),
            Bucket::Today => "Today".to_string(),
            Bucket::Yesterday => "Yesterday".to_string(),
            Bucket::Previous7Days => "Previous 7 Days".to_string(),
            Bucket::Previous30Days => "Previous 30 Days".to_string(),
            Bucket::Month { month, .. } => month.to_string(),
            Bucket::Year(year) => year.to_string(),
        }
    }

    fn sort_key(&self) -> (u8, Reverse<i32>, Reverse<u8>) {
        match *self {
            Bucket::Pinned => (0, Reverse(0), Reverse(0)),
            Bucket::Today => (1, Reverse(0), Reverse(0)),
            Bucket::Yesterday => (2, Reverse(0), Reverse(0)),
            Bucket::Previous7Days => (3, Reverse(0), Reverse(0)),
            Bucket::Previous30Days => (4, Reverse(0), Reverse(0)),
            Bucket::Month { year, month } => (5, Reverse(year), Reverse(u8::from(month))),
            Bucket::Year(year) => (6, Reverse(year), Reverse(0)),
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Pinned => f.write_str("Pinned"),
            Bucket::Today => f.write_str("Today"),
            Bucket::Yesterday => f.write_str("Yesterday"),
            Bucket::Previous7Days => f.write_str("Previous7Days"),
            Bucket::Previous30Days => f.write_str("Previous30Days"),
            Bucket::Month { year, month } => write!(f, "Month-{year}-{:02}", u8::from(*month)),
            Bucket::Year(year) => write!(f, "Year-{year}"),
        }
    }
}

impl Ord for Bucket {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Bucket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pinned notes go to `Pinned`; everything else by effective timestamp.
pub fn classify(note: &Note, overrides: &PinOverrides, now: OffsetDateTime) -> Bucket {
    if effective_pinned(note, overrides) {
        return Bucket::Pinned;
    }
    classify_timestamp(note.effective_timestamp(), now)
}

/// Calendar-day distance in `now`'s offset, so midnight is the boundary
/// rather than a rolling 24 hours. Timestamps after `now` count as today.
pub fn classify_timestamp(millis: i64, now: OffsetDateTime) -> Bucket {
    let at = from_millis(millis).to_offset(now.offset());
    let days_since = now.date().to_julian_day() - at.date().to_julian_day();
    match days_since {
        i32::MIN..=0 => Bucket::Today,
        1 => Bucket::Yesterday,
        2..=7 => Bucket::Previous7Days,
        8..=30 => Bucket::Previous30Days,
        _ if at.year() == now.year() => Bucket::Month {
            year: at.year(),
            month: at.month(),
        },
        _ => Bucket::Year(at.year()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{admin_pinned, note};
    use crate::model::to_millis;
    use time::macros::{datetime, offset};
    use time::Duration;

    #[test]
    fn midnight_separates_today_and_yesterday() {
        let now = datetime!(2026-06-15 00:30 UTC);
        let late_yesterday = to_millis(datetime!(2026-06-14 23:59 UTC));
        let early_today = to_millis(datetime!(2026-06-15 00:01 UTC));
        assert_eq!(classify_timestamp(late_yesterday, now), Bucket::Yesterday);
        assert_eq!(classify_timestamp(early_today, now), Bucket::Today);
    }

    #[test]
    fn day_ranges_map_to_relative_buckets() {
        let now = datetime!(2026-06-15 12:00 UTC);
        let days_ago = |days: i64| to_millis(now - Duration::days(days));
        assert_eq!(classify_timestamp(days_ago(2), now), Bucket::Previous7Days);
        assert_eq!(classify_timestamp(days_ago(7), now), Bucket::Previous7Days);
        assert_eq!(classify_timestamp(days_ago(8), now), Bucket::Previous30Days);
        assert_eq!(classify_timestamp(days_ago(30), now), Bucket::Previous30Days);
        assert_eq!(
            classify_timestamp(days_ago(31), now),
            Bucket::Month {
                year: 2026,
                month: Month::May
            }
        );
    }

    #[test]
    fn creation_time_forty_days_back_lands_in_its_month() {
        let now = datetime!(2026-04-20 09:00 UTC);
        let created = to_millis(datetime!(2026-03-11 09:00 UTC));
        let bucket = classify(&note("old", None, created), &PinOverrides::default(), now);
        assert_eq!(bucket.key(), "Month-2026-03");
        assert_eq!(bucket.label(), "March");
    }

    #[test]
    fn previous_years_use_year_bucket() {
        let now = datetime!(2026-01-10 09:00 UTC);
        let bucket = classify_timestamp(to_millis(datetime!(2025-11-02 09:00 UTC)), now);
        assert_eq!(bucket, Bucket::Year(2025));
        assert_eq!(bucket.key(), "Year-2025");
        assert_eq!(bucket.label(), "2025");
    }

    #[test]
    fn day_boundary_follows_now_offset() {
        // 23:30 UTC on the 14th is already the 15th at +02:00
        let now = datetime!(2026-06-15 08:00 +02:00);
        let at = to_millis(datetime!(2026-06-14 23:30 UTC));
        assert_eq!(classify_timestamp(at, now), Bucket::Today);
        let now_utc = now.to_offset(offset!(UTC));
        assert_eq!(classify_timestamp(at, now_utc), Bucket::Yesterday);
    }

    #[test]
    fn pinned_wins_over_timestamp() {
        let now = datetime!(2026-06-15 12:00 UTC);
        let ancient = admin_pinned("about-me", Some(0), 0);
        assert_eq!(
            classify(&ancient, &PinOverrides::default(), now),
            Bucket::Pinned
        );
    }

    #[test]
    fn future_timestamps_count_as_today() {
        let now = datetime!(2026-06-15 12:00 UTC);
        let ahead = to_millis(now + Duration::days(3));
        assert_eq!(classify_timestamp(ahead, now), Bucket::Today);
    }

    #[test]
    fn buckets_order_by_display_precedence() {
        let mut buckets = vec![
            Bucket::Year(2023),
            Bucket::Month {
                year: 2026,
                month: Month::January,
            },
            Bucket::Today,
            Bucket::Year(2025),
            Bucket::Month {
                year: 2026,
                month: Month::March,
            },
            Bucket::Pinned,
            Bucket::Previous30Days,
        ];
        buckets.sort();
        let keys: Vec<_> = buckets.iter().map(Bucket::key).collect();
        assert_eq!(
            keys,
            vec![
                "Pinned",
                "Today",
                "Previous30Days",
                "Month-2026-03",
                "Month-2026-01",
                "Year-2025",
                "Year-2023"
            ]
        );
    }
}
