//! Human-friendly "last opened" text.

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::settings::RecentEntry;

/// Describe `at` relative to `now`.
///
/// Times under a minute read as `just now` or `N seconds ago`, then minutes,
/// then hours. Between one and two days back it is `yesterday at 3:07 PM`;
/// anything older shows the date and clock time. Future timestamps read as
/// `just now`. Clock times are rendered in the time zone of `at`.
#[must_use]
pub fn format_when<Tz>(at: &DateTime<Tz>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let seconds = now.clone().signed_duration_since(at.clone()).num_seconds();
    if seconds < 60 {
        return if seconds < 10 {
            "just now".to_string()
        } else {
            format!("{seconds} seconds ago")
        };
    }

    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes} minute{} ago", plural(minutes));
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours} hour{} ago", plural(hours));
    }

    if hours / 24 == 1 {
        return format!("yesterday at {}", at.format("%-I:%M %p"));
    }

    at.format("%Y-%m-%d %I:%M %p").to_string().replace(" 0", " ")
}

/// `format_when` against the current local time.
#[must_use]
pub fn format_since(at: DateTime<Utc>) -> String {
    format_when(&at.with_timezone(&Local), &Local::now())
}

/// Text for a recents entry: relative when it parses, verbatim when it doesn't.
#[must_use]
pub fn describe_recent(entry: &RecentEntry) -> String {
    entry
        .at
        .map_or_else(|| entry.raw.clone(), format_since)
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap()
    }

    fn ago(d: Duration) -> String {
        let now = now();
        format_when(&(now - d), &now)
    }

    #[test]
    fn test_just_now() {
        assert_eq!(ago(Duration::seconds(0)), "just now");
        assert_eq!(ago(Duration::seconds(9)), "just now");
    }

    #[test]
    fn test_future_is_just_now() {
        assert_eq!(ago(Duration::seconds(-300)), "just now");
    }

    #[test]
    fn test_seconds() {
        assert_eq!(ago(Duration::seconds(10)), "10 seconds ago");
        assert_eq!(ago(Duration::seconds(59)), "59 seconds ago");
    }

    #[test]
    fn test_minutes() {
        assert_eq!(ago(Duration::seconds(60)), "1 minute ago");
        assert_eq!(ago(Duration::minutes(5)), "5 minutes ago");
        assert_eq!(ago(Duration::minutes(59)), "59 minutes ago");
    }

    #[test]
    fn test_hours() {
        assert_eq!(ago(Duration::minutes(60)), "1 hour ago");
        assert_eq!(ago(Duration::hours(23)), "23 hours ago");
    }

    #[test]
    fn test_yesterday() {
        // 2024-03-14 09:05 UTC
        assert_eq!(
            ago(Duration::hours(29) + Duration::minutes(25)),
            "yesterday at 9:05 AM"
        );
        assert_eq!(ago(Duration::hours(24)), "yesterday at 2:30 PM");
    }

    #[test]
    fn test_older_shows_date() {
        assert_eq!(ago(Duration::days(3)), "2024-03-12 2:30 PM");
        assert_eq!(ago(Duration::days(10) - Duration::hours(4)), "2024-03-05 6:30 PM");
    }

    #[test]
    fn test_older_keeps_two_digit_hours() {
        let now = now();
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 11, 45, 0).unwrap();
        assert_eq!(format_when(&at, &now), "2024-01-02 11:45 AM");
    }

    #[test]
    fn test_describe_unparseable_verbatim() {
        let entry = RecentEntry {
            name: "Journey".to_string(),
            raw: "sometime last week".to_string(),
            at: None,
        };
        assert_eq!(describe_recent(&entry), "sometime last week");
    }

    #[test]
    fn test_describe_recent_entry() {
        let entry = RecentEntry {
            name: "Journey".to_string(),
            raw: String::new(),
            at: Some(Utc::now()),
        };
        assert_eq!(describe_recent(&entry), "just now");
    }
}
