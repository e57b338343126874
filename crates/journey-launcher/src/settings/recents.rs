//! Last-launched timestamps, keyed by app folder name.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

use super::SettingsStore;
use crate::error::Result;

/// Key prefix for last-launched entries.
pub const RECENTS_PREFIX: &str = "recents/";

/// One stored last-launched entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentEntry {
    /// App folder name.
    pub name: String,
    /// Value as stored.
    pub raw: String,
    /// Parsed timestamp, `None` if the stored value is not a timestamp.
    pub at: Option<DateTime<Utc>>,
}

fn key_for(name: &str) -> String {
    format!("{RECENTS_PREFIX}{name}")
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 and offset-less ISO 8601 (read as local time).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// When `name` was last launched, if ever.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn last_launched(store: &dyn SettingsStore, name: &str) -> Result<Option<DateTime<Utc>>> {
    Ok(store.get(&key_for(name))?.as_deref().and_then(parse_timestamp))
}

/// Every stored entry, ordered by app name.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn all(store: &dyn SettingsStore) -> Result<Vec<RecentEntry>> {
    Ok(store
        .entries_with_prefix(RECENTS_PREFIX)?
        .into_iter()
        .map(|(key, raw)| RecentEntry {
            name: key[RECENTS_PREFIX.len()..].to_string(),
            at: parse_timestamp(&raw),
            raw,
        })
        .collect())
}

/// Record a launch of `name` at `at`, then trim the list to `max_recents`.
///
/// # Errors
///
/// Returns an error if the store cannot be written.
pub fn record_launch(
    store: &dyn SettingsStore,
    name: &str,
    at: DateTime<Utc>,
    max_recents: usize,
) -> Result<()> {
    store.set(&key_for(name), &at.to_rfc3339())?;
    prune(store, max_recents)?;
    Ok(())
}

/// Remove the oldest entries beyond `max_recents`. Unparseable entries count
/// as oldest. Returns how many were removed.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub fn prune(store: &dyn SettingsStore, max_recents: usize) -> Result<usize> {
    let mut entries = all(store)?;
    if entries.len() <= max_recents {
        return Ok(0);
    }

    entries.sort_by(|a, b| {
        a.at.unwrap_or(DateTime::<Utc>::MIN_UTC)
            .cmp(&b.at.unwrap_or(DateTime::<Utc>::MIN_UTC))
            .then_with(|| a.name.cmp(&b.name))
    });

    let excess = entries.len() - max_recents;
    for entry in &entries[..excess] {
        store.remove(&key_for(&entry.name))?;
        debug!("Dropped recent entry for {}", entry.name);
    }
    Ok(excess)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use chrono::Duration;

    fn store() -> Settings {
        Settings::open_in_memory().unwrap()
    }

    #[test]
    fn test_never_launched() {
        let s = store();
        assert!(last_launched(&s, "Journey").unwrap().is_none());
    }

    #[test]
    fn test_record_and_read_back() {
        let s = store();
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();

        record_launch(&s, "Journey", at, 8).unwrap();

        assert_eq!(last_launched(&s, "Journey").unwrap(), Some(at));
        assert!(last_launched(&s, "Cycle Tracker").unwrap().is_none());
    }

    #[test]
    fn test_keyed_by_exact_folder_name() {
        let s = store();
        let at = Utc::now();
        record_launch(&s, "Journey Journal", at, 8).unwrap();

        assert!(s.get("recents/Journey Journal").unwrap().is_some());
        assert!(last_launched(&s, "Journey").unwrap().is_none());
    }

    #[test]
    fn test_prune_keeps_newest() {
        let s = store();
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        for i in 0..5 {
            record_launch(&s, &format!("app{i}"), base + Duration::hours(i), 100).unwrap();
        }

        let removed = prune(&s, 3).unwrap();
        assert_eq!(removed, 2);

        let names: Vec<String> = all(&s).unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["app2", "app3", "app4"]);
    }

    #[test]
    fn test_record_launch_caps_list() {
        let s = store();
        let base = Utc::now();
        for i in 0..4 {
            record_launch(&s, &format!("app{i}"), base + Duration::seconds(i), 2).unwrap();
        }

        assert_eq!(all(&s).unwrap().len(), 2);
        assert!(last_launched(&s, "app3").unwrap().is_some());
        assert!(last_launched(&s, "app0").unwrap().is_none());
    }

    #[test]
    fn test_unparseable_entries_pruned_first() {
        let s = store();
        s.set("recents/broken", "last tuesday").unwrap();
        record_launch(&s, "fine", Utc::now(), 8).unwrap();

        assert_eq!(prune(&s, 1).unwrap(), 1);
        let remaining = all(&s).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "fine");
    }

    #[test]
    fn test_all_keeps_raw_value() {
        let s = store();
        s.set("recents/odd", "not a date").unwrap();

        let entries = all(&s).unwrap();
        assert_eq!(entries[0].raw, "not a date");
        assert!(entries[0].at.is_none());
    }

    #[test]
    fn test_parse_rfc3339() {
        let parsed = parse_timestamp("2026-03-14T09:26:53+00:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap());
    }

    #[test]
    fn test_parse_naive_iso_as_local() {
        let parsed = parse_timestamp("2026-03-14T09:26:53").unwrap();
        let expected = Local
            .with_ymd_and_hms(2026, 3, 14, 9, 26, 53)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
