//! Snapshot resolution: finds the latest dump folder in the bucket.

use crate::error::DumpError;
use crate::store::ObjectStore;
use crate::types::{DownloadConfig, ObjectEntry, SelectionPolicy, SnapshotId};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

/// Returns the snapshot token of a key sitting directly under `namespace`,
/// e.g. `hotels/20230101` yields `20230101`. Deeper keys yield `None`.
pub(crate) fn snapshot_token<'a>(key: &'a str, namespace: &str) -> Option<&'a str> {
    let token = key.strip_prefix(namespace)?.strip_prefix('/')?;
    if token.is_empty() || token.contains('/') {
        return None;
    }
    Some(token)
}

/// Returns the token of a key of the form `<namespace>/<token>/<marker>`.
fn marked_token<'a>(key: &'a str, namespace: &str, marker: &str) -> Option<&'a str> {
    let rest = key.strip_prefix(namespace)?.strip_prefix('/')?;
    let token = rest.strip_suffix(marker)?.strip_suffix('/')?;
    if token.is_empty() || token.contains('/') {
        return None;
    }
    Some(token)
}

/// Picks the latest snapshot out of a listing of `<namespace>/`.
///
/// Candidates are keys exactly one level below the namespace. Under
/// [`SelectionPolicy::RequireDoneMarker`] a candidate is only eligible when
/// `<namespace>/<token>/<marker>` is part of the same listing.
pub(crate) fn select_latest(
    entries: &[ObjectEntry],
    config: &DownloadConfig,
) -> Result<SnapshotId, DumpError> {
    let namespace = config.namespace.as_str();

    let candidates: BTreeSet<&str> = entries
        .iter()
        .filter_map(|entry| snapshot_token(&entry.key, namespace))
        .collect();
    let marked: HashSet<&str> = entries
        .iter()
        .filter_map(|entry| marked_token(&entry.key, namespace, &config.marker))
        .collect();

    debug!(
        candidates = candidates.len(),
        marked = marked.len(),
        "Scanned dump folders"
    );

    let latest = match config.selection {
        SelectionPolicy::LatestName => candidates.iter().next_back().copied(),
        SelectionPolicy::RequireDoneMarker => candidates
            .iter()
            .rev()
            .find(|token| marked.contains(*token))
            .copied(),
    };

    let latest = latest.ok_or_else(|| DumpError::NoDumpAvailable {
        prefix: format!("{}/", namespace),
    })?;

    if !marked.contains(latest) {
        warn!(
            "Dump {} has no '{}' marker, it may still be in progress",
            latest, config.marker
        );
    }

    Ok(SnapshotId::new(latest))
}

/// Lists the namespace and returns the latest snapshot identifier.
pub async fn resolve_latest(
    store: &dyn ObjectStore,
    config: &DownloadConfig,
) -> Result<SnapshotId, DumpError> {
    info!("Looking for latest complete dump");

    let prefix = format!("{}/", config.namespace);
    let entries = store.list(&prefix).await?;
    select_latest(&entries, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn entries(keys: &[&str]) -> Vec<ObjectEntry> {
        keys.iter().map(|k| ObjectEntry::new(*k, None)).collect()
    }

    fn config(selection: SelectionPolicy) -> DownloadConfig {
        DownloadConfig {
            selection,
            ..DownloadConfig::default()
        }
    }

    #[test]
    fn token_only_one_level_deep() {
        assert_eq!(snapshot_token("hotels/20230101", "hotels"), Some("20230101"));
        assert_eq!(snapshot_token("hotels/20230101/done", "hotels"), None);
        assert_eq!(snapshot_token("hotels/", "hotels"), None);
        assert_eq!(snapshot_token("hotelsx/20230101", "hotels"), None);
        assert_eq!(snapshot_token("reviews/20230101", "hotels"), None);
    }

    #[test]
    fn picks_greatest_name() {
        let listing = entries(&[
            "hotels/20230101",
            "hotels/20230101/rooms.json",
            "hotels/20221231",
            "hotels/20230202",
            "hotels/20230115",
        ]);
        let latest = select_latest(&listing, &config(SelectionPolicy::LatestName)).unwrap();
        assert_eq!(latest.as_str(), "20230202");
    }

    #[test]
    fn ordering_is_bytewise_not_numeric() {
        let listing = entries(&["hotels/9", "hotels/10", "hotels/100"]);
        let latest = select_latest(&listing, &config(SelectionPolicy::LatestName)).unwrap();
        assert_eq!(latest.as_str(), "9");
    }

    #[test]
    fn empty_listing_is_no_dump() {
        let listing = entries(&["hotels/20230101/rooms.json", "hotels/20230101/done"]);
        let err = select_latest(&listing, &config(SelectionPolicy::LatestName)).unwrap_err();
        assert!(matches!(err, DumpError::NoDumpAvailable { ref prefix } if prefix == "hotels/"));
    }

    #[test]
    fn marker_policy_decides_between_complete_and_partial() {
        let listing = entries(&[
            "hotels/20230101",
            "hotels/20230101/done",
            "hotels/20230101/rooms.json",
            "hotels/20230202",
            "hotels/20230202/rooms.json",
        ]);

        let by_name = select_latest(&listing, &config(SelectionPolicy::LatestName)).unwrap();
        assert_eq!(by_name.as_str(), "20230202");

        let by_marker =
            select_latest(&listing, &config(SelectionPolicy::RequireDoneMarker)).unwrap();
        assert_eq!(by_marker.as_str(), "20230101");
    }

    #[test]
    fn marker_policy_without_any_marker_is_no_dump() {
        let listing = entries(&["hotels/20230101", "hotels/20230101/rooms.json"]);
        let err =
            select_latest(&listing, &config(SelectionPolicy::RequireDoneMarker)).unwrap_err();
        assert!(matches!(err, DumpError::NoDumpAvailable { .. }));
    }

    #[tokio::test]
    async fn resolve_lists_namespace_once() {
        let store = MemoryStore::new()
            .with_object("hotels/20230101", b"")
            .with_object("hotels/20230101/done", b"")
            .with_object("hotels/20230301", b"")
            .with_object("reviews/20991231", b"");

        let latest = resolve_latest(&store, &DownloadConfig::default())
            .await
            .unwrap();
        assert_eq!(latest, SnapshotId::new("20230301"));
        assert_eq!(store.list_calls(), 1);
    }
}
