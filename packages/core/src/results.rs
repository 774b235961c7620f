//! Result Store snapshot types.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{PodcastInfo, SchemaError};

/// A finished episode and the locators of its stored artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedEpisodeRecord {
    pub podcast_title: String,
    pub episode_title: String,
    #[serde(alias = "rss_url")]
    pub feed_url: String,
    #[serde(alias = "edited_url")]
    pub edited_audio_locator: String,
    #[serde(alias = "transcript_file")]
    pub transcript_locator: String,
    #[serde(alias = "unwanted_content_file")]
    pub unwanted_content_locator: String,
}

/// A feed enrolled for server-side automatic processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoProcessedPodcast {
    #[serde(alias = "rss_url")]
    pub feed_url: String,
    /// Seconds since the Unix epoch.
    pub enabled_at: f64,
}

impl AutoProcessedPodcast {
    pub fn enabled_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt((self.enabled_at * 1000.0) as i64)
            .single()
    }
}

/// Decoded aggregate document held in the Result Store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSnapshot {
    #[serde(default, alias = "processed")]
    pub processed_episodes: Vec<ProcessedEpisodeRecord>,
    #[serde(default, alias = "auto_processed", alias = "autoProcessed")]
    pub auto_processed_podcasts: Vec<AutoProcessedPodcast>,
    #[serde(default, alias = "podcastInfo", alias = "podcast_info")]
    pub podcast_info_by_feed: HashMap<String, PodcastInfo>,
}

/// On-store layouts of the aggregate document.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SnapshotDocument {
    Full(ResultSnapshot),
    /// Older stores held only the array of processed episodes.
    Legacy(Vec<ProcessedEpisodeRecord>),
}

impl ResultSnapshot {
    /// Decode and validate the aggregate document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SchemaError> {
        let doc: SnapshotDocument = serde_json::from_slice(bytes)?;
        let snapshot = match doc {
            SnapshotDocument::Full(s) => s,
            SnapshotDocument::Legacy(processed_episodes) => Self {
                processed_episodes,
                ..Self::default()
            },
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        for record in &self.processed_episodes {
            if record.feed_url.trim().is_empty() {
                return Err(SchemaError::MissingField("feed_url"));
            }
        }
        for auto in &self.auto_processed_podcasts {
            if auto.feed_url.trim().is_empty() {
                return Err(SchemaError::MissingField("feed_url"));
            }
        }
        Ok(())
    }

    /// Processed episodes grouped by podcast title, titles sorted.
    pub fn episodes_by_podcast(&self) -> BTreeMap<&str, Vec<&ProcessedEpisodeRecord>> {
        let mut grouped: BTreeMap<&str, Vec<&ProcessedEpisodeRecord>> = BTreeMap::new();
        for record in &self.processed_episodes {
            grouped
                .entry(record.podcast_title.as_str())
                .or_default()
                .push(record);
        }
        grouped
    }

    /// Insert or replace the enrollment for `entry.feed_url`.
    pub fn upsert_auto_processed(&mut self, entry: AutoProcessedPodcast) {
        self.auto_processed_podcasts
            .retain(|p| p.feed_url != entry.feed_url);
        self.auto_processed_podcasts.push(entry);
    }

    pub fn remove_auto_processed(&mut self, feed_url: &str) -> bool {
        let before = self.auto_processed_podcasts.len();
        self.auto_processed_podcasts.retain(|p| p.feed_url != feed_url);
        before != self.auto_processed_podcasts.len()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;

    const RECORD: &str = r#"{"podcast_title":"Show","episode_title":"Ep 1",
        "rss_url":"https://example.com/feed.xml","edited_url":"edited/ep1.mp3",
        "transcript_file":"transcripts/ep1.json","unwanted_content_file":"unwanted/ep1.json"}"#;

    #[test]
    fn decodes_full_document() {
        let raw = format!(
            r#"{{"processed":[{RECORD}],
                "auto_processed":[{{"feed_url":"https://example.com/feed.xml","enabled_at":1718000000}}],
                "podcast_info":{{"https://example.com/feed.xml":{{"name":"Show","imageUrl":"https://img"}}}}}}"#
        );
        let snap = ResultSnapshot::from_slice(raw.as_bytes()).unwrap();
        assert_eq!(snap.processed_episodes.len(), 1);
        assert_eq!(snap.processed_episodes[0].edited_audio_locator, "edited/ep1.mp3");
        assert_eq!(snap.auto_processed_podcasts.len(), 1);
        assert_eq!(
            snap.podcast_info_by_feed["https://example.com/feed.xml"].image_url.as_deref(),
            Some("https://img")
        );
    }

    #[test]
    fn decodes_legacy_array() {
        let raw = format!("[{RECORD}]");
        let snap = ResultSnapshot::from_slice(raw.as_bytes()).unwrap();
        assert_eq!(snap.processed_episodes.len(), 1);
        assert!(snap.auto_processed_podcasts.is_empty());
    }

    #[test]
    fn rejects_malformed_document() {
        assert!(ResultSnapshot::from_slice(br#"{"processed": 5}"#).is_err());
        assert!(ResultSnapshot::from_slice(b"not json").is_err());
    }

    #[test]
    fn upsert_keeps_single_entry_per_feed() {
        let mut snap = ResultSnapshot::default();
        snap.upsert_auto_processed(AutoProcessedPodcast {
            feed_url: "F".into(),
            enabled_at: 1.0,
        });
        snap.upsert_auto_processed(AutoProcessedPodcast {
            feed_url: "F".into(),
            enabled_at: 2.0,
        });
        assert_eq!(snap.auto_processed_podcasts.len(), 1);
        assert_eq!(snap.auto_processed_podcasts[0].enabled_at, 2.0);
        assert!(snap.remove_auto_processed("F"));
        assert!(!snap.remove_auto_processed("F"));
    }

    #[test]
    fn groups_by_podcast_title() {
        let record: ProcessedEpisodeRecord = serde_json::from_str(RECORD).unwrap();
        let mut other = record.clone();
        other.episode_title = "Ep 2".into();
        let mut third = record.clone();
        third.podcast_title = "Another".into();
        let snap = ResultSnapshot {
            processed_episodes: vec![record, other, third],
            ..Default::default()
        };
        let grouped = snap.episodes_by_podcast();
        assert_eq!(grouped.keys().copied().collect::<Vec<_>>(), vec!["Another", "Show"]);
        assert_eq!(grouped["Show"].len(), 2);
    }
}
