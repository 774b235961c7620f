//! Podcast directory types: search results, episodes, display metadata.

use serde::{Deserialize, Serialize};

use crate::SchemaError;

/// One episode of a feed, as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub published: String,
    /// Length in seconds.
    #[serde(default)]
    pub duration: f64,
}

impl Episode {
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.title.trim().is_empty() {
            return Err(SchemaError::MissingField("title"));
        }
        Ok(())
    }
}

/// A podcast returned by directory search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodcastSummary {
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(alias = "rssUrl", alias = "rss_url")]
    pub feed_url: String,
}

impl PodcastSummary {
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.feed_url.trim().is_empty() {
            return Err(SchemaError::MissingField("feed_url"));
        }
        Ok(())
    }

    pub fn info(&self) -> PodcastInfo {
        PodcastInfo {
            name: self.name.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

/// Display metadata for a feed, keyed by feed URL in lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodcastInfo {
    pub name: String,
    #[serde(default, alias = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl PodcastInfo {
    pub fn new(name: impl Into<String>, image_url: Option<String>) -> Self {
        Self {
            name: name.into(),
            image_url,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;

    #[test]
    fn episode_needs_a_title() {
        let episode: Episode =
            serde_json::from_str(r#"{"number":3,"title":"  ","duration":60}"#).unwrap();
        assert!(matches!(
            episode.validate(),
            Err(SchemaError::MissingField("title"))
        ));
    }
}
