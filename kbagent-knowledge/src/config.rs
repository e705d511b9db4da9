//! Configuration for the knowledgebase.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Default collection name.
pub const DEFAULT_COLLECTION: &str = "knowledgebase";

/// Default minimum similarity for search results.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.25;

/// Default maximum number of search results.
pub const DEFAULT_LIMIT: usize = 5;

/// Distance metric a collection is created with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    #[default]
    Cosine,
    Euclid,
    Dot,
    Manhattan,
}

impl Distance {
    /// Whether a larger score means a closer match under this metric.
    ///
    /// Euclid and Manhattan scores are distances, so the threshold acts as a
    /// ceiling for them.
    pub fn higher_is_closer(self) -> bool {
        matches!(self, Self::Cosine | Self::Dot)
    }

    /// Whether `score` satisfies `threshold` under this metric.
    pub fn passes(self, score: f32, threshold: f32) -> bool {
        if self.higher_is_closer() { score >= threshold } else { score <= threshold }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cosine => "cosine",
            Self::Euclid => "euclid",
            Self::Dot => "dot",
            Self::Manhattan => "manhattan",
        };
        f.write_str(name)
    }
}

impl FromStr for Distance {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclid" | "euclidean" => Ok(Self::Euclid),
            "dot" | "dotproduct" => Ok(Self::Dot),
            "manhattan" => Ok(Self::Manhattan),
            other => Err(StoreError::InvalidConfig(format!("unknown distance metric '{other}'"))),
        }
    }
}

/// Settings for a [`Knowledgebase`](crate::Knowledgebase).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgebaseConfig {
    /// Name of the vector-store collection.
    pub collection: String,
    /// Distance metric used when the collection is created.
    pub distance: Distance,
    /// Minimum similarity for search results.
    pub score_threshold: f32,
    /// Maximum number of search results.
    pub limit: usize,
}

impl Default for KnowledgebaseConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            distance: Distance::Cosine,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl KnowledgebaseConfig {
    /// Create a new builder for constructing a [`KnowledgebaseConfig`].
    pub fn builder() -> KnowledgebaseConfigBuilder {
        KnowledgebaseConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`KnowledgebaseConfig`].
#[derive(Debug, Clone, Default)]
pub struct KnowledgebaseConfigBuilder {
    config: KnowledgebaseConfig,
}

impl KnowledgebaseConfigBuilder {
    /// Set the collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Set the distance metric.
    pub fn distance(mut self, distance: Distance) -> Self {
        self.config.distance = distance;
        self
    }

    /// Set the default minimum similarity.
    pub fn score_threshold(mut self, threshold: f32) -> Self {
        self.config.score_threshold = threshold;
        self
    }

    /// Set the default result limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.config.limit = limit;
        self
    }

    /// Build the [`KnowledgebaseConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidConfig`] if:
    /// - the collection name is empty
    /// - `limit == 0`
    /// - the score threshold is not finite
    pub fn build(self) -> Result<KnowledgebaseConfig> {
        if self.config.collection.trim().is_empty() {
            return Err(StoreError::InvalidConfig("collection name must not be empty".into()));
        }
        if self.config.limit == 0 {
            return Err(StoreError::InvalidConfig("limit must be greater than zero".into()));
        }
        if !self.config.score_threshold.is_finite() {
            return Err(StoreError::InvalidConfig(format!(
                "score threshold must be finite, got {}",
                self.config.score_threshold
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = KnowledgebaseConfig::builder().build().unwrap();
        assert_eq!(config.collection, "knowledgebase");
        assert_eq!(config.distance, Distance::Cosine);
        assert_eq!(config.score_threshold, 0.25);
        assert_eq!(config.limit, 5);
    }

    #[test]
    fn rejects_zero_limit_and_empty_collection() {
        assert!(KnowledgebaseConfig::builder().limit(0).build().is_err());
        assert!(KnowledgebaseConfig::builder().collection("  ").build().is_err());
        assert!(KnowledgebaseConfig::builder().score_threshold(f32::NAN).build().is_err());
    }

    #[test]
    fn distance_parses_case_insensitively() {
        assert_eq!("Cosine".parse::<Distance>().unwrap(), Distance::Cosine);
        assert_eq!("EUCLID".parse::<Distance>().unwrap(), Distance::Euclid);
        assert_eq!("dot".parse::<Distance>().unwrap(), Distance::Dot);
        assert!("hamming".parse::<Distance>().is_err());
    }

    #[test]
    fn threshold_direction_follows_metric() {
        assert!(Distance::Cosine.passes(0.3, 0.25));
        assert!(!Distance::Cosine.passes(0.2, 0.25));
        assert!(Distance::Euclid.passes(0.2, 0.25));
        assert!(!Distance::Euclid.passes(0.3, 0.25));
    }
}
