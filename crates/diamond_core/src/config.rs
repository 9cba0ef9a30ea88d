//! Diamond configuration.

use crate::types::Category;

/// What happens to blobs superseded by a shard rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlobRetention {
    /// Release superseded blobs once the rebuild that replaced them commits.
    ///
    /// Releasing frees the payload but not the handle: handles are never
    /// reissued, so the in-memory store keeps an empty slot per released
    /// blob and the file store appends a release marker.
    #[default]
    Reclaim,
    /// Keep every blob ever written.
    Retain,
}

/// Configuration for constructing a diamond.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether the shard cache starts enabled.
    pub cache_enabled: bool,

    /// Category for facets that declare none.
    pub default_category: Category,

    /// Policy for superseded blobs.
    pub blob_retention: BlobRetention,

    /// Whether unchanged per-facet selector lists reuse their existing blob.
    pub dedup_blobs: bool,

    /// Maximum number of cut records kept for polling.
    pub max_event_history: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_enabled: false,
            default_category: Category::default(),
            blob_retention: BlobRetention::Reclaim,
            dedup_blobs: true,
            max_event_history: 10_000,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the shard cache starts enabled.
    #[must_use]
    pub const fn cache_enabled(mut self, value: bool) -> Self {
        self.cache_enabled = value;
        self
    }

    /// Sets the default category.
    #[must_use]
    pub fn default_category(mut self, category: impl Into<Category>) -> Self {
        self.default_category = category.into();
        self
    }

    /// Sets the blob retention policy.
    #[must_use]
    pub const fn blob_retention(mut self, retention: BlobRetention) -> Self {
        self.blob_retention = retention;
        self
    }

    /// Sets whether per-facet blobs are deduplicated by content.
    #[must_use]
    pub const fn dedup_blobs(mut self, value: bool) -> Self {
        self.dedup_blobs = value;
        self
    }

    /// Sets the event history bound.
    #[must_use]
    pub const fn max_event_history(mut self, max: usize) -> Self {
        self.max_event_history = max;
        self
    }
}
