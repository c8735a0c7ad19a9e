//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tdfs_types::Address;

/// Configuration for a [`crate::DfsClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Address of the metadata service.
    pub meta_addr: Address,

    /// Number of cache-miss reads of the same directory within the window
    /// that triggers a bulk prefetch of its whole listing.
    pub prefetch_threshold: u32,

    /// Sliding window for the prefetch access counter.
    #[serde(with = "humantime_compat")]
    pub prefetch_window: Duration,

    /// Worker pool size for the parallel directory traversal.
    pub walker_workers: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            meta_addr: Address::localhost(9000),
            prefetch_threshold: 3,
            prefetch_window: Duration::from_millis(100),
            walker_workers: 8,
        }
    }
}

mod humantime_compat {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
