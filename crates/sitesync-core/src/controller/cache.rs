// Network name → ID cache
//
// Listing every network in a large organization is slow and eats into the
// rate budget, and the mapping rarely changes. The listing is kept on disk
// with the time it was fetched and reused until it expires.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CoreError;

#[derive(Serialize, Deserialize)]
struct CacheFile {
    /// Unix seconds at which the listing was fetched.
    timestamp: i64,
    data: BTreeMap<String, String>,
}

/// On-disk cache of site name → network ID.
#[derive(Debug, Clone)]
pub struct NetworkCache {
    path: PathBuf,
    ttl: Duration,
}

impl NetworkCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached mapping, if present and younger than the TTL.
    pub fn load(&self) -> Option<BTreeMap<String, String>> {
        self.load_at(Utc::now())
    }

    fn load_at(&self, now: DateTime<Utc>) -> Option<BTreeMap<String, String>> {
        let text = std::fs::read_to_string(&self.path).ok()?;
        let file: CacheFile = match serde_json::from_str(&text) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable network cache");
                return None;
            }
        };
        let age = now.timestamp().saturating_sub(file.timestamp);
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        if (0..ttl).contains(&age) {
            debug!(age_secs = age, networks = file.data.len(), "using cached network list");
            Some(file.data)
        } else {
            debug!(age_secs = age, "network cache expired");
            None
        }
    }

    pub fn store(&self, networks: &BTreeMap<String, String>) -> Result<(), CoreError> {
        self.store_at(networks, Utc::now())
    }

    fn store_at(
        &self,
        networks: &BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        let io_err = |source| CoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let body = serde_json::to_string(&CacheFile {
            timestamp: now.timestamp(),
            data: networks.clone(),
        })
        .map_err(|e| CoreError::Internal(format!("cannot encode network cache: {e}")))?;
        std::fs::write(&self.path, body).map_err(io_err)
    }

    /// Remove the cache file. Returns `false` if there was none.
    pub fn invalidate(&self) -> Result<bool, CoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "network cache invalidated");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
