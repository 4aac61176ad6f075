// ── Pre-change backups ──
//
// Before a site's first mutation the observed state is written to
// `<backups>/<site>.json`, laid out as
//
//     { "<site>": { "<endpoint>": { "<YYYY-MM-DD_HH-MM-SS>": <data> } } }
//
// Each snapshot adds one timestamp under every endpoint it covers (VLAN
// list, port list, one entry per DHCP-managed VLAN). Entries older than the
// retention window are dropped on every write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::BackupError;
use crate::model::ObservedSite;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

type BackupFile = BTreeMap<String, BTreeMap<String, BTreeMap<String, Value>>>;

/// Where one site's pre-change snapshot was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupHandle {
    pub site: String,
    pub path: PathBuf,
    pub timestamp: String,
}

/// Durable storage for pre-change snapshots.
#[async_trait]
pub trait BackupService: Send + Sync {
    async fn snapshot(&self, site: &str, state: &ObservedSite)
    -> Result<BackupHandle, BackupError>;
}

/// One JSON file per site under a backup directory.
#[derive(Debug, Clone)]
pub struct FileBackupStore {
    dir: PathBuf,
    retention_days: u32,
}

impl FileBackupStore {
    pub fn new(dir: impl Into<PathBuf>, retention_days: u32) -> Self {
        Self {
            dir: dir.into(),
            retention_days,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Site names may contain characters that are not valid in file names.
    fn file_for(&self, site: &str) -> PathBuf {
        let safe: String = site
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c => c,
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    fn snapshot_at(
        &self,
        site: &str,
        state: &ObservedSite,
        now: NaiveDateTime,
    ) -> Result<BackupHandle, BackupError> {
        let path = self.file_for(site);
        let write_err = |source| BackupError::Write {
            site: site.to_owned(),
            path: path.clone(),
            source,
        };
        let encode_err = |source| BackupError::Encode {
            site: site.to_owned(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(write_err)?;
        let mut file = Self::read_existing(&path);

        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        let endpoints = file.entry(site.to_owned()).or_default();
        let mut record = |endpoint: String, data: Value| {
            endpoints
                .entry(endpoint)
                .or_default()
                .insert(timestamp.clone(), data);
        };

        record("vlans".into(), serde_json::to_value(&state.vlans).map_err(encode_err)?);
        if let Some(ports) = &state.ports {
            record("ports".into(), serde_json::to_value(ports).map_err(encode_err)?);
        }
        for (vlan_id, dhcp) in &state.dhcp {
            record(
                format!("dhcp_vlan_{vlan_id}"),
                serde_json::to_value(dhcp).map_err(encode_err)?,
            );
        }

        let pruned = self.prune(&mut file, now);
        if pruned > 0 {
            debug!(site, pruned, "dropped expired backup entries");
        }

        let body = serde_json::to_string_pretty(&file).map_err(encode_err)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body).map_err(write_err)?;
        std::fs::rename(&tmp, &path).map_err(write_err)?;

        info!(site, path = %path.display(), %timestamp, "backed up site state");
        Ok(BackupHandle {
            site: site.to_owned(),
            path,
            timestamp,
        })
    }

    /// Existing backup contents; a missing or corrupt file starts fresh.
    fn read_existing(path: &Path) -> BackupFile {
        let Ok(text) = std::fs::read_to_string(path) else {
            return BackupFile::new();
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "backup file is corrupt, starting a new one");
            BackupFile::new()
        })
    }

    /// Drop entries older than the retention window, and endpoints or
    /// sites left empty. Returns the number of entries removed.
    fn prune(&self, file: &mut BackupFile, now: NaiveDateTime) -> usize {
        let cutoff = now - chrono::Duration::days(i64::from(self.retention_days));
        let mut removed = 0;
        for endpoints in file.values_mut() {
            for entries in endpoints.values_mut() {
                let before = entries.len();
                entries.retain(|stamp, _| {
                    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
                        .ok()
                        .is_none_or(|taken| taken >= cutoff)
                });
                removed += before - entries.len();
            }
            endpoints.retain(|_, entries| !entries.is_empty());
        }
        file.retain(|_, endpoints| !endpoints.is_empty());
        removed
    }
}

#[async_trait]
impl BackupService for FileBackupStore {
    async fn snapshot(
        &self,
        site: &str,
        state: &ObservedSite,
    ) -> Result<BackupHandle, BackupError> {
        self.snapshot_at(site, state, Local::now().naive_local())
    }
}
