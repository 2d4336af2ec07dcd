// Persisted layout (JSON blobs, one key each):
// - views / likes / saves: arrays of EngagementEvent, newest first
// - categoryScores / authorScores: object<string, number>
// - trackPreferences: { trading, wellness, integration }
// - schemaVersion: integer tag, absent on legacy installs

use super::EngagementSnapshot;
use crate::config::KeyspaceConfig;
use crate::models::{EngagementEvent, TrackScores};
use crate::services::affinity::AffinityMaps;
use crate::storage::{KeyValueStore, Result, StorageError};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

pub const SCHEMA_VERSION: u32 = 1;

/// Logical key names, before keyspace prefixing.
pub struct PersistedKeys;

impl PersistedKeys {
    pub const VIEWS: &'static str = "views";
    pub const LIKES: &'static str = "likes";
    pub const SAVES: &'static str = "saves";
    pub const CATEGORY_SCORES: &'static str = "categoryScores";
    pub const AUTHOR_SCORES: &'static str = "authorScores";
    pub const TRACK_PREFERENCES: &'static str = "trackPreferences";
    pub const SCHEMA_VERSION: &'static str = "schemaVersion";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoredSchema {
    /// No tag present: data written before versioning, same layout as v1
    Legacy,
    Current,
    /// Written by a newer build; not interpreted
    Newer(u32),
}

#[derive(Clone)]
pub struct HistoryRepository {
    store: Arc<dyn KeyValueStore>,
    keyspace: KeyspaceConfig,
}

impl HistoryRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, keyspace: KeyspaceConfig) -> Self {
        Self { store, keyspace }
    }

    fn key(&self, name: &str) -> String {
        self.keyspace.key(name)
    }

    /// Load every key, defaulting anything missing, unreadable or corrupt.
    pub async fn load(&self) -> EngagementSnapshot {
        match self.read_schema().await {
            StoredSchema::Newer(version) => {
                warn!(
                    stored_version = version,
                    supported_version = SCHEMA_VERSION,
                    "Stored engagement schema is newer than supported, starting empty"
                );
                return EngagementSnapshot::default();
            }
            StoredSchema::Legacy => {
                debug!("No schema version tag, reading stored keys as schema v1");
            }
            StoredSchema::Current => {}
        }

        let (views, likes, saves, category_scores, author_scores, track_scores) = tokio::join!(
            self.read_or_default::<VecDeque<EngagementEvent>>(PersistedKeys::VIEWS),
            self.read_or_default::<VecDeque<EngagementEvent>>(PersistedKeys::LIKES),
            self.read_or_default::<VecDeque<EngagementEvent>>(PersistedKeys::SAVES),
            self.read_or_default::<HashMap<String, f64>>(PersistedKeys::CATEGORY_SCORES),
            self.read_or_default::<HashMap<String, f64>>(PersistedKeys::AUTHOR_SCORES),
            self.read_or_default::<TrackScores>(PersistedKeys::TRACK_PREFERENCES),
        );

        EngagementSnapshot {
            views,
            likes,
            saves,
            affinity: AffinityMaps {
                category_scores,
                author_scores,
                track_scores,
            },
        }
    }

    async fn read_schema(&self) -> StoredSchema {
        let raw = match self.store.get(&self.key(PersistedKeys::SCHEMA_VERSION)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to read schema version, assuming legacy layout");
                return StoredSchema::Legacy;
            }
        };

        match raw.as_deref().map(str::trim).map(str::parse::<u32>) {
            None => StoredSchema::Legacy,
            Some(Ok(version)) if version > SCHEMA_VERSION => StoredSchema::Newer(version),
            Some(Ok(_)) => StoredSchema::Current,
            Some(Err(_)) => {
                warn!("Unparseable schema version tag, assuming legacy layout");
                StoredSchema::Legacy
            }
        }
    }

    async fn read_or_default<T>(&self, name: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let raw = match self.store.get(&self.key(name)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!(key = name, error = %e, "Storage read failed, using empty state");
                return T::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(key = name, error = %e, "Corrupt persisted value, using empty state");
            T::default()
        })
    }

    /// Overwrite every key. Keys are independent: a failed write does not
    /// stop the remaining ones, and the first failure is returned.
    pub async fn persist(&self, snapshot: &EngagementSnapshot) -> Result<()> {
        let entries = [
            (PersistedKeys::VIEWS, serde_json::to_string(&snapshot.views)?),
            (PersistedKeys::LIKES, serde_json::to_string(&snapshot.likes)?),
            (PersistedKeys::SAVES, serde_json::to_string(&snapshot.saves)?),
            (
                PersistedKeys::CATEGORY_SCORES,
                serde_json::to_string(&snapshot.affinity.category_scores)?,
            ),
            (
                PersistedKeys::AUTHOR_SCORES,
                serde_json::to_string(&snapshot.affinity.author_scores)?,
            ),
            (
                PersistedKeys::TRACK_PREFERENCES,
                serde_json::to_string(&snapshot.affinity.track_scores)?,
            ),
            (PersistedKeys::SCHEMA_VERSION, SCHEMA_VERSION.to_string()),
        ];

        let mut first_error: Option<StorageError> = None;
        for (name, value) in entries {
            if let Err(e) = self.store.set(&self.key(name), &value).await {
                warn!(key = name, error = %e, "Storage write failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
