//! Shared State Store
//!
//! The single mutable model of simulation state, guarded by one RwLock.
//! The ingestion loop is the only telemetry writer; the broadcast scheduler
//! and the query surfaces read through owned snapshots. The lock is held
//! only for the duration of a copy or merge, never across network I/O.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::state::site::{SiteState, SiteUpdate};

/// Payload of an inbound `status` datagram: one update transaction.
///
/// Connection status, mission clock, world objects, and the named site
/// updates are applied to the store atomically, under a single lock
/// acquisition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Mission model time in seconds.
    #[serde(default)]
    pub time: f64,
    /// Whether the mission is paused.
    #[serde(default)]
    pub paused: bool,
    /// Replacement world object list (aircraft and other entities).
    #[serde(default, rename = "worldObjects")]
    pub world_objects: Vec<Value>,
    /// Per-site updates keyed by site identifier.
    #[serde(default)]
    pub sites: BTreeMap<String, SiteUpdate>,
}

/// Immutable, independently-owned copy of the full wire-visible state.
///
/// Safe to serialize and send outside the lock. Also the body of the
/// `update`/`state` push messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Whether the simulation is currently connected.
    pub dcs_connected: bool,
    /// Mission model time in seconds.
    pub mission_time: f64,
    /// Whether the mission is paused.
    pub paused: bool,
    /// All known sites keyed by identifier.
    pub sites: BTreeMap<String, SiteState>,
    /// Latest world object list.
    pub world_objects: Vec<Value>,
}

/// Reduced projection for the polling status endpoint.
///
/// Cheaper than a full snapshot: site records collapse to their ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    /// Whether the simulation is currently connected.
    pub dcs_connected: bool,
    /// Mission model time in seconds.
    pub mission_time: f64,
    /// Whether the mission is paused.
    pub paused: bool,
    /// Identifiers of all known sites.
    pub sites: Vec<String>,
}

/// Full bridge state behind the lock.
#[derive(Debug, Default)]
struct BridgeState {
    connected: bool,
    last_update: Option<DateTime<Utc>>,
    mission_time: f64,
    paused: bool,
    sites: BTreeMap<String, SiteState>,
    world_objects: Vec<Value>,
}

/// The guarded shared state store.
///
/// All mutation and all reads go through `&self` methods that acquire the
/// internal lock for the shortest possible scope.
#[derive(Debug, Default)]
pub struct StateStore {
    inner: RwLock<BridgeState>,
}

impl StateStore {
    /// Create an empty store: disconnected, no sites, no world objects.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the connection flag without touching telemetry.
    ///
    /// Used for `init`/`shutdown` signals that carry no other payload.
    pub async fn set_connected(&self, connected: bool) {
        let mut state = self.inner.write().await;
        state.connected = connected;
        if connected {
            state.last_update = Some(Utc::now());
        }
    }

    /// Merge one inbound status update into current state.
    ///
    /// Replaces the connection status fields and the world object list,
    /// and upserts each named site, overwriting all its fields. One lock
    /// acquisition covers the whole transaction, so readers never observe
    /// a partially-applied update.
    pub async fn apply_update(&self, update: StatusUpdate) {
        let mut state = self.inner.write().await;
        state.connected = true;
        state.last_update = Some(Utc::now());
        state.mission_time = update.time;
        state.paused = update.paused;
        state.world_objects = update.world_objects;

        for (site_id, site_update) in update.sites {
            state
                .sites
                .entry(site_id.clone())
                .or_insert_with(|| SiteState::new(site_id))
                .apply(site_update);
        }
    }

    /// Insert a default record for a site if none exists yet.
    ///
    /// Called when a client initializes a site before the simulation has
    /// reported it. An existing record is left untouched.
    pub async fn ensure_site(&self, site_id: &str) {
        let mut state = self.inner.write().await;
        state
            .sites
            .entry(site_id.to_string())
            .or_insert_with(|| SiteState::new(site_id));
    }

    /// Take an owned copy of the full state.
    pub async fn snapshot(&self) -> StateSnapshot {
        let state = self.inner.read().await;
        StateSnapshot {
            dcs_connected: state.connected,
            mission_time: state.mission_time,
            paused: state.paused,
            sites: state.sites.clone(),
            world_objects: state.world_objects.clone(),
        }
    }

    /// Take the reduced projection for the polling status endpoint.
    pub async fn summary(&self) -> StatusSummary {
        let state = self.inner.read().await;
        StatusSummary {
            dcs_connected: state.connected,
            mission_time: state.mission_time,
            paused: state.paused,
            sites: state.sites.keys().cloned().collect(),
        }
    }

    /// When the last `init` or `status` message was observed, if ever.
    pub async fn last_update(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_update
    }
}
