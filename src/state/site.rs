//! Per-Site State
//!
//! One record per tracked SA-2 site, keyed by a stable string identifier.
//! Sites are created on first mention in an inbound update and persist for
//! the rest of the session; the export script never sends a removal, so
//! absence from an update is not a deletion signal.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// State of a single SA-2 site as mirrored from the simulation.
///
/// Serializes with the wire field names the browser expects
/// (`siteId`, `systemState`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteState {
    /// Stable site identifier.
    pub site_id: String,
    /// Coarse system state (off / standby / search / track / engage).
    pub system_state: i32,
    /// Radar operating mode.
    pub radar_mode: i32,
    /// Antenna azimuth in degrees.
    pub antenna_az: f64,
    /// Antenna elevation in degrees.
    pub antenna_el: f64,
    /// Contacts currently painted by the search radar.
    pub targets: Vec<Value>,
    /// The contact the fire-control radar is locked on, if any.
    pub tracked: Option<Value>,
    /// Track solution quality.
    pub track_quality: i32,
    /// Missiles on rails and ready.
    pub missiles_ready: i32,
    /// Missiles currently in flight.
    pub missiles_in_flight: i32,
    /// Engagement authorized by the operator.
    pub eng_auth: bool,
    /// Automatic engagement enabled.
    pub auto_eng: bool,
}

impl SiteState {
    /// Create a fresh site record with pre-contact defaults.
    pub fn new(site_id: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            system_state: 0,
            radar_mode: 0,
            antenna_az: 0.0,
            antenna_el: 5.0,
            targets: Vec::new(),
            tracked: None,
            track_quality: 0,
            missiles_ready: 6,
            missiles_in_flight: 0,
            eng_auth: false,
            auto_eng: false,
        }
    }

    /// Overwrite every field from an inbound update.
    ///
    /// Wholesale replacement: a field the update omitted has already been
    /// filled with its wire default during deserialization, so stale values
    /// from a previous update never survive.
    pub fn apply(&mut self, update: SiteUpdate) {
        self.system_state = update.system_state;
        self.radar_mode = update.radar_mode;
        self.antenna_az = update.antenna_az;
        self.antenna_el = update.antenna_el;
        self.targets = update.targets;
        self.tracked = update.tracked;
        self.track_quality = update.track_quality;
        self.missiles_ready = update.missiles_ready;
        self.missiles_in_flight = update.missiles_in_flight;
        self.eng_auth = update.eng_auth;
        self.auto_eng = update.auto_eng;
    }
}

/// Per-site fields of an inbound `status` datagram.
///
/// Missing fields take the same defaults the export script assumes, via
/// the hand-written [`Default`] impl.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteUpdate {
    /// Coarse system state.
    pub system_state: i32,
    /// Radar operating mode.
    pub radar_mode: i32,
    /// Antenna azimuth in degrees.
    pub antenna_az: f64,
    /// Antenna elevation in degrees.
    pub antenna_el: f64,
    /// Contacts painted by the search radar.
    pub targets: Vec<Value>,
    /// Locked contact, if any.
    pub tracked: Option<Value>,
    /// Track solution quality.
    pub track_quality: i32,
    /// Missiles on rails and ready.
    pub missiles_ready: i32,
    /// Missiles in flight.
    pub missiles_in_flight: i32,
    /// Engagement authorized.
    pub eng_auth: bool,
    /// Automatic engagement enabled.
    pub auto_eng: bool,
}

impl Default for SiteUpdate {
    fn default() -> Self {
        Self {
            system_state: 0,
            radar_mode: 0,
            antenna_az: 0.0,
            antenna_el: 5.0,
            targets: Vec::new(),
            tracked: None,
            track_quality: 0,
            missiles_ready: 6,
            missiles_in_flight: 0,
            eng_auth: false,
            auto_eng: false,
        }
    }
}
