//! Shared simulation state.
//!
//! The mutable model of everything the simulation has reported this
//! session: connection status, mission clock, per-site records, and the
//! world object list. [`StateStore`] is the single guarded owner; every
//! other component reads through snapshots.

pub mod site;
pub mod store;

pub use site::{SiteState, SiteUpdate};
pub use store::{StateSnapshot, StateStore, StatusSummary, StatusUpdate};
