/// Freshness tokens and the delegate that mints them.
pub mod tracker;

pub use tracker::{State, StateTrackable, StateTrackableDelegate, StateTracker};
