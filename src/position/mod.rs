//! Smooth positions from sparse elements: two propagated anchors per
//! object, advanced as queries move forward, blended in between.

mod propagation;
mod state;

pub use propagation::{PropagationError, Propagator, Sgp4Propagator, StateVector};
pub use state::TrackState;
