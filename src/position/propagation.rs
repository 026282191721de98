use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::dataset::TleSample;

/// Propagated state at one instant: TEME position in km, velocity in km/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    pub position: [f64; 3],
    pub velocity: [f64; 3],
}

#[derive(Debug, Error)]
#[error("propagation error: {0}")]
pub struct PropagationError(pub String);

/// The orbital model behind the interpolator. Kept behind a trait so tests
/// can substitute analytically simple motion.
pub trait Propagator {
    fn propagate(
        &self,
        sample: &TleSample,
        at: DateTime<Utc>,
    ) -> Result<StateVector, PropagationError>;
}

pub struct Sgp4Propagator;

impl Propagator for Sgp4Propagator {
    fn propagate(
        &self,
        sample: &TleSample,
        at: DateTime<Utc>,
    ) -> Result<StateVector, PropagationError> {
        let minutes = sample
            .elements
            .datetime_to_minutes_since_epoch(&at.naive_utc())
            .map_err(|e| PropagationError(e.to_string()))?;
        let prediction = sample
            .constants
            .propagate(minutes)
            .map_err(|e| PropagationError(e.to_string()))?;
        Ok(StateVector {
            position: prediction.position,
            velocity: prediction.velocity,
        })
    }
}
