use chrono::{DateTime, Duration, Utc};
use log::debug;
use rand::Rng;

use super::propagation::{Propagator, StateVector};
use crate::catalog::Satellite;
use crate::dataset::SampleIndex;

#[derive(Debug, Clone, Copy)]
struct Anchor {
    t: DateTime<Utc>,
    position: [f64; 3],
    velocity: [f64; 3],
}

impl Anchor {
    fn new(t: DateTime<Utc>, state: StateVector) -> Self {
        Self {
            t,
            position: state.position,
            velocity: state.velocity,
        }
    }
}

/// Interpolation state of one object: two propagated anchors one update
/// period apart, re-used for every query between them. The jitter drawn at
/// construction phase-staggers anchor recomputation across objects that
/// advance in lockstep.
pub struct TrackState {
    update_period: Duration,
    accuracy: Duration,
    jitter: Duration,
    launch: Option<DateTime<Utc>>,
    decay: Option<DateTime<Utc>>,
    anchors: Option<(Anchor, Anchor)>,
}

impl TrackState {
    pub fn new<R: Rng>(
        satellite: &Satellite,
        update_period: Duration,
        accuracy: Duration,
        rng: &mut R,
    ) -> Self {
        let period_millis = update_period.num_milliseconds();
        let jitter = if period_millis > 0 {
            Duration::milliseconds(rng.gen_range(0..period_millis))
        } else {
            Duration::zero()
        };
        Self {
            update_period,
            accuracy,
            jitter,
            launch: satellite.launch.launch_date,
            decay: satellite.decay_date,
            anchors: None,
        }
    }

    /// True between launch and decay; absent bounds are unconstrained.
    /// Callers suppress positions outside this window.
    pub fn is_in_window(&self, t: DateTime<Utc>) -> bool {
        if let Some(launch) = self.launch {
            if t < launch {
                return false;
            }
        }
        if let Some(decay) = self.decay {
            if t > decay {
                return false;
            }
        }
        true
    }

    /// Drops the anchors. Queries only ever move the bracket forward, so
    /// callers reset after jumping backwards in time.
    pub fn reset(&mut self) {
        self.anchors = None;
    }

    /// Interpolated position at `t`, or `None` when no usable elements lie
    /// within `accuracy` of an anchor time. Failure clears the state, so a
    /// later query starts fresh.
    pub fn position_at(
        &mut self,
        samples: &SampleIndex,
        propagator: &dyn Propagator,
        t: DateTime<Utc>,
    ) -> Option<[f64; 3]> {
        match self.advance_anchors(samples, propagator, t) {
            Some((first, second)) => Some(interpolate(&first, &second, t)),
            None => {
                self.reset();
                None
            }
        }
    }

    fn advance_anchors(
        &mut self,
        samples: &SampleIndex,
        propagator: &dyn Propagator,
        t: DateTime<Utc>,
    ) -> Option<(Anchor, Anchor)> {
        let advanced = match self.anchors {
            None => {
                let start = t - self.jitter;
                let first = self.anchor(samples, propagator, start)?;
                let second = self.anchor(samples, propagator, start + self.update_period)?;
                (first, second)
            }
            Some((first, second)) if t > second.t + self.update_period => {
                // long skip: re-span the bracket around t instead of
                // stepping one period at a time
                let delta = t - first.t;
                let first = self.anchor(samples, propagator, t)?;
                let second = self.anchor(samples, propagator, t + delta)?;
                (first, second)
            }
            Some((_, second)) if t > second.t => {
                let first = second;
                let second = self.anchor(samples, propagator, first.t + self.update_period)?;
                (first, second)
            }
            Some(anchors) => anchors,
        };
        self.anchors = Some(advanced);
        Some(advanced)
    }

    fn anchor(
        &self,
        samples: &SampleIndex,
        propagator: &dyn Propagator,
        t: DateTime<Utc>,
    ) -> Option<Anchor> {
        let sample = samples.closest(t, self.accuracy)?;
        match propagator.propagate(sample, t) {
            Ok(state) => Some(Anchor::new(t, state)),
            Err(err) => {
                debug!("propagation failed at {t}: {err}");
                None
            }
        }
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

/// Velocity-aware blend of the two anchors, exact at both anchor times.
fn interpolate(first: &Anchor, second: &Anchor, t: DateTime<Utc>) -> [f64; 3] {
    if t == first.t {
        return first.position;
    }
    if t == second.t {
        return second.position;
    }
    let span = seconds_between(first.t, second.t);
    if span <= 0.0 {
        return first.position;
    }
    let dt1 = seconds_between(first.t, t);
    let dt2 = seconds_between(second.t, t);
    let f = dt1 / span;
    let mut out = [0.0; 3];
    for axis in 0..3 {
        let from_first = first.position[axis] + first.velocity[axis] * dt1;
        let from_second = second.position[axis] + second.velocity[axis] * dt2;
        out[axis] = (1.0 - f) * from_first + f * from_second;
    }
    out
}
