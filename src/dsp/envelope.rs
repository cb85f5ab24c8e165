//! Parameter automation envelope.
//!
//! Mirrors the WebAudio `AudioParam` automation model: a default value plus
//! a time-ordered list of breakpoints. Each breakpoint either jumps to its
//! value (`Set`) or ramps to it from the previous breakpoint, linearly or
//! exponentially. Gain shapes, pitch sweeps and filter sweeps are all
//! expressed with this one type.

/// How the value approaches a breakpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    Set,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Breakpoint {
    time: f64,
    value: f64,
    curve: Curve,
}

/// An automation timeline, evaluated at absolute context time in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    default: f64,
    points: Vec<Breakpoint>,
}

impl Envelope {
    pub fn new(default: f64) -> Self {
        Envelope {
            default,
            points: Vec::new(),
        }
    }

    /// A timeline that never changes.
    pub fn constant(value: f64) -> Self {
        Envelope::new(value)
    }

    pub fn set_value_at_time(&mut self, value: f64, time: f64) -> &mut Self {
        self.insert(Curve::Set, value, time)
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f64, time: f64) -> &mut Self {
        self.insert(Curve::Linear, value, time)
    }

    pub fn exponential_ramp_to_value_at_time(&mut self, value: f64, time: f64) -> &mut Self {
        self.insert(Curve::Exponential, value, time)
    }

    /// Add a breakpoint; events at the same time keep insertion order, so a
    /// later call wins.
    pub fn insert(&mut self, curve: Curve, value: f64, time: f64) -> &mut Self {
        let at = self.points.partition_point(|p| p.time <= time);
        self.points.insert(at, Breakpoint { time, value, curve });
        self
    }

    /// Time of the last breakpoint, if any.
    pub fn last_time(&self) -> Option<f64> {
        self.points.last().map(|p| p.time)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Evaluate the timeline at `time`.
    pub fn value_at(&self, time: f64) -> f64 {
        let next = self.points.partition_point(|p| p.time <= time);
        let (t0, v0) = match next.checked_sub(1) {
            Some(i) => (self.points[i].time, self.points[i].value),
            None => (0.0, self.default),
        };

        let Some(target) = self.points.get(next) else {
            return v0;
        };

        let span = target.time - t0;
        if span <= 0.0 {
            return match target.curve {
                Curve::Set => v0,
                _ => target.value,
            };
        }
        let progress = ((time - t0) / span).clamp(0.0, 1.0);

        match target.curve {
            Curve::Set => v0,
            Curve::Linear => v0 + (target.value - v0) * progress,
            Curve::Exponential => {
                if v0 * target.value <= 0.0 {
                    v0
                } else {
                    v0 * (target.value / v0).powf(progress)
                }
            }
        }
    }
}
