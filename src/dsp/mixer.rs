//! Mixer: gain buses and the final soft clipper.

use super::envelope::Envelope;

/// A gain stage voices can be routed through (the player's master gain).
#[derive(Debug, Clone)]
pub struct Bus {
    pub gain: Envelope,
    accumulator: f64,
}

impl Bus {
    pub fn new(gain: f64) -> Self {
        Bus {
            gain: Envelope::constant(gain),
            accumulator: 0.0,
        }
    }

    /// Add a voice sample into this bus for the current frame.
    pub fn add(&mut self, sample: f64) {
        self.accumulator += sample;
    }

    /// Drain the accumulated frame, scaled by the bus gain at `time`.
    pub fn take(&mut self, time: f64) -> f64 {
        let out = self.accumulator * self.gain.value_at(time);
        self.accumulator = 0.0;
        out
    }
}

/// Soft clipper using tanh to prevent harsh digital clipping.
pub fn soft_clip(x: f64) -> f64 {
    x.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_scales_and_resets() {
        let mut bus = Bus::new(0.5);
        bus.add(0.4);
        bus.add(0.2);
        assert!((bus.take(0.0) - 0.3).abs() < 1e-12);
        assert_eq!(bus.take(0.0), 0.0);
    }

    #[test]
    fn bus_follows_gain_automation() {
        let mut bus = Bus::new(0.15);
        bus.gain.set_value_at_time(0.0, 1.0);
        bus.add(1.0);
        assert!((bus.take(0.5) - 0.15).abs() < 1e-12);
        bus.add(1.0);
        assert_eq!(bus.take(1.0), 0.0);
    }

    #[test]
    fn soft_clip_prevents_overflow() {
        assert!(soft_clip(100.0) <= 1.0);
        assert!(soft_clip(-100.0) >= -1.0);
        assert!((soft_clip(0.0)).abs() < 1e-12);
    }
}
