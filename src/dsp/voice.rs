//! Voice: one oscillator, an optional filter and a gain envelope.

use super::envelope::Envelope;
use super::filter::{BiquadFilter, FilterType};
use super::oscillator::{Oscillator, Waveform};

/// Where a voice's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// Straight to the context destination.
    Destination,
    /// Through a gain bus (e.g. the music player's master gain).
    Bus(BusId),
}

/// Handle of a gain bus inside an `AudioContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusId(pub(crate) u64);

/// A filter stage whose cutoff follows an envelope.
#[derive(Debug, Clone)]
pub struct VoiceFilter {
    biquad: BiquadFilter,
    cutoff: Envelope,
}

impl VoiceFilter {
    pub fn new(filter_type: FilterType, cutoff: Envelope, q: f64, sample_rate: f64) -> Self {
        let mut biquad = BiquadFilter::new(filter_type, sample_rate);
        biquad.set_q(q);
        VoiceFilter { biquad, cutoff }
    }

    fn process(&mut self, input: f64, time: f64) -> f64 {
        self.biquad.set_frequency(self.cutoff.value_at(time));
        self.biquad.process(input)
    }
}

/// A single pitched voice scheduled on the context timeline.
///
/// Silent before `start`; finished from `stop` on. All envelopes are
/// evaluated at absolute context time.
#[derive(Debug, Clone)]
pub struct Voice {
    oscillator: Oscillator,
    frequency: Envelope,
    gain: Envelope,
    filter: Option<VoiceFilter>,
    start: f64,
    stop: f64,
    pub output: Output,
}

impl Voice {
    pub fn new(
        waveform: Waveform,
        frequency: Envelope,
        gain: Envelope,
        start: f64,
        stop: f64,
        sample_rate: f64,
    ) -> Self {
        Voice {
            oscillator: Oscillator::new(waveform, sample_rate),
            frequency,
            gain,
            filter: None,
            start,
            stop: stop.max(start),
            output: Output::Destination,
        }
    }

    pub fn with_filter(mut self, filter: VoiceFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn routed_to(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn stop(&self) -> f64 {
        self.stop
    }

    pub fn waveform(&self) -> Waveform {
        self.oscillator.waveform
    }

    /// Gain envelope value at `time` (0 outside the voice's lifetime).
    pub fn gain_at(&self, time: f64) -> f64 {
        if time < self.start || time >= self.stop {
            0.0
        } else {
            self.gain.value_at(time)
        }
    }

    pub fn frequency_at(&self, time: f64) -> f64 {
        self.frequency.value_at(time)
    }

    /// Render the sample at context time `time`.
    pub fn render(&mut self, time: f64) -> f64 {
        if time < self.start || time >= self.stop {
            return 0.0;
        }

        self.oscillator.frequency = self.frequency.value_at(time);
        let mut sample = self.oscillator.next_sample();
        if let Some(filter) = self.filter.as_mut() {
            sample = filter.process(sample, time);
        }
        sample * self.gain.value_at(time)
    }

    /// Has the voice passed its stop time?
    pub fn is_finished(&self, time: f64) -> bool {
        time >= self.stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 8000.0;

    fn decaying(start: f64, stop: f64) -> Voice {
        let mut gain = Envelope::new(0.0);
        gain.set_value_at_time(0.5, start)
            .exponential_ramp_to_value_at_time(0.01, stop);
        Voice::new(Waveform::Sine, Envelope::constant(440.0), gain, start, stop, SR)
    }

    #[test]
    fn silent_outside_lifetime() {
        let mut v = decaying(0.1, 0.2);
        assert_eq!(v.render(0.05), 0.0);
        assert_eq!(v.render(0.2), 0.0);
        assert!(!v.is_finished(0.19));
        assert!(v.is_finished(0.2));
    }

    #[test]
    fn produces_sound_while_live() {
        let mut v = decaying(0.0, 0.1);
        let peak = (0..800)
            .map(|n| v.render(n as f64 / SR).abs())
            .fold(0.0_f64, f64::max);
        assert!(peak > 0.1, "voice should be audible, peak {peak}");
        assert!(peak <= 0.5 + 1e-9);
    }

    #[test]
    fn filtered_voice_stays_finite() {
        let mut cutoff = Envelope::new(800.0);
        cutoff.set_value_at_time(800.0, 0.0)
            .exponential_ramp_to_value_at_time(5000.0, 0.5);
        let filter = VoiceFilter::new(FilterType::Lowpass, cutoff, 1.0, SR);
        let mut v = decaying(0.0, 0.5).with_filter(filter);
        for n in 0..4000 {
            assert!(v.render(n as f64 / SR).is_finite());
        }
    }

    #[test]
    fn stop_never_precedes_start() {
        let v = decaying(1.0, 0.5);
        assert_eq!(v.stop(), 1.0);
    }
}
