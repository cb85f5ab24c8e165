//! Tone generator: the atomic unit of every effect and chord.
//!
//! A `ToneSpec` is a declarative description of one voice with all times
//! relative to an origin; scheduling it pins the origin to context time.

use serde::{Deserialize, Serialize};

use crate::dsp::context::{AudioContext, VoiceId};
use crate::dsp::envelope::{Curve, Envelope};
use crate::dsp::filter::FilterType;
use crate::dsp::oscillator::Waveform;
use crate::dsp::voice::{Output, Voice, VoiceFilter};
use crate::error::AudioError;

/// One automation step, `at` seconds after the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "curve", rename_all = "lowercase")]
pub enum Ramp {
    Set { value: f64, at: f64 },
    Linear { value: f64, at: f64 },
    Exponential { value: f64, at: f64 },
}

impl Ramp {
    fn apply(&self, env: &mut Envelope, origin: f64) {
        let (curve, value, at) = match *self {
            Ramp::Set { value, at } => (Curve::Set, value, at),
            Ramp::Linear { value, at } => (Curve::Linear, value, at),
            Ramp::Exponential { value, at } => (Curve::Exponential, value, at),
        };
        env.insert(curve, value, origin + at);
    }

    pub fn at(&self) -> f64 {
        match *self {
            Ramp::Set { at, .. } | Ramp::Linear { at, .. } | Ramp::Exponential { at, .. } => at,
        }
    }
}

/// Anchor `initial` at the origin so the first ramp starts from there.
fn timeline(initial: f64, ramps: &[Ramp], origin: f64) -> Envelope {
    let mut env = Envelope::new(initial);
    env.set_value_at_time(initial, origin);
    for ramp in ramps {
        ramp.apply(&mut env, origin);
    }
    env
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub kind: FilterType,
    pub cutoff: f64,
    #[serde(default)]
    pub sweep: Vec<Ramp>,
    #[serde(default = "default_q")]
    pub q: f64,
}

fn default_q() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneSpec {
    pub waveform: Waveform,
    pub frequency: f64,
    #[serde(default)]
    pub pitch: Vec<Ramp>,
    #[serde(default)]
    pub gain: Vec<Ramp>,
    #[serde(default)]
    pub filter: Option<FilterSpec>,
    /// Seconds after the origin the oscillator starts.
    pub start: f64,
    /// Seconds after the origin the oscillator stops.
    pub stop: f64,
}

impl ToneSpec {
    pub fn new(waveform: Waveform, frequency: f64) -> Self {
        ToneSpec {
            waveform,
            frequency,
            pitch: Vec::new(),
            gain: Vec::new(),
            filter: None,
            start: 0.0,
            stop: 0.1,
        }
    }

    pub fn span(mut self, start: f64, stop: f64) -> Self {
        self.start = start;
        self.stop = stop;
        self
    }

    /// Pitch jumps to `frequency` at `at` (a delayed onset).
    pub fn pitch_set(mut self, value: f64, at: f64) -> Self {
        self.pitch.push(Ramp::Set { value, at });
        self
    }

    pub fn pitch_exp(mut self, value: f64, at: f64) -> Self {
        self.pitch.push(Ramp::Exponential { value, at });
        self
    }

    pub fn gain_set(mut self, value: f64, at: f64) -> Self {
        self.gain.push(Ramp::Set { value, at });
        self
    }

    pub fn gain_linear(mut self, value: f64, at: f64) -> Self {
        self.gain.push(Ramp::Linear { value, at });
        self
    }

    pub fn gain_exp(mut self, value: f64, at: f64) -> Self {
        self.gain.push(Ramp::Exponential { value, at });
        self
    }

    /// Common shape: `peak` at `at`, exponential fade to `floor` by `until`.
    pub fn pluck(self, peak: f64, floor: f64, at: f64, until: f64) -> Self {
        self.gain_set(peak, at).gain_exp(floor, until)
    }

    pub fn filtered(mut self, kind: FilterType, cutoff: f64) -> Self {
        self.filter = Some(FilterSpec {
            kind,
            cutoff,
            sweep: Vec::new(),
            q: default_q(),
        });
        self
    }

    pub fn filter_q(mut self, q: f64) -> Self {
        if let Some(filter) = self.filter.as_mut() {
            filter.q = q;
        }
        self
    }

    /// Ramp the filter cutoff exponentially (no-op without a filter).
    pub fn cutoff_exp(mut self, value: f64, at: f64) -> Self {
        if let Some(filter) = self.filter.as_mut() {
            filter.sweep.push(Ramp::Exponential { value, at });
        }
        self
    }

    pub fn duration(&self) -> f64 {
        self.stop - self.start
    }

    /// Build the voice for origin time `origin` without scheduling it.
    pub fn voice(&self, origin: f64, sample_rate: f64, output: Output) -> Voice {
        let frequency = timeline(self.frequency, &self.pitch, origin);
        let gain = timeline(0.0, &self.gain, origin);

        let mut voice = Voice::new(
            self.waveform,
            frequency,
            gain,
            origin + self.start,
            origin + self.stop,
            sample_rate,
        )
        .routed_to(output);

        if let Some(spec) = &self.filter {
            let cutoff = timeline(spec.cutoff, &spec.sweep, origin);
            voice = voice.with_filter(VoiceFilter::new(spec.kind, cutoff, spec.q, sample_rate));
        }
        voice
    }

    /// Schedule this tone at `origin`. Fire-and-forget: the voice stops
    /// itself at `origin + stop` and the context reclaims it afterwards.
    pub fn schedule(
        &self,
        ctx: &mut AudioContext,
        origin: f64,
        output: Output,
    ) -> Result<VoiceId, AudioError> {
        let voice = self.voice(origin, ctx.sample_rate(), output);
        ctx.schedule(voice)
    }
}
