//! Chords and the chord scheduler used by the music player.

use serde::{Deserialize, Serialize};

use crate::dsp::context::{AudioContext, VoiceId};
use crate::dsp::filter::FilterType;
use crate::dsp::oscillator::Waveform;
use crate::dsp::voice::Output;
use crate::error::{AudioError, ChordError};
use crate::tone::ToneSpec;

/// An ordered, non-empty set of positive frequencies in Hz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Chord(Vec<f64>);

impl Chord {
    pub fn new(frequencies: Vec<f64>) -> Result<Self, ChordError> {
        if frequencies.is_empty() {
            return Err(ChordError::Empty);
        }
        if let Some((index, &frequency)) = frequencies
            .iter()
            .enumerate()
            .find(|(_, f)| !f.is_finite() || **f <= 0.0)
        {
            return Err(ChordError::InvalidFrequency { index, frequency });
        }
        Ok(Chord(frequencies))
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowest voice, used for the sub-octave bass.
    pub fn root(&self) -> f64 {
        self.0[0]
    }
}

impl TryFrom<Vec<f64>> for Chord {
    type Error = ChordError;

    fn try_from(frequencies: Vec<f64>) -> Result<Self, Self::Error> {
        Chord::new(frequencies)
    }
}

impl From<Chord> for Vec<f64> {
    fn from(chord: Chord) -> Self {
        chord.0
    }
}

/// Optional sub-octave voice under every chord.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BassVoice {
    pub waveform: Waveform,
    pub gain: f64,
}

/// How a chord is turned into voices.
///
/// Gains are divided by `(voice index + 1)` so the first voices dominate.
/// Envelope: 0 → `peak` at `attack`, → `sustain` at `fade_at`, → 0 at
/// `release_at`; the oscillators stop at `lifetime`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChordVoicing {
    pub primary: Waveform,
    pub alternate: Waveform,
    pub cutoff: f64,
    pub peak: f64,
    pub sustain: f64,
    pub attack: f64,
    pub fade_at: f64,
    pub release_at: f64,
    pub lifetime: f64,
    pub bass: Option<BassVoice>,
}

impl Default for ChordVoicing {
    fn default() -> Self {
        ChordVoicing {
            primary: Waveform::Sine,
            alternate: Waveform::Triangle,
            cutoff: 1000.0,
            peak: 0.08,
            sustain: 0.04,
            attack: 0.5,
            fade_at: 3.5,
            release_at: 4.0,
            lifetime: 4.5,
            bass: None,
        }
    }
}

impl ChordVoicing {
    /// The tone table for one chord, relative to the chord onset.
    pub fn tones(&self, chord: &Chord) -> Vec<ToneSpec> {
        let mut tones: Vec<ToneSpec> = chord
            .frequencies()
            .iter()
            .enumerate()
            .map(|(i, &freq)| {
                let waveform = if i == 0 { self.primary } else { self.alternate };
                let scale = 1.0 / (i + 1) as f64;
                self.shaped(ToneSpec::new(waveform, freq), self.peak * scale, self.sustain * scale)
            })
            .collect();

        if let Some(bass) = self.bass {
            let tone = ToneSpec::new(bass.waveform, chord.root() / 2.0);
            tones.push(self.shaped(tone, bass.gain, bass.gain / 2.0));
        }
        tones
    }

    fn shaped(&self, tone: ToneSpec, peak: f64, sustain: f64) -> ToneSpec {
        tone.filtered(FilterType::Lowpass, self.cutoff)
            .gain_set(0.0, 0.0)
            .gain_linear(peak, self.attack)
            .gain_linear(sustain, self.fade_at)
            .gain_linear(0.0, self.release_at)
            .span(0.0, self.lifetime)
    }
}

/// Builds chord voices on the context timeline.
#[derive(Debug, Clone, Default)]
pub struct ChordScheduler {
    pub voicing: ChordVoicing,
}

impl ChordScheduler {
    pub fn new(voicing: ChordVoicing) -> Self {
        ChordScheduler { voicing }
    }

    /// Schedule every voice of `chord` at absolute time `start`.
    pub fn schedule(
        &self,
        ctx: &mut AudioContext,
        chord: &Chord,
        start: f64,
        output: Output,
    ) -> Result<Vec<VoiceId>, AudioError> {
        self.voicing
            .tones(chord)
            .iter()
            .map(|tone| tone.schedule(ctx, start, output))
            .collect()
    }
}
