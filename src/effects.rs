//! Effect composer: short UI sound effects built from tone tables.
//!
//! Every effect is a fixed recipe of `ToneSpec`s (a few use random
//! crackle placement) and lasts between 50 ms and 800 ms. Effects are
//! fire-and-forget; the context reclaims their voices once they finish.

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::AudioConfig;
use crate::dsp::context::VoiceId;
use crate::dsp::filter::FilterType;
use crate::dsp::oscillator::Waveform;
use crate::dsp::voice::Output;
use crate::error::AudioError;
use crate::host::AudioHost;
use crate::theme::Theme;
use crate::tone::ToneSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Effect {
    Click,
    Hover,
    Navigate,
    Jutsu,
    Rasengan,
    Kunai,
    Chakra,
    Chidori,
    PortalOpen,
    CreatureGrowl,
    ElectricalFlicker,
    StaticBurst,
}

impl Effect {
    pub const ALL: [Effect; 12] = [
        Effect::Click,
        Effect::Hover,
        Effect::Navigate,
        Effect::Jutsu,
        Effect::Rasengan,
        Effect::Kunai,
        Effect::Chakra,
        Effect::Chidori,
        Effect::PortalOpen,
        Effect::CreatureGrowl,
        Effect::ElectricalFlicker,
        Effect::StaticBurst,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Effect::Click => "click",
            Effect::Hover => "hover",
            Effect::Navigate => "navigate",
            Effect::Jutsu => "jutsu",
            Effect::Rasengan => "rasengan",
            Effect::Kunai => "kunai",
            Effect::Chakra => "chakra",
            Effect::Chidori => "chidori",
            Effect::PortalOpen => "portal-open",
            Effect::CreatureGrowl => "creature-growl",
            Effect::ElectricalFlicker => "electrical-flicker",
            Effect::StaticBurst => "static-burst",
        }
    }

    /// The tone table, with times relative to the trigger instant.
    pub fn tones(self, rng: &mut impl Rng) -> Vec<ToneSpec> {
        use FilterType::*;
        use Waveform::*;

        match self {
            Effect::Click => vec![
                ToneSpec::new(Sine, 800.0)
                    .pitch_exp(400.0, 0.1)
                    .pluck(0.1, 0.01, 0.0, 0.1)
                    .span(0.0, 0.1),
            ],

            Effect::Hover => vec![
                ToneSpec::new(Sine, 600.0)
                    .pitch_exp(800.0, 0.05)
                    .pluck(0.03, 0.01, 0.0, 0.05)
                    .span(0.0, 0.05),
            ],

            Effect::Navigate => vec![
                ToneSpec::new(Triangle, 300.0)
                    .pitch_exp(600.0, 0.1)
                    .pitch_exp(400.0, 0.2)
                    .pluck(0.06, 0.01, 0.0, 0.2)
                    .span(0.0, 0.2),
            ],

            // Rising arpeggio of hand seals.
            Effect::Jutsu => [200.0, 300.0, 400.0, 500.0, 600.0, 800.0]
                .into_iter()
                .enumerate()
                .map(|(i, freq)| {
                    let onset = i as f64 * 0.08;
                    let waveform = if i % 2 == 0 { Sine } else { Triangle };
                    ToneSpec::new(waveform, freq)
                        .pitch_set(freq, onset)
                        .pitch_exp(freq * 1.5, onset + 0.1)
                        .pluck(0.06, 0.01, onset, onset + 0.1)
                        .span(onset, onset + 0.1)
                })
                .collect(),

            Effect::Rasengan => {
                let mut tones: Vec<ToneSpec> = (0..8)
                    .map(|i| {
                        let onset = i as f64 * 0.05;
                        let end = onset + 0.45;
                        let base = 150.0 + i as f64 * 50.0;
                        let waveform = if i % 2 == 0 { Sine } else { Sawtooth };
                        ToneSpec::new(waveform, base)
                            .pitch_set(base, onset)
                            .pitch_exp(base * 3.0, end)
                            .gain_set(0.0, onset)
                            .gain_linear(0.04, onset + 0.1)
                            .gain_exp(0.01, end)
                            .filtered(Lowpass, 800.0 + i as f64 * 200.0)
                            .cutoff_exp(2000.0 + i as f64 * 300.0, 0.8)
                            .span(onset, end)
                    })
                    .collect();
                tones.push(
                    ToneSpec::new(Triangle, 100.0)
                        .pitch_exp(400.0, 0.8)
                        .gain_set(0.02, 0.0)
                        .gain_exp(0.08, 0.5)
                        .gain_exp(0.01, 0.8)
                        .filtered(Bandpass, 500.0)
                        .span(0.0, 0.8),
                );
                tones
            }

            Effect::Kunai => vec![
                ToneSpec::new(Sine, 2500.0)
                    .pitch_exp(1500.0, 0.15)
                    .pluck(0.08, 0.01, 0.0, 0.15)
                    .span(0.0, 0.15),
                ToneSpec::new(Sawtooth, 800.0)
                    .pitch_exp(200.0, 0.2)
                    .pluck(0.03, 0.01, 0.0, 0.2)
                    .filtered(Highpass, 400.0)
                    .span(0.0, 0.2),
            ],

            Effect::Chakra => {
                let mut tones = vec![
                    ToneSpec::new(Sine, 80.0)
                        .pitch_exp(40.0, 0.4)
                        .pluck(0.1, 0.01, 0.0, 0.4)
                        .span(0.0, 0.4),
                ];
                tones.extend((0..5).map(|i| {
                    let onset = i as f64 * 0.02;
                    let freq = 200.0 + i as f64 * 150.0;
                    ToneSpec::new(Triangle, freq)
                        .pitch_exp(freq * 0.5, 0.3)
                        .pluck(0.05, 0.01, 0.0, 0.25)
                        .span(onset, 0.3)
                }));
                tones
            }

            // Crackles land at random, so two chidoris never sound alike.
            Effect::Chidori => {
                let mut tones: Vec<ToneSpec> = (0..12)
                    .map(|_| {
                        let onset = rng.random_range(0.0..0.5);
                        let freq = 1000.0 + rng.random::<f64>() * 3000.0;
                        let peak = 0.02 + rng.random::<f64>() * 0.02;
                        ToneSpec::new(Square, freq)
                            .pitch_set(freq, onset)
                            .pitch_exp(freq * 0.3, onset + 0.05)
                            .pluck(peak, 0.001, onset, onset + 0.05)
                            .span(onset, onset + 0.05)
                    })
                    .collect();
                tones.push(
                    ToneSpec::new(Sawtooth, 120.0)
                        .pluck(0.04, 0.01, 0.0, 0.6)
                        .filtered(Lowpass, 300.0)
                        .span(0.0, 0.6),
                );
                tones
            }

            Effect::PortalOpen => vec![
                ToneSpec::new(Sawtooth, 55.0)
                    .pitch_exp(220.0, 0.7)
                    .gain_linear(0.09, 0.3)
                    .gain_exp(0.005, 0.8)
                    .filtered(Lowpass, 180.0)
                    .filter_q(4.0)
                    .cutoff_exp(1800.0, 0.7)
                    .span(0.0, 0.8),
                ToneSpec::new(Sine, 880.0)
                    .pitch_exp(440.0, 0.8)
                    .pluck(0.03, 0.002, 0.1, 0.8)
                    .span(0.1, 0.8),
                ToneSpec::new(Sine, 40.0)
                    .pluck(0.12, 0.01, 0.0, 0.8)
                    .span(0.0, 0.8),
            ],

            Effect::CreatureGrowl => {
                let mut tones: Vec<ToneSpec> = [70.0, 73.5, 105.0]
                    .into_iter()
                    .enumerate()
                    .map(|(i, freq)| {
                        let onset = i as f64 * 0.03;
                        ToneSpec::new(Sawtooth, freq)
                            .pitch_set(freq, onset)
                            .pitch_exp(freq * 0.6, 0.7)
                            .gain_set(0.0, onset)
                            .gain_linear(0.06, onset + 0.15)
                            .gain_exp(0.005, 0.7)
                            .filtered(Lowpass, 420.0)
                            .filter_q(2.0)
                            .cutoff_exp(260.0, 0.7)
                            .span(onset, 0.7)
                    })
                    .collect();
                tones.push(
                    ToneSpec::new(Square, 35.0)
                        .pluck(0.05, 0.005, 0.0, 0.7)
                        .filtered(Lowpass, 120.0)
                        .span(0.0, 0.7),
                );
                tones
            }

            Effect::ElectricalFlicker => {
                let mut tones: Vec<ToneSpec> = (0..6)
                    .map(|_| {
                        let onset = rng.random_range(0.0..0.35);
                        let freq = 400.0 + rng.random::<f64>() * 800.0;
                        ToneSpec::new(Square, freq)
                            .pluck(0.04, 0.002, onset, onset + 0.03)
                            .span(onset, onset + 0.03)
                    })
                    .collect();
                tones.push(
                    ToneSpec::new(Sawtooth, 60.0)
                        .pluck(0.05, 0.005, 0.0, 0.45)
                        .filtered(Lowpass, 250.0)
                        .span(0.0, 0.45),
                );
                tones
            }

            Effect::StaticBurst => (0..16)
                .map(|i| {
                    let onset = rng.random_range(0.0..0.22);
                    let freq = rng.random_range(3000.0..8000.0);
                    let waveform = if i % 2 == 0 { Square } else { Sawtooth };
                    ToneSpec::new(waveform, freq)
                        .pluck(0.025, 0.001, onset, onset + 0.025)
                        .filtered(Highpass, 2500.0)
                        .span(onset, onset + 0.025)
                })
                .collect(),
        }
    }

    /// Seconds from trigger until the last voice stops.
    pub fn duration(tones: &[ToneSpec]) -> f64 {
        tones.iter().map(|t| t.stop).fold(0.0, f64::max)
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Effect::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown effect '{s}'"))
    }
}

/// Plays effects for one theme through the shared host.
pub struct SoundBoard {
    host: AudioHost,
    theme: Theme,
    enabled: bool,
    rng: StdRng,
}

impl SoundBoard {
    pub fn new(host: AudioHost, theme: Theme) -> Self {
        Self::with_seed(host, theme, AudioConfig::default().effects_seed)
    }

    pub fn with_seed(host: AudioHost, theme: Theme, seed: u64) -> Self {
        SoundBoard {
            host,
            theme,
            enabled: true,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_config(host: AudioHost, config: &AudioConfig) -> Self {
        Self::with_seed(host, config.theme, config.effects_seed)
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Play `effect` now. Failures (blocked autoplay, a full voice pool, an
    /// effect the theme lacks) are logged and otherwise ignored.
    pub fn trigger(&mut self, effect: Effect) {
        if let Err(err) = self.try_trigger(effect) {
            tracing::debug!(%effect, %err, "effect not played");
        }
    }

    /// Like `trigger`, but by name; unknown names are ignored.
    pub fn trigger_named(&mut self, name: &str) {
        match name.parse::<Effect>() {
            Ok(effect) => self.trigger(effect),
            Err(err) => tracing::debug!(%err, "effect not played"),
        }
    }

    /// Play `effect` now and return its voices. A disabled board returns no
    /// voices and never creates a context.
    pub fn try_trigger(&mut self, effect: Effect) -> Result<Vec<VoiceId>, AudioError> {
        if !self.enabled {
            return Ok(Vec::new());
        }
        if !self.theme.supports(effect) {
            return Err(AudioError::UnsupportedEffect {
                effect: effect.to_string(),
                theme: self.theme.to_string(),
            });
        }

        let tones = effect.tones(&mut self.rng);
        self.host.with_context(|ctx| {
            let now = ctx.current_time();
            let mut ids = Vec::with_capacity(tones.len());
            for tone in &tones {
                match tone.schedule(ctx, now, Output::Destination) {
                    Ok(id) => ids.push(id),
                    Err(err) => {
                        // All or nothing: drop the layers already started.
                        for id in ids {
                            ctx.stop_voice(id);
                        }
                        return Err(err);
                    }
                }
            }
            Ok(ids)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::context::{AutoplayPolicy, ContextOptions};

    fn host(autoplay: AutoplayPolicy) -> AudioHost {
        AudioHost::new(ContextOptions {
            sample_rate: 8000.0,
            max_voices: 64,
            autoplay,
        })
    }

    #[test]
    fn every_effect_is_short() {
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            for effect in Effect::ALL {
                let tones = effect.tones(&mut rng);
                assert!(!tones.is_empty(), "{effect} has no tones");
                let duration = Effect::duration(&tones);
                assert!(
                    (0.05..=0.8 + 1e-9).contains(&duration),
                    "{effect} lasts {duration}"
                );
                assert!(tones.iter().all(|t| t.start >= 0.0 && t.stop > t.start));
            }
        }
    }

    #[test]
    fn effect_names_round_trip() {
        for effect in Effect::ALL {
            assert_eq!(effect.as_str().parse::<Effect>(), Ok(effect));
        }
        assert_eq!(
            serde_json::to_string(&Effect::PortalOpen).unwrap(),
            "\"portal-open\""
        );
        assert!("explosion".parse::<Effect>().is_err());
    }

    #[test]
    fn jutsu_rises_in_steps() {
        let tones = Effect::Jutsu.tones(&mut StdRng::seed_from_u64(0));
        assert_eq!(tones.len(), 6);
        assert!(tones.windows(2).all(|w| w[1].frequency > w[0].frequency));
        assert!((tones[5].start - 0.4).abs() < 1e-12);
    }

    #[test]
    fn trigger_schedules_audible_voices() {
        let host = host(AutoplayPolicy::Allowed);
        let mut board = SoundBoard::new(host.clone(), Theme::Naruto);
        let ids = board.try_trigger(Effect::Kunai).unwrap();
        assert_eq!(ids.len(), 2);

        let out = host.render(800);
        assert!(out.iter().any(|s| s.abs() > 0.01));

        host.advance(0.5);
        assert_eq!(host.with_existing(|ctx| ctx.voice_count()), Some(0));
    }

    #[test]
    fn voice_limit_drops_the_whole_effect() {
        let host = AudioHost::new(ContextOptions {
            sample_rate: 8000.0,
            max_voices: 1,
            autoplay: AutoplayPolicy::Allowed,
        });
        let mut board = SoundBoard::new(host.clone(), Theme::Naruto);
        assert_eq!(
            board.try_trigger(Effect::Kunai),
            Err(AudioError::VoiceLimit { max: 1 })
        );
        assert_eq!(host.with_existing(|ctx| ctx.voice_count()), Some(0));
        assert_eq!(board.try_trigger(Effect::Click).map(|ids| ids.len()), Ok(1));
    }

    #[test]
    fn rasengan_wind_swells_exponentially() {
        let tones = Effect::Rasengan.tones(&mut StdRng::seed_from_u64(0));
        let wind = tones[8].voice(0.0, 8000.0, Output::Destination);
        assert!((wind.gain_at(0.0) - 0.02).abs() < 1e-9);
        assert!((wind.gain_at(0.25) - 0.04).abs() < 1e-9);
        assert!((wind.gain_at(0.5) - 0.08).abs() < 1e-9);
    }

    #[test]
    fn chakra_layers_decay_from_the_trigger() {
        let tones = Effect::Chakra.tones(&mut StdRng::seed_from_u64(0));
        assert_eq!(tones.len(), 6);
        let layer = tones[3].voice(0.0, 8000.0, Output::Destination);
        assert_eq!(layer.gain_at(0.0), 0.0);
        let gain = layer.gain_at(0.04);
        assert!(gain > 0.01 && gain < 0.05, "layer gain at onset was {gain}");
    }

    #[test]
    fn disabled_board_never_creates_context() {
        let host = host(AutoplayPolicy::Allowed);
        let mut board = SoundBoard::new(host.clone(), Theme::Naruto);
        board.set_enabled(false);
        assert!(!board.enabled());
        assert_eq!(board.try_trigger(Effect::Click), Ok(Vec::new()));
        board.trigger(Effect::Rasengan);
        assert_eq!(host.state(), None);
    }

    #[test]
    fn blocked_autoplay_is_silent() {
        let host = host(AutoplayPolicy::RequiresGesture);
        let mut board = SoundBoard::new(host.clone(), Theme::Naruto);
        assert_eq!(board.try_trigger(Effect::Click), Err(AudioError::Blocked));
        board.trigger(Effect::Click);
        assert_eq!(host.state(), None);

        host.unlock();
        assert_eq!(board.try_trigger(Effect::Click).map(|ids| ids.len()), Ok(1));
    }

    #[test]
    fn theme_limits_effects() {
        let mut board = SoundBoard::new(host(AutoplayPolicy::Allowed), Theme::StrangerThings);
        assert!(matches!(
            board.try_trigger(Effect::Chidori),
            Err(AudioError::UnsupportedEffect { .. })
        ));
        assert!(board.try_trigger(Effect::PortalOpen).is_ok());
        board.trigger_named("static-burst");
        board.trigger_named("nonsense");
    }

    #[test]
    fn same_seed_same_crackles() {
        let a = Effect::StaticBurst.tones(&mut StdRng::seed_from_u64(7));
        let b = Effect::StaticBurst.tones(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }
}
