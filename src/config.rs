//! Audio configuration, loadable from JSON.
//!
//! Every field has a default, so `{}` is a valid config. Theme-dependent
//! defaults (tracks, voicing, master ceiling) apply unless overridden.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chord::{Chord, ChordVoicing};
use crate::dsp::context::{AutoplayPolicy, ContextOptions};
use crate::error::ConfigError;
use crate::sequencer::{ProgressionTable, SequencerSettings, Track};
use crate::theme::Theme;

/// Lowest sample rate accepted from configuration or the browser.
pub const MIN_SAMPLE_RATE: f64 = 3000.0;

/// Music player tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    pub seed_chords: usize,
    /// Seconds between chord onsets.
    pub chord_spacing: f64,
    /// Seconds of audio scheduled ahead of the clock.
    pub lookahead: f64,
    /// Seconds between look-ahead steps (one animation frame).
    pub tick_interval: f64,
    /// Master gain at volume 1.0; the theme decides when unset.
    pub master_ceiling: Option<f64>,
    pub initial_volume: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let seq = SequencerSettings::default();
        PlayerConfig {
            seed_chords: seq.seed_chords,
            chord_spacing: seq.chord_spacing,
            lookahead: seq.lookahead,
            tick_interval: 1.0 / 60.0,
            master_ceiling: None,
            initial_volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioConfig {
    pub theme: Theme,
    pub sample_rate: f64,
    pub max_voices: usize,
    pub autoplay: AutoplayPolicy,
    /// Seed for the randomized parts of effects (crackles, static).
    pub effects_seed: u64,
    pub player: PlayerConfig,
    pub voicing: Option<ChordVoicing>,
    pub tracks: Option<Vec<Track>>,
    /// Extra or replacement progressions, keyed by mood.
    pub progressions: BTreeMap<String, Vec<Chord>>,
    pub default_mood: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let ctx = ContextOptions::default();
        AudioConfig {
            theme: Theme::default(),
            sample_rate: ctx.sample_rate,
            max_voices: ctx.max_voices,
            autoplay: ctx.autoplay,
            effects_seed: 0x5EED,
            player: PlayerConfig::default(),
            voicing: None,
            tracks: None,
            progressions: BTreeMap::new(),
            default_mood: None,
        }
    }
}

impl AudioConfig {
    /// Defaults for one theme.
    pub fn for_theme(theme: Theme) -> Self {
        AudioConfig {
            theme,
            ..AudioConfig::default()
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        let config: AudioConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(value: f64, name: &str) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be > 0, got {value}")))
            }
        }

        if !(self.sample_rate.is_finite() && self.sample_rate >= MIN_SAMPLE_RATE) {
            return Err(ConfigError::Invalid(format!(
                "sampleRate must be at least {MIN_SAMPLE_RATE}, got {}",
                self.sample_rate
            )));
        }
        positive(self.player.chord_spacing, "player.chordSpacing")?;
        positive(self.player.lookahead, "player.lookahead")?;
        positive(self.player.tick_interval, "player.tickInterval")?;
        if self.max_voices == 0 {
            return Err(ConfigError::Invalid("maxVoices must be at least 1".into()));
        }
        if self.player.seed_chords == 0 {
            return Err(ConfigError::Invalid("player.seedChords must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.player.initial_volume) {
            return Err(ConfigError::Invalid("player.initialVolume must be in [0, 1]".into()));
        }
        let ceiling = self.master_ceiling();
        if !(ceiling > 0.0 && ceiling <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "player.masterCeiling must be in (0, 1], got {ceiling}"
            )));
        }
        if self.tracks().is_empty() {
            return Err(ConfigError::Invalid("at least one track is required".into()));
        }
        if let Some((mood, _)) = self.progressions.iter().find(|(_, chords)| chords.is_empty()) {
            return Err(ConfigError::Invalid(format!("progression '{mood}' is empty")));
        }
        if let Some(mood) = &self.default_mood {
            if !self.progression_table().contains(mood) {
                return Err(ConfigError::Invalid(format!("default mood '{mood}' has no progression")));
            }
        }
        Ok(())
    }

    pub fn context_options(&self) -> ContextOptions {
        ContextOptions {
            sample_rate: self.sample_rate,
            max_voices: self.max_voices,
            autoplay: self.autoplay,
        }
    }

    pub fn sequencer_settings(&self) -> SequencerSettings {
        SequencerSettings {
            seed_chords: self.player.seed_chords,
            chord_spacing: self.player.chord_spacing,
            lookahead: self.player.lookahead,
        }
    }

    pub fn master_ceiling(&self) -> f64 {
        self.player
            .master_ceiling
            .unwrap_or_else(|| self.theme.master_ceiling())
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.tracks.clone().unwrap_or_else(|| self.theme.tracks())
    }

    pub fn voicing(&self) -> ChordVoicing {
        self.voicing.clone().unwrap_or_else(|| self.theme.voicing())
    }

    /// Built-in progressions plus the configured ones.
    pub fn progression_table(&self) -> ProgressionTable {
        let mut table = ProgressionTable::builtin();
        for (mood, chords) in &self.progressions {
            table.insert(mood.clone(), chords.clone());
        }
        if let Some(mood) = &self.default_mood {
            table.set_default_mood(mood);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let config = AudioConfig::from_json("{}").unwrap();
        assert_eq!(config, AudioConfig::default());
        assert_eq!(config.sequencer_settings(), SequencerSettings::default());
        assert_eq!(config.master_ceiling(), 0.15);
        assert_eq!(config.tracks().len(), 3);
    }

    #[test]
    fn theme_drives_ceiling_and_tracks() {
        let config = AudioConfig::from_json(r#"{"theme": "stranger-things"}"#).unwrap();
        assert_eq!(config.master_ceiling(), 0.12);
        assert_eq!(config.tracks()[0].mood, "dark");
        assert!(config.voicing().bass.is_some());
    }

    #[test]
    fn overrides_are_applied() {
        let config = AudioConfig::from_json(
            r#"{
                "sampleRate": 22050,
                "autoplay": "requires-gesture",
                "player": {"seedChords": 4, "lookahead": 8, "masterCeiling": 0.2},
                "tracks": [{"name": "Drone", "mood": "drone"}],
                "progressions": {"drone": [[55, 110]]},
                "defaultMood": "drone"
            }"#,
        )
        .unwrap();
        assert_eq!(config.context_options().sample_rate, 22050.0);
        assert_eq!(config.autoplay, AutoplayPolicy::RequiresGesture);
        assert_eq!(config.sequencer_settings().seed_chords, 4);
        assert_eq!(config.sequencer_settings().chord_spacing, 4.0);
        assert_eq!(config.master_ceiling(), 0.2);
        let table = config.progression_table();
        assert_eq!(table.default_mood(), "drone");
        assert_eq!(table.resolve("unknown").1.len(), 1);
    }

    #[test]
    fn rejects_bad_values() {
        for bad in [
            r#"{"sampleRate": 0}"#,
            r#"{"sampleRate": 16}"#,
            r#"{"player": {"seedChords": 0}}"#,
            r#"{"player": {"lookahead": -1}}"#,
            r#"{"player": {"masterCeiling": 1.5}}"#,
            r#"{"tracks": []}"#,
            r#"{"progressions": {"drone": [[0]]}}"#,
            r#"{"progressions": {"drone": []}}"#,
            r#"{"defaultMood": "nowhere"}"#,
        ] {
            assert!(AudioConfig::from_json(bad).is_err(), "should reject {bad}");
        }
        assert!(matches!(
            AudioConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
        let err = AudioConfig::from_json(r#"{"progressions": {"drone": [[55, -1]]}}"#).unwrap_err();
        assert!(err.to_string().contains("position 1"), "{err}");
    }
}
