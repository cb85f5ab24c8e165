//! Site themes: which tracks, voicing, loudness and effects each skin uses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chord::{BassVoice, ChordVoicing};
use crate::dsp::oscillator::Waveform;
use crate::effects::Effect;
use crate::sequencer::{Mood, Track};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    #[default]
    Naruto,
    StrangerThings,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Naruto => "naruto",
            Theme::StrangerThings => "stranger-things",
        }
    }

    pub fn tracks(self) -> Vec<Track> {
        match self {
            Theme::Naruto => vec![
                Track::new("Konoha Sunset", Mood::Peaceful),
                Track::new("Training Grounds", Mood::Motivational),
                Track::new("Hidden Leaf Village", Mood::Mysterious),
            ],
            Theme::StrangerThings => vec![
                Track::new("Hawkins Lab", Mood::Dark),
                Track::new("The Upside Down", Mood::Eerie),
                Track::new("Starcourt Mall", Mood::Nostalgic),
            ],
        }
    }

    /// Master gain at full volume.
    pub fn master_ceiling(self) -> f64 {
        match self {
            Theme::Naruto => 0.15,
            Theme::StrangerThings => 0.12,
        }
    }

    pub fn voicing(self) -> ChordVoicing {
        match self {
            Theme::Naruto => ChordVoicing::default(),
            Theme::StrangerThings => ChordVoicing {
                alternate: Waveform::Sawtooth,
                cutoff: 700.0,
                bass: Some(BassVoice {
                    waveform: Waveform::Sine,
                    gain: 0.06,
                }),
                ..ChordVoicing::default()
            },
        }
    }

    pub fn effects(self) -> &'static [Effect] {
        match self {
            Theme::Naruto => &[
                Effect::Click,
                Effect::Hover,
                Effect::Navigate,
                Effect::Jutsu,
                Effect::Rasengan,
                Effect::Kunai,
                Effect::Chakra,
                Effect::Chidori,
            ],
            Theme::StrangerThings => &[
                Effect::Click,
                Effect::Hover,
                Effect::Navigate,
                Effect::PortalOpen,
                Effect::CreatureGrowl,
                Effect::ElectricalFlicker,
                Effect::StaticBurst,
            ],
        }
    }

    pub fn supports(self, effect: Effect) -> bool {
        self.effects().contains(&effect)
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "naruto" => Ok(Theme::Naruto),
            "stranger-things" | "stranger" => Ok(Theme::StrangerThings),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::ProgressionTable;

    #[test]
    fn theme_tracks_use_known_moods() {
        let table = ProgressionTable::builtin();
        for theme in [Theme::Naruto, Theme::StrangerThings] {
            let tracks = theme.tracks();
            assert_eq!(tracks.len(), 3);
            assert!(tracks.iter().all(|t| table.contains(&t.mood)));
        }
    }

    #[test]
    fn shared_and_exclusive_effects() {
        for theme in [Theme::Naruto, Theme::StrangerThings] {
            assert!(theme.supports(Effect::Click));
            assert!(theme.supports(Effect::Navigate));
        }
        assert!(Theme::Naruto.supports(Effect::Rasengan));
        assert!(!Theme::Naruto.supports(Effect::PortalOpen));
        assert!(Theme::StrangerThings.supports(Effect::StaticBurst));
        assert!(!Theme::StrangerThings.supports(Effect::Chidori));
    }

    #[test]
    fn parses_theme_names() {
        assert_eq!("stranger".parse::<Theme>(), Ok(Theme::StrangerThings));
        assert_eq!(Theme::StrangerThings.to_string(), "stranger-things");
        assert!("matrix".parse::<Theme>().is_err());
    }
}
