//! Track sequencer: mood progressions and look-ahead chord scheduling.
//!
//! The sequencer only decides *what* to play and *when*; it never touches
//! the audio graph. The music player turns each `ScheduledChord` into
//! voices.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chord::Chord;

/// Named style buckets, each mapping to a chord progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Peaceful,
    Motivational,
    Mysterious,
    Dark,
    Eerie,
    Nostalgic,
}

impl Mood {
    pub const ALL: [Mood; 6] = [
        Mood::Peaceful,
        Mood::Motivational,
        Mood::Mysterious,
        Mood::Dark,
        Mood::Eerie,
        Mood::Nostalgic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Peaceful => "peaceful",
            Mood::Motivational => "motivational",
            Mood::Mysterious => "mysterious",
            Mood::Dark => "dark",
            Mood::Eerie => "eerie",
            Mood::Nostalgic => "nostalgic",
        }
    }

    /// Built-in progression for this mood.
    fn progression(self) -> &'static [&'static [f64]] {
        match self {
            Mood::Peaceful => &[
                &[261.63, 329.63, 392.0],  // C
                &[293.66, 369.99, 440.0],  // D
                &[246.94, 311.13, 369.99], // B
                &[220.0, 277.18, 329.63],  // A
            ],
            Mood::Motivational => &[
                &[329.63, 415.3, 493.88],
                &[349.23, 440.0, 523.25],
                &[392.0, 493.88, 587.33],
                &[329.63, 415.3, 493.88],
            ],
            Mood::Mysterious => &[
                &[220.0, 261.63, 329.63],
                &[196.0, 246.94, 293.66],
                &[174.61, 220.0, 261.63],
                &[164.81, 207.65, 246.94],
            ],
            Mood::Dark => &[
                &[130.81, 164.81, 196.0],
                &[123.47, 155.56, 185.0],
                &[116.54, 146.83, 174.61],
                &[110.0, 138.59, 164.81],
            ],
            Mood::Eerie => &[
                &[146.83, 174.61, 207.65],
                &[138.59, 164.81, 196.0],
                &[155.56, 185.0, 220.0],
                &[130.81, 155.56, 185.0],
            ],
            Mood::Nostalgic => &[
                &[220.0, 261.63, 329.63],
                &[174.61, 220.0, 261.63],
                &[261.63, 329.63, 392.0],
                &[196.0, 246.94, 293.66],
            ],
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown mood '{s}'"))
    }
}

/// A named reference to a mood. Defined up front, selected by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub mood: String,
}

impl Track {
    pub fn new(name: impl Into<String>, mood: Mood) -> Self {
        Track {
            name: name.into(),
            mood: mood.as_str().to_string(),
        }
    }
}

/// Mood key → progression, with a fallback mood for unknown keys.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressionTable {
    default_mood: String,
    moods: BTreeMap<String, Vec<Chord>>,
}

impl ProgressionTable {
    /// Every built-in mood, defaulting to `peaceful`.
    pub fn builtin() -> Self {
        let moods = Mood::ALL
            .into_iter()
            .map(|mood| {
                let chords = mood
                    .progression()
                    .iter()
                    .filter_map(|freqs| Chord::new(freqs.to_vec()).ok())
                    .collect();
                (mood.as_str().to_string(), chords)
            })
            .collect();
        ProgressionTable {
            default_mood: Mood::Peaceful.as_str().to_string(),
            moods,
        }
    }

    /// Add or replace a progression. Empty progressions are ignored.
    pub fn insert(&mut self, mood: impl Into<String>, chords: Vec<Chord>) -> bool {
        if chords.is_empty() {
            return false;
        }
        self.moods.insert(mood.into(), chords);
        true
    }

    /// Change the fallback mood; it must already be in the table.
    pub fn set_default_mood(&mut self, mood: &str) -> bool {
        if self.moods.contains_key(mood) {
            self.default_mood = mood.to_string();
            true
        } else {
            false
        }
    }

    pub fn default_mood(&self) -> &str {
        &self.default_mood
    }

    pub fn moods(&self) -> impl Iterator<Item = &str> {
        self.moods.keys().map(String::as_str)
    }

    pub fn contains(&self, mood: &str) -> bool {
        self.moods.contains_key(mood)
    }

    /// Look up a mood; unknown keys resolve to the default progression.
    /// Returns the key actually used alongside the chords.
    pub fn resolve<'a>(&'a self, mood: &'a str) -> (&'a str, &'a [Chord]) {
        match self.moods.get(mood) {
            Some(chords) => (mood, chords),
            None => (
                &self.default_mood,
                self.moods
                    .get(&self.default_mood)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]),
            ),
        }
    }
}

impl Default for ProgressionTable {
    fn default() -> Self {
        ProgressionTable::builtin()
    }
}

/// Timing knobs of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencerSettings {
    /// Chords scheduled back-to-back when a track starts.
    pub seed_chords: usize,
    /// Seconds between chord onsets.
    pub chord_spacing: f64,
    /// How far ahead of the clock chords are scheduled.
    pub lookahead: f64,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        SequencerSettings {
            seed_chords: 8,
            chord_spacing: 4.0,
            lookahead: 16.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Seeding,
    Streaming,
}

/// One chord placed on the timeline. Immutable once emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledChord {
    pub start: f64,
    pub chord: Chord,
    pub mood: String,
    /// Position within the mood's progression.
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct TrackSequencer {
    settings: SequencerSettings,
    state: SequencerState,
    mood: String,
    progression: Vec<Chord>,
    chord_index: usize,
    next_onset: f64,
    emitted: u64,
}

impl TrackSequencer {
    pub fn new(settings: SequencerSettings) -> Self {
        TrackSequencer {
            settings,
            state: SequencerState::Idle,
            mood: String::new(),
            progression: Vec::new(),
            chord_index: 0,
            next_onset: 0.0,
            emitted: 0,
        }
    }

    pub fn settings(&self) -> SequencerSettings {
        self.settings
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Mood actually in use (after fallback).
    pub fn mood(&self) -> &str {
        &self.mood
    }

    /// Index of the next chord to emit, always `< progression length`.
    pub fn chord_index(&self) -> usize {
        self.chord_index
    }

    pub fn next_onset(&self) -> f64 {
        self.next_onset
    }

    /// Chords emitted since the last `start`.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Begin a track at `now`: reset, emit the seed burst, then stream.
    pub fn start(&mut self, mood: &str, table: &ProgressionTable, now: f64) -> Vec<ScheduledChord> {
        let (resolved, chords) = table.resolve(mood);
        if resolved != mood {
            tracing::debug!(requested = mood, fallback = resolved, "unknown mood, using default");
        }

        self.mood = resolved.to_string();
        self.progression = chords.to_vec();
        self.chord_index = 0;
        self.next_onset = now;
        self.emitted = 0;

        if self.progression.is_empty() {
            self.state = SequencerState::Idle;
            return Vec::new();
        }

        self.state = SequencerState::Seeding;
        let seed: Vec<ScheduledChord> = (0..self.settings.seed_chords)
            .map(|_| self.emit())
            .collect();
        self.state = SequencerState::Streaming;
        seed
    }

    /// One look-ahead step: everything due before `now + lookahead`.
    pub fn poll(&mut self, now: f64) -> Vec<ScheduledChord> {
        let mut due = Vec::new();
        if self.state != SequencerState::Streaming {
            return due;
        }
        while self.next_onset < now + self.settings.lookahead {
            due.push(self.emit());
        }
        due
    }

    pub fn stop(&mut self) {
        self.state = SequencerState::Idle;
    }

    fn emit(&mut self) -> ScheduledChord {
        let scheduled = ScheduledChord {
            start: self.next_onset,
            chord: self.progression[self.chord_index].clone(),
            mood: self.mood.clone(),
            index: self.chord_index,
        };
        self.chord_index = (self.chord_index + 1) % self.progression.len();
        self.next_onset += self.settings.chord_spacing;
        self.emitted += 1;
        scheduled
    }
}
