//! Playback controller for the ambient background music.
//!
//! A session owns one master gain bus and the chord voices routed through
//! it. Starting a track always tears the previous session down first, so
//! at most one master bus exists per player. The embedding drives the
//! look-ahead by calling [`MusicPlayer::tick`] once per animation frame.

use crate::chord::ChordScheduler;
use crate::config::AudioConfig;
use crate::dsp::context::{AudioContext, VoiceId};
use crate::dsp::voice::{BusId, Output};
use crate::error::AudioError;
use crate::host::AudioHost;
use crate::sequencer::{ProgressionTable, ScheduledChord, TrackSequencer, Track};
use crate::theme::Theme;

/// Voices and master bus of the track currently playing.
#[derive(Debug)]
struct PlaybackSession {
    master: BusId,
    voices: Vec<VoiceId>,
}

/// Fires at most once per `interval` seconds of context time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookaheadTimer {
    interval: f64,
    next_due: f64,
}

impl LookaheadTimer {
    pub fn new(interval: f64, now: f64) -> Self {
        LookaheadTimer {
            interval,
            next_due: now,
        }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// True when a step is due at `now`; re-arms the timer.
    pub fn due(&mut self, now: f64) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;
        true
    }
}

pub struct MusicPlayer {
    host: AudioHost,
    tracks: Vec<Track>,
    table: ProgressionTable,
    sequencer: TrackSequencer,
    scheduler: ChordScheduler,
    session: Option<PlaybackSession>,
    timer: Option<LookaheadTimer>,
    tick_interval: f64,
    selected: usize,
    volume: f64,
    ceiling: f64,
}

impl MusicPlayer {
    /// A player with the theme's defaults.
    pub fn new(host: AudioHost, theme: Theme) -> Self {
        Self::from_config(host, &AudioConfig::for_theme(theme))
    }

    pub fn from_config(host: AudioHost, config: &AudioConfig) -> Self {
        MusicPlayer {
            host,
            tracks: config.tracks(),
            table: config.progression_table(),
            sequencer: TrackSequencer::new(config.sequencer_settings()),
            scheduler: ChordScheduler::new(config.voicing()),
            session: None,
            timer: None,
            tick_interval: config.player.tick_interval,
            selected: 0,
            volume: clamp_volume(config.player.initial_volume),
            ceiling: config.master_ceiling(),
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Index of the selected track (the last one played).
    pub fn current_index(&self) -> usize {
        self.selected
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.tracks.get(self.selected)
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_some()
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn sequencer(&self) -> &TrackSequencer {
        &self.sequencer
    }

    /// Current master bus gain, if a session is live.
    pub fn master_gain(&self) -> Option<f64> {
        let master = self.session.as_ref()?.master;
        self.host.with_existing(|ctx| ctx.bus_gain(master)).flatten()
    }

    /// Session voices still sounding or waiting to start.
    pub fn live_voice_count(&self) -> usize {
        let Some(session) = &self.session else {
            return 0;
        };
        self.host
            .with_existing(|ctx| session.voices.iter().filter(|&&v| ctx.is_live(v)).count())
            .unwrap_or(0)
    }

    /// Start track `index` from its first chord. Whatever was playing stops
    /// first. An unknown index or a blocked context leaves the player idle.
    pub fn play(&mut self, index: usize) {
        if index >= self.tracks.len() {
            let err = AudioError::UnknownTrack {
                index,
                count: self.tracks.len(),
            };
            tracing::debug!(%err, "play ignored");
            return;
        }

        self.stop();
        self.selected = index;
        if let Err(err) = self.start_session() {
            tracing::debug!(%err, track = index, "music not started");
            self.sequencer.stop();
        }
    }

    /// Select the track after the current one, wrapping to the first.
    /// Restarts playback only when something is already playing.
    pub fn next_track(&mut self) {
        if self.tracks.is_empty() {
            return;
        }
        let next = (self.selected + 1) % self.tracks.len();
        if self.is_playing() {
            self.play(next);
        } else {
            self.selected = next;
        }
    }

    /// Silence every session voice at once and drop the master bus.
    pub fn stop(&mut self) {
        self.timer = None;
        self.sequencer.stop();
        let Some(session) = self.session.take() else {
            return;
        };
        self.host.with_existing(|ctx| {
            for voice in &session.voices {
                ctx.stop_voice(*voice);
            }
            ctx.remove_bus(session.master);
        });
        tracing::debug!(voices = session.voices.len(), "music stopped");
    }

    /// Set the volume in `[0, 1]` (NaN counts as 0). The value is kept and
    /// applied to the master bus now or when the next track starts.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = clamp_volume(volume);
        let gain = self.volume * self.ceiling;
        if let Some(session) = &self.session {
            let master = session.master;
            if let Some(Err(err)) = self.host.with_existing(|ctx| ctx.set_bus_gain(master, gain)) {
                tracing::debug!(%err, "volume not applied");
            }
        }
    }

    /// One look-ahead step: schedule every chord that falls inside the
    /// look-ahead window. Returns how many chords were scheduled.
    pub fn tick(&mut self) -> usize {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };
        let Some(now) = self.host.with_existing(|ctx| ctx.current_time()) else {
            // Context closed underneath us.
            self.stop();
            return 0;
        };
        if !self.timer.as_mut().is_some_and(|t| t.due(now)) {
            return 0;
        }

        let due = self.sequencer.poll(now);
        let scheduler = &self.scheduler;
        let result = self.host.with_context(|ctx| {
            session.voices.retain(|v| ctx.is_live(*v));
            schedule_chords(ctx, scheduler, &due, session)
        });
        match result {
            Ok(()) => due.len(),
            Err(err) => {
                tracing::warn!(%err, "look-ahead scheduling failed, stopping music");
                self.stop();
                0
            }
        }
    }

    fn start_session(&mut self) -> Result<(), AudioError> {
        let track = &self.tracks[self.selected];
        let gain = self.volume * self.ceiling;
        let (sequencer, table, scheduler) = (&mut self.sequencer, &self.table, &self.scheduler);

        let (session, now) = self.host.with_context(|ctx| {
            let now = ctx.current_time();
            let mut session = PlaybackSession {
                master: ctx.create_bus(gain)?,
                voices: Vec::new(),
            };
            let seed = sequencer.start(&track.mood, table, now);
            if let Err(err) = schedule_chords(ctx, scheduler, &seed, &mut session) {
                for voice in &session.voices {
                    ctx.stop_voice(*voice);
                }
                ctx.remove_bus(session.master);
                return Err(err);
            }
            Ok((session, now))
        })?;

        tracing::info!(
            track = %track.name,
            mood = self.sequencer.mood(),
            voices = session.voices.len(),
            "music started"
        );
        self.session = Some(session);
        self.timer = Some(LookaheadTimer::new(self.tick_interval, now));
        Ok(())
    }
}

impl Drop for MusicPlayer {
    fn drop(&mut self) {
        self.stop();
        self.host.close();
    }
}

fn schedule_chords(
    ctx: &mut AudioContext,
    scheduler: &ChordScheduler,
    chords: &[ScheduledChord],
    session: &mut PlaybackSession,
) -> Result<(), AudioError> {
    for scheduled in chords {
        let voices = scheduler.schedule(
            ctx,
            &scheduled.chord,
            scheduled.start,
            Output::Bus(session.master),
        )?;
        session.voices.extend(voices);
    }
    Ok(())
}

fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}
