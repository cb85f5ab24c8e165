//! Audio context: the shared audio graph and its sample clock.
//!
//! Voices are scheduled against absolute context time and render
//! themselves; the context only sums them (directly or through gain buses),
//! advances the clock, and reclaims voices once their stop time has passed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AudioError;

use super::mixer::{soft_clip, Bus};
use super::voice::{BusId, Output, Voice};

/// Handle of a scheduled voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(u64);

/// Lifecycle of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created but not yet allowed to run; the clock is frozen.
    Suspended,
    Running,
    /// Released; nothing can be scheduled any more.
    Closed,
}

/// Whether a context may start without a user gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoplayPolicy {
    #[default]
    Allowed,
    RequiresGesture,
}

/// Construction parameters for a context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextOptions {
    pub sample_rate: f64,
    pub max_voices: usize,
    pub autoplay: AutoplayPolicy,
}

impl Default for ContextOptions {
    fn default() -> Self {
        ContextOptions {
            sample_rate: 44100.0,
            max_voices: 256,
            autoplay: AutoplayPolicy::Allowed,
        }
    }
}

pub struct AudioContext {
    sample_rate: f64,
    max_voices: usize,
    state: ContextState,
    frame: u64,
    next_id: u64,
    voices: Vec<(VoiceId, Voice)>,
    buses: Vec<(BusId, Bus)>,
}

impl AudioContext {
    /// A new, suspended context.
    pub fn new(options: ContextOptions) -> Self {
        AudioContext {
            sample_rate: options.sample_rate,
            max_voices: options.max_voices,
            state: ContextState::Suspended,
            frame: 0,
            next_id: 0,
            voices: Vec::new(),
            buses: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Context time in seconds.
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate
    }

    pub fn resume(&mut self) -> Result<(), AudioError> {
        match self.state {
            ContextState::Closed => Err(AudioError::Closed),
            _ => {
                self.state = ContextState::Running;
                Ok(())
            }
        }
    }

    pub fn suspend(&mut self) {
        if self.state == ContextState::Running {
            self.state = ContextState::Suspended;
        }
    }

    /// Release everything. Closing twice is a no-op.
    pub fn close(&mut self) {
        self.voices.clear();
        self.buses.clear();
        self.state = ContextState::Closed;
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn ensure_open(&self) -> Result<(), AudioError> {
        if self.state == ContextState::Closed {
            Err(AudioError::Closed)
        } else {
            Ok(())
        }
    }

    /// Add a voice to the graph.
    pub fn schedule(&mut self, voice: Voice) -> Result<VoiceId, AudioError> {
        self.ensure_open()?;
        if self.voices.len() >= self.max_voices {
            return Err(AudioError::VoiceLimit {
                max: self.max_voices,
            });
        }
        if let Output::Bus(bus) = voice.output {
            if !self.has_bus(bus) {
                return Err(AudioError::UnknownBus);
            }
        }
        let id = VoiceId(self.next_id());
        self.voices.push((id, voice));
        Ok(id)
    }

    /// Stop a voice now, cutting its envelope short.
    pub fn stop_voice(&mut self, id: VoiceId) -> bool {
        let before = self.voices.len();
        self.voices.retain(|(v, _)| *v != id);
        self.voices.len() != before
    }

    pub fn is_live(&self, id: VoiceId) -> bool {
        self.voices.iter().any(|(v, _)| *v == id)
    }

    pub fn voice(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.iter().find(|(v, _)| *v == id).map(|(_, voice)| voice)
    }

    /// Number of voices not yet reclaimed.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn create_bus(&mut self, gain: f64) -> Result<BusId, AudioError> {
        self.ensure_open()?;
        let id = BusId(self.next_id());
        let mut bus = Bus::new(gain);
        bus.gain.set_value_at_time(gain, self.current_time());
        self.buses.push((id, bus));
        Ok(id)
    }

    fn has_bus(&self, id: BusId) -> bool {
        self.buses.iter().any(|(b, _)| *b == id)
    }

    /// Change a bus gain, effective at the current context time.
    pub fn set_bus_gain(&mut self, id: BusId, value: f64) -> Result<(), AudioError> {
        let now = self.current_time();
        let (_, bus) = self
            .buses
            .iter_mut()
            .find(|(b, _)| *b == id)
            .ok_or(AudioError::UnknownBus)?;
        bus.gain.set_value_at_time(value, now);
        Ok(())
    }

    pub fn bus_gain(&self, id: BusId) -> Option<f64> {
        let now = self.current_time();
        self.buses
            .iter()
            .find(|(b, _)| *b == id)
            .map(|(_, bus)| bus.gain.value_at(now))
    }

    /// Remove a bus and every voice routed through it.
    pub fn remove_bus(&mut self, id: BusId) -> bool {
        let before = self.buses.len();
        self.buses.retain(|(b, _)| *b != id);
        self.voices.retain(|(_, v)| v.output != Output::Bus(id));
        self.buses.len() != before
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    /// Render `frames` mono samples and advance the clock.
    ///
    /// A context that is not running produces silence and keeps its clock.
    pub fn render(&mut self, frames: usize) -> Vec<f64> {
        let mut out = vec![0.0; frames];
        if self.state != ContextState::Running {
            return out;
        }

        let bus_index: HashMap<BusId, usize> = self
            .buses
            .iter()
            .enumerate()
            .map(|(i, (id, _))| (*id, i))
            .collect();

        for (n, slot) in out.iter_mut().enumerate() {
            let time = (self.frame + n as u64) as f64 / self.sample_rate;
            let mut direct = 0.0;
            for (_, voice) in self.voices.iter_mut() {
                let sample = voice.render(time);
                match voice.output {
                    Output::Destination => direct += sample,
                    Output::Bus(id) => {
                        if let Some(&i) = bus_index.get(&id) {
                            self.buses[i].1.add(sample);
                        }
                    }
                }
            }
            let bused: f64 = self.buses.iter_mut().map(|(_, bus)| bus.take(time)).sum();
            *slot = soft_clip(direct + bused);
        }

        self.frame += frames as u64;
        self.reclaim();
        out
    }

    /// Drop voices whose stop time has passed.
    fn reclaim(&mut self) {
        let now = self.current_time();
        self.voices.retain(|(_, v)| !v.is_finished(now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::envelope::Envelope;
    use crate::dsp::oscillator::Waveform;

    fn options() -> ContextOptions {
        ContextOptions {
            sample_rate: 8000.0,
            max_voices: 4,
            autoplay: AutoplayPolicy::Allowed,
        }
    }

    fn beep(start: f64, stop: f64) -> Voice {
        Voice::new(
            Waveform::Sine,
            Envelope::constant(440.0),
            Envelope::constant(0.3),
            start,
            stop,
            8000.0,
        )
    }

    fn peak(samples: &[f64]) -> f64 {
        samples.iter().fold(0.0_f64, |m, &s| m.max(s.abs()))
    }

    #[test]
    fn suspended_context_is_silent_and_frozen() {
        let mut ctx = AudioContext::new(options());
        ctx.schedule(beep(0.0, 1.0)).unwrap();
        let out = ctx.render(800);
        assert_eq!(peak(&out), 0.0);
        assert_eq!(ctx.current_time(), 0.0);
    }

    #[test]
    fn running_context_renders_and_reclaims() {
        let mut ctx = AudioContext::new(options());
        ctx.resume().unwrap();
        let id = ctx.schedule(beep(0.0, 0.1)).unwrap();
        let out = ctx.render(400);
        assert!(peak(&out) > 0.1);
        assert!(ctx.is_live(id));

        ctx.render(800);
        assert!(!ctx.is_live(id), "finished voice should be reclaimed");
        assert!((ctx.current_time() - 0.15).abs() < 1e-9);
    }

    #[test]
    fn voice_limit_is_enforced() {
        let mut ctx = AudioContext::new(options());
        for _ in 0..4 {
            ctx.schedule(beep(0.0, 1.0)).unwrap();
        }
        assert_eq!(
            ctx.schedule(beep(0.0, 1.0)),
            Err(AudioError::VoiceLimit { max: 4 })
        );
    }

    #[test]
    fn closed_context_rejects_work() {
        let mut ctx = AudioContext::new(options());
        ctx.schedule(beep(0.0, 1.0)).unwrap();
        ctx.close();
        assert_eq!(ctx.voice_count(), 0);
        assert_eq!(ctx.schedule(beep(0.0, 1.0)), Err(AudioError::Closed));
        assert_eq!(ctx.resume(), Err(AudioError::Closed));
        assert!(ctx.create_bus(0.1).is_err());
    }

    #[test]
    fn bus_gain_scales_routed_voices() {
        let mut ctx = AudioContext::new(options());
        ctx.resume().unwrap();
        let bus = ctx.create_bus(0.0).unwrap();
        ctx.schedule(beep(0.0, 1.0).routed_to(Output::Bus(bus))).unwrap();
        assert_eq!(peak(&ctx.render(400)), 0.0);

        ctx.set_bus_gain(bus, 1.0).unwrap();
        assert!(peak(&ctx.render(400)) > 0.1);
        assert_eq!(ctx.bus_gain(bus), Some(1.0));
    }

    #[test]
    fn removing_bus_drops_its_voices() {
        let mut ctx = AudioContext::new(options());
        let bus = ctx.create_bus(0.15).unwrap();
        ctx.schedule(beep(0.0, 1.0).routed_to(Output::Bus(bus))).unwrap();
        ctx.schedule(beep(0.0, 1.0)).unwrap();
        assert!(ctx.remove_bus(bus));
        assert_eq!(ctx.voice_count(), 1);
        assert_eq!(ctx.bus_count(), 0);
        assert_eq!(
            ctx.schedule(beep(0.0, 1.0).routed_to(Output::Bus(bus))),
            Err(AudioError::UnknownBus)
        );
    }

    #[test]
    fn stop_voice_cuts_immediately() {
        let mut ctx = AudioContext::new(options());
        ctx.resume().unwrap();
        let id = ctx.schedule(beep(0.0, 4.5)).unwrap();
        assert!(ctx.stop_voice(id));
        assert!(!ctx.stop_voice(id));
        assert_eq!(peak(&ctx.render(200)), 0.0);
    }
}
