//! Audio host: the lazily created, explicitly owned audio context slot.
//!
//! One host belongs to one mounted instance of the site. The sound board and
//! the music player each hold a clone and share the single context inside.
//! Everything runs on one thread, so the slot is an `Rc<RefCell<_>>`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dsp::context::{AudioContext, AutoplayPolicy, ContextOptions, ContextState};
use crate::error::AudioError;

struct Slot {
    options: ContextOptions,
    context: Option<AudioContext>,
    unlocked: bool,
}

impl Slot {
    /// Create (or recreate after close) and resume the context.
    fn running(&mut self) -> Result<&mut AudioContext, AudioError> {
        if self.options.autoplay == AutoplayPolicy::RequiresGesture && !self.unlocked {
            return Err(AudioError::Blocked);
        }

        let needs_new = self
            .context
            .as_ref()
            .is_none_or(|ctx| ctx.state() == ContextState::Closed);
        if needs_new {
            tracing::debug!(sample_rate = self.options.sample_rate, "creating audio context");
            self.context = Some(AudioContext::new(self.options));
        }

        let ctx = self.context.get_or_insert_with(|| AudioContext::new(self.options));
        if ctx.state() == ContextState::Suspended {
            ctx.resume()?;
        }
        Ok(ctx)
    }
}

#[derive(Clone)]
pub struct AudioHost {
    slot: Rc<RefCell<Slot>>,
}

impl AudioHost {
    pub fn new(options: ContextOptions) -> Self {
        AudioHost {
            slot: Rc::new(RefCell::new(Slot {
                options,
                context: None,
                unlocked: false,
            })),
        }
    }

    pub fn options(&self) -> ContextOptions {
        self.slot.borrow().options
    }

    /// Record a user gesture; lifts a `RequiresGesture` autoplay block.
    pub fn unlock(&self) {
        self.slot.borrow_mut().unlocked = true;
    }

    /// Run `f` against a running context, creating it on first use.
    pub fn with_context<R>(
        &self,
        f: impl FnOnce(&mut AudioContext) -> Result<R, AudioError>,
    ) -> Result<R, AudioError> {
        let mut slot = self.slot.borrow_mut();
        let ctx = slot.running()?;
        f(ctx)
    }

    /// Run `f` against the context only if one already exists and is open.
    pub fn with_existing<R>(&self, f: impl FnOnce(&mut AudioContext) -> R) -> Option<R> {
        let mut slot = self.slot.borrow_mut();
        match slot.context.as_mut() {
            Some(ctx) if ctx.state() != ContextState::Closed => Some(f(ctx)),
            _ => None,
        }
    }

    pub fn state(&self) -> Option<ContextState> {
        self.slot.borrow().context.as_ref().map(|ctx| ctx.state())
    }

    /// Context time, or 0 when no context exists yet.
    pub fn current_time(&self) -> f64 {
        self.with_existing(|ctx| ctx.current_time()).unwrap_or(0.0)
    }

    /// Pull `frames` samples out of the context (silence when there is none).
    pub fn render(&self, frames: usize) -> Vec<f64> {
        self.with_existing(|ctx| ctx.render(frames))
            .unwrap_or_else(|| vec![0.0; frames])
    }

    /// Render and discard `seconds` of audio, moving the clock forward.
    pub fn advance(&self, seconds: f64) {
        let frames = (seconds * self.options().sample_rate).round().max(0.0) as usize;
        self.render(frames);
    }

    /// Close the context and release its voices. A later `with_context`
    /// starts a fresh one.
    pub fn close(&self) {
        if let Some(ctx) = self.slot.borrow_mut().context.as_mut() {
            if ctx.state() != ContextState::Closed {
                tracing::debug!("closing audio context");
                ctx.close();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(autoplay: AutoplayPolicy) -> AudioHost {
        AudioHost::new(ContextOptions {
            sample_rate: 8000.0,
            max_voices: 16,
            autoplay,
        })
    }

    #[test]
    fn context_is_created_lazily() {
        let host = host(AutoplayPolicy::Allowed);
        assert_eq!(host.state(), None);
        assert_eq!(host.render(10), vec![0.0; 10]);

        host.with_context(|_| Ok(())).unwrap();
        assert_eq!(host.state(), Some(ContextState::Running));
    }

    #[test]
    fn gesture_required_before_running() {
        let host = host(AutoplayPolicy::RequiresGesture);
        assert_eq!(host.with_context(|_| Ok(())), Err(AudioError::Blocked));
        assert_eq!(host.state(), None);

        host.unlock();
        assert!(host.with_context(|_| Ok(())).is_ok());
    }

    #[test]
    fn closed_context_is_replaced() {
        let host = host(AutoplayPolicy::Allowed);
        host.with_context(|_| Ok(())).unwrap();
        host.advance(0.5);
        assert!((host.current_time() - 0.5).abs() < 1e-9);

        host.close();
        assert_eq!(host.state(), Some(ContextState::Closed));
        assert_eq!(host.current_time(), 0.0);

        host.with_context(|_| Ok(())).unwrap();
        assert_eq!(host.state(), Some(ContextState::Running));
        assert_eq!(host.current_time(), 0.0);
    }

    #[test]
    fn clones_share_one_context() {
        let a = host(AutoplayPolicy::Allowed);
        let b = a.clone();
        a.with_context(|_| Ok(())).unwrap();
        b.advance(0.25);
        assert!((a.current_time() - 0.25).abs() < 1e-9);
    }
}
