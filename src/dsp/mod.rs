//! DSP engine: pure Rust synthesis behind a Web Audio style context.
//!
//! The same code serves live playback (the host pulls samples from the
//! context) and the offline renderer (WAV export).

pub mod context;
pub mod envelope;
pub mod filter;
pub mod mixer;
pub mod oscillator;
pub mod renderer;
pub mod voice;
