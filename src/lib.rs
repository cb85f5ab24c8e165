pub mod chord;
pub mod config;
pub mod dsp;
pub mod effects;
pub mod error;
pub mod host;
pub mod player;
#[cfg(feature = "relay")]
pub mod relay;
pub mod sequencer;
pub mod theme;
pub mod tone;

use crate::config::{AudioConfig, MIN_SAMPLE_RATE};
use crate::effects::Effect;
use crate::theme::Theme;
use wasm_bindgen::prelude::*;

pub use crate::effects::SoundBoard;
pub use crate::host::AudioHost;
pub use crate::player::MusicPlayer;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the crate version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

fn effect_samples(theme: &str, effect: &str, sample_rate: u32, seed: u32) -> Result<Vec<f64>, String> {
    let theme: Theme = theme.parse()?;
    let effect: Effect = effect.parse()?;
    if (sample_rate as f64) < MIN_SAMPLE_RATE {
        return Err(format!("sample rate must be at least {MIN_SAMPLE_RATE}, got {sample_rate}"));
    }
    dsp::renderer::render_effect(theme, effect, sample_rate, seed as u64).map_err(|e| e.to_string())
}

fn music_samples(config_json: &str, track: usize, seconds: f64) -> Result<Vec<f64>, String> {
    let config = AudioConfig::from_json(config_json).map_err(|e| e.to_string())?;
    Ok(dsp::renderer::render_music(&config, track, seconds))
}

fn to_f32(samples: Vec<f64>) -> Vec<f32> {
    samples.into_iter().map(|s| s as f32).collect()
}

/// WASM-exposed: render one effect to mono f32 samples for AudioWorklet
/// playback.
#[wasm_bindgen]
pub fn render_effect_samples(
    theme: &str,
    effect: &str,
    sample_rate: u32,
    seed: u32,
) -> Result<Vec<f32>, JsValue> {
    effect_samples(theme, effect, sample_rate, seed)
        .map(to_f32)
        .map_err(|e| JsValue::from_str(&e))
}

/// WASM-exposed: render one effect to a WAV byte array.
#[wasm_bindgen]
pub fn render_effect_wav(
    theme: &str,
    effect: &str,
    sample_rate: u32,
    seed: u32,
) -> Result<Vec<u8>, JsValue> {
    let samples = effect_samples(theme, effect, sample_rate, seed).map_err(|e| JsValue::from_str(&e))?;
    Ok(dsp::renderer::encode_wav(&samples, sample_rate))
}

/// WASM-exposed: render `seconds` of a track. `config_json` is an
/// `AudioConfig` document (`"{}"` for defaults).
#[wasm_bindgen]
pub fn render_music_samples(config_json: &str, track: usize, seconds: f64) -> Result<Vec<f32>, JsValue> {
    music_samples(config_json, track, seconds)
        .map(to_f32)
        .map_err(|e| JsValue::from_str(&e))
}

/// WASM-exposed: the track list of a theme as `[{name, mood}]`.
#[wasm_bindgen]
pub fn theme_tracks(theme: &str) -> Result<JsValue, JsValue> {
    let theme: Theme = theme.parse().map_err(|e: String| JsValue::from_str(&e))?;
    serde_wasm_bindgen::to_value(&theme.tracks()).map_err(|e| JsValue::from_str(&format!("{e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_names_are_parsed() {
        let samples = effect_samples("naruto", "hover", 8000, 0).unwrap();
        assert!(!samples.is_empty());
        assert!(effect_samples("naruto", "portal-open", 8000, 0).is_err());
        assert!(effect_samples("vaporwave", "click", 8000, 0).is_err());
        assert!(effect_samples("naruto", "boom", 8000, 0).is_err());
        assert!(effect_samples("naruto", "click", 16, 0).is_err());
    }

    #[test]
    fn music_config_errors_are_reported() {
        assert_eq!(music_samples(r#"{"sampleRate": 4000}"#, 0, 0.5).unwrap().len(), 2000);
        assert!(music_samples(r#"{"sampleRate": 16}"#, 0, 1.0).is_err());
        let err = music_samples(r#"{"sampleRate": -1}"#, 0, 0.5).unwrap_err();
        assert!(err.contains("sampleRate"), "{err}");
    }
}
