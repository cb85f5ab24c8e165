//! Offline renderer: drives a private host to turn effects and music into
//! sample buffers or WAV bytes.

use crate::config::AudioConfig;
use crate::dsp::context::{AutoplayPolicy, ContextOptions};
use crate::effects::{Effect, SoundBoard};
use crate::error::AudioError;
use crate::host::AudioHost;
use crate::player::MusicPlayer;
use crate::theme::Theme;

/// Frames rendered per pull.
const BLOCK: usize = 128;

/// Render one effect until its last voice finishes.
pub fn render_effect(
    theme: Theme,
    effect: Effect,
    sample_rate: u32,
    seed: u64,
) -> Result<Vec<f64>, AudioError> {
    let host = AudioHost::new(ContextOptions {
        sample_rate: sample_rate as f64,
        autoplay: AutoplayPolicy::Allowed,
        ..ContextOptions::default()
    });
    let mut board = SoundBoard::with_seed(host.clone(), theme, seed);
    board.try_trigger(effect)?;

    // Effects never outlast a second; the cap only guards the loop.
    let max_frames = sample_rate as usize;
    let mut out = Vec::new();
    while out.len() < max_frames && host.with_existing(|ctx| ctx.voice_count() > 0).unwrap_or(false)
    {
        out.extend(host.render(BLOCK));
    }
    host.close();
    Ok(out)
}

/// Render `seconds` of track `track`, ticking the look-ahead once per
/// configured tick interval. An unknown track renders silence.
pub fn render_music(config: &AudioConfig, track: usize, seconds: f64) -> Vec<f64> {
    let options = ContextOptions {
        autoplay: AutoplayPolicy::Allowed,
        ..config.context_options()
    };
    let host = AudioHost::new(options);
    let mut player = MusicPlayer::from_config(host.clone(), config);
    player.play(track);

    let total = (seconds.max(0.0) * options.sample_rate).round() as usize;
    let per_tick = ((config.player.tick_interval * options.sample_rate).round() as usize).max(1);
    let mut out = Vec::with_capacity(total);
    while out.len() < total {
        player.tick();
        let frames = per_tick.min(total - out.len());
        out.extend(host.render(frames));
    }
    out
}

/// Convert samples in [-1, 1] to 16-bit PCM.
pub fn to_pcm_i16(samples: &[f64]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f64) as i16)
        .collect()
}

/// Encode mono samples as a 16-bit stereo WAV file.
pub fn encode_wav(samples: &[f64], sample_rate: u32) -> Vec<u8> {
    let stereo: Vec<i16> = to_pcm_i16(samples)
        .into_iter()
        .flat_map(|s| [s, s])
        .collect();
    encode_pcm(&stereo, sample_rate, 2)
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_pcm(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(samples: &[f64]) -> f64 {
        samples.iter().fold(0.0_f64, |m, &s| m.max(s.abs()))
    }

    #[test]
    fn wav_header_valid() {
        let wav = encode_wav(&[0.0, 0.5, -0.5], 44100);

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");

        let sr = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
        assert_eq!(sr, 44100);
        let ch = u16::from_le_bytes([wav[22], wav[23]]);
        assert_eq!(ch, 2);
    }

    #[test]
    fn wav_size_correct() {
        let wav = encode_wav(&vec![0.0; 22050], 44100);

        // 22050 frames * 2 channels * 2 bytes
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, 88200);
        assert_eq!(wav.len(), 44 + 88200);
    }

    #[test]
    fn pcm_conversion_clamps() {
        assert_eq!(to_pcm_i16(&[2.0, -2.0, 0.0]), vec![i16::MAX, -i16::MAX, 0]);
    }

    #[test]
    fn effect_renders_its_full_length() {
        let samples = render_effect(Theme::Naruto, Effect::Click, 8000, 1).unwrap();
        // 0.1 s, rounded up to whole blocks.
        assert!(samples.len() >= 800 && samples.len() < 800 + BLOCK);
        assert!(peak(&samples) > 0.01);
    }

    #[test]
    fn effects_stay_under_a_second() {
        for effect in Theme::StrangerThings.effects() {
            let samples = render_effect(Theme::StrangerThings, *effect, 4000, 3).unwrap();
            assert!(samples.len() <= 4000, "{effect}: {} frames", samples.len());
            assert!(peak(&samples) > 0.0, "{effect} is silent");
        }
    }

    #[test]
    fn unsupported_effect_is_an_error() {
        assert!(render_effect(Theme::Naruto, Effect::StaticBurst, 8000, 0).is_err());
    }

    #[test]
    fn music_renders_requested_length() {
        let config = AudioConfig {
            sample_rate: 4000.0,
            ..AudioConfig::default()
        };
        let samples = render_music(&config, 0, 2.0);
        assert_eq!(samples.len(), 8000);
        // The seed chord fades in over half a second.
        assert!(peak(&samples[..40]) < peak(&samples[2000..]));
        assert!(peak(&samples) > 0.0);

        assert!(render_music(&config, 9, 0.5).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn rendering_is_deterministic() {
        let a = render_effect(Theme::Naruto, Effect::Chidori, 8000, 42).unwrap();
        let b = render_effect(Theme::Naruto, Effect::Chidori, 8000, 42).unwrap();
        assert_eq!(a, b);
    }
}
