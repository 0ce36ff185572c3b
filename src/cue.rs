use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::f32::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const CUE_SECS: f32 = 0.15;

/// Audible markers around voice capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Microphone opened: rising 600→900 Hz
    Listening,
    /// Utterance captured: falling 900→600 Hz
    Captured,
}

impl Cue {
    fn sweep(self) -> (f32, f32) {
        match self {
            Cue::Listening => (600.0, 900.0),
            Cue::Captured => (900.0, 600.0),
        }
    }
}

/// Play a cue on a throwaway thread and return immediately.
pub fn play(cue: Cue) {
    std::thread::spawn(move || {
        if let Err(e) = play_blocking(cue) {
            log::warn!("Cue {cue:?} failed: {e}");
        }
    });
}

/// Frequency sweep with a linear fade-out, one sample per frame.
fn tone(cue: Cue, sample_rate: f32) -> Vec<f32> {
    let (freq_start, freq_end) = cue.sweep();
    let total = (sample_rate * CUE_SECS) as usize;
    (0..total)
        .map(|i| {
            let t = i as f32 / sample_rate;
            let progress = i as f32 / total as f32;
            let freq = freq_start + (freq_end - freq_start) * progress;
            (2.0 * PI * freq * t).sin() * (1.0 - progress) * 0.3
        })
        .collect()
}

/// Play a cue and return once it has finished.
pub fn play_blocking(cue: Cue) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or("No output device found")?;
    let config = device.default_output_config()?;
    let channels = config.channels() as usize;
    let samples = Arc::new(tone(cue, config.sample_rate() as f32));

    let cursor = Arc::new(AtomicUsize::new(0));
    let stream = {
        let samples = samples.clone();
        let cursor = cursor.clone();
        device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut idx = cursor.load(Ordering::Relaxed);
                for frame in data.chunks_mut(channels) {
                    frame.fill(samples.get(idx).copied().unwrap_or(0.0));
                    idx += 1;
                }
                cursor.store(idx, Ordering::Relaxed);
            },
            |err| log::error!("Audio output error: {err}"),
            None,
        )?
    };

    stream.play()?;
    std::thread::sleep(Duration::from_secs_f32(CUE_SECS) + Duration::from_millis(50));
    drop(stream);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_length_and_fade() {
        let samples = tone(Cue::Listening, 16000.0);
        assert_eq!(samples.len(), 2400);
        assert!(samples.iter().all(|s| s.abs() <= 0.3));
        let tail = samples[samples.len() - 10..].iter().map(|s| s.abs()).fold(0.0, f32::max);
        assert!(tail < 0.01);
    }

    #[test]
    fn sweeps_are_mirrored() {
        let (a, b) = Cue::Listening.sweep();
        assert_eq!(Cue::Captured.sweep(), (b, a));
    }
}
