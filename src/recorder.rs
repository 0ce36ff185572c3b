use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::CaptureConfig;

/// Sample rate whisper expects.
pub const TARGET_RATE: u32 = 16000;

/// Start capturing audio from the default input device.
/// Samples are appended to the shared buffer at ~16kHz mono f32.
/// Drop the returned `Stream` to stop recording.
pub fn start_capture(
    buffer: Arc<Mutex<Vec<f32>>>,
) -> Result<(cpal::Stream, u32), Box<dyn std::error::Error + Send + Sync>> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or("No input device found")?;

    log::info!("Input device: {:?}", device.description());

    let supported_configs: Vec<_> = device.supported_input_configs()?.collect();
    let desired = supported_configs.iter().find(|c| {
        c.channels() == 1
            && c.min_sample_rate() <= TARGET_RATE
            && c.max_sample_rate() >= TARGET_RATE
            && c.sample_format() == cpal::SampleFormat::F32
    });

    let (config, native_rate, downsample_factor) = match desired {
        Some(cfg) => (cfg.with_sample_rate(TARGET_RATE).config(), TARGET_RATE, 1usize),
        None => {
            let default_config = device.default_input_config()?;
            let rate = default_config.sample_rate();
            let factor = (rate / TARGET_RATE).max(1) as usize;
            let actual_rate = rate / factor as u32;
            log::info!("Using native rate {rate}Hz, downsampling by {factor}x to ~{actual_rate}Hz");
            (default_config.config(), actual_rate, factor)
        }
    };

    let channels = config.channels as usize;

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let Ok(mut buf) = buffer.lock() else {
                return;
            };
            buf.extend(
                data.chunks(channels)
                    .step_by(downsample_factor)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        },
        |err| log::error!("Input stream error: {err}"),
        None,
    )?;

    stream.play()?;
    Ok((stream, native_rate))
}

/// RMS of the trailing `window` samples.
pub fn tail_rms(samples: &[f32], window: usize) -> f32 {
    let n = samples.len().min(window);
    if n == 0 {
        return 0.0;
    }
    let sum_sq: f32 = samples[samples.len() - n..].iter().map(|&s| s * s).sum();
    (sum_sq / n as f32).sqrt()
}

/// What the endpoint detector decided after a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Listening,
    /// Speech was heard and then enough trailing silence.
    Complete,
    /// Hit the utterance length cap while speech was still going.
    MaxDuration,
    /// Nobody spoke before the start timeout.
    NoSpeech,
}

/// Level-based utterance endpointing, fed one RMS reading per poll.
pub struct UtteranceDetector {
    threshold: f32,
    silence: Duration,
    max_duration: Duration,
    start_timeout: Duration,
    lead_in: Duration,
    elapsed: Duration,
    heard_speech: bool,
    quiet_for: Duration,
}

impl UtteranceDetector {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            threshold: config.silence_threshold,
            silence: Duration::from_millis(config.silence_ms),
            max_duration: Duration::from_secs(config.max_utterance_secs),
            start_timeout: Duration::from_secs(config.start_timeout_secs),
            lead_in: Duration::ZERO,
            elapsed: Duration::ZERO,
            heard_speech: false,
            quiet_for: Duration::ZERO,
        }
    }

    /// Treat every reading within the first `lead_in` of the capture as silence.
    pub fn ignore_first(mut self, lead_in: Duration) -> Self {
        self.lead_in = lead_in;
        self
    }

    pub fn heard_speech(&self) -> bool {
        self.heard_speech
    }

    /// Feed the level of the last `step` of audio.
    pub fn update(&mut self, rms: f32, step: Duration) -> Endpoint {
        self.elapsed += step;

        if rms >= self.threshold && self.elapsed > self.lead_in {
            self.heard_speech = true;
            self.quiet_for = Duration::ZERO;
        } else {
            self.quiet_for += step;
        }

        if !self.heard_speech {
            if self.elapsed >= self.start_timeout {
                return Endpoint::NoSpeech;
            }
        } else if self.quiet_for >= self.silence {
            return Endpoint::Complete;
        }

        if self.elapsed >= self.max_duration {
            return Endpoint::MaxDuration;
        }
        Endpoint::Listening
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(100);

    fn detector() -> UtteranceDetector {
        UtteranceDetector::new(&CaptureConfig {
            silence_threshold: 0.05,
            silence_ms: 300,
            max_utterance_secs: 2,
            start_timeout_secs: 1,
        })
    }

    #[test]
    fn speech_then_silence_completes() {
        let mut d = detector();
        assert_eq!(d.update(0.0, STEP), Endpoint::Listening);
        for _ in 0..5 {
            assert_eq!(d.update(0.2, STEP), Endpoint::Listening);
        }
        assert_eq!(d.update(0.01, STEP), Endpoint::Listening);
        assert_eq!(d.update(0.01, STEP), Endpoint::Listening);
        assert_eq!(d.update(0.01, STEP), Endpoint::Complete);
        assert!(d.heard_speech());
    }

    #[test]
    fn short_pause_does_not_end_utterance() {
        let mut d = detector();
        d.update(0.2, STEP);
        d.update(0.0, STEP);
        d.update(0.0, STEP);
        assert_eq!(d.update(0.3, STEP), Endpoint::Listening);
        d.update(0.0, STEP);
        assert_eq!(d.update(0.0, STEP), Endpoint::Listening);
    }

    #[test]
    fn silence_only_times_out() {
        let mut d = detector();
        for _ in 0..9 {
            assert_eq!(d.update(0.0, STEP), Endpoint::Listening);
        }
        assert_eq!(d.update(0.0, STEP), Endpoint::NoSpeech);
        assert!(!d.heard_speech());
    }

    #[test]
    fn continuous_speech_is_capped() {
        let mut d = detector();
        for _ in 0..19 {
            assert_eq!(d.update(0.5, STEP), Endpoint::Listening);
        }
        assert_eq!(d.update(0.5, STEP), Endpoint::MaxDuration);
    }

    #[test]
    fn loud_reading_during_lead_in_is_not_speech() {
        let mut d = detector().ignore_first(Duration::from_millis(200));
        assert_eq!(d.update(0.5, STEP), Endpoint::Listening);
        assert!(!d.heard_speech());
        for _ in 0..8 {
            assert_eq!(d.update(0.0, STEP), Endpoint::Listening);
        }
        assert_eq!(d.update(0.0, STEP), Endpoint::NoSpeech);
    }

    #[test]
    fn cue_echo_does_not_cut_off_a_late_speaker() {
        let mut d = UtteranceDetector::new(&CaptureConfig::default())
            .ignore_first(Duration::from_millis(250));
        let step = Duration::from_millis(80);
        assert_eq!(d.update(0.03, step), Endpoint::Listening);
        for _ in 0..15 {
            assert_eq!(d.update(0.0, step), Endpoint::Listening);
        }
        // Speaking 1.5s in still counts.
        assert_eq!(d.update(0.2, step), Endpoint::Listening);
        assert!(d.heard_speech());
    }

    #[test]
    fn speech_after_lead_in_counts() {
        let mut d = detector().ignore_first(Duration::from_millis(200));
        d.update(0.0, STEP);
        d.update(0.0, STEP);
        assert_eq!(d.update(0.5, STEP), Endpoint::Listening);
        assert!(d.heard_speech());
    }

    #[test]
    fn rms_of_tail() {
        assert_eq!(tail_rms(&[], 10), 0.0);
        let samples = [0.0, 0.0, 0.5, -0.5];
        assert!((tail_rms(&samples, 2) - 0.5).abs() < 1e-6);
        assert!((tail_rms(&samples, 100) - (0.125f32).sqrt()).abs() < 1e-6);
    }
}
