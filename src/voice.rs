use std::sync::{Arc, Mutex};
use std::time::Duration;

use whisper_rs::WhisperContext;

use crate::config::CaptureConfig;
use crate::cue::{self, Cue};
use crate::recorder::{self, Endpoint, UtteranceDetector};

const POLL: Duration = Duration::from_millis(80);

/// Readings this early may still carry the tail of the listening cue.
const LEAD_IN: Duration = Duration::from_millis(250);

/// Transitions of one capture after it leaves idle: Recording → Recognizing → Done.
/// A capture with no speech skips Recognizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Recording,
    Recognizing,
    Done,
}

/// Run one capture job on its own thread.
///
/// The returned receiver yields exactly one transcript. Any failure, including a panic
/// in `job`, is reported as an empty string: a closed channel reads as `""` through
/// [`recv_transcript`].
pub fn spawn_capture<F>(job: F) -> async_channel::Receiver<String>
where
    F: FnOnce() -> Result<String, Box<dyn std::error::Error + Send + Sync>> + Send + 'static,
{
    let (tx, rx) = async_channel::bounded::<String>(1);

    let spawned = std::thread::Builder::new()
        .name("voice-capture".into())
        .spawn(move || {
            let text = job().unwrap_or_else(|e| {
                log::warn!("Voice capture failed: {e}");
                String::new()
            });
            let _ = tx.try_send(text);
        });

    if let Err(e) = spawned {
        log::error!("Failed to spawn capture thread: {e}");
    }
    rx
}

/// Await the single transcript of a capture.
pub async fn recv_transcript(rx: async_channel::Receiver<String>) -> String {
    rx.recv().await.unwrap_or_default()
}

/// Everything a capture needs, cloned off the UI thread.
pub struct CaptureJob {
    pub whisper: Arc<WhisperContext>,
    pub capture: CaptureConfig,
    pub language: String,
}

impl CaptureJob {
    /// Record a single utterance from the default microphone and transcribe it.
    /// `on_phase` is called from the capture thread on every transition.
    pub fn run<P>(self, on_phase: P) -> Result<String, Box<dyn std::error::Error + Send + Sync>>
    where
        P: Fn(CapturePhase),
    {
        on_phase(CapturePhase::Recording);
        let samples = record_utterance(&self.capture)?;

        if samples.is_empty() {
            on_phase(CapturePhase::Done);
            return Ok(String::new());
        }

        on_phase(CapturePhase::Recognizing);
        let text = crate::transcriber::transcribe(&self.whisper, &samples, &self.language);
        on_phase(CapturePhase::Done);
        text
    }
}

/// Capture until the endpoint detector fires. Returns no samples when nobody spoke.
fn record_utterance(
    config: &CaptureConfig,
) -> Result<Vec<f32>, Box<dyn std::error::Error + Send + Sync>> {
    // The cue finishes before the microphone opens so it is not heard as speech.
    if let Err(e) = cue::play_blocking(Cue::Listening) {
        log::warn!("Cue {:?} failed: {e}", Cue::Listening);
    }

    let buffer = Arc::new(Mutex::new(Vec::new()));
    let (stream, sample_rate) = recorder::start_capture(buffer.clone())?;
    log::info!("Listening...");

    let window = (sample_rate as f32 * POLL.as_secs_f32()) as usize;
    let mut detector = UtteranceDetector::new(config).ignore_first(LEAD_IN);
    let endpoint = loop {
        std::thread::sleep(POLL);
        let rms = {
            let buf = buffer.lock().map_err(|_| "Audio buffer poisoned")?;
            recorder::tail_rms(&buf, window)
        };
        match detector.update(rms, POLL) {
            Endpoint::Listening => continue,
            done => break done,
        }
    };

    drop(stream);
    cue::play(Cue::Captured);

    if !detector.heard_speech() {
        log::info!("No speech detected");
        return Ok(Vec::new());
    }

    let samples = std::mem::take(&mut *buffer.lock().map_err(|_| "Audio buffer poisoned")?);
    log::info!(
        "Captured {} samples ({:.1}s at {}Hz, {endpoint:?})",
        samples.len(),
        samples.len() as f32 / sample_rate as f32,
        sample_rate
    );
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_transcript() {
        let rx = spawn_capture(|| Ok("turn on the lights".into()));
        assert_eq!(rx.recv_blocking().unwrap(), "turn on the lights");
    }

    #[test]
    fn failure_becomes_empty_string() {
        let rx = spawn_capture(|| Err("no microphone".into()));
        assert_eq!(rx.recv_blocking().unwrap(), "");
    }

    #[test]
    fn exactly_one_value_per_capture() {
        let rx = spawn_capture(|| Ok("once".into()));
        assert_eq!(rx.recv_blocking().unwrap(), "once");
        // The producer is gone after its single send.
        assert!(rx.recv_blocking().is_err());
    }

    #[tokio::test]
    async fn panicking_job_reads_as_empty() {
        let rx = spawn_capture(|| panic!("recognizer crashed"));
        assert_eq!(recv_transcript(rx).await, "");
    }
}
