use std::path::{Path, PathBuf};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Directory for model storage: ~/.local/share/voice-chat/models/
fn models_dir() -> PathBuf {
    let mut p = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    p.push("voice-chat");
    p.push("models");
    p
}

pub fn model_path(filename: &str) -> PathBuf {
    models_dir().join(filename)
}

fn model_url(filename: &str) -> String {
    format!("{MODEL_BASE_URL}/{filename}")
}

/// Download a whisper model, reporting `on_progress(bytes_downloaded, total_bytes)`.
/// Total may be 0 if the server does not send a length. The file is written under a
/// temporary name and renamed once complete, so an interrupted download is retried.
pub async fn download_model<F>(
    filename: &str,
    on_progress: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Fn(u64, u64) + Send + 'static,
{
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    tokio::fs::create_dir_all(models_dir()).await?;

    let response = reqwest::get(model_url(filename)).await?.error_for_status()?;
    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let path = model_path(filename);
    let partial = path.with_extension("part");
    let mut file = tokio::fs::File::create(&partial).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        on_progress(downloaded, total);
    }

    file.flush().await?;
    tokio::fs::rename(&partial, &path).await?;
    log::info!("Model downloaded to {}", path.display());
    Ok(())
}

/// Load a whisper model from disk. CPU-heavy; call from a blocking context.
pub fn load_model(path: &Path) -> Result<WhisperContext, Box<dyn std::error::Error + Send + Sync>> {
    let ctx = WhisperContext::new_with_params(
        path.to_str().ok_or("Invalid model path")?,
        WhisperContextParameters::default(),
    )
    .map_err(|e| format!("Failed to load whisper model: {e}"))?;
    log::info!("Whisper model loaded from {}", path.display());
    Ok(ctx)
}

/// Transcribe 16kHz mono f32 samples. CPU-heavy; run off the UI thread.
pub fn transcribe(
    ctx: &WhisperContext,
    samples: &[f32],
    language: &str,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let mut state = ctx
        .create_state()
        .map_err(|e| format!("State error: {e}"))?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_language(Some(language));
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);
    params.set_suppress_blank(true);

    let cpus = std::thread::available_parallelism()
        .map(|n| n.get() as i32)
        .unwrap_or(4);
    params.set_n_threads(cpus);

    state
        .full(params, samples)
        .map_err(|e| format!("Transcription failed: {e}"))?;

    let text = state
        .as_iter()
        .map(|segment| segment.to_string())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(clean_transcript(&text))
}

/// Collapse whitespace and drop whisper's non-speech markers like `[BLANK_AUDIO]`.
pub fn clean_transcript(raw: &str) -> String {
    raw.split_whitespace()
        .filter(|word| !is_marker(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_marker(word: &str) -> bool {
    (word.starts_with('[') && word.ends_with(']')) || (word.starts_with('(') && word.ends_with(')'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_markers_and_spacing() {
        assert_eq!(clean_transcript("  Hello   there. "), "Hello there.");
        assert_eq!(clean_transcript("[BLANK_AUDIO]"), "");
        assert_eq!(clean_transcript(" (wind) what time is it?"), "what time is it?");
    }

    #[test]
    fn model_paths() {
        let path = model_path("ggml-base.en.bin");
        assert!(path.ends_with("voice-chat/models/ggml-base.en.bin"));
        assert_eq!(
            model_url("ggml-tiny.bin"),
            "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-tiny.bin"
        );
    }

    #[test]
    fn loading_missing_model_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_model(&dir.path().join("missing.bin")).is_err());
    }
}
