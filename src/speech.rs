use std::process::{Command, Stdio};

/// Resolve the speech command for this platform.
/// Uses `say` on macOS, `spd-say --wait` on Linux, unless the config overrides it.
/// The built-in commands end with `--` so replies starting with `-` are not read
/// as options.
pub fn speech_command(config_override: Option<&[String]>) -> Vec<String> {
    if let Some(cmd) = config_override.filter(|c| !c.is_empty()) {
        return cmd.to_vec();
    }

    #[cfg(target_os = "macos")]
    let cmd = vec!["say".to_string(), "--".to_string()];

    #[cfg(not(target_os = "macos"))]
    let cmd = vec!["spd-say".to_string(), "--wait".to_string(), "--".to_string()];

    cmd
}

/// Speaks text with an external synthesizer, blocking until playback ends.
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
}

impl CommandSpeaker {
    pub fn new(command: Vec<String>) -> Self {
        let mut parts = command.into_iter();
        let program = parts.next().unwrap_or_default();
        Self {
            program,
            args: parts.collect(),
        }
    }

    pub fn speak(&self, text: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.program.is_empty() {
            return Err("No speech command configured".into());
        }

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| format!("Failed to spawn {}: {e}", self.program))?;

        if !status.success() {
            return Err(format!("{} exited with status {status}", self.program).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins() {
        let custom = vec!["espeak-ng".to_string(), "-s".to_string(), "160".to_string()];
        assert_eq!(speech_command(Some(&custom)), custom);
    }

    #[test]
    fn empty_override_uses_platform_default() {
        assert!(!speech_command(Some(&[])).is_empty());
        assert_eq!(speech_command(Some(&[])), speech_command(None));
    }

    #[test]
    fn missing_program_is_an_error() {
        let speaker = CommandSpeaker::new(vec![]);
        assert!(speaker.speak("hello").is_err());

        let speaker = CommandSpeaker::new(vec!["definitely-not-a-real-tts-binary".into()]);
        let err = speaker.speak("hello").unwrap_err();
        assert!(err.to_string().contains("Failed to spawn"));
    }

    #[cfg(unix)]
    #[test]
    fn runs_command_with_text_argument() {
        // `true` ignores its arguments and exits 0; `false` exits 1.
        assert!(CommandSpeaker::new(vec!["true".into()]).speak("hi").is_ok());
        assert!(CommandSpeaker::new(vec!["false".into()]).speak("hi").is_err());
    }

    #[test]
    fn platform_default_ends_options() {
        assert_eq!(speech_command(None).last().map(String::as_str), Some("--"));
    }

    #[cfg(unix)]
    #[test]
    fn leading_dash_reply_is_one_operand() {
        // `basename` rejects unknown options, so this only passes if the bullet list
        // arrives after `--` as a single argument.
        let speaker = CommandSpeaker::new(vec!["basename".into(), "--".into()]);
        assert!(speaker.speak("- First item\n- Second").is_ok());
        assert!(speaker.speak("--").is_ok());
    }
}
