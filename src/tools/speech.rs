//! Audio capture and transcription: a half-duplex, one-shot variant of the
//! interactive channel. The capture child is long-lived but only ever
//! written to (a single `q` stops it); the recognizer is a plain one-shot
//! capture run.

use std::io::Write;
use std::process::{Child, Command, Stdio};

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ToolsConfig;
use crate::runner;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("failed to start audio capture '{command}': {source}")]
    CaptureSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no recording in progress")]
    NotRecording,

    #[error("speech recognizer '{command}' did not run")]
    RecognizerUnavailable { command: String },
}

/// Owns at most one live capture child. Start spawns ffmpeg writing a 16 kHz
/// mono WAV; stop quits it over stdin, waits for the file to be finalized,
/// then runs the recognizer on it.
pub struct Recorder {
    tools: ToolsConfig,
    capture: Option<Child>,
}

impl Recorder {
    pub fn new(tools: ToolsConfig) -> Self {
        Self {
            tools,
            capture: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.capture.is_some()
    }

    /// Spawns the capture child with its stdin piped; the pipe is the only
    /// control channel back to it. No-op if already recording.
    pub fn start(&mut self) -> Result<(), SpeechError> {
        if self.capture.is_some() {
            return Ok(());
        }

        let mut cmd = Command::new(&self.tools.ffmpeg);
        cmd.args([
            "-y",
            "-f",
            self.tools.capture_format.as_str(),
            "-rtbufsize",
            "512k",
            "-probesize",
            "32k",
            "-analyzeduration",
            "0",
            "-i",
            self.tools.microphone.as_str(),
            "-ac",
            "1",
            "-ar",
            "16000",
            "-v",
            "quiet",
        ])
        .arg(&self.tools.audio_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

        let child = cmd.spawn().map_err(|source| SpeechError::CaptureSpawn {
            command: self.tools.ffmpeg.clone(),
            source,
        })?;
        debug!(pid = child.id(), "audio capture started");
        self.capture = Some(child);
        Ok(())
    }

    /// Stops the capture child and transcribes the recorded audio, returning
    /// the cleaned transcript.
    pub fn stop_and_transcribe(&mut self) -> Result<String, SpeechError> {
        let mut child = self.capture.take().ok_or(SpeechError::NotRecording)?;

        // 'q' asks ffmpeg to finalize the file and exit; dropping the pipe
        // afterwards covers versions that only react to EOF.
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(b"q");
        }
        if let Err(err) = child.wait() {
            warn!(error = %err, "capture exit wait failed");
        }

        let model = self.tools.whisper_model.display().to_string();
        let audio = self.tools.audio_path.display().to_string();
        let outcome = runner::capture(
            self.tools.whisper.as_str(),
            &[
                model.as_str(),
                audio.as_str(),
                self.tools.whisper_device.as_str(),
            ],
        );
        if !outcome.exit_observed {
            return Err(SpeechError::RecognizerUnavailable {
                command: self.tools.whisper.clone(),
            });
        }
        Ok(clean_transcript(&outcome.text))
    }
}

/// Collapses recognizer output into one natural paragraph: timestamp lines
/// and exact consecutive duplicates dropped, fragments joined with single
/// spaces.
fn clean_transcript(raw: &str) -> String {
    let mut paragraph = String::new();
    let mut last_line = String::new();
    for line in raw.lines() {
        let line = line.trim_end_matches('\r').trim_start();
        if line.starts_with("timestamps:") {
            continue;
        }
        if line.is_empty() || line == last_line {
            continue;
        }
        if !paragraph.is_empty() {
            paragraph.push(' ');
        }
        paragraph.push_str(line);
        last_line = line.to_string();
    }
    paragraph
}
