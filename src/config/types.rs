use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{EngineCommand, SessionOptions};

/// Root configuration container.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Invocation and channel settings for the interactive engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine executable name or path.
    #[serde(default = "default_engine_executable")]
    pub executable: String,
    /// Model resource passed via `-m`.
    #[serde(default = "default_engine_model")]
    pub model: PathBuf,
    /// Extra arguments appended after the fixed flags.
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Literal prefixes of banner/diagnostic lines dropped from output.
    #[serde(default = "default_noise_prefixes")]
    pub noise_prefixes: Vec<String>,
    /// Bound on the readiness wait during submit (default: 3000).
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    /// Max bytes per stdin write (default: 64 KiB).
    #[serde(default = "default_max_write_chunk")]
    pub max_write_chunk: usize,
}

impl EngineConfig {
    /// Full engine command line: fixed flags selecting unbuffered token
    /// output and the multi-line input mode, then the model, then any
    /// user-supplied extras.
    pub fn command(&self) -> EngineCommand {
        let mut args = vec![
            "--simple-io".to_string(),
            "--multiline-input".to_string(),
            "-m".to_string(),
            self.model.display().to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        EngineCommand {
            program: self.executable.clone(),
            args,
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            noise_prefixes: self.noise_prefixes.clone(),
            ready_timeout: Duration::from_millis(self.ready_timeout_ms),
            max_write_chunk: self.max_write_chunk,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executable: default_engine_executable(),
            model: default_engine_model(),
            extra_args: Vec::new(),
            noise_prefixes: default_noise_prefixes(),
            ready_timeout_ms: default_ready_timeout_ms(),
            max_write_chunk: default_max_write_chunk(),
        }
    }
}

/// External one-shot tools and their fixed resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// PDF to text converter.
    #[serde(default = "default_pdftotext")]
    pub pdftotext: String,
    /// DOCX to text converter.
    #[serde(default = "default_pandoc")]
    pub pandoc: String,
    /// Image OCR command.
    #[serde(default = "default_ocr")]
    pub ocr: String,
    /// Audio capture command.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    /// Speech recognition command.
    #[serde(default = "default_whisper")]
    pub whisper: String,
    /// Model directory handed to the speech recognizer.
    #[serde(default = "default_whisper_model")]
    pub whisper_model: PathBuf,
    /// Device selector for the speech recognizer (default: AUTO).
    #[serde(default = "default_whisper_device")]
    pub whisper_device: String,
    /// Retrieval index builder.
    #[serde(default = "default_index_docs")]
    pub index_docs: String,
    /// Retrieval query tool.
    #[serde(default = "default_rag_query")]
    pub rag_query: String,
    /// Knowledge base directory for the retrieval tools.
    #[serde(default = "default_kb_dir")]
    pub kb_dir: PathBuf,
    /// Scratch WAV path for recordings.
    #[serde(default = "default_audio_path")]
    pub audio_path: PathBuf,
    /// Capture device name handed to ffmpeg.
    #[serde(default = "default_microphone")]
    pub microphone: String,
    /// ffmpeg input format for the capture device (e.g. pulse, alsa, dshow).
    #[serde(default = "default_capture_format")]
    pub capture_format: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            pdftotext: default_pdftotext(),
            pandoc: default_pandoc(),
            ocr: default_ocr(),
            ffmpeg: default_ffmpeg(),
            whisper: default_whisper(),
            whisper_model: default_whisper_model(),
            whisper_device: default_whisper_device(),
            index_docs: default_index_docs(),
            rag_query: default_rag_query(),
            kb_dir: default_kb_dir(),
            audio_path: default_audio_path(),
            microphone: default_microphone(),
            capture_format: default_capture_format(),
        }
    }
}

fn default_engine_executable() -> String {
    "llama-cli".to_string()
}

fn default_engine_model() -> PathBuf {
    PathBuf::from("granite-3.3-2b-instruct-Q4_K_S.gguf")
}

/// Banner prefixes the llama.cpp CLI prints on startup and around each turn.
pub fn default_noise_prefixes() -> Vec<String> {
    [
        "build:",
        "main:",
        "llama_",
        "print_",
        "load_tensors:",
        "common_init_from_params:",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_ready_timeout_ms() -> u64 {
    3000
}

fn default_max_write_chunk() -> usize {
    64 * 1024
}

fn default_pdftotext() -> String {
    "pdftotext".to_string()
}

fn default_pandoc() -> String {
    "pandoc".to_string()
}

fn default_ocr() -> String {
    "pocr_cli".to_string()
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_whisper() -> String {
    "whisper_speech_recognition".to_string()
}

fn default_whisper_model() -> PathBuf {
    PathBuf::from("distil-whisper-large-v3-int8-ov")
}

fn default_whisper_device() -> String {
    "AUTO".to_string()
}

fn default_index_docs() -> String {
    "index_docs".to_string()
}

fn default_rag_query() -> String {
    "rag_query".to_string()
}

fn default_kb_dir() -> PathBuf {
    PathBuf::from("kb")
}

fn default_audio_path() -> PathBuf {
    PathBuf::from("audio.wav")
}

fn default_microphone() -> String {
    "default".to_string()
}

fn default_capture_format() -> String {
    "pulse".to_string()
}
