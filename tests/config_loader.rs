use std::fs;
use std::time::Duration;

use llamadesk::config::{Config, ConfigError};

/// Config::default() carries the engine and tool settings the assistant
/// ships with.
#[test]
fn test_config_default_values() {
    let config = Config::default();

    assert_eq!(config.engine.executable, "llama-cli");
    assert!(config
        .engine
        .model
        .to_string_lossy()
        .ends_with("granite-3.3-2b-instruct-Q4_K_S.gguf"));
    assert!(config.engine.extra_args.is_empty());
    assert_eq!(config.engine.ready_timeout_ms, 3000);
    assert_eq!(config.engine.max_write_chunk, 64 * 1024);
    assert!(config
        .engine
        .noise_prefixes
        .iter()
        .any(|p| p == "llama_"));

    assert_eq!(config.tools.pdftotext, "pdftotext");
    assert_eq!(config.tools.pandoc, "pandoc");
    assert_eq!(config.tools.whisper_device, "AUTO");
    assert_eq!(config.tools.kb_dir.to_string_lossy(), "kb");
}

#[test]
fn test_config_path_ends_with_expected() {
    let path = Config::config_path();
    assert!(path.ends_with("llamadesk/config.toml"));
}

/// The engine command is a structured argument vector: fixed streaming flags
/// first, then the model, then user extras.
#[test]
fn test_engine_command_composition() {
    let mut config = Config::default();
    config.engine.executable = "/opt/llama/llama-cli".to_string();
    config.engine.model = "/models/test.gguf".into();
    config.engine.extra_args = vec!["-ngl".to_string(), "99".to_string()];

    let command = config.engine.command();
    assert_eq!(command.program, "/opt/llama/llama-cli");
    assert_eq!(
        command.args,
        vec![
            "--simple-io".to_string(),
            "--multiline-input".to_string(),
            "-m".to_string(),
            "/models/test.gguf".to_string(),
            "-ngl".to_string(),
            "99".to_string(),
        ]
    );
}

#[test]
fn test_session_options_mapping() {
    let mut config = Config::default();
    config.engine.ready_timeout_ms = 1234;
    config.engine.max_write_chunk = 4096;

    let options = config.engine.session_options();
    assert_eq!(options.ready_timeout, Duration::from_millis(1234));
    assert_eq!(options.max_write_chunk, 4096);
    assert_eq!(options.noise_prefixes, config.engine.noise_prefixes);
}

#[test]
fn test_load_from_partial_file_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[engine]
executable = "/usr/local/bin/llama-cli"
model = "tiny.gguf"

[tools]
pandoc = "/opt/pandoc/bin/pandoc"
"#,
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.engine.executable, "/usr/local/bin/llama-cli");
    assert_eq!(config.engine.model.to_string_lossy(), "tiny.gguf");
    // Unspecified fields keep their defaults.
    assert_eq!(config.engine.ready_timeout_ms, 3000);
    assert_eq!(config.tools.pandoc, "/opt/pandoc/bin/pandoc");
    assert_eq!(config.tools.pdftotext, "pdftotext");
}

#[test]
fn test_load_from_rejects_bad_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "engine = not toml").unwrap();

    match Config::load_from(&path) {
        Err(ConfigError::Parse { .. }) => {}
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_validation_rejects_empty_executable() {
    let mut config = Config::default();
    config.engine.executable = "  ".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Validation { .. })
    ));
}

#[test]
fn test_validation_rejects_zero_write_chunk() {
    let mut config = Config::default();
    config.engine.max_write_chunk = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Validation { .. })
    ));
}

#[test]
fn test_validation_passes_for_default() {
    assert!(Config::default().validate().is_ok());
}
