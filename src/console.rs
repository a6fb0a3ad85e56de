//! Line-oriented console front end: the registered consumer of the engine
//! session. Reads prompts from stdin, expands file-path tokens into extracted
//! text, drives the retrieval and speech collaborators, and prints streamed
//! answer chunks as they arrive.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

use signal_hook::consts::{SIGINT, SIGTERM};

use crate::config::Config;
use crate::engine::{EngineEvent, EngineSession};
use crate::tools::speech::Recorder;
use crate::tools::{convert, is_document, is_image, ocr, rag};

/// Runs the console loop until stdin closes, `:quit`, or a termination
/// signal. The engine child's lifetime is tied to this process; teardown of
/// the host closes its pipes and lets it exit.
pub fn run(config: Config) -> anyhow::Result<()> {
    let term = Arc::new(AtomicBool::new(false));
    for sig in [SIGINT, SIGTERM] {
        // Second signal force-exits; the first one lands in the flag.
        signal_hook::flag::register_conditional_shutdown(sig, 130, Arc::clone(&term))?;
        signal_hook::flag::register(sig, Arc::clone(&term))?;
    }

    let (event_tx, event_rx) = mpsc::channel();
    let session = EngineSession::new(
        config.engine.command(),
        config.engine.session_options(),
        event_tx,
    );
    // The printer drains on its own schedule; the session's reader loop
    // never waits on it.
    let _printer = spawn_printer(event_rx);

    let mut recorder = Recorder::new(config.tools.clone());
    let mut rag_armed = false;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if term.load(Ordering::SeqCst) {
            break;
        }
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line == ":quit" || line == ":exit" {
            break;
        }
        if line == ":record" {
            toggle_recording(&mut recorder, &session, &config, &mut rag_armed);
            continue;
        }
        if let Some(path) = line.strip_prefix(":rag ") {
            import_to_kb(&config, path.trim(), &mut rag_armed);
            continue;
        }

        submit_turn(&session, &config, &mut rag_armed, line);
    }

    Ok(())
}

/// One turn: rewrite the prompt (retrieval or file-token expansion), echo it,
/// and hand it to the session.
fn submit_turn(session: &EngineSession, config: &Config, rag_armed: &mut bool, text: &str) {
    let prompt = if *rag_armed {
        // Retrieval applies to one turn, then disarms.
        *rag_armed = false;
        println!("[searching the retrieval library…]");
        rag::query(&config.tools, text)
    } else {
        expand_file_tokens(config, text)
    };
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return;
    }

    println!("PROBLEM: {prompt}");
    println!("---------- the model is working, please wait ----------");
    session.submit(prompt);
}

/// Replaces whitespace-separated tokens that name existing files with their
/// extracted text: documents through the converters, images through OCR.
fn expand_file_tokens(config: &Config, text: &str) -> String {
    text.split_whitespace()
        .map(|token| {
            let path = Path::new(token);
            if path.exists() && is_document(path) {
                convert::document_to_text(&config.tools, path)
            } else if path.exists() && is_image(path) {
                ocr::image_to_text(&config.tools, path)
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn toggle_recording(
    recorder: &mut Recorder,
    session: &EngineSession,
    config: &Config,
    rag_armed: &mut bool,
) {
    if recorder.is_recording() {
        println!("[transcribing…]");
        match recorder.stop_and_transcribe() {
            Ok(transcript) if !transcript.is_empty() => {
                println!("[transcript] {transcript}");
                submit_turn(session, config, rag_armed, &transcript);
            }
            Ok(_) => println!("[nothing was recognized]"),
            Err(err) => println!("[{err}]"),
        }
    } else {
        match recorder.start() {
            Ok(()) => println!("[recording — type :record again to stop]"),
            Err(err) => println!("[{err}]"),
        }
    }
}

fn import_to_kb(config: &Config, path: &str, rag_armed: &mut bool) {
    println!("[loading '{path}' into the retrieval library…]");
    let log = rag::import_document(&config.tools, Path::new(path));
    let log = log.trim_end();
    if !log.is_empty() {
        println!("{log}");
    }
    *rag_armed = true;
    println!("[retrieval armed: the next prompt is answered with document context]");
}

/// Consumer side of the event channel: prints chunks as they arrive, with the
/// one-time ANSWER label on the first chunk of each turn.
fn spawn_printer(events: Receiver<EngineEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut stdout = io::stdout();
        while let Ok(event) = events.recv() {
            match event {
                EngineEvent::Output {
                    text,
                    first_of_answer,
                } => {
                    if first_of_answer {
                        let _ = writeln!(stdout, "\nANSWER: {text}");
                    } else {
                        let _ = writeln!(stdout, "{text}");
                    }
                }
                EngineEvent::Finished => {
                    let _ = writeln!(stdout, "\n[engine session ended]");
                }
            }
            let _ = stdout.flush();
        }
    })
}
