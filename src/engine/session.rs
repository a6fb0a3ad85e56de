use std::io::{Read, Write};
use std::process::{ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, SyncSender};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::engine::events::{EngineError, EngineEvent};
use crate::engine::filter::LineFilter;
use crate::engine::state::{SessionState, StateCell};

/// Executable plus structured argument vector for the engine child process.
/// Arguments are passed as a list, never assembled into a shell string.
#[derive(Debug, Clone)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// Tunables for one session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Literal prefixes of engine banner/diagnostic lines to drop.
    pub noise_prefixes: Vec<String>,
    /// Bound on the one-shot readiness wait in `submit`.
    pub ready_timeout: Duration,
    /// Upper bound per stdin write, sized below the pipe buffer.
    pub max_write_chunk: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            noise_prefixes: crate::config::default_noise_prefixes(),
            ready_timeout: Duration::from_millis(3000),
            max_write_chunk: 64 * 1024,
        }
    }
}

/// A long-lived interactive channel to one engine child process.
///
/// Two contexts touch a session: the caller context issuing `start`/`submit`,
/// and the session thread that owns the output streams exclusively and posts
/// `EngineEvent`s over the channel handed to `new`. Event delivery never
/// blocks the reader; the consumer drains the channel on its own schedule.
///
/// `submit` assumes single-writer discipline: callers that can race must
/// serialize their own calls.
pub struct EngineSession {
    command: EngineCommand,
    options: SessionOptions,
    events: Sender<EngineEvent>,
    state: Arc<StateCell>,
    stdin: Arc<Mutex<Option<ChildStdin>>>,
    answer_pending: Arc<AtomicBool>,
    ready: Mutex<Option<Receiver<()>>>,
}

impl EngineSession {
    pub fn new(
        command: EngineCommand,
        options: SessionOptions,
        events: Sender<EngineEvent>,
    ) -> Self {
        Self {
            command,
            options,
            events,
            state: Arc::new(StateCell::new()),
            stdin: Arc::new(Mutex::new(None)),
            answer_pending: Arc::new(AtomicBool::new(false)),
            ready: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Spawns the engine child on its own thread. A no-op while a process is
    /// already starting or live; a session whose previous child finished or
    /// failed starts a fresh one.
    ///
    /// On spawn failure the session moves to `Failed` and posts exactly one
    /// diagnostic output event; `Finished` is never posted for a child that
    /// never lived.
    pub fn start(&self) {
        let current = self.state.get();
        if current.is_live() || current == SessionState::Starting {
            return;
        }
        if !self.state.transition(current, SessionState::Starting) {
            return;
        }

        // One-shot rendezvous fulfilled when the child is confirmed spawned.
        let (ready_tx, ready_rx) = mpsc::sync_channel::<()>(1);
        *self.ready.lock() = Some(ready_rx);

        let command = self.command.clone();
        let options = self.options.clone();
        let events = self.events.clone();
        let state = Arc::clone(&self.state);
        let stdin_slot = Arc::clone(&self.stdin);
        let answer_pending = Arc::clone(&self.answer_pending);

        thread::spawn(move || {
            run_session(
                command,
                options,
                events,
                state,
                stdin_slot,
                answer_pending,
                ready_tx,
            );
        });
    }

    /// Sends one input turn to the engine, starting the session first if
    /// needed. The engine's input protocol terminates each turn with a line
    /// holding a single `/`; it is appended here.
    ///
    /// Not-ready timeouts and write failures surface to the consumer as a
    /// diagnostic output event and abort this submit only.
    pub fn submit(&self, text: &str) {
        self.start();
        if !self.wait_ready() {
            return;
        }

        self.answer_pending.store(true, Ordering::SeqCst);

        let mut payload = String::with_capacity(text.len() + 3);
        payload.push_str(text);
        if !payload.ends_with('\n') {
            payload.push('\n');
        }
        payload.push_str("/\n");

        let mut guard = self.stdin.lock();
        let Some(writer) = guard.as_mut() else {
            // The child went away between the readiness check and the write.
            self.answer_pending.store(false, Ordering::SeqCst);
            warn!("submit dropped: engine stdin handle already released");
            return;
        };

        for chunk in payload.as_bytes().chunks(self.options.max_write_chunk) {
            if let Err(source) = writer.write_all(chunk) {
                self.report_write_failure(source);
                return;
            }
        }
        if let Err(source) = writer.flush() {
            self.report_write_failure(source);
            return;
        }

        self.state
            .transition(SessionState::Ready, SessionState::Streaming);
    }

    fn report_write_failure(&self, source: std::io::Error) {
        self.answer_pending.store(false, Ordering::SeqCst);
        let err = EngineError::Write(source);
        warn!(error = %err, "engine write failed");
        let _ = self.events.send(EngineEvent::Output {
            text: err.diagnostic(),
            first_of_answer: false,
        });
    }

    /// Blocks on the one-shot readiness signal, bounded by
    /// `options.ready_timeout`. Returns false when the session cannot accept
    /// input; the reason has already been reported to the consumer.
    fn wait_ready(&self) -> bool {
        if self.state.get().is_live() {
            return true;
        }
        let Some(rx) = self.ready.lock().take() else {
            return self.state.get().is_live();
        };
        match rx.recv_timeout(self.options.ready_timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => {
                // Keep the receiver; a later submit may find the engine up.
                *self.ready.lock() = Some(rx);
                let err = EngineError::NotReady {
                    waited_ms: self.options.ready_timeout.as_millis() as u64,
                };
                warn!(error = %err, "engine readiness wait expired");
                let _ = self.events.send(EngineEvent::Output {
                    text: err.diagnostic(),
                    first_of_answer: false,
                });
                false
            }
            // Spawn failed; the session thread already posted its diagnostic.
            Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

/// Session thread body: spawn, handshake, steady-state streaming, shutdown.
fn run_session(
    command: EngineCommand,
    options: SessionOptions,
    events: Sender<EngineEvent>,
    state: Arc<StateCell>,
    stdin_slot: Arc<Mutex<Option<ChildStdin>>>,
    answer_pending: Arc<AtomicBool>,
    ready_tx: SyncSender<()>,
) {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            state.set(SessionState::Failed);
            let err = EngineError::Spawn {
                command: command.program.clone(),
                source,
            };
            warn!(program = %command.program, error = %err, "engine spawn failed");
            let _ = events.send(EngineEvent::Output {
                text: err.diagnostic(),
                first_of_answer: false,
            });
            // Dropping ready_tx wakes any readiness waiter with Disconnected.
            return;
        }
    };

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    *stdin_slot.lock() = child.stdin.take();
    state.set(SessionState::Ready);
    let _ = ready_tx.send(());
    debug!(program = %command.program, pid = child.id(), "engine ready");

    // stdout and stderr split lines independently, so each pipe gets its own
    // carry buffer. The shared answer flag keeps the one-time label correct
    // across both.
    let stderr_handle = stderr.map(|pipe| {
        let events = events.clone();
        let state = Arc::clone(&state);
        let mut filter = LineFilter::new(
            options.noise_prefixes.clone(),
            Arc::clone(&answer_pending),
        );
        thread::spawn(move || drain_stream(pipe, &mut filter, &events, &state))
    });

    if let Some(pipe) = stdout {
        let mut filter = LineFilter::new(options.noise_prefixes, answer_pending);
        drain_stream(pipe, &mut filter, &events, &state);
    }

    if let Some(handle) = stderr_handle {
        let _ = handle.join();
    }

    // Unbounded exit wait; the streams are closed so the child is on its way
    // out already.
    match child.wait() {
        Ok(status) => debug!(%status, "engine exited"),
        Err(err) => warn!(error = %err, "engine exit wait failed"),
    }
    *stdin_slot.lock() = None;
    state.set(SessionState::Finished);
    let _ = events.send(EngineEvent::Finished);
}

/// Blocking read loop over one output pipe. Read errors are folded into
/// stream end: the session finishes the same way it would on a clean exit.
fn drain_stream<R: Read>(
    mut pipe: R,
    filter: &mut LineFilter,
    events: &Sender<EngineEvent>,
    state: &StateCell,
) {
    let mut buf = [0u8; 4096];
    loop {
        let count = match pipe.read(&mut buf) {
            Ok(0) => break,
            Ok(count) => count,
            Err(err) => {
                warn!(error = %err, "engine read failed; treating as stream end");
                break;
            }
        };
        for line in filter.feed(&buf[..count]) {
            let _ = events.send(EngineEvent::Output {
                text: line.text,
                first_of_answer: line.first_of_answer,
            });
        }
        state.transition(SessionState::Ready, SessionState::Streaming);
    }
}
