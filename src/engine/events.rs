use thiserror::Error;

/// Notifications the engine core emits to its registered consumer.
///
/// Ownership transfers on send; the reader loop never waits for the consumer
/// to finish handling an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// One cleaned line of engine output. `first_of_answer` is set on the
    /// first chunk after a submit so the consumer can place a one-time label.
    Output { text: String, first_of_answer: bool },
    /// The engine's output stream closed and the process was reaped.
    Finished,
}

/// Failures in the interactive channel.
///
/// None of these cross the core boundary as errors: they reach the consumer
/// as a single diagnostic `Output` event and are terminal for the affected
/// operation. Read errors have no variant here; they are folded into normal
/// stream-end handling and only logged.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start engine '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("write to engine stdin failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("engine not ready after {waited_ms} ms")]
    NotReady { waited_ms: u64 },
}

impl EngineError {
    /// Inline text shown to the user in place of answer output.
    pub fn diagnostic(&self) -> String {
        format!("[engine error: {}]", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_mentions_command() {
        let err = EngineError::Spawn {
            command: "llama-cli".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let text = err.diagnostic();
        assert!(text.contains("llama-cli"));
        assert!(text.starts_with("[engine error:"));
    }

    #[test]
    fn not_ready_reports_wait() {
        let err = EngineError::NotReady { waited_ms: 3000 };
        assert!(err.to_string().contains("3000"));
    }
}
