use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Marker the engine prints at the start of an interactive prompt line.
const PROMPT_MARKER: char = '>';

/// One cleaned line of engine output, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredLine {
    pub text: String,
    /// True on the first line emitted after `answer_pending` was armed.
    pub first_of_answer: bool,
}

/// Reassembles complete lines from a byte stream arriving in arbitrary
/// chunks and drops the engine's own diagnostic noise.
///
/// The engine flushes output incrementally and interleaves genuine answer
/// text with startup banner lines and a per-input prompt echo, so filtering
/// has to operate on fully reassembled lines, never on raw chunks. The only
/// state carried between `feed` calls is the trailing partial line and the
/// shared answer-start flag.
pub struct LineFilter {
    pending: Vec<u8>,
    noise_prefixes: Vec<String>,
    answer_pending: Arc<AtomicBool>,
}

impl LineFilter {
    /// `answer_pending` is armed by the session at submit time and cleared
    /// here on the first emitted line. It is shared so that sessions reading
    /// more than one stream through separate filters still label exactly one
    /// line per turn.
    pub fn new(noise_prefixes: Vec<String>, answer_pending: Arc<AtomicBool>) -> Self {
        Self {
            pending: Vec::new(),
            noise_prefixes,
            answer_pending,
        }
    }

    /// Appends `bytes` to the carry buffer and returns every cleaned line
    /// completed by them. Bytes after the last terminator stay buffered for
    /// the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<FilteredLine> {
        self.pending.extend_from_slice(bytes);

        let mut out = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(text) = self.clean(&raw) {
                let first = self.answer_pending.swap(false, Ordering::SeqCst);
                out.push(FilteredLine {
                    text,
                    first_of_answer: first,
                });
            }
        }
        out
    }

    /// Normalizes and classifies one complete raw line. Returns `None` for
    /// noise, prompt artifacts, and empty lines.
    fn clean(&self, raw: &[u8]) -> Option<String> {
        let decoded = String::from_utf8_lossy(raw);
        let line = decoded.trim_end_matches('\n');
        let line: String = line.chars().filter(|&c| c != '\r').collect();

        if self
            .noise_prefixes
            .iter()
            .any(|prefix| line.starts_with(prefix.as_str()))
        {
            return None;
        }

        // A bare prompt line carries no content at all.
        if let Some(rest) = line.strip_prefix(PROMPT_MARKER) {
            if rest.trim().is_empty() {
                return None;
            }
        }

        // The engine echoes the prompt marker plus one separator in front of
        // input it reads back; strip that artifact, keep the remainder.
        if let Some(rest) = line.strip_prefix("> ") {
            return Some(rest.to_string());
        }

        if line.is_empty() {
            return None;
        }
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> LineFilter {
        filter_with_flag(Arc::new(AtomicBool::new(false)))
    }

    fn filter_with_flag(flag: Arc<AtomicBool>) -> LineFilter {
        LineFilter::new(
            vec![
                "build:".to_string(),
                "main:".to_string(),
                "llama_".to_string(),
                "print_".to_string(),
                "load_tensors:".to_string(),
                "common_init_from_params:".to_string(),
            ],
            flag,
        )
    }

    fn texts(lines: &[FilteredLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn drops_noise_and_bare_prompt_lines() {
        let mut f = filter();
        let lines = f.feed(b"build: abc\nHello\n> \nWorld\n");
        assert_eq!(texts(&lines), vec!["Hello", "World"]);
    }

    #[test]
    fn strips_prompt_echo_prefix() {
        let mut f = filter();
        let lines = f.feed(b"> What is Rust?\n");
        assert_eq!(texts(&lines), vec!["What is Rust?"]);
    }

    #[test]
    fn prefix_strip_applies_after_reassembly() {
        let mut f = filter();
        assert!(f.feed(b"> Hel").is_empty());
        let lines = f.feed(b"lo\n");
        assert_eq!(texts(&lines), vec!["Hello"]);
    }

    #[test]
    fn normalizes_crlf() {
        let mut f = filter();
        let lines = f.feed(b"first\r\nsecond\r\n");
        assert_eq!(texts(&lines), vec!["first", "second"]);
    }

    #[test]
    fn bare_prompt_without_trailing_space_dropped() {
        let mut f = filter();
        assert!(f.feed(b">\n").is_empty());
        assert!(f.feed(b">  \t\n").is_empty());
    }

    #[test]
    fn noise_prefix_dropped_regardless_of_chunk_boundaries() {
        let mut f = filter();
        assert!(f.feed(b"llama_co").is_empty());
        assert!(f.feed(b"ntext: n_ctx = 4096\n").is_empty());
    }

    #[test]
    fn fragmentation_does_not_change_emitted_lines() {
        let input = b"build: abc\n> Hello\nmid\r\nline split ac".to_vec();
        let tail = b"ross\n> \nlast\n".to_vec();
        let whole: Vec<u8> = input.iter().chain(tail.iter()).copied().collect();

        let mut one_shot = filter();
        let expected = one_shot.feed(&whole);

        let mut byte_at_a_time = filter();
        let mut got = Vec::new();
        for b in &whole {
            got.extend(byte_at_a_time.feed(std::slice::from_ref(b)));
        }
        assert_eq!(texts(&got), texts(&expected));
        assert_eq!(
            texts(&got),
            vec!["Hello", "mid", "line split across", "last"]
        );
    }

    #[test]
    fn answer_flag_consumed_exactly_once() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut f = filter_with_flag(Arc::clone(&flag));

        flag.store(true, Ordering::SeqCst);
        // Noise before the first real line must not consume the flag.
        let lines = f.feed(b"build: xyz\nfirst\nsecond\n");
        assert_eq!(lines.len(), 2);
        assert!(lines[0].first_of_answer);
        assert!(!lines[1].first_of_answer);

        // A second turn arms the flag again.
        flag.store(true, Ordering::SeqCst);
        let lines = f.feed(b"third\nfourth\n");
        assert!(lines[0].first_of_answer);
        assert!(!lines[1].first_of_answer);
    }

    #[test]
    fn empty_lines_never_emitted() {
        let mut f = filter();
        assert!(f.feed(b"\n\r\n\n").is_empty());
    }

    #[test]
    fn carry_buffer_flushes_only_on_terminator() {
        let mut f = filter();
        assert!(f.feed(b"no newline yet").is_empty());
        let lines = f.feed(b" and now\n");
        assert_eq!(texts(&lines), vec!["no newline yet and now"]);
    }
}
