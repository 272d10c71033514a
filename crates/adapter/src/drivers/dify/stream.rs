//! Reassembles a streamed chat answer from `data: {...}` server-sent lines.

use serde::Deserialize;
use tracing::{debug, warn};

const DATA_PREFIX: &str = "data:";

#[derive(Deserialize)]
struct StreamRecord {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Buffers partial lines across network chunks and concatenates `answer`
/// fields in receipt order. Malformed records are skipped.
#[derive(Default)]
pub struct SseAssembler {
    pending: Vec<u8>,
    answer: String,
    skipped: usize,
}

impl SseAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.consume_line(&line);
        }
    }

    pub fn finish(mut self) -> String {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.consume_line(&rest);
        }
        if self.skipped > 0 {
            debug!(skipped = self.skipped, "Skipped malformed stream records");
        }
        self.answer
    }

    fn consume_line(&mut self, raw: &[u8]) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim();
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return;
        };
        let payload = payload.trim_start();
        if payload.is_empty() || payload == "[DONE]" {
            return;
        }

        match serde_json::from_str::<StreamRecord>(payload) {
            Ok(record) => {
                if record.event.as_deref() == Some("error") {
                    warn!(message = ?record.message, "Answer stream reported an error event");
                }
                if let Some(chunk) = record.answer {
                    self.answer.push_str(&chunk);
                }
            }
            Err(_) => self.skipped += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_answers_in_order() {
        let mut asm = SseAssembler::new();
        asm.push(b"data: {\"event\": \"message\", \"answer\": \"Analysis: \"}\n\n");
        asm.push(b"data: {\"event\": \"message\", \"answer\": \"plausible.\"}\n\n");
        asm.push(b"data: {\"event\": \"message_end\"}\n\n");
        assert_eq!(asm.finish(), "Analysis: plausible.");
    }

    #[test]
    fn lines_split_across_chunks_are_rejoined() {
        let mut asm = SseAssembler::new();
        asm.push(b"data: {\"answer\": \"he");
        asm.push(b"llo\"}\n");
        asm.push("data: {\"answer\": \" 世界\"}".as_bytes());
        assert_eq!(asm.finish(), "hello 世界");
    }

    #[test]
    fn multibyte_chars_split_between_chunks_survive() {
        let line = "data: {\"answer\": \"真假\"}\n".as_bytes();
        let (a, b) = line.split_at(20);
        let mut asm = SseAssembler::new();
        asm.push(a);
        asm.push(b);
        assert_eq!(asm.finish(), "真假");
    }

    #[test]
    fn malformed_records_are_skipped() {
        let mut asm = SseAssembler::new();
        asm.push(b"data: {not json}\n");
        asm.push(b"event: ping\n");
        asm.push(b"data: {\"answer\": \"kept\"}\n");
        asm.push(b"data: [DONE]\n");
        assert_eq!(asm.finish(), "kept");
    }
}
