//! Incremental decoder for the newline-delimited `data: {json}` reply stream.

use std::future::Future;

use anyhow::Context;
use base64::Engine;
use futures::StreamExt;

use crate::api::ByteStream;
use crate::types::{AudioSegment, StreamRecord};

const DATA_PREFIX: &str = "data:";

/// What one decoded record means to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    /// The whole reply text so far, not just the latest fragment.
    Text { full: String },
    Audio(AudioSegment),
    Done { question_count: u32, text: String },
    InterviewDone,
    Error { message: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    records: u64,
    skipped: u64,
    bytes: u64,
}

impl DecodeStats {
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

/// Decodes one reply stream. Create a fresh decoder per turn.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    backlog: Vec<u8>,
    reply: String,
    finished: bool,
    stats: DecodeStats,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn reply(&self) -> &str {
        &self.reply
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// Consumes one read of the body. Bytes after the last newline are kept
    /// until the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<DecodedEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }
        self.stats.bytes += chunk.len() as u64;
        self.backlog.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = self.backlog[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let line = self.backlog[start..end].to_vec();
            start = end + 1;
            if let Some(event) = self.decode_line(&line) {
                events.push(event);
            }
            if self.finished {
                self.backlog.clear();
                return events;
            }
        }
        self.backlog.drain(..start);
        events
    }

    /// Decodes a final line that arrived without a trailing newline.
    pub fn finish(&mut self) -> Vec<DecodedEvent> {
        if self.finished || self.backlog.is_empty() {
            return Vec::new();
        }
        let line = std::mem::take(&mut self.backlog);
        self.decode_line(&line).into_iter().collect()
    }

    fn skip(&mut self, reason: &str) -> Option<DecodedEvent> {
        self.stats.skipped += 1;
        tracing::debug!("skipping stream record: {}", reason);
        None
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<DecodedEvent> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let line = match std::str::from_utf8(line) {
            Ok(line) => line.trim(),
            Err(e) => return self.skip(&format!("invalid utf-8: {}", e)),
        };
        let payload = line.strip_prefix(DATA_PREFIX)?.trim();
        if payload.is_empty() {
            return None;
        }

        let record = match serde_json::from_str::<StreamRecord>(payload) {
            Ok(record) => record,
            Err(e) => return self.skip(&format!("{}: {}", e, payload)),
        };

        tracing::trace!("stream record: {}", record.kind());
        self.finished = record.is_terminal();
        let event = match record {
            StreamRecord::Text(text) => {
                self.reply.push_str(text.content());
                DecodedEvent::Text {
                    full: self.reply.clone(),
                }
            }
            StreamRecord::Audio(audio) => {
                let payload = match base64::engine::general_purpose::STANDARD.decode(audio.audio_b64()) {
                    Ok(payload) => payload,
                    Err(e) => {
                        return self.skip(&format!("audio segment {} not base64: {}", audio.order(), e))
                    }
                };
                DecodedEvent::Audio(AudioSegment::new(audio.order(), payload))
            }
            StreamRecord::Done(done) => DecodedEvent::Done {
                question_count: done.question_count(),
                text: self.reply.clone(),
            },
            StreamRecord::InterviewDone => {
                self.reply.clear();
                DecodedEvent::InterviewDone
            }
            StreamRecord::Error(error) => DecodedEvent::Error {
                message: error.message().to_string(),
            },
        };
        self.stats.records += 1;
        Some(event)
    }
}

/// How a read of the reply stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// A `done`, `interview_done` or `error` record was decoded.
    Terminal,
    /// The body ended without a terminal record.
    Eof,
    /// The consumer stopped accepting events.
    Closed,
}

/// Drives `decoder` over `stream`, handing every event to `emit` in order.
///
/// `emit` returns `false` once the consumer is gone. Reading stops at the first
/// terminal record.
pub async fn read_stream<F, Fut>(
    mut stream: ByteStream,
    decoder: &mut StreamDecoder,
    mut emit: F,
) -> anyhow::Result<StreamEnd>
where
    F: FnMut(DecodedEvent) -> Fut,
    Fut: Future<Output = bool>,
{
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("reply stream aborted")?;
        for event in decoder.feed(&chunk) {
            if !emit(event).await {
                return Ok(StreamEnd::Closed);
            }
        }
        if decoder.is_finished() {
            return Ok(StreamEnd::Terminal);
        }
    }

    for event in decoder.finish() {
        if !emit(event).await {
            return Ok(StreamEnd::Closed);
        }
    }
    let stats = decoder.stats();
    tracing::debug!(
        "reply stream ended: {} records, {} skipped, {} bytes",
        stats.records(),
        stats.skipped(),
        stats.bytes()
    );
    if decoder.is_finished() {
        Ok(StreamEnd::Terminal)
    } else {
        Ok(StreamEnd::Eof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn encode(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn texts(events: &[DecodedEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                DecodedEvent::Text { full } => Some(full.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_records_split_across_reads() {
        // --- Arrange ---
        let body = format!(
            "data: {{\"type\":\"text\",\"content\":\"Hel\"}}\n\ndata: {{\"type\":\"audio\",\"order\":0,\"audio_b64\":\"{}\"}}\ndata: {{\"type\":\"text\",\"content\":\"lo\"}}\r\n",
            encode(b"abc")
        );
        let mut decoder = StreamDecoder::new();

        // --- Act ---
        let mut events = Vec::new();
        for chunk in body.as_bytes().chunks(7) {
            events.extend(decoder.feed(chunk));
        }

        // --- Assert ---
        assert_eq!(texts(&events), vec!["Hel".to_string(), "Hello".to_string()]);
        assert!(events.contains(&DecodedEvent::Audio(AudioSegment::new(0, b"abc".to_vec()))));
        assert_eq!(decoder.stats().records(), 3);
        assert!(!decoder.is_finished());
    }

    #[test]
    fn test_multibyte_character_split_between_reads() {
        let body = "data: {\"type\":\"text\",\"content\":\"naïve ☕\"}\n".as_bytes();
        let split = body.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut decoder = StreamDecoder::new();

        assert!(decoder.feed(&body[..split]).is_empty());
        let events = decoder.feed(&body[split..]);

        assert_eq!(texts(&events), vec!["naïve ☕".to_string()]);
    }

    #[test]
    fn test_malformed_record_between_valid_text_is_skipped() {
        let body = concat!(
            "data: {\"type\":\"text\",\"content\":\"Good \"}\n",
            "data: {\"type\":\"text\",\"content\":\n",
            "data: {\"type\":\"unknown\"}\n",
            "data: {\"type\":\"audio\",\"order\":1,\"audio_b64\":\"***\"}\n",
            "event: ping\n",
            "data: {\"type\":\"text\",\"content\":\"answer.\"}\n",
        );
        let mut decoder = StreamDecoder::new();

        let events = decoder.feed(body.as_bytes());

        assert_eq!(texts(&events).last().map(String::as_str), Some("Good answer."));
        assert_eq!(decoder.reply(), "Good answer.");
        assert_eq!(decoder.stats().skipped(), 3);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mut decoder = StreamDecoder::new();
        let mut body = b"data: \xff\xfe\n".to_vec();
        body.extend_from_slice(b"data: {\"type\":\"text\",\"content\":\"ok\"}\n");

        let events = decoder.feed(&body);

        assert_eq!(texts(&events), vec!["ok".to_string()]);
        assert_eq!(decoder.stats().skipped(), 1);
    }

    #[test]
    fn test_nothing_is_decoded_after_terminal_record() {
        let body = concat!(
            "data: {\"type\":\"text\",\"content\":\"Hi\"}\n",
            "data: {\"type\":\"done\",\"question_count\":2}\n",
            "data: {\"type\":\"text\",\"content\":\"late\"}\n",
        );
        let mut decoder = StreamDecoder::new();

        let events = decoder.feed(body.as_bytes());
        let later = decoder.feed(b"data: {\"type\":\"text\",\"content\":\"later\"}\n");

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            DecodedEvent::Done {
                question_count: 2,
                text: "Hi".to_string()
            }
        );
        assert!(later.is_empty());
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_interview_done_discards_partial_text() {
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(
            b"data: {\"type\":\"text\",\"content\":\"Thanks\"}\ndata: {\"type\":\"done_interview\"}\n",
        );

        assert_eq!(events.last(), Some(&DecodedEvent::InterviewDone));
        assert_eq!(decoder.reply(), "");
        assert!(decoder.is_finished());
    }

    #[test]
    fn test_unterminated_final_line_is_decoded_on_finish() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.feed(b"data: {\"type\":\"error\",\"message\":\"boom\"}").is_empty());

        let events = decoder.finish();

        assert_eq!(
            events,
            vec![DecodedEvent::Error {
                message: "boom".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_read_stream_stops_at_error_record() {
        // --- Arrange ---
        let chunks: Vec<anyhow::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"data: {\"type\":\"text\",\"content\":\"Hi\"}\ndata: {\"type\":\"error\",")),
            Ok(Bytes::from_static(b"\"message\":\"boom\"}\n")),
            Ok(Bytes::from_static(b"data: {\"type\":\"text\",\"content\":\"ignored\"}\n")),
        ];
        let stream: ByteStream = futures::stream::iter(chunks).boxed();
        let mut decoder = StreamDecoder::new();
        let mut seen = Vec::new();

        // --- Act ---
        let end = read_stream(stream, &mut decoder, |event| {
            seen.push(event);
            async { true }
        })
        .await
        .unwrap();

        // --- Assert ---
        assert_eq!(end, StreamEnd::Terminal);
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[1],
            DecodedEvent::Error {
                message: "boom".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_read_stream_reports_eof_and_transport_errors() {
        let chunks: Vec<anyhow::Result<Bytes>> =
            vec![Ok(Bytes::from_static(b"data: {\"type\":\"text\",\"content\":\"Hi\"}\n"))];
        let mut decoder = StreamDecoder::new();
        let end = read_stream(futures::stream::iter(chunks).boxed(), &mut decoder, |_| async { true })
            .await
            .unwrap();
        assert_eq!(end, StreamEnd::Eof);

        let chunks: Vec<anyhow::Result<Bytes>> = vec![Err(anyhow::anyhow!("connection reset"))];
        let mut decoder = StreamDecoder::new();
        let result =
            read_stream(futures::stream::iter(chunks).boxed(), &mut decoder, |_| async { true }).await;
        assert!(result.is_err());
    }
}
