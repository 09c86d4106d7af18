use crate::audio::Base64EncodedAudioBytes;

/// `text` record: an incremental fragment of the interviewer's reply.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextEvent {
    content: String,
}

impl TextEvent {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// `audio` record: one synthesized sentence of the reply.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioEvent {
    /// Position of the segment within the turn, starting at 0
    order: u32,

    /// The encoded audio (MP3) as base64
    audio_b64: Base64EncodedAudioBytes,
}

impl AudioEvent {
    pub fn new(order: u32, audio_b64: &str) -> Self {
        Self {
            order,
            audio_b64: audio_b64.to_string(),
        }
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn audio_b64(&self) -> &str {
        &self.audio_b64
    }
}

/// `done` record: the reply turn is complete.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DoneEvent {
    /// Number of questions asked so far, including the one just streamed
    question_count: u32,
}

impl DoneEvent {
    pub fn new(question_count: u32) -> Self {
        Self { question_count }
    }

    pub fn question_count(&self) -> u32 {
        self.question_count
    }
}

/// `error` record: the server gave up on this reply.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ErrorEvent {
    message: String,
}

impl ErrorEvent {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
