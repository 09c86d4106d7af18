//! Device seams: speaker output, microphone acquisition and an open capture.

use async_trait::async_trait;
use futures::future::BoxFuture;
#[cfg(test)]
use mockall::automock;

use crate::types::audio::AudioFormat;

/// A finished recording, ready to upload.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedAudio {
    bytes: Vec<u8>,
    format: AudioFormat,
}

impl RecordedAudio {
    pub fn new(bytes: Vec<u8>, format: AudioFormat) -> Self {
        Self { bytes, format }
    }

    pub fn wav(bytes: Vec<u8>) -> Self {
        Self::new(bytes, AudioFormat::Wav)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    pub fn file_name(&self) -> String {
        format!("rec.{}", self.format.extension())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Resolves when a queued clip has finished or failed.
pub type PlaybackDone = BoxFuture<'static, anyhow::Result<()>>;

#[cfg_attr(test, automock)]
pub trait AudioOutput: Send + Sync {
    /// Queues one encoded clip. The clip is queued by the time this returns,
    /// so a later `stop` always covers it.
    fn play(&self, audio: Vec<u8>) -> PlaybackDone;

    /// Cuts off the playing clip and every clip queued before this call.
    /// Their `PlaybackDone` futures still resolve.
    fn stop(&self);
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Microphone: Send + Sync {
    async fn open(&self) -> anyhow::Result<Box<dyn ActiveCapture>>;
}

/// An open microphone stream. Consumed exactly once, by `finish` or `discard`.
#[async_trait]
pub trait ActiveCapture: Send {
    /// Current input level in `0.0..=1.0`.
    fn level(&self) -> f32;

    async fn finish(self: Box<Self>) -> anyhow::Result<RecordedAudio>;

    fn discard(self: Box<Self>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_audio_file_name_follows_format() {
        let audio = RecordedAudio::wav(vec![1, 2, 3]);
        assert_eq!(audio.file_name(), "rec.wav");
        assert_eq!(audio.format().mime(), "audio/wav");

        let audio = RecordedAudio::new(vec![], AudioFormat::Webm);
        assert_eq!(audio.file_name(), "rec.webm");
    }
}
