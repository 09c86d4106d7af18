use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
#[cfg(test)]
use mockall::automock;

use crate::media::RecordedAudio;
use crate::types::Report;

/// Raw body of the reply stream, chunked however the transport delivers it.
pub type ByteStream = BoxStream<'static, anyhow::Result<Bytes>>;

/// The interview server as seen by the orchestrator.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InterviewApi: Send + Sync {
    /// Synthesized audio of one question, as a single complete resource.
    async fn question_audio(&self, session_id: &str, question_index: u32) -> anyhow::Result<Vec<u8>>;

    async fn transcribe(&self, audio: RecordedAudio) -> anyhow::Result<String>;

    /// Opens the reply stream for the candidate's answer.
    async fn respond_stream(&self, session_id: &str, transcript: &str) -> anyhow::Result<ByteStream>;

    async fn end_interview(&self, session_id: &str, gaze_warnings: u32) -> anyhow::Result<Report>;
}
