use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;

use crate::api::{ByteStream, InterviewApi};
use crate::media::RecordedAudio;
use crate::types::{
    AnswerSubmission, EndInterviewRequest, InterviewSetup, Report, SessionStarted, Transcription,
};

mod config;
mod consts;
mod stats;
mod utils;

pub use config::{Config, ConfigBuilder};
pub use stats::Stats;
pub use utils::ResumeUpload;

/// HTTP client for the interview server.
#[derive(Clone)]
pub struct Client {
    config: Config,
    http: reqwest::Client,
    stats: Arc<Mutex<Stats>>,
}

impl Client {
    fn new(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            config,
            http,
            stats: Arc::new(Mutex::new(Stats::new())),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> anyhow::Result<Stats> {
        match self.stats.lock() {
            Ok(stats_guard) => Ok(stats_guard.clone()),
            Err(_) => Err(anyhow::anyhow!("failed to get stats")),
        }
    }

    fn update_stats(&self, f: impl FnOnce(&mut Stats)) {
        if let Ok(mut stats_guard) = self.stats.lock() {
            f(&mut stats_guard);
        } else {
            tracing::error!("failed to update stats");
        }
    }

    /// Sends a request and turns a non-success status into `failure`.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        failure: &'static str,
    ) -> anyhow::Result<reqwest::Response> {
        self.update_stats(Stats::record_request);
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.update_stats(Stats::record_failure);
                tracing::warn!("request failed: {}", e);
                return Err(anyhow::Error::new(e).context(failure));
            }
        };
        if !response.status().is_success() {
            self.update_stats(Stats::record_failure);
            tracing::warn!("{}: status {}", failure, response.status());
            return Err(anyhow::anyhow!(failure));
        }
        Ok(response)
    }

    pub async fn start_interview(
        &self,
        setup: &InterviewSetup,
        resume: Option<ResumeUpload>,
    ) -> anyhow::Result<SessionStarted> {
        let form = utils::start_form(setup, resume)?;
        let request = self
            .http
            .post(utils::endpoint(&self.config, consts::START_INTERVIEW_PATH))
            .multipart(form);
        let response = self.send(request, "Failed to start interview").await?;
        let started = response
            .json::<SessionStarted>()
            .await
            .context("invalid start-interview response")?;
        tracing::info!(
            "session {} started, {} questions",
            started.session_id(),
            setup.num_questions()
        );
        Ok(started)
    }

    pub async fn delete_session(&self, session_id: &str) -> anyhow::Result<()> {
        let request = self.http.delete(utils::session_url(&self.config, session_id));
        self.send(request, "Failed to delete session").await?;
        tracing::debug!("session {} deleted", session_id);
        Ok(())
    }
}

#[async_trait]
impl InterviewApi for Client {
    async fn question_audio(&self, session_id: &str, question_index: u32) -> anyhow::Result<Vec<u8>> {
        let request = self
            .http
            .get(utils::tts_url(&self.config, session_id, question_index));
        let response = self.send(request, "Failed to fetch question audio").await?;
        let bytes = response.bytes().await.context("failed to read question audio")?;
        self.update_stats(|stats| stats.record_bytes(bytes.len()));
        Ok(bytes.to_vec())
    }

    async fn transcribe(&self, audio: RecordedAudio) -> anyhow::Result<String> {
        let form = utils::audio_form(audio)?;
        let request = self
            .http
            .post(utils::endpoint(&self.config, consts::TRANSCRIBE_PATH))
            .multipart(form);
        let response = self.send(request, consts::TRANSCRIPTION_FAILED).await?;
        let transcription = response
            .json::<Transcription>()
            .await
            .context(consts::TRANSCRIPTION_FAILED)?;
        Ok(transcription.into_transcript())
    }

    async fn respond_stream(&self, session_id: &str, transcript: &str) -> anyhow::Result<ByteStream> {
        let request = self
            .http
            .post(utils::endpoint(&self.config, consts::RESPOND_STREAM_PATH))
            .json(&AnswerSubmission::new(session_id, transcript));
        let response = self.send(request, consts::STREAM_REQUEST_FAILED).await?;
        self.update_stats(Stats::record_stream);

        let stats = self.stats.clone();
        let stream = response.bytes_stream().map(move |chunk| {
            let chunk = chunk.map_err(anyhow::Error::from)?;
            if let Ok(mut stats_guard) = stats.lock() {
                stats_guard.record_bytes(chunk.len());
            }
            Ok(chunk)
        });
        Ok(stream.boxed())
    }

    async fn end_interview(&self, session_id: &str, gaze_warnings: u32) -> anyhow::Result<Report> {
        let request = self
            .http
            .post(utils::endpoint(&self.config, consts::END_INTERVIEW_PATH))
            .json(&EndInterviewRequest::new(session_id, gaze_warnings));
        let response = self.send(request, consts::FEEDBACK_FAILED).await?;
        let report = response
            .json::<Report>()
            .await
            .context(consts::FEEDBACK_FAILED)?;
        Ok(report)
    }
}

pub fn connect_with_config(config: Config) -> anyhow::Result<Client> {
    let client = Client::new(config)?;
    tracing::debug!("interview api at {}", client.config().base_url());
    Ok(client)
}

pub fn connect() -> anyhow::Result<Client> {
    connect_with_config(Config::new())
}
