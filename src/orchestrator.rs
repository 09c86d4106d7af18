//! Async runtime around [`InterviewSession`].
//!
//! One task owns the session and is the only place its state changes. Network
//! requests, the reply stream reader, playback and the gaze probe run as their
//! own tasks and report back through the same input queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::InterviewApi;
use crate::decoder::{read_stream, StreamDecoder, StreamEnd};
use crate::gaze::{FaceDetector, GazeProbe, ProbeConfig};
use crate::media::{ActiveCapture, AudioOutput, Microphone};
use crate::session::{Command, Input, InterviewSession, SessionView};
use crate::types::Report;

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    capacity: usize,
    level_interval: Duration,
    probe: ProbeConfig,
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self {
            capacity: 256,
            level_interval: Duration::from_millis(100),
            probe: ProbeConfig::default(),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_level_interval(mut self, level_interval: Duration) -> Self {
        self.level_interval = level_interval;
        self
    }

    pub fn with_probe(mut self, probe: ProbeConfig) -> Self {
        self.probe = probe;
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new()
    }
}

type PendingCapture = JoinHandle<anyhow::Result<Box<dyn ActiveCapture>>>;

pub struct SessionOrchestrator {
    session: InterviewSession,
    api: Arc<dyn InterviewApi>,
    output: Arc<dyn AudioOutput>,
    microphone: Arc<dyn Microphone>,
    inputs: mpsc::Sender<Input>,
    view: watch::Sender<SessionView>,
    report: Option<oneshot::Sender<Report>>,
    capture: Option<Box<dyn ActiveCapture>>,
    acquiring: Option<PendingCapture>,
    reply_stream: Option<JoinHandle<()>>,
    probe: Option<JoinHandle<()>>,
}

impl SessionOrchestrator {
    pub fn spawn(
        session: InterviewSession,
        api: Arc<dyn InterviewApi>,
        output: Arc<dyn AudioOutput>,
        microphone: Arc<dyn Microphone>,
        detector: Option<Box<dyn FaceDetector>>,
        config: OrchestratorConfig,
    ) -> OrchestratorHandle {
        let (inputs, rx) = mpsc::channel(config.capacity);
        let (view, view_rx) = watch::channel(session.view());
        let (report, report_rx) = oneshot::channel();
        let (alive, handle_dropped) = oneshot::channel();

        let probe = detector.map(|detector| GazeProbe::spawn(detector, config.probe, inputs.clone()));

        let orchestrator = SessionOrchestrator {
            session,
            api,
            output,
            microphone,
            inputs: inputs.clone(),
            view,
            report: Some(report),
            capture: None,
            acquiring: None,
            reply_stream: None,
            probe,
        };
        let task = tokio::spawn(orchestrator.run(rx, handle_dropped, config.level_interval));

        OrchestratorHandle {
            inputs,
            _alive: alive,
            view: view_rx,
            report: Some(report_rx),
            task,
        }
    }

    async fn run(
        mut self,
        mut rx: mpsc::Receiver<Input>,
        mut handle_dropped: oneshot::Receiver<()>,
        level_interval: Duration,
    ) {
        let commands = self.session.start();
        self.execute(commands);
        self.publish();

        let mut level_tick = tokio::time::interval(level_interval);
        level_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut handle_alive = true;

        while !self.session.is_closed() {
            tokio::select! {
                input = rx.recv() => {
                    let Some(input) = input else { break };
                    self.dispatch(input);
                }
                _ = &mut handle_dropped, if handle_alive => {
                    handle_alive = false;
                    tracing::debug!("handle dropped, tearing down");
                    self.dispatch(Input::Teardown);
                }
                opened = Self::acquired(&mut self.acquiring) => {
                    self.acquiring = None;
                    let result = match opened {
                        Ok(Ok(capture)) => {
                            self.capture = Some(capture);
                            Ok(())
                        }
                        Ok(Err(e)) => Err(format!("{:#}", e)),
                        Err(e) => Err(e.to_string()),
                    };
                    self.dispatch(Input::CaptureStarted(result));
                }
                _ = level_tick.tick(), if self.capture.is_some() => {
                    if let Some(level) = self.capture.as_ref().map(|capture| capture.level()) {
                        self.dispatch(Input::Level(level));
                    }
                }
            }
        }
        tracing::debug!("session {} closed", self.session.info().session_id());
    }

    async fn acquired(
        pending: &mut Option<PendingCapture>,
    ) -> Result<anyhow::Result<Box<dyn ActiveCapture>>, tokio::task::JoinError> {
        match pending {
            Some(handle) => handle.await,
            None => std::future::pending().await,
        }
    }

    fn dispatch(&mut self, input: Input) {
        let commands = self.session.handle(input);
        self.execute(commands);
        self.publish();
    }

    fn publish(&self) {
        self.view.send_replace(self.session.view());
    }

    fn post(&self, future: impl std::future::Future<Output = Input> + Send + 'static) {
        let inputs = self.inputs.clone();
        tokio::spawn(async move {
            let input = future.await;
            if inputs.send(input).await.is_err() {
                tracing::debug!("session closed before result arrived");
            }
        });
    }

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            self.execute_one(command);
        }
    }

    fn execute_one(&mut self, command: Command) {
        let session_id = self.session.info().session_id().to_string();
        match command {
            Command::FetchOpeningAudio { question_index } => {
                let api = self.api.clone();
                self.post(async move {
                    let result = api.question_audio(&session_id, question_index).await;
                    Input::OpeningAudio(result.map_err(|e| format!("{:#}", e)))
                });
            }
            Command::AcquireMicrophone => {
                let microphone = self.microphone.clone();
                self.acquiring = Some(tokio::spawn(async move { microphone.open().await }));
            }
            Command::SubmitRecording => {
                let Some(capture) = self.capture.take() else {
                    tracing::warn!("no active capture to submit");
                    self.post(async { Input::AnswerTranscribed(Err("No recording".to_string())) });
                    return;
                };
                let api = self.api.clone();
                self.post(async move {
                    let result = match capture.finish().await {
                        Ok(audio) => {
                            tracing::debug!("submitting {} bytes of audio", audio.bytes().len());
                            api.transcribe(audio).await.map_err(|e| e.to_string())
                        }
                        Err(e) => Err(format!("{:#}", e)),
                    };
                    Input::AnswerTranscribed(result)
                });
            }
            Command::DiscardCapture => {
                if let Some(capture) = self.capture.take() {
                    capture.discard();
                }
                if let Some(pending) = self.acquiring.take() {
                    tokio::spawn(async move {
                        if let Ok(Ok(capture)) = pending.await {
                            capture.discard();
                        }
                    });
                }
            }
            Command::OpenReplyStream { turn, transcript } => {
                if let Some(previous) = self.reply_stream.take() {
                    previous.abort();
                }
                let api = self.api.clone();
                let inputs = self.inputs.clone();
                self.reply_stream = Some(tokio::spawn(async move {
                    let input = match api.respond_stream(&session_id, &transcript).await {
                        Ok(stream) => {
                            let mut decoder = StreamDecoder::new();
                            let sink = inputs.clone();
                            let end = read_stream(stream, &mut decoder, |event| {
                                let sink = sink.clone();
                                async move { sink.send(Input::Stream { turn, event }).await.is_ok() }
                            })
                            .await;
                            match end {
                                Ok(StreamEnd::Terminal) | Ok(StreamEnd::Closed) => None,
                                Ok(StreamEnd::Eof) => Some(Input::StreamClosed { turn }),
                                Err(e) => Some(Input::StreamFailed {
                                    turn,
                                    message: e.to_string(),
                                }),
                            }
                        }
                        Err(e) => Some(Input::StreamFailed {
                            turn,
                            message: e.to_string(),
                        }),
                    };
                    if let Some(input) = input {
                        let _ = inputs.send(input).await;
                    }
                }));
            }
            Command::AbortReplyStream => {
                if let Some(reader) = self.reply_stream.take() {
                    reader.abort();
                }
            }
            Command::Play { ticket, audio } => {
                let done = self.output.play(audio);
                self.post(async move {
                    let outcome = done.await.map_err(|e| format!("{:#}", e));
                    Input::PlaybackFinished { ticket, outcome }
                });
            }
            Command::StopPlayback => self.output.stop(),
            Command::RequestReport { gaze_warnings } => {
                tracing::info!("requesting report, {} look-aways", gaze_warnings);
                let api = self.api.clone();
                self.post(async move {
                    let result = api.end_interview(&session_id, gaze_warnings).await;
                    Input::ReportReady(result.map_err(|e| e.to_string()))
                });
            }
            Command::StopGazeProbe => {
                if let Some(probe) = self.probe.take() {
                    probe.abort();
                }
            }
            Command::Finished(report) => {
                if let Some(tx) = self.report.take() {
                    if tx.send(report).is_err() {
                        tracing::warn!("report receiver dropped");
                    }
                }
            }
        }
    }
}

/// Caller side of a running session.
///
/// Dropping it tears the session down.
pub struct OrchestratorHandle {
    inputs: mpsc::Sender<Input>,
    _alive: oneshot::Sender<()>,
    view: watch::Receiver<SessionView>,
    report: Option<oneshot::Receiver<Report>>,
    task: JoinHandle<()>,
}

impl OrchestratorHandle {
    async fn send(&self, input: Input) -> anyhow::Result<()> {
        self.inputs
            .send(input)
            .await
            .map_err(|_| anyhow::anyhow!("session is closed"))
    }

    pub async fn start_recording(&self) -> anyhow::Result<()> {
        self.send(Input::StartRecording).await
    }

    pub async fn stop_recording(&self) -> anyhow::Result<()> {
        self.send(Input::StopRecording).await
    }

    pub async fn end_now(&self) -> anyhow::Result<()> {
        self.send(Input::EndNow).await
    }

    /// Feeds an input from an external source, e.g. a gaze probe.
    pub fn sender(&self) -> mpsc::Sender<Input> {
        self.inputs.clone()
    }

    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Releases every resource the session holds. Safe to call more than once.
    pub async fn teardown(&self) {
        if self.inputs.send(Input::Teardown).await.is_err() {
            tracing::debug!("session already closed");
        }
    }

    /// Hands out the report receiver, for callers that select on it.
    pub fn take_report(&mut self) -> Option<oneshot::Receiver<Report>> {
        self.report.take()
    }

    /// Resolves with the report, or `None` if the session closed without one.
    pub async fn wait_report(&mut self) -> Option<Report> {
        match self.report.take() {
            Some(rx) => rx.await.ok(),
            None => None,
        }
    }

    /// Waits for the session to close, by report or teardown.
    pub async fn join(self) -> anyhow::Result<()> {
        self.task.await?;
        Ok(())
    }
}
