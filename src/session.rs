//! The interview session core.
//!
//! [`InterviewSession`] makes every decision of a running interview but performs
//! no I/O. Each [`Input`] (user action, stream event, playback completion, gaze
//! tick, request result) goes through [`InterviewSession::handle`], which
//! answers with the [`Command`]s the runtime has to carry out.

use std::str::FromStr;

use crate::decoder::DecodedEvent;
use crate::error::SessionError;
use crate::gaze::DistractionCounter;
use crate::playback::{PlaybackQueue, PlaybackStep, PlaybackTicket};
use crate::turn_state::{TurnState, TurnStateMachine};
use crate::types::session::{DEFAULT_QUESTIONS, MAX_QUESTIONS, MIN_QUESTIONS};
use crate::types::{AudioSegment, GazeClass, InterviewSetup, Report, SessionStarted};

/// Reply streams that end without a terminal record surface this message.
const STREAM_INTERRUPTED: &str = "Reply stream ended unexpectedly";

/// Represents commands that the session core issues to the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchOpeningAudio { question_index: u32 },
    AcquireMicrophone,
    /// Close the active capture and send the recording for transcription.
    SubmitRecording,
    /// Release the active or pending capture without using it.
    DiscardCapture,
    OpenReplyStream { turn: u64, transcript: String },
    AbortReplyStream,
    Play { ticket: PlaybackTicket, audio: Vec<u8> },
    StopPlayback,
    RequestReport { gaze_warnings: u32 },
    StopGazeProbe,
    Finished(Report),
}

/// Everything that can happen to a session, from any source.
#[derive(Debug)]
pub enum Input {
    StartRecording,
    StopRecording,
    EndNow,
    OpeningAudio(Result<Vec<u8>, String>),
    CaptureStarted(Result<(), String>),
    Level(f32),
    AnswerTranscribed(Result<String, String>),
    Stream { turn: u64, event: DecodedEvent },
    StreamFailed { turn: u64, message: String },
    /// The reply body ended before a terminal record.
    StreamClosed { turn: u64 },
    PlaybackFinished { ticket: PlaybackTicket, outcome: Result<(), String> },
    Gaze(GazeClass),
    ReportReady(Result<Report, String>),
    Teardown,
}

/// What happens to reply audio still queued when the server ends the interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinalAudioPolicy {
    /// Let the closing remarks play out.
    #[default]
    Finish,
    Abandon,
}

impl FromStr for FinalAudioPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "finish" => Ok(FinalAudioPolicy::Finish),
            "abandon" => Ok(FinalAudioPolicy::Abandon),
            other => Err(format!("unknown final audio policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    session_id: String,
    question_index: u32,
    question_budget: u32,
    role: String,
    experience: String,
    interview_type: String,
}

impl SessionInfo {
    pub fn new(session_id: &str, question_budget: u32) -> Self {
        Self {
            session_id: session_id.to_string(),
            question_index: 0,
            question_budget: question_budget.clamp(MIN_QUESTIONS, MAX_QUESTIONS),
            role: String::new(),
            experience: String::new(),
            interview_type: String::new(),
        }
    }

    pub fn from_start(setup: &InterviewSetup, started: &SessionStarted) -> Self {
        Self {
            session_id: started.session_id().to_string(),
            question_index: started.question_index(),
            question_budget: setup.num_questions(),
            role: setup.role().to_string(),
            experience: setup.experience().to_string(),
            interview_type: setup.interview_type().as_str().to_string(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn question_index(&self) -> u32 {
        self.question_index
    }

    pub fn question_budget(&self) -> u32 {
        self.question_budget
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn experience(&self) -> &str {
        &self.experience
    }

    pub fn interview_type(&self) -> &str {
        &self.interview_type
    }
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self::new("", DEFAULT_QUESTIONS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Ai,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    /// Still receiving text from the reply stream.
    pub streaming: bool,
}

impl TranscriptEntry {
    fn sealed(speaker: Speaker, text: &str) -> Self {
        Self {
            speaker,
            text: text.to_string(),
            streaming: false,
        }
    }
}

/// Snapshot of the session for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub state: TurnState,
    pub status: &'static str,
    pub question_count: u32,
    pub question_budget: u32,
    /// `question_count / question_budget` as a percentage, capped at 100.
    pub progress: u8,
    pub transcript: Vec<TranscriptEntry>,
    pub error: Option<String>,
    pub distractions: u32,
    pub gaze_warning: Option<&'static str>,
    pub mic_level: f32,
    pub can_record: bool,
    pub can_stop: bool,
    pub can_end_now: bool,
    pub finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    None,
    Acquiring,
    Active,
}

pub struct InterviewSession {
    info: SessionInfo,
    machine: TurnStateMachine,
    playback: PlaybackQueue,
    distraction: DistractionCounter,
    final_audio: FinalAudioPolicy,
    question_count: u32,
    turns: u64,
    open_stream: Option<u64>,
    streaming_entry: Option<usize>,
    transcript: Vec<TranscriptEntry>,
    error: Option<SessionError>,
    capture: Capture,
    awaiting_transcript: bool,
    opening_pending: bool,
    report_after_drain: bool,
    mic_level: f32,
    finished: bool,
    torn_down: bool,
}

impl InterviewSession {
    pub fn new(info: SessionInfo, opening_question: &str) -> Self {
        Self {
            info,
            machine: TurnStateMachine::new(),
            playback: PlaybackQueue::new(),
            distraction: DistractionCounter::new(),
            final_audio: FinalAudioPolicy::default(),
            question_count: 1,
            turns: 0,
            open_stream: None,
            streaming_entry: None,
            transcript: vec![TranscriptEntry::sealed(Speaker::Ai, opening_question)],
            error: None,
            capture: Capture::None,
            awaiting_transcript: false,
            opening_pending: false,
            report_after_drain: false,
            mic_level: 0.0,
            finished: false,
            torn_down: false,
        }
    }

    pub fn from_start(setup: &InterviewSetup, started: &SessionStarted) -> Self {
        let mut session = Self::new(SessionInfo::from_start(setup, started), started.question());
        session.question_count = started.question_count().max(1);
        session
    }

    pub fn with_final_audio(mut self, policy: FinalAudioPolicy) -> Self {
        self.final_audio = policy;
        self
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn state(&self) -> TurnState {
        self.machine.state()
    }

    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    pub fn distractions(&self) -> u32 {
        self.distraction.count()
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    /// Finished with a report, or torn down. No further input has any effect.
    pub fn is_closed(&self) -> bool {
        self.finished || self.torn_down
    }

    /// The opening question is played as a one-segment turn.
    pub fn start(&mut self) -> Vec<Command> {
        self.playback.begin_turn();
        self.opening_pending = true;
        vec![Command::FetchOpeningAudio {
            question_index: self.info.question_index,
        }]
    }

    pub fn handle(&mut self, input: Input) -> Vec<Command> {
        if self.is_closed() {
            return match input {
                Input::CaptureStarted(Ok(())) => vec![Command::DiscardCapture],
                _ => Vec::new(),
            };
        }

        match input {
            Input::StartRecording => self.start_recording(),
            Input::StopRecording => self.stop_recording(),
            Input::EndNow => self.end_now(),
            Input::OpeningAudio(result) => self.opening_audio(result),
            Input::CaptureStarted(result) => self.capture_started(result),
            Input::Level(level) => {
                if self.capture == Capture::Active {
                    self.mic_level = level.clamp(0.0, 1.0);
                }
                Vec::new()
            }
            Input::AnswerTranscribed(result) => self.answer_transcribed(result),
            Input::Stream { turn, event } => {
                if self.open_stream != Some(turn) {
                    tracing::debug!("ignoring {:?} from closed stream {}", event, turn);
                    return Vec::new();
                }
                self.stream_event(event)
            }
            Input::StreamFailed { turn, message } => {
                if self.open_stream != Some(turn) {
                    return Vec::new();
                }
                tracing::warn!("reply stream {} failed: {}", turn, message);
                self.fail_reply(SessionError::Transport(message))
            }
            Input::StreamClosed { turn } => {
                if self.open_stream != Some(turn) {
                    return Vec::new();
                }
                tracing::warn!("reply stream {} ended without a terminal record", turn);
                self.fail_reply(SessionError::Transport(STREAM_INTERRUPTED.to_string()))
            }
            Input::PlaybackFinished { ticket, outcome } => {
                if let Err(e) = outcome {
                    tracing::warn!("segment {} failed to play: {}", ticket.sequence(), e);
                }
                let step = self.playback.complete(ticket);
                self.apply_step(step)
            }
            Input::Gaze(class) => {
                if self.machine.state() != TurnState::Ending && self.distraction.observe(class) {
                    tracing::info!("distraction #{}: {:?}", self.distraction.count(), class);
                }
                Vec::new()
            }
            Input::ReportReady(result) => self.report_ready(result),
            Input::Teardown => self.teardown(),
        }
    }

    fn start_recording(&mut self) -> Vec<Command> {
        if self.machine.state() != TurnState::Idle || self.capture != Capture::None {
            tracing::debug!("cannot record in state {}", self.machine.state());
            return Vec::new();
        }
        self.error = None;
        self.capture = Capture::Acquiring;
        vec![Command::AcquireMicrophone]
    }

    fn capture_started(&mut self, result: Result<(), String>) -> Vec<Command> {
        let acquiring = self.capture == Capture::Acquiring;
        match result {
            Ok(()) if acquiring && self.machine.begin_recording() => {
                self.capture = Capture::Active;
                Vec::new()
            }
            Ok(()) => {
                tracing::debug!("capture opened after it was no longer wanted");
                if acquiring {
                    self.capture = Capture::None;
                }
                vec![Command::DiscardCapture]
            }
            Err(detail) => {
                if acquiring {
                    tracing::warn!("microphone unavailable: {}", detail);
                    self.capture = Capture::None;
                    self.error = Some(SessionError::MicrophoneUnavailable(detail));
                }
                Vec::new()
            }
        }
    }

    fn stop_recording(&mut self) -> Vec<Command> {
        if !self.machine.stop_recording() {
            return Vec::new();
        }
        self.error = None;
        self.capture = Capture::None;
        self.mic_level = 0.0;
        self.awaiting_transcript = true;
        vec![Command::SubmitRecording]
    }

    fn answer_transcribed(&mut self, result: Result<String, String>) -> Vec<Command> {
        if !self.awaiting_transcript || self.machine.state() != TurnState::Processing {
            return Vec::new();
        }
        self.awaiting_transcript = false;

        let transcript = match result {
            Ok(transcript) => transcript,
            Err(message) => {
                tracing::warn!("transcription failed: {}", message);
                self.machine.fail();
                self.error = Some(SessionError::Transport(message));
                return Vec::new();
            }
        };

        self.transcript
            .push(TranscriptEntry::sealed(Speaker::User, &transcript));
        self.transcript.push(TranscriptEntry {
            speaker: Speaker::Ai,
            text: String::new(),
            streaming: true,
        });
        self.streaming_entry = Some(self.transcript.len() - 1);

        self.turns += 1;
        self.open_stream = Some(self.turns);
        self.playback.begin_turn();
        vec![Command::OpenReplyStream {
            turn: self.turns,
            transcript,
        }]
    }

    fn stream_event(&mut self, event: DecodedEvent) -> Vec<Command> {
        match event {
            DecodedEvent::Text { full } => {
                self.machine.reply_started();
                if let Some(entry) = self.streaming_entry.and_then(|i| self.transcript.get_mut(i)) {
                    entry.text = full;
                }
                Vec::new()
            }
            DecodedEvent::Audio(segment) => {
                self.machine.reply_started();
                let step = self.playback.submit(segment);
                self.apply_step(step)
            }
            DecodedEvent::Done {
                question_count,
                text,
            } => {
                if let Some(entry) = self
                    .streaming_entry
                    .take()
                    .and_then(|i| self.transcript.get_mut(i))
                {
                    entry.text = text;
                    entry.streaming = false;
                }
                self.open_stream = None;
                if question_count > self.question_count {
                    self.question_count = question_count;
                } else {
                    tracing::debug!(
                        "keeping question count {} over {}",
                        self.question_count,
                        question_count
                    );
                }
                let step = self.playback.mark_exhausted();
                self.apply_step(step)
            }
            DecodedEvent::InterviewDone => {
                tracing::info!("interviewer closed the session");
                self.remove_streaming_entry();
                self.open_stream = None;
                match self.final_audio {
                    FinalAudioPolicy::Finish => {
                        // The report is requested once the closing audio has played out.
                        if !self.machine.end() {
                            return Vec::new();
                        }
                        self.report_after_drain = true;
                        let step = self.playback.mark_exhausted();
                        self.apply_step(step)
                    }
                    FinalAudioPolicy::Abandon => {
                        let mut commands = self.stop_playback();
                        commands.extend(self.begin_ending());
                        commands
                    }
                }
            }
            DecodedEvent::Error { message } => {
                tracing::warn!("server error: {}", message);
                self.fail_reply(SessionError::Server(message))
            }
        }
    }

    fn opening_audio(&mut self, result: Result<Vec<u8>, String>) -> Vec<Command> {
        if !self.opening_pending {
            return Vec::new();
        }
        self.opening_pending = false;

        let mut commands = Vec::new();
        match result {
            Ok(audio) => {
                let step = self.playback.submit(AudioSegment::new(0, audio));
                commands.extend(self.apply_step(step));
            }
            Err(e) => tracing::warn!("opening question audio unavailable: {}", e),
        }
        let step = self.playback.mark_exhausted();
        commands.extend(self.apply_step(step));
        commands
    }

    fn end_now(&mut self) -> Vec<Command> {
        if self.machine.state() == TurnState::Ending {
            return Vec::new();
        }
        if self.question_count < 2 {
            tracing::debug!("end now rejected before the first answer");
            return Vec::new();
        }
        self.error = None;

        let mut commands = Vec::new();
        if self.capture != Capture::None {
            self.capture = Capture::None;
            self.mic_level = 0.0;
            commands.push(Command::DiscardCapture);
        }
        self.awaiting_transcript = false;
        if self.open_stream.take().is_some() {
            self.remove_streaming_entry();
            commands.push(Command::AbortReplyStream);
        }
        commands.extend(self.stop_playback());
        commands.extend(self.begin_ending());
        commands
    }

    fn begin_ending(&mut self) -> Vec<Command> {
        if !self.machine.end() {
            return Vec::new();
        }
        self.report_request()
    }

    fn report_request(&self) -> Vec<Command> {
        vec![Command::RequestReport {
            gaze_warnings: self.distraction.count(),
        }]
    }

    fn report_ready(&mut self, result: Result<Report, String>) -> Vec<Command> {
        if self.machine.state() != TurnState::Ending {
            return Vec::new();
        }
        match result {
            Ok(report) => {
                self.finished = true;
                vec![Command::StopGazeProbe, Command::Finished(report)]
            }
            Err(message) => {
                tracing::warn!("report failed: {}", message);
                self.machine.report_failed();
                self.error = Some(SessionError::Report(message));
                Vec::new()
            }
        }
    }

    fn teardown(&mut self) -> Vec<Command> {
        self.torn_down = true;
        self.report_after_drain = false;
        let mut commands = Vec::new();
        if self.capture != Capture::None {
            self.capture = Capture::None;
            commands.push(Command::DiscardCapture);
        }
        self.awaiting_transcript = false;
        if self.open_stream.take().is_some() {
            commands.push(Command::AbortReplyStream);
        }
        commands.extend(self.stop_playback());
        commands.push(Command::StopGazeProbe);
        commands
    }

    fn fail_reply(&mut self, error: SessionError) -> Vec<Command> {
        self.remove_streaming_entry();
        self.open_stream = None;
        let mut commands = vec![Command::AbortReplyStream];
        commands.extend(self.stop_playback());
        self.machine.fail();
        self.error = Some(error);
        commands
    }

    fn stop_playback(&mut self) -> Vec<Command> {
        match self.playback.abandon() {
            Some(_) => vec![Command::StopPlayback],
            None => Vec::new(),
        }
    }

    fn remove_streaming_entry(&mut self) {
        if let Some(index) = self.streaming_entry.take() {
            if index < self.transcript.len() {
                self.transcript.remove(index);
            }
        }
    }

    fn apply_step(&mut self, step: Option<PlaybackStep>) -> Vec<Command> {
        match step {
            Some(PlaybackStep::Play { ticket, audio }) => vec![Command::Play { ticket, audio }],
            Some(PlaybackStep::Drained) => {
                self.machine.playback_drained();
                if std::mem::take(&mut self.report_after_drain) {
                    return self.report_request();
                }
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    pub fn view(&self) -> SessionView {
        let state = self.machine.state();
        let budget = self.info.question_budget.max(1);
        let progress = (self.question_count as f32 / budget as f32 * 100.0)
            .round()
            .min(100.0) as u8;
        let closed = self.is_closed();

        SessionView {
            state,
            status: state.label(),
            question_count: self.question_count,
            question_budget: self.info.question_budget,
            progress,
            transcript: self.transcript.clone(),
            error: self.error.as_ref().map(|e| e.to_string()),
            distractions: self.distraction.count(),
            gaze_warning: self.distraction.last().message(),
            mic_level: self.mic_level,
            can_record: !closed && state == TurnState::Idle && self.capture == Capture::None,
            can_stop: !closed && state == TurnState::Recording,
            can_end_now: !closed && state != TurnState::Ending && self.question_count >= 2,
            finished: self.finished,
        }
    }
}
