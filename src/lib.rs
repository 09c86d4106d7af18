mod client;

pub mod api;
pub mod decoder;
pub mod error;
pub mod gaze;
pub mod media;
pub mod orchestrator;
pub mod playback;
pub mod session;
pub mod turn_state;

pub use interview_realtime_types as types;
pub use client::{connect, connect_with_config, Client, Config, ConfigBuilder, ResumeUpload, Stats};
pub use error::SessionError;
pub use orchestrator::{OrchestratorConfig, OrchestratorHandle, SessionOrchestrator};
pub use session::{Command, FinalAudioPolicy, Input, InterviewSession, SessionView};
pub use turn_state::TurnState;

#[cfg(feature = "utils")]
pub use interview_realtime_utils as utils;
