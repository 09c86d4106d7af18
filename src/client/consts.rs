pub const INTERVIEW_API_URL: &str = "INTERVIEW_API_URL";

pub const BASE_URL: &str = "http://localhost:8000";

pub const START_INTERVIEW_PATH: &str = "/api/start-interview";
pub const TTS_PATH: &str = "/api/tts";
pub const TRANSCRIBE_PATH: &str = "/api/transcribe";
pub const RESPOND_STREAM_PATH: &str = "/api/respond-stream";
pub const END_INTERVIEW_PATH: &str = "/api/end-interview";
pub const SESSION_PATH: &str = "/api/session";

pub const TRANSCRIPTION_FAILED: &str = "Transcription failed";
pub const STREAM_REQUEST_FAILED: &str = "Stream request failed";
pub const FEEDBACK_FAILED: &str = "Failed to generate feedback";
