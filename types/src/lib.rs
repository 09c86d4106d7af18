pub mod audio;
pub mod events;
pub mod gaze;
pub mod report;
pub mod session;

pub use audio::AudioSegment;
pub use events::StreamRecord;
pub use gaze::GazeClass;
pub use report::{EndInterviewRequest, FeedbackReport, QuestionScore, Report};
pub use session::{AnswerSubmission, InterviewSetup, InterviewType, SessionStarted, Transcription};
