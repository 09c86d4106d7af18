use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Smallest and largest question budget a session may be configured with.
pub const MIN_QUESTIONS: u32 = 1;
pub const MAX_QUESTIONS: u32 = 15;
pub const DEFAULT_QUESTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum InterviewType {
    Technical,
    Behavioral,
    Mixed,
    Custom(String),
}

impl InterviewType {
    pub fn as_str(&self) -> &str {
        match self {
            InterviewType::Technical => "technical",
            InterviewType::Behavioral => "behavioral",
            InterviewType::Mixed => "mixed",
            InterviewType::Custom(s) => s,
        }
    }
}

impl std::fmt::Display for InterviewType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for InterviewType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for InterviewType {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "technical" => InterviewType::Technical,
            "behavioral" | "behavioural" => InterviewType::Behavioral,
            "mixed" => InterviewType::Mixed,
            _ => InterviewType::Custom(s.to_string()),
        })
    }
}

impl<'de> Deserialize<'de> for InterviewType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        InterviewType::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// What the candidate chose on the setup screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSetup {
    role: String,
    experience: String,
    interview_type: InterviewType,
    #[serde(default)]
    job_description: String,
    num_questions: u32,
}

impl InterviewSetup {
    pub fn builder() -> InterviewSetupBuilder {
        InterviewSetupBuilder::new()
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn experience(&self) -> &str {
        &self.experience
    }

    pub fn interview_type(&self) -> &InterviewType {
        &self.interview_type
    }

    pub fn job_description(&self) -> &str {
        &self.job_description
    }

    pub fn num_questions(&self) -> u32 {
        self.num_questions
    }
}

pub struct InterviewSetupBuilder {
    setup: InterviewSetup,
}

impl Default for InterviewSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InterviewSetupBuilder {
    pub fn new() -> Self {
        Self {
            setup: InterviewSetup {
                role: String::new(),
                experience: String::new(),
                interview_type: InterviewType::Mixed,
                job_description: String::new(),
                num_questions: DEFAULT_QUESTIONS,
            },
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.setup.role = role.trim().to_string();
        self
    }

    pub fn with_experience(mut self, experience: &str) -> Self {
        self.setup.experience = experience.to_string();
        self
    }

    pub fn with_interview_type(mut self, interview_type: InterviewType) -> Self {
        self.setup.interview_type = interview_type;
        self
    }

    pub fn with_job_description(mut self, job_description: &str) -> Self {
        self.setup.job_description = job_description.to_string();
        self
    }

    /// Sets the question budget, clamped to `MIN_QUESTIONS..=MAX_QUESTIONS`.
    pub fn with_num_questions(mut self, num_questions: u32) -> Self {
        self.setup.num_questions = num_questions.clamp(MIN_QUESTIONS, MAX_QUESTIONS);
        self
    }

    /// Returns `None` while a required field is still empty.
    pub fn build(self) -> Option<InterviewSetup> {
        if self.setup.role.is_empty() || self.setup.experience.is_empty() {
            return None;
        }
        Some(self.setup)
    }
}

/// Response of the start-interview endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStarted {
    session_id: String,

    /// Text of the opening question; its audio is cached server-side
    question: String,

    question_index: u32,

    #[serde(default = "first_question")]
    question_count: u32,
}

fn first_question() -> u32 {
    1
}

impl SessionStarted {
    pub fn new(session_id: &str, question: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            question: question.to_string(),
            question_index: 0,
            question_count: 1,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn question_index(&self) -> u32 {
        self.question_index
    }

    pub fn question_count(&self) -> u32 {
        self.question_count
    }
}

/// Body of the reply-stream request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    session_id: String,
    transcript: String,
}

impl AnswerSubmission {
    pub fn new(session_id: &str, transcript: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            transcript: transcript.to_string(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}

/// Response of the transcription endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    #[serde(default)]
    transcript: String,
}

impl Transcription {
    pub fn new(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
        }
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn into_transcript(self) -> String {
        self.transcript
    }
}
