use serde::{Deserialize, Serialize};

/// Body of the end-of-session request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndInterviewRequest {
    session_id: String,
    gaze_warnings: u32,
}

impl EndInterviewRequest {
    pub fn new(session_id: &str, gaze_warnings: u32) -> Self {
        Self {
            session_id: session_id.to_string(),
            gaze_warnings,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn gaze_warnings(&self) -> u32 {
        self.gaze_warnings
    }
}

/// The end-of-session report exactly as the server returned it.
///
/// The orchestrator treats it as opaque and hands it over untouched; renderers
/// that know the current schema can ask for [`FeedbackReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report(serde_json::Value);

impl Report {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn raw(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn feedback(&self) -> Result<FeedbackReport, serde_json::Error> {
        FeedbackReport::deserialize(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReport {
    pub overall_score: u32,
    pub grade: String,
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub question_scores: Vec<QuestionScore>,
    pub recommendation: String,
    #[serde(default)]
    pub recommendation_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionScore {
    pub question: String,
    pub answer: String,
    pub score: u32,
    pub feedback: String,
    #[serde(default)]
    pub ideal_answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_request_wire_shape() {
        let body = serde_json::to_value(EndInterviewRequest::new("s-1", 3)).unwrap();
        assert_eq!(body, serde_json::json!({"session_id": "s-1", "gaze_warnings": 3}));
    }

    #[test]
    fn test_report_stays_opaque_but_can_be_typed() {
        let raw = serde_json::json!({
            "overall_score": 72,
            "grade": "B",
            "summary": "Solid answers.",
            "strengths": ["clear"],
            "improvements": ["depth"],
            "question_scores": [{
                "question": "Q1",
                "answer": "A1",
                "score": 7,
                "feedback": "ok",
                "ideal_answer": "more"
            }],
            "recommendation": "Yes",
            "recommendation_reason": "Good fit.",
            "extra_field": true
        });
        let report: Report = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(report.raw(), &raw);

        let feedback = report.feedback().unwrap();
        assert_eq!(feedback.overall_score, 72);
        assert_eq!(feedback.question_scores.len(), 1);
        assert_eq!(feedback.question_scores[0].score, 7);

        let unknown = Report::new(serde_json::json!({"verdict": "n/a"}));
        assert!(unknown.feedback().is_err());
    }
}
