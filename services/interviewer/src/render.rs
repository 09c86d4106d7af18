//! Turns session snapshots into terminal lines, printing only what changed.

use interview_realtime::session::{SessionView, Speaker};
use interview_realtime::types::Report;
use interview_realtime::TurnState;

const METER_WIDTH: usize = 20;

#[derive(Debug, Default)]
pub struct Renderer {
    printed: usize,
    status: Option<&'static str>,
    question_count: u32,
    error: Option<String>,
    distractions: u32,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print for `view` since the previous call.
    pub fn render(&mut self, view: &SessionView) -> Vec<String> {
        let mut lines = Vec::new();

        // sealed entries form a stable prefix of the transcript
        for entry in view.transcript.iter().skip(self.printed) {
            if entry.streaming {
                break;
            }
            let speaker = match entry.speaker {
                Speaker::Ai => "Interviewer",
                Speaker::User => "You",
            };
            lines.push(format!("{}: {}", speaker, entry.text));
            self.printed += 1;
        }

        if view.question_count != self.question_count {
            self.question_count = view.question_count;
            lines.push(format!(
                "Q {} / {} ({}%)",
                view.question_count, view.question_budget, view.progress
            ));
        }

        if view.distractions != self.distractions {
            self.distractions = view.distractions;
            let warning = view.gaze_warning.unwrap_or("Looked away");
            lines.push(format!("{} ({} look-aways)", warning, view.distractions));
        }

        if view.error != self.error {
            if let Some(error) = &view.error {
                lines.push(format!("Error: {}", error));
            }
            self.error = view.error.clone();
        }

        if self.status != Some(view.status) {
            self.status = Some(view.status);
            lines.push(format!("[{}]{}", view.status, hint(view)));
        }

        lines
    }
}

fn hint(view: &SessionView) -> String {
    let mut hints = Vec::new();
    if view.can_record {
        hints.push("Enter to answer");
    }
    if view.can_stop {
        hints.push("Enter to stop");
    }
    if view.can_end_now {
        hints.push("'end' to finish");
    }
    if hints.is_empty() {
        String::new()
    } else {
        format!(" {}", hints.join(", "))
    }
}

/// One-line level meter, shown only while recording.
pub fn meter(view: &SessionView) -> Option<String> {
    if view.state != TurnState::Recording {
        return None;
    }
    let filled = (view.mic_level.clamp(0.0, 1.0) * METER_WIDTH as f32).round() as usize;
    Some(format!(
        "[{}{}]",
        "#".repeat(filled),
        " ".repeat(METER_WIDTH - filled)
    ))
}

pub fn report_summary(report: &Report) -> String {
    let feedback = match report.feedback() {
        Ok(feedback) => feedback,
        Err(e) => {
            tracing::debug!("report has an unexpected shape: {}", e);
            return serde_json::to_string_pretty(report.raw()).unwrap_or_default();
        }
    };

    let mut out = vec![
        format!("Overall: {} ({})", feedback.overall_score, feedback.grade),
        feedback.summary.clone(),
    ];
    if !feedback.strengths.is_empty() {
        out.push("Strengths:".to_string());
        out.extend(feedback.strengths.iter().map(|s| format!("  + {}", s)));
    }
    if !feedback.improvements.is_empty() {
        out.push("To improve:".to_string());
        out.extend(feedback.improvements.iter().map(|s| format!("  - {}", s)));
    }
    for (i, score) in feedback.question_scores.iter().enumerate() {
        out.push(format!("Q{} [{}/10] {}", i + 1, score.score, score.question));
        out.push(format!("    {}", score.feedback));
    }
    out.push(format!(
        "Recommendation: {} {}",
        feedback.recommendation, feedback.recommendation_reason
    ));
    out.join("\n")
}
