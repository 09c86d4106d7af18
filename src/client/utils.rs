use std::path::Path;

use anyhow::Context;
use reqwest::multipart::{Form, Part};

use crate::client::config::Config;
use crate::media::RecordedAudio;
use crate::types::InterviewSetup;

pub fn endpoint(config: &Config, path: &str) -> String {
    format!("{}{}", config.base_url(), path)
}

pub fn tts_url(config: &Config, session_id: &str, question_index: u32) -> String {
    format!("{}/{}/{}", endpoint(config, super::consts::TTS_PATH), session_id, question_index)
}

pub fn session_url(config: &Config, session_id: &str) -> String {
    format!("{}/{}", endpoint(config, super::consts::SESSION_PATH), session_id)
}

/// A resume attached to the start-interview form.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeUpload {
    file_name: String,
    bytes: Vec<u8>,
}

impl ResumeUpload {
    pub fn new(file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read resume {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("resume")
            .to_string();
        Ok(Self { file_name, bytes })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn mime(&self) -> &'static str {
        match Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("pdf") => "application/pdf",
            Some("docx") => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Some("txt") => "text/plain",
            _ => "application/octet-stream",
        }
    }
}

pub fn start_form(setup: &InterviewSetup, resume: Option<ResumeUpload>) -> anyhow::Result<Form> {
    let mut form = Form::new()
        .text("role", setup.role().to_string())
        .text("experience", setup.experience().to_string())
        .text("interview_type", setup.interview_type().as_str().to_string())
        .text("job_description", setup.job_description().to_string())
        .text("num_questions", setup.num_questions().to_string());

    if let Some(resume) = resume {
        let mime = resume.mime();
        let part = Part::bytes(resume.bytes)
            .file_name(resume.file_name)
            .mime_str(mime)?;
        form = form.part("resume", part);
    }
    Ok(form)
}

pub fn audio_form(audio: RecordedAudio) -> anyhow::Result<Form> {
    let file_name = audio.file_name();
    let mime = audio.format().mime().to_string();
    let part = Part::bytes(audio.into_bytes())
        .file_name(file_name)
        .mime_str(&mime)?;
    Ok(Form::new().part("audio", part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_urls_are_built_from_base() {
        let config = Config::builder().with_base_url("http://host:8000").build();
        assert_eq!(tts_url(&config, "abc", 2), "http://host:8000/api/tts/abc/2");
        assert_eq!(session_url(&config, "abc"), "http://host:8000/api/session/abc");
        assert_eq!(
            endpoint(&config, crate::client::consts::RESPOND_STREAM_PATH),
            "http://host:8000/api/respond-stream"
        );
    }

    #[test]
    fn test_resume_from_path_reads_name_and_bytes() {
        // --- Arrange ---
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.PDF");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"%PDF-1.4").unwrap();

        // --- Act ---
        let resume = ResumeUpload::from_path(&path).unwrap();

        // --- Assert ---
        assert_eq!(resume.file_name(), "cv.PDF");
        assert_eq!(resume.bytes(), b"%PDF-1.4");
        assert_eq!(resume.mime(), "application/pdf");
    }

    #[test]
    fn test_missing_resume_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let error = ResumeUpload::from_path(&dir.path().join("absent.pdf")).unwrap_err();
        assert!(error.to_string().contains("failed to read resume"));
    }
}
