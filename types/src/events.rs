mod server;

pub use server::*;

/// One record of the reply stream, i.e. the JSON carried by a `data: ` line.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum StreamRecord {
    #[serde(rename = "text")]
    Text(TextEvent),
    #[serde(rename = "audio")]
    Audio(AudioEvent),
    #[serde(rename = "done")]
    Done(DoneEvent),
    #[serde(rename = "interview_done", alias = "done_interview")]
    InterviewDone,
    #[serde(rename = "error")]
    Error(ErrorEvent),
}

impl StreamRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            StreamRecord::Text(_) => "text",
            StreamRecord::Audio(_) => "audio",
            StreamRecord::Done(_) => "done",
            StreamRecord::InterviewDone => "interview_done",
            StreamRecord::Error(_) => "error",
        }
    }

    /// Whether the record ends the stream it arrived on.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamRecord::Done(_) | StreamRecord::InterviewDone | StreamRecord::Error(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_each_kind() {
        let record: StreamRecord =
            serde_json::from_str(r#"{"type":"text","content":"Hello"}"#).unwrap();
        assert_eq!(record, StreamRecord::Text(TextEvent::new("Hello")));

        let record: StreamRecord =
            serde_json::from_str(r#"{"type":"audio","order":3,"audio_b64":"AAE="}"#).unwrap();
        match record {
            StreamRecord::Audio(audio) => {
                assert_eq!(audio.order(), 3);
                assert_eq!(audio.audio_b64(), "AAE=");
            }
            other => panic!("expected audio, got {:?}", other),
        }

        let record: StreamRecord =
            serde_json::from_str(r#"{"type":"done","question_count":2}"#).unwrap();
        assert_eq!(record, StreamRecord::Done(DoneEvent::new(2)));
        assert!(record.is_terminal());

        let record: StreamRecord =
            serde_json::from_str(r#"{"type":"error","message":"boom"}"#).unwrap();
        assert_eq!(record, StreamRecord::Error(ErrorEvent::new("boom")));
    }

    #[test]
    fn test_interview_done_accepts_both_spellings() {
        let record: StreamRecord = serde_json::from_str(r#"{"type":"interview_done"}"#).unwrap();
        assert_eq!(record, StreamRecord::InterviewDone);

        let record: StreamRecord = serde_json::from_str(r#"{"type":"done_interview"}"#).unwrap();
        assert_eq!(record, StreamRecord::InterviewDone);
        assert_eq!(record.kind(), "interview_done");
    }

    #[test]
    fn test_rejects_malformed_records() {
        assert!(serde_json::from_str::<StreamRecord>(r#"{"type":"video","url":"x"}"#).is_err());
        assert!(serde_json::from_str::<StreamRecord>(r#"{"type":"text"}"#).is_err());
        assert!(
            serde_json::from_str::<StreamRecord>(r#"{"type":"audio","order":-1,"audio_b64":""}"#)
                .is_err()
        );
        assert!(serde_json::from_str::<StreamRecord>(r#"{"content":"no type"}"#).is_err());
    }
}
