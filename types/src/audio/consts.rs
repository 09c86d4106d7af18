use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Sample rate of the recorded answer uploaded for transcription.
pub const TRANSCRIPTION_SAMPLE_RATE: u32 = 16000;

/// Container formats exchanged with the interview server.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioFormat {
    Mpeg,
    Wav,
    Webm,
    Custom(String),
}

impl AudioFormat {
    pub fn mime(&self) -> &str {
        match self {
            AudioFormat::Mpeg => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Webm => "audio/webm",
            AudioFormat::Custom(s) => s,
        }
    }

    pub fn extension(&self) -> &str {
        match self {
            AudioFormat::Mpeg => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Webm => "webm",
            AudioFormat::Custom(_) => "bin",
        }
    }
}

impl Serialize for AudioFormat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.mime())
    }
}

impl FromStr for AudioFormat {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "audio/mpeg" | "audio/mp3" => AudioFormat::Mpeg,
            "audio/wav" | "audio/x-wav" => AudioFormat::Wav,
            "audio/webm" => AudioFormat::Webm,
            _ => AudioFormat::Custom(s.to_string()),
        })
    }
}

impl<'de> Deserialize<'de> for AudioFormat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        AudioFormat::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::AudioFormat;

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct Upload {
        #[serde(skip_serializing_if = "Option::is_none")]
        format: Option<AudioFormat>,
    }

    #[test]
    fn test_serialize() {
        let upload = Upload {
            format: Some(AudioFormat::Wav),
        };
        let json = serde_json::to_string(&upload).unwrap();
        assert_eq!(json, r#"{"format":"audio/wav"}"#);

        let upload = Upload { format: None };
        let json = serde_json::to_string(&upload).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_deserialize() {
        let upload: Upload = serde_json::from_str(r#"{"format":"audio/mp3"}"#).unwrap();
        assert_eq!(upload.format, Some(AudioFormat::Mpeg));

        let upload: Upload = serde_json::from_str(r#"{"format":"audio/ogg"}"#).unwrap();
        assert_eq!(
            upload.format,
            Some(AudioFormat::Custom("audio/ogg".to_string()))
        );
        assert_eq!(upload.format.unwrap().extension(), "bin");
    }
}
