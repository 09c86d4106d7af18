/// Coarse attention classification produced by the gaze probe on each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GazeClass {
    #[default]
    Ok,
    NoFace,
    Away,
}

impl GazeClass {
    /// Whether this classification should be shown to the candidate as a warning.
    pub fn is_warning(self) -> bool {
        !matches!(self, GazeClass::Ok)
    }

    pub fn message(self) -> Option<&'static str> {
        match self {
            GazeClass::Ok => None,
            GazeClass::NoFace => Some("No face detected!"),
            GazeClass::Away => Some("Please face the camera!"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&GazeClass::NoFace).unwrap(), r#""no_face""#);
        let class: GazeClass = serde_json::from_str(r#""away""#).unwrap();
        assert_eq!(class, GazeClass::Away);
        assert!(class.is_warning());
        assert!(!GazeClass::Ok.is_warning());
        assert_eq!(GazeClass::Ok.message(), None);
    }
}
