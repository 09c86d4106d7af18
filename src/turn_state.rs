/// Who may act right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    #[default]
    AiSpeaking,
    Idle,
    Recording,
    Processing,
    Ending,
}

impl TurnState {
    pub fn label(self) -> &'static str {
        match self {
            TurnState::AiSpeaking => "AI is speaking…",
            TurnState::Idle => "Your turn",
            TurnState::Recording => "Recording…",
            TurnState::Processing => "Processing…",
            TurnState::Ending => "Generating feedback report…",
        }
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TurnState::AiSpeaking => "ai_speaking",
            TurnState::Idle => "idle",
            TurnState::Recording => "recording",
            TurnState::Processing => "processing",
            TurnState::Ending => "ending",
        };
        f.write_str(name)
    }
}

/// Guards the turn-taking rules. Every method returns whether the transition
/// happened; an invalid request leaves the state untouched.
#[derive(Debug, Default)]
pub struct TurnStateMachine {
    state: TurnState,
}

impl TurnStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    fn transition(&mut self, event: &str, allowed: bool, to: TurnState) -> bool {
        if !allowed {
            tracing::debug!("ignoring {} in state {}", event, self.state);
            return false;
        }
        tracing::debug!("{}: {} -> {}", event, self.state, to);
        self.state = to;
        true
    }

    pub fn playback_drained(&mut self) -> bool {
        let allowed = matches!(self.state, TurnState::AiSpeaking | TurnState::Processing);
        self.transition("playback drained", allowed, TurnState::Idle)
    }

    pub fn begin_recording(&mut self) -> bool {
        let allowed = self.state == TurnState::Idle;
        self.transition("begin recording", allowed, TurnState::Recording)
    }

    pub fn stop_recording(&mut self) -> bool {
        let allowed = self.state == TurnState::Recording;
        self.transition("stop recording", allowed, TurnState::Processing)
    }

    pub fn reply_started(&mut self) -> bool {
        let allowed = self.state == TurnState::Processing;
        self.transition("reply started", allowed, TurnState::AiSpeaking)
    }

    /// Recoverable failure: hand the turn back to the candidate.
    pub fn fail(&mut self) -> bool {
        let allowed = self.state != TurnState::Ending;
        self.transition("failure", allowed, TurnState::Idle)
    }

    pub fn end(&mut self) -> bool {
        let allowed = self.state != TurnState::Ending;
        self.transition("end", allowed, TurnState::Ending)
    }

    /// The report could not be produced; let the candidate retry.
    pub fn report_failed(&mut self) -> bool {
        let allowed = self.state == TurnState::Ending;
        self.transition("report failed", allowed, TurnState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_exchange() {
        let mut machine = TurnStateMachine::new();
        assert_eq!(machine.state(), TurnState::AiSpeaking);

        assert!(machine.playback_drained());
        assert!(machine.begin_recording());
        assert!(machine.stop_recording());
        assert!(machine.reply_started());
        assert!(machine.playback_drained());
        assert_eq!(machine.state(), TurnState::Idle);
    }

    #[test]
    fn test_invalid_transitions_are_noops() {
        let mut machine = TurnStateMachine::new();

        assert!(!machine.begin_recording());
        assert!(!machine.stop_recording());
        assert!(!machine.reply_started());
        assert!(!machine.report_failed());
        assert_eq!(machine.state(), TurnState::AiSpeaking);

        machine.playback_drained();
        assert!(!machine.playback_drained());
        assert!(!machine.stop_recording());
        assert_eq!(machine.state(), TurnState::Idle);
    }

    #[test]
    fn test_drained_while_processing_returns_to_idle() {
        let mut machine = TurnStateMachine::new();
        machine.playback_drained();
        machine.begin_recording();
        machine.stop_recording();

        assert!(machine.playback_drained());
        assert_eq!(machine.state(), TurnState::Idle);
    }

    #[test]
    fn test_ending_is_sticky_until_report_fails() {
        let mut machine = TurnStateMachine::new();
        assert!(machine.end());

        assert!(!machine.end());
        assert!(!machine.fail());
        assert!(!machine.playback_drained());
        assert_eq!(machine.state(), TurnState::Ending);

        assert!(machine.report_failed());
        assert_eq!(machine.state(), TurnState::Idle);
    }

    #[test]
    fn test_failure_from_any_active_state() {
        for setup in [0, 1, 2, 3] {
            let mut machine = TurnStateMachine::new();
            if setup >= 1 {
                machine.playback_drained();
            }
            if setup >= 2 {
                machine.begin_recording();
            }
            if setup >= 3 {
                machine.stop_recording();
            }
            assert!(machine.fail());
            assert_eq!(machine.state(), TurnState::Idle);
        }
    }
}
