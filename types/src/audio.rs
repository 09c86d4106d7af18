mod consts;

pub use consts::*;

/// Audio data encoded as base64
pub type Base64EncodedAudioBytes = String;

/// One unit of synthesized speech belonging to a single reply turn.
///
/// Sequence numbers restart at 0 for every turn and may arrive in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSegment {
    sequence: u32,
    payload: Vec<u8>,
}

impl AudioSegment {
    pub fn new(sequence: u32, payload: Vec<u8>) -> Self {
        Self { sequence, payload }
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}
