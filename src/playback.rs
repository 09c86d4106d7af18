//! Ordered, one-at-a-time playback of a turn's audio segments.
//!
//! The queue never touches a device. It answers every event with at most one
//! [`PlaybackStep`]; the caller plays the audio and reports back through
//! [`PlaybackQueue::complete`].

use std::collections::BTreeMap;

use crate::types::AudioSegment;

/// Identifies one started playback. Completions carrying any other ticket are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackTicket {
    turn: u64,
    sequence: u32,
}

impl PlaybackTicket {
    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackStep {
    /// Start playing `audio`; report the ticket back when it ends.
    Play { ticket: PlaybackTicket, audio: Vec<u8> },
    /// Nothing playing, nothing buffered and no more segments will arrive.
    Drained,
}

#[derive(Debug, Default)]
pub struct PlaybackQueue {
    turn: u64,
    next_expected: u32,
    pending: BTreeMap<u32, Vec<u8>>,
    playing: Option<PlaybackTicket>,
    exhausted: bool,
    drained_reported: bool,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn playing(&self) -> Option<PlaybackTicket> {
        self.playing
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Starts a new turn. A segment of the previous turn that is still playing
    /// keeps the queue busy until its completion arrives.
    pub fn begin_turn(&mut self) {
        if !self.pending.is_empty() {
            tracing::warn!(
                "dropping {} buffered segments of turn {}",
                self.pending.len(),
                self.turn
            );
        }
        self.turn += 1;
        self.next_expected = 0;
        self.pending.clear();
        self.exhausted = false;
        self.drained_reported = false;
    }

    pub fn submit(&mut self, segment: AudioSegment) -> Option<PlaybackStep> {
        let sequence = segment.sequence();
        if self.exhausted {
            tracing::warn!("segment {} arrived after turn {} was exhausted, dropping", sequence, self.turn);
            return None;
        }
        if sequence < self.next_expected || self.pending.contains_key(&sequence) {
            tracing::warn!("duplicate segment {} in turn {}, dropping", sequence, self.turn);
            return None;
        }
        self.pending.insert(sequence, segment.into_payload());
        self.pump()
    }

    /// No more segments will be submitted for the current turn.
    pub fn mark_exhausted(&mut self) -> Option<PlaybackStep> {
        self.exhausted = true;
        self.pump()
    }

    /// The segment behind `ticket` stopped playing, whether it finished or failed.
    pub fn complete(&mut self, ticket: PlaybackTicket) -> Option<PlaybackStep> {
        if self.playing != Some(ticket) {
            tracing::debug!("ignoring stale completion {:?}", ticket);
            return None;
        }
        self.playing = None;
        self.pump()
    }

    /// Drops everything buffered and suppresses the drained report for the
    /// current turn. Returns the ticket still playing, which the caller should stop.
    pub fn abandon(&mut self) -> Option<PlaybackTicket> {
        self.pending.clear();
        self.exhausted = true;
        self.drained_reported = true;
        self.playing.take()
    }

    fn pump(&mut self) -> Option<PlaybackStep> {
        if self.playing.is_some() {
            return None;
        }
        if let Some(audio) = self.pending.remove(&self.next_expected) {
            let ticket = PlaybackTicket {
                turn: self.turn,
                sequence: self.next_expected,
            };
            self.next_expected += 1;
            self.playing = Some(ticket);
            return Some(PlaybackStep::Play { ticket, audio });
        }
        if self.exhausted && !self.drained_reported {
            if !self.pending.is_empty() {
                tracing::warn!(
                    "segment {} of turn {} never arrived, releasing {} buffered segments",
                    self.next_expected,
                    self.turn,
                    self.pending.len()
                );
                self.pending.clear();
            }
            self.drained_reported = true;
            return Some(PlaybackStep::Drained);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(sequence: u32) -> AudioSegment {
        AudioSegment::new(sequence, vec![sequence as u8])
    }

    fn permutations(items: Vec<u32>) -> Vec<Vec<u32>> {
        if items.len() <= 1 {
            return vec![items];
        }
        let mut all = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.clone();
            let head = rest.remove(i);
            for mut tail in permutations(rest) {
                tail.insert(0, head);
                all.push(tail);
            }
        }
        all
    }

    /// Plays out the queue, completing each segment as soon as it starts when
    /// `eager` is set, or only after every segment was submitted otherwise.
    fn run(order: &[u32], eager: bool) -> (Vec<u32>, usize) {
        let mut queue = PlaybackQueue::new();
        queue.begin_turn();
        let mut played = Vec::new();
        let mut drained = 0;
        let mut current = None;

        let mut apply = |step: Option<PlaybackStep>, current: &mut Option<PlaybackTicket>| match step {
            Some(PlaybackStep::Play { ticket, audio }) => {
                assert!(current.is_none(), "two segments playing at once");
                assert_eq!(audio, vec![ticket.sequence() as u8]);
                played.push(ticket.sequence());
                *current = Some(ticket);
            }
            Some(PlaybackStep::Drained) => drained += 1,
            None => {}
        };

        for sequence in order {
            let step = queue.submit(segment(*sequence));
            apply(step, &mut current);
            while eager {
                let Some(ticket) = current.take() else { break };
                let step = queue.complete(ticket);
                apply(step, &mut current);
            }
        }
        let step = queue.mark_exhausted();
        apply(step, &mut current);
        while let Some(ticket) = current.take() {
            let step = queue.complete(ticket);
            apply(step, &mut current);
        }
        (played, drained)
    }

    #[test]
    fn test_any_arrival_order_plays_in_sequence() {
        for order in permutations(vec![0, 1, 2, 3, 4]) {
            for eager in [true, false] {
                let (played, drained) = run(&order, eager);
                assert_eq!(played, vec![0, 1, 2, 3, 4], "order {:?}", order);
                assert_eq!(drained, 1, "order {:?}", order);
            }
        }
    }

    #[test]
    fn test_drained_only_after_last_completion() {
        // --- Arrange ---
        let mut queue = PlaybackQueue::new();
        queue.begin_turn();
        let Some(PlaybackStep::Play { ticket, .. }) = queue.submit(segment(0)) else {
            panic!("segment 0 should start");
        };

        // --- Act ---
        let on_exhausted = queue.mark_exhausted();
        let on_complete = queue.complete(ticket);
        let again = queue.complete(ticket);

        // --- Assert ---
        assert_eq!(on_exhausted, None);
        assert_eq!(on_complete, Some(PlaybackStep::Drained));
        assert_eq!(again, None);
        assert_eq!(queue.mark_exhausted(), None);
    }

    #[test]
    fn test_gap_releases_buffered_segments_on_exhaustion() {
        let mut queue = PlaybackQueue::new();
        queue.begin_turn();
        let Some(PlaybackStep::Play { ticket, .. }) = queue.submit(segment(0)) else {
            panic!("segment 0 should start");
        };
        assert_eq!(queue.submit(segment(2)), None);
        assert_eq!(queue.complete(ticket), None);

        assert_eq!(queue.mark_exhausted(), Some(PlaybackStep::Drained));
        assert_eq!(queue.pending_len(), 0);
    }

    #[test]
    fn test_duplicates_and_late_segments_are_dropped() {
        let mut queue = PlaybackQueue::new();
        queue.begin_turn();
        let Some(PlaybackStep::Play { ticket, .. }) = queue.submit(segment(0)) else {
            panic!("segment 0 should start");
        };
        assert_eq!(queue.submit(segment(0)), None);
        assert_eq!(queue.submit(segment(1)), None);
        assert_eq!(queue.submit(segment(1)), None);
        assert_eq!(queue.pending_len(), 1);

        assert!(matches!(queue.complete(ticket), Some(PlaybackStep::Play { .. })));
        queue.mark_exhausted();
        assert_eq!(queue.submit(segment(2)), None);
        assert_eq!(queue.pending_len(), 0);
    }

    #[test]
    fn test_new_turn_waits_for_previous_segment() {
        // --- Arrange ---
        let mut queue = PlaybackQueue::new();
        queue.begin_turn();
        let Some(PlaybackStep::Play { ticket: old, .. }) = queue.submit(segment(0)) else {
            panic!("segment 0 should start");
        };

        // --- Act ---
        queue.begin_turn();
        let while_busy = queue.submit(segment(0));
        let after = queue.complete(old);

        // --- Assert ---
        assert_eq!(while_busy, None);
        let Some(PlaybackStep::Play { ticket, .. }) = after else {
            panic!("new turn should start after the old segment");
        };
        assert_eq!(ticket.turn(), old.turn() + 1);
        assert_eq!(ticket.sequence(), 0);
    }

    #[test]
    fn test_abandon_suppresses_drained_and_stales_playing_ticket() {
        let mut queue = PlaybackQueue::new();
        queue.begin_turn();
        let Some(PlaybackStep::Play { ticket, .. }) = queue.submit(segment(0)) else {
            panic!("segment 0 should start");
        };
        queue.submit(segment(1));

        assert_eq!(queue.abandon(), Some(ticket));
        assert_eq!(queue.complete(ticket), None);
        assert_eq!(queue.mark_exhausted(), None);
        assert_eq!(queue.abandon(), None);
    }
}
