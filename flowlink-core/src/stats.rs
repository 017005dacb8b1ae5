//! Per-channel link counters

use crate::parser::{Discard, Outcome, Response};

/// Running totals for one channel
///
/// Counters wrap instead of saturating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// Frames validated and handed to their handler
    pub frames: u32,
    /// Bytes dropped one at a time because they did not start a known tag
    pub unknown_tag_bytes: u32,
    /// Frames dropped on checksum mismatch
    pub checksum_errors: u32,
    /// Received bytes lost to a full Rx, rejected or overwritten
    pub rx_dropped: u32,
    /// Replies lost because Tx was full
    pub tx_dropped: u32,
    /// Partial frames cleared by the idle timeout
    pub idle_resets: u32,
    /// Zero-byte sync requests answered
    pub sync_replies: u32,
}

impl LinkStats {
    pub const fn new() -> Self {
        Self {
            frames: 0,
            unknown_tag_bytes: 0,
            checksum_errors: 0,
            rx_dropped: 0,
            tx_dropped: 0,
            idle_resets: 0,
            sync_replies: 0,
        }
    }

    /// Account for one parser step
    pub fn record(&mut self, outcome: &Outcome) {
        let response = match *outcome {
            Outcome::Incomplete(_) => return,
            Outcome::Processed { response, .. } => {
                self.frames = self.frames.wrapping_add(1);
                response
            }
            Outcome::Discarded { reason, response } => {
                let counter = match reason {
                    Discard::UnknownTag => &mut self.unknown_tag_bytes,
                    Discard::ChecksumMismatch => &mut self.checksum_errors,
                };
                *counter = counter.wrapping_add(1);
                response
            }
            Outcome::Synced { response } => {
                self.sync_replies = self.sync_replies.wrapping_add(1);
                response
            }
        };

        if response == Response::Dropped {
            self.tx_dropped = self.tx_dropped.wrapping_add(1);
        }
    }

    /// Account for received bytes that did not fit in Rx
    pub fn record_rx_dropped(&mut self, count: usize) {
        self.rx_dropped = self.rx_dropped.wrapping_add(count as u32);
    }

    pub fn record_idle_reset(&mut self) {
        self.idle_resets = self.idle_resets.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseState;
    use flowlink_protocol::Tag;

    #[test]
    fn test_incomplete_counts_nothing() {
        let mut stats = LinkStats::new();
        stats.record(&Outcome::Incomplete(ParseState::AwaitingPayload));
        assert_eq!(stats, LinkStats::default());
    }

    #[test]
    fn test_record_outcomes() {
        let mut stats = LinkStats::new();
        stats.record(&Outcome::Processed {
            tag: Tag::from_ascii(b"gpos"),
            response: Response::Queued(26),
        });
        stats.record(&Outcome::Processed {
            tag: Tag::from_ascii(b"gpos"),
            response: Response::Dropped,
        });
        stats.record(&Outcome::Discarded {
            reason: Discard::UnknownTag,
            response: Response::Silent,
        });
        stats.record(&Outcome::Discarded {
            reason: Discard::ChecksumMismatch,
            response: Response::Queued(6),
        });
        stats.record(&Outcome::Synced {
            response: Response::Queued(1),
        });

        assert_eq!(stats.frames, 2);
        assert_eq!(stats.tx_dropped, 1);
        assert_eq!(stats.unknown_tag_bytes, 1);
        assert_eq!(stats.checksum_errors, 1);
        assert_eq!(stats.sync_replies, 1);
    }

    #[test]
    fn test_counters_wrap() {
        let mut stats = LinkStats {
            rx_dropped: u32::MAX,
            ..LinkStats::new()
        };
        stats.record_rx_dropped(2);
        assert_eq!(stats.rx_dropped, 1);
    }
}
