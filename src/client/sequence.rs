// ABOUTME: Pluggable sequence number strategies for outgoing SMPP requests
// ABOUTME: The default wraps through 1..=0x7FFFFFFF so numbers stay unique while in flight

use crate::codec::MAX_SEQUENCE_NUMBER;
use std::sync::atomic::{AtomicU32, Ordering};

/// Source of candidate sequence numbers.
///
/// The session draws again when a candidate is outside
/// `1..=0x7FFF_FFFF` or still waiting for its response, so a generator only
/// has to avoid reusing values too soon.
pub trait SequenceGenerator: Send + Sync {
    fn next_sequence(&self) -> u32;
}

/// Counts up from a starting value, wrapping back to 1.
#[derive(Debug)]
pub struct MonotonicSequence {
    next: AtomicU32,
}

impl MonotonicSequence {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first.clamp(1, MAX_SEQUENCE_NUMBER)),
        }
    }
}

impl Default for MonotonicSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceGenerator for MonotonicSequence {
    fn next_sequence(&self) -> u32 {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(if n >= MAX_SEQUENCE_NUMBER { 1 } else { n + 1 })
            })
            .unwrap_or_else(|n| n)
    }
}
