// ABOUTME: Groups deliver_sm segments of concatenated SMS and turns them into decoded text
// ABOUTME: Segments are released in index order once every part of a message has arrived

use crate::coding::{CodingError, decode_payload};
use crate::datatypes::{DataCoding, DeliverSm};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Per-SMSC handling for peers that mislabel their payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Workaround {
    /// Sends already decoded text while declaring the default alphabet.
    #[serde(rename = "SMG4000")]
    Smg4000,
}

/// A complete message, ready for the downstream hook.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub source: String,
    pub target: String,
    pub text: String,
    pub delivered_at: DateTime<Utc>,
}

/// Decode `segments` in the order given and join their text.
///
/// Addresses come from the first segment. An empty slice yields an empty
/// message.
pub fn assemble(
    segments: &[DeliverSm],
    workaround: Option<Workaround>,
) -> Result<DecodedMessage, CodingError> {
    let mut text = String::new();
    for segment in segments {
        let coding = segment.coding();
        let data = segment.user_data();
        match (workaround, coding) {
            (Some(Workaround::Smg4000), DataCoding::SmscDefault) => {
                text.push_str(&String::from_utf8_lossy(data));
            }
            _ => text.push_str(&decode_payload(coding, data)?),
        }
    }

    let (source, target) = segments
        .first()
        .map(|first| (first.source_addr.clone(), first.destination_addr.clone()))
        .unwrap_or_default();

    Ok(DecodedMessage {
        source,
        target,
        text,
        delivered_at: Utc::now(),
    })
}

#[derive(Debug)]
struct Group {
    total: u8,
    segments: BTreeMap<u8, DeliverSm>,
    started: Instant,
}

/// Collects the parts of concatenated messages.
///
/// Parts are keyed by source address and concatenation reference, taken from
/// the SAR TLVs or the UDH. A message without concatenation info is complete
/// on its own.
#[derive(Debug, Default)]
pub struct MultipartCombiner {
    groups: HashMap<(String, u16), Group>,
}

impl MultipartCombiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one segment. Returns every segment of its message, sorted by
    /// index, once the last one arrives.
    pub fn push(&mut self, pdu: DeliverSm) -> Option<Vec<DeliverSm>> {
        let Some(concat) = pdu.concatenation().filter(|c| c.total > 1) else {
            return Some(vec![pdu]);
        };

        let key = (pdu.source_addr.clone(), concat.reference);
        let group = self.groups.entry(key.clone()).or_insert_with(|| Group {
            total: concat.total,
            segments: BTreeMap::new(),
            started: Instant::now(),
        });

        if group.total != concat.total {
            debug!(
                source = %key.0,
                reference = concat.reference,
                "segment count changed, restarting message"
            );
            group.total = concat.total;
            group.segments.clear();
            group.started = Instant::now();
        }

        // A repeated index replaces the earlier copy
        group.segments.insert(concat.index, pdu);
        if group.segments.len() < usize::from(group.total) {
            return None;
        }

        self.groups
            .remove(&key)
            .map(|group| group.segments.into_values().collect())
    }

    /// Drop messages whose first segment arrived more than `max_age` ago.
    /// Returns how many were dropped.
    pub fn evict_stale(&mut self, max_age: Duration) -> usize {
        let before = self.groups.len();
        self.groups
            .retain(|_, group| group.started.elapsed() <= max_age);
        before - self.groups.len()
    }

    /// Messages still waiting for segments.
    pub fn pending(&self) -> usize {
        self.groups.len()
    }
}
