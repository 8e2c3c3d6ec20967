//! Bounded batch assembly
//!
//! Packs framed, TLV-encoded bets into one payload that never exceeds the
//! transport's frame budget. A record that would overflow the current batch
//! is held as the leftover and becomes the first record of the next one;
//! a record too large to ever fit is logged and dropped.

use crate::{encode_agency_id, Bet, Message, Packet, Result, MAX_BATCH_PAYLOAD};
use std::io;
use tracing::warn;

/// Limits for one batch: how many records and how many payload bytes.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct BatchLimits {
    /// Maximum number of records per batch
    pub max_amount: usize,
    /// Byte budget for the framed records, agency id and headers excluded
    pub max_payload: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_amount: 100,
            max_payload: MAX_BATCH_PAYLOAD,
        }
    }
}

/// One assembled batch, ready to wrap in a BatchBet message.
#[derive(Debug, Clone)]
pub struct Batch {
    pub agency_id: String,
    pub count: usize,
    pub payload: Vec<u8>,
}

impl Batch {
    /// An empty batch with an exhausted source and no leftover means the
    /// submission phase is over.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Wrap this batch in its message: agency id (u32 big-endian) followed
    /// by the concatenated framed records.
    pub fn to_message(&self) -> Message {
        let mut payload = Vec::with_capacity(4 + self.payload.len());
        payload.extend_from_slice(&encode_agency_id(&self.agency_id));
        payload.extend_from_slice(&self.payload);
        Message::batch(payload)
    }
}

/// Assemble the next batch from `lines`, consuming the leftover first.
///
/// The leftover, when present, was already checked against the per-record
/// budget when it was deferred, so it is appended unconditionally. The pull
/// loop then takes lines until the count or byte budget is reached; the
/// first line that does not fit becomes the new leftover. A line whose
/// framed encoding alone exceeds the budget is dropped with a warning and
/// does not count against the batch.
pub fn next_batch<I>(
    lines: &mut I,
    agency_id: &str,
    limits: &BatchLimits,
    leftover: &mut Option<String>,
) -> Result<Batch>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut payload = Vec::new();
    let mut count = 0;

    if let Some(line) = leftover.take() {
        let framed = frame_line(&line)?;
        payload.extend_from_slice(&framed);
        count += 1;
    }

    while count < limits.max_amount {
        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let framed = frame_line(&line)?;
        if framed.len() > limits.max_payload {
            warn!(
                "Bet exceeds the {} byte record budget, dropping: {}",
                limits.max_payload, line
            );
            continue;
        }
        if payload.len() + framed.len() <= limits.max_payload {
            payload.extend_from_slice(&framed);
            count += 1;
        } else {
            // Deferred to the next batch, never dropped
            *leftover = Some(line);
            break;
        }
    }

    Ok(Batch {
        agency_id: agency_id.to_string(),
        count,
        payload,
    })
}

fn frame_line(line: &str) -> Result<Vec<u8>> {
    let bet = Bet::from_csv_line(line)?;
    let encoded = bet.encode()?;
    Ok(Packet::new(encoded).to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each of these lines encodes to 35 TLV bytes, 39 framed
    fn lines(n: usize) -> Vec<io::Result<String>> {
        (0..n)
            .map(|i| Ok(format!("aaaa,bbbb,cccc,dddd,{:04}", i)))
            .collect()
    }

    fn limits(max_amount: usize, max_payload: usize) -> BatchLimits {
        BatchLimits {
            max_amount,
            max_payload,
        }
    }

    #[test]
    fn packs_until_byte_budget_then_defers() {
        let mut source = lines(3).into_iter();
        let mut leftover = None;

        // Budget fits two 39-byte records but not three
        let batch = next_batch(&mut source, "1", &limits(10, 80), &mut leftover).unwrap();
        assert_eq!(batch.count, 2);
        assert_eq!(batch.payload.len(), 78);
        assert_eq!(leftover.as_deref(), Some("aaaa,bbbb,cccc,dddd,0002"));

        // Next call starts from the leftover, source is exhausted
        let batch = next_batch(&mut source, "1", &limits(10, 80), &mut leftover).unwrap();
        assert_eq!(batch.count, 1);
        assert_eq!(batch.payload.len(), 39);
        assert!(leftover.is_none());

        // Nothing left: empty batch signals end of submission
        let batch = next_batch(&mut source, "1", &limits(10, 80), &mut leftover).unwrap();
        assert!(batch.is_empty());
        assert!(batch.payload.is_empty());
    }

    #[test]
    fn deferred_record_is_encoded_exactly_once() {
        let mut source = lines(3).into_iter();
        let mut leftover = None;

        let first = next_batch(&mut source, "1", &limits(10, 80), &mut leftover).unwrap();
        let second = next_batch(&mut source, "1", &limits(10, 80), &mut leftover).unwrap();

        let mut all = first.payload.clone();
        all.extend_from_slice(&second.payload);
        // Three distinct framed records, none duplicated or dropped
        assert_eq!(all.len(), 3 * 39);
        let third = Bet::decode(&all[2 * 39 + 4..]).unwrap();
        assert_eq!(third.number, "0002");
    }

    #[test]
    fn count_limit_caps_the_batch() {
        let mut source = lines(5).into_iter();
        let mut leftover = None;

        let batch = next_batch(&mut source, "1", &limits(2, 10_000), &mut leftover).unwrap();
        assert_eq!(batch.count, 2);
        // Limit hit without an overflow: nothing is deferred
        assert!(leftover.is_none());

        let batch = next_batch(&mut source, "1", &limits(2, 10_000), &mut leftover).unwrap();
        assert_eq!(batch.count, 2);
    }

    #[test]
    fn oversized_record_is_dropped_not_deferred() {
        let huge = format!("aaaa,bbbb,cccc,dddd,{}", "9".repeat(500));
        let mut source = vec![
            Ok(huge),
            Ok("aaaa,bbbb,cccc,dddd,0000".to_string()),
        ]
        .into_iter();
        let mut leftover = None;

        let batch = next_batch(&mut source, "1", &limits(10, 100), &mut leftover).unwrap();
        assert_eq!(batch.count, 1);
        assert!(leftover.is_none());

        // The oversized record never resurfaces
        let batch = next_batch(&mut source, "1", &limits(10, 100), &mut leftover).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn payload_never_exceeds_budget() {
        let mut source = lines(50).into_iter();
        let mut leftover = None;
        let limits = limits(100, 200);

        loop {
            let batch = next_batch(&mut source, "1", &limits, &mut leftover).unwrap();
            if batch.is_empty() {
                break;
            }
            assert!(batch.payload.len() <= limits.max_payload);
            assert!(batch.count <= limits.max_amount);
        }
        assert!(leftover.is_none());
    }

    #[test]
    fn malformed_line_aborts_the_assembly() {
        let mut source = vec![Ok("not,enough,fields".to_string())].into_iter();
        let mut leftover = None;
        assert!(next_batch(&mut source, "1", &BatchLimits::default(), &mut leftover).is_err());
    }

    #[test]
    fn batch_message_prefixes_agency_id() {
        let mut source = lines(1).into_iter();
        let mut leftover = None;
        let batch =
            next_batch(&mut source, "7", &BatchLimits::default(), &mut leftover).unwrap();

        let msg = batch.to_message();
        assert_eq!(&msg.payload[..4], &[0, 0, 0, 7]);
        assert_eq!(msg.payload.len(), 4 + batch.payload.len());
    }
}
