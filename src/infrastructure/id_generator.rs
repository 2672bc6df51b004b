// Snowflake-style id generator.
// 64-bit ids: [timestamp_ms:42][node_id:10][sequence:12], time ordered per node.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::Id;

const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const MAX_NODE_ID: u16 = (1 << NODE_BITS) - 1;
const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_MASK: u64 = (1 << 42) - 1;

#[derive(Debug, Default)]
struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

/// Generates unique object ids for users, photos and comments.
/// 1024 nodes and 4096 ids per millisecond per node.
#[derive(Debug)]
pub struct IdGenerator {
    node_id: u16,
    state: Mutex<GeneratorState>,
}

impl IdGenerator {
    /// Node ids above 1023 are masked to fit their 10 bits.
    pub fn new(node_id: u16) -> Self {
        Self {
            node_id: node_id & MAX_NODE_ID,
            state: Mutex::new(GeneratorState::default()),
        }
    }

    pub fn next_id(&self) -> Id {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut now = current_millis().max(state.last_timestamp);
        if now == state.last_timestamp {
            if state.sequence >= MAX_SEQUENCE {
                // Sequence exhausted, borrow the next millisecond. The clock
                // catches up once the burst ends.
                now += 1;
                state.sequence = 0;
            } else {
                state.sequence += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = now;

        let id = ((now & TIMESTAMP_MASK) << (NODE_BITS + SEQUENCE_BITS))
            | ((self.node_id as u64) << SEQUENCE_BITS)
            | state.sequence;
        Id(id as i64)
    }

}

fn current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn node_of(id: Id) -> u16 {
        ((id.0 as u64 >> SEQUENCE_BITS) & MAX_NODE_ID as u64) as u16
    }

    fn timestamp_of(id: Id) -> u64 {
        id.0 as u64 >> (NODE_BITS + SEQUENCE_BITS)
    }

    fn sequence_of(id: Id) -> u64 {
        id.0 as u64 & MAX_SEQUENCE
    }

    #[test]
    fn test_id_generation() {
        let generator = IdGenerator::new(123);

        let id1 = generator.next_id();
        let id2 = generator.next_id();
        let id3 = generator.next_id();

        assert!(id1 < id2);
        assert!(id2 < id3);
        assert!(id1.0 > 0);

        assert_eq!(node_of(id1), 123);
        assert_eq!(node_of(id3), 123);
        assert!(timestamp_of(id3) >= timestamp_of(id1));
    }

    #[test]
    fn test_node_extraction() {
        let generator = IdGenerator::new(500);
        let id = generator.next_id();

        assert_eq!(node_of(id), 500);
        assert_eq!(node_of(IdGenerator::new(1024 + 5).next_id()), 5);
    }

    #[test]
    fn test_exhausted_sequence_moves_to_next_millisecond() {
        let generator = IdGenerator::new(1);
        // Pin the state ahead of the clock with the sequence used up
        let future = current_millis() + 60_000;
        {
            let mut state = generator.state.lock().unwrap();
            state.last_timestamp = future;
            state.sequence = MAX_SEQUENCE;
        }

        let id = generator.next_id();
        assert_eq!(timestamp_of(id), future + 1);
        assert_eq!(sequence_of(id), 0);

        let next = generator.next_id();
        assert!(next > id);
        assert_eq!(sequence_of(next), 1);
    }

    #[test]
    fn test_ids_are_unique_across_threads() {
        let generator = Arc::new(IdGenerator::new(7));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || (0..5000).map(|_| generator.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(seen.len(), 20_000);
    }
}
