// Snowflake-style document ids. Ids from one generator are strictly
// increasing, so ordering by id follows creation order.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// 64-bit id layout: [timestamp:41][node_id:10][sequence:12]
/// The top bit stays clear so every id is a positive i64.
#[derive(Debug)]
pub struct IdGenerator {
    node_id: u16,
    state: Mutex<GeneratorState>,
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

const SEQUENCE_MASK: u64 = 0xFFF;
const NODE_MASK: u64 = 0x3FF;
const TIMESTAMP_MASK: u64 = 0x1FF_FFFF_FFFF;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl IdGenerator {
    pub fn new(node_id: u16) -> Self {
        Self {
            node_id: node_id & NODE_MASK as u16,
            state: Mutex::new(GeneratorState::default()),
        }
    }

    pub fn next_id(&self) -> i64 {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut now = now_millis().max(state.last_timestamp);

        if now == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // Sequence exhausted for this millisecond; borrow the next one.
                now += 1;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = now;

        let id = ((now & TIMESTAMP_MASK) << 22)
            | ((self.node_id as u64 & NODE_MASK) << 12)
            | (state.sequence & SEQUENCE_MASK);
        id as i64
    }

    pub fn extract_node_id(id: i64) -> u16 {
        ((id as u64 >> 12) & NODE_MASK) as u16
    }

    pub fn extract_timestamp(id: i64) -> u64 {
        id as u64 >> 22
    }

    pub fn node_id(&self) -> u16 {
        self.node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_strictly_increase() {
        let generator = IdGenerator::new(7);
        let ids: Vec<i64> = (0..10_000).map(|_| generator.next_id()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(ids.iter().all(|id| *id > 0));
    }

    #[test]
    fn test_node_extraction() {
        let generator = IdGenerator::new(500);
        let id = generator.next_id();
        assert_eq!(IdGenerator::extract_node_id(id), 500);
        assert!(IdGenerator::extract_timestamp(id) > 0);
    }
}
