use std::sync::RwLock;

use crate::types::ChunkStatus;

/// Thread-safe table of per-chunk transmission states.
///
/// Chunk tasks update their own slot; the reporter and the scheduler read
/// aggregate counts. One slot per chunk index.
pub struct ChunkBoard {
    slots: RwLock<Vec<ChunkStatus>>,
}

impl ChunkBoard {
    /// Creates a board with `total` pending chunks.
    pub fn new(total: u32) -> Self {
        Self {
            slots: RwLock::new(vec![ChunkStatus::Pending; total as usize]),
        }
    }

    /// Sets the status of one chunk. Out-of-range indices are ignored.
    pub fn set(&self, index: u32, status: ChunkStatus) {
        let mut slots = self.slots.write().unwrap();
        if let Some(slot) = slots.get_mut(index as usize) {
            *slot = status;
        }
    }

    /// Returns the status of one chunk.
    pub fn get(&self, index: u32) -> Option<ChunkStatus> {
        let slots = self.slots.read().unwrap();
        slots.get(index as usize).copied()
    }

    /// Marks the given indices as already succeeded (handshake resume set).
    pub fn mark_resumed(&self, indices: &[u32]) {
        let mut slots = self.slots.write().unwrap();
        for &index in indices {
            if let Some(slot) = slots.get_mut(index as usize) {
                *slot = ChunkStatus::Success;
            }
        }
    }

    /// Indices that still need uploading, ascending.
    pub fn pending_indices(&self) -> Vec<u32> {
        let slots = self.slots.read().unwrap();
        slots
            .iter()
            .enumerate()
            .filter(|(_, status)| **status != ChunkStatus::Success)
            .map(|(index, _)| index as u32)
            .collect()
    }

    pub fn total(&self) -> u32 {
        self.slots.read().unwrap().len() as u32
    }

    pub fn success_count(&self) -> u32 {
        self.count(ChunkStatus::Success)
    }

    pub fn error_count(&self) -> u32 {
        self.count(ChunkStatus::Error)
    }

    /// `true` once every chunk is acknowledged.
    pub fn all_success(&self) -> bool {
        let slots = self.slots.read().unwrap();
        slots.iter().all(|status| *status == ChunkStatus::Success)
    }

    /// Copy of all slot states, for UIs rendering a chunk grid.
    pub fn snapshot(&self) -> Vec<ChunkStatus> {
        self.slots.read().unwrap().clone()
    }

    fn count(&self, wanted: ChunkStatus) -> u32 {
        let slots = self.slots.read().unwrap();
        slots.iter().filter(|status| **status == wanted).count() as u32
    }
}
