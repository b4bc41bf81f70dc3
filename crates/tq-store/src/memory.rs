use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tq_types::Block;

use crate::error::{StoreError, StoreResult};
use crate::traits::{next_height, ChainStore, Tip};

/// In-memory, `Vec`-based chain store.
///
/// Intended for tests and embedding. The write lock is held across the tip
/// check and the push, which makes `append_if_tip_matches` atomic.
pub struct InMemoryChainStore {
    blocks: RwLock<Vec<Block>>,
}

impl InMemoryChainStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Vec<Block>>> {
        self.blocks.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Vec<Block>>> {
        self.blocks.write().map_err(|_| StoreError::LockPoisoned)
    }

    /// Overwrite a stored block in place, simulating tampering with
    /// persisted data. Only built for tests (`test-util` feature).
    #[cfg(any(test, feature = "test-util"))]
    pub fn tamper<F: FnOnce(&mut Block)>(&self, height: u64, edit: F) -> StoreResult<bool> {
        let mut blocks = self.write()?;
        match blocks.get_mut(height as usize) {
            Some(block) => {
                edit(block);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Default for InMemoryChainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryChainStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.blocks.read().map(|b| b.len()).unwrap_or(0);
        f.debug_struct("InMemoryChainStore")
            .field("blocks", &count)
            .finish()
    }
}

impl ChainStore for InMemoryChainStore {
    fn initialize(&self) -> StoreResult<()> {
        Ok(())
    }

    fn tip(&self) -> StoreResult<Tip> {
        let blocks = self.read()?;
        blocks
            .last()
            .map(|b| Tip {
                height: b.height,
                hash: b.hash.clone(),
            })
            .ok_or(StoreError::EmptyStore)
    }

    fn append_if_tip_matches(&self, expected_tip: Option<u64>, block: &Block) -> StoreResult<()> {
        let expected_height = next_height(expected_tip);
        if block.height != expected_height {
            return Err(StoreError::HeightMismatch {
                expected: expected_height,
                got: block.height,
            });
        }

        let mut blocks = self.write()?;
        let actual = blocks.last().map(|b| b.height);
        if actual != expected_tip {
            return Err(StoreError::TipMoved {
                expected: expected_tip,
                actual,
            });
        }
        blocks.push(block.clone());
        Ok(())
    }

    fn scan_all(&self) -> StoreResult<Vec<Block>> {
        Ok(self.read()?.clone())
    }

    fn scan_by_event_type(&self, event_type: &str) -> StoreResult<Vec<Block>> {
        let blocks = self.read()?;
        Ok(blocks
            .iter()
            .filter(|b| b.event_type == event_type)
            .cloned()
            .collect())
    }

    fn scan_range(&self, from: u64, to: u64) -> StoreResult<Vec<Block>> {
        let blocks = self.read()?;
        Ok(blocks
            .iter()
            .filter(|b| b.height >= from && b.height <= to)
            .cloned()
            .collect())
    }

    fn get_by_height(&self, height: u64) -> StoreResult<Option<Block>> {
        let blocks = self.read()?;
        Ok(blocks.iter().find(|b| b.height == height).cloned())
    }

    fn get_by_hash(&self, hash: &str) -> StoreResult<Option<Block>> {
        let blocks = self.read()?;
        Ok(blocks.iter().find(|b| b.hash == hash).cloned())
    }

    fn block_count(&self) -> StoreResult<u64> {
        Ok(self.read()?.len() as u64)
    }
}
