use tq_types::Block;

use crate::error::StoreResult;

/// Height and hash of the newest block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tip {
    pub height: u64,
    pub hash: String,
}

/// Append-only, height-ordered block store.
///
/// All implementations must satisfy these invariants:
/// - Blocks are immutable once written; nothing is updated or deleted.
/// - A block is only ever inserted at `tip + 1` (or at 0 into an empty store).
/// - The tip check and the insert are one atomic step: two writers racing
///   on the same tip can never both commit.
/// - Scans return blocks in ascending height order.
pub trait ChainStore: Send + Sync {
    /// Create the backing schema if absent. Idempotent.
    fn initialize(&self) -> StoreResult<()>;

    /// The newest block's height and hash.
    ///
    /// Fails with [`StoreError::EmptyStore`](crate::StoreError::EmptyStore)
    /// if no block exists.
    fn tip(&self) -> StoreResult<Tip>;

    /// Insert `block` only if the current tip height still equals
    /// `expected_tip` (`None` meaning the store must be empty).
    ///
    /// Fails with `TipMoved` if another writer got there first, and with
    /// `HeightMismatch` if `block.height` is not `expected_tip + 1`.
    fn append_if_tip_matches(&self, expected_tip: Option<u64>, block: &Block) -> StoreResult<()>;

    /// Every block, height ascending.
    fn scan_all(&self) -> StoreResult<Vec<Block>>;

    /// Blocks carrying `event_type`, height ascending.
    fn scan_by_event_type(&self, event_type: &str) -> StoreResult<Vec<Block>>;

    /// Blocks with `from <= height <= to`, height ascending.
    fn scan_range(&self, from: u64, to: u64) -> StoreResult<Vec<Block>>;

    fn get_by_height(&self, height: u64) -> StoreResult<Option<Block>>;

    fn get_by_hash(&self, hash: &str) -> StoreResult<Option<Block>>;

    /// Number of stored blocks.
    fn block_count(&self) -> StoreResult<u64>;

    /// The tip, or `None` for an empty store.
    fn try_tip(&self) -> StoreResult<Option<Tip>> {
        match self.tip() {
            Ok(tip) => Ok(Some(tip)),
            Err(crate::StoreError::EmptyStore) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The `limit` newest blocks, height ascending.
    fn scan_latest(&self, limit: u64) -> StoreResult<Vec<Block>> {
        let Some(tip) = self.try_tip()? else {
            return Ok(Vec::new());
        };
        if limit == 0 {
            return Ok(Vec::new());
        }
        let from = (tip.height + 1).saturating_sub(limit);
        self.scan_range(from, tip.height)
    }
}

/// Height the next block must carry when appending on `expected_tip`.
pub(crate) fn next_height(expected_tip: Option<u64>) -> u64 {
    expected_tip.map_or(0, |h| h + 1)
}

impl<T: ChainStore + ?Sized> ChainStore for Box<T> {
    fn initialize(&self) -> StoreResult<()> {
        (**self).initialize()
    }

    fn tip(&self) -> StoreResult<Tip> {
        (**self).tip()
    }

    fn append_if_tip_matches(&self, expected_tip: Option<u64>, block: &Block) -> StoreResult<()> {
        (**self).append_if_tip_matches(expected_tip, block)
    }

    fn scan_all(&self) -> StoreResult<Vec<Block>> {
        (**self).scan_all()
    }

    fn scan_by_event_type(&self, event_type: &str) -> StoreResult<Vec<Block>> {
        (**self).scan_by_event_type(event_type)
    }

    fn scan_range(&self, from: u64, to: u64) -> StoreResult<Vec<Block>> {
        (**self).scan_range(from, to)
    }

    fn get_by_height(&self, height: u64) -> StoreResult<Option<Block>> {
        (**self).get_by_height(height)
    }

    fn get_by_hash(&self, hash: &str) -> StoreResult<Option<Block>> {
        (**self).get_by_hash(hash)
    }

    fn block_count(&self) -> StoreResult<u64> {
        (**self).block_count()
    }
}
