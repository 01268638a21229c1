//! Trait definition for the pluggable source of candidate transactions.

use crate::types::transaction::Transaction;

/// A source of transactions to be included in the next block built by this replica.
pub trait TxPool: Send + Sync + 'static {
    /// The transaction encoding this pool holds.
    type Tx: Transaction;

    /// Get candidate transactions, in the order they should appear in the block, whose combined
    /// [byte length](Transaction::bytes) is at most `max_total_size`.
    ///
    /// This does not have to remove the returned transactions from the pool. Transactions leave the
    /// pool according to the pool's own rules (e.g., once they have been seen in a committed block).
    fn get_txs(&self, max_total_size: u32) -> Result<Vec<Self::Tx>, TxPoolError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TxPoolError {
    #[error("transaction pool unavailable: {0}")]
    Unavailable(String),

    #[error("transaction pool error: {0}")]
    Other(String),
}
