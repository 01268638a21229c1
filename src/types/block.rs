/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the block-level inputs and outputs of the coordinator.

use borsh::{BorshDeserialize, BorshSerialize};

use super::{data_types::BlockHeight, transaction::Transaction};

/// An ordered batch of opaque transactions submitted for authoritative execution at `height`.
///
/// A `BlockRequest` is immutable once it has been handed to
/// [`deliver_block`](crate::app_manager::AppManager::deliver_block).
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BlockRequest {
    pub height: BlockHeight,
    pub txs: Vec<Vec<u8>>,
}

impl BlockRequest {
    pub fn new(height: BlockHeight, txs: Vec<Vec<u8>>) -> Self {
        Self { height, txs }
    }

    /// Create a `BlockRequest` carrying the bytes of each of `txs`, in order.
    pub fn from_txs<T: Transaction>(height: BlockHeight, txs: &[T]) -> Self {
        Self {
            height,
            txs: txs.iter().map(|tx| tx.bytes().to_vec()).collect(),
        }
    }
}

/// The result of executing a single transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TxResult {
    /// Units of gas consumed by the transaction.
    pub gas_used: u64,

    /// Opaque output of the transaction.
    pub data: Vec<u8>,

    /// Why the transaction failed, if it did. A failed transaction still belongs to its block.
    pub error: Option<String>,
}

impl TxResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// The output of executing a block: one [`TxResult`] per transaction, in block order.
///
/// The coordinator treats this as opaque. It is cached verbatim when produced during
/// [`build_block`](crate::app_manager::AppManager::build_block).
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BlockResponse {
    pub tx_results: Vec<TxResult>,
}

impl BlockResponse {
    pub fn new(tx_results: Vec<TxResult>) -> Self {
        Self { tx_results }
    }

    pub fn is_empty(&self) -> bool {
        self.tx_results.is_empty()
    }
}
