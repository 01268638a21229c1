/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The capability set the coordinator needs from a transaction, and a plain implementation of it.
//!
//! The coordinator never looks inside a transaction. All it ever does with one is:
//! 1. Hand its bytes to the [state transition function](crate::stf) inside a
//!    [`BlockRequest`](super::block::BlockRequest).
//! 2. Compare its bytes against the bytes of a transaction in a delivered block, to decide whether
//!    [optimistically executed](crate::cache) work can be reused.
//! 3. Log its identifier.
//!
//! Any encoding that can do these three things can be used by implementing [`Transaction`].

use borsh::{BorshDeserialize, BorshSerialize};

/// Methods that a type needs to implement to be handled by an [`AppManager`](crate::app_manager::AppManager).
pub trait Transaction: Clone + Send + Sync + 'static {
    /// Get the canonical byte encoding of this transaction. This is what ends up in blocks.
    fn bytes(&self) -> &[u8];

    /// Get a string that identifies this transaction in the [transaction pool](crate::tx_pool).
    fn identifier(&self) -> &str;

    /// Check whether this transaction is byte-for-byte equal to `other`.
    fn bytes_eq(&self, other: &[u8]) -> bool {
        self.bytes() == other
    }
}

/// A transaction as stored in a transaction pool: opaque bytes plus an identifier.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct PoolTx {
    bytes: Vec<u8>,
    identifier: String,
}

impl PoolTx {
    /// Create a new `PoolTx` from its `bytes` and `identifier`.
    pub fn new(bytes: Vec<u8>, identifier: impl Into<String>) -> Self {
        Self {
            bytes,
            identifier: identifier.into(),
        }
    }
}

impl Transaction for PoolTx {
    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
