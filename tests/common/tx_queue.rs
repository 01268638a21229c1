//! A queue-backed implementation of [`TxPool`].

use std::sync::{Arc, Mutex};

use app_manager::{
    tx_pool::{TxPool, TxPoolError},
    types::transaction::{PoolTx, Transaction},
};

use crate::common::number_stf::NumberTx;

/// Transactions waiting to be included in a block, in submission order. Clones share the same queue.
///
/// `get_txs` does not remove transactions from the queue; tests call [`clear`](TxQueue::clear) once
/// the transactions they submitted have been delivered.
#[derive(Clone)]
pub(crate) struct TxQueue {
    txs: Arc<Mutex<Vec<PoolTx>>>,
    fail_next: Arc<Mutex<bool>>,
}

impl TxQueue {
    pub(crate) fn new() -> TxQueue {
        TxQueue {
            txs: Arc::new(Mutex::new(Vec::new())),
            fail_next: Arc::new(Mutex::new(false)),
        }
    }

    pub(crate) fn submit(&self, tx: NumberTx) {
        self.txs.lock().unwrap().push(tx.pool_tx());
    }

    /// Submit raw bytes that do not decode into a [`NumberTx`].
    pub(crate) fn submit_raw(&self, bytes: Vec<u8>, identifier: &str) {
        self.txs
            .lock()
            .unwrap()
            .push(PoolTx::new(bytes, identifier));
    }

    pub(crate) fn clear(&self) {
        self.txs.lock().unwrap().clear();
    }

    /// Make the next call to `get_txs` fail.
    pub(crate) fn fail_next(&self) {
        *self.fail_next.lock().unwrap() = true;
    }
}

impl TxPool for TxQueue {
    type Tx = PoolTx;

    fn get_txs(&self, max_total_size: u32) -> Result<Vec<PoolTx>, TxPoolError> {
        let mut fail_next = self.fail_next.lock().unwrap();
        if *fail_next {
            *fail_next = false;
            return Err(TxPoolError::Unavailable(String::from("injected pool fault")));
        }

        let mut total_size = 0;
        Ok(self
            .txs
            .lock()
            .unwrap()
            .iter()
            .take_while(|tx| {
                total_size += tx.bytes().len();
                total_size <= max_total_size as usize
            })
            .cloned()
            .collect())
    }
}
