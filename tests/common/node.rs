//! [`Node`], an `AppManager` wired to the in-memory test components, plus handles to inspect them.

use app_manager::{
    app_manager::{AppManager, AppManagerSpec, Configuration},
    genesis::GenesisPayloads,
    types::{
        block::{BlockRequest, BlockResponse},
        data_types::{BlockHeight, GasLimit, StateRoot},
        transaction::{PoolTx, Transaction},
    },
};
use borsh::{BorshDeserialize, BorshSerialize};

use crate::common::{
    mem_store::MemStore,
    number_stf::{NumberStf, NumberTx, NUMBER_KEY, TX_GAS},
    tx_queue::TxQueue,
};

pub(crate) type NumberAppManager = AppManager<MemStore, NumberStf, TxQueue>;

// Large enough that the transaction queue never truncates a block in these tests.
pub(crate) const MAX_BLOCK_SIZE: u32 = 1024;

/// Things every test node has in common:
/// - The "number" genesis module.
/// - Configuration (gas limits are multiples of [`TX_GAS`]).
///
/// Things that are separate per node:
/// - Store.
/// - STF instance (and so its engine invocation counter).
/// - Transaction queue.
pub(crate) struct Node {
    pub(crate) app_manager: NumberAppManager,
    pub(crate) store: MemStore,
    pub(crate) stf: NumberStf,
    pub(crate) tx_queue: TxQueue,
}

impl Node {
    /// Start a node on an empty store, without running genesis.
    pub(crate) fn new() -> Node {
        Node::with_store(MemStore::new())
    }

    /// Start a node on an empty store and run genesis with the number set to `initial_number`.
    pub(crate) fn initialized(initial_number: u32) -> Node {
        let node = Node::new();
        let mut payloads = GenesisPayloads::new();
        payloads.insert(
            String::from("number"),
            initial_number.try_to_vec().unwrap(),
        );
        node.app_manager.init_genesis(&payloads).unwrap();
        node
    }

    /// Start a node on top of an existing store.
    pub(crate) fn with_store(store: MemStore) -> Node {
        let stf = NumberStf::new();
        let tx_queue = TxQueue::new();

        let app_manager = AppManagerSpec::builder()
            .store(store.clone())
            .stf(stf.clone())
            .tx_pool(tx_queue.clone())
            .genesis(NumberStf::genesis())
            .configuration(configuration())
            .build()
            .start()
            .unwrap();

        Node {
            app_manager,
            store,
            stf,
            tx_queue,
        }
    }

    /// Submit `txs`, build a block from them, and return the built transactions.
    pub(crate) fn build(&self, txs: &[NumberTx]) -> Vec<PoolTx> {
        self.tx_queue.clear();
        txs.iter().for_each(|tx| self.tx_queue.submit(tx.clone()));
        self.app_manager.build_block(MAX_BLOCK_SIZE).unwrap()
    }

    /// Deliver `txs` at the height after the last committed height.
    pub(crate) fn deliver_next(&self, txs: &[NumberTx]) -> (BlockResponse, StateRoot) {
        let height = self.app_manager.last_committed_height().next();
        self.app_manager
            .deliver_block(&block_request(height, txs))
            .unwrap()
    }

    /// Get the number in the latest committed state of the store.
    pub(crate) fn number(&self) -> u32 {
        self.store
            .committed(&NUMBER_KEY)
            .map(|bytes| u32::try_from_slice(&bytes).unwrap())
            .unwrap_or(0)
    }
}

pub(crate) fn configuration() -> Configuration {
    Configuration::builder()
        .check_tx_gas_limit(GasLimit::new(TX_GAS))
        .query_gas_limit(GasLimit::new(10 * TX_GAS))
        .simulation_gas_limit(GasLimit::new(TX_GAS))
        .log_events(true)
        .build()
}

pub(crate) fn block_request(height: BlockHeight, txs: &[NumberTx]) -> BlockRequest {
    BlockRequest::new(height, txs.iter().map(NumberTx::bytes).collect())
}

/// Get the raw bytes of each of `txs`, in order.
pub(crate) fn tx_bytes(txs: &[PoolTx]) -> Vec<Vec<u8>> {
    txs.iter().map(|tx| tx.bytes().to_vec()).collect()
}
