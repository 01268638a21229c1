/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build, start, and drive the block coordinator.
//!
//! The [`AppManager`] sits between a consensus driver, which decides *which* block comes next, and a
//! deterministic [state transition function](crate::stf) plus a [versioned store](crate::store), which
//! decide *what* that block does to the state. It turns four requests into correctly ordered,
//! consistently committed state changes:
//! - [`build_block`](AppManager::build_block): pick transactions for the next block, and execute them
//!   speculatively so that the result can be [reused](crate::cache) if this block is the one delivered.
//! - [`deliver_block`](AppManager::deliver_block): authoritatively execute (or reuse) and commit the
//!   block at a height, returning its response and the new state root.
//! - [`query`](AppManager::query): answer a read request from the last committed state.
//! - [`simulate`](AppManager::simulate) and [`check_tx`](AppManager::check_tx): run a single
//!   transaction against a throwaway branch of the last committed state.
//!
//! Before any of these, the application's starting state is written once by
//! [`init_genesis`](AppManager::init_genesis).
//!
//! ## Starting an app manager
//!
//! Here is an example that demonstrates how to build and start an app manager using the builder
//! pattern:
//!
//! ```ignore
//! let app_manager =
//!     AppManagerSpec::builder()
//!     .store(store)
//!     .stf(stf)
//!     .tx_pool(tx_pool)
//!     .genesis(genesis_registry)
//!     .configuration(configuration)
//!     .on_commit_block(commit_handler)
//!     .build()
//!     .start()?;
//! ```
//!
//! ### Required setters
//!
//! - `.store(...)`
//! - `.stf(...)`
//! - `.tx_pool(...)`
//! - `.configuration(...)`
//!
//! ### Optional setters
//!
//! - `.genesis(...)`, the [registry](crate::genesis::GenesisRegistry) of genesis initializers. Defaults
//!   to an empty registry.
//! - `.on_init_genesis(...)`, `.on_build_block(...)`, `.on_deliver_block(...)`, `.on_commit_block(...)`,
//!   and `.on_discard_cache(...)` register handlers for the events in [crate::events].
//!
//! The app manager's [configuration](Configuration) can also be defined using the builder pattern, for
//! example:
//!
//! ```ignore
//! let configuration =
//!     Configuration::builder()
//!     .check_tx_gas_limit(GasLimit::new(100_000))
//!     .query_gas_limit(GasLimit::new(1_000_000))
//!     .simulation_gas_limit(GasLimit::new(1_000_000))
//!     .log_events(true)
//!     .build()
//! ```
//!
//! ## Concurrency
//!
//! All methods take `&self`, and an `AppManager` can be shared between threads (e.g., in an
//! [`Arc`](std::sync::Arc)). Any number of builds, queries, simulations, and transaction checks may run
//! at the same time as each other and as a delivery.
//!
//! Deliveries (and genesis) are serialized internally, so the store never sees two commits from the
//! same app manager at once. The app manager does **not** check that deliveries arrive in height order;
//! delivering an out-of-sequence height is a caller error, and is reported by the store when it is asked
//! for a state view at that height.

use std::{
    sync::{
        mpsc::{self, Sender},
        Mutex, MutexGuard,
    },
    thread::JoinHandle,
    time::SystemTime,
};

use typed_builder::TypedBuilder;

use crate::{
    cache::{CachedBlock, OptimisticCache},
    event_bus::{start_event_bus, EventHandlers, HandlerPtr},
    events::*,
    genesis::{self, GenesisError, GenesisPayloads, GenesisRegistry},
    height::LastCommittedHeight,
    stf::{ExecutionContext, ExecutionError, StateTransitionFunction},
    store::{
        branch::BranchState,
        pluggables::{Store, StoreError, WritableState},
    },
    tx_pool::{TxPool, TxPoolError},
    types::{
        block::{BlockRequest, BlockResponse, TxResult},
        change_set::ChangeSet,
        data_types::{BlockHeight, GasLimit, StateRoot},
        transaction::Transaction,
    },
};

/// Stores the user-defined parameters of an app manager, that is:
/// 1. The gas limit for validating a transaction with [`check_tx`](AppManager::check_tx).
/// 2. The gas limit for serving a [`query`](AppManager::query).
/// 3. The gas limit for a [`simulate`](AppManager::simulate) call.
/// 4. The "Log Events" flag, if set to "true" then logs should be printed.
///
/// All of these are fixed once the app manager is started.
///
/// ## Log Events
///
/// The app manager logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
/// printed onto a terminal or to a file, set up a [logging
/// implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.check_tx_gas_limit(...)`
    - `.query_gas_limit(...)`
    - `.simulation_gas_limit(...)`
    - `.log_events(...)`
"))]
pub struct Configuration {
    #[builder(setter(doc = "Set the gas limit for validating a single transaction. Required."))]
    pub check_tx_gas_limit: GasLimit,
    #[builder(setter(doc = "Set the gas limit for serving a single query. Required."))]
    pub query_gas_limit: GasLimit,
    #[builder(setter(doc = "Set the gas limit for simulating a single transaction. Required."))]
    pub simulation_gas_limit: GasLimit,
    #[builder(setter(doc = "Enable logging? Required."))]
    pub log_events: bool,
}

/// Stores all necessary parameters and trait implementations required to run an [`AppManager`].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building an [AppManagerSpec]. On the builder call the following methods to construct a valid [AppManagerSpec].

    Required:
    - `.store(...)`
    - `.stf(...)`
    - `.tx_pool(...)`
    - `.configuration(...)`

    Optional:
    - `.genesis(...)`
    - `.on_init_genesis(...)`
    - `.on_build_block(...)`
    - `.on_deliver_block(...)`
    - `.on_commit_block(...)`
    - `.on_discard_cache(...)`
"))]
pub struct AppManagerSpec<S: Store, F: StateTransitionFunction<S>, P: TxPool> {
    // Required parameters
    #[builder(setter(doc = "Set the versioned store. The argument must implement the [Store](crate::store::pluggables::Store) trait. Required."))]
    store: S,
    #[builder(setter(doc = "Set the state transition function. The argument must implement the [StateTransitionFunction](crate::stf::StateTransitionFunction) trait. Required."))]
    stf: F,
    #[builder(setter(doc = "Set the source of candidate transactions. The argument must implement the [TxPool](crate::tx_pool::TxPool) trait. Required."))]
    tx_pool: P,
    #[builder(setter(doc = "Set the [configuration](Configuration). Required."))]
    configuration: Configuration,
    // Optional parameters
    #[builder(default, setter(doc = "Set the registry of per-module genesis initializers. Optional."))]
    genesis: GenesisRegistry<S::WritableState>,
    #[builder(default, setter(transform = |handler: impl Fn(&InitGenesisEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<InitGenesisEvent>),
    doc = "Register a handler closure to be invoked after genesis state is committed. Optional."))]
    on_init_genesis: Option<HandlerPtr<InitGenesisEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&BuildBlockEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<BuildBlockEvent>),
    doc = "Register a handler closure to be invoked after a block is built. Optional."))]
    on_build_block: Option<HandlerPtr<BuildBlockEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&DeliverBlockEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<DeliverBlockEvent>),
    doc = "Register a handler closure to be invoked after a block is delivered and committed. Optional."))]
    on_deliver_block: Option<HandlerPtr<DeliverBlockEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&CommitBlockEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<CommitBlockEvent>),
    doc = "Register a handler closure to be invoked after a change set is committed into the store. Optional."))]
    on_commit_block: Option<HandlerPtr<CommitBlockEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&DiscardCacheEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<DiscardCacheEvent>),
    doc = "Register a handler closure to be invoked after a cached block is discarded because the delivered block did not match it. Optional."))]
    on_discard_cache: Option<HandlerPtr<DiscardCacheEvent>>,
}

impl<S: Store, F: StateTransitionFunction<S>, P: TxPool> AppManagerSpec<S, F, P> {
    /// Load the last committed height from the store, start the event bus (if any handler is
    /// registered), and return the running [`AppManager`].
    pub fn start(self) -> Result<AppManager<S, F, P>, AppManagerError> {
        let last_committed_height = self
            .store
            .last_committed_height()
            .map_err(AppManagerError::LoadHeight)?
            .unwrap_or(BlockHeight::GENESIS);

        let event_handlers = EventHandlers::new(
            self.configuration.log_events,
            self.on_init_genesis,
            self.on_build_block,
            self.on_deliver_block,
            self.on_commit_block,
            self.on_discard_cache,
        );

        let (event_publisher, event_bus, event_bus_shutdown) = if !event_handlers.is_empty() {
            let (event_publisher, event_subscriber) = mpsc::channel();
            let (event_bus_shutdown, event_bus_shutdown_receiver) = mpsc::channel();
            let event_bus = start_event_bus(
                event_handlers,
                event_subscriber,
                event_bus_shutdown_receiver,
            );
            (Some(event_publisher), Some(event_bus), Some(event_bus_shutdown))
        } else {
            (None, None, None)
        };

        Ok(AppManager {
            config: self.configuration,
            store: self.store,
            stf: self.stf,
            tx_pool: self.tx_pool,
            genesis: self.genesis,
            last_committed_height: LastCommittedHeight::new(last_committed_height),
            cache: OptimisticCache::new(),
            delivery_lock: Mutex::new(()),
            event_publisher,
            event_bus,
            event_bus_shutdown,
        })
    }
}

/// The block coordinator. When this value is dropped, its event bus thread (if any) is gracefully shut
/// down after handling every event already published.
pub struct AppManager<S: Store, F: StateTransitionFunction<S>, P: TxPool> {
    config: Configuration,
    store: S,
    stf: F,
    tx_pool: P,
    genesis: GenesisRegistry<S::WritableState>,
    last_committed_height: LastCommittedHeight,
    cache: OptimisticCache<P::Tx>,
    delivery_lock: Mutex<()>,
    event_publisher: Option<Sender<Event>>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

impl<S: Store, F: StateTransitionFunction<S>, P: TxPool> AppManager<S, F, P> {
    /// Run every registered genesis initializer against an empty state view, and commit the result as
    /// the state at [`BlockHeight::GENESIS`].
    ///
    /// Each registered module is passed its entry in `payloads`, or an empty payload if it has none.
    /// Nothing is committed unless every initializer succeeds. Fails with
    /// [`AlreadyInitialized`](AppManagerError::AlreadyInitialized) if the store already has committed
    /// state.
    pub fn init_genesis(&self, payloads: &GenesisPayloads) -> Result<StateRoot, AppManagerError> {
        let _delivery = self.lock_delivery();

        if let Some(height) = self
            .store
            .last_committed_height()
            .map_err(AppManagerError::LoadHeight)?
        {
            return Err(AppManagerError::AlreadyInitialized { height });
        }

        let mut state = self.open_state(BlockHeight::GENESIS)?;
        self.genesis.run(&mut state, payloads)?;
        let change_set = state.change_set().map_err(AppManagerError::ChangeSet)?;
        let state_root = self.commit(BlockHeight::GENESIS, &change_set)?;

        Event::InitGenesis(InitGenesisEvent {
            timestamp: SystemTime::now(),
            modules: self.genesis.modules().map(String::from).collect(),
            state_root,
        })
        .publish(&self.event_publisher);

        Ok(state_root)
    }

    /// Decode `genesis_bytes` as a Borsh-encoded map from module name to payload, then
    /// [`init_genesis`](Self::init_genesis) with it.
    pub fn init_genesis_bytes(&self, genesis_bytes: &[u8]) -> Result<StateRoot, AppManagerError> {
        let payloads = genesis::decode_payloads(genesis_bytes)?;
        self.init_genesis(&payloads)
    }

    /// Build a block for the height after the last committed height.
    ///
    /// Gets candidate transactions of at most `max_total_size` bytes in total from the transaction pool,
    /// and executes them against a state view anchored at the next height. If execution produces a
    /// non-empty response and a non-empty change set, the result is [cached](crate::cache), replacing
    /// whatever was cached before, so that delivering this exact block later does not re-execute it.
    ///
    /// The transactions are returned whether or not the result was cached. If getting the transactions
    /// or executing them fails, the error is returned and the cache is left untouched.
    pub fn build_block(&self, max_total_size: u32) -> Result<Vec<P::Tx>, AppManagerError> {
        let txs = self.tx_pool.get_txs(max_total_size)?;

        let height = self.last_committed_height.load().next();
        for tx in &txs {
            log::debug!("Building block at height {} with tx: {}", height, tx.identifier());
        }
        let block = BlockRequest::from_txs(height, &txs);
        let state = self.open_state(height)?;
        let (response, change_set) = self.execute(&block, state)?;

        let cached = !response.is_empty() && !change_set.is_empty();
        if cached {
            self.cache.put(CachedBlock {
                height,
                txs: txs.clone(),
                change_set,
                response,
            });
        }

        Event::BuildBlock(BuildBlockEvent {
            timestamp: SystemTime::now(),
            height,
            tx_count: txs.len(),
            cached,
        })
        .publish(&self.event_publisher);

        Ok(txs)
    }

    /// Execute and commit `block`, returning its response and the resulting state root.
    ///
    /// # Steps
    ///
    /// 1. Take the cached block out of the cache slot, leaving it empty.
    /// 2. Open a state view anchored at `block.height`.
    /// 3. If the cached block [matches](crate::cache#when-a-cached-block-may-be-reused) `block`, commit its
    ///    change set and return its response without executing `block`.
    /// 4. Otherwise, execute `block` against the state view and commit the resulting change set.
    /// 5. Only once the commit has succeeded, advance the last committed height to `block.height`.
    ///
    /// # Failure
    ///
    /// On any error, `block` was not applied: nothing was committed and the last committed height is
    /// unchanged. The call can be retried unchanged. The cache slot is empty after this call returns,
    /// whether it succeeded or not.
    pub fn deliver_block(
        &self,
        block: &BlockRequest,
    ) -> Result<(BlockResponse, StateRoot), AppManagerError> {
        let _delivery = self.lock_delivery();

        let cached_block = self.cache.take();
        let state = self.open_state(block.height)?;

        let (response, change_set, reused_cache) = match cached_block {
            Some(cached_block) if cached_block.matches(block) => {
                log::debug!("Reusing the cached execution of block at height {}", block.height);
                (cached_block.response, cached_block.change_set, true)
            }
            cached_block => {
                if let Some(discarded) = cached_block {
                    Event::DiscardCache(DiscardCacheEvent {
                        timestamp: SystemTime::now(),
                        cached_height: discarded.height,
                        requested_height: block.height,
                    })
                    .publish(&self.event_publisher);
                }
                let (response, change_set) = self.execute(block, state)?;
                (response, change_set, false)
            }
        };

        let state_root = self.commit(block.height, &change_set)?;

        Event::DeliverBlock(DeliverBlockEvent {
            timestamp: SystemTime::now(),
            height: block.height,
            tx_count: block.txs.len(),
            reused_cache,
        })
        .publish(&self.event_publisher);

        Ok((response, state_root))
    }

    /// Serve `request` from the state at the last committed height, with at most
    /// [`query_gas_limit`](Configuration::query_gas_limit) units of gas.
    ///
    /// The last committed height is read once. A delivery that commits while the query is running is not
    /// observed by it.
    pub fn query(&self, request: F::Query) -> Result<F::QueryResponse, AppManagerError> {
        let state = self.latest_state()?;
        let mut context = ExecutionContext::new(state, self.config.query_gas_limit);
        self.stf
            .query(&mut context, request)
            .map_err(AppManagerError::Query)
    }

    /// Execute `tx` against a throwaway branch of the state at the last committed height, with at most
    /// [`simulation_gas_limit`](Configuration::simulation_gas_limit) units of gas.
    ///
    /// Simulation never changes committed state and never touches the cache.
    pub fn simulate(&self, tx: &[u8]) -> Result<TxResult, AppManagerError> {
        let state = BranchState::new(self.latest_state()?);
        let mut context = ExecutionContext::new(state, self.config.simulation_gas_limit);
        self.stf
            .simulate(&mut context, tx)
            .map_err(AppManagerError::Simulate)
    }

    /// Check whether `tx` would be accepted into a block given the state at the last committed height,
    /// with at most [`check_tx_gas_limit`](Configuration::check_tx_gas_limit) units of gas.
    ///
    /// Like [`simulate`](Self::simulate), this never changes committed state and never touches the cache.
    pub fn check_tx(&self, tx: &[u8]) -> Result<TxResult, AppManagerError> {
        let state = BranchState::new(self.latest_state()?);
        let mut context = ExecutionContext::new(state, self.config.check_tx_gas_limit);
        self.stf
            .validate_tx(&mut context, tx)
            .map_err(AppManagerError::CheckTx)
    }

    /// Get a read-only view of the state at the last committed height.
    pub fn latest_state(&self) -> Result<S::ReadonlyState, AppManagerError> {
        let height = self.last_committed_height.load();
        self.store
            .readonly_state_at(height)
            .map_err(|source| AppManagerError::Anchor { height, source })
    }

    /// Get the height of the most recently committed block.
    pub fn last_committed_height(&self) -> BlockHeight {
        self.last_committed_height.load()
    }

    /// Check whether a built block is waiting in the cache to be reused by the next delivery.
    pub fn has_cached_block(&self) -> bool {
        !self.cache.is_empty()
    }

    /// Get the configuration this app manager was started with.
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    fn open_state(&self, height: BlockHeight) -> Result<S::WritableState, AppManagerError> {
        self.store
            .new_state_at(height)
            .map_err(|source| AppManagerError::Anchor { height, source })
    }

    fn execute(
        &self,
        block: &BlockRequest,
        state: S::WritableState,
    ) -> Result<(BlockResponse, ChangeSet), AppManagerError> {
        let (response, new_state) = self
            .stf
            .deliver_block(block, state)
            .map_err(AppManagerError::Execution)?;
        let change_set = new_state
            .change_set()
            .map_err(AppManagerError::ChangeSet)?;
        Ok((response, change_set))
    }

    // Callers must hold the delivery lock.
    fn commit(
        &self,
        height: BlockHeight,
        change_set: &ChangeSet,
    ) -> Result<StateRoot, AppManagerError> {
        log::trace!("Committing {} mutated keys at height {}", change_set.len(), height);
        let state_root = self
            .store
            .commit_state(change_set)
            .map_err(AppManagerError::Commit)?;
        self.last_committed_height.advance_to(height);

        Event::CommitBlock(CommitBlockEvent {
            timestamp: SystemTime::now(),
            height,
            state_root,
        })
        .publish(&self.event_publisher);

        Ok(state_root)
    }

    // The lock guards no data, so a poisoned lock is still safe to use.
    fn lock_delivery(&self) -> MutexGuard<'_, ()> {
        self.delivery_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S: Store, F: StateTransitionFunction<S>, P: TxPool> Drop for AppManager<S, F, P> {
    fn drop(&mut self) {
        if let Some(shutdown) = self.event_bus_shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(event_bus) = self.event_bus.take() {
            if event_bus.join().is_err() {
                log::error!("The event bus thread panicked");
            }
        }
    }
}

/// The different ways a call to a method of [`AppManager`] can fail.
///
/// Every variant except `Query`, `Simulate`, and `CheckTx` names the stage that failed in its message.
/// Those three carry the state transition function's error unchanged.
#[derive(Debug, thiserror::Error)]
pub enum AppManagerError {
    /// A state view could not be opened at `height`.
    #[error("unable to create new state for height {height}")]
    Anchor {
        height: BlockHeight,
        #[source]
        source: StoreError,
    },

    /// The state transition function failed to execute a block.
    #[error("block delivery failed")]
    Execution(#[source] ExecutionError),

    /// The change set could not be derived from the state view after execution.
    #[error("unable to derive change set")]
    ChangeSet(#[source] StoreError),

    /// The store failed to commit a change set.
    #[error("commit failed")]
    Commit(#[source] StoreError),

    /// A genesis initializer failed, or genesis payloads could not be decoded.
    #[error("genesis failed")]
    Genesis(#[from] GenesisError),

    /// The transaction pool failed to provide transactions.
    #[error("failed to get transactions from the pool")]
    TxPool(#[from] TxPoolError),

    /// The store failed to report its last committed height.
    #[error("failed to load the last committed height")]
    LoadHeight(#[source] StoreError),

    /// Genesis was attempted on a store that already has committed state.
    #[error("genesis already committed, last committed height is {height}")]
    AlreadyInitialized { height: BlockHeight },

    #[error(transparent)]
    Query(ExecutionError),

    #[error(transparent)]
    Simulate(ExecutionError),

    #[error(transparent)]
    CheckTx(ExecutionError),
}

impl AppManagerError {
    /// Get a short label for the stage at which the call failed.
    pub fn stage(&self) -> &'static str {
        match self {
            AppManagerError::Anchor { .. } => "anchor",
            AppManagerError::Execution(_) => "execution",
            AppManagerError::ChangeSet(_) => "change-set-derivation",
            AppManagerError::Commit(_) => "commit",
            AppManagerError::Genesis(_) => "genesis-module",
            AppManagerError::TxPool(_) => "tx-pool",
            AppManagerError::LoadHeight(_) => "load-height",
            AppManagerError::AlreadyInitialized { .. } => "genesis",
            AppManagerError::Query(_) => "query",
            AppManagerError::Simulate(_) => "simulate",
            AppManagerError::CheckTx(_) => "check-tx",
        }
    }
}
