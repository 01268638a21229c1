//! [`NumberStf`], a simple implementation of [`StateTransitionFunction`] used in all of the
//! integration tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use app_manager::{
    genesis::{GenesisRegistry, InitGenesisError},
    stf::{ExecutionContext, ExecutionError, StateTransitionFunction},
    store::{
        branch::BranchState,
        pluggables::{ReadonlyState, WritableState},
    },
    types::{
        block::{BlockRequest, BlockResponse, TxResult},
        transaction::PoolTx,
    },
};
use borsh::{BorshDeserialize, BorshSerialize};

use crate::common::mem_store::{MemSnapshot, MemState, MemStore};

// The key in the state where the "number" is stored.
pub(crate) const NUMBER_KEY: [u8; 1] = [0];

// The key in the state where the number of executed transactions is stored.
pub(crate) const TX_COUNT_KEY: [u8; 1] = [1];

// Gas charged for executing, simulating, or validating one transaction, and for serving one query.
pub(crate) const TX_GAS: u64 = 10;

/// User-sent instructions that the number STF executes.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub(crate) enum NumberTx {
    /// Increase the number in the state by the given amount.
    Add(u32),

    /// Set the number in the state to the given value.
    Set(u32),

    /// Fail the whole block that contains this transaction.
    Abort,
}

impl NumberTx {
    pub(crate) fn bytes(&self) -> Vec<u8> {
        self.try_to_vec().unwrap()
    }

    /// Wrap this transaction as it would sit in a transaction pool.
    pub(crate) fn pool_tx(&self) -> PoolTx {
        PoolTx::new(self.bytes(), format!("{:?}", self))
    }
}

/// Requests served by [`NumberStf::query`](StateTransitionFunction::query).
pub(crate) enum NumberQuery {
    /// Get the number in the state.
    Number,

    /// Consume the given units of gas, then get the number in the state.
    Burn(u64),
}

/// A state transition function whose state is a single number.
///
/// `NumberStf` counts how many times its block execution engine (`deliver_block`) has been invoked, so
/// tests can tell whether a delivered block was executed or reused from the cache.
#[derive(Clone)]
pub(crate) struct NumberStf {
    deliver_block_calls: Arc<AtomicUsize>,
}

impl NumberStf {
    pub(crate) fn new() -> NumberStf {
        NumberStf {
            deliver_block_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of times `deliver_block` has been invoked on this STF or any of its clones.
    pub(crate) fn deliver_block_calls(&self) -> usize {
        self.deliver_block_calls.load(Ordering::SeqCst)
    }

    /// A genesis registry containing a single "number" module, which writes the number from its payload
    /// (or 0 if the payload is empty).
    pub(crate) fn genesis() -> GenesisRegistry<MemState> {
        let mut registry = GenesisRegistry::new();
        registry
            .register("number", |state: &mut MemState, payload: &[u8]| {
                let number = if payload.is_empty() {
                    0
                } else {
                    u32::try_from_slice(payload).map_err(|err| Box::new(err) as InitGenesisError)?
                };
                write_number(state, number);
                Ok(())
            })
            .unwrap();
        registry
    }

    // Execute `tx` against `state`, returning its result. A transaction that cannot be decoded
    // is recorded as failed and leaves the state untouched.
    fn execute<St: WritableState>(state: &mut St, tx: &[u8]) -> Result<TxResult, ExecutionError> {
        let tx = match NumberTx::try_from_slice(tx) {
            Ok(tx) => tx,
            Err(err) => {
                return Ok(TxResult {
                    gas_used: TX_GAS,
                    data: Vec::new(),
                    error: Some(err.to_string()),
                })
            }
        };

        let number = match tx {
            NumberTx::Add(amount) => read_number(state).wrapping_add(amount),
            NumberTx::Set(number) => number,
            NumberTx::Abort => return Err(ExecutionError::Invalid(String::from("aborted"))),
        };
        write_number(state, number);

        let tx_count = state
            .get(&TX_COUNT_KEY)
            .map(|bytes| u64::try_from_slice(&bytes).unwrap())
            .unwrap_or(0);
        state.set(&TX_COUNT_KEY, &(tx_count + 1).try_to_vec().unwrap());

        Ok(TxResult {
            gas_used: TX_GAS,
            data: number.try_to_vec().unwrap(),
            error: None,
        })
    }
}

impl StateTransitionFunction<MemStore> for NumberStf {
    type Query = NumberQuery;
    type QueryResponse = u32;

    fn deliver_block(
        &self,
        block: &BlockRequest,
        mut state: MemState,
    ) -> Result<(BlockResponse, MemState), ExecutionError> {
        self.deliver_block_calls.fetch_add(1, Ordering::SeqCst);

        let tx_results = block
            .txs
            .iter()
            .map(|tx| Self::execute(&mut state, tx))
            .collect::<Result<Vec<TxResult>, ExecutionError>>()?;

        Ok((BlockResponse::new(tx_results), state))
    }

    fn simulate(
        &self,
        context: &mut ExecutionContext<BranchState<MemSnapshot>>,
        tx: &[u8],
    ) -> Result<TxResult, ExecutionError> {
        context.consume_gas(TX_GAS)?;
        Self::execute(context.state_mut(), tx)
    }

    fn validate_tx(
        &self,
        context: &mut ExecutionContext<BranchState<MemSnapshot>>,
        tx: &[u8],
    ) -> Result<TxResult, ExecutionError> {
        context.consume_gas(TX_GAS)?;
        match NumberTx::try_from_slice(tx) {
            Ok(NumberTx::Abort) => Err(ExecutionError::Invalid(String::from("aborted"))),
            Ok(_) => Ok(TxResult {
                gas_used: context.gas_meter().consumed(),
                data: Vec::new(),
                error: None,
            }),
            Err(err) => Err(ExecutionError::Decode(err.to_string())),
        }
    }

    fn query(
        &self,
        context: &mut ExecutionContext<MemSnapshot>,
        request: NumberQuery,
    ) -> Result<u32, ExecutionError> {
        context.consume_gas(TX_GAS)?;
        if let NumberQuery::Burn(amount) = request {
            context.consume_gas(amount)?;
        }
        Ok(read_number(context.state()))
    }
}

/// Get the number stored in `state`, or 0 if none is stored.
pub(crate) fn read_number<St: ReadonlyState>(state: &St) -> u32 {
    state
        .get(&NUMBER_KEY)
        .map(|bytes| u32::try_from_slice(&bytes).unwrap())
        .unwrap_or(0)
}

fn write_number<St: WritableState>(state: &mut St, number: u32) {
    state.set(&NUMBER_KEY, &number.try_to_vec().unwrap());
}
