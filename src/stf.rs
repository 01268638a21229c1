/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Trait definition for pluggable state transition functions.
//!
//! The state transition function ("STF") is the deterministic engine that actually executes
//! transactions. The coordinator never interprets transactions or state itself; it only decides *which*
//! state view the STF should run against, and what to do with the result.
//!
//! # Determinism requirements
//!
//! Every replica of a chain must arrive at the same state after executing the same blocks. Therefore,
//! [`deliver_block`](StateTransitionFunction::deliver_block) must be deterministic: given the same
//! `BlockRequest` and a state view with the same contents, it must produce the same `BlockResponse` and
//! the same writes. Among other things, this is what makes it sound for the coordinator to commit the
//! writes produced during [`build_block`](crate::app_manager::AppManager::build_block) instead of
//! re-executing the same transactions during
//! [`deliver_block`](crate::app_manager::AppManager::deliver_block).
//!
//! # Gas
//!
//! Queries, simulations, and transaction validations run inside an [`ExecutionContext`] whose gas
//! meter is bounded by one of the limits in the coordinator's
//! [`Configuration`](crate::app_manager::Configuration). Block execution is not bounded by the
//! coordinator; the STF applies whatever per-transaction limits its own rules demand.

use crate::{
    store::{branch::BranchState, pluggables::Store},
    types::{
        block::{BlockRequest, BlockResponse, TxResult},
        data_types::GasLimit,
        gas::{GasMeter, OutOfGas},
    },
};

/// Methods that a type needs to implement to serve as the deterministic state transition function of
/// an [`AppManager`](crate::app_manager::AppManager) backed by a store of type `S`.
///
/// A single STF instance is shared by every call into the coordinator, from many threads at once. It
/// must therefore treat `&self` as read-only configuration: each call gets its own state view, and
/// views are never shared between concurrent calls.
pub trait StateTransitionFunction<S: Store>: Send + Sync + 'static {
    /// Opaque request type served by [`query`](Self::query).
    type Query: Send;

    /// Opaque response type returned by [`query`](Self::query).
    type QueryResponse: Send;

    /// Execute every transaction in `block`, in order, against `state`.
    ///
    /// Returns the block's response and the state view after execution, from which the coordinator
    /// derives the change set to commit.
    fn deliver_block(
        &self,
        block: &BlockRequest,
        state: S::WritableState,
    ) -> Result<(BlockResponse, S::WritableState), ExecutionError>;

    /// Execute `tx` against a scratch branch of the latest committed state. Writes made into the branch
    /// are discarded when the call returns.
    fn simulate(
        &self,
        context: &mut ExecutionContext<BranchState<S::ReadonlyState>>,
        tx: &[u8],
    ) -> Result<TxResult, ExecutionError>;

    /// Check whether `tx` would be accepted into a block, without executing it for real.
    fn validate_tx(
        &self,
        context: &mut ExecutionContext<BranchState<S::ReadonlyState>>,
        tx: &[u8],
    ) -> Result<TxResult, ExecutionError>;

    /// Serve `request` from the latest committed state.
    fn query(
        &self,
        context: &mut ExecutionContext<S::ReadonlyState>,
        request: Self::Query,
    ) -> Result<Self::QueryResponse, ExecutionError>;
}

/// A state view bound to a gas meter.
pub struct ExecutionContext<St> {
    state: St,
    gas_meter: GasMeter,
}

impl<St> ExecutionContext<St> {
    /// Create an `ExecutionContext` over `state` that may consume at most `gas_limit` units of gas.
    pub fn new(state: St, gas_limit: GasLimit) -> Self {
        Self {
            state,
            gas_meter: GasMeter::new(gas_limit),
        }
    }

    pub fn state(&self) -> &St {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut St {
        &mut self.state
    }

    pub fn gas_meter(&self) -> &GasMeter {
        &self.gas_meter
    }

    /// Consume `amount` units of gas from this context's meter.
    pub fn consume_gas(&mut self, amount: u64) -> Result<(), ExecutionError> {
        Ok(self.gas_meter.consume(amount)?)
    }
}

/// Enumerates the circumstances in which the STF could reject or fail on its input.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The gas limit of the execution context was exceeded.
    #[error(transparent)]
    OutOfGas(#[from] OutOfGas),

    /// A transaction (or query request) could not be decoded.
    #[error("failed to decode input: {0}")]
    Decode(String),

    /// The input is well-formed but invalid in the view of the STF's rules.
    #[error("invalid input: {0}")]
    Invalid(String),

    /// The STF itself failed, independent of its input.
    #[error("internal execution error: {0}")]
    Internal(String),
}
